//! Table detection from ruling lines (lattice mode).
//!
//! Horizontal and vertical rules that intersect form a grid. Row and column
//! boundaries come from the rule positions; a missing inner border between
//! two slots means they belong to one merged cell. Each grid is emitted as an
//! HTML table so merged cells survive as `colspan`/`rowspan`.

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::model::{BoundingBox, Page, RulingLine, TableRegion, TextSpan};

use super::html::{write_html_table, HtmlCell};
use super::stream::{StreamConfig, StreamDetector};
use super::TableDetector;

/// Word broken across lines with a hyphen: "Reve-" + "nue".
static HYPHEN_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{L})-\n(\p{Ll})").expect("Failed to compile HYPHEN_BREAK"));

/// Lattice detector configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    /// Distance within which rule positions and endpoints are considered equal (points)
    pub snap_tolerance: f32,
    /// Rules shorter than this are ignored (points)
    pub min_rule_length: f32,
    /// Minimum number of rows in a grid
    pub min_rows: usize,
    /// Minimum number of columns in a grid
    pub min_columns: usize,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            snap_tolerance: 2.0,
            min_rule_length: 5.0,
            min_rows: 2,
            min_columns: 2,
        }
    }
}

/// Detects ruled tables, falling back to strict text alignment on pages
/// without any ruled grid.
#[derive(Debug, Clone)]
pub struct LatticeDetector {
    config: LatticeConfig,
    fallback: StreamDetector,
}

impl Default for LatticeDetector {
    fn default() -> Self {
        Self::with_config(LatticeConfig::default(), StreamConfig::default().strict())
    }
}

impl LatticeDetector {
    /// Create a new lattice detector with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a lattice detector with custom configuration and fallback.
    pub fn with_config(config: LatticeConfig, fallback: StreamConfig) -> Self {
        Self {
            config,
            fallback: StreamDetector::with_config(fallback),
        }
    }

    /// Find ruled grids on a page.
    pub(crate) fn find_grids(&self, page: &Page) -> Vec<Grid> {
        let tol = self.config.snap_tolerance;
        let (horizontal, vertical): (Vec<RulingLine>, Vec<RulingLine>) = page
            .rules()
            .filter(|r| r.length() >= self.config.min_rule_length)
            .copied()
            .partition(RulingLine::is_horizontal);

        let horizontal = merge_collinear(horizontal, tol);
        let vertical = merge_collinear(vertical, tol);
        log::debug!(
            "LatticeDetector: page {} has {} horizontal and {} vertical rules after merging",
            page.number,
            horizontal.len(),
            vertical.len()
        );

        let spans: Vec<&TextSpan> = page.spans().filter(|s| s.upright).collect();

        let mut grids: Vec<Grid> = connected_components(&horizontal, &vertical, tol)
            .into_iter()
            .filter_map(|(h, v)| {
                let h: Vec<RulingLine> = h.into_iter().map(|i| horizontal[i]).collect();
                let v: Vec<RulingLine> = v.into_iter().map(|i| vertical[i]).collect();
                Grid::build(&h, &v, tol)
            })
            .filter(|g| g.row_count() >= self.config.min_rows && g.column_count() >= self.config.min_columns)
            .map(|mut g| {
                g.assign_text(&spans);
                g
            })
            .filter(Grid::has_text)
            .collect();

        // Top to bottom, then left to right
        grids.sort_by(|a, b| {
            b.bbox()
                .top
                .partial_cmp(&a.bbox().top)
                .unwrap_or(Ordering::Equal)
                .then(a.bbox().left.partial_cmp(&b.bbox().left).unwrap_or(Ordering::Equal))
        });

        grids
    }
}

impl TableDetector for LatticeDetector {
    fn name(&self) -> &'static str {
        "layout"
    }

    fn find_regions(&self, page: &Page) -> Vec<TableRegion> {
        let grids = self.find_grids(page);

        if grids.is_empty() {
            log::debug!(
                "LatticeDetector: no ruled grid on page {}, trying text alignment",
                page.number
            );
            return self.fallback.find_regions(page);
        }

        grids
            .iter()
            .map(|g| TableRegion::html(g.bbox(), g.to_html()))
            .collect()
    }
}

/// A ruled grid with merged cells.
#[derive(Debug, Clone)]
pub(crate) struct Grid {
    /// Column boundaries, left to right
    xs: Vec<f32>,
    /// Row boundaries, top to bottom (descending Y)
    ys: Vec<f32>,
    /// Cells in row-major order of their top-left slot
    cells: Vec<GridCell>,
    /// Cell index for every slot
    owner: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GridCell {
    row: usize,
    col: usize,
    rowspan: usize,
    colspan: usize,
    text: String,
}

impl GridCell {
    fn new(row: usize, col: usize, rowspan: usize, colspan: usize) -> Self {
        Self {
            row,
            col,
            rowspan,
            colspan,
            text: String::new(),
        }
    }
}

impl Grid {
    /// Build a grid from the rules of one connected component.
    fn build(horizontal: &[RulingLine], vertical: &[RulingLine], tol: f32) -> Option<Self> {
        let xs = snap_positions(vertical.iter().map(|r| r.position), tol);
        let mut ys = snap_positions(horizontal.iter().map(|r| r.position), tol);
        ys.reverse();

        if xs.len() < 2 || ys.len() < 2 {
            return None;
        }

        let rows = ys.len() - 1;
        let cols = xs.len() - 1;

        let has_vertical_border = |x: f32, y_mid: f32| {
            vertical
                .iter()
                .any(|v| (v.position - x).abs() <= tol && v.covers(y_mid, tol))
        };
        let has_horizontal_border = |y: f32, x_mid: f32| {
            horizontal
                .iter()
                .any(|h| (h.position - y).abs() <= tol && h.covers(x_mid, tol))
        };

        // Union slots that are not separated by a border
        let mut sets = DisjointSet::new(rows * cols);
        for r in 0..rows {
            let y_mid = (ys[r] + ys[r + 1]) / 2.0;
            for c in 0..cols {
                let x_mid = (xs[c] + xs[c + 1]) / 2.0;
                if c + 1 < cols && !has_vertical_border(xs[c + 1], y_mid) {
                    sets.union(r * cols + c, r * cols + c + 1);
                }
                if r + 1 < rows && !has_horizontal_border(ys[r + 1], x_mid) {
                    sets.union(r * cols + c, (r + 1) * cols + c);
                }
            }
        }

        let mut cells: Vec<GridCell> = Vec::new();
        let mut assigned = vec![vec![false; cols]; rows];

        for r in 0..rows {
            for c in 0..cols {
                if assigned[r][c] {
                    continue;
                }
                let root = sets.find(r * cols + c);
                let members: Vec<(usize, usize)> = (0..rows * cols)
                    .filter(|&i| sets.find(i) == root)
                    .map(|i| (i / cols, i % cols))
                    .collect();
                for &(mr, mc) in &members {
                    assigned[mr][mc] = true;
                }

                // (r, c) is the first member in row-major order
                let max_r = members.iter().map(|m| m.0).max().unwrap_or(r);
                let max_c = members.iter().map(|m| m.1).max().unwrap_or(c);
                let min_c = members.iter().map(|m| m.1).min().unwrap_or(c);
                let rectangular =
                    min_c == c && members.len() == (max_r - r + 1) * (max_c - c + 1);

                if rectangular {
                    cells.push(GridCell::new(r, c, max_r - r + 1, max_c - c + 1));
                } else {
                    // Irregular merge: keep the slots separate
                    cells.extend(members.iter().map(|&(mr, mc)| GridCell::new(mr, mc, 1, 1)));
                }
            }
        }

        cells.sort_by_key(|cell| (cell.row, cell.col));
        let mut owner = vec![vec![0; cols]; rows];
        for (idx, cell) in cells.iter().enumerate() {
            for row in owner.iter_mut().skip(cell.row).take(cell.rowspan) {
                for slot in row.iter_mut().skip(cell.col).take(cell.colspan) {
                    *slot = idx;
                }
            }
        }

        Some(Self {
            xs,
            ys,
            cells,
            owner,
        })
    }

    pub(crate) fn row_count(&self) -> usize {
        self.ys.len() - 1
    }

    pub(crate) fn column_count(&self) -> usize {
        self.xs.len() - 1
    }

    pub(crate) fn bbox(&self) -> BoundingBox {
        BoundingBox::new(
            self.xs[0],
            self.ys[self.ys.len() - 1],
            self.xs[self.xs.len() - 1],
            self.ys[0],
        )
    }

    /// Slot containing a point, if inside the grid.
    fn slot_at(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let col = self.xs.windows(2).position(|w| x >= w[0] && x < w[1])?;
        let row = self.ys.windows(2).position(|w| y <= w[0] && y > w[1])?;
        Some((row, col))
    }

    /// Put each span into the cell under its center.
    fn assign_text(&mut self, spans: &[&TextSpan]) {
        let mut per_cell: Vec<Vec<&TextSpan>> = vec![Vec::new(); self.cells.len()];
        for span in spans {
            if let Some((r, c)) = self.slot_at(span.center_x(), span.center_y()) {
                per_cell[self.owner[r][c]].push(span);
            }
        }

        for (cell, spans) in self.cells.iter_mut().zip(per_cell) {
            cell.text = join_cell_text(spans);
        }
    }

    fn has_text(&self) -> bool {
        self.cells.iter().any(|c| !c.text.trim().is_empty())
    }

    /// Serialize as an HTML table.
    pub(crate) fn to_html(&self) -> String {
        let rows: Vec<Vec<HtmlCell>> = (0..self.row_count())
            .map(|r| {
                self.cells
                    .iter()
                    .filter(|cell| cell.row == r)
                    .map(|cell| HtmlCell::new(cell.text.clone()).with_span(cell.colspan, cell.rowspan))
                    .collect()
            })
            .collect();
        write_html_table(&rows)
    }

    /// Slot-level text with merged cells repeated into every slot.
    #[cfg(test)]
    pub(crate) fn slot_texts(&self) -> Vec<Vec<String>> {
        self.owner
            .iter()
            .map(|row| row.iter().map(|&idx| self.cells[idx].text.clone()).collect())
            .collect()
    }
}

/// Join the spans of one cell: same line with spaces, lines with newlines.
fn join_cell_text(mut spans: Vec<&TextSpan>) -> String {
    spans.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });

    let mut text = String::new();
    let mut last_y: Option<f32> = None;
    for span in spans {
        match last_y {
            Some(y) if (span.y - y).abs() <= span.font_size * 0.4 => text.push(' '),
            Some(_) => text.push('\n'),
            None => {}
        }
        text.push_str(span.text.trim());
        last_y = Some(span.y);
    }

    HYPHEN_BREAK.replace_all(&text, "$1$2").into_owned()
}

/// Cluster positions within `tol` and return the cluster means, ascending.
fn snap_positions(positions: impl Iterator<Item = f32>, tol: f32) -> Vec<f32> {
    let mut sorted: Vec<f32> = positions.collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let mut clusters: Vec<Vec<f32>> = Vec::new();
    for p in sorted {
        match clusters.last_mut() {
            Some(cluster) if p - cluster[cluster.len() - 1] <= tol => cluster.push(p),
            _ => clusters.push(vec![p]),
        }
    }

    clusters
        .iter()
        .map(|c| c.iter().sum::<f32>() / c.len() as f32)
        .collect()
}

/// Merge rules of one orientation that lie on the same line and overlap or touch.
fn merge_collinear(mut rules: Vec<RulingLine>, tol: f32) -> Vec<RulingLine> {
    rules.sort_by(|a, b| a.position.partial_cmp(&b.position).unwrap_or(Ordering::Equal));

    // Group by position first so slightly offset rules still meet
    let mut lines: Vec<Vec<RulingLine>> = Vec::new();
    for rule in rules {
        match lines.last_mut() {
            Some(line) if rule.position - line[line.len() - 1].position <= tol => line.push(rule),
            _ => lines.push(vec![rule]),
        }
    }

    let mut merged = Vec::new();
    for mut line in lines {
        let position = line.iter().map(|r| r.position).sum::<f32>() / line.len() as f32;
        line.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(Ordering::Equal));

        let mut current: Option<RulingLine> = None;
        for rule in line {
            match current.as_mut() {
                Some(cur) if rule.start <= cur.end + tol => cur.end = cur.end.max(rule.end),
                _ => {
                    if let Some(done) = current.take() {
                        merged.push(done);
                    }
                    current = Some(RulingLine { position, ..rule });
                }
            }
        }
        merged.extend(current);
    }

    merged
}

/// Group intersecting rules; keep groups with at least two rules of each orientation.
fn connected_components(
    horizontal: &[RulingLine],
    vertical: &[RulingLine],
    tol: f32,
) -> Vec<(Vec<usize>, Vec<usize>)> {
    let n_h = horizontal.len();
    let mut sets = DisjointSet::new(n_h + vertical.len());

    for (i, h) in horizontal.iter().enumerate() {
        for (j, v) in vertical.iter().enumerate() {
            if h.covers(v.position, tol) && v.covers(h.position, tol) {
                sets.union(i, n_h + j);
            }
        }
    }

    let mut groups: Vec<(usize, Vec<usize>, Vec<usize>)> = Vec::new();
    for idx in 0..n_h + vertical.len() {
        let root = sets.find(idx);
        let pos = match groups.iter().position(|g| g.0 == root) {
            Some(pos) => pos,
            None => {
                groups.push((root, Vec::new(), Vec::new()));
                groups.len() - 1
            }
        };
        if idx < n_h {
            groups[pos].1.push(idx);
        } else {
            groups[pos].2.push(idx - n_h);
        }
    }

    groups
        .into_iter()
        .filter(|(_, h, v)| h.len() >= 2 && v.len() >= 2)
        .map(|(_, h, v)| (h, v))
        .collect()
}

/// Union-find over indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb.max(ra)] = ra.min(rb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::parse_html_table;
    use crate::model::CellValue;

    /// Page with a ruled grid; `xs` left to right, `ys` top to bottom.
    fn ruled_page(xs: &[f32], ys: &[f32]) -> Page {
        let mut page = Page::letter(1);
        let (left, right) = (xs[0], xs[xs.len() - 1]);
        let (top, bottom) = (ys[0], ys[ys.len() - 1]);
        for &y in ys {
            page.add_rule(RulingLine::horizontal(y, left, right));
        }
        for &x in xs {
            page.add_rule(RulingLine::vertical(x, bottom, top));
        }
        page
    }

    fn put(page: &mut Page, text: &str, x: f32, y: f32) {
        page.add_span(TextSpan::new(text, x, y, 10.0));
    }

    fn two_by_three() -> Page {
        let mut page = ruled_page(&[100.0, 200.0, 300.0, 400.0], &[500.0, 480.0, 460.0]);
        put(&mut page, "Name", 105.0, 486.0);
        put(&mut page, "Age", 205.0, 486.0);
        put(&mut page, "City", 305.0, 486.0);
        put(&mut page, "Alice", 105.0, 466.0);
        put(&mut page, "30", 205.0, 466.0);
        put(&mut page, "Paris", 305.0, 466.0);
        page
    }

    #[test]
    fn test_simple_grid() {
        let detector = LatticeDetector::new();
        let tables = detector.detect(&two_by_three());
        assert_eq!(tables.len(), 1);

        let expected: Vec<Vec<CellValue>> = vec![
            vec!["Name", "Age", "City"],
            vec!["Alice", "30", "Paris"],
        ]
        .into_iter()
        .map(|r| r.into_iter().map(CellValue::text).collect())
        .collect();
        assert_eq!(tables[0].rows, expected);
    }

    #[test]
    fn test_region_is_html() {
        let regions = LatticeDetector::new().find_regions(&two_by_three());
        assert_eq!(regions.len(), 1);
        assert!(matches!(
            regions[0].content,
            crate::model::RegionContent::Html(_)
        ));
        assert_eq!(regions[0].bbox, BoundingBox::new(100.0, 460.0, 400.0, 500.0));
    }

    #[test]
    fn test_colspan_from_missing_border() {
        // Header row spans the two right columns: no border at x=300 in the top row
        let mut page = Page::letter(1);
        for y in [500.0, 480.0, 460.0] {
            page.add_rule(RulingLine::horizontal(y, 100.0, 400.0));
        }
        page.add_rule(RulingLine::vertical(100.0, 460.0, 500.0));
        page.add_rule(RulingLine::vertical(200.0, 460.0, 500.0));
        page.add_rule(RulingLine::vertical(300.0, 460.0, 480.0));
        page.add_rule(RulingLine::vertical(400.0, 460.0, 500.0));
        put(&mut page, "Item", 105.0, 486.0);
        put(&mut page, "Quarter", 260.0, 486.0);
        put(&mut page, "Bolts", 105.0, 466.0);
        put(&mut page, "Q1", 205.0, 466.0);
        put(&mut page, "Q2", 305.0, 466.0);

        let detector = LatticeDetector::new();
        let grids = detector.find_grids(&page);
        assert_eq!(grids.len(), 1);
        assert!(grids[0].to_html().contains("colspan=\"2\""));

        let tables = detector.detect(&page);
        assert_eq!(tables[0].rows[0][1], CellValue::text("Quarter"));
        assert_eq!(tables[0].rows[0][2], CellValue::text("Quarter"));
    }

    #[test]
    fn test_rowspan_from_missing_border() {
        // First column merges the two data rows
        let mut page = Page::letter(1);
        page.add_rule(RulingLine::horizontal(500.0, 100.0, 300.0));
        page.add_rule(RulingLine::horizontal(480.0, 100.0, 300.0));
        page.add_rule(RulingLine::horizontal(460.0, 200.0, 300.0));
        page.add_rule(RulingLine::horizontal(440.0, 100.0, 300.0));
        for x in [100.0, 200.0, 300.0] {
            page.add_rule(RulingLine::vertical(x, 440.0, 500.0));
        }
        put(&mut page, "Region", 105.0, 486.0);
        put(&mut page, "Sales", 205.0, 486.0);
        put(&mut page, "North", 105.0, 456.0);
        put(&mut page, "10", 205.0, 466.0);
        put(&mut page, "20", 205.0, 446.0);

        let grids = LatticeDetector::new().find_grids(&page);
        assert_eq!(grids.len(), 1);
        let html = grids[0].to_html();
        assert!(html.contains("rowspan=\"2\""));

        let parsed = parse_html_table(&html).unwrap();
        assert_eq!(parsed[1][0], CellValue::text("North"));
        assert_eq!(parsed[2][0], CellValue::text("North"));
        assert_eq!(parsed[2][1], CellValue::text("20"));
    }

    #[test]
    fn test_html_parses_back_to_grid() {
        let page = two_by_three();
        for grid in LatticeDetector::new().find_grids(&page) {
            let parsed = parse_html_table(&grid.to_html()).unwrap();
            let expected: Vec<Vec<CellValue>> = grid
                .slot_texts()
                .iter()
                .map(|r| r.iter().map(|t| CellValue::from_extracted(t)).collect())
                .collect();
            assert_eq!(parsed, expected);
        }
    }

    #[test]
    fn test_multiline_cell_text() {
        let mut page = ruled_page(&[100.0, 200.0, 300.0], &[500.0, 470.0, 450.0]);
        put(&mut page, "Total", 105.0, 488.0);
        put(&mut page, "reve-", 205.0, 488.0);
        put(&mut page, "nue", 205.0, 476.0);
        put(&mut page, "x", 105.0, 456.0);
        put(&mut page, "y", 205.0, 456.0);

        let tables = LatticeDetector::new().detect(&page);
        assert_eq!(tables[0].rows[0][1], CellValue::text("revenue"));
    }

    #[test]
    fn test_grid_without_text_is_dropped() {
        let page = ruled_page(&[100.0, 200.0, 300.0], &[500.0, 480.0, 460.0]);
        assert!(LatticeDetector::new().find_grids(&page).is_empty());
    }

    #[test]
    fn test_rotated_text_is_ignored() {
        let mut page = ruled_page(&[100.0, 200.0, 300.0], &[500.0, 480.0, 460.0]);
        let mut span = TextSpan::new("Sideways", 150.0, 470.0, 10.0);
        span.upright = false;
        page.add_span(span);
        assert!(LatticeDetector::new().find_grids(&page).is_empty());
    }

    #[test]
    fn test_single_column_box_is_not_a_table() {
        let mut page = ruled_page(&[100.0, 400.0], &[500.0, 480.0, 460.0]);
        put(&mut page, "A boxed note", 105.0, 486.0);
        put(&mut page, "continues here", 105.0, 466.0);
        assert!(LatticeDetector::new().find_grids(&page).is_empty());
    }

    #[test]
    fn test_split_rules_are_merged() {
        let mut page = Page::letter(1);
        // Each horizontal rule drawn as two segments
        for y in [500.0, 480.0, 460.0] {
            page.add_rule(RulingLine::horizontal(y, 100.0, 200.0));
            page.add_rule(RulingLine::horizontal(y + 0.5, 200.0, 300.0));
        }
        for x in [100.0, 200.0, 300.0] {
            page.add_rule(RulingLine::vertical(x, 460.0, 500.0));
        }
        put(&mut page, "a", 105.0, 486.0);
        put(&mut page, "b", 205.0, 486.0);
        put(&mut page, "c", 105.0, 466.0);
        put(&mut page, "d", 205.0, 466.0);

        let grids = LatticeDetector::new().find_grids(&page);
        assert_eq!(grids.len(), 1);
        assert_eq!((grids[0].row_count(), grids[0].column_count()), (2, 2));
    }

    #[test]
    fn test_two_tables_in_page_order() {
        let mut page = ruled_page(&[100.0, 200.0, 300.0], &[300.0, 280.0, 260.0]);
        put(&mut page, "lower", 105.0, 286.0);
        put(&mut page, "x", 205.0, 286.0);
        put(&mut page, "1", 105.0, 266.0);
        put(&mut page, "2", 205.0, 266.0);

        let upper = two_by_three();
        for element in upper.elements {
            page.add_element(element);
        }

        let tables = LatticeDetector::new().detect(&page);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].rows[0][0], CellValue::text("Name"));
        assert_eq!(tables[1].rows[0][0], CellValue::text("lower"));
        assert_eq!(tables[1].index_on_page, 1);
    }

    #[test]
    fn test_falls_back_to_text_alignment() {
        let mut page = Page::letter(1);
        for (i, (a, b)) in [("Name", "Age"), ("Alice", "30"), ("Bob", "25"), ("Carol", "41")]
            .iter()
            .enumerate()
        {
            let y = 700.0 - i as f32 * 15.0;
            put(&mut page, a, 72.0, y);
            put(&mut page, b, 200.0, y);
        }

        let tables = LatticeDetector::new().detect(&page);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].row_count(), 4);
    }

    #[test]
    fn test_snap_positions() {
        assert_eq!(snap_positions([10.0, 11.0, 50.0].into_iter(), 2.0), vec![10.5, 50.0]);
    }
}
