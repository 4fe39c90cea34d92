//! Content stream interpretation.
//!
//! Walks a page's operators once and produces the two kinds of layout
//! elements the detectors need: positioned text spans and axis-aligned
//! ruling lines (stroked segments, rectangle edges and thin filled bars).

use std::collections::HashMap;

use crate::error::Result;
use crate::model::{estimate_width, Page, RulingLine, TextSpan};

use super::backend::{ContentOp, PageId, PdfBackend, PdfValue};

/// Tolerances for turning paths into ruling lines.
#[derive(Debug, Clone, Copy)]
pub struct LayoutConfig {
    /// Maximum deviation from axis-aligned for a segment to count as a rule
    pub rule_tolerance: f32,
    /// Filled rectangles thinner than this become a single rule
    pub max_rule_thickness: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            rule_tolerance: 1.0,
            max_rule_thickness: 2.0,
        }
    }
}

/// Extracts layout elements for pages of one backend.
pub struct LayoutExtractor<'a, B: PdfBackend + ?Sized> {
    backend: &'a B,
    config: LayoutConfig,
}

impl<'a, B: PdfBackend + ?Sized> LayoutExtractor<'a, B> {
    /// Create a new layout extractor.
    pub fn new(backend: &'a B, config: LayoutConfig) -> Self {
        Self { backend, config }
    }

    /// Build a [`Page`] with all text spans and ruling lines.
    pub fn extract_page(&self, page_num: u32, page_id: PageId) -> Result<Page> {
        let geometry = self.backend.page_geometry(page_id);
        let mut page = Page::new(page_num, geometry.width, geometry.height);
        page.rotation = geometry.rotation;

        let content = self.backend.page_content(page_id)?;
        let ops = self.backend.decode_content(&content)?;

        let fonts: HashMap<Vec<u8>, String> = self
            .backend
            .page_fonts(page_id)
            .map(|fonts| fonts.into_iter().map(|f| (f.name, f.base_font)).collect())
            .unwrap_or_default();

        let (spans, rules) = self.interpret(page_id, &ops, &fonts);
        log::debug!(
            "Layout: page {} has {} spans and {} rules",
            page_num,
            spans.len(),
            rules.len()
        );

        for span in spans {
            page.add_span(span);
        }
        for rule in rules {
            page.add_rule(rule);
        }
        Ok(page)
    }

    /// Interpret decoded operators.
    pub fn interpret(
        &self,
        page_id: PageId,
        ops: &[ContentOp],
        fonts: &HashMap<Vec<u8>, String>,
    ) -> (Vec<TextSpan>, Vec<RulingLine>) {
        let mut state = GraphicsState::default();
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut text = TextState::default();
        let mut path = PathBuilder::default();

        let mut spans = Vec::new();
        let mut rules = Vec::new();

        for op in ops {
            match op.operator.as_str() {
                // Graphics state
                "q" => stack.push(state.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        state = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix_operands(op) {
                        state.ctm = m.multiply(&state.ctm);
                    }
                }

                // Path construction (coordinates are transformed immediately;
                // `cm` cannot appear inside a path object)
                "m" => {
                    if let (Some(x), Some(y)) = (op.number(0), op.number(1)) {
                        path.move_to(state.ctm.apply(x, y));
                    }
                }
                "l" => {
                    if let (Some(x), Some(y)) = (op.number(0), op.number(1)) {
                        path.line_to(state.ctm.apply(x, y));
                    }
                }
                "c" | "v" | "y" => {
                    // Curves are never table rules; keep the current point honest.
                    let n = op.operands.len();
                    if n >= 2 {
                        if let (Some(x), Some(y)) = (op.number(n - 2), op.number(n - 1)) {
                            path.jump_to(state.ctm.apply(x, y));
                        }
                    }
                }
                "h" => path.close(),
                "re" => {
                    if let (Some(x), Some(y), Some(w), Some(h)) =
                        (op.number(0), op.number(1), op.number(2), op.number(3))
                    {
                        path.rect(
                            state.ctm.apply(x, y),
                            state.ctm.apply(x + w, y),
                            state.ctm.apply(x + w, y + h),
                            state.ctm.apply(x, y + h),
                        );
                    }
                }

                // Path painting
                "S" => {
                    path.stroke_into(&mut rules, &self.config);
                    path.clear();
                }
                "s" => {
                    path.close();
                    path.stroke_into(&mut rules, &self.config);
                    path.clear();
                }
                "f" | "F" | "f*" => {
                    path.fill_into(&mut rules, &self.config);
                    path.clear();
                }
                "B" | "B*" | "b" | "b*" => {
                    if op.operator.starts_with('b') {
                        path.close();
                    }
                    path.stroke_into(&mut rules, &self.config);
                    path.fill_into(&mut rules, &self.config);
                    path.clear();
                }
                "n" => path.clear(),

                // Text objects
                "BT" => {
                    text.matrix = Matrix::IDENTITY;
                    text.line_matrix = Matrix::IDENTITY;
                }
                "ET" => {}
                "Tf" => {
                    if let Some(PdfValue::Name(name)) = op.operands.first() {
                        text.font_resource = name.clone();
                        text.font_name = fonts
                            .get(name)
                            .cloned()
                            .unwrap_or_else(|| String::from_utf8_lossy(name).to_string());
                    }
                    text.font_size = op.number(1).unwrap_or(12.0);
                }
                "TL" => text.leading = op.number(0).unwrap_or(0.0),
                "Td" => {
                    if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                        text.move_line(tx, ty);
                    }
                }
                "TD" => {
                    if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                        text.leading = -ty;
                        text.move_line(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(m) = matrix_operands(op) {
                        text.matrix = m;
                        text.line_matrix = m;
                    }
                }
                "T*" => text.next_line(),
                "Tj" | "TJ" | "'" | "\"" => {
                    if op.operator == "'" || op.operator == "\"" {
                        text.next_line();
                    }
                    let shown = self.shown_text(page_id, &text.font_resource, op);
                    if let Some(span) = text.show(&shown, &state.ctm) {
                        spans.push(span);
                    }
                }
                _ => {}
            }
        }

        (spans, rules)
    }

    /// Decode the string operand(s) of a text-showing operator.
    fn shown_text(&self, page_id: PageId, font: &[u8], op: &ContentOp) -> String {
        match op.operator.as_str() {
            "TJ" => {
                let Some(PdfValue::Array(items)) = op.operands.first() else {
                    return String::new();
                };
                // Kerning adjustments are in 1/1000 text space units;
                // large negative values are word gaps.
                let space_threshold = 200.0;
                let mut combined = String::new();
                for item in items {
                    match item {
                        PdfValue::Str(bytes) => {
                            combined.push_str(&self.backend.decode_text(page_id, font, bytes));
                        }
                        PdfValue::Integer(_) | PdfValue::Real(_) => {
                            let adjustment = -super::backend::get_number_from_value(item)
                                .unwrap_or(0.0);
                            if adjustment > space_threshold
                                && !combined.is_empty()
                                && !combined.ends_with(' ')
                                && !combined.ends_with('\u{00A0}')
                            {
                                if let Some(c) = combined.chars().last() {
                                    if !is_spaceless_script_char(c) {
                                        combined.push(' ');
                                    }
                                }
                            }
                        }
                        _ => {}
                    }
                }
                combined
            }
            _ => {
                let idx = if op.operator == "\"" { 2 } else { 0 };
                match op.operands.get(idx) {
                    Some(PdfValue::Str(bytes)) => self.backend.decode_text(page_id, font, bytes),
                    _ => String::new(),
                }
            }
        }
    }
}

/// 2D affine matrix `[a b c d e f]` as used by PDF.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn translation(tx: f32, ty: f32) -> Self {
        Matrix {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    /// `self × other` (apply `self` first, then `other`).
    fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Vertical scale factor.
    fn scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    fn is_upright(&self) -> bool {
        self.b.abs() < 1e-3 && self.c.abs() < 1e-3 && self.a > 0.0 && self.d > 0.0
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn matrix_operands(op: &ContentOp) -> Option<Matrix> {
    Some(Matrix {
        a: op.number(0)?,
        b: op.number(1)?,
        c: op.number(2)?,
        d: op.number(3)?,
        e: op.number(4)?,
        f: op.number(5)?,
    })
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
}

#[derive(Debug, Clone)]
struct TextState {
    matrix: Matrix,
    line_matrix: Matrix,
    font_resource: Vec<u8>,
    font_name: String,
    font_size: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            font_resource: Vec::new(),
            font_name: String::new(),
            font_size: 12.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).multiply(&self.line_matrix);
        self.matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        // Fall back to the font size when no leading was set.
        let leading = if self.leading != 0.0 {
            self.leading
        } else {
            self.font_size
        };
        self.move_line(0.0, -leading);
    }

    /// Emit a span for shown text and advance the text matrix past it.
    fn show(&mut self, text: &str, ctm: &Matrix) -> Option<TextSpan> {
        let advance = estimate_width(text, self.font_size);
        let device = self.matrix.multiply(ctm);
        self.matrix = Matrix::translation(advance, 0.0).multiply(&self.matrix);

        if text.trim().is_empty() {
            return None;
        }

        let (x, y) = device.apply(0.0, 0.0);
        let effective_size = self.font_size * device.scale();
        let mut span = TextSpan::new(text, x, y, effective_size).with_font(self.font_name.clone());
        span.upright = device.is_upright();
        Some(span)
    }
}

/// Accumulates the current path in device space.
#[derive(Debug, Default)]
struct PathBuilder {
    segments: Vec<((f32, f32), (f32, f32))>,
    rects: Vec<[(f32, f32); 4]>,
    current: Option<(f32, f32)>,
    subpath_start: Option<(f32, f32)>,
}

impl PathBuilder {
    fn move_to(&mut self, p: (f32, f32)) {
        self.current = Some(p);
        self.subpath_start = Some(p);
    }

    fn jump_to(&mut self, p: (f32, f32)) {
        self.current = Some(p);
    }

    fn line_to(&mut self, p: (f32, f32)) {
        if let Some(from) = self.current {
            self.segments.push((from, p));
        }
        self.current = Some(p);
    }

    fn close(&mut self) {
        if let (Some(from), Some(start)) = (self.current, self.subpath_start) {
            if from != start {
                self.segments.push((from, start));
            }
            self.current = Some(start);
        }
    }

    fn rect(&mut self, p0: (f32, f32), p1: (f32, f32), p2: (f32, f32), p3: (f32, f32)) {
        self.rects.push([p0, p1, p2, p3]);
        self.current = Some(p0);
        self.subpath_start = Some(p0);
    }

    fn stroke_into(&self, rules: &mut Vec<RulingLine>, config: &LayoutConfig) {
        let tol = config.rule_tolerance;
        for &((x0, y0), (x1, y1)) in &self.segments {
            if let Some(rule) = RulingLine::from_segment(x0, y0, x1, y1, tol) {
                rules.push(rule);
            }
        }
        for corners in &self.rects {
            push_rect_edges(corners, rules, tol);
        }
    }

    fn fill_into(&self, rules: &mut Vec<RulingLine>, config: &LayoutConfig) {
        for corners in &self.rects {
            let xs = corners.iter().map(|p| p.0);
            let ys = corners.iter().map(|p| p.1);
            let (left, right) = min_max(xs);
            let (bottom, top) = min_max(ys);
            let (w, h) = (right - left, top - bottom);

            if h <= config.max_rule_thickness && w > h {
                rules.push(RulingLine::horizontal((top + bottom) / 2.0, left, right));
            } else if w <= config.max_rule_thickness && h > w {
                rules.push(RulingLine::vertical((left + right) / 2.0, bottom, top));
            } else {
                // Shaded cells and boxes bound their cells with their edges.
                push_rect_edges(corners, rules, config.rule_tolerance);
            }
        }
    }

    fn clear(&mut self) {
        self.segments.clear();
        self.rects.clear();
        self.current = None;
        self.subpath_start = None;
    }
}

fn push_rect_edges(corners: &[(f32, f32); 4], rules: &mut Vec<RulingLine>, tol: f32) {
    for i in 0..4 {
        let (x0, y0) = corners[i];
        let (x1, y1) = corners[(i + 1) % 4];
        if let Some(rule) = RulingLine::from_segment(x0, y0, x1, y1, tol) {
            rules.push(rule);
        }
    }
}

fn min_max(values: impl Iterator<Item = f32>) -> (f32, f32) {
    values.fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and extensions
    (0x4E00..=0x9FFF).contains(&code)
        || (0x3400..=0x4DBF).contains(&code)
        || (0x20000..=0x2EBEF).contains(&code)
        // Hiragana, Katakana
        || (0x3040..=0x30FF).contains(&code)
        // CJK Symbols and Punctuation
        || (0x3000..=0x303F).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{Metadata, Orientation};
    use crate::parser::backend::{decode_text_simple, BackendFontInfo, PageGeometry};
    use std::collections::BTreeMap;

    /// Backend that serves pre-decoded operators for a single page.
    struct OpsBackend {
        ops: Vec<ContentOp>,
    }

    impl PdfBackend for OpsBackend {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            BTreeMap::from([(1, (1, 0))])
        }
        fn metadata(&self) -> Metadata {
            Metadata::with_version("1.4")
        }
        fn page_geometry(&self, _page: PageId) -> PageGeometry {
            PageGeometry::default()
        }
        fn page_fonts(&self, _page: PageId) -> Result<Vec<BackendFontInfo>> {
            Ok(vec![BackendFontInfo {
                name: b"F1".to_vec(),
                base_font: "Helvetica".to_string(),
            }])
        }
        fn page_content(&self, _page: PageId) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
        fn decode_content(&self, _data: &[u8]) -> Result<Vec<ContentOp>> {
            Ok(self.ops.clone())
        }
        fn decode_text(&self, _page: PageId, _font: &[u8], bytes: &[u8]) -> String {
            decode_text_simple(bytes)
        }
    }

    fn num(v: f32) -> PdfValue {
        PdfValue::Real(v)
    }

    fn op(operator: &str, operands: Vec<PdfValue>) -> ContentOp {
        ContentOp::new(operator, operands)
    }

    fn text_at(x: f32, y: f32, s: &str) -> Vec<ContentOp> {
        vec![
            op("BT", vec![]),
            op("Tf", vec![PdfValue::Name(b"F1".to_vec()), num(10.0)]),
            op("Td", vec![num(x), num(y)]),
            op("Tj", vec![PdfValue::Str(s.as_bytes().to_vec())]),
            op("ET", vec![]),
        ]
    }

    fn extract(ops: Vec<ContentOp>) -> Page {
        let backend = OpsBackend { ops };
        LayoutExtractor::new(&backend, LayoutConfig::default())
            .extract_page(1, (1, 0))
            .unwrap()
    }

    #[test]
    fn test_text_span_position_and_font() {
        let page = extract(text_at(72.0, 700.0, "Revenue"));
        let spans: Vec<_> = page.spans().collect();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Revenue");
        assert_eq!(spans[0].x, 72.0);
        assert_eq!(spans[0].y, 700.0);
        assert_eq!(spans[0].font_size, 10.0);
        assert_eq!(spans[0].font_name, "Helvetica");
        assert!(spans[0].upright);
    }

    #[test]
    fn test_cm_translates_text() {
        let mut ops = vec![op(
            "cm",
            vec![num(1.0), num(0.0), num(0.0), num(1.0), num(10.0), num(20.0)],
        )];
        ops.extend(text_at(100.0, 100.0, "A"));
        let page = extract(ops);
        let span = page.spans().next().unwrap();
        assert_eq!((span.x, span.y), (110.0, 120.0));
    }

    #[test]
    fn test_rotated_text_is_not_upright() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![PdfValue::Name(b"F1".to_vec()), num(10.0)]),
            op(
                "Tm",
                vec![num(0.0), num(1.0), num(-1.0), num(0.0), num(300.0), num(100.0)],
            ),
            op("Tj", vec![PdfValue::Str(b"Sideways".to_vec())]),
            op("ET", vec![]),
        ];
        let page = extract(ops);
        assert!(!page.spans().next().unwrap().upright);
    }

    #[test]
    fn test_tj_array_inserts_word_space() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![PdfValue::Name(b"F1".to_vec()), num(10.0)]),
            op(
                "TJ",
                vec![PdfValue::Array(vec![
                    PdfValue::Str(b"Net".to_vec()),
                    PdfValue::Integer(-300),
                    PdfValue::Str(b"income".to_vec()),
                ])],
            ),
            op("ET", vec![]),
        ];
        let page = extract(ops);
        assert_eq!(page.spans().next().unwrap().text, "Net income");
    }

    #[test]
    fn test_consecutive_tj_advance() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![PdfValue::Name(b"F1".to_vec()), num(10.0)]),
            op("Tj", vec![PdfValue::Str(b"abcd".to_vec())]),
            op("Tj", vec![PdfValue::Str(b"ef".to_vec())]),
            op("ET", vec![]),
        ];
        let page = extract(ops);
        let xs: Vec<f32> = page.spans().map(|s| s.x).collect();
        assert_eq!(xs, vec![0.0, 20.0]);
    }

    #[test]
    fn test_stroked_rect_yields_four_rules() {
        let ops = vec![
            op("re", vec![num(10.0), num(10.0), num(100.0), num(50.0)]),
            op("S", vec![]),
        ];
        let page = extract(ops);
        let rules: Vec<_> = page.rules().collect();
        assert_eq!(rules.len(), 4);
        assert_eq!(
            rules
                .iter()
                .filter(|r| r.orientation == Orientation::Horizontal)
                .count(),
            2
        );
    }

    #[test]
    fn test_thin_filled_rect_is_single_rule() {
        let ops = vec![
            op("re", vec![num(10.0), num(99.5), num(200.0), num(1.0)]),
            op("f", vec![]),
        ];
        let page = extract(ops);
        let rules: Vec<_> = page.rules().collect();
        assert_eq!(rules.len(), 1);
        assert!(rules[0].is_horizontal());
        assert_eq!(rules[0].position, 100.0);
        assert_eq!((rules[0].start, rules[0].end), (10.0, 210.0));
    }

    #[test]
    fn test_lines_and_discarded_paths() {
        let ops = vec![
            op("m", vec![num(0.0), num(0.0)]),
            op("l", vec![num(0.0), num(100.0)]),
            op("S", vec![]),
            op("m", vec![num(0.0), num(0.0)]),
            op("l", vec![num(100.0), num(0.0)]),
            op("n", vec![]),
            op("m", vec![num(0.0), num(0.0)]),
            op("l", vec![num(50.0), num(50.0)]),
            op("S", vec![]),
        ];
        let page = extract(ops);
        let rules: Vec<_> = page.rules().collect();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].orientation, Orientation::Vertical);
    }

    #[test]
    fn test_graphics_state_restore() {
        let ops = vec![
            op("q", vec![]),
            op(
                "cm",
                vec![num(1.0), num(0.0), num(0.0), num(1.0), num(50.0), num(0.0)],
            ),
            op("Q", vec![]),
            op("m", vec![num(0.0), num(10.0)]),
            op("l", vec![num(100.0), num(10.0)]),
            op("S", vec![]),
        ];
        let page = extract(ops);
        let rule = page.rules().next().unwrap();
        assert_eq!(rule.start, 0.0);
    }

    #[test]
    fn test_content_errors_propagate() {
        struct Broken;
        impl PdfBackend for Broken {
            fn pages(&self) -> BTreeMap<u32, PageId> {
                BTreeMap::new()
            }
            fn metadata(&self) -> Metadata {
                Metadata::default()
            }
            fn page_geometry(&self, _page: PageId) -> PageGeometry {
                PageGeometry::default()
            }
            fn page_fonts(&self, _page: PageId) -> Result<Vec<BackendFontInfo>> {
                Ok(vec![])
            }
            fn page_content(&self, _page: PageId) -> Result<Vec<u8>> {
                Err(Error::UnreadableDocument("no content".into()))
            }
            fn decode_content(&self, _data: &[u8]) -> Result<Vec<ContentOp>> {
                Ok(vec![])
            }
            fn decode_text(&self, _page: PageId, _font: &[u8], _bytes: &[u8]) -> String {
                String::new()
            }
        }

        let result = LayoutExtractor::new(&Broken, LayoutConfig::default()).extract_page(1, (1, 0));
        assert!(result.is_err());
    }
}
