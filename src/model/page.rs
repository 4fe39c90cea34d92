//! Page-level types.

use super::CellValue;

/// A single page in the document.
#[derive(Debug, Clone)]
pub struct Page {
    /// Page number (1-indexed)
    pub number: u32,

    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Page rotation in degrees (0, 90, 180, 270)
    pub rotation: u16,

    /// Layout elements in content-stream order
    pub elements: Vec<LayoutElement>,
}

impl Page {
    /// Create a new page with the given dimensions.
    pub fn new(number: u32, width: f32, height: f32) -> Self {
        Self {
            number,
            width,
            height,
            rotation: 0,
            elements: Vec::new(),
        }
    }

    /// Create a new page with standard Letter size (8.5 x 11 inches).
    pub fn letter(number: u32) -> Self {
        Self::new(number, 612.0, 792.0)
    }

    /// Add a layout element.
    pub fn add_element(&mut self, element: LayoutElement) {
        self.elements.push(element);
    }

    /// Add a text span.
    pub fn add_span(&mut self, span: TextSpan) {
        self.elements.push(LayoutElement::Text(span));
    }

    /// Add a ruling line.
    pub fn add_rule(&mut self, rule: RulingLine) {
        self.elements.push(LayoutElement::Rule(rule));
    }

    /// Text spans on the page.
    pub fn spans(&self) -> impl Iterator<Item = &TextSpan> {
        self.elements.iter().filter_map(|e| match e {
            LayoutElement::Text(span) => Some(span),
            _ => None,
        })
    }

    /// Ruling lines on the page.
    pub fn rules(&self) -> impl Iterator<Item = &RulingLine> {
        self.elements.iter().filter_map(|e| match e {
            LayoutElement::Rule(rule) => Some(rule),
            _ => None,
        })
    }

    /// Table regions already attached to the page.
    pub fn table_regions(&self) -> impl Iterator<Item = &TableRegion> {
        self.elements.iter().filter_map(|e| match e {
            LayoutElement::Table(region) => Some(region),
            _ => None,
        })
    }

    /// Whether the page is rotated by a quarter turn.
    pub fn is_landscape_rotated(&self) -> bool {
        self.rotation % 180 == 90
    }

    /// Check if the page has no layout elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// A typed region on a page.
#[derive(Debug, Clone)]
pub enum LayoutElement {
    /// Positioned run of text
    Text(TextSpan),
    /// Straight stroked or filled segment
    Rule(RulingLine),
    /// Detected table region
    Table(TableRegion),
}

/// A text span with position and style information.
#[derive(Debug, Clone)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Width of the text
    pub width: f32,
    /// Font size in points
    pub font_size: f32,
    /// Font name (e.g., "Helvetica-Bold")
    pub font_name: String,
    /// Whether the baseline is horizontal
    pub upright: bool,
}

impl TextSpan {
    /// Create a new upright text span with an estimated width.
    pub fn new(text: impl Into<String>, x: f32, y: f32, font_size: f32) -> Self {
        let text = text.into();
        let width = estimate_width(&text, font_size);
        Self {
            text,
            x,
            y,
            width,
            font_size,
            font_name: String::new(),
            upright: true,
        }
    }

    /// Set the font name.
    pub fn with_font(mut self, font_name: impl Into<String>) -> Self {
        self.font_name = font_name.into();
        self
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Get the bottom Y coordinate (approximate, based on font size).
    pub fn bottom(&self) -> f32 {
        self.y - self.font_size * 0.2
    }

    /// Get the top Y coordinate (approximate, based on font size).
    pub fn top(&self) -> f32 {
        self.y + self.font_size * 0.8
    }

    /// Vertical middle of the glyph box.
    pub fn center_y(&self) -> f32 {
        (self.top() + self.bottom()) / 2.0
    }

    /// Horizontal middle of the span.
    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }
}

/// Estimate rendered width from character count (half an em per glyph).
pub fn estimate_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * 0.5
}

/// Orientation of a ruling line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// An axis-aligned ruling line in page coordinates.
///
/// `start <= end` always holds; `position` is the fixed coordinate
/// (Y for horizontal lines, X for vertical ones).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RulingLine {
    pub orientation: Orientation,
    pub position: f32,
    pub start: f32,
    pub end: f32,
}

impl RulingLine {
    /// Horizontal line at `y` from `x0` to `x1`.
    pub fn horizontal(y: f32, x0: f32, x1: f32) -> Self {
        Self {
            orientation: Orientation::Horizontal,
            position: y,
            start: x0.min(x1),
            end: x0.max(x1),
        }
    }

    /// Vertical line at `x` from `y0` to `y1`.
    pub fn vertical(x: f32, y0: f32, y1: f32) -> Self {
        Self {
            orientation: Orientation::Vertical,
            position: x,
            start: y0.min(y1),
            end: y0.max(y1),
        }
    }

    /// Build a rule from an arbitrary segment; `None` if it is not axis-aligned.
    pub fn from_segment(x0: f32, y0: f32, x1: f32, y1: f32, tolerance: f32) -> Option<Self> {
        if (y0 - y1).abs() <= tolerance && (x0 - x1).abs() > tolerance {
            Some(Self::horizontal((y0 + y1) / 2.0, x0, x1))
        } else if (x0 - x1).abs() <= tolerance && (y0 - y1).abs() > tolerance {
            Some(Self::vertical((x0 + x1) / 2.0, y0, y1))
        } else {
            None
        }
    }

    pub fn is_horizontal(&self) -> bool {
        self.orientation == Orientation::Horizontal
    }

    pub fn length(&self) -> f32 {
        self.end - self.start
    }

    /// Whether `value` lies within the span of the line, with tolerance.
    pub fn covers(&self, value: f32, tolerance: f32) -> bool {
        value >= self.start - tolerance && value <= self.end + tolerance
    }
}

/// Axis-aligned rectangle in PDF coordinates (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl BoundingBox {
    pub fn new(left: f32, bottom: f32, right: f32, top: f32) -> Self {
        Self {
            left: left.min(right),
            bottom: bottom.min(top),
            right: left.max(right),
            top: bottom.max(top),
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    /// Point containment with tolerance.
    pub fn contains(&self, x: f32, y: f32, tolerance: f32) -> bool {
        x >= self.left - tolerance
            && x <= self.right + tolerance
            && y >= self.bottom - tolerance
            && y <= self.top + tolerance
    }
}

/// Content of a detected table region.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionContent {
    /// Rows of cells, top to bottom, left to right
    Grid(Vec<Vec<CellValue>>),
    /// HTML `<table>` serialization
    Html(String),
}

/// A table region found on a page by a detector.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRegion {
    /// Page-local bounding box
    pub bbox: BoundingBox,
    /// Cell content
    pub content: RegionContent,
}

impl TableRegion {
    pub fn grid(bbox: BoundingBox, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            bbox,
            content: RegionContent::Grid(rows),
        }
    }

    pub fn html(bbox: BoundingBox, html: impl Into<String>) -> Self {
        Self {
            bbox,
            content: RegionContent::Html(html.into()),
        }
    }
}
