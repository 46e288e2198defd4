//! Regions and blocks produced by page segmentation.

use serde::{Deserialize, Serialize};

use super::{FontStyle, Rect, Unit};

/// Label of a raw segmentation region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionLabel {
    Text,
    Figure,
}

/// A connected content area found by morphology and contour analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub rect: Rect,
    /// Page-local sequence number
    pub seq: usize,
    pub label: RegionLabel,
}

impl Region {
    pub fn new(rect: Rect, seq: usize) -> Self {
        Self {
            rect,
            seq,
            label: RegionLabel::Figure,
        }
    }
}

/// Semantic label of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockLabel {
    Text,
    Title,
    Table,
    TableImage,
    Figure,
    Watermark,
    /// Placeholder for pages whose text cannot be read.
    None,
}

impl BlockLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockLabel::Text => "text",
            BlockLabel::Title => "title",
            BlockLabel::Table => "table",
            BlockLabel::TableImage => "table_image",
            BlockLabel::Figure => "figure",
            BlockLabel::Watermark => "watermark",
            BlockLabel::None => "none",
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, BlockLabel::Table | BlockLabel::TableImage)
    }
}

impl std::fmt::Display for BlockLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A labeled content block on a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Union of the member unit rectangles
    pub rect: Rect,
    /// Rectangle after width normalization (equals `rect` until normalized)
    pub norm_rect: Rect,
    pub text: String,
    pub size: f32,
    pub style: FontStyle,
    pub font: String,
    pub color: Option<u32>,
    pub label: BlockLabel,
    /// Page number (1-indexed)
    pub page_no: u32,
    /// Multicolumn segment id
    pub segment: u32,
    /// Reading-order column id
    pub column: u32,
    /// Page-local sequence number
    pub seq: usize,
}

impl Block {
    /// Create a block with default attributes.
    pub fn new(rect: Rect, text: impl Into<String>, label: BlockLabel, page_no: u32) -> Self {
        Self {
            rect,
            norm_rect: rect,
            text: text.into(),
            size: 0.0,
            style: FontStyle::Normal,
            font: String::new(),
            color: None,
            label,
            page_no,
            segment: 0,
            column: 0,
            seq: 0,
        }
    }

    /// Build a block from a run of units: union rect, space-joined text and
    /// the first unit's font attributes. Returns `None` for an empty run.
    pub fn from_units(units: &[Unit], label: BlockLabel, page_no: u32) -> Option<Self> {
        let first = units.first()?;
        let rect = Rect::union_all(units.iter().map(|u| &u.rect))?;
        let text = units
            .iter()
            .map(|u| u.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Some(Self {
            rect,
            norm_rect: rect,
            text,
            size: first.size,
            style: first.style,
            font: first.font.clone(),
            color: first.color,
            label,
            page_no,
            segment: 0,
            column: 0,
            seq: 0,
        })
    }

    pub fn with_style(mut self, style: FontStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn with_font(mut self, font: impl Into<String>) -> Self {
        self.font = font.into();
        self
    }

    pub fn is_title(&self) -> bool {
        self.label == BlockLabel::Title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_units_takes_first_attributes() {
        let units = vec![
            Unit::new(Rect::new(10.0, 10.0, 50.0, 20.0), "Hello", 14.0)
                .with_style(FontStyle::Bold)
                .with_font("Helvetica-Bold"),
            Unit::new(Rect::new(55.0, 12.0, 90.0, 22.0), "world", 12.0),
        ];
        let block = Block::from_units(&units, BlockLabel::Title, 3).unwrap();
        assert_eq!(block.text, "Hello world");
        assert_eq!(block.rect, Rect::new(10.0, 10.0, 90.0, 22.0));
        assert_eq!(block.norm_rect, block.rect);
        assert_eq!(block.size, 14.0);
        assert_eq!(block.style, FontStyle::Bold);
        assert_eq!(block.font, "Helvetica-Bold");
        assert_eq!(block.page_no, 3);
    }

    #[test]
    fn test_from_units_empty() {
        assert!(Block::from_units(&[], BlockLabel::Text, 1).is_none());
    }

    #[test]
    fn test_label_serialization() {
        assert_eq!(
            serde_json::to_string(&BlockLabel::TableImage).unwrap(),
            "\"table_image\""
        );
        assert_eq!(serde_json::to_string(&BlockLabel::None).unwrap(), "\"none\"");
        assert_eq!(BlockLabel::Title.to_string(), "title");
    }
}
