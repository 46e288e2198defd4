//! Atomic text units: digital spans and OCR words.

use serde::{Deserialize, Serialize};

use super::Rect;

/// Font style of a unit, decoded from font flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Bold,
    BoldItalic,
}

impl FontStyle {
    /// Italic flag bit.
    pub const FLAG_ITALIC: u32 = 1 << 1;
    /// Serif flag bit.
    pub const FLAG_SERIFED: u32 = 1 << 2;
    /// Monospace flag bit.
    pub const FLAG_MONOSPACED: u32 = 1 << 3;
    /// Bold flag bit.
    pub const FLAG_BOLD: u32 = 1 << 4;

    /// Decode span flags into a style. Only the italic and bold bits matter.
    pub fn from_flags(flags: u32) -> Self {
        match (flags & Self::FLAG_ITALIC != 0, flags & Self::FLAG_BOLD != 0) {
            (true, true) => FontStyle::BoldItalic,
            (true, false) => FontStyle::Italic,
            (false, true) => FontStyle::Bold,
            (false, false) => FontStyle::Normal,
        }
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, FontStyle::Normal)
    }

    /// Ordinal used by the heading stack: normal 0, bold-italic 1, italic 2, bold 3.
    pub fn rank(&self) -> u8 {
        match self {
            FontStyle::Normal => 0,
            FontStyle::BoldItalic => 1,
            FontStyle::Italic => 2,
            FontStyle::Bold => 3,
        }
    }
}

/// Position of a unit in the extraction hierarchy of its page.
///
/// Digital spans use `(block, 0, line, span)`, OCR words `(block, paragraph, line, word)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct UnitOrdinal {
    pub block: u32,
    pub paragraph: u32,
    pub line: u32,
    pub index: u32,
}

impl UnitOrdinal {
    pub fn new(block: u32, paragraph: u32, line: u32, index: u32) -> Self {
        Self {
            block,
            paragraph,
            line,
            index,
        }
    }
}

/// A span (digital page) or OCR word (scanned page).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Bounding box in page units
    pub rect: Rect,
    /// Text content
    pub text: String,
    /// Font size in points
    pub size: f32,
    /// Decoded font style
    pub style: FontStyle,
    /// Fill colour as 0xRRGGBB, when known
    pub color: Option<u32>,
    /// Font family name (empty for OCR words)
    pub font: String,
    /// Page-local ordinal
    pub ordinal: UnitOrdinal,
}

impl Unit {
    /// Create a normal-style unit with no font metadata.
    pub fn new(rect: Rect, text: impl Into<String>, size: f32) -> Self {
        Self {
            rect,
            text: text.into(),
            size,
            style: FontStyle::Normal,
            color: None,
            font: String::new(),
            ordinal: UnitOrdinal::default(),
        }
    }

    pub fn with_style(mut self, style: FontStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_font(mut self, font: impl Into<String>) -> Self {
        self.font = font.into();
        self
    }

    pub fn with_ordinal(mut self, ordinal: UnitOrdinal) -> Self {
        self.ordinal = ordinal;
        self
    }

    /// Font size in whole points, used wherever sizes are compared or grouped.
    pub fn size_key(&self) -> i32 {
        size_key(self.size)
    }

    /// True when (style, font, size) match.
    pub fn same_typeface(&self, other: &Unit) -> bool {
        self.style == other.style && self.font == other.font && self.size_key() == other.size_key()
    }
}

/// Truncate a font size to whole points.
pub fn size_key(size: f32) -> i32 {
    size.floor() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_from_flags() {
        assert_eq!(FontStyle::from_flags(0), FontStyle::Normal);
        assert_eq!(FontStyle::from_flags(FontStyle::FLAG_ITALIC), FontStyle::Italic);
        assert_eq!(FontStyle::from_flags(FontStyle::FLAG_BOLD), FontStyle::Bold);
        assert_eq!(
            FontStyle::from_flags(FontStyle::FLAG_BOLD | FontStyle::FLAG_ITALIC),
            FontStyle::BoldItalic
        );
        // serif / monospace bits do not change the style
        assert_eq!(
            FontStyle::from_flags(FontStyle::FLAG_SERIFED | FontStyle::FLAG_MONOSPACED),
            FontStyle::Normal
        );
    }

    #[test]
    fn test_style_rank() {
        assert_eq!(FontStyle::Normal.rank(), 0);
        assert_eq!(FontStyle::BoldItalic.rank(), 1);
        assert_eq!(FontStyle::Italic.rank(), 2);
        assert_eq!(FontStyle::Bold.rank(), 3);
    }

    #[test]
    fn test_same_typeface_uses_whole_points() {
        let a = Unit::new(Rect::default(), "a", 10.0).with_font("Times");
        let b = Unit::new(Rect::default(), "b", 10.5).with_font("Times");
        let c = Unit::new(Rect::default(), "c", 11.0).with_font("Times");
        assert!(a.same_typeface(&b));
        assert!(!a.same_typeface(&c));
        assert!(!a.same_typeface(&b.clone().with_style(FontStyle::Bold)));
    }

    #[test]
    fn test_size_key() {
        assert_eq!(size_key(10.99), 10);
        assert_eq!(size_key(18.0), 18);
    }
}
