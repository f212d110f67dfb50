//! Text drawing collaborator
//!
//! The renderer never rasterizes glyphs itself. Annotation and timing text
//! is handed to a [`TextRenderer`] in window pixel coordinates; when none
//! is supplied the text is simply not drawn.

use crate::rasterizer::Rgba;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub color: Rgba,
    /// Glyph height in pixels
    pub size: f32,
    pub align: TextAlign,
}

impl TextStyle {
    pub fn new(color: Rgba, size: f32) -> Self {
        Self { color, size, align: TextAlign::Left }
    }

    pub fn centered(mut self) -> Self {
        self.align = TextAlign::Center;
        self
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::new(Rgba::WHITE, 14.0)
    }
}

pub trait TextRenderer {
    /// Draw `text` with its baseline-left (or center/right, per the style)
    /// at window pixel `(x, y)`, top-left origin
    fn draw_text(&mut self, x: f32, y: f32, text: &str, style: &TextStyle);

    /// Width and height of `text` in pixels
    fn measure(&self, text: &str, style: &TextStyle) -> (f32, f32) {
        (text.chars().count() as f32 * style.size * 0.6, style.size)
    }
}

/// Keeps every request; used by tests and by hosts that draw text after
/// presenting the frame
#[derive(Debug, Default)]
pub struct RecordedText {
    pub items: Vec<(f32, f32, String, TextStyle)>,
}

impl RecordedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl TextRenderer for RecordedText {
    fn draw_text(&mut self, x: f32, y: f32, text: &str, style: &TextStyle) {
        self.items.push((x, y, text.to_string(), *style));
    }
}
