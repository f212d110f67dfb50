//! Core types for the rasterizer

use serde::{Deserialize, Serialize};

// =============================================================================
// Color
// =============================================================================

/// Floating point RGBA color, each channel in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Rgba {
    fn default() -> Self {
        Rgba::BLACK
    }
}

impl Rgba {
    pub const BLACK: Rgba = Rgba { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const WHITE: Rgba = Rgba { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    pub const RED: Rgba = Rgba { r: 1.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const GREEN: Rgba = Rgba { r: 0.0, g: 1.0, b: 0.0, a: 1.0 };
    pub const BLUE: Rgba = Rgba { r: 0.0, g: 0.0, b: 1.0, a: 1.0 };
    pub const TRANSPARENT: Rgba = Rgba { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self {
            r: bytes[0] as f32 / 255.0,
            g: bytes[1] as f32 / 255.0,
            b: bytes[2] as f32 / 255.0,
            a: bytes[3] as f32 / 255.0,
        }
    }

    /// Exact for colors that came from 8-bit values
    pub fn from_rgb8(rgb: [u8; 3]) -> Self {
        Self::from_bytes([rgb[0], rgb[1], rgb[2], 255])
    }

    pub fn to_bytes(self) -> [u8; 4] {
        [
            channel_to_byte(self.r),
            channel_to_byte(self.g),
            channel_to_byte(self.b),
            channel_to_byte(self.a),
        ]
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Scale RGB by intensity, alpha untouched
    pub fn shade(self, intensity: f32) -> Self {
        let i = intensity.clamp(0.0, 1.0);
        Self {
            r: self.r * i,
            g: self.g * i,
            b: self.b * i,
            a: self.a,
        }
    }

    /// Interpolate all four channels
    pub fn lerp(self, other: Rgba, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let inv_t = 1.0 - t;
        Self {
            r: self.r * inv_t + other.r * t,
            g: self.g * inv_t + other.g * t,
            b: self.b * inv_t + other.b * t,
            a: self.a * inv_t + other.a * t,
        }
    }

    /// Perceived brightness, used to pick contrasting hatch lines
    pub fn luminance(self) -> f32 {
        0.299 * self.r + 0.587 * self.g + 0.114 * self.b
    }
}

fn channel_to_byte(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

// =============================================================================
// Blending
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

impl BlendFactor {
    fn weight(self, src_alpha: f32) -> f32 {
        match self {
            BlendFactor::Zero => 0.0,
            BlendFactor::One => 1.0,
            BlendFactor::SrcAlpha => src_alpha,
            BlendFactor::OneMinusSrcAlpha => 1.0 - src_alpha,
        }
    }
}

/// Separate color/alpha blend function (glBlendFuncSeparate)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendFunc {
    pub src_rgb: BlendFactor,
    pub dst_rgb: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
}

impl BlendFunc {
    /// Classic alpha blending on all four channels
    pub const TRANSLUCENT: BlendFunc = BlendFunc {
        src_rgb: BlendFactor::SrcAlpha,
        dst_rgb: BlendFactor::OneMinusSrcAlpha,
        src_alpha: BlendFactor::SrcAlpha,
        dst_alpha: BlendFactor::OneMinusSrcAlpha,
    };

    /// Blends color but keeps destination alpha at one when the
    /// destination is opaque, so overlapping passes do not compound
    pub const RGB_ONLY: BlendFunc = BlendFunc {
        src_rgb: BlendFactor::SrcAlpha,
        dst_rgb: BlendFactor::OneMinusSrcAlpha,
        src_alpha: BlendFactor::One,
        dst_alpha: BlendFactor::OneMinusSrcAlpha,
    };

    pub fn apply(self, src: Rgba, dst: Rgba) -> Rgba {
        let sa = src.a;
        let s_rgb = self.src_rgb.weight(sa);
        let d_rgb = self.dst_rgb.weight(sa);
        let s_a = self.src_alpha.weight(sa);
        let d_a = self.dst_alpha.weight(sa);
        Rgba {
            r: (src.r * s_rgb + dst.r * d_rgb).min(1.0),
            g: (src.g * s_rgb + dst.g * d_rgb).min(1.0),
            b: (src.b * s_rgb + dst.b * d_rgb).min(1.0),
            a: (src.a * s_a + dst.a * d_a).min(1.0),
        }
    }
}

/// Shade model for triangle color interpolation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadeModel {
    /// Provoking (last) vertex color for the whole primitive
    Flat,
    /// Gouraud interpolation of vertex colors
    Smooth,
}

// =============================================================================
// Viewport
// =============================================================================

/// Pixel rectangle in window coordinates (top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    pub fn intersects(&self, other: &Viewport) -> bool {
        self.x < other.right() && other.x < self.right() && self.y < other.bottom() && other.y < self.bottom()
    }

    /// Overlap of two rectangles, empty rectangles yield `None`
    pub fn intersection(&self, other: &Viewport) -> Option<Viewport> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Viewport::new(x0, y0, x1 - x0, y1 - y0))
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height <= 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }

    /// Split into a grid; cells are returned row by row from the top-left
    pub fn grid(&self, columns: i32, rows: i32) -> Vec<Viewport> {
        let mut cells = Vec::with_capacity((columns * rows).max(0) as usize);
        if columns <= 0 || rows <= 0 {
            return cells;
        }
        let w = self.width / columns;
        let h = self.height / rows;
        for r in 0..rows {
            for c in 0..columns {
                cells.push(Viewport::new(self.x + c * w, self.y + r * h, w, h));
            }
        }
        cells
    }

    /// Shrink by `amount` pixels on every side
    pub fn inset(&self, amount: i32) -> Viewport {
        Viewport::new(
            self.x + amount,
            self.y + amount,
            (self.width - amount * 2).max(0),
            (self.height - amount * 2).max(0),
        )
    }
}

// =============================================================================
// Texture
// =============================================================================

/// RGBA8 image sampled with nearest filtering
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    /// Row-major RGBA, row 0 at the top
    pub pixels: Vec<[u8; 4]>,
    pub name: String,
}

impl Texture {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![[255, 255, 255, 255]; width * height],
            name: String::new(),
        }
    }

    pub fn from_rgba(name: impl Into<String>, width: usize, height: usize, pixels: Vec<[u8; 4]>) -> Option<Self> {
        if pixels.len() != width * height {
            return None;
        }
        Some(Self { width, height, pixels, name: name.into() })
    }

    /// Load from an image file (any format enabled on the `image` crate)
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let img = image::open(path)
            .map_err(|e| format!("Failed to load {}: {}", path.display(), e))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let pixels = rgba.pixels().map(|p| p.0).collect();
        Ok(Self {
            width: width as usize,
            height: height as usize,
            pixels,
            name: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        })
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    /// Nearest sample, u/v in 0..1 with v = 0 at the top row
    pub fn sample(&self, u: f32, v: f32) -> Rgba {
        if self.width == 0 || self.height == 0 {
            return Rgba::TRANSPARENT;
        }
        let tx = ((u * self.width as f32).floor() as i64).clamp(0, self.width as i64 - 1) as usize;
        let ty = ((v * self.height as f32).floor() as i64).clamp(0, self.height as i64 - 1) as usize;
        Rgba::from_bytes(self.pixels[ty * self.width + tx])
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Primitive counters since the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub triangles: usize,
    pub lines: usize,
    pub points: usize,
}

impl DrawStats {
    pub fn accumulate(&mut self, other: &DrawStats) {
        self.triangles += other.triangles;
        self.lines += other.lines;
        self.points += other.points;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb8_round_trip_is_exact() {
        for v in [0u8, 1, 127, 128, 254, 255] {
            let c = Rgba::from_rgb8([v, 255 - v, v / 2]);
            assert_eq!(c.to_bytes(), [v, 255 - v, v / 2, 255]);
        }
    }

    #[test]
    fn test_rgb_only_blend_keeps_opaque_destination() {
        let dst = Rgba::rgb(0.0, 0.0, 1.0);
        let src = Rgba::new(1.0, 0.0, 0.0, 0.5);
        let out = BlendFunc::RGB_ONLY.apply(src, dst);
        assert!((out.r - 0.5).abs() < 1.0e-6);
        assert!((out.b - 0.5).abs() < 1.0e-6);
        assert_eq!(out.a, 1.0);

        let translucent = BlendFunc::TRANSLUCENT.apply(src, dst);
        assert!(translucent.a < 1.0);
    }

    #[test]
    fn test_viewport_intersection() {
        let a = Viewport::new(0, 0, 100, 100);
        let b = Viewport::new(50, 80, 100, 100);
        assert_eq!(a.intersection(&b), Some(Viewport::new(50, 80, 50, 20)));
        assert_eq!(a.intersection(&Viewport::new(100, 0, 10, 10)), None);
    }

    #[test]
    fn test_viewport_grid() {
        let cells = Viewport::new(10, 20, 200, 100).grid(2, 2);
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0], Viewport::new(10, 20, 100, 50));
        assert_eq!(cells[3], Viewport::new(110, 70, 100, 50));
    }

    #[test]
    fn test_texture_sample_clamps() {
        let tex = Texture::from_rgba("t", 2, 1, vec![[255, 0, 0, 255], [0, 255, 0, 255]]).unwrap();
        assert_eq!(tex.sample(0.1, 0.5), Rgba::RED);
        assert_eq!(tex.sample(1.5, 0.5).to_bytes(), [0, 255, 0, 255]);
    }
}
