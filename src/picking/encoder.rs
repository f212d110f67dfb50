//! Color-coded identification
//!
//! Every primitive emitted during an identification pass is drawn with a
//! unique RGB color. Colors are handed out sequentially (id 0 = black) and
//! map straight back to the table index, so decoding is a bit shift and a
//! bounds check. White is reserved for the cleared background.

use crate::rasterizer::{GraphicsContext, Rgba};

use super::selection::SelectionCategory;

/// 8-bit RGB triplet as read back from the framebuffer
pub type Rgb8 = [u8; 3];

/// Clear color for identification passes, never handed out by the encoder
pub const BACKGROUND_PICK_COLOR: Rgb8 = [255, 255, 255];

/// Largest number of entries in one pass (white excluded)
pub const MAX_PICK_ENTRIES: usize = 0xFF_FFFF;

/// One to three indices identifying a primitive within its category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PickIndices {
    pub first: usize,
    pub second: Option<usize>,
    pub third: Option<usize>,
}

impl PickIndices {
    pub fn one(first: usize) -> Self {
        Self { first, second: None, third: None }
    }

    pub fn two(first: usize, second: usize) -> Self {
        Self { first, second: Some(second), third: None }
    }

    pub fn three(first: usize, second: usize, third: usize) -> Self {
        Self { first, second: Some(second), third: Some(third) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickEntry {
    pub category: SelectionCategory,
    pub indices: PickIndices,
}

/// Decoded hit for one category
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub indices: PickIndices,
    /// Normalized depth under the mouse
    pub screen_depth: f32,
}

fn id_to_rgb(id: usize) -> Rgb8 {
    [((id >> 16) & 0xFF) as u8, ((id >> 8) & 0xFF) as u8, (id & 0xFF) as u8]
}

fn rgb_to_id(rgb: Rgb8) -> usize {
    ((rgb[0] as usize) << 16) | ((rgb[1] as usize) << 8) | rgb[2] as usize
}

/// Table of primitives emitted in the current pass
#[derive(Debug, Default)]
pub struct SelectionEncoder {
    entries: Vec<PickEntry>,
    overflowed: bool,
}

impl SelectionEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything from the previous pass
    pub fn begin_pass(&mut self) {
        self.entries.clear();
        self.overflowed = false;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Allocate the next color for a primitive.
    ///
    /// Past capacity every further primitive gets the background color and
    /// is therefore unpickable; the overflow is logged once per pass.
    pub fn encode(&mut self, category: SelectionCategory, indices: PickIndices) -> Rgb8 {
        let id = self.entries.len();
        if id >= MAX_PICK_ENTRIES {
            if !self.overflowed {
                log::warn!("identification table full, {:?} primitives are not pickable", category);
                self.overflowed = true;
            }
            return BACKGROUND_PICK_COLOR;
        }
        self.entries.push(PickEntry { category, indices });
        id_to_rgb(id)
    }

    /// Encoded color as a vertex color
    pub fn encode_color(&mut self, category: SelectionCategory, indices: PickIndices) -> Rgba {
        Rgba::from_rgb8(self.encode(category, indices))
    }

    pub fn decode(&self, rgb: Rgb8) -> Option<&PickEntry> {
        if rgb == BACKGROUND_PICK_COLOR {
            return None;
        }
        self.entries.get(rgb_to_id(rgb))
    }

    /// Decode only if the pixel belongs to `category`
    pub fn decode_category(&self, category: SelectionCategory, rgb: Rgb8) -> Option<PickIndices> {
        self.decode(rgb)
            .filter(|e| e.category == category)
            .map(|e| e.indices)
    }
}

/// Read one pixel color and one depth at the mouse and decode them for
/// `category`. The encoder is reset afterwards whether or not it hit.
pub fn resolve_pick(
    gfx: &GraphicsContext,
    encoder: &mut SelectionEncoder,
    category: SelectionCategory,
    mouse_x: i32,
    mouse_y: i32,
) -> Option<PickHit> {
    let hit = gfx
        .read_pixel(mouse_x, mouse_y)
        .and_then(|rgb| encoder.decode_category(category, rgb))
        .and_then(|indices| {
            gfx.read_depth(mouse_x, mouse_y)
                .map(|screen_depth| PickHit { indices, screen_depth })
        });
    encoder.begin_pass();
    hit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::{mat4_identity, ClearMask, ShadeModel, Vec3, Vertex, Viewport};
    use std::collections::HashSet;

    #[test]
    fn test_encode_decode_bijective() {
        let mut enc = SelectionEncoder::new();
        let mut seen = HashSet::new();
        let mut issued = Vec::new();
        for i in 0..2000 {
            let (cat, idx) = match i % 3 {
                0 => (SelectionCategory::SurfaceTriangle, PickIndices::one(i)),
                1 => (SelectionCategory::Border, PickIndices::two(i, i * 2)),
                _ => (SelectionCategory::Voxel, PickIndices::three(i, i + 1, i + 2)),
            };
            let rgb = enc.encode(cat, idx);
            assert_ne!(rgb, BACKGROUND_PICK_COLOR);
            assert!(seen.insert(rgb), "color reused within a pass");
            issued.push((rgb, cat, idx));
        }
        for (rgb, cat, idx) in issued {
            let entry = enc.decode(rgb).unwrap();
            assert_eq!(entry.category, cat);
            assert_eq!(entry.indices, idx);
        }
    }

    #[test]
    fn test_decode_rejects_background_and_unknown() {
        let mut enc = SelectionEncoder::new();
        enc.encode(SelectionCategory::SurfaceNode, PickIndices::one(4));
        assert!(enc.decode(BACKGROUND_PICK_COLOR).is_none());
        assert!(enc.decode([0, 0, 9]).is_none());
        assert!(enc.decode_category(SelectionCategory::Focus, [0, 0, 0]).is_none());
        assert_eq!(
            enc.decode_category(SelectionCategory::SurfaceNode, [0, 0, 0]),
            Some(PickIndices::one(4))
        );
    }

    #[test]
    fn test_begin_pass_restarts_ids() {
        let mut enc = SelectionEncoder::new();
        let a = enc.encode(SelectionCategory::Focus, PickIndices::one(1));
        enc.begin_pass();
        assert!(enc.is_empty());
        let b = enc.encode(SelectionCategory::Border, PickIndices::one(2));
        assert_eq!(a, b);
        assert_eq!(enc.decode(b).unwrap().category, SelectionCategory::Border);
    }

    #[test]
    fn test_nearest_of_three_triangles_is_picked() {
        let mut gfx = GraphicsContext::new(32, 32);
        gfx.set_viewport(Viewport::new(0, 0, 32, 32));
        // Identity projection: window depth = (z + 1) / 2
        gfx.set_projection(mat4_identity());
        gfx.set_depth_test(true);
        gfx.set_shade_model(ShadeModel::Flat);
        gfx.clear(ClearMask::ALL, Rgba::WHITE);

        let mut enc = SelectionEncoder::new();
        enc.begin_pass();
        for (i, depth) in [0.2f32, 0.5, 0.1].iter().enumerate() {
            let z = depth * 2.0 - 1.0;
            let color = enc.encode_color(SelectionCategory::SurfaceTriangle, PickIndices::one(i));
            gfx.draw_triangle([
                Vertex::new(Vec3::new(-1.0, -1.0, z), color),
                Vertex::new(Vec3::new(1.0, -1.0, z), color),
                Vertex::new(Vec3::new(0.0, 1.0, z), color),
            ]);
        }

        let hit = resolve_pick(&gfx, &mut enc, SelectionCategory::SurfaceTriangle, 16, 16).unwrap();
        assert_eq!(hit.indices.first, 2);
        assert!((hit.screen_depth - 0.1).abs() < 1.0e-5);
        assert!(enc.is_empty());
    }

    #[test]
    fn test_resolve_pick_misses_background() {
        let mut gfx = GraphicsContext::new(8, 8);
        gfx.clear(ClearMask::ALL, Rgba::WHITE);
        let mut enc = SelectionEncoder::new();
        enc.encode(SelectionCategory::SurfaceTriangle, PickIndices::one(0));
        assert!(resolve_pick(&gfx, &mut enc, SelectionCategory::SurfaceTriangle, 3, 3).is_none());
        assert!(enc.is_empty());
    }
}
