//! Model-type renderers
//!
//! Each renderer sets up its own camera inside the viewport of the draw
//! context, applies the clip box for its data kind, and emits geometry
//! colored for the current mode.
//!
//! # Module Organization
//!
//! - `surface` - single surface, shared by montage and whole brain
//! - `montage` - left/right surfaces in a 2-column grid
//! - `volume_slice` - axial/coronal/parasagittal slices and the 2x2 grid
//! - `voxel_cubes` - volume drawn as cubes in the whole brain view
//! - `whole_brain` - surfaces, volumes and fibers in one scene
//! - `chart` - line series and histograms
//! - `media` - images and registration control points

pub mod chart;
pub mod media;
pub mod montage;
pub mod surface;
pub mod volume_slice;
pub mod voxel_cubes;
pub mod whole_brain;

use crate::clipping::ClipDataKind;
use crate::dispatch::{DrawContext, DrawMode, Frame};
use crate::model::Structure;
use crate::rasterizer::{mat4_mul, mat4_translation, BlendFunc, GraphicsContext, Vec3, Vertex};

/// Kinds of data with their own opacity blending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Surface,
    VolumeSlice,
    VoxelCubes,
    Fibers,
    Annotation,
    Media,
    Chart,
}

/// Blend function used when a data kind is drawn with opacity below one.
/// Kinds that stack several passes onto an opaque background keep the
/// framebuffer alpha at one.
pub fn blend_for(kind: DataKind) -> BlendFunc {
    match kind {
        DataKind::Surface | DataKind::VoxelCubes | DataKind::Fibers | DataKind::Chart => BlendFunc::TRANSLUCENT,
        DataKind::VolumeSlice | DataKind::Annotation | DataKind::Media => BlendFunc::RGB_ONLY,
    }
}

/// Enable the region's clip planes for `kind` in the current model
/// coordinates. Returns the number of planes enabled.
pub fn apply_clip(frame: &mut Frame, ctx: &DrawContext, kind: ClipDataKind, structure: Structure) -> usize {
    match ctx.clip_group {
        Some(group) => group.apply(frame.gfx, kind, structure),
        None => 0,
    }
}

/// Move geometry `eye_units` toward the viewer so overlays drawn on a
/// surface pass the strict depth test against it
pub fn lift_toward_viewer(gfx: &mut GraphicsContext, eye_units: f32) {
    // Sign of the projection's z row tells which way is near
    let toward = -gfx.projection()[2][2].signum();
    let lift = mat4_translation(Vec3::new(0.0, 0.0, toward * eye_units));
    let mv = mat4_mul(&lift, &gfx.modelview());
    gfx.load_matrix(mv);
}

/// Outline of the clip box for `structure`, drawing mode only
pub fn draw_clip_box(frame: &mut Frame, ctx: &DrawContext, structure: Structure) {
    let Some(group) = ctx.clip_group else {
        return;
    };
    if ctx.mode != DrawMode::Drawing || !group.enabled || !group.display_box {
        return;
    }
    let corners = group.box_corners(structure);
    let color = ctx.colors.foreground;
    let mut f = frame.save_state();
    f.gfx.disable_clip_planes();
    f.gfx.set_lighting(false);
    // Corners are indexed by bit: 1 = +x, 2 = +y, 4 = +z
    for a in 0..8usize {
        for bit in [1usize, 2, 4] {
            let b = a | bit;
            if b != a {
                f.gfx.draw_line(Vertex::new(corners[a], color), Vertex::new(corners[b], color));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipping::ClipPlaneGroup;
    use crate::picking::SelectionEncoder;
    use crate::rasterizer::{mat4_ortho, mat4_transform_point, Viewport};

    #[test]
    fn test_blend_table() {
        assert_eq!(blend_for(DataKind::Surface), BlendFunc::TRANSLUCENT);
        assert_eq!(blend_for(DataKind::VolumeSlice), BlendFunc::RGB_ONLY);
        assert_eq!(blend_for(DataKind::Media), BlendFunc::RGB_ONLY);
        assert_eq!(blend_for(DataKind::Fibers), BlendFunc::TRANSLUCENT);
    }

    #[test]
    fn test_lift_moves_toward_viewer_in_both_projections() {
        let mut gfx = GraphicsContext::new(10, 10);
        for (near, far) in [(-100.0, 100.0), (100.0, -100.0)] {
            gfx.set_projection(mat4_ortho(-5.0, 5.0, -5.0, 5.0, near, far));
            gfx.load_identity();
            let before = gfx.project(Vec3::ZERO).unwrap().z;
            lift_toward_viewer(&mut gfx, 1.0);
            let after = gfx.project(Vec3::ZERO).unwrap().z;
            assert!(after < before);
        }
    }

    #[test]
    fn test_clip_box_has_twelve_edges() {
        let mut gfx = GraphicsContext::new(10, 10);
        let mut encoder = SelectionEncoder::new();
        let group = ClipPlaneGroup { enabled: true, display_box: true, x_axis: true, ..ClipPlaneGroup::default() };
        let mut ctx = DrawContext::new(DrawMode::Drawing, 0, Some(0), Viewport::new(0, 0, 10, 10));
        ctx.clip_group = Some(&group);
        let mut frame = Frame::new(&mut gfx, &mut encoder);
        draw_clip_box(&mut frame, &ctx, Structure::CortexRight);
        assert_eq!(frame.gfx.stats().lines, 12);
        assert_eq!(mat4_transform_point(&frame.gfx.modelview(), Vec3::X), Vec3::X);
    }
}
