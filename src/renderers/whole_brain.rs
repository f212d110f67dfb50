//! Whole brain: surfaces, volume slices or cubes and fibers in one scene
//! centered on the stereotaxic origin

use crate::dispatch::{DrawContext, Frame};
use crate::fiber::draw_fibers;
use crate::model::{build_volume_draw_info, Structure, SurfaceLayer, VolumeDrawInfo, WholeBrainModel,
    WholeBrainSeparation, WholeBrainVolumeMode};
use crate::rasterizer::Vec3;
use crate::transform;

use super::surface::draw_surface_layer;
use super::volume_slice::draw_orthogonal_slices;
use super::voxel_cubes::draw_voxel_cubes;
use super::draw_clip_box;

/// Translation that pulls a surface away from the midline. Non-anatomical
/// hemispheres are first moved so their medial edge sits at x = 0.
pub fn surface_offset(layer: &SurfaceLayer, separation: &WholeBrainSeparation) -> Vec3 {
    let g = layer.geometry;
    let bounds = if g.surface_type.is_anatomical() { None } else { g.bounding_box() };
    match g.structure {
        Structure::CortexLeft => {
            let edge = bounds.map_or(0.0, |(_, max)| max.x);
            Vec3::new(-separation.left_right - edge, 0.0, 0.0)
        }
        Structure::CortexRight => {
            let edge = bounds.map_or(0.0, |(min, _)| min.x);
            Vec3::new(separation.left_right - edge, 0.0, 0.0)
        }
        Structure::Cerebellum => Vec3::new(0.0, 0.0, separation.cerebellum),
        Structure::Other => {
            log::warn!("{} is not a left, right or cerebellum surface", g.name);
            Vec3::ZERO
        }
    }
}

pub fn draw_whole_brain(frame: &mut Frame, ctx: &DrawContext, model: &WholeBrainModel) {
    let mut f = frame.save_state();
    transform::setup_orthographic(f.gfx, ctx.viewport, false);
    let m = transform::model_viewing_matrix(model.view.translation, &model.view, Vec3::ZERO);
    f.gfx.load_matrix(m);
    f.record_anchor(None);

    for layer in [&model.left, &model.right, &model.cerebellum].into_iter().flatten() {
        let mut scope = f.push_matrix();
        scope.gfx.translate(surface_offset(layer, &model.separation));
        draw_surface_layer(&mut scope, ctx, layer);
    }

    let infos = build_volume_draw_info(model.overlays);
    let (slices, cubes): (Vec<VolumeDrawInfo>, Vec<VolumeDrawInfo>) =
        infos.into_iter().partition(|i| i.whole_brain_mode == WholeBrainVolumeMode::Slices);
    draw_orthogonal_slices(&mut f, ctx, &slices, &model.slices);
    for info in &cubes {
        draw_voxel_cubes(&mut f, ctx, info);
    }

    if let Some(fibers) = &model.fibers {
        draw_fibers(&mut f, ctx, fibers, None);
    }
    draw_clip_box(&mut f, ctx, Structure::Other);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DrawMode;
    use crate::model::{SliceSelection, SurfaceGeometry, SurfaceType, ViewTransform};
    use crate::picking::{PickIndices, SelectionCategory, SelectionEncoder, SelectionManager};
    use crate::rasterizer::{GraphicsContext, Rgba, Viewport};

    fn hemisphere(structure: Structure, surface_type: SurfaceType, x0: f32) -> SurfaceGeometry {
        let mut g = SurfaceGeometry {
            name: format!("{:?}", structure),
            structure,
            surface_type,
            coordinates: vec![
                Vec3::new(x0, -10.0, 0.0),
                Vec3::new(x0 + 20.0, -10.0, 0.0),
                Vec3::new(x0 + 10.0, 10.0, 0.0),
            ],
            normals: Vec::new(),
            triangles: vec![[0, 1, 2]],
        };
        g.compute_normals();
        g
    }

    #[test]
    fn test_offsets_follow_surface_type() {
        let separation = WholeBrainSeparation { left_right: 5.0, cerebellum: 12.0 };
        let colors = [Rgba::WHITE; 3];

        let inflated = hemisphere(Structure::CortexLeft, SurfaceType::Inflated, -30.0);
        let offset = surface_offset(&SurfaceLayer::new(&inflated, &colors), &separation);
        assert_eq!(offset, Vec3::new(-5.0 + 10.0, 0.0, 0.0));

        let anatomical = hemisphere(Structure::CortexRight, SurfaceType::Anatomical, 10.0);
        let offset = surface_offset(&SurfaceLayer::new(&anatomical, &colors), &separation);
        assert_eq!(offset, Vec3::new(5.0, 0.0, 0.0));

        let flat = hemisphere(Structure::CortexRight, SurfaceType::Flat, 10.0);
        let offset = surface_offset(&SurfaceLayer::new(&flat, &colors), &separation);
        assert_eq!(offset, Vec3::new(5.0 - 10.0, 0.0, 0.0));

        let cerebellum = hemisphere(Structure::Cerebellum, SurfaceType::Inflated, 0.0);
        let offset = surface_offset(&SurfaceLayer::new(&cerebellum, &colors), &separation);
        assert_eq!(offset, Vec3::new(0.0, 0.0, 12.0));
    }

    #[test]
    fn test_pick_separated_hemispheres() {
        let left = hemisphere(Structure::CortexLeft, SurfaceType::Inflated, -20.0);
        let right = hemisphere(Structure::CortexRight, SurfaceType::Inflated, 0.0);
        let colors = [Rgba::WHITE; 3];
        let model = WholeBrainModel {
            left: Some(SurfaceLayer::new(&left, &colors)),
            right: Some(SurfaceLayer::new(&right, &colors)),
            cerebellum: None,
            overlays: &[],
            slices: SliceSelection::default(),
            separation: WholeBrainSeparation { left_right: 10.0, cerebellum: 0.0 },
            view: ViewTransform::default(),
            fibers: None,
        };
        let mut gfx = GraphicsContext::new(180, 180);
        let mut encoder = SelectionEncoder::new();
        let mut selection = SelectionManager::new();
        {
            let mut frame = Frame::new(&mut gfx, &mut encoder);
            frame.selection = Some(&mut selection);
            // One model unit per pixel; the right hemisphere spans x 10..30
            let mut ctx = DrawContext::new(DrawMode::Identification, 0, Some(0), Viewport::new(0, 0, 180, 180));
            ctx.mouse = (110, 95);
            draw_whole_brain(&mut frame, &ctx, &model);
            assert_eq!(frame.anchors.len(), 3);
            assert_eq!(frame.gfx.matrix_depth(), 1);
        }
        let tri = selection.result(SelectionCategory::SurfaceTriangle).unwrap();
        assert_eq!(tri.indices, PickIndices::one(0));
        assert_eq!(tri.structure, Some(Structure::CortexRight));
        let xyz = tri.model_xyz.unwrap();
        // Model coordinates are the surface's own, before separation
        assert!((xyz.x - 10.5).abs() < 1.0e-3);
    }
}
