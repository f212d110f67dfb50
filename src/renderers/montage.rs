//! Surface montage: one row per surface in a 2-column grid
//!
//! Left surfaces show the normal view then the mirrored (medial) view,
//! right surfaces the mirrored view first so both lateral views sit on
//! the outside of the grid.

use crate::dispatch::{DrawContext, Frame};
use crate::model::{MontageModel, SurfaceLayer, SurfaceModel};
use crate::rasterizer::Viewport;

use super::surface::draw_surface_model;

/// Cells of the montage with the surface and mirroring drawn in each
pub fn montage_cells<'a>(model: &MontageModel<'a>, viewport: Viewport) -> Vec<(Viewport, SurfaceLayer<'a>, bool)> {
    let rows: Vec<(SurfaceLayer<'a>, [bool; 2])> = [
        model.left.clone().map(|l| (l, [false, true])),
        model.right.clone().map(|r| (r, [true, false])),
    ]
    .into_iter()
    .flatten()
    .collect();
    if rows.is_empty() {
        return Vec::new();
    }

    let grid = viewport.grid(2, rows.len() as i32);
    let mut cells = Vec::with_capacity(grid.len());
    for (row, (layer, mirrored)) in rows.into_iter().enumerate() {
        for (col, m) in mirrored.into_iter().enumerate() {
            if let Some(rect) = grid.get(row * 2 + col) {
                cells.push((*rect, layer.clone(), m));
            }
        }
    }
    cells
}

pub fn draw_montage(frame: &mut Frame, ctx: &DrawContext, model: &MontageModel) {
    for (rect, layer, mirrored) in montage_cells(model, ctx.viewport) {
        if rect.is_empty() || !ctx.wants_viewport(&rect) {
            continue;
        }
        let cell_ctx = ctx.with_viewport(rect);
        let surface = SurfaceModel { layer, view: model.view, mirrored };
        draw_surface_model(frame, &cell_ctx, &surface);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DrawMode;
    use crate::model::{Structure, SurfaceGeometry, SurfaceType, ViewTransform};
    use crate::picking::{PickIndices, SelectionCategory, SelectionEncoder, SelectionManager};
    use crate::rasterizer::{GraphicsContext, Rgba, Vec3};

    fn patch(structure: Structure) -> SurfaceGeometry {
        let mut g = SurfaceGeometry {
            name: format!("{:?}", structure),
            structure,
            surface_type: SurfaceType::Inflated,
            coordinates: vec![
                Vec3::new(-30.0, -30.0, 0.0),
                Vec3::new(30.0, -30.0, 0.0),
                Vec3::new(0.0, 30.0, 0.0),
            ],
            normals: Vec::new(),
            triangles: vec![[0, 1, 2]],
        };
        g.compute_normals();
        g
    }

    #[test]
    fn test_cell_layout_and_mirroring() {
        let left = patch(Structure::CortexLeft);
        let right = patch(Structure::CortexRight);
        let colors = [Rgba::WHITE; 3];
        let model = MontageModel {
            left: Some(SurfaceLayer::new(&left, &colors)),
            right: Some(SurfaceLayer::new(&right, &colors)),
            view: ViewTransform::default(),
        };
        let cells = montage_cells(&model, Viewport::new(0, 0, 200, 100));
        let summary: Vec<(Viewport, Structure, bool)> =
            cells.iter().map(|(r, l, m)| (*r, l.geometry.structure, *m)).collect();
        assert_eq!(
            summary,
            vec![
                (Viewport::new(0, 0, 100, 50), Structure::CortexLeft, false),
                (Viewport::new(100, 0, 100, 50), Structure::CortexLeft, true),
                (Viewport::new(0, 50, 100, 50), Structure::CortexRight, true),
                (Viewport::new(100, 50, 100, 50), Structure::CortexRight, false),
            ]
        );

        let only_right = MontageModel { left: None, ..model };
        assert_eq!(montage_cells(&only_right, Viewport::new(0, 0, 200, 100)).len(), 2);
    }

    #[test]
    fn test_pick_only_draws_cell_under_mouse() {
        let left = patch(Structure::CortexLeft);
        let colors = [Rgba::WHITE; 3];
        let model = MontageModel {
            left: Some(SurfaceLayer::new(&left, &colors)),
            right: None,
            view: ViewTransform::default(),
        };
        let mut gfx = GraphicsContext::new(200, 100);
        let mut encoder = SelectionEncoder::new();
        let mut selection = SelectionManager::new();
        {
            let mut frame = Frame::new(&mut gfx, &mut encoder);
            frame.selection = Some(&mut selection);
            let mut ctx = DrawContext::new(DrawMode::Identification, 0, Some(0), Viewport::new(0, 0, 200, 100));
            // Center of the mirrored cell
            ctx.mouse = (150, 50);
            draw_montage(&mut frame, &ctx, &model);
            assert_eq!(frame.anchors.len(), 1);
        }
        let tri = selection.result(SelectionCategory::SurfaceTriangle).unwrap();
        assert_eq!(tri.indices, PickIndices::one(0));
    }
}
