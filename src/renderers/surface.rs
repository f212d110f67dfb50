//! Surface renderer
//!
//! Drawing: lit triangles, links (wireframe over a background fill) or
//! nodes, then borders, foci and normals. Identification: one pass each
//! for triangles, nodes, borders and foci. Projection: triangle pass plus
//! barycentric weights of the mouse within the hit triangle.

use crate::clipping::ClipDataKind;
use crate::dispatch::{DrawContext, DrawMode, Frame};
use crate::model::{SurfaceDrawStyle, SurfaceLayer, SurfaceModel};
use crate::picking::{
    barycentric_weights, BarycentricProjection, NearestVertex, PickIndices, SelectionCategory, SelectionResult,
};
use crate::rasterizer::{Rgba, Vec3, Vertex};
use crate::transform;

use super::{apply_clip, blend_for, draw_clip_box, lift_toward_viewer, DataKind};

/// Depth bias pushing the links background fill behind its wireframe
const LINKS_FILL_DEPTH_OFFSET: f32 = 1.0e-4;
/// Eye units borders and foci are lifted off the surface
const OVERLAY_LIFT: f32 = 0.5;
/// Length of drawn normal vectors in model units
const NORMAL_VECTOR_LENGTH: f32 = 5.0;
/// Point size used for node picking
const NODE_PICK_POINT_SIZE: f32 = 2.0;
/// Point size of the nodes draw style
const NODE_POINT_SIZE: f32 = 2.0;

/// Single surface filling the draw context's viewport
pub fn draw_surface_model(frame: &mut Frame, ctx: &DrawContext, model: &SurfaceModel) {
    let geometry = model.layer.geometry;
    let mut f = frame.save_state();
    transform::setup_orthographic(f.gfx, ctx.viewport, model.mirrored);
    let m = transform::surface_viewing_matrix(
        &model.view,
        geometry.surface_type,
        geometry.structure,
        geometry.center(),
    );
    f.gfx.load_matrix(m);
    draw_surface_layer(&mut f, ctx, &model.layer);
}

/// Draw a surface in the current transform
pub fn draw_surface_layer(frame: &mut Frame, ctx: &DrawContext, layer: &SurfaceLayer) {
    if layer.geometry.node_count() == 0 {
        return;
    }
    frame.record_anchor(Some(layer.geometry.structure));
    match ctx.mode {
        DrawMode::Drawing => draw_visual(frame, ctx, layer),
        DrawMode::Identification => identify(frame, ctx, layer),
        DrawMode::Projection => project(frame, ctx, layer),
    }
}

/// Emit every valid triangle with colors from `color_of(triangle, node)`
fn emit_triangles(frame: &mut Frame, layer: &SurfaceLayer, mut color_of: impl FnMut(&mut Frame, usize, usize) -> Rgba) {
    let g = layer.geometry;
    let mut skipped = 0usize;
    for (t, tri) in g.triangles.iter().enumerate() {
        if !g.is_valid_triangle(tri) {
            skipped += 1;
            continue;
        }
        let v = [
            Vertex::lit(g.coordinates[tri[0]], g.normal(tri[0]), color_of(frame, t, tri[0])),
            Vertex::lit(g.coordinates[tri[1]], g.normal(tri[1]), color_of(frame, t, tri[1])),
            Vertex::lit(g.coordinates[tri[2]], g.normal(tri[2]), color_of(frame, t, tri[2])),
        ];
        frame.gfx.draw_triangle(v);
    }
    if skipped > 0 {
        log::warn!("{}: skipped {} triangles with missing nodes", g.name, skipped);
    }
}

// =============================================================================
// Drawing
// =============================================================================

fn draw_visual(frame: &mut Frame, ctx: &DrawContext, layer: &SurfaceLayer) {
    let g = layer.geometry;
    let mut f = frame.save_state();
    apply_clip(&mut f, ctx, ClipDataKind::Surface, g.structure);
    if layer.opacity < 1.0 {
        f.gfx.set_blend(Some(blend_for(DataKind::Surface)));
    }

    match layer.style {
        SurfaceDrawStyle::Triangles => {
            f.gfx.set_lighting(true);
            emit_triangles(&mut f, layer, |_, _, n| layer.node_color(n));
        }
        SurfaceDrawStyle::Links => {
            // Background fill hides edges on the far side
            let bg = ctx.colors.background;
            f.gfx.set_lighting(false);
            f.gfx.set_polygon_offset(LINKS_FILL_DEPTH_OFFSET);
            emit_triangles(&mut f, layer, |_, _, _| bg);
            f.gfx.set_polygon_offset(0.0);
            f.gfx.set_lighting(true);
            for tri in g.triangles.iter().filter(|t| g.is_valid_triangle(t)) {
                for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                    f.gfx.draw_line(
                        Vertex::lit(g.coordinates[a], g.normal(a), layer.node_color(a)),
                        Vertex::lit(g.coordinates[b], g.normal(b), layer.node_color(b)),
                    );
                }
            }
        }
        SurfaceDrawStyle::Nodes => {
            f.gfx.set_lighting(true);
            f.gfx.set_point_size(NODE_POINT_SIZE);
            for (n, p) in g.coordinates.iter().enumerate() {
                f.gfx.draw_point(Vertex::lit(*p, g.normal(n), layer.node_color(n)));
            }
        }
    }

    // Overlays use point tests instead of hardware planes
    f.gfx.disable_clip_planes();
    f.gfx.set_lighting(false);
    f.gfx.set_blend(None);
    if layer.show_normals {
        draw_normals(&mut f, ctx, layer);
    }
    lift_toward_viewer(f.gfx, OVERLAY_LIFT);
    draw_borders(&mut f, ctx, layer, None);
    draw_foci(&mut f, ctx, layer, None);
    draw_clip_box(&mut f, ctx, g.structure);
}

fn draw_normals(frame: &mut Frame, ctx: &DrawContext, layer: &SurfaceLayer) {
    let g = layer.geometry;
    let color = ctx.colors.foreground;
    for (n, p) in g.coordinates.iter().enumerate() {
        if !ctx.is_inside_clip(ClipDataKind::Surface, g.structure, *p) {
            continue;
        }
        let tip = *p + g.normal(n) * NORMAL_VECTOR_LENGTH;
        frame.gfx.draw_line(Vertex::new(*p, color), Vertex::new(tip, color));
    }
}

/// Borders as polylines. With `pick` set each segment gets its own color.
fn draw_borders(frame: &mut Frame, ctx: &DrawContext, layer: &SurfaceLayer, pick: Option<SelectionCategory>) {
    let g = layer.geometry;
    frame.gfx.set_line_width(layer.border_width.max(1.0));
    for (b, border) in layer.borders.iter().enumerate() {
        let mut nodes: Vec<usize> = border.nodes.clone();
        if border.closed && nodes.len() > 2 {
            nodes.push(nodes[0]);
        }
        for (i, pair) in nodes.windows(2).enumerate() {
            let (Some(pa), Some(pb)) = (g.coordinates.get(pair[0]), g.coordinates.get(pair[1])) else {
                continue;
            };
            if !ctx.is_inside_clip(ClipDataKind::Features, g.structure, *pa)
                || !ctx.is_inside_clip(ClipDataKind::Features, g.structure, *pb)
            {
                continue;
            }
            let color = match pick {
                // Segment i ends at border point i + 1
                Some(category) => frame.encoder.encode_color(category, PickIndices::two(b, (i + 1) % border.nodes.len())),
                None => border.color,
            };
            frame.gfx.draw_line(Vertex::new(*pa, color), Vertex::new(*pb, color));
        }
    }
}

fn draw_foci(frame: &mut Frame, ctx: &DrawContext, layer: &SurfaceLayer, pick: Option<SelectionCategory>) {
    let g = layer.geometry;
    for (i, focus) in layer.foci.iter().enumerate() {
        if !ctx.is_inside_clip(ClipDataKind::Features, g.structure, focus.xyz) {
            continue;
        }
        let size = transform::model_size_to_pixels(frame.gfx, focus.radius * 2.0).max(1.0);
        frame.gfx.set_point_size(size);
        let color = match pick {
            Some(category) => frame.encoder.encode_color(category, PickIndices::one(i)),
            None => focus.color,
        };
        frame.gfx.draw_point(Vertex::new(focus.xyz, color));
    }
}

// =============================================================================
// Identification
// =============================================================================

fn identify(frame: &mut Frame, ctx: &DrawContext, layer: &SurfaceLayer) {
    let structure = layer.geometry.structure;
    let mut f = frame.save_state();
    apply_clip(&mut f, ctx, ClipDataKind::Surface, structure);
    identify_triangles(&mut f, ctx, layer);
    identify_nodes(&mut f, ctx, layer);

    f.gfx.disable_clip_planes();
    identify_borders(&mut f, ctx, layer);
    identify_foci(&mut f, ctx, layer);
}

/// Index (0..3) of the triangle vertex nearest the mouse. Only a strictly
/// nearest first or second vertex wins; everything else is the third.
pub fn nearest_vertex_slot(window: &[Vec3; 3], mouse: (f32, f32)) -> usize {
    let m = Vec3::new(mouse.0, mouse.1, 0.0);
    let d1 = window[0].distance_2d(m);
    let d2 = window[1].distance_2d(m);
    let d3 = window[2].distance_2d(m);
    if d1 < d2 && d1 < d3 {
        0
    } else if d2 < d1 && d2 < d3 {
        1
    } else {
        2
    }
}

fn identify_triangles(frame: &mut Frame, ctx: &DrawContext, layer: &SurfaceLayer) {
    let category = SelectionCategory::SurfaceTriangle;
    if !frame.category_enabled(category) {
        return;
    }
    frame.begin_pick_pass();
    emit_triangles(frame, layer, |f, t, _| f.encoder.encode_color(category, PickIndices::one(t)));
    let Some(hit) = frame.resolve(ctx, category) else {
        return;
    };

    let g = layer.geometry;
    let Some(tri) = g.triangles.get(hit.indices.first).copied() else {
        return;
    };
    let (Some(w1), Some(w2), Some(w3)) = (
        frame.gfx.project(g.coordinates[tri[0]]),
        frame.gfx.project(g.coordinates[tri[1]]),
        frame.gfx.project(g.coordinates[tri[2]]),
    ) else {
        return;
    };
    let window = [w1, w2, w3];
    let mouse = ctx.mouse_sample();
    let slot = nearest_vertex_slot(&window, mouse);

    let mut result = SelectionResult::new(category, hit.indices, hit.screen_depth);
    result.structure = Some(g.structure);
    result.screen_xyz = Some((w1 + w2 + w3) * (1.0 / 3.0));
    result.model_xyz = frame.gfx.unproject(mouse.0, mouse.1, hit.screen_depth);
    result.nearest_vertex = Some(NearestVertex {
        index: tri[slot],
        screen_xyz: window[slot],
        model_xyz: g.coordinates[tri[slot]],
    });
    frame.offer_selection(ctx, result);
}

fn identify_nodes(frame: &mut Frame, ctx: &DrawContext, layer: &SurfaceLayer) {
    let category = SelectionCategory::SurfaceNode;
    if !frame.category_enabled(category) {
        return;
    }
    frame.begin_pick_pass();
    frame.gfx.set_point_size(NODE_PICK_POINT_SIZE);
    let g = layer.geometry;
    for (n, p) in g.coordinates.iter().enumerate() {
        let color = frame.encoder.encode_color(category, PickIndices::one(n));
        frame.gfx.draw_point(Vertex::new(*p, color));
    }
    let Some(hit) = frame.resolve(ctx, category) else {
        return;
    };
    let Some(xyz) = g.coordinates.get(hit.indices.first).copied() else {
        return;
    };
    let mut result = SelectionResult::new(category, hit.indices, hit.screen_depth);
    result.structure = Some(g.structure);
    result.model_xyz = Some(xyz);
    result.screen_xyz = frame.gfx.project(xyz);
    frame.offer_selection(ctx, result);
}

fn identify_borders(frame: &mut Frame, ctx: &DrawContext, layer: &SurfaceLayer) {
    let category = SelectionCategory::Border;
    if layer.borders.is_empty() || !frame.category_enabled(category) {
        return;
    }
    frame.begin_pick_pass();
    draw_borders(frame, ctx, layer, Some(category));
    let Some(hit) = frame.resolve(ctx, category) else {
        return;
    };
    let g = layer.geometry;
    let mut result = SelectionResult::new(category, hit.indices, hit.screen_depth);
    result.structure = Some(g.structure);
    result.model_xyz = layer
        .borders
        .get(hit.indices.first)
        .and_then(|b| b.nodes.get(hit.indices.second.unwrap_or(0)))
        .and_then(|n| g.coordinates.get(*n))
        .copied();
    frame.offer_selection(ctx, result);
}

fn identify_foci(frame: &mut Frame, ctx: &DrawContext, layer: &SurfaceLayer) {
    let category = SelectionCategory::Focus;
    if layer.foci.is_empty() || !frame.category_enabled(category) {
        return;
    }
    frame.begin_pick_pass();
    draw_foci(frame, ctx, layer, Some(category));
    let Some(hit) = frame.resolve(ctx, category) else {
        return;
    };
    let mut result = SelectionResult::new(category, hit.indices, hit.screen_depth);
    result.structure = Some(layer.geometry.structure);
    result.model_xyz = layer.foci.get(hit.indices.first).map(|f| f.xyz);
    frame.offer_selection(ctx, result);
}

// =============================================================================
// Projection
// =============================================================================

fn project(frame: &mut Frame, ctx: &DrawContext, layer: &SurfaceLayer) {
    if frame.projection.is_none() {
        return;
    }
    let g = layer.geometry;
    let category = SelectionCategory::SurfaceTriangle;
    let mut f = frame.save_state();
    apply_clip(&mut f, ctx, ClipDataKind::Surface, g.structure);
    f.begin_pick_pass();
    emit_triangles(&mut f, layer, |fr, t, _| fr.encoder.encode_color(category, PickIndices::one(t)));
    let Some(hit) = f.resolve(ctx, category) else {
        return;
    };
    let Some(tri) = g.triangles.get(hit.indices.first).copied() else {
        return;
    };
    let (Some(w1), Some(w2), Some(w3)) = (
        f.gfx.project(g.coordinates[tri[0]]),
        f.gfx.project(g.coordinates[tri[1]]),
        f.gfx.project(g.coordinates[tri[2]]),
    ) else {
        return;
    };
    let model = [g.coordinates[tri[0]], g.coordinates[tri[1]], g.coordinates[tri[2]]];
    let (xyz, nodes, weights) = barycentric_weights([w1, w2, w3], model, tri, ctx.mouse_sample());
    let barycentric = BarycentricProjection { nodes, weights, surface_node_count: g.node_count() };
    if let Some(projection) = f.projection.as_mut() {
        if projection.offer(hit.screen_depth, xyz, g.structure, Some(barycentric)) {
            log::debug!("projected to {:?} on {}", xyz, g.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Border, Focus, Structure, SurfaceGeometry, SurfaceType, ViewTransform};
    use crate::picking::{ProjectionResult, SelectionEncoder, SelectionManager};
    use crate::rasterizer::{GraphicsContext, Viewport};

    /// Two triangles forming a 40x40 square facing the viewer
    fn square() -> SurfaceGeometry {
        let mut g = SurfaceGeometry {
            name: "square".into(),
            structure: Structure::CortexLeft,
            surface_type: SurfaceType::Flat,
            coordinates: vec![
                Vec3::new(-20.0, -20.0, 0.0),
                Vec3::new(20.0, -20.0, 0.0),
                Vec3::new(20.0, 20.0, 0.0),
                Vec3::new(-20.0, 20.0, 0.0),
            ],
            normals: Vec::new(),
            triangles: vec![[0, 1, 2], [0, 2, 3]],
        };
        g.compute_normals();
        g
    }

    fn model<'a>(layer: SurfaceLayer<'a>) -> SurfaceModel<'a> {
        SurfaceModel { layer, view: ViewTransform::default(), mirrored: false }
    }

    fn context(mode: DrawMode, mouse: (i32, i32)) -> DrawContext<'static> {
        let mut ctx = DrawContext::new(mode, 0, Some(0), Viewport::new(0, 0, 90, 90));
        ctx.mouse = mouse;
        ctx
    }

    #[test]
    fn test_nearest_vertex_slot() {
        let w = [Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 10.0, 0.0)];
        assert_eq!(nearest_vertex_slot(&w, (1.0, 1.0)), 0);
        assert_eq!(nearest_vertex_slot(&w, (9.0, 1.0)), 1);
        assert_eq!(nearest_vertex_slot(&w, (1.0, 9.0)), 2);
        // Tie between the first two goes to the third
        assert_eq!(nearest_vertex_slot(&w, (5.0, -100.0)), 2);
    }

    #[test]
    fn test_draw_fills_surface_with_node_colors() {
        let g = square();
        let colors = vec![Rgba::RED; 4];
        let m = model(SurfaceLayer::new(&g, &colors));
        let mut gfx = GraphicsContext::new(90, 90);
        let mut encoder = SelectionEncoder::new();
        let mut frame = Frame::new(&mut gfx, &mut encoder);
        draw_surface_model(&mut frame, &context(DrawMode::Drawing, (0, 0)), &m);
        let center = frame.gfx.read_pixel(45, 45).unwrap();
        assert!(center[0] > 200 && center[1] == 0);
        assert_eq!(frame.gfx.read_pixel(2, 2), Some([0, 0, 0]));
        assert_eq!(frame.gfx.matrix_depth(), 1);
        assert_eq!(frame.anchors.len(), 1);
    }

    #[test]
    fn test_links_hide_interior_with_background() {
        let g = square();
        let colors = vec![Rgba::WHITE; 4];
        let mut layer = SurfaceLayer::new(&g, &colors);
        layer.style = SurfaceDrawStyle::Links;
        let mut gfx = GraphicsContext::new(90, 90);
        gfx.clear(crate::rasterizer::ClearMask::ALL, Rgba::RED);
        let mut encoder = SelectionEncoder::new();
        let mut frame = Frame::new(&mut gfx, &mut encoder);
        let mut ctx = context(DrawMode::Drawing, (0, 0));
        ctx.colors.background = Rgba::BLUE;
        draw_surface_model(&mut frame, &ctx, &model(layer));
        // Two model units per pixel: the square covers pixels 35..55 and
        // its diagonal runs where x + y = 90
        assert_eq!(frame.gfx.read_pixel(50, 50), Some([0, 0, 255]));
        assert_eq!(frame.gfx.read_pixel(20, 20), Some([255, 0, 0]));
        assert_eq!(frame.gfx.stats().lines, 6);
    }

    #[test]
    fn test_triangle_pick_records_nearest_vertex() {
        let g = square();
        let colors = vec![Rgba::WHITE; 4];
        let m = model(SurfaceLayer::new(&g, &colors));
        let mut gfx = GraphicsContext::new(90, 90);
        let mut encoder = SelectionEncoder::new();
        let mut selection = SelectionManager::new();
        {
            let mut frame = Frame::new(&mut gfx, &mut encoder);
            frame.selection = Some(&mut selection);
            // Near the bottom-right corner (node 1 at pixel 55, 55)
            draw_surface_model(&mut frame, &context(DrawMode::Identification, (52, 52)), &m);
            assert_eq!(frame.gfx.matrix_depth(), 1);
        }
        let tri = selection.result(SelectionCategory::SurfaceTriangle).unwrap();
        assert_eq!(tri.indices, PickIndices::one(0));
        assert_eq!(tri.nearest_vertex.unwrap().index, 1);
        let xyz = tri.model_xyz.unwrap();
        assert!((xyz.x - 15.0).abs() < 1.0e-3 && (xyz.y + 15.0).abs() < 1.0e-3);
        // Node pass misses with 2px points far from any node
        assert!(selection.result(SelectionCategory::SurfaceNode).is_none());
        selection.filter_selections(true);
        assert_eq!(selection.result(SelectionCategory::SurfaceNode).unwrap().indices, PickIndices::one(1));
    }

    #[test]
    fn test_disabled_category_emits_nothing() {
        let g = square();
        let colors = vec![Rgba::WHITE; 4];
        let m = model(SurfaceLayer::new(&g, &colors));
        let mut gfx = GraphicsContext::new(90, 90);
        let mut encoder = SelectionEncoder::new();
        let mut selection = SelectionManager::new();
        selection.set_enabled(SelectionCategory::SurfaceTriangle, false);
        selection.set_enabled(SelectionCategory::SurfaceNode, false);
        {
            let mut frame = Frame::new(&mut gfx, &mut encoder);
            frame.selection = Some(&mut selection);
            draw_surface_model(&mut frame, &context(DrawMode::Identification, (45, 45)), &m);
            assert_eq!(frame.gfx.stats().triangles, 0);
            assert_eq!(frame.gfx.stats().points, 0);
        }
        assert!(!selection.any_selected());
    }

    #[test]
    fn test_border_and_focus_picks() {
        let g = square();
        let colors = vec![Rgba::WHITE; 4];
        let borders = [Border { name: "b".into(), nodes: vec![0, 1, 2, 3], color: Rgba::GREEN, closed: true }];
        let foci = [Focus { name: "f".into(), xyz: Vec3::new(0.0, 0.0, 0.0), color: Rgba::RED, radius: 4.0 }];
        let mut layer = SurfaceLayer::new(&g, &colors);
        layer.borders = &borders;
        layer.foci = &foci;
        let m = model(layer);
        let mut gfx = GraphicsContext::new(90, 90);
        let mut encoder = SelectionEncoder::new();
        let mut selection = SelectionManager::new();
        {
            let mut frame = Frame::new(&mut gfx, &mut encoder);
            frame.selection = Some(&mut selection);
            draw_surface_model(&mut frame, &context(DrawMode::Identification, (45, 45)), &m);
            // Bottom edge runs from node 0 to node 1 along pixel row 55
            draw_surface_model(&mut frame, &context(DrawMode::Identification, (45, 55)), &m);
        }
        assert_eq!(selection.result(SelectionCategory::Focus).unwrap().indices, PickIndices::one(0));
        assert_eq!(selection.result(SelectionCategory::Border).unwrap().indices, PickIndices::two(0, 1));
    }

    #[test]
    fn test_projection_weights() {
        let g = square();
        let colors = vec![Rgba::WHITE; 4];
        let m = model(SurfaceLayer::new(&g, &colors));
        let mut gfx = GraphicsContext::new(90, 90);
        let mut encoder = SelectionEncoder::new();
        let mut projection = ProjectionResult::default();
        {
            let mut frame = Frame::new(&mut gfx, &mut encoder);
            frame.projection = Some(&mut projection);
            draw_surface_model(&mut frame, &context(DrawMode::Projection, (52, 40)), &m);
        }
        assert!(projection.is_valid());
        assert_eq!(projection.structure, Some(Structure::CortexLeft));
        let b = projection.barycentric.unwrap();
        assert_eq!(b.surface_node_count, 4);
        assert!((b.weights.iter().sum::<f32>() - 1.0).abs() < 1.0e-5);
        assert!(b.weights.iter().all(|w| *w >= 0.0));
        let xyz = projection.stereotaxic_xyz.unwrap();
        assert!((xyz.x - 15.0).abs() < 1.0e-3 && (xyz.y - 9.0).abs() < 1.0e-3);
    }
}
