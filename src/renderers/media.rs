//! Image media with registration control points
//!
//! The image is fitted to the viewport with row 0 at the top. Picking
//! encodes the whole image with one color and recovers the pixel under
//! the mouse by unprojecting.

use crate::dispatch::{DrawContext, DrawMode, Frame};
use crate::model::MediaModel;
use crate::picking::{PickIndices, SelectionCategory, SelectionResult};
use crate::rasterizer::{mat4_mul, mat4_scale, mat4_translation, Mat4, Rgba, Vec2, Vec3, Vertex};
use crate::transform::{self, OrthoBounds};

use super::{blend_for, lift_toward_viewer, DataKind};

/// Fraction of the viewport an unzoomed image fills
const MEDIA_FIT: f32 = 0.95;
const CONTROL_POINT_SIZE: f32 = 8.0;

/// Image pixels to model: image centered on the origin, y up, fitted to
/// the viewport, then the user's pan and zoom
pub fn media_viewing_matrix(model: &MediaModel, ortho: &OrthoBounds) -> Mat4 {
    let (w, h) = (model.image.width as f32, model.image.height as f32);
    let fit = if w > 0.0 && h > 0.0 {
        (ortho.width() / w).min(ortho.height() / h) * MEDIA_FIT
    } else {
        1.0
    };
    let s = fit * model.view.scaling;
    let m = mat4_mul(&mat4_translation(model.view.translation), &mat4_scale(Vec3::new(s, s, s)));
    mat4_mul(&m, &mat4_translation(Vec3::new(-w / 2.0, -h / 2.0, 0.0)))
}

/// Model position of image pixel coordinates (row 0 at the top)
fn image_to_model(model: &MediaModel, p: Vec2) -> Vec3 {
    Vec3::new(p.x, model.image.height as f32 - p.y, 0.0)
}

/// Image pixel containing a model position
pub fn model_to_image_pixel(model: &MediaModel, xyz: Vec3) -> Option<(usize, usize)> {
    let px = xyz.x.floor();
    let py = (model.image.height as f32 - xyz.y).floor();
    if px < 0.0 || py < 0.0 || px >= model.image.width as f32 || py >= model.image.height as f32 {
        return None;
    }
    Some((px as usize, py as usize))
}

fn image_quad(model: &MediaModel, color: Rgba) -> [Vertex; 4] {
    let (w, h) = (model.image.width as f32, model.image.height as f32);
    [
        Vertex::textured(Vec3::new(0.0, 0.0, 0.0), Vec2::new(0.0, 1.0), color),
        Vertex::textured(Vec3::new(w, 0.0, 0.0), Vec2::new(1.0, 1.0), color),
        Vertex::textured(Vec3::new(w, h, 0.0), Vec2::new(1.0, 0.0), color),
        Vertex::textured(Vec3::new(0.0, h, 0.0), Vec2::new(0.0, 0.0), color),
    ]
}

pub fn draw_media(frame: &mut Frame, ctx: &DrawContext, model: &MediaModel) {
    if ctx.mode == DrawMode::Projection || model.image.width == 0 || model.image.height == 0 {
        return;
    }
    let mut f = frame.save_state();
    let ortho = transform::setup_orthographic(f.gfx, ctx.viewport, false);
    f.gfx.load_matrix(media_viewing_matrix(model, &ortho));
    f.gfx.disable_clip_planes();
    f.gfx.set_lighting(false);
    f.record_anchor(None);

    match ctx.mode {
        DrawMode::Drawing => {
            if model.opacity < 1.0 {
                f.gfx.set_blend(Some(blend_for(DataKind::Media)));
            }
            let color = Rgba::WHITE.with_alpha(model.opacity.clamp(0.0, 1.0));
            f.gfx.draw_quad_textured(image_quad(model, color), model.image);
            f.gfx.set_blend(None);
            lift_toward_viewer(f.gfx, 1.0);
            f.gfx.set_point_size(CONTROL_POINT_SIZE);
            for p in model.control_points {
                f.gfx.draw_point(Vertex::new(image_to_model(model, *p), ctx.colors.foreground));
            }
        }
        DrawMode::Identification => {
            identify_pixel(&mut f, ctx, model);
            identify_control_point(&mut f, ctx, model);
        }
        DrawMode::Projection => {}
    }
}

fn identify_pixel(frame: &mut Frame, ctx: &DrawContext, model: &MediaModel) {
    let category = SelectionCategory::MediaPixel;
    if !frame.category_enabled(category) {
        return;
    }
    frame.begin_pick_pass();
    let color = frame.encoder.encode_color(category, PickIndices::one(model.media_index));
    frame.gfx.draw_quad(image_quad(model, color));
    let Some(hit) = frame.resolve(ctx, category) else {
        return;
    };
    let mouse = ctx.mouse_sample();
    let Some(xyz) = frame.gfx.unproject(mouse.0, mouse.1, hit.screen_depth) else {
        return;
    };
    let Some((px, py)) = model_to_image_pixel(model, xyz) else {
        return;
    };
    let mut result = SelectionResult::new(category, PickIndices::three(model.media_index, px, py), hit.screen_depth);
    result.model_xyz = Some(Vec3::new(px as f32, py as f32, 0.0));
    result.screen_xyz = Some(Vec3::new(mouse.0, mouse.1, hit.screen_depth));
    log::debug!("picked pixel ({}, {}) of {}", px, py, model.image.name);
    frame.offer_selection(ctx, result);
}

fn identify_control_point(frame: &mut Frame, ctx: &DrawContext, model: &MediaModel) {
    let category = SelectionCategory::ControlPoint;
    if model.control_points.is_empty() || !frame.category_enabled(category) {
        return;
    }
    frame.begin_pick_pass();
    frame.gfx.set_point_size(CONTROL_POINT_SIZE);
    for (i, p) in model.control_points.iter().enumerate() {
        let color = frame.encoder.encode_color(category, PickIndices::two(model.media_index, i));
        frame.gfx.draw_point(Vertex::new(image_to_model(model, *p), color));
    }
    let Some(hit) = frame.resolve(ctx, category) else {
        return;
    };
    let mut result = SelectionResult::new(category, hit.indices, hit.screen_depth);
    result.model_xyz = hit
        .indices
        .second
        .and_then(|i| model.control_points.get(i))
        .map(|p| Vec3::new(p.x, p.y, 0.0));
    frame.offer_selection(ctx, result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picking::{SelectionEncoder, SelectionManager};
    use crate::rasterizer::{GraphicsContext, Texture, Viewport};

    /// 4x2 image: top row red, bottom row blue
    fn image() -> Texture {
        let mut pixels = vec![[255, 0, 0, 255]; 4];
        pixels.extend(vec![[0, 0, 255, 255]; 4]);
        Texture::from_rgba("test", 4, 2, pixels).unwrap()
    }

    #[test]
    fn test_image_rows_keep_orientation() {
        let img = image();
        let model = MediaModel::new(&img, 0);
        let mut gfx = GraphicsContext::new(100, 100);
        let mut encoder = SelectionEncoder::new();
        let mut frame = Frame::new(&mut gfx, &mut encoder);
        let ctx = DrawContext::new(DrawMode::Drawing, 0, Some(0), Viewport::new(0, 0, 100, 100));
        draw_media(&mut frame, &ctx, &model);
        // 4x2 image fitted to 95 of 100 pixels wide: rows split at y = 50
        assert_eq!(frame.gfx.read_pixel(50, 35), Some([255, 0, 0]));
        assert_eq!(frame.gfx.read_pixel(50, 65), Some([0, 0, 255]));
        assert_eq!(frame.gfx.read_pixel(50, 5), Some([0, 0, 0]));
    }

    #[test]
    fn test_pick_media_pixel_and_control_point() {
        let img = image();
        let points = [Vec2::new(3.5, 0.5)];
        let mut model = MediaModel::new(&img, 7);
        model.control_points = &points;
        let mut gfx = GraphicsContext::new(100, 100);
        let mut encoder = SelectionEncoder::new();
        let mut selection = SelectionManager::new();
        {
            let mut frame = Frame::new(&mut gfx, &mut encoder);
            frame.selection = Some(&mut selection);
            let mut ctx = DrawContext::new(DrawMode::Identification, 0, Some(0), Viewport::new(0, 0, 100, 100));
            // Image pixel (1, 1) covers window x 26..50, y 50..73
            ctx.mouse = (40, 60);
            draw_media(&mut frame, &ctx, &model);
            // Control point at image (3.5, 0.5) sits at window (85, 38)
            frame.selection.as_deref_mut().unwrap().set_enabled(SelectionCategory::MediaPixel, false);
            ctx.mouse = (85, 38);
            draw_media(&mut frame, &ctx, &model);
        }
        let pixel = selection.result(SelectionCategory::MediaPixel).unwrap();
        assert_eq!(pixel.indices, PickIndices::three(7, 1, 1));
        let cp = selection.result(SelectionCategory::ControlPoint).unwrap();
        assert_eq!(cp.indices, PickIndices::two(7, 0));
        assert_eq!(cp.model_xyz, Some(Vec3::new(3.5, 0.5, 0.0)));
    }
}
