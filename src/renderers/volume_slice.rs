//! Volume slices
//!
//! A single axial, coronal or parasagittal slice fitted to the viewport,
//! or the `All` layout: a 2x2 grid with the three planes and a 3D view of
//! the orthogonal slices. Layers are drawn bottom first, each a little
//! closer to the viewer than the one below.

use crate::clipping::ClipDataKind;
use crate::dispatch::{DrawContext, DrawMode, Frame};
use crate::fiber::{draw_fibers, SliceBand};
use crate::model::{build_volume_draw_info, SliceSelection, SliceViewPlane, Structure, VolumeData, VolumeDrawInfo,
    VolumeSliceModel};
use crate::picking::{PickIndices, SelectionCategory, SelectionResult};
use crate::rasterizer::{Vec3, Vertex};
use crate::transform;

use super::{apply_clip, blend_for, draw_clip_box, lift_toward_viewer, DataKind};

/// Eye units between stacked layers of the same slice
const LAYER_LIFT: f32 = 0.25;

/// Planes of the `All` grid in cell order; the fourth cell is the 3D view
const GRID_PLANES: [SliceViewPlane; 3] = [SliceViewPlane::Axial, SliceViewPlane::Coronal, SliceViewPlane::Parasagittal];

pub fn draw_volume_slices(frame: &mut Frame, ctx: &DrawContext, model: &VolumeSliceModel) {
    if ctx.mode == DrawMode::Projection {
        return;
    }
    let infos = build_volume_draw_info(model.overlays);
    let Some(bottom) = infos.first().map(|i| i.volume) else {
        return;
    };

    match model.plane {
        SliceViewPlane::All => {
            let cells = ctx.viewport.grid(2, 2);
            for (cell, plane) in cells.iter().zip(GRID_PLANES) {
                if ctx.wants_viewport(cell) {
                    draw_single_plane(frame, &ctx.with_viewport(*cell), model, &infos, bottom, plane);
                }
            }
            if let Some(cell) = cells.get(3) {
                if ctx.wants_viewport(cell) {
                    draw_3d_view(frame, &ctx.with_viewport(*cell), model, &infos, bottom);
                }
            }
        }
        plane => draw_single_plane(frame, ctx, model, &infos, bottom, plane),
    }
}

fn draw_single_plane(
    frame: &mut Frame,
    ctx: &DrawContext,
    model: &VolumeSliceModel,
    infos: &[VolumeDrawInfo],
    bottom: &VolumeData,
    plane: SliceViewPlane,
) {
    let Some(axis) = plane.slice_axis() else {
        return;
    };
    let mut f = frame.save_state();
    let ortho = transform::setup_orthographic(f.gfx, ctx.viewport, false);
    let m = transform::volume_slice_viewing_matrix(&model.view, bottom, plane, &ortho);
    f.gfx.load_matrix(m);
    f.record_anchor(None);

    let coordinate = slice_coordinate(bottom, axis, model.slices.index_for(plane));
    draw_slice_layers(&mut f, ctx, infos, axis, coordinate);

    if let Some(fibers) = &model.fibers {
        draw_fibers(&mut f, ctx, fibers, Some(SliceBand { axis, coordinate }));
    }
    draw_clip_box(&mut f, ctx, Structure::Other);
}

/// Orthogonal slices under the user's rotation
fn draw_3d_view(
    frame: &mut Frame,
    ctx: &DrawContext,
    model: &VolumeSliceModel,
    infos: &[VolumeDrawInfo],
    bottom: &VolumeData,
) {
    let mut f = frame.save_state();
    transform::setup_orthographic(f.gfx, ctx.viewport, false);
    let m = transform::model_viewing_matrix(model.view.translation, &model.view, bottom.center());
    f.gfx.load_matrix(m);
    f.record_anchor(None);
    draw_orthogonal_slices(&mut f, ctx, infos, &model.slices);
    if let Some(fibers) = &model.fibers {
        draw_fibers(&mut f, ctx, fibers, None);
    }
    draw_clip_box(&mut f, ctx, Structure::Other);
}

/// Enabled parasagittal, coronal and axial slices in the current transform
pub fn draw_orthogonal_slices(frame: &mut Frame, ctx: &DrawContext, infos: &[VolumeDrawInfo], slices: &SliceSelection) {
    let Some(bottom) = infos.first().map(|i| i.volume) else {
        return;
    };
    let enabled = [
        (slices.enabled.parasagittal, SliceViewPlane::Parasagittal),
        (slices.enabled.coronal, SliceViewPlane::Coronal),
        (slices.enabled.axial, SliceViewPlane::Axial),
    ];
    for (on, plane) in enabled {
        let Some(axis) = plane.slice_axis().filter(|_| on) else {
            continue;
        };
        let coordinate = slice_coordinate(bottom, axis, slices.index_for(plane));
        draw_slice_layers(frame, ctx, infos, axis, coordinate);
    }
}

/// Stereotaxic coordinate of slice `index` of `volume` along `axis`
pub fn slice_coordinate(volume: &VolumeData, axis: usize, index: usize) -> f32 {
    volume.origin.axis(axis) + index as f32 * volume.spacing.axis(axis)
}

/// Slice of `volume` nearest to `coordinate`, `None` if it misses the grid
pub fn slice_index_at(volume: &VolumeData, axis: usize, coordinate: f32) -> Option<usize> {
    let spacing = volume.spacing.axis(axis);
    if spacing == 0.0 {
        return None;
    }
    let f = ((coordinate - volume.origin.axis(axis)) / spacing).round();
    if f < 0.0 || f as usize >= volume.dims[axis] {
        return None;
    }
    Some(f as usize)
}

/// Voxel indices of one slice
fn slice_voxels(dims: [usize; 3], axis: usize, index: usize) -> impl Iterator<Item = [usize; 3]> {
    let (a, b) = in_plane(axis);
    (0..dims[b]).flat_map(move |vb| {
        (0..dims[a]).map(move |va| {
            let mut ijk = [0usize; 3];
            ijk[axis] = index;
            ijk[a] = va;
            ijk[b] = vb;
            ijk
        })
    })
}

fn in_plane(axis: usize) -> (usize, usize) {
    match axis {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    }
}

/// Quad covering one voxel face in the slice plane
fn voxel_quad(volume: &VolumeData, axis: usize, ijk: [usize; 3], coordinate: f32) -> [Vec3; 4] {
    let (a, b) = in_plane(axis);
    let center = volume
        .index_to_space(ijk[0] as f32, ijk[1] as f32, ijk[2] as f32)
        .with_axis(axis, coordinate);
    let ha = volume.spacing.axis(a).abs() * 0.5;
    let hb = volume.spacing.axis(b).abs() * 0.5;
    let corner = |da: f32, db: f32| center.with_axis(a, center.axis(a) + da).with_axis(b, center.axis(b) + db);
    [corner(-ha, -hb), corner(ha, -hb), corner(ha, hb), corner(-ha, hb)]
}

/// Draw or pick every layer of one slice at `coordinate` along `axis`
pub fn draw_slice_layers(frame: &mut Frame, ctx: &DrawContext, infos: &[VolumeDrawInfo], axis: usize, coordinate: f32) {
    match ctx.mode {
        DrawMode::Drawing => draw_layers(frame, ctx, infos, axis, coordinate),
        DrawMode::Identification => identify_voxel(frame, ctx, infos, axis, coordinate),
        DrawMode::Projection => {}
    }
}

fn draw_layers(frame: &mut Frame, ctx: &DrawContext, infos: &[VolumeDrawInfo], axis: usize, coordinate: f32) {
    let mut f = frame.save_state();
    apply_clip(&mut f, ctx, ClipDataKind::Volume, Structure::Other);
    f.gfx.set_lighting(false);

    for (layer, info) in infos.iter().enumerate() {
        let volume = info.volume;
        let Some(index) = slice_index_at(volume, axis, coordinate) else {
            continue;
        };
        if layer > 0 {
            lift_toward_viewer(f.gfx, LAYER_LIFT);
        }
        let blend = (info.opacity < 1.0).then(|| blend_for(DataKind::VolumeSlice));
        f.gfx.set_blend(blend);
        for ijk in slice_voxels(volume.dims, axis, index) {
            let color = info.voxel_color(ijk[0], ijk[1], ijk[2]);
            if color.a <= 0.0 {
                continue;
            }
            let q = voxel_quad(volume, axis, ijk, coordinate);
            f.gfx.draw_quad([
                Vertex::new(q[0], color),
                Vertex::new(q[1], color),
                Vertex::new(q[2], color),
                Vertex::new(q[3], color),
            ]);
        }
    }
}

/// Voxels of the bottom layer are pickable; indices are in its grid
fn identify_voxel(frame: &mut Frame, ctx: &DrawContext, infos: &[VolumeDrawInfo], axis: usize, coordinate: f32) {
    let category = SelectionCategory::Voxel;
    let Some(info) = infos.first() else {
        return;
    };
    if !frame.category_enabled(category) {
        return;
    }
    let volume = info.volume;
    let Some(index) = slice_index_at(volume, axis, coordinate) else {
        return;
    };

    let mut f = frame.save_state();
    apply_clip(&mut f, ctx, ClipDataKind::Volume, Structure::Other);
    f.begin_pick_pass();
    for ijk in slice_voxels(volume.dims, axis, index) {
        if info.voxel_color(ijk[0], ijk[1], ijk[2]).a <= 0.0 {
            continue;
        }
        let color = f.encoder.encode_color(category, PickIndices::three(ijk[0], ijk[1], ijk[2]));
        let q = voxel_quad(volume, axis, ijk, coordinate);
        f.gfx.draw_quad(q.map(|p| Vertex::new(p, color)));
    }
    let Some(hit) = f.resolve(ctx, category) else {
        return;
    };
    let (i, j, k) = (hit.indices.first, hit.indices.second.unwrap_or(0), hit.indices.third.unwrap_or(0));
    let xyz = volume.index_to_space(i as f32, j as f32, k as f32).with_axis(axis, coordinate);
    let mut result = SelectionResult::new(category, hit.indices, hit.screen_depth);
    result.model_xyz = Some(xyz);
    result.screen_xyz = f.gfx.project(xyz);
    result.structure = Some(Structure::Other);
    log::debug!("picked voxel ({}, {}, {}) of {}", i, j, k, volume.name);
    f.offer_selection(ctx, result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GrayscalePalette, Palette, ViewTransform, VolumeKind, VolumeOverlay, WholeBrainVolumeMode};
    use crate::picking::{SelectionEncoder, SelectionManager};
    use crate::rasterizer::{GraphicsContext, Viewport};

    /// 4x4x4 grid, 10 units per voxel, bounds -20..20 on every axis
    fn volume() -> VolumeData {
        VolumeData {
            name: "t1".into(),
            dims: [4, 4, 4],
            origin: Vec3::new(-15.0, -15.0, -15.0),
            spacing: Vec3::new(10.0, 10.0, 10.0),
            maps: vec![(0..64).map(|v| v as f32).collect()],
            kind: VolumeKind::Scalar,
        }
    }

    fn overlay<'a>(v: &'a VolumeData, palette: &'a dyn Palette) -> VolumeOverlay<'a> {
        VolumeOverlay {
            volume: v,
            map_index: 0,
            palette: Some(palette),
            opacity: 1.0,
            enabled: true,
            whole_brain_mode: WholeBrainVolumeMode::Slices,
        }
    }

    fn model<'a>(overlays: &'a [VolumeOverlay<'a>], plane: SliceViewPlane, v: &VolumeData) -> VolumeSliceModel<'a> {
        VolumeSliceModel {
            overlays,
            plane,
            slices: SliceSelection::centered(v),
            view: ViewTransform::default(),
            fibers: None,
        }
    }

    #[test]
    fn test_slice_index_conversion() {
        let v = volume();
        assert_eq!(slice_coordinate(&v, 2, 2), 5.0);
        assert_eq!(slice_index_at(&v, 2, 5.0), Some(2));
        assert_eq!(slice_index_at(&v, 0, 40.0), None);
        assert_eq!(slice_voxels(v.dims, 1, 3).count(), 16);
        assert!(slice_voxels(v.dims, 1, 3).all(|ijk| ijk[1] == 3));
    }

    #[test]
    fn test_axial_slice_draws_palette_colors() {
        let v = volume();
        let gray = GrayscalePalette { threshold: Some(0.0) };
        let overlays = [overlay(&v, &gray)];
        let m = model(&overlays, SliceViewPlane::Axial, &v);
        let mut gfx = GraphicsContext::new(100, 100);
        let mut encoder = SelectionEncoder::new();
        let mut frame = Frame::new(&mut gfx, &mut encoder);
        let ctx = DrawContext::new(DrawMode::Drawing, 0, Some(0), Viewport::new(0, 0, 100, 100));
        draw_volume_slices(&mut frame, &ctx, &m);
        // Fit scale 4.41 about voxel (2, 2) puts voxel (3, 3) of slice 2 up and right
        let px = frame.gfx.read_pixel(75, 25).unwrap();
        let expected = (47.0 / 63.0 * 255.0) as u8;
        assert!((px[0] as i32 - expected as i32).abs() <= 1);
        // Slice 2 holds values 32..47, all above the threshold
        assert_eq!(frame.gfx.stats().triangles, 32);
        assert_eq!(frame.gfx.matrix_depth(), 1);
    }

    #[test]
    fn test_voxel_pick_in_single_plane_and_grid() {
        let v = volume();
        let gray = GrayscalePalette { threshold: None };
        let overlays = [overlay(&v, &gray)];
        for (plane, size) in [(SliceViewPlane::Axial, 100), (SliceViewPlane::All, 200)] {
            let m = model(&overlays, plane, &v);
            let mut gfx = GraphicsContext::new(size, size);
            let mut encoder = SelectionEncoder::new();
            let mut selection = SelectionManager::new();
            {
                let mut frame = Frame::new(&mut gfx, &mut encoder);
                frame.selection = Some(&mut selection);
                let mut ctx = DrawContext::new(DrawMode::Identification, 0, Some(0), Viewport::new(0, 0, size as i32, size as i32));
                ctx.mouse = (75, 25);
                draw_volume_slices(&mut frame, &ctx, &m);
            }
            let voxel = selection.result(SelectionCategory::Voxel).unwrap();
            assert_eq!(voxel.indices, PickIndices::three(3, 3, 2));
            let xyz = voxel.model_xyz.unwrap();
            assert_eq!((xyz.x, xyz.y, xyz.z), (15.0, 15.0, 5.0));
        }
    }

    #[test]
    fn test_translucent_layer_blends_over_bottom() {
        let under = volume();
        let mut over = volume();
        over.name = "overlay".into();
        let gray = GrayscalePalette { threshold: None };
        let red = crate::model::LinearPalette {
            name: "red".into(),
            low: crate::rasterizer::Rgba::RED,
            high: crate::rasterizer::Rgba::RED,
            threshold: None,
        };
        let mut top = overlay(&over, &red);
        top.opacity = 0.5;
        let overlays = [top, overlay(&under, &gray)];
        let m = model(&overlays, SliceViewPlane::Axial, &under);
        let mut gfx = GraphicsContext::new(100, 100);
        let mut encoder = SelectionEncoder::new();
        let mut frame = Frame::new(&mut gfx, &mut encoder);
        let ctx = DrawContext::new(DrawMode::Drawing, 0, Some(0), Viewport::new(0, 0, 100, 100));
        draw_volume_slices(&mut frame, &ctx, &m);
        let px = frame.gfx.read_pixel(75, 25).unwrap();
        // Half red over gray 0.75
        assert!(px[0] > px[1] + 100);
        assert!(px[1] > 80 && px[1] < 110);
        assert!(frame.gfx.state().blend.is_none());
    }
}
