//! Volume drawn as voxel cubes in the whole brain view

use crate::clipping::ClipDataKind;
use crate::dispatch::{DrawContext, DrawMode, Frame};
use crate::model::{Structure, VolumeData, VolumeDrawInfo};
use crate::picking::{PickIndices, SelectionCategory, SelectionResult};
use crate::rasterizer::{Rgba, Vec3, Vertex};

use super::{apply_clip, blend_for, DataKind};

/// Which cube faces are emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubeEmission {
    /// Only faces next to an empty voxel or the grid edge
    OutsideFacesOnly,
    /// All six faces of every voxel, so inner voxels show through
    /// translucent outer ones
    FullCubes,
}

impl CubeEmission {
    pub fn for_opacity(opacity: f32) -> Self {
        if opacity >= 1.0 {
            CubeEmission::OutsideFacesOnly
        } else {
            CubeEmission::FullCubes
        }
    }
}

/// (axis, direction) of the six faces
const FACES: [(usize, f32); 6] = [(0, -1.0), (0, 1.0), (1, -1.0), (1, 1.0), (2, -1.0), (2, 1.0)];

fn neighbor(dims: [usize; 3], ijk: [usize; 3], axis: usize, dir: f32) -> Option<[usize; 3]> {
    let mut n = ijk;
    if dir < 0.0 {
        n[axis] = ijk[axis].checked_sub(1)?;
    } else {
        n[axis] = ijk[axis] + 1;
        if n[axis] >= dims[axis] {
            return None;
        }
    }
    Some(n)
}

/// Corners of one face, wound counter-clockwise seen from outside
fn face_quad(volume: &VolumeData, ijk: [usize; 3], axis: usize, dir: f32) -> [Vec3; 4] {
    let center = volume.index_to_space(ijk[0] as f32, ijk[1] as f32, ijk[2] as f32);
    let half = volume.spacing.abs() * 0.5;
    let (a, b) = ((axis + 1) % 3, (axis + 2) % 3);
    let face = center.with_axis(axis, center.axis(axis) + dir * half.axis(axis));
    let at = |sa: f32, sb: f32| {
        face.with_axis(a, face.axis(a) + sa * half.axis(a))
            .with_axis(b, face.axis(b) + sb * half.axis(b))
    };
    if dir > 0.0 {
        [at(-1.0, -1.0), at(1.0, -1.0), at(1.0, 1.0), at(-1.0, 1.0)]
    } else {
        [at(-1.0, -1.0), at(-1.0, 1.0), at(1.0, 1.0), at(1.0, -1.0)]
    }
}

/// Faces to emit for the voxel at `ijk`
fn visible_faces<'i>(
    info: &'i VolumeDrawInfo<'i>,
    ijk: [usize; 3],
    emission: CubeEmission,
) -> impl Iterator<Item = (usize, f32)> + 'i {
    let dims = info.volume.dims;
    FACES.into_iter().filter(move |(axis, dir)| match emission {
        CubeEmission::FullCubes => true,
        CubeEmission::OutsideFacesOnly => match neighbor(dims, ijk, *axis, *dir) {
            Some(n) => info.voxel_color(n[0], n[1], n[2]).a <= 0.0,
            None => true,
        },
    })
}

fn voxels(dims: [usize; 3]) -> impl Iterator<Item = [usize; 3]> {
    (0..dims[2]).flat_map(move |k| (0..dims[1]).flat_map(move |j| (0..dims[0]).map(move |i| [i, j, k])))
}

/// Draw or pick one volume layer as cubes in the current transform
pub fn draw_voxel_cubes(frame: &mut Frame, ctx: &DrawContext, info: &VolumeDrawInfo) {
    match ctx.mode {
        DrawMode::Drawing => draw_cubes(frame, ctx, info),
        DrawMode::Identification => identify_cube(frame, ctx, info),
        DrawMode::Projection => {}
    }
}

fn draw_cubes(frame: &mut Frame, ctx: &DrawContext, info: &VolumeDrawInfo) {
    let emission = CubeEmission::for_opacity(info.opacity);
    let mut f = frame.save_state();
    apply_clip(&mut f, ctx, ClipDataKind::Volume, Structure::Other);
    f.gfx.set_lighting(true);
    if emission == CubeEmission::FullCubes {
        f.gfx.set_blend(Some(blend_for(DataKind::VoxelCubes)));
    }
    for ijk in voxels(info.volume.dims) {
        let color = info.voxel_color(ijk[0], ijk[1], ijk[2]);
        if color.a <= 0.0 {
            continue;
        }
        for (axis, dir) in visible_faces(info, ijk, emission) {
            emit_face(&mut f, info.volume, ijk, axis, dir, color);
        }
    }
}

fn emit_face(frame: &mut Frame, volume: &VolumeData, ijk: [usize; 3], axis: usize, dir: f32, color: Rgba) {
    let normal = Vec3::ZERO.with_axis(axis, dir);
    let q = face_quad(volume, ijk, axis, dir);
    frame.gfx.draw_quad(q.map(|p| Vertex::lit(p, normal, color)));
}

fn identify_cube(frame: &mut Frame, ctx: &DrawContext, info: &VolumeDrawInfo) {
    let category = SelectionCategory::Voxel;
    if !frame.category_enabled(category) {
        return;
    }
    let mut f = frame.save_state();
    apply_clip(&mut f, ctx, ClipDataKind::Volume, Structure::Other);
    f.begin_pick_pass();
    let emission = CubeEmission::for_opacity(info.opacity);
    for ijk in voxels(info.volume.dims) {
        if info.voxel_color(ijk[0], ijk[1], ijk[2]).a <= 0.0 {
            continue;
        }
        let color = f.encoder.encode_color(category, PickIndices::three(ijk[0], ijk[1], ijk[2]));
        for (axis, dir) in visible_faces(info, ijk, emission) {
            emit_face(&mut f, info.volume, ijk, axis, dir, color);
        }
    }
    let Some(hit) = f.resolve(ctx, category) else {
        return;
    };
    let (i, j, k) = (hit.indices.first, hit.indices.second.unwrap_or(0), hit.indices.third.unwrap_or(0));
    let mut result = SelectionResult::new(category, hit.indices, hit.screen_depth);
    let mouse = ctx.mouse_sample();
    result.model_xyz = f
        .gfx
        .unproject(mouse.0, mouse.1, hit.screen_depth)
        .or_else(|| Some(info.volume.index_to_space(i as f32, j as f32, k as f32)));
    result.structure = Some(Structure::Other);
    f.offer_selection(ctx, result);
}
