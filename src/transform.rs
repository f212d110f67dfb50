//! Camera setup per model type
//!
//! All views are orthographic. Surfaces and the whole brain use the user's
//! pan/rotate/zoom around a center; volume slices additionally fit the
//! slice's in-plane extent to the viewport.

use crate::model::{SliceViewPlane, Structure, SurfaceType, ViewTransform, VolumeData};
use crate::rasterizer::{
    mat4_mul, mat4_ortho, mat4_rotation_x, mat4_rotation_y, mat4_rotation_z, mat4_scale, mat4_transform_vector, mat4_translation,
    GraphicsContext, Mat4, Vec3, Viewport,
};

/// Half of the visible model height at zoom 1
pub const ORTHO_HALF_HEIGHT: f32 = 90.0;
pub const ORTHO_NEAR: f32 = -5000.0;
pub const ORTHO_FAR: f32 = 5000.0;

/// Leave a small border around a fitted slice
const SLICE_FIT_MARGIN: f32 = 0.98;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthoBounds {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl OrthoBounds {
    /// Fixed half height, width follows the viewport aspect ratio
    pub fn for_viewport(viewport: Viewport) -> Self {
        let aspect = viewport.aspect_ratio();
        Self {
            left: -ORTHO_HALF_HEIGHT * aspect,
            right: ORTHO_HALF_HEIGHT * aspect,
            bottom: -ORTHO_HALF_HEIGHT,
            top: ORTHO_HALF_HEIGHT,
            near: ORTHO_NEAR,
            far: ORTHO_FAR,
        }
    }

    /// Pixel-aligned bounds with (0, 0) at the viewport's top-left corner
    pub fn pixels(viewport: Viewport) -> Self {
        Self {
            left: 0.0,
            right: viewport.width as f32,
            bottom: viewport.height as f32,
            top: 0.0,
            near: -1.0,
            far: 1.0,
        }
    }

    pub fn width(&self) -> f32 {
        (self.right - self.left).abs()
    }

    pub fn height(&self) -> f32 {
        (self.top - self.bottom).abs()
    }

    /// Projection matrix; mirrored swaps left/right and near/far so the
    /// model is seen from the opposite side
    pub fn matrix(&self, mirrored: bool) -> Mat4 {
        if mirrored {
            mat4_ortho(self.right, self.left, self.bottom, self.top, self.far, self.near)
        } else {
            mat4_ortho(self.left, self.right, self.bottom, self.top, self.near, self.far)
        }
    }
}

/// Set viewport and orthographic projection, reset the modelview
pub fn setup_orthographic(gfx: &mut GraphicsContext, viewport: Viewport, mirrored: bool) -> OrthoBounds {
    let bounds = OrthoBounds::for_viewport(viewport);
    gfx.set_viewport(viewport);
    gfx.set_projection(bounds.matrix(mirrored));
    gfx.load_identity();
    bounds
}

/// User translation plus the right flat map offset. Derived from the
/// stored view on every call; nothing is written back.
pub fn effective_translation(view: &ViewTransform, surface_type: SurfaceType, structure: Structure) -> Vec3 {
    let mut t = view.translation;
    if surface_type == SurfaceType::Flat && structure.is_right() {
        t.x += view.right_flat_offset.0;
        t.y += view.right_flat_offset.1;
    }
    t
}

/// `translate(t) * rotation * scale(s) * translate(-center)`
pub fn model_viewing_matrix(translation: Vec3, view: &ViewTransform, center: Vec3) -> Mat4 {
    let s = view.scaling;
    let m = mat4_mul(&mat4_translation(translation), &view.rotation);
    let m = mat4_mul(&m, &mat4_scale(Vec3::new(s, s, s)));
    mat4_mul(&m, &mat4_translation(-center))
}

/// Viewing matrix for a single surface, centered on its bounds
pub fn surface_viewing_matrix(
    view: &ViewTransform,
    surface_type: SurfaceType,
    structure: Structure,
    center: Vec3,
) -> Mat4 {
    model_viewing_matrix(effective_translation(view, surface_type, structure), view, center)
}

/// Rotation that brings a slice plane face-on to the viewer
pub fn slice_plane_rotation(plane: SliceViewPlane) -> Mat4 {
    match plane {
        SliceViewPlane::Axial | SliceViewPlane::All => mat4_translation(Vec3::ZERO),
        // x stays horizontal, z goes up
        SliceViewPlane::Coronal => mat4_rotation_x(-90.0),
        // 90 about y, then 90 about z: anterior to the left, z up
        SliceViewPlane::Parasagittal => mat4_mul(&mat4_rotation_z(90.0), &mat4_rotation_y(90.0)),
    }
}

/// Scale and translation that fit `volume` to the viewport for `plane`.
/// `None` when the volume is too thin to fit.
pub fn slice_fit(volume: &VolumeData, plane: SliceViewPlane, ortho: &OrthoBounds) -> Option<(f32, Vec3)> {
    if volume.dims.iter().any(|d| *d <= 2) {
        return None;
    }
    let (h_axis, v_axis) = plane.in_plane_axes()?;
    let slice_axis = plane.slice_axis()?;
    let (lo, hi) = volume.bounds();
    let extent = hi - lo;
    let (eh, ev) = (extent.axis(h_axis), extent.axis(v_axis));
    if eh <= 0.0 || ev <= 0.0 {
        log::warn!("volume {} has an empty extent, not fitting slice", volume.name);
        return None;
    }
    let scale = (ortho.width() / eh).min(ortho.height() / ev) * SLICE_FIT_MARGIN;
    let [ci, cj, ck] = volume.dims.map(|d| (d / 2) as f32);
    let translation = (-volume.index_to_space(ci, cj, ck)).with_axis(slice_axis, 0.0);
    Some((scale, translation))
}

/// user translate, plane rotation, fit scale, user scale, fit translate
pub fn volume_slice_viewing_matrix(
    view: &ViewTransform,
    volume: &VolumeData,
    plane: SliceViewPlane,
    ortho: &OrthoBounds,
) -> Mat4 {
    let mut m = mat4_mul(&mat4_translation(view.translation), &slice_plane_rotation(plane));
    let (fit_scale, fit_translation) = slice_fit(volume, plane, ortho).unwrap_or((1.0, Vec3::ZERO));
    m = mat4_mul(&m, &mat4_scale(Vec3::new(fit_scale, fit_scale, fit_scale)));
    let s = view.scaling;
    m = mat4_mul(&m, &mat4_scale(Vec3::new(s, s, s)));
    mat4_mul(&m, &mat4_translation(fit_translation))
}

/// Pixels covered by `size` model units along x under the given matrices
pub fn size_to_pixels(modelview: &Mat4, projection: &Mat4, viewport: Viewport, size: f32) -> f32 {
    let eye = mat4_transform_vector(modelview, Vec3::new(size, 0.0, 0.0)).len();
    eye * projection[1][1].abs() * viewport.height as f32 / 2.0
}

/// [`size_to_pixels`] at the context's current transform
pub fn model_size_to_pixels(gfx: &GraphicsContext, size: f32) -> f32 {
    size_to_pixels(&gfx.modelview(), &gfx.projection(), gfx.viewport(), size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VolumeKind;
    use crate::rasterizer::mat4_transform_point;

    fn volume(dims: [usize; 3]) -> VolumeData {
        VolumeData {
            name: "v".into(),
            dims,
            origin: Vec3::new(-20.0, -30.0, -10.0),
            spacing: Vec3::new(2.0, 2.0, 2.0),
            maps: vec![vec![0.0; dims[0] * dims[1] * dims[2]]],
            kind: VolumeKind::Scalar,
        }
    }

    #[test]
    fn test_ortho_bounds_follow_aspect() {
        let b = OrthoBounds::for_viewport(Viewport::new(0, 0, 200, 100));
        assert_eq!(b.top, ORTHO_HALF_HEIGHT);
        assert_eq!(b.right, ORTHO_HALF_HEIGHT * 2.0);
        assert_eq!(b.near, ORTHO_NEAR);
    }

    #[test]
    fn test_mirrored_projection_flips_x() {
        let b = OrthoBounds::for_viewport(Viewport::new(0, 0, 100, 100));
        let p = Vec3::new(45.0, 0.0, 0.0);
        let normal = mat4_transform_point(&b.matrix(false), p);
        let mirrored = mat4_transform_point(&b.matrix(true), p);
        assert!((normal.x + mirrored.x).abs() < 1.0e-6);
    }

    #[test]
    fn test_right_flat_offset_is_idempotent() {
        let view = ViewTransform {
            translation: Vec3::new(5.0, 0.0, 0.0),
            right_flat_offset: (40.0, -3.0),
            ..ViewTransform::default()
        };
        let first = surface_viewing_matrix(&view, SurfaceType::Flat, Structure::CortexRight, Vec3::ZERO);
        let second = surface_viewing_matrix(&view, SurfaceType::Flat, Structure::CortexRight, Vec3::ZERO);
        assert_eq!(first, second);
        assert_eq!(first[0][3], 45.0);
        assert_eq!(first[1][3], -3.0);
        assert_eq!(view.translation, Vec3::new(5.0, 0.0, 0.0));

        // Only right flat maps are offset
        let left = surface_viewing_matrix(&view, SurfaceType::Flat, Structure::CortexLeft, Vec3::ZERO);
        assert_eq!(left[0][3], 5.0);
        let inflated = surface_viewing_matrix(&view, SurfaceType::Inflated, Structure::CortexRight, Vec3::ZERO);
        assert_eq!(inflated[0][3], 5.0);
    }

    #[test]
    fn test_viewing_matrix_moves_center_to_translation() {
        let view = ViewTransform { scaling: 2.0, ..ViewTransform::default() };
        let center = Vec3::new(10.0, 20.0, 30.0);
        let m = model_viewing_matrix(Vec3::new(1.0, 1.0, 0.0), &view, center);
        assert_eq!(mat4_transform_point(&m, center), Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(mat4_transform_point(&m, center + Vec3::X), Vec3::new(3.0, 1.0, 0.0));
    }

    #[test]
    fn test_slice_rotations_face_viewer() {
        let coronal = slice_plane_rotation(SliceViewPlane::Coronal);
        let z_up = mat4_transform_point(&coronal, Vec3::Z);
        assert!((z_up - Vec3::Y).len() < 1.0e-5);

        let sagittal = slice_plane_rotation(SliceViewPlane::Parasagittal);
        assert!((mat4_transform_point(&sagittal, Vec3::Y) + Vec3::X).len() < 1.0e-5);
        assert!((mat4_transform_point(&sagittal, Vec3::Z) - Vec3::Y).len() < 1.0e-5);
    }

    #[test]
    fn test_slice_fit_uses_in_plane_axes() {
        let v = volume([20, 40, 10]);
        let ortho = OrthoBounds::for_viewport(Viewport::new(0, 0, 100, 100));
        // Axial: x extent 40mm, y extent 80mm, y limits
        let (scale, t) = slice_fit(&v, SliceViewPlane::Axial, &ortho).unwrap();
        assert!((scale - 180.0 / 80.0 * 0.98).abs() < 1.0e-4);
        assert_eq!(t.z, 0.0);
        // centered on voxel (10, 20, 5), not the bounding box
        assert_eq!(t.x, 0.0);
        assert_eq!(t.y, -10.0);
        assert_ne!(t.x, -v.center().x);

        let (_, t) = slice_fit(&v, SliceViewPlane::Coronal, &ortho).unwrap();
        assert_eq!(t.y, 0.0);
        assert!(slice_fit(&volume([2, 40, 10]), SliceViewPlane::Axial, &ortho).is_none());
    }

    #[test]
    fn test_fitted_axial_slice_is_centered() {
        let v = volume([20, 40, 10]);
        let ortho = OrthoBounds::for_viewport(Viewport::new(0, 0, 100, 100));
        let m = volume_slice_viewing_matrix(&ViewTransform::default(), &v, SliceViewPlane::Axial, &ortho);
        let c = mat4_transform_point(&m, v.center());
        assert!(c.x.abs() < 1.0e-3 && c.y.abs() < 1.0e-3);
    }

    #[test]
    fn test_model_size_to_pixels() {
        let mut gfx = GraphicsContext::new(100, 100);
        setup_orthographic(&mut gfx, Viewport::new(0, 0, 100, 100), false);
        // 180 model units span 100 pixels vertically
        let px = model_size_to_pixels(&gfx, 18.0);
        assert!((px - 10.0).abs() < 1.0e-3);
    }
}
