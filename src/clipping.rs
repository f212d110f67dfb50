//! Clip box made of up to six half-space planes
//!
//! The box is defined for the right hemisphere. Right structures see it
//! with mirrored rotation; every other structure sees it with the X
//! translation mirrored.

use serde::{Deserialize, Serialize};

use crate::model::Structure;
use crate::rasterizer::{mat4_rotation, mat4_transform_point, GraphicsContext, Mat4, Vec3, MAX_CLIP_PLANES};

/// Oriented plane `normal . p + d = 0`, positive side kept
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    pub fn from_normal_and_point(normal: Vec3, point: Vec3) -> Self {
        let n = normal.normalize();
        Plane { normal: n, d: -n.dot(point) }
    }

    pub fn signed_distance(&self, p: Vec3) -> f32 {
        self.normal.dot(p) + self.d
    }

    /// Coefficients for [`GraphicsContext::set_clip_plane`]
    pub fn equation(&self) -> [f32; 4] {
        [self.normal.x, self.normal.y, self.normal.z, self.d]
    }
}

/// Kind of data a clip group can be toggled for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipDataKind {
    Surface,
    Volume,
    /// Borders, foci, fibers
    Features,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipPlaneGroup {
    pub enabled: bool,
    pub translation: Vec3,
    /// Euler angles in degrees
    pub rotation: Vec3,
    pub thickness: Vec3,
    pub x_axis: bool,
    pub y_axis: bool,
    pub z_axis: bool,
    pub surface: bool,
    pub volume: bool,
    pub features: bool,
    /// Outline the box while drawing
    pub display_box: bool,
}

impl Default for ClipPlaneGroup {
    fn default() -> Self {
        Self {
            enabled: false,
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            thickness: Vec3::new(180.0, 250.0, 220.0),
            x_axis: false,
            y_axis: false,
            z_axis: false,
            surface: true,
            volume: true,
            features: true,
            display_box: false,
        }
    }
}

impl ClipPlaneGroup {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn any_axis(&self) -> bool {
        self.x_axis || self.y_axis || self.z_axis
    }

    /// Enabled, selected for `kind`, and at least one axis is on
    pub fn applies_to(&self, kind: ClipDataKind) -> bool {
        let selected = match kind {
            ClipDataKind::Surface => self.surface,
            ClipDataKind::Volume => self.volume,
            ClipDataKind::Features => self.features,
        };
        self.enabled && selected && self.any_axis()
    }

    /// Box center as seen by `structure`
    pub fn translation_for(&self, structure: Structure) -> Vec3 {
        if structure.is_right() {
            self.translation
        } else {
            Vec3::new(-self.translation.x, self.translation.y, self.translation.z)
        }
    }

    /// Box rotation as seen by `structure`
    pub fn rotation_for(&self, structure: Structure) -> Mat4 {
        if structure.is_right() {
            mat4_rotation(Vec3::new(self.rotation.x, -self.rotation.y, -self.rotation.z))
        } else {
            mat4_rotation(self.rotation)
        }
    }

    /// Active planes (min then max per selected axis). Empty when disabled.
    pub fn planes_for(&self, structure: Structure) -> Vec<Plane> {
        let mut planes = Vec::with_capacity(MAX_CLIP_PLANES);
        if !self.enabled {
            return planes;
        }
        let t = self.translation_for(structure);
        let rot = self.rotation_for(structure);
        let axes = [(0, self.x_axis), (1, self.y_axis), (2, self.z_axis)];
        for (axis, selected) in axes {
            if !selected {
                continue;
            }
            let half = self.thickness.axis(axis) / 2.0;
            let unit = Vec3::ZERO.with_axis(axis, 1.0);
            let center = t.axis(axis);
            for (normal, offset) in [(unit, center - half), (-unit, center + half)] {
                let point = Vec3::ZERO.with_axis(axis, offset);
                planes.push(Plane::from_normal_and_point(
                    mat4_transform_point(&rot, normal),
                    mat4_transform_point(&rot, point),
                ));
            }
        }
        planes
    }

    /// Inside every active plane; everything is inside when no plane is active
    pub fn is_inside(&self, structure: Structure, p: Vec3) -> bool {
        self.planes_for(structure)
            .iter()
            .all(|plane| plane.signed_distance(p) >= 0.0)
    }

    /// Inside test honoring the per data kind selection
    pub fn is_inside_for(&self, kind: ClipDataKind, structure: Structure, p: Vec3) -> bool {
        !self.applies_to(kind) || self.is_inside(structure, p)
    }

    /// Load the planes into the context in current model coordinates.
    /// Returns the number of planes enabled.
    pub fn apply(&self, gfx: &mut GraphicsContext, kind: ClipDataKind, structure: Structure) -> usize {
        if !self.applies_to(kind) {
            return 0;
        }
        let planes = self.planes_for(structure);
        for (i, plane) in planes.iter().enumerate().take(MAX_CLIP_PLANES) {
            gfx.set_clip_plane(i, plane.equation());
            gfx.enable_clip_plane(i, true);
        }
        planes.len().min(MAX_CLIP_PLANES)
    }

    /// Eight corners of the box for `structure`, bottom face first
    pub fn box_corners(&self, structure: Structure) -> [Vec3; 8] {
        let t = self.translation_for(structure);
        let rot = self.rotation_for(structure);
        let h = self.thickness * 0.5;
        let mut corners = [Vec3::ZERO; 8];
        for (i, c) in corners.iter_mut().enumerate() {
            let sx = if i & 1 == 0 { -h.x } else { h.x };
            let sy = if i & 2 == 0 { -h.y } else { h.y };
            let sz = if i & 4 == 0 { -h.z } else { h.z };
            *c = mat4_transform_point(&rot, t + Vec3::new(sx, sy, sz));
        }
        corners
    }
}
