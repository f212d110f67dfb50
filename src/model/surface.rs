//! Surface mesh data and its display options

use serde::{Deserialize, Serialize};

use crate::rasterizer::{Rgba, Vec3};

use super::{Structure, ViewTransform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceType {
    Anatomical,
    Reconstruction,
    Inflated,
    VeryInflated,
    Spherical,
    Flat,
}

impl SurfaceType {
    /// Surfaces that keep true stereotaxic coordinates
    pub fn is_anatomical(self) -> bool {
        matches!(self, SurfaceType::Anatomical | SurfaceType::Reconstruction)
    }
}

/// Triangle mesh with per-node normals
#[derive(Debug, Clone)]
pub struct SurfaceGeometry {
    pub name: String,
    pub structure: Structure,
    pub surface_type: SurfaceType,
    pub coordinates: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub triangles: Vec<[usize; 3]>,
}

impl SurfaceGeometry {
    pub fn node_count(&self) -> usize {
        self.coordinates.len()
    }

    /// All three nodes exist
    pub fn is_valid_triangle(&self, tri: &[usize; 3]) -> bool {
        tri.iter().all(|n| *n < self.coordinates.len())
    }

    pub fn normal(&self, node: usize) -> Vec3 {
        self.normals.get(node).copied().unwrap_or(Vec3::Z)
    }

    /// Axis-aligned bounds, `None` for an empty mesh
    pub fn bounding_box(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.coordinates.first()?;
        Some(
            self.coordinates
                .iter()
                .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p))),
        )
    }

    pub fn center(&self) -> Vec3 {
        match self.bounding_box() {
            Some((lo, hi)) => (lo + hi) * 0.5,
            None => Vec3::ZERO,
        }
    }

    /// Recompute smooth normals from triangle faces
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.coordinates.len()];
        for tri in &self.triangles {
            if !tri.iter().all(|n| *n < normals.len()) {
                continue;
            }
            let [a, b, c] = [self.coordinates[tri[0]], self.coordinates[tri[1]], self.coordinates[tri[2]]];
            let face = (b - a).cross(c - a);
            for n in tri {
                normals[*n] = normals[*n] + face;
            }
        }
        self.normals = normals.into_iter().map(Vec3::normalize).collect();
    }
}

/// Closed or open polyline along surface nodes
#[derive(Debug, Clone)]
pub struct Border {
    pub name: String,
    pub nodes: Vec<usize>,
    pub color: Rgba,
    pub closed: bool,
}

/// Point of interest in stereotaxic space
#[derive(Debug, Clone)]
pub struct Focus {
    pub name: String,
    pub xyz: Vec3,
    pub color: Rgba,
    /// Drawn size in model units
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SurfaceDrawStyle {
    #[default]
    Triangles,
    /// Wireframe with hidden back edges
    Links,
    Nodes,
}

/// A surface and everything drawn on it
#[derive(Clone)]
pub struct SurfaceLayer<'a> {
    pub geometry: &'a SurfaceGeometry,
    /// Shaded color per node, computed by the caller from palettes/labels
    pub node_rgba: &'a [Rgba],
    pub opacity: f32,
    pub style: SurfaceDrawStyle,
    pub borders: &'a [Border],
    pub foci: &'a [Focus],
    pub show_normals: bool,
    pub border_width: f32,
}

impl<'a> SurfaceLayer<'a> {
    pub fn new(geometry: &'a SurfaceGeometry, node_rgba: &'a [Rgba]) -> Self {
        Self {
            geometry,
            node_rgba,
            opacity: 1.0,
            style: SurfaceDrawStyle::Triangles,
            borders: &[],
            foci: &[],
            show_normals: false,
            border_width: 2.0,
        }
    }

    /// Node color with the layer opacity applied
    pub fn node_color(&self, node: usize) -> Rgba {
        let c = self.node_rgba.get(node).copied().unwrap_or(Rgba::rgb(0.7, 0.7, 0.7));
        c.with_alpha(c.a * self.opacity)
    }
}

/// Single surface shown in a tab
#[derive(Clone)]
pub struct SurfaceModel<'a> {
    pub layer: SurfaceLayer<'a>,
    pub view: ViewTransform,
    /// Draw with a left/right mirrored projection (right lateral view yoked
    /// to a left one)
    pub mirrored: bool,
}
