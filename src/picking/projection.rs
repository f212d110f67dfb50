//! Projection of a window location onto the model under the mouse

use crate::model::Structure;
use crate::rasterizer::{triangle_area_2d, Vec3};

/// Window-space area below which a triangle is treated as a point
pub const DEGENERATE_TRIANGLE_AREA: f32 = 0.001;

/// Barycentric location on a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarycentricProjection {
    pub nodes: [usize; 3],
    /// Non-negative, sum to one
    pub weights: [f32; 3],
    /// Number of nodes in the surface the location refers to
    pub surface_node_count: usize,
}

/// Output of a projection pass
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionResult {
    pub stereotaxic_xyz: Option<Vec3>,
    pub structure: Option<Structure>,
    pub barycentric: Option<BarycentricProjection>,
    pub screen_depth: f32,
}

impl Default for ProjectionResult {
    fn default() -> Self {
        Self {
            stereotaxic_xyz: None,
            structure: None,
            barycentric: None,
            screen_depth: f32::MAX,
        }
    }
}

impl ProjectionResult {
    pub fn is_valid(&self) -> bool {
        self.stereotaxic_xyz.is_some()
    }

    /// Replace the stored projection only if `depth` is strictly nearer
    pub fn offer(
        &mut self,
        depth: f32,
        xyz: Vec3,
        structure: Structure,
        barycentric: Option<BarycentricProjection>,
    ) -> bool {
        if !(depth < self.screen_depth) {
            return false;
        }
        self.screen_depth = depth;
        self.stereotaxic_xyz = Some(xyz);
        self.structure = Some(structure);
        self.barycentric = barycentric;
        true
    }
}

/// Weights of `mouse` against the window-projected triangle `window`
/// (z ignored), plus the interpolated model position.
///
/// Degenerate triangles put all the weight on the first vertex.
pub fn barycentric_weights(
    window: [Vec3; 3],
    model: [Vec3; 3],
    nodes: [usize; 3],
    mouse: (f32, f32),
) -> (Vec3, [usize; 3], [f32; 3]) {
    let flat = |v: Vec3| Vec3::new(v.x, v.y, 0.0);
    let w = [flat(window[0]), flat(window[1]), flat(window[2])];
    let p = Vec3::new(mouse.0, mouse.1, 0.0);

    let area = triangle_area_2d(w[0], w[1], w[2]);
    if area < DEGENERATE_TRIANGLE_AREA {
        return (model[0], [nodes[0]; 3], [1.0, 0.0, 0.0]);
    }

    let areas = [
        triangle_area_2d(p, w[1], w[2]),
        triangle_area_2d(p, w[2], w[0]),
        triangle_area_2d(p, w[0], w[1]),
    ];
    // Equals `area` inside the triangle; larger when the sample is just
    // outside an edge, so normalizing keeps the weights a partition of one
    let total = areas[0] + areas[1] + areas[2];
    let weights = [areas[0] / total, areas[1] / total, areas[2] / total];
    let xyz = model[0] * weights[0] + model[1] * weights[1] + model[2] * weights[2];
    (xyz, nodes, weights)
}
