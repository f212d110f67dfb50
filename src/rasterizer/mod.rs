//! Software implementation of a fixed-function graphics context
//!
//! Features:
//! - Orthographic/perspective projection with a modelview matrix stack
//! - Six user clip planes evaluated per fragment
//! - Depth test, depth offset, separate RGB/alpha blending
//! - Flat and Gouraud shading with a two-light setup
//! - Exact color/depth read-back for picking
//!
//! # Module Organization
//!
//! - `types` - Rgba, blending, Viewport, Texture, DrawStats
//! - `math` - Vec3, Vec2, Mat4 and helpers
//! - `render` - Framebuffer and primitive rasterization
//! - `context` - GraphicsContext state machine and scoped guards

pub mod context;
pub mod math;
pub mod render;
pub mod types;

// =============================================================================
// Convenience re-exports for commonly used items
// =============================================================================

pub use types::{BlendFactor, BlendFunc, DrawStats, Rgba, ShadeModel, Texture, Viewport};

pub use math::{
    Vec2, Vec3, Mat4,
    mat4_identity, mat4_translation, mat4_scale, mat4_rotation,
    mat4_rotation_x, mat4_rotation_y, mat4_rotation_z, mat4_rotation_angles,
    mat4_ortho, mat4_mul, mat4_inverse, mat4_transform_point, mat4_transform_vector,
    triangle_area_2d,
};

pub use render::{Framebuffer, MAX_CLIP_PLANES, DEPTH_CLEAR};

pub use context::{
    ClearMask, GraphicsContext, GraphicsError, MatrixGuard, RenderState, StateGuard, Vertex,
    project_with, unproject_with,
};
