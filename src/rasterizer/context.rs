//! Fixed-function graphics context
//!
//! Owns the framebuffer and the state a draw call mutates: viewport,
//! projection, modelview stack, user clip planes, depth/blend flags and
//! lighting. Callers restore state with the scoped guards returned by
//! [`GraphicsContext::push_matrix`] and [`GraphicsContext::save_state`],
//! or with the frame-level guards built on top of them.

use std::fmt;

use super::math::{
    mat4_identity, mat4_inverse, mat4_mul, mat4_scale, mat4_transform_point, mat4_transform_vec4,
    mat4_transform_vector, mat4_translation, mat4_transpose, Mat4, Vec2, Vec3,
};
use super::render::{
    rasterize_line, rasterize_point, rasterize_triangle, FragmentState, Framebuffer, ScreenVertex, MAX_CLIP_PLANES,
};
use super::types::{BlendFunc, DrawStats, Rgba, ShadeModel, Texture, Viewport};

/// Deepest modelview stack allowed before an overflow error is recorded
pub const MAX_MATRIX_STACK_DEPTH: usize = 32;

/// Ambient term of the two-light setup
const LIGHT_AMBIENT: f32 = 0.2;
/// Diffuse term of each light
const LIGHT_DIFFUSE: f32 = 0.8;

/// Error reported by the context after an invalid operation
#[derive(Debug, Clone, PartialEq)]
pub enum GraphicsError {
    StackOverflow,
    StackUnderflow,
    InvalidClipPlane(usize),
    InvalidValue(&'static str),
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsError::StackOverflow => write!(f, "modelview stack overflow"),
            GraphicsError::StackUnderflow => write!(f, "modelview stack underflow"),
            GraphicsError::InvalidClipPlane(i) => write!(f, "clip plane index {} out of range", i),
            GraphicsError::InvalidValue(what) => write!(f, "invalid value for {}", what),
        }
    }
}

impl std::error::Error for GraphicsError {}

/// Which buffers a clear touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearMask {
    pub color: bool,
    pub depth: bool,
}

impl ClearMask {
    pub const ALL: ClearMask = ClearMask { color: true, depth: true };
    pub const DEPTH: ClearMask = ClearMask { color: false, depth: true };
}

/// Vertex submitted to the context in model coordinates
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub pos: Vec3,
    pub normal: Vec3,
    pub color: Rgba,
    pub uv: Vec2,
}

impl Vertex {
    pub fn new(pos: Vec3, color: Rgba) -> Self {
        Self { pos, normal: Vec3::Z, color, uv: Vec2::default() }
    }

    pub fn lit(pos: Vec3, normal: Vec3, color: Rgba) -> Self {
        Self { pos, normal, color, uv: Vec2::default() }
    }

    pub fn textured(pos: Vec3, uv: Vec2, color: Rgba) -> Self {
        Self { pos, normal: Vec3::Z, color, uv }
    }
}

/// Restorable render state (everything except the framebuffer contents)
#[derive(Debug, Clone)]
pub struct RenderState {
    pub viewport: Viewport,
    pub projection: Mat4,
    pub depth_test: bool,
    pub depth_write: bool,
    pub blend: Option<BlendFunc>,
    pub shade: ShadeModel,
    pub lighting: bool,
    pub polygon_offset: f32,
    pub point_size: f32,
    pub line_width: f32,
    /// Eye-space plane equations
    pub clip_planes: [[f32; 4]; MAX_CLIP_PLANES],
    pub clip_enabled: [bool; MAX_CLIP_PLANES],
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            projection: mat4_identity(),
            depth_test: false,
            depth_write: true,
            blend: None,
            shade: ShadeModel::Smooth,
            lighting: false,
            polygon_offset: 0.0,
            point_size: 1.0,
            line_width: 1.0,
            clip_planes: [[0.0; 4]; MAX_CLIP_PLANES],
            clip_enabled: [false; MAX_CLIP_PLANES],
        }
    }
}

/// Software graphics context
pub struct GraphicsContext {
    pub fb: Framebuffer,
    state: RenderState,
    /// Never empty, last entry is the current modelview
    modelview: Vec<Mat4>,
    errors: Vec<GraphicsError>,
    stats: DrawStats,
}

impl GraphicsContext {
    pub fn new(width: usize, height: usize) -> Self {
        let mut state = RenderState::default();
        state.viewport = Viewport::new(0, 0, width as i32, height as i32);
        Self {
            fb: Framebuffer::new(width, height),
            state,
            modelview: vec![mat4_identity()],
            errors: Vec::new(),
            stats: DrawStats::default(),
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.fb.resize(width, height);
    }

    pub fn width(&self) -> usize {
        self.fb.width
    }

    pub fn height(&self) -> usize {
        self.fb.height
    }

    // =========================================================================
    // State access
    // =========================================================================

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.state.viewport = viewport;
    }

    pub fn viewport(&self) -> Viewport {
        self.state.viewport
    }

    pub fn set_projection(&mut self, projection: Mat4) {
        self.state.projection = projection;
    }

    pub fn projection(&self) -> Mat4 {
        self.state.projection
    }

    pub fn set_depth_test(&mut self, enabled: bool) {
        self.state.depth_test = enabled;
    }

    pub fn set_depth_write(&mut self, enabled: bool) {
        self.state.depth_write = enabled;
    }

    pub fn set_blend(&mut self, blend: Option<BlendFunc>) {
        self.state.blend = blend;
    }

    pub fn set_shade_model(&mut self, shade: ShadeModel) {
        self.state.shade = shade;
    }

    pub fn set_lighting(&mut self, enabled: bool) {
        self.state.lighting = enabled;
    }

    pub fn lighting(&self) -> bool {
        self.state.lighting
    }

    /// Depth bias added to triangle fragments (normalized depth units)
    pub fn set_polygon_offset(&mut self, offset: f32) {
        self.state.polygon_offset = offset;
    }

    pub fn set_point_size(&mut self, size: f32) {
        if size > 0.0 {
            self.state.point_size = size;
        } else {
            self.errors.push(GraphicsError::InvalidValue("point size"));
        }
    }

    pub fn set_line_width(&mut self, width: f32) {
        if width > 0.0 {
            self.state.line_width = width;
        } else {
            self.errors.push(GraphicsError::InvalidValue("line width"));
        }
    }

    // =========================================================================
    // Modelview stack
    // =========================================================================

    pub fn modelview(&self) -> Mat4 {
        self.modelview.last().copied().unwrap_or_else(mat4_identity)
    }

    pub fn matrix_depth(&self) -> usize {
        self.modelview.len()
    }

    fn current_mut(&mut self) -> &mut Mat4 {
        if self.modelview.is_empty() {
            self.modelview.push(mat4_identity());
        }
        let last = self.modelview.len() - 1;
        &mut self.modelview[last]
    }

    pub fn load_identity(&mut self) {
        *self.current_mut() = mat4_identity();
    }

    pub fn load_matrix(&mut self, m: Mat4) {
        *self.current_mut() = m;
    }

    pub fn mult_matrix(&mut self, m: &Mat4) {
        let cur = self.current_mut();
        *cur = mat4_mul(cur, m);
    }

    pub fn translate(&mut self, t: Vec3) {
        self.mult_matrix(&mat4_translation(t));
    }

    pub fn scale(&mut self, s: Vec3) {
        self.mult_matrix(&mat4_scale(s));
    }

    /// Push a copy of the current modelview (glPushMatrix)
    pub fn push_matrix_raw(&mut self) {
        if self.modelview.len() >= MAX_MATRIX_STACK_DEPTH {
            self.errors.push(GraphicsError::StackOverflow);
            return;
        }
        let top = self.modelview();
        self.modelview.push(top);
    }

    /// Pop the modelview (glPopMatrix)
    pub fn pop_matrix_raw(&mut self) {
        if self.modelview.len() <= 1 {
            self.errors.push(GraphicsError::StackUnderflow);
            return;
        }
        self.modelview.pop();
    }

    /// Truncate the stack back to `depth` entries
    pub fn restore_matrix_depth(&mut self, depth: usize) {
        let depth = depth.max(1);
        if self.modelview.len() < depth {
            self.errors.push(GraphicsError::StackUnderflow);
            return;
        }
        self.modelview.truncate(depth);
    }

    /// Scoped push; the stack is restored when the guard drops
    pub fn push_matrix(&mut self) -> MatrixGuard<'_> {
        let depth = self.matrix_depth();
        self.push_matrix_raw();
        MatrixGuard { ctx: self, depth }
    }

    /// Snapshot of all render state plus the modelview stack depth
    pub fn snapshot(&self) -> (RenderState, usize) {
        (self.state.clone(), self.matrix_depth())
    }

    pub fn restore(&mut self, snapshot: (RenderState, usize)) {
        self.state = snapshot.0;
        self.restore_matrix_depth(snapshot.1);
    }

    /// Scoped state save; everything is restored when the guard drops
    pub fn save_state(&mut self) -> StateGuard<'_> {
        let saved = Some(self.snapshot());
        StateGuard { ctx: self, saved }
    }

    // =========================================================================
    // Clip planes
    // =========================================================================

    /// Set a clip plane given in current model coordinates (glClipPlane).
    /// The plane is kept `a*x + b*y + c*z + d >= 0`.
    pub fn set_clip_plane(&mut self, index: usize, plane: [f32; 4]) {
        if index >= MAX_CLIP_PLANES {
            self.errors.push(GraphicsError::InvalidClipPlane(index));
            return;
        }
        // Eye-space plane = plane * inverse(modelview)
        let eye = match mat4_inverse(&self.modelview()) {
            Some(inv) => mat4_transform_vec4(&mat4_transpose(&inv), plane),
            None => {
                self.errors.push(GraphicsError::InvalidValue("clip plane transform"));
                return;
            }
        };
        self.state.clip_planes[index] = eye;
    }

    pub fn enable_clip_plane(&mut self, index: usize, enabled: bool) {
        if index >= MAX_CLIP_PLANES {
            self.errors.push(GraphicsError::InvalidClipPlane(index));
            return;
        }
        self.state.clip_enabled[index] = enabled;
    }

    pub fn disable_clip_planes(&mut self) {
        self.state.clip_enabled = [false; MAX_CLIP_PLANES];
    }

    pub fn active_clip_planes(&self) -> usize {
        self.state.clip_enabled.iter().filter(|e| **e).count()
    }

    // =========================================================================
    // Buffers
    // =========================================================================

    /// Full-buffer clear (ignores the viewport, like glClear)
    pub fn clear(&mut self, mask: ClearMask, color: Rgba) {
        match (mask.color, mask.depth) {
            (true, true) => self.fb.clear(color),
            (true, false) => self.fb.clear_rect(self.fb.bounds(), Some(color), false),
            (false, true) => self.fb.clear_depth(),
            (false, false) => {}
        }
    }

    /// Clear restricted to a scissor rectangle
    pub fn clear_rect(&mut self, rect: Viewport, mask: ClearMask, color: Rgba) {
        let color = if mask.color { Some(color) } else { None };
        self.fb.clear_rect(rect, color, mask.depth);
    }

    /// Color at a window pixel (top-left origin)
    pub fn read_pixel(&self, x: i32, y: i32) -> Option<[u8; 3]> {
        self.fb.pixel(x, y).map(|p| [p[0], p[1], p[2]])
    }

    /// Normalized depth at a window pixel
    pub fn read_depth(&self, x: i32, y: i32) -> Option<f32> {
        self.fb.depth(x, y)
    }

    // =========================================================================
    // Errors and statistics
    // =========================================================================

    pub fn push_error(&mut self, error: GraphicsError) {
        self.errors.push(error);
    }

    pub fn take_errors(&mut self) -> Vec<GraphicsError> {
        std::mem::take(&mut self.errors)
    }

    /// Drain and log pending errors with the call site. Drawing continues.
    pub fn check_errors(&mut self, site: &str) -> usize {
        let errors = self.take_errors();
        for e in &errors {
            log::error!(
                "graphics error at {}: {} (modelview depth {}, viewport {:?})",
                site,
                e,
                self.matrix_depth(),
                self.state.viewport
            );
        }
        errors.len()
    }

    pub fn stats(&self) -> DrawStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = DrawStats::default();
    }

    // =========================================================================
    // Vertex processing
    // =========================================================================

    fn mvp(&self) -> Mat4 {
        mat4_mul(&self.state.projection, &self.modelview())
    }

    /// Model point to window coordinates (x, y, normalized depth).
    /// `None` when the homogeneous w is zero.
    pub fn project(&self, p: Vec3) -> Option<Vec3> {
        project_with(&self.mvp(), self.state.viewport, p)
    }

    /// Window coordinates back to model space (gluUnProject)
    pub fn unproject(&self, wx: f32, wy: f32, depth: f32) -> Option<Vec3> {
        unproject_with(&self.mvp(), self.state.viewport, wx, wy, depth)
    }

    fn light(&self, mv: &Mat4, normal: Vec3, color: Rgba) -> Rgba {
        if !self.state.lighting {
            return color;
        }
        // Light 0 along +Z, light 1 opposite it, both directional
        let n = mat4_transform_vector(mv, normal).normalize();
        let diffuse = n.z.max(0.0) * LIGHT_DIFFUSE + (-n.z).max(0.0) * LIGHT_DIFFUSE;
        color.shade((LIGHT_AMBIENT + diffuse).min(1.0))
    }

    fn to_screen(&self, mvp: &Mat4, mv: &Mat4, v: &Vertex) -> Option<ScreenVertex> {
        let w = project_with(mvp, self.state.viewport, v.pos)?;
        let eye = mat4_transform_point(mv, v.pos);
        let mut clip = [0.0; MAX_CLIP_PLANES];
        for (i, plane) in self.state.clip_planes.iter().enumerate() {
            if self.state.clip_enabled[i] {
                clip[i] = plane[0] * eye.x + plane[1] * eye.y + plane[2] * eye.z + plane[3];
            }
        }
        Some(ScreenVertex {
            x: w.x,
            y: w.y,
            depth: w.z,
            color: self.light(mv, v.normal, v.color),
            uv: v.uv,
            clip,
        })
    }

    fn fragment_state<'t>(&self, texture: Option<&'t Texture>) -> FragmentState<'t> {
        FragmentState {
            scissor: self
                .state
                .viewport
                .intersection(&self.fb.bounds())
                .unwrap_or_default(),
            depth_test: self.state.depth_test,
            depth_write: self.state.depth_write,
            blend: self.state.blend,
            shade: self.state.shade,
            clip_enabled: self.state.clip_enabled,
            depth_offset: 0.0,
            texture,
        }
    }

    // =========================================================================
    // Primitives
    // =========================================================================

    pub fn draw_triangle(&mut self, v: [Vertex; 3]) {
        self.draw_triangle_textured(v, None);
    }

    pub fn draw_triangle_textured(&mut self, v: [Vertex; 3], texture: Option<&Texture>) {
        self.stats.triangles += 1;
        let mvp = self.mvp();
        let mv = self.modelview();
        let (Some(a), Some(b), Some(c)) = (
            self.to_screen(&mvp, &mv, &v[0]),
            self.to_screen(&mvp, &mv, &v[1]),
            self.to_screen(&mvp, &mv, &v[2]),
        ) else {
            return;
        };
        let mut st = self.fragment_state(texture);
        st.depth_offset = self.state.polygon_offset;
        rasterize_triangle(&mut self.fb, &st, &[a, b, c]);
    }

    /// Quad as two triangles (a, b, c) and (a, c, d)
    pub fn draw_quad(&mut self, v: [Vertex; 4]) {
        self.draw_triangle([v[0], v[1], v[2]]);
        self.draw_triangle([v[0], v[2], v[3]]);
    }

    pub fn draw_quad_textured(&mut self, v: [Vertex; 4], texture: &Texture) {
        self.draw_triangle_textured([v[0], v[1], v[2]], Some(texture));
        self.draw_triangle_textured([v[0], v[2], v[3]], Some(texture));
    }

    pub fn draw_line(&mut self, a: Vertex, b: Vertex) {
        self.stats.lines += 1;
        let mvp = self.mvp();
        let mv = self.modelview();
        let (Some(sa), Some(sb)) = (self.to_screen(&mvp, &mv, &a), self.to_screen(&mvp, &mv, &b)) else {
            return;
        };
        let st = self.fragment_state(None);
        rasterize_line(&mut self.fb, &st, &sa, &sb, self.state.line_width);
    }

    pub fn draw_line_strip(&mut self, vertices: &[Vertex]) {
        for pair in vertices.windows(2) {
            self.draw_line(pair[0], pair[1]);
        }
    }

    pub fn draw_point(&mut self, v: Vertex) {
        self.stats.points += 1;
        let mvp = self.mvp();
        let mv = self.modelview();
        let Some(sv) = self.to_screen(&mvp, &mv, &v) else {
            return;
        };
        let st = self.fragment_state(None);
        rasterize_point(&mut self.fb, &st, &sv, self.state.point_size);
    }
}

/// Project through an arbitrary matrix and viewport
pub fn project_with(mvp: &Mat4, viewport: Viewport, p: Vec3) -> Option<Vec3> {
    let clip = mat4_transform_vec4(mvp, [p.x, p.y, p.z, 1.0]);
    if clip[3].abs() < 1.0e-12 {
        return None;
    }
    let ndc = Vec3::new(clip[0] / clip[3], clip[1] / clip[3], clip[2] / clip[3]);
    Some(Vec3::new(
        viewport.x as f32 + (ndc.x + 1.0) * 0.5 * viewport.width as f32,
        // Window y grows downward
        viewport.y as f32 + (1.0 - ndc.y) * 0.5 * viewport.height as f32,
        (ndc.z + 1.0) * 0.5,
    ))
}

/// Inverse of [`project_with`]
pub fn unproject_with(mvp: &Mat4, viewport: Viewport, wx: f32, wy: f32, depth: f32) -> Option<Vec3> {
    if viewport.is_empty() {
        return None;
    }
    let inv = mat4_inverse(mvp)?;
    let ndc = [
        (wx - viewport.x as f32) / viewport.width as f32 * 2.0 - 1.0,
        1.0 - (wy - viewport.y as f32) / viewport.height as f32 * 2.0,
        depth * 2.0 - 1.0,
        1.0,
    ];
    let obj = mat4_transform_vec4(&inv, ndc);
    if obj[3].abs() < 1.0e-12 {
        return None;
    }
    Some(Vec3::new(obj[0] / obj[3], obj[1] / obj[3], obj[2] / obj[3]))
}

// =============================================================================
// Scoped guards
// =============================================================================

/// Restores the modelview stack depth on drop
pub struct MatrixGuard<'a> {
    ctx: &'a mut GraphicsContext,
    depth: usize,
}

impl std::ops::Deref for MatrixGuard<'_> {
    type Target = GraphicsContext;
    fn deref(&self) -> &GraphicsContext {
        self.ctx
    }
}

impl std::ops::DerefMut for MatrixGuard<'_> {
    fn deref_mut(&mut self) -> &mut GraphicsContext {
        self.ctx
    }
}

impl Drop for MatrixGuard<'_> {
    fn drop(&mut self) {
        self.ctx.restore_matrix_depth(self.depth);
    }
}

/// Restores the full render state on drop
pub struct StateGuard<'a> {
    ctx: &'a mut GraphicsContext,
    saved: Option<(RenderState, usize)>,
}

impl std::ops::Deref for StateGuard<'_> {
    type Target = GraphicsContext;
    fn deref(&self) -> &GraphicsContext {
        self.ctx
    }
}

impl std::ops::DerefMut for StateGuard<'_> {
    fn deref_mut(&mut self) -> &mut GraphicsContext {
        self.ctx
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.ctx.restore(saved);
        }
    }
}
