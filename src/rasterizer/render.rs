//! Framebuffer and primitive rasterization
//!
//! Triangles use incremental edge functions sampled at pixel centers,
//! lines and points are stamped as squares. Every fragment goes through
//! [`write_fragment`], which applies scissor, depth test, blending and the
//! depth write mask in that order.

use super::math::Vec2;
use super::types::{BlendFunc, Rgba, ShadeModel, Texture, Viewport};

/// Number of user clip planes supported by the context
pub const MAX_CLIP_PLANES: usize = 6;

/// Depth value written by a depth clear (farthest)
pub const DEPTH_CLEAR: f32 = 1.0;

/// Framebuffer for software rendering
pub struct Framebuffer {
    pub pixels: Vec<u8>,    // RGBA, 4 bytes per pixel
    pub zbuffer: Vec<f32>,  // Normalized depth, 0 = near
    pub width: usize,
    pub height: usize,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height * 4],
            zbuffer: vec![DEPTH_CLEAR; width * height],
            width,
            height,
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.pixels = vec![0; width * height * 4];
            self.zbuffer = vec![DEPTH_CLEAR; width * height];
        }
    }

    pub fn bounds(&self) -> Viewport {
        Viewport::new(0, 0, self.width as i32, self.height as i32)
    }

    pub fn clear(&mut self, color: Rgba) {
        let bytes = color.to_bytes();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
        self.zbuffer.fill(DEPTH_CLEAR);
    }

    pub fn clear_depth(&mut self) {
        self.zbuffer.fill(DEPTH_CLEAR);
    }

    /// Scissored clear of a sub-rectangle. `color` of `None` leaves the
    /// color plane untouched.
    pub fn clear_rect(&mut self, rect: Viewport, color: Option<Rgba>, depth: bool) {
        let Some(r) = rect.intersection(&self.bounds()) else {
            return;
        };
        let bytes = color.map(Rgba::to_bytes);
        for y in r.y..r.bottom() {
            for x in r.x..r.right() {
                let i = y as usize * self.width + x as usize;
                if let Some(b) = bytes {
                    self.pixels[i * 4..i * 4 + 4].copy_from_slice(&b);
                }
                if depth {
                    self.zbuffer[i] = DEPTH_CLEAR;
                }
            }
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        let i = (y as usize * self.width + x as usize) * 4;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]])
    }

    pub fn depth(&self, x: i32, y: i32) -> Option<f32> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(self.zbuffer[y as usize * self.width + x as usize])
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Rgba) {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) * 4;
            self.pixels[idx..idx + 4].copy_from_slice(&color.to_bytes());
        }
    }

    /// Diagonal stripes of `line` over `background`, depth untouched
    pub fn fill_hatched_rect(&mut self, rect: Viewport, background: Rgba, line: Rgba, spacing: i32) {
        let Some(r) = rect.intersection(&self.bounds()) else {
            return;
        };
        let spacing = spacing.max(2);
        for y in r.y..r.bottom() {
            for x in r.x..r.right() {
                let color = if (x + y).rem_euclid(spacing) < 2 { line } else { background };
                self.set_pixel(x as usize, y as usize, color);
            }
        }
    }
}

// =============================================================================
// Fragment pipeline
// =============================================================================

/// Vertex after projection to window coordinates
#[derive(Debug, Clone, Copy)]
pub struct ScreenVertex {
    pub x: f32,
    pub y: f32,
    /// Normalized window depth (0 = near plane)
    pub depth: f32,
    pub color: Rgba,
    pub uv: Vec2,
    /// Signed distance to each user clip plane (negative = clipped)
    pub clip: [f32; MAX_CLIP_PLANES],
}

/// Per-primitive fragment state snapshot taken from the context
#[derive(Clone, Copy)]
pub struct FragmentState<'a> {
    /// Viewport clamped to the framebuffer
    pub scissor: Viewport,
    pub depth_test: bool,
    pub depth_write: bool,
    pub blend: Option<BlendFunc>,
    pub shade: ShadeModel,
    pub clip_enabled: [bool; MAX_CLIP_PLANES],
    /// Added to every triangle fragment depth (positive pushes away)
    pub depth_offset: f32,
    pub texture: Option<&'a Texture>,
}

impl FragmentState<'_> {
    fn clipped(&self, dist: &[f32; MAX_CLIP_PLANES]) -> bool {
        self.clip_enabled
            .iter()
            .zip(dist.iter())
            .any(|(enabled, d)| *enabled && *d < 0.0)
    }
}

/// Depth test, blend and write a single fragment. Returns true if written.
pub fn write_fragment(fb: &mut Framebuffer, state: &FragmentState, x: i32, y: i32, depth: f32, color: Rgba) -> bool {
    if !state.scissor.contains(x, y) {
        return false;
    }
    if !(0.0..=1.0).contains(&depth) {
        return false;
    }
    let i = y as usize * fb.width + x as usize;
    if state.depth_test && !(depth < fb.zbuffer[i]) {
        return false;
    }

    let out = match state.blend {
        Some(func) => {
            let p = &fb.pixels[i * 4..i * 4 + 4];
            let dst = Rgba::from_bytes([p[0], p[1], p[2], p[3]]);
            func.apply(color, dst)
        }
        None => color,
    };
    fb.pixels[i * 4..i * 4 + 4].copy_from_slice(&out.to_bytes());
    if state.depth_write {
        fb.zbuffer[i] = depth;
    }
    true
}

fn lerp_clip(a: &[f32; MAX_CLIP_PLANES], b: &[f32; MAX_CLIP_PLANES], t: f32) -> [f32; MAX_CLIP_PLANES] {
    let mut out = [0.0; MAX_CLIP_PLANES];
    for i in 0..MAX_CLIP_PLANES {
        out[i] = a[i] + (b[i] - a[i]) * t;
    }
    out
}

/// Rasterize a single triangle using incremental barycentric stepping.
/// Returns the number of fragments written.
pub fn rasterize_triangle(fb: &mut Framebuffer, state: &FragmentState, v: &[ScreenVertex; 3]) -> usize {
    let (v1, v2, v3) = (&v[0], &v[1], &v[2]);

    let min_x = (v1.x.min(v2.x).min(v3.x).floor() as i32).max(state.scissor.x);
    let max_x = (v1.x.max(v2.x).max(v3.x).ceil() as i32).min(state.scissor.right());
    let min_y = (v1.y.min(v2.y).min(v3.y).floor() as i32).max(state.scissor.y);
    let max_y = (v1.y.max(v2.y).max(v3.y).ceil() as i32).min(state.scissor.bottom());

    // Early exit for off-screen triangles
    if min_x >= max_x || min_y >= max_y {
        return 0;
    }

    // Triangle area * 2 (used for normalization)
    let area = (v2.y - v3.y) * (v1.x - v3.x) + (v3.x - v2.x) * (v1.y - v3.y);
    if area.abs() < 1.0e-8 {
        return 0;
    }
    let inv_area = 1.0 / area;

    // Edge function coefficients for bc.x (weight of v1) and bc.y (weight of v2)
    let a0 = v2.y - v3.y;
    let b0 = v3.x - v2.x;
    let a1 = v3.y - v1.y;
    let b1 = v1.x - v3.x;

    // Sample at pixel centers
    let start_x = min_x as f32 + 0.5;
    let start_y = min_y as f32 + 0.5;
    let mut w0_row = a0 * (start_x - v3.x) + b0 * (start_y - v3.y);
    let mut w1_row = a1 * (start_x - v3.x) + b1 * (start_y - v3.y);

    let mut written = 0;
    for y in min_y..max_y {
        let mut w0 = w0_row;
        let mut w1 = w1_row;

        for x in min_x..max_x {
            let bc_x = w0 * inv_area;
            let bc_y = w1 * inv_area;
            let bc_z = 1.0 - bc_x - bc_y;

            const ERR: f32 = -0.0001;
            if bc_x >= ERR && bc_y >= ERR && bc_z >= ERR {
                let mut clip = [0.0; MAX_CLIP_PLANES];
                for (i, c) in clip.iter_mut().enumerate() {
                    *c = bc_x * v1.clip[i] + bc_y * v2.clip[i] + bc_z * v3.clip[i];
                }
                if !state.clipped(&clip) {
                    let depth = bc_x * v1.depth + bc_y * v2.depth + bc_z * v3.depth + state.depth_offset;
                    let mut color = match state.shade {
                        ShadeModel::Flat => v3.color,
                        ShadeModel::Smooth => Rgba {
                            r: bc_x * v1.color.r + bc_y * v2.color.r + bc_z * v3.color.r,
                            g: bc_x * v1.color.g + bc_y * v2.color.g + bc_z * v3.color.g,
                            b: bc_x * v1.color.b + bc_y * v2.color.b + bc_z * v3.color.b,
                            a: bc_x * v1.color.a + bc_y * v2.color.a + bc_z * v3.color.a,
                        },
                    };
                    if let Some(tex) = state.texture {
                        let u = bc_x * v1.uv.x + bc_y * v2.uv.x + bc_z * v3.uv.x;
                        let t = bc_x * v1.uv.y + bc_y * v2.uv.y + bc_z * v3.uv.y;
                        let texel = tex.sample(u, t);
                        color = Rgba {
                            r: texel.r * color.r,
                            g: texel.g * color.g,
                            b: texel.b * color.b,
                            a: texel.a * color.a,
                        };
                    }
                    if write_fragment(fb, state, x, y, depth, color) {
                        written += 1;
                    }
                }
            }

            w0 += a0;
            w1 += a1;
        }

        w0_row += b0;
        w1_row += b1;
    }
    written
}

/// Stamp a `size` x `size` square centered on (cx, cy)
fn stamp(fb: &mut Framebuffer, state: &FragmentState, cx: f32, cy: f32, size: f32, depth: f32, color: Rgba) -> usize {
    let n = size.round().max(1.0) as i32;
    let x0 = (cx - n as f32 / 2.0).round() as i32;
    let y0 = (cy - n as f32 / 2.0).round() as i32;
    let mut written = 0;
    for dy in 0..n {
        for dx in 0..n {
            if write_fragment(fb, state, x0 + dx, y0 + dy, depth, color) {
                written += 1;
            }
        }
    }
    written
}

/// Rasterize a line segment with the given pixel width
pub fn rasterize_line(fb: &mut Framebuffer, state: &FragmentState, a: &ScreenVertex, b: &ScreenVertex, width: f32) -> usize {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
    let mut written = 0;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let clip = lerp_clip(&a.clip, &b.clip, t);
        if state.clipped(&clip) {
            continue;
        }
        let color = match state.shade {
            ShadeModel::Flat => b.color,
            ShadeModel::Smooth => a.color.lerp(b.color, t),
        };
        let depth = a.depth + (b.depth - a.depth) * t;
        let x = a.x + dx * t;
        let y = a.y + dy * t;
        if width <= 1.0 {
            if write_fragment(fb, state, x.floor() as i32, y.floor() as i32, depth, color) {
                written += 1;
            }
        } else {
            written += stamp(fb, state, x, y, width, depth, color);
        }
    }
    written
}

/// Rasterize a square point sprite
pub fn rasterize_point(fb: &mut Framebuffer, state: &FragmentState, v: &ScreenVertex, size: f32) -> usize {
    if state.clipped(&v.clip) {
        return 0;
    }
    stamp(fb, state, v.x, v.y, size, v.depth, v.color)
}
