//! Fiber orientation overlay
//!
//! Drawn after the surfaces and volumes it decorates. Fibers are tested
//! against the clip box point by point instead of in hardware, and are
//! never pickable.

use serde::{Deserialize, Serialize};

use crate::clipping::ClipDataKind;
use crate::dispatch::{DrawContext, Frame};
use crate::model::Structure;
use crate::rasterizer::{mat4_mul, mat4_transform_point, Mat4, Rgba, Vec3, Vertex};
use crate::renderers::{blend_for, DataKind};

/// Segments around each cone base
const CONE_SIDES: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fiber {
    pub origin: Vec3,
    /// Unit vector along the fiber
    pub direction: Vec3,
    pub magnitude: f32,
    /// Fan ellipse axes in model units
    pub fan_major: f32,
    pub fan_minor: f32,
    /// Per-fiber attenuation multiplied into the display opacity
    pub opacity: f32,
    /// Position of the fiber within its sample, used for index coloring
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FiberSymbol {
    #[default]
    Lines,
    /// Two opposed elliptical cones
    Fans,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FiberColoring {
    /// Red, green, blue by index within the sample
    FiberIndex,
    /// |direction| as RGB
    Direction,
    Flat(Rgba),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiberDisplay {
    pub symbol: FiberSymbol,
    pub coloring: FiberColoring,
    pub length_multiplier: f32,
    pub fan_multiplier: f32,
    pub minimum_magnitude: f32,
    pub draw_with_magnitude: bool,
    /// Largest distance above a slice that is still shown
    pub above_limit: f32,
    /// Largest distance below a slice (negative)
    pub below_limit: f32,
    pub opacity: f32,
}

impl Default for FiberDisplay {
    fn default() -> Self {
        Self {
            symbol: FiberSymbol::Lines,
            coloring: FiberColoring::Direction,
            length_multiplier: 6.0,
            fan_multiplier: 3.0,
            minimum_magnitude: 0.05,
            draw_with_magnitude: true,
            above_limit: 0.63,
            below_limit: -0.63,
            opacity: 1.0,
        }
    }
}

impl FiberDisplay {
    pub fn length(&self, fiber: &Fiber) -> f32 {
        if self.draw_with_magnitude {
            fiber.magnitude * self.length_multiplier
        } else {
            self.length_multiplier
        }
    }

    pub fn color(&self, fiber: &Fiber) -> Rgba {
        let c = match self.coloring {
            FiberColoring::FiberIndex => match fiber.index % 3 {
                0 => Rgba::RED,
                1 => Rgba::GREEN,
                _ => Rgba::BLUE,
            },
            FiberColoring::Direction => {
                let d = fiber.direction.abs();
                Rgba::rgb(d.x, d.y, d.z)
            }
            FiberColoring::Flat(c) => c,
        };
        c.with_alpha(c.a * self.opacity * fiber.opacity.clamp(0.0, 1.0))
    }

    /// Any fiber would be drawn with alpha below one
    pub fn is_translucent(&self, fibers: &[Fiber]) -> bool {
        self.opacity < 1.0 || fibers.iter().any(|f| f.opacity < 1.0)
    }
}

#[derive(Clone)]
pub struct FiberLayer<'a> {
    pub fibers: &'a [Fiber],
    pub display: FiberDisplay,
}

/// Restricts fibers to a band around one slice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceBand {
    pub axis: usize,
    pub coordinate: f32,
}

/// Indices of fibers to draw, in input order
pub fn collect_fibers(layer: &FiberLayer, ctx: &DrawContext, band: Option<SliceBand>) -> Vec<usize> {
    let display = &layer.display;
    layer
        .fibers
        .iter()
        .enumerate()
        .filter(|(_, f)| f.magnitude >= display.minimum_magnitude)
        .filter(|(_, f)| ctx.is_inside_clip(ClipDataKind::Features, Structure::Other, f.origin))
        .filter(|(_, f)| match band {
            Some(band) => {
                let d = f.origin.axis(band.axis) - band.coordinate;
                d <= display.above_limit && d >= display.below_limit
            }
            None => true,
        })
        .map(|(i, _)| i)
        .collect()
}

/// Order `indices` from the farthest fiber origin to the nearest under `mvp`
pub fn sort_far_to_near(indices: &mut [usize], fibers: &[Fiber], mvp: &Mat4) {
    let depth = |i: usize| mat4_transform_point(mvp, fibers[i].origin).z;
    indices.sort_by(|a, b| depth(*b).total_cmp(&depth(*a)));
}

/// Two unit vectors perpendicular to `d` and to each other
fn perpendicular_basis(d: Vec3) -> (Vec3, Vec3) {
    let helper = if d.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
    let u = d.cross(helper).normalize();
    let v = d.cross(u).normalize();
    (u, v)
}

fn draw_cone(frame: &mut Frame, apex: Vec3, base_center: Vec3, axes: (Vec3, Vec3), color: Rgba) {
    let (u, v) = axes;
    let ring: Vec<Vec3> = (0..=CONE_SIDES)
        .map(|i| {
            let a = i as f32 / CONE_SIDES as f32 * std::f32::consts::TAU;
            base_center + u * a.cos() + v * a.sin()
        })
        .collect();
    for pair in ring.windows(2) {
        frame.gfx.draw_triangle([
            Vertex::new(apex, color),
            Vertex::new(pair[0], color),
            Vertex::new(pair[1], color),
        ]);
    }
}

fn draw_fiber(frame: &mut Frame, display: &FiberDisplay, fiber: &Fiber) {
    let color = display.color(fiber);
    let dir = fiber.direction.normalize();
    let half = dir * (display.length(fiber) * 0.5);
    match display.symbol {
        FiberSymbol::Lines => {
            frame
                .gfx
                .draw_line(Vertex::new(fiber.origin - half, color), Vertex::new(fiber.origin + half, color));
        }
        FiberSymbol::Fans => {
            let (u, v) = perpendicular_basis(dir);
            let axes = (
                u * (fiber.fan_major * display.fan_multiplier),
                v * (fiber.fan_minor * display.fan_multiplier),
            );
            draw_cone(frame, fiber.origin, fiber.origin + half, axes, color);
            draw_cone(frame, fiber.origin, fiber.origin - half, axes, color);
        }
    }
}

/// Draw the fibers in the current model transform. Drawing mode only.
pub fn draw_fibers(frame: &mut Frame, ctx: &DrawContext, layer: &FiberLayer, band: Option<SliceBand>) {
    if !ctx.mode.is_drawing() || layer.fibers.is_empty() {
        return;
    }
    let mut indices = collect_fibers(layer, ctx, band);
    if indices.is_empty() {
        return;
    }

    let mut f = frame.save_state();
    f.gfx.disable_clip_planes();
    f.gfx.set_lighting(false);
    if layer.display.is_translucent(layer.fibers) {
        let mvp = mat4_mul(&f.gfx.projection(), &f.gfx.modelview());
        sort_far_to_near(&mut indices, layer.fibers, &mvp);
        f.gfx.set_blend(Some(blend_for(DataKind::Fibers)));
    }
    for i in indices {
        draw_fiber(&mut f, &layer.display, &layer.fibers[i]);
    }
    log::debug!("drew fibers with {:?}", layer.display.symbol);
}
