//! Viewport compositor and the three public entry points
//!
//! A window is composited as an explicit list of [`CompositeStep`]s. Each
//! region is cleared, dispatched to its renderer and then gets its tab or
//! spacer annotation layer. The window annotation layer is placed before or
//! after the regions depending on its stacking order against the first tab.

use crate::annotation::{draw_annotation_layer, AnnotationSpace, TAB_SPACES};
use crate::dispatch::{dispatch_model, DrawContext, DrawMode, Frame};
use crate::error::RenderError;
use crate::model::{ModelContent, ViewportRegion, WindowContent};
use crate::picking::{ProjectionResult, SelectionEncoder, SelectionManager};
use crate::preferences::{FillerStyle, Preferences};
use crate::rasterizer::{ClearMask, Framebuffer, GraphicsContext, Rgba, Vec3, Vertex, Viewport};
use crate::text::{TextRenderer, TextStyle};
use crate::transform::OrthoBounds;

pub const MAX_WINDOWS: usize = 10;
pub const MAX_TABS: usize = 50;

/// Width of the selected-tab border in pixels
const HIGHLIGHT_WIDTH: f32 = 3.0;
const HATCH_SPACING: i32 = 8;
const TIMING_TEXT_SIZE: f32 = 14.0;
const TIMING_MARGIN: f32 = 5.0;

/// Frame rate information drawn in the window corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    pub frames_per_second: f32,
    pub draw_milliseconds: f32,
}

/// One step of compositing a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeStep {
    WindowClear,
    /// Every region: model, tab/spacer annotations, highlight
    TabRegions,
    /// Annotations drawn next are never hidden by model geometry
    DepthClear,
    WindowAnnotations,
    TimingOverlay,
    AspectLockFiller,
}

/// Compositing order for a window. Lower stacking order draws in front, so
/// window annotations with a greater order than the first tab go behind the
/// tab content.
pub fn composite_steps(window_stacking_order: i32, first_tab_stacking_order: Option<i32>) -> [CompositeStep; 6] {
    use CompositeStep::*;
    let behind = first_tab_stacking_order.map_or(false, |tab| window_stacking_order > tab);
    if behind {
        [WindowClear, WindowAnnotations, TabRegions, DepthClear, TimingOverlay, AspectLockFiller]
    } else {
        [WindowClear, TabRegions, DepthClear, WindowAnnotations, TimingOverlay, AspectLockFiller]
    }
}

/// Rectangles of `window` not covered by `locked`, top, bottom, left, right
pub fn dead_zones(window: Viewport, locked: Viewport) -> Vec<Viewport> {
    let Some(inner) = locked.intersection(&window) else {
        return vec![window];
    };
    let zones = [
        Viewport::new(window.x, window.y, window.width, inner.y - window.y),
        Viewport::new(window.x, inner.bottom(), window.width, window.bottom() - inner.bottom()),
        Viewport::new(window.x, inner.y, inner.x - window.x, inner.height),
        Viewport::new(inner.right(), inner.y, window.right() - inner.right(), inner.height),
    ];
    zones.into_iter().filter(|z| !z.is_empty()).collect()
}

/// Owns the graphics context and the pick encoder shared by every call.
/// One call runs at a time and leaves the render state as it found it.
pub struct BrainRenderer {
    gfx: GraphicsContext,
    encoder: SelectionEncoder,
    preferences: Preferences,
}

impl BrainRenderer {
    pub fn new(width: usize, height: usize, preferences: Preferences) -> Self {
        Self {
            gfx: GraphicsContext::new(width, height),
            encoder: SelectionEncoder::new(),
            preferences,
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn set_preferences(&mut self, preferences: Preferences) {
        self.preferences = preferences;
    }

    pub fn graphics(&self) -> &GraphicsContext {
        &self.gfx
    }

    /// Last composited frame
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.gfx.fb
    }

    fn check_window(window: &WindowContent) -> Result<(), RenderError> {
        if window.index >= MAX_WINDOWS {
            return Err(RenderError::WindowIndexOutOfRange { index: window.index, max: MAX_WINDOWS - 1 });
        }
        Ok(())
    }

    fn check_region(window: &WindowContent, region: &ViewportRegion) -> Result<(), RenderError> {
        if region.window_index != window.index {
            return Err(RenderError::RegionNotInWindow { region_window: region.window_index, window: window.index });
        }
        match region.tab_index {
            Some(tab) if tab >= MAX_TABS => Err(RenderError::TabIndexOutOfRange { index: tab, max: MAX_TABS - 1 }),
            _ => Ok(()),
        }
    }

    fn fit_to_window(&mut self, window: &WindowContent) {
        let (w, h) = (window.width.max(0) as usize, window.height.max(0) as usize);
        if self.gfx.width() != w || self.gfx.height() != h {
            log::debug!("resizing framebuffer to {}x{}", w, h);
            self.gfx.resize(w, h);
        }
    }

    /// Draw every region of `window`
    pub fn draw_models(
        &mut self,
        window: &WindowContent,
        regions: &[ViewportRegion],
        timing: Option<FrameTiming>,
        text: Option<&mut dyn TextRenderer>,
    ) -> Result<(), RenderError> {
        Self::check_window(window)?;
        for region in regions {
            Self::check_region(window, region)?;
        }
        self.fit_to_window(window);

        let prefs = &self.preferences;
        let window_rect = window.rect();
        let first_tab = regions.iter().find(|r| r.tab_index.is_some()).map(|r| r.stacking_order);
        let mut frame = Frame::new(&mut self.gfx, &mut self.encoder);
        if let Some(text) = text {
            frame.text = Some(text);
        }

        for step in composite_steps(window.annotation_stacking_order, first_tab) {
            match step {
                CompositeStep::WindowClear => {
                    frame.gfx.set_viewport(window_rect);
                    frame.gfx.clear(ClearMask::ALL, prefs.window.background);
                }
                CompositeStep::TabRegions => {
                    for region in regions {
                        draw_region(&mut frame, prefs, window_rect, region, DrawMode::Drawing, (0, 0));
                    }
                }
                CompositeStep::DepthClear => frame.gfx.clear(ClearMask::DEPTH, Rgba::BLACK),
                CompositeStep::WindowAnnotations => {
                    let mut ctx = DrawContext::new(DrawMode::Drawing, window.index, None, window_rect);
                    ctx.colors = prefs.window;
                    frame.anchors.clear();
                    draw_annotation_layer(
                        &mut frame,
                        &ctx,
                        window.annotations,
                        &[AnnotationSpace::Window],
                        window_rect,
                        None,
                    );
                }
                CompositeStep::TimingOverlay => {
                    if let Some(timing) = timing.filter(|_| prefs.show_timing) {
                        draw_timing(&mut frame, prefs, timing);
                    }
                }
                CompositeStep::AspectLockFiller => {
                    if let Some(locked) = window.aspect_locked {
                        fill_dead_zones(frame.gfx, prefs, window_rect, locked);
                    }
                }
            }
        }
        frame.gfx.check_errors("draw_models");
        Ok(())
    }

    /// Identify what lies under the mouse in `region`. Results go to
    /// `selection`, one per category, then cross-category filtering runs.
    pub fn select(
        &mut self,
        window: &WindowContent,
        region: &ViewportRegion,
        mouse_x: i32,
        mouse_y: i32,
        selection: &mut SelectionManager,
        apply_occlusion_filter: bool,
    ) -> Result<(), RenderError> {
        Self::check_window(window)?;
        Self::check_region(window, region)?;
        self.fit_to_window(window);
        selection.reset();
        {
            let prefs = &self.preferences;
            let mut frame = Frame::new(&mut self.gfx, &mut self.encoder);
            frame.begin_pick_pass();
            frame.selection = Some(&mut *selection);
            draw_region(&mut frame, prefs, window.rect(), region, DrawMode::Identification, (mouse_x, mouse_y));
            frame.encoder.begin_pass();
            frame.gfx.check_errors("select");
        }
        selection.filter_selections(apply_occlusion_filter);
        log::debug!("selection at ({}, {}): any hit {}", mouse_x, mouse_y, selection.any_selected());
        Ok(())
    }

    /// Project the mouse onto the surface under it
    pub fn project_to_model(
        &mut self,
        window: &WindowContent,
        region: &ViewportRegion,
        mouse_x: i32,
        mouse_y: i32,
    ) -> Result<ProjectionResult, RenderError> {
        Self::check_window(window)?;
        Self::check_region(window, region)?;
        self.fit_to_window(window);
        let mut result = ProjectionResult::default();
        {
            let prefs = &self.preferences;
            let mut frame = Frame::new(&mut self.gfx, &mut self.encoder);
            frame.begin_pick_pass();
            frame.projection = Some(&mut result);
            draw_region(&mut frame, prefs, window.rect(), region, DrawMode::Projection, (mouse_x, mouse_y));
            frame.encoder.begin_pass();
            frame.gfx.check_errors("project_to_model");
        }
        Ok(result)
    }
}

/// Clear, draw and annotate one region
fn draw_region(
    frame: &mut Frame,
    prefs: &Preferences,
    window_rect: Viewport,
    region: &ViewportRegion,
    mode: DrawMode,
    mouse: (i32, i32),
) {
    if !region.is_drawable_in(&window_rect) {
        log::debug!("skipping region {:?} of tab {:?}", region.rect, region.tab_index);
        return;
    }
    let colors = prefs.colors_for(region.content.kind());
    if mode.is_drawing() {
        let mask = if region.transparent { ClearMask::DEPTH } else { ClearMask::ALL };
        frame.gfx.clear_rect(region.rect, mask, colors.background);
    }

    let mut ctx = DrawContext::new(mode, region.window_index, region.tab_index, region.rect);
    ctx.mouse = mouse;
    ctx.colors = colors;
    ctx.clip_group = region.clip_group;

    frame.anchors.clear();
    dispatch_model(frame, &ctx, &region.content);

    let spaces: &[AnnotationSpace] = match region.content {
        ModelContent::Spacer => &[AnnotationSpace::Spacer],
        _ => &TAB_SPACES,
    };
    draw_annotation_layer(frame, &ctx, region.annotations, spaces, region.rect, Some(&region.content));

    if mode.is_drawing() && region.highlighted && prefs.show_tab_highlight {
        draw_highlight(frame, region.rect, prefs.highlight_color);
    }
}

/// Border just inside the selected tab
fn draw_highlight(frame: &mut Frame, rect: Viewport, color: Rgba) {
    let mut f = frame.save_state();
    f.gfx.set_viewport(rect);
    f.gfx.set_projection(OrthoBounds::pixels(rect).matrix(false));
    f.gfx.disable_clip_planes();
    f.gfx.set_lighting(false);
    f.gfx.set_depth_test(false);
    f.gfx.set_blend(None);
    let mut m = f.push_matrix();
    m.gfx.load_identity();

    let (w, h, t) = (rect.width as f32, rect.height as f32, HIGHLIGHT_WIDTH);
    let bars = [(0.0, 0.0, w, t), (0.0, h - t, w, h), (0.0, 0.0, t, h), (w - t, 0.0, w, h)];
    for (x0, y0, x1, y1) in bars {
        m.gfx.draw_quad([
            Vertex::new(Vec3::new(x0, y1, 0.0), color),
            Vertex::new(Vec3::new(x1, y1, 0.0), color),
            Vertex::new(Vec3::new(x1, y0, 0.0), color),
            Vertex::new(Vec3::new(x0, y0, 0.0), color),
        ]);
    }
}

fn draw_timing(frame: &mut Frame, prefs: &Preferences, timing: FrameTiming) {
    let label = format!("{:.1} fps  {:.2} ms", timing.frames_per_second, timing.draw_milliseconds);
    let style = TextStyle::new(prefs.window.foreground, TIMING_TEXT_SIZE);
    frame.draw_text(TIMING_MARGIN, TIMING_MARGIN + TIMING_TEXT_SIZE, &label, &style);
}

fn fill_dead_zones(gfx: &mut GraphicsContext, prefs: &Preferences, window: Viewport, locked: Viewport) {
    let background = prefs.window.background;
    for zone in dead_zones(window, locked) {
        match prefs.aspect_filler {
            FillerStyle::Solid => gfx.clear_rect(zone, ClearMask::ALL, background),
            FillerStyle::Hatched => {
                let line = background.lerp(prefs.window.foreground, 0.25);
                gfx.fb.fill_hatched_rect(zone, background, line, HATCH_SPACING);
            }
        }
    }
}
