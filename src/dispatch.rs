//! Draw modes, the per-call draw context and the one dispatch point
//!
//! A top-level entry point builds a [`DrawContext`] and a [`Frame`] and
//! threads both down every renderer. Nothing about the current mode, tab
//! or clip group is stored anywhere else.

use std::ops::{Deref, DerefMut};

use crate::clipping::{ClipDataKind, ClipPlaneGroup};
use crate::model::{ModelContent, Structure};
use crate::picking::{resolve_pick, PickHit, ProjectionResult, SelectionCategory, SelectionEncoder, SelectionManager,
    SelectionResult};
use crate::preferences::ColorPair;
use crate::rasterizer::{
    mat4_mul, project_with, ClearMask, GraphicsContext, Mat4, RenderState, Rgba, ShadeModel, Vec3, Viewport,
};
use crate::renderers;
use crate::text::{TextRenderer, TextStyle};
use crate::transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    /// Full visual pipeline
    Drawing,
    /// Pick colors, one category per pass
    Identification,
    /// Pick colors for triangles plus barycentric projection
    Projection,
}

impl DrawMode {
    pub fn is_drawing(self) -> bool {
        self == DrawMode::Drawing
    }

    pub fn is_picking(self) -> bool {
        !self.is_drawing()
    }
}

/// Immutable per-call parameters
#[derive(Clone, Copy)]
pub struct DrawContext<'a> {
    pub mode: DrawMode,
    pub window_index: usize,
    pub tab_index: Option<usize>,
    /// Area the current model draws into
    pub viewport: Viewport,
    /// Mouse pixel in window coordinates (top-left origin)
    pub mouse: (i32, i32),
    pub colors: ColorPair,
    pub clip_group: Option<&'a ClipPlaneGroup>,
}

impl<'a> DrawContext<'a> {
    pub fn new(mode: DrawMode, window_index: usize, tab_index: Option<usize>, viewport: Viewport) -> Self {
        Self {
            mode,
            window_index,
            tab_index,
            viewport,
            mouse: (0, 0),
            colors: ColorPair::default(),
            clip_group: None,
        }
    }

    /// Same context restricted to a sub-area (montage cells, slice grid)
    pub fn with_viewport(&self, viewport: Viewport) -> Self {
        Self { viewport, ..*self }
    }

    /// Sample point at the center of the mouse pixel
    pub fn mouse_sample(&self) -> (f32, f32) {
        (self.mouse.0 as f32 + 0.5, self.mouse.1 as f32 + 0.5)
    }

    /// Picking passes only need the cell under the mouse
    pub fn wants_viewport(&self, viewport: &Viewport) -> bool {
        self.mode.is_drawing() || viewport.contains(self.mouse.0, self.mouse.1)
    }

    pub fn clip_applies(&self, kind: ClipDataKind) -> bool {
        self.clip_group.map_or(false, |g| g.applies_to(kind))
    }

    /// Point test used by geometry that is not clipped in hardware
    pub fn is_inside_clip(&self, kind: ClipDataKind, structure: Structure, p: Vec3) -> bool {
        self.clip_group.map_or(true, |g| g.is_inside_for(kind, structure, p))
    }
}

/// Matrices a model was drawn with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelFrame {
    pub viewport: Viewport,
    pub projection: Mat4,
    pub modelview: Mat4,
}

impl ModelFrame {
    pub fn capture(gfx: &GraphicsContext) -> Self {
        Self {
            viewport: gfx.viewport(),
            projection: gfx.projection(),
            modelview: gfx.modelview(),
        }
    }

    /// Model point to window pixel coordinates
    pub fn project(&self, p: Vec3) -> Option<Vec3> {
        project_with(&mat4_mul(&self.projection, &self.modelview), self.viewport, p)
    }

    pub fn model_size_to_pixels(&self, size: f32) -> f32 {
        transform::size_to_pixels(&self.modelview, &self.projection, self.viewport, size)
    }
}

/// Mutable targets of one top-level call
pub struct Frame<'f> {
    pub gfx: &'f mut GraphicsContext,
    pub encoder: &'f mut SelectionEncoder,
    pub selection: Option<&'f mut SelectionManager>,
    pub projection: Option<&'f mut ProjectionResult>,
    pub text: Option<&'f mut dyn TextRenderer>,
    /// Model transforms recorded while drawing the current region
    pub anchors: Vec<(Option<Structure>, ModelFrame)>,
}

impl<'f> Frame<'f> {
    pub fn new(gfx: &'f mut GraphicsContext, encoder: &'f mut SelectionEncoder) -> Self {
        Self {
            gfx,
            encoder,
            selection: None,
            projection: None,
            text: None,
            anchors: Vec::new(),
        }
    }

    /// Scoped modelview push, restored when the scope drops
    pub fn push_matrix(&mut self) -> MatrixScope<'_, 'f> {
        let depth = self.gfx.matrix_depth();
        self.gfx.push_matrix_raw();
        MatrixScope { frame: self, depth }
    }

    /// Scoped render state save, restored when the scope drops
    pub fn save_state(&mut self) -> StateScope<'_, 'f> {
        let saved = Some(self.gfx.snapshot());
        StateScope { frame: self, saved }
    }

    /// Picking for `category` is requested and enabled
    pub fn category_enabled(&self, category: SelectionCategory) -> bool {
        self.selection.as_ref().map_or(false, |s| s.is_enabled(category))
    }

    /// Start emitting one category: clear to the background pick color
    pub fn begin_pick_pass(&mut self) {
        self.gfx.clear(ClearMask::ALL, Rgba::WHITE);
        self.encoder.begin_pass();
    }

    /// Read back the mouse pixel for `category`
    pub fn resolve(&mut self, ctx: &DrawContext, category: SelectionCategory) -> Option<PickHit> {
        resolve_pick(self.gfx, self.encoder, category, ctx.mouse.0, ctx.mouse.1)
    }

    /// Offer a result to the selection manager, nearer wins
    pub fn offer_selection(&mut self, ctx: &DrawContext, mut result: SelectionResult) -> bool {
        result.window_index = ctx.window_index;
        result.tab_index = ctx.tab_index;
        match self.selection.as_mut() {
            Some(selection) => selection.offer(result),
            None => false,
        }
    }

    /// Remember the current transform for annotations anchored to `structure`
    pub fn record_anchor(&mut self, structure: Option<Structure>) {
        let frame = ModelFrame::capture(self.gfx);
        self.anchors.push((structure, frame));
    }

    /// Transform to place an annotation anchored in model space
    pub fn anchor_for(&self, structure: Option<Structure>) -> Option<ModelFrame> {
        match structure {
            Some(s) => self.anchors.iter().find(|(st, _)| *st == Some(s)).map(|(_, f)| *f),
            None => self.anchors.first().map(|(_, f)| *f),
        }
    }

    pub fn draw_text(&mut self, x: f32, y: f32, text: &str, style: &TextStyle) {
        if let Some(renderer) = self.text.as_mut() {
            renderer.draw_text(x, y, text, style);
        }
    }

    pub fn measure_text(&self, text: &str, style: &TextStyle) -> Option<(f32, f32)> {
        self.text.as_ref().map(|renderer| renderer.measure(text, style))
    }
}

/// Restores the modelview stack depth of a frame on drop
pub struct MatrixScope<'s, 'f> {
    frame: &'s mut Frame<'f>,
    depth: usize,
}

impl<'f> Deref for MatrixScope<'_, 'f> {
    type Target = Frame<'f>;
    fn deref(&self) -> &Frame<'f> {
        self.frame
    }
}

impl<'f> DerefMut for MatrixScope<'_, 'f> {
    fn deref_mut(&mut self) -> &mut Frame<'f> {
        self.frame
    }
}

impl Drop for MatrixScope<'_, '_> {
    fn drop(&mut self) {
        self.frame.gfx.restore_matrix_depth(self.depth);
    }
}

/// Restores the full render state of a frame on drop
pub struct StateScope<'s, 'f> {
    frame: &'s mut Frame<'f>,
    saved: Option<(RenderState, usize)>,
}

impl<'f> Deref for StateScope<'_, 'f> {
    type Target = Frame<'f>;
    fn deref(&self) -> &Frame<'f> {
        self.frame
    }
}

impl<'f> DerefMut for StateScope<'_, 'f> {
    fn deref_mut(&mut self) -> &mut Frame<'f> {
        self.frame
    }
}

impl Drop for StateScope<'_, '_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.frame.gfx.restore(saved);
        }
    }
}

/// Draw one region's model in the context's mode
pub fn dispatch_model(frame: &mut Frame, ctx: &DrawContext, content: &ModelContent) {
    let mut f = frame.save_state();
    f.gfx.set_viewport(ctx.viewport);
    f.gfx.set_depth_test(true);
    f.gfx.set_depth_write(true);
    if ctx.mode.is_picking() {
        // Pick colors must reach the framebuffer untouched
        f.gfx.set_lighting(false);
        f.gfx.set_blend(None);
        f.gfx.set_shade_model(ShadeModel::Flat);
    } else {
        f.gfx.set_shade_model(ShadeModel::Smooth);
    }

    match content {
        ModelContent::Surface(model) => renderers::surface::draw_surface_model(&mut f, ctx, model),
        ModelContent::SurfaceMontage(model) => renderers::montage::draw_montage(&mut f, ctx, model),
        ModelContent::VolumeSlices(model) => renderers::volume_slice::draw_volume_slices(&mut f, ctx, model),
        ModelContent::WholeBrain(model) => renderers::whole_brain::draw_whole_brain(&mut f, ctx, model),
        ModelContent::Chart(model) => renderers::chart::draw_chart(&mut f, ctx, model),
        ModelContent::Media(model) => renderers::media::draw_media(&mut f, ctx, model),
        ModelContent::Spacer => {}
    }

    f.gfx.check_errors(content.name());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_restore_through_early_exit() {
        let mut gfx = GraphicsContext::new(8, 8);
        let mut encoder = SelectionEncoder::new();
        let mut frame = Frame::new(&mut gfx, &mut encoder);

        fn nested(frame: &mut Frame, bail: bool) -> Option<()> {
            let mut m = frame.push_matrix();
            m.gfx.translate(Vec3::new(1.0, 0.0, 0.0));
            let mut s = m.save_state();
            s.gfx.set_lighting(true);
            s.gfx.push_matrix_raw();
            if bail {
                return None;
            }
            Some(())
        }

        assert!(nested(&mut frame, true).is_none());
        assert!(nested(&mut frame, false).is_some());
        assert_eq!(frame.gfx.matrix_depth(), 1);
        assert!(!frame.gfx.lighting());
        assert!(frame.gfx.take_errors().is_empty());
    }

    #[test]
    fn test_category_disabled_without_selection() {
        let mut gfx = GraphicsContext::new(8, 8);
        let mut encoder = SelectionEncoder::new();
        let mut selection = SelectionManager::new();
        let mut frame = Frame::new(&mut gfx, &mut encoder);
        assert!(!frame.category_enabled(SelectionCategory::SurfaceNode));

        selection.set_enabled(SelectionCategory::SurfaceNode, false);
        frame.selection = Some(&mut selection);
        assert!(!frame.category_enabled(SelectionCategory::SurfaceNode));
        assert!(frame.category_enabled(SelectionCategory::SurfaceTriangle));
    }

    #[test]
    fn test_context_cells_for_picking() {
        let mut ctx = DrawContext::new(DrawMode::Identification, 0, Some(1), Viewport::new(0, 0, 100, 100));
        ctx.mouse = (75, 20);
        let cells = ctx.viewport.grid(2, 2);
        let wanted: Vec<bool> = cells.iter().map(|c| ctx.wants_viewport(c)).collect();
        assert_eq!(wanted.iter().filter(|w| **w).count(), 1);
        assert_eq!(ctx.mouse_sample(), (75.5, 20.5));
        let drawing = DrawContext { mode: DrawMode::Drawing, ..ctx };
        assert!(cells.iter().all(|c| drawing.wants_viewport(c)));
    }
}
