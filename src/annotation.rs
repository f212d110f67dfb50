//! Annotation overlay: boxes, text, colorbars and scale bars
//!
//! Annotations are grouped by the coordinate space they are anchored in.
//! Spaces are drawn in the fixed order of [`ANNOTATION_DRAW_ORDER`]; within
//! a space lower stacking order draws later, so it ends up in front.

use serde::{Deserialize, Serialize};

use crate::dispatch::{DrawContext, DrawMode, Frame};
use crate::model::{MapStatistics, ModelContent, Palette, Structure};
use crate::picking::{PickIndices, SelectionCategory, SelectionResult};
use crate::rasterizer::{Rgba, Vec2, Vec3, Vertex, Viewport};
use crate::renderers::{blend_for, DataKind};
use crate::text::TextStyle;
use crate::transform::OrthoBounds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationSpace {
    /// Attached to a surface node
    Surface,
    /// Attached to a stereotaxic coordinate
    Stereotaxic,
    /// Percent position in a tab
    Tab,
    /// Percent position in an empty layout slot
    Spacer,
    /// Percent position in the whole window
    Window,
}

pub const ANNOTATION_DRAW_ORDER: [AnnotationSpace; 5] = [
    AnnotationSpace::Surface,
    AnnotationSpace::Stereotaxic,
    AnnotationSpace::Tab,
    AnnotationSpace::Spacer,
    AnnotationSpace::Window,
];

/// Spaces drawn with a tab's content
pub const TAB_SPACES: [AnnotationSpace; 3] =
    [AnnotationSpace::Surface, AnnotationSpace::Stereotaxic, AnnotationSpace::Tab];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnnotationAnchor {
    SurfaceNode { structure: Structure, node: usize },
    Stereotaxic(Vec3),
    /// Percent of the tab, (0, 0) top-left
    Tab(Vec2),
    Spacer(Vec2),
    Window(Vec2),
}

impl AnnotationAnchor {
    pub fn space(&self) -> AnnotationSpace {
        match self {
            AnnotationAnchor::SurfaceNode { .. } => AnnotationSpace::Surface,
            AnnotationAnchor::Stereotaxic(_) => AnnotationSpace::Stereotaxic,
            AnnotationAnchor::Tab(_) => AnnotationSpace::Tab,
            AnnotationAnchor::Spacer(_) => AnnotationSpace::Spacer,
            AnnotationAnchor::Window(_) => AnnotationSpace::Window,
        }
    }
}

/// Segments in a drawn colorbar
const COLORBAR_STEPS: usize = 64;

#[derive(Clone)]
pub enum AnnotationShape<'a> {
    Box,
    Text { text: String, style: TextStyle },
    Colorbar { palette: &'a dyn Palette, statistics: MapStatistics },
    /// Horizontal bar `length` model units long
    ScaleBar { length: f32 },
}

#[derive(Clone)]
pub struct Annotation<'a> {
    pub anchor: AnnotationAnchor,
    pub shape: AnnotationShape<'a>,
    /// Width and height in percent of the viewport; ignored by text and
    /// scale bars
    pub size: Vec2,
    pub foreground: Rgba,
    pub background: Option<Rgba>,
    /// Lower values draw in front
    pub stacking_order: i32,
    pub selectable: bool,
}

impl<'a> Annotation<'a> {
    pub fn new(anchor: AnnotationAnchor, shape: AnnotationShape<'a>) -> Self {
        Self {
            anchor,
            shape,
            size: Vec2::new(10.0, 5.0),
            foreground: Rgba::WHITE,
            background: None,
            stacking_order: 0,
            selectable: true,
        }
    }

    pub fn space(&self) -> AnnotationSpace {
        self.anchor.space()
    }
}

/// Indices of `annotations` in draw order for the given spaces
pub fn annotation_draw_sequence(annotations: &[Annotation], spaces: &[AnnotationSpace]) -> Vec<usize> {
    let mut sequence = Vec::with_capacity(annotations.len());
    for space in ANNOTATION_DRAW_ORDER.iter().filter(|s| spaces.contains(s)) {
        let mut in_space: Vec<usize> = (0..annotations.len())
            .filter(|i| annotations[*i].space() == *space)
            .collect();
        // Stable, so equal stacking orders keep their input order
        in_space.sort_by_key(|i| std::cmp::Reverse(annotations[*i].stacking_order));
        sequence.extend(in_space);
    }
    sequence
}

/// Pixel rectangle an annotation covers, relative to the viewport
#[derive(Debug, Clone, Copy, PartialEq)]
struct PixelRect {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
}

impl PixelRect {
    fn centered(center: Vec2, width: f32, height: f32) -> Self {
        Self {
            x0: center.x - width / 2.0,
            y0: center.y - height / 2.0,
            x1: center.x + width / 2.0,
            y1: center.y + height / 2.0,
        }
    }

    fn corners(&self) -> [Vec3; 4] {
        [
            Vec3::new(self.x0, self.y0, 0.0),
            Vec3::new(self.x1, self.y0, 0.0),
            Vec3::new(self.x1, self.y1, 0.0),
            Vec3::new(self.x0, self.y1, 0.0),
        ]
    }
}

/// Where the annotation sits in viewport pixels, `None` if its anchor is
/// not shown in this region
fn anchor_position(
    frame: &Frame,
    annotation: &Annotation,
    viewport: Viewport,
    content: Option<&ModelContent>,
) -> Option<Vec2> {
    let percent = |p: Vec2| {
        Vec2::new(p.x / 100.0 * viewport.width as f32, p.y / 100.0 * viewport.height as f32)
    };
    let window_to_local = |w: Vec3| Vec2::new(w.x - viewport.x as f32, w.y - viewport.y as f32);
    match annotation.anchor {
        AnnotationAnchor::Tab(p) | AnnotationAnchor::Spacer(p) | AnnotationAnchor::Window(p) => Some(percent(p)),
        AnnotationAnchor::Stereotaxic(xyz) => frame.anchor_for(None)?.project(xyz).map(window_to_local),
        AnnotationAnchor::SurfaceNode { structure, node } => {
            let layer = content?.find_surface(structure)?;
            let xyz = *layer.geometry.coordinates.get(node)?;
            frame.anchor_for(Some(structure))?.project(xyz).map(window_to_local)
        }
    }
}

fn shape_rect(frame: &Frame, annotation: &Annotation, viewport: Viewport, center: Vec2) -> PixelRect {
    let w = annotation.size.x / 100.0 * viewport.width as f32;
    let h = annotation.size.y / 100.0 * viewport.height as f32;
    match &annotation.shape {
        AnnotationShape::Box | AnnotationShape::Colorbar { .. } => PixelRect::centered(center, w, h),
        AnnotationShape::Text { text, style } => {
            let (tw, th) = frame
                .measure_text(text, style)
                .unwrap_or((text.chars().count() as f32 * style.size * 0.6, style.size));
            PixelRect::centered(center, tw, th)
        }
        AnnotationShape::ScaleBar { length } => {
            let px = frame.anchor_for(None).map_or(0.0, |f| f.model_size_to_pixels(*length));
            PixelRect::centered(center, px, 6.0)
        }
    }
}

fn fill_rect(frame: &mut Frame, rect: &PixelRect, color: Rgba) {
    let c = rect.corners();
    frame.gfx.draw_quad([
        Vertex::new(c[0], color),
        Vertex::new(c[1], color),
        Vertex::new(c[2], color),
        Vertex::new(c[3], color),
    ]);
}

fn outline_rect(frame: &mut Frame, rect: &PixelRect, color: Rgba) {
    let c = rect.corners();
    let strip: Vec<Vertex> = [c[0], c[1], c[2], c[3], c[0]]
        .iter()
        .map(|p| Vertex::new(*p, color))
        .collect();
    frame.gfx.draw_line_strip(&strip);
}

fn draw_colorbar(frame: &mut Frame, rect: &PixelRect, palette: &dyn Palette, stats: &MapStatistics, outline: Rgba) {
    let step = (rect.x1 - rect.x0) / COLORBAR_STEPS as f32;
    for i in 0..COLORBAR_STEPS {
        let t = (i as f32 + 0.5) / COLORBAR_STEPS as f32;
        let value = stats.minimum + (stats.maximum - stats.minimum) * t;
        let color = palette.color_for(value, stats);
        let x0 = rect.x0 + step * i as f32;
        fill_rect(frame, &PixelRect { x0, x1: x0 + step, ..*rect }, color.with_alpha(1.0));
    }
    outline_rect(frame, rect, outline);
}

fn draw_one(frame: &mut Frame, annotation: &Annotation, viewport: Viewport, rect: &PixelRect) {
    if let Some(bg) = annotation.background {
        fill_rect(frame, rect, bg);
    }
    let fg = annotation.foreground;
    match &annotation.shape {
        AnnotationShape::Box => outline_rect(frame, rect, fg),
        AnnotationShape::Text { text, style } => {
            let style = TextStyle { color: fg, ..*style };
            frame.draw_text(viewport.x as f32 + rect.x0, viewport.y as f32 + rect.y1, text, &style);
        }
        AnnotationShape::Colorbar { palette, statistics } => {
            draw_colorbar(frame, rect, *palette, statistics, fg);
            let style = TextStyle::new(fg, 12.0);
            let below = viewport.y as f32 + rect.y1 + style.size;
            frame.draw_text(viewport.x as f32 + rect.x0, below, &format!("{:.2}", statistics.minimum), &style);
            let right = TextStyle { align: crate::text::TextAlign::Right, ..style };
            frame.draw_text(viewport.x as f32 + rect.x1, below, &format!("{:.2}", statistics.maximum), &right);
        }
        AnnotationShape::ScaleBar { length } => {
            let mid = (rect.y0 + rect.y1) / 2.0;
            let bar = [Vec3::new(rect.x0, mid, 0.0), Vec3::new(rect.x1, mid, 0.0)];
            frame.gfx.draw_line(Vertex::new(bar[0], fg), Vertex::new(bar[1], fg));
            for x in [rect.x0, rect.x1] {
                frame
                    .gfx
                    .draw_line(Vertex::new(Vec3::new(x, rect.y0, 0.0), fg), Vertex::new(Vec3::new(x, rect.y1, 0.0), fg));
            }
            let style = TextStyle::new(fg, 12.0).centered();
            let x = viewport.x as f32 + (rect.x0 + rect.x1) / 2.0;
            frame.draw_text(x, viewport.y as f32 + rect.y0 - 2.0, &format!("{} mm", length), &style);
        }
    }
}

/// Draw (or pick) the annotations of `spaces` inside `viewport`.
///
/// Model-anchored annotations use the transforms recorded in the frame
/// while the region's model was drawn.
pub fn draw_annotation_layer(
    frame: &mut Frame,
    ctx: &DrawContext,
    annotations: &[Annotation],
    spaces: &[AnnotationSpace],
    viewport: Viewport,
    content: Option<&ModelContent>,
) {
    if annotations.is_empty() || viewport.is_empty() {
        return;
    }
    let picking = match ctx.mode {
        DrawMode::Drawing => false,
        DrawMode::Identification => {
            if !frame.category_enabled(SelectionCategory::Annotation) {
                return;
            }
            true
        }
        DrawMode::Projection => return,
    };

    let sequence = annotation_draw_sequence(annotations, spaces);
    let view: &Frame = frame;
    let placed: Vec<(usize, PixelRect)> = sequence
        .into_iter()
        .filter(|i| !picking || annotations[*i].selectable)
        .filter_map(|i| {
            let center = anchor_position(view, &annotations[i], viewport, content)?;
            Some((i, shape_rect(view, &annotations[i], viewport, center)))
        })
        .collect();
    if placed.is_empty() {
        return;
    }

    let mut f = frame.save_state();
    f.gfx.set_viewport(viewport);
    f.gfx.set_projection(OrthoBounds::pixels(viewport).matrix(false));
    f.gfx.disable_clip_planes();
    f.gfx.set_lighting(false);
    let mut m = f.push_matrix();
    m.gfx.load_identity();

    if picking {
        m.begin_pick_pass();
        for (i, rect) in &placed {
            let color = m.encoder.encode_color(SelectionCategory::Annotation, PickIndices::one(*i));
            fill_rect(&mut m, rect, color);
        }
        if let Some(hit) = m.resolve(ctx, SelectionCategory::Annotation) {
            let result = SelectionResult::new(SelectionCategory::Annotation, hit.indices, hit.screen_depth);
            m.offer_selection(ctx, result);
        }
    } else {
        m.gfx.set_depth_test(false);
        m.gfx.set_blend(Some(blend_for(DataKind::Annotation)));
        for (i, rect) in &placed {
            draw_one(&mut m, &annotations[*i], viewport, rect);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GrayscalePalette;
    use crate::picking::{SelectionEncoder, SelectionManager};
    use crate::rasterizer::GraphicsContext;
    use crate::text::RecordedText;

    fn boxed(anchor: AnnotationAnchor, stacking_order: i32) -> Annotation<'static> {
        Annotation { stacking_order, ..Annotation::new(anchor, AnnotationShape::Box) }
    }

    #[test]
    fn test_draw_sequence_follows_space_table() {
        let annotations = [
            boxed(AnnotationAnchor::Window(Vec2::new(50.0, 50.0)), 0),
            boxed(AnnotationAnchor::Tab(Vec2::new(10.0, 10.0)), 0),
            boxed(AnnotationAnchor::Stereotaxic(Vec3::ZERO), 0),
            boxed(AnnotationAnchor::SurfaceNode { structure: Structure::CortexLeft, node: 0 }, 0),
            boxed(AnnotationAnchor::Spacer(Vec2::new(10.0, 10.0)), 0),
        ];
        assert_eq!(annotation_draw_sequence(&annotations, &ANNOTATION_DRAW_ORDER), vec![3, 2, 1, 4, 0]);
        assert_eq!(annotation_draw_sequence(&annotations, &TAB_SPACES), vec![3, 2, 1]);
        assert_eq!(annotation_draw_sequence(&annotations, &[AnnotationSpace::Window]), vec![0]);
    }

    #[test]
    fn test_lower_stacking_order_draws_last() {
        let p = Vec2::new(50.0, 50.0);
        let annotations = [
            boxed(AnnotationAnchor::Tab(p), 1),
            boxed(AnnotationAnchor::Tab(p), 5),
            boxed(AnnotationAnchor::Tab(p), 1),
            boxed(AnnotationAnchor::Tab(p), -2),
        ];
        assert_eq!(annotation_draw_sequence(&annotations, &TAB_SPACES), vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_front_annotation_covers_back_one() {
        let mut gfx = GraphicsContext::new(40, 40);
        let mut encoder = SelectionEncoder::new();
        let mut frame = Frame::new(&mut gfx, &mut encoder);
        let vp = Viewport::new(0, 0, 40, 40);
        let ctx = DrawContext::new(DrawMode::Drawing, 0, Some(0), vp);
        let center = AnnotationAnchor::Tab(Vec2::new(50.0, 50.0));
        let annotations = [
            Annotation { background: Some(Rgba::GREEN), ..boxed(center, 0) },
            Annotation { background: Some(Rgba::RED), ..boxed(center, 3) },
        ];
        draw_annotation_layer(&mut frame, &ctx, &annotations, &TAB_SPACES, vp, None);
        assert_eq!(frame.gfx.read_pixel(20, 20), Some([0, 255, 0]));
        assert_eq!(frame.gfx.matrix_depth(), 1);
    }

    #[test]
    fn test_text_and_colorbar_use_text_renderer() {
        let mut gfx = GraphicsContext::new(100, 50);
        let mut encoder = SelectionEncoder::new();
        let mut text = RecordedText::new();
        let palette = GrayscalePalette { threshold: None };
        {
            let mut frame = Frame::new(&mut gfx, &mut encoder);
            frame.text = Some(&mut text);
            let vp = Viewport::new(0, 0, 100, 50);
            let ctx = DrawContext::new(DrawMode::Drawing, 0, None, vp);
            let annotations = [
                Annotation::new(
                    AnnotationAnchor::Window(Vec2::new(20.0, 20.0)),
                    AnnotationShape::Text { text: "label".into(), style: TextStyle::default() },
                ),
                Annotation {
                    size: Vec2::new(60.0, 10.0),
                    ..Annotation::new(
                        AnnotationAnchor::Window(Vec2::new(50.0, 70.0)),
                        AnnotationShape::Colorbar {
                            palette: &palette,
                            statistics: MapStatistics { minimum: 0.0, maximum: 1.0 },
                        },
                    )
                },
            ];
            draw_annotation_layer(&mut frame, &ctx, &annotations, &[AnnotationSpace::Window], vp, None);
            // Colorbar runs dark to light from left to right
            let left = frame.gfx.read_pixel(22, 35).unwrap();
            let right = frame.gfx.read_pixel(77, 35).unwrap();
            assert!(left[0] < right[0]);
        }
        let strings: Vec<&str> = text.items.iter().map(|t| t.2.as_str()).collect();
        assert_eq!(strings, vec!["label", "0.00", "1.00"]);
    }

    #[test]
    fn test_pick_selectable_annotation() {
        let mut gfx = GraphicsContext::new(40, 40);
        let mut encoder = SelectionEncoder::new();
        let mut selection = SelectionManager::new();
        let vp = Viewport::new(0, 0, 40, 40);
        let annotations = [
            boxed(AnnotationAnchor::Tab(Vec2::new(25.0, 25.0)), 0),
            Annotation { selectable: false, ..boxed(AnnotationAnchor::Tab(Vec2::new(75.0, 75.0)), 0) },
        ];
        {
            let mut frame = Frame::new(&mut gfx, &mut encoder);
            frame.selection = Some(&mut selection);
            let mut ctx = DrawContext::new(DrawMode::Identification, 0, Some(2), vp);
            ctx.mouse = (30, 30);
            draw_annotation_layer(&mut frame, &ctx, &annotations, &TAB_SPACES, vp, None);
            ctx.mouse = (10, 10);
            draw_annotation_layer(&mut frame, &ctx, &annotations, &TAB_SPACES, vp, None);
        }
        let hit = selection.result(SelectionCategory::Annotation).unwrap();
        assert_eq!(hit.indices, PickIndices::one(0));
        assert_eq!(hit.tab_index, Some(2));
    }
}
