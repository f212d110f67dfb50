//! Charts: legacy line series and histograms
//!
//! Drawn in viewport pixels with a margin for the axes. Line chart points
//! and histogram bars are pickable as chart data.

use crate::dispatch::{DrawContext, DrawMode, Frame};
use crate::model::{ChartModel, HistogramChart, LineChart};
use crate::picking::{PickIndices, SelectionCategory, SelectionResult};
use crate::rasterizer::{Rgba, Vec2, Vec3, Vertex, Viewport};
use crate::text::{TextAlign, TextStyle};
use crate::transform::OrthoBounds;

use super::{blend_for, DataKind};

const MARGIN_LEFT: f32 = 40.0;
const MARGIN_BOTTOM: f32 = 24.0;
const MARGIN_OTHER: f32 = 10.0;
/// Side of the square a line chart point is picked with
const POINT_PICK_SIZE: f32 = 5.0;
const LABEL_SIZE: f32 = 12.0;

/// Data range to pixel mapping of one chart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartArea {
    /// Plot rectangle in viewport pixels (left, top, right, bottom)
    pub plot: (f32, f32, f32, f32),
    /// Data extents (min x, max x, min y, max y)
    pub data: (f32, f32, f32, f32),
}

/// Widen empty ranges so a single value still gets a visible axis
pub fn pad_extents(data: (f32, f32, f32, f32)) -> (f32, f32, f32, f32) {
    let pad = |lo: f32, hi: f32| {
        if hi - lo > 0.0 {
            (lo, hi)
        } else {
            let d = if lo == 0.0 { 1.0 } else { lo.abs() * 0.1 };
            (lo - d, hi + d)
        }
    };
    let (x0, x1) = pad(data.0, data.1);
    let (y0, y1) = pad(data.2, data.3);
    (x0, x1, y0, y1)
}

impl ChartArea {
    pub fn new(viewport: Viewport, data: (f32, f32, f32, f32)) -> Self {
        let w = viewport.width as f32;
        let h = viewport.height as f32;
        let plot = (
            MARGIN_LEFT,
            MARGIN_OTHER,
            (w - MARGIN_OTHER).max(MARGIN_LEFT + 1.0),
            (h - MARGIN_BOTTOM).max(MARGIN_OTHER + 1.0),
        );
        Self { plot, data: pad_extents(data) }
    }

    /// Data point to viewport pixel, y down
    pub fn to_pixel(&self, p: Vec2) -> Vec3 {
        let (l, t, r, b) = self.plot;
        let (x0, x1, y0, y1) = self.data;
        let px = l + (p.x - x0) / (x1 - x0) * (r - l);
        let py = b - (p.y - y0) / (y1 - y0) * (b - t);
        Vec3::new(px, py, 0.0)
    }
}

fn data_extents(model: &ChartModel) -> Option<(f32, f32, f32, f32)> {
    match model {
        ChartModel::Lines(chart) => chart.extents(),
        ChartModel::Histogram(hist) => {
            if hist.bins.is_empty() {
                return None;
            }
            Some((hist.range.0, hist.range.1, 0.0, hist.max_count()))
        }
    }
}

fn quad(frame: &mut Frame, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgba) {
    frame.gfx.draw_quad([
        Vertex::new(Vec3::new(x0, y0, 0.0), color),
        Vertex::new(Vec3::new(x1, y0, 0.0), color),
        Vertex::new(Vec3::new(x1, y1, 0.0), color),
        Vertex::new(Vec3::new(x0, y1, 0.0), color),
    ]);
}

/// Pixel rectangle (x0, y0, x1, y1) of histogram bin `i`
fn bar_rect(area: &ChartArea, hist: &HistogramChart, i: usize) -> (f32, f32, f32, f32) {
    let (lo, hi) = hist.range;
    let width = (hi - lo) / hist.bins.len() as f32;
    let x = lo + width * i as f32;
    let a = area.to_pixel(Vec2::new(x, 0.0));
    let b = area.to_pixel(Vec2::new(x + width, hist.bins[i]));
    (a.x, b.y, b.x, a.y)
}

pub fn draw_chart(frame: &mut Frame, ctx: &DrawContext, model: &ChartModel) {
    if ctx.mode == DrawMode::Projection {
        return;
    }
    let Some(data) = data_extents(model) else {
        return;
    };
    let area = ChartArea::new(ctx.viewport, data);

    let mut f = frame.save_state();
    f.gfx.set_viewport(ctx.viewport);
    f.gfx.set_projection(OrthoBounds::pixels(ctx.viewport).matrix(false));
    f.gfx.load_identity();
    f.gfx.disable_clip_planes();
    f.gfx.set_lighting(false);
    f.gfx.set_depth_test(false);

    match ctx.mode {
        DrawMode::Drawing => {
            draw_axes(&mut f, ctx, &area);
            match model {
                ChartModel::Lines(chart) => draw_lines(&mut f, &area, chart),
                ChartModel::Histogram(hist) => {
                    for i in 0..hist.bins.len() {
                        let (x0, y0, x1, y1) = bar_rect(&area, hist, i);
                        quad(&mut f, x0, y0, x1, y1, hist.color);
                    }
                }
            }
        }
        DrawMode::Identification => identify(&mut f, ctx, &area, model),
        DrawMode::Projection => {}
    }
}

fn draw_axes(frame: &mut Frame, ctx: &DrawContext, area: &ChartArea) {
    let (l, t, r, b) = area.plot;
    let fg = ctx.colors.foreground;
    frame.gfx.draw_line_strip(&[
        Vertex::new(Vec3::new(l, t, 0.0), fg),
        Vertex::new(Vec3::new(l, b, 0.0), fg),
        Vertex::new(Vec3::new(r, b, 0.0), fg),
    ]);

    let (x0, x1, y0, y1) = area.data;
    let (vx, vy) = (ctx.viewport.x as f32, ctx.viewport.y as f32);
    let style = TextStyle::new(fg, LABEL_SIZE);
    let right = TextStyle { align: TextAlign::Right, ..style };
    let below = vy + b + LABEL_SIZE + 2.0;
    frame.draw_text(vx + l, below, &format!("{:.2}", x0), &style);
    frame.draw_text(vx + r, below, &format!("{:.2}", x1), &right);
    frame.draw_text(vx + l - 4.0, vy + b, &format!("{:.2}", y0), &right);
    frame.draw_text(vx + l - 4.0, vy + t + LABEL_SIZE, &format!("{:.2}", y1), &right);
}

fn draw_lines(frame: &mut Frame, area: &ChartArea, chart: &LineChart) {
    for series in chart.series {
        let blend = (series.color.a < 1.0).then(|| blend_for(DataKind::Chart));
        frame.gfx.set_blend(blend);
        frame.gfx.set_line_width(series.line_width.max(1.0));
        let strip: Vec<Vertex> = series
            .points
            .iter()
            .map(|p| Vertex::new(area.to_pixel(*p), series.color))
            .collect();
        frame.gfx.draw_line_strip(&strip);
    }
}

fn identify(frame: &mut Frame, ctx: &DrawContext, area: &ChartArea, model: &ChartModel) {
    let category = SelectionCategory::ChartData;
    if !frame.category_enabled(category) {
        return;
    }
    frame.begin_pick_pass();
    let half = POINT_PICK_SIZE / 2.0;
    match model {
        ChartModel::Lines(chart) => {
            for (s, series) in chart.series.iter().enumerate() {
                for (i, p) in series.points.iter().enumerate() {
                    let c = area.to_pixel(*p);
                    let color = frame.encoder.encode_color(category, PickIndices::two(s, i));
                    quad(frame, c.x - half, c.y - half, c.x + half, c.y + half, color);
                }
            }
        }
        ChartModel::Histogram(hist) => {
            for i in 0..hist.bins.len() {
                let (x0, y0, x1, y1) = bar_rect(area, hist, i);
                let color = frame.encoder.encode_color(category, PickIndices::one(i));
                quad(frame, x0, y0, x1, y1, color);
            }
        }
    }
    let Some(hit) = frame.resolve(ctx, category) else {
        return;
    };
    let value = match model {
        ChartModel::Lines(chart) => chart
            .series
            .get(hit.indices.first)
            .and_then(|s| s.points.get(hit.indices.second.unwrap_or(0)))
            .map(|p| Vec3::new(p.x, p.y, 0.0)),
        ChartModel::Histogram(hist) => hist.bins.get(hit.indices.first).map(|count| {
            let width = (hist.range.1 - hist.range.0) / hist.bins.len() as f32;
            Vec3::new(hist.range.0 + width * (hit.indices.first as f32 + 0.5), *count, 0.0)
        }),
    };
    let mut result = SelectionResult::new(category, hit.indices, hit.screen_depth);
    result.model_xyz = value;
    frame.offer_selection(ctx, result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChartSeries;
    use crate::picking::{SelectionEncoder, SelectionManager};
    use crate::rasterizer::GraphicsContext;
    use crate::text::RecordedText;

    fn series() -> Vec<ChartSeries> {
        vec![ChartSeries {
            name: "mean".into(),
            points: vec![Vec2::new(0.0, 0.0), Vec2::new(5.0, 10.0), Vec2::new(10.0, 5.0)],
            color: Rgba::GREEN,
            line_width: 1.0,
        }]
    }

    #[test]
    fn test_degenerate_extents_are_padded() {
        let (x0, x1, y0, y1) = pad_extents((2.0, 2.0, 0.0, 0.0));
        assert!((x0 - 1.8).abs() < 1.0e-6 && (x1 - 2.2).abs() < 1.0e-6);
        assert_eq!((y0, y1), (-1.0, 1.0));
        assert_eq!(pad_extents((0.0, 4.0, 1.0, 3.0)), (0.0, 4.0, 1.0, 3.0));
    }

    #[test]
    fn test_area_maps_extents_to_plot_corners() {
        let area = ChartArea::new(Viewport::new(0, 0, 150, 134), (0.0, 10.0, 0.0, 10.0));
        assert_eq!(area.to_pixel(Vec2::new(0.0, 0.0)), Vec3::new(40.0, 110.0, 0.0));
        assert_eq!(area.to_pixel(Vec2::new(10.0, 10.0)), Vec3::new(140.0, 10.0, 0.0));
    }

    #[test]
    fn test_draw_axes_labels_and_series() {
        let s = series();
        let model = ChartModel::Lines(LineChart { series: &s });
        let mut gfx = GraphicsContext::new(150, 134);
        let mut encoder = SelectionEncoder::new();
        let mut text = RecordedText::new();
        {
            let mut frame = Frame::new(&mut gfx, &mut encoder);
            frame.text = Some(&mut text);
            let ctx = DrawContext::new(DrawMode::Drawing, 0, Some(0), Viewport::new(0, 0, 150, 134));
            draw_chart(&mut frame, &ctx, &model);
            // Two axis segments and two series segments
            assert_eq!(frame.gfx.stats().lines, 4);
            // Series point (5, 10) sits at pixel (90, 10)
            assert_eq!(frame.gfx.read_pixel(90, 10), Some([0, 255, 0]));
        }
        let labels: Vec<&str> = text.items.iter().map(|(_, _, t, _)| t.as_str()).collect();
        assert_eq!(labels, ["0.00", "10.00", "0.00", "10.00"]);
    }

    #[test]
    fn test_pick_chart_point_and_bar() {
        let s = series();
        let lines = ChartModel::Lines(LineChart { series: &s });
        let bins = [2.0, 8.0, 4.0, 1.0];
        let hist = ChartModel::Histogram(HistogramChart { bins: &bins, range: (0.0, 4.0), color: Rgba::RED });

        let mut gfx = GraphicsContext::new(150, 134);
        let mut encoder = SelectionEncoder::new();
        let mut selection = SelectionManager::new();
        let mut frame = Frame::new(&mut gfx, &mut encoder);
        frame.selection = Some(&mut selection);
        let mut ctx = DrawContext::new(DrawMode::Identification, 0, Some(0), Viewport::new(0, 0, 150, 134));

        // Two pixels away from point (10, 5) at pixel (140, 60)
        ctx.mouse = (138, 61);
        draw_chart(&mut frame, &ctx, &lines);
        let hit = frame.selection.as_ref().unwrap().result(SelectionCategory::ChartData).unwrap().clone();
        assert_eq!(hit.indices, PickIndices::two(0, 2));
        assert_eq!(hit.model_xyz, Some(Vec3::new(10.0, 5.0, 0.0)));

        frame.selection.as_mut().unwrap().reset();
        // Bin 1 spans pixels 65..90 and rises to the top of the plot
        ctx.mouse = (70, 100);
        draw_chart(&mut frame, &ctx, &hist);
        let hit = frame.selection.as_ref().unwrap().result(SelectionCategory::ChartData).unwrap();
        assert_eq!(hit.indices, PickIndices::one(1));
    }
}
