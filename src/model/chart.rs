//! Chart data: legacy line series and the newer histogram chart

use crate::rasterizer::{Rgba, Vec2};

#[derive(Debug, Clone)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<Vec2>,
    pub color: Rgba,
    pub line_width: f32,
}

/// Legacy line chart
#[derive(Clone)]
pub struct LineChart<'a> {
    pub series: &'a [ChartSeries],
}

impl LineChart<'_> {
    /// (min x, max x, min y, max y) over all points
    pub fn extents(&self) -> Option<(f32, f32, f32, f32)> {
        let mut it = self.series.iter().flat_map(|s| s.points.iter());
        let first = it.next()?;
        Some(it.fold((first.x, first.x, first.y, first.y), |(x0, x1, y0, y1), p| {
            (x0.min(p.x), x1.max(p.x), y0.min(p.y), y1.max(p.y))
        }))
    }
}

/// Histogram of one map
#[derive(Clone)]
pub struct HistogramChart<'a> {
    pub bins: &'a [f32],
    /// Data value range covered by the bins
    pub range: (f32, f32),
    pub color: Rgba,
}

impl HistogramChart<'_> {
    pub fn max_count(&self) -> f32 {
        self.bins.iter().copied().fold(0.0, f32::max)
    }
}

#[derive(Clone)]
pub enum ChartModel<'a> {
    Lines(LineChart<'a>),
    Histogram(HistogramChart<'a>),
}
