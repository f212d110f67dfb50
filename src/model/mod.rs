//! Data handed to the renderer for one frame
//!
//! Everything here borrows from the caller's domain objects; the renderer
//! never owns or mutates model data.

pub mod chart;
pub mod media;
pub mod surface;
pub mod volume;

use serde::{Deserialize, Serialize};

use crate::annotation::Annotation;
use crate::clipping::ClipPlaneGroup;
use crate::fiber::FiberLayer;
use crate::rasterizer::{mat4_identity, Mat4, Vec3, Viewport};

pub use chart::{ChartModel, ChartSeries, HistogramChart, LineChart};
pub use media::MediaModel;
pub use surface::{Border, Focus, SurfaceDrawStyle, SurfaceGeometry, SurfaceLayer, SurfaceModel, SurfaceType};
pub use volume::{
    build_volume_draw_info, GrayscalePalette, LinearPalette, MapStatistics, Palette, SliceEnables, SliceSelection,
    SliceViewPlane, VolumeData, VolumeDrawInfo, VolumeKind, VolumeOverlay, WholeBrainVolumeMode,
};

/// Anatomical structure a piece of geometry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Structure {
    CortexLeft,
    CortexRight,
    Cerebellum,
    Other,
}

impl Structure {
    pub fn is_left(self) -> bool {
        self == Structure::CortexLeft
    }

    pub fn is_right(self) -> bool {
        self == Structure::CortexRight
    }
}

/// User view: pan, rotation and zoom
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub translation: Vec3,
    pub rotation: Mat4,
    pub scaling: f32,
    /// Extra pan applied to right flat maps so both hemispheres fit side by side
    pub right_flat_offset: (f32, f32),
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: mat4_identity(),
            scaling: 1.0,
            right_flat_offset: (0.0, 0.0),
        }
    }
}

/// Model type a region displays, used to pick region colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Surface,
    SurfaceMontage,
    VolumeSlices,
    WholeBrain,
    Chart,
    Media,
    Spacer,
}

/// Two surfaces shown in a montage grid
#[derive(Clone)]
pub struct MontageModel<'a> {
    pub left: Option<SurfaceLayer<'a>>,
    pub right: Option<SurfaceLayer<'a>>,
    pub view: ViewTransform,
}

/// Volume overlays shown as one or all slice planes
#[derive(Clone)]
pub struct VolumeSliceModel<'a> {
    /// Top layer first
    pub overlays: &'a [VolumeOverlay<'a>],
    pub plane: SliceViewPlane,
    pub slices: SliceSelection,
    pub view: ViewTransform,
    pub fibers: Option<FiberLayer<'a>>,
}

/// Offsets that pull the hemispheres apart in the whole brain view
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WholeBrainSeparation {
    pub left_right: f32,
    pub cerebellum: f32,
}

/// Surfaces, volume slices/cubes and fibers in one 3D scene
#[derive(Clone)]
pub struct WholeBrainModel<'a> {
    pub left: Option<SurfaceLayer<'a>>,
    pub right: Option<SurfaceLayer<'a>>,
    pub cerebellum: Option<SurfaceLayer<'a>>,
    /// Top layer first
    pub overlays: &'a [VolumeOverlay<'a>],
    pub slices: SliceSelection,
    pub separation: WholeBrainSeparation,
    pub view: ViewTransform,
    pub fibers: Option<FiberLayer<'a>>,
}

/// What a viewport region displays; each variant carries exactly what its
/// renderer consumes
#[derive(Clone)]
pub enum ModelContent<'a> {
    Surface(SurfaceModel<'a>),
    SurfaceMontage(MontageModel<'a>),
    VolumeSlices(VolumeSliceModel<'a>),
    WholeBrain(WholeBrainModel<'a>),
    Chart(ChartModel<'a>),
    Media(MediaModel<'a>),
    Spacer,
}

impl<'a> ModelContent<'a> {
    pub fn kind(&self) -> ModelKind {
        match self {
            ModelContent::Surface(_) => ModelKind::Surface,
            ModelContent::SurfaceMontage(_) => ModelKind::SurfaceMontage,
            ModelContent::VolumeSlices(_) => ModelKind::VolumeSlices,
            ModelContent::WholeBrain(_) => ModelKind::WholeBrain,
            ModelContent::Chart(_) => ModelKind::Chart,
            ModelContent::Media(_) => ModelKind::Media,
            ModelContent::Spacer => ModelKind::Spacer,
        }
    }

    pub fn name(&self) -> &'static str {
        match self.kind() {
            ModelKind::Surface => "surface",
            ModelKind::SurfaceMontage => "surface montage",
            ModelKind::VolumeSlices => "volume slices",
            ModelKind::WholeBrain => "whole brain",
            ModelKind::Chart => "chart",
            ModelKind::Media => "media",
            ModelKind::Spacer => "spacer",
        }
    }

    /// Surface displayed for `structure`, used to anchor annotations
    pub fn find_surface(&self, structure: Structure) -> Option<&SurfaceLayer<'a>> {
        let matches = |layer: &&SurfaceLayer<'a>| layer.geometry.structure == structure;
        match self {
            ModelContent::Surface(s) => Some(&s.layer).filter(matches),
            ModelContent::SurfaceMontage(m) => m.left.iter().chain(m.right.iter()).find(matches),
            ModelContent::WholeBrain(w) => w
                .left
                .iter()
                .chain(w.right.iter())
                .chain(w.cerebellum.iter())
                .find(matches),
            _ => None,
        }
    }
}

/// One rectangle of a window and what it shows
#[derive(Clone)]
pub struct ViewportRegion<'a> {
    pub rect: Viewport,
    pub window_index: usize,
    /// `None` for spacer slots of a tile layout
    pub tab_index: Option<usize>,
    pub content: ModelContent<'a>,
    pub clip_group: Option<&'a ClipPlaneGroup>,
    /// Surface, stereotaxic, tab and spacer annotations
    pub annotations: &'a [Annotation<'a>],
    /// Lower values draw in front
    pub stacking_order: i32,
    /// Keep the window clear color behind this region
    pub transparent: bool,
    /// User-selected tab
    pub highlighted: bool,
}

impl<'a> ViewportRegion<'a> {
    pub fn new(rect: Viewport, window_index: usize, tab_index: Option<usize>, content: ModelContent<'a>) -> Self {
        Self {
            rect,
            window_index,
            tab_index,
            content,
            clip_group: None,
            annotations: &[],
            stacking_order: 0,
            transparent: false,
            highlighted: false,
        }
    }

    /// Regions with no area, or entirely outside the window, are skipped
    pub fn is_drawable_in(&self, window: &Viewport) -> bool {
        !self.rect.is_empty() && self.rect.intersects(window)
    }
}

/// Window being composited
#[derive(Clone)]
pub struct WindowContent<'a> {
    pub index: usize,
    pub width: i32,
    pub height: i32,
    /// Sub-rectangle used when the aspect ratio is locked
    pub aspect_locked: Option<Viewport>,
    /// Window-space annotations
    pub annotations: &'a [Annotation<'a>],
    /// Lower values draw in front
    pub annotation_stacking_order: i32,
}

impl<'a> WindowContent<'a> {
    pub fn new(index: usize, width: i32, height: i32) -> Self {
        Self {
            index,
            width,
            height,
            aspect_locked: None,
            annotations: &[],
            annotation_stacking_order: 0,
        }
    }

    pub fn rect(&self) -> Viewport {
        Viewport::new(0, 0, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_rule() {
        let window = Viewport::new(0, 0, 100, 100);
        let region = |rect| ViewportRegion::new(rect, 0, Some(0), ModelContent::Spacer);
        assert!(region(Viewport::new(0, 0, 50, 50)).is_drawable_in(&window));
        assert!(!region(Viewport::new(0, 0, 0, 50)).is_drawable_in(&window));
        assert!(!region(Viewport::new(0, 0, 50, -3)).is_drawable_in(&window));
        assert!(!region(Viewport::new(100, 0, 50, 50)).is_drawable_in(&window));
        assert!(!region(Viewport::new(-60, 0, 50, 50)).is_drawable_in(&window));
        assert!(region(Viewport::new(-40, 90, 50, 50)).is_drawable_in(&window));
    }
}
