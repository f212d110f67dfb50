//! Volume data, overlays and the per-frame draw list

use serde::{Deserialize, Serialize};

use crate::rasterizer::{Rgba, Vec3};

/// Maps a data value to a color. Transparent results are not drawn.
pub trait Palette {
    fn name(&self) -> &str;
    fn color_for(&self, value: f32, stats: &MapStatistics) -> Rgba;
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MapStatistics {
    pub minimum: f32,
    pub maximum: f32,
}

impl MapStatistics {
    pub fn from_values(values: &[f32]) -> Self {
        let mut it = values.iter().copied().filter(|v| v.is_finite());
        let Some(first) = it.next() else {
            return Self::default();
        };
        let (minimum, maximum) = it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Self { minimum, maximum }
    }

    /// Value scaled to 0..1, degenerate ranges map to 0
    pub fn normalize(&self, value: f32) -> f32 {
        let range = self.maximum - self.minimum;
        if range <= 0.0 {
            return 0.0;
        }
        ((value - self.minimum) / range).clamp(0.0, 1.0)
    }
}

/// Black to white; values at or below `threshold` are transparent
#[derive(Debug, Clone)]
pub struct GrayscalePalette {
    pub threshold: Option<f32>,
}

impl Palette for GrayscalePalette {
    fn name(&self) -> &str {
        "Grayscale"
    }

    fn color_for(&self, value: f32, stats: &MapStatistics) -> Rgba {
        if self.threshold.map_or(false, |t| value <= t) {
            return Rgba::TRANSPARENT;
        }
        let g = stats.normalize(value);
        Rgba::rgb(g, g, g)
    }
}

/// Linear ramp between two colors with an optional transparent threshold
#[derive(Debug, Clone)]
pub struct LinearPalette {
    pub name: String,
    pub low: Rgba,
    pub high: Rgba,
    pub threshold: Option<f32>,
}

impl Palette for LinearPalette {
    fn name(&self) -> &str {
        &self.name
    }

    fn color_for(&self, value: f32, stats: &MapStatistics) -> Rgba {
        if self.threshold.map_or(false, |t| value <= t) {
            return Rgba::TRANSPARENT;
        }
        self.low.lerp(self.high, stats.normalize(value))
    }
}

/// How voxel values become colors
#[derive(Debug, Clone)]
pub enum VolumeKind {
    /// Mapped through the overlay's palette
    Scalar,
    /// Integer keys into a label table; key 0 or out of range is empty
    Label(Vec<Rgba>),
}

/// Regular voxel grid with one or more maps
#[derive(Debug, Clone)]
pub struct VolumeData {
    pub name: String,
    pub dims: [usize; 3],
    /// Stereotaxic position of voxel (0, 0, 0)
    pub origin: Vec3,
    pub spacing: Vec3,
    /// Each map holds `dims[0] * dims[1] * dims[2]` values, i fastest
    pub maps: Vec<Vec<f32>>,
    pub kind: VolumeKind,
}

impl VolumeData {
    pub fn voxel_count(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.dims[0] * (j + self.dims[1] * k)
    }

    pub fn value(&self, map: usize, i: usize, j: usize, k: usize) -> Option<f32> {
        if i >= self.dims[0] || j >= self.dims[1] || k >= self.dims[2] {
            return None;
        }
        self.maps.get(map)?.get(self.index(i, j, k)).copied()
    }

    pub fn index_to_space(&self, i: f32, j: f32, k: f32) -> Vec3 {
        Vec3::new(
            self.origin.x + i * self.spacing.x,
            self.origin.y + j * self.spacing.y,
            self.origin.z + k * self.spacing.z,
        )
    }

    /// Nearest voxel to a stereotaxic point, `None` outside the grid
    pub fn space_to_index(&self, p: Vec3) -> Option<[usize; 3]> {
        let mut ijk = [0usize; 3];
        for (axis, out) in ijk.iter_mut().enumerate() {
            let s = self.spacing.axis(axis);
            if s == 0.0 {
                return None;
            }
            let f = ((p.axis(axis) - self.origin.axis(axis)) / s).round();
            if f < 0.0 || f as usize >= self.dims[axis] {
                return None;
            }
            *out = f as usize;
        }
        Some(ijk)
    }

    /// Stereotaxic bounds of the voxel faces
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let lo = self.index_to_space(-0.5, -0.5, -0.5);
        let hi = self.index_to_space(
            self.dims[0] as f32 - 0.5,
            self.dims[1] as f32 - 0.5,
            self.dims[2] as f32 - 0.5,
        );
        (lo.min(hi), lo.max(hi))
    }

    pub fn center(&self) -> Vec3 {
        let (lo, hi) = self.bounds();
        (lo + hi) * 0.5
    }

    pub fn uses_palette(&self) -> bool {
        matches!(self.kind, VolumeKind::Scalar)
    }

    pub fn statistics(&self, map: usize) -> MapStatistics {
        self.maps.get(map).map(|m| MapStatistics::from_values(m)).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WholeBrainVolumeMode {
    #[default]
    Slices,
    Cubes,
}

/// One layer of the volume stack as configured by the user
#[derive(Clone)]
pub struct VolumeOverlay<'a> {
    pub volume: &'a VolumeData,
    pub map_index: usize,
    pub palette: Option<&'a dyn Palette>,
    pub opacity: f32,
    pub enabled: bool,
    pub whole_brain_mode: WholeBrainVolumeMode,
}

/// Per-frame record of one volume layer to draw
#[derive(Clone)]
pub struct VolumeDrawInfo<'a> {
    pub volume: &'a VolumeData,
    pub map_index: usize,
    pub palette: Option<&'a dyn Palette>,
    pub statistics: MapStatistics,
    pub opacity: f32,
    pub whole_brain_mode: WholeBrainVolumeMode,
}

impl<'a> VolumeDrawInfo<'a> {
    /// Color of a voxel with the layer opacity applied; transparent when
    /// the voxel is empty
    pub fn voxel_color(&self, i: usize, j: usize, k: usize) -> Rgba {
        let Some(value) = self.volume.value(self.map_index, i, j, k) else {
            return Rgba::TRANSPARENT;
        };
        let c = match (&self.volume.kind, self.palette) {
            (VolumeKind::Label(table), _) => {
                let key = value.round();
                if key <= 0.0 {
                    Rgba::TRANSPARENT
                } else {
                    table.get(key as usize).copied().unwrap_or(Rgba::TRANSPARENT)
                }
            }
            (VolumeKind::Scalar, Some(palette)) => palette.color_for(value, &self.statistics),
            (VolumeKind::Scalar, None) => {
                let g = self.statistics.normalize(value);
                Rgba::rgb(g, g, g)
            }
        };
        c.with_alpha(c.a * self.opacity)
    }

    fn renders_same_as(&self, other: &VolumeDrawInfo) -> bool {
        std::ptr::eq(self.volume, other.volume)
            && self.map_index == other.map_index
            && self.palette.map(|p| p.name().to_string()) == other.palette.map(|p| p.name().to_string())
    }
}

/// Build the draw list from overlays given top layer first. The result is
/// ordered bottom layer first. An opaque palette-mapped layer that would
/// draw exactly like the layer below it is dropped.
pub fn build_volume_draw_info<'a>(overlays: &[VolumeOverlay<'a>]) -> Vec<VolumeDrawInfo<'a>> {
    let mut infos: Vec<VolumeDrawInfo<'a>> = Vec::new();
    for overlay in overlays.iter().rev().filter(|o| o.enabled) {
        let opacity = if overlay.volume.uses_palette() { overlay.opacity } else { 1.0 };
        let info = VolumeDrawInfo {
            volume: overlay.volume,
            map_index: overlay.map_index,
            palette: overlay.palette,
            statistics: overlay.volume.statistics(overlay.map_index),
            opacity,
            whole_brain_mode: overlay.whole_brain_mode,
        };
        if let Some(prev) = infos.last() {
            if info.palette.is_some() && info.opacity >= 1.0 && info.renders_same_as(prev) {
                log::debug!("skipping duplicate layer of {}", info.volume.name);
                continue;
            }
        }
        infos.push(info);
    }
    infos
}

/// Plane(s) a slice view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SliceViewPlane {
    /// Constant k, looking down the z axis
    Axial,
    /// Constant j
    Coronal,
    /// Constant i
    Parasagittal,
    /// 2x2 grid: axial, coronal, parasagittal and a 3D view
    All,
}

impl SliceViewPlane {
    /// Voxel axis held constant by the plane
    pub fn slice_axis(self) -> Option<usize> {
        match self {
            SliceViewPlane::Axial => Some(2),
            SliceViewPlane::Coronal => Some(1),
            SliceViewPlane::Parasagittal => Some(0),
            SliceViewPlane::All => None,
        }
    }

    /// The two in-plane axes (horizontal, vertical)
    pub fn in_plane_axes(self) -> Option<(usize, usize)> {
        match self {
            SliceViewPlane::Axial => Some((0, 1)),
            SliceViewPlane::Coronal => Some((0, 2)),
            SliceViewPlane::Parasagittal => Some((1, 2)),
            SliceViewPlane::All => None,
        }
    }
}

/// Selected slice per axis, in voxel indices of the bottom layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SliceSelection {
    pub parasagittal: usize,
    pub coronal: usize,
    pub axial: usize,
    pub enabled: SliceEnables,
}

impl SliceSelection {
    pub fn index_for(&self, plane: SliceViewPlane) -> usize {
        match plane {
            SliceViewPlane::Parasagittal => self.parasagittal,
            SliceViewPlane::Coronal => self.coronal,
            SliceViewPlane::Axial | SliceViewPlane::All => self.axial,
        }
    }

    /// Centered slices for a volume, all planes enabled
    pub fn centered(volume: &VolumeData) -> Self {
        Self {
            parasagittal: volume.dims[0] / 2,
            coronal: volume.dims[1] / 2,
            axial: volume.dims[2] / 2,
            enabled: SliceEnables::default(),
        }
    }
}

/// Which orthogonal slices the whole brain view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceEnables {
    pub parasagittal: bool,
    pub coronal: bool,
    pub axial: bool,
}

impl Default for SliceEnables {
    fn default() -> Self {
        Self { parasagittal: true, coronal: true, axial: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume(name: &str, kind: VolumeKind) -> VolumeData {
        let dims = [4, 4, 4];
        let values = (0..64).map(|v| v as f32).collect();
        VolumeData {
            name: name.into(),
            dims,
            origin: Vec3::new(-2.0, -2.0, -2.0),
            spacing: Vec3::new(1.0, 1.0, 1.0),
            maps: vec![values],
            kind,
        }
    }

    fn overlay<'a>(v: &'a VolumeData, palette: Option<&'a dyn Palette>, opacity: f32) -> VolumeOverlay<'a> {
        VolumeOverlay {
            volume: v,
            map_index: 0,
            palette,
            opacity,
            enabled: true,
            whole_brain_mode: WholeBrainVolumeMode::Slices,
        }
    }

    #[test]
    fn test_index_space_round_trip() {
        let v = volume("a", VolumeKind::Scalar);
        let p = v.index_to_space(3.0, 1.0, 2.0);
        assert_eq!(v.space_to_index(p), Some([3, 1, 2]));
        assert_eq!(v.space_to_index(Vec3::new(10.0, 0.0, 0.0)), None);
        assert_eq!(v.value(0, 1, 1, 1), Some(21.0));
    }

    #[test]
    fn test_draw_info_is_bottom_first() {
        let a = volume("a", VolumeKind::Scalar);
        let b = volume("b", VolumeKind::Scalar);
        let gray = GrayscalePalette { threshold: None };
        let overlays = [overlay(&a, Some(&gray), 0.5), overlay(&b, Some(&gray), 1.0)];
        let infos = build_volume_draw_info(&overlays);
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].volume.name, "b");
        assert_eq!(infos[1].volume.name, "a");
    }

    #[test]
    fn test_identical_opaque_layers_are_deduplicated() {
        let a = volume("a", VolumeKind::Scalar);
        let gray = GrayscalePalette { threshold: None };
        let overlays = [overlay(&a, Some(&gray), 1.0), overlay(&a, Some(&gray), 1.0)];
        assert_eq!(build_volume_draw_info(&overlays).len(), 1);

        // Opaque copy on top of a translucent one is still dropped
        let overlays = [overlay(&a, Some(&gray), 1.0), overlay(&a, Some(&gray), 0.5)];
        let infos = build_volume_draw_info(&overlays);
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].opacity, 0.5);

        // Translucent copy on top is kept
        let overlays = [overlay(&a, Some(&gray), 0.5), overlay(&a, Some(&gray), 1.0)];
        assert_eq!(build_volume_draw_info(&overlays).len(), 2);
    }

    #[test]
    fn test_duplicate_label_layers_are_kept() {
        let labels = volume("labels", VolumeKind::Label(vec![Rgba::TRANSPARENT, Rgba::RED]));
        let overlays = [overlay(&labels, None, 1.0), overlay(&labels, None, 1.0)];
        assert_eq!(build_volume_draw_info(&overlays).len(), 2);
    }

    #[test]
    fn test_disabled_layers_skipped_and_labels_opaque() {
        let labels = volume("labels", VolumeKind::Label(vec![Rgba::TRANSPARENT, Rgba::RED]));
        let a = volume("a", VolumeKind::Scalar);
        let mut hidden = overlay(&a, None, 1.0);
        hidden.enabled = false;
        let overlays = [overlay(&labels, None, 0.3), hidden];
        let infos = build_volume_draw_info(&overlays);
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].opacity, 1.0);
        assert_eq!(infos[0].voxel_color(1, 0, 0), Rgba::RED);
        assert_eq!(infos[0].voxel_color(0, 0, 0).a, 0.0);
    }

    #[test]
    fn test_palette_threshold_makes_voxel_empty() {
        let a = volume("a", VolumeKind::Scalar);
        let gray = GrayscalePalette { threshold: Some(10.0) };
        let infos = build_volume_draw_info(&[overlay(&a, Some(&gray), 1.0)]);
        assert_eq!(infos[0].voxel_color(0, 0, 0).a, 0.0);
        assert_eq!(infos[0].voxel_color(3, 3, 3), Rgba::WHITE);
    }
}
