//! Display preferences: colors per model type and compositor options
//!
//! Stored as RON next to the user's other configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::model::ModelKind;
use crate::rasterizer::Rgba;

/// Foreground/background pair used for clears, axes and text
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorPair {
    pub foreground: Rgba,
    pub background: Rgba,
}

impl ColorPair {
    pub const fn new(foreground: Rgba, background: Rgba) -> Self {
        Self { foreground, background }
    }
}

impl Default for ColorPair {
    fn default() -> Self {
        Self::new(Rgba::WHITE, Rgba::BLACK)
    }
}

/// How the dead zone around an aspect-locked window is filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FillerStyle {
    #[default]
    Solid,
    Hatched,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub window: ColorPair,
    pub surface: ColorPair,
    pub montage: ColorPair,
    pub volume: ColorPair,
    pub whole_brain: ColorPair,
    pub chart: ColorPair,
    pub media: ColorPair,
    /// Border drawn around the selected tab
    pub highlight_color: Rgba,
    pub show_tab_highlight: bool,
    pub aspect_filler: FillerStyle,
    /// Draw frames per second when timing is supplied
    pub show_timing: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        let black_bg = ColorPair::default();
        Self {
            window: black_bg,
            surface: black_bg,
            montage: black_bg,
            volume: black_bg,
            whole_brain: black_bg,
            chart: ColorPair::new(Rgba::BLACK, Rgba::WHITE),
            media: black_bg,
            highlight_color: Rgba::rgb(0.0, 0.6, 1.0),
            show_tab_highlight: true,
            aspect_filler: FillerStyle::Solid,
            show_timing: true,
        }
    }
}

impl Preferences {
    /// Colors for a region displaying the given model type
    pub fn colors_for(&self, kind: ModelKind) -> ColorPair {
        match kind {
            ModelKind::Surface => self.surface,
            ModelKind::SurfaceMontage => self.montage,
            ModelKind::VolumeSlices => self.volume,
            ModelKind::WholeBrain => self.whole_brain,
            ModelKind::Chart => self.chart,
            ModelKind::Media => self.media,
            ModelKind::Spacer => self.window,
        }
    }

    pub fn to_ron(&self) -> Result<String, RenderError> {
        let config = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .indentor("  ".to_string());
        ron::ser::to_string_pretty(self, config).map_err(|e| RenderError::Serialization(e.to_string()))
    }

    pub fn from_ron(s: &str) -> Result<Self, RenderError> {
        ron::from_str(s).map_err(|e| RenderError::Serialization(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), RenderError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron(&contents)
    }

    /// `<config dir>/brainview/preferences.ron`
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("brainview")
            .join("preferences.ron")
    }

    #[cfg(target_arch = "wasm32")]
    pub fn default_path() -> PathBuf {
        PathBuf::from("preferences.ron")
    }

    /// Load from `path`, falling back to defaults (logged) when the file is
    /// missing or malformed
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(prefs) => prefs,
            Err(RenderError::Io(e)) => {
                log::debug!("no preferences at {}: {}", path.display(), e);
                Self::default()
            }
            Err(e) => {
                log::warn!("ignoring preferences at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}
