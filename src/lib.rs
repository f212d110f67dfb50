//! brainview: multi-viewport brain visualization renderer
//!
//! Surfaces, volume slices, montages, charts and images are drawn into the
//! regions of a window by one software graphics context. The same drawing
//! code runs in three modes: normal drawing, color-coded picking and surface
//! projection.
//!
//! # Module Organization
//!
//! - `rasterizer` - framebuffer, render state, primitives, (un)projection
//! - `picking` - pick color encoding, selection results, projection results
//! - `clipping` - clip box planes with left/right mirroring
//! - `transform` - orthographic and viewing transforms per model type
//! - `model` - borrowed per-frame model data and viewport regions
//! - `dispatch` - draw modes, draw context, frame scopes, model dispatch
//! - `renderers` - one renderer per model type
//! - `fiber` - fiber orientation overlay
//! - `annotation` - boxes, text, colorbars and scale bars
//! - `compositor` - window compositing and the public entry points
//! - `preferences` - colors and compositor options stored as RON
//! - `capture` - framebuffer regions as images

pub mod annotation;
pub mod capture;
pub mod clipping;
pub mod compositor;
pub mod dispatch;
pub mod error;
pub mod fiber;
pub mod model;
pub mod picking;
pub mod preferences;
pub mod rasterizer;
pub mod renderers;
pub mod text;
pub mod transform;

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use compositor::{BrainRenderer, FrameTiming, MAX_TABS, MAX_WINDOWS};
pub use dispatch::DrawMode;
pub use error::RenderError;
pub use model::{ModelContent, ViewportRegion, WindowContent};
pub use picking::{ProjectionResult, SelectionCategory, SelectionManager, SelectionResult};
pub use preferences::Preferences;
