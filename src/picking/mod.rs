//! Color-coded picking and surface projection

pub mod encoder;
pub mod projection;
pub mod selection;

pub use encoder::{
    resolve_pick, PickEntry, PickHit, PickIndices, Rgb8, SelectionEncoder, BACKGROUND_PICK_COLOR,
    MAX_PICK_ENTRIES,
};
pub use projection::{barycentric_weights, BarycentricProjection, ProjectionResult, DEGENERATE_TRIANGLE_AREA};
pub use selection::{NearestVertex, SelectionCategory, SelectionManager, SelectionResult};
