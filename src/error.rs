//! Errors returned by the renderer entry points

/// Precondition violations and I/O failures.
///
/// Missing data, disabled categories and degenerate geometry are not errors;
/// they resolve locally to "nothing drawn".
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Window index outside the supported range
    WindowIndexOutOfRange { index: usize, max: usize },
    /// Tab index outside the supported range
    TabIndexOutOfRange { index: usize, max: usize },
    /// A region was handed to a window it does not belong to
    RegionNotInWindow { region_window: usize, window: usize },
    /// File I/O error
    Io(String),
    /// Serialization/deserialization error
    Serialization(String),
    /// Image export error
    Capture(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::WindowIndexOutOfRange { index, max } => {
                write!(f, "window index {} out of range (max {})", index, max)
            }
            RenderError::TabIndexOutOfRange { index, max } => {
                write!(f, "tab index {} out of range (max {})", index, max)
            }
            RenderError::RegionNotInWindow { region_window, window } => {
                write!(f, "region belongs to window {} but was drawn in window {}", region_window, window)
            }
            RenderError::Io(msg) => write!(f, "I/O error: {}", msg),
            RenderError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            RenderError::Capture(msg) => write!(f, "Capture error: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        RenderError::Io(e.to_string())
    }
}
