use thiserror::Error;

use crate::api::ApiError;
use crate::layer::LayerId;
use crate::task::TaskLost;

/// Errors raised while turning user-supplied bytes into a canvas background
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read image file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to fetch image: {0}")]
    Fetch(#[from] ApiError),

    #[error("unsupported or corrupt image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image has no pixels")]
    Empty,

    #[error("image is too large ({width}x{height})")]
    TooLarge { width: u32, height: u32 },

    #[error("not an image: {0}")]
    NotAnImage(String),

    #[error(transparent)]
    Lost(#[from] TaskLost),
}

/// Errors surfaced by the publish pipeline. The display strings are shown to
/// the user as-is.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no image loaded")]
    NoImage,

    #[error("title required")]
    TitleRequired,

    #[error("a publish is already in progress")]
    Busy,

    #[error("cannot export this image")]
    Capture,

    #[error("{0}")]
    Publish(#[from] ApiError),
}

impl ExportError {
    /// Validation failures abort before any network call and leave the scene untouched.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::NoImage | Self::TitleRequired)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("no layer with id {0} in the scene")]
    UnknownLayer(LayerId),
}

#[derive(Debug, Error)]
pub enum FontError {
    #[error("built-in font face '{0}' is not available")]
    MissingFace(&'static str),

    #[error("invalid font data for '{0}'")]
    InvalidFont(String),

    #[error("failed to read font file: {0}")]
    Read(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid canvas size {width}x{height}")]
    InvalidCanvasSize { width: u32, height: u32 },
}
