use crate::store::Catalog;

/// Result alias that carries the custom [`OverlayError`] type.
pub type Result<T> = std::result::Result<T, OverlayError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    /// Free-form message, mostly used for poisoned locks and worker failures.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// JSON encoding or decoding failure.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A persisted entry could not be parsed. The file has already been
    /// removed when this is returned.
    #[error("{catalog} entry `{name}` was corrupt and has been removed")]
    Corrupt { catalog: Catalog, name: String },
    /// Attempt to overwrite or delete one of the built-in color presets.
    #[error("`{0}` is a built-in color preset and cannot be changed")]
    ProtectedPreset(String),
    #[error("no {catalog} entry named `{name}`")]
    NotFound { catalog: Catalog, name: String },
    #[error("invalid entry name `{0}`")]
    InvalidName(String),
    /// The audio device is missing or busy. The feature stays inactive.
    #[error("audio capture unavailable: {0}")]
    AudioUnavailable(String),
    /// The landmark detector could not process a frame.
    #[error("landmark detector failed: {0}")]
    Detector(String),
    /// The settings surface was closed for shutdown.
    #[error("settings are closed")]
    Closed,
}

impl OverlayError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Returns `true` for rejections that should be shown to the user as a
    /// warning rather than treated as a system failure.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::ProtectedPreset(_) | Self::NotFound { .. } | Self::InvalidName(_)
        )
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

impl From<&str> for OverlayError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for OverlayError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
