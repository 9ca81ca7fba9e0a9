/// Crate-level error type for the reprise alignment library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid parameter value.
    #[error("invalid parameter `{name}`: got {value}, {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// The note source produced no usable notes.
    #[error("no valid notes found")]
    NoNotes,

    /// A note cannot be fed to the engine (zero duration, NaN onset, ...).
    #[error("invalid note at index {index}: {reason}")]
    InvalidNote { index: usize, reason: &'static str },

    /// Feature vectors of different dimensionality were compared.
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// Standard MIDI File decoding errors.
    #[error("midi error: {0}")]
    Midi(#[from] midly::Error),

    /// Configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// File I/O errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience Result type for reprise operations.
pub type Result<T> = std::result::Result<T, Error>;
