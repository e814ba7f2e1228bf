use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the conversion engine.
///
/// Every variant aborts only the action that raised it; the session state is
/// left as it was before the action.
#[derive(Debug, Error)]
pub enum ConvError {
    /// Missing or conflicting user selection. Correctable from the UI.
    #[error("{0}")]
    Configuration(String),

    /// Filesystem checks on sources and destinations.
    #[error("{message}")]
    Validation {
        message: String,
        path: Option<PathBuf>,
    },

    /// Profile store read/write failure.
    #[error("Profile store error ({}): {message}", path.display())]
    Persistence { message: String, path: PathBuf },

    /// Peak-level analysis failure, reported verbatim.
    #[error("Audio analysis failed: {0}")]
    Analysis(String),
}

pub type ConvResult<T> = Result<T, ConvError>;

impl ConvError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn validation(msg: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::Validation {
            message: msg.into(),
            path: Some(path.into()),
        }
    }

    pub fn persistence(msg: impl std::fmt::Display, path: impl Into<PathBuf>) -> Self {
        Self::Persistence {
            message: msg.to_string(),
            path: path.into(),
        }
    }

    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis(msg.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
