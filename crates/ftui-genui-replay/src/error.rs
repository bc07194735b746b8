use std::path::PathBuf;

use ftui_genui::RenderError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReplayError>;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("profile not found: {name}")]
    ProfileNotFound { name: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("invalid profile value {key}={value}: expected {expected}")]
    InvalidProfileValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("required path does not exist: {path}")]
    MissingPath { path: PathBuf },

    #[error("diagram could not be laid out: {0}")]
    Diagram(#[from] RenderError),

    #[error("{notice}")]
    StreamFailed { notice: String },
}

impl ReplayError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } | Self::InvalidProfileValue { .. } => 2,
            Self::StreamFailed { .. } => 3,
            _ => 1,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
