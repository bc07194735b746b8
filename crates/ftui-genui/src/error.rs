//! Error types for the generative-UI pipeline.
//!
//! Nothing here is fatal. A [`RenderError`] is contained by the per-node
//! boundary and becomes a placeholder; a [`TransportError`] ends a stream and
//! becomes a single notice while everything already rendered stays visible.
//! Decode failures and untyped elements are not errors at all: they are
//! counted in the [`ExtractionReport`](crate::extract::ExtractionReport).

use thiserror::Error;

/// A renderer could not turn a record into a view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("missing field `{field}`")]
    MissingField { field: &'static str },

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("renderer panicked: {message}")]
    Panicked { message: String },
}

impl RenderError {
    #[must_use]
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    #[must_use]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// The upstream transport failed while the response was streaming.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stream is not valid UTF-8 at byte {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("{message}")]
    Remote { message: String },
}

impl TransportError {
    #[must_use]
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// The single message shown to the user when a stream dies mid-response.
    #[must_use]
    pub fn user_notice(&self) -> String {
        format!("The response stream was interrupted: {self}")
    }
}

#[cfg(test)]
mod tests {
    use super::{RenderError, TransportError};

    #[test]
    fn render_error_messages_name_the_field() {
        assert_eq!(
            RenderError::missing("rows").to_string(),
            "missing field `rows`"
        );
        assert_eq!(
            RenderError::invalid("value", "not a number").to_string(),
            "invalid field `value`: not a number"
        );
    }

    #[test]
    fn transport_notice_wraps_the_cause() {
        let error = TransportError::remote("connection reset");
        assert_eq!(
            error.user_notice(),
            "The response stream was interrupted: connection reset"
        );
    }
}
