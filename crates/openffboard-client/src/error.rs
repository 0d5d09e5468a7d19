//! Error types for transport sessions and typed parameter access.

use std::path::PathBuf;
use std::time::Duration;

use racing_wheel_hid_openffboard_protocol::{Operation, Outcome, ProtocolError};
use thiserror::Error;

/// Failures of a single exchange on the physical channel.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The handle failed. The session is marked disconnected.
    #[error("Transport failure: {0}")]
    TransportFailure(#[from] std::io::Error),

    /// No reply matched within the bound. The session stays connected.
    #[error("No reply within {}ms", after.as_millis())]
    Timeout { after: Duration },

    #[error("Session is not connected")]
    NotConnected,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The operation needs a text link.
    #[error("Raw text exchange is not available on the {link} link")]
    NotTextLink { link: &'static str },
}

impl TransportError {
    /// `true` when the session can no longer be used without reconnecting.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TransportFailure(_) | Self::NotConnected)
    }
}

/// Errors surfaced by the typed invoker.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The descriptor does not allow the operation. Nothing was sent.
    #[error("Parameter '{name}' does not support {operation:?}")]
    Capability {
        name: &'static str,
        operation: Operation,
    },

    /// A client-side precondition failed. Only the precondition check was sent.
    #[error("Precondition failed for '{name}': {reason}")]
    Precondition {
        name: &'static str,
        reason: &'static str,
    },

    #[error(transparent)]
    Communication(#[from] TransportError),

    /// The device refused the command.
    #[error("Device answered {outcome:?} for '{name}': {detail}")]
    Device {
        name: &'static str,
        outcome: Outcome,
        detail: String,
    },

    /// The descriptor cannot be expressed on the session's link.
    #[error("Parameter '{name}' cannot be used over the {link} link")]
    UnsupportedOnLink {
        name: &'static str,
        link: &'static str,
    },

    #[error("Unknown parameter '{name}' in class '{class}'")]
    UnknownParameter { class: &'static str, name: String },

    #[error("Reply for '{name}' could not be converted: {source}")]
    Coercion {
        name: &'static str,
        #[source]
        source: ProtocolError,
    },
}

impl CommandError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Communication(TransportError::Timeout { .. }))
    }
}

/// Errors loading, saving or validating a client configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type TransportResult<T> = Result<T, TransportError>;
pub type CommandResult<T> = Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_not_fatal() {
        let timeout = TransportError::Timeout {
            after: Duration::from_millis(500),
        };
        assert!(!timeout.is_fatal());
        assert_eq!(timeout.to_string(), "No reply within 500ms");

        let io = TransportError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(io.is_fatal());
        assert!(TransportError::NotConnected.is_fatal());
    }

    #[test]
    fn command_error_wraps_transport() {
        let err = CommandError::from(TransportError::Timeout {
            after: Duration::from_millis(10),
        });
        assert!(err.is_timeout());
        assert!(!CommandError::from(TransportError::NotConnected).is_timeout());
    }
}
