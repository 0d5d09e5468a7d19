//! OpenFFBoard protocol error types.

use crate::value::ValueKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("Unknown parameter '{name}' in class '{class}'")]
    UnknownParameter { class: &'static str, name: String },

    #[error("Payload of kind {kind:?} cannot be carried by the {link} link")]
    UnsupportedPayload { kind: ValueKind, link: &'static str },

    #[error("Missing payload for a write to '{0}'")]
    MissingPayload(&'static str),

    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Bad frame magic: expected {expected:#04x}, got {actual:#04x}")]
    BadMagic { expected: u8, actual: u8 },

    #[error("Duplicate parameter {what} '{value}' in class '{class}'")]
    DuplicateParameter {
        class: &'static str,
        what: &'static str,
        value: String,
    },

    #[error("Cannot coerce '{raw}' to {kind:?}")]
    Coercion { raw: String, kind: ValueKind },
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
