// Prize Draw Engine - Errors
use thiserror::Error;

/// Errors that may be returned by the draw engine and its collaborators
#[derive(Error, Debug)]
pub enum DrawError {
    /// Publish attempted while every slot is empty
    #[error("No slot holds a prize artifact")]
    NoArtifacts,

    /// Slot index outside the pool
    #[error("Slot index {0} is out of range")]
    InvalidSlot(usize),

    /// Token is unknown, or was purged by a round reset
    #[error("Token not found")]
    TokenNotFound,

    /// Token belongs to another participant
    #[error("Token does not belong to the requesting participant")]
    Forbidden,

    /// Token is valid but the prize artifact is no longer stored
    #[error("Prize artifact is gone")]
    Gone,

    /// Only the operator can perform this action
    #[error("Only the operator can perform this action")]
    NotOperator,

    /// Instruction text could not be decoded
    #[error("Invalid instruction: {0:?}")]
    InvalidInstruction(String),

    #[error("Invalid configuration value for {key}: {value:?}")]
    InvalidConfig { key: &'static str, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DrawError {
    /// Stable machine-readable code, used by transport collaborators
    pub fn code(&self) -> &'static str {
        match self {
            DrawError::NoArtifacts => "NO_ARTIFACTS",
            DrawError::InvalidSlot(_) => "BAD_SLOT",
            DrawError::TokenNotFound => "TOKEN_NOT_FOUND",
            DrawError::Forbidden => "FORBIDDEN",
            DrawError::Gone => "GONE",
            DrawError::NotOperator => "OPERATOR_ONLY",
            DrawError::InvalidInstruction(_) => "BAD_INSTRUCTION",
            DrawError::InvalidConfig { .. } => "INVALID_CONFIG",
            DrawError::Io(_) => "IO",
        }
    }
}
