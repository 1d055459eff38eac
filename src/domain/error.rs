use thiserror::Error;

use super::types::ContentStatus;

/// Failures of pure domain rules, before any storage is involved.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{message}")]
    Validation { message: String },
    #[error("cannot move content from `{from}` to `{to}`")]
    InvalidTransition {
        from: ContentStatus,
        to: ContentStatus,
    },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
