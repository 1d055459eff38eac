use thiserror::Error;
use tracing::warn;

use crate::application::repos::RepoError;
use crate::domain::error::DomainError;
use crate::domain::slug::{SlugAsyncError, SlugError};

/// Errors surfaced to callers of the application services.
///
/// Storage detail never leaves this layer: persistence failures and timeouts
/// are logged where they are converted and reported as `Unavailable`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("authentication required")]
    Unauthorized,
    #[error("operation not permitted: {0}")]
    Forbidden(&'static str),
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("storage temporarily unavailable")]
    Unavailable,
}

impl AppError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }

    /// Stable machine-readable code for boundaries that map errors to responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Conflict(_) => "conflict",
            Self::PreconditionFailed(_) => "precondition_failed",
            Self::Unavailable => "unavailable",
        }
    }
}

impl From<RepoError> for AppError {
    fn from(error: RepoError) -> Self {
        match error {
            RepoError::Duplicate { constraint } => {
                Self::Conflict(format!("unique constraint `{constraint}` violated"))
            }
            RepoError::Stale { entity } => {
                Self::Conflict(format!("{entity} was modified concurrently"))
            }
            RepoError::NotFound => Self::NotFound { entity: "record" },
            RepoError::InvalidInput { message } => Self::InvalidArgument(message),
            RepoError::Integrity { message } => Self::PreconditionFailed(message),
            RepoError::Timeout => {
                warn!(target = "application::error", "storage call timed out");
                Self::Unavailable
            }
            RepoError::Persistence(detail) => {
                warn!(
                    target = "application::error",
                    error = %detail,
                    "storage call failed"
                );
                Self::Unavailable
            }
        }
    }
}

impl From<DomainError> for AppError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Validation { message } => Self::InvalidArgument(message),
            err @ DomainError::InvalidTransition { .. } => Self::PreconditionFailed(err.to_string()),
        }
    }
}

impl From<SlugError> for AppError {
    fn from(error: SlugError) -> Self {
        match error {
            SlugError::Exhausted { base } => {
                Self::Conflict(format!("no free slug derived from `{base}`"))
            }
            other => Self::InvalidArgument(other.to_string()),
        }
    }
}

impl From<SlugAsyncError<RepoError>> for AppError {
    fn from(error: SlugAsyncError<RepoError>) -> Self {
        match error {
            SlugAsyncError::Slug(err) => err.into(),
            SlugAsyncError::Predicate(err) => err.into(),
        }
    }
}
