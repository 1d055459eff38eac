use serde::Serialize;
use uuid::Uuid;

use crate::application::error::AppError;
use crate::domain::types::ContentKind;

#[derive(Debug, Clone)]
pub struct CreateContentCommand {
    pub site_id: Uuid,
    pub kind: ContentKind,
    pub title: String,
    /// Canonical slug to use instead of one derived from the title.
    pub slug: Option<String>,
    pub comments_allowed: bool,
}

/// Partial edit; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateContentCommand {
    pub id: Uuid,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub comments_allowed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishDueReport {
    pub published: Vec<Uuid>,
    pub skipped: Vec<Uuid>,
}

pub(super) fn ensure_title(title: &str) -> Result<String, AppError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid("title must not be empty"));
    }
    Ok(trimmed.to_string())
}
