//! Shared "load the item, then hide it unless the actor may see it" step.

use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::repos::{ContentRepo, SitesRepo};
use crate::application::storage::StorageDeadline;
use crate::domain::actor::Actor;
use crate::domain::entities::{ContentRecord, SiteRecord};
use crate::domain::policy::{self, ContentScope};

#[derive(Debug, Clone)]
pub(crate) struct ScopedContent {
    pub content: ContentRecord,
    pub site: Option<SiteRecord>,
    pub scope: ContentScope,
}

impl ScopedContent {
    pub fn site_is_active(&self) -> bool {
        self.site.as_ref().is_some_and(SiteRecord::is_active)
    }
}

/// Content the actor cannot see is reported as missing, never as forbidden.
pub(crate) async fn load_visible(
    reader: &dyn ContentRepo,
    sites: &dyn SitesRepo,
    deadline: &StorageDeadline,
    actor: &Actor,
    id: Uuid,
) -> Result<ScopedContent, AppError> {
    let content = deadline
        .run("content.find", reader.find_content(id))
        .await?
        .ok_or(AppError::not_found("content"))?;
    let site = deadline
        .run("site.find", sites.find_site(content.site_id))
        .await?;
    let scope = ContentScope::of(&content, site.as_ref());

    if !policy::can_view_content(actor, &scope) {
        return Err(AppError::not_found("content"));
    }

    Ok(ScopedContent {
        content,
        site,
        scope,
    })
}

pub(crate) fn require_authenticated(actor: &Actor) -> Result<(), AppError> {
    if actor.is_authenticated() {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}
