use metrics::counter;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::repos::{
    CreateContentParams, RepoError, UpdateContentParams, UpdateContentStatusParams,
};
use crate::application::visibility::{ScopedContent, require_authenticated};
use crate::domain::actor::Actor;
use crate::domain::entities::ContentRecord;
use crate::domain::lifecycle::{self, StatusChange, Transition};
use crate::domain::policy;
use crate::domain::slug::{derive_slug, unique_slug, validate_slug};
use crate::domain::types::{ContentKind, ContentStatus};

use super::service::ContentLifecycleService;
use super::types::{CreateContentCommand, PublishDueReport, UpdateContentCommand, ensure_title};

impl ContentLifecycleService {
    pub async fn create_content(
        &self,
        actor: &Actor,
        command: CreateContentCommand,
    ) -> Result<ContentRecord, AppError> {
        require_authenticated(actor)?;
        if !policy::can_create_content(actor) {
            return Err(AppError::Forbidden("create content"));
        }
        let title = ensure_title(&command.title)?;

        let site = self
            .deadline
            .run("site.find", self.sites.find_site(command.site_id))
            .await?
            .ok_or(AppError::not_found("site"))?;

        let status = policy::default_status_for(actor);
        if status == ContentStatus::Published && !site.is_active() {
            return Err(AppError::precondition(
                "content cannot be published on an inactive site",
            ));
        }

        let slug = match command.slug {
            Some(slug) => {
                validate_slug(&slug)?;
                if self.slug_taken(site.id, &slug, None).await? {
                    return Err(AppError::Conflict(format!("slug `{slug}` is already in use")));
                }
                slug
            }
            None => {
                let base = derive_slug(&title)?;
                let reader = self.reader.clone();
                let deadline = self.deadline;
                let site_id = site.id;
                unique_slug(&base, move |candidate| {
                    let reader = reader.clone();
                    async move {
                        deadline
                            .run(
                                "content.find_by_slug",
                                reader.find_content_by_slug(site_id, &candidate),
                            )
                            .await
                            .map(|existing| existing.is_none())
                    }
                })
                .await?
            }
        };

        let now = self.clock.now();
        let params = CreateContentParams {
            site_id: site.id,
            author_id: actor.id,
            kind: command.kind,
            slug,
            title,
            status,
            comments_allowed: command.comments_allowed,
            published_at: (status == ContentStatus::Published).then_some(now),
            now,
        };
        let content = self
            .deadline
            .run("content.create", self.writer.create_content(params))
            .await?;

        info!(
            target = "application::content::create_content",
            content_id = %content.id,
            site_id = %content.site_id,
            status = %content.status,
            "content created"
        );
        Ok(content)
    }

    pub async fn update_content(
        &self,
        actor: &Actor,
        command: UpdateContentCommand,
    ) -> Result<ContentRecord, AppError> {
        require_authenticated(actor)?;
        let scoped = self.load(actor, command.id).await?;
        if !policy::can_edit_content(actor, &scoped.scope) {
            return Err(AppError::Forbidden("edit content"));
        }
        let current = scoped.content;

        let title = match command.title {
            Some(title) => ensure_title(&title)?,
            None => current.title.clone(),
        };
        let slug = match command.slug {
            Some(slug) if slug != current.slug => {
                validate_slug(&slug)?;
                if self.slug_taken(current.site_id, &slug, Some(current.id)).await? {
                    return Err(AppError::Conflict(format!("slug `{slug}` is already in use")));
                }
                slug
            }
            _ => current.slug.clone(),
        };

        let params = UpdateContentParams {
            id: current.id,
            slug,
            title,
            comments_allowed: command.comments_allowed.unwrap_or(current.comments_allowed),
            now: self.clock.now(),
        };
        let updated = self
            .deadline
            .run("content.update", self.writer.update_content(params))
            .await?;

        info!(
            target = "application::content::update_content",
            content_id = %updated.id,
            "content updated"
        );
        Ok(updated)
    }

    pub async fn publish(&self, actor: &Actor, id: Uuid) -> Result<ContentRecord, AppError> {
        self.transition(actor, id, Transition::Publish).await
    }

    pub async fn unpublish(&self, actor: &Actor, id: Uuid) -> Result<ContentRecord, AppError> {
        self.transition(actor, id, Transition::Unpublish).await
    }

    pub async fn suspend(&self, actor: &Actor, id: Uuid) -> Result<ContentRecord, AppError> {
        self.transition(actor, id, Transition::Suspend).await
    }

    pub async fn unsuspend(&self, actor: &Actor, id: Uuid) -> Result<ContentRecord, AppError> {
        self.transition(actor, id, Transition::Unsuspend).await
    }

    pub async fn archive(&self, actor: &Actor, id: Uuid) -> Result<ContentRecord, AppError> {
        self.transition(actor, id, Transition::Archive).await
    }

    pub async fn transition(
        &self,
        actor: &Actor,
        id: Uuid,
        transition: Transition,
    ) -> Result<ContentRecord, AppError> {
        let scoped = self.load(actor, id).await?;
        require_authenticated(actor)?;
        if !lifecycle::authorize(actor, transition, scoped.content.kind, &scoped.scope) {
            return Err(AppError::Forbidden(transition.as_str()));
        }

        let change = lifecycle::plan(&scoped.content, transition, self.clock.now())?;
        if change.status == ContentStatus::Published && !scoped.site_is_active() {
            return Err(AppError::precondition(
                "content cannot be published on an inactive site",
            ));
        }

        let updated = self.apply(&scoped.content, change).await?;
        counter!("pressroom_content_transition_total", "transition" => transition.as_str())
            .increment(1);
        info!(
            target = "application::content::transition",
            content_id = %updated.id,
            transition = transition.as_str(),
            from = %change.from,
            to = %updated.status,
            "content status changed"
        );
        Ok(updated)
    }

    /// Queue a draft for publication at `at`; the publish capability is
    /// checked now, not when the schedule fires.
    pub async fn schedule(
        &self,
        actor: &Actor,
        id: Uuid,
        at: OffsetDateTime,
    ) -> Result<ContentRecord, AppError> {
        let scoped = self.load(actor, id).await?;
        require_authenticated(actor)?;
        if !policy::can_publish(actor) {
            return Err(AppError::Forbidden("schedule publication"));
        }
        let change = lifecycle::plan_schedule(&scoped.content, at, self.clock.now())?;
        let updated = self.apply(&scoped.content, change).await?;

        info!(
            target = "application::content::schedule",
            content_id = %updated.id,
            scheduled_at = %at,
            "content scheduled"
        );
        Ok(updated)
    }

    /// Promote every due scheduled draft whose site is active.
    pub async fn publish_due(&self, limit: u32) -> Result<PublishDueReport, AppError> {
        let now = self.clock.now();
        let due = self
            .deadline
            .run("content.list_due", self.reader.list_due_scheduled(now, limit))
            .await?;

        let mut report = PublishDueReport::default();
        for content in due {
            match self.publish_scheduled(&content, now).await {
                Ok(published) => {
                    counter!("pressroom_content_transition_total", "transition" => "scheduled_publish")
                        .increment(1);
                    report.published.push(published.id);
                }
                Err(err) => {
                    warn!(
                        target = "application::content::publish_due",
                        content_id = %content.id,
                        error = %err,
                        "scheduled publication skipped"
                    );
                    report.skipped.push(content.id);
                }
            }
        }

        info!(
            target = "application::content::publish_due",
            published = report.published.len(),
            skipped = report.skipped.len(),
            "scheduled publication pass finished"
        );
        Ok(report)
    }

    pub async fn delete_content(&self, actor: &Actor, id: Uuid) -> Result<(), AppError> {
        let scoped = self.load(actor, id).await?;
        require_authenticated(actor)?;
        if !can_delete(actor, &scoped) {
            return Err(AppError::Forbidden("delete content"));
        }

        self.deadline
            .run("content.delete", self.writer.delete_content(id))
            .await?;
        info!(
            target = "application::content::delete_content",
            content_id = %id,
            kind = ?scoped.content.kind,
            "content deleted"
        );
        Ok(())
    }

    async fn publish_scheduled(
        &self,
        content: &ContentRecord,
        now: OffsetDateTime,
    ) -> Result<ContentRecord, AppError> {
        let site = self
            .deadline
            .run("site.find", self.sites.find_site(content.site_id))
            .await?;
        if !site.as_ref().is_some_and(|site| site.is_active()) {
            return Err(AppError::precondition("site is not active"));
        }
        let change = lifecycle::plan(content, Transition::Publish, now)?;
        self.apply(content, change).await
    }

    async fn apply(
        &self,
        content: &ContentRecord,
        change: StatusChange,
    ) -> Result<ContentRecord, AppError> {
        let params = UpdateContentStatusParams {
            id: content.id,
            expected_status: change.from,
            status: change.status,
            published_at: change.published_at,
            scheduled_at: change.scheduled_at,
            archived_at: change.archived_at,
            now: self.clock.now(),
        };
        self.deadline
            .run("content.update_status", self.writer.update_content_status(params))
            .await
            .map_err(AppError::from)
    }

    async fn slug_taken(
        &self,
        site_id: Uuid,
        slug: &str,
        except: Option<Uuid>,
    ) -> Result<bool, RepoError> {
        let existing = self
            .deadline
            .run(
                "content.find_by_slug",
                self.reader.find_content_by_slug(site_id, slug),
            )
            .await?;
        Ok(existing.is_some_and(|found| Some(found.id) != except))
    }
}

fn can_delete(actor: &Actor, scoped: &ScopedContent) -> bool {
    match scoped.content.kind {
        ContentKind::Recipe => policy::can_delete_recipe(actor),
        ContentKind::BlogPost => policy::can_delete_site_content(actor, &scoped.scope),
    }
}
