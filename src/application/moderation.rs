//! Comment submission, threaded listing and approval.

use std::sync::Arc;

use metrics::counter;
use tracing::info;
use uuid::Uuid;

use crate::application::clock::Clock;
use crate::application::error::AppError;
use crate::application::repos::{CommentsRepo, ContentRepo, CreateCommentParams, SitesRepo};
use crate::application::storage::StorageDeadline;
use crate::application::visibility::{load_visible, require_authenticated};
use crate::domain::actor::Actor;
use crate::domain::comments::{CommentThread, build_threads, validate_submission};
use crate::domain::entities::CommentRecord;
use crate::domain::policy;
use crate::domain::types::ContentStatus;

#[derive(Debug, Clone)]
pub struct SubmitCommentCommand {
    pub content_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub content: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct ModerationService {
    sites: Arc<dyn SitesRepo>,
    content: Arc<dyn ContentRepo>,
    comments: Arc<dyn CommentsRepo>,
    clock: Arc<dyn Clock>,
    deadline: StorageDeadline,
}

impl ModerationService {
    pub fn new(
        sites: Arc<dyn SitesRepo>,
        content: Arc<dyn ContentRepo>,
        comments: Arc<dyn CommentsRepo>,
        clock: Arc<dyn Clock>,
        deadline: StorageDeadline,
    ) -> Self {
        Self {
            sites,
            content,
            comments,
            clock,
            deadline,
        }
    }

    pub async fn submit_comment(
        &self,
        actor: &Actor,
        command: SubmitCommentCommand,
    ) -> Result<CommentRecord, AppError> {
        require_authenticated(actor)?;
        if !policy::can_comment(actor) {
            return Err(AppError::Forbidden("comment"));
        }

        let scoped = load_visible(
            self.content.as_ref(),
            self.sites.as_ref(),
            &self.deadline,
            actor,
            command.content_id,
        )
        .await?;
        if scoped.content.status != ContentStatus::Published {
            return Err(AppError::not_found("content"));
        }
        if !scoped.content.comments_allowed {
            return Err(AppError::Forbidden("comments are disabled"));
        }

        let draft = validate_submission(&command.name, command.email.as_deref(), &command.content)?;

        if let Some(parent_id) = command.parent_id {
            let parent = self
                .deadline
                .run("comments.find", self.comments.find_comment(parent_id))
                .await?;
            match parent {
                Some(parent) if parent.content_id != command.content_id => {
                    return Err(AppError::invalid(
                        "parent comment belongs to different content",
                    ));
                }
                Some(parent) if parent.parent_id.is_some() => {
                    return Err(AppError::invalid("replies cannot be nested"));
                }
                Some(_) => {}
                None => return Err(AppError::invalid("parent comment does not exist")),
            }
        }

        let approved = policy::can_auto_approve(actor);
        let params = CreateCommentParams {
            content_id: command.content_id,
            visitor_id: actor.id,
            name: draft.name,
            email: draft.email,
            content: draft.content,
            parent_id: command.parent_id,
            approved,
            now: self.clock.now(),
        };
        let comment = self
            .deadline
            .run("comments.create", self.comments.create_comment(params))
            .await?;

        counter!(
            "pressroom_comment_submitted_total",
            "approved" => if approved { "true" } else { "false" }
        )
        .increment(1);
        info!(
            target = "application::moderation::submit_comment",
            comment_id = %comment.id,
            content_id = %comment.content_id,
            reply = comment.parent_id.is_some(),
            approved,
            "comment submitted"
        );
        Ok(comment)
    }

    /// Threads for one content item. Pending comments are included only when
    /// asked for and the actor moderates.
    pub async fn list_comments(
        &self,
        actor: &Actor,
        content_id: Uuid,
        include_unapproved: bool,
    ) -> Result<Vec<CommentThread>, AppError> {
        load_visible(
            self.content.as_ref(),
            self.sites.as_ref(),
            &self.deadline,
            actor,
            content_id,
        )
        .await?;

        let approved_only = !(include_unapproved && policy::can_moderate_comments(actor));
        let comments = self
            .deadline
            .run(
                "comments.list",
                self.comments.list_comments(content_id, approved_only),
            )
            .await?;
        Ok(build_threads(comments))
    }

    /// Idempotent: approving an approved comment returns it unchanged.
    pub async fn approve(&self, actor: &Actor, comment_id: Uuid) -> Result<CommentRecord, AppError> {
        let comment = self.moderated_comment(actor, comment_id).await?;
        if comment.approved {
            return Ok(comment);
        }

        let approved = self
            .deadline
            .run("comments.approve", self.comments.approve_comment(comment_id))
            .await?;
        counter!("pressroom_comment_approved_total").increment(1);
        info!(
            target = "application::moderation::approve",
            comment_id = %approved.id,
            moderator = %actor.id,
            "comment approved"
        );
        Ok(approved)
    }

    pub async fn delete_comment(&self, actor: &Actor, comment_id: Uuid) -> Result<(), AppError> {
        self.moderated_comment(actor, comment_id).await?;
        let removed = self
            .deadline
            .run("comments.delete", self.comments.delete_comment(comment_id))
            .await?;
        info!(
            target = "application::moderation::delete_comment",
            %comment_id,
            removed,
            moderator = %actor.id,
            "comment deleted"
        );
        Ok(())
    }

    async fn moderated_comment(
        &self,
        actor: &Actor,
        comment_id: Uuid,
    ) -> Result<CommentRecord, AppError> {
        require_authenticated(actor)?;
        if !policy::can_moderate_comments(actor) {
            return Err(AppError::Forbidden("moderate comments"));
        }
        let comment = self
            .deadline
            .run("comments.find", self.comments.find_comment(comment_id))
            .await?
            .ok_or(AppError::not_found("comment"))?;
        load_visible(
            self.content.as_ref(),
            self.sites.as_ref(),
            &self.deadline,
            actor,
            comment.content_id,
        )
        .await?;
        Ok(comment)
    }
}
