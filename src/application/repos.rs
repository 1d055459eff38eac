//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::analytics::ViewTotals;
use crate::domain::entities::{
    CommentRecord, ContentRecord, InteractionRecord, SiteRecord, ViewRecord, VisitorSessionRecord,
};
use crate::domain::types::{ContentKind, ContentStatus, InteractionType, ViewPhase};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("{entity} changed since it was read")]
    Stale { entity: &'static str },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateContentParams {
    pub site_id: Uuid,
    pub author_id: Uuid,
    pub kind: ContentKind,
    pub slug: String,
    pub title: String,
    pub status: ContentStatus,
    pub comments_allowed: bool,
    pub published_at: Option<OffsetDateTime>,
    pub now: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct UpdateContentParams {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub comments_allowed: bool,
    pub now: OffsetDateTime,
}

/// Compare-and-set status write: fails with [`RepoError::Stale`] when the
/// stored status no longer equals `expected_status`.
#[derive(Debug, Clone)]
pub struct UpdateContentStatusParams {
    pub id: Uuid,
    pub expected_status: ContentStatus,
    pub status: ContentStatus,
    pub published_at: Option<OffsetDateTime>,
    pub scheduled_at: Option<OffsetDateTime>,
    pub archived_at: Option<OffsetDateTime>,
    pub now: OffsetDateTime,
}

/// Key of the at-most-one interaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InteractionKey {
    pub visitor_id: Uuid,
    pub content_id: Uuid,
    pub interaction_type: InteractionType,
}

#[derive(Debug, Clone)]
pub struct ToggleInteractionParams {
    pub key: InteractionKey,
    /// Type removed for the same visitor and content before toggling.
    pub exclusive_with: Option<InteractionType>,
    pub value: Option<String>,
    pub now: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    Added(InteractionRecord),
    Removed,
}

#[derive(Debug, Clone)]
pub struct UpsertInteractionParams {
    pub key: InteractionKey,
    pub value: Option<String>,
    pub now: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub content_id: Uuid,
    pub visitor_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub content: String,
    pub parent_id: Option<Uuid>,
    pub approved: bool,
    pub now: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct CreateViewParams {
    pub content_id: Uuid,
    pub visitor_id: Uuid,
    pub phase: ViewPhase,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub country: String,
    pub city: String,
    pub region: String,
    pub time_spent: i32,
    pub scroll_depth: i16,
    pub bounced: bool,
    pub referrer: Option<String>,
    pub now: OffsetDateTime,
}

/// Create-or-increment: a new session starts at one page view, an existing one
/// gains one page view and `elapsed_secs` of total time.
#[derive(Debug, Clone)]
pub struct UpsertSessionParams {
    pub visitor_id: Uuid,
    pub device: String,
    pub browser: String,
    pub os: String,
    pub country: String,
    pub city: String,
    pub region: String,
    pub elapsed_secs: i64,
    pub now: OffsetDateTime,
}

#[async_trait]
pub trait SitesRepo: Send + Sync {
    async fn find_site(&self, id: Uuid) -> Result<Option<SiteRecord>, RepoError>;
}

#[async_trait]
pub trait ContentRepo: Send + Sync {
    async fn find_content(&self, id: Uuid) -> Result<Option<ContentRecord>, RepoError>;

    async fn find_content_by_slug(
        &self,
        site_id: Uuid,
        slug: &str,
    ) -> Result<Option<ContentRecord>, RepoError>;

    /// Drafts whose `scheduled_at` is at or before `now`, oldest first.
    async fn list_due_scheduled(
        &self,
        now: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<ContentRecord>, RepoError>;
}

#[async_trait]
pub trait ContentWriteRepo: Send + Sync {
    async fn create_content(&self, params: CreateContentParams)
    -> Result<ContentRecord, RepoError>;

    async fn update_content(&self, params: UpdateContentParams)
    -> Result<ContentRecord, RepoError>;

    async fn update_content_status(
        &self,
        params: UpdateContentStatusParams,
    ) -> Result<ContentRecord, RepoError>;

    async fn delete_content(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait InteractionsRepo: Send + Sync {
    /// Atomically remove `exclusive_with`, then remove the keyed record if it
    /// exists or insert it otherwise.
    async fn toggle_interaction(
        &self,
        params: ToggleInteractionParams,
    ) -> Result<ToggleOutcome, RepoError>;

    async fn upsert_interaction(
        &self,
        params: UpsertInteractionParams,
    ) -> Result<InteractionRecord, RepoError>;

    /// Per-type record counts. Types with no records may be omitted.
    async fn count_by_type(
        &self,
        content_id: Uuid,
    ) -> Result<Vec<(InteractionType, u64)>, RepoError>;

    async fn list_for_visitor(
        &self,
        visitor_id: Uuid,
        content_id: Uuid,
    ) -> Result<Vec<InteractionRecord>, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn find_comment(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError>;

    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;

    async fn list_comments(
        &self,
        content_id: Uuid,
        approved_only: bool,
    ) -> Result<Vec<CommentRecord>, RepoError>;

    async fn approve_comment(&self, id: Uuid) -> Result<CommentRecord, RepoError>;

    /// Removes the comment and its replies, returning how many rows went away.
    async fn delete_comment(&self, id: Uuid) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait AnalyticsRepo: Send + Sync {
    async fn insert_view(&self, params: CreateViewParams) -> Result<ViewRecord, RepoError>;

    async fn upsert_session(
        &self,
        params: UpsertSessionParams,
    ) -> Result<VisitorSessionRecord, RepoError>;

    /// Sums over the views of `content_id` created at or after `since`. A
    /// visitor's page-load rows are superseded by their session-end rows.
    async fn view_totals(
        &self,
        content_id: Uuid,
        since: OffsetDateTime,
    ) -> Result<ViewTotals, RepoError>;
}
