//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{
    ContentKind, ContentStatus, InteractionType, SiteStatus, ViewPhase,
};

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SiteRecord {
    pub id: Uuid,
    pub slug: String,
    pub owner_id: Uuid,
    pub status: SiteStatus,
    pub created_at: OffsetDateTime,
}

impl SiteRecord {
    pub fn is_active(&self) -> bool {
        self.status == SiteStatus::Active
    }
}

/// A recipe or blog post. Both kinds share the same lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ContentRecord {
    pub id: Uuid,
    pub site_id: Uuid,
    pub author_id: Uuid,
    pub kind: ContentKind,
    pub slug: String,
    pub title: String,
    pub status: ContentStatus,
    pub comments_allowed: bool,
    pub published_at: Option<OffsetDateTime>,
    pub scheduled_at: Option<OffsetDateTime>,
    pub archived_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct InteractionRecord {
    pub id: Uuid,
    pub visitor_id: Uuid,
    pub content_id: Uuid,
    pub interaction_type: InteractionType,
    pub value: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct CommentRecord {
    pub id: Uuid,
    pub content_id: Uuid,
    pub visitor_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub content: String,
    pub parent_id: Option<Uuid>,
    pub approved: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ViewRecord {
    pub id: Uuid,
    pub content_id: Uuid,
    pub visitor_id: Uuid,
    pub phase: ViewPhase,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub country: String,
    pub city: String,
    pub region: String,
    /// Seconds on page.
    pub time_spent: i32,
    /// Percentage, 0-100.
    pub scroll_depth: i16,
    pub bounced: bool,
    pub referrer: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Process-wide aggregate keyed by visitor. Counters only ever grow.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct VisitorSessionRecord {
    pub visitor_id: Uuid,
    pub device: String,
    pub browser: String,
    pub os: String,
    pub country: String,
    pub city: String,
    pub region: String,
    pub page_views: i64,
    pub total_time: i64,
    pub first_seen: OffsetDateTime,
    pub last_seen: OffsetDateTime,
}
