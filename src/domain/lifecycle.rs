//! Content status state machine and publish-timestamp rules.
//!
//! ```text
//! DRAFT --publish--> PUBLISHED --suspend--> SUSPENDED
//!   ^                  |    ^                   |
//!   +----unpublish-----+    +----unsuspend------+
//!
//! DRAFT | PUBLISHED | SUSPENDED --archive--> ARCHIVED
//! ```
//!
//! `published_at` is set on entering PUBLISHED when it is not already set,
//! cleared on PUBLISHED -> DRAFT, and left alone by suspension in either
//! direction. ARCHIVED has no outgoing transitions.

use serde::Serialize;
use time::OffsetDateTime;

use super::actor::Actor;
use super::entities::ContentRecord;
use super::error::DomainError;
use super::policy::{self, ContentScope};
use super::types::{ContentKind, ContentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Publish,
    Unpublish,
    Suspend,
    Unsuspend,
    Archive,
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Unpublish => "unpublish",
            Self::Suspend => "suspend",
            Self::Unsuspend => "unsuspend",
            Self::Archive => "archive",
        }
    }

    pub fn target(self) -> ContentStatus {
        match self {
            Self::Publish | Self::Unsuspend => ContentStatus::Published,
            Self::Unpublish => ContentStatus::Draft,
            Self::Suspend => ContentStatus::Suspended,
            Self::Archive => ContentStatus::Archived,
        }
    }

    fn allowed_from(self, from: ContentStatus) -> bool {
        matches!(
            (self, from),
            (Self::Publish, ContentStatus::Draft)
                | (Self::Unpublish, ContentStatus::Published)
                | (Self::Suspend, ContentStatus::Published)
                | (Self::Unsuspend, ContentStatus::Suspended)
                | (
                    Self::Archive,
                    ContentStatus::Draft | ContentStatus::Published | ContentStatus::Suspended
                )
        )
    }
}

/// Timestamps and status to persist after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: ContentStatus,
    pub status: ContentStatus,
    pub published_at: Option<OffsetDateTime>,
    pub scheduled_at: Option<OffsetDateTime>,
    pub archived_at: Option<OffsetDateTime>,
}

/// Whether `actor` holds the capability a transition requires.
pub fn authorize(
    actor: &Actor,
    transition: Transition,
    kind: ContentKind,
    scope: &ContentScope,
) -> bool {
    match transition {
        Transition::Publish => policy::can_publish(actor),
        Transition::Unpublish => policy::can_edit_content(actor, scope),
        Transition::Suspend => policy::can_suspend(actor),
        Transition::Unsuspend => policy::can_unsuspend(actor),
        Transition::Archive => match kind {
            ContentKind::Recipe => policy::can_delete_recipe(actor),
            ContentKind::BlogPost => policy::can_delete_site_content(actor, scope),
        },
    }
}

/// Compute the state after applying `transition` to `content` at `now`.
pub fn plan(
    content: &ContentRecord,
    transition: Transition,
    now: OffsetDateTime,
) -> Result<StatusChange, DomainError> {
    let from = content.status;
    let to = transition.target();
    if !transition.allowed_from(from) {
        return Err(DomainError::InvalidTransition { from, to });
    }

    let change = match transition {
        Transition::Publish => StatusChange {
            from,
            status: to,
            published_at: Some(content.published_at.unwrap_or(now)),
            scheduled_at: None,
            archived_at: None,
        },
        Transition::Unpublish => StatusChange {
            from,
            status: to,
            published_at: None,
            scheduled_at: None,
            archived_at: None,
        },
        Transition::Suspend | Transition::Unsuspend => StatusChange {
            from,
            status: to,
            published_at: content.published_at,
            scheduled_at: content.scheduled_at,
            archived_at: None,
        },
        Transition::Archive => StatusChange {
            from,
            status: to,
            published_at: content.published_at,
            scheduled_at: None,
            archived_at: Some(now),
        },
    };
    Ok(change)
}

/// Validate a requested publication time for a draft.
pub fn plan_schedule(
    content: &ContentRecord,
    at: OffsetDateTime,
    now: OffsetDateTime,
) -> Result<StatusChange, DomainError> {
    if content.status != ContentStatus::Draft {
        return Err(DomainError::InvalidTransition {
            from: content.status,
            to: ContentStatus::Published,
        });
    }
    if at <= now {
        return Err(DomainError::validation(
            "scheduled publication time must be in the future",
        ));
    }
    Ok(StatusChange {
        from: content.status,
        status: ContentStatus::Draft,
        published_at: content.published_at,
        scheduled_at: Some(at),
        archived_at: None,
    })
}

#[cfg(test)]
mod tests {
    use time::Duration;
    use uuid::Uuid;

    use super::*;

    fn content(status: ContentStatus, published_at: Option<OffsetDateTime>) -> ContentRecord {
        let now = OffsetDateTime::UNIX_EPOCH;
        ContentRecord {
            id: Uuid::from_u128(1),
            site_id: Uuid::from_u128(2),
            author_id: Uuid::from_u128(3),
            kind: ContentKind::Recipe,
            slug: "bread".into(),
            title: "Bread".into(),
            status,
            comments_allowed: true,
            published_at,
            scheduled_at: None,
            archived_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn at(seconds: i64) -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH + Duration::seconds(seconds)
    }

    #[test]
    fn publish_sets_timestamp_when_unset() {
        let change = plan(&content(ContentStatus::Draft, None), Transition::Publish, at(10))
            .expect("publish draft");
        assert_eq!(change.status, ContentStatus::Published);
        assert_eq!(change.published_at, Some(at(10)));
    }

    #[test]
    fn publish_preserves_existing_timestamp() {
        let draft = content(ContentStatus::Draft, Some(at(5)));
        let change = plan(&draft, Transition::Publish, at(10)).expect("publish draft");
        assert_eq!(change.published_at, Some(at(5)));
    }

    #[test]
    fn unpublish_clears_timestamp() {
        let published = content(ContentStatus::Published, Some(at(5)));
        let change = plan(&published, Transition::Unpublish, at(10)).expect("unpublish");
        assert_eq!(change.status, ContentStatus::Draft);
        assert_eq!(change.published_at, None);
    }

    #[test]
    fn suspension_round_trip_keeps_timestamp() {
        let published = content(ContentStatus::Published, Some(at(5)));
        let suspended = plan(&published, Transition::Suspend, at(10)).expect("suspend");
        assert_eq!(suspended.published_at, Some(at(5)));

        let mut record = published.clone();
        record.status = suspended.status;
        let restored = plan(&record, Transition::Unsuspend, at(20)).expect("unsuspend");
        assert_eq!(restored.status, ContentStatus::Published);
        assert_eq!(restored.published_at, Some(at(5)));
    }

    #[test]
    fn archived_is_terminal() {
        let archived = content(ContentStatus::Archived, Some(at(5)));
        for transition in [
            Transition::Publish,
            Transition::Unpublish,
            Transition::Suspend,
            Transition::Unsuspend,
            Transition::Archive,
        ] {
            let err = plan(&archived, transition, at(10)).unwrap_err();
            assert!(matches!(err, DomainError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn draft_cannot_be_suspended() {
        let err = plan(&content(ContentStatus::Draft, None), Transition::Suspend, at(1))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: ContentStatus::Draft,
                to: ContentStatus::Suspended
            }
        );
    }

    #[test]
    fn archive_records_when() {
        let change = plan(
            &content(ContentStatus::Published, Some(at(1))),
            Transition::Archive,
            at(9),
        )
        .expect("archive");
        assert_eq!(change.archived_at, Some(at(9)));
        assert_eq!(change.published_at, Some(at(1)));
    }

    #[test]
    fn schedule_requires_future_time_on_draft() {
        let draft = content(ContentStatus::Draft, None);
        assert!(plan_schedule(&draft, at(5), at(10)).is_err());
        let change = plan_schedule(&draft, at(50), at(10)).expect("schedule");
        assert_eq!(change.scheduled_at, Some(at(50)));

        let published = content(ContentStatus::Published, Some(at(1)));
        assert!(plan_schedule(&published, at(50), at(10)).is_err());
    }
}
