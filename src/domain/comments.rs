//! Comment submission rules and thread assembly.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use super::entities::CommentRecord;
use super::error::DomainError;

pub const MAX_NAME_LEN: usize = 80;
pub const MAX_BODY_LEN: usize = 4000;
pub const MAX_EMAIL_LEN: usize = 254;

/// A top-level comment and its direct replies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentThread {
    pub comment: CommentRecord,
    pub replies: Vec<CommentRecord>,
}

/// Trimmed, validated submission fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentDraft {
    pub name: String,
    pub email: Option<String>,
    pub content: String,
}

pub fn validate_submission(
    name: &str,
    email: Option<&str>,
    content: &str,
) -> Result<CommentDraft, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("comment name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation(format!(
            "comment name exceeds {MAX_NAME_LEN} characters"
        )));
    }

    let content = content.trim();
    if content.is_empty() {
        return Err(DomainError::validation("comment body must not be empty"));
    }
    if content.chars().count() > MAX_BODY_LEN {
        return Err(DomainError::validation(format!(
            "comment body exceeds {MAX_BODY_LEN} characters"
        )));
    }

    let email = match email.map(str::trim).filter(|value| !value.is_empty()) {
        None => None,
        Some(value) if looks_like_email(value) => Some(value.to_string()),
        Some(value) => {
            return Err(DomainError::validation(format!(
                "`{value}` is not a valid email address"
            )));
        }
    };

    Ok(CommentDraft {
        name: name.to_string(),
        email,
        content: content.to_string(),
    })
}

fn looks_like_email(value: &str) -> bool {
    if value.len() > MAX_EMAIL_LEN || value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

/// Group a flat comment list into threads.
///
/// Top-level comments come newest first, replies oldest first. Replies whose
/// parent is not in `comments` are dropped.
pub fn build_threads(comments: Vec<CommentRecord>) -> Vec<CommentThread> {
    let mut roots = Vec::new();
    let mut replies: HashMap<Uuid, Vec<CommentRecord>> = HashMap::new();

    for comment in comments {
        match comment.parent_id {
            Some(parent) => replies.entry(parent).or_default().push(comment),
            None => roots.push(comment),
        }
    }

    roots.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

    roots
        .into_iter()
        .map(|comment| {
            let mut children = replies.remove(&comment.id).unwrap_or_default();
            children.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            CommentThread {
                comment,
                replies: children,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime};

    use super::*;

    fn comment(id: u128, parent: Option<u128>, minute: i64) -> CommentRecord {
        CommentRecord {
            id: Uuid::from_u128(id),
            content_id: Uuid::from_u128(100),
            visitor_id: Uuid::from_u128(200),
            name: "Ana".into(),
            email: None,
            content: "Lovely".into(),
            parent_id: parent.map(Uuid::from_u128),
            approved: true,
            created_at: OffsetDateTime::UNIX_EPOCH + Duration::minutes(minute),
        }
    }

    #[test]
    fn threads_order_roots_newest_first_and_replies_oldest_first() {
        let threads = build_threads(vec![
            comment(1, None, 1),
            comment(2, None, 5),
            comment(3, Some(1), 9),
            comment(4, Some(1), 3),
        ]);
        let roots: Vec<_> = threads.iter().map(|t| t.comment.id.as_u128()).collect();
        assert_eq!(roots, [2, 1]);
        let replies: Vec<_> = threads[1].replies.iter().map(|c| c.id.as_u128()).collect();
        assert_eq!(replies, [4, 3]);
    }

    #[test]
    fn orphaned_replies_are_dropped() {
        let threads = build_threads(vec![comment(1, None, 1), comment(5, Some(99), 2)]);
        assert_eq!(threads.len(), 1);
        assert!(threads[0].replies.is_empty());
    }

    #[test]
    fn submission_is_trimmed() {
        let draft = validate_submission("  Ana ", Some(" "), " Great ").unwrap();
        assert_eq!(draft.name, "Ana");
        assert_eq!(draft.email, None);
        assert_eq!(draft.content, "Great");
    }

    #[test]
    fn submission_rejects_bad_fields() {
        assert!(validate_submission("", None, "hi").is_err());
        assert!(validate_submission("Ana", None, "   ").is_err());
        assert!(validate_submission("Ana", Some("not-an-email"), "hi").is_err());
        assert!(validate_submission("Ana", Some("a@b"), "hi").is_err());
        assert!(validate_submission(&"x".repeat(MAX_NAME_LEN + 1), None, "hi").is_err());
        assert!(validate_submission("Ana", Some("ana@example.com"), "hi").is_ok());
    }
}
