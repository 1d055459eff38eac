//! In-process implementation of every repository trait.
//!
//! Content, interactions and comments live behind one mutex, so every trait
//! method is atomic with respect to the others. Visitor sessions sit in a
//! `DashMap` and rely on its per-entry locking for create-or-increment.

mod lock;

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    AnalyticsRepo, CommentsRepo, ContentRepo, ContentWriteRepo, CreateCommentParams,
    CreateContentParams, CreateViewParams, InteractionKey, InteractionsRepo, RepoError, SitesRepo,
    ToggleInteractionParams, ToggleOutcome, UpdateContentParams, UpdateContentStatusParams,
    UpsertInteractionParams, UpsertSessionParams,
};
use crate::domain::analytics::ViewTotals;
use crate::domain::entities::{
    CommentRecord, ContentRecord, InteractionRecord, SiteRecord, ViewRecord, VisitorSessionRecord,
};
use crate::domain::types::{ContentStatus, InteractionType, SiteStatus, ViewPhase};

use lock::mutex_lock;

const SOURCE: &str = "infra::memory";
const CONTENT_SLUG_CONSTRAINT: &str = "content_site_id_slug_key";

#[derive(Default)]
struct State {
    sites: HashMap<Uuid, SiteRecord>,
    content: HashMap<Uuid, ContentRecord>,
    interactions: HashMap<InteractionKey, InteractionRecord>,
    comments: HashMap<Uuid, CommentRecord>,
    views: Vec<ViewRecord>,
}

impl State {
    fn slug_in_use(&self, site_id: Uuid, slug: &str, except: Option<Uuid>) -> bool {
        self.content
            .values()
            .any(|item| item.site_id == site_id && item.slug == slug && Some(item.id) != except)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    sessions: DashMap<Uuid, VisitorSessionRecord>,
    fail_analytics: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_site(&self, site: SiteRecord) {
        mutex_lock(&self.state, SOURCE, "insert_site")
            .sites
            .insert(site.id, site);
    }

    /// Seed a site owned by `owner_id` and return it.
    pub fn add_site(&self, owner_id: Uuid, slug: &str, status: SiteStatus) -> SiteRecord {
        let site = SiteRecord {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            owner_id,
            status,
            created_at: OffsetDateTime::now_utc(),
        };
        self.insert_site(site.clone());
        site
    }

    pub fn set_site_status(&self, site_id: Uuid, status: SiteStatus) {
        if let Some(site) = mutex_lock(&self.state, SOURCE, "set_site_status")
            .sites
            .get_mut(&site_id)
        {
            site.status = status;
        }
    }

    /// Make every analytics write fail until switched off again.
    pub fn fail_analytics_writes(&self, fail: bool) {
        self.fail_analytics.store(fail, Ordering::SeqCst);
    }

    pub fn views(&self) -> Vec<ViewRecord> {
        mutex_lock(&self.state, SOURCE, "views").views.clone()
    }

    pub fn session(&self, visitor_id: Uuid) -> Option<VisitorSessionRecord> {
        self.sessions.get(&visitor_id).map(|entry| entry.value().clone())
    }

    pub fn comment_count(&self) -> usize {
        mutex_lock(&self.state, SOURCE, "comment_count")
            .comments
            .len()
    }

    pub fn interactions_for(&self, content_id: Uuid) -> Vec<InteractionRecord> {
        mutex_lock(&self.state, SOURCE, "interactions_for")
            .interactions
            .values()
            .filter(|record| record.content_id == content_id)
            .cloned()
            .collect()
    }

    fn check_analytics(&self) -> Result<(), RepoError> {
        if self.fail_analytics.load(Ordering::SeqCst) {
            Err(RepoError::from_persistence("analytics storage offline"))
        } else {
            Ok(())
        }
    }
}

fn new_interaction(key: InteractionKey, value: Option<String>, now: OffsetDateTime) -> InteractionRecord {
    InteractionRecord {
        id: Uuid::new_v4(),
        visitor_id: key.visitor_id,
        content_id: key.content_id,
        interaction_type: key.interaction_type,
        value,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl SitesRepo for MemoryStore {
    async fn find_site(&self, id: Uuid) -> Result<Option<SiteRecord>, RepoError> {
        Ok(mutex_lock(&self.state, SOURCE, "find_site")
            .sites
            .get(&id)
            .cloned())
    }
}

#[async_trait]
impl ContentRepo for MemoryStore {
    async fn find_content(&self, id: Uuid) -> Result<Option<ContentRecord>, RepoError> {
        Ok(mutex_lock(&self.state, SOURCE, "find_content")
            .content
            .get(&id)
            .cloned())
    }

    async fn find_content_by_slug(
        &self,
        site_id: Uuid,
        slug: &str,
    ) -> Result<Option<ContentRecord>, RepoError> {
        Ok(mutex_lock(&self.state, SOURCE, "find_content_by_slug")
            .content
            .values()
            .find(|item| item.site_id == site_id && item.slug == slug)
            .cloned())
    }

    async fn list_due_scheduled(
        &self,
        now: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<ContentRecord>, RepoError> {
        let state = mutex_lock(&self.state, SOURCE, "list_due_scheduled");
        let mut due: Vec<ContentRecord> = state
            .content
            .values()
            .filter(|item| {
                item.status == ContentStatus::Draft
                    && item.scheduled_at.is_some_and(|at| at <= now)
            })
            .cloned()
            .collect();
        due.sort_by_key(|item| (item.scheduled_at, item.id));
        due.truncate(limit as usize);
        Ok(due)
    }
}

#[async_trait]
impl ContentWriteRepo for MemoryStore {
    async fn create_content(
        &self,
        params: CreateContentParams,
    ) -> Result<ContentRecord, RepoError> {
        let mut state = mutex_lock(&self.state, SOURCE, "create_content");
        if !state.sites.contains_key(&params.site_id) {
            return Err(RepoError::InvalidInput {
                message: format!("site {} does not exist", params.site_id),
            });
        }
        if state.slug_in_use(params.site_id, &params.slug, None) {
            return Err(RepoError::Duplicate {
                constraint: CONTENT_SLUG_CONSTRAINT.to_string(),
            });
        }

        let record = ContentRecord {
            id: Uuid::new_v4(),
            site_id: params.site_id,
            author_id: params.author_id,
            kind: params.kind,
            slug: params.slug,
            title: params.title,
            status: params.status,
            comments_allowed: params.comments_allowed,
            published_at: params.published_at,
            scheduled_at: None,
            archived_at: None,
            created_at: params.now,
            updated_at: params.now,
        };
        state.content.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_content(
        &self,
        params: UpdateContentParams,
    ) -> Result<ContentRecord, RepoError> {
        let mut state = mutex_lock(&self.state, SOURCE, "update_content");
        let site_id = state
            .content
            .get(&params.id)
            .map(|item| item.site_id)
            .ok_or(RepoError::NotFound)?;
        if state.slug_in_use(site_id, &params.slug, Some(params.id)) {
            return Err(RepoError::Duplicate {
                constraint: CONTENT_SLUG_CONSTRAINT.to_string(),
            });
        }

        let item = state
            .content
            .get_mut(&params.id)
            .ok_or(RepoError::NotFound)?;
        item.slug = params.slug;
        item.title = params.title;
        item.comments_allowed = params.comments_allowed;
        item.updated_at = params.now;
        Ok(item.clone())
    }

    async fn update_content_status(
        &self,
        params: UpdateContentStatusParams,
    ) -> Result<ContentRecord, RepoError> {
        let mut state = mutex_lock(&self.state, SOURCE, "update_content_status");
        let item = state
            .content
            .get_mut(&params.id)
            .ok_or(RepoError::NotFound)?;
        if item.status != params.expected_status {
            return Err(RepoError::Stale { entity: "content" });
        }
        item.status = params.status;
        item.published_at = params.published_at;
        item.scheduled_at = params.scheduled_at;
        item.archived_at = params.archived_at;
        item.updated_at = params.now;
        Ok(item.clone())
    }

    async fn delete_content(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = mutex_lock(&self.state, SOURCE, "delete_content");
        if state.content.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        state.interactions.retain(|key, _| key.content_id != id);
        state.comments.retain(|_, comment| comment.content_id != id);
        state.views.retain(|view| view.content_id != id);
        Ok(())
    }
}

#[async_trait]
impl InteractionsRepo for MemoryStore {
    async fn toggle_interaction(
        &self,
        params: ToggleInteractionParams,
    ) -> Result<ToggleOutcome, RepoError> {
        let mut state = mutex_lock(&self.state, SOURCE, "toggle_interaction");
        if let Some(other) = params.exclusive_with {
            let opposite = InteractionKey {
                interaction_type: other,
                ..params.key
            };
            state.interactions.remove(&opposite);
        }

        if state.interactions.remove(&params.key).is_some() {
            return Ok(ToggleOutcome::Removed);
        }
        let record = new_interaction(params.key, params.value, params.now);
        state.interactions.insert(params.key, record.clone());
        Ok(ToggleOutcome::Added(record))
    }

    async fn upsert_interaction(
        &self,
        params: UpsertInteractionParams,
    ) -> Result<InteractionRecord, RepoError> {
        let mut state = mutex_lock(&self.state, SOURCE, "upsert_interaction");
        let record = state
            .interactions
            .entry(params.key)
            .and_modify(|existing| {
                existing.value = params.value.clone();
                existing.updated_at = params.now;
            })
            .or_insert_with(|| new_interaction(params.key, params.value.clone(), params.now));
        Ok(record.clone())
    }

    async fn count_by_type(
        &self,
        content_id: Uuid,
    ) -> Result<Vec<(InteractionType, u64)>, RepoError> {
        let state = mutex_lock(&self.state, SOURCE, "count_by_type");
        let mut counts: HashMap<InteractionType, u64> = HashMap::new();
        for key in state.interactions.keys() {
            if key.content_id == content_id {
                *counts.entry(key.interaction_type).or_default() += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }

    async fn list_for_visitor(
        &self,
        visitor_id: Uuid,
        content_id: Uuid,
    ) -> Result<Vec<InteractionRecord>, RepoError> {
        let state = mutex_lock(&self.state, SOURCE, "list_for_visitor");
        Ok(state
            .interactions
            .values()
            .filter(|record| record.visitor_id == visitor_id && record.content_id == content_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn find_comment(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        Ok(mutex_lock(&self.state, SOURCE, "find_comment")
            .comments
            .get(&id)
            .cloned())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = mutex_lock(&self.state, SOURCE, "create_comment");
        if !state.content.contains_key(&params.content_id) {
            return Err(RepoError::InvalidInput {
                message: format!("content {} does not exist", params.content_id),
            });
        }
        if let Some(parent) = params.parent_id {
            if !state.comments.contains_key(&parent) {
                return Err(RepoError::InvalidInput {
                    message: format!("parent comment {parent} does not exist"),
                });
            }
        }

        let record = CommentRecord {
            id: Uuid::new_v4(),
            content_id: params.content_id,
            visitor_id: params.visitor_id,
            name: params.name,
            email: params.email,
            content: params.content,
            parent_id: params.parent_id,
            approved: params.approved,
            created_at: params.now,
        };
        state.comments.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_comments(
        &self,
        content_id: Uuid,
        approved_only: bool,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        let state = mutex_lock(&self.state, SOURCE, "list_comments");
        Ok(state
            .comments
            .values()
            .filter(|comment| comment.content_id == content_id)
            .filter(|comment| !approved_only || comment.approved)
            .cloned()
            .collect())
    }

    async fn approve_comment(&self, id: Uuid) -> Result<CommentRecord, RepoError> {
        let mut state = mutex_lock(&self.state, SOURCE, "approve_comment");
        let comment = state.comments.get_mut(&id).ok_or(RepoError::NotFound)?;
        comment.approved = true;
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: Uuid) -> Result<u64, RepoError> {
        let mut state = mutex_lock(&self.state, SOURCE, "delete_comment");
        if !state.comments.contains_key(&id) {
            return Err(RepoError::NotFound);
        }
        let before = state.comments.len();
        state
            .comments
            .retain(|comment_id, comment| *comment_id != id && comment.parent_id != Some(id));
        Ok((before - state.comments.len()) as u64)
    }
}

#[async_trait]
impl AnalyticsRepo for MemoryStore {
    async fn insert_view(&self, params: CreateViewParams) -> Result<ViewRecord, RepoError> {
        self.check_analytics()?;
        let record = ViewRecord {
            id: Uuid::new_v4(),
            content_id: params.content_id,
            visitor_id: params.visitor_id,
            phase: params.phase,
            ip_address: params.ip_address,
            user_agent: params.user_agent,
            country: params.country,
            city: params.city,
            region: params.region,
            time_spent: params.time_spent,
            scroll_depth: params.scroll_depth,
            bounced: params.bounced,
            referrer: params.referrer,
            created_at: params.now,
        };
        mutex_lock(&self.state, SOURCE, "insert_view")
            .views
            .push(record.clone());
        Ok(record)
    }

    async fn upsert_session(
        &self,
        params: UpsertSessionParams,
    ) -> Result<VisitorSessionRecord, RepoError> {
        self.check_analytics()?;
        let session = self
            .sessions
            .entry(params.visitor_id)
            .and_modify(|session| {
                session.page_views += 1;
                session.total_time += params.elapsed_secs;
                session.last_seen = params.now;
                session.device = params.device.clone();
                session.browser = params.browser.clone();
                session.os = params.os.clone();
                session.country = params.country.clone();
                session.city = params.city.clone();
                session.region = params.region.clone();
            })
            .or_insert_with(|| VisitorSessionRecord {
                visitor_id: params.visitor_id,
                device: params.device.clone(),
                browser: params.browser.clone(),
                os: params.os.clone(),
                country: params.country.clone(),
                city: params.city.clone(),
                region: params.region.clone(),
                page_views: 1,
                total_time: params.elapsed_secs,
                first_seen: params.now,
                last_seen: params.now,
            });
        Ok(session.value().clone())
    }

    async fn view_totals(
        &self,
        content_id: Uuid,
        since: OffsetDateTime,
    ) -> Result<ViewTotals, RepoError> {
        let state = mutex_lock(&self.state, SOURCE, "view_totals");
        let views = &state.views;
        let windowed = || {
            views
                .iter()
                .filter(move |view| view.content_id == content_id && view.created_at >= since)
        };
        let finished: HashSet<Uuid> = windowed()
            .filter(|view| view.phase == ViewPhase::SessionEnd)
            .map(|view| view.visitor_id)
            .collect();

        let mut totals = ViewTotals::default();
        let mut visitors = HashSet::new();
        for view in windowed().filter(|view| {
            view.phase == ViewPhase::SessionEnd || !finished.contains(&view.visitor_id)
        }) {
            totals.total_views += 1;
            totals.total_time_spent += i64::from(view.time_spent);
            totals.total_scroll_depth += i64::from(view.scroll_depth);
            if view.bounced {
                totals.bounced_views += 1;
            }
            visitors.insert(view.visitor_id);
        }
        totals.unique_visitors = visitors.len() as u64;
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ContentKind;

    fn params(site_id: Uuid, slug: &str) -> CreateContentParams {
        CreateContentParams {
            site_id,
            author_id: Uuid::from_u128(1),
            kind: ContentKind::BlogPost,
            slug: slug.to_string(),
            title: "Title".into(),
            status: ContentStatus::Draft,
            comments_allowed: true,
            published_at: None,
            now: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn slugs_are_unique_per_site_only() {
        let store = MemoryStore::new();
        let first = store.add_site(Uuid::from_u128(1), "first", SiteStatus::Active);
        let second = store.add_site(Uuid::from_u128(1), "second", SiteStatus::Active);

        store.create_content(params(first.id, "soup")).await.unwrap();
        store.create_content(params(second.id, "soup")).await.unwrap();
        let err = store
            .create_content(params(first.id, "soup"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn status_write_is_compare_and_set() {
        let store = MemoryStore::new();
        let site = store.add_site(Uuid::from_u128(1), "site", SiteStatus::Active);
        let item = store.create_content(params(site.id, "soup")).await.unwrap();

        let err = store
            .update_content_status(UpdateContentStatusParams {
                id: item.id,
                expected_status: ContentStatus::Published,
                status: ContentStatus::Suspended,
                published_at: None,
                scheduled_at: None,
                archived_at: None,
                now: OffsetDateTime::UNIX_EPOCH,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Stale { .. }));
    }

    #[tokio::test]
    async fn deleting_a_comment_removes_its_replies() {
        let store = MemoryStore::new();
        let site = store.add_site(Uuid::from_u128(1), "site", SiteStatus::Active);
        let item = store.create_content(params(site.id, "soup")).await.unwrap();
        let comment = |parent_id| CreateCommentParams {
            content_id: item.id,
            visitor_id: Uuid::from_u128(5),
            name: "Ana".into(),
            email: None,
            content: "Nice".into(),
            parent_id,
            approved: true,
            now: OffsetDateTime::UNIX_EPOCH,
        };
        let root = store.create_comment(comment(None)).await.unwrap();
        store.create_comment(comment(Some(root.id))).await.unwrap();
        store.create_comment(comment(None)).await.unwrap();

        assert_eq!(store.delete_comment(root.id).await.unwrap(), 2);
        assert_eq!(store.comment_count(), 1);
    }

    #[tokio::test]
    async fn session_upsert_increments() {
        let store = MemoryStore::new();
        let visitor = Uuid::from_u128(9);
        let upsert = |elapsed_secs| UpsertSessionParams {
            visitor_id: visitor,
            device: "desktop".into(),
            browser: "firefox".into(),
            os: "linux".into(),
            country: "NL".into(),
            city: "Utrecht".into(),
            region: "UT".into(),
            elapsed_secs,
            now: OffsetDateTime::UNIX_EPOCH,
        };
        store.upsert_session(upsert(10)).await.unwrap();
        let session = store.upsert_session(upsert(32)).await.unwrap();
        assert_eq!(session.page_views, 2);
        assert_eq!(session.total_time, 42);
    }
}
