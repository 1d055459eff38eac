#![allow(dead_code)]

use std::sync::Arc;

use pressroom::application::analytics::AnalyticsService;
use pressroom::application::clock::{Clock, ManualClock};
use pressroom::application::content::{ContentLifecycleService, CreateContentCommand};
use pressroom::application::interactions::InteractionLedger;
use pressroom::application::moderation::ModerationService;
use pressroom::application::storage::StorageDeadline;
use pressroom::domain::actor::Actor;
use pressroom::domain::entities::{ContentRecord, SiteRecord};
use pressroom::domain::types::{ContentKind, Role, SiteStatus};
use pressroom::infra::memory::MemoryStore;
use time::OffsetDateTime;
use time::macros::datetime;
use uuid::Uuid;

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub content: ContentLifecycleService,
    pub ledger: InteractionLedger,
    pub moderation: ModerationService,
    pub analytics: AnalyticsService,
    pub site: SiteRecord,
    pub owner: Actor,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(datetime!(2026-03-01 12:00 UTC)));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let deadline = StorageDeadline::default();

        let owner = actor(Role::SiteOwner);
        let site = store.add_site(owner.id, "family-kitchen", SiteStatus::Active);

        let content = ContentLifecycleService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            dyn_clock.clone(),
            deadline,
        );
        let ledger = InteractionLedger::new(
            store.clone(),
            store.clone(),
            store.clone(),
            dyn_clock.clone(),
            deadline,
        );
        let moderation = ModerationService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            dyn_clock.clone(),
            deadline,
        );
        let analytics = AnalyticsService::new(store.clone(), store.clone(), dyn_clock, deadline);

        Self {
            store,
            clock,
            content,
            ledger,
            moderation,
            analytics,
            site,
            owner,
        }
    }

    pub fn clock_now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// A recipe created by the site owner, which publishes immediately.
    pub async fn published(&self, title: &str) -> ContentRecord {
        self.content
            .create_content(&self.owner, self.command(ContentKind::Recipe, title))
            .await
            .expect("owner creates published content")
    }

    /// A draft authored by `editor`.
    pub async fn draft_by(&self, editor: &Actor, title: &str) -> ContentRecord {
        self.content
            .create_content(editor, self.command(ContentKind::BlogPost, title))
            .await
            .expect("editor creates a draft")
    }

    pub fn command(&self, kind: ContentKind, title: &str) -> CreateContentCommand {
        CreateContentCommand {
            site_id: self.site.id,
            kind,
            title: title.to_string(),
            slug: None,
            comments_allowed: true,
        }
    }
}

pub fn actor(role: Role) -> Actor {
    Actor::new(Uuid::new_v4(), role)
}
