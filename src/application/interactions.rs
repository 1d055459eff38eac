//! Interaction ledger: at most one record per (visitor, content, type), with
//! like and dislike mutually exclusive.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::clock::Clock;
use crate::application::error::AppError;
use crate::application::repos::{
    ContentRepo, InteractionKey, InteractionsRepo, RepoError, SitesRepo, ToggleInteractionParams,
    ToggleOutcome, UpsertInteractionParams,
};
use crate::application::storage::StorageDeadline;
use crate::application::visibility::{load_visible, require_authenticated};
use crate::domain::actor::Actor;
use crate::domain::entities::InteractionRecord;
use crate::domain::policy;
use crate::domain::types::InteractionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleAction {
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToggleResult {
    pub action: ToggleAction,
    pub record: Option<InteractionRecord>,
}

#[derive(Clone)]
pub struct InteractionLedger {
    sites: Arc<dyn SitesRepo>,
    content: Arc<dyn ContentRepo>,
    interactions: Arc<dyn InteractionsRepo>,
    clock: Arc<dyn Clock>,
    deadline: StorageDeadline,
}

impl InteractionLedger {
    pub fn new(
        sites: Arc<dyn SitesRepo>,
        content: Arc<dyn ContentRepo>,
        interactions: Arc<dyn InteractionsRepo>,
        clock: Arc<dyn Clock>,
        deadline: StorageDeadline,
    ) -> Self {
        Self {
            sites,
            content,
            interactions,
            clock,
            deadline,
        }
    }

    /// Flip a like or dislike, clearing its counterpart first.
    pub async fn toggle(
        &self,
        actor: &Actor,
        content_id: Uuid,
        interaction_type: &str,
        value: Option<String>,
    ) -> Result<ToggleResult, AppError> {
        let interaction_type: InteractionType = interaction_type.parse()?;
        let Some(counterpart) = interaction_type.exclusive_counterpart() else {
            return Err(AppError::invalid(format!(
                "`{interaction_type}` is recorded, not toggled"
            )));
        };
        self.authorize(actor, content_id).await?;

        let params = ToggleInteractionParams {
            key: InteractionKey {
                visitor_id: actor.id,
                content_id,
                interaction_type,
            },
            exclusive_with: Some(counterpart),
            value,
            now: self.clock.now(),
        };

        let outcome = match self.run_toggle(params.clone()).await {
            Err(RepoError::Duplicate { constraint }) => {
                debug!(
                    target = "application::interactions::toggle",
                    %content_id,
                    constraint = %constraint,
                    "toggle raced a concurrent insert, retrying"
                );
                self.run_toggle(params).await?
            }
            other => other?,
        };

        let result = match outcome {
            ToggleOutcome::Added(record) => ToggleResult {
                action: ToggleAction::Added,
                record: Some(record),
            },
            ToggleOutcome::Removed => ToggleResult {
                action: ToggleAction::Removed,
                record: None,
            },
        };

        let action = match result.action {
            ToggleAction::Added => "added",
            ToggleAction::Removed => "removed",
        };
        counter!(
            "pressroom_interaction_toggle_total",
            "type" => interaction_type.as_str(),
            "action" => action
        )
        .increment(1);
        info!(
            target = "application::interactions::toggle",
            %content_id,
            visitor_id = %actor.id,
            interaction = interaction_type.as_str(),
            action,
            "interaction toggled"
        );
        Ok(result)
    }

    /// Upsert a non-exclusive interaction; the latest `value` wins.
    pub async fn record(
        &self,
        actor: &Actor,
        content_id: Uuid,
        interaction_type: &str,
        value: Option<String>,
    ) -> Result<InteractionRecord, AppError> {
        let interaction_type: InteractionType = interaction_type.parse()?;
        if interaction_type.is_toggle() {
            return Err(AppError::invalid(format!(
                "`{interaction_type}` is toggled, not recorded"
            )));
        }
        self.authorize(actor, content_id).await?;

        let params = UpsertInteractionParams {
            key: InteractionKey {
                visitor_id: actor.id,
                content_id,
                interaction_type,
            },
            value,
            now: self.clock.now(),
        };
        let record = self
            .deadline
            .run(
                "interactions.upsert",
                self.interactions.upsert_interaction(params),
            )
            .await?;

        counter!(
            "pressroom_interaction_record_total",
            "type" => interaction_type.as_str()
        )
        .increment(1);
        Ok(record)
    }

    /// Count per type. Every known type is present, zero when unused.
    pub async fn get_counts(
        &self,
        content_id: Uuid,
    ) -> Result<BTreeMap<InteractionType, u64>, AppError> {
        let mut counts: BTreeMap<InteractionType, u64> = InteractionType::all()
            .iter()
            .map(|kind| (*kind, 0))
            .collect();
        let stored = self
            .deadline
            .run(
                "interactions.count",
                self.interactions.count_by_type(content_id),
            )
            .await?;
        for (kind, count) in stored {
            counts.insert(kind, count);
        }
        Ok(counts)
    }

    pub async fn get_user_state(
        &self,
        actor: &Actor,
        content_id: Uuid,
    ) -> Result<BTreeSet<InteractionType>, AppError> {
        require_authenticated(actor)?;
        let records = self
            .deadline
            .run(
                "interactions.list_for_visitor",
                self.interactions.list_for_visitor(actor.id, content_id),
            )
            .await?;
        Ok(records
            .into_iter()
            .map(|record| record.interaction_type)
            .collect())
    }

    async fn authorize(&self, actor: &Actor, content_id: Uuid) -> Result<(), AppError> {
        require_authenticated(actor)?;
        if !policy::can_interact(actor) {
            return Err(AppError::Forbidden("interact"));
        }
        load_visible(
            self.content.as_ref(),
            self.sites.as_ref(),
            &self.deadline,
            actor,
            content_id,
        )
        .await?;
        Ok(())
    }

    async fn run_toggle(&self, params: ToggleInteractionParams) -> Result<ToggleOutcome, RepoError> {
        self.deadline
            .run(
                "interactions.toggle",
                self.interactions.toggle_interaction(params),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use time::macros::datetime;

    use super::*;
    use crate::application::clock::ManualClock;
    use crate::application::repos::{ContentWriteRepo, CreateContentParams};
    use crate::domain::types::{ContentKind, ContentStatus, Role, SiteStatus};
    use crate::infra::memory::MemoryStore;

    /// Reports a unique violation for the first `failures` toggles.
    struct RacingInteractions {
        failures: usize,
        calls: AtomicUsize,
    }

    impl RacingInteractions {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl InteractionsRepo for RacingInteractions {
        async fn toggle_interaction(
            &self,
            params: ToggleInteractionParams,
        ) -> Result<ToggleOutcome, RepoError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(RepoError::Duplicate {
                    constraint: "interactions_exclusive_reaction_key".to_string(),
                });
            }
            Ok(ToggleOutcome::Added(InteractionRecord {
                id: Uuid::new_v4(),
                visitor_id: params.key.visitor_id,
                content_id: params.key.content_id,
                interaction_type: params.key.interaction_type,
                value: params.value,
                created_at: params.now,
                updated_at: params.now,
            }))
        }

        async fn upsert_interaction(
            &self,
            _params: UpsertInteractionParams,
        ) -> Result<InteractionRecord, RepoError> {
            Err(RepoError::NotFound)
        }

        async fn count_by_type(
            &self,
            _content_id: Uuid,
        ) -> Result<Vec<(InteractionType, u64)>, RepoError> {
            Ok(Vec::new())
        }

        async fn list_for_visitor(
            &self,
            _visitor_id: Uuid,
            _content_id: Uuid,
        ) -> Result<Vec<InteractionRecord>, RepoError> {
            Ok(Vec::new())
        }
    }

    async fn ledger_over(interactions: Arc<RacingInteractions>) -> (InteractionLedger, Uuid) {
        let now = datetime!(2026-03-01 12:00 UTC);
        let store = Arc::new(MemoryStore::new());
        let owner_id = Uuid::new_v4();
        let site = store.add_site(owner_id, "racing-kitchen", SiteStatus::Active);
        let content = store
            .create_content(CreateContentParams {
                site_id: site.id,
                author_id: owner_id,
                kind: ContentKind::Recipe,
                slug: "pancakes".to_string(),
                title: "Pancakes".to_string(),
                status: ContentStatus::Published,
                comments_allowed: true,
                published_at: Some(now),
                now,
            })
            .await
            .unwrap();
        let ledger = InteractionLedger::new(
            store.clone(),
            store,
            interactions,
            Arc::new(ManualClock::new(now)),
            StorageDeadline::default(),
        );
        (ledger, content.id)
    }

    #[tokio::test]
    async fn toggle_retries_once_after_a_unique_race() {
        let interactions = Arc::new(RacingInteractions::new(1));
        let (ledger, content_id) = ledger_over(interactions.clone()).await;
        let viewer = Actor::new(Uuid::new_v4(), Role::Viewer);

        let result = ledger
            .toggle(&viewer, content_id, "dislike", None)
            .await
            .unwrap();

        assert_eq!(result.action, ToggleAction::Added);
        assert_eq!(interactions.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn second_race_surfaces_as_conflict() {
        let interactions = Arc::new(RacingInteractions::new(2));
        let (ledger, content_id) = ledger_over(interactions.clone()).await;
        let viewer = Actor::new(Uuid::new_v4(), Role::Viewer);

        let err = ledger
            .toggle(&viewer, content_id, "like", None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(interactions.calls.load(Ordering::SeqCst), 2);
    }
}
