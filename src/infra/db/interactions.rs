use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{
    InteractionsRepo, RepoError, ToggleInteractionParams, ToggleOutcome, UpsertInteractionParams,
};
use crate::domain::entities::InteractionRecord;
use crate::domain::types::InteractionType;

use super::{PostgresRepositories, map_sqlx_error};

const INTERACTION_COLUMNS: &str =
    "id, visitor_id, content_id, interaction_type, value, created_at, updated_at";

#[async_trait]
impl InteractionsRepo for PostgresRepositories {
    async fn toggle_interaction(
        &self,
        params: ToggleInteractionParams,
    ) -> Result<ToggleOutcome, RepoError> {
        let key = params.key;
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        if let Some(other) = params.exclusive_with {
            sqlx::query(
                "DELETE FROM interactions \
                 WHERE visitor_id = $1 AND content_id = $2 AND interaction_type = $3",
            )
            .bind(key.visitor_id)
            .bind(key.content_id)
            .bind(other)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        let removed: Option<Uuid> = sqlx::query_scalar(
            "DELETE FROM interactions \
             WHERE visitor_id = $1 AND content_id = $2 AND interaction_type = $3 \
             RETURNING id",
        )
        .bind(key.visitor_id)
        .bind(key.content_id)
        .bind(key.interaction_type)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let outcome = if removed.is_some() {
            ToggleOutcome::Removed
        } else {
            let record = sqlx::query_as::<_, InteractionRecord>(&format!(
                "INSERT INTO interactions \
                     (id, visitor_id, content_id, interaction_type, value, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $6) \
                 RETURNING {INTERACTION_COLUMNS}"
            ))
            .bind(Uuid::new_v4())
            .bind(key.visitor_id)
            .bind(key.content_id)
            .bind(key.interaction_type)
            .bind(params.value)
            .bind(params.now)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
            ToggleOutcome::Added(record)
        };

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(outcome)
    }

    async fn upsert_interaction(
        &self,
        params: UpsertInteractionParams,
    ) -> Result<InteractionRecord, RepoError> {
        let key = params.key;
        sqlx::query_as::<_, InteractionRecord>(&format!(
            "INSERT INTO interactions \
                 (id, visitor_id, content_id, interaction_type, value, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             ON CONFLICT (visitor_id, content_id, interaction_type) \
             DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at \
             RETURNING {INTERACTION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(key.visitor_id)
        .bind(key.content_id)
        .bind(key.interaction_type)
        .bind(params.value)
        .bind(params.now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn count_by_type(
        &self,
        content_id: Uuid,
    ) -> Result<Vec<(InteractionType, u64)>, RepoError> {
        let rows: Vec<(InteractionType, i64)> = sqlx::query_as(
            "SELECT interaction_type, COUNT(*) FROM interactions \
             WHERE content_id = $1 \
             GROUP BY interaction_type",
        )
        .bind(content_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|(kind, count)| (kind, count.max(0) as u64))
            .collect())
    }

    async fn list_for_visitor(
        &self,
        visitor_id: Uuid,
        content_id: Uuid,
    ) -> Result<Vec<InteractionRecord>, RepoError> {
        sqlx::query_as::<_, InteractionRecord>(&format!(
            "SELECT {INTERACTION_COLUMNS} FROM interactions \
             WHERE visitor_id = $1 AND content_id = $2 \
             ORDER BY interaction_type"
        ))
        .bind(visitor_id)
        .bind(content_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
