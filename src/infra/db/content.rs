use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    ContentRepo, ContentWriteRepo, CreateContentParams, RepoError, SitesRepo,
    UpdateContentParams, UpdateContentStatusParams,
};
use crate::domain::entities::{ContentRecord, SiteRecord};
use crate::domain::types::ContentStatus;

use super::{PostgresRepositories, map_sqlx_error};

const CONTENT_COLUMNS: &str = "id, site_id, author_id, kind, slug, title, status, \
    comments_allowed, published_at, scheduled_at, archived_at, created_at, updated_at";

#[async_trait]
impl SitesRepo for PostgresRepositories {
    async fn find_site(&self, id: Uuid) -> Result<Option<SiteRecord>, RepoError> {
        sqlx::query_as::<_, SiteRecord>(
            "SELECT id, slug, owner_id, status, created_at FROM sites WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl ContentRepo for PostgresRepositories {
    async fn find_content(&self, id: Uuid) -> Result<Option<ContentRecord>, RepoError> {
        sqlx::query_as::<_, ContentRecord>(&format!(
            "SELECT {CONTENT_COLUMNS} FROM content_items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_content_by_slug(
        &self,
        site_id: Uuid,
        slug: &str,
    ) -> Result<Option<ContentRecord>, RepoError> {
        sqlx::query_as::<_, ContentRecord>(&format!(
            "SELECT {CONTENT_COLUMNS} FROM content_items WHERE site_id = $1 AND slug = $2"
        ))
        .bind(site_id)
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_due_scheduled(
        &self,
        now: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<ContentRecord>, RepoError> {
        sqlx::query_as::<_, ContentRecord>(&format!(
            "SELECT {CONTENT_COLUMNS} FROM content_items \
             WHERE status = $1 AND scheduled_at IS NOT NULL AND scheduled_at <= $2 \
             ORDER BY scheduled_at, id \
             LIMIT $3"
        ))
        .bind(ContentStatus::Draft)
        .bind(now)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl ContentWriteRepo for PostgresRepositories {
    async fn create_content(
        &self,
        params: CreateContentParams,
    ) -> Result<ContentRecord, RepoError> {
        sqlx::query_as::<_, ContentRecord>(&format!(
            "INSERT INTO content_items \
                 (id, site_id, author_id, kind, slug, title, status, comments_allowed, \
                  published_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10) \
             RETURNING {CONTENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(params.site_id)
        .bind(params.author_id)
        .bind(params.kind)
        .bind(params.slug)
        .bind(params.title)
        .bind(params.status)
        .bind(params.comments_allowed)
        .bind(params.published_at)
        .bind(params.now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_content(
        &self,
        params: UpdateContentParams,
    ) -> Result<ContentRecord, RepoError> {
        sqlx::query_as::<_, ContentRecord>(&format!(
            "UPDATE content_items \
             SET slug = $2, title = $3, comments_allowed = $4, updated_at = $5 \
             WHERE id = $1 \
             RETURNING {CONTENT_COLUMNS}"
        ))
        .bind(params.id)
        .bind(params.slug)
        .bind(params.title)
        .bind(params.comments_allowed)
        .bind(params.now)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)
    }

    async fn update_content_status(
        &self,
        params: UpdateContentStatusParams,
    ) -> Result<ContentRecord, RepoError> {
        let updated = sqlx::query_as::<_, ContentRecord>(&format!(
            "UPDATE content_items \
             SET status = $3, published_at = $4, scheduled_at = $5, archived_at = $6, \
                 updated_at = $7 \
             WHERE id = $1 AND status = $2 \
             RETURNING {CONTENT_COLUMNS}"
        ))
        .bind(params.id)
        .bind(params.expected_status)
        .bind(params.status)
        .bind(params.published_at)
        .bind(params.scheduled_at)
        .bind(params.archived_at)
        .bind(params.now)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if let Some(record) = updated {
            return Ok(record);
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM content_items WHERE id = $1)")
                .bind(params.id)
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?;
        if exists {
            Err(RepoError::Stale { entity: "content" })
        } else {
            Err(RepoError::NotFound)
        }
    }

    async fn delete_content(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM content_items WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
