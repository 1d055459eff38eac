use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{CommentsRepo, CreateCommentParams, RepoError};
use crate::domain::entities::CommentRecord;

use super::{PostgresRepositories, map_sqlx_error};

const COMMENT_COLUMNS: &str =
    "id, content_id, visitor_id, name, email, content, parent_id, approved, created_at";

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn find_comment(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        sqlx::query_as::<_, CommentRecord>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        sqlx::query_as::<_, CommentRecord>(&format!(
            "INSERT INTO comments \
                 (id, content_id, visitor_id, name, email, content, parent_id, approved, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(params.content_id)
        .bind(params.visitor_id)
        .bind(params.name)
        .bind(params.email)
        .bind(params.content)
        .bind(params.parent_id)
        .bind(params.approved)
        .bind(params.now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_comments(
        &self,
        content_id: Uuid,
        approved_only: bool,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        sqlx::query_as::<_, CommentRecord>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments \
             WHERE content_id = $1 AND (approved OR NOT $2) \
             ORDER BY created_at, id"
        ))
        .bind(content_id)
        .bind(approved_only)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn approve_comment(&self, id: Uuid) -> Result<CommentRecord, RepoError> {
        sqlx::query_as::<_, CommentRecord>(&format!(
            "UPDATE comments SET approved = TRUE WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1 OR parent_id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        match result.rows_affected() {
            0 => Err(RepoError::NotFound),
            removed => Ok(removed),
        }
    }
}
