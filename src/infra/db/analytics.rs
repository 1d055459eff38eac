use async_trait::async_trait;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    AnalyticsRepo, CreateViewParams, RepoError, UpsertSessionParams,
};
use crate::domain::analytics::ViewTotals;
use crate::domain::entities::{ViewRecord, VisitorSessionRecord};

use super::{PostgresRepositories, map_sqlx_error};

const VIEW_COLUMNS: &str = "id, content_id, visitor_id, phase, ip_address, user_agent, \
    country, city, region, time_spent, scroll_depth, bounced, referrer, created_at";

const SESSION_COLUMNS: &str = "visitor_id, device, browser, os, country, city, region, \
    page_views, total_time, first_seen, last_seen";

#[derive(FromRow)]
struct ViewTotalsRow {
    total_views: i64,
    unique_visitors: i64,
    total_time_spent: i64,
    total_scroll_depth: i64,
    bounced_views: i64,
}

impl From<ViewTotalsRow> for ViewTotals {
    fn from(row: ViewTotalsRow) -> Self {
        Self {
            total_views: row.total_views.max(0) as u64,
            unique_visitors: row.unique_visitors.max(0) as u64,
            total_time_spent: row.total_time_spent,
            total_scroll_depth: row.total_scroll_depth,
            bounced_views: row.bounced_views.max(0) as u64,
        }
    }
}

#[async_trait]
impl AnalyticsRepo for PostgresRepositories {
    async fn insert_view(&self, params: CreateViewParams) -> Result<ViewRecord, RepoError> {
        sqlx::query_as::<_, ViewRecord>(&format!(
            "INSERT INTO content_views \
                 (id, content_id, visitor_id, phase, ip_address, user_agent, country, city, \
                  region, time_spent, scroll_depth, bounced, referrer, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {VIEW_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(params.content_id)
        .bind(params.visitor_id)
        .bind(params.phase)
        .bind(params.ip_address)
        .bind(params.user_agent)
        .bind(params.country)
        .bind(params.city)
        .bind(params.region)
        .bind(params.time_spent)
        .bind(params.scroll_depth)
        .bind(params.bounced)
        .bind(params.referrer)
        .bind(params.now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn upsert_session(
        &self,
        params: UpsertSessionParams,
    ) -> Result<VisitorSessionRecord, RepoError> {
        sqlx::query_as::<_, VisitorSessionRecord>(&format!(
            "INSERT INTO visitor_sessions \
                 (visitor_id, device, browser, os, country, city, region, page_views, \
                  total_time, first_seen, last_seen) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 1, $8, $9, $9) \
             ON CONFLICT (visitor_id) DO UPDATE SET \
                 page_views = visitor_sessions.page_views + 1, \
                 total_time = visitor_sessions.total_time + EXCLUDED.total_time, \
                 last_seen = EXCLUDED.last_seen, \
                 device = EXCLUDED.device, \
                 browser = EXCLUDED.browser, \
                 os = EXCLUDED.os, \
                 country = EXCLUDED.country, \
                 city = EXCLUDED.city, \
                 region = EXCLUDED.region \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(params.visitor_id)
        .bind(params.device)
        .bind(params.browser)
        .bind(params.os)
        .bind(params.country)
        .bind(params.city)
        .bind(params.region)
        .bind(params.elapsed_secs)
        .bind(params.now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn view_totals(
        &self,
        content_id: Uuid,
        since: OffsetDateTime,
    ) -> Result<ViewTotals, RepoError> {
        sqlx::query_as::<_, ViewTotalsRow>(
            "WITH windowed AS ( \
                 SELECT visitor_id, phase, time_spent, scroll_depth, bounced \
                 FROM content_views \
                 WHERE content_id = $1 AND created_at >= $2 \
             ), finished AS ( \
                 SELECT DISTINCT visitor_id FROM windowed WHERE phase = 'session_end' \
             ) \
             SELECT \
                 COUNT(*) AS total_views, \
                 COUNT(DISTINCT w.visitor_id) AS unique_visitors, \
                 COALESCE(SUM(w.time_spent), 0)::BIGINT AS total_time_spent, \
                 COALESCE(SUM(w.scroll_depth), 0)::BIGINT AS total_scroll_depth, \
                 COUNT(*) FILTER (WHERE w.bounced) AS bounced_views \
             FROM windowed w \
             WHERE w.phase = 'session_end' \
                OR NOT EXISTS (SELECT 1 FROM finished f WHERE f.visitor_id = w.visitor_id)",
        )
        .bind(content_id)
        .bind(since)
        .fetch_one(self.pool())
        .await
        .map(ViewTotals::from)
        .map_err(map_sqlx_error)
    }
}
