//! View and session ingestion, engagement rollups and the fire-and-forget
//! recorder that keeps analytics off the request path.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Deserialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::clock::Clock;
use crate::application::enrichment::{
    EnrichedContext, Enrichment, RequestFingerprint, enrich_or_unknown,
};
use crate::application::error::AppError;
use crate::application::repos::{
    AnalyticsRepo, ContentRepo, CreateViewParams, UpsertSessionParams,
};
use crate::application::storage::StorageDeadline;
use crate::domain::analytics::{
    EngagementSummary, checked_duration_secs, clamp_scroll_depth, classify_bounce, window_start,
};
use crate::domain::entities::{ViewRecord, VisitorSessionRecord};
use crate::domain::types::ViewPhase;

const SOURCE: &str = "application::analytics";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageLoadEvent {
    pub content_id: Uuid,
    pub visitor_id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewEvent {
    pub content_id: Uuid,
    pub visitor_id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    /// Seconds on page as reported by the client; must not be negative.
    pub time_spent: i64,
    /// Percentage as reported by the client; clamped to 0-100.
    pub scroll_depth: i32,
    /// Client verdict, overriding the threshold rule when present.
    pub bounced: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionEvent {
    pub visitor_id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub elapsed_secs: i64,
}

/// One line of the `ingest` stream, tagged by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    PageLoad(PageLoadEvent),
    View(ViewEvent),
    Session(SessionEvent),
}

impl AnalyticsEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::PageLoad(_) => "page_load",
            Self::View(_) => "view",
            Self::Session(_) => "session",
        }
    }

    fn fingerprint(&self) -> RequestFingerprint {
        let (ip, user_agent) = match self {
            Self::PageLoad(event) => (&event.ip_address, &event.user_agent),
            Self::View(event) => (&event.ip_address, &event.user_agent),
            Self::Session(event) => (&event.ip_address, &event.user_agent),
        };
        RequestFingerprint {
            ip: ip.clone(),
            user_agent: user_agent.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AnalyticsService {
    content: Arc<dyn ContentRepo>,
    analytics: Arc<dyn AnalyticsRepo>,
    clock: Arc<dyn Clock>,
    deadline: StorageDeadline,
}

impl AnalyticsService {
    pub fn new(
        content: Arc<dyn ContentRepo>,
        analytics: Arc<dyn AnalyticsRepo>,
        clock: Arc<dyn Clock>,
        deadline: StorageDeadline,
    ) -> Self {
        Self {
            content,
            analytics,
            clock,
            deadline,
        }
    }

    /// Provisional record written before any engagement data exists.
    pub async fn ingest_page_load(
        &self,
        event: PageLoadEvent,
        context: &EnrichedContext,
    ) -> Result<ViewRecord, AppError> {
        self.ensure_content(event.content_id).await?;
        let params = CreateViewParams {
            content_id: event.content_id,
            visitor_id: event.visitor_id,
            phase: ViewPhase::PageLoad,
            ip_address: event.ip_address,
            user_agent: event.user_agent,
            country: context.country.clone(),
            city: context.city.clone(),
            region: context.region.clone(),
            time_spent: 0,
            scroll_depth: 0,
            bounced: true,
            referrer: event.referrer,
            now: self.clock.now(),
        };
        self.insert(params).await
    }

    pub async fn ingest_view(
        &self,
        event: ViewEvent,
        context: &EnrichedContext,
    ) -> Result<ViewRecord, AppError> {
        let time_spent = checked_duration_secs(event.time_spent, "time spent")?;
        self.ensure_content(event.content_id).await?;
        let scroll_depth = clamp_scroll_depth(event.scroll_depth);
        let bounced = event
            .bounced
            .unwrap_or_else(|| classify_bounce(time_spent, scroll_depth));

        let params = CreateViewParams {
            content_id: event.content_id,
            visitor_id: event.visitor_id,
            phase: ViewPhase::SessionEnd,
            ip_address: event.ip_address,
            user_agent: event.user_agent,
            country: context.country.clone(),
            city: context.city.clone(),
            region: context.region.clone(),
            time_spent,
            scroll_depth,
            bounced,
            referrer: event.referrer,
            now: self.clock.now(),
        };
        self.insert(params).await
    }

    pub async fn upsert_session(
        &self,
        event: SessionEvent,
        context: &EnrichedContext,
    ) -> Result<VisitorSessionRecord, AppError> {
        let elapsed_secs = checked_duration_secs(event.elapsed_secs, "elapsed time")?;
        let params = UpsertSessionParams {
            visitor_id: event.visitor_id,
            device: context.device.clone(),
            browser: context.browser.clone(),
            os: context.os.clone(),
            country: context.country.clone(),
            city: context.city.clone(),
            region: context.region.clone(),
            elapsed_secs: i64::from(elapsed_secs),
            now: self.clock.now(),
        };
        self.deadline
            .run("analytics.upsert_session", self.analytics.upsert_session(params))
            .await
            .map_err(AppError::from)
    }

    /// Rollup over the trailing `window_days` days ending now.
    pub async fn aggregate(
        &self,
        content_id: Uuid,
        window_days: u32,
    ) -> Result<EngagementSummary, AppError> {
        let since = window_start(self.clock.now(), window_days)?;
        let totals = self
            .deadline
            .run(
                "analytics.view_totals",
                self.analytics.view_totals(content_id, since),
            )
            .await?;
        Ok(EngagementSummary::from_totals(totals))
    }

    async fn ensure_content(&self, content_id: Uuid) -> Result<(), AppError> {
        self.deadline
            .run("content.find", self.content.find_content(content_id))
            .await?
            .map(|_| ())
            .ok_or(AppError::not_found("content"))
    }

    async fn insert(&self, params: CreateViewParams) -> Result<ViewRecord, AppError> {
        self.deadline
            .run("analytics.insert_view", self.analytics.insert_view(params))
            .await
            .map_err(AppError::from)
    }

    async fn process(&self, event: AnalyticsEvent, context: &EnrichedContext) -> Result<(), AppError> {
        match event {
            AnalyticsEvent::PageLoad(event) => self.ingest_page_load(event, context).await.map(drop),
            AnalyticsEvent::View(event) => self.ingest_view(event, context).await.map(drop),
            AnalyticsEvent::Session(event) => self.upsert_session(event, context).await.map(drop),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RecorderConfig {
    pub queue_capacity: usize,
    pub enrichment_timeout: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            enrichment_timeout: Duration::from_millis(250),
        }
    }
}

/// Non-blocking front for [`AnalyticsService`].
///
/// Events go into a bounded queue drained by one background task. A full
/// queue drops the event; processing failures are logged and counted. The
/// task exits once every recorder clone has been dropped and the queue is
/// empty.
#[derive(Clone)]
pub struct AnalyticsRecorder {
    sender: mpsc::Sender<AnalyticsEvent>,
}

impl AnalyticsRecorder {
    pub fn spawn(
        service: AnalyticsService,
        enrichment: Arc<dyn Enrichment>,
        config: RecorderConfig,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let handle = tokio::spawn(drain(
            receiver,
            service,
            enrichment,
            config.enrichment_timeout,
        ));
        (Self { sender }, handle)
    }

    /// Enqueue, waiting for room in the queue. Returns `false` once the
    /// worker has stopped.
    pub async fn submit(&self, event: AnalyticsEvent) -> bool {
        let kind = event.kind();
        if self.sender.send(event).await.is_err() {
            counter!("pressroom_analytics_dropped_total", "reason" => "closed").increment(1);
            warn!(target = SOURCE, kind, "analytics worker stopped, event dropped");
            return false;
        }
        counter!("pressroom_analytics_enqueued_total", "kind" => kind).increment(1);
        true
    }

    /// Enqueue without waiting. Returns whether the event was accepted.
    pub fn record(&self, event: AnalyticsEvent) -> bool {
        let kind = event.kind();
        match self.sender.try_send(event) {
            Ok(()) => {
                counter!("pressroom_analytics_enqueued_total", "kind" => kind).increment(1);
                true
            }
            Err(TrySendError::Full(_)) => {
                counter!("pressroom_analytics_dropped_total", "reason" => "full").increment(1);
                warn!(target = SOURCE, kind, "analytics queue full, event dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                counter!("pressroom_analytics_dropped_total", "reason" => "closed").increment(1);
                warn!(target = SOURCE, kind, "analytics worker stopped, event dropped");
                false
            }
        }
    }
}

async fn drain(
    mut receiver: mpsc::Receiver<AnalyticsEvent>,
    service: AnalyticsService,
    enrichment: Arc<dyn Enrichment>,
    enrichment_timeout: Duration,
) {
    while let Some(event) = receiver.recv().await {
        let kind = event.kind();
        let context =
            enrich_or_unknown(enrichment.as_ref(), &event.fingerprint(), enrichment_timeout).await;
        match service.process(event, &context).await {
            Ok(()) => {
                counter!("pressroom_analytics_processed_total", "kind" => kind).increment(1);
            }
            Err(err) => {
                counter!(
                    "pressroom_analytics_failed_total",
                    "kind" => kind,
                    "code" => err.code()
                )
                .increment(1);
                warn!(target = SOURCE, kind, error = %err, "analytics event discarded");
            }
        }
    }
    debug!(target = SOURCE, "analytics recorder drained");
}
