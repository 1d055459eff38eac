//! Request enrichment (geolocation and user-agent parsing) as an external
//! collaborator. Analytics never waits on it for longer than a fixed bound.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFingerprint {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedContext {
    pub country: String,
    pub city: String,
    pub region: String,
    pub device: String,
    pub browser: String,
    pub os: String,
}

impl EnrichedContext {
    /// Neutral context used whenever enrichment is unavailable.
    pub fn unknown() -> Self {
        Self {
            country: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
            region: UNKNOWN.to_string(),
            device: UNKNOWN.to_string(),
            browser: UNKNOWN.to_string(),
            os: UNKNOWN.to_string(),
        }
    }
}

#[derive(Debug, Error)]
#[error("enrichment failed: {0}")]
pub struct EnrichmentError(pub String);

#[async_trait]
pub trait Enrichment: Send + Sync {
    async fn enrich(&self, fingerprint: &RequestFingerprint)
    -> Result<EnrichedContext, EnrichmentError>;
}

/// Adapter for deployments without an enrichment backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownEnrichment;

#[async_trait]
impl Enrichment for UnknownEnrichment {
    async fn enrich(
        &self,
        _fingerprint: &RequestFingerprint,
    ) -> Result<EnrichedContext, EnrichmentError> {
        Ok(EnrichedContext::unknown())
    }
}

/// Enrich within `limit`, falling back to [`EnrichedContext::unknown`].
pub async fn enrich_or_unknown(
    enrichment: &dyn Enrichment,
    fingerprint: &RequestFingerprint,
    limit: Duration,
) -> EnrichedContext {
    match tokio::time::timeout(limit, enrichment.enrich(fingerprint)).await {
        Ok(Ok(context)) => context,
        Ok(Err(err)) => {
            debug!(
                target = "application::enrichment",
                error = %err,
                "enrichment failed, using unknown context"
            );
            EnrichedContext::unknown()
        }
        Err(_) => {
            debug!(
                target = "application::enrichment",
                limit_ms = limit.as_millis() as u64,
                "enrichment timed out, using unknown context"
            );
            EnrichedContext::unknown()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl Enrichment for Failing {
        async fn enrich(
            &self,
            _fingerprint: &RequestFingerprint,
        ) -> Result<EnrichedContext, EnrichmentError> {
            Err(EnrichmentError("geo service down".into()))
        }
    }

    struct Stalled;

    #[async_trait]
    impl Enrichment for Stalled {
        async fn enrich(
            &self,
            _fingerprint: &RequestFingerprint,
        ) -> Result<EnrichedContext, EnrichmentError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(EnrichedContext::unknown())
        }
    }

    #[tokio::test]
    async fn failures_fall_back_to_unknown() {
        let context = enrich_or_unknown(
            &Failing,
            &RequestFingerprint::default(),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(context, EnrichedContext::unknown());
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_fall_back_to_unknown() {
        let context = enrich_or_unknown(
            &Stalled,
            &RequestFingerprint::default(),
            Duration::from_millis(100),
        )
        .await;
        assert_eq!(context.country, UNKNOWN);
    }
}
