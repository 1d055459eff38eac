use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register descriptions for every counter the services emit.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "pressroom_content_transition_total",
            Unit::Count,
            "Content status transitions applied, by transition."
        );
        describe_counter!(
            "pressroom_interaction_toggle_total",
            Unit::Count,
            "Like/dislike toggles, by type and resulting action."
        );
        describe_counter!(
            "pressroom_interaction_record_total",
            Unit::Count,
            "Non-exclusive interactions recorded, by type."
        );
        describe_counter!(
            "pressroom_comment_submitted_total",
            Unit::Count,
            "Comments accepted, by initial approval state."
        );
        describe_counter!(
            "pressroom_comment_approved_total",
            Unit::Count,
            "Pending comments approved by a moderator."
        );
        describe_counter!(
            "pressroom_analytics_enqueued_total",
            Unit::Count,
            "Analytics events accepted by the recorder queue."
        );
        describe_counter!(
            "pressroom_analytics_dropped_total",
            Unit::Count,
            "Analytics events dropped before processing, by reason."
        );
        describe_counter!(
            "pressroom_analytics_processed_total",
            Unit::Count,
            "Analytics events persisted by the background worker."
        );
        describe_counter!(
            "pressroom_analytics_failed_total",
            Unit::Count,
            "Analytics events discarded after a processing error."
        );
        describe_counter!(
            "pressroom_storage_timeout_total",
            Unit::Count,
            "Storage calls abandoned at the configured deadline, by operation."
        );
    });
}
