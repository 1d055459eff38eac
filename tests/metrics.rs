mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{Harness, actor};
use metrics_util::debugging::DebuggingRecorder;
use pressroom::application::analytics::{
    AnalyticsEvent, AnalyticsRecorder, RecorderConfig, ViewEvent,
};
use pressroom::application::enrichment::UnknownEnrichment;
use pressroom::application::moderation::SubmitCommentCommand;
use pressroom::domain::types::Role;
use pressroom::infra::telemetry;
use uuid::Uuid;

#[tokio::test]
async fn service_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let harness = Harness::new();
    let recipe = harness.published("Measured Muffins").await;
    let viewer = actor(Role::Viewer);

    harness
        .ledger
        .toggle(&viewer, recipe.id, "like", None)
        .await
        .expect("toggle");
    harness
        .ledger
        .record(&viewer, recipe.id, "print", None)
        .await
        .expect("record");
    harness
        .content
        .suspend(&harness.owner, recipe.id)
        .await
        .expect("suspend");
    harness
        .content
        .unsuspend(&harness.owner, recipe.id)
        .await
        .expect("unsuspend");
    let comment = harness
        .moderation
        .submit_comment(
            &viewer,
            SubmitCommentCommand {
                content_id: recipe.id,
                name: "Grace".into(),
                email: None,
                content: "Perfect rise.".into(),
                parent_id: None,
            },
        )
        .await
        .expect("comment");
    harness
        .moderation
        .approve(&harness.owner, comment.id)
        .await
        .expect("approve");

    let (analytics, worker) = AnalyticsRecorder::spawn(
        harness.analytics.clone(),
        Arc::new(UnknownEnrichment),
        RecorderConfig::default(),
    );
    analytics.record(AnalyticsEvent::View(ViewEvent {
        content_id: recipe.id,
        visitor_id: Uuid::new_v4(),
        time_spent: 40,
        scroll_depth: 70,
        ..Default::default()
    }));
    drop(analytics);
    worker.await.expect("worker exits cleanly");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "pressroom_content_transition_total",
        "pressroom_interaction_toggle_total",
        "pressroom_interaction_record_total",
        "pressroom_comment_submitted_total",
        "pressroom_comment_approved_total",
        "pressroom_analytics_enqueued_total",
        "pressroom_analytics_processed_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
