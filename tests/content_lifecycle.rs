mod common;

use common::{Harness, actor};
use pressroom::application::content::{CreateContentCommand, UpdateContentCommand};
use pressroom::application::error::AppError;
use pressroom::domain::actor::Actor;
use pressroom::domain::types::{ContentKind, ContentStatus, Role, SiteStatus};
use time::Duration;

#[tokio::test]
async fn owner_content_publishes_on_creation_and_editor_content_starts_as_draft() {
    let harness = Harness::new();
    let published = harness.published("Morning Porridge").await;
    assert_eq!(published.status, ContentStatus::Published);
    assert_eq!(published.published_at, Some(published.created_at));
    assert_eq!(published.slug, "morning-porridge");

    let editor = actor(Role::Editor);
    let draft = harness.draft_by(&editor, "Evening Stew").await;
    assert_eq!(draft.status, ContentStatus::Draft);
    assert_eq!(draft.published_at, None);
    assert_eq!(draft.author_id, editor.id);
}

#[tokio::test]
async fn repeated_titles_get_suffixed_slugs() {
    let harness = Harness::new();
    let first = harness.published("Lemon Tart").await;
    let second = harness.published("Lemon Tart").await;
    assert_eq!(first.slug, "lemon-tart");
    assert_eq!(second.slug, "lemon-tart-2");
}

#[tokio::test]
async fn explicit_slug_collisions_conflict() {
    let harness = Harness::new();
    harness.published("Apple Pie").await;
    let other = harness.published("Pear Pie").await;

    let err = harness
        .content
        .update_content(
            &harness.owner,
            UpdateContentCommand {
                id: other.id,
                slug: Some("apple-pie".into()),
                ..Default::default()
            },
        )
        .await
        .expect_err("slug in use");
    assert!(matches!(err, AppError::Conflict(_)));

    let err = harness
        .content
        .create_content(
            &harness.owner,
            CreateContentCommand {
                slug: Some("apple-pie".into()),
                ..harness.command(ContentKind::Recipe, "Another Apple Pie")
            },
        )
        .await
        .expect_err("slug in use");
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn republishing_takes_a_fresh_publication_time() {
    let harness = Harness::new();
    let recipe = harness.published("Seasonal Salad").await;
    let first_published = recipe.published_at.expect("published");

    harness.clock.advance(Duration::hours(1));
    let draft = harness
        .content
        .unpublish(&harness.owner, recipe.id)
        .await
        .expect("unpublish");
    assert_eq!(draft.status, ContentStatus::Draft);
    assert_eq!(draft.published_at, None);

    harness.clock.advance(Duration::hours(1));
    let republished = harness
        .content
        .publish(&harness.owner, recipe.id)
        .await
        .expect("publish");
    assert_eq!(republished.status, ContentStatus::Published);
    assert_eq!(
        republished.published_at,
        Some(first_published + Duration::hours(2))
    );
}

#[tokio::test]
async fn suspension_round_trip_keeps_the_publication_time() {
    let harness = Harness::new();
    let recipe = harness.published("Spiced Lentils").await;
    let editor = actor(Role::Editor);

    harness.clock.advance(Duration::minutes(30));
    let suspended = harness
        .content
        .suspend(&editor, recipe.id)
        .await
        .expect("editors may suspend");
    assert_eq!(suspended.status, ContentStatus::Suspended);
    assert_eq!(suspended.published_at, recipe.published_at);

    let err = harness
        .content
        .unsuspend(&editor, recipe.id)
        .await
        .expect_err("editors cannot see suspended content");
    assert!(matches!(err, AppError::NotFound { .. }));

    harness.clock.advance(Duration::minutes(30));
    let restored = harness
        .content
        .unsuspend(&harness.owner, recipe.id)
        .await
        .expect("owner unsuspends");
    assert_eq!(restored.status, ContentStatus::Published);
    assert_eq!(restored.published_at, recipe.published_at);
}

#[tokio::test]
async fn invalid_transitions_fail_the_precondition() {
    let harness = Harness::new();
    let recipe = harness.published("Archived Broth").await;

    let archived = harness
        .content
        .archive(&actor(Role::Admin), recipe.id)
        .await
        .expect("admins archive recipes");
    assert_eq!(archived.status, ContentStatus::Archived);
    assert!(archived.archived_at.is_some());

    let err = harness
        .content
        .publish(&harness.owner, recipe.id)
        .await
        .expect_err("archived is terminal");
    assert!(matches!(err, AppError::PreconditionFailed(_)));
}

#[tokio::test]
async fn publishing_requires_the_highest_tier() {
    let harness = Harness::new();
    let editor = actor(Role::Editor);
    let draft = harness.draft_by(&editor, "Unreviewed Pudding").await;

    let err = harness
        .content
        .publish(&editor, draft.id)
        .await
        .expect_err("editors cannot publish");
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = harness
        .content
        .publish(&Actor::anonymous(), draft.id)
        .await
        .expect_err("anonymous cannot see drafts");
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[tokio::test]
async fn inactive_sites_block_publication() {
    let harness = Harness::new();
    let editor = actor(Role::Editor);
    let draft = harness.draft_by(&editor, "Shelved Scones").await;
    harness
        .store
        .set_site_status(harness.site.id, SiteStatus::Inactive);

    let err = harness
        .content
        .publish(&harness.owner, draft.id)
        .await
        .expect_err("site inactive");
    assert!(matches!(err, AppError::PreconditionFailed(_)));

    let err = harness
        .content
        .create_content(
            &harness.owner,
            harness.command(ContentKind::Recipe, "Closed Kitchen"),
        )
        .await
        .expect_err("owner content would publish on an inactive site");
    assert!(matches!(err, AppError::PreconditionFailed(_)));
}

#[tokio::test]
async fn recipes_are_deleted_only_by_platform_staff() {
    let harness = Harness::new();
    let recipe = harness.published("Family Secret").await;

    let err = harness
        .content
        .delete_content(&harness.owner, recipe.id)
        .await
        .expect_err("site owners cannot delete recipes");
    assert!(matches!(err, AppError::Forbidden(_)));

    harness
        .content
        .delete_content(&actor(Role::SuperUser), recipe.id)
        .await
        .expect("super users delete recipes");
    let err = harness
        .content
        .get_content(&harness.owner, recipe.id)
        .await
        .expect_err("gone");
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[tokio::test]
async fn site_owners_delete_blog_posts_on_their_site() {
    let harness = Harness::new();
    let post = harness
        .content
        .create_content(
            &harness.owner,
            harness.command(ContentKind::BlogPost, "Kitchen News"),
        )
        .await
        .expect("post");

    let err = harness
        .content
        .delete_content(&actor(Role::SiteOwner), post.id)
        .await
        .expect_err("another site's owner");
    assert!(matches!(err, AppError::Forbidden(_)));

    harness
        .content
        .delete_content(&harness.owner, post.id)
        .await
        .expect("own site");
}

#[tokio::test]
async fn scheduled_drafts_publish_once_due() {
    let harness = Harness::new();
    let editor = actor(Role::Editor);
    let draft = harness.draft_by(&editor, "Sunday Roast").await;
    let due_at = harness.clock_now() + Duration::hours(2);

    let scheduled = harness
        .content
        .schedule(&harness.owner, draft.id, due_at)
        .await
        .expect("schedule");
    assert_eq!(scheduled.status, ContentStatus::Draft);
    assert_eq!(scheduled.scheduled_at, Some(due_at));

    let early = harness.content.publish_due(10).await.expect("early pass");
    assert!(early.published.is_empty());

    harness.clock.advance(Duration::hours(3));
    let report = harness.content.publish_due(10).await.expect("due pass");
    assert_eq!(report.published, vec![draft.id]);
    assert!(report.skipped.is_empty());

    let published = harness
        .content
        .get_content(&harness.owner, draft.id)
        .await
        .expect("load");
    assert_eq!(published.status, ContentStatus::Published);
    assert_eq!(published.scheduled_at, None);
    assert!(published.published_at.is_some());
}

#[tokio::test]
async fn scheduling_in_the_past_is_rejected() {
    let harness = Harness::new();
    let editor = actor(Role::Editor);
    let draft = harness.draft_by(&editor, "Yesterday's Bread").await;

    let err = harness
        .content
        .schedule(&harness.owner, draft.id, harness.clock_now() - Duration::minutes(1))
        .await
        .expect_err("past");
    assert!(matches!(err, AppError::InvalidArgument(_)));
}

#[tokio::test]
async fn permissions_reflect_role_and_status() {
    let harness = Harness::new();
    let recipe = harness.published("Open Sandwich").await;

    let owner = harness
        .content
        .permissions(&harness.owner, recipe.id)
        .await
        .expect("owner");
    assert!(owner.view && owner.edit && owner.publish && owner.unsuspend);
    assert!(!owner.delete_recipe);

    let visitor = harness
        .content
        .permissions(&actor(Role::Visitor), recipe.id)
        .await
        .expect("visitor");
    assert!(visitor.view && visitor.comment);
    assert!(!visitor.interact && !visitor.edit && !visitor.moderate);
}
