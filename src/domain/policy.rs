//! Role-based permission policy.
//!
//! Every predicate here is a pure, total function of the actor, the resource
//! state and resource ownership. Services consult these before touching
//! storage; nothing in this module performs I/O.
//!
//! Tiers used throughout:
//!
//! * **highest**: `ADMIN`, `SUPER_USER`, `SITE_OWNER`, `PLATFORM_ADMIN`.
//!   Publishes, unsuspends, auto-approves comments.
//! * **trusted**: highest plus `EDITOR`. May suspend and moderate.
//! * **top-tier for a resource**: `ADMIN`, `SUPER_USER`, `PLATFORM_ADMIN`
//!   everywhere, `SITE_OWNER` only on its own site.
//!
//! `PLATFORM_ADMIN` counts as highest tier but is left out of
//! [`can_create_content`] on purpose: it governs sites, it does not author.
//!
//! `VISITOR` and `VIEWER` see exactly the same content. The only difference is
//! that a `VISITOR` account must be upgraded before it may interact.

use serde::Serialize;
use uuid::Uuid;

use super::actor::Actor;
use super::entities::{ContentRecord, SiteRecord};
use super::types::{ContentStatus, Role};

/// The slice of a content item that authorization depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentScope {
    pub status: ContentStatus,
    pub author_id: Uuid,
    /// Owner of the parent site, when known.
    pub site_owner_id: Option<Uuid>,
}

impl ContentScope {
    pub fn of(content: &ContentRecord, site: Option<&SiteRecord>) -> Self {
        Self {
            status: content.status,
            author_id: content.author_id,
            site_owner_id: site.map(|site| site.owner_id),
        }
    }
}

/// Role with unauthenticated actors collapsed to `ANONYMOUS`.
fn effective_role(actor: &Actor) -> Role {
    if actor.is_authenticated() {
        actor.role
    } else {
        Role::Anonymous
    }
}

fn is_highest_tier(role: Role) -> bool {
    matches!(
        role,
        Role::Admin | Role::SuperUser | Role::SiteOwner | Role::PlatformAdmin
    )
}

fn is_platform_staff(role: Role) -> bool {
    matches!(role, Role::Admin | Role::SuperUser | Role::PlatformAdmin)
}

fn is_top_tier_for(actor: &Actor, scope: &ContentScope) -> bool {
    match effective_role(actor) {
        role if is_platform_staff(role) => true,
        Role::SiteOwner => scope
            .site_owner_id
            .is_some_and(|owner| actor.owns(owner)),
        _ => false,
    }
}

pub fn can_create_content(actor: &Actor) -> bool {
    matches!(
        effective_role(actor),
        Role::Editor | Role::Admin | Role::SuperUser | Role::SiteOwner
    )
}

pub fn can_edit_content(actor: &Actor, scope: &ContentScope) -> bool {
    if is_top_tier_for(actor, scope) {
        return true;
    }
    actor.owns(scope.author_id)
        && (scope.status == ContentStatus::Draft || effective_role(actor) == Role::Editor)
}

/// Blog content is removed by the owner of its site or by top-tier staff.
///
/// Kept separate from [`can_delete_recipe`]: the two kinds have different
/// rules and must not be merged into one predicate.
pub fn can_delete_site_content(actor: &Actor, scope: &ContentScope) -> bool {
    is_top_tier_for(actor, scope) || scope.site_owner_id.is_some_and(|owner| actor.owns(owner))
}

/// Recipes are only removed by platform staff, whoever authored them.
pub fn can_delete_recipe(actor: &Actor) -> bool {
    is_platform_staff(effective_role(actor))
}

pub fn can_publish(actor: &Actor) -> bool {
    is_highest_tier(effective_role(actor))
}

pub fn can_suspend(actor: &Actor) -> bool {
    let role = effective_role(actor);
    is_highest_tier(role) || role == Role::Editor
}

pub fn can_unsuspend(actor: &Actor) -> bool {
    is_highest_tier(effective_role(actor))
}

pub fn can_view_content(actor: &Actor, scope: &ContentScope) -> bool {
    match scope.status {
        ContentStatus::Published => true,
        _ if !actor.is_authenticated() => false,
        ContentStatus::Draft => is_top_tier_for(actor, scope) || actor.owns(scope.author_id),
        ContentStatus::Suspended | ContentStatus::Archived => is_top_tier_for(actor, scope),
    }
}

pub fn can_interact(actor: &Actor) -> bool {
    !matches!(effective_role(actor), Role::Anonymous | Role::Visitor)
}

pub fn can_comment(actor: &Actor) -> bool {
    effective_role(actor) != Role::Anonymous
}

pub fn can_moderate_comments(actor: &Actor) -> bool {
    can_suspend(actor)
}

/// Comments from these actors are approved at submission time.
pub fn can_auto_approve(actor: &Actor) -> bool {
    is_highest_tier(effective_role(actor))
}

pub fn default_status_for(actor: &Actor) -> ContentStatus {
    if is_highest_tier(effective_role(actor)) {
        ContentStatus::Published
    } else {
        ContentStatus::Draft
    }
}

/// Everything an actor may do with one content item, for rendering controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Permissions {
    pub view: bool,
    pub edit: bool,
    pub publish: bool,
    pub suspend: bool,
    pub unsuspend: bool,
    pub delete_site_content: bool,
    pub delete_recipe: bool,
    pub interact: bool,
    pub comment: bool,
    pub moderate: bool,
}

impl Permissions {
    pub fn for_content(actor: &Actor, scope: &ContentScope) -> Self {
        let view = can_view_content(actor, scope);
        Self {
            view,
            edit: view && can_edit_content(actor, scope),
            publish: view && can_publish(actor),
            suspend: view && can_suspend(actor),
            unsuspend: view && can_unsuspend(actor),
            delete_site_content: view && can_delete_site_content(actor, scope),
            delete_recipe: view && can_delete_recipe(actor),
            interact: view && can_interact(actor),
            comment: view && can_comment(actor),
            moderate: view && can_moderate_comments(actor),
        }
    }
}
