//! Shared domain enumerations aligned with persisted database enums.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Authority dimension carried by every actor. Variants are declared in
/// ascending tier order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "actor_role", rename_all = "snake_case")]
pub enum Role {
    Anonymous,
    Visitor,
    Viewer,
    Editor,
    SiteOwner,
    Admin,
    SuperUser,
    PlatformAdmin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Visitor => "visitor",
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::SiteOwner => "site_owner",
            Self::Admin => "admin",
            Self::SuperUser => "super_user",
            Self::PlatformAdmin => "platform_admin",
        }
    }

    /// All roles in ascending tier order.
    pub fn all() -> &'static [Role] {
        &[
            Self::Anonymous,
            Self::Visitor,
            Self::Viewer,
            Self::Editor,
            Self::SiteOwner,
            Self::Admin,
            Self::SuperUser,
            Self::PlatformAdmin,
        ]
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "content_status", rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    Published,
    Suspended,
    Archived,
}

impl ContentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Suspended => "suspended",
            Self::Archived => "archived",
        }
    }
}

impl Display for ContentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publishable unit kinds. Both share one lifecycle but differ in deletion rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "content_kind", rename_all = "snake_case")]
pub enum ContentKind {
    Recipe,
    BlogPost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "site_status", rename_all = "snake_case")]
pub enum SiteStatus {
    Active,
    Inactive,
    Suspended,
}

/// Interaction types accepted by the ledger.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "interaction_type", rename_all = "snake_case")]
pub enum InteractionType {
    Like,
    Dislike,
    Share,
    Print,
    Save,
    CopyIngredients,
    CopyUrl,
}

impl InteractionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
            Self::Share => "share",
            Self::Print => "print",
            Self::Save => "save",
            Self::CopyIngredients => "copy_ingredients",
            Self::CopyUrl => "copy_url",
        }
    }

    pub fn all() -> &'static [InteractionType] {
        &[
            Self::Like,
            Self::Dislike,
            Self::Share,
            Self::Print,
            Self::Save,
            Self::CopyIngredients,
            Self::CopyUrl,
        ]
    }

    /// The type that cannot coexist with `self` for one visitor on one item.
    pub fn exclusive_counterpart(self) -> Option<InteractionType> {
        match self {
            Self::Like => Some(Self::Dislike),
            Self::Dislike => Some(Self::Like),
            _ => None,
        }
    }

    pub fn is_toggle(self) -> bool {
        self.exclusive_counterpart().is_some()
    }
}

impl Display for InteractionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|candidate| candidate.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown interaction type `{s}`")))
    }
}

/// Which point of a visit produced a view record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "view_phase", rename_all = "snake_case")]
pub enum ViewPhase {
    /// Fired before any scroll or time data exists.
    PageLoad,
    /// Fired when the visitor leaves, carrying real engagement metrics.
    SessionEnd,
}
