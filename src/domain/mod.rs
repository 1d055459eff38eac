//! Domain layer types and invariants.

pub mod actor;
pub mod analytics;
pub mod comments;
pub mod entities;
pub mod error;
pub mod lifecycle;
pub mod policy;
pub mod slug;
pub mod types;
