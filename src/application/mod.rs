//! Application services over the repository traits.

pub mod analytics;
pub mod clock;
pub mod content;
pub mod enrichment;
pub mod error;
pub mod interactions;
pub mod moderation;
pub mod repos;
pub mod storage;
pub(crate) mod visibility;
