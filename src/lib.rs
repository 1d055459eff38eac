//! Content governance and interaction engine for a multi-tenant publishing
//! platform.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
