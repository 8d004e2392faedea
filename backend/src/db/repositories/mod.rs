//! Repository implementations module.
//!
//! This module contains the implementations of [`FullRepository`](crate::db::repository::FullRepository):
//! - `hosted`: the managed backend-as-a-service over HTTP (REST tables + auth admin API)
//! - `local`: In-memory implementation for unit testing and local development
pub mod local;
#[cfg(feature = "hosted-repo")]
pub mod hosted;

pub use local::LocalRepository;
#[cfg(feature = "hosted-repo")]
pub use hosted::{HostedConfig, HostedRepository, RequestStats};
