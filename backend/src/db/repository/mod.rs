//! Repository traits for the external data store.
//!
//! The store is split into three concerns that every backend implements:
//! - [`IdentityRepository`]: sessions, roles, profiles, the deletion cascade
//! - [`BroadcastRepository`]: broadcast jobs and their recipients
//! - [`ClassroomRepository`]: classrooms, students, attendance, grades, notes
//!
//! [`FullRepository`] bundles them so handlers can hold a single
//! `Arc<dyn FullRepository>`.

use async_trait::async_trait;

pub mod broadcast;
pub mod classroom;
pub mod error;
pub mod identity;

pub use broadcast::BroadcastRepository;
pub use classroom::ClassroomRepository;
pub use error::{ErrorContext, RepositoryError, RepositoryResult};
pub use identity::IdentityRepository;

/// Every capability the service needs from the store.
#[async_trait]
pub trait FullRepository: IdentityRepository + BroadcastRepository + ClassroomRepository {
    /// Check that the store is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;
}
