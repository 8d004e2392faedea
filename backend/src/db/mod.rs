//! Data store access for the teacher hub.
//!
//! This module provides abstractions for store operations via the Repository pattern,
//! allowing different storage backends to be swapped easily.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Application Layer (edge functions, REST API)           │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (services.rs) - Business Logic           │
//! │  - Input validation                                     │
//! │  - Ownership checks across records                      │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Traits (repository/) - Abstract Interface   │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴──────────────────┐
//!     │                                  │
//! ┌───▼──────────────┐       ┌───────────▼──────────┐
//! │ Hosted Repository│       │  Local Repository    │
//! │ (REST over HTTP) │       │  (in-memory)         │
//! └──────────────────┘       └──────────────────────┘
//! ```
//!
//! # Recommended Usage
//!
//! ```ignore
//! use teacher_hub::db::{services, RepositoryFactory};
//!
//! async fn example(teacher: teacher_hub::api::UserId) -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = RepositoryFactory::from_env().await?;
//!     let classrooms = services::list_classrooms(repo.as_ref(), teacher).await?;
//!     Ok(())
//! }
//! ```

// Feature flag priority: hosted > local
// When both features are enabled, hosted is selected unless REPOSITORY_TYPE says otherwise.
#[cfg(not(any(feature = "hosted-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;
pub mod services;

// Hosted config is colocated with the repository implementation.
#[cfg(feature = "hosted-repo")]
pub use repositories::{HostedConfig, RequestStats};
#[cfg(not(feature = "hosted-repo"))]
#[derive(Debug, Clone)]
pub struct HostedConfig {
    _private: (),
}

// ==================== Service Layer ====================

pub use services::health_check;

// ==================== Repository Pattern Exports ====================

pub use repo_config::RepositoryConfig;

pub use factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
pub use repositories::LocalRepository;
#[cfg(feature = "hosted-repo")]
pub use repositories::HostedRepository;
pub use repository::{
    BroadcastRepository, ClassroomRepository, ErrorContext, FullRepository, IdentityRepository,
    RepositoryError, RepositoryResult,
};

use anyhow::{Context, Result};
use std::sync::{Arc, OnceLock};

/// Global repository instance initialized once per process.
static REPOSITORY: OnceLock<Arc<dyn FullRepository>> = OnceLock::new();

#[cfg(feature = "hosted-repo")]
fn create_selected_repository() -> RepositoryResult<Arc<dyn FullRepository>> {
    match RepositoryType::from_env() {
        RepositoryType::Hosted => {
            let config = HostedConfig::from_env().map_err(RepositoryError::configuration)?;
            let repo = RepositoryFactory::create_hosted(&config)?;
            Ok(repo as Arc<dyn FullRepository>)
        }
        RepositoryType::Local => Ok(RepositoryFactory::create_local()),
    }
}

#[cfg(not(feature = "hosted-repo"))]
fn create_selected_repository() -> RepositoryResult<Arc<dyn FullRepository>> {
    match RepositoryType::from_env() {
        RepositoryType::Hosted => Err(RepositoryError::configuration(
            "Hosted repository feature not enabled",
        )),
        RepositoryType::Local => Ok(RepositoryFactory::create_local()),
    }
}

/// Initialize the global repository singleton for the selected backend.
pub fn init_repository() -> Result<()> {
    if REPOSITORY.get().is_some() {
        return Ok(());
    }

    let repo = create_selected_repository()
        .map_err(|e| anyhow::Error::msg(e.to_string()))
        .context("Failed to initialize repository")?;
    let _ = REPOSITORY.set(repo);
    Ok(())
}

/// Get a reference to the global repository instance.
pub fn get_repository() -> Result<&'static Arc<dyn FullRepository>> {
    if REPOSITORY.get().is_none() {
        let _ = init_repository();
    }

    REPOSITORY
        .get()
        .context("Repository not initialized. Call init_repository() first.")
}
