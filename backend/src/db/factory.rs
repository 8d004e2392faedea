//! Repository factory for dependency injection.
//!
//! This module provides utilities for creating and configuring repository instances
//! based on runtime configuration.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use super::repo_config::RepositoryConfig;
use super::repositories::LocalRepository;
#[cfg(feature = "hosted-repo")]
use super::repositories::HostedRepository;
use super::repository::{FullRepository, RepositoryError, RepositoryResult};
use super::HostedConfig;

/// Repository type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// Managed backend-as-a-service over HTTP
    Hosted,
    /// In-memory local repository
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    /// Parse repository type from string ("hosted", "remote", "local").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hosted" | "remote" => Ok(Self::Hosted),
            "local" | "memory" => Ok(Self::Local),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

impl RepositoryType {
    /// Get repository type from environment variable.
    ///
    /// Reads `REPOSITORY_TYPE`. Without it, defaults to Hosted when
    /// `HUB_URL` is present, otherwise Local.
    pub fn from_env() -> Self {
        if let Ok(val) = std::env::var("REPOSITORY_TYPE") {
            return val.parse().unwrap_or(Self::Local);
        }

        if std::env::var("HUB_URL").is_ok() {
            Self::Hosted
        } else {
            Self::Local
        }
    }
}

/// Repository factory for creating repository instances.
///
/// # Example
/// ```ignore
/// use teacher_hub::db::{HostedConfig, RepositoryFactory, RepositoryType};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = HostedConfig::from_env()?;
///     let _hosted = RepositoryFactory::create(RepositoryType::Hosted, Some(&config)).await?;
///
///     let local_repo = RepositoryFactory::create_local();
///     Ok(())
/// }
/// ```
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create a repository instance based on type.
    ///
    /// # Arguments
    /// * `repo_type` - Type of repository to create
    /// * `hosted_config` - Connection settings (required for Hosted)
    pub async fn create(
        repo_type: RepositoryType,
        hosted_config: Option<&HostedConfig>,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        match repo_type {
            RepositoryType::Hosted => {
                #[cfg(feature = "hosted-repo")]
                {
                    let config = hosted_config.ok_or_else(|| {
                        RepositoryError::configuration(
                            "Hosted repository requires HostedConfig",
                        )
                    })?;
                    let hosted = Self::create_hosted(config)?;
                    Ok(hosted as Arc<dyn FullRepository>)
                }
                #[cfg(not(feature = "hosted-repo"))]
                {
                    let _ = hosted_config;
                    Err(RepositoryError::configuration(
                        "Hosted repository feature not enabled",
                    ))
                }
            }
            RepositoryType::Local => Ok(Self::create_local()),
        }
    }

    /// Create a hosted repository.
    #[cfg(feature = "hosted-repo")]
    pub fn create_hosted(config: &HostedConfig) -> RepositoryResult<Arc<HostedRepository>> {
        let repo = HostedRepository::new(config.clone())?;
        Ok(Arc::new(repo))
    }

    /// Create an in-memory local repository.
    pub fn create_local() -> Arc<dyn FullRepository> {
        Arc::new(LocalRepository::new())
    }

    /// Create repository from environment configuration.
    ///
    /// See [`RepositoryType::from_env`] for how the type is chosen.
    pub async fn from_env() -> RepositoryResult<Arc<dyn FullRepository>> {
        match RepositoryType::from_env() {
            RepositoryType::Hosted => {
                #[cfg(feature = "hosted-repo")]
                {
                    let config = HostedConfig::from_env().map_err(RepositoryError::configuration)?;
                    let hosted = Self::create_hosted(&config)?;
                    Ok(hosted as Arc<dyn FullRepository>)
                }
                #[cfg(not(feature = "hosted-repo"))]
                {
                    Err(RepositoryError::configuration(
                        "Hosted repository feature not enabled",
                    ))
                }
            }
            RepositoryType::Local => Ok(Self::create_local()),
        }
    }

    /// Create repository from a TOML configuration file.
    pub async fn from_config_file<P: AsRef<Path>>(
        config_path: P,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        let config = RepositoryConfig::from_file(config_path)?;
        Self::from_repository_config(&config).await
    }

    /// Create repository from a RepositoryConfig instance.
    pub async fn from_repository_config(
        config: &RepositoryConfig,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        let repo_type = config.repository_type().map_err(|e| {
            RepositoryError::configuration(format!("Invalid repository type: {}", e))
        })?;

        match repo_type {
            RepositoryType::Hosted => {
                let hosted = config.to_hosted_config()?;
                Self::create(RepositoryType::Hosted, hosted.as_ref()).await
            }
            RepositoryType::Local => Ok(Self::create_local()),
        }
    }
}

/// Builder for configuring repository creation.
///
/// # Example
/// ```ignore
/// use teacher_hub::db::{RepositoryBuilder, RepositoryType};
///
/// let repo = RepositoryBuilder::new()
///     .repository_type(RepositoryType::Local)
///     .build()
///     .await?;
/// ```
pub struct RepositoryBuilder {
    repo_type: RepositoryType,
    hosted_config: Option<HostedConfig>,
}

impl RepositoryBuilder {
    /// Create a new repository builder. The type defaults to
    /// [`RepositoryType::from_env`].
    pub fn new() -> Self {
        Self {
            repo_type: RepositoryType::from_env(),
            hosted_config: None,
        }
    }

    pub fn repository_type(mut self, repo_type: RepositoryType) -> Self {
        self.repo_type = repo_type;
        self
    }

    pub fn hosted_config(mut self, config: HostedConfig) -> Self {
        self.hosted_config = Some(config);
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env(mut self) -> Result<Self, RepositoryError> {
        self.repo_type = RepositoryType::from_env();

        if self.repo_type == RepositoryType::Hosted {
            #[cfg(feature = "hosted-repo")]
            {
                let config = HostedConfig::from_env().map_err(RepositoryError::configuration)?;
                self.hosted_config = Some(config);
            }
            #[cfg(not(feature = "hosted-repo"))]
            {
                return Err(RepositoryError::configuration(
                    "Hosted repository feature not enabled",
                ));
            }
        }

        Ok(self)
    }

    /// Load configuration from a TOML file.
    pub fn from_config_file<P: AsRef<Path>>(
        mut self,
        config_path: P,
    ) -> Result<Self, RepositoryError> {
        let repo_config = RepositoryConfig::from_file(config_path)?;

        self.repo_type = repo_config.repository_type().map_err(|e| {
            RepositoryError::configuration(format!("Invalid repository type: {}", e))
        })?;
        self.hosted_config = repo_config.to_hosted_config()?;

        Ok(self)
    }

    /// Build the repository instance.
    pub async fn build(self) -> RepositoryResult<Arc<dyn FullRepository>> {
        RepositoryFactory::create(self.repo_type, self.hosted_config.as_ref()).await
    }
}

impl Default for RepositoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_type_from_str() {
        assert_eq!(
            RepositoryType::from_str("local").unwrap(),
            RepositoryType::Local
        );
        assert_eq!(
            RepositoryType::from_str("hosted").unwrap(),
            RepositoryType::Hosted
        );
        assert_eq!(
            RepositoryType::from_str("Remote").unwrap(),
            RepositoryType::Hosted
        );
        assert!(RepositoryType::from_str("postgres").is_err());
    }

    #[tokio::test]
    async fn test_create_local_repository() {
        let repo = RepositoryFactory::create_local();
        assert!(repo.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_builder_local_repository() {
        let repo = RepositoryBuilder::new()
            .repository_type(RepositoryType::Local)
            .build()
            .await
            .unwrap();

        assert!(repo.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_hosted_without_config_is_rejected() {
        let result = RepositoryFactory::create(RepositoryType::Hosted, None).await;
        assert!(matches!(
            result,
            Err(RepositoryError::ConfigurationError { .. })
        ));
    }
}
