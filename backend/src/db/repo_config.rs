//! Repository configuration file support.
//!
//! This module provides utilities for reading repository configuration from
//! TOML configuration files.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use super::factory::RepositoryType;
use super::repository::RepositoryError;
use crate::db::HostedConfig;

/// Repository configuration from file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub repository: RepositorySettings,
    #[serde(default)]
    pub hosted: HostedSettings,
}

/// Repository type settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(rename = "type")]
    pub repo_type: String,
}

/// Hosted store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostedSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub service_role_key: String,
    #[serde(default)]
    pub anon_key: Option<String>,
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for HostedSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            service_role_key: String::new(),
            anon_key: None,
            timeout_sec: default_timeout_sec(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_timeout_sec() -> u64 {
    20
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    100
}

impl RepositoryConfig {
    /// Load repository configuration from a TOML file.
    ///
    /// # Returns
    /// * `Ok(RepositoryConfig)` if successful
    /// * `Err(RepositoryError)` if file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            RepositoryError::configuration(format!("Failed to read config file: {}", e))
        })?;

        let config: RepositoryConfig = toml::from_str(&content).map_err(|e| {
            RepositoryError::configuration(format!("Failed to parse config file: {}", e))
        })?;

        Ok(config)
    }

    /// Get the repository type from configuration.
    pub fn repository_type(&self) -> Result<RepositoryType, String> {
        RepositoryType::from_str(&self.repository.repo_type)
    }

    /// Convert to HostedConfig if this is a hosted configuration.
    #[cfg(feature = "hosted-repo")]
    pub fn to_hosted_config(&self) -> Result<Option<HostedConfig>, RepositoryError> {
        let repo_type = self.repository_type().map_err(|e| {
            RepositoryError::configuration(format!("Invalid repository type: {}", e))
        })?;

        if repo_type != RepositoryType::Hosted {
            return Ok(None);
        }

        if self.hosted.url.is_empty() || self.hosted.service_role_key.is_empty() {
            return Err(RepositoryError::configuration(
                "Hosted repository requires 'hosted.url' and 'hosted.service_role_key' settings",
            ));
        }

        Ok(Some(HostedConfig {
            url: self.hosted.url.trim_end_matches('/').to_string(),
            service_role_key: self.hosted.service_role_key.clone(),
            anon_key: self.hosted.anon_key.clone().filter(|k| !k.is_empty()),
            timeout_sec: self.hosted.timeout_sec,
            max_retries: self.hosted.max_retries,
            retry_delay_ms: self.hosted.retry_delay_ms,
        }))
    }

    /// Convert to HostedConfig when the feature is disabled.
    #[cfg(not(feature = "hosted-repo"))]
    pub fn to_hosted_config(&self) -> Result<Option<HostedConfig>, RepositoryError> {
        let repo_type = self.repository_type().map_err(|e| {
            RepositoryError::configuration(format!("Invalid repository type: {}", e))
        })?;

        if repo_type == RepositoryType::Hosted {
            return Err(RepositoryError::configuration(
                "Hosted repository feature not enabled",
            ));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_config() {
        let toml = r#"
[repository]
type = "local"
"#;

        let config: RepositoryConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.repository.repo_type, "local");
        assert_eq!(config.repository_type().unwrap(), RepositoryType::Local);
        assert!(config.to_hosted_config().unwrap().is_none());
    }

    #[test]
    fn test_hosted_settings_defaults() {
        let toml = r#"
[repository]
type = "hosted"

[hosted]
url = "https://project.example.co/"
"#;

        let config: RepositoryConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.hosted.timeout_sec, 20);
        assert_eq!(config.hosted.max_retries, 2);
        assert_eq!(config.hosted.retry_delay_ms, 100);
        assert!(config.hosted.anon_key.is_none());
    }

    #[cfg(feature = "hosted-repo")]
    #[test]
    fn test_parse_hosted_config() {
        let toml = r#"
[repository]
type = "hosted"

[hosted]
url = "https://project.example.co/"
service_role_key = "service-key"
anon_key = "anon-key"
timeout_sec = 5
max_retries = 4
retry_delay_ms = 250
"#;

        let config: RepositoryConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.repository_type().unwrap(), RepositoryType::Hosted);

        let hosted = config.to_hosted_config().unwrap().unwrap();
        assert_eq!(hosted.url, "https://project.example.co");
        assert_eq!(hosted.service_role_key, "service-key");
        assert_eq!(hosted.anon_key.as_deref(), Some("anon-key"));
        assert_eq!(hosted.timeout_sec, 5);
        assert_eq!(hosted.max_retries, 4);
        assert_eq!(hosted.retry_delay_ms, 250);
    }

    #[cfg(feature = "hosted-repo")]
    #[test]
    fn test_hosted_requires_credentials() {
        let toml = r#"
[repository]
type = "hosted"

[hosted]
url = "https://project.example.co"
"#;

        let config: RepositoryConfig = toml::from_str(toml).unwrap();
        assert!(config.to_hosted_config().is_err());
    }

    #[cfg(not(feature = "hosted-repo"))]
    #[test]
    fn test_hosted_rejected_without_feature() {
        let toml = r#"
[repository]
type = "hosted"
"#;

        let config: RepositoryConfig = toml::from_str(toml).unwrap();
        assert!(config.to_hosted_config().is_err());
    }
}
