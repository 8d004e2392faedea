//! Application configuration.
//!
//! Settings come from `teacher-hub.toml` when one is found, and environment
//! variables override individual fields:
//!
//! | variable          | field                |
//! |-------------------|----------------------|
//! | `HOST`            | `server.host`        |
//! | `PORT`            | `server.port`        |
//! | `EMAIL_API_URL`   | `email.api_url`      |
//! | `EMAIL_API_KEY`   | `email.api_key`      |
//! | `EMAIL_FROM`      | `email.from`         |
//! | `AI_API_URL`      | `ai.api_url`         |
//! | `AI_API_KEY`      | `ai.api_key`         |
//! | `AI_MODEL`        | `ai.model`           |
//! | `APP_LINK_APP_ID` | `app_links.app_id`   |
//!
//! Repository selection has its own settings, see [`crate::db::RepositoryConfig`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name searched for by [`AppConfig::from_default_location`].
pub const CONFIG_FILE_NAME: &str = "teacher-hub.toml";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub email: EmailSettings,
    #[serde(default)]
    pub ai: AiSettings,
    #[serde(default)]
    pub app_links: AppLinkSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Transactional email provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailSettings {
    #[serde(default = "default_email_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_email_from")]
    pub from: String,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            api_url: default_email_api_url(),
            api_key: String::new(),
            from: default_email_from(),
        }
    }
}

/// OpenAI-compatible chat-completions endpoint used for name extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiSettings {
    #[serde(default = "default_ai_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            api_url: default_ai_api_url(),
            api_key: String::new(),
            model: default_ai_model(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppLinkSettings {
    /// `<team id>.<bundle id>` of the iOS app.
    #[serde(default = "default_app_id")]
    pub app_id: String,
}

impl Default for AppLinkSettings {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_email_api_url() -> String {
    "https://api.resend.com/emails".to_string()
}

fn default_email_from() -> String {
    "Teacher Hub <noreply@teacherhub.app>".to_string()
}

fn default_ai_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_ai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_app_id() -> String {
    "TEAMID.app.teacherhub".to_string()
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load `teacher-hub.toml` from the first standard location that has one.
    ///
    /// Searches, in order:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    ///
    /// Returns `Ok(None)` when no file exists.
    pub fn from_default_location() -> Result<Option<Self>, ConfigError> {
        let search_paths = [
            PathBuf::from(CONFIG_FILE_NAME),
            PathBuf::from("backend").join(CONFIG_FILE_NAME),
            PathBuf::from("..").join(CONFIG_FILE_NAME),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path).map(Some);
            }
        }
        Ok(None)
    }

    /// Defaults overridden by environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// File settings (when a file is found) overridden by the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_default_location()?.unwrap_or_default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("PORT") {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "PORT".to_string(),
                value: port.clone(),
            })?;
        }

        if let Some(url) = get("EMAIL_API_URL") {
            self.email.api_url = url;
        }
        if let Some(key) = get("EMAIL_API_KEY") {
            self.email.api_key = key;
        }
        if let Some(from) = get("EMAIL_FROM") {
            self.email.from = from;
        }

        if let Some(url) = get("AI_API_URL") {
            self.ai.api_url = url;
        }
        if let Some(key) = get("AI_API_KEY") {
            self.ai.api_key = key;
        }
        if let Some(model) = get("AI_MODEL") {
            self.ai.model = model;
        }

        if let Some(app_id) = get("APP_LINK_APP_ID") {
            self.app_links.app_id = app_id;
        }

        Ok(())
    }

    /// `host:port` for binding the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
