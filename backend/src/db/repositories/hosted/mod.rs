//! Hosted backend-as-a-service repository.
//!
//! Talks to the managed store over HTTP: PostgREST-style table endpoints
//! under `/rest/v1`, a role-check RPC, and the auth admin API under
//! `/auth/v1`. Privileged calls authenticate with the service-role key;
//! credential resolution forwards the caller's own token.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `HUB_URL`: Project base URL (required)
//! - `HUB_SERVICE_ROLE_KEY`: Service-role key (required)
//! - `HUB_ANON_KEY`: Public key sent as `apikey` when resolving user tokens
//!   (defaults to the service-role key)
//! - `HUB_TIMEOUT_SEC`: Per-request timeout in seconds (default: 20)
//! - `HUB_MAX_RETRIES`: Retry attempts for idempotent reads (default: 2)
//! - `HUB_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_RANGE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::db::repository::{ErrorContext, FullRepository, RepositoryError, RepositoryResult};

mod broadcast;
mod classroom;
mod identity;

/// Table holding broadcast jobs.
pub(crate) const BROADCASTS_TABLE: &str = "email_broadcasts";
/// Table holding subscription rows.
pub(crate) const SUBSCRIPTIONS_TABLE: &str = "subscriptions";

/// Configuration for connecting to the hosted store.
#[derive(Debug, Clone)]
pub struct HostedConfig {
    /// Project base URL, without trailing slash
    pub url: String,
    /// Service-role key for privileged access
    pub service_role_key: String,
    /// Public key used when forwarding end-user tokens
    pub anon_key: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_sec: u64,
    /// Retry attempts for idempotent reads
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for HostedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            service_role_key: String::new(),
            anon_key: None,
            timeout_sec: 20,
            max_retries: 2,
            retry_delay_ms: 100,
        }
    }
}

impl HostedConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let url = std::env::var("HUB_URL").map_err(|_| "HUB_URL must be set".to_string())?;
        let service_role_key = std::env::var("HUB_SERVICE_ROLE_KEY")
            .map_err(|_| "HUB_SERVICE_ROLE_KEY must be set".to_string())?;
        let anon_key = std::env::var("HUB_ANON_KEY").ok().filter(|k| !k.is_empty());

        let timeout_sec = std::env::var("HUB_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(20);

        let max_retries = std::env::var("HUB_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(2);

        let retry_delay_ms = std::env::var("HUB_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(100);

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            service_role_key,
            anon_key,
            timeout_sec,
            max_retries,
            retry_delay_ms,
        })
    }

    /// Create a configuration with a URL and service-role key.
    pub fn with_credentials(url: impl Into<String>, service_role_key: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            url: url.trim_end_matches('/').to_string(),
            service_role_key: service_role_key.into(),
            ..Default::default()
        }
    }

    fn public_key(&self) -> &str {
        self.anon_key.as_deref().unwrap_or(&self.service_role_key)
    }
}

/// Request statistics.
#[derive(Debug, Clone, Default)]
pub struct RequestStats {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub retried_requests: u64,
}

/// reqwest-backed repository for the hosted store.
#[derive(Clone, Debug)]
pub struct HostedRepository {
    client: Client,
    config: HostedConfig,
    total_requests: Arc<AtomicU64>,
    failed_requests: Arc<AtomicU64>,
    retried_requests: Arc<AtomicU64>,
}

/// Equality filter `column=eq.value`.
pub(crate) fn eq(column: &'static str, value: impl ToString) -> (&'static str, String) {
    (column, format!("eq.{}", value.to_string()))
}

impl HostedRepository {
    pub fn new(config: HostedConfig) -> RepositoryResult<Self> {
        if config.url.is_empty() || config.service_role_key.is_empty() {
            return Err(RepositoryError::configuration(
                "Hosted repository requires a URL and a service-role key",
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_sec))
            .build()
            .map_err(|e| {
                RepositoryError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self::with_client(config, client))
    }

    fn with_client(config: HostedConfig, client: Client) -> Self {
        Self {
            client,
            config,
            total_requests: Arc::new(AtomicU64::new(0)),
            failed_requests: Arc::new(AtomicU64::new(0)),
            retried_requests: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn stats(&self) -> RequestStats {
        RequestStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            retried_requests: self.retried_requests.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url, path)
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.url, path)
    }

    /// Attach service-role credentials.
    pub(crate) fn privileged(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.service_role_key)
            .bearer_auth(&self.config.service_role_key)
    }

    /// Attach the public key plus an end-user token.
    pub(crate) fn as_user(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request
            .header("apikey", self.config.public_key())
            .bearer_auth(token)
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Send a request once.
    pub(crate) async fn send(
        &self,
        request: RequestBuilder,
        context: ErrorContext,
    ) -> RepositoryResult<Response> {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        match request.send().await {
            Ok(response) => Ok(response),
            Err(e) => {
                self.failed_requests.fetch_add(1, Ordering::Relaxed);
                Err(with_context(RepositoryError::from(e), context))
            }
        }
    }

    /// Send an idempotent request, retrying retryable transport failures
    /// with exponential backoff.
    pub(crate) async fn send_idempotent<F>(
        &self,
        build: F,
        context: ErrorContext,
    ) -> RepositoryResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut delay = Duration::from_millis(self.config.retry_delay_ms);
        let mut attempt = 0;
        loop {
            match self.send(build(), context.clone()).await {
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    self.retried_requests.fetch_add(1, Ordering::Relaxed);
                    log::debug!(
                        "retrying {} (attempt {}): {}",
                        context.operation.as_deref().unwrap_or("request"),
                        attempt,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                other => return other,
            }
        }
    }

    /// Turn a non-2xx response into a `QueryError` carrying status and body.
    pub(crate) async fn ensure_success(
        &self,
        response: Response,
        context: ErrorContext,
    ) -> RepositoryResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<empty response>".to_string());
        Err(status_error(status, body.trim(), context))
    }

    /// `GET /rest/v1/{table}?select=*&filters...`
    pub(crate) async fn select<T: DeserializeOwned>(
        &self,
        operation: &str,
        table: &str,
        filters: &[(&str, String)],
    ) -> RepositoryResult<Vec<T>> {
        let context = ErrorContext::new(operation).with_entity(table);
        let url = self.rest_url(table);
        let response = self
            .send_idempotent(
                || {
                    self.privileged(self.client.get(&url))
                        .query(&[("select", "*")])
                        .query(filters)
                },
                context.clone(),
            )
            .await?;
        let response = self.ensure_success(response, context.clone()).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| with_context(RepositoryError::from(e), context))
    }

    pub(crate) async fn select_one<T: DeserializeOwned>(
        &self,
        operation: &str,
        table: &str,
        filters: &[(&str, String)],
    ) -> RepositoryResult<Option<T>> {
        let mut rows = self.select::<T>(operation, table, filters).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    /// `POST /rest/v1/{table}` returning the stored row. With `on_conflict`
    /// the insert becomes an upsert merging duplicates on those columns.
    pub(crate) async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        operation: &str,
        table: &str,
        row: &B,
        on_conflict: Option<&str>,
    ) -> RepositoryResult<T> {
        let context = ErrorContext::new(operation).with_entity(table);
        let mut request = self.privileged(self.client.post(self.rest_url(table))).json(row);
        request = match on_conflict {
            Some(columns) => request
                .query(&[("on_conflict", columns)])
                .header("Prefer", "resolution=merge-duplicates,return=representation"),
            None => request.header("Prefer", "return=representation"),
        };

        let response = self.send(request, context.clone()).await?;
        let response = self.ensure_success(response, context.clone()).await?;
        let mut rows: Vec<T> = response
            .json()
            .await
            .map_err(|e| with_context(RepositoryError::from(e), context.clone()))?;
        if rows.is_empty() {
            return Err(RepositoryError::internal_with_context(
                "Store returned no row for insert",
                context,
            ));
        }
        Ok(rows.swap_remove(0))
    }

    /// `PATCH /rest/v1/{table}?filters...` returning the updated rows.
    pub(crate) async fn update<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        operation: &str,
        table: &str,
        filters: &[(&str, String)],
        patch: &B,
    ) -> RepositoryResult<Vec<T>> {
        let context = ErrorContext::new(operation).with_entity(table);
        let request = self
            .privileged(self.client.patch(self.rest_url(table)))
            .query(filters)
            .header("Prefer", "return=representation")
            .json(patch);
        let response = self.send(request, context.clone()).await?;
        let response = self.ensure_success(response, context.clone()).await?;
        response
            .json()
            .await
            .map_err(|e| with_context(RepositoryError::from(e), context))
    }

    /// `DELETE /rest/v1/{table}?filters...` returning the number of rows
    /// removed (from `Content-Range`, 0 when the store does not report it).
    pub(crate) async fn delete(
        &self,
        operation: &str,
        table: &str,
        filters: &[(&str, String)],
    ) -> RepositoryResult<u64> {
        let context = ErrorContext::new(operation).with_entity(table);
        let request = self
            .privileged(self.client.delete(self.rest_url(table)))
            .query(filters)
            .header("Prefer", "return=minimal,count=exact");
        let response = self.send(request, context.clone()).await?;
        let response = self.ensure_success(response, context).await?;
        Ok(parse_content_range_total(
            response.headers().get(CONTENT_RANGE),
        ))
    }
}

#[async_trait]
impl FullRepository for HostedRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        let url = self.rest_url("");
        let response = self
            .send_idempotent(
                || self.privileged(self.client.get(&url)),
                ErrorContext::new("health_check"),
            )
            .await?;
        Ok(response.status().is_success())
    }
}

fn with_context(err: RepositoryError, context: ErrorContext) -> RepositoryError {
    match err {
        RepositoryError::ConnectionError { message, .. } => {
            RepositoryError::connection_with_context(message, context)
        }
        RepositoryError::TimeoutError { message, .. } => {
            RepositoryError::timeout_with_context(message, context)
        }
        RepositoryError::InternalError { message, .. } => {
            RepositoryError::internal_with_context(message, context)
        }
        other => RepositoryError::query_with_context(other.message().to_string(), context),
    }
}

pub(crate) fn status_error(status: StatusCode, body: &str, context: ErrorContext) -> RepositoryError {
    let context = context.with_details(format!("status={}", status.as_u16()));
    if status == StatusCode::NOT_FOUND {
        RepositoryError::not_found_with_context(body.to_string(), context)
    } else if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
        RepositoryError::timeout_with_context(body.to_string(), context)
    } else if status.is_server_error() {
        RepositoryError::QueryError {
            message: body.to_string(),
            context: context.retryable(),
        }
    } else {
        RepositoryError::query_with_context(body.to_string(), context)
    }
}

/// Parse the total from a `Content-Range` header such as `0-2/3` or `*/3`.
pub(crate) fn parse_content_range_total(header: Option<&HeaderValue>) -> u64 {
    header
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.rsplit('/').next())
        .and_then(|total| total.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

#[cfg(all(test, feature = "http-server"))]
mod wire_tests;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_range_total() {
        let header = HeaderValue::from_static("*/7");
        assert_eq!(parse_content_range_total(Some(&header)), 7);

        let header = HeaderValue::from_static("0-2/3");
        assert_eq!(parse_content_range_total(Some(&header)), 3);

        let header = HeaderValue::from_static("*/*");
        assert_eq!(parse_content_range_total(Some(&header)), 0);
        assert_eq!(parse_content_range_total(None), 0);
    }

    #[test]
    fn test_eq_filter() {
        assert_eq!(eq("teacher_id", "abc"), ("teacher_id", "eq.abc".to_string()));
    }

    #[test]
    fn test_status_error_mapping() {
        let err = status_error(StatusCode::NOT_FOUND, "gone", ErrorContext::new("op"));
        assert!(err.is_not_found());

        let err = status_error(StatusCode::BAD_GATEWAY, "upstream", ErrorContext::new("op"));
        assert!(err.is_retryable());

        let err = status_error(StatusCode::CONFLICT, "dup", ErrorContext::new("op"));
        assert!(matches!(err, RepositoryError::QueryError { .. }));
        assert!(!err.is_retryable());
        assert_eq!(err.context().details.as_deref(), Some("status=409"));
    }

    #[test]
    fn test_new_requires_credentials() {
        assert!(HostedRepository::new(HostedConfig::default()).is_err());
        let repo =
            HostedRepository::new(HostedConfig::with_credentials("https://x.example/", "key"))
                .unwrap();
        assert_eq!(repo.rest_url("grades"), "https://x.example/rest/v1/grades");
        assert_eq!(
            repo.auth_url("admin/users/1"),
            "https://x.example/auth/v1/admin/users/1"
        );
    }
}
