//! Bearer credential handling.

use axum::http::{header::AUTHORIZATION, HeaderMap};

use super::error::AppError;
use crate::api::UserId;
use crate::db::repository::FullRepository;

/// Token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively; a blank token counts as absent.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

/// Resolve the caller's identity, or `Ok(None)` when the credential is
/// missing or unknown.
pub async fn resolve_caller(
    repository: &dyn FullRepository,
    headers: &HeaderMap,
) -> Result<Option<UserId>, AppError> {
    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };
    Ok(repository.resolve_session(token).await?)
}

/// Resolve the caller or fail with 401.
pub async fn require_caller(
    repository: &dyn FullRepository,
    headers: &HeaderMap,
) -> Result<UserId, AppError> {
    resolve_caller(repository, headers)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))
}
