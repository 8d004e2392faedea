//! Handlers for the server-side functions and the app-link descriptor.
//!
//! Request bodies are parsed leniently: a missing or malformed body reads as
//! empty fields, so the credential checks still run first and the caller
//! gets the documented error instead of a JSON rejection.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::{error, info};

use super::auth::bearer_token;
use super::dto::{
    DeleteTeacherRequest, ExtractNamesRequest, ExtractNamesResponse, SendBroadcastRequest,
    SendBroadcastResponse, SuccessResponse,
};
use super::error::function_error;
use super::state::AppState;
use crate::services::{broadcast, name_extraction::ImageInput, teacher_deletion};

fn lenient_body<T: DeserializeOwned + Default>(body: &Bytes) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

/// POST /functions/delete-teacher
///
/// Admin-only. Removes every row owned by `teacherUserId` and its identity.
pub async fn delete_teacher(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request: DeleteTeacherRequest = lenient_body(&body);

    match teacher_deletion::delete_teacher(
        state.repository.as_ref(),
        bearer_token(&headers),
        request.teacher_user_id.as_deref(),
    )
    .await
    {
        Ok(report) => {
            info!(
                teacher = %report.target,
                requested_by = %report.requested_by,
                rows = report.rows_deleted(),
                failed_tables = report.failed_tables().len(),
                identity_deleted = report.identity_deleted(),
                "teacher deletion finished"
            );
            Json(SuccessResponse { success: true }).into_response()
        }
        Err(e) => {
            if matches!(e, teacher_deletion::DeletionError::Internal(_)) {
                error!("teacher deletion failed: {}", e);
            }
            e.into_response()
        }
    }
}

/// POST /functions/send-broadcast
///
/// Sends broadcast `broadcastId` to every subscriber matching its filter.
pub async fn send_broadcast(State(state): State<AppState>, body: Bytes) -> Response {
    let request: SendBroadcastRequest = lenient_body(&body);

    let id = match broadcast::parse_broadcast_id(request.broadcast_id.as_deref()) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match broadcast::dispatch_broadcast(
        state.repository.as_ref(),
        state.mailer.as_ref(),
        &state.dispatch_guard,
        id,
    )
    .await
    {
        Ok(outcome) => Json(SendBroadcastResponse {
            success: true,
            sent_count: outcome.sent_count,
            failed_count: outcome.failed_count,
        })
        .into_response(),
        Err(e) => {
            if matches!(e, broadcast::BroadcastError::Internal(_)) {
                error!(broadcast = %id, "broadcast dispatch failed: {}", e);
            }
            e.into_response()
        }
    }
}

/// POST /functions/extract-student-names
///
/// Reads student names from a photographed class list.
pub async fn extract_student_names(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let caller = match bearer_token(&headers) {
        Some(token) => state.repository.resolve_session(token).await,
        None => Ok(None),
    };
    match caller {
        Ok(Some(_)) => {}
        Ok(None) => return function_error(StatusCode::UNAUTHORIZED, "Unauthorized"),
        Err(e) => return function_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }

    let request: ExtractNamesRequest = lenient_body(&body);
    let image = match ImageInput::new(request.image_base64, request.mime_type) {
        Ok(image) => image,
        Err(e) => return e.into_response(),
    };

    match state.extractor.extract_names(&image).await {
        Ok(names) => Json(ExtractNamesResponse { names }).into_response(),
        Err(e) => {
            error!("name extraction failed: {}", e);
            e.into_response()
        }
    }
}

/// GET /.well-known/apple-app-site-association
pub async fn apple_app_site_association(State(state): State<AppState>) -> Response {
    Json(state.app_links.as_ref().clone()).into_response()
}
