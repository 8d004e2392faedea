//! HTTP handlers for the REST API.
//!
//! Each handler resolves the calling teacher from the bearer credential and
//! delegates to the classroom service layer, which scopes every query to
//! that teacher.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use super::auth::require_caller;
use super::dto::{
    AttendanceDto, AttendanceListResponse, AttendanceQuery, AttendanceRequest,
    BehaviorNoteDto, BehaviorNoteListResponse, BehaviorNoteRequest, ClassroomDto,
    ClassroomListResponse, ClassroomRequest, GradeDto, GradeListResponse, GradeRequest,
    HealthResponse, MeResponse, StudentDto, StudentListResponse, StudentRequest,
};
use super::error::AppError;
use super::state::AppState;
use crate::api::{BehaviorNoteId, ClassroomId, GradeId, Role, StudentId};
use crate::db::services as db_services;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

fn parse_id<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {} ID: {}", what, raw)))
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Health check endpoint to verify the service is running and the store is reachable.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Caller
// =============================================================================

/// GET /v1/me
pub async fn get_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> HandlerResult<MeResponse> {
    let repo = state.repository.as_ref();
    let caller = require_caller(repo, &headers).await?;

    let roles = repo.list_roles(caller).await?;
    let email = repo.find_auth_user(caller).await?.and_then(|u| u.email);
    let profile = repo.fetch_profile(caller).await?;

    Ok(Json(MeResponse {
        user_id: caller,
        email,
        is_admin: roles.contains(&Role::Admin),
        roles,
        profile: profile.map(Into::into),
    }))
}

// =============================================================================
// Classrooms
// =============================================================================

/// GET /v1/classrooms
pub async fn list_classrooms(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> HandlerResult<ClassroomListResponse> {
    let teacher = require_caller(state.repository.as_ref(), &headers).await?;
    let classrooms: Vec<ClassroomDto> =
        db_services::list_classrooms(state.repository.as_ref(), teacher)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
    let total = classrooms.len();

    Ok(Json(ClassroomListResponse { classrooms, total }))
}

/// POST /v1/classrooms
pub async fn create_classroom(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ClassroomRequest>,
) -> Result<(StatusCode, Json<ClassroomDto>), AppError> {
    let teacher = require_caller(state.repository.as_ref(), &headers).await?;
    let classroom =
        db_services::create_classroom(state.repository.as_ref(), teacher, request.into()).await?;

    Ok((StatusCode::CREATED, Json(classroom.into())))
}

/// PUT /v1/classrooms/{classroom_id}
pub async fn update_classroom(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(classroom_id): Path<String>,
    Json(request): Json<ClassroomRequest>,
) -> HandlerResult<ClassroomDto> {
    let teacher = require_caller(state.repository.as_ref(), &headers).await?;
    let id: ClassroomId = parse_id(&classroom_id, "classroom")?;
    let classroom =
        db_services::update_classroom(state.repository.as_ref(), teacher, id, request.into())
            .await?;

    Ok(Json(classroom.into()))
}

/// DELETE /v1/classrooms/{classroom_id}
///
/// Also removes the classroom's students and their records.
pub async fn delete_classroom(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(classroom_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let teacher = require_caller(state.repository.as_ref(), &headers).await?;
    let id: ClassroomId = parse_id(&classroom_id, "classroom")?;
    db_services::delete_classroom(state.repository.as_ref(), teacher, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Students
// =============================================================================

/// GET /v1/classrooms/{classroom_id}/students
pub async fn list_students(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(classroom_id): Path<String>,
) -> HandlerResult<StudentListResponse> {
    let teacher = require_caller(state.repository.as_ref(), &headers).await?;
    let id: ClassroomId = parse_id(&classroom_id, "classroom")?;
    let students: Vec<StudentDto> = db_services::list_students(state.repository.as_ref(), teacher, id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let total = students.len();

    Ok(Json(StudentListResponse { students, total }))
}

/// POST /v1/classrooms/{classroom_id}/students
pub async fn create_student(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(classroom_id): Path<String>,
    Json(request): Json<StudentRequest>,
) -> Result<(StatusCode, Json<StudentDto>), AppError> {
    let teacher = require_caller(state.repository.as_ref(), &headers).await?;
    let id: ClassroomId = parse_id(&classroom_id, "classroom")?;
    let student =
        db_services::create_student(state.repository.as_ref(), teacher, id, request.into())
            .await?;

    Ok((StatusCode::CREATED, Json(student.into())))
}

/// PUT /v1/students/{student_id}
pub async fn update_student(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(student_id): Path<String>,
    Json(request): Json<StudentRequest>,
) -> HandlerResult<StudentDto> {
    let teacher = require_caller(state.repository.as_ref(), &headers).await?;
    let id: StudentId = parse_id(&student_id, "student")?;
    let student =
        db_services::update_student(state.repository.as_ref(), teacher, id, request.into())
            .await?;

    Ok(Json(student.into()))
}

/// DELETE /v1/students/{student_id}
pub async fn delete_student(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(student_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let teacher = require_caller(state.repository.as_ref(), &headers).await?;
    let id: StudentId = parse_id(&student_id, "student")?;
    db_services::delete_student(state.repository.as_ref(), teacher, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Attendance
// =============================================================================

/// GET /v1/classrooms/{classroom_id}/attendance?date=YYYY-MM-DD
pub async fn list_attendance(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(classroom_id): Path<String>,
    Query(query): Query<AttendanceQuery>,
) -> HandlerResult<AttendanceListResponse> {
    let teacher = require_caller(state.repository.as_ref(), &headers).await?;
    let id: ClassroomId = parse_id(&classroom_id, "classroom")?;
    let records: Vec<AttendanceDto> =
        db_services::list_attendance(state.repository.as_ref(), teacher, id, query.date)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

    Ok(Json(AttendanceListResponse {
        date: query.date,
        records,
    }))
}

/// POST /v1/attendance
///
/// Upsert on `(studentId, date)`.
pub async fn mark_attendance(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AttendanceRequest>,
) -> HandlerResult<AttendanceDto> {
    let teacher = require_caller(state.repository.as_ref(), &headers).await?;
    let record =
        db_services::mark_attendance(state.repository.as_ref(), teacher, request.into()).await?;

    Ok(Json(record.into()))
}

// =============================================================================
// Grades
// =============================================================================

/// GET /v1/classrooms/{classroom_id}/grades
pub async fn list_grades(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(classroom_id): Path<String>,
) -> HandlerResult<GradeListResponse> {
    let teacher = require_caller(state.repository.as_ref(), &headers).await?;
    let id: ClassroomId = parse_id(&classroom_id, "classroom")?;
    let grades: Vec<GradeDto> = db_services::list_grades(state.repository.as_ref(), teacher, id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let total = grades.len();

    Ok(Json(GradeListResponse { grades, total }))
}

/// POST /v1/grades
pub async fn record_grade(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GradeRequest>,
) -> Result<(StatusCode, Json<GradeDto>), AppError> {
    let teacher = require_caller(state.repository.as_ref(), &headers).await?;
    let grade =
        db_services::record_grade(state.repository.as_ref(), teacher, request.into()).await?;

    Ok((StatusCode::CREATED, Json(grade.into())))
}

/// DELETE /v1/grades/{grade_id}
pub async fn delete_grade(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(grade_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let teacher = require_caller(state.repository.as_ref(), &headers).await?;
    let id: GradeId = parse_id(&grade_id, "grade")?;
    db_services::delete_grade(state.repository.as_ref(), teacher, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Behavior Notes
// =============================================================================

/// GET /v1/students/{student_id}/behavior-notes
pub async fn list_behavior_notes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(student_id): Path<String>,
) -> HandlerResult<BehaviorNoteListResponse> {
    let teacher = require_caller(state.repository.as_ref(), &headers).await?;
    let id: StudentId = parse_id(&student_id, "student")?;
    let notes: Vec<BehaviorNoteDto> =
        db_services::list_behavior_notes(state.repository.as_ref(), teacher, id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
    let total = notes.len();

    Ok(Json(BehaviorNoteListResponse { notes, total }))
}

/// POST /v1/behavior-notes
pub async fn add_behavior_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<BehaviorNoteRequest>,
) -> Result<(StatusCode, Json<BehaviorNoteDto>), AppError> {
    let teacher = require_caller(state.repository.as_ref(), &headers).await?;
    let note =
        db_services::add_behavior_note(state.repository.as_ref(), teacher, request.into())
            .await?;

    Ok((StatusCode::CREATED, Json(note.into())))
}

/// DELETE /v1/behavior-notes/{note_id}
pub async fn delete_behavior_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(note_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let teacher = require_caller(state.repository.as_ref(), &headers).await?;
    let id: BehaviorNoteId = parse_id(&note_id, "behavior note")?;
    db_services::delete_behavior_note(state.repository.as_ref(), teacher, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
