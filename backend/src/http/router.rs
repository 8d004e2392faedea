//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, tracing, body limit),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::functions;
use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Browser clients call the functions directly; preflight requests are answered here.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let function_routes = Router::new()
        .route("/delete-teacher", post(functions::delete_teacher))
        .route("/send-broadcast", post(functions::send_broadcast))
        .route(
            "/extract-student-names",
            post(functions::extract_student_names),
        );

    let api_v1 = Router::new()
        .route("/me", get(handlers::get_me))
        // Classrooms
        .route(
            "/classrooms",
            get(handlers::list_classrooms).post(handlers::create_classroom),
        )
        .route(
            "/classrooms/{classroom_id}",
            put(handlers::update_classroom).delete(handlers::delete_classroom),
        )
        // Students
        .route(
            "/classrooms/{classroom_id}/students",
            get(handlers::list_students).post(handlers::create_student),
        )
        .route(
            "/students/{student_id}",
            put(handlers::update_student).delete(handlers::delete_student),
        )
        // Attendance
        .route(
            "/classrooms/{classroom_id}/attendance",
            get(handlers::list_attendance),
        )
        .route("/attendance", post(handlers::mark_attendance))
        // Grades
        .route("/classrooms/{classroom_id}/grades", get(handlers::list_grades))
        .route("/grades", post(handlers::record_grade))
        .route("/grades/{grade_id}", delete(handlers::delete_grade))
        // Behavior notes
        .route(
            "/students/{student_id}/behavior-notes",
            get(handlers::list_behavior_notes),
        )
        .route("/behavior-notes", post(handlers::add_behavior_note))
        .route(
            "/behavior-notes/{note_id}",
            delete(handlers::delete_behavior_note),
        );

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/.well-known/apple-app-site-association",
            get(functions::apple_app_site_association),
        )
        .nest("/functions", function_routes)
        .nest("/v1", api_v1)
        // Class-list photos arrive base64-encoded in the JSON body.
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
