pub mod auth;

use axum::Json;
use axum::extract::Path;
use axum::routing::post;
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;
use tracing::info;

use crate::error::AppError;
use crate::models::*;
use crate::services::{
    DashboardService, EnrollOutcome, EnrollmentService, ProgressService, StartOutcome,
};
use crate::state::AppState;

pub use auth::{CurrentUser, USER_HEADER};

#[derive(Debug, Serialize)]
struct EnrollResponse {
    course_id: String,
    outcome: EnrollOutcome,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses).post(create_course))
        .route("/dashboard", get(dashboard))
        .route("/courses/{id}/enroll", post(enroll))
        .route("/courses/{id}/start", post(start_course))
        .route("/courses/{id}/complete", post(complete_course))
        .route("/courses/{id}/certify", post(certify_course))
        .route("/lessons/{id}", get(lesson_view))
        .route("/lessons/{id}/complete", post(complete_lesson))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    let courses = state.store.fetch_courses().await?;
    Ok(Json(courses))
}

async fn create_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<NewCourseRequest>
) -> Result<(StatusCode, Json<Course>), AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::BadRequest("title must not be empty".to_string()));
    }
    let course = state.store.insert_course(req).await?;
    info!("user {} created course {}", user.id(), course.id);
    Ok((StatusCode::CREATED, Json(course)))
}

async fn dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Dashboard>, AppError> {
    let dashboard = DashboardService::new(state.store.clone())
        .load(user.id())
        .await?;
    Ok(Json(dashboard))
}

async fn enroll(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>
) -> Result<(StatusCode, Json<EnrollResponse>), AppError> {
    let outcome = EnrollmentService::new(state.store.clone())
        .with_completion_policy(state.completion_policy)
        .enroll(user.id(), &id)
        .await?;
    let status = match outcome {
        EnrollOutcome::Enrolled => StatusCode::CREATED,
        EnrollOutcome::AlreadyEnrolled => StatusCode::OK,
    };
    Ok((status, Json(EnrollResponse { course_id: id, outcome })))
}

async fn start_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>
) -> Result<Json<StartOutcome>, AppError> {
    let outcome = EnrollmentService::new(state.store.clone())
        .with_completion_policy(state.completion_policy)
        .start(user.id(), &id)
        .await?;
    Ok(Json(outcome))
}

async fn complete_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>
) -> Result<Json<Enrollment>, AppError> {
    let enrollment = EnrollmentService::new(state.store.clone())
        .with_completion_policy(state.completion_policy)
        .mark_completed(user.id(), &id)
        .await?;
    Ok(Json(enrollment))
}

async fn certify_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>
) -> Result<Json<Enrollment>, AppError> {
    let enrollment = EnrollmentService::new(state.store.clone())
        .with_completion_policy(state.completion_policy)
        .certify(user.id(), &id)
        .await?;
    Ok(Json(enrollment))
}

async fn lesson_view(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>
) -> Result<Json<LessonView>, AppError> {
    let view = ProgressService::new(state.store.clone(), state.completion_policy)
        .lesson_view(user.id(), &id)
        .await?;
    Ok(Json(view))
}

async fn complete_lesson(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>
) -> Result<Json<LessonProgress>, AppError> {
    let progress = ProgressService::new(state.store.clone(), state.completion_policy)
        .complete_lesson(user.id(), &id)
        .await?;
    Ok(Json(progress))
}
