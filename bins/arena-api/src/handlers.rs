// HTTP route handlers for the Arena API

use arena_common::store::solved_summaries;
use arena_judge::JudgeError;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::{metrics, AppState};

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_seconds: u64,
}

fn parse_problem_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .map_err(|_| JudgeError::Validation(format!("Invalid problem id: {}", raw)).into())
}

/// Body rejections use the same error body as every other failure.
fn parse_body(
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<SubmitRequest, ApiError> {
    payload.map(|Json(request)| request).map_err(|rejection| {
        JudgeError::Validation(format!("Invalid request body: {}", rejection.body_text())).into()
    })
}

/// POST /submission/run/:problem_id - Run code against the visible test cases
pub async fn run_code(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(problem_id): Path<String>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let problem_id = parse_problem_id(&problem_id)?;
    let payload = parse_body(payload)?;
    let started = Instant::now();

    let report = state
        .orchestrator
        .run(problem_id, &payload.code, &payload.language)
        .await?;

    metrics::record_run(
        &report.language.to_string(),
        report.success,
        started.elapsed().as_secs_f64(),
    );
    tracing::info!(
        user_id = %user.id,
        problem_id = %problem_id,
        passed = report.passed_test_cases,
        total = report.total_test_cases,
        "Run completed"
    );

    Ok((StatusCode::CREATED, Json(report)))
}

/// POST /submission/submit/:problem_id - Grade code against the hidden test cases
pub async fn submit_code(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(problem_id): Path<String>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let problem_id = parse_problem_id(&problem_id)?;
    let payload = parse_body(payload)?;
    let started = Instant::now();

    let report = state
        .orchestrator
        .submit(user.id, problem_id, &payload.code, &payload.language)
        .await?;

    metrics::record_submission(
        &report.language.to_string(),
        &report.status.to_string(),
        started.elapsed().as_secs_f64(),
    );

    Ok((StatusCode::CREATED, Json(report)))
}

/// GET /submission/history/:problem_id - Caller's submissions, newest first
pub async fn submission_history(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(problem_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let problem_id = parse_problem_id(&problem_id)?;
    let submissions = state
        .orchestrator
        .store()
        .submissions_for(user.id, problem_id)
        .await?;
    Ok(Json(submissions))
}

/// GET /problem/solved - Summaries of every problem the caller has solved
pub async fn solved_problems(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let summaries =
        solved_summaries(state.orchestrator.store().as_ref(), &user.problem_solved).await?;
    Ok(Json(summaries))
}

/// GET /health - Liveness probe
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            uptime_seconds: state.start_time.elapsed().as_secs(),
        }),
    )
}

/// GET /metrics - Prometheus scrape endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}
