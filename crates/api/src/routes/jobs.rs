use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use jobs::JobStatus;
use sched_core::ScheduleError;
use types::GenerationOutcome;

#[utoipa::path(
        get,
        path = "/v1/jobs/{id}",
        params(("id" = String, Path, description = "Job ID")),
        responses(
            (status = 200, description = "Job status", body = jobs::JobStatus),
            (status = 404, description = "Unknown job")
        )
    )]
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobStatus>, ApiError> {
    state
        .jobs
        .get(&id)
        .map(Json)
        .ok_or(ApiError::JobNotFound(id))
}

#[utoipa::path(
        get,
        path = "/v1/jobs/{id}/result",
        params(("id" = String, Path, description = "Job ID")),
        responses(
            (status = 200, description = "Generated timetable", body = GenerationOutcome),
            (status = 404, description = "Unknown job"),
            (status = 409, description = "Job still queued or running"),
            (status = 410, description = "Job was cancelled"),
            (status = 422, description = "Job finished without an accepted timetable")
        )
    )]
pub async fn result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GenerationOutcome>, ApiError> {
    match state.jobs.get(&id) {
        None => Err(ApiError::JobNotFound(id)),
        Some(JobStatus::Generated { outcome }) => Ok(Json(outcome)),
        Some(JobStatus::Queued) => Err(ApiError::JobNotReady("queued")),
        Some(JobStatus::Running) => Err(ApiError::JobNotReady("running")),
        Some(JobStatus::Cancelled) => Err(ApiError::JobCancelled),
        Some(JobStatus::Rejected { issues }) => Err(ScheduleError::Feasibility(issues).into()),
        Some(JobStatus::Failed {
            diagnostic: Some(d),
            ..
        }) => Err(ScheduleError::GenerationFailed(d).into()),
        Some(JobStatus::Failed { message, .. }) => Err(ApiError::JobFailed(message)),
    }
}

#[utoipa::path(
        delete,
        path = "/v1/jobs/{id}",
        params(("id" = String, Path, description = "Job ID")),
        responses(
            (status = 200, description = "Status after the cancellation request", body = jobs::JobStatus),
            (status = 404, description = "Unknown job")
        )
    )]
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobStatus>, ApiError> {
    state
        .jobs
        .cancel(&id)
        .map(Json)
        .ok_or(ApiError::JobNotFound(id))
}
