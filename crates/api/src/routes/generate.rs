use crate::error::ApiError;
use crate::state::AppState;
use axum::{extract::State, Json};
use sched_core::{CancelToken, ScheduleError, Solver};
use types::{GenerateRequest, GenerationOutcome};
use utoipa::ToSchema;

#[derive(serde::Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobCreated {
    pub job_id: String,
    pub status: &'static str,
}

#[utoipa::path(
    post,
    path = "/v1/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Accepted timetable", body = GenerationOutcome),
        (status = 409, description = "Locked lessons are inconsistent"),
        (status = 422, description = "Infeasible workload, malformed settings or completion below threshold")
    )
)]
pub async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerationOutcome>, ApiError> {
    let outcome = solve_while_awaited(state.jobs.solver(), req).await?;
    Ok(Json(outcome))
}

/// Runs a generation that stops once the caller stops waiting for it: a
/// request timeout or a closed connection drops this future and trips the
/// token the blocking run polls.
async fn solve_while_awaited<S: Solver + ?Sized>(
    solver: &S,
    req: GenerateRequest,
) -> Result<GenerationOutcome, ScheduleError> {
    let cancel = CancelToken::new();
    let _guard = cancel.drop_guard();
    solver.solve(req, cancel.clone()).await
}

#[utoipa::path(
    post,
    path = "/v1/jobs",
    request_body = GenerateRequest,
    responses((status = 200, description = "Job enqueued", body = JobCreated))
)]
pub async fn enqueue(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Json<JobCreated> {
    let id = state.jobs.enqueue(req);
    Json(JobCreated {
        job_id: id.0,
        status: "queued",
    })
}
