use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sched_core::ScheduleError;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    Schedule(ScheduleError),
    JobNotFound(String),
    JobNotReady(&'static str),
    JobCancelled,
    JobFailed(String),
}

impl From<ScheduleError> for ApiError {
    fn from(e: ScheduleError) -> Self {
        ApiError::Schedule(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Schedule(e) => {
                let message = e.to_string();
                match e {
                    ScheduleError::Feasibility(issues) => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        json!({"error": "infeasible_workload", "message": message, "issues": issues}),
                    ),
                    ScheduleError::GenerationFailed(diagnostic) => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        json!({"error": "generation_failed", "message": message, "diagnostic": diagnostic}),
                    ),
                    ScheduleError::InvalidConfig(_) => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        json!({"error": "invalid_settings", "message": message}),
                    ),
                    ScheduleError::InvalidLock(_) => (
                        StatusCode::CONFLICT,
                        json!({"error": "invalid_lock", "message": message}),
                    ),
                    ScheduleError::Cancelled => (
                        StatusCode::REQUEST_TIMEOUT,
                        json!({"error": "cancelled", "message": message}),
                    ),
                    ScheduleError::Worker(_) => {
                        tracing::error!(%message, "generation worker failed");
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            json!({"error": "internal", "message": message}),
                        )
                    }
                }
            }
            ApiError::JobNotFound(id) => (
                StatusCode::NOT_FOUND,
                json!({"error": "not_found", "message": format!("no job {id}")}),
            ),
            ApiError::JobNotReady(status) => (
                StatusCode::CONFLICT,
                json!({"error": "not_ready", "status": status}),
            ),
            ApiError::JobCancelled => (
                StatusCode::GONE,
                json!({"error": "cancelled", "message": "job was cancelled"}),
            ),
            ApiError::JobFailed(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({"error": "job_failed", "message": message}),
            ),
        };
        (status, Json(body)).into_response()
    }
}
