use axum::Json;
use sched_core::config::resolve;
use sched_core::ScheduleError;
use types::{ScheduleConfig, SchoolSettings};

use crate::error::ApiError;

#[utoipa::path(
    post,
    path = "/v1/config/resolve",
    request_body = SchoolSettings,
    responses(
        (status = 200, description = "Slots per day and weekly capacity", body = ScheduleConfig),
        (status = 422, description = "Malformed settings")
    )
)]
pub async fn resolve_settings(
    Json(settings): Json<SchoolSettings>,
) -> Result<Json<ScheduleConfig>, ApiError> {
    let config = resolve(&settings).map_err(ScheduleError::from)?;
    Ok(Json(config))
}
