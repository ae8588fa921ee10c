use axum::Json;
use sched_core::audit::{render_report, validate_lessons, AuditOptions};
use sched_core::config::resolve_or_default;
use sched_core::ScheduleError;
use serde::Deserialize;
use types::{Lesson, SchoolSettings, TeacherWorkload, ValidationReport, WeekGrid};
use utoipa::ToSchema;

use crate::error::ApiError;

/// Lessons to audit, as a flat list, a grid, or both.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateIn {
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub grid: Option<WeekGrid>,
    #[serde(default)]
    pub workloads: Vec<TeacherWorkload>,
    #[serde(default)]
    pub settings: Option<SchoolSettings>,
}

fn audit(input: &ValidateIn) -> Result<ValidationReport, ApiError> {
    let config = resolve_or_default(input.settings.as_ref()).map_err(ScheduleError::from)?;
    let opts = AuditOptions {
        weekly_capacity: config.weekly_capacity,
        lesson_minutes: input
            .settings
            .as_ref()
            .map_or(AuditOptions::default().lesson_minutes, |s| s.lesson_minutes),
        ..AuditOptions::default()
    };
    let lessons = input
        .lessons
        .iter()
        .chain(input.grid.iter().flat_map(|g| g.lessons()));
    Ok(validate_lessons(lessons, &input.workloads, &opts))
}

#[utoipa::path(
    post,
    path = "/v1/validate",
    request_body = ValidateIn,
    responses(
        (status = 200, description = "Conflicts, warnings and utilization", body = ValidationReport),
        (status = 422, description = "Malformed settings")
    )
)]
pub async fn validate_handler(
    Json(input): Json<ValidateIn>,
) -> Result<Json<ValidationReport>, ApiError> {
    audit(&input).map(Json)
}

#[utoipa::path(
    post,
    path = "/v1/validate/report",
    request_body = ValidateIn,
    responses(
        (status = 200, description = "Plain-text validation report", body = String, content_type = "text/plain")
    )
)]
pub async fn report_handler(Json(input): Json<ValidateIn>) -> Result<String, ApiError> {
    audit(&input).map(|r| render_report(&r))
}
