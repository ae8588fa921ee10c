use axum::Json;
use sched_core::config::resolve_or_default;
use sched_core::feasibility::{analyze_teacher, feasibility_issues};
use sched_core::requests::total_required;
use sched_core::ScheduleError;
use serde::{Deserialize, Serialize};
use types::{FeasibilityIssue, SchoolSettings, TeacherAnalysis, TeacherWorkload};
use utoipa::ToSchema;

use crate::error::ApiError;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeasibilityIn {
    pub workloads: Vec<TeacherWorkload>,
    #[serde(default)]
    pub settings: Option<SchoolSettings>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeasibilityOut {
    pub feasible: bool,
    pub required: u32,
    pub weekly_capacity: u32,
    pub issues: Vec<FeasibilityIssue>,
    pub teachers: Vec<TeacherAnalysis>,
}

/// Dry run of the pre-generation gate. Always 200; `feasible` says whether
/// generation would start.
#[utoipa::path(
    post,
    path = "/v1/feasibility",
    request_body = FeasibilityIn,
    responses(
        (status = 200, description = "Capacity check and per-teacher analysis", body = FeasibilityOut),
        (status = 422, description = "Malformed settings")
    )
)]
pub async fn check(Json(input): Json<FeasibilityIn>) -> Result<Json<FeasibilityOut>, ApiError> {
    let config = resolve_or_default(input.settings.as_ref()).map_err(ScheduleError::from)?;
    let issues = feasibility_issues(&input.workloads, &config);
    let teachers = input
        .workloads
        .iter()
        .map(|t| analyze_teacher(t, &config))
        .collect();
    Ok(Json(FeasibilityOut {
        feasible: issues.is_empty(),
        required: total_required(&input.workloads),
        weekly_capacity: config.weekly_capacity,
        issues,
        teachers,
    }))
}
