pub mod config;
mod error;
pub mod state;
mod telemetry;
pub mod routes {
    pub mod feasibility;
    pub mod generate;
    pub mod health;
    pub mod jobs;
    pub mod settings;
    pub mod validate;
}

use axum::{
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use config::AppConfig;
pub use error::ApiError;
pub use state::AppState;

#[derive(OpenApi)]
#[openapi(
        paths(
            routes::health::health,
            routes::settings::resolve_settings,
            routes::feasibility::check,
            routes::generate::generate,
            routes::generate::enqueue,
            routes::jobs::status,
            routes::jobs::result,
            routes::jobs::cancel,
            routes::validate::validate_handler,
            routes::validate::report_handler,
        ),
        components(schemas(
            types::TeacherWorkload, types::Allocation, types::TeacherPreferences, types::Shift,
            types::SlotRef, types::Room, types::RoomKind, types::Lesson, types::WeekGrid,
            types::SchoolSettings, types::ClockTime, types::ScheduleConfig, types::Period,
            types::GenerateRequest, types::GenerationParams, types::GenerationOutcome,
            types::GenerationResult, types::GenerationDiagnostic, types::LessonRequest,
            types::UnplacedPeriods, types::ConflictedTeacher,
            types::FeasibilityIssue, types::FeasibilityKind, types::TeacherAnalysis,
            types::ValidationReport, types::ValidationStats, types::Conflict, types::ConflictKind,
            types::Severity, types::Warning, types::WarningKind, types::TeacherUtilization,
            types::SubjectCoverage,
            types::TeacherId, types::ClassId, types::RoomId, types::Subject,
            jobs::JobId, jobs::JobStatus,
            routes::generate::JobCreated,
            routes::feasibility::FeasibilityIn,
            routes::feasibility::FeasibilityOut,
            routes::validate::ValidateIn
        )),
        tags(
            (name = "timetable", description = "Weekly school timetable API")
        )
    )]
pub struct ApiDoc;

pub fn router(state: AppState, config: &AppConfig) -> Router {
    Router::new()
        .route("/v1/health", get(routes::health::health))
        .route("/v1/config/resolve", post(routes::settings::resolve_settings))
        .route("/v1/feasibility", post(routes::feasibility::check))
        .route("/v1/generate", post(routes::generate::generate))
        .route("/v1/jobs", post(routes::generate::enqueue))
        .route(
            "/v1/jobs/:id",
            get(routes::jobs::status).delete(routes::jobs::cancel),
        )
        .route("/v1/jobs/:id/result", get(routes::jobs::result))
        .route("/v1/validate", post(routes::validate::validate_handler))
        .route("/v1/validate/report", post(routes::validate::report_handler))
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(telemetry::stack(config.body_limit_bytes, config.request_timeout))
        .with_state(state)
}
