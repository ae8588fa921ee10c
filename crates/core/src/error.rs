use thiserror::Error;
use types::{FeasibilityIssue, GenerationDiagnostic};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} is not a valid HH:MM time: {value:?}")]
    BadTime { field: &'static str, value: String },
    #[error("{shift} shift ends at {end} but starts at {start}")]
    EmptyShift {
        shift: &'static str,
        start: String,
        end: String,
    },
    #[error("lessonMinutes must be positive")]
    ZeroLessonLength,
    #[error("activeDays {0:#07b} marks days outside Monday..Friday")]
    BadDayMask(u8),
    #[error("maxMorningLessons + maxAfternoonLessons is {0}, more than the 255 periods a day can hold")]
    TooManyPeriods(u16),
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("workload is infeasible: {}", summarize(.0))]
    Feasibility(Vec<FeasibilityIssue>),
    #[error(
        "generation failed: best completion {:.1}% of {} periods after {} attempts",
        .0.best_rate,
        .0.required,
        .0.attempts_used
    )]
    GenerationFailed(GenerationDiagnostic),
    #[error("invalid school settings: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("invalid locked lesson: {0}")]
    InvalidLock(String),
    #[error("generation stopped before any attempt completed")]
    Cancelled,
    #[error("generation worker failed: {0}")]
    Worker(String),
}

fn summarize(issues: &[FeasibilityIssue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
