pub mod audit;
pub mod cancel;
pub mod config;
pub mod constraints;
mod error;
pub mod feasibility;
pub mod requests;
pub mod rooms;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

pub use cancel::{CancelOnDrop, CancelToken};
pub use error::{ConfigError, ScheduleError};
pub use types::{
    ClassId, GenerateRequest, GenerationOutcome, GenerationParams, Lesson, Room, ScheduleConfig,
    SchoolSettings, Subject, TeacherId, TeacherWorkload, WeekGrid,
};

/// Checks manually placed lessons before they are seeded into a run: each
/// must sit in a real period, collide with no other lock, and match an
/// allocation of its teacher.
pub fn validate_locks(
    locked: &[Lesson],
    workloads: &[TeacherWorkload],
    config: &ScheduleConfig,
) -> Result<(), ScheduleError> {
    let mut errors: Vec<String> = Vec::new();

    let by_id: HashMap<&TeacherId, &TeacherWorkload> =
        workloads.iter().map(|t| (&t.teacher_id, t)).collect();
    let mut classes = HashSet::new();
    let mut teachers = HashSet::new();
    // Lock count per (teacher, subject, class) against the declared periods.
    let mut used: HashMap<(&TeacherId, &Subject, &ClassId), u32> = HashMap::new();

    for l in locked {
        let at = format!("{} {} day {} slot {}", l.teacher_id, l.class_id, l.day, l.slot);
        if !config.is_valid(l.day, l.slot) {
            errors.push(format!("{at}: no such period"));
            continue;
        }
        if !classes.insert((&l.class_id, l.day, l.slot)) {
            errors.push(format!("{at}: class already has a locked lesson then"));
        }
        if !teachers.insert((&l.teacher_id, l.day, l.slot)) {
            errors.push(format!("{at}: teacher already has a locked lesson then"));
        }

        let Some(t) = by_id.get(&l.teacher_id) else {
            errors.push(format!("{at}: unknown teacher"));
            continue;
        };
        let declared: u32 = t
            .allocations
            .iter()
            .filter(|a| a.subject == l.subject && a.class_ids.contains(&l.class_id))
            .map(|a| a.lessons_per_week)
            .fold(0, u32::saturating_add);
        let n = used.entry((&l.teacher_id, &l.subject, &l.class_id)).or_default();
        *n += 1;
        if *n > declared {
            errors.push(format!(
                "{at}: {} has only {} {} periods for this class",
                t.name, declared, l.subject
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ScheduleError::InvalidLock(errors.join("; ")))
    }
}

#[async_trait]
pub trait Solver: Send + Sync + 'static {
    async fn solve(
        &self,
        req: GenerateRequest,
        cancel: CancelToken,
    ) -> Result<GenerationOutcome, ScheduleError>;
}
