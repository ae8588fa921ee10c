use std::collections::{BTreeMap, BTreeSet};

use crate::ScheduleError;
use types::{
    ClassId, FeasibilityIssue, FeasibilityKind, ScheduleConfig, Shift, TeacherAnalysis,
    TeacherWorkload,
};

/// Active weekdays the teacher has not declared unavailable.
fn available_days(t: &TeacherWorkload, config: &ScheduleConfig) -> u8 {
    let off: BTreeSet<_> = t.prefs().unavailable_days.iter().copied().collect();
    config.active_days().filter(|d| !off.contains(d)).count() as u8
}

fn teacher_issues(
    t: &TeacherWorkload,
    config: &ScheduleConfig,
    out: &mut Vec<FeasibilityIssue>,
) {
    let total = t.total_periods();
    let prefs = t.prefs();

    if total > config.weekly_capacity {
        out.push(FeasibilityIssue {
            kind: FeasibilityKind::TeacherOverCapacity,
            entity: t.name.clone(),
            total,
            limit: config.weekly_capacity,
            message: format!(
                "teacher \"{}\" has {} periods but the week only has {} slots",
                t.name, total, config.weekly_capacity
            ),
        });
    }
    if let Some(max) = prefs.max_lessons_per_week {
        if total > max {
            out.push(FeasibilityIssue {
                kind: FeasibilityKind::TeacherOverWeeklyLimit,
                entity: t.name.clone(),
                total,
                limit: max,
                message: format!(
                    "teacher \"{}\" has {} periods but a weekly limit of {}",
                    t.name, total, max
                ),
            });
        }
    }
    if let Some(per_day) = prefs.max_lessons_per_day {
        let days = available_days(t, config);
        let limit = days as u32 * per_day as u32;
        if total > limit {
            out.push(FeasibilityIssue {
                kind: FeasibilityKind::TeacherOverAvailability,
                entity: t.name.clone(),
                total,
                limit,
                message: format!(
                    "teacher \"{}\" has {} periods but can teach at most {} ({} days x {} per day)",
                    t.name, total, limit, days, per_day
                ),
            });
        }
    }
}

/// Periods each teacher declares per class.
pub fn class_loads(workloads: &[TeacherWorkload]) -> BTreeMap<&ClassId, Vec<(&str, u32)>> {
    let mut loads: BTreeMap<&ClassId, Vec<(&str, u32)>> = BTreeMap::new();
    for t in workloads {
        for a in &t.allocations {
            for c in &a.class_ids {
                let entry = loads.entry(c).or_default();
                match entry.iter_mut().find(|(name, _)| *name == t.name) {
                    Some((_, n)) => *n = n.saturating_add(a.lessons_per_week),
                    None => entry.push((t.name.as_str(), a.lessons_per_week)),
                }
            }
        }
    }
    loads
}

/// Every capacity violation in the declared workloads, teachers first.
pub fn feasibility_issues(
    workloads: &[TeacherWorkload],
    config: &ScheduleConfig,
) -> Vec<FeasibilityIssue> {
    let mut issues = Vec::new();
    for t in workloads {
        teacher_issues(t, config, &mut issues);
    }
    for (class, teachers) in class_loads(workloads) {
        let total = teachers.iter().map(|(_, n)| *n).fold(0, u32::saturating_add);
        if total > config.weekly_capacity {
            let by_teacher = teachers
                .iter()
                .map(|(name, n)| format!("{name} {n}"))
                .collect::<Vec<_>>()
                .join(", ");
            issues.push(FeasibilityIssue {
                kind: FeasibilityKind::ClassOverCapacity,
                entity: class.0.clone(),
                total,
                limit: config.weekly_capacity,
                message: format!(
                    "class \"{}\" has {} periods ({}) but the week only has {} slots",
                    class, total, by_teacher, config.weekly_capacity
                ),
            });
        }
    }
    issues
}

/// Pre-flight gate: generation never starts when this fails.
pub fn check_workloads(
    workloads: &[TeacherWorkload],
    config: &ScheduleConfig,
) -> Result<(), ScheduleError> {
    let issues = feasibility_issues(workloads, config);
    if issues.is_empty() {
        Ok(())
    } else {
        tracing::warn!(issues = issues.len(), "workload rejected before generation");
        Err(ScheduleError::Feasibility(issues))
    }
}

/// Capacity breakdown for one teacher, with advisory warnings that do not
/// block generation.
pub fn analyze_teacher(t: &TeacherWorkload, config: &ScheduleConfig) -> TeacherAnalysis {
    let prefs = t.prefs();
    let total = t.total_periods();
    let days = available_days(t, config);
    let max_per_day = prefs
        .max_lessons_per_day
        .unwrap_or_else(|| config.max_daily_slots());
    let weekly_capacity = (days as u32 * max_per_day as u32).min(config.weekly_capacity);

    let mut conflicts = Vec::new();
    teacher_issues(t, config, &mut conflicts);
    let mut conflicts: Vec<String> = conflicts.into_iter().map(|i| i.message).collect();
    if prefs.max_lessons_per_day.is_none() && total > weekly_capacity {
        conflicts.push(format!(
            "{} periods do not fit in {} available days",
            total, days
        ));
    }

    let mut warnings = Vec::new();
    if prefs.preferred_shift == Some(Shift::Morning)
        && prefs
            .unavailable_slots
            .iter()
            .any(|r| config.shift_of(r.slot) == Shift::Morning)
    {
        warnings.push("prefers mornings but has unavailable morning slots".to_string());
    }
    if prefs.preferred_shift == Some(Shift::Afternoon) && config.afternoon_slot_count == 0 {
        warnings.push("prefers afternoons but the school has no afternoon shift".to_string());
    }
    if let Some(per_day) = prefs.max_lessons_per_day {
        if per_day > prefs.max_consecutive && prefs.max_consecutive > 0 {
            warnings.push(format!(
                "daily limit {} needs a break after every {} consecutive periods",
                per_day, prefs.max_consecutive
            ));
        }
    }

    TeacherAnalysis {
        teacher_id: t.teacher_id.clone(),
        name: t.name.clone(),
        total_lessons: total,
        available_days: days,
        max_per_day,
        weekly_capacity,
        has_conflicts: !conflicts.is_empty(),
        conflicts,
        warnings,
    }
}
