use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;

use types::{
    day_name, ClassId, Conflict, ConflictKind, Day, Lesson, Severity, Slot, Subject,
    SubjectCoverage, TeacherId, TeacherUtilization, TeacherWorkload, ValidationReport,
    ValidationStats, WeekGrid, Warning, WarningKind,
};

/// Utilization capacity inputs. Defaults match the default school week.
#[derive(Clone, Debug)]
pub struct AuditOptions {
    pub weekly_capacity: u32,
    pub lesson_minutes: u32,
    /// Runs of this many same-subject periods are flagged.
    pub consecutive_limit: usize,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            weekly_capacity: 34,
            lesson_minutes: 50,
            consecutive_limit: 3,
        }
    }
}

pub fn validate_schedule(grid: &WeekGrid, workloads: &[TeacherWorkload]) -> ValidationReport {
    validate_lessons(grid.lessons(), workloads, &AuditOptions::default())
}

/// Audits raw lesson records. Unlike a `WeekGrid`, a record list can hold two
/// lessons for one class in the same period, so both double-booking kinds
/// are checked.
pub fn validate_lessons<'a>(
    lessons: impl IntoIterator<Item = &'a Lesson>,
    workloads: &[TeacherWorkload],
    opts: &AuditOptions,
) -> ValidationReport {
    let lessons: Vec<&Lesson> = lessons.into_iter().collect();
    let names: HashMap<&TeacherId, &str> = workloads
        .iter()
        .map(|t| (&t.teacher_id, t.name.as_str()))
        .collect();
    let name_of = |id: &TeacherId| -> String {
        names.get(id).map(|n| n.to_string()).unwrap_or_else(|| id.0.clone())
    };

    let mut conflicts = teacher_double_bookings(&lessons, &name_of);
    conflicts.extend(class_double_bookings(&lessons, &name_of));

    let mut warnings = consecutive_runs(&lessons, opts.consecutive_limit);
    let consecutive_violations = warnings.len() as u32;

    let teacher_utilization = utilization(&lessons, workloads, opts);
    let subject_coverage = coverage(&lessons, workloads);
    for c in subject_coverage.iter().filter(|c| c.covered < c.total) {
        warnings.push(Warning {
            kind: WarningKind::IncompleteCoverage,
            description: format!(
                "{}: {}/{} classes ({}%), {} without a teacher",
                c.subject,
                c.covered,
                c.total,
                c.percentage,
                c.total - c.covered
            ),
            class_id: None,
            day: None,
            subject: Some(c.subject.clone()),
            first_slot: None,
            last_slot: None,
        });
    }

    let valid = !conflicts.iter().any(|c| c.severity == Severity::Critical);
    ValidationReport {
        valid,
        conflicts,
        warnings,
        stats: ValidationStats {
            total_lessons: lessons.len() as u32,
            teacher_utilization,
            subject_coverage,
            consecutive_violations,
        },
    }
}

fn period(day: Day, slot: Slot) -> String {
    format!("{} period {}", day_name(day), u16::from(slot) + 1)
}

fn teacher_double_bookings(
    lessons: &[&Lesson],
    name_of: &dyn Fn(&TeacherId) -> String,
) -> Vec<Conflict> {
    let mut seen: HashMap<(&TeacherId, Day, Slot), &ClassId> = HashMap::new();
    let mut out = Vec::new();
    for l in lessons {
        match seen.get(&(&l.teacher_id, l.day, l.slot)) {
            Some(&first) if first != &l.class_id => {
                let name = name_of(&l.teacher_id);
                out.push(Conflict {
                    kind: ConflictKind::TeacherDoubleBooking,
                    severity: Severity::Critical,
                    description: format!(
                        "{} teaches {} and {} at the same time ({})",
                        name,
                        first,
                        l.class_id,
                        period(l.day, l.slot)
                    ),
                    day: l.day,
                    slot: l.slot,
                    teacher_id: Some(l.teacher_id.clone()),
                    class_id: None,
                    classes: vec![first.clone(), l.class_id.clone()],
                    teachers: vec![name],
                });
            }
            Some(_) => {}
            None => {
                seen.insert((&l.teacher_id, l.day, l.slot), &l.class_id);
            }
        }
    }
    out
}

fn class_double_bookings(
    lessons: &[&Lesson],
    name_of: &dyn Fn(&TeacherId) -> String,
) -> Vec<Conflict> {
    let mut seen: HashMap<(&ClassId, Day, Slot), &TeacherId> = HashMap::new();
    let mut out = Vec::new();
    for l in lessons {
        match seen.get(&(&l.class_id, l.day, l.slot)) {
            Some(&first) if first != &l.teacher_id => {
                let (a, b) = (name_of(first), name_of(&l.teacher_id));
                out.push(Conflict {
                    kind: ConflictKind::ClassDoubleBooking,
                    severity: Severity::Critical,
                    description: format!(
                        "class {} has {} and {} at the same time ({})",
                        l.class_id,
                        a,
                        b,
                        period(l.day, l.slot)
                    ),
                    day: l.day,
                    slot: l.slot,
                    teacher_id: None,
                    class_id: Some(l.class_id.clone()),
                    classes: vec![],
                    teachers: vec![a, b],
                });
            }
            Some(_) => {}
            None => {
                seen.insert((&l.class_id, l.day, l.slot), &l.teacher_id);
            }
        }
    }
    out
}

/// One warning per maximal same-subject run of at least `limit` periods.
fn consecutive_runs(lessons: &[&Lesson], limit: usize) -> Vec<Warning> {
    let mut by_class_day: BTreeMap<(&ClassId, Day), BTreeMap<Slot, &Subject>> = BTreeMap::new();
    for l in lessons {
        by_class_day
            .entry((&l.class_id, l.day))
            .or_default()
            .entry(l.slot)
            .or_insert(&l.subject);
    }

    let mut out = Vec::new();
    for ((class, day), slots) in by_class_day {
        let slots: Vec<(Slot, &Subject)> = slots.into_iter().collect();
        let mut i = 0;
        while i < slots.len() {
            let (first, subject) = slots[i];
            let mut j = i + 1;
            while j < slots.len()
                && slots[j].1 == subject
                && u16::from(slots[j].0) == u16::from(slots[j - 1].0) + 1
            {
                j += 1;
            }
            let last = slots[j - 1].0;
            if j - i >= limit {
                out.push(Warning {
                    kind: WarningKind::ConsecutiveLimit,
                    description: format!(
                        "{} on {}: {} periods of {} in a row (periods {}-{})",
                        class,
                        day_name(day),
                        j - i,
                        subject,
                        u16::from(first) + 1,
                        u16::from(last) + 1
                    ),
                    class_id: Some(class.clone()),
                    day: Some(day),
                    subject: Some(subject.clone()),
                    first_slot: Some(first),
                    last_slot: Some(last),
                });
            }
            i = j;
        }
    }
    out
}

fn utilization(
    lessons: &[&Lesson],
    workloads: &[TeacherWorkload],
    opts: &AuditOptions,
) -> Vec<TeacherUtilization> {
    let mut used: HashMap<&TeacherId, u32> = HashMap::new();
    for l in lessons {
        *used.entry(&l.teacher_id).or_default() += 1;
    }
    workloads
        .iter()
        .map(|t| {
            // Monthly hours over four weeks, in lesson-length periods.
            let capacity = match t.workload_monthly {
                Some(hours) => hours.saturating_mul(60) / 4 / opts.lesson_minutes.max(1),
                None => t.total_periods(),
            }
            .min(opts.weekly_capacity);
            let used = used.get(&t.teacher_id).copied().unwrap_or(0);
            let percentage = if capacity > 0 {
                (used as f64 / capacity as f64 * 100.0).round() as u32
            } else {
                0
            };
            TeacherUtilization {
                teacher_id: t.teacher_id.clone(),
                name: t.name.clone(),
                used,
                capacity,
                percentage,
            }
        })
        .collect()
}

fn coverage(lessons: &[&Lesson], workloads: &[TeacherWorkload]) -> Vec<SubjectCoverage> {
    let mut classes: BTreeSet<&ClassId> = lessons.iter().map(|l| &l.class_id).collect();
    let mut covered: BTreeMap<&Subject, BTreeSet<&ClassId>> = BTreeMap::new();
    for t in workloads {
        for a in &t.allocations {
            let set = covered.entry(&a.subject).or_default();
            for c in &a.class_ids {
                set.insert(c);
                classes.insert(c);
            }
        }
    }
    let total = classes.len() as u32;
    covered
        .into_iter()
        .map(|(subject, set)| {
            let n = set.len() as u32;
            SubjectCoverage {
                subject: subject.clone(),
                covered: n,
                total,
                percentage: if total > 0 {
                    (n as f64 / total as f64 * 100.0).round() as u32
                } else {
                    0
                },
            }
        })
        .collect()
}

/// Plain-text rendering of a report for logs and downloads.
pub fn render_report(report: &ValidationReport) -> String {
    let rule = "=".repeat(47);
    let thin = "-".repeat(45);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{:^47}", "TIMETABLE VALIDATION REPORT");
    let _ = writeln!(out, "{rule}\n");

    if report.valid {
        let _ = writeln!(out, "VALID: no critical conflicts\n");
    } else {
        let _ = writeln!(out, "INVALID: critical conflicts found\n");
    }

    if !report.conflicts.is_empty() {
        let _ = writeln!(out, "CONFLICTS:\n{thin}");
        for (i, c) in report.conflicts.iter().enumerate() {
            let _ = writeln!(out, "{}. [{:?}] {}", i + 1, c.severity, c.description);
        }
        out.push('\n');
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(out, "WARNINGS:\n{thin}");
        for (i, w) in report.warnings.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, w.description);
        }
        out.push('\n');
    }

    let _ = writeln!(out, "STATISTICS:\n{thin}");
    let _ = writeln!(out, "Total lessons: {}", report.stats.total_lessons);
    let _ = writeln!(
        out,
        "Consecutive-period violations: {}\n",
        report.stats.consecutive_violations
    );
    let _ = writeln!(out, "Teacher utilization:");
    for u in &report.stats.teacher_utilization {
        let bar = "#".repeat((u.percentage / 5).min(20) as usize);
        let _ = writeln!(
            out,
            "  {:<20} {:>2}/{:<2} [{:<20}] {}%",
            u.name, u.used, u.capacity, bar, u.percentage
        );
    }
    let _ = writeln!(out, "\n{rule}");
    out
}
