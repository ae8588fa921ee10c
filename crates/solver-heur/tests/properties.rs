use std::collections::{BTreeMap, HashSet};

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sched_core::audit::validate_lessons;
use sched_core::audit::AuditOptions;
use sched_core::config::resolve_or_default;
use sched_core::constraints::MAX_CONSECUTIVE_SUBJECT;
use sched_core::CancelToken;
use solver_heur::{generate_schedule, Problem};
use types::{Allocation, GenerationParams, Shift, TeacherPreferences, TeacherWorkload};

const CLASSES: [&str; 4] = ["6A", "6B", "7A", "7B"];
const SUBJECTS: [&str; 4] = ["Math", "History", "Science", "Art"];

fn workload_strategy() -> impl Strategy<Value = Vec<TeacherWorkload>> {
    let alloc = (0..SUBJECTS.len(), 1u32..5, proptest::sample::subsequence(CLASSES.to_vec(), 1..=3));
    let prefs = (
        proptest::option::of(prop_oneof![Just(Shift::Morning), Just(Shift::Afternoon)]),
        proptest::option::of(3u8..7),
        proptest::collection::vec(0u8..5, 0..2),
        2u8..4,
    );
    let teacher = (proptest::collection::vec(alloc, 1..3), prefs);
    proptest::collection::vec(teacher, 1..5).prop_map(|teachers| {
        teachers
            .into_iter()
            .enumerate()
            .map(|(i, (allocs, (shift, per_day, off, max_consecutive)))| TeacherWorkload {
                teacher_id: format!("t{i}").as_str().into(),
                name: format!("Teacher {i}"),
                workload_monthly: None,
                allocations: allocs
                    .into_iter()
                    .map(|(s, n, classes)| Allocation {
                        subject: SUBJECTS[s].into(),
                        lessons_per_week: n,
                        class_ids: classes.into_iter().map(Into::into).collect(),
                    })
                    .collect(),
                preferences: Some(TeacherPreferences {
                    preferred_shift: shift,
                    max_lessons_per_day: per_day,
                    unavailable_days: off,
                    max_consecutive,
                    ..Default::default()
                }),
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn attempts_conserve_requests_and_never_double_book(
        workloads in workload_strategy(),
        seed in any::<u64>(),
    ) {
        let cfg = resolve_or_default(None).unwrap();
        let problem = Problem::new(&workloads, &cfg, &[], &[]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let r = problem.run_attempt(0, &mut rng, &CancelToken::new()).unwrap();

        prop_assert_eq!(
            (r.placed_lessons.len() + r.unplaced_requests.len()) as u32,
            problem.required()
        );
        prop_assert_eq!(r.grid.len(), r.placed_lessons.len());

        let mut teachers = HashSet::new();
        let mut classes = HashSet::new();
        for l in &r.placed_lessons {
            prop_assert!(cfg.is_valid(l.day, l.slot));
            prop_assert!(teachers.insert((l.teacher_id.clone(), l.day, l.slot)));
            prop_assert!(classes.insert((l.class_id.clone(), l.day, l.slot)));
        }

        let report = validate_lessons(&r.placed_lessons, &workloads, &AuditOptions::default());
        prop_assert!(report.valid);
    }

    #[test]
    fn generated_grids_respect_run_and_load_limits(
        workloads in workload_strategy(),
        seed in any::<u64>(),
    ) {
        let cfg = resolve_or_default(None).unwrap();
        let problem = Problem::new(&workloads, &cfg, &[], &[]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let r = problem.run_attempt(0, &mut rng, &CancelToken::new()).unwrap();

        // No class sits through more than two periods of one subject in a row.
        let mut by_class: BTreeMap<_, BTreeMap<u8, &str>> = BTreeMap::new();
        for l in &r.placed_lessons {
            by_class.entry((l.class_id.0.as_str(), l.day)).or_default().insert(l.slot, l.subject.0.as_str());
        }
        for slots in by_class.values() {
            let mut run = 0u8;
            let mut prev: Option<(u8, &str)> = None;
            for (&slot, &subject) in slots {
                run = match prev {
                    Some((p, s)) if p + 1 == slot && s == subject => run + 1,
                    _ => 1,
                };
                prop_assert!(run <= MAX_CONSECUTIVE_SUBJECT);
                prev = Some((slot, subject));
            }
        }

        for t in &workloads {
            let prefs = t.prefs();
            let mine: Vec<_> = r.placed_lessons.iter().filter(|l| l.teacher_id == t.teacher_id).collect();
            for l in &mine {
                prop_assert!(!prefs.unavailable_days.contains(&l.day));
            }
            for day in 0..5u8 {
                let mut slots: Vec<u8> = mine.iter().filter(|l| l.day == day).map(|l| l.slot).collect();
                if let Some(max) = prefs.max_lessons_per_day {
                    prop_assert!(slots.len() <= max as usize);
                }
                slots.sort_unstable();
                let mut run = 0u8;
                for (i, s) in slots.iter().enumerate() {
                    run = if i > 0 && slots[i - 1] + 1 == *s { run + 1 } else { 1 };
                    prop_assert!(run <= prefs.max_consecutive);
                }
            }
        }
    }
}

#[test]
fn one_teacher_two_classes_is_complete_and_clean() {
    let w = vec![TeacherWorkload {
        teacher_id: "ana".into(),
        name: "Ana".into(),
        workload_monthly: Some(40),
        allocations: vec![Allocation {
            subject: "Math".into(),
            lessons_per_week: 3,
            class_ids: vec!["6A".into(), "6B".into()],
        }],
        preferences: None,
    }];
    let params = GenerationParams {
        seed: Some(2024),
        ..Default::default()
    };
    let out = generate_schedule(&w, None, &[], &params).unwrap();
    assert_eq!(out.result.completion_rate, 100.0);

    let report = sched_core::audit::validate_schedule(&out.result.grid, &w);
    assert!(report.valid);
    assert!(report.conflicts.is_empty());
    assert_eq!(report.stats.total_lessons, 6);
    assert_eq!(report.stats.consecutive_violations, 0);
}
