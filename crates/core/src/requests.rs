use rand::seq::SliceRandom;
use rand::Rng;
use types::{Allocation, LessonRequest, TeacherWorkload};

/// Placement difficulty of one allocation's periods; higher goes first.
pub fn compute_priority(teacher: &TeacherWorkload, allocation: &Allocation) -> u32 {
    let prefs = teacher.prefs();
    let mut p = 10 * prefs.unavailable_days.len() as u32;
    p += 2 * prefs.unavailable_slots.len() as u32;
    if prefs.max_lessons_per_day.is_some() {
        p += 5;
    }
    p.saturating_add(allocation.lessons_per_week)
}

pub fn total_required(workloads: &[TeacherWorkload]) -> u32 {
    workloads
        .iter()
        .map(TeacherWorkload::total_periods)
        .fold(0, u32::saturating_add)
}

/// One request per period instance, most constrained first. Ties come out in
/// random order so retries explore different placements.
pub fn build_requests<R: Rng + ?Sized>(
    workloads: &[TeacherWorkload],
    rng: &mut R,
) -> Vec<LessonRequest> {
    let mut out = Vec::with_capacity(total_required(workloads) as usize);
    for t in workloads {
        for a in &t.allocations {
            let priority = compute_priority(t, a);
            let mut classes: Vec<_> = a.class_ids.iter().collect();
            classes.shuffle(rng);
            for class in classes {
                for _ in 0..a.lessons_per_week {
                    out.push(LessonRequest {
                        teacher_id: t.teacher_id.clone(),
                        subject: a.subject.clone(),
                        class_id: class.clone(),
                        priority,
                    });
                }
            }
        }
    }
    out.shuffle(rng);
    out.sort_by(|a, b| b.priority.cmp(&a.priority));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use types::{SlotRef, TeacherPreferences};

    fn teacher(id: &str, prefs: Option<TeacherPreferences>, allocs: Vec<Allocation>) -> TeacherWorkload {
        TeacherWorkload {
            teacher_id: id.into(),
            name: id.to_uppercase(),
            workload_monthly: None,
            allocations: allocs,
            preferences: prefs,
        }
    }

    fn alloc(subject: &str, per_week: u32, classes: &[&str]) -> Allocation {
        Allocation {
            subject: subject.into(),
            lessons_per_week: per_week,
            class_ids: classes.iter().map(|&c| c.into()).collect(),
        }
    }

    #[test]
    fn priority_weights_each_constraint() {
        let a = alloc("Math", 4, &["6A"]);
        assert_eq!(compute_priority(&teacher("t", None, vec![]), &a), 4);

        let prefs = TeacherPreferences {
            unavailable_days: vec![0, 4],
            unavailable_slots: vec![SlotRef { day: 1, slot: 0 }],
            max_lessons_per_day: Some(5),
            ..Default::default()
        };
        let t = teacher("t", Some(prefs), vec![]);
        assert_eq!(compute_priority(&t, &a), 20 + 2 + 5 + 4);
    }

    #[test]
    fn requests_unroll_every_period_and_sort_by_priority() {
        let busy = TeacherPreferences {
            unavailable_days: vec![2],
            ..Default::default()
        };
        let workloads = vec![
            teacher("free", None, vec![alloc("Art", 1, &["6A", "6B"])]),
            teacher("busy", Some(busy), vec![alloc("Math", 3, &["6A", "6B", "6C"])]),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let reqs = build_requests(&workloads, &mut rng);

        assert_eq!(reqs.len() as u32, total_required(&workloads));
        assert_eq!(reqs.len(), 11);
        assert!(reqs.windows(2).all(|w| w[0].priority >= w[1].priority));
        assert!(reqs[..9].iter().all(|r| r.teacher_id.0 == "busy"));
        assert_eq!(reqs.iter().filter(|r| r.class_id.0 == "6C").count(), 3);
    }

    #[test]
    fn tie_order_depends_on_the_seed() {
        let workloads = vec![teacher(
            "t",
            None,
            vec![alloc("Math", 2, &["6A", "6B", "6C", "6D", "6E", "7A", "7B", "7C"])],
        )];
        let order = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            build_requests(&workloads, &mut rng)
                .into_iter()
                .map(|r| r.class_id.0)
                .collect::<Vec<_>>()
        };
        assert_eq!(order(1), order(1));
        assert!((2..10).any(|s| order(s) != order(1)));
    }
}
