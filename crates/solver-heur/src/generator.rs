use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use sched_core::constraints::Placement;
use sched_core::requests::{build_requests, total_required};
use sched_core::rooms::allocate_room;
use sched_core::{validate_locks, CancelToken, ScheduleError};
use tracing::trace;
use types::{
    Day, GenerationResult, Lesson, LessonRequest, Room, ScheduleConfig, Shift, Slot, TeacherId,
    TeacherPreferences, TeacherWorkload, WeekGrid,
};

/// Immutable inputs shared by every attempt of one run.
pub struct Problem<'a> {
    pub workloads: &'a [TeacherWorkload],
    pub config: &'a ScheduleConfig,
    pub rooms: &'a [Room],
    pub locked: &'a [Lesson],
    prefs: HashMap<&'a TeacherId, &'a TeacherPreferences>,
    required: u32,
}

impl<'a> Problem<'a> {
    pub fn new(
        workloads: &'a [TeacherWorkload],
        config: &'a ScheduleConfig,
        rooms: &'a [Room],
        locked: &'a [Lesson],
    ) -> Result<Self, ScheduleError> {
        validate_locks(locked, workloads, config)?;
        Ok(Self {
            workloads,
            config,
            rooms,
            locked,
            prefs: workloads.iter().map(|t| (&t.teacher_id, t.prefs())).collect(),
            required: total_required(workloads),
        })
    }

    pub fn required(&self) -> u32 {
        self.required
    }

    /// One greedy pass: seed the locks, then place each request at the first
    /// admissible slot in preference order. Returns `None` if cancelled.
    pub fn run_attempt<R: Rng + ?Sized>(
        &self,
        attempt: u32,
        rng: &mut R,
        cancel: &CancelToken,
    ) -> Option<GenerationResult> {
        let mut grid = WeekGrid::new();
        let mut placed_lessons = Vec::with_capacity(self.required as usize);
        let mut requests = build_requests(self.workloads, rng);

        for lock in self.locked {
            let lesson = Lesson {
                locked: true,
                ..lock.clone()
            };
            if let Some(i) = requests.iter().position(|r| {
                r.teacher_id == lesson.teacher_id
                    && r.subject == lesson.subject
                    && r.class_id == lesson.class_id
            }) {
                requests.remove(i);
            }
            grid.insert(lesson.clone());
            placed_lessons.push(lesson);
        }

        let mut unplaced_requests = Vec::new();
        for req in requests {
            if cancel.is_cancelled() {
                return None;
            }
            match self.place(&mut grid, &req, rng) {
                Some(lesson) => placed_lessons.push(lesson),
                None => unplaced_requests.push(req),
            }
        }

        let completion_rate = if self.required == 0 {
            100.0
        } else {
            placed_lessons.len() as f64 / self.required as f64 * 100.0
        };
        trace!(attempt, completion_rate, unplaced = unplaced_requests.len(), "attempt finished");
        Some(GenerationResult {
            grid,
            placed_lessons,
            unplaced_requests,
            completion_rate,
            attempt,
        })
    }

    fn place<R: Rng + ?Sized>(
        &self,
        grid: &mut WeekGrid,
        req: &LessonRequest,
        rng: &mut R,
    ) -> Option<Lesson> {
        let prefs = *self.prefs.get(&req.teacher_id)?;
        let placement = Placement {
            teacher: &req.teacher_id,
            prefs,
            class: &req.class_id,
            subject: &req.subject,
        };
        let (day, slot) = candidate_order(self.config, prefs.preferred_shift, rng)
            .into_iter()
            .find(|&(d, s)| placement.admissible(grid, self.config, d, s))?;

        let room_id = allocate_room(grid, day, slot, &req.subject, self.rooms).map(|r| r.id.clone());
        let lesson = Lesson {
            teacher_id: req.teacher_id.clone(),
            subject: req.subject.clone(),
            class_id: req.class_id.clone(),
            day,
            slot,
            room_id,
            locked: false,
        };
        grid.insert(lesson.clone());
        Some(lesson)
    }
}

/// Valid periods in the order they are tried. Morning people get early slots
/// first, afternoon people late ones; days stay shuffled within a slot.
pub fn candidate_order<R: Rng + ?Sized>(
    config: &ScheduleConfig,
    shift: Option<Shift>,
    rng: &mut R,
) -> Vec<(Day, Slot)> {
    let mut slots = config.candidate_slots();
    slots.shuffle(rng);
    match shift {
        Some(Shift::Morning) => slots.sort_by_key(|&(_, s)| s),
        Some(Shift::Afternoon) => slots.sort_by_key(|&(_, s)| std::cmp::Reverse(s)),
        Some(Shift::Both) | None => {}
    }
    slots
}
