//! Read-only placement predicates over a partially filled grid.

use types::{
    ClassId, Day, RoomId, ScheduleConfig, Slot, Subject, TeacherId, TeacherPreferences, WeekGrid,
};

/// Longest run of one subject a class may have in a day.
pub const MAX_CONSECUTIVE_SUBJECT: u8 = 2;

pub fn class_busy(grid: &WeekGrid, day: Day, slot: Slot, class: &ClassId) -> bool {
    grid.get(day, slot, class).is_some()
}

pub fn teacher_busy(grid: &WeekGrid, day: Day, slot: Slot, teacher: &TeacherId) -> bool {
    grid.at(day, slot).any(|l| &l.teacher_id == teacher)
}

pub fn room_busy(grid: &WeekGrid, day: Day, slot: Slot, room: &RoomId) -> bool {
    grid.at(day, slot).any(|l| l.room_id.as_ref() == Some(room))
}

/// Length of the run through `slot` (counting the candidate itself) of slots
/// for which `occupied` holds. Looks both ways since placement order is not
/// chronological.
fn run_through(
    config: &ScheduleConfig,
    day: Day,
    slot: Slot,
    occupied: impl Fn(Slot) -> bool,
) -> u8 {
    let mut count = 1u8;
    let mut s = slot;
    while s > 0 && occupied(s - 1) {
        count += 1;
        s -= 1;
    }
    let end = config.slots_on(day);
    let mut s = slot + 1;
    while s < end && occupied(s) {
        count += 1;
        s += 1;
    }
    count
}

pub fn too_many_consecutive_subject(
    grid: &WeekGrid,
    config: &ScheduleConfig,
    day: Day,
    slot: Slot,
    class: &ClassId,
    subject: &Subject,
    max: u8,
) -> bool {
    let run = run_through(config, day, slot, |s| {
        grid.get(day, s, class).is_some_and(|l| &l.subject == subject)
    });
    run > max
}

pub fn teacher_unavailable(prefs: &TeacherPreferences, day: Day, slot: Slot) -> bool {
    prefs.unavailable_days.contains(&day)
        || prefs
            .unavailable_slots
            .iter()
            .any(|r| r.day == day && r.slot == slot)
}

pub fn teacher_lessons_on(grid: &WeekGrid, teacher: &TeacherId, day: Day) -> u32 {
    grid.0
        .get(&day)
        .into_iter()
        .flat_map(|slots| slots.values())
        .flat_map(|classes| classes.values())
        .filter(|l| &l.teacher_id == teacher)
        .count() as u32
}

pub fn teacher_daily_limit_reached(
    grid: &WeekGrid,
    prefs: &TeacherPreferences,
    teacher: &TeacherId,
    day: Day,
) -> bool {
    match prefs.max_lessons_per_day {
        Some(max) => teacher_lessons_on(grid, teacher, day) >= max as u32,
        None => false,
    }
}

pub fn teacher_consecutive_overflow(
    grid: &WeekGrid,
    config: &ScheduleConfig,
    day: Day,
    slot: Slot,
    teacher: &TeacherId,
    max: u8,
) -> bool {
    run_through(config, day, slot, |s| teacher_busy(grid, day, s, teacher)) > max
}

/// The lesson a caller wants to place, with the owning teacher's preferences.
#[derive(Clone, Copy, Debug)]
pub struct Placement<'a> {
    pub teacher: &'a TeacherId,
    pub prefs: &'a TeacherPreferences,
    pub class: &'a ClassId,
    pub subject: &'a Subject,
}

impl Placement<'_> {
    /// All hard constraints at once, cheapest checks first.
    pub fn admissible(
        &self,
        grid: &WeekGrid,
        config: &ScheduleConfig,
        day: Day,
        slot: Slot,
    ) -> bool {
        config.is_valid(day, slot)
            && !teacher_unavailable(self.prefs, day, slot)
            && !class_busy(grid, day, slot, self.class)
            && !teacher_busy(grid, day, slot, self.teacher)
            && !too_many_consecutive_subject(
                grid,
                config,
                day,
                slot,
                self.class,
                self.subject,
                MAX_CONSECUTIVE_SUBJECT,
            )
            && !teacher_daily_limit_reached(grid, self.prefs, self.teacher, day)
            && !teacher_consecutive_overflow(
                grid,
                config,
                day,
                slot,
                self.teacher,
                self.prefs.max_consecutive,
            )
    }
}
