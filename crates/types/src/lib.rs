use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use utoipa::ToSchema;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Clone,
            Debug,
            Serialize,
            Deserialize,
            ToSchema,
            JsonSchema,
            Eq,
            PartialEq,
            Hash,
            Ord,
            PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}
id_newtype!(TeacherId);
id_newtype!(ClassId);
id_newtype!(RoomId);
id_newtype!(Subject);

/// Weekday index, 0 = Monday.
pub type Day = u8;
/// Period index within a day, 0 = first period.
pub type Slot = u8;

pub const WEEKDAYS: Day = 5;

pub fn day_name(day: Day) -> &'static str {
    match day {
        0 => "Monday",
        1 => "Tuesday",
        2 => "Wednesday",
        3 => "Thursday",
        4 => "Friday",
        5 => "Saturday",
        _ => "Sunday",
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(transparent)]
pub struct ClockTime(pub String);

impl ClockTime {
    pub fn new(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn from_minutes(m: u32) -> Self {
        Self(format!("{:02}:{:02}", m / 60, m % 60))
    }

    /// Minutes since midnight, `None` unless the value is a valid `HH:MM`.
    pub fn minutes(&self) -> Option<u32> {
        let (h, m) = self.0.split_once(':')?;
        if h.len() != 2 || m.len() != 2 {
            return None;
        }
        let h = h.parse::<u32>().ok()?;
        let m = m.parse::<u32>().ok()?;
        (h < 24 && m < 60).then_some(h * 60 + m)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Shift {
    Morning,
    Afternoon,
    Both,
}

#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash, Ord, PartialOrd,
)]
#[serde(try_from = "SlotRefRepr")]
pub struct SlotRef {
    pub day: Day,
    pub slot: Slot,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SlotRefRepr {
    Pair { day: Day, slot: Slot },
    Key(String),
}

impl TryFrom<SlotRefRepr> for SlotRef {
    type Error = String;

    fn try_from(repr: SlotRefRepr) -> Result<Self, Self::Error> {
        match repr {
            SlotRefRepr::Pair { day, slot } => Ok(SlotRef { day, slot }),
            SlotRefRepr::Key(key) => {
                let parsed = key
                    .split_once('-')
                    .and_then(|(d, s)| Some((d.trim().parse().ok()?, s.trim().parse().ok()?)));
                match parsed {
                    Some((day, slot)) => Ok(SlotRef { day, slot }),
                    None => Err(format!("slot key must look like \"day-slot\", got {key:?}")),
                }
            }
        }
    }
}

fn default_max_consecutive() -> u8 {
    3
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeacherPreferences {
    #[serde(default)]
    pub preferred_shift: Option<Shift>,
    #[serde(default)]
    pub max_lessons_per_day: Option<u8>,
    #[serde(default)]
    pub max_lessons_per_week: Option<u32>,
    #[serde(default)]
    pub unavailable_days: Vec<Day>,
    #[serde(default)]
    pub unavailable_slots: Vec<SlotRef>,
    #[serde(default = "default_max_consecutive")]
    pub max_consecutive: u8,
}

static NO_PREFERENCES: TeacherPreferences = TeacherPreferences {
    preferred_shift: None,
    max_lessons_per_day: None,
    max_lessons_per_week: None,
    unavailable_days: Vec::new(),
    unavailable_slots: Vec::new(),
    max_consecutive: 3,
};

impl Default for TeacherPreferences {
    fn default() -> Self {
        NO_PREFERENCES.clone()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub subject: Subject,
    pub lessons_per_week: u32,
    pub class_ids: Vec<ClassId>,
}

impl Allocation {
    /// Saturates at `u32::MAX`, which still exceeds any weekly capacity.
    pub fn total_periods(&self) -> u32 {
        let classes = u32::try_from(self.class_ids.len()).unwrap_or(u32::MAX);
        self.lessons_per_week.saturating_mul(classes)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeacherWorkload {
    pub teacher_id: TeacherId,
    pub name: String,
    /// Contracted hours per month, used for utilization estimates.
    #[serde(default)]
    pub workload_monthly: Option<u32>,
    #[serde(default)]
    pub allocations: Vec<Allocation>,
    #[serde(default)]
    pub preferences: Option<TeacherPreferences>,
}

impl TeacherWorkload {
    pub fn total_periods(&self) -> u32 {
        self.allocations
            .iter()
            .map(Allocation::total_periods)
            .fold(0, u32::saturating_add)
    }

    pub fn prefs(&self) -> &TeacherPreferences {
        self.preferences.as_ref().unwrap_or(&NO_PREFERENCES)
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    #[default]
    Classroom,
    Laboratory,
    Gymnasium,
    Auditorium,
    Library,
}

fn default_room_capacity() -> u32 {
    40
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: RoomKind,
    #[serde(default = "default_room_capacity")]
    pub capacity: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub teacher_id: TeacherId,
    pub subject: Subject,
    pub class_id: ClassId,
    pub day: Day,
    pub slot: Slot,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    /// Set on manual edits; locked lessons are kept as-is by the generator.
    #[serde(default)]
    pub locked: bool,
}

/// Weekly grid keyed `day -> slot -> class`. The map shape admits at most one
/// lesson per class per period.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(transparent)]
pub struct WeekGrid(
    #[schema(value_type = Object)] pub BTreeMap<Day, BTreeMap<Slot, BTreeMap<ClassId, Lesson>>>,
);

impl WeekGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lessons(lessons: impl IntoIterator<Item = Lesson>) -> Self {
        let mut grid = Self::new();
        for l in lessons {
            grid.insert(l);
        }
        grid
    }

    /// Stores the lesson in its cell, returning whatever occupied it before.
    pub fn insert(&mut self, lesson: Lesson) -> Option<Lesson> {
        self.0
            .entry(lesson.day)
            .or_default()
            .entry(lesson.slot)
            .or_default()
            .insert(lesson.class_id.clone(), lesson)
    }

    pub fn get(&self, day: Day, slot: Slot, class: &ClassId) -> Option<&Lesson> {
        self.0.get(&day)?.get(&slot)?.get(class)
    }

    pub fn remove(&mut self, day: Day, slot: Slot, class: &ClassId) -> Option<Lesson> {
        let slots = self.0.get_mut(&day)?;
        let classes = slots.get_mut(&slot)?;
        let removed = classes.remove(class);
        if classes.is_empty() {
            slots.remove(&slot);
        }
        if slots.is_empty() {
            self.0.remove(&day);
        }
        removed
    }

    /// Lessons taught at one period, across all classes.
    pub fn at(&self, day: Day, slot: Slot) -> impl Iterator<Item = &Lesson> {
        self.0
            .get(&day)
            .and_then(|slots| slots.get(&slot))
            .into_iter()
            .flat_map(|classes| classes.values())
    }

    /// All lessons in chronological order, then by class.
    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.0
            .values()
            .flat_map(|slots| slots.values())
            .flat_map(|classes| classes.values())
    }

    pub fn len(&self) -> usize {
        self.lessons().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|slots| slots.values().all(BTreeMap::is_empty))
    }
}

fn yes() -> bool {
    true
}
fn default_morning_start() -> ClockTime {
    ClockTime::new("07:00")
}
fn default_morning_end() -> ClockTime {
    ClockTime::new("12:00")
}
fn default_afternoon_start() -> ClockTime {
    ClockTime::new("13:00")
}
fn default_afternoon_end() -> ClockTime {
    ClockTime::new("17:30")
}
fn default_morning_break() -> Option<ClockTime> {
    Some(ClockTime::new("09:30"))
}
fn default_afternoon_break() -> Option<ClockTime> {
    Some(ClockTime::new("15:00"))
}
fn default_lesson_minutes() -> u32 {
    50
}
fn default_break_minutes() -> u32 {
    20
}
fn default_max_morning() -> u8 {
    4
}
fn default_max_afternoon() -> u8 {
    3
}
fn default_active_days() -> u8 {
    0b1_1111
}

/// School-wide timetable settings. Every field has a default, and the
/// defaults give the 7/7/7/7/6 full-day week.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchoolSettings {
    #[serde(default = "yes")]
    pub morning_shift: bool,
    #[serde(default = "yes")]
    pub afternoon_shift: bool,
    /// Full-day schedule: the last active weekday loses its final period.
    #[serde(default = "yes")]
    pub full_day: bool,
    #[serde(default = "default_morning_start")]
    pub morning_start: ClockTime,
    #[serde(default = "default_morning_end")]
    pub morning_end: ClockTime,
    #[serde(default = "default_afternoon_start")]
    pub afternoon_start: ClockTime,
    #[serde(default = "default_afternoon_end")]
    pub afternoon_end: ClockTime,
    #[serde(default = "default_lesson_minutes")]
    pub lesson_minutes: u32,
    #[serde(default = "default_morning_break")]
    pub morning_break_start: Option<ClockTime>,
    #[serde(default = "default_afternoon_break")]
    pub afternoon_break_start: Option<ClockTime>,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
    #[serde(default = "default_max_morning")]
    pub max_morning_lessons: u8,
    #[serde(default = "default_max_afternoon")]
    pub max_afternoon_lessons: u8,
    /// Bit `d` set means weekday `d` is a school day.
    #[serde(default = "default_active_days")]
    pub active_days: u8,
}

impl Default for SchoolSettings {
    fn default() -> Self {
        Self {
            morning_shift: true,
            afternoon_shift: true,
            full_day: true,
            morning_start: default_morning_start(),
            morning_end: default_morning_end(),
            afternoon_start: default_afternoon_start(),
            afternoon_end: default_afternoon_end(),
            lesson_minutes: default_lesson_minutes(),
            morning_break_start: default_morning_break(),
            afternoon_break_start: default_afternoon_break(),
            break_minutes: default_break_minutes(),
            max_morning_lessons: default_max_morning(),
            max_afternoon_lessons: default_max_afternoon(),
            active_days: default_active_days(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub slot: Slot,
    pub shift: Shift,
    pub start: ClockTime,
    pub end: ClockTime,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    pub slots_per_day: BTreeMap<Day, u8>,
    pub weekly_capacity: u32,
    pub morning_slot_count: u8,
    pub afternoon_slot_count: u8,
    #[serde(default)]
    pub periods: Vec<Period>,
}

impl ScheduleConfig {
    pub fn slots_on(&self, day: Day) -> u8 {
        self.slots_per_day.get(&day).copied().unwrap_or(0)
    }

    pub fn is_valid(&self, day: Day, slot: Slot) -> bool {
        slot < self.slots_on(day)
    }

    pub fn active_days(&self) -> impl Iterator<Item = Day> + '_ {
        self.slots_per_day
            .iter()
            .filter(|(_, &n)| n > 0)
            .map(|(&d, _)| d)
    }

    pub fn max_daily_slots(&self) -> u8 {
        self.slots_per_day.values().copied().max().unwrap_or(0)
    }

    /// Every (day, slot) a lesson may occupy, in chronological order.
    pub fn candidate_slots(&self) -> Vec<(Day, Slot)> {
        self.slots_per_day
            .iter()
            .flat_map(|(&d, &n)| (0..n).map(move |s| (d, s)))
            .collect()
    }

    pub fn shift_of(&self, slot: Slot) -> Shift {
        if slot < self.morning_slot_count {
            Shift::Morning
        } else {
            Shift::Afternoon
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LessonRequest {
    pub teacher_id: TeacherId,
    pub subject: Subject,
    pub class_id: ClassId,
    pub priority: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub grid: WeekGrid,
    pub placed_lessons: Vec<Lesson>,
    pub unplaced_requests: Vec<LessonRequest>,
    pub completion_rate: f64,
    pub attempt: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnplacedPeriods {
    pub teacher_id: TeacherId,
    pub teacher_name: String,
    pub subject: Subject,
    pub class_id: ClassId,
    pub missing: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConflictedTeacher {
    pub teacher_id: TeacherId,
    pub name: String,
    pub unplaced: u32,
}

/// An accepted generation run.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub result: GenerationResult,
    pub required: u32,
    pub attempts_used: u32,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub unplaced: Vec<UnplacedPeriods>,
}

/// Why a run was not accepted.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationDiagnostic {
    pub required: u32,
    pub attempts_used: u32,
    pub best_rate: f64,
    pub conflicted_teachers: Vec<ConflictedTeacher>,
    pub suggestions: Vec<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FeasibilityKind {
    TeacherOverCapacity,
    TeacherOverWeeklyLimit,
    TeacherOverAvailability,
    ClassOverCapacity,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeasibilityIssue {
    pub kind: FeasibilityKind,
    pub entity: String,
    pub total: u32,
    pub limit: u32,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeacherAnalysis {
    pub teacher_id: TeacherId,
    pub name: String,
    pub total_lessons: u32,
    pub available_days: u8,
    pub max_per_day: u8,
    pub weekly_capacity: u32,
    pub has_conflicts: bool,
    pub conflicts: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    TeacherDoubleBooking,
    ClassDoubleBooking,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub kind: ConflictKind,
    pub severity: Severity,
    pub description: String,
    pub day: Day,
    pub slot: Slot,
    #[serde(default)]
    pub teacher_id: Option<TeacherId>,
    #[serde(default)]
    pub class_id: Option<ClassId>,
    #[serde(default)]
    pub classes: Vec<ClassId>,
    #[serde(default)]
    pub teachers: Vec<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    ConsecutiveLimit,
    IncompleteCoverage,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub kind: WarningKind,
    pub description: String,
    #[serde(default)]
    pub class_id: Option<ClassId>,
    #[serde(default)]
    pub day: Option<Day>,
    #[serde(default)]
    pub subject: Option<Subject>,
    #[serde(default)]
    pub first_slot: Option<Slot>,
    /// Inclusive.
    #[serde(default)]
    pub last_slot: Option<Slot>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeacherUtilization {
    pub teacher_id: TeacherId,
    pub name: String,
    pub used: u32,
    pub capacity: u32,
    pub percentage: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectCoverage {
    pub subject: Subject,
    pub covered: u32,
    pub total: u32,
    pub percentage: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStats {
    pub total_lessons: u32,
    pub teacher_utilization: Vec<TeacherUtilization>,
    pub subject_coverage: Vec<SubjectCoverage>,
    pub consecutive_violations: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub conflicts: Vec<Conflict>,
    pub warnings: Vec<Warning>,
    pub stats: ValidationStats,
}

fn default_max_attempts() -> u32 {
    100
}
fn default_threshold() -> f64 {
    80.0
}
fn default_workers() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Minimum completion percentage for a run to be accepted.
    #[serde(default = "default_threshold")]
    pub acceptance_threshold: f64,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub time_limit_ms: Option<u64>,
    #[serde(default = "default_workers")]
    pub workers: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            acceptance_threshold: default_threshold(),
            seed: None,
            time_limit_ms: None,
            workers: default_workers(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub workloads: Vec<TeacherWorkload>,
    #[serde(default)]
    pub settings: Option<SchoolSettings>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub locked: Vec<Lesson>,
    #[serde(default)]
    pub params: Option<GenerationParams>,
}
