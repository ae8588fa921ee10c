use std::collections::BTreeMap;

use crate::ConfigError;
use types::{ClockTime, Day, Period, ScheduleConfig, SchoolSettings, Shift, Slot, WEEKDAYS};

pub fn validate_settings(s: &SchoolSettings) -> Result<(), ConfigError> {
    if s.lesson_minutes == 0 {
        return Err(ConfigError::ZeroLessonLength);
    }
    if s.active_days >> WEEKDAYS != 0 {
        return Err(ConfigError::BadDayMask(s.active_days));
    }
    let cap = |on: bool, n: u8| if on { u16::from(n) } else { 0 };
    let per_day = cap(s.morning_shift, s.max_morning_lessons)
        + cap(s.afternoon_shift, s.max_afternoon_lessons);
    if per_day > u16::from(u8::MAX) {
        return Err(ConfigError::TooManyPeriods(per_day));
    }
    if s.morning_shift {
        shift_window("morning", &s.morning_start, &s.morning_end)?;
        if let Some(b) = &s.morning_break_start {
            minutes("morningBreakStart", b)?;
        }
    }
    if s.afternoon_shift {
        shift_window("afternoon", &s.afternoon_start, &s.afternoon_end)?;
        if let Some(b) = &s.afternoon_break_start {
            minutes("afternoonBreakStart", b)?;
        }
    }
    Ok(())
}

fn minutes(field: &'static str, t: &ClockTime) -> Result<u32, ConfigError> {
    t.minutes().ok_or_else(|| ConfigError::BadTime {
        field,
        value: t.0.clone(),
    })
}

fn shift_window(
    shift: &'static str,
    start: &ClockTime,
    end: &ClockTime,
) -> Result<(u32, u32), ConfigError> {
    let (sf, ef) = match shift {
        "morning" => ("morningStart", "morningEnd"),
        _ => ("afternoonStart", "afternoonEnd"),
    };
    let a = minutes(sf, start)?;
    let b = minutes(ef, end)?;
    if b <= a {
        return Err(ConfigError::EmptyShift {
            shift,
            start: start.0.clone(),
            end: end.0.clone(),
        });
    }
    Ok((a, b))
}

/// Lesson periods of one shift as `(start, end)` minutes. The break is taken
/// at the first period boundary at or after its start time.
fn shift_periods(
    start: u32,
    end: u32,
    break_start: Option<u32>,
    break_minutes: u32,
    lesson_minutes: u32,
    max_lessons: u8,
) -> Vec<(u32, u32)> {
    let mut out = Vec::new();
    let mut t = start;
    let mut break_taken = break_start.is_none();
    while out.len() < max_lessons as usize {
        if let Some(b) = break_start {
            if !break_taken && t >= b {
                t = t.saturating_add(break_minutes);
                break_taken = true;
            }
        }
        if t.saturating_add(lesson_minutes) > end {
            break;
        }
        out.push((t, t + lesson_minutes));
        t += lesson_minutes;
    }
    out
}

/// Resolves school settings into the per-day slot table.
pub fn resolve(s: &SchoolSettings) -> Result<ScheduleConfig, ConfigError> {
    validate_settings(s)?;

    let mut periods: Vec<Period> = Vec::new();
    let mut morning_slot_count = 0u8;
    let mut afternoon_slot_count = 0u8;

    if s.morning_shift {
        let (a, b) = shift_window("morning", &s.morning_start, &s.morning_end)?;
        let brk = s.morning_break_start.as_ref().and_then(ClockTime::minutes);
        for (start, end) in shift_periods(a, b, brk, s.break_minutes, s.lesson_minutes, s.max_morning_lessons) {
            periods.push(Period {
                slot: periods.len() as Slot,
                shift: Shift::Morning,
                start: ClockTime::from_minutes(start),
                end: ClockTime::from_minutes(end),
            });
            morning_slot_count += 1;
        }
    }
    if s.afternoon_shift {
        let (a, b) = shift_window("afternoon", &s.afternoon_start, &s.afternoon_end)?;
        let brk = s.afternoon_break_start.as_ref().and_then(ClockTime::minutes);
        for (start, end) in
            shift_periods(a, b, brk, s.break_minutes, s.lesson_minutes, s.max_afternoon_lessons)
        {
            periods.push(Period {
                slot: periods.len() as Slot,
                shift: Shift::Afternoon,
                start: ClockTime::from_minutes(start),
                end: ClockTime::from_minutes(end),
            });
            afternoon_slot_count += 1;
        }
    }

    let per_day = morning_slot_count + afternoon_slot_count;
    let last_active = (0..WEEKDAYS).rev().find(|d| s.active_days & (1 << d) != 0);

    let mut slots_per_day: BTreeMap<Day, u8> = BTreeMap::new();
    for d in 0..WEEKDAYS {
        let n = if s.active_days & (1 << d) == 0 {
            0
        } else if s.full_day && Some(d) == last_active {
            per_day.saturating_sub(1)
        } else {
            per_day
        };
        slots_per_day.insert(d, n);
    }
    let weekly_capacity = slots_per_day.values().map(|&n| n as u32).sum();

    Ok(ScheduleConfig {
        slots_per_day,
        weekly_capacity,
        morning_slot_count,
        afternoon_slot_count,
        periods,
    })
}

/// A missing settings record means the documented defaults.
pub fn resolve_or_default(s: Option<&SchoolSettings>) -> Result<ScheduleConfig, ConfigError> {
    match s {
        Some(s) => resolve(s),
        None => resolve(&SchoolSettings::default()),
    }
}
