// src/progress.rs
use serde::Serialize;

use crate::engine::Error;
use crate::model::{Day, LifecycleState, Program, Week};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    /// `100 * current_week / total_weeks`, based purely on week position.
    pub percent_complete: f64,
    pub current_week_view: Week,
    /// `None` when the day pointer does not match a day of the current week.
    pub current_day_view: Option<Day>,
    pub total_weeks: usize,
    pub state: LifecycleState,
}

/// Derives the completion percentage and current week/day views.
/// # Errors
/// Returns `Error::NotFound` if `current_week` does not name an existing week.
/// Use [`clamp_position`] first to repair a stale pointer.
pub fn compute_progress(program: &Program) -> Result<ProgressView, Error> {
    let week = program.week(program.current_week).ok_or_else(|| {
        Error::NotFound(format!(
            "current week {} (program has {} week(s))",
            program.current_week,
            program.weeks.len()
        ))
    })?;

    #[allow(clippy::cast_precision_loss)]
    let percent = 100.0 * f64::from(program.current_week) / program.weeks.len() as f64;

    Ok(ProgressView {
        percent_complete: percent.clamp(0.0, 100.0),
        current_week_view: week.clone(),
        current_day_view: week.day(program.current_day).cloned(),
        total_weeks: program.weeks.len(),
        state: program.lifecycle_state(),
    })
}

fn ensure_position_exists(program: &Program, week_number: u32, day_number: u32) -> Result<(), Error> {
    program
        .week(week_number)
        .ok_or_else(|| Error::NotFound(format!("week {week_number}")))?
        .day(day_number)
        .ok_or_else(|| Error::NotFound(format!("week {week_number} day {day_number}")))?;
    Ok(())
}

/// Moves the current position forward. The position never moves backward here;
/// use [`correct_position`] for administrative corrections.
/// # Errors
/// - `Error::NotFound` if the target week/day does not exist.
/// - `Error::InvariantViolation` if the target lies before the current position.
pub fn advance_position(program: &Program, week_number: u32, day_number: u32) -> Result<Program, Error> {
    ensure_position_exists(program, week_number, day_number)?;
    if (week_number, day_number) < (program.current_week, program.current_day) {
        return Err(Error::InvariantViolation(format!(
            "position cannot move backward from week {} day {} to week {week_number} day {day_number}",
            program.current_week, program.current_day
        )));
    }
    let mut next = program.clone();
    next.current_week = week_number;
    next.current_day = day_number;
    Ok(next)
}

/// Administrative correction: sets the position to any existing week/day.
/// # Errors
/// Returns `Error::NotFound` if the target week/day does not exist.
pub fn correct_position(program: &Program, week_number: u32, day_number: u32) -> Result<Program, Error> {
    ensure_position_exists(program, week_number, day_number)?;
    let mut next = program.clone();
    next.current_week = week_number;
    next.current_day = day_number;
    Ok(next)
}

/// Steps to the next training day, rolling over into the next week.
/// Stepping past the final day completes the program.
#[must_use]
pub fn next_session(program: &Program) -> Program {
    if program.completed {
        return program.clone();
    }
    let mut next = clamp_position(program);
    let days_in_week = next
        .week(next.current_week)
        .map_or(0, |w| w.days.len());

    if usize::try_from(next.current_day).map_or(false, |d| d < days_in_week) {
        next.current_day += 1;
    } else if usize::try_from(next.current_week).map_or(false, |w| w < next.weeks.len()) {
        next.current_week += 1;
        next.current_day = 1;
    } else {
        next.completed = true;
    }
    next
}

/// Pulls a stale position (for example after deleting the current week) back onto
/// the nearest existing week and day. Completed programs are repaired too.
#[must_use]
pub fn clamp_position(program: &Program) -> Program {
    let mut next = program.clone();
    if next.weeks.is_empty() {
        return next;
    }
    let last_week = u32::try_from(next.weeks.len()).unwrap_or(u32::MAX);
    next.current_week = next.current_week.clamp(1, last_week);
    let days = next.week(next.current_week).map_or(1, |w| w.days.len());
    let last_day = u32::try_from(days).unwrap_or(u32::MAX).max(1);
    next.current_day = next.current_day.clamp(1, last_day);
    next
}

/// Marks the program completed. Completing twice is a no-op.
#[must_use]
pub fn complete_program(program: &Program) -> Program {
    let mut next = program.clone();
    next.completed = true;
    next
}
