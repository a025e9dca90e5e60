// src/engine.rs
//! Structural edits over a `Program` document.
//!
//! Every operation takes the program by reference and hands back a new value.
//! The input is never mutated, so a failed edit leaves the caller's snapshot exactly
//! as it was. After any delete the siblings are renumbered so that
//! `number == position + 1` holds at every level.
use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{
    apply_field, validate_actual_reps, Day, ExerciseField, ExerciseRecord, FieldValue, Program,
    Week,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Invalid value for '{field}': {reason}")]
    Validation { field: String, reason: String },
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl Error {
    pub(crate) fn validation(field: ExerciseField, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

// --- Copy-on-write helpers ---

/// Clones `program`, lets `edit` change the clone, and returns it.
/// The clone is dropped if `edit` fails.
fn edit_copy<F>(program: &Program, edit: F) -> Result<Program, Error>
where
    F: FnOnce(&mut Program) -> Result<(), Error>,
{
    let mut next = program.clone();
    edit(&mut next)?;
    Ok(next)
}

fn week_mut(program: &mut Program, week_number: u32) -> Result<&mut Week, Error> {
    program
        .weeks
        .iter_mut()
        .find(|w| w.week_number == week_number)
        .ok_or_else(|| Error::NotFound(format!("week {week_number}")))
}

fn day_mut(program: &mut Program, week_number: u32, day_number: u32) -> Result<&mut Day, Error> {
    week_mut(program, week_number)?
        .days
        .iter_mut()
        .find(|d| d.day_number == day_number)
        .ok_or_else(|| Error::NotFound(format!("week {week_number} day {day_number}")))
}

fn exercise_mut(
    program: &mut Program,
    week_number: u32,
    day_number: u32,
    exercise_index: usize,
) -> Result<&mut ExerciseRecord, Error> {
    day_mut(program, week_number, day_number)?
        .exercises
        .get_mut(exercise_index)
        .ok_or_else(|| {
            Error::NotFound(format!(
                "exercise {exercise_index} in week {week_number} day {day_number}"
            ))
        })
}

fn next_number(len: usize) -> u32 {
    u32::try_from(len + 1).unwrap_or(u32::MAX)
}

fn renumber_weeks(weeks: &mut [Week]) {
    for (number, week) in (1..).zip(weeks.iter_mut()) {
        week.week_number = number;
    }
}

fn renumber_days(days: &mut [Day]) {
    for (number, day) in (1..).zip(days.iter_mut()) {
        day.day_number = number;
    }
}

// --- Weeks ---

/// Appends a week seeded with one default day/exercise.
#[must_use]
pub fn add_week(program: &Program) -> Program {
    add_week_with(program, &ExerciseRecord::default())
}

/// Appends a week seeded with one day holding a copy of `template`.
#[must_use]
pub fn add_week_with(program: &Program, template: &ExerciseRecord) -> Program {
    let mut next = program.clone();
    let week_number = next_number(next.weeks.len());
    next.weeks.push(Week::seeded(week_number, template));
    next
}

/// Removes a week and renumbers the rest to `1..n`.
/// # Errors
/// - `Error::InvariantViolation` if the program has only one week.
/// - `Error::NotFound` if the week does not exist.
pub fn delete_week(program: &Program, week_number: u32) -> Result<Program, Error> {
    if program.weeks.len() <= 1 {
        return Err(Error::InvariantViolation(
            "a program must keep at least one week".to_string(),
        ));
    }
    edit_copy(program, |p| {
        let position = p
            .weeks
            .iter()
            .position(|w| w.week_number == week_number)
            .ok_or_else(|| Error::NotFound(format!("week {week_number}")))?;
        p.weeks.remove(position);
        renumber_weeks(&mut p.weeks);
        Ok(())
    })
}

/// Appends a deep copy of a week's days as a new last week.
/// # Errors
/// Returns `Error::NotFound` if the week does not exist.
pub fn copy_week(program: &Program, week_number: u32) -> Result<Program, Error> {
    let source = program
        .week(week_number)
        .ok_or_else(|| Error::NotFound(format!("week {week_number}")))?;
    let copy = Week {
        week_number: next_number(program.weeks.len()),
        days: source.days.clone(),
    };
    let mut next = program.clone();
    next.weeks.push(copy);
    Ok(next)
}

// --- Days ---

/// Appends a day seeded with one default exercise.
/// # Errors
/// - `Error::NotFound` if the week does not exist.
/// - `Error::Conflict` if a day with the next number is already present.
pub fn add_day(program: &Program, week_number: u32) -> Result<Program, Error> {
    add_day_with(program, week_number, &ExerciseRecord::default())
}

/// Same as [`add_day`] but seeds the day with a copy of `template`.
/// # Errors
/// See [`add_day`].
pub fn add_day_with(
    program: &Program,
    week_number: u32,
    template: &ExerciseRecord,
) -> Result<Program, Error> {
    edit_copy(program, |p| {
        let week = week_mut(p, week_number)?;
        let day_number = next_number(week.days.len());
        if week.day(day_number).is_some() {
            return Err(Error::Conflict(format!(
                "week {week_number} already has a day {day_number}"
            )));
        }
        week.days.push(Day::seeded(day_number, template));
        Ok(())
    })
}

/// Removes a day and renumbers the remaining days of its week.
/// # Errors
/// - `Error::NotFound` if the week or day does not exist.
/// - `Error::InvariantViolation` if the week has only one day.
pub fn delete_day(program: &Program, week_number: u32, day_number: u32) -> Result<Program, Error> {
    edit_copy(program, |p| {
        let week = week_mut(p, week_number)?;
        if week.days.len() <= 1 {
            return Err(Error::InvariantViolation(format!(
                "week {week_number} must keep at least one day"
            )));
        }
        let position = week
            .days
            .iter()
            .position(|d| d.day_number == day_number)
            .ok_or_else(|| Error::NotFound(format!("week {week_number} day {day_number}")))?;
        week.days.remove(position);
        renumber_days(&mut week.days);
        Ok(())
    })
}

// --- Exercises ---

/// Appends a default exercise record to a day.
/// # Errors
/// Returns `Error::NotFound` if the week or day does not exist.
pub fn add_exercise(program: &Program, week_number: u32, day_number: u32) -> Result<Program, Error> {
    add_exercise_with(program, week_number, day_number, &ExerciseRecord::default())
}

/// Same as [`add_exercise`] but appends a copy of `template`.
/// # Errors
/// See [`add_exercise`].
pub fn add_exercise_with(
    program: &Program,
    week_number: u32,
    day_number: u32,
    template: &ExerciseRecord,
) -> Result<Program, Error> {
    edit_copy(program, |p| {
        day_mut(p, week_number, day_number)?
            .exercises
            .push(template.clone());
        Ok(())
    })
}

/// Removes one exercise record from a day.
/// # Errors
/// - `Error::NotFound` if the week, day or index does not exist.
/// - `Error::InvariantViolation` if the day has only one exercise.
pub fn delete_exercise(
    program: &Program,
    week_number: u32,
    day_number: u32,
    exercise_index: usize,
) -> Result<Program, Error> {
    edit_copy(program, |p| {
        let day = day_mut(p, week_number, day_number)?;
        if day.exercises.len() <= 1 {
            return Err(Error::InvariantViolation(format!(
                "week {week_number} day {day_number} must keep at least one exercise"
            )));
        }
        if exercise_index >= day.exercises.len() {
            return Err(Error::NotFound(format!(
                "exercise {exercise_index} in week {week_number} day {day_number}"
            )));
        }
        day.exercises.remove(exercise_index);
        Ok(())
    })
}

/// Replaces one field of one exercise record.
/// # Errors
/// - `Error::NotFound` if the addressed record does not exist.
/// - `Error::Validation` if the value is outside the field's domain
///   (negative sets/reps/weight/rest, RPE outside 0-10, blank name, wrong value kind).
pub fn update_exercise_field(
    program: &Program,
    week_number: u32,
    day_number: u32,
    exercise_index: usize,
    field: ExerciseField,
    value: FieldValue,
) -> Result<Program, Error> {
    edit_copy(program, |p| {
        let record = exercise_mut(p, week_number, day_number, exercise_index)?;
        apply_field(record, field, value)
    })
}

/// Replaces the performed reps of one exercise record.
/// # Errors
/// - `Error::NotFound` if the addressed record does not exist.
/// - `Error::Validation` for negative entries or more entries than prescribed sets.
pub fn record_actual_reps(
    program: &Program,
    week_number: u32,
    day_number: u32,
    exercise_index: usize,
    reps: Vec<i64>,
) -> Result<Program, Error> {
    edit_copy(program, |p| {
        let record = exercise_mut(p, week_number, day_number, exercise_index)?;
        validate_actual_reps(&reps, record.sets)?;
        record.actual_reps = reps;
        Ok(())
    })
}

// --- Program metadata ---

/// # Errors
/// Returns `Error::Validation` if the name is blank.
pub fn rename_program(program: &Program, program_name: &str) -> Result<Program, Error> {
    let trimmed = program_name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation {
            field: "program-name".to_string(),
            reason: "name cannot be empty".to_string(),
        });
    }
    let mut next = program.clone();
    next.program_name = trimmed.to_string();
    Ok(next)
}

#[must_use]
pub fn set_start_date(program: &Program, start_date: NaiveDate) -> Program {
    let mut next = program.clone();
    next.start_date = start_date;
    next
}
