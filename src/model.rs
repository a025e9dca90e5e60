// src/model.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::engine::Error;

pub const DEFAULT_EXERCISE_NAME: &str = "New Exercise";
pub const MAX_RPE: f64 = 10.0;

/// A single prescribed movement: targets plus what was actually performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseRecord {
    pub name: String,
    pub sets: i64,
    pub target_reps: i64,
    pub weight: f64,
    pub rpe: f64,
    /// Rest between sets, in seconds.
    #[serde(default)]
    pub rest: i64,
    /// One entry per performed set. Shorter than `sets` while in progress.
    #[serde(default)]
    pub actual_reps: Vec<i64>,
}

impl ExerciseRecord {
    /// A default record carrying the given name.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            sets: 1,
            target_reps: 0,
            weight: 0.0,
            rpe: 0.0,
            rest: 0,
            actual_reps: Vec::new(),
        }
    }

    /// Checks every field against its domain.
    /// # Errors
    /// Returns `Error::Validation` naming the first offending field.
    pub fn validate(&self) -> Result<(), Error> {
        validate_name(&self.name)?;
        validate_count(ExerciseField::Sets, self.sets)?;
        validate_count(ExerciseField::TargetReps, self.target_reps)?;
        validate_count(ExerciseField::Rest, self.rest)?;
        validate_weight(self.weight)?;
        validate_rpe(self.rpe)?;
        validate_actual_reps(&self.actual_reps, self.sets)
    }
}

impl Default for ExerciseRecord {
    fn default() -> Self {
        Self::named(DEFAULT_EXERCISE_NAME)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Day {
    pub day_number: u32,
    pub exercises: Vec<ExerciseRecord>,
}

impl Day {
    /// A day holding one copy of `template`.
    #[must_use]
    pub fn seeded(day_number: u32, template: &ExerciseRecord) -> Self {
        Self {
            day_number,
            exercises: vec![template.clone()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Week {
    pub week_number: u32,
    pub days: Vec<Day>,
}

impl Week {
    #[must_use]
    pub fn seeded(week_number: u32, template: &ExerciseRecord) -> Self {
        Self {
            week_number,
            days: vec![Day::seeded(1, template)],
        }
    }

    pub fn day(&self, day_number: u32) -> Option<&Day> {
        self.days.iter().find(|d| d.day_number == day_number)
    }
}

/// A multi-week training plan assigned to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: String,
    pub client_id: String,
    pub program_name: String,
    pub start_date: NaiveDate,
    pub current_week: u32,
    pub current_day: u32,
    pub completed: bool,
    pub weeks: Vec<Week>,
    /// Stored version; 0 until the first successful save.
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Program {
    /// Creates a draft program seeded with one week, one day and one default exercise.
    #[must_use]
    pub fn new(client_id: &str, program_name: &str, start_date: NaiveDate) -> Self {
        Self::with_template(client_id, program_name, start_date, &ExerciseRecord::default())
    }

    #[must_use]
    pub fn with_template(
        client_id: &str,
        program_name: &str,
        start_date: NaiveDate,
        template: &ExerciseRecord,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.trim().to_string(),
            program_name: program_name.trim().to_string(),
            start_date,
            current_week: 1,
            current_day: 1,
            completed: false,
            weeks: vec![Week::seeded(1, template)],
            version: 0,
            updated_at: None,
        }
    }

    pub fn week(&self, week_number: u32) -> Option<&Week> {
        self.weeks.iter().find(|w| w.week_number == week_number)
    }

    #[must_use]
    pub fn total_weeks(&self) -> usize {
        self.weeks.len()
    }

    /// Exercise records across every week and day.
    #[must_use]
    pub fn total_exercises(&self) -> usize {
        self.weeks
            .iter()
            .flat_map(|w| &w.days)
            .map(|d| d.exercises.len())
            .sum()
    }

    /// Draft until first persisted, then Active until the completion flag is set.
    #[must_use]
    pub const fn lifecycle_state(&self) -> LifecycleState {
        if self.completed {
            LifecycleState::Completed
        } else if self.version == 0 {
            LifecycleState::Draft
        } else {
            LifecycleState::Active
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum LifecycleState {
    Draft,
    Active,
    Completed,
}

/// Lightweight listing row for a program, as returned by `list_by_client`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramSummary {
    pub id: String,
    pub client_id: String,
    pub program_name: String,
    pub start_date: NaiveDate,
    pub current_week: u32,
    pub current_day: u32,
    pub total_weeks: usize,
    #[serde(default)]
    pub total_exercises: usize,
    pub completed: bool,
    pub version: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Program> for ProgramSummary {
    fn from(program: &Program) -> Self {
        Self {
            id: program.id.clone(),
            client_id: program.client_id.clone(),
            program_name: program.program_name.clone(),
            start_date: program.start_date,
            current_week: program.current_week,
            current_day: program.current_day,
            total_weeks: program.total_weeks(),
            total_exercises: program.total_exercises(),
            completed: program.completed,
            version: program.version,
            updated_at: program.updated_at,
        }
    }
}

/// The editable fields of an `ExerciseRecord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, Display)]
#[strum(ascii_case_insensitive)]
pub enum ExerciseField {
    #[strum(serialize = "name")]
    Name,
    #[strum(serialize = "sets")]
    Sets,
    #[strum(to_string = "target-reps", serialize = "targetReps", serialize = "reps")]
    TargetReps,
    #[strum(serialize = "weight")]
    Weight,
    #[strum(serialize = "rpe")]
    Rpe,
    #[strum(serialize = "rest")]
    Rest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Number(f64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "'{s}'"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl FieldValue {
    /// Parses raw user input into the value kind `field` expects.
    /// # Errors
    /// Returns `Error::Validation` if the text is not a number where one is required.
    pub fn parse_for(field: ExerciseField, raw: &str) -> Result<Self, Error> {
        let trimmed = raw.trim();
        match field {
            ExerciseField::Name => Ok(Self::Text(trimmed.to_string())),
            ExerciseField::Sets | ExerciseField::TargetReps | ExerciseField::Rest => trimmed
                .parse::<i64>()
                .map(Self::Integer)
                .map_err(|_| Error::validation(field, format!("'{trimmed}' is not a whole number"))),
            ExerciseField::Weight | ExerciseField::Rpe => trimmed
                .parse::<f64>()
                .map(Self::Number)
                .map_err(|_| Error::validation(field, format!("'{trimmed}' is not a number"))),
        }
    }
}

fn validate_name(name: &str) -> Result<(), Error> {
    if name.trim().is_empty() {
        return Err(Error::validation(ExerciseField::Name, "name cannot be empty"));
    }
    Ok(())
}

fn validate_count(field: ExerciseField, value: i64) -> Result<(), Error> {
    if value < 0 {
        return Err(Error::validation(field, format!("{value} is negative")));
    }
    Ok(())
}

fn validate_weight(weight: f64) -> Result<(), Error> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(Error::validation(
            ExerciseField::Weight,
            format!("{weight} must be a non-negative number"),
        ));
    }
    Ok(())
}

fn validate_rpe(rpe: f64) -> Result<(), Error> {
    if !rpe.is_finite() || !(0.0..=MAX_RPE).contains(&rpe) {
        return Err(Error::validation(
            ExerciseField::Rpe,
            format!("{rpe} is outside 0-{MAX_RPE}"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_actual_reps(reps: &[i64], sets: i64) -> Result<(), Error> {
    if let Some(bad) = reps.iter().find(|r| **r < 0) {
        return Err(Error::Validation {
            field: "actual-reps".to_string(),
            reason: format!("{bad} is negative"),
        });
    }
    if i64::try_from(reps.len()).map_or(true, |len| len > sets) {
        return Err(Error::Validation {
            field: "actual-reps".to_string(),
            reason: format!("{} entries recorded but only {sets} set(s) prescribed", reps.len()),
        });
    }
    Ok(())
}

/// Applies `value` to `field` of `record` after checking the field's domain.
/// `record` is left untouched on error.
pub(crate) fn apply_field(
    record: &mut ExerciseRecord,
    field: ExerciseField,
    value: FieldValue,
) -> Result<(), Error> {
    match (field, value) {
        (ExerciseField::Name, FieldValue::Text(name)) => {
            validate_name(&name)?;
            record.name = name.trim().to_string();
        }
        (ExerciseField::Sets, FieldValue::Integer(sets)) => {
            validate_count(field, sets)?;
            if i64::try_from(record.actual_reps.len()).map_or(true, |len| len > sets) {
                return Err(Error::validation(
                    field,
                    format!(
                        "{sets} is fewer than the {} set(s) already recorded",
                        record.actual_reps.len()
                    ),
                ));
            }
            record.sets = sets;
        }
        (ExerciseField::TargetReps, FieldValue::Integer(reps)) => {
            validate_count(field, reps)?;
            record.target_reps = reps;
        }
        (ExerciseField::Rest, FieldValue::Integer(rest)) => {
            validate_count(field, rest)?;
            record.rest = rest;
        }
        (ExerciseField::Weight, FieldValue::Number(weight)) => {
            validate_weight(weight)?;
            record.weight = weight;
        }
        (ExerciseField::Weight, FieldValue::Integer(weight)) => {
            validate_weight(weight as f64)?;
            record.weight = weight as f64;
        }
        (ExerciseField::Rpe, FieldValue::Number(rpe)) => {
            validate_rpe(rpe)?;
            record.rpe = rpe;
        }
        (ExerciseField::Rpe, FieldValue::Integer(rpe)) => {
            validate_rpe(rpe as f64)?;
            record.rpe = rpe as f64;
        }
        (field, value) => {
            return Err(Error::validation(
                field,
                format!("{value} is the wrong kind of value"),
            ));
        }
    }
    Ok(())
}

/// Checks every structural invariant of a program document:
/// non-empty weeks/days/exercises, `number == position + 1` at every level,
/// field domains, and a current position that exists while the program is not completed.
/// # Errors
/// Returns `Error::InvariantViolation` for structural problems and `Error::Validation`
/// for out-of-domain field values.
pub fn validate_program(program: &Program) -> Result<(), Error> {
    if program.weeks.is_empty() {
        return Err(Error::InvariantViolation(
            "a program must contain at least one week".to_string(),
        ));
    }
    for (week_index, week) in program.weeks.iter().enumerate() {
        if usize::try_from(week.week_number).ok() != Some(week_index + 1) {
            return Err(Error::InvariantViolation(format!(
                "week at position {} is numbered {}",
                week_index + 1,
                week.week_number
            )));
        }
        if week.days.is_empty() {
            return Err(Error::InvariantViolation(format!(
                "week {} must contain at least one day",
                week.week_number
            )));
        }
        for (day_index, day) in week.days.iter().enumerate() {
            if usize::try_from(day.day_number).ok() != Some(day_index + 1) {
                return Err(Error::InvariantViolation(format!(
                    "week {} day at position {} is numbered {}",
                    week.week_number,
                    day_index + 1,
                    day.day_number
                )));
            }
            if day.exercises.is_empty() {
                return Err(Error::InvariantViolation(format!(
                    "week {} day {} must contain at least one exercise",
                    week.week_number, day.day_number
                )));
            }
            for exercise in &day.exercises {
                exercise.validate()?;
            }
        }
    }

    if !program.completed {
        let Some(week) = program.week(program.current_week) else {
            return Err(Error::InvariantViolation(format!(
                "current week {} is outside 1-{}",
                program.current_week,
                program.weeks.len()
            )));
        };
        if week.day(program.current_day).is_none() {
            return Err(Error::InvariantViolation(format!(
                "current day {} does not exist in week {}",
                program.current_day, week.week_number
            )));
        }
    }
    Ok(())
}
