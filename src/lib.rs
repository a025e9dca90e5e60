// src/lib.rs
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// --- Declare modules ---
mod config;
pub mod db;
pub mod engine;
pub mod model;
pub mod progress;

// --- Expose public types ---
pub use config::{
    get_config_path as get_config_path_util,
    load as load_config_util,
    parse_color,
    parse_log_level,
    save as save_config_util,
    Config,
    Error as ConfigError,
    StandardColor,
    Theme,
    Units,
};

pub use db::{
    get_db_path as get_db_path_util,
    Error as StoreError,
    ProgramStore,
    SaveAck,
    SqliteStore,
};

pub use engine::Error as EngineError;

pub use model::{
    validate_program, Day, ExerciseField, ExerciseRecord, FieldValue, LifecycleState, Program,
    ProgramSummary, Week,
};

pub use progress::{compute_progress, ProgressView};

/// What a trainer sees for one client: the program in progress, past programs and counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOverview {
    pub client_id: String,
    /// First non-completed program by start date, then name.
    pub current: Option<ProgramSummary>,
    pub completed: Vec<ProgramSummary>,
    pub active_count: usize,
    pub completed_count: usize,
}

/// Trainer-wide numbers across every client's programs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainerStats {
    pub total_programs: usize,
    pub client_count: usize,
    pub completed_count: usize,
    pub in_progress_count: usize,
    /// Exercise count of each program, in listing order.
    pub exercise_distribution: Vec<ProgramExerciseCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramExerciseCount {
    pub program_id: String,
    pub program_name: String,
    pub client_id: String,
    pub total_exercises: usize,
}

pub struct AppService {
    pub config: Config,
    pub store: Box<dyn ProgramStore>,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

impl AppService {
    /// Initializes the application service.
    /// # Errors
    /// Returns `anyhow::Error` if config/db path determination, loading, or initialization fails.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load(&config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"))?;

        let db_path = db::get_db_path().context("Failed to determine database path")?;
        let store = SqliteStore::open(&db_path, config.optimistic_concurrency)
            .with_context(|| format!("Failed to open database at {db_path:?}"))?;

        Ok(Self {
            config,
            store: Box::new(store),
            db_path,
            config_path,
        })
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    /// Saves the current configuration state.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save(&self.config_path, &self.config)
    }

    /// # Errors
    /// Returns `ConfigError` variants if saving fails.
    pub fn set_units(&mut self, units: Units) -> Result<(), ConfigError> {
        self.config.units = units;
        self.save_config()
    }

    /// # Errors
    /// - `ConfigError::EmptyExerciseName` if the name is blank.
    /// - `ConfigError` variants if saving fails.
    pub fn set_default_exercise_name(&mut self, name: &str) -> Result<(), ConfigError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyExerciseName);
        }
        self.config.default_exercise_name = trimmed.to_string();
        self.save_config()
    }

    /// Applies to the open store immediately and is persisted for later runs.
    /// # Errors
    /// Returns `ConfigError` variants if saving fails.
    pub fn set_optimistic_concurrency(&mut self, enabled: bool) -> Result<(), ConfigError> {
        self.config.optimistic_concurrency = enabled;
        self.store.set_optimistic_concurrency(enabled);
        self.save_config()
    }

    /// # Errors
    /// - `ConfigError::InvalidLogLevel` for unknown levels.
    /// - `ConfigError` variants if saving fails.
    pub fn set_log_level(&mut self, level: &str) -> Result<(), ConfigError> {
        self.config.log_level = parse_log_level(level)?;
        self.save_config()
    }

    /// # Errors
    /// - `ConfigError::InvalidColor` for unknown colors.
    /// - `ConfigError` variants if saving fails.
    pub fn set_header_color(&mut self, color: &str) -> Result<(), ConfigError> {
        let parsed = parse_color(color)?;
        self.config.theme.header_color = format!("{parsed:?}");
        self.save_config()
    }

    /// The record used to seed new weeks, days and exercises.
    #[must_use]
    pub fn exercise_template(&self) -> ExerciseRecord {
        let name = self.config.default_exercise_name.trim();
        if name.is_empty() {
            ExerciseRecord::default()
        } else {
            ExerciseRecord::named(name)
        }
    }

    // --- Programs ---

    /// Creates a seeded program and persists it, moving it from Draft to Active.
    /// # Errors
    /// Returns `anyhow::Error` if the names are blank or the save fails.
    pub fn create_program(
        &mut self,
        client_id: &str,
        program_name: &str,
        start_date: NaiveDate,
    ) -> Result<Program> {
        if client_id.trim().is_empty() {
            bail!("Client id cannot be empty.");
        }
        if program_name.trim().is_empty() {
            bail!("Program name cannot be empty.");
        }
        let draft =
            Program::with_template(client_id, program_name, start_date, &self.exercise_template());
        let program = self.persist(draft)?;
        info!(program_id = %program.id, client_id = %program.client_id, "Created program");
        Ok(program)
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError::NotFound` for unknown ids.
    pub fn get_program(&self, program_id: &str) -> Result<Program> {
        self.store
            .load(program_id.trim())
            .with_context(|| format!("Failed to load program '{}'", program_id.trim()))
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError` variants.
    pub fn list_programs(&self, client_id: &str) -> Result<Vec<ProgramSummary>> {
        self.store
            .list_by_client(client_id.trim())
            .with_context(|| format!("Failed to list programs for client '{}'", client_id.trim()))
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError` variants.
    pub fn client_overview(&self, client_id: &str) -> Result<ClientOverview> {
        let summaries = self.list_programs(client_id)?;
        let (completed, active): (Vec<_>, Vec<_>) =
            summaries.into_iter().partition(|s| s.completed);
        Ok(ClientOverview {
            client_id: client_id.trim().to_string(),
            active_count: active.len(),
            completed_count: completed.len(),
            current: active.into_iter().next(),
            completed,
        })
    }

    /// Completed vs in-progress counts and per-program exercise totals over all clients.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError` variants.
    pub fn trainer_stats(&self) -> Result<TrainerStats> {
        let summaries = self
            .store
            .list_all()
            .context("Failed to list programs for statistics")?;
        let completed_count = summaries.iter().filter(|s| s.completed).count();
        let client_count = summaries
            .iter()
            .map(|s| s.client_id.as_str())
            .collect::<BTreeSet<_>>()
            .len();
        Ok(TrainerStats {
            total_programs: summaries.len(),
            client_count,
            completed_count,
            in_progress_count: summaries.len() - completed_count,
            exercise_distribution: summaries
                .into_iter()
                .map(|s| ProgramExerciseCount {
                    program_id: s.id,
                    program_name: s.program_name,
                    client_id: s.client_id,
                    total_exercises: s.total_exercises,
                })
                .collect(),
        })
    }

    /// # Errors
    /// Returns `anyhow::Error` if loading fails or the position pointer is stale.
    pub fn progress(&self, program_id: &str) -> Result<ProgressView> {
        let program = self.get_program(program_id)?;
        compute_progress(&program)
            .with_context(|| format!("Failed to compute progress for program '{}'", program.id))
    }

    /// Saves `program` and returns it with its new version stamped in.
    fn persist(&mut self, mut program: Program) -> Result<Program> {
        let ack = self
            .store
            .save(&program)
            .with_context(|| format!("Failed to save program '{}'", program.id))?;
        program.version = ack.version;
        program.updated_at = Some(ack.updated_at);
        Ok(program)
    }

    /// Loads a program, applies `edit`, repairs a stale position pointer and saves.
    /// Nothing is saved if `edit` fails.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `EngineError` or `StoreError` variants.
    pub fn apply_edit<F>(&mut self, program_id: &str, edit: F) -> Result<Program>
    where
        F: FnOnce(&Program) -> Result<Program, EngineError>,
    {
        let current = self.get_program(program_id)?;
        let edited = edit(&current)?;
        let repaired = progress::clamp_position(&edited);
        debug!(
            program_id = %repaired.id,
            weeks = repaired.weeks.len(),
            "Applied edit"
        );
        self.persist(repaired)
    }

    // --- Structural edits ---

    /// # Errors
    /// See [`AppService::apply_edit`].
    pub fn add_week(&mut self, program_id: &str) -> Result<Program> {
        let template = self.exercise_template();
        self.apply_edit(program_id, |p| Ok(engine::add_week_with(p, &template)))
    }

    /// # Errors
    /// See [`engine::delete_week`].
    pub fn delete_week(&mut self, program_id: &str, week_number: u32) -> Result<Program> {
        self.apply_edit(program_id, |p| engine::delete_week(p, week_number))
    }

    /// # Errors
    /// See [`engine::copy_week`].
    pub fn copy_week(&mut self, program_id: &str, week_number: u32) -> Result<Program> {
        self.apply_edit(program_id, |p| engine::copy_week(p, week_number))
    }

    /// # Errors
    /// See [`engine::add_day`].
    pub fn add_day(&mut self, program_id: &str, week_number: u32) -> Result<Program> {
        let template = self.exercise_template();
        self.apply_edit(program_id, |p| engine::add_day_with(p, week_number, &template))
    }

    /// # Errors
    /// See [`engine::delete_day`].
    pub fn delete_day(&mut self, program_id: &str, week_number: u32, day_number: u32) -> Result<Program> {
        self.apply_edit(program_id, |p| engine::delete_day(p, week_number, day_number))
    }

    /// # Errors
    /// See [`engine::add_exercise`].
    pub fn add_exercise(&mut self, program_id: &str, week_number: u32, day_number: u32) -> Result<Program> {
        let template = self.exercise_template();
        self.apply_edit(program_id, |p| {
            engine::add_exercise_with(p, week_number, day_number, &template)
        })
    }

    /// # Errors
    /// See [`engine::delete_exercise`].
    pub fn delete_exercise(
        &mut self,
        program_id: &str,
        week_number: u32,
        day_number: u32,
        exercise_index: usize,
    ) -> Result<Program> {
        self.apply_edit(program_id, |p| {
            engine::delete_exercise(p, week_number, day_number, exercise_index)
        })
    }

    /// Parses `raw_value` for `field` and applies it.
    /// # Errors
    /// See [`engine::update_exercise_field`].
    pub fn update_exercise_field(
        &mut self,
        program_id: &str,
        week_number: u32,
        day_number: u32,
        exercise_index: usize,
        field: ExerciseField,
        raw_value: &str,
    ) -> Result<Program> {
        let value = FieldValue::parse_for(field, raw_value)?;
        self.apply_edit(program_id, |p| {
            engine::update_exercise_field(p, week_number, day_number, exercise_index, field, value)
        })
    }

    /// # Errors
    /// See [`engine::record_actual_reps`].
    pub fn record_actual_reps(
        &mut self,
        program_id: &str,
        week_number: u32,
        day_number: u32,
        exercise_index: usize,
        reps: Vec<i64>,
    ) -> Result<Program> {
        self.apply_edit(program_id, |p| {
            engine::record_actual_reps(p, week_number, day_number, exercise_index, reps)
        })
    }

    /// # Errors
    /// See [`engine::rename_program`].
    pub fn rename_program(&mut self, program_id: &str, program_name: &str) -> Result<Program> {
        self.apply_edit(program_id, |p| engine::rename_program(p, program_name))
    }

    /// # Errors
    /// Returns `anyhow::Error` if loading or saving fails.
    pub fn set_start_date(&mut self, program_id: &str, start_date: NaiveDate) -> Result<Program> {
        self.apply_edit(program_id, |p| Ok(engine::set_start_date(p, start_date)))
    }

    // --- Position & lifecycle ---

    /// # Errors
    /// See [`progress::advance_position`].
    pub fn advance_position(&mut self, program_id: &str, week_number: u32, day_number: u32) -> Result<Program> {
        self.apply_edit(program_id, |p| {
            progress::advance_position(p, week_number, day_number)
        })
    }

    /// # Errors
    /// See [`progress::correct_position`].
    pub fn correct_position(&mut self, program_id: &str, week_number: u32, day_number: u32) -> Result<Program> {
        self.apply_edit(program_id, |p| {
            progress::correct_position(p, week_number, day_number)
        })
    }

    /// # Errors
    /// Returns `anyhow::Error` if loading or saving fails.
    pub fn next_session(&mut self, program_id: &str) -> Result<Program> {
        self.apply_edit(program_id, |p| Ok(progress::next_session(p)))
    }

    /// # Errors
    /// Returns `anyhow::Error` if loading or saving fails.
    pub fn complete_program(&mut self, program_id: &str) -> Result<Program> {
        let program = self.apply_edit(program_id, |p| Ok(progress::complete_program(p)))?;
        info!(program_id = %program.id, "Program completed");
        Ok(program)
    }
}
