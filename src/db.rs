// src/db.rs
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::engine;
use crate::model::{validate_program, Program, ProgramSummary};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database connection failed: {0}")]
    Connection(#[from] rusqlite::Error),
    #[error("Failed to get application data directory")]
    DataDir,
    #[error("I/O error accessing database file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode or decode program document: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Program not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Program was changed elsewhere (expected version {expected}, stored version {found}). Reload and retry.")]
    VersionConflict { expected: u64, found: u64 },
    #[error("Refusing to store an invalid program: {0}")]
    Invalid(#[from] engine::Error),
}

/// Acknowledgement of a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveAck {
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

/// Persistence contract for program documents.
pub trait ProgramStore {
    /// # Errors
    /// Returns `Error::NotFound` if no program has this id.
    fn load(&self, program_id: &str) -> Result<Program, Error>;

    /// Stores the program and returns its new version.
    /// # Errors
    /// - `Error::Invalid` if the program breaks a structural invariant.
    /// - `Error::Conflict` if a never-saved program reuses a stored id.
    /// - `Error::VersionConflict` if the stored version moved on since the program was loaded.
    fn save(&mut self, program: &Program) -> Result<SaveAck, Error>;

    /// Summaries of a client's programs ordered by start date, then name.
    /// # Errors
    /// Returns `Error::Connection` on query failure.
    fn list_by_client(&self, client_id: &str) -> Result<Vec<ProgramSummary>, Error>;

    /// Summaries of every stored program, across all clients, in the same order.
    /// # Errors
    /// Returns `Error::Connection` on query failure.
    fn list_all(&self) -> Result<Vec<ProgramSummary>, Error>;

    /// Switches between rejecting stale saves and last-write-wins.
    fn set_optimistic_concurrency(&mut self, enabled: bool);
}

const DB_FILE_NAME: &str = "programs.sqlite";
const DB_ENV_VAR: &str = "TRAINER_PROGRAMS_DB";

/// Gets the path to the SQLite database file within the app's data directory.
/// Exposed at crate root as `get_db_path_util`
/// # Errors
/// Returns `Error::DataDir` or `Error::Io` if the directory cannot be determined or created.
pub fn get_db_path() -> Result<PathBuf, Error> {
    if let Ok(path) = std::env::var(DB_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    let data_dir = dirs::data_dir().ok_or(Error::DataDir)?;
    let app_dir = data_dir.join(crate::config::APP_CONFIG_DIR); // Same dir name as config
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir)?;
    }
    Ok(app_dir.join(DB_FILE_NAME))
}

/// Initializes the database tables if they don't exist.
/// # Errors
/// Returns `Error::Connection` if a statement fails.
pub fn init_db(conn: &Connection) -> Result<(), Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS programs (
            id TEXT PRIMARY KEY NOT NULL,
            client_id TEXT NOT NULL,
            program_name TEXT NOT NULL,
            start_date TEXT NOT NULL,      -- YYYY-MM-DD
            completed INTEGER NOT NULL DEFAULT 0,
            current_week INTEGER NOT NULL,
            current_day INTEGER NOT NULL,
            total_weeks INTEGER NOT NULL,
            total_exercises INTEGER NOT NULL DEFAULT 0,
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL,      -- RFC3339
            document TEXT NOT NULL         -- JSON program document
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_programs_client_id ON programs(client_id)",
        [],
    )?;
    Ok(())
}

/// SQLite-backed `ProgramStore`. Each program is stored as one JSON document
/// plus a few indexed summary columns.
pub struct SqliteStore {
    conn: Connection,
    optimistic_concurrency: bool,
}

impl SqliteStore {
    /// Opens (and initializes) the database at `path`.
    /// # Errors
    /// Returns `Error::Connection` if the file cannot be opened or initialized.
    pub fn open<P: AsRef<Path>>(path: P, optimistic_concurrency: bool) -> Result<Self, Error> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn, optimistic_concurrency)
    }

    /// # Errors
    /// Returns `Error::Connection` if initialization fails.
    pub fn open_in_memory(optimistic_concurrency: bool) -> Result<Self, Error> {
        Self::from_connection(Connection::open_in_memory()?, optimistic_concurrency)
    }

    /// # Errors
    /// Returns `Error::Connection` if the schema cannot be created.
    pub fn from_connection(conn: Connection, optimistic_concurrency: bool) -> Result<Self, Error> {
        init_db(&conn)?;
        Ok(Self {
            conn,
            optimistic_concurrency,
        })
    }
}

fn stored_version(conn: &Connection, program_id: &str) -> Result<Option<u64>, Error> {
    let version: Option<i64> = conn
        .query_row(
            "SELECT version FROM programs WHERE id = ?1",
            params![program_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(version.map(to_version))
}

const SUMMARY_COLUMNS: &str = "id, client_id, program_name, start_date, completed,
    current_week, current_day, total_weeks, version, updated_at, total_exercises";

fn to_version(raw: i64) -> u64 {
    u64::try_from(raw).unwrap_or(0)
}

fn from_version(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

fn map_row_to_summary(row: &Row) -> Result<ProgramSummary, rusqlite::Error> {
    let total_weeks: i64 = row.get(7)?;
    let total_exercises: i64 = row.get(10)?;
    Ok(ProgramSummary {
        id: row.get(0)?,
        client_id: row.get(1)?,
        program_name: row.get(2)?,
        start_date: row.get::<_, NaiveDate>(3)?,
        completed: row.get(4)?,
        current_week: row.get(5)?,
        current_day: row.get(6)?,
        total_weeks: usize::try_from(total_weeks).unwrap_or(0),
        total_exercises: usize::try_from(total_exercises).unwrap_or(0),
        version: to_version(row.get(8)?),
        updated_at: Some(row.get::<_, DateTime<Utc>>(9)?),
    })
}

impl ProgramStore for SqliteStore {
    fn load(&self, program_id: &str) -> Result<Program, Error> {
        let row: Option<(String, i64, DateTime<Utc>)> = self
            .conn
            .query_row(
                "SELECT document, version, updated_at FROM programs WHERE id = ?1",
                params![program_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let (document, version, updated_at) =
            row.ok_or_else(|| Error::NotFound(program_id.to_string()))?;

        let mut program: Program = serde_json::from_str(&document)?;
        // Columns are authoritative for bookkeeping fields.
        program.version = to_version(version);
        program.updated_at = Some(updated_at);
        debug!(program_id, version = program.version, "Loaded program");
        Ok(program)
    }

    fn save(&mut self, program: &Program) -> Result<SaveAck, Error> {
        validate_program(program)?;

        // Write lock is held from the version read through the upsert.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let stored = stored_version(&tx, &program.id)?;
        if program.version == 0 && stored.is_some() {
            return Err(Error::Conflict(format!(
                "a program with id {} already exists",
                program.id
            )));
        }
        let found = stored.unwrap_or(0);
        if program.version != found {
            if self.optimistic_concurrency {
                return Err(Error::VersionConflict {
                    expected: program.version,
                    found,
                });
            }
            warn!(
                program_id = %program.id,
                expected = program.version,
                found,
                "Overwriting a newer stored program (last write wins)"
            );
        }

        let ack = SaveAck {
            version: found + 1,
            updated_at: Utc::now(),
        };
        let mut document = program.clone();
        document.version = ack.version;
        document.updated_at = Some(ack.updated_at);
        let json = serde_json::to_string(&document)?;

        tx.execute(
            "INSERT INTO programs (id, client_id, program_name, start_date, completed,
                                   current_week, current_day, total_weeks, total_exercises, version, updated_at, document)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(id) DO UPDATE SET
                client_id = excluded.client_id,
                program_name = excluded.program_name,
                start_date = excluded.start_date,
                completed = excluded.completed,
                current_week = excluded.current_week,
                current_day = excluded.current_day,
                total_weeks = excluded.total_weeks,
                total_exercises = excluded.total_exercises,
                version = excluded.version,
                updated_at = excluded.updated_at,
                document = excluded.document",
            params![
                document.id,
                document.client_id,
                document.program_name,
                document.start_date,
                document.completed,
                document.current_week,
                document.current_day,
                i64::try_from(document.weeks.len()).unwrap_or(i64::MAX),
                i64::try_from(document.total_exercises()).unwrap_or(i64::MAX),
                from_version(ack.version),
                ack.updated_at,
                json,
            ],
        )?;
        tx.commit()?;

        info!(
            program_id = %program.id,
            version = ack.version,
            "Saved program"
        );
        Ok(ack)
    }

    fn list_by_client(&self, client_id: &str) -> Result<Vec<ProgramSummary>, Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM programs
             WHERE client_id = ?1
             ORDER BY start_date ASC, program_name COLLATE NOCASE ASC"
        ))?;
        let summaries = stmt
            .query_map(params![client_id.trim()], map_row_to_summary)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    fn list_all(&self) -> Result<Vec<ProgramSummary>, Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM programs
             ORDER BY start_date ASC, program_name COLLATE NOCASE ASC"
        ))?;
        let summaries = stmt
            .query_map([], map_row_to_summary)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    fn set_optimistic_concurrency(&mut self, enabled: bool) {
        self.optimistic_concurrency = enabled;
    }
}
