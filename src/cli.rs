// src/cli.rs
use chrono::{Duration, NaiveDate, Utc};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use training_program_lib::ExerciseField;

#[derive(Parser, Debug)]
#[command(author, version, about = "Build and track multi-week workout programs for your clients", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Print listings as CSV instead of tables
    #[arg(long, global = true)]
    pub export_csv: bool,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum UnitsCli {
    Metric,
    Imperial,
}

// Custom parser for date strings and shorthands
pub fn parse_date_shorthand(s: &str) -> Result<NaiveDate, String> {
    match s.to_lowercase().as_str() {
        "today" => Ok(Utc::now().date_naive()),
        "yesterday" => Ok((Utc::now() - Duration::days(1)).date_naive()),
        "tomorrow" => Ok((Utc::now() + Duration::days(1)).date_naive()),
        _ => ["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
            .ok_or_else(|| {
                format!(
                    "Invalid date format: '{s}'. Use 'today', 'yesterday', 'tomorrow', YYYY-MM-DD, DD.MM.YYYY, or YYYY/MM/DD."
                )
            }),
    }
}

pub fn parse_exercise_field(s: &str) -> Result<ExerciseField, String> {
    s.parse::<ExerciseField>().map_err(|_| {
        format!("Unknown field '{s}'. Use one of: name, sets, target-reps, weight, rpe, rest.")
    })
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new program for a client (seeded with one week, day and exercise)
    Create {
        /// Client the program is assigned to
        #[arg(short, long)]
        client: String,
        /// Name of the program
        #[arg(short, long)]
        name: String,
        /// Start date ('today', 'yesterday', 'tomorrow', YYYY-MM-DD, DD.MM.YYYY, YYYY/MM/DD)
        #[arg(long, value_parser = parse_date_shorthand, default_value = "today")]
        start: NaiveDate,
    },
    /// List a client's programs
    List {
        #[arg(short, long)]
        client: String,
    },
    /// Show a client's current program, past programs and counts
    Overview {
        #[arg(short, long)]
        client: String,
    },
    /// Completed vs in-progress programs and exercise totals across all clients
    Stats,
    /// Show every week, day and exercise of a program
    Show {
        program: String,
        /// Only show this week
        #[arg(short, long)]
        week: Option<u32>,
    },
    /// Show completion percentage and the current week/day
    Progress { program: String },
    /// Append a new week
    AddWeek { program: String },
    /// Delete a week and renumber the remaining weeks
    DeleteWeek { program: String, week: u32 },
    /// Append a copy of a week
    CopyWeek { program: String, week: u32 },
    /// Append a new day to a week
    AddDay { program: String, week: u32 },
    /// Delete a day and renumber the remaining days of its week
    DeleteDay { program: String, week: u32, day: u32 },
    /// Append a new exercise to a day
    AddExercise { program: String, week: u32, day: u32 },
    /// Delete an exercise (0-based index within its day)
    DeleteExercise {
        program: String,
        week: u32,
        day: u32,
        index: usize,
    },
    /// Set one field of an exercise (name, sets, target-reps, weight, rpe, rest)
    SetField {
        program: String,
        week: u32,
        day: u32,
        index: usize,
        #[arg(value_parser = parse_exercise_field)]
        field: ExerciseField,
        value: String,
    },
    /// Record the reps actually performed per set, e.g. "10,9,8"
    RecordReps {
        program: String,
        week: u32,
        day: u32,
        index: usize,
        #[arg(value_delimiter = ',', num_args = 0.., allow_negative_numbers = true)]
        reps: Vec<i64>,
    },
    /// Rename a program
    Rename { program: String, name: String },
    /// Change a program's start date
    SetStartDate {
        program: String,
        #[arg(value_parser = parse_date_shorthand)]
        date: NaiveDate,
    },
    /// Move the current position forward to a week/day
    Advance { program: String, week: u32, day: u32 },
    /// Move to the next training day (completes the program after the last day)
    Next { program: String },
    /// Administrative correction of the current position (may move backward)
    CorrectPosition { program: String, week: u32, day: u32 },
    /// Mark a program as completed
    Complete { program: String },
    /// Set preferred units (Metric/Imperial)
    SetUnits {
        #[arg(value_enum)]
        units: UnitsCli,
    },
    /// Set the name given to newly added exercises
    SetDefaultExercise { name: String },
    /// Reject saves of stale program copies (`true`) or let the last save win (`false`)
    SetOptimisticConcurrency {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Set the log level used when RUST_LOG is not set
    SetLogLevel { level: String },
    /// Set the table header color
    SetHeaderColor { color: String },
    /// Show the path to the config file
    ConfigPath,
    /// Show the path to the database file
    DbPath,
    GenerateCompletion {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
