//src/main.rs
mod cli;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use std::io::{self, stdout};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

use training_program_lib::{
    AppService, ClientOverview, Program, ProgramSummary, ProgressView, TrainerStats, Units, Week,
};

fn main() -> Result<()> {
    let cli_args = cli::parse_args();
    let export_csv = cli_args.export_csv;

    if let cli::Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command();
        let bin_name = cmd.get_name().to_string();

        eprintln!("Generating completion script for {shell}...");
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout());
        return Ok(());
    }

    // Up before initialization so config/db path warnings are not lost
    let log_handle = init_logging();

    // Loads config and opens the database
    let mut service =
        AppService::initialize().context("Failed to initialize application service")?;
    apply_log_level(&log_handle, &service.config.log_level);

    let header_color = training_program_lib::parse_color(&service.config.theme.header_color)
        .map_or(Color::Green, Color::from);
    let units = service.config.units;

    match cli_args.command {
        cli::Commands::GenerateCompletion { .. } => {
            unreachable!("Completion generation should have exited already");
        }

        // --- Programs ---
        cli::Commands::Create {
            client,
            name,
            start,
        } => {
            let program = service.create_program(&client, &name, start)?;
            println!(
                "Created program '{}' for client '{}' starting {} (ID: {})",
                program.program_name, program.client_id, program.start_date, program.id
            );
        }
        cli::Commands::List { client } => {
            let summaries = service.list_programs(&client)?;
            if export_csv {
                print_summary_csv(&summaries)?;
            } else if summaries.is_empty() {
                println!("No programs found for client '{}'.", client.trim());
            } else {
                print_summary_table(&summaries, header_color);
            }
        }
        cli::Commands::Overview { client } => {
            let overview = service.client_overview(&client)?;
            print_overview(&overview, header_color);
        }
        cli::Commands::Stats => {
            let stats = service.trainer_stats()?;
            if export_csv {
                print_stats_csv(&stats)?;
            } else {
                print_stats(&stats, header_color);
            }
        }
        cli::Commands::Show { program, week } => {
            let program = service.get_program(&program)?;
            let weeks: Vec<&Week> = match week {
                Some(n) => vec![program
                    .week(n)
                    .with_context(|| format!("Week {n} not found in program '{}'", program.id))?],
                None => program.weeks.iter().collect(),
            };
            if export_csv {
                print_program_csv(&program, &weeks)?;
            } else {
                println!(
                    "{} (client: {}, start: {}, {})",
                    program.program_name,
                    program.client_id,
                    program.start_date,
                    program.lifecycle_state()
                );
                print_program_table(&program, &weeks, header_color, units);
            }
        }
        cli::Commands::Progress { program } => {
            let progress = service.progress(&program)?;
            let program = service.get_program(&program)?;
            print_progress(&program, &progress, header_color, units);
        }

        // --- Structural edits ---
        cli::Commands::AddWeek { program } => {
            let updated = service.add_week(&program)?;
            println!("Added week {} to '{}'.", updated.weeks.len(), updated.program_name);
        }
        cli::Commands::DeleteWeek { program, week } => {
            let updated = service.delete_week(&program, week)?;
            println!(
                "Deleted week {week} from '{}'. {} week(s) remain.",
                updated.program_name,
                updated.weeks.len()
            );
        }
        cli::Commands::CopyWeek { program, week } => {
            let updated = service.copy_week(&program, week)?;
            println!(
                "Copied week {week} of '{}' to new week {}.",
                updated.program_name,
                updated.weeks.len()
            );
        }
        cli::Commands::AddDay { program, week } => {
            let updated = service.add_day(&program, week)?;
            let days = updated.week(week).map_or(0, |w| w.days.len());
            println!("Added day {days} to week {week} of '{}'.", updated.program_name);
        }
        cli::Commands::DeleteDay { program, week, day } => {
            let updated = service.delete_day(&program, week, day)?;
            println!("Deleted day {day} from week {week} of '{}'.", updated.program_name);
        }
        cli::Commands::AddExercise { program, week, day } => {
            let updated = service.add_exercise(&program, week, day)?;
            println!(
                "Added exercise to week {week} day {day} of '{}'.",
                updated.program_name
            );
        }
        cli::Commands::DeleteExercise {
            program,
            week,
            day,
            index,
        } => {
            let updated = service.delete_exercise(&program, week, day, index)?;
            println!(
                "Deleted exercise {index} from week {week} day {day} of '{}'.",
                updated.program_name
            );
        }
        cli::Commands::SetField {
            program,
            week,
            day,
            index,
            field,
            value,
        } => {
            service.update_exercise_field(&program, week, day, index, field, &value)?;
            println!("Set {field} of exercise {index} (week {week} day {day}) to {}.", value.trim());
        }
        cli::Commands::RecordReps {
            program,
            week,
            day,
            index,
            reps,
        } => {
            let count = reps.len();
            service.record_actual_reps(&program, week, day, index, reps)?;
            println!("Recorded {count} set(s) for exercise {index} (week {week} day {day}).");
        }
        cli::Commands::Rename { program, name } => {
            let updated = service.rename_program(&program, &name)?;
            println!("Program renamed to '{}'.", updated.program_name);
        }
        cli::Commands::SetStartDate { program, date } => {
            let updated = service.set_start_date(&program, date)?;
            println!("'{}' now starts {}.", updated.program_name, updated.start_date);
        }

        // --- Position & lifecycle ---
        cli::Commands::Advance { program, week, day } => {
            let updated = service.advance_position(&program, week, day)?;
            print_position(&updated);
        }
        cli::Commands::Next { program } => {
            let updated = service.next_session(&program)?;
            print_position(&updated);
        }
        cli::Commands::CorrectPosition { program, week, day } => {
            let updated = service.correct_position(&program, week, day)?;
            print_position(&updated);
        }
        cli::Commands::Complete { program } => {
            let updated = service.complete_program(&program)?;
            println!("Program '{}' marked as completed.", updated.program_name);
        }

        // --- Config ---
        cli::Commands::SetUnits { units } => {
            let units = match units {
                cli::UnitsCli::Metric => Units::Metric,
                cli::UnitsCli::Imperial => Units::Imperial,
            };
            service.set_units(units)?;
            println!("Units set to {units:?}.");
        }
        cli::Commands::SetDefaultExercise { name } => {
            service.set_default_exercise_name(&name)?;
            println!(
                "New exercises will be named '{}'.",
                service.config.default_exercise_name
            );
        }
        cli::Commands::SetOptimisticConcurrency { enabled } => {
            service.set_optimistic_concurrency(enabled)?;
            if enabled {
                println!("Saving a stale copy of a program will now be rejected.");
            } else {
                println!("The last save of a program now wins.");
            }
        }
        cli::Commands::SetLogLevel { level } => {
            service.set_log_level(&level)?;
            println!("Log level set to {}.", service.config.log_level);
        }
        cli::Commands::SetHeaderColor { color } => {
            service.set_header_color(&color)?;
            println!("Header color set to {}.", service.config.theme.header_color);
        }
        cli::Commands::ConfigPath => {
            println!("Config file is located at: {:?}", service.get_config_path());
        }
        cli::Commands::DbPath => {
            println!("Database file is located at: {:?}", service.get_db_path());
        }
    }

    Ok(())
}

type LogHandle = reload::Handle<EnvFilter, Registry>;

fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("training_program_lib={level},program_tracker={level}"))
}

/// Installs a stderr subscriber at the default level. `RUST_LOG` wins when set.
fn init_logging() -> LogHandle {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level_filter(&training_program_lib::Config::default().log_level));
    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
    handle
}

/// Switches to the configured level unless `RUST_LOG` is set.
fn apply_log_level(handle: &LogHandle, level: &str) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    if let Err(err) = handle.reload(level_filter(level)) {
        eprintln!("Warning: could not apply log level '{level}': {err}");
    }
}

fn print_position(program: &Program) {
    if program.completed {
        println!("'{}' is completed.", program.program_name);
    } else {
        println!(
            "'{}' is now at week {} day {}.",
            program.program_name, program.current_week, program.current_day
        );
    }
}

fn format_reps(reps: &[i64]) -> String {
    if reps.is_empty() {
        "-".to_string()
    } else {
        reps.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn print_program_table(program: &Program, weeks: &[&Week], header_color: Color, units: Units) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("").fg(header_color),
            Cell::new("Week").fg(header_color),
            Cell::new("Day").fg(header_color),
            Cell::new("#").fg(header_color),
            Cell::new("Exercise").fg(header_color),
            Cell::new("Sets").fg(header_color),
            Cell::new("Target Reps").fg(header_color),
            Cell::new(format!("Weight ({})", units.weight_label())).fg(header_color),
            Cell::new("RPE").fg(header_color),
            Cell::new("Rest (s)").fg(header_color),
            Cell::new("Actual Reps").fg(header_color),
        ]);

    for week in weeks {
        for day in &week.days {
            let is_current = !program.completed
                && week.week_number == program.current_week
                && day.day_number == program.current_day;
            for (index, exercise) in day.exercises.iter().enumerate() {
                table.add_row(vec![
                    Cell::new(if is_current && index == 0 { "*" } else { "" }),
                    Cell::new(week.week_number),
                    Cell::new(day.day_number),
                    Cell::new(index),
                    Cell::new(&exercise.name),
                    Cell::new(exercise.sets),
                    Cell::new(exercise.target_reps),
                    Cell::new(format!("{:.2}", exercise.weight)),
                    Cell::new(format!("{:.1}", exercise.rpe)),
                    Cell::new(exercise.rest),
                    Cell::new(format_reps(&exercise.actual_reps)),
                ]);
            }
        }
    }
    println!("{table}");
}

fn print_program_csv(program: &Program, weeks: &[&Week]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record([
        "program_id",
        "week",
        "day",
        "index",
        "exercise",
        "sets",
        "target_reps",
        "weight",
        "rpe",
        "rest",
        "actual_reps",
    ])?;
    for week in weeks {
        for day in &week.days {
            for (index, exercise) in day.exercises.iter().enumerate() {
                writer.write_record(&[
                    program.id.clone(),
                    week.week_number.to_string(),
                    day.day_number.to_string(),
                    index.to_string(),
                    exercise.name.clone(),
                    exercise.sets.to_string(),
                    exercise.target_reps.to_string(),
                    exercise.weight.to_string(),
                    exercise.rpe.to_string(),
                    exercise.rest.to_string(),
                    format_reps(&exercise.actual_reps),
                ])?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

fn print_summary_table(summaries: &[ProgramSummary], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(header_color),
            Cell::new("Name").fg(header_color),
            Cell::new("Start").fg(header_color),
            Cell::new("Position").fg(header_color),
            Cell::new("Weeks").fg(header_color),
            Cell::new("Status").fg(header_color),
        ]);

    for summary in summaries {
        table.add_row(vec![
            Cell::new(&summary.id),
            Cell::new(&summary.program_name),
            Cell::new(summary.start_date),
            Cell::new(format!("W{} D{}", summary.current_week, summary.current_day)),
            Cell::new(summary.total_weeks),
            Cell::new(if summary.completed { "Completed" } else { "Active" }),
        ]);
    }
    println!("{table}");
}

fn print_summary_csv(summaries: &[ProgramSummary]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record([
        "id",
        "client_id",
        "program_name",
        "start_date",
        "current_week",
        "current_day",
        "total_weeks",
        "completed",
        "version",
    ])?;
    for summary in summaries {
        writer.write_record(&[
            summary.id.clone(),
            summary.client_id.clone(),
            summary.program_name.clone(),
            summary.start_date.to_string(),
            summary.current_week.to_string(),
            summary.current_day.to_string(),
            summary.total_weeks.to_string(),
            summary.completed.to_string(),
            summary.version.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_overview(overview: &ClientOverview, header_color: Color) {
    println!(
        "Client '{}': {} active, {} completed program(s)",
        overview.client_id, overview.active_count, overview.completed_count
    );
    match &overview.current {
        Some(current) => println!(
            "Current program: {} (week {} of {})",
            current.program_name, current.current_week, current.total_weeks
        ),
        None => println!("No program in progress."),
    }
    if !overview.completed.is_empty() {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Past Program").fg(header_color),
                Cell::new("Completed").fg(header_color),
            ]);
        for past in &overview.completed {
            table.add_row(vec![
                Cell::new(&past.program_name),
                Cell::new(
                    past.updated_at
                        .map_or("-".to_string(), |t| t.format("%b %Y").to_string()),
                ),
            ]);
        }
        println!("{table}");
    }
}

fn print_stats(stats: &TrainerStats, header_color: Color) {
    println!(
        "{} program(s) for {} client(s): {} completed, {} in progress",
        stats.total_programs, stats.client_count, stats.completed_count, stats.in_progress_count
    );
    if stats.exercise_distribution.is_empty() {
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Program").fg(header_color),
            Cell::new("Client").fg(header_color),
            Cell::new("Exercises").fg(header_color),
        ]);
    for entry in &stats.exercise_distribution {
        table.add_row(vec![
            Cell::new(&entry.program_name),
            Cell::new(&entry.client_id),
            Cell::new(entry.total_exercises),
        ]);
    }
    println!("{table}");
}

fn print_stats_csv(stats: &TrainerStats) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["program_id", "program_name", "client_id", "total_exercises"])?;
    for entry in &stats.exercise_distribution {
        writer.write_record(&[
            entry.program_id.clone(),
            entry.program_name.clone(),
            entry.client_id.clone(),
            entry.total_exercises.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_progress(program: &Program, progress: &ProgressView, header_color: Color, units: Units) {
    println!(
        "{}: week {} of {} ({:.1}% complete) [{}]",
        program.program_name,
        program.current_week,
        progress.total_weeks,
        progress.percent_complete,
        progress.state
    );
    match &progress.current_day_view {
        Some(day) => println!(
            "Current session: week {} day {} ({} exercise(s))",
            progress.current_week_view.week_number,
            day.day_number,
            day.exercises.len()
        ),
        None => println!("Current day {} is not part of this week.", program.current_day),
    }
    print_program_table(program, &[&progress.current_week_view], header_color, units);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_configured_level_replaces_startup_level() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let (filter, handle) = reload::Layer::new(level_filter("warn"));
        let subscriber = tracing_subscriber::registry().with(filter);
        tracing::subscriber::with_default(subscriber, || {
            assert!(tracing::enabled!(Level::WARN));
            assert!(!tracing::enabled!(Level::DEBUG));
            apply_log_level(&handle, "debug");
            assert!(tracing::enabled!(Level::DEBUG));
            apply_log_level(&handle, "error");
            assert!(!tracing::enabled!(Level::WARN));
        });
    }
}
