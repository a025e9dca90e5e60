use chrono::NaiveDate;
use training_program_lib::engine::{self, Error};
use training_program_lib::progress::{
    advance_position, clamp_position, complete_program, compute_progress, correct_position,
    next_session,
};
use training_program_lib::{
    validate_program, ExerciseField, ExerciseRecord, FieldValue, LifecycleState, Program,
};

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
}

fn seed_program() -> Program {
    Program::new("client-1", "Strength Block", start_date())
}

// Program with `weeks` weeks, each holding `days` days.
fn program_with(weeks: usize, days: usize) -> Program {
    let mut program = seed_program();
    for _ in 1..weeks {
        program = engine::add_week(&program);
    }
    for week in 1..=weeks {
        for _ in 1..days {
            program = engine::add_day(&program, week as u32).unwrap();
        }
    }
    program
}

fn assert_contiguous(program: &Program) {
    for (i, week) in program.weeks.iter().enumerate() {
        assert_eq!(week.week_number as usize, i + 1);
        for (j, day) in week.days.iter().enumerate() {
            assert_eq!(day.day_number as usize, j + 1);
        }
    }
}

#[test]
fn test_new_program_is_seeded_draft() {
    let program = seed_program();
    assert_eq!(program.weeks.len(), 1);
    assert_eq!(program.weeks[0].days.len(), 1);
    assert_eq!(program.weeks[0].days[0].exercises, vec![ExerciseRecord::default()]);
    assert_eq!((program.current_week, program.current_day), (1, 1));
    assert!(!program.completed);
    assert_eq!(program.lifecycle_state(), LifecycleState::Draft);
    assert!(validate_program(&program).is_ok());
}

#[test]
fn test_add_week_then_delete_first_week() {
    let mut start = seed_program();
    start.weeks[0].days[0].exercises[0].name = "Squat".to_string();

    let two_weeks = engine::add_week(&start);
    assert_eq!(two_weeks.weeks.len(), 2);
    assert_eq!(two_weeks.weeks[1].week_number, 2);
    assert_eq!(two_weeks.weeks[1].days.len(), 1);
    assert_eq!(two_weeks.weeks[1].days[0].exercises.len(), 1);
    let second_week_days = two_weeks.weeks[1].days.clone();

    let one_week = engine::delete_week(&two_weeks, 1).unwrap();
    assert_eq!(one_week.weeks.len(), 1);
    assert_eq!(one_week.weeks[0].week_number, 1);
    assert_eq!(one_week.weeks[0].days, second_week_days);

    // Inputs untouched
    assert_eq!(start.weeks.len(), 1);
    assert_eq!(two_weeks.weeks.len(), 2);
}

#[test]
fn test_delete_only_week_is_rejected() {
    let program = seed_program();
    let before = program.clone();
    let result = engine::delete_week(&program, 1);
    assert!(matches!(result, Err(Error::InvariantViolation(_))));
    // Even an unknown week number fails the same way
    let result = engine::delete_week(&program, 7);
    assert!(matches!(result, Err(Error::InvariantViolation(_))));
    assert_eq!(program, before);
}

#[test]
fn test_delete_missing_week_is_not_found() {
    let program = program_with(3, 1);
    assert!(matches!(engine::delete_week(&program, 4), Err(Error::NotFound(_))));
}

#[test]
fn test_delete_middle_week_renumbers() {
    let mut program = program_with(4, 1);
    program.weeks[2].days[0].exercises[0].name = "Week three".to_string();

    let result = engine::delete_week(&program, 2).unwrap();
    assert_eq!(result.weeks.len(), 3);
    assert_contiguous(&result);
    assert_eq!(result.weeks[1].days[0].exercises[0].name, "Week three");
}

#[test]
fn test_delete_week_leaves_position_alone() {
    let program = correct_position(&program_with(3, 1), 3, 1).unwrap();
    let result = engine::delete_week(&program, 1).unwrap();
    assert_eq!((result.current_week, result.current_day), (3, 1));
    // The stale pointer is reported, then repaired on request
    assert!(matches!(compute_progress(&result), Err(Error::NotFound(_))));
    let repaired = clamp_position(&result);
    assert_eq!((repaired.current_week, repaired.current_day), (2, 1));
    assert!(validate_program(&repaired).is_ok());
}

#[test]
fn test_copy_week_is_deep() {
    let program = program_with(1, 2);
    let program = engine::update_exercise_field(
        &program,
        1,
        2,
        0,
        ExerciseField::Weight,
        FieldValue::Number(100.0),
    )
    .unwrap();

    let copied = engine::copy_week(&program, 1).unwrap();
    assert_eq!(copied.weeks.len(), 2);
    assert_eq!(copied.weeks[1].week_number, 2);
    assert_eq!(copied.weeks[1].days, copied.weeks[0].days);

    let edited = engine::update_exercise_field(
        &copied,
        2,
        2,
        0,
        ExerciseField::Weight,
        FieldValue::Number(140.0),
    )
    .unwrap();
    assert_eq!(edited.weeks[1].days[1].exercises[0].weight, 140.0);
    assert_eq!(edited.weeks[0].days[1].exercises[0].weight, 100.0);
    assert_eq!(copied.weeks[1].days[1].exercises[0].weight, 100.0);
}

#[test]
fn test_copy_missing_week_is_not_found() {
    let program = seed_program();
    assert!(matches!(engine::copy_week(&program, 2), Err(Error::NotFound(_))));
    assert!(matches!(engine::copy_week(&program, 0), Err(Error::NotFound(_))));
}

#[test]
fn test_add_day_numbers_and_seeds() {
    let program = engine::add_day(&seed_program(), 1).unwrap();
    let week = &program.weeks[0];
    assert_eq!(week.days.len(), 2);
    assert_eq!(week.days[1].day_number, 2);
    assert_eq!(week.days[1].exercises, vec![ExerciseRecord::default()]);
}

#[test]
fn test_add_day_to_missing_week_is_not_found() {
    assert!(matches!(engine::add_day(&seed_program(), 2), Err(Error::NotFound(_))));
}

#[test]
fn test_add_day_detects_duplicate_number() {
    let mut program = program_with(1, 2);
    // Corrupt numbering: days [2, 3]; the next number (3) already exists
    program.weeks[0].days[0].day_number = 2;
    program.weeks[0].days[1].day_number = 3;
    assert!(matches!(engine::add_day(&program, 1), Err(Error::Conflict(_))));
}

#[test]
fn test_add_then_delete_day_round_trips() {
    let mut program = program_with(2, 3);
    program.weeks[1].days[0].exercises[0].name = "Bench".to_string();
    program.weeks[1].days[2].exercises[0].name = "Row".to_string();

    let added = engine::add_day(&program, 2).unwrap();
    assert_eq!(added.weeks[1].days.len(), 4);
    let removed = engine::delete_day(&added, 2, 4).unwrap();
    assert_eq!(removed, program);
}

#[test]
fn test_delete_day_renumbers_siblings() {
    let mut program = program_with(1, 3);
    program.weeks[0].days[2].exercises[0].name = "Deadlift".to_string();

    let result = engine::delete_day(&program, 1, 1).unwrap();
    assert_eq!(result.weeks[0].days.len(), 2);
    assert_contiguous(&result);
    assert_eq!(result.weeks[0].days[1].exercises[0].name, "Deadlift");
}

#[test]
fn test_delete_only_day_is_rejected() {
    let program = seed_program();
    assert!(matches!(
        engine::delete_day(&program, 1, 1),
        Err(Error::InvariantViolation(_))
    ));
    assert!(matches!(engine::delete_day(&program, 5, 1), Err(Error::NotFound(_))));
    let two_days = program_with(1, 2);
    assert!(matches!(engine::delete_day(&two_days, 1, 3), Err(Error::NotFound(_))));
}

#[test]
fn test_add_and_delete_exercise() {
    let program = engine::add_exercise(&seed_program(), 1, 1).unwrap();
    assert_eq!(program.weeks[0].days[0].exercises.len(), 2);

    let program = engine::update_exercise_field(
        &program,
        1,
        1,
        1,
        ExerciseField::Name,
        FieldValue::Text("Overhead Press".to_string()),
    )
    .unwrap();
    let result = engine::delete_exercise(&program, 1, 1, 0).unwrap();
    assert_eq!(result.weeks[0].days[0].exercises.len(), 1);
    assert_eq!(result.weeks[0].days[0].exercises[0].name, "Overhead Press");

    assert!(matches!(engine::add_exercise(&program, 1, 2), Err(Error::NotFound(_))));
    assert!(matches!(
        engine::delete_exercise(&program, 1, 1, 2),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_delete_only_exercise_is_rejected() {
    let program = seed_program();
    let before = program.clone();
    let result = engine::delete_exercise(&program, 1, 1, 0);
    assert!(matches!(result, Err(Error::InvariantViolation(_))));
    assert_eq!(program, before);
}

#[test]
fn test_update_exercise_field_validation() {
    let program = seed_program();
    let before = program.clone();

    let rpe = engine::update_exercise_field(&program, 1, 1, 0, ExerciseField::Rpe, FieldValue::Integer(11));
    assert!(matches!(rpe, Err(Error::Validation { .. })));
    assert_eq!(program, before);

    for (field, value) in [
        (ExerciseField::Sets, FieldValue::Integer(-1)),
        (ExerciseField::TargetReps, FieldValue::Integer(-5)),
        (ExerciseField::Weight, FieldValue::Number(-2.5)),
        (ExerciseField::Weight, FieldValue::Number(f64::NAN)),
        (ExerciseField::Rest, FieldValue::Integer(-30)),
        (ExerciseField::Name, FieldValue::Text("   ".to_string())),
        (ExerciseField::Sets, FieldValue::Text("four".to_string())),
        (ExerciseField::Name, FieldValue::Integer(3)),
    ] {
        let result = engine::update_exercise_field(&program, 1, 1, 0, field, value);
        assert!(matches!(result, Err(Error::Validation { .. })), "{field} should be rejected");
    }

    let ok = engine::update_exercise_field(&program, 1, 1, 0, ExerciseField::Rpe, FieldValue::Number(8.5)).unwrap();
    assert_eq!(ok.weeks[0].days[0].exercises[0].rpe, 8.5);
    let ok = engine::update_exercise_field(&ok, 1, 1, 0, ExerciseField::Weight, FieldValue::Integer(135)).unwrap();
    assert_eq!(ok.weeks[0].days[0].exercises[0].weight, 135.0);
    let ok = engine::update_exercise_field(&ok, 1, 1, 0, ExerciseField::Rpe, FieldValue::Integer(10)).unwrap();
    assert_eq!(ok.weeks[0].days[0].exercises[0].rpe, 10.0);

    assert!(matches!(
        engine::update_exercise_field(&program, 1, 1, 3, ExerciseField::Sets, FieldValue::Integer(3)),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_field_names_parse() {
    assert_eq!("target-reps".parse::<ExerciseField>().unwrap(), ExerciseField::TargetReps);
    assert_eq!("targetReps".parse::<ExerciseField>().unwrap(), ExerciseField::TargetReps);
    assert_eq!("RPE".parse::<ExerciseField>().unwrap(), ExerciseField::Rpe);
    assert!("wieght".parse::<ExerciseField>().is_err());
    assert_eq!(ExerciseField::TargetReps.to_string(), "target-reps");

    assert_eq!(
        FieldValue::parse_for(ExerciseField::Sets, " 4 ").unwrap(),
        FieldValue::Integer(4)
    );
    assert_eq!(
        FieldValue::parse_for(ExerciseField::Weight, "62.5").unwrap(),
        FieldValue::Number(62.5)
    );
    assert!(FieldValue::parse_for(ExerciseField::Sets, "4.5").is_err());
}

#[test]
fn test_record_actual_reps() {
    let program = engine::update_exercise_field(
        &seed_program(),
        1,
        1,
        0,
        ExerciseField::Sets,
        FieldValue::Integer(3),
    )
    .unwrap();

    let partial = engine::record_actual_reps(&program, 1, 1, 0, vec![10, 9]).unwrap();
    assert_eq!(partial.weeks[0].days[0].exercises[0].actual_reps, vec![10, 9]);

    assert!(matches!(
        engine::record_actual_reps(&program, 1, 1, 0, vec![10, 9, 8, 7]),
        Err(Error::Validation { .. })
    ));
    assert!(matches!(
        engine::record_actual_reps(&program, 1, 1, 0, vec![-1]),
        Err(Error::Validation { .. })
    ));
    // Sets cannot drop below what is already recorded
    assert!(matches!(
        engine::update_exercise_field(&partial, 1, 1, 0, ExerciseField::Sets, FieldValue::Integer(1)),
        Err(Error::Validation { .. })
    ));
}

#[test]
fn test_contiguity_holds_across_edit_sequence() {
    let mut program = seed_program();
    program = engine::add_week(&program);
    program = engine::copy_week(&program, 1).unwrap();
    program = engine::add_day(&program, 2).unwrap();
    program = engine::add_day(&program, 2).unwrap();
    program = engine::delete_day(&program, 2, 2).unwrap();
    program = engine::add_week(&program);
    program = engine::delete_week(&program, 3).unwrap();
    program = engine::copy_week(&program, 2).unwrap();
    program = engine::delete_week(&program, 1).unwrap();

    assert_eq!(program.weeks.len(), 3);
    assert_contiguous(&program);
    assert!(validate_program(&program).is_ok());
}

#[test]
fn test_rename_and_start_date() {
    let program = seed_program();
    let renamed = engine::rename_program(&program, "  Hypertrophy  ").unwrap();
    assert_eq!(renamed.program_name, "Hypertrophy");
    assert!(matches!(
        engine::rename_program(&program, " "),
        Err(Error::Validation { .. })
    ));
    let moved = engine::set_start_date(&program, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    assert_eq!(moved.start_date.to_string(), "2024-02-01");
    assert_eq!(program.start_date, start_date());
}

#[test]
fn test_validate_program_catches_broken_documents() {
    let mut gap = program_with(2, 1);
    gap.weeks[1].week_number = 3;
    assert!(matches!(validate_program(&gap), Err(Error::InvariantViolation(_))));

    let mut empty_day = seed_program();
    empty_day.weeks[0].days[0].exercises.clear();
    assert!(matches!(validate_program(&empty_day), Err(Error::InvariantViolation(_))));

    let mut bad_rpe = seed_program();
    bad_rpe.weeks[0].days[0].exercises[0].rpe = 12.0;
    assert!(matches!(validate_program(&bad_rpe), Err(Error::Validation { .. })));

    let mut stale = seed_program();
    stale.current_week = 2;
    assert!(matches!(validate_program(&stale), Err(Error::InvariantViolation(_))));
    stale.completed = true;
    assert!(validate_program(&stale).is_ok());
}

// --- Progress ---

#[test]
fn test_progress_is_week_based() {
    let program = correct_position(&program_with(4, 2), 2, 1).unwrap();
    let progress = compute_progress(&program).unwrap();
    assert_eq!(progress.percent_complete, 50.0);
    assert_eq!(progress.current_week_view.week_number, 2);
    assert_eq!(progress.current_day_view.unwrap().day_number, 1);
    assert_eq!(progress.total_weeks, 4);

    let last = correct_position(&program, 4, 2).unwrap();
    assert_eq!(compute_progress(&last).unwrap().percent_complete, 100.0);
}

#[test]
fn test_progress_with_missing_day_has_no_day_view() {
    let mut program = program_with(2, 1);
    program.current_day = 3;
    let progress = compute_progress(&program).unwrap();
    assert!(progress.current_day_view.is_none());
}

#[test]
fn test_advance_only_moves_forward() {
    let program = program_with(3, 3);
    let moved = advance_position(&program, 2, 3).unwrap();
    assert_eq!((moved.current_week, moved.current_day), (2, 3));

    let same = advance_position(&moved, 2, 3).unwrap();
    assert_eq!((same.current_week, same.current_day), (2, 3));

    assert!(matches!(
        advance_position(&moved, 2, 1),
        Err(Error::InvariantViolation(_))
    ));
    assert!(matches!(
        advance_position(&moved, 1, 3),
        Err(Error::InvariantViolation(_))
    ));
    assert!(matches!(advance_position(&moved, 4, 1), Err(Error::NotFound(_))));

    let corrected = correct_position(&moved, 1, 2).unwrap();
    assert_eq!((corrected.current_week, corrected.current_day), (1, 2));
    assert!(matches!(correct_position(&moved, 1, 4), Err(Error::NotFound(_))));
}

#[test]
fn test_next_session_rolls_over_and_completes() {
    let mut program = program_with(2, 2);
    let mut positions = Vec::new();
    for _ in 0..3 {
        program = next_session(&program);
        positions.push((program.current_week, program.current_day));
    }
    assert_eq!(positions, vec![(1, 2), (2, 1), (2, 2)]);
    assert!(!program.completed);

    program = next_session(&program);
    assert!(program.completed);
    assert_eq!(program.lifecycle_state(), LifecycleState::Completed);
    assert_eq!(next_session(&program), program);
}

#[test]
fn test_complete_program_is_idempotent() {
    let program = seed_program();
    let done = complete_program(&program);
    assert!(done.completed);
    assert_eq!(complete_program(&done), done);
    assert!(!program.completed);
}

#[test]
fn test_clamp_repairs_completed_program() {
    let program = correct_position(&program_with(2, 1), 2, 1).unwrap();
    let done = complete_program(&program);
    let trimmed = engine::delete_week(&done, 2).unwrap();
    assert_eq!(trimmed.current_week, 2);

    let repaired = clamp_position(&trimmed);
    assert!(repaired.completed);
    assert_eq!((repaired.current_week, repaired.current_day), (1, 1));
    let progress = compute_progress(&repaired).unwrap();
    assert_eq!(progress.percent_complete, 100.0);
    assert_eq!(progress.state, LifecycleState::Completed);
}
