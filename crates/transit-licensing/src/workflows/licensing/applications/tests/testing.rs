use super::common::*;
use crate::workflows::licensing::applications::domain::{ApplicationStatus, TestKind, TestResult};
use crate::workflows::licensing::applications::testing::{
    all_required_passed, parse_result, record_result, schedule_test, TestingError,
};

#[test]
fn parses_test_kinds_and_rejects_unknown_ones() {
    assert_eq!("theory".parse::<TestKind>(), Ok(TestKind::Theory));
    assert_eq!(" Practical ".parse::<TestKind>(), Ok(TestKind::Practical));
    assert_eq!("MEDICAL".parse::<TestKind>(), Ok(TestKind::Medical));
    assert_eq!(
        "parallel-parking".parse::<TestKind>(),
        Err(TestingError::InvalidTestKind("parallel-parking".to_string()))
    );
}

#[test]
fn only_pass_and_fail_are_recordable() {
    assert_eq!(parse_result("Pass"), Ok(TestResult::Pass));
    assert_eq!(parse_result("fail"), Ok(TestResult::Fail));
    assert_eq!(
        parse_result("Pending"),
        Err(TestingError::InvalidResult("Pending".to_string()))
    );
    assert!(matches!(
        parse_result("maybe"),
        Err(TestingError::InvalidResult(_))
    ));
}

#[test]
fn scheduling_a_non_required_test_is_refused() {
    let mut record = record("Renewal");
    let err = schedule_test(&mut record, TestKind::Theory, at(2026, 4, 1), None)
        .expect_err("theory is exempt for renewals");
    assert_eq!(err, TestingError::TestNotRequired(TestKind::Theory));
    assert_eq!(record.status, ApplicationStatus::Pending);
    assert!(record.tests.theory.scheduled.is_none());
}

#[test]
fn scheduling_advances_only_pending_applications() {
    let mut record = record("New License");
    schedule_test(&mut record, TestKind::Theory, at(2026, 4, 1), None).expect("schedules");
    assert_eq!(record.status, ApplicationStatus::TestsScheduled);
    assert_eq!(record.tests.theory.scheduled, Some(at(2026, 4, 1)));

    record.status = ApplicationStatus::DocumentsReview;
    schedule_test(&mut record, TestKind::Medical, at(2026, 4, 2), None).expect("schedules");
    assert_eq!(record.status, ApplicationStatus::DocumentsReview);
}

#[test]
fn instructor_is_kept_for_practical_tests_only() {
    let mut record = record("New License");
    schedule_test(
        &mut record,
        TestKind::Practical,
        at(2026, 4, 3),
        Some("Inspector Mensah".to_string()),
    )
    .expect("schedules practical");
    schedule_test(
        &mut record,
        TestKind::Theory,
        at(2026, 4, 4),
        Some("Inspector Mensah".to_string()),
    )
    .expect("schedules theory");

    assert_eq!(
        record.tests.practical.instructor.as_deref(),
        Some("Inspector Mensah")
    );
    assert!(record.tests.theory.instructor.is_none());
}

#[test]
fn failing_while_tests_remain_moves_to_in_progress() {
    let mut record = record("New License");
    schedule_test(&mut record, TestKind::Theory, at(2026, 4, 1), None).expect("schedules");

    record_result(
        &mut record,
        TestKind::Theory,
        TestResult::Fail,
        Some(41.0),
        None,
        at(2026, 4, 1),
    )
    .expect("records failure");

    assert_eq!(record.status, ApplicationStatus::TestsInProgress);
    assert_eq!(record.tests.theory.attempts, 1);
    assert_eq!(record.tests.theory.result, TestResult::Fail);
    assert_eq!(record.tests.theory.score, Some(41.0));
    assert_eq!(record.tests.theory.completed, Some(at(2026, 4, 1)));
}

#[test]
fn retests_accumulate_attempts_without_a_cap() {
    let mut record = record("New License");
    for day in 1..=4 {
        record_result(
            &mut record,
            TestKind::Practical,
            TestResult::Fail,
            None,
            None,
            at(2026, 5, day),
        )
        .expect("records failure");
    }
    record_result(
        &mut record,
        TestKind::Practical,
        TestResult::Pass,
        None,
        None,
        at(2026, 5, 9),
    )
    .expect("records pass");

    assert_eq!(record.tests.practical.attempts, 5);
    assert_eq!(record.tests.practical.result, TestResult::Pass);
    assert_eq!(record.status, ApplicationStatus::TestsInProgress);
}

#[test]
fn final_required_pass_moves_to_final_review() {
    let mut record = record("Renewal");
    schedule_test(&mut record, TestKind::Medical, at(2026, 4, 1), None).expect("schedules");
    record_result(
        &mut record,
        TestKind::Medical,
        TestResult::Pass,
        None,
        Some("Corrective lenses required".to_string()),
        at(2026, 4, 1),
    )
    .expect("records pass");

    assert_eq!(record.status, ApplicationStatus::FinalReview);
    assert_eq!(
        record.tests.medical.notes.as_deref(),
        Some("Corrective lenses required")
    );
}

#[test]
fn notes_are_ignored_for_non_medical_tests() {
    let mut record = record("New License");
    record_result(
        &mut record,
        TestKind::Theory,
        TestResult::Pass,
        Some(92.5),
        Some("excellent".to_string()),
        at(2026, 4, 1),
    )
    .expect("records pass");
    assert!(record.tests.theory.notes.is_none());
    assert_eq!(record.status, ApplicationStatus::Pending);
}

#[test]
fn exempt_tests_never_block_the_pass_evaluation() {
    let mut record = record("Renewal");
    record.tests.theory.result = TestResult::Fail;
    record.tests.practical.result = TestResult::Pending;
    assert!(!all_required_passed(&record.tests));

    record.tests.medical.result = TestResult::Pass;
    assert!(all_required_passed(&record.tests));
}
