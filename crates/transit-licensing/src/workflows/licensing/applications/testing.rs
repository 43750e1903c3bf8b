use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::domain::{TestKind, TestResult, TestSuite};
use super::lifecycle;
use super::repository::ApplicationRecord;

/// Validation errors raised by test scheduling and result recording.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TestingError {
    #[error("invalid test type '{0}': expected theory, practical or medical")]
    InvalidTestKind(String),
    #[error("invalid test result '{0}': expected Pass or Fail")]
    InvalidResult(String),
    #[error("{0} test is not required for this application")]
    TestNotRequired(TestKind),
}

impl FromStr for TestKind {
    type Err = TestingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "theory" => Ok(TestKind::Theory),
            "practical" => Ok(TestKind::Practical),
            "medical" => Ok(TestKind::Medical),
            _ => Err(TestingError::InvalidTestKind(raw.to_string())),
        }
    }
}

/// Parse a recorded outcome. `Pending` is a state, not a result, and is rejected.
pub fn parse_result(raw: &str) -> Result<TestResult, TestingError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pass" => Ok(TestResult::Pass),
        "fail" => Ok(TestResult::Fail),
        _ => Err(TestingError::InvalidResult(raw.to_string())),
    }
}

pub fn all_required_passed(tests: &TestSuite) -> bool {
    tests.all_required_passed()
}

/// Book a test date. Only required tests can be scheduled; the instructor is kept for the
/// practical test only.
pub fn schedule_test(
    record: &mut ApplicationRecord,
    kind: TestKind,
    scheduled: DateTime<Utc>,
    instructor: Option<String>,
) -> Result<(), TestingError> {
    let test = record.tests.get_mut(kind);
    if !test.required {
        return Err(TestingError::TestNotRequired(kind));
    }

    test.scheduled = Some(scheduled);
    if kind == TestKind::Practical {
        if let Some(instructor) = instructor.filter(|name| !name.trim().is_empty()) {
            test.instructor = Some(instructor);
        }
    }

    record.status = lifecycle::after_scheduling(record.status);
    Ok(())
}

/// Record a completed attempt and let the lifecycle derive the resulting status.
pub fn record_result(
    record: &mut ApplicationRecord,
    kind: TestKind,
    result: TestResult,
    score: Option<f64>,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), TestingError> {
    if result == TestResult::Pending {
        return Err(TestingError::InvalidResult("Pending".to_string()));
    }

    let test = record.tests.get_mut(kind);
    test.completed = Some(now);
    test.attempts = test.attempts.saturating_add(1);
    test.result = result;
    if score.is_some() {
        test.score = score;
    }
    if kind == TestKind::Medical && notes.is_some() {
        test.notes = notes;
    }

    record.status = lifecycle::auto_advance(record.status, &record.tests, result);
    Ok(())
}
