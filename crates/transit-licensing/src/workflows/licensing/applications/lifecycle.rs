//! Status transitions for license applications.
//!
//! ```text
//! Pending ──▶ DocumentsReview ─┐
//!    │                         ▼
//!    └──────▶ TestsScheduled ──▶ TestsInProgress ◀─▶ (retest)
//!                                     │
//!                                     ▼
//!                               FinalReview ──▶ Approved ──▶ LicenseIssued
//!                                     │
//!                                     └──────▶ Rejected
//! ```
//!
//! Two entry points drive the machine. [`auto_advance`] derives the status from test
//! outcomes and is applied after every recorded result. [`admin_set_status`] applies an
//! explicit administrator decision and reports whether a license number must be issued.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::domain::{ApplicationStatus, TestResult, TestSuite};
use super::repository::ApplicationRecord;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("unknown application status '{0}'")]
    UnknownStatus(String),
    #[error("license expiry {years} years after {issued} is out of range")]
    ExpiryOutOfRange { issued: DateTime<Utc>, years: u32 },
}

impl FromStr for ApplicationStatus {
    type Err = LifecycleError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim();
        ApplicationStatus::ordered()
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| LifecycleError::UnknownStatus(raw.to_string()))
    }
}

/// Stages in which test outcomes still drive the status.
pub fn in_testing_phase(status: ApplicationStatus) -> bool {
    matches!(
        status,
        ApplicationStatus::Pending
            | ApplicationStatus::DocumentsReview
            | ApplicationStatus::TestsScheduled
            | ApplicationStatus::TestsInProgress
            | ApplicationStatus::MedicalExamination
    )
}

/// Rejected and issued applications only accept notes.
pub fn is_terminal(status: ApplicationStatus) -> bool {
    matches!(
        status,
        ApplicationStatus::Rejected | ApplicationStatus::LicenseIssued
    )
}

pub fn accepts_owner_edits(status: ApplicationStatus) -> bool {
    status == ApplicationStatus::Pending
}

/// Scheduling only moves a fresh application forward.
pub fn after_scheduling(current: ApplicationStatus) -> ApplicationStatus {
    match current {
        ApplicationStatus::Pending => ApplicationStatus::TestsScheduled,
        other => other,
    }
}

/// Derive the status after a recorded result.
///
/// Outside the testing phase the status is left untouched so results never pull a reviewed
/// application backwards.
pub fn auto_advance(
    current: ApplicationStatus,
    tests: &TestSuite,
    latest: TestResult,
) -> ApplicationStatus {
    if !in_testing_phase(current) {
        return current;
    }
    if tests.all_required_passed() {
        ApplicationStatus::FinalReview
    } else if latest == TestResult::Fail {
        ApplicationStatus::TestsInProgress
    } else {
        current
    }
}

/// Outcome of an administrator status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
    /// Set when the change qualifies the application for a license number.
    pub issue_license: bool,
}

impl StatusChange {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Apply an administrator decision.
///
/// Approval is accepted even when required tests are outstanding; in that case no license
/// is issued and a later approval, once tests pass, will issue it.
pub fn admin_set_status(
    record: &mut ApplicationRecord,
    to: ApplicationStatus,
    now: DateTime<Utc>,
) -> StatusChange {
    let from = record.status;
    if from != to {
        record.review_date = Some(now);
    }
    record.status = to;

    if to == ApplicationStatus::LicenseIssued && record.issue_date.is_none() {
        record.issue_date = Some(now);
    }

    let issue_license = to == ApplicationStatus::Approved
        && record.license_details.is_none()
        && record.tests.all_required_passed();

    StatusChange {
        from,
        to,
        issue_license,
    }
}
