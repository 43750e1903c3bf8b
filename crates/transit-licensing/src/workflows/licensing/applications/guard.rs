use chrono::{DateTime, Utc};

use super::domain::{
    AccountId, AdminNotes, ApplicationId, ApplicationPatch, ApplicationStatus,
    ApplicationSubmission, ApplicationType, EmergencyContact, Requester,
};
use super::fees::initial_fees;
use super::lifecycle;
use super::policy::initial_tests;
use super::repository::ApplicationRecord;

pub const MAX_NOTE_LENGTH: usize = 2000;

/// Caller-fixable input problems.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionViolation {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("field '{0}' must not be blank")]
    BlankField(&'static str),
    #[error("field '{field}' exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },
}

/// Authorization, ownership and state violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessViolation {
    #[error("application belongs to another account")]
    NotOwner,
    #[error("{0} requires an administrator")]
    AdministratorOnly(&'static str),
    #[error("field '{0}' can only be changed by an administrator")]
    AdminOnlyField(&'static str),
    #[error("application can no longer be edited by its owner (status {0})")]
    EditLocked(ApplicationStatus),
    #[error("application can no longer be deleted by its owner (status {0})")]
    DeleteLocked(ApplicationStatus),
    #[error("application is closed (status {0})")]
    Closed(ApplicationStatus),
    #[error("applicants cannot file on behalf of another account")]
    OnBehalfOf,
}

/// Guard responsible for producing new application records and policing access.
#[derive(Debug, Clone, Default)]
pub struct IntakeGuard;

impl IntakeGuard {
    /// Resolve the owning account for a submission.
    pub fn applicant_for(
        &self,
        requester: &Requester,
        submission: &ApplicationSubmission,
    ) -> Result<AccountId, AccessViolation> {
        match &submission.applicant_id {
            Some(applicant) if applicant.0.trim().is_empty() => Ok(requester.account.clone()),
            Some(applicant) if requester.is_administrator() => Ok(applicant.clone()),
            Some(applicant) if applicant != &requester.account => Err(AccessViolation::OnBehalfOf),
            _ => Ok(requester.account.clone()),
        }
    }

    /// Convert a submission into a fresh `Pending` record with fees and test requirements
    /// derived from its type.
    pub fn record_from_submission(
        &self,
        submission: ApplicationSubmission,
        applicant_id: AccountId,
        application_id: ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<ApplicationRecord, SubmissionViolation> {
        if applicant_id.0.trim().is_empty() {
            return Err(SubmissionViolation::MissingField("applicant_id"));
        }
        let application_type = required_text("application_type", &submission.application_type)?;
        let license_type = required_text("license_type", &submission.license_type)?;
        let license_class = required_text("license_class", &submission.license_class)?;
        let emergency_contact = submission
            .emergency_contact
            .ok_or(SubmissionViolation::MissingField("emergency_contact"))?;
        validate_contact(&emergency_contact)?;

        let application_type = ApplicationType::from(application_type);

        Ok(ApplicationRecord {
            application_id,
            applicant_id,
            fees: initial_fees(&application_type),
            tests: initial_tests(&application_type),
            application_type,
            license_type,
            license_class,
            status: ApplicationStatus::Pending,
            emergency_contact,
            medical_info: submission.medical_info,
            restrictions: Vec::new(),
            endorsements: Vec::new(),
            license_details: None,
            admin_notes: AdminNotes::default(),
            submission_date: now,
            review_date: None,
            approval_date: None,
            issue_date: None,
            version: 0,
        })
    }

    pub fn validate_patch(&self, patch: &ApplicationPatch) -> Result<(), SubmissionViolation> {
        if let Some(value) = &patch.application_type {
            required_text("application_type", value)?;
        }
        if let Some(value) = &patch.license_type {
            required_text("license_type", value)?;
        }
        if let Some(value) = &patch.license_class {
            required_text("license_class", value)?;
        }
        if let Some(contact) = &patch.emergency_contact {
            validate_contact(contact)?;
        }
        if let Some(note) = &patch.note {
            self.note_text(note)?;
        }
        Ok(())
    }

    pub fn note_text(&self, raw: &str) -> Result<String, SubmissionViolation> {
        let text = required_text("text", raw)?;
        if text.chars().count() > MAX_NOTE_LENGTH {
            return Err(SubmissionViolation::TooLong {
                field: "text",
                max: MAX_NOTE_LENGTH,
            });
        }
        Ok(text)
    }

    pub fn authorize_view(
        &self,
        requester: &Requester,
        record: &ApplicationRecord,
    ) -> Result<(), AccessViolation> {
        if requester.is_administrator() || record.is_owned_by(&requester.account) {
            Ok(())
        } else {
            Err(AccessViolation::NotOwner)
        }
    }

    /// Owners may edit their own fields while the application is still pending.
    pub fn authorize_update(
        &self,
        requester: &Requester,
        record: &ApplicationRecord,
        patch: &ApplicationPatch,
    ) -> Result<(), AccessViolation> {
        if requester.is_administrator() {
            return Ok(());
        }
        self.authorize_view(requester, record)?;
        if let Some(field) = patch.admin_fields().into_iter().next() {
            return Err(AccessViolation::AdminOnlyField(field));
        }
        if !lifecycle::accepts_owner_edits(record.status) {
            return Err(AccessViolation::EditLocked(record.status));
        }
        Ok(())
    }

    pub fn authorize_delete(
        &self,
        requester: &Requester,
        record: &ApplicationRecord,
    ) -> Result<(), AccessViolation> {
        if requester.is_administrator() {
            return Ok(());
        }
        self.authorize_view(requester, record)?;
        if !lifecycle::accepts_owner_edits(record.status) {
            return Err(AccessViolation::DeleteLocked(record.status));
        }
        Ok(())
    }

    /// Test actions are refused once an application has left the productive path.
    pub fn authorize_test_action(
        &self,
        requester: &Requester,
        record: &ApplicationRecord,
    ) -> Result<(), AccessViolation> {
        self.authorize_view(requester, record)?;
        if lifecycle::is_terminal(record.status) {
            return Err(AccessViolation::Closed(record.status));
        }
        Ok(())
    }

    pub fn require_administrator(
        &self,
        requester: &Requester,
        operation: &'static str,
    ) -> Result<(), AccessViolation> {
        if requester.is_administrator() {
            Ok(())
        } else {
            Err(AccessViolation::AdministratorOnly(operation))
        }
    }
}

fn required_text(field: &'static str, raw: &str) -> Result<String, SubmissionViolation> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SubmissionViolation::BlankField(field));
    }
    Ok(trimmed.to_string())
}

fn validate_contact(contact: &EmergencyContact) -> Result<(), SubmissionViolation> {
    required_text("emergency_contact.name", &contact.name)?;
    required_text("emergency_contact.phone", &contact.phone)?;
    Ok(())
}
