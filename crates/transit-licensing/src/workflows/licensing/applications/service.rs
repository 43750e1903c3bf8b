use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, info, warn};

use super::domain::{
    AdminNote, ApplicationId, ApplicationPatch, ApplicationStatus, ApplicationSubmission,
    ApplicationType, RecordResultRequest, Requester, ScheduleTestRequest, TestKind,
};
use super::guard::{AccessViolation, IntakeGuard, SubmissionViolation};
use super::issuance::{self, IssuanceConfig, LicenseNumberSource};
use super::lifecycle::{self, LifecycleError, StatusChange};
use super::repository::{
    ApplicationFilter, ApplicationRecord, ApplicationRepository, Page, Pagination,
    RepositoryError,
};
use super::stats::{self, ApplicationStats};
use super::testing::{self, TestingError};

/// Service composing the intake guard, lifecycle rules, and repository.
pub struct LicenseApplicationService<R, N> {
    guard: Arc<IntakeGuard>,
    repository: Arc<R>,
    numbers: Arc<N>,
    config: IssuanceConfig,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("dl-app-{id:06}"))
}

impl<R, N> LicenseApplicationService<R, N>
where
    R: ApplicationRepository + 'static,
    N: LicenseNumberSource + 'static,
{
    pub fn new(repository: Arc<R>, numbers: Arc<N>, config: IssuanceConfig) -> Self {
        Self {
            guard: Arc::new(IntakeGuard),
            repository,
            numbers,
            config,
        }
    }

    /// Submit a new application, returning the repository-backed record.
    pub fn submit(
        &self,
        requester: &Requester,
        submission: ApplicationSubmission,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        let applicant = self.guard.applicant_for(requester, &submission)?;
        let record = self.guard.record_from_submission(
            submission,
            applicant,
            next_application_id(),
            Utc::now(),
        )?;

        let stored = self.repository.insert(record)?;
        info!(
            application_id = %stored.application_id,
            application_type = %stored.application_type,
            total_fee = stored.fees.total_fee(),
            "license application submitted"
        );
        Ok(stored)
    }

    /// List applications. Non-administrators only ever see their own.
    pub fn list(
        &self,
        requester: &Requester,
        mut filter: ApplicationFilter,
        pagination: Pagination,
    ) -> Result<Page<ApplicationRecord>, ApplicationServiceError> {
        if !requester.is_administrator() {
            filter.owner = Some(requester.account.clone());
        }
        let page = self.repository.list(&filter, pagination.normalized())?;
        Ok(page)
    }

    pub fn get(
        &self,
        requester: &Requester,
        application_id: &ApplicationId,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        let record = self.load(application_id)?;
        self.guard.authorize_view(requester, &record)?;
        Ok(record)
    }

    /// Apply a patch. Owners edit identity fields while pending; administrators may also
    /// change status, payment, penalties, license conditions, and append a note.
    pub fn update(
        &self,
        requester: &Requester,
        application_id: &ApplicationId,
        patch: ApplicationPatch,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        let mut record = self.load(application_id)?;
        self.guard.authorize_update(requester, &record, &patch)?;
        self.guard.validate_patch(&patch)?;

        let now = Utc::now();
        let ApplicationPatch {
            application_type,
            license_type,
            license_class,
            emergency_contact,
            medical_info,
            status,
            payment_status,
            penalty_fee,
            restrictions,
            endorsements,
            note,
        } = patch;

        // Fees and test requirements stay as computed at submission.
        if let Some(application_type) = application_type {
            record.application_type = ApplicationType::from(application_type);
        }
        if let Some(license_type) = license_type {
            record.license_type = license_type.trim().to_string();
        }
        if let Some(license_class) = license_class {
            record.license_class = license_class.trim().to_string();
        }
        if let Some(contact) = emergency_contact {
            record.emergency_contact = contact;
        }
        if medical_info.is_some() {
            record.medical_info = medical_info;
        }

        if let Some(payment_status) = payment_status {
            record.fees.payment_status = payment_status;
        }
        if let Some(penalty_fee) = penalty_fee {
            record.fees.penalty_fee = penalty_fee;
        }
        if let Some(restrictions) = restrictions {
            if let Some(details) = record.license_details.as_mut() {
                details.restrictions = restrictions.clone();
            }
            record.restrictions = restrictions;
        }
        if let Some(endorsements) = endorsements {
            if let Some(details) = record.license_details.as_mut() {
                details.endorsements = endorsements.clone();
            }
            record.endorsements = endorsements;
        }
        if let Some(note) = note {
            let text = self.guard.note_text(&note)?;
            record.admin_notes = record.admin_notes.appended(AdminNote {
                text,
                author: requester.account.clone(),
                timestamp: now,
            });
        }

        match status {
            Some(status) => self.apply_status(record, status, now),
            None => self.persist(record),
        }
    }

    /// Explicit administrator status change.
    pub fn set_status(
        &self,
        requester: &Requester,
        application_id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        self.guard
            .require_administrator(requester, "changing application status")?;
        let record = self.load(application_id)?;
        self.apply_status(record, status, Utc::now())
    }

    pub fn schedule_test(
        &self,
        requester: &Requester,
        application_id: &ApplicationId,
        test_type: &str,
        request: ScheduleTestRequest,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        let kind: TestKind = test_type.parse()?;
        let mut record = self.load(application_id)?;
        self.guard.authorize_test_action(requester, &record)?;

        testing::schedule_test(
            &mut record,
            kind,
            request.scheduled_date,
            request.instructor,
        )?;

        let stored = self.persist(record)?;
        debug!(
            application_id = %stored.application_id,
            test = %kind,
            status = %stored.status,
            "test scheduled"
        );
        Ok(stored)
    }

    pub fn record_result(
        &self,
        requester: &Requester,
        application_id: &ApplicationId,
        test_type: &str,
        request: RecordResultRequest,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        self.guard
            .require_administrator(requester, "recording test results")?;
        let kind: TestKind = test_type.parse()?;
        let result = testing::parse_result(&request.result)?;
        let mut record = self.load(application_id)?;
        self.guard.authorize_test_action(requester, &record)?;

        testing::record_result(
            &mut record,
            kind,
            result,
            request.score,
            request.notes,
            Utc::now(),
        )?;

        let stored = self.persist(record)?;
        info!(
            application_id = %stored.application_id,
            test = %kind,
            result = ?result,
            attempts = stored.tests.get(kind).attempts,
            status = %stored.status,
            "test result recorded"
        );
        Ok(stored)
    }

    /// Append an administrator note. Allowed at any status; never changes it.
    pub fn add_note(
        &self,
        requester: &Requester,
        application_id: &ApplicationId,
        text: &str,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        self.guard.require_administrator(requester, "adding notes")?;
        let text = self.guard.note_text(text)?;
        let mut record = self.load(application_id)?;

        record.admin_notes = record.admin_notes.appended(AdminNote {
            text,
            author: requester.account.clone(),
            timestamp: Utc::now(),
        });

        self.persist(record)
    }

    /// Hard delete. Owners may only withdraw pending applications.
    pub fn delete(
        &self,
        requester: &Requester,
        application_id: &ApplicationId,
    ) -> Result<(), ApplicationServiceError> {
        let record = self.load(application_id)?;
        self.guard.authorize_delete(requester, &record)?;
        self.repository.delete(application_id)?;
        info!(application_id = %application_id, "license application deleted");
        Ok(())
    }

    pub fn stats(
        &self,
        requester: &Requester,
    ) -> Result<ApplicationStats, ApplicationServiceError> {
        self.guard
            .require_administrator(requester, "viewing statistics")?;
        let records = self.repository.scan()?;
        Ok(stats::summarize(&records))
    }

    fn load(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        self.repository
            .fetch(application_id)?
            .ok_or_else(|| ApplicationServiceError::NotFound(application_id.clone()))
    }

    fn apply_status(
        &self,
        mut record: ApplicationRecord,
        status: ApplicationStatus,
        now: DateTime<Utc>,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        let change = lifecycle::admin_set_status(&mut record, status, now);
        log_status_change(&record.application_id, &change);

        if change.issue_license {
            return self.persist_with_issuance(record, now);
        }
        if change.to == ApplicationStatus::Approved && record.license_details.is_none() {
            warn!(
                application_id = %record.application_id,
                "approved with required tests outstanding; license number withheld"
            );
        }
        self.persist(record)
    }

    /// Every write goes through here so the stored total always matches its components.
    fn persist(
        &self,
        mut record: ApplicationRecord,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        record.fees.recompute_total();
        let stored = self.repository.update(record)?;
        Ok(stored)
    }

    /// Generate, attempt the unique write, regenerate on collision.
    fn persist_with_issuance(
        &self,
        record: ApplicationRecord,
        now: DateTime<Utc>,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        let attempts = self.config.max_attempts.max(1);
        let year = now.year();

        for attempt in 1..=attempts {
            let mut candidate = record.clone();
            issuance::issue_license(
                &mut candidate,
                self.numbers.generate(year),
                now,
                self.config.validity_years,
            )?;

            match self.persist(candidate) {
                Ok(stored) => {
                    if let Some(number) = stored.license_number() {
                        info!(
                            application_id = %stored.application_id,
                            license_number = %number,
                            attempt,
                            "license number issued"
                        );
                    }
                    return Ok(stored);
                }
                Err(ApplicationServiceError::Repository(
                    RepositoryError::DuplicateLicenseNumber(number),
                )) => {
                    warn!(
                        application_id = %record.application_id,
                        license_number = %number,
                        attempt,
                        "license number already assigned, regenerating"
                    );
                }
                Err(other) => return Err(other),
            }
        }

        Err(ApplicationServiceError::LicenseNumberExhausted { attempts })
    }
}

fn log_status_change(application_id: &ApplicationId, change: &StatusChange) {
    if change.changed() {
        info!(
            application_id = %application_id,
            from = %change.from,
            to = %change.to,
            "application status changed"
        );
    }
}

/// Coarse classification used by transports to pick a response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error(transparent)]
    Validation(#[from] SubmissionViolation),
    #[error(transparent)]
    Access(#[from] AccessViolation),
    #[error(transparent)]
    Testing(#[from] TestingError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("could not allocate a unique license number after {attempts} attempts")]
    LicenseNumberExhausted { attempts: u8 },
}

impl ApplicationServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplicationServiceError::Validation(_) => ErrorKind::Validation,
            ApplicationServiceError::Access(_) => ErrorKind::Forbidden,
            ApplicationServiceError::Testing(TestingError::TestNotRequired(_)) => {
                ErrorKind::Forbidden
            }
            ApplicationServiceError::Testing(_) => ErrorKind::Validation,
            ApplicationServiceError::Lifecycle(LifecycleError::UnknownStatus(_)) => {
                ErrorKind::Validation
            }
            ApplicationServiceError::Lifecycle(LifecycleError::ExpiryOutOfRange { .. }) => {
                ErrorKind::Internal
            }
            ApplicationServiceError::Repository(RepositoryError::NotFound)
            | ApplicationServiceError::NotFound(_) => ErrorKind::NotFound,
            ApplicationServiceError::Repository(
                RepositoryError::Conflict
                | RepositoryError::DuplicateLicenseNumber(_)
                | RepositoryError::StaleVersion { .. },
            )
            | ApplicationServiceError::LicenseNumberExhausted { .. } => ErrorKind::Conflict,
            ApplicationServiceError::Repository(RepositoryError::Unavailable(_)) => {
                ErrorKind::Internal
            }
        }
    }
}
