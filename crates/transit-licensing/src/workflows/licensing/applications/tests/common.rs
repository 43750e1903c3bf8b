use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::licensing::applications::domain::{
    AccountId, ApplicationId, ApplicationSubmission, EmergencyContact, LicenseNumber,
    MedicalInfo, RecordResultRequest, Requester, ScheduleTestRequest, TestKind,
};
use crate::workflows::licensing::applications::guard::IntakeGuard;
use crate::workflows::licensing::applications::issuance::{IssuanceConfig, LicenseNumberSource};
use crate::workflows::licensing::applications::repository::{
    ApplicationFilter, ApplicationRecord, ApplicationRepository, InMemoryApplicationRepository,
    Page, Pagination, RepositoryError,
};
use crate::workflows::licensing::applications::{application_router, LicenseApplicationService};

pub(super) type TestService =
    LicenseApplicationService<InMemoryApplicationRepository, ScriptedNumbers>;

pub(super) const APPLICANT: &str = "acct-100";
pub(super) const OTHER_APPLICANT: &str = "acct-200";
pub(super) const ADMIN: &str = "admin-1";

pub(super) fn applicant() -> Requester {
    Requester::applicant(APPLICANT)
}

pub(super) fn other_applicant() -> Requester {
    Requester::applicant(OTHER_APPLICANT)
}

pub(super) fn admin() -> Requester {
    Requester::administrator(ADMIN)
}

pub(super) fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn emergency_contact() -> EmergencyContact {
    EmergencyContact {
        name: "Amara Osei".to_string(),
        relationship: "Sister".to_string(),
        phone: "+233 20 555 0142".to_string(),
    }
}

pub(super) fn submission(application_type: &str) -> ApplicationSubmission {
    ApplicationSubmission {
        application_type: application_type.to_string(),
        license_type: "Private".to_string(),
        license_class: "B".to_string(),
        applicant_id: None,
        emergency_contact: Some(emergency_contact()),
        medical_info: Some(MedicalInfo {
            blood_type: Some("O+".to_string()),
            conditions: Vec::new(),
            medications: Vec::new(),
            vision_correction: true,
        }),
    }
}

/// Record built through the intake guard without touching a repository.
pub(super) fn record(application_type: &str) -> ApplicationRecord {
    IntakeGuard
        .record_from_submission(
            submission(application_type),
            AccountId(APPLICANT.to_string()),
            ApplicationId(format!("fixture-{}", application_type.to_lowercase())),
            at(2026, 3, 2),
        )
        .expect("fixture submission is valid")
}

/// License numbers handed out from a script, then from a counter.
#[derive(Default)]
pub(super) struct ScriptedNumbers {
    serials: Mutex<VecDeque<u32>>,
    fallback: AtomicU32,
}

impl ScriptedNumbers {
    pub(super) fn with_serials(serials: &[u32]) -> Self {
        Self {
            serials: Mutex::new(serials.iter().copied().collect()),
            fallback: AtomicU32::new(90_000),
        }
    }
}

impl LicenseNumberSource for ScriptedNumbers {
    fn generate(&self, year: i32) -> LicenseNumber {
        let scripted = self
            .serials
            .lock()
            .expect("serial mutex poisoned")
            .pop_front();
        let serial = scripted.unwrap_or_else(|| self.fallback.fetch_add(1, Ordering::Relaxed));
        LicenseNumber::compose(year, serial)
    }
}

pub(super) fn build_service() -> (TestService, Arc<InMemoryApplicationRepository>) {
    build_service_with(ScriptedNumbers::default(), IssuanceConfig::default())
}

pub(super) fn build_service_with(
    numbers: ScriptedNumbers,
    config: IssuanceConfig,
) -> (TestService, Arc<InMemoryApplicationRepository>) {
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let service = LicenseApplicationService::new(repository.clone(), Arc::new(numbers), config);
    (service, repository)
}

pub(super) fn schedule(date: DateTime<Utc>) -> ScheduleTestRequest {
    ScheduleTestRequest {
        scheduled_date: date,
        instructor: None,
    }
}

pub(super) fn outcome(result: &str, score: Option<f64>) -> RecordResultRequest {
    RecordResultRequest {
        result: result.to_string(),
        score,
        notes: None,
    }
}

/// Schedule and pass every required test, returning the final stored record.
pub(super) fn pass_required_tests(service: &TestService, id: &ApplicationId) -> ApplicationRecord {
    let mut current = service.get(&admin(), id).expect("record exists");
    for kind in TestKind::all() {
        if !current.tests.get(kind).required {
            continue;
        }
        service
            .schedule_test(&applicant(), id, kind.label(), schedule(at(2026, 4, 10)))
            .expect("schedule required test");
        current = service
            .record_result(&admin(), id, kind.label(), outcome("Pass", Some(85.0)))
            .expect("record pass");
    }
    current
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &ApplicationId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(
        &self,
        _filter: &ApplicationFilter,
        _pagination: Pagination,
    ) -> Result<Page<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn scan(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn application_router_with_service(service: TestService) -> axum::Router {
    application_router(Arc::new(service))
}
