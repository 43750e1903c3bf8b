//! Driver's-license application intake, testing, and issuance.

pub mod domain;
pub mod fees;
pub mod guard;
pub mod issuance;
pub mod lifecycle;
pub mod policy;
pub mod repository;
pub mod router;
pub mod service;
pub mod stats;
pub mod testing;

#[cfg(test)]
mod tests;

pub use domain::{
    AccountId, AdminNote, AdminNotes, ApplicationId, ApplicationPatch, ApplicationStatus,
    ApplicationSubmission, ApplicationType, EmergencyContact, FeeBreakdown, LicenseDetails,
    LicenseNumber, MedicalInfo, PaymentStatus, RecordResultRequest, Requester, Role,
    ScheduleTestRequest, TestKind, TestRecord, TestResult, TestSuite,
};
pub use guard::{AccessViolation, IntakeGuard, SubmissionViolation};
pub use issuance::{IssuanceConfig, LicenseNumberSource, RandomLicenseNumbers};
pub use lifecycle::{LifecycleError, StatusChange};
pub use repository::{
    ApplicationFilter, ApplicationRecord, ApplicationRepository, ApplicationStatusView,
    InMemoryApplicationRepository, Page, Pagination, RepositoryError,
};
pub use router::application_router;
pub use service::{ApplicationServiceError, ErrorKind, LicenseApplicationService};
pub use stats::ApplicationStats;
pub use testing::TestingError;
