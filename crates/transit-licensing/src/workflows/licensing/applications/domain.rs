use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for submitted license applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Portal account an application belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Applicant,
    Administrator,
}

/// Authenticated caller identity handed over by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub account: AccountId,
    pub role: Role,
}

impl Requester {
    pub fn applicant(account: impl Into<String>) -> Self {
        Self {
            account: AccountId(account.into()),
            role: Role::Applicant,
        }
    }

    pub fn administrator(account: impl Into<String>) -> Self {
        Self {
            account: AccountId(account.into()),
            role: Role::Administrator,
        }
    }

    pub fn is_administrator(&self) -> bool {
        self.role == Role::Administrator
    }
}

/// Kind of license request. Labels outside the known set are kept verbatim so the fee
/// schedule and test policy can apply their fallbacks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApplicationType {
    NewLicense,
    Renewal,
    Replacement,
    Upgrade,
    International,
    Other(String),
}

impl ApplicationType {
    pub fn label(&self) -> &str {
        match self {
            ApplicationType::NewLicense => "New License",
            ApplicationType::Renewal => "Renewal",
            ApplicationType::Replacement => "Replacement",
            ApplicationType::Upgrade => "Upgrade",
            ApplicationType::International => "International",
            ApplicationType::Other(label) => label,
        }
    }
}

impl From<String> for ApplicationType {
    fn from(value: String) -> Self {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "new license" | "new_license" => ApplicationType::NewLicense,
            "renewal" => ApplicationType::Renewal,
            "replacement" => ApplicationType::Replacement,
            "upgrade" => ApplicationType::Upgrade,
            "international" => ApplicationType::International,
            _ => ApplicationType::Other(value.trim().to_string()),
        }
    }
}

impl From<&str> for ApplicationType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ApplicationType> for String {
    fn from(value: ApplicationType) -> Self {
        value.label().to_string()
    }
}

impl fmt::Display for ApplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Processing stage of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    DocumentsReview,
    TestsScheduled,
    TestsInProgress,
    MedicalExamination,
    FinalReview,
    Approved,
    Rejected,
    LicenseIssued,
}

impl ApplicationStatus {
    pub const fn ordered() -> [Self; 9] {
        [
            Self::Pending,
            Self::DocumentsReview,
            Self::TestsScheduled,
            Self::TestsInProgress,
            Self::MedicalExamination,
            Self::FinalReview,
            Self::Approved,
            Self::Rejected,
            Self::LicenseIssued,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::DocumentsReview => "DocumentsReview",
            Self::TestsScheduled => "TestsScheduled",
            Self::TestsInProgress => "TestsInProgress",
            Self::MedicalExamination => "MedicalExamination",
            Self::FinalReview => "FinalReview",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::LicenseIssued => "LicenseIssued",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    Theory,
    Practical,
    Medical,
}

impl TestKind {
    pub const fn all() -> [Self; 3] {
        [Self::Theory, Self::Practical, Self::Medical]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Theory => "theory",
            Self::Practical => "practical",
            Self::Medical => "medical",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestResult {
    Pending,
    Pass,
    Fail,
}

/// Per-test progress tracked on an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    pub required: bool,
    pub scheduled: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
    pub result: TestResult,
    pub attempts: u32,
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,
}

impl TestRecord {
    pub fn new(required: bool, result: TestResult) -> Self {
        Self {
            required,
            scheduled: None,
            completed: None,
            result,
            attempts: 0,
            score: None,
            notes: None,
            instructor: None,
        }
    }

    /// Non-required tests count as passed whatever result is stored.
    pub fn is_satisfied(&self) -> bool {
        !self.required || self.result == TestResult::Pass
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    pub theory: TestRecord,
    pub practical: TestRecord,
    pub medical: TestRecord,
}

impl TestSuite {
    pub fn get(&self, kind: TestKind) -> &TestRecord {
        match kind {
            TestKind::Theory => &self.theory,
            TestKind::Practical => &self.practical,
            TestKind::Medical => &self.medical,
        }
    }

    pub fn get_mut(&mut self, kind: TestKind) -> &mut TestRecord {
        match kind {
            TestKind::Theory => &mut self.theory,
            TestKind::Practical => &mut self.practical,
            TestKind::Medical => &mut self.medical,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TestKind, &TestRecord)> {
        TestKind::all().into_iter().map(move |kind| (kind, self.get(kind)))
    }

    pub fn all_required_passed(&self) -> bool {
        self.iter().all(|(_, record)| record.is_satisfied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Waived,
}

/// Fee components charged for an application. The total is derived and only refreshed
/// through [`FeeBreakdown::recompute_total`]; it is held as `u64` so the sum of four `u32`
/// components is always exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub application_fee: u32,
    pub test_fee: u32,
    pub license_fee: u32,
    pub penalty_fee: u32,
    total_fee: u64,
    pub payment_status: PaymentStatus,
}

impl FeeBreakdown {
    pub fn new(application_fee: u32, test_fee: u32, license_fee: u32, penalty_fee: u32) -> Self {
        let mut fees = Self {
            application_fee,
            test_fee,
            license_fee,
            penalty_fee,
            total_fee: 0,
            payment_status: PaymentStatus::Pending,
        };
        fees.recompute_total();
        fees
    }

    pub fn total_fee(&self) -> u64 {
        self.total_fee
    }

    pub fn recompute_total(&mut self) {
        self.total_fee = [
            self.application_fee,
            self.test_fee,
            self.license_fee,
            self.penalty_fee,
        ]
        .into_iter()
        .map(u64::from)
        .sum();
    }
}

/// Issued license identifier in `DL-<year>-<5 digits>` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LicenseNumber(pub String);

impl LicenseNumber {
    pub fn compose(year: i32, serial: u32) -> Self {
        Self(format!("DL-{year}-{:05}", serial % 100_000))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LicenseNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseDetails {
    pub license_number: LicenseNumber,
    pub issue_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub restrictions: Vec<String>,
    pub endorsements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminNote {
    pub text: String,
    pub author: AccountId,
    pub timestamp: DateTime<Utc>,
}

/// Append-only annotation trail; appending yields a new sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminNotes(Vec<AdminNote>);

impl AdminNotes {
    #[must_use]
    pub fn appended(&self, note: AdminNote) -> Self {
        let mut notes = Vec::with_capacity(self.0.len() + 1);
        notes.extend(self.0.iter().cloned());
        notes.push(note);
        Self(notes)
    }

    pub fn as_slice(&self) -> &[AdminNote] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    #[serde(default)]
    pub relationship: String,
    pub phone: String,
}

/// Self-declared medical information; never used for automatic decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalInfo {
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub vision_correction: bool,
}

/// Inbound submission payload prior to intake validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    #[serde(default)]
    pub application_type: String,
    #[serde(default)]
    pub license_type: String,
    #[serde(default)]
    pub license_class: String,
    /// Only administrators may file on behalf of another account.
    #[serde(default)]
    pub applicant_id: Option<AccountId>,
    #[serde(default)]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default)]
    pub medical_info: Option<MedicalInfo>,
}

/// Partial update. The first block is owner-editable; the rest is administrator-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationPatch {
    pub application_type: Option<String>,
    pub license_type: Option<String>,
    pub license_class: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    pub medical_info: Option<MedicalInfo>,

    pub status: Option<ApplicationStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub penalty_fee: Option<u32>,
    pub restrictions: Option<Vec<String>>,
    pub endorsements: Option<Vec<String>>,
    pub note: Option<String>,
}

impl ApplicationPatch {
    /// Names of administrator-only fields present in the patch.
    pub fn admin_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.status.is_some() {
            fields.push("status");
        }
        if self.payment_status.is_some() {
            fields.push("payment_status");
        }
        if self.penalty_fee.is_some() {
            fields.push("penalty_fee");
        }
        if self.restrictions.is_some() {
            fields.push("restrictions");
        }
        if self.endorsements.is_some() {
            fields.push("endorsements");
        }
        if self.note.is_some() {
            fields.push("note");
        }
        fields
    }
}

/// Test scheduling request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleTestRequest {
    pub scheduled_date: DateTime<Utc>,
    #[serde(default)]
    pub instructor: Option<String>,
}

/// Test result request body. `result` stays textual so invalid values surface as a domain error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordResultRequest {
    pub result: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}
