use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    AccountId, AdminNotes, ApplicationId, ApplicationStatus, ApplicationType, EmergencyContact,
    FeeBreakdown, LicenseDetails, LicenseNumber, MedicalInfo, PaymentStatus, TestSuite,
};

/// Persisted application aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub application_id: ApplicationId,
    pub applicant_id: AccountId,
    pub application_type: ApplicationType,
    pub license_type: String,
    pub license_class: String,
    pub status: ApplicationStatus,
    pub tests: TestSuite,
    pub fees: FeeBreakdown,
    pub emergency_contact: EmergencyContact,
    pub medical_info: Option<MedicalInfo>,
    /// Conditions an administrator attaches ahead of issuance.
    #[serde(default)]
    pub restrictions: Vec<String>,
    #[serde(default)]
    pub endorsements: Vec<String>,
    pub license_details: Option<LicenseDetails>,
    #[serde(default)]
    pub admin_notes: AdminNotes,
    pub submission_date: DateTime<Utc>,
    pub review_date: Option<DateTime<Utc>>,
    pub approval_date: Option<DateTime<Utc>>,
    pub issue_date: Option<DateTime<Utc>>,
    /// Optimistic concurrency counter, owned by the store.
    #[serde(default)]
    pub version: u64,
}

impl ApplicationRecord {
    pub fn license_number(&self) -> Option<&LicenseNumber> {
        self.license_details
            .as_ref()
            .map(|details| &details.license_number)
    }

    pub fn is_owned_by(&self, account: &AccountId) -> bool {
        &self.applicant_id == account
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.application_id.clone(),
            status: self.status.label(),
            application_type: self.application_type.label().to_string(),
            license_type: self.license_type.clone(),
            license_class: self.license_class.clone(),
            total_fee: self.fees.total_fee(),
            payment_status: self.fees.payment_status,
            license_number: self.license_number().cloned(),
            submission_date: self.submission_date,
        }
    }
}

/// Listing summary exposed to API consumers.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub status: &'static str,
    pub application_type: String,
    pub license_type: String,
    pub license_class: String,
    pub total_fee: u64,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<LicenseNumber>,
    pub submission_date: DateTime<Utc>,
}

/// Listing criteria. `search` matches license number, type and class case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub owner: Option<AccountId>,
    pub status: Option<ApplicationStatus>,
    pub application_type: Option<ApplicationType>,
    pub search: Option<String>,
}

impl ApplicationFilter {
    pub fn matches(&self, record: &ApplicationRecord) -> bool {
        if let Some(owner) = &self.owner {
            if &record.applicant_id != owner {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(application_type) = &self.application_type {
            if &record.application_type != application_type {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                let number_hit = record
                    .license_number()
                    .map(|number| number.as_str().to_lowercase().contains(&term))
                    .unwrap_or(false);
                number_hit
                    || record.license_type.to_lowercase().contains(&term)
                    || record.license_class.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Clamp to `page >= 1` and `1..=MAX_PAGE_SIZE`.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.limit as usize
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Document store abstraction.
///
/// Implementations must reject writes whose `version` differs from the stored one and must
/// enforce license-number uniqueness across records.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError>;
    fn update(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError>;
    fn delete(&self, id: &ApplicationId) -> Result<(), RepositoryError>;
    fn list(
        &self,
        filter: &ApplicationFilter,
        pagination: Pagination,
    ) -> Result<Page<ApplicationRecord>, RepositoryError>;
    fn scan(&self) -> Result<Vec<ApplicationRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("license number {0} is already assigned")]
    DuplicateLicenseNumber(LicenseNumber),
    #[error("stale write: expected version {expected}, stored version is {found}")]
    StaleVersion { expected: u64, found: u64 },
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Process-local store used by the service binary and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, ApplicationRecord>>>,
}

impl InMemoryApplicationRepository {
    fn lock(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<ApplicationId, ApplicationRecord>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }

    fn ensure_unique_number(
        records: &HashMap<ApplicationId, ApplicationRecord>,
        record: &ApplicationRecord,
    ) -> Result<(), RepositoryError> {
        let Some(number) = record.license_number() else {
            return Ok(());
        };
        let taken = records.values().any(|other| {
            other.application_id != record.application_id
                && other.license_number() == Some(number)
        });
        if taken {
            return Err(RepositoryError::DuplicateLicenseNumber(number.clone()));
        }
        Ok(())
    }
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, mut record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&record.application_id) {
            return Err(RepositoryError::Conflict);
        }
        Self::ensure_unique_number(&guard, &record)?;
        record.version = 1;
        guard.insert(record.application_id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, mut record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.lock()?;
        let stored_version = guard
            .get(&record.application_id)
            .map(|stored| stored.version)
            .ok_or(RepositoryError::NotFound)?;
        if stored_version != record.version {
            return Err(RepositoryError::StaleVersion {
                expected: record.version,
                found: stored_version,
            });
        }
        Self::ensure_unique_number(&guard, &record)?;
        record.version += 1;
        guard.insert(record.application_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.get(id).cloned())
    }

    fn delete(&self, id: &ApplicationId) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        guard
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn list(
        &self,
        filter: &ApplicationFilter,
        pagination: Pagination,
    ) -> Result<Page<ApplicationRecord>, RepositoryError> {
        let pagination = pagination.normalized();
        let guard = self.lock()?;
        let mut matching: Vec<ApplicationRecord> = guard
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        drop(guard);

        matching.sort_by(|a, b| {
            b.submission_date
                .cmp(&a.submission_date)
                .then_with(|| b.application_id.cmp(&a.application_id))
        });

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.limit as usize)
            .collect();

        Ok(Page {
            items,
            total,
            page: pagination.page,
            limit: pagination.limit,
        })
    }

    fn scan(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.values().cloned().collect())
    }
}
