use chrono::{DateTime, Months, Utc};
use rand::Rng;

use super::domain::{LicenseDetails, LicenseNumber};
use super::lifecycle::LifecycleError;
use super::repository::ApplicationRecord;

pub const DEFAULT_MAX_ATTEMPTS: u8 = 5;
pub const DEFAULT_VALIDITY_YEARS: u32 = 5;

/// Source of candidate license numbers.
///
/// Candidates are not unique by construction; the store's uniqueness constraint decides and
/// the service regenerates on conflict.
pub trait LicenseNumberSource: Send + Sync {
    fn generate(&self, year: i32) -> LicenseNumber;
}

/// `DL-<year>-<00000..=99999>` from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomLicenseNumbers;

impl LicenseNumberSource for RandomLicenseNumbers {
    fn generate(&self, year: i32) -> LicenseNumber {
        let serial = rand::thread_rng().gen_range(0..100_000);
        LicenseNumber::compose(year, serial)
    }
}

/// Issuance dials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuanceConfig {
    pub max_attempts: u8,
    pub validity_years: u32,
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            validity_years: DEFAULT_VALIDITY_YEARS,
        }
    }
}

pub fn expiry_for(issued: DateTime<Utc>, years: u32) -> Result<DateTime<Utc>, LifecycleError> {
    years
        .checked_mul(12)
        .and_then(|months| issued.checked_add_months(Months::new(months)))
        .ok_or(LifecycleError::ExpiryOutOfRange { issued, years })
}

/// Stamp license details on the record. Records that already carry a number are left as-is.
pub fn issue_license(
    record: &mut ApplicationRecord,
    number: LicenseNumber,
    now: DateTime<Utc>,
    validity_years: u32,
) -> Result<(), LifecycleError> {
    if record.license_details.is_some() {
        return Ok(());
    }

    let expiry_date = expiry_for(now, validity_years)?;
    record.license_details = Some(LicenseDetails {
        license_number: number,
        issue_date: now,
        expiry_date,
        restrictions: record.restrictions.clone(),
        endorsements: record.endorsements.clone(),
    });
    record.approval_date = Some(now);
    Ok(())
}
