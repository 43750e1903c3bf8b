use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{ApplicationStatus, PaymentStatus, TestKind, TestResult};
use super::repository::ApplicationRecord;

/// Portfolio-wide counters for the administrator dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplicationStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_license_type: BTreeMap<String, usize>,
    pub by_application_type: BTreeMap<String, usize>,
    /// Required tests that reached `Pass`, per test kind.
    pub tests_passed: BTreeMap<String, usize>,
    /// Sum of total fees across paid applications. Waived fees are not revenue.
    pub paid_revenue: u64,
}

pub fn summarize<'a, I>(records: I) -> ApplicationStats
where
    I: IntoIterator<Item = &'a ApplicationRecord>,
{
    let mut stats = ApplicationStats::default();
    for status in ApplicationStatus::ordered() {
        stats.by_status.insert(status.label().to_string(), 0);
    }
    for kind in TestKind::all() {
        stats.tests_passed.insert(kind.label().to_string(), 0);
    }

    for record in records {
        stats.total += 1;
        *stats
            .by_status
            .entry(record.status.label().to_string())
            .or_default() += 1;
        *stats
            .by_license_type
            .entry(record.license_type.clone())
            .or_default() += 1;
        *stats
            .by_application_type
            .entry(record.application_type.label().to_string())
            .or_default() += 1;

        for (kind, test) in record.tests.iter() {
            if test.required && test.result == TestResult::Pass {
                *stats
                    .tests_passed
                    .entry(kind.label().to_string())
                    .or_default() += 1;
            }
        }

        if record.fees.payment_status == PaymentStatus::Paid {
            stats.paid_revenue = stats.paid_revenue.saturating_add(record.fees.total_fee());
        }
    }

    stats
}
