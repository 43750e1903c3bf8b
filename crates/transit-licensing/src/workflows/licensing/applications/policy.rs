use super::domain::{ApplicationType, TestRecord, TestResult, TestSuite};

/// Initial test requirements for an application type.
///
/// Exempt tests start as `Pass` so they never hold back approval.
pub fn initial_tests(application_type: &ApplicationType) -> TestSuite {
    let (theory, practical, medical) = match application_type {
        ApplicationType::NewLicense | ApplicationType::Upgrade => (true, true, true),
        ApplicationType::Renewal => (false, false, true),
        ApplicationType::Replacement
        | ApplicationType::International
        | ApplicationType::Other(_) => (false, false, false),
    };

    TestSuite {
        theory: requirement(theory),
        practical: requirement(practical),
        medical: requirement(medical),
    }
}

fn requirement(required: bool) -> TestRecord {
    let result = if required {
        TestResult::Pending
    } else {
        TestResult::Pass
    };
    TestRecord::new(required, result)
}
