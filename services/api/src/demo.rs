use crate::infra::licensing_service;
use chrono::{Duration, Utc};
use clap::Args;
use transit_licensing::config::{LicensingConfig, MAX_LICENSE_VALIDITY_YEARS};
use transit_licensing::error::AppError;
use transit_licensing::workflows::licensing::applications::issuance::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_VALIDITY_YEARS,
};
use transit_licensing::workflows::licensing::applications::{
    ApplicationPatch, ApplicationRepository, ApplicationStatus, ApplicationSubmission,
    EmergencyContact, MedicalInfo, PaymentStatus, RecordResultRequest, Requester,
    ScheduleTestRequest, TestKind,
};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Application type to submit (New License, Renewal, Replacement, Upgrade, International)
    #[arg(long, default_value = "New License")]
    pub(crate) application_type: String,
    /// Record a failed first attempt on the practical test before the pass
    #[arg(long)]
    pub(crate) retest_practical: bool,
    /// Late penalty an administrator adds before approval
    #[arg(long)]
    pub(crate) penalty_fee: Option<u32>,
    /// Validity of the issued license in years
    #[arg(
        long,
        default_value_t = DEFAULT_VALIDITY_YEARS,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_LICENSE_VALIDITY_YEARS))
    )]
    pub(crate) validity_years: u32,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        application_type,
        retest_practical,
        penalty_fee,
        validity_years,
    } = args;

    let (service, repository) = licensing_service(&LicensingConfig {
        license_number_attempts: DEFAULT_MAX_ATTEMPTS,
        license_validity_years: validity_years,
    });
    let applicant = Requester::applicant("demo-applicant");
    let officer = Requester::administrator("demo-officer");

    println!("Driver's-license application demo");
    let record = match service.submit(&applicant, demo_submission(&application_type)) {
        Ok(record) => record,
        Err(err) => {
            println!("  Submission rejected: {}", err);
            return Ok(());
        }
    };
    let id = record.application_id.clone();
    println!(
        "- Received {} application {} -> status {}",
        record.application_type, id, record.status
    );
    println!(
        "  Fees: application {} | test {} | license {} | total {}",
        record.fees.application_fee,
        record.fees.test_fee,
        record.fees.license_fee,
        record.fees.total_fee()
    );
    println!("  Required tests:");
    for (kind, test) in record.tests.iter() {
        println!(
            "    - {}: {}",
            kind,
            if test.required { "required" } else { "exempt" }
        );
    }

    let mut slot = Utc::now() + Duration::days(3);
    for kind in TestKind::all() {
        if !record.tests.get(kind).required {
            continue;
        }
        let attempts = if kind == TestKind::Practical && retest_practical {
            ["Fail", "Pass"].as_slice()
        } else {
            ["Pass"].as_slice()
        };
        for result in attempts {
            let request = ScheduleTestRequest {
                scheduled_date: slot,
                instructor: (kind == TestKind::Practical).then(|| "R. Mensah".to_string()),
            };
            if let Err(err) = service.schedule_test(&applicant, &id, kind.label(), request) {
                println!("  Scheduling {} failed: {}", kind, err);
                return Ok(());
            }
            let outcome = RecordResultRequest {
                result: result.to_string(),
                score: Some(if *result == "Pass" { 86.0 } else { 48.0 }),
                notes: (kind == TestKind::Medical).then(|| "Vision within limits".to_string()),
            };
            match service.record_result(&officer, &id, kind.label(), outcome) {
                Ok(updated) => println!(
                    "- {} test on {} -> {} (status {})",
                    kind,
                    slot.format("%Y-%m-%d"),
                    result,
                    updated.status
                ),
                Err(err) => {
                    println!("  Recording {} failed: {}", kind, err);
                    return Ok(());
                }
            }
            slot += Duration::days(7);
        }
    }

    let decision = ApplicationPatch {
        status: Some(ApplicationStatus::Approved),
        payment_status: Some(PaymentStatus::Paid),
        penalty_fee,
        note: Some("Approved at counter review".to_string()),
        ..ApplicationPatch::default()
    };
    let approved = match service.update(&officer, &id, decision) {
        Ok(record) => record,
        Err(err) => {
            println!("  Approval failed: {}", err);
            return Ok(());
        }
    };
    match &approved.license_details {
        Some(details) => println!(
            "- Approved: license {} valid {} to {}",
            details.license_number,
            details.issue_date.format("%Y-%m-%d"),
            details.expiry_date.format("%Y-%m-%d")
        ),
        None => println!("- Approved without a license number (tests outstanding)"),
    }
    println!("  Total charged: {}", approved.fees.total_fee());

    let stored_view = match repository.fetch(&id) {
        Ok(Some(record)) => record.status_view(),
        Ok(None) => {
            println!("  Repository lookup returned no record");
            return Ok(());
        }
        Err(err) => {
            println!("  Repository unavailable: {}", err);
            return Ok(());
        }
    };
    match serde_json::to_string_pretty(&stored_view) {
        Ok(json) => println!("  Status payload:\n{}", json),
        Err(err) => println!("  Status payload unavailable: {}", err),
    }

    match service.stats(&officer) {
        Ok(stats) => println!(
            "  Portfolio: {} application(s) | revenue collected {}",
            stats.total, stats.paid_revenue
        ),
        Err(err) => println!("  Statistics unavailable: {}", err),
    }

    Ok(())
}

fn demo_submission(application_type: &str) -> ApplicationSubmission {
    ApplicationSubmission {
        application_type: application_type.to_string(),
        license_type: "Private".to_string(),
        license_class: "B".to_string(),
        applicant_id: None,
        emergency_contact: Some(EmergencyContact {
            name: "Efua Asante".to_string(),
            relationship: "Parent".to_string(),
            phone: "+233 24 555 0107".to_string(),
        }),
        medical_info: Some(MedicalInfo {
            blood_type: Some("B+".to_string()),
            conditions: Vec::new(),
            medications: Vec::new(),
            vision_correction: true,
        }),
    }
}
