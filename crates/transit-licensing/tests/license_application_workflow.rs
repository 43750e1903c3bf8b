//! End-to-end scenarios for driver's-license applications, exercised through the public
//! service facade and the HTTP router only.

mod common {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use transit_licensing::workflows::licensing::applications::{
        ApplicationSubmission, EmergencyContact, InMemoryApplicationRepository, IssuanceConfig,
        LicenseApplicationService, LicenseNumber, LicenseNumberSource, MedicalInfo, Requester,
    };

    pub(super) type Service =
        LicenseApplicationService<InMemoryApplicationRepository, RepeatingNumbers>;

    pub(super) fn applicant() -> Requester {
        Requester::applicant("citizen-77")
    }

    pub(super) fn officer() -> Requester {
        Requester::administrator("officer-3")
    }

    pub(super) fn submission(application_type: &str) -> ApplicationSubmission {
        ApplicationSubmission {
            application_type: application_type.to_string(),
            license_type: "Commercial".to_string(),
            license_class: "C".to_string(),
            applicant_id: None,
            emergency_contact: Some(EmergencyContact {
                name: "Jonas Petrovic".to_string(),
                relationship: "Spouse".to_string(),
                phone: "+385 91 555 0199".to_string(),
            }),
            medical_info: Some(MedicalInfo {
                blood_type: Some("A-".to_string()),
                conditions: Vec::new(),
                medications: Vec::new(),
                vision_correction: false,
            }),
        }
    }

    /// Hands out the same serial `repeats` times before moving on.
    pub(super) struct RepeatingNumbers {
        calls: AtomicU32,
        repeats: u32,
    }

    impl RepeatingNumbers {
        pub(super) fn new(repeats: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                repeats: repeats.max(1),
            }
        }
    }

    impl LicenseNumberSource for RepeatingNumbers {
        fn generate(&self, year: i32) -> LicenseNumber {
            let call = self.calls.fetch_add(1, Ordering::Relaxed);
            LicenseNumber::compose(year, 10_000 + call / self.repeats)
        }
    }

    pub(super) fn build_service(repeats: u32) -> (Service, Arc<InMemoryApplicationRepository>) {
        let repository = Arc::new(InMemoryApplicationRepository::default());
        let service = LicenseApplicationService::new(
            repository.clone(),
            Arc::new(RepeatingNumbers::new(repeats)),
            IssuanceConfig::default(),
        );
        (service, repository)
    }
}

mod lifecycle {
    use super::common::*;
    use chrono::{Duration, Utc};
    use transit_licensing::workflows::licensing::applications::{
        ApplicationPatch, ApplicationRepository, ApplicationStatus, ErrorKind,
        RecordResultRequest, ScheduleTestRequest, TestKind, TestResult,
    };

    fn pass() -> RecordResultRequest {
        RecordResultRequest {
            result: "Pass".to_string(),
            score: Some(88.0),
            notes: None,
        }
    }

    fn fail() -> RecordResultRequest {
        RecordResultRequest {
            result: "Fail".to_string(),
            score: Some(41.0),
            notes: None,
        }
    }

    fn slot(days: i64) -> ScheduleTestRequest {
        ScheduleTestRequest {
            scheduled_date: Utc::now() + Duration::days(days),
            instructor: Some("Instructor Ayodele".to_string()),
        }
    }

    #[test]
    fn failed_practical_is_retaken_before_final_review() {
        let (service, _) = build_service(1);
        let id = service
            .submit(&applicant(), submission("New License"))
            .expect("submitted")
            .application_id;

        let record = service
            .schedule_test(&applicant(), &id, "practical", slot(7))
            .expect("practical scheduled");
        assert_eq!(record.status, ApplicationStatus::TestsScheduled);
        assert_eq!(
            record.tests.practical.instructor.as_deref(),
            Some("Instructor Ayodele")
        );

        service
            .record_result(&officer(), &id, "theory", pass())
            .expect("theory passed");
        let record = service
            .record_result(&officer(), &id, "practical", fail())
            .expect("practical failed");
        assert_eq!(record.status, ApplicationStatus::TestsInProgress);
        assert_eq!(record.tests.practical.result, TestResult::Fail);

        service
            .schedule_test(&applicant(), &id, "practical", slot(21))
            .expect("retest scheduled");
        let record = service
            .record_result(&officer(), &id, "practical", pass())
            .expect("practical passed");
        assert_eq!(record.tests.practical.attempts, 2);
        assert_eq!(record.status, ApplicationStatus::TestsInProgress);

        let record = service
            .record_result(&officer(), &id, "medical", pass())
            .expect("medical passed");
        assert_eq!(record.status, ApplicationStatus::FinalReview);
        assert!(TestKind::all()
            .into_iter()
            .all(|kind| record.tests.get(kind).result == TestResult::Pass));
    }

    #[test]
    fn colliding_numbers_are_regenerated() {
        let (service, repository) = build_service(2);
        let first = service
            .submit(&applicant(), submission("International"))
            .expect("submitted")
            .application_id;
        let second = service
            .submit(&applicant(), submission("International"))
            .expect("submitted")
            .application_id;

        let approve = ApplicationPatch {
            status: Some(ApplicationStatus::Approved),
            ..ApplicationPatch::default()
        };
        let first = service
            .update(&officer(), &first, approve.clone())
            .expect("first approved");
        let second = service
            .update(&officer(), &second, approve)
            .expect("second approved");

        assert_ne!(first.license_number(), second.license_number());
        assert!(repository
            .scan()
            .expect("scan")
            .iter()
            .all(|record| record.license_details.is_some()));
    }

    #[test]
    fn rejected_applications_stay_closed() {
        let (service, _) = build_service(1);
        let id = service
            .submit(&applicant(), submission("Upgrade"))
            .expect("submitted")
            .application_id;
        service
            .set_status(&officer(), &id, ApplicationStatus::Rejected)
            .expect("rejected");

        let err = service
            .record_result(&officer(), &id, "theory", pass())
            .expect_err("closed");
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = service
            .delete(&applicant(), &id)
            .expect_err("owner cannot withdraw a decided application");
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}

mod routing {
    use super::common::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use transit_licensing::workflows::licensing::applications::application_router;

    async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(request)
            .await
            .expect("router dispatch");
        let status = response.status();
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let payload = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("json")
        };
        (status, payload)
    }

    fn call(
        method: &str,
        uri: &str,
        account: &str,
        role: &str,
        body: Option<Value>,
    ) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-account-id", account)
            .header("x-account-role", role)
            .header("content-type", "application/json");
        let body = body
            .map(|value| Body::from(serde_json::to_vec(&value).expect("serialize")))
            .unwrap_or_else(Body::empty);
        builder.body(body).expect("request")
    }

    #[tokio::test]
    async fn replacement_is_issued_over_http() {
        let (service, _) = build_service(1);
        let router = application_router(Arc::new(service));

        let (status, created) = send(
            &router,
            call(
                "POST",
                "/api/v1/licenses/applications",
                "citizen-77",
                "applicant",
                Some(serde_json::to_value(submission("Replacement")).expect("serialize")),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["fees"]["total_fee"], 130);
        let id = created["application_id"]
            .as_str()
            .expect("application id")
            .to_string();

        let (status, _) = send(
            &router,
            call(
                "PATCH",
                &format!("/api/v1/licenses/applications/{id}"),
                "citizen-77",
                "applicant",
                Some(json!({ "penalty_fee": 10 })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, approved) = send(
            &router,
            call(
                "PATCH",
                &format!("/api/v1/licenses/applications/{id}"),
                "officer-3",
                "admin",
                Some(json!({ "status": "Approved", "payment_status": "Paid" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(approved["license_details"]["license_number"]
            .as_str()
            .is_some_and(|number| number.starts_with("DL-") && number.ends_with("-10000")));

        let (status, listing) = send(
            &router,
            call(
                "GET",
                "/api/v1/licenses/applications?search=dl-",
                "citizen-77",
                "applicant",
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listing["total"], 1);
        assert_eq!(listing["items"][0]["status"], "Approved");
        assert_eq!(listing["items"][0]["payment_status"], "Paid");

        let (status, stats) = send(
            &router,
            call(
                "GET",
                "/api/v1/licenses/applications/stats",
                "officer-3",
                "admin",
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["paid_revenue"], 130);
        assert_eq!(stats["by_status"]["Approved"], 1);
    }

    #[tokio::test]
    async fn unknown_applications_return_not_found() {
        let (service, _) = build_service(1);
        let router = application_router(Arc::new(service));

        let (status, payload) = send(
            &router,
            call(
                "GET",
                "/api/v1/licenses/applications/dl-app-404404",
                "officer-3",
                "admin",
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(payload["kind"], "not_found");
    }
}
