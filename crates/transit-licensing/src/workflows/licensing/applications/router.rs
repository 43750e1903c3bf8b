use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    AccountId, ApplicationId, ApplicationPatch, ApplicationStatus, ApplicationSubmission,
    ApplicationType, RecordResultRequest, Requester, Role, ScheduleTestRequest,
};
use super::issuance::LicenseNumberSource;
use super::repository::{ApplicationFilter, ApplicationRepository, Pagination};
use super::service::{ApplicationServiceError, ErrorKind, LicenseApplicationService};
use crate::error::AppError;

/// Account identifier forwarded by the authenticating gateway.
pub const ACCOUNT_HEADER: &str = "x-account-id";
/// `admin` or `applicant`.
pub const ROLE_HEADER: &str = "x-account-role";

type SharedService<R, N> = Arc<LicenseApplicationService<R, N>>;

/// Router builder exposing the application lifecycle over HTTP.
pub fn application_router<R, N>(service: SharedService<R, N>) -> Router
where
    R: ApplicationRepository + 'static,
    N: LicenseNumberSource + 'static,
{
    Router::new()
        .route(
            "/api/v1/licenses/applications",
            post(submit_handler::<R, N>).get(list_handler::<R, N>),
        )
        .route(
            "/api/v1/licenses/applications/stats",
            get(stats_handler::<R, N>),
        )
        .route(
            "/api/v1/licenses/applications/:application_id",
            get(get_handler::<R, N>)
                .patch(update_handler::<R, N>)
                .delete(delete_handler::<R, N>),
        )
        .route(
            "/api/v1/licenses/applications/:application_id/tests/:test_type/schedule",
            post(schedule_test_handler::<R, N>),
        )
        .route(
            "/api/v1/licenses/applications/:application_id/tests/:test_type/result",
            post(record_result_handler::<R, N>),
        )
        .route(
            "/api/v1/licenses/applications/:application_id/notes",
            post(add_note_handler::<R, N>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub owner: Option<String>,
    pub status: Option<String>,
    pub application_type: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListQuery {
    fn into_criteria(self) -> Result<(ApplicationFilter, Pagination), ApplicationServiceError> {
        let status = self
            .status
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| raw.parse::<ApplicationStatus>())
            .transpose()?;
        let defaults = Pagination::default();
        let filter = ApplicationFilter {
            owner: self
                .owner
                .filter(|raw| !raw.trim().is_empty())
                .map(AccountId),
            status,
            application_type: self
                .application_type
                .filter(|raw| !raw.trim().is_empty())
                .map(ApplicationType::from),
            search: self.search,
        };
        let pagination = Pagination {
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
        };
        Ok((filter, pagination))
    }
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub text: String,
}

pub(crate) async fn submit_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    submission: Result<Json<ApplicationSubmission>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: LicenseNumberSource + 'static,
{
    let requester = match requester_from_headers(&headers) {
        Ok(requester) => requester,
        Err(response) => return response,
    };
    let Json(submission) = match extracted(submission) {
        Ok(submission) => submission,
        Err(response) => return response,
    };
    match service.submit(&requester, submission) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: LicenseNumberSource + 'static,
{
    let requester = match requester_from_headers(&headers) {
        Ok(requester) => requester,
        Err(response) => return response,
    };
    let Query(query) = match extracted(query) {
        Ok(query) => query,
        Err(response) => return response,
    };
    let result = query
        .into_criteria()
        .and_then(|(filter, pagination)| service.list(&requester, filter, pagination));
    match result {
        Ok(page) => {
            let page = page.map(|record| record.status_view());
            (StatusCode::OK, Json(page)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn stats_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: LicenseNumberSource + 'static,
{
    let requester = match requester_from_headers(&headers) {
        Ok(requester) => requester,
        Err(response) => return response,
    };
    match service.stats(&requester) {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    application_id: Result<Path<String>, PathRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: LicenseNumberSource + 'static,
{
    let requester = match requester_from_headers(&headers) {
        Ok(requester) => requester,
        Err(response) => return response,
    };
    let Path(application_id) = match extracted(application_id) {
        Ok(path) => path,
        Err(response) => return response,
    };
    match service.get(&requester, &ApplicationId(application_id)) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    application_id: Result<Path<String>, PathRejection>,
    patch: Result<Json<ApplicationPatch>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: LicenseNumberSource + 'static,
{
    let requester = match requester_from_headers(&headers) {
        Ok(requester) => requester,
        Err(response) => return response,
    };
    let (Path(application_id), Json(patch)) =
        match extracted(application_id).and_then(|path| Ok((path, extracted(patch)?))) {
            Ok(parts) => parts,
            Err(response) => return response,
        };
    match service.update(&requester, &ApplicationId(application_id), patch) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    application_id: Result<Path<String>, PathRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: LicenseNumberSource + 'static,
{
    let requester = match requester_from_headers(&headers) {
        Ok(requester) => requester,
        Err(response) => return response,
    };
    let Path(application_id) = match extracted(application_id) {
        Ok(path) => path,
        Err(response) => return response,
    };
    match service.delete(&requester, &ApplicationId(application_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn schedule_test_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    path: Result<Path<(String, String)>, PathRejection>,
    request: Result<Json<ScheduleTestRequest>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: LicenseNumberSource + 'static,
{
    let requester = match requester_from_headers(&headers) {
        Ok(requester) => requester,
        Err(response) => return response,
    };
    let (Path((application_id, test_type)), Json(request)) =
        match extracted(path).and_then(|path| Ok((path, extracted(request)?))) {
            Ok(parts) => parts,
            Err(response) => return response,
        };
    match service.schedule_test(
        &requester,
        &ApplicationId(application_id),
        &test_type,
        request,
    ) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn record_result_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    path: Result<Path<(String, String)>, PathRejection>,
    request: Result<Json<RecordResultRequest>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: LicenseNumberSource + 'static,
{
    let requester = match requester_from_headers(&headers) {
        Ok(requester) => requester,
        Err(response) => return response,
    };
    let (Path((application_id, test_type)), Json(request)) =
        match extracted(path).and_then(|path| Ok((path, extracted(request)?))) {
            Ok(parts) => parts,
            Err(response) => return response,
        };
    match service.record_result(
        &requester,
        &ApplicationId(application_id),
        &test_type,
        request,
    ) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn add_note_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    application_id: Result<Path<String>, PathRejection>,
    request: Result<Json<NoteRequest>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: LicenseNumberSource + 'static,
{
    let requester = match requester_from_headers(&headers) {
        Ok(requester) => requester,
        Err(response) => return response,
    };
    let (Path(application_id), Json(request)) =
        match extracted(application_id).and_then(|path| Ok((path, extracted(request)?))) {
            Ok(parts) => parts,
            Err(response) => return response,
        };
    match service.add_note(&requester, &ApplicationId(application_id), &request.text) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) fn requester_from_headers(headers: &HeaderMap) -> Result<Requester, Response> {
    let account = headers
        .get(ACCOUNT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let Some(account) = account else {
        return Err(unauthorized("missing account identity"));
    };

    let role = match headers
        .get(ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_ascii_lowercase())
        .as_deref()
    {
        None | Some("applicant") | Some("user") => Role::Applicant,
        Some("admin") | Some("administrator") => Role::Administrator,
        Some(_) => return Err(unauthorized("unrecognized account role")),
    };

    Ok(Requester {
        account: AccountId(account.to_string()),
        role,
    })
}

fn unauthorized(message: &str) -> Response {
    let payload = json!({ "error": message, "kind": "unauthorized" });
    (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_response(err: ApplicationServiceError) -> Response {
    AppError::from(err).into_response()
}

/// Rejections from axum's own extractors, reported in the same `{error, kind}` shape.
trait ExtractorRejection {
    fn status(&self) -> StatusCode;
    fn body_text(&self) -> String;
}

macro_rules! extractor_rejection {
    ($($rejection:ty),+) => {
        $(impl ExtractorRejection for $rejection {
            fn status(&self) -> StatusCode {
                <$rejection>::status(self)
            }

            fn body_text(&self) -> String {
                <$rejection>::body_text(self)
            }
        })+
    };
}

extractor_rejection!(JsonRejection, QueryRejection, PathRejection);

fn extracted<T, E: ExtractorRejection>(value: Result<T, E>) -> Result<T, Response> {
    value.map_err(|rejection| {
        let payload = json!({
            "error": rejection.body_text(),
            "kind": ErrorKind::Validation.label(),
        });
        (rejection.status(), Json(payload)).into_response()
    })
}
