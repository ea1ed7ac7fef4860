use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    BloodGroup, DocumentKey, DocumentType, LicenseClass, LicenseNumber, ParseEnumError, RhFactor,
    TitleholderId,
};
use super::receipt::LicenseReceipt;
use super::repository::{LicenseRepository, RepositoryError, TitleholderRepository};
use super::service::{
    ActiveHolderFilter, CopyRequest, IssueRequest, LicensingError, LicensingService,
    RenewalRequest,
};
use super::validation::{normalize_document, TitleholderDraft};

/// Source of "today" for date-sensitive endpoints.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

pub fn local_clock() -> Clock {
    Arc::new(|| Local::now().date_naive())
}

pub struct LicensingApi<T, L> {
    service: Arc<LicensingService<T, L>>,
    clock: Clock,
}

impl<T, L> Clone for LicensingApi<T, L> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<T, L> LicensingApi<T, L> {
    fn today(&self) -> NaiveDate {
        (self.clock)()
    }
}

/// Router exposing titleholder and license endpoints, dated by the local clock.
pub fn licensing_router<T, L>(service: Arc<LicensingService<T, L>>) -> Router
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    licensing_router_with_clock(service, local_clock())
}

pub fn licensing_router_with_clock<T, L>(
    service: Arc<LicensingService<T, L>>,
    clock: Clock,
) -> Router
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/titleholders",
            post(register_handler::<T, L>)
                .get(titleholder_by_document_handler::<T, L>)
                .put(update_titleholder_handler::<T, L>),
        )
        .route(
            "/api/v1/titleholders/count",
            get(count_titleholders_handler::<T, L>),
        )
        .route(
            "/api/v1/titleholders/active",
            get(active_holders_handler::<T, L>),
        )
        .route(
            "/api/v1/titleholders/:id",
            get(titleholder_handler::<T, L>),
        )
        .route("/api/v1/licenses", post(issue_handler::<T, L>))
        .route("/api/v1/licenses/quote", post(quote_handler::<T, L>))
        .route("/api/v1/licenses/renewals", post(renew_handler::<T, L>))
        .route("/api/v1/licenses/copies", post(copy_handler::<T, L>))
        .route("/api/v1/licenses/count", get(count_issued_handler::<T, L>))
        .route("/api/v1/licenses/expired", get(expired_handler::<T, L>))
        .route(
            "/api/v1/licenses/expired/count",
            get(count_expired_handler::<T, L>),
        )
        .route(
            "/api/v1/licenses/by-document",
            get(licenses_by_document_handler::<T, L>),
        )
        .route(
            "/api/v1/licenses/:number/receipt",
            get(receipt_handler::<T, L>),
        )
        .with_state(LicensingApi { service, clock })
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentQuery {
    pub(crate) document_type: DocumentType,
    pub(crate) document_number: String,
}

impl DocumentQuery {
    fn key(&self) -> Result<DocumentKey, LicensingError> {
        let number = normalize_document(self.document_type, &self.document_number)?;
        Ok(DocumentKey::new(self.document_type, number))
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ActiveHolderQuery {
    #[serde(default)]
    pub(crate) name: Option<String>,
    /// Comma-separated list, e.g. `A,AB`.
    #[serde(default)]
    pub(crate) blood_group: Option<String>,
    #[serde(default)]
    pub(crate) rh_factor: Option<String>,
    #[serde(default)]
    pub(crate) donors_only: Option<bool>,
}

impl ActiveHolderQuery {
    fn into_filter(self) -> Result<ActiveHolderFilter, ParseEnumError> {
        let blood_groups = self
            .blood_group
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter(|value| !value.trim().is_empty())
            .map(str::parse::<BloodGroup>)
            .collect::<Result<Vec<_>, _>>()?;
        let rh_factor = self
            .rh_factor
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(str::parse::<RhFactor>)
            .transpose()?;

        Ok(ActiveHolderFilter {
            name: self.name,
            blood_groups,
            rh_factor,
            donors_only: self.donors_only.unwrap_or(false),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuoteRequest {
    pub(crate) titleholder_id: TitleholderId,
    pub(crate) class: LicenseClass,
}

pub(crate) fn error_response(error: LicensingError) -> Response {
    let (status, payload) = match &error {
        LicensingError::Validation(_) => {
            (StatusCode::BAD_REQUEST, json!({ "error": error.to_string() }))
        }
        LicensingError::Ineligible(rejection) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": error.to_string(), "minimum_age": rejection.minimum }),
        ),
        LicensingError::Conflict(_) | LicensingError::Repository(RepositoryError::Conflict) => {
            (StatusCode::CONFLICT, json!({ "error": error.to_string() }))
        }
        LicensingError::NotFound(_) | LicensingError::Repository(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, json!({ "error": error.to_string() }))
        }
        LicensingError::InvalidState(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": error.to_string() }),
        ),
        LicensingError::Repository(RepositoryError::Unavailable(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": error.to_string() }),
        ),
    };
    (status, Json(payload)).into_response()
}

fn respond<V: serde::Serialize>(status: StatusCode, result: Result<V, LicensingError>) -> Response {
    match result {
        Ok(value) => (status, Json(value)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn register_handler<T, L>(
    State(api): State<LicensingApi<T, L>>,
    Json(draft): Json<TitleholderDraft>,
) -> Response
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    respond(
        StatusCode::CREATED,
        api.service.register_titleholder(draft, api.today()),
    )
}

pub(crate) async fn titleholder_handler<T, L>(
    State(api): State<LicensingApi<T, L>>,
    Path(id): Path<u64>,
) -> Response
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    respond(StatusCode::OK, api.service.titleholder(TitleholderId(id)))
}

pub(crate) async fn titleholder_by_document_handler<T, L>(
    State(api): State<LicensingApi<T, L>>,
    Query(query): Query<DocumentQuery>,
) -> Response
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    let result = query
        .key()
        .and_then(|key| api.service.titleholder_by_document(&key));
    respond(StatusCode::OK, result)
}

pub(crate) async fn update_titleholder_handler<T, L>(
    State(api): State<LicensingApi<T, L>>,
    Query(query): Query<DocumentQuery>,
    Json(draft): Json<TitleholderDraft>,
) -> Response
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    let result = query
        .key()
        .and_then(|key| api.service.update_titleholder(&key, draft, api.today()));
    respond(StatusCode::OK, result)
}

pub(crate) async fn count_titleholders_handler<T, L>(
    State(api): State<LicensingApi<T, L>>,
) -> Response
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    respond(StatusCode::OK, api.service.count_titleholders())
}

pub(crate) async fn active_holders_handler<T, L>(
    State(api): State<LicensingApi<T, L>>,
    Query(query): Query<ActiveHolderQuery>,
) -> Response
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    let filter = match query.into_filter() {
        Ok(filter) => filter,
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
        }
    };
    respond(
        StatusCode::OK,
        api.service.search_active_holders(&filter, api.today()),
    )
}

pub(crate) async fn quote_handler<T, L>(
    State(api): State<LicensingApi<T, L>>,
    Json(request): Json<QuoteRequest>,
) -> Response
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    respond(
        StatusCode::OK,
        api.service
            .quote(request.titleholder_id, request.class, api.today()),
    )
}

pub(crate) async fn issue_handler<T, L>(
    State(api): State<LicensingApi<T, L>>,
    Json(request): Json<IssueRequest>,
) -> Response
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    respond(
        StatusCode::CREATED,
        api.service.issue_license(request, api.today()),
    )
}

pub(crate) async fn renew_handler<T, L>(
    State(api): State<LicensingApi<T, L>>,
    Json(request): Json<RenewalRequest>,
) -> Response
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    respond(
        StatusCode::CREATED,
        api.service.renew_license(request, api.today()),
    )
}

pub(crate) async fn copy_handler<T, L>(
    State(api): State<LicensingApi<T, L>>,
    Json(request): Json<CopyRequest>,
) -> Response
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    respond(
        StatusCode::CREATED,
        api.service.issue_copy(request, api.today()),
    )
}

pub(crate) async fn count_issued_handler<T, L>(State(api): State<LicensingApi<T, L>>) -> Response
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    respond(StatusCode::OK, api.service.count_issued())
}

pub(crate) async fn expired_handler<T, L>(State(api): State<LicensingApi<T, L>>) -> Response
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    respond(StatusCode::OK, api.service.expired_licenses(api.today()))
}

pub(crate) async fn count_expired_handler<T, L>(State(api): State<LicensingApi<T, L>>) -> Response
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    respond(StatusCode::OK, api.service.count_expired(api.today()))
}

pub(crate) async fn licenses_by_document_handler<T, L>(
    State(api): State<LicensingApi<T, L>>,
    Query(query): Query<DocumentQuery>,
) -> Response
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    let result = query
        .key()
        .and_then(|key| api.service.licenses_for_document(&key, api.today()));
    respond(StatusCode::OK, result)
}

pub(crate) async fn receipt_handler<T, L>(
    State(api): State<LicensingApi<T, L>>,
    Path(number): Path<String>,
) -> Response
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    let result = api
        .service
        .license(&LicenseNumber(number))
        .map(|license| LicenseReceipt::from_license(&license));
    respond(StatusCode::OK, result)
}
