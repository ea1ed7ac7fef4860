use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::licensing::domain::{
    BloodGroup, DocumentKey, DocumentType, IssuedLicense, LicenseClass, LicenseNumber, RhFactor,
    Titleholder, TitleholderId,
};
use crate::licensing::repository::{LicenseRepository, RepositoryError, TitleholderRepository};
use crate::licensing::{
    licensing_router_with_clock, Clock, InMemoryLicenseRepository, InMemoryTitleholderRepository,
    IssueRequest, LicensingPolicy, LicensingService, TitleholderDraft,
};

pub(super) type MemoryService =
    LicensingService<InMemoryTitleholderRepository, InMemoryLicenseRepository>;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn today() -> NaiveDate {
    date(2025, 5, 20)
}

pub(super) fn draft(document_number: &str, birth_date: NaiveDate) -> TitleholderDraft {
    TitleholderDraft {
        document_type: DocumentType::NationalId,
        document_number: document_number.to_string(),
        given_names: "Ana María".to_string(),
        surname: "Gómez".to_string(),
        birth_date,
        address: "San Martín 1234".to_string(),
        blood_group: BloodGroup::A,
        rh_factor: RhFactor::Positive,
        organ_donor: true,
    }
}

/// 35 years old on `today()`.
pub(super) fn adult_draft() -> TitleholderDraft {
    draft("30123456", date(1990, 3, 4))
}

/// 18 years old on `today()`: old enough for class A only.
pub(super) fn teen_draft() -> TitleholderDraft {
    TitleholderDraft {
        given_names: "Lucas".to_string(),
        surname: "Pereyra".to_string(),
        blood_group: BloodGroup::O,
        rh_factor: RhFactor::Negative,
        organ_donor: false,
        ..draft("40111222", date(2006, 9, 10))
    }
}

/// 70 years old on `today()`, registered with a passport.
pub(super) fn senior_draft() -> TitleholderDraft {
    TitleholderDraft {
        document_type: DocumentType::Passport,
        document_number: "ab123456".to_string(),
        given_names: "Rosa".to_string(),
        surname: "Díaz".to_string(),
        blood_group: BloodGroup::AB,
        rh_factor: RhFactor::Negative,
        ..draft("", date(1955, 1, 15))
    }
}

pub(super) fn issue_request(titleholder_id: TitleholderId, class: LicenseClass) -> IssueRequest {
    IssueRequest {
        titleholder_id,
        class,
        issuer: "Clerk Ramírez".to_string(),
    }
}

pub(super) fn build_service() -> (
    MemoryService,
    Arc<InMemoryTitleholderRepository>,
    Arc<InMemoryLicenseRepository>,
) {
    let titleholders = Arc::new(InMemoryTitleholderRepository::default());
    let licenses = Arc::new(InMemoryLicenseRepository::default());
    let service = LicensingService::new(
        titleholders.clone(),
        licenses.clone(),
        LicensingPolicy::default(),
    );
    (service, titleholders, licenses)
}

pub(super) fn fixed_clock(date: NaiveDate) -> Clock {
    Arc::new(move || date)
}

pub(super) fn router_with_service<T, L>(service: LicensingService<T, L>) -> axum::Router
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    licensing_router_with_clock(Arc::new(service), fixed_clock(today()))
}

pub(super) fn json_request(method: Method, uri: &str, body: &impl serde::Serialize) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("serializable body")))
        .expect("request builds")
}

pub(super) fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) struct UnavailableTitleholders;

impl TitleholderRepository for UnavailableTitleholders {
    fn insert(&self, _titleholder: Titleholder) -> Result<Titleholder, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _titleholder: Titleholder) -> Result<Titleholder, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: TitleholderId) -> Result<Option<Titleholder>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_document(&self, _key: &DocumentKey) -> Result<Option<Titleholder>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self) -> Result<Vec<Titleholder>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn count(&self) -> Result<u64, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) struct UnavailableLicenses;

impl LicenseRepository for UnavailableLicenses {
    fn insert(&self, _license: IssuedLicense) -> Result<IssuedLicense, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _number: &LicenseNumber) -> Result<Option<IssuedLicense>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_titleholder(&self, _id: TitleholderId) -> Result<Vec<IssuedLicense>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn all(&self) -> Result<Vec<IssuedLicense>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn count(&self) -> Result<u64, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn unavailable_service() -> LicensingService<UnavailableTitleholders, UnavailableLicenses>
{
    LicensingService::new(
        Arc::new(UnavailableTitleholders),
        Arc::new(UnavailableLicenses),
        LicensingPolicy::default(),
    )
}
