use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{
    add_years, BloodGroup, DocumentKey, IssuedLicense, LicenseClass, LicenseKind, LicenseNumber,
    LicenseStatus, RenewalReason, RhFactor, Titleholder, TitleholderId,
};
use super::eligibility::{Eligibility, EligibilityCalculator, IneligibleAge};
use super::repository::{LicenseRepository, RepositoryError, TitleholderRepository};
use super::validation::{
    bounded_text, validate_draft, TitleholderDraft, ValidationError, MAX_ADDRESS_LEN,
    MAX_NAME_LEN, MAX_REASON_LEN,
};

const DEFAULT_COPY_FEE: u32 = 50;
const MAX_ISSUER_LEN: usize = 100;

/// Office-level pricing knobs that sit outside the eligibility rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicensingPolicy {
    pub copy_fee: u32,
}

impl Default for LicensingPolicy {
    fn default() -> Self {
        Self {
            copy_fee: DEFAULT_COPY_FEE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    pub titleholder_id: TitleholderId,
    pub class: LicenseClass,
    pub issuer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalRequest {
    pub license_number: LicenseNumber,
    pub reason: RenewalReason,
    #[serde(default)]
    pub given_names: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRequest {
    pub license_number: LicenseNumber,
    pub reason: String,
    pub issuer: String,
}

/// Criteria for listing titleholders that currently hold an active license.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveHolderFilter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub blood_groups: Vec<BloodGroup>,
    #[serde(default)]
    pub rh_factor: Option<RhFactor>,
    #[serde(default)]
    pub donors_only: bool,
}

impl ActiveHolderFilter {
    fn matches(&self, titleholder: &Titleholder) -> bool {
        if let Some(name) = self.name.as_deref().map(str::trim) {
            if !name.is_empty()
                && !titleholder
                    .full_name()
                    .to_lowercase()
                    .contains(&name.to_lowercase())
            {
                return false;
            }
        }
        if !self.blood_groups.is_empty() && !self.blood_groups.contains(&titleholder.blood_group)
        {
            return false;
        }
        if self
            .rh_factor
            .is_some_and(|factor| factor != titleholder.rh_factor)
        {
            return false;
        }
        !self.donors_only || titleholder.organ_donor
    }
}

/// Result of pricing a class for a titleholder without issuing anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub titleholder_id: TitleholderId,
    pub class: LicenseClass,
    pub age: u32,
    pub validity_years: u8,
    pub cost: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseView {
    pub license: IssuedLicense,
    pub status: LicenseStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleholderLicenses {
    pub titleholder: Titleholder,
    pub licenses: Vec<LicenseView>,
}

/// Row of the active-holder listing: the holder and their latest-expiring license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveHolderRow {
    pub titleholder: Titleholder,
    pub license_number: LicenseNumber,
    pub class: LicenseClass,
    pub expiration_date: NaiveDate,
}

/// Service composing the repositories with validation and the eligibility rules.
pub struct LicensingService<T, L> {
    titleholders: Arc<T>,
    licenses: Arc<L>,
    policy: LicensingPolicy,
    titleholder_sequence: AtomicU64,
    license_sequence: AtomicU64,
    /// Serialises the active-license check with the insert that follows it.
    issuance: Mutex<()>,
}

impl<T, L> LicensingService<T, L>
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    /// Identifiers start at 1, so the repositories are expected to start empty.
    pub fn new(titleholders: Arc<T>, licenses: Arc<L>, policy: LicensingPolicy) -> Self {
        Self {
            titleholders,
            licenses,
            policy,
            titleholder_sequence: AtomicU64::new(1),
            license_sequence: AtomicU64::new(1),
            issuance: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &LicensingPolicy {
        &self.policy
    }

    fn next_titleholder_id(&self) -> TitleholderId {
        TitleholderId(self.titleholder_sequence.fetch_add(1, Ordering::Relaxed))
    }

    fn issuance_guard(&self) -> Result<MutexGuard<'_, ()>, LicensingError> {
        self.issuance.lock().map_err(|_| {
            LicensingError::Repository(RepositoryError::Unavailable(
                "issuance lock poisoned".to_string(),
            ))
        })
    }

    fn next_license_number(&self) -> LicenseNumber {
        LicenseNumber::from_sequence(self.license_sequence.fetch_add(1, Ordering::Relaxed))
    }

    pub fn register_titleholder(
        &self,
        draft: TitleholderDraft,
        today: NaiveDate,
    ) -> Result<Titleholder, LicensingError> {
        let draft = validate_draft(draft, today)?;
        let key = draft.document_key();
        if self.titleholders.find_by_document(&key)?.is_some() {
            return Err(LicensingError::Conflict(format!(
                "a titleholder with document {key} already exists"
            )));
        }

        let titleholder = titleholder_from_draft(self.next_titleholder_id(), draft);
        let stored = self.titleholders.insert(titleholder)?;
        info!(id = %stored.id, document = %stored.document, "titleholder registered");
        Ok(stored)
    }

    pub fn update_titleholder(
        &self,
        key: &DocumentKey,
        draft: TitleholderDraft,
        today: NaiveDate,
    ) -> Result<Titleholder, LicensingError> {
        let existing = self.titleholder_by_document(key)?;
        let draft = validate_draft(draft, today)?;
        let new_key = draft.document_key();

        if &new_key != key {
            if let Some(other) = self.titleholders.find_by_document(&new_key)? {
                if other.id != existing.id {
                    return Err(LicensingError::Conflict(format!(
                        "another titleholder already holds document {new_key}"
                    )));
                }
            }
        }

        let updated = self
            .titleholders
            .update(titleholder_from_draft(existing.id, draft))?;
        info!(id = %updated.id, "titleholder updated");
        Ok(updated)
    }

    pub fn titleholder(&self, id: TitleholderId) -> Result<Titleholder, LicensingError> {
        self.titleholders
            .fetch(id)?
            .ok_or_else(|| LicensingError::NotFound(format!("no titleholder with id {id}")))
    }

    pub fn titleholder_by_document(&self, key: &DocumentKey) -> Result<Titleholder, LicensingError> {
        self.titleholders
            .find_by_document(key)?
            .ok_or_else(|| LicensingError::NotFound(format!("no titleholder with document {key}")))
    }

    pub fn count_titleholders(&self) -> Result<u64, LicensingError> {
        Ok(self.titleholders.count()?)
    }

    pub fn quote(
        &self,
        titleholder_id: TitleholderId,
        class: LicenseClass,
        today: NaiveDate,
    ) -> Result<Quote, LicensingError> {
        let titleholder = self.titleholder(titleholder_id)?;
        let age = titleholder.age_on(today);
        let eligibility = EligibilityCalculator::evaluate(age, class)?;
        Ok(Quote {
            titleholder_id,
            class,
            age,
            validity_years: eligibility.validity_years,
            cost: eligibility.cost,
        })
    }

    pub fn issue_license(
        &self,
        request: IssueRequest,
        today: NaiveDate,
    ) -> Result<IssuedLicense, LicensingError> {
        let issuer = bounded_text("issuer", &request.issuer, MAX_ISSUER_LEN)?;
        let titleholder = self.titleholder(request.titleholder_id)?;
        let _guard = self.issuance_guard()?;
        let held = self.licenses.for_titleholder(titleholder.id)?;

        let already_active = held.iter().any(|license| {
            license.class == request.class
                && status_within(license, &held, today) == LicenseStatus::Active
        });
        if already_active {
            return Err(LicensingError::Conflict(format!(
                "titleholder {} already holds an active class {} license; renew it instead",
                titleholder.id, request.class
            )));
        }

        let age = titleholder.age_on(today);
        let eligibility = self.evaluate(&titleholder, age, request.class)?;
        let license = self.build_license(
            titleholder,
            request.class,
            today,
            age,
            eligibility,
            issuer,
            LicenseKind::Original,
        )?;

        let stored = self.licenses.insert(license)?;
        info!(
            number = %stored.number,
            class = %stored.class,
            validity_years = stored.validity_years,
            cost = stored.cost,
            "license issued"
        );
        Ok(stored)
    }

    pub fn renew_license(
        &self,
        request: RenewalRequest,
        today: NaiveDate,
    ) -> Result<IssuedLicense, LicensingError> {
        let issuer = request
            .issuer
            .as_deref()
            .map(|issuer| bounded_text("issuer", issuer, MAX_ISSUER_LEN))
            .transpose()?;
        let previous = self.root_license(&request.license_number)?;
        let _guard = self.issuance_guard()?;
        let held = self.licenses.for_titleholder(previous.holder.id)?;
        let status = status_within(&previous, &held, today);

        if status == LicenseStatus::Superseded {
            return Err(LicensingError::InvalidState(format!(
                "license {} has already been renewed",
                previous.number
            )));
        }

        let competing = held.iter().any(|license| {
            license.number != previous.number
                && license.copy_of() != Some(&previous.number)
                && license.class == previous.class
                && status_within(license, &held, today) == LicenseStatus::Active
        });
        if competing {
            return Err(LicensingError::Conflict(format!(
                "titleholder {} already holds another active class {} license",
                previous.holder.id, previous.class
            )));
        }

        let current = self.titleholder(previous.holder.id)?;
        let titleholder = match request.reason {
            RenewalReason::Expired => {
                if !previous.is_expired_on(today) {
                    return Err(LicensingError::InvalidState(format!(
                        "license {} does not expire until {}",
                        previous.number, previous.expiration_date
                    )));
                }
                current
            }
            RenewalReason::DataChange => {
                if status != LicenseStatus::Active {
                    return Err(LicensingError::InvalidState(format!(
                        "license {} is expired; renew it with reason 'expired'",
                        previous.number
                    )));
                }
                with_data_change(current, &request)?
            }
        };

        let age = titleholder.age_on(today);
        let eligibility = self.evaluate(&titleholder, age, previous.class)?;
        let license = self.build_license(
            titleholder,
            previous.class,
            today,
            age,
            eligibility,
            issuer.unwrap_or_else(|| previous.issuer.clone()),
            LicenseKind::Renewal {
                renews: previous.number.clone(),
                reason: request.reason,
            },
        )?;

        if request.reason == RenewalReason::DataChange {
            self.titleholders.update(license.holder.clone())?;
        }
        let stored = self.licenses.insert(license)?;
        info!(
            number = %stored.number,
            renews = %previous.number,
            reason = request.reason.label(),
            "license renewed"
        );
        Ok(stored)
    }

    pub fn issue_copy(
        &self,
        request: CopyRequest,
        today: NaiveDate,
    ) -> Result<IssuedLicense, LicensingError> {
        let reason = bounded_text("reason", &request.reason, MAX_REASON_LEN)?;
        let issuer = bounded_text("issuer", &request.issuer, MAX_ISSUER_LEN)?;
        let original = self.root_license(&request.license_number)?;
        let _guard = self.issuance_guard()?;
        let held = self.licenses.for_titleholder(original.holder.id)?;

        if status_within(&original, &held, today) != LicenseStatus::Active {
            return Err(LicensingError::InvalidState(format!(
                "cannot copy license {}: it is expired or superseded",
                original.number
            )));
        }

        let previous_copies = held
            .iter()
            .filter(|license| license.copy_of() == Some(&original.number))
            .count();
        let copy_number = u32::try_from(previous_copies)
            .ok()
            .and_then(|count| count.checked_add(1))
            .ok_or_else(|| {
                LicensingError::InvalidState(format!(
                    "license {} has run out of copy numbers",
                    original.number
                ))
            })?;
        let titleholder = self.titleholder(original.holder.id)?;

        let copy = IssuedLicense {
            number: self.next_license_number(),
            age_at_issue: titleholder.age_on(today),
            holder: titleholder,
            class: original.class,
            issue_date: today,
            expiration_date: original.expiration_date,
            validity_years: original.validity_years,
            cost: self.policy.copy_fee,
            issuer,
            kind: LicenseKind::Copy {
                copy_of: original.number.clone(),
                copy_number,
                reason,
            },
        };

        let stored = self.licenses.insert(copy)?;
        info!(number = %stored.number, copy_of = %original.number, copy_number, "license copy issued");
        Ok(stored)
    }

    pub fn license(&self, number: &LicenseNumber) -> Result<IssuedLicense, LicensingError> {
        self.licenses
            .fetch(number)?
            .ok_or_else(|| LicensingError::NotFound(format!("no license numbered {number}")))
    }

    pub fn expired_licenses(&self, today: NaiveDate) -> Result<Vec<IssuedLicense>, LicensingError> {
        let mut expired: Vec<IssuedLicense> = self
            .licenses
            .all()?
            .into_iter()
            .filter(|license| license.is_expired_on(today))
            .collect();
        expired.sort_by(|a, b| {
            a.expiration_date
                .cmp(&b.expiration_date)
                .then_with(|| a.number.cmp(&b.number))
        });
        Ok(expired)
    }

    pub fn count_expired(&self, today: NaiveDate) -> Result<u64, LicensingError> {
        Ok(self
            .licenses
            .all()?
            .iter()
            .filter(|license| license.is_expired_on(today))
            .count() as u64)
    }

    pub fn count_issued(&self) -> Result<u64, LicensingError> {
        Ok(self.licenses.count()?)
    }

    pub fn licenses_for_document(
        &self,
        key: &DocumentKey,
        today: NaiveDate,
    ) -> Result<TitleholderLicenses, LicensingError> {
        let titleholder = self.titleholder_by_document(key)?;
        let held = self.licenses.for_titleholder(titleholder.id)?;
        if held.is_empty() {
            return Err(LicensingError::NotFound(format!(
                "titleholder with document {key} holds no licenses"
            )));
        }

        let licenses = held
            .iter()
            .map(|license| LicenseView {
                status: status_within(license, &held, today),
                license: license.clone(),
            })
            .collect();

        Ok(TitleholderLicenses {
            titleholder,
            licenses,
        })
    }

    pub fn search_active_holders(
        &self,
        filter: &ActiveHolderFilter,
        today: NaiveDate,
    ) -> Result<Vec<ActiveHolderRow>, LicensingError> {
        let mut rows = Vec::new();
        for titleholder in self.titleholders.list()? {
            if !filter.matches(&titleholder) {
                continue;
            }

            let held = self.licenses.for_titleholder(titleholder.id)?;
            let latest = held
                .iter()
                .filter(|license| status_within(license, &held, today) == LicenseStatus::Active)
                .max_by(|a, b| {
                    a.expiration_date
                        .cmp(&b.expiration_date)
                        .then_with(|| a.number.cmp(&b.number))
                });

            if let Some(license) = latest {
                rows.push(ActiveHolderRow {
                    license_number: license.number.clone(),
                    class: license.class,
                    expiration_date: license.expiration_date,
                    titleholder,
                });
            }
        }
        Ok(rows)
    }

    fn evaluate(
        &self,
        titleholder: &Titleholder,
        age: u32,
        class: LicenseClass,
    ) -> Result<Eligibility, LicensingError> {
        EligibilityCalculator::evaluate(age, class).map_err(|rejection| {
            warn!(
                id = %titleholder.id,
                age,
                class = %class,
                minimum = rejection.minimum,
                "license request rejected for age"
            );
            LicensingError::Ineligible(rejection)
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn build_license(
        &self,
        titleholder: Titleholder,
        class: LicenseClass,
        today: NaiveDate,
        age: u32,
        eligibility: Eligibility,
        issuer: String,
        kind: LicenseKind,
    ) -> Result<IssuedLicense, LicensingError> {
        let expiration_date = add_years(today, eligibility.validity_years).ok_or_else(|| {
            LicensingError::InvalidState(format!(
                "expiration date out of range for issue date {today}"
            ))
        })?;

        Ok(IssuedLicense {
            number: self.next_license_number(),
            holder: titleholder,
            class,
            issue_date: today,
            expiration_date,
            validity_years: eligibility.validity_years,
            cost: eligibility.cost,
            age_at_issue: age,
            issuer,
            kind,
        })
    }

    /// Copies are resolved to the license they duplicate.
    fn root_license(&self, number: &LicenseNumber) -> Result<IssuedLicense, LicensingError> {
        let license = self.license(number)?;
        match license.copy_of() {
            Some(original) => self.license(original),
            None => Ok(license),
        }
    }
}

/// Applies the name and address changes of a data-change renewal, without storing them.
fn with_data_change(
    mut titleholder: Titleholder,
    request: &RenewalRequest,
) -> Result<Titleholder, LicensingError> {
    let changes = [&request.given_names, &request.surname, &request.address];
    if changes.iter().all(|change| change.is_none()) {
        return Err(LicensingError::InvalidState(
            "a data-change renewal must update the given names, surname or address".to_string(),
        ));
    }

    if let Some(given_names) = request.given_names.as_deref() {
        titleholder.given_names = bounded_text("given_names", given_names, MAX_NAME_LEN)?;
    }
    if let Some(surname) = request.surname.as_deref() {
        titleholder.surname = bounded_text("surname", surname, MAX_NAME_LEN)?;
    }
    if let Some(address) = request.address.as_deref() {
        titleholder.address = bounded_text("address", address, MAX_ADDRESS_LEN)?;
    }
    Ok(titleholder)
}

fn titleholder_from_draft(id: TitleholderId, draft: TitleholderDraft) -> Titleholder {
    Titleholder {
        id,
        document: DocumentKey::new(draft.document_type, draft.document_number),
        given_names: draft.given_names,
        surname: draft.surname,
        birth_date: draft.birth_date,
        address: draft.address,
        blood_group: draft.blood_group,
        rh_factor: draft.rh_factor,
        organ_donor: draft.organ_donor,
    }
}

/// Status of `license` given every license held by the same titleholder.
pub fn status_within(
    license: &IssuedLicense,
    held: &[IssuedLicense],
    today: NaiveDate,
) -> LicenseStatus {
    let superseded = |number: &LicenseNumber| held.iter().any(|other| other.renews() == Some(number));

    let renewed = superseded(&license.number)
        || license.copy_of().is_some_and(|original| superseded(original));
    if renewed {
        LicenseStatus::Superseded
    } else if license.is_expired_on(today) {
        LicenseStatus::Expired
    } else {
        LicenseStatus::Active
    }
}

/// Error raised by the licensing service.
#[derive(Debug, thiserror::Error)]
pub enum LicensingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Ineligible(#[from] IneligibleAge),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidState(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
