//! Titleholder registration, license issuance and the eligibility rules behind it.

pub mod domain;
pub mod eligibility;
pub mod memory;
pub mod receipt;
pub mod repository;
pub mod router;
pub mod seed;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    BloodGroup, DocumentKey, DocumentType, IssuedLicense, LicenseClass, LicenseKind,
    LicenseNumber, LicenseStatus, ParseEnumError, RenewalReason, RhFactor, Titleholder,
    TitleholderId,
};
pub use eligibility::{Eligibility, EligibilityCalculator, IneligibleAge};
pub use memory::{InMemoryLicenseRepository, InMemoryTitleholderRepository};
pub use receipt::LicenseReceipt;
pub use repository::{LicenseRepository, RepositoryError, TitleholderRepository};
pub use router::{licensing_router, licensing_router_with_clock, local_clock, Clock};
pub use seed::{SeedImportError, TitleholderSeed};
pub use service::{
    ActiveHolderFilter, ActiveHolderRow, CopyRequest, IssueRequest, LicenseView, LicensingError,
    LicensingPolicy, LicensingService, Quote, RenewalRequest, TitleholderLicenses,
};
pub use validation::{TitleholderDraft, ValidationError};
