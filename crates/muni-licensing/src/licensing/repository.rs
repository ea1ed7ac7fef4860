use super::domain::{DocumentKey, IssuedLicense, LicenseNumber, Titleholder, TitleholderId};

/// Storage abstraction for registered titleholders.
pub trait TitleholderRepository: Send + Sync {
    /// Store a new titleholder. Fails with `Conflict` when the document key is taken.
    fn insert(&self, titleholder: Titleholder) -> Result<Titleholder, RepositoryError>;
    fn update(&self, titleholder: Titleholder) -> Result<Titleholder, RepositoryError>;
    fn fetch(&self, id: TitleholderId) -> Result<Option<Titleholder>, RepositoryError>;
    fn find_by_document(&self, key: &DocumentKey) -> Result<Option<Titleholder>, RepositoryError>;
    fn list(&self) -> Result<Vec<Titleholder>, RepositoryError>;
    fn count(&self) -> Result<u64, RepositoryError>;
}

/// Storage abstraction for issued licenses. Records are append-only.
pub trait LicenseRepository: Send + Sync {
    fn insert(&self, license: IssuedLicense) -> Result<IssuedLicense, RepositoryError>;
    fn fetch(&self, number: &LicenseNumber) -> Result<Option<IssuedLicense>, RepositoryError>;
    fn for_titleholder(&self, id: TitleholderId) -> Result<Vec<IssuedLicense>, RepositoryError>;
    fn all(&self) -> Result<Vec<IssuedLicense>, RepositoryError>;
    fn count(&self) -> Result<u64, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
