//! In-memory repositories standing in for the office's mock data stores.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{DocumentKey, IssuedLicense, LicenseNumber, Titleholder, TitleholderId};
use super::repository::{LicenseRepository, RepositoryError, TitleholderRepository};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
}

#[derive(Default, Clone)]
pub struct InMemoryTitleholderRepository {
    records: Arc<Mutex<BTreeMap<TitleholderId, Titleholder>>>,
}

impl TitleholderRepository for InMemoryTitleholderRepository {
    fn insert(&self, titleholder: Titleholder) -> Result<Titleholder, RepositoryError> {
        let mut guard = lock(&self.records)?;
        let taken = guard.contains_key(&titleholder.id)
            || guard
                .values()
                .any(|existing| existing.document == titleholder.document);
        if taken {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(titleholder.id, titleholder.clone());
        Ok(titleholder)
    }

    fn update(&self, titleholder: Titleholder) -> Result<Titleholder, RepositoryError> {
        let mut guard = lock(&self.records)?;
        if !guard.contains_key(&titleholder.id) {
            return Err(RepositoryError::NotFound);
        }
        if guard
            .values()
            .any(|other| other.id != titleholder.id && other.document == titleholder.document)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(titleholder.id, titleholder.clone());
        Ok(titleholder)
    }

    fn fetch(&self, id: TitleholderId) -> Result<Option<Titleholder>, RepositoryError> {
        Ok(lock(&self.records)?.get(&id).cloned())
    }

    fn find_by_document(&self, key: &DocumentKey) -> Result<Option<Titleholder>, RepositoryError> {
        Ok(lock(&self.records)?
            .values()
            .find(|titleholder| &titleholder.document == key)
            .cloned())
    }

    fn list(&self) -> Result<Vec<Titleholder>, RepositoryError> {
        Ok(lock(&self.records)?.values().cloned().collect())
    }

    fn count(&self) -> Result<u64, RepositoryError> {
        Ok(lock(&self.records)?.len() as u64)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryLicenseRepository {
    records: Arc<Mutex<BTreeMap<LicenseNumber, IssuedLicense>>>,
}

impl LicenseRepository for InMemoryLicenseRepository {
    fn insert(&self, license: IssuedLicense) -> Result<IssuedLicense, RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.contains_key(&license.number) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(license.number.clone(), license.clone());
        Ok(license)
    }

    fn fetch(&self, number: &LicenseNumber) -> Result<Option<IssuedLicense>, RepositoryError> {
        Ok(lock(&self.records)?.get(number).cloned())
    }

    fn for_titleholder(&self, id: TitleholderId) -> Result<Vec<IssuedLicense>, RepositoryError> {
        Ok(lock(&self.records)?
            .values()
            .filter(|license| license.holder.id == id)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<IssuedLicense>, RepositoryError> {
        Ok(lock(&self.records)?.values().cloned().collect())
    }

    fn count(&self) -> Result<u64, RepositoryError> {
        Ok(lock(&self.records)?.len() as u64)
    }
}
