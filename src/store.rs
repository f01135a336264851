use async_trait::async_trait;
use thiserror::Error;

use crate::credential::{Email, PasswordHash};
use crate::models::{AdminRecord, NewAdmin};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store unreachable: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("record store rejected the operation: {0}")]
    Persistence(#[source] sqlx::Error),
    #[error("administrator {0} does not exist")]
    NotFound(Email),
    #[error("stored administrator record is invalid: {0}")]
    CorruptRecord(String),
}

impl StoreError {
    /// Splits sqlx failures into "could not reach the store" and "the store
    /// said no".
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Configuration(_) => StoreError::Connection(err),
            other => StoreError::Persistence(other),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::from_sqlx(err)
    }
}

#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn find_by_email(&self, email: &Email) -> Result<Option<AdminRecord>, StoreError>;

    /// Returns `false` when a record with the same email already exists; the
    /// store's unique constraint decides, not a prior lookup.
    async fn insert(&self, admin: &NewAdmin) -> Result<bool, StoreError>;

    /// Writes only the credential column of an existing record.
    async fn update_password(&self, email: &Email, hash: &PasswordHash) -> Result<(), StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;
}

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;

    /// In-memory store with the same uniqueness rule as the real table.
    #[derive(Default)]
    pub struct MemoryAdminStore {
        records: Mutex<Vec<AdminRecord>>,
    }

    impl MemoryAdminStore {
        pub fn with_record(record: AdminRecord) -> Self {
            Self {
                records: Mutex::new(vec![record]),
            }
        }

        pub fn snapshot(&self) -> Vec<AdminRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AdminStore for MemoryAdminStore {
        async fn find_by_email(&self, email: &Email) -> Result<Option<AdminRecord>, StoreError> {
            let records = self.records.lock().unwrap();
            Ok(records.iter().find(|r| &r.email == email).cloned())
        }

        async fn insert(&self, admin: &NewAdmin) -> Result<bool, StoreError> {
            let mut records = self.records.lock().unwrap();
            if records.iter().any(|r| r.email == admin.email) {
                return Ok(false);
            }
            let now = Utc::now();
            records.push(AdminRecord {
                id: admin.id,
                email: admin.email.clone(),
                password_hash: admin.password_hash.clone(),
                created_at: now,
                updated_at: now,
            });
            Ok(true)
        }

        async fn update_password(
            &self,
            email: &Email,
            hash: &PasswordHash,
        ) -> Result<(), StoreError> {
            let mut records = self.records.lock().unwrap();
            let record = records
                .iter_mut()
                .find(|r| &r.email == email)
                .ok_or_else(|| StoreError::NotFound(email.clone()))?;
            record.password_hash = hash.clone();
            record.updated_at = Utc::now();
            Ok(())
        }

        async fn count(&self) -> Result<i64, StoreError> {
            Ok(self.records.lock().unwrap().len() as i64)
        }
    }
}
