use thiserror::Error;
use uuid::Uuid;

use crate::config::{AdminConfig, StoreConfig};
use crate::credential::{CredentialError, Email, Password, PasswordHasher};
use crate::db;
use crate::models::{BootstrapOutcome, NewAdmin};
use crate::store::{AdminStore, StoreError};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("could not reach the record store: {0}")]
    Connection(#[source] StoreError),
    #[error("could not persist the administrator record: {0}")]
    Persistence(#[source] StoreError),
    #[error("could not prepare the administrator credential: {0}")]
    Credential(#[from] CredentialError),
    #[error("could not apply schema migrations: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

impl From<StoreError> for BootstrapError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Connection(_) => BootstrapError::Connection(err),
            other => BootstrapError::Persistence(other),
        }
    }
}

/// Creates the administrator or resets its password.
///
/// The lookup and the write are not one transaction; a failure between them
/// leaves the store as it was. Creation relies on the unique email
/// constraint, so a record that appears after the lookup is reset instead of
/// duplicated.
pub async fn ensure_admin<S>(
    store: &S,
    email: &Email,
    password: &Password,
    hasher: &PasswordHasher,
) -> Result<BootstrapOutcome, BootstrapError>
where
    S: AdminStore + ?Sized,
{
    let existing = store.find_by_email(email).await?;
    let hash = hasher.hash_blocking(password).await?;

    if let Some(record) = existing {
        tracing::info!(
            %email,
            id = %record.id,
            created_at = %record.created_at,
            last_changed = %record.updated_at,
            "administrator exists, updating password"
        );
        store.update_password(email, &hash).await?;
        return Ok(BootstrapOutcome::PasswordReset);
    }

    tracing::info!(%email, "creating administrator");
    let admin = NewAdmin {
        id: Uuid::new_v4(),
        email: email.clone(),
        password_hash: hash,
    };
    if store.insert(&admin).await? {
        return Ok(BootstrapOutcome::Created);
    }

    tracing::warn!(%email, "administrator was created concurrently, updating password instead");
    store.update_password(email, &admin.password_hash).await?;
    Ok(BootstrapOutcome::PasswordReset)
}

/// Checks a password against the stored hash. An absent record never
/// verifies.
pub async fn verify_admin<S>(store: &S, email: &Email, password: &Password) -> Result<bool, BootstrapError>
where
    S: AdminStore + ?Sized,
{
    match store.find_by_email(email).await? {
        Some(record) => Ok(record.password_hash.verify_blocking(password).await?),
        None => Ok(false),
    }
}

/// Full one-shot procedure against the configured store. The connection is
/// closed on every path out, including failures after it was opened.
pub async fn run(store_config: &StoreConfig, admin: &AdminConfig) -> Result<BootstrapOutcome, BootstrapError> {
    tracing::info!(
        database = %store_config.db_name,
        bcrypt_cost = admin.hasher.cost(),
        "connecting to record store"
    );
    let pool = db::connect(store_config).await.map_err(BootstrapError::Connection)?;
    tracing::info!("connected");

    let result = async {
        db::init_db(&pool).await.map_err(BootstrapError::Migration)?;
        let store = db::PgAdminStore::new(&pool);
        let outcome = ensure_admin(&store, &admin.email, &admin.password, &admin.hasher).await?;
        let admins = store.count().await?;
        tracing::info!(%outcome, admins, "administrator bootstrap complete");
        Ok::<_, BootstrapError>(outcome)
    }
    .await;

    pool.close().await;
    tracing::debug!("record store connection closed");
    result
}

/// Scoped like [`run`], for the `verify-admin` command.
pub async fn run_verify(store_config: &StoreConfig, admin: &AdminConfig) -> Result<bool, BootstrapError> {
    let pool = db::connect(store_config).await.map_err(BootstrapError::Connection)?;
    let store = db::PgAdminStore::new(&pool);
    let result = verify_admin(&store, &admin.email, &admin.password).await;
    pool.close().await;
    result
}
