use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("email cannot be empty")]
    EmptyEmail,
    #[error("email must be at most {max} characters")]
    EmailTooLong { max: usize },
    #[error("email must contain exactly one @ symbol")]
    MissingAtSymbol,
    #[error("email local part and domain must both be non-empty")]
    IncompleteEmail,
    #[error("email cannot contain whitespace")]
    WhitespaceInEmail,
    #[error("password cannot be empty")]
    EmptyPassword,
    #[error("password cannot consist only of whitespace")]
    BlankPassword,
    #[error("password must be at most {max} bytes")]
    PasswordTooLong { max: usize },
    #[error("bcrypt cost must be between {min} and {max}, got {cost}")]
    InvalidCost { cost: u32, min: u32, max: u32 },
    #[error("failed to hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("password hashing task failed: {0}")]
    HashTask(#[from] tokio::task::JoinError),
}

/// Normalized administrator email. Lookups compare normalized values, so
/// `Admin@AC.in` and `admin@ac.in` name the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    pub const MAX_LENGTH: usize = 254;

    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CredentialError::EmptyEmail);
        }
        if trimmed.len() > Self::MAX_LENGTH {
            return Err(CredentialError::EmailTooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(CredentialError::WhitespaceInEmail);
        }

        let mut parts = trimmed.split('@');
        let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
            (Some(local), Some(domain), None) => (local, domain),
            _ => return Err(CredentialError::MissingAtSymbol),
        };
        if local.is_empty() || domain.is_empty() {
            return Err(CredentialError::IncompleteEmail);
        }

        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Plaintext password held only in memory. Never printed.
pub struct Password(SecretString);

impl Password {
    /// bcrypt ignores everything past this many bytes.
    pub const MAX_BYTES: usize = 72;

    /// Taken as given: surrounding whitespace is part of the password.
    pub fn new(secret: SecretString) -> Result<Self, CredentialError> {
        let raw = secret.expose_secret();
        let len = raw.len();
        if len == 0 {
            return Err(CredentialError::EmptyPassword);
        }
        if raw.trim().is_empty() {
            return Err(CredentialError::BlankPassword);
        }
        if len > Self::MAX_BYTES {
            return Err(CredentialError::PasswordTooLong {
                max: Self::MAX_BYTES,
            });
        }
        Ok(Self(secret))
    }

    fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Owned copy for moving onto a blocking thread.
    fn to_secret(&self) -> SecretString {
        SecretString::from(self.expose().to_owned())
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

/// A stored bcrypt hash in modular crypt format (`$2b$...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns false for a mismatch and for a malformed stored hash.
    pub fn verify(&self, password: &Password) -> bool {
        verify_plain(password.expose(), &self.0)
    }

    /// [`verify`](Self::verify) on the blocking pool.
    pub async fn verify_blocking(&self, password: &Password) -> Result<bool, CredentialError> {
        let stored = self.0.clone();
        let plain = password.to_secret();
        let verified =
            tokio::task::spawn_blocking(move || verify_plain(plain.expose_secret(), &stored)).await?;
        Ok(verified)
    }
}

fn verify_plain(plain: &str, stored: &str) -> bool {
    match bcrypt::verify(plain, stored) {
        Ok(matches) => matches,
        Err(err) => {
            tracing::warn!(error = %err, "stored password hash is malformed");
            false
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub const MIN_COST: u32 = 4;
    pub const MAX_COST: u32 = 31;

    pub fn new(cost: u32) -> Result<Self, CredentialError> {
        if !(Self::MIN_COST..=Self::MAX_COST).contains(&cost) {
            return Err(CredentialError::InvalidCost {
                cost,
                min: Self::MIN_COST,
                max: Self::MAX_COST,
            });
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn hash(&self, password: &Password) -> Result<PasswordHash, CredentialError> {
        let hashed = bcrypt::hash(password.expose(), self.cost)?;
        Ok(PasswordHash(hashed))
    }

    /// bcrypt is deliberately slow; keep it off the async worker threads.
    pub async fn hash_blocking(&self, password: &Password) -> Result<PasswordHash, CredentialError> {
        let cost = self.cost;
        let plain = password.to_secret();
        let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(plain.expose_secret(), cost)).await??;
        Ok(PasswordHash(hashed))
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_password(value: &str) -> Password {
    Password::new(SecretString::from(value.to_string())).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_trimmed_and_lowercased() {
        let email = Email::parse("  Admin@AC.in ").unwrap();
        assert_eq!(email.as_str(), "admin@ac.in");
    }

    #[test]
    fn email_rejects_malformed_input() {
        assert!(matches!(Email::parse(""), Err(CredentialError::EmptyEmail)));
        assert!(matches!(
            Email::parse("no-at-symbol"),
            Err(CredentialError::MissingAtSymbol)
        ));
        assert!(matches!(
            Email::parse("a@b@c"),
            Err(CredentialError::MissingAtSymbol)
        ));
        assert!(matches!(
            Email::parse("@ac.in"),
            Err(CredentialError::IncompleteEmail)
        ));
        assert!(matches!(
            Email::parse("admin@"),
            Err(CredentialError::IncompleteEmail)
        ));
        assert!(matches!(
            Email::parse("ad min@ac.in"),
            Err(CredentialError::WhitespaceInEmail)
        ));
        let long = format!("{}@ac.in", "a".repeat(260));
        assert!(matches!(
            Email::parse(&long),
            Err(CredentialError::EmailTooLong { .. })
        ));
    }

    #[test]
    fn password_length_is_bounded() {
        assert!(matches!(
            Password::new(SecretString::from(String::new())),
            Err(CredentialError::EmptyPassword)
        ));
        assert!(matches!(
            Password::new(SecretString::from("x".repeat(73))),
            Err(CredentialError::PasswordTooLong { .. })
        ));
        assert!(Password::new(SecretString::from("x".repeat(72))).is_ok());
    }

    #[test]
    fn password_keeps_surrounding_whitespace() {
        assert!(matches!(
            Password::new(SecretString::from("   ".to_string())),
            Err(CredentialError::BlankPassword)
        ));

        let hasher = PasswordHasher::new(4).unwrap();
        let hash = hasher.hash(&test_password("  s3cret ")).unwrap();
        assert!(hash.verify(&test_password("  s3cret ")));
        assert!(!hash.verify(&test_password("s3cret")));
    }

    #[tokio::test]
    async fn blocking_hash_and_verify_agree() {
        let hasher = PasswordHasher::new(4).unwrap();
        let hash = hasher.hash_blocking(&test_password("admin")).await.unwrap();
        assert_ne!(hash.as_str(), "admin");
        assert!(hash.verify_blocking(&test_password("admin")).await.unwrap());
        assert!(!hash.verify_blocking(&test_password("wrongpass")).await.unwrap());
    }

    #[test]
    fn password_debug_is_redacted() {
        let password = test_password("admin");
        assert_eq!(format!("{password:?}"), "Password([REDACTED])");
    }

    #[test]
    fn hash_never_equals_plaintext_and_verifies() {
        let hasher = PasswordHasher::new(4).unwrap();
        let password = test_password("admin");
        let hash = hasher.hash(&password).unwrap();

        assert_ne!(hash.as_str(), "admin");
        assert!(hash.as_str().starts_with("$2"));
        assert!(hash.verify(&password));
        assert!(!hash.verify(&test_password("wrongpass")));
    }

    #[test]
    fn hashes_are_salted() {
        let hasher = PasswordHasher::new(4).unwrap();
        let password = test_password("admin");
        let first = hasher.hash(&password).unwrap();
        let second = hasher.hash(&password).unwrap();
        assert_ne!(first, second);
        assert!(first.verify(&password));
        assert!(second.verify(&password));
    }

    #[test]
    fn malformed_stored_hash_does_not_verify() {
        let hash = PasswordHash::from_stored("admin".to_string());
        assert!(!hash.verify(&test_password("admin")));
    }

    #[test]
    fn cost_outside_bcrypt_range_is_rejected() {
        assert!(PasswordHasher::new(3).is_err());
        assert!(PasswordHasher::new(32).is_err());
        assert_eq!(PasswordHasher::new(10).unwrap().cost(), 10);
        assert_eq!(PasswordHasher::default().cost(), bcrypt::DEFAULT_COST);
    }
}
