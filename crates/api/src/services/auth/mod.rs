//! Authentication service.
//!
//! Password accounts hashed with Argon2id, and bearer tokens for the
//! protected `/api/user/*` routes.

mod error;
mod token;

pub use error::AuthError;
pub use token::{Claims, TokenService};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use bazaar_core::{Email, UserId};

use crate::db::{RepositoryError, Store};
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum display name length, in characters.
pub const MAX_NAME_LENGTH: usize = 100;

/// Authentication service.
///
/// Handles signup, signin and password changes against the account store.
pub struct AuthService<'a> {
    store: &'a dyn Store,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Register a new user with name, email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidName` if the name is blank or too long.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let name = validate_name(name)?;
        let email = Email::parse(email)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        let user = self
            .store
            .create_user(name, &email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong,
    /// including when the email is not even well-formed.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .store
            .get_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Check `current` against the stored hash and return a hash of `new`.
    ///
    /// The caller persists the returned hash.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if `current` is wrong or the
    /// account is gone, and `AuthError::WeakPassword` if `new` is too short.
    pub async fn rehash_password(
        &self,
        user: UserId,
        current: &str,
        new: &str,
    ) -> Result<String, AuthError> {
        let stored = self
            .store
            .get_password_hash(user)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(current, &stored)?;
        validate_password(new)?;
        hash_password(new)
    }
}

/// Trim a display name and check its length.
///
/// # Errors
///
/// Returns `AuthError::InvalidName` if the trimmed name is empty or longer
/// than [`MAX_NAME_LENGTH`] characters.
pub fn validate_name(name: &str) -> Result<&str, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::InvalidName("name cannot be empty".to_owned()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AuthError::InvalidName(format!(
            "name cannot exceed {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Meera ").unwrap(), "Meera");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            validate_password("1234567"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("12345678").is_ok());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        let user = auth
            .register("Meera", "Meera@Example.com", "s3cret-pass")
            .await
            .unwrap();
        assert_eq!(user.email.as_str(), "meera@example.com");

        let logged_in = auth.login("meera@example.com", "s3cret-pass").await.unwrap();
        assert_eq!(logged_in.id, user.id);
        assert!(matches!(
            auth.login("meera@example.com", "nope-nope").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("no-at-sign", "s3cret-pass").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register("A", "a@example.com", "password1").await.unwrap();
        assert!(matches!(
            auth.register("B", "a@example.com", "password2").await,
            Err(AuthError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_rehash_requires_current_password() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        let user = auth
            .register("A", "a@example.com", "password1")
            .await
            .unwrap();
        assert!(matches!(
            auth.rehash_password(user.id, "wrong-one", "password2").await,
            Err(AuthError::InvalidCredentials)
        ));
        let hash = auth
            .rehash_password(user.id, "password1", "password2")
            .await
            .unwrap();
        assert!(verify_password("password2", &hash).is_ok());
    }
}
