//! Bearer tokens (HS256 JWT).

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use bazaar_core::UserId;

use super::AuthError;

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account the token was issued to.
    pub sub: UserId,
    /// Issued at (seconds since the epoch).
    pub iat: i64,
    /// Expiry (seconds since the epoch).
    pub exp: i64,
}

/// Issues and verifies bearer tokens signed with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let key = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
            ttl,
        }
    }

    /// Sign a token for `user` valid for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn issue(&self, user: UserId) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AuthError::Token)
    }

    /// Check signature and expiry and return the token's subject.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenExpired` for an expired token and
    /// `AuthError::InvalidToken` for anything else that fails verification.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims.sub)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn service(secret: &str, ttl: Duration) -> TokenService {
        TokenService::new(&SecretString::from(secret.to_owned()), ttl)
    }

    #[test]
    fn test_issue_then_verify() {
        let tokens = service("k7#Qv9!mZ2@xW4$pL8^rT1&yB6*nD3fG", Duration::hours(1));
        let user = UserId::new_v4();
        let token = tokens.issue(user).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), user);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let a = service("k7#Qv9!mZ2@xW4$pL8^rT1&yB6*nD3fG", Duration::hours(1));
        let b = service("Z9!pQ2#wE5$rT8^yU1&iO4*pA7(sD0)f", Duration::hours(1));
        let token = a.issue(UserId::new_v4()).unwrap();
        assert!(matches!(b.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = service("k7#Qv9!mZ2@xW4$pL8^rT1&yB6*nD3fG", Duration::seconds(-10));
        let token = tokens.issue(UserId::new_v4()).unwrap();
        assert!(matches!(tokens.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_garbage_rejected() {
        let tokens = service("k7#Qv9!mZ2@xW4$pL8^rT1&yB6*nD3fG", Duration::hours(1));
        assert!(matches!(
            tokens.verify("not.a.token"),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(tokens.verify(""), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let tokens = service("k7#Qv9!mZ2@xW4$pL8^rT1&yB6*nD3fG", Duration::hours(1));
        let debug = format!("{tokens:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("k7#Qv9"));
    }
}
