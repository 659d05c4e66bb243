//! Email address type used as the sign-in key for shoppers.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email cannot contain whitespace")]
    Whitespace,
    #[error("email must contain exactly one @ symbol")]
    AtSymbol,
    #[error("email local part must be 1-{max} characters")]
    LocalPart { max: usize },
    #[error("email domain must contain a dot between labels")]
    Domain,
}

/// A normalized email address.
///
/// Parsing trims surrounding whitespace and lowercases the whole address, so
/// two spellings of the same mailbox compare equal and collide on the unique
/// index in the store.
///
/// ```
/// use bazaar_core::Email;
///
/// let email = Email::parse("  Ana@Example.COM ").unwrap();
/// assert_eq!(email.as_str(), "ana@example.com");
///
/// assert!(Email::parse("ana@localhost").is_err());
/// assert!(Email::parse("a@b@c.com").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Maximum length of an address (RFC 5321 path limit).
    pub const MAX_LENGTH: usize = 254;
    /// Maximum length of the local part (RFC 5321).
    pub const MAX_LOCAL_LENGTH: usize = 64;

    /// Parse and normalize an address.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] describing the first rule the input breaks.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(EmailError::Empty);
        }
        if trimmed.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let (local, domain) = trimmed.split_once('@').ok_or(EmailError::AtSymbol)?;
        if domain.contains('@') {
            return Err(EmailError::AtSymbol);
        }
        if local.is_empty() || local.len() > Self::MAX_LOCAL_LENGTH {
            return Err(EmailError::LocalPart {
                max: Self::MAX_LOCAL_LENGTH,
            });
        }
        if domain.split('.').count() < 2 || domain.split('.').any(str::is_empty) {
            return Err(EmailError::Domain);
        }

        Ok(Self(trimmed.to_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Email {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Email {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Email {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_case_and_whitespace() {
        let email = Email::parse("\tBride.Groom+RSVP@Mail.Example.org  ").unwrap();
        assert_eq!(email.as_str(), "bride.groom+rsvp@mail.example.org");
    }

    #[test]
    fn test_rejects_empty_and_blank() {
        assert_eq!(Email::parse(""), Err(EmailError::Empty));
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
    }

    #[test]
    fn test_rejects_inner_whitespace() {
        assert_eq!(Email::parse("ana maria@x.com"), Err(EmailError::Whitespace));
    }

    #[test]
    fn test_at_symbol_rules() {
        assert_eq!(Email::parse("no-at.example.com"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("a@b@example.com"), Err(EmailError::AtSymbol));
    }

    #[test]
    fn test_local_part_rules() {
        assert!(matches!(
            Email::parse("@example.com"),
            Err(EmailError::LocalPart { .. })
        ));
        let long_local = format!("{}@example.com", "a".repeat(65));
        assert!(matches!(
            Email::parse(&long_local),
            Err(EmailError::LocalPart { .. })
        ));
    }

    #[test]
    fn test_domain_needs_dotted_labels() {
        assert_eq!(Email::parse("ana@localhost"), Err(EmailError::Domain));
        assert_eq!(Email::parse("ana@.com"), Err(EmailError::Domain));
        assert_eq!(Email::parse("ana@example."), Err(EmailError::Domain));
        assert_eq!(Email::parse("ana@"), Err(EmailError::Domain));
    }

    #[test]
    fn test_too_long() {
        let long = format!("a@{}.com", "b".repeat(260));
        assert!(matches!(Email::parse(&long), Err(EmailError::TooLong { .. })));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Email = serde_json::from_str("\"Ana@Example.com\"").unwrap();
        assert_eq!(ok.as_str(), "ana@example.com");
        assert!(serde_json::from_str::<Email>("\"nope\"").is_err());
    }
}
