//! External identity identifier.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`IdentityId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityIdError {
    /// The input string is empty.
    #[error("identity id cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("identity id must be at most {max} bytes")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input has leading or trailing whitespace.
    #[error("identity id cannot have surrounding whitespace")]
    Whitespace,
}

/// Stable identifier issued by the identity provider (the OIDC `sub` claim).
///
/// Assigned at first login and never changed. Exactly one user record exists
/// per identity id.
///
/// ## Examples
///
/// ```
/// use monance_core::IdentityId;
///
/// assert!(IdentityId::parse("user_2abcDEF").is_ok());
/// assert!(IdentityId::parse("").is_err());
/// assert!(IdentityId::parse(" user_2abcDEF").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityId(String);

impl IdentityId {
    /// Maximum length of an identity id in bytes.
    pub const MAX_LENGTH: usize = 255;

    /// Parse an `IdentityId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than 255 bytes, or has
    /// surrounding whitespace.
    pub fn parse(s: &str) -> Result<Self, IdentityIdError> {
        if s.is_empty() {
            return Err(IdentityIdError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(IdentityIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if s.trim() != s {
            return Err(IdentityIdError::Whitespace);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the identity id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for IdentityId {
    type Err = IdentityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for IdentityId {
    type Error = IdentityIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<IdentityId> for String {
    fn from(id: IdentityId) -> Self {
        id.0
    }
}

impl AsRef<str> for IdentityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for IdentityId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for IdentityId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for IdentityId {
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
    fn test_parse_valid() {
        assert!(IdentityId::parse("user_2abcDEF").is_ok());
        assert!(IdentityId::parse("auth0|5f7c8ec7c33c6c004bbafe82").is_ok());
        assert!(IdentityId::parse("a").is_ok());
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(IdentityId::parse(""), Err(IdentityIdError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "a".repeat(256);
        assert!(matches!(
            IdentityId::parse(&long),
            Err(IdentityIdError::TooLong { max: 255 })
        ));
    }

    #[test]
    fn test_parse_whitespace() {
        assert_eq!(
            IdentityId::parse("user_1 "),
            Err(IdentityIdError::Whitespace)
        );
    }

    #[test]
    fn test_serde_rejects_invalid() {
        let parsed: Result<IdentityId, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());

        let id: IdentityId = serde_json::from_str("\"user_1\"").unwrap();
        assert_eq!(id.as_str(), "user_1");
    }
}
