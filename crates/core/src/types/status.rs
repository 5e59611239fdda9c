//! Status enums for users and ledger entries.

use serde::{Deserialize, Serialize};

/// Errors that can occur when decoding a stored status value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind} value: {value}")]
pub struct InvalidStatus {
    /// Which status type failed to decode.
    pub kind: &'static str,
    /// The offending value.
    pub value: String,
}

/// KYC verification state of a user.
///
/// Stored as a small integer (`0`, `1`, `2`). Only moves forward:
/// `Unverified -> Pending -> Verified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationState {
    #[default]
    Unverified,
    Pending,
    Verified,
}

impl VerificationState {
    /// Numeric code used in storage.
    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::Unverified => 0,
            Self::Pending => 1,
            Self::Verified => 2,
        }
    }

    /// Decode a stored numeric code.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatus` for codes other than 0, 1 or 2.
    pub fn from_code(code: i16) -> Result<Self, InvalidStatus> {
        match code {
            0 => Ok(Self::Unverified),
            1 => Ok(Self::Pending),
            2 => Ok(Self::Verified),
            other => Err(InvalidStatus {
                kind: "verification state",
                value: other.to_string(),
            }),
        }
    }

    /// Whether moving from `self` to `next` is a legal forward step.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Unverified, Self::Pending) | (Self::Pending, Self::Verified)
        )
    }

    /// Whether withdrawals are allowed in this state.
    #[must_use]
    pub const fn allows_withdrawal(self) -> bool {
        matches!(self, Self::Verified)
    }
}

impl std::fmt::Display for VerificationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unverified => write!(f, "unverified"),
            Self::Pending => write!(f, "pending"),
            Self::Verified => write!(f, "verified"),
        }
    }
}

impl std::str::FromStr for VerificationState {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unverified" => Ok(Self::Unverified),
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            _ => Err(InvalidStatus {
                kind: "verification state",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for VerificationState {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i16 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for VerificationState {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let code = <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::from_code(code)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for VerificationState {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.code(), buf)
    }
}

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Money in (deposit).
    Credit,
    /// Money out (withdrawal).
    Debit,
}

impl EntryKind {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_codes_roundtrip() {
        for state in [
            VerificationState::Unverified,
            VerificationState::Pending,
            VerificationState::Verified,
        ] {
            assert_eq!(VerificationState::from_code(state.code()).unwrap(), state);
        }
        assert!(VerificationState::from_code(3).is_err());
    }

    #[test]
    fn test_verification_only_moves_forward() {
        use VerificationState::{Pending, Unverified, Verified};

        assert!(Unverified.can_advance_to(Pending));
        assert!(Pending.can_advance_to(Verified));

        assert!(!Unverified.can_advance_to(Verified));
        assert!(!Pending.can_advance_to(Unverified));
        assert!(!Verified.can_advance_to(Unverified));
        assert!(!Verified.can_advance_to(Pending));
        assert!(!Verified.can_advance_to(Verified));
    }

    #[test]
    fn test_only_verified_may_withdraw() {
        assert!(!VerificationState::Unverified.allows_withdrawal());
        assert!(!VerificationState::Pending.allows_withdrawal());
        assert!(VerificationState::Verified.allows_withdrawal());
    }
}
