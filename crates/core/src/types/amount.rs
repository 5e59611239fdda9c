//! Monetary amounts using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when validating an [`Amount`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// The amount is zero or negative.
    #[error("amount must be greater than zero")]
    NotPositive,
    /// The amount has sub-cent precision.
    #[error("amount must have at most {max} decimal places")]
    TooPrecise {
        /// Maximum allowed decimal places.
        max: u32,
    },
    /// The amount exceeds the supported maximum.
    #[error("amount exceeds the maximum of {max}")]
    TooLarge {
        /// Maximum allowed amount.
        max: Decimal,
    },
    /// The input could not be parsed as a decimal.
    #[error("invalid amount: {0}")]
    Invalid(String),
}

/// A strictly positive amount in USD, with at most two decimal places.
///
/// Every ledger entry carries an `Amount`; balances are plain [`Decimal`]s
/// because they may legitimately be zero.
///
/// ## Examples
///
/// ```
/// use monance_core::Amount;
/// use rust_decimal::Decimal;
///
/// assert!(Amount::new(Decimal::new(10050, 2)).is_ok()); // 100.50
/// assert!(Amount::new(Decimal::ZERO).is_err());
/// assert!("-5".parse::<Amount>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Maximum number of decimal places (cents).
    pub const MAX_SCALE: u32 = 2;

    /// Largest accepted amount.
    pub const MAX: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

    /// Validate a decimal as an `Amount`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not positive, has more than two
    /// decimal places, or exceeds [`Amount::MAX`].
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive);
        }

        let normalized = value.normalize();
        if normalized.scale() > Self::MAX_SCALE {
            return Err(AmountError::TooPrecise {
                max: Self::MAX_SCALE,
            });
        }

        if normalized > Self::MAX {
            return Err(AmountError::TooLarge { max: Self::MAX });
        }

        Ok(Self(normalized))
    }

    /// Get the underlying decimal value.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl std::str::FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<Decimal>()
            .map_err(|e| AmountError::Invalid(e.to_string()))?;
        Self::new(value)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Amount {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Amount {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let value = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(value)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Amount {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
