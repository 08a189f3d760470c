//! Human-readable order numbers.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`OrderNumber`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum OrderNumberError {
    /// The input does not start with the `ORD-` prefix.
    #[error("order number must start with ORD-")]
    MissingPrefix,
    /// The suffix is not a 10-digit number.
    #[error("order number suffix must be 10 digits")]
    BadSuffix,
}

/// A human-readable order identifier, e.g. `ORD-4829105731`.
///
/// The suffix is the last six digits of the creation time in unix
/// milliseconds followed by a four-digit random component. Immutable once
/// assigned; uniqueness is enforced by the orders table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    const PREFIX: &'static str = "ORD-";
    const SUFFIX_LEN: usize = 10;

    /// Compose an order number from a creation instant and a random
    /// four-digit component (1000..=9999).
    ///
    /// Both inputs are supplied by the caller so composition stays pure.
    #[must_use]
    pub fn compose(created_at: DateTime<Utc>, random: u16) -> Self {
        let millis = created_at.timestamp_millis().unsigned_abs();
        let random = u64::from(random.clamp(1000, 9999));
        Self(format!("{}{:06}{random}", Self::PREFIX, millis % 1_000_000))
    }

    /// Parse an `OrderNumber` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix or suffix shape is wrong.
    pub fn parse(s: &str) -> Result<Self, OrderNumberError> {
        let suffix = s
            .strip_prefix(Self::PREFIX)
            .ok_or(OrderNumberError::MissingPrefix)?;

        if suffix.len() != Self::SUFFIX_LEN || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OrderNumberError::BadSuffix);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `OrderNumber` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for OrderNumber {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderNumber {
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
    use chrono::TimeZone;

    #[test]
    fn test_compose_shape() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let number = OrderNumber::compose(at, 4821);
        assert!(number.as_str().starts_with("ORD-"));
        assert_eq!(number.as_str().len(), 4 + 10);
        assert!(number.as_str()[4..].bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(
            OrderNumber::compose(at, 1234),
            OrderNumber::compose(at, 1234)
        );
    }

    #[test]
    fn test_compose_clamps_random_component() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let number = OrderNumber::compose(at, 7);
        // Clamped to the 4-digit floor, so the suffix stays 10 digits.
        assert_eq!(number.as_str().len(), 4 + 10);
    }

    #[test]
    fn test_parse_roundtrip() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let number = OrderNumber::compose(at, 4821);
        let parsed = OrderNumber::parse(number.as_str()).unwrap();
        assert_eq!(parsed, number);
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!(matches!(
            OrderNumber::parse("ORDER-1234567890"),
            Err(OrderNumberError::MissingPrefix)
        ));
        assert!(matches!(
            OrderNumber::parse("ORD-12345"),
            Err(OrderNumberError::BadSuffix)
        ));
        assert!(matches!(
            OrderNumber::parse("ORD-12345678ab"),
            Err(OrderNumberError::BadSuffix)
        ));
    }
}
