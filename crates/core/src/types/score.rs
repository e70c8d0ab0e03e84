//! Rating score type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Score`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreError {
    /// The value is outside the 1..=5 range.
    #[error("rating must be an integer between {min} and {max}", min = Score::MIN, max = Score::MAX)]
    OutOfRange,
}

/// A single rating score: an integer from 1 to 5 inclusive.
///
/// Construction goes through [`Score::new`], so a `Score` held anywhere in
/// the system is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Score(i32);

impl Score {
    /// Lowest valid score.
    pub const MIN: i32 = 1;
    /// Highest valid score.
    pub const MAX: i32 = 5;

    /// Create a `Score` from an integer.
    ///
    /// # Errors
    ///
    /// Returns `ScoreError::OutOfRange` if `value` is not in 1..=5.
    pub const fn new(value: i32) -> Result<Self, ScoreError> {
        if value >= Self::MIN && value <= Self::MAX {
            Ok(Self(value))
        } else {
            Err(ScoreError::OutOfRange)
        }
    }

    /// Get the underlying integer value.
    #[must_use]
    pub const fn as_i32(&self) -> i32 {
        self.0
    }

    /// The score as a floating-point value, for averaging.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // scores are 1..=5
    pub fn as_f64(&self) -> f64 {
        f64::from(self.0)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i32> for Score {
    type Error = ScoreError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for i32 {
    fn from(score: Score) -> Self {
        score.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Score {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i32 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i32 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Score {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let v = <i32 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // The ratings table carries a CHECK constraint, so stored values are in range
        Ok(Self::new(v)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Score {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i32 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_range() {
        for v in 1..=5 {
            assert_eq!(Score::new(v).unwrap().as_i32(), v);
        }
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(Score::new(0), Err(ScoreError::OutOfRange));
        assert_eq!(Score::new(6), Err(ScoreError::OutOfRange));
        assert_eq!(Score::new(-3), Err(ScoreError::OutOfRange));
    }

    #[test]
    fn test_serde_rejects_out_of_range() {
        let ok: Score = serde_json::from_str("4").unwrap();
        assert_eq!(ok.as_i32(), 4);
        assert!(serde_json::from_str::<Score>("9").is_err());
    }
}
