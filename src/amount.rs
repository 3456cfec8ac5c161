use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Rejected wallet amount input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("amount must be a finite number")]
    NotFinite,
    #[error("amount must be greater than zero")]
    NotPositive,
    #[error("amount is too large")]
    TooLarge,
}

/// Fixed-point decimal with 4 decimal places, stored as a scaled integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Amount(i64);

impl Amount {
    const SCALE: i64 = 10_000;

    pub fn from_scaled(value: i64) -> Self {
        Amount(value)
    }

    /// Parse operator input into a strictly positive amount.
    ///
    /// Values that round to zero at 4 decimal places are rejected too, so
    /// the server never sees a zero adjustment.
    pub fn parse_positive(input: &str) -> Result<Self, AmountError> {
        let trimmed = input.trim();
        let value: f64 = trimmed
            .parse()
            .map_err(|_| AmountError::NotANumber(trimmed.to_string()))?;
        Self::positive(value)
    }

    /// Validate an already-numeric amount.
    pub fn positive(value: f64) -> Result<Self, AmountError> {
        if !value.is_finite() {
            return Err(AmountError::NotFinite);
        }
        let scaled = (value * Self::SCALE as f64).round();
        if scaled <= 0.0 {
            return Err(AmountError::NotPositive);
        }
        if scaled >= i64::MAX as f64 {
            return Err(AmountError::TooLarge);
        }
        Ok(Amount(scaled as i64))
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        let whole = abs / Self::SCALE;
        let frac = abs % Self::SCALE;
        write!(f, "{sign}{whole}.{frac:04}")
    }
}

/// Amounts go over the wire as plain JSON numbers.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}
