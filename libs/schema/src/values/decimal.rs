//! Decimal value types carried on the wire
//!
//! Both types are exponent/mantissa pairs: `value = mantissa × 10^exponent`.
//! No normalization is applied, so `(2, 10)` and `(3, 1)` are different
//! values on the wire even though they compare equal numerically.
//!
//! Conversions to and from `rust_decimal::Decimal` are exact or fail.

use crate::errors::DecimalError;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-point decimal: 8-bit exponent, 64-bit mantissa
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Decimal {
    pub exponent: i8,
    pub mantissa: i64,
}

impl Decimal {
    pub const fn new(exponent: i8, mantissa: i64) -> Self {
        Self { exponent, mantissa }
    }

    /// Build from a wider exponent, failing instead of truncating
    pub fn try_new(exponent: i64, mantissa: i64) -> Result<Self, DecimalError> {
        let exponent = i8::try_from(exponent).map_err(|_| DecimalError::ExponentOutOfRange {
            exponent,
            min: i8::MIN as i64,
            max: i8::MAX as i64,
        })?;
        Ok(Self { exponent, mantissa })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}e{}", self.mantissa, self.exponent)
    }
}

impl TryFrom<rust_decimal::Decimal> for Decimal {
    type Error = DecimalError;

    fn try_from(value: rust_decimal::Decimal) -> Result<Self, Self::Error> {
        let mantissa = value.mantissa();
        let mantissa = i64::try_from(mantissa).map_err(|_| DecimalError::MantissaOverflow {
            mantissa: mantissa.to_string(),
        })?;
        // rust_decimal scale is at most 28, always within i8
        Ok(Self {
            exponent: -(value.scale() as i8),
            mantissa,
        })
    }
}

impl TryFrom<Decimal> for rust_decimal::Decimal {
    type Error = DecimalError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        let unrepresentable = || DecimalError::Unrepresentable {
            mantissa: value.mantissa,
            exponent: value.exponent,
        };

        if value.exponent <= 0 {
            let scale = u32::from(value.exponent.unsigned_abs());
            return rust_decimal::Decimal::try_from_i128_with_scale(value.mantissa as i128, scale)
                .map_err(|_| unrepresentable());
        }

        let mut result = rust_decimal::Decimal::from(value.mantissa);
        for _ in 0..value.exponent {
            result = result
                .checked_mul(rust_decimal::Decimal::TEN)
                .ok_or_else(unrepresentable)?;
        }
        Ok(result)
    }
}

/// Arbitrary-precision decimal: 32-bit exponent, unbounded mantissa
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BigDecimal {
    pub exponent: i32,
    pub mantissa: BigInt,
}

impl BigDecimal {
    pub fn new(exponent: i32, mantissa: impl Into<BigInt>) -> Self {
        Self {
            exponent,
            mantissa: mantissa.into(),
        }
    }
}

impl fmt::Display for BigDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}e{}", self.mantissa, self.exponent)
    }
}

impl From<Decimal> for BigDecimal {
    fn from(value: Decimal) -> Self {
        Self {
            exponent: i32::from(value.exponent),
            mantissa: BigInt::from(value.mantissa),
        }
    }
}

impl TryFrom<&BigDecimal> for Decimal {
    type Error = DecimalError;

    fn try_from(value: &BigDecimal) -> Result<Self, Self::Error> {
        let mantissa = i64::try_from(&value.mantissa).map_err(|_| DecimalError::MantissaOverflow {
            mantissa: value.mantissa.to_string(),
        })?;
        Decimal::try_new(i64::from(value.exponent), mantissa)
    }
}
