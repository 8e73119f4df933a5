//! Decimal arithmetic helpers.
//!
//! Script numbers are arbitrary-precision decimals throughout; there is
//! no float path. A decimal is a coefficient times a power of ten, which
//! makes integer exponentiation exact: raise the coefficient and scale
//! the exponent.

use bigdecimal::BigDecimal;
use num_traits::{One, Pow, Signed, ToPrimitive, Zero};

/// Exponents with magnitude above this are rejected before any work is
/// done. A single oversized `**` could otherwise allocate an enormous
/// coefficient before the operation budget gets a chance to trip.
const MAX_POW_EXPONENT: i64 = 100_000;

/// Why a `**` could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PowError {
    /// The exponent has a fractional part; the result would not be a
    /// decimal.
    FractionalExponent,
    /// The exponent's magnitude exceeds [`MAX_POW_EXPONENT`].
    ExponentTooLarge,
    /// Zero raised to a negative exponent.
    ZeroToNegativePower,
}

impl PowError {
    pub fn message(self) -> &'static str {
        match self {
            Self::FractionalExponent => "exponent must be a whole number",
            Self::ExponentTooLarge => "exponent is too large",
            Self::ZeroToNegativePower => "zero cannot be raised to a negative power",
        }
    }
}

/// Raises `base` to an integral `exponent`, exactly.
pub(crate) fn pow(base: &BigDecimal, exponent: &BigDecimal) -> Result<BigDecimal, PowError> {
    if !exponent.is_integer() {
        return Err(PowError::FractionalExponent);
    }
    let Some(exp) = exponent.to_i64() else {
        return Err(PowError::ExponentTooLarge);
    };
    if exp.abs() > MAX_POW_EXPONENT {
        return Err(PowError::ExponentTooLarge);
    }
    if exp == 0 {
        return Ok(BigDecimal::one());
    }
    if exp < 0 {
        if base.is_zero() {
            return Err(PowError::ZeroToNegativePower);
        }
        // 1 / base**|exp|, at the default division precision
        return Ok(BigDecimal::one() / pow_positive(base, exp.unsigned_abs()));
    }
    Ok(pow_positive(base, exp.unsigned_abs()))
}

fn pow_positive(base: &BigDecimal, exp: u64) -> BigDecimal {
    let (coefficient, scale) = base.as_bigint_and_exponent();
    // scale * exp stays well inside i64: the scale of any parsed literal
    // or arithmetic result is tiny next to i64::MAX / MAX_POW_EXPONENT
    let exp_u32 = u32::try_from(exp).unwrap_or(u32::MAX);
    BigDecimal::new(Pow::pow(&coefficient, exp_u32), scale * exp as i64)
}

/// Extracts a non-negative list index from a decimal, if it is one.
pub(crate) fn to_index(value: &BigDecimal) -> Option<usize> {
    if !value.is_integer() || value.is_negative() {
        return None;
    }
    value.to_usize()
}
