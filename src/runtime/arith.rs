//! Integer division (`\`) over scaled decimals.

use crate::error::{Error, Result};
use crate::runtime::stringpool::StringPool;
use crate::runtime::value::{Decimal, Mval, Number, EXP_BIAS, EXP_HI, MANT_DIGITS, OVERFLOW_COLUMN_HINT, TEN_PWR};

/// `u \ v`: the quotient truncated toward zero
pub fn integer_divide(u: &mut Mval, v: &mut Mval, pool: &StringPool) -> Result<Mval> {
    let dividend = u.force_num(pool)?;
    let divisor = v.force_num(pool)?;
    Ok(Mval::number(idiv(dividend, divisor)?))
}

/// Integer division on canonical numbers
pub fn idiv(u: Number, v: Number) -> Result<Number> {
    let (u, v) = (u.normalized(), v.normalized());
    if v.is_zero() {
        return Err(Error::DivideByZero);
    }
    if u.is_zero() {
        return Ok(Number::ZERO);
    }
    if let (Number::Int(a), Number::Int(b)) = (u, v) {
        if let Some(q) = int_div(a, b) {
            return Ok(Number::from_int(q));
        }
    }
    decimal_idiv(u.to_decimal(), v.to_decimal())
}

/// Integer fast path; `None` asks for promotion to decimal
fn int_div(a: i64, b: i64) -> Option<i64> {
    a.checked_div(b)
}

fn decimal_idiv(u: Decimal, v: Decimal) -> Result<Number> {
    let mut exp = u.exp - v.exp + EXP_BIAS;
    if exp < EXP_BIAS {
        return Ok(Number::ZERO);
    }
    let (quotient, carry) = mantissa_div(u.mantissa(), v.mantissa());
    exp += carry;
    if exp <= EXP_BIAS {
        return Ok(Number::ZERO);
    }

    let mut q = Decimal::from_mantissa(u.negative != v.negative, quotient, exp);
    let int_digits = (exp - EXP_BIAS) as usize;
    if int_digits < 9 {
        let z = TEN_PWR[9 - int_digits] as u32;
        q.hi = q.hi / z * z;
        q.lo = 0;
    } else if int_digits < MANT_DIGITS {
        let z = TEN_PWR[MANT_DIGITS - int_digits] as u32;
        q.lo = q.lo / z * z;
    } else if exp >= EXP_HI {
        return Err(Error::NumericOverflow {
            column_hint: OVERFLOW_COLUMN_HINT,
        });
    }
    tracing::trace!(int_digits, "decimal integer division");
    Number::demote(q)
}

/// Normalized 18-digit quotient of two normalized mantissas, plus the exponent carry
fn mantissa_div(u: u64, v: u64) -> (u64, i32) {
    let q = (u as u128 * TEN_PWR[MANT_DIGITS] as u128) / v as u128;
    if q >= TEN_PWR[MANT_DIGITS] as u128 {
        ((q / 10) as u64, 1)
    } else {
        (q as u64, 0)
    }
}
