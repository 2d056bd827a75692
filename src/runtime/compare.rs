//! Equality family: `=`, `'=` and the SQL-null aware forms.

use crate::error::Result;
use crate::runtime::stringpool::StringPool;
use crate::runtime::value::{Mval, Number};

/// `u = v`
///
/// Exact numbers compare numerically; everything else compares as strings.
/// If either side is SQL null the other side must still be defined, and the result is false.
pub fn equals(u: &mut Mval, v: &mut Mval, pool: &mut StringPool) -> Result<bool> {
    if let Some(other) = sqlnull_partner(u, v) {
        other.force_defined()?;
        return Ok(false);
    }
    is_equ(u, v, pool)
}

/// `u '= v`, the exact negation of [`equals`]
pub fn not_equals(u: &mut Mval, v: &mut Mval, pool: &mut StringPool) -> Result<bool> {
    Ok(!equals(u, v, pool)?)
}

/// `u '= v` under three-valued SQL logic: any comparison against null is false
pub fn sql_not_equals(u: &mut Mval, v: &mut Mval, pool: &mut StringPool) -> Result<bool> {
    if let Some(other) = sqlnull_partner(u, v) {
        other.force_defined()?;
        return Ok(false);
    }
    Ok(!is_equ(u, v, pool)?)
}

fn sqlnull_partner<'a>(u: &'a Mval, v: &'a Mval) -> Option<&'a Mval> {
    if u.is_sqlnull() {
        Some(v)
    } else if v.is_sqlnull() {
        Some(u)
    } else {
        None
    }
}

/// Plain equality, no null handling
pub(crate) fn is_equ(u: &mut Mval, v: &mut Mval, pool: &mut StringPool) -> Result<bool> {
    if let (Some(a), Some(b)) = (u.exact_number(), v.exact_number()) {
        return Ok(numbers_equal(&a, &b));
    }
    let a = u.force_str(pool)?;
    let b = v.force_str(pool)?;
    if a.len() != b.len() {
        return Ok(false);
    }
    if a.is_empty() || a.same_range(&b) {
        return Ok(true);
    }
    Ok(pool.bytes(&a)? == pool.bytes(&b)?)
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x == y,
        (Number::Decimal(x), Number::Decimal(y)) => {
            x.negative == y.negative && x.hi == y.hi && x.lo == y.lo && x.exp == y.exp
        }
        // canonical forms never mix
        _ => false,
    }
}
