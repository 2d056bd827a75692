use std::fmt;

use crate::error::{Error, Result};
use crate::runtime::stringpool::{MStr, StringPool};

/// Each mantissa cell holds nine decimal digits: `0 <= cell < MANT_HI`
pub const MANT_HI: u32 = 1_000_000_000;

/// Significant digits carried by a decimal mantissa
pub const MANT_DIGITS: usize = 18;

/// Exponent bias: a decimal with `exp == EXP_BIAS` has magnitude in `[0.1, 1)`
pub const EXP_BIAS: i32 = 64;

/// Smallest representable exponent (1E-43); anything smaller reads as zero
pub const EXP_LO: i32 = EXP_BIAS - 42;

/// First exponent that no longer fits (|x| must stay below 1E47)
pub const EXP_HI: i32 = EXP_BIAS + 48;

/// Column hint attached to a numeric overflow raised mid-line
pub const OVERFLOW_COLUMN_HINT: i32 = 2;

/// Powers of ten up to 10^18
pub(crate) const TEN_PWR: [u64; 19] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
    100_000_000_000,
    1_000_000_000_000,
    10_000_000_000_000,
    100_000_000_000_000,
    1_000_000_000_000_000,
    10_000_000_000_000_000,
    100_000_000_000_000_000,
    1_000_000_000_000_000_000,
];

const INT_LIMIT: u64 = TEN_PWR[MANT_DIGITS];

/// Scaled decimal: `±0.d₁d₂…d₁₈ × 10^(exp − EXP_BIAS)`
///
/// The mantissa is split in two nine-digit cells. A normalized mantissa has
/// `hi >= MANT_HI / 10`, i.e. no leading zero digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    /// Sign
    pub negative: bool,
    /// Leading nine digits
    pub hi: u32,
    /// Trailing nine digits
    pub lo: u32,
    /// Biased exponent
    pub exp: i32,
}

impl Decimal {
    /// 18-digit mantissa as one integer
    pub fn mantissa(&self) -> u64 {
        self.hi as u64 * MANT_HI as u64 + self.lo as u64
    }

    pub(crate) fn from_mantissa(negative: bool, mantissa: u64, exp: i32) -> Self {
        Self {
            negative,
            hi: (mantissa / MANT_HI as u64) as u32,
            lo: (mantissa % MANT_HI as u64) as u32,
            exp,
        }
    }

    /// Widen an integer into (possibly non-canonical) decimal form
    pub fn promote(value: i64) -> Self {
        if value == 0 {
            return Self::from_mantissa(false, 0, EXP_BIAS);
        }
        let mut m = value.unsigned_abs();
        let mut dropped = 0;
        while m >= INT_LIMIT {
            m /= 10;
            dropped += 1;
        }
        let digits = digit_count(m);
        tracing::trace!(value, "promoted integer to decimal");
        Self::from_mantissa(
            value < 0,
            m * TEN_PWR[MANT_DIGITS - digits],
            digits as i32 + dropped + EXP_BIAS,
        )
    }

    /// True when the mantissa is zero
    pub fn is_zero(&self) -> bool {
        self.hi == 0 && self.lo == 0
    }
}

/// Numeric value in canonical form
///
/// Canonicalization is eager: every integral value with at most 18 digits is an `Int`, so a
/// `Decimal` is never numerically equal to an `Int`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Number {
    /// Scaled-integer fast path
    Int(i64),
    /// Everything else
    Decimal(Decimal),
}

impl Number {
    /// Zero
    pub const ZERO: Number = Number::Int(0);

    /// Canonical form of an integer
    ///
    /// Magnitudes past 18 digits become a decimal holding the leading 18 significant digits.
    pub fn from_int(value: i64) -> Number {
        if value.unsigned_abs() < INT_LIMIT {
            Number::Int(value)
        } else {
            Number::Decimal(Decimal::promote(value))
        }
    }

    /// Re-establish canonical form for a number that may have been built as a bare `Int`
    pub fn normalized(self) -> Number {
        match self {
            Number::Int(value) => Number::from_int(value),
            decimal => decimal,
        }
    }

    /// Build the canonical number `±m × 10^scale`, truncating to 18 significant digits
    pub fn from_scaled(negative: bool, m: u128, scale: i32) -> Result<Number> {
        if m == 0 {
            return Ok(Number::ZERO);
        }
        let (mut m, mut scale) = (m, scale);
        while m >= INT_LIMIT as u128 {
            m /= 10;
            scale += 1;
        }
        while m % 10 == 0 {
            m /= 10;
            scale += 1;
        }
        let m = m as u64;
        let digits = digit_count(m) as i32;
        if scale >= 0 && digits + scale <= MANT_DIGITS as i32 {
            let value = (m * TEN_PWR[scale as usize]) as i64;
            return Ok(Number::Int(if negative { -value } else { value }));
        }
        let exp = digits + scale + EXP_BIAS;
        if exp >= EXP_HI {
            return Err(Error::NumericOverflow {
                column_hint: OVERFLOW_COLUMN_HINT,
            });
        }
        if exp < EXP_LO {
            return Ok(Number::ZERO);
        }
        Ok(Number::Decimal(Decimal::from_mantissa(
            negative,
            m * TEN_PWR[MANT_DIGITS - digits as usize],
            exp,
        )))
    }

    /// Canonicalize a decimal produced by arithmetic (demotion to `Int` when integral)
    pub fn demote(d: Decimal) -> Result<Number> {
        Number::from_scaled(
            d.negative,
            d.mantissa() as u128,
            d.exp - EXP_BIAS - MANT_DIGITS as i32,
        )
    }

    /// Numeric interpretation of the leading numeric prefix of `bytes`
    ///
    /// Accepts any run of leading signs, digits with an optional fraction, and an `E` exponent.
    /// Anything after the numeric prefix is ignored; no prefix at all reads as zero.
    pub fn parse(bytes: &[u8]) -> Result<Number> {
        let mut i = 0;
        let mut negative = false;
        while i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            if bytes[i] == b'-' {
                negative = !negative;
            }
            i += 1;
        }

        let mut m: u128 = 0;
        let mut significant = 0;
        let mut scale: i64 = 0;
        let mut any_digit = false;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            let d = (bytes[i] - b'0') as u128;
            any_digit = true;
            if m == 0 && d == 0 {
                // leading zero
            } else if significant < 19 {
                m = m * 10 + d;
                significant += 1;
            } else {
                scale += 1;
            }
            i += 1;
        }
        if i < bytes.len() && bytes[i] == b'.' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                let d = (bytes[i] - b'0') as u128;
                any_digit = true;
                if m == 0 && d == 0 {
                    scale -= 1;
                } else if significant < 19 {
                    m = m * 10 + d;
                    significant += 1;
                    scale -= 1;
                }
                i += 1;
            }
        }
        if any_digit && i + 1 < bytes.len() && bytes[i] == b'E' {
            let mut j = i + 1;
            let mut exp_negative = false;
            if bytes[j] == b'+' || bytes[j] == b'-' {
                exp_negative = bytes[j] == b'-';
                j += 1;
            }
            if j < bytes.len() && bytes[j].is_ascii_digit() {
                let mut exp: i64 = 0;
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    exp = (exp * 10 + (bytes[j] - b'0') as i64).min(100_000);
                    j += 1;
                }
                scale += if exp_negative { -exp } else { exp };
            }
        }
        Number::from_scaled(negative, m, scale.clamp(-200_000, 200_000) as i32)
    }

    /// Canonical string form
    pub fn canonical(&self) -> String {
        match self {
            Number::Int(i) => i.to_string(),
            Number::Decimal(d) => {
                let padded = format!("{:018}", d.mantissa());
                let digits = padded.trim_end_matches('0');
                let point = d.exp - EXP_BIAS;
                let mut out = String::with_capacity(digits.len() + 8);
                if d.negative {
                    out.push('-');
                }
                if point <= 0 {
                    out.push('.');
                    out.extend(std::iter::repeat('0').take((-point) as usize));
                    out.push_str(digits);
                } else if point as usize >= digits.len() {
                    out.push_str(digits);
                    out.extend(std::iter::repeat('0').take(point as usize - digits.len()));
                } else {
                    out.push_str(&digits[..point as usize]);
                    out.push('.');
                    out.push_str(&digits[point as usize..]);
                }
                out
            }
        }
    }

    /// Arithmetic negation
    pub fn negated(self) -> Number {
        match self.normalized() {
            Number::Int(value) => Number::Int(-value),
            Number::Decimal(d) => Number::Decimal(Decimal {
                negative: !d.negative,
                ..d
            }),
        }
    }

    /// True for zero
    pub fn is_zero(&self) -> bool {
        matches!(self, Number::Int(0))
    }

    /// Integer value, if this is the integer form
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Number::Int(i) => Some(*i),
            Number::Decimal(_) => None,
        }
    }

    /// Decimal view, promoting integers
    pub fn to_decimal(&self) -> Decimal {
        match self {
            Number::Int(i) => Decimal::promote(*i),
            Number::Decimal(d) => *d,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Cached numeric interpretation of a string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumCache {
    /// The number
    pub num: Number,
    /// The string is exactly the canonical form of `num`
    pub exact: bool,
}

/// A runtime value
///
/// A value is copied freely; string bytes live in the [`StringPool`] and are shared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mval {
    /// Never assigned
    Undefined,
    /// SQL null marker
    SqlNull,
    /// Numeric value, with the string form once it has been rendered
    Number {
        /// The number
        num: Number,
        /// Cached canonical text
        text: Option<MStr>,
    },
    /// String value, with the numeric form once it has been computed
    Str {
        /// The bytes
        text: MStr,
        /// Cached numeric interpretation
        num: Option<NumCache>,
    },
}

impl Mval {
    /// Integer value
    pub fn int(value: i64) -> Mval {
        Mval::number(Number::from_int(value))
    }

    /// Numeric value, in canonical form
    pub fn number(num: Number) -> Mval {
        Mval::Number {
            num: num.normalized(),
            text: None,
        }
    }

    /// String value over an existing handle
    pub fn string(text: MStr) -> Mval {
        Mval::Str { text, num: None }
    }

    /// Copy `bytes` into the pool and wrap them
    pub fn from_bytes(pool: &mut StringPool, bytes: &[u8]) -> Result<Mval> {
        Ok(Mval::string(pool.alloc(bytes)?))
    }

    /// String literal in static storage
    pub fn literal(pool: &mut StringPool, bytes: &[u8]) -> Result<Mval> {
        Ok(Mval::string(pool.literal(bytes)?))
    }

    /// Numeric literal as written in source
    pub fn numeric_literal(text: &str) -> Result<Mval> {
        Ok(Mval::number(Number::parse(text.as_bytes())?))
    }

    /// False for `Undefined`
    pub fn is_defined(&self) -> bool {
        !matches!(self, Mval::Undefined)
    }

    /// True for the SQL null marker
    pub fn is_sqlnull(&self) -> bool {
        matches!(self, Mval::SqlNull)
    }

    /// The number this value *exactly* is, without coercion
    ///
    /// Strings qualify only when their cached interpretation is exact (canonical text).
    pub fn exact_number(&self) -> Option<Number> {
        match self {
            Mval::Number { num, .. } => Some(num.normalized()),
            Mval::Str {
                num: Some(NumCache { num, exact: true }),
                ..
            } => Some(num.normalized()),
            _ => None,
        }
    }

    /// Pool-resident string descriptor, if any
    pub fn pool_str(&self) -> Option<MStr> {
        match self {
            Mval::Number { text: Some(t), .. } | Mval::Str { text: t, .. } if t.is_pool() => Some(*t),
            _ => None,
        }
    }

    pub(crate) fn pool_str_mut(&mut self) -> Option<&mut MStr> {
        match self {
            Mval::Number { text: Some(t), .. } | Mval::Str { text: t, .. } if t.is_pool() => Some(t),
            _ => None,
        }
    }

    /// Fail with `UndefinedValue` unless the value is defined
    pub fn force_defined(&self) -> Result<()> {
        match self {
            Mval::Undefined => Err(Error::undefined()),
            _ => Ok(()),
        }
    }

    /// Numeric interpretation, cached on the value
    ///
    /// SQL null reads as the empty string.
    pub fn force_num(&mut self, pool: &StringPool) -> Result<Number> {
        match self {
            Mval::Undefined => Err(Error::undefined()),
            Mval::SqlNull => Ok(Number::ZERO),
            Mval::Number { num, .. } => Ok(num.normalized()),
            Mval::Str { num: Some(cache), .. } => Ok(cache.num),
            Mval::Str { text, num } => {
                let bytes = pool.bytes(text)?;
                let parsed = Number::parse(bytes)?;
                let exact = parsed.canonical().as_bytes() == bytes;
                *num = Some(NumCache { num: parsed, exact });
                Ok(parsed)
            }
        }
    }

    /// String interpretation, rendered into the pool once and cached
    pub fn force_str(&mut self, pool: &mut StringPool) -> Result<MStr> {
        match self {
            Mval::Undefined => Err(Error::undefined()),
            Mval::SqlNull => Ok(MStr::EMPTY),
            Mval::Str { text, .. } => Ok(*text),
            Mval::Number { text: Some(t), .. } if pool.is_live(t) => Ok(*t),
            Mval::Number { num, text } => {
                let rendered = pool.alloc(num.canonical().as_bytes())?;
                *text = Some(rendered);
                Ok(rendered)
            }
        }
    }

    /// Human-readable rendering, without touching the pool
    pub fn render(&self, pool: &StringPool) -> Result<String> {
        match self {
            Mval::Undefined => Err(Error::undefined()),
            Mval::SqlNull => Ok(String::new()),
            Mval::Number { num, .. } => Ok(num.canonical()),
            Mval::Str { text, .. } => Ok(String::from_utf8_lossy(pool.bytes(text)?).into_owned()),
        }
    }
}

impl Default for Mval {
    fn default() -> Self {
        Mval::Undefined
    }
}

pub(crate) fn digit_count(mut m: u64) -> usize {
    let mut digits = 1;
    while m >= 10 {
        m /= 10;
        digits += 1;
    }
    digits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(text: &str) -> Number {
        Number::parse(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_integral_values_are_ints() {
        assert_eq!(num("5"), Number::Int(5));
        assert_eq!(num("5.000"), Number::Int(5));
        assert_eq!(num("-12E2"), Number::Int(-1200));
        assert_eq!(num("--3"), Number::Int(3));
        assert_eq!(num("abc"), Number::ZERO);
    }

    #[test]
    fn test_decimal_cells() {
        let Number::Decimal(d) = num("1.5") else {
            panic!("1.5 must be a decimal")
        };
        assert_eq!(d.hi, 150_000_000);
        assert_eq!(d.lo, 0);
        assert_eq!(d.exp, EXP_BIAS + 1);
        assert!(!d.negative);
    }

    #[test]
    fn test_canonical_forms() {
        assert_eq!(num("0.5").canonical(), ".5");
        assert_eq!(num("-0.05").canonical(), "-.05");
        assert_eq!(num("1.50").canonical(), "1.5");
        assert_eq!(num("1E20").canonical(), "100000000000000000000");
        assert_eq!(num("123456789.123456789").canonical(), "123456789.123456789");
    }

    #[test]
    fn test_exponent_limits() {
        assert_eq!(num("1E-44"), Number::ZERO);
        assert!(matches!(num("1E-43"), Number::Decimal(_)));
        assert!(matches!(
            Number::parse(b"1E47"),
            Err(Error::NumericOverflow { .. })
        ));
        assert!(Number::parse(b"9E46").is_ok());
    }

    #[test]
    fn test_truncates_to_eighteen_digits() {
        let n = num("1234567890.12345678999");
        assert_eq!(n.canonical(), "1234567890.12345678");
    }

    #[test]
    fn test_from_int_keeps_eighteen_digit_range() {
        assert_eq!(Number::from_int(999_999_999_999_999_999), Number::Int(999_999_999_999_999_999));
        let big = Number::from_int(-1_000_000_000_000_000_000);
        assert!(matches!(big, Number::Decimal(_)));
        assert_eq!(big, num("-1E18"));
        assert_eq!(big.negated(), num("1E18"));
        assert_eq!(Number::Int(7).negated(), Number::Int(-7));
    }

    #[test]
    fn test_promote_then_demote() {
        let d = Decimal::promote(-42);
        assert!(d.negative);
        assert_eq!(Number::demote(d).unwrap(), Number::Int(-42));
    }

    #[test]
    fn test_force_num_caches_exactness() {
        let mut pool = StringPool::new(Default::default()).unwrap();
        let mut exact = Mval::from_bytes(&mut pool, b"5").unwrap();
        let mut approx = Mval::from_bytes(&mut pool, b"5.0").unwrap();
        assert_eq!(exact.force_num(&pool).unwrap(), Number::Int(5));
        assert_eq!(approx.force_num(&pool).unwrap(), Number::Int(5));
        assert_eq!(exact.exact_number(), Some(Number::Int(5)));
        assert_eq!(approx.exact_number(), None);
    }

    #[test]
    fn test_force_str_is_idempotent() {
        let mut pool = StringPool::new(Default::default()).unwrap();
        let mut v = Mval::numeric_literal("2.50").unwrap();
        let first = v.force_str(&mut pool).unwrap();
        let second = v.force_str(&mut pool).unwrap();
        assert!(first.same_range(&second));
        assert_eq!(pool.bytes(&first).unwrap(), b"2.5");
    }

    #[test]
    fn test_undefined_coercion_fails() {
        let mut pool = StringPool::new(Default::default()).unwrap();
        let mut v = Mval::Undefined;
        assert!(matches!(v.force_num(&pool), Err(Error::UndefinedValue { .. })));
        assert!(matches!(v.force_str(&mut pool), Err(Error::UndefinedValue { .. })));
    }
}
