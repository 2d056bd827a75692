//! Value kernel tests: canonical numbers, equality, integer division and `$JUSTIFY`

use mumps_core::runtime::{
    equals, idiv, integer_divide, justify, not_equals, sql_not_equals, zjustify, Mval, Number,
    PoolOptions, StringPool,
};
use mumps_core::Error;

fn pool() -> StringPool {
    StringPool::new(PoolOptions::default()).unwrap()
}

fn num(text: &str) -> Number {
    Number::parse(text.as_bytes()).unwrap()
}

// =============================================================================
// Canonical numbers
// =============================================================================

#[test]
fn test_numeric_literals_canonicalize() {
    let cases = [
        ("007", "7"),
        ("1.500", "1.5"),
        ("-.250", "-.25"),
        ("+-+4", "-4"),
        ("12E-1", "1.2"),
        ("3 apples", "3"),
        ("", "0"),
    ];
    for (text, canonical) in cases {
        assert_eq!(num(text).canonical(), canonical, "canonical form of {:?}", text);
    }
}

#[test]
fn test_string_exactness_follows_canonical_text() {
    let mut pool = pool();
    for (text, exact) in [("10", true), ("10.0", false), ("-0", false), (".5", true), ("0.5", false)] {
        let mut v = Mval::from_bytes(&mut pool, text.as_bytes()).unwrap();
        v.force_num(&pool).unwrap();
        assert_eq!(v.exact_number().is_some(), exact, "exactness of {:?}", text);
    }
}

#[test]
fn test_sqlnull_coerces_like_empty_string() {
    let mut pool = pool();
    let mut null = Mval::SqlNull;
    assert_eq!(null.force_num(&pool).unwrap(), Number::ZERO);
    assert!(null.force_str(&mut pool).unwrap().is_empty());
    assert_eq!(null.render(&pool).unwrap(), "");
}

// =============================================================================
// Equality
// =============================================================================

#[test]
fn test_equality_numeric_vs_string() {
    let mut pool = pool();

    let mut a = Mval::int(10);
    let mut b = Mval::from_bytes(&mut pool, b"10").unwrap();
    assert!(equals(&mut a, &mut b, &mut pool).unwrap());

    let mut c = Mval::from_bytes(&mut pool, b"10.0").unwrap();
    assert!(!equals(&mut a, &mut c, &mut pool).unwrap());
    assert!(not_equals(&mut a, &mut c, &mut pool).unwrap());

    let mut d = Mval::numeric_literal("10.0").unwrap();
    assert!(equals(&mut a, &mut d, &mut pool).unwrap());
}

#[test]
fn test_integers_past_eighteen_digits_equal_their_text() {
    let mut pool = pool();
    let mut big = Mval::int(1_000_000_000_000_000_000);
    assert_eq!(big.render(&pool).unwrap(), "1000000000000000000");
    assert!(matches!(big.exact_number(), Some(Number::Decimal(_))));

    let mut text = Mval::from_bytes(&mut pool, b"1000000000000000000").unwrap();
    assert!(equals(&mut big, &mut text, &mut pool).unwrap());
    text.force_num(&pool).unwrap();
    assert!(text.exact_number().is_some());
    assert!(equals(&mut big, &mut text, &mut pool).unwrap());

    let mut literal = Mval::numeric_literal("1E18").unwrap();
    assert!(equals(&mut big, &mut literal, &mut pool).unwrap());

    let mut bare = Mval::Number {
        num: Number::Int(1_000_000_000_000_000_000),
        text: None,
    };
    assert!(equals(&mut bare, &mut literal, &mut pool).unwrap());
    assert_eq!(Number::Int(i64::MIN).normalized(), Number::from_int(i64::MIN));
}

#[test]
fn test_equality_of_strings() {
    let mut pool = pool();
    let mut a = Mval::from_bytes(&mut pool, b"abc").unwrap();
    let mut b = Mval::literal(&mut pool, b"abc").unwrap();
    let mut c = Mval::from_bytes(&mut pool, b"abd").unwrap();
    let mut empty = Mval::from_bytes(&mut pool, b"").unwrap();
    let mut null = Mval::SqlNull;

    assert!(equals(&mut a, &mut b, &mut pool).unwrap());
    assert!(!equals(&mut a, &mut c, &mut pool).unwrap());
    assert!(!equals(&mut empty, &mut null, &mut pool).unwrap());
}

#[test]
fn test_sqlnull_comparisons() {
    let mut pool = pool();
    let mut null = Mval::SqlNull;
    let mut other_null = Mval::SqlNull;
    let mut one = Mval::int(1);

    assert!(!equals(&mut null, &mut other_null, &mut pool).unwrap());
    assert!(not_equals(&mut null, &mut one, &mut pool).unwrap());
    assert!(!sql_not_equals(&mut null, &mut one, &mut pool).unwrap());
    assert!(!sql_not_equals(&mut one, &mut null, &mut pool).unwrap());

    let mut undefined = Mval::Undefined;
    assert!(matches!(
        equals(&mut null, &mut undefined, &mut pool),
        Err(Error::UndefinedValue { .. })
    ));
}

// =============================================================================
// Integer division
// =============================================================================

#[test]
fn test_integer_division_truncates_toward_zero() {
    let cases = [
        ("7", "2", "3"),
        ("-7", "2", "-3"),
        ("7", "-2", "-3"),
        ("-7", "-2", "3"),
        ("1", "3", "0"),
        ("2.9", "1", "2"),
        ("-2.9", "1", "-2"),
        ("1E25", "7", "1428571428571428570000000"),
    ];
    for (u, v, q) in cases {
        assert_eq!(idiv(num(u), num(v)).unwrap().canonical(), q, "{} \\ {}", u, v);
    }
}

#[test]
fn test_integer_division_errors() {
    assert_eq!(idiv(num("5"), num("0")), Err(Error::DivideByZero));
    assert_eq!(idiv(num("5"), num("0.0")), Err(Error::DivideByZero));
    assert!(matches!(
        idiv(num("9E46"), num(".01")),
        Err(Error::NumericOverflow { .. })
    ));
}

#[test]
fn test_integer_division_coerces_strings() {
    let mut pool = pool();
    let mut u = Mval::from_bytes(&mut pool, b"100 miles").unwrap();
    let mut v = Mval::from_bytes(&mut pool, b"7").unwrap();
    let q = integer_divide(&mut u, &mut v, &pool).unwrap();
    assert_eq!(q.render(&pool).unwrap(), "14");

    let mut undefined = Mval::Undefined;
    assert!(integer_divide(&mut undefined, &mut v, &pool).is_err());
}

// =============================================================================
// $JUSTIFY
// =============================================================================

#[test]
fn test_justify_pads_and_keeps() {
    let mut pool = pool();
    let mut v = Mval::from_bytes(&mut pool, b"ab").unwrap();
    let padded = justify(&mut v, 5, &mut pool, true).unwrap();
    assert_eq!(padded.render(&pool).unwrap(), "   ab");

    let same = justify(&mut v, 1, &mut pool, true).unwrap();
    assert_eq!(same.render(&pool).unwrap(), "ab");

    let mut n = Mval::numeric_literal("3.10").unwrap();
    let padded = zjustify(&mut n, 4, &mut pool).unwrap();
    assert_eq!(padded.render(&pool).unwrap(), " 3.1");
}

#[test]
fn test_justify_counts_characters_in_utf8_mode() {
    let mut pool = pool();
    let mut v = Mval::from_bytes(&mut pool, "é".as_bytes()).unwrap();
    let chars = justify(&mut v, 3, &mut pool, true).unwrap();
    assert_eq!(chars.render(&pool).unwrap(), "  é");

    let bytes = zjustify(&mut v, 3, &mut pool).unwrap();
    assert_eq!(bytes.render(&pool).unwrap(), " é");
}

#[test]
fn test_justify_width_limit() {
    let mut pool = pool();
    let mut v = Mval::int(1);
    assert!(matches!(
        justify(&mut v, i64::MAX, &mut pool, false),
        Err(Error::MaxStringLength { .. })
    ));
}
