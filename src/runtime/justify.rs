//! `$JUSTIFY` and `$ZJUSTIFY` with two arguments: left-pad with spaces to a width.

use crate::error::{Error, Result};
use crate::runtime::stringpool::{StringPool, MAX_STRLEN};
use crate::runtime::value::Mval;

/// Pad to `width` characters (UTF-8 aware when `utf8` is set)
pub fn justify(src: &mut Mval, width: i64, pool: &mut StringPool, utf8: bool) -> Result<Mval> {
    pad_left(src, width, pool, utf8)
}

/// Pad to `width` bytes
pub fn zjustify(src: &mut Mval, width: i64, pool: &mut StringPool) -> Result<Mval> {
    pad_left(src, width, pool, false)
}

fn pad_left(src: &mut Mval, width: i64, pool: &mut StringPool, chars: bool) -> Result<Mval> {
    let width = width.max(0) as u64;
    if width > MAX_STRLEN as u64 {
        return Err(Error::MaxStringLength {
            requested: usize::try_from(width).unwrap_or(usize::MAX),
            limit: MAX_STRLEN,
        });
    }
    let text = src.force_str(pool)?;
    let len = if chars {
        char_count(pool.bytes(&text)?)
    } else {
        text.len()
    };
    let pad = width as usize;
    if pad <= len {
        return Ok(*src);
    }
    let pad = pad - len;
    if text.len() + pad > MAX_STRLEN {
        return Err(Error::MaxStringLength {
            requested: text.len() + pad,
            limit: MAX_STRLEN,
        });
    }
    Ok(Mval::string(pool.alloc_padded(pad, &text)?))
}

/// Character count of possibly malformed UTF-8: every non-continuation byte starts a character
fn char_count(bytes: &[u8]) -> usize {
    bytes.iter().filter(|b| (**b & 0xC0) != 0x80).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(v: &Mval, pool: &StringPool) -> String {
        v.render(pool).unwrap()
    }

    #[test]
    fn test_pads_numbers() {
        let mut pool = StringPool::new(Default::default()).unwrap();
        let mut v = Mval::int(42);
        let out = justify(&mut v, 5, &mut pool, true).unwrap();
        assert_eq!(rendered(&out, &pool), "   42");
    }

    #[test]
    fn test_returns_source_when_wide_enough() {
        let mut pool = StringPool::new(Default::default()).unwrap();
        let mut v = Mval::from_bytes(&mut pool, b"hello").unwrap();
        let out = justify(&mut v, 3, &mut pool, true).unwrap();
        assert_eq!(out, v);
        let out = justify(&mut v, -7, &mut pool, true).unwrap();
        assert_eq!(out, v);
    }

    #[test]
    fn test_characters_versus_bytes() {
        let mut pool = StringPool::new(Default::default()).unwrap();
        let mut v = Mval::from_bytes(&mut pool, "é".as_bytes()).unwrap();
        let chars = justify(&mut v, 3, &mut pool, true).unwrap();
        let bytes = zjustify(&mut v, 3, &mut pool).unwrap();
        assert_eq!(rendered(&chars, &pool), "  é");
        assert_eq!(rendered(&bytes, &pool), " é");
    }

    #[test]
    fn test_width_limit() {
        let mut pool = StringPool::new(Default::default()).unwrap();
        let mut v = Mval::int(1);
        let err = zjustify(&mut v, MAX_STRLEN as i64 + 1, &mut pool).unwrap_err();
        assert!(matches!(err, Error::MaxStringLength { .. }));
    }
}
