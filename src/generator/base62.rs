//! Base62 encoding of unsigned integers.

/// Symbols in digit-value order: digits, then uppercase, then lowercase.
pub const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const BASE: u64 = 62;

/// Encodes `n` as a Base62 string, most significant symbol first.
///
/// The encoding of `0` is `"0"`.
pub fn base62_encode(mut n: u64) -> String {
    if n == 0 {
        return (BASE62_ALPHABET[0] as char).to_string();
    }

    let mut symbols = Vec::with_capacity(11);
    while n > 0 {
        symbols.push(BASE62_ALPHABET[(n % BASE) as usize]);
        n /= BASE;
    }
    symbols.reverse();

    symbols.into_iter().map(char::from).collect()
}

/// Decodes a Base62 string produced by [`base62_encode`].
///
/// Returns `None` for empty input, symbols outside the alphabet, or overflow.
pub fn base62_decode(encoded: &str) -> Option<u64> {
    if encoded.is_empty() {
        return None;
    }

    encoded.bytes().try_fold(0u64, |acc, byte| {
        let digit = BASE62_ALPHABET.iter().position(|&s| s == byte)? as u64;
        acc.checked_mul(BASE)?.checked_add(digit)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_zero() {
        assert_eq!(base62_encode(0), "0");
    }

    #[test]
    fn test_encode_single_symbol_boundaries() {
        assert_eq!(base62_encode(9), "9");
        assert_eq!(base62_encode(10), "A");
        assert_eq!(base62_encode(61), "z");
    }

    #[test]
    fn test_encode_carries_into_second_symbol() {
        assert_eq!(base62_encode(62), "10");
        assert_eq!(base62_encode(1000), "G8");
        assert_eq!(base62_encode(62 * 62 - 1), "zz");
    }

    #[test]
    fn test_encode_max_value() {
        let encoded = base62_encode(u64::MAX);
        assert_eq!(encoded, "LygHa16AHYF");
        assert_eq!(base62_decode(&encoded), Some(u64::MAX));
    }

    #[test]
    fn test_decode_inverts_encode() {
        for n in [0, 1, 61, 62, 1000, 3_844, 987_654_321, 1 << 62] {
            assert_eq!(base62_decode(&base62_encode(n)), Some(n));
        }
    }

    #[test]
    fn test_decode_rejects_invalid_input() {
        assert_eq!(base62_decode(""), None);
        assert_eq!(base62_decode("ab-c"), None);
        assert_eq!(base62_decode("zzzzzzzzzzzz"), None);
    }
}
