//! Short-key generation.
//!
//! A key is derived from the mint counter in two steps: scramble the counter
//! with Knuth's multiplicative hash plus a fixed XOR salt, then base-62
//! encode the result. The multiplier is odd, so the scramble is a bijection
//! on the full u64 space: distinct counters can never collide, and key
//! generation needs no lookup against existing keys.

/// Base-62 alphabet, most-significant digit first.
const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Knuth's multiplicative hashing constant (2^64 / golden ratio, odd).
const MULTIPLIER: u64 = 11_400_714_819_323_198_485;

/// Fixed salt so consecutive counters don't share low-bit structure.
const XOR_SALT: u64 = 214_234_534_534;

/// Encode a counter value as a short printable key.
///
/// Pure and total: no state, no I/O, deterministic over the whole u64 range.
pub fn encode(counter: u64) -> String {
    to_base62(scramble(counter))
}

fn scramble(id: u64) -> u64 {
    id.wrapping_mul(MULTIPLIER) ^ XOR_SALT
}

fn to_base62(mut value: u64) -> String {
    if value == 0 {
        return (ALPHABET[0] as char).to_string();
    }

    // 62^11 > u64::MAX, so eleven digits always suffice.
    let mut buf = [0u8; 11];
    let mut pos = buf.len();

    while value > 0 {
        pos -= 1;
        buf[pos] = ALPHABET[(value % 62) as usize];
        value /= 62;
    }

    String::from_utf8_lossy(&buf[pos..]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_zero_value_encodes_first_character() {
        assert_eq!(to_base62(0), "0");
    }

    #[test]
    fn test_encode_is_deterministic() {
        assert_eq!(encode(1), encode(1));
        assert_eq!(encode(u64::MAX), encode(u64::MAX));
    }

    #[test]
    fn test_keys_use_base62_alphabet() {
        for counter in [0, 1, 2, 61, 62, 63, 1_000_000, u64::MAX] {
            let key = encode(counter);
            assert!(!key.is_empty());
            assert!(key.len() <= 11);
            assert!(key.bytes().all(|b| ALPHABET.contains(&b)), "bad key {key:?}");
        }
    }

    #[test]
    fn test_consecutive_counters_do_not_look_sequential() {
        // The scramble should scatter neighbours across the output space.
        let a = encode(1);
        let b = encode(2);
        assert_ne!(a, b);
        assert_ne!(scramble(2).wrapping_sub(scramble(1)), 1);
    }

    #[test]
    fn test_dense_range_is_injective() {
        let mut seen = HashSet::new();
        for counter in 0..100_000u64 {
            assert!(seen.insert(encode(counter)), "collision at {counter}");
        }
    }

    proptest! {
        #[test]
        fn prop_distinct_counters_yield_distinct_keys(a in any::<u64>(), b in any::<u64>()) {
            prop_assume!(a != b);
            prop_assert_ne!(encode(a), encode(b));
        }

        #[test]
        fn prop_scramble_never_collides_with_neighbour(n in any::<u64>()) {
            prop_assert_ne!(scramble(n), scramble(n.wrapping_add(1)));
        }
    }
}
