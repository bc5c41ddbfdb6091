//! Hash functions for the rule index
//!
//! Uses Murmur3 32-bit. Tokens hash with a fixed seed; randomized class
//! names hash a caller-provided seed so every page load gets a fresh name.

/// Seed for selector token hashing.
const TOKEN_SEED: u32 = 0x811c9dc5;

/// Seed for class name derivation.
const CLASS_SEED: u32 = 0x9e3779b9; // Golden ratio

/// Murmur3 32-bit hash implementation.
/// Optimized for short strings (typical class and id tokens).
#[inline]
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    let len = data.len();
    let mut h = seed;

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        h ^= scramble(k);
        h = h.rotate_left(13);
        h = h.wrapping_mul(5).wrapping_add(0xe6546b64);
    }

    // Process remaining bytes
    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k: u32 = 0;
        for (i, &b) in tail.iter().enumerate() {
            k ^= (b as u32) << (8 * i);
        }
        h ^= scramble(k);
    }

    // Finalization
    h ^= len as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;

    h
}

#[inline]
fn scramble(k: u32) -> u32 {
    k.wrapping_mul(0xcc9e2d51)
        .rotate_left(15)
        .wrapping_mul(0x1b873593)
}

/// Compute a 32-bit hash for class and id tokens.
/// Ensures result is never 0 (sentinel value).
#[inline]
pub fn hash_token(token: &str) -> u32 {
    let mut h = murmur3_32(token.as_bytes(), TOKEN_SEED);
    if h == 0 {
        h = 1;
    }
    h
}

/// Derive a hide class name from a seed. The name always starts with a
/// letter so it is a valid class selector.
pub fn randomized_class_name(seed: u64) -> String {
    let bytes = seed.to_le_bytes();
    let lo = murmur3_32(&bytes, CLASS_SEED);
    let hi = murmur3_32(&bytes, lo);
    format!("c{:08x}{:04x}", lo, hi >> 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_murmur3_known_vectors() {
        assert_eq!(murmur3_32(b"", 0), 0);
        assert_eq!(murmur3_32(b"", 1), 0x514e28b7);
        assert_eq!(murmur3_32(b"test", 0), 0xba6bd213);
        assert_eq!(murmur3_32(b"Hello, world!", 0x9747b28c), 0x24884cba);
    }

    #[test]
    fn test_murmur3_different_seeds() {
        let h1 = murmur3_32(b"ad-banner", 0);
        let h2 = murmur3_32(b"ad-banner", 1);
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_murmur3_tail_lengths() {
        let hashes: Vec<u32> = (1..=8).map(|len| murmur3_32(&b"abcdefgh"[..len], 0)).collect();
        for (i, a) in hashes.iter().enumerate() {
            assert!(hashes[i + 1..].iter().all(|b| b != a));
        }
    }

    #[test]
    fn test_hash_token_never_zero() {
        assert_ne!(hash_token("banner"), 0);
        assert_eq!(hash_token("banner"), hash_token("banner"));
        assert_ne!(hash_token("banner"), hash_token("Banner"));
    }

    #[test]
    fn test_randomized_class_name() {
        let a = randomized_class_name(1);
        let b = randomized_class_name(2);
        assert_ne!(a, b);
        assert_eq!(a, randomized_class_name(1));
        assert_eq!(a.len(), 13);
        assert!(a.starts_with('c'));
        assert!(a.bytes().all(|b| b.is_ascii_alphanumeric()));
    }
}
