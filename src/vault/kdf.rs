//! Key derivation and randomness for envelopes.

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{SoulError, SoulResult};
use crate::mnemonic::normalize;

/// PBKDF2-HMAC-SHA256 rounds for the v1 profile.
pub const PBKDF2_ITERATIONS: u32 = 210_000;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// Derive a 256-bit key from the normalized secret and a per-envelope salt.
///
/// The secret is not required to be a valid mnemonic.
pub(crate) fn derive_key(secret: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let normalized = normalize(secret);
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(normalized.as_bytes(), salt, iterations, &mut key);
    key
}

/// Fill `N` bytes from the OS CSPRNG. Never falls back to a weaker source.
pub(crate) fn random_bytes<const N: usize>() -> SoulResult<[u8; N]> {
    let mut out = [0u8; N];
    OsRng
        .try_fill_bytes(&mut out)
        .map_err(|e| SoulError::Entropy(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_depends_on_salt() {
        let a = derive_key("some secret words", &[1u8; 16], 1_000);
        let b = derive_key("some secret words", &[2u8; 16], 1_000);
        assert_ne!(a, b);
    }

    #[test]
    fn test_derivation_normalizes_secret() {
        let a = derive_key("Some  Secret words ", &[7u8; 16], 1_000);
        let b = derive_key("some secret words", &[7u8; 16], 1_000);
        assert_eq!(a, b);
    }

    #[test]
    fn test_pbkdf2_sha256_reference_vector() {
        // RFC 7914 section 11: P="passwd", S="salt", c=1, dkLen=64 (first 32 bytes).
        let key = derive_key("passwd", b"salt", 1);
        assert_eq!(
            hex::encode(key),
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"
        );
    }

    #[test]
    fn test_random_bytes_are_fresh() {
        let a: [u8; 16] = random_bytes().unwrap();
        let b: [u8; 16] = random_bytes().unwrap();
        assert_ne!(a, b);
    }
}
