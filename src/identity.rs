//! Soul address derivation.
//!
//! A soul address is the first 20 bytes of `SHA-256(entropy)`, where the
//! entropy is recovered from the mnemonic words. It is public, stable across
//! whitespace and case variations of the phrase, and is the registry key.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{SoulError, SoulResult};
use crate::mnemonic::Mnemonic;

/// Length of a soul address in bytes.
pub const ADDRESS_BYTES: usize = 20;

static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-f]{40}$").expect("static address pattern"));

/// Public identifier rendered as `0x` + 40 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SoulAddress(String);

impl SoulAddress {
    /// Strictly parse an address. Only the canonical lowercase form is accepted.
    pub fn parse(candidate: &str) -> SoulResult<Self> {
        if ADDRESS_RE.is_match(candidate) {
            Ok(Self(candidate.to_string()))
        } else {
            Err(SoulError::InvalidAddress(truncate_for_error(candidate)))
        }
    }

    /// Derive the address for an already validated mnemonic.
    pub fn from_mnemonic(mnemonic: &Mnemonic) -> Self {
        let digest = Sha256::digest(mnemonic.entropy());
        Self(format!("0x{}", hex::encode(&digest[..ADDRESS_BYTES])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw 20 address bytes.
    pub fn to_bytes(&self) -> [u8; ADDRESS_BYTES] {
        let mut out = [0u8; ADDRESS_BYTES];
        // The constructor guarantees 40 valid hex characters after the prefix.
        if let Ok(bytes) = hex::decode(&self.0[2..]) {
            out.copy_from_slice(&bytes);
        }
        out
    }

    /// `0x1234abcd...` form for log lines and UI labels.
    pub fn short(&self) -> String {
        format!("{}...", &self.0[..10])
    }
}

fn truncate_for_error(candidate: &str) -> String {
    candidate.chars().take(48).collect()
}

impl fmt::Display for SoulAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SoulAddress {
    type Err = SoulError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SoulAddress {
    type Error = SoulError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SoulAddress> for String {
    fn from(value: SoulAddress) -> Self {
        value.0
    }
}

impl AsRef<str> for SoulAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the soul address from a seed phrase.
///
/// The phrase is normalized first; fails with [`SoulError::InvalidMnemonic`]
/// if it does not validate. Depends on nothing but the phrase itself.
pub fn derive_address(mnemonic: &str) -> SoulResult<SoulAddress> {
    let parsed = Mnemonic::parse(mnemonic)?;
    Ok(SoulAddress::from_mnemonic(&parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO_24: &str = "abandon abandon abandon abandon abandon abandon abandon abandon \
        abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon \
        abandon abandon abandon abandon art";

    #[test]
    fn test_known_address_for_zero_entropy() {
        // SHA-256 of 32 zero bytes is 66687aad...0d5f2925.
        let addr = derive_address(ZERO_24).unwrap();
        assert_eq!(addr.as_str(), "0x66687aadf862bd776c8fc18b8e9f8e2008971485");
    }

    #[test]
    fn test_address_shape() {
        let phrase = crate::mnemonic::generate().unwrap();
        let addr = derive_address(&phrase).unwrap();
        assert_eq!(addr.as_str().len(), 42);
        assert!(addr.as_str().starts_with("0x"));
        assert!(SoulAddress::parse(addr.as_str()).is_ok());
    }

    #[test]
    fn test_derivation_is_stable_across_normalization() {
        let phrase = crate::mnemonic::generate().unwrap();
        let a = derive_address(&phrase).unwrap();
        let b = derive_address(&phrase).unwrap();
        let messy = format!("\n  {}\t", phrase.to_uppercase().replace(' ', "  "));
        let c = derive_address(&messy).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_invalid_mnemonic_is_rejected() {
        let err = derive_address("hello world").unwrap_err();
        assert!(matches!(err, SoulError::InvalidMnemonic));
    }

    #[test]
    fn test_strict_parse_rejects_non_canonical_forms() {
        let upper = "0x66687AADF862BD776C8FC18B8E9F8E2008971485";
        assert!(SoulAddress::parse(upper).is_err());
        assert!(SoulAddress::parse("66687aadf862bd776c8fc18b8e9f8e2008971485").is_err());
        assert!(SoulAddress::parse("0x66687aad").is_err());
        assert!(SoulAddress::parse("0x../../etc/passwd").is_err());
        assert!(SoulAddress::parse("").is_err());
    }

    #[test]
    fn test_serde_roundtrip_enforces_shape() {
        let addr = derive_address(ZERO_24).unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x66687aadf862bd776c8fc18b8e9f8e2008971485\"");
        let back: SoulAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
        assert!(serde_json::from_str::<SoulAddress>("\"0xnothex\"").is_err());
    }

    #[test]
    fn test_to_bytes_and_short() {
        let addr = derive_address(ZERO_24).unwrap();
        assert_eq!(addr.to_bytes()[0], 0x66);
        assert_eq!(addr.short(), "0x66687aad...");
    }
}
