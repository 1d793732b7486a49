//! Mnemonic generation and validation.
//!
//! Seed phrases follow BIP-39 over the English 2048-word list: entropy plus a
//! checksum of `entropy_bits / 32` bits taken from the head of its SHA-256
//! digest, split into 11-bit word indices. New phrases always carry 256 bits
//! of entropy (24 words); any standard length is accepted on restore.

use std::fmt;
use std::str::FromStr;

use bip39::Language;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{SoulError, SoulResult};

/// Entropy size used for freshly generated phrases (256 bits, 24 words).
pub const GENERATED_ENTROPY_BYTES: usize = 32;

/// Word counts accepted on restore, for 128/160/192/224/256 bits of entropy.
pub const VALID_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// Canonical form of a candidate phrase: trimmed, lowercased, single-spaced.
pub fn normalize(candidate: &str) -> String {
    candidate
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A validated seed phrase together with the entropy it encodes.
///
/// `Debug` never prints the words.
#[derive(Clone, PartialEq, Eq)]
pub struct Mnemonic {
    phrase: String,
    entropy: Vec<u8>,
}

impl Mnemonic {
    /// Draw 256 bits from the OS CSPRNG and encode them as 24 words.
    ///
    /// There is no fallback source: if the OS refuses, this fails with
    /// [`SoulError::Entropy`].
    pub fn generate() -> SoulResult<Self> {
        let mut entropy = [0u8; GENERATED_ENTROPY_BYTES];
        OsRng
            .try_fill_bytes(&mut entropy)
            .map_err(|e| SoulError::Entropy(e.to_string()))?;
        Self::from_entropy(&entropy)
    }

    /// Encode raw entropy (16, 20, 24, 28 or 32 bytes) as a phrase.
    pub fn from_entropy(entropy: &[u8]) -> SoulResult<Self> {
        let encoded = bip39::Mnemonic::from_entropy_in(Language::English, entropy)
            .map_err(|_| SoulError::InvalidMnemonic)?;
        Ok(Self {
            phrase: encoded.to_string(),
            entropy: entropy.to_vec(),
        })
    }

    /// Normalize and validate a candidate phrase, recovering its entropy.
    pub fn parse(candidate: &str) -> SoulResult<Self> {
        let phrase = normalize(candidate);
        let word_count = phrase.split(' ').filter(|w| !w.is_empty()).count();
        if !VALID_WORD_COUNTS.contains(&word_count) {
            return Err(SoulError::InvalidMnemonic);
        }

        let decoded = bip39::Mnemonic::parse_in_normalized(Language::English, &phrase)
            .map_err(|_| SoulError::InvalidMnemonic)?;

        Ok(Self {
            phrase,
            entropy: decoded.to_entropy(),
        })
    }

    /// The normalized, space-joined words.
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// The entropy bytes encoded by the phrase, checksum stripped.
    pub fn entropy(&self) -> &[u8] {
        &self.entropy
    }

    pub fn word_count(&self) -> usize {
        self.phrase.split(' ').count()
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mnemonic([REDACTED; {} words])", self.word_count())
    }
}

impl FromStr for Mnemonic {
    type Err = SoulError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Generate a fresh 24-word phrase.
pub fn generate() -> SoulResult<String> {
    Mnemonic::generate().map(|m| m.phrase)
}

/// Whether `candidate` is a valid phrase after normalization. Never fails.
pub fn validate(candidate: &str) -> bool {
    Mnemonic::parse(candidate).is_ok()
}
