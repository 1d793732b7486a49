//! Envelope wire format and cipher profile dispatch.
//!
//! ```json
//! { "v": 1, "alg": "AES-256-GCM", "saltB64": "...", "ivB64": "...", "ctB64": "..." }
//! ```
//!
//! `v` selects a [`CipherProfile`]; only v1 exists today.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::kdf::PBKDF2_ITERATIONS;
use crate::error::{SoulError, SoulResult};

/// Algorithm label written by the v1 profile.
pub const ALG_AES_256_GCM: &str = "AES-256-GCM";

/// GCM authentication tag appended to the ciphertext.
pub const TAG_LEN: usize = 16;

/// Key derivation and cipher parameters selected by an envelope's `v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherProfile {
    /// v1: PBKDF2-HMAC-SHA256 (210k rounds, 16-byte salt) + AES-256-GCM (12-byte IV, no AAD).
    Pbkdf2Aes256Gcm,
}

impl CipherProfile {
    /// Profile used for every new envelope.
    pub const CURRENT: Self = Self::Pbkdf2Aes256Gcm;

    /// Select the profile for an envelope header, before touching any key material.
    pub fn resolve(version: u32, alg: &str) -> SoulResult<Self> {
        match (version, alg) {
            (1, ALG_AES_256_GCM) => Ok(Self::Pbkdf2Aes256Gcm),
            _ => Err(SoulError::UnsupportedFormat {
                version,
                alg: alg.to_string(),
            }),
        }
    }

    pub fn version(self) -> u32 {
        match self {
            Self::Pbkdf2Aes256Gcm => 1,
        }
    }

    pub fn alg(self) -> &'static str {
        match self {
            Self::Pbkdf2Aes256Gcm => ALG_AES_256_GCM,
        }
    }

    pub fn salt_len(self) -> usize {
        match self {
            Self::Pbkdf2Aes256Gcm => 16,
        }
    }

    pub fn iv_len(self) -> usize {
        match self {
            Self::Pbkdf2Aes256Gcm => 12,
        }
    }

    pub fn iterations(self) -> u32 {
        match self {
            Self::Pbkdf2Aes256Gcm => PBKDF2_ITERATIONS,
        }
    }

    fn check_lengths(self, parts: &EnvelopeParts) -> SoulResult<()> {
        if parts.salt.len() != self.salt_len() {
            return Err(SoulError::MalformedEnvelope(format!(
                "salt must be {} bytes, got {}",
                self.salt_len(),
                parts.salt.len()
            )));
        }
        if parts.iv.len() != self.iv_len() {
            return Err(SoulError::MalformedEnvelope(format!(
                "iv must be {} bytes, got {}",
                self.iv_len(),
                parts.iv.len()
            )));
        }
        if parts.ct.len() < TAG_LEN {
            return Err(SoulError::MalformedEnvelope(
                "ciphertext shorter than authentication tag".to_string(),
            ));
        }
        Ok(())
    }
}

/// Self-describing authenticated-encryption container.
///
/// This is the only artifact that ever leaves the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub v: u32,
    pub alg: String,
    #[serde(rename = "saltB64")]
    pub salt_b64: String,
    #[serde(rename = "ivB64")]
    pub iv_b64: String,
    #[serde(rename = "ctB64")]
    pub ct_b64: String,
}

/// Decoded binary fields of an envelope.
#[derive(Debug, Clone)]
pub struct EnvelopeParts {
    pub salt: Vec<u8>,
    pub iv: Vec<u8>,
    /// Ciphertext with the trailing GCM tag.
    pub ct: Vec<u8>,
}

impl Envelope {
    pub(crate) fn from_parts(profile: CipherProfile, salt: &[u8], iv: &[u8], ct: &[u8]) -> Self {
        Self {
            v: profile.version(),
            alg: profile.alg().to_string(),
            salt_b64: BASE64.encode(salt),
            iv_b64: BASE64.encode(iv),
            ct_b64: BASE64.encode(ct),
        }
    }

    /// Interpret an arbitrary JSON value as an envelope.
    pub fn from_value(value: Value) -> SoulResult<Self> {
        let envelope: Self = serde_json::from_value(value)
            .map_err(|e| SoulError::MalformedEnvelope(e.to_string()))?;
        envelope.validate_shape()?;
        Ok(envelope)
    }

    /// Header-level profile lookup. See [`CipherProfile::resolve`].
    pub fn profile(&self) -> SoulResult<CipherProfile> {
        CipherProfile::resolve(self.v, &self.alg)
    }

    /// Decode the base64 fields.
    pub fn decode_parts(&self) -> SoulResult<EnvelopeParts> {
        let decode = |field: &str, raw: &str| {
            BASE64
                .decode(raw)
                .map_err(|e| SoulError::MalformedEnvelope(format!("{field}: {e}")))
        };
        Ok(EnvelopeParts {
            salt: decode("saltB64", &self.salt_b64)?,
            iv: decode("ivB64", &self.iv_b64)?,
            ct: decode("ctB64", &self.ct_b64)?,
        })
    }

    /// Structural check run before upload and after download.
    ///
    /// Envelopes of unknown versions pass if their fields decode; the v1
    /// layout is also checked for salt, IV and tag lengths.
    pub fn validate_shape(&self) -> SoulResult<()> {
        if self.alg.trim().is_empty() {
            return Err(SoulError::MalformedEnvelope("alg is empty".to_string()));
        }
        let parts = self.decode_parts()?;
        if let Ok(profile) = self.profile() {
            profile.check_lengths(&parts)?;
        }
        Ok(())
    }

    /// Decode and check lengths against the resolved profile.
    pub(crate) fn open_parts(&self) -> SoulResult<(CipherProfile, EnvelopeParts)> {
        let profile = self.profile()?;
        let parts = self.decode_parts()?;
        profile.check_lengths(&parts)?;
        Ok((profile, parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Envelope {
        Envelope::from_parts(CipherProfile::CURRENT, &[1u8; 16], &[2u8; 12], &[3u8; 40])
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["v"], 1);
        assert_eq!(json["alg"], "AES-256-GCM");
        assert!(json["saltB64"].is_string());
        assert!(json["ivB64"].is_string());
        assert!(json["ctB64"].is_string());
    }

    #[test]
    fn test_resolve_rejects_unknown_headers() {
        assert!(CipherProfile::resolve(1, "AES-256-GCM").is_ok());
        assert!(matches!(
            CipherProfile::resolve(2, "AES-256-GCM"),
            Err(SoulError::UnsupportedFormat { version: 2, .. })
        ));
        assert!(matches!(
            CipherProfile::resolve(1, "AES-128-CBC"),
            Err(SoulError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_from_value_accepts_valid_envelope() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(Envelope::from_value(value).unwrap(), sample());
    }

    #[test]
    fn test_from_value_rejects_missing_fields() {
        let value = serde_json::json!({"v": 1, "alg": "AES-256-GCM", "saltB64": "AAAA"});
        assert!(matches!(
            Envelope::from_value(value),
            Err(SoulError::MalformedEnvelope(_))
        ));
        assert!(Envelope::from_value(serde_json::json!({"error": "Not found"})).is_err());
    }

    #[test]
    fn test_shape_rejects_bad_base64_and_lengths() {
        let mut bad = sample();
        bad.iv_b64 = "***".to_string();
        assert!(matches!(
            bad.validate_shape(),
            Err(SoulError::MalformedEnvelope(_))
        ));

        let short_iv = Envelope::from_parts(CipherProfile::CURRENT, &[1u8; 16], &[2u8; 8], &[3u8; 40]);
        assert!(short_iv.validate_shape().is_err());

        let no_tag = Envelope::from_parts(CipherProfile::CURRENT, &[1u8; 16], &[2u8; 12], &[3u8; 4]);
        assert!(no_tag.validate_shape().is_err());
    }

    #[test]
    fn test_shape_tolerates_future_versions() {
        let mut future = sample();
        future.v = 2;
        future.alg = "XCHACHA20-POLY1305".to_string();
        assert!(future.validate_shape().is_ok());
        assert!(future.profile().is_err());
    }
}
