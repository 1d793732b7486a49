//! Envelope cipher: authenticated encryption of arbitrary state under a seed phrase.
//!
//! Every envelope gets a fresh 16-byte salt and 12-byte IV from the OS CSPRNG.
//! The key is PBKDF2-HMAC-SHA256 over the normalized phrase and exists only
//! for the duration of a call.
//!
//! The async [`encrypt`] / [`decrypt`] run the key stretch on the blocking
//! pool; [`seal`] / [`open`] are the synchronous equivalents.

pub mod envelope;
pub mod kdf;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use envelope::{CipherProfile, Envelope, EnvelopeParts, ALG_AES_256_GCM, TAG_LEN};
pub use kdf::PBKDF2_ITERATIONS;

use crate::error::{SoulError, SoulResult};
use kdf::{derive_key, random_bytes};

/// Encrypt already-serialized plaintext.
pub fn seal_bytes(mnemonic: &str, plaintext: &[u8]) -> SoulResult<Envelope> {
    let profile = CipherProfile::CURRENT;
    match profile {
        CipherProfile::Pbkdf2Aes256Gcm => {
            let salt: [u8; 16] = random_bytes()?;
            let iv: [u8; 12] = random_bytes()?;
            let key = derive_key(mnemonic, &salt, profile.iterations());

            let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
            let ct = cipher
                .encrypt(Nonce::from_slice(&iv), plaintext)
                .map_err(|_| SoulError::MalformedPayload("plaintext too large".to_string()))?;

            Ok(Envelope::from_parts(profile, &salt, &iv, &ct))
        }
    }
}

/// Decrypt an envelope to its raw plaintext bytes.
///
/// The header is checked before any key derivation; a tag mismatch is
/// always [`SoulError::AuthenticationFailure`].
pub fn open_bytes(mnemonic: &str, envelope: &Envelope) -> SoulResult<Vec<u8>> {
    let (profile, parts) = envelope.open_parts()?;
    match profile {
        CipherProfile::Pbkdf2Aes256Gcm => {
            let key = derive_key(mnemonic, &parts.salt, profile.iterations());
            let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
            cipher
                .decrypt(Nonce::from_slice(&parts.iv), parts.ct.as_slice())
                .map_err(|_| SoulError::AuthenticationFailure)
        }
    }
}

/// Serialize `state` to JSON and seal it.
pub fn seal<T: Serialize + ?Sized>(mnemonic: &str, state: &T) -> SoulResult<Envelope> {
    let plaintext = to_plaintext(state)?;
    seal_bytes(mnemonic, &plaintext)
}

/// Open an envelope and parse the plaintext as `T`.
pub fn open<T: DeserializeOwned>(mnemonic: &str, envelope: &Envelope) -> SoulResult<T> {
    let plaintext = open_bytes(mnemonic, envelope)?;
    from_plaintext(&plaintext)
}

/// Async [`seal`]; key stretching runs on the blocking pool.
pub async fn encrypt<T: Serialize + ?Sized>(mnemonic: &str, state: &T) -> SoulResult<Envelope> {
    let plaintext = to_plaintext(state)?;
    let secret = mnemonic.to_string();
    tokio::task::spawn_blocking(move || seal_bytes(&secret, &plaintext)).await?
}

/// Async [`open`]; key stretching runs on the blocking pool.
pub async fn decrypt<T: DeserializeOwned>(mnemonic: &str, envelope: &Envelope) -> SoulResult<T> {
    // Reject unknown headers without spawning work.
    envelope.profile()?;
    let secret = mnemonic.to_string();
    let envelope = envelope.clone();
    let plaintext = tokio::task::spawn_blocking(move || open_bytes(&secret, &envelope)).await??;
    from_plaintext(&plaintext)
}

fn to_plaintext<T: Serialize + ?Sized>(state: &T) -> SoulResult<Vec<u8>> {
    serde_json::to_vec(state).map_err(|e| SoulError::MalformedPayload(e.to_string()))
}

fn from_plaintext<T: DeserializeOwned>(plaintext: &[u8]) -> SoulResult<T> {
    serde_json::from_slice(plaintext).map_err(|e| SoulError::MalformedPayload(e.to_string()))
}
