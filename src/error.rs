//! Error taxonomy for the identity, envelope and snapshot layers.
//!
//! Every public operation returns [`SoulResult`]. Cryptographic and structural
//! failures are surfaced as distinct variants so callers can tell a wrong
//! mnemonic apart from a corrupted payload or a store outage. No variant ever
//! carries the mnemonic or derived key material.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type SoulResult<T> = Result<T, SoulError>;

/// Errors produced by the soulnet core and its HTTP collaborators.
#[derive(Debug, Error)]
pub enum SoulError {
    /// Mnemonic failed validation (word count, unknown word or checksum).
    #[error("Invalid seed phrase")]
    InvalidMnemonic,

    /// The operating system CSPRNG could not supply randomness.
    #[error("Secure randomness unavailable: {0}")]
    Entropy(String),

    /// GCM tag mismatch: wrong mnemonic, or the envelope was tampered with.
    #[error("Envelope authentication failed")]
    AuthenticationFailure,

    /// Envelope version or algorithm is not one this build can open.
    #[error("Unsupported encrypted blob format (v={version}, alg={alg})")]
    UnsupportedFormat { version: u32, alg: String },

    /// Decrypted bytes are not a valid serialized state.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Input to upload, or output of download, is not an envelope.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Soul address is not `0x` followed by 40 lowercase hex characters.
    #[error("Invalid soul address: {0}")]
    InvalidAddress(String),

    /// Content identifier contains characters outside `[A-Za-z0-9_-]`.
    #[error("Invalid content identifier: {0}")]
    InvalidCid(String),

    /// CID or address has no record.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upload failed ({status}): {message}")]
    UploadFailed { status: u16, message: String },

    #[error("Download failed ({status}): {message}")]
    DownloadFailed { status: u16, message: String },

    #[error("Chain commit failed ({status}): {message}")]
    CommitFailed { status: u16, message: String },

    #[error("Chain lookup failed ({status}): {message}")]
    LookupFailed { status: u16, message: String },

    /// Network failure before any HTTP status was received.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Local or file-system storage failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Completion backend returned an error.
    #[error("Chat failed: {0}")]
    Completion(String),

    /// A blocking worker panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(String),
}

impl SoulError {
    /// Whether a caller may reasonably retry the operation that produced this error.
    ///
    /// Only network-boundary failures qualify; cryptographic and structural
    /// failures never do.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::UploadFailed { status, .. }
            | Self::DownloadFailed { status, .. }
            | Self::CommitFailed { status, .. }
            | Self::LookupFailed { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SoulError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<std::io::Error> for SoulError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<rusqlite::Error> for SoulError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<tokio::task::JoinError> for SoulError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_failures_are_retryable() {
        assert!(SoulError::Transport("reset".into()).is_retryable());
        assert!(SoulError::UploadFailed {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!SoulError::CommitFailed {
            status: 400,
            message: "bad".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_crypto_failures_are_not_retryable() {
        assert!(!SoulError::AuthenticationFailure.is_retryable());
        assert!(!SoulError::InvalidMnemonic.is_retryable());
        assert!(!SoulError::MalformedPayload("x".into()).is_retryable());
    }

    #[test]
    fn test_display_is_stable() {
        let err = SoulError::UnsupportedFormat {
            version: 2,
            alg: "AES-128-CBC".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported encrypted blob format (v=2, alg=AES-128-CBC)"
        );
    }
}
