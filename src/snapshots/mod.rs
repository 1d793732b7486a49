//! Content-addressed snapshot storage.
//!
//! A snapshot is exactly one [`Envelope`], stored under an opaque [`Cid`]
//! chosen by the store. Snapshots are immutable: new content gets a new CID.
//! Re-uploading identical content is allowed to produce a different CID.
//!
//! Backends:
//! - [`HttpSnapshotStore`] — client for the `/api/snapshots` boundary
//! - [`FsSnapshotStore`] — one JSON file per snapshot, used by the server
//! - [`MemorySnapshotStore`] — process-local, for tests and embedding

pub mod fs;
pub mod http;
pub mod memory;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{SoulError, SoulResult};
use crate::vault::Envelope;

pub use fs::FsSnapshotStore;
pub use http::HttpSnapshotStore;
pub use memory::MemorySnapshotStore;

/// Longest CID accepted at any boundary.
pub const MAX_CID_LEN: usize = 120;

/// Opaque content identifier returned by a snapshot store.
///
/// Restricted to `[A-Za-z0-9_-]` so it can be used as a file name or URL
/// segment without escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cid(String);

impl Cid {
    pub fn parse(candidate: &str) -> SoulResult<Self> {
        let valid = !candidate.is_empty()
            && candidate.len() <= MAX_CID_LEN
            && candidate
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if valid {
            Ok(Self(candidate.to_string()))
        } else {
            Err(SoulError::InvalidCid(candidate.chars().take(48).collect()))
        }
    }

    /// New random identifier: `cid_` followed by 32 hex characters.
    pub fn generate() -> Self {
        Self(format!("cid_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Cid {
    type Err = SoulError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Cid {
    type Error = SoulError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Cid> for String {
    fn from(value: Cid) -> Self {
        value.0
    }
}

/// Storage for encrypted envelopes, addressed by CID.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Store an envelope and return its CID.
    ///
    /// The envelope shape is checked before anything is stored or sent;
    /// failures are [`SoulError::MalformedEnvelope`].
    async fn upload(&self, envelope: &Envelope) -> SoulResult<Cid>;

    /// Fetch the envelope stored under `cid`.
    ///
    /// Fails with [`SoulError::NotFound`] if absent, and with
    /// [`SoulError::MalformedEnvelope`] if the stored content is not an envelope.
    async fn download(&self, cid: &Cid) -> SoulResult<Envelope>;
}
