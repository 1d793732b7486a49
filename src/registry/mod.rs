//! Reference registry: the latest snapshot CID committed for each soul address.
//!
//! Commits are last-write-wins. Two devices holding the same mnemonic can
//! commit different CIDs for the same address; the later commit shadows the
//! earlier one and nothing merges them. That is inherent to a non-custodial
//! design, since the registry cannot arbitrate between two holders of the
//! same secret, and is left as is.

pub mod fs;
pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SoulResult;
use crate::identity::SoulAddress;
use crate::snapshots::Cid;

pub use fs::FsRegistry;
pub use http::HttpRegistry;
pub use memory::MemoryRegistry;

/// `{cid, ts}` stored per address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub cid: Cid,
    /// Commit time in milliseconds since the Unix epoch.
    pub ts: i64,
}

impl RegistryRecord {
    /// Record stamped with the current time.
    pub fn now(cid: Cid) -> Self {
        Self {
            cid,
            ts: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Response body of a successful commit at the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReceipt {
    pub ok: bool,
    pub soul_address: SoulAddress,
    pub cid: Cid,
    pub ts: i64,
}

impl CommitReceipt {
    pub fn new(soul_address: SoulAddress, record: RegistryRecord) -> Self {
        Self {
            ok: true,
            soul_address,
            cid: record.cid,
            ts: record.ts,
        }
    }

    pub fn record(&self) -> RegistryRecord {
        RegistryRecord {
            cid: self.cid.clone(),
            ts: self.ts,
        }
    }
}

/// Address → latest CID store.
#[async_trait]
pub trait ReferenceRegistry: Send + Sync {
    /// Point `address` at `cid`, replacing any previous record.
    ///
    /// No concurrency check is made; the last writer wins.
    async fn commit(&self, address: &SoulAddress, cid: &Cid) -> SoulResult<RegistryRecord>;

    /// The most recently committed record, or [`crate::SoulError::NotFound`].
    async fn lookup_latest(&self, address: &SoulAddress) -> SoulResult<RegistryRecord>;
}
