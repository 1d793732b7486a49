//! Save / restore orchestration across the vault, snapshot store and registry.
//!
//! ```text
//! save:    state --encrypt--> envelope --upload--> cid --commit(address)--> registry
//! restore: address --lookup--> cid --download--> envelope --decrypt--> state
//! ```
//!
//! The session never stores the mnemonic; every operation takes it as an
//! argument and drops it when done. No retries happen here. An abandoned
//! `save` may or may not have reached the store or registry, and is safe to
//! repeat with fresh content.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::SoulResult;
use crate::identity::{derive_address, SoulAddress};
use crate::local::LocalCache;
use crate::registry::ReferenceRegistry;
use crate::snapshots::{Cid, SnapshotStore};
use crate::vault::{self, Envelope};

/// Outcome of [`SoulSession::save`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReceipt {
    pub soul_address: SoulAddress,
    pub cid: Cid,
    pub ts: i64,
}

/// State recovered by [`SoulSession::restore`], with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Restored<T> {
    pub state: T,
    pub cid: Cid,
    pub ts: i64,
}

/// Client-side orchestrator with injected store, registry and local cache.
#[derive(Clone)]
pub struct SoulSession {
    snapshots: Arc<dyn SnapshotStore>,
    registry: Arc<dyn ReferenceRegistry>,
    cache: LocalCache,
}

impl SoulSession {
    pub fn new(
        snapshots: Arc<dyn SnapshotStore>,
        registry: Arc<dyn ReferenceRegistry>,
        cache: LocalCache,
    ) -> Self {
        Self {
            snapshots,
            registry,
            cache,
        }
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// Derive the address for `mnemonic` and remember it as the active soul.
    pub fn identify(&self, mnemonic: &str) -> SoulResult<SoulAddress> {
        let address = derive_address(mnemonic)?;
        self.cache.set_active_soul_address(&address)?;
        Ok(address)
    }

    /// Encrypt, upload and commit `state` under the mnemonic's address.
    pub async fn save<T: Serialize + ?Sized>(
        &self,
        mnemonic: &str,
        state: &T,
    ) -> SoulResult<SaveReceipt> {
        let address = self.identify(mnemonic)?;

        let envelope = vault::encrypt(mnemonic, state).await?;
        self.cache.save_envelope(&envelope)?;

        let cid = self.snapshots.upload(&envelope).await?;
        let record = self.registry.commit(&address, &cid).await?;
        self.cache.set_last_cid(&record.cid)?;

        log::info!("Saved snapshot {} for {}", record.cid, address.short());
        Ok(SaveReceipt {
            soul_address: address,
            cid: record.cid,
            ts: record.ts,
        })
    }

    /// Fetch and decrypt the latest committed state for the mnemonic's address.
    pub async fn restore<T: DeserializeOwned>(&self, mnemonic: &str) -> SoulResult<Restored<T>> {
        let address = self.identify(mnemonic)?;

        let record = self.registry.lookup_latest(&address).await?;
        let envelope = self.snapshots.download(&record.cid).await?;
        let state = vault::decrypt(mnemonic, &envelope).await?;

        self.cache.save_envelope(&envelope)?;
        self.cache.set_last_cid(&record.cid)?;

        log::info!("Restored snapshot {} for {}", record.cid, address.short());
        Ok(Restored {
            state,
            cid: record.cid,
            ts: record.ts,
        })
    }

    /// Decrypt the locally cached envelope without touching the network.
    pub async fn restore_cached<T: DeserializeOwned>(&self, mnemonic: &str) -> SoulResult<Option<T>> {
        let Some(envelope) = self.cache.load_envelope()? else {
            return Ok(None);
        };
        vault::decrypt(mnemonic, &envelope).await.map(Some)
    }

    /// Last envelope this session saved or restored.
    pub fn cached_envelope(&self) -> SoulResult<Option<Envelope>> {
        self.cache.load_envelope()
    }

    /// Forget the active address, last CID and cached envelope.
    pub fn wipe(&self) -> SoulResult<()> {
        self.cache.wipe()
    }
}
