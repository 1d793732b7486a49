//! In-process snapshot store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Cid, SnapshotStore};
use crate::error::{SoulError, SoulResult};
use crate::vault::Envelope;

/// Snapshot store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<HashMap<Cid, Envelope>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn upload(&self, envelope: &Envelope) -> SoulResult<Cid> {
        envelope.validate_shape()?;
        let cid = Cid::generate();
        self.snapshots.write().insert(cid.clone(), envelope.clone());
        log::debug!("Stored snapshot {} in memory", cid);
        Ok(cid)
    }

    async fn download(&self, cid: &Cid) -> SoulResult<Envelope> {
        self.snapshots
            .read()
            .get(cid)
            .cloned()
            .ok_or_else(|| SoulError::NotFound(cid.to_string()))
    }
}
