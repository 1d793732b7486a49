//! In-process registry.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{ReferenceRegistry, RegistryRecord};
use crate::error::{SoulError, SoulResult};
use crate::identity::SoulAddress;
use crate::snapshots::Cid;

/// Registry backed by a concurrent map; keeps only the latest record per address.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    records: DashMap<SoulAddress, RegistryRecord>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReferenceRegistry for MemoryRegistry {
    async fn commit(&self, address: &SoulAddress, cid: &Cid) -> SoulResult<RegistryRecord> {
        let record = RegistryRecord::now(cid.clone());
        self.records.insert(address.clone(), record.clone());
        log::debug!("Committed {} -> {}", address.short(), cid);
        Ok(record)
    }

    async fn lookup_latest(&self, address: &SoulAddress) -> SoulResult<RegistryRecord> {
        self.records
            .get(address)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SoulError::NotFound(address.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn addr(n: u8) -> SoulAddress {
        SoulAddress::parse(&format!("0x{}", hex::encode([n; 20]))).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_without_commit_is_not_found() {
        let registry = MemoryRegistry::new();
        assert!(matches!(
            registry.lookup_latest(&addr(1)).await,
            Err(SoulError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let registry = MemoryRegistry::new();
        let a = Cid::parse("cid_a").unwrap();
        let b = Cid::parse("cid_b").unwrap();
        registry.commit(&addr(1), &a).await.unwrap();
        registry.commit(&addr(1), &b).await.unwrap();
        assert_eq!(registry.lookup_latest(&addr(1)).await.unwrap().cid, b);
    }

    #[tokio::test]
    async fn test_addresses_are_independent() {
        let registry = MemoryRegistry::new();
        let a = Cid::parse("cid_a").unwrap();
        registry.commit(&addr(1), &a).await.unwrap();
        assert!(registry.lookup_latest(&addr(2)).await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_commits_leave_one_winner() {
        let registry = Arc::new(MemoryRegistry::new());
        let cids: Vec<Cid> = (0..16).map(|i| Cid::parse(&format!("cid_{i}")).unwrap()).collect();

        let handles: Vec<_> = cids
            .iter()
            .cloned()
            .map(|cid| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.commit(&addr(7), &cid).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let latest = registry.lookup_latest(&addr(7)).await.unwrap();
        assert!(cids.contains(&latest.cid));
    }
}
