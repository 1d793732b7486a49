//! File-system registry: `<dir>/<address>.json` holding `{cid, ts}`.
//!
//! Only strictly parsed addresses reach this layer, so the address is safe
//! to use as a file name. Writes go through a temp file and a rename so a
//! reader never sees a half-written record.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{ReferenceRegistry, RegistryRecord};
use crate::error::{SoulError, SoulResult};
use crate::identity::SoulAddress;
use crate::snapshots::Cid;

#[derive(Debug, Clone)]
pub struct FsRegistry {
    dir: PathBuf,
}

impl FsRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, address: &SoulAddress) -> PathBuf {
        self.dir.join(format!("{}.json", address.as_str()))
    }
}

#[async_trait]
impl ReferenceRegistry for FsRegistry {
    async fn commit(&self, address: &SoulAddress, cid: &Cid) -> SoulResult<RegistryRecord> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let record = RegistryRecord::now(cid.clone());
        let body = serde_json::to_string_pretty(&record)
            .map_err(|e| SoulError::Storage(e.to_string()))?;

        let tmp = self.dir.join(format!(
            ".{}.{}.tmp",
            address.as_str(),
            uuid::Uuid::new_v4().simple()
        ));
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, self.path_for(address)).await?;

        log::debug!("Committed {} -> {}", address.short(), cid);
        Ok(record)
    }

    async fn lookup_latest(&self, address: &SoulAddress) -> SoulResult<RegistryRecord> {
        let raw = match tokio::fs::read_to_string(self.path_for(address)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SoulError::NotFound(address.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&raw).map_err(|e| SoulError::Storage(format!("corrupt record: {e}")))
    }
}
