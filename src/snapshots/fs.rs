//! File-system snapshot store: `<dir>/<cid>.json`, one bare envelope per file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use super::{Cid, SnapshotStore};
use crate::error::{SoulError, SoulResult};
use crate::vault::Envelope;

#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    dir: PathBuf,
}

impl FsSnapshotStore {
    /// Store rooted at `dir`. The directory is created on first upload.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, cid: &Cid) -> PathBuf {
        self.dir.join(format!("{}.json", cid.as_str()))
    }
}

#[async_trait]
impl SnapshotStore for FsSnapshotStore {
    async fn upload(&self, envelope: &Envelope) -> SoulResult<Cid> {
        envelope.validate_shape()?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let cid = Cid::generate();
        let body = serde_json::to_string_pretty(envelope)
            .map_err(|e| SoulError::MalformedEnvelope(e.to_string()))?;
        tokio::fs::write(self.path_for(&cid), body).await?;

        log::debug!("Wrote snapshot {} to {}", cid, self.dir.display());
        Ok(cid)
    }

    async fn download(&self, cid: &Cid) -> SoulResult<Envelope> {
        let raw = match tokio::fs::read_to_string(self.path_for(cid)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SoulError::NotFound(cid.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let value: Value = serde_json::from_str(&raw)
            .map_err(|e| SoulError::MalformedEnvelope(e.to_string()))?;
        Envelope::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::CipherProfile;

    fn envelope() -> Envelope {
        Envelope::from_parts(CipherProfile::CURRENT, &[9u8; 16], &[8u8; 12], &[7u8; 48])
    }

    #[tokio::test]
    async fn test_roundtrip_through_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsSnapshotStore::new(tmp.path().join("snapshots"));
        let cid = store.upload(&envelope()).await.unwrap();

        let file = store.dir().join(format!("{}.json", cid));
        assert!(file.exists());
        let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(file).unwrap()).unwrap();
        assert_eq!(on_disk["alg"], "AES-256-GCM");

        assert_eq!(store.download(&cid).await.unwrap(), envelope());
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsSnapshotStore::new(tmp.path());
        let err = store.download(&Cid::parse("cid_missing").unwrap()).await.unwrap_err();
        assert!(matches!(err, SoulError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsSnapshotStore::new(tmp.path());
        std::fs::write(tmp.path().join("cid_bad.json"), r#"{"hello": "world"}"#).unwrap();
        let err = store.download(&Cid::parse("cid_bad").unwrap()).await.unwrap_err();
        assert!(matches!(err, SoulError::MalformedEnvelope(_)));
    }
}
