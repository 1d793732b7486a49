//! HTTP client for the snapshot boundary.
//!
//! - `POST /api/snapshots/upload` with `{"snapshot": <envelope>}` → `{"ok": true, "cid": "..."}`
//! - `GET  /api/snapshots/:cid` → bare envelope (or `{"snapshot": ...}`), 404 when absent

use async_trait::async_trait;
use serde_json::Value;

use super::{Cid, SnapshotStore};
use crate::config::ClientConfig;
use crate::error::{SoulError, SoulResult};
use crate::transport::{error_message, is_success, read_json};
use crate::vault::Envelope;

#[derive(Debug, Clone)]
pub struct HttpSnapshotStore {
    config: ClientConfig,
    client: reqwest::Client,
}

impl HttpSnapshotStore {
    pub fn new(config: ClientConfig) -> Self {
        let client = config.build_http();
        Self { config, client }
    }
}

#[async_trait]
impl SnapshotStore for HttpSnapshotStore {
    async fn upload(&self, envelope: &Envelope) -> SoulResult<Cid> {
        envelope.validate_shape()?;

        let response = self
            .client
            .post(self.config.url("/api/snapshots/upload"))
            .json(&serde_json::json!({ "snapshot": envelope }))
            .send()
            .await?;
        let (status, body) = read_json(response).await;

        if !is_success(status) {
            let message = error_message(&body, || format!("Upload failed ({})", status));
            log::warn!("Snapshot upload rejected: {} {}", status, message);
            return Err(SoulError::UploadFailed { status, message });
        }

        let cid = body
            .get("cid")
            .or_else(|| body.get("id"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| SoulError::UploadFailed {
                status,
                message: "Upload ok, but CID missing".to_string(),
            })?;
        let cid = Cid::parse(cid)?;
        log::debug!("Uploaded snapshot {}", cid);
        Ok(cid)
    }

    async fn download(&self, cid: &Cid) -> SoulResult<Envelope> {
        let response = self
            .client
            .get(self.config.url(&format!("/api/snapshots/{}", cid.as_str())))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let (status, body) = read_json(response).await;

        if status == 404 {
            return Err(SoulError::NotFound(cid.to_string()));
        }
        if !is_success(status) {
            let message = error_message(&body, || format!("Download failed ({})", status));
            return Err(SoulError::DownloadFailed { status, message });
        }

        // Accept both the bare envelope and a `{"snapshot": ...}` wrapper.
        let envelope = match body {
            Value::Object(mut map) if map.contains_key("snapshot") => {
                map.remove("snapshot").unwrap_or(Value::Null)
            }
            other => other,
        };
        Envelope::from_value(envelope)
    }
}
