//! HTTP client for the registry boundary.
//!
//! - `POST /api/chain/commit` with `{"soulAddress", "cid"}` → [`CommitReceipt`]
//! - `GET  /api/chain/last?soulAddress=...` → `{"cid", "ts"}`, 404 when absent

use async_trait::async_trait;
use serde_json::Value;

use super::{CommitReceipt, ReferenceRegistry, RegistryRecord};
use crate::config::ClientConfig;
use crate::error::{SoulError, SoulResult};
use crate::identity::SoulAddress;
use crate::snapshots::Cid;
use crate::transport::{error_message, is_success, read_json};

#[derive(Debug, Clone)]
pub struct HttpRegistry {
    config: ClientConfig,
    client: reqwest::Client,
}

impl HttpRegistry {
    pub fn new(config: ClientConfig) -> Self {
        let client = config.build_http();
        Self { config, client }
    }

    /// Commit and return the full receipt sent back by the server.
    pub async fn commit_with_receipt(
        &self,
        address: &SoulAddress,
        cid: &Cid,
    ) -> SoulResult<CommitReceipt> {
        let response = self
            .client
            .post(self.config.url("/api/chain/commit"))
            .json(&serde_json::json!({ "soulAddress": address, "cid": cid }))
            .send()
            .await?;
        let (status, body) = read_json(response).await;

        if !is_success(status) {
            let message = error_message(&body, || format!("Chain commit failed ({})", status));
            log::warn!("Commit for {} rejected: {} {}", address.short(), status, message);
            return Err(SoulError::CommitFailed { status, message });
        }

        serde_json::from_value(body).map_err(|e| SoulError::CommitFailed {
            status,
            message: format!("unexpected commit response: {e}"),
        })
    }
}

#[async_trait]
impl ReferenceRegistry for HttpRegistry {
    async fn commit(&self, address: &SoulAddress, cid: &Cid) -> SoulResult<RegistryRecord> {
        let receipt = self.commit_with_receipt(address, cid).await?;
        log::debug!("Committed {} -> {}", address.short(), receipt.cid);
        Ok(receipt.record())
    }

    async fn lookup_latest(&self, address: &SoulAddress) -> SoulResult<RegistryRecord> {
        let response = self
            .client
            .get(self.config.url("/api/chain/last"))
            .query(&[("soulAddress", address.as_str())])
            .send()
            .await?;
        let (status, body) = read_json(response).await;

        if status == 404 {
            return Err(SoulError::NotFound(address.to_string()));
        }
        if !is_success(status) {
            let message = error_message(&body, || format!("Chain lookup failed ({})", status));
            return Err(SoulError::LookupFailed { status, message });
        }

        let cid = body.get("cid").and_then(Value::as_str).unwrap_or_default();
        let ts = body.get("ts").and_then(Value::as_i64).ok_or_else(|| SoulError::LookupFailed {
            status,
            message: "record missing ts".to_string(),
        })?;
        Ok(RegistryRecord {
            cid: Cid::parse(cid)?,
            ts,
        })
    }
}
