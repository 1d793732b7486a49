//! Local key-value persistence port.
//!
//! The client keeps three things between runs: the active soul address, the
//! last committed CID, and the last envelope. It also keeps a per-address chat
//! log. None of these are secret. The mnemonic is never written here.
//!
//! The storage itself is injected as a [`KeyValueStore`] so the core stays
//! free of ambient I/O.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::error::{SoulError, SoulResult};
use crate::identity::SoulAddress;
use crate::snapshots::Cid;
use crate::state::{ChatMessage, Role};
use crate::vault::Envelope;

pub const KEY_ACTIVE_SOUL: &str = "soulnet:activeSoulAddress";
pub const KEY_LAST_CID: &str = "soulnet:lastCID";
pub const KEY_LAST_SNAPSHOT: &str = "soulnet:lastEncryptedSnapshot";
pub const CHAT_KEY_PREFIX: &str = "soulnet:chat:";

/// Get/set/remove by string key.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> SoulResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> SoulResult<()>;
    fn remove(&self, key: &str) -> SoulResult<()>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> SoulResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SoulResult<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> SoulResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// SQLite-backed store with a single `kv` table.
pub struct SqliteKeyValueStore {
    conn: Mutex<Connection>,
}

impl SqliteKeyValueStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> SoulResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> SoulResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> SoulResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> SoulResult<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> SoulResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> SoulResult<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// Typed accessors over an injected [`KeyValueStore`].
#[derive(Clone)]
pub struct LocalCache {
    store: Arc<dyn KeyValueStore>,
}

impl LocalCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Cache over a fresh [`MemoryKeyValueStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKeyValueStore::new()))
    }

    pub fn set_active_soul_address(&self, address: &SoulAddress) -> SoulResult<()> {
        self.store.set(KEY_ACTIVE_SOUL, address.as_str())
    }

    /// Cached address, ignoring values that no longer parse.
    pub fn active_soul_address(&self) -> SoulResult<Option<SoulAddress>> {
        Ok(self
            .store
            .get(KEY_ACTIVE_SOUL)?
            .and_then(|raw| SoulAddress::parse(&raw).ok()))
    }

    pub fn set_last_cid(&self, cid: &Cid) -> SoulResult<()> {
        self.store.set(KEY_LAST_CID, cid.as_str())
    }

    pub fn last_cid(&self) -> SoulResult<Option<Cid>> {
        Ok(self
            .store
            .get(KEY_LAST_CID)?
            .and_then(|raw| Cid::parse(&raw).ok()))
    }

    pub fn save_envelope(&self, envelope: &Envelope) -> SoulResult<()> {
        let raw = serde_json::to_string(envelope)
            .map_err(|e| SoulError::Storage(e.to_string()))?;
        self.store.set(KEY_LAST_SNAPSHOT, &raw)
    }

    /// Last cached envelope; a corrupt entry reads as `None`.
    pub fn load_envelope(&self) -> SoulResult<Option<Envelope>> {
        let Some(raw) = self.store.get(KEY_LAST_SNAPSHOT)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(e) => {
                log::warn!("Ignoring corrupt cached snapshot: {}", e);
                Ok(None)
            }
        }
    }

    /// Clear the active address, last CID and cached envelope.
    pub fn wipe(&self) -> SoulResult<()> {
        self.store.remove(KEY_ACTIVE_SOUL)?;
        self.store.remove(KEY_LAST_CID)?;
        self.store.remove(KEY_LAST_SNAPSHOT)
    }

    fn chat_key(address: &SoulAddress) -> String {
        format!("{}{}", CHAT_KEY_PREFIX, address.as_str().to_lowercase())
    }

    /// Chat log for `address`.
    ///
    /// Entries without a valid role or string content are dropped; a missing
    /// timestamp defaults to now. Unparseable data reads as an empty log.
    pub fn load_chat(&self, address: &SoulAddress) -> SoulResult<Vec<ChatMessage>> {
        let Some(raw) = self.store.get(&Self::chat_key(address))? else {
            return Ok(Vec::new());
        };
        let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&raw) else {
            return Ok(Vec::new());
        };

        let now = chrono::Utc::now().timestamp_millis();
        Ok(items
            .iter()
            .filter_map(|item| {
                let role = match item.get("role")?.as_str()? {
                    "user" => Role::User,
                    "assistant" => Role::Assistant,
                    _ => return None,
                };
                let content = item.get("content")?.as_str()?.to_string();
                let ts = item.get("ts").and_then(Value::as_i64).unwrap_or(now);
                Some(ChatMessage { role, content, ts })
            })
            .collect())
    }

    pub fn save_chat(&self, address: &SoulAddress, messages: &[ChatMessage]) -> SoulResult<()> {
        let raw = serde_json::to_string(messages)
            .map_err(|e| SoulError::Storage(e.to_string()))?;
        self.store.set(&Self::chat_key(address), &raw)
    }

    pub fn wipe_chat(&self, address: &SoulAddress) -> SoulResult<()> {
        self.store.remove(&Self::chat_key(address))
    }
}
