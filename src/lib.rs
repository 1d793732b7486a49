//! # soulnet
//!
//! Portable, encrypted "digital soul" state keyed by a BIP-39 recovery phrase.
//!
//! The phrase yields both a public soul address and the key for an
//! authenticated-encryption envelope. Envelopes go to a content-addressed
//! snapshot store, and a registry maps each address to its most recent CID,
//! so any device holding the phrase can restore the latest state.
//!
//! ```text
//! mnemonic ──► identity (address)
//!     │
//!     └──────► vault (PBKDF2 + AES-256-GCM) ──► snapshots (cid) ──► registry
//! ```

pub mod chat;
pub mod config;
pub mod error;
pub mod identity;
pub mod local;
pub mod mnemonic;
pub mod registry;
pub mod server;
pub mod session;
pub mod snapshots;
pub mod state;
pub mod vault;

mod transport;

pub use error::{SoulError, SoulResult};
pub use identity::{derive_address, SoulAddress};
pub use local::{KeyValueStore, LocalCache};
pub use mnemonic::Mnemonic;
pub use registry::{ReferenceRegistry, RegistryRecord};
pub use session::{Restored, SaveReceipt, SoulSession};
pub use snapshots::{Cid, SnapshotStore};
pub use state::SoulState;
pub use vault::{decrypt, encrypt, Envelope};

/// Crate version reported by `/health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
