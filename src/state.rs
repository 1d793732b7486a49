//! Versioned application state carried inside an envelope.
//!
//! The vault never inspects these fields; it only sees serialized bytes.

use serde::{Deserialize, Serialize};

/// Version tag written by [`SoulState::new`].
pub const STATE_VERSION: &str = "mvp-1";

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single timestamped chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub ts: i64,
}

/// Chat log persisted alongside the profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatState {
    pub v: u32,
    pub messages: Vec<ChatMessage>,
    #[serde(rename = "updatedAt")]
    pub updated_at: i64,
}

impl ChatState {
    pub fn new(updated_at: i64) -> Self {
        Self {
            v: 1,
            messages: Vec::new(),
            updated_at,
        }
    }

    /// Append a message and bump `updated_at` to its timestamp.
    pub fn push(&mut self, role: Role, content: impl Into<String>, ts: i64) {
        self.messages.push(ChatMessage {
            role,
            content: content.into(),
            ts,
        });
        self.updated_at = ts;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

/// The full user state: profile, long-term memory lines and optional chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoulState {
    pub version: String,
    pub profile: Profile,
    #[serde(default)]
    pub memory: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<ChatState>,
    #[serde(rename = "updatedAt")]
    pub updated_at: i64,
}

impl SoulState {
    /// Fresh state with only a profile name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            profile: Profile {
                name: name.into(),
                bio: None,
                tone: None,
            },
            memory: Vec::new(),
            chat: None,
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn touch(&mut self, ts: i64) {
        self.updated_at = ts;
    }

    /// Chat log, created on first access.
    pub fn chat_mut(&mut self, ts: i64) -> &mut ChatState {
        self.chat.get_or_insert_with(|| ChatState::new(ts))
    }
}
