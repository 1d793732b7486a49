//! Conversational completion collaborator.
//!
//! The client sends role-tagged messages plus an optional soul (the decrypted
//! state, as JSON) and gets back one assistant message. The server side
//! prepends a system prompt built from the soul profile and memory and
//! forwards everything to an OpenAI-compatible chat-completions API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ClientConfig, OpenRouterConfig};
use crate::error::{SoulError, SoulResult};
use crate::state::{ChatMessage, Role, SoulState};
use crate::transport::{error_message, is_success, read_json};

/// Reply content used when the backend returns nothing.
pub const EMPTY_REPLY: &str = "(empty response)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl From<Role> for ChatRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Self::User,
            Role::Assistant => Self::Assistant,
        }
    }
}

/// One message on the completion wire (no timestamp).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&ChatMessage> for ChatTurn {
    fn from(message: &ChatMessage) -> Self {
        Self::new(message.role.into(), message.content.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatTurn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soul: Option<Value>,
}

impl ChatRequest {
    /// Request carrying the state's chat log and the state itself as the soul.
    pub fn from_state(state: &SoulState) -> Self {
        let messages = state
            .chat
            .as_ref()
            .map(|chat| chat.messages.iter().map(ChatTurn::from).collect())
            .unwrap_or_default();
        Self {
            messages,
            soul: serde_json::to_value(state).ok(),
        }
    }

    /// Parse a request body, dropping messages without a known role or string content.
    pub fn from_value_lenient(body: &Value) -> Self {
        let messages = body
            .get("messages")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value::<ChatTurn>(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            messages,
            soul: body.get("soul").cloned().filter(|s| !s.is_null()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: ChatTurn,
}

/// System prompt describing the soul persona.
pub fn build_system_prompt(soul: Option<&Value>) -> String {
    let profile = soul.and_then(|s| s.get("profile"));
    let field = |key: &str| profile.and_then(|p| p.get(key)).and_then(Value::as_str);

    let name = field("name").unwrap_or("Digital Soul");
    let tone = field("tone").unwrap_or("calm");
    let bio = field("bio").unwrap_or("");
    let memory: Vec<&str> = soul
        .and_then(|s| s.get("memory"))
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut lines = vec![
        format!("You are \"{}\", the user's Digital Soul.", name),
        format!("Tone: {}.", tone),
    ];
    if !bio.is_empty() {
        lines.push(format!("Bio: {}", bio));
    }
    if !memory.is_empty() {
        lines.push(format!("Memory:\n- {}", memory.join("\n- ")));
    }
    lines.push("Rules:".to_string());
    lines.push("- Stay consistent with the Soul profile and memory.".to_string());
    lines.push("- Be helpful, concise, and natural.".to_string());
    lines.push("- If the user asks for private keys/passwords: refuse.".to_string());
    lines.join("\n")
}

/// Something that turns a conversation into one assistant reply.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> SoulResult<ChatTurn>;
}

/// Client for the `POST /api/chat` boundary.
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    config: ClientConfig,
    client: reqwest::Client,
}

impl HttpChatClient {
    pub fn new(config: ClientConfig) -> Self {
        let client = config.build_http();
        Self { config, client }
    }
}

#[async_trait]
impl CompletionBackend for HttpChatClient {
    async fn complete(&self, request: &ChatRequest) -> SoulResult<ChatTurn> {
        let response = self
            .client
            .post(self.config.url("/api/chat"))
            .json(request)
            .send()
            .await?;
        let (status, body) = read_json(response).await;
        if !is_success(status) {
            return Err(SoulError::Completion(error_message(&body, || {
                format!("Chat failed ({})", status)
            })));
        }
        let reply: ChatReply = serde_json::from_value(body)
            .map_err(|e| SoulError::Completion(format!("unexpected chat response: {e}")))?;
        Ok(reply.message)
    }
}

/// OpenRouter chat-completions backend used by the server.
#[derive(Debug, Clone)]
pub struct OpenRouterBackend {
    config: OpenRouterConfig,
    client: reqwest::Client,
}

impl OpenRouterBackend {
    pub const TEMPERATURE: f64 = 0.7;
    pub const MAX_TOKENS: u32 = 500;

    pub fn new(config: OpenRouterConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// System prompt followed by the caller's messages.
    pub fn conversation(request: &ChatRequest) -> Vec<ChatTurn> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(ChatTurn::new(
            ChatRole::System,
            build_system_prompt(request.soul.as_ref()),
        ));
        messages.extend(request.messages.iter().cloned());
        messages
    }
}

#[async_trait]
impl CompletionBackend for OpenRouterBackend {
    async fn complete(&self, request: &ChatRequest) -> SoulResult<ChatTurn> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .header("HTTP-Referer", &self.config.site_url)
            .header("X-Title", &self.config.app_name)
            .json(&serde_json::json!({
                "model": self.config.model,
                "messages": Self::conversation(request),
                "temperature": Self::TEMPERATURE,
                "max_tokens": Self::MAX_TOKENS,
            }))
            .send()
            .await?;
        let (status, body) = read_json(response).await;

        if !is_success(status) {
            let message = error_message(&body, || format!("OpenRouter error ({})", status));
            log::warn!("Completion backend returned {}: {}", status, message);
            return Err(SoulError::Completion(message));
        }

        let choice = body.get("choices").and_then(|c| c.get(0));
        let content = choice
            .and_then(|c| c.pointer("/message/content"))
            .or_else(|| choice.and_then(|c| c.pointer("/delta/content")))
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim();

        Ok(ChatTurn::new(
            ChatRole::Assistant,
            if content.is_empty() { EMPTY_REPLY } else { content },
        ))
    }
}
