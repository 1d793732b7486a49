//! Client and server wired together over real sockets.

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use super::{serve, AppState};
use crate::chat::{ChatRequest, ChatRole, ChatTurn, CompletionBackend, HttpChatClient, OpenRouterBackend};
use crate::config::{ClientConfig, DataPaths, OpenRouterConfig, ServerConfig};
use crate::error::SoulError;
use crate::local::{LocalCache, SqliteKeyValueStore};
use crate::mnemonic;
use crate::registry::{HttpRegistry, ReferenceRegistry};
use crate::session::{Restored, SoulSession};
use crate::snapshots::{Cid, HttpSnapshotStore, SnapshotStore};
use crate::state::{Role, SoulState};

async fn spawn_server(state: AppState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, state));
    format!("http://{}", addr)
}

fn device(base_url: &str, cache: LocalCache) -> SoulSession {
    let config = ClientConfig::new(base_url).with_timeout_ms(5_000);
    SoulSession::new(
        Arc::new(HttpSnapshotStore::new(config.clone())),
        Arc::new(HttpRegistry::new(config)),
        cache,
    )
}

#[tokio::test]
async fn test_two_devices_share_a_soul_over_http() {
    let tmp = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        data: DataPaths::new(tmp.path()),
        openrouter: None,
    };
    let base_url = spawn_server(AppState::from_config(&config)).await;

    let m = mnemonic::generate().unwrap();
    let mut state = SoulState::new("X");
    state.memory.push("likes tea".to_string());
    state.chat_mut(1).push(Role::User, "hello", 2);
    state.touch(1000);

    let phone_cache =
        LocalCache::new(Arc::new(SqliteKeyValueStore::open(tmp.path().join("phone.db")).unwrap()));
    let receipt = device(&base_url, phone_cache).save(&m, &state).await.unwrap();
    assert!(tmp
        .path()
        .join("snapshots")
        .join(format!("{}.json", receipt.cid))
        .exists());

    let laptop = device(&base_url, LocalCache::in_memory());
    let restored: Restored<SoulState> = laptop.restore(&m).await.unwrap();
    assert_eq!(restored.cid, receipt.cid);
    assert_eq!(restored.ts, receipt.ts);
    assert_eq!(restored.state, state);

    // A different mnemonic has no record.
    let other = mnemonic::generate().unwrap();
    let err = laptop.restore::<SoulState>(&other).await.unwrap_err();
    assert!(matches!(err, SoulError::NotFound(_)));
}

#[tokio::test]
async fn test_wrong_mnemonic_cannot_open_fetched_envelope() {
    let base_url = spawn_server(AppState::in_memory()).await;
    let m = mnemonic::generate().unwrap();
    let session = device(&base_url, LocalCache::in_memory());
    let receipt = session.save(&m, &SoulState::new("X")).await.unwrap();

    let store = HttpSnapshotStore::new(ClientConfig::new(&base_url));
    let envelope = store.download(&receipt.cid).await.unwrap();
    let other = mnemonic::generate().unwrap();
    let err = crate::vault::decrypt::<SoulState>(&other, &envelope)
        .await
        .unwrap_err();
    assert!(matches!(err, SoulError::AuthenticationFailure));
}

#[tokio::test]
async fn test_http_clients_map_server_errors() {
    let base_url = spawn_server(AppState::in_memory()).await;
    let config = ClientConfig::new(&base_url);

    let store = HttpSnapshotStore::new(config.clone());
    let err = store
        .download(&Cid::parse("cid_missing").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, SoulError::NotFound(_)));

    let registry = HttpRegistry::new(config);
    let address = crate::identity::SoulAddress::parse(
        "0x66687aadf862bd776c8fc18b8e9f8e2008971485",
    )
    .unwrap();
    let err = registry.lookup_latest(&address).await.unwrap_err();
    assert!(matches!(err, SoulError::NotFound(_)));

    let receipt = registry
        .commit_with_receipt(&address, &Cid::parse("cid_a").unwrap())
        .await
        .unwrap();
    assert!(receipt.ok);
    assert_eq!(receipt.soul_address, address);
    assert_eq!(registry.lookup_latest(&address).await.unwrap().cid.as_str(), "cid_a");
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = HttpSnapshotStore::new(ClientConfig::new(format!("http://{}", addr)));
    let err = store
        .download(&Cid::parse("cid_x").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, SoulError::Transport(_)));
    assert!(err.is_retryable());
}

#[derive(Clone, Default)]
struct Captured {
    body: Arc<Mutex<Option<Value>>>,
    headers: Arc<Mutex<Option<HeaderMap>>>,
}

/// Stand-in for the OpenRouter chat-completions API.
async fn spawn_upstream(reply: Value, status: u16) -> (String, Captured) {
    let captured = Captured::default();
    let sink = captured.clone();
    let app = Router::new().route(
        "/chat/completions",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let sink = sink.clone();
            let reply = reply.clone();
            async move {
                *sink.body.lock() = Some(body);
                *sink.headers.lock() = Some(headers);
                let status = axum::http::StatusCode::from_u16(status)
                    .unwrap_or(axum::http::StatusCode::OK);
                (status, Json(reply))
            }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });
    (format!("http://{}", addr), captured)
}

fn openrouter(base_url: &str) -> OpenRouterConfig {
    let mut config = OpenRouterConfig::new("sk-test");
    config.base_url = base_url.to_string();
    config
}

#[tokio::test]
async fn test_chat_proxies_through_openrouter_backend() {
    let (upstream, captured) = spawn_upstream(
        json!({ "choices": [{ "message": { "role": "assistant", "content": "  hi there  " } }] }),
        200,
    )
    .await;
    let state = AppState::in_memory()
        .with_chat(Arc::new(OpenRouterBackend::new(openrouter(&upstream))));
    let base_url = spawn_server(state).await;

    let mut soul = SoulState::new("Ada");
    soul.chat_mut(1).push(Role::User, "hello", 2);
    let client = HttpChatClient::new(ClientConfig::new(&base_url));
    let reply = client.complete(&ChatRequest::from_state(&soul)).await.unwrap();
    assert_eq!(reply, ChatTurn::new(ChatRole::Assistant, "hi there"));

    let body = captured.body.lock().clone().unwrap();
    assert_eq!(body["temperature"], 0.7);
    assert_eq!(body["max_tokens"], 500);
    assert_eq!(body["messages"][0]["role"], "system");
    assert!(body["messages"][0]["content"]
        .as_str()
        .unwrap()
        .contains("You are \"Ada\""));
    assert_eq!(body["messages"][1]["content"], "hello");

    let headers = captured.headers.lock().clone().unwrap();
    assert_eq!(headers["authorization"], "Bearer sk-test");
    assert!(headers.contains_key("x-title"));
}

#[tokio::test]
async fn test_chat_empty_choice_and_upstream_error() {
    let (upstream, _) = spawn_upstream(json!({ "choices": [] }), 200).await;
    let backend = OpenRouterBackend::new(openrouter(&upstream));
    let reply = backend.complete(&ChatRequest::default()).await.unwrap();
    assert_eq!(reply.content, crate::chat::EMPTY_REPLY);

    let (upstream, _) =
        spawn_upstream(json!({ "error": { "message": "invalid key" } }), 401).await;
    let state = AppState::in_memory()
        .with_chat(Arc::new(OpenRouterBackend::new(openrouter(&upstream))));
    let base_url = spawn_server(state).await;
    let client = HttpChatClient::new(ClientConfig::new(&base_url));
    match client.complete(&ChatRequest::default()).await {
        Err(SoulError::Completion(message)) => assert_eq!(message, "invalid key"),
        other => panic!("expected completion error, got {:?}", other),
    }
}
