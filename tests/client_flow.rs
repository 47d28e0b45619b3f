//! End-to-end controller tests against an in-process mock backend
//!
//! The mock speaks the MemoryForge wire protocol (camelCase JSON, bearer
//! auth, `{"message": ...}` error bodies) so these tests exercise the
//! real gateway, session store, and controllers together.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Mutex;

use forgechat::client::{ConfirmOutcome, DeleteKind, DeleteTarget};
use forgechat::{Client, Config};

const TOKEN: &str = "tok-test";

#[derive(Clone)]
struct ChatRow {
    chat_id: String,
    title: String,
    created_at: i64,
    last_message_at: i64,
}

#[derive(Clone)]
struct MsgRow {
    message_id: String,
    chat_id: String,
    content: String,
    is_user: bool,
    timestamp: i64,
    edited: bool,
}

#[derive(Clone)]
struct DocRow {
    document_id: String,
    filename: String,
    chunk_count: usize,
    file_size: u64,
}

#[derive(Default)]
struct Db {
    next_id: usize,
    clock: i64,
    chats: Vec<ChatRow>,
    messages: Vec<MsgRow>,
    documents: Vec<DocRow>,
    send_count: usize,
    upload_count: usize,
    fail_send: bool,
    /// Extra latency for POST /api/chat/message, in milliseconds
    send_delay_ms: u64,
    /// Extra latency for loading a given chat's messages
    load_delay_ms: HashMap<String, u64>,
}

impl Db {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn tick(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }

    fn add_chat(&mut self, title: &str) -> String {
        let chat_id = self.next_id("chat");
        let now = self.tick();
        self.chats.push(ChatRow {
            chat_id: chat_id.clone(),
            title: title.to_string(),
            created_at: now,
            last_message_at: now,
        });
        chat_id
    }

    fn add_message(&mut self, chat_id: &str, content: &str, is_user: bool) -> String {
        let message_id = self.next_id("msg");
        let timestamp = self.tick();
        self.messages.push(MsgRow {
            message_id: message_id.clone(),
            chat_id: chat_id.to_string(),
            content: content.to_string(),
            is_user,
            timestamp,
            edited: false,
        });
        if let Some(chat) = self.chats.iter_mut().find(|c| c.chat_id == chat_id) {
            chat.last_message_at = timestamp;
        }
        message_id
    }

    fn chat_json(&self, chat: &ChatRow) -> Value {
        let count = self
            .messages
            .iter()
            .filter(|m| m.chat_id == chat.chat_id)
            .count();
        json!({
            "chatId": chat.chat_id,
            "title": chat.title,
            "messageCount": count,
            "createdAt": chat.created_at,
            "lastMessageAt": chat.last_message_at,
        })
    }

    fn message_json(msg: &MsgRow) -> Value {
        json!({
            "messageId": msg.message_id,
            "content": msg.content,
            "isUserMessage": msg.is_user,
            "timestamp": msg.timestamp,
            "isEdited": msg.edited,
        })
    }
}

type Shared = Arc<Mutex<Db>>;

fn authed(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {TOKEN}"))
        .unwrap_or(false)
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Unauthorized"})),
    )
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] == "secret" {
        (
            StatusCode::OK,
            Json(json!({
                "userId": "u1",
                "username": body["username"],
                "sessionToken": TOKEN,
            })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid credentials"})),
        )
    }
}

async fn register(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["username"] == "taken" {
        return (
            StatusCode::CONFLICT,
            Json(json!({"message": "Username already exists"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "userId": "u2",
            "username": body["username"],
            "sessionToken": TOKEN,
        })),
    )
}

async fn chat_list(State(db): State<Shared>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authed(&headers) {
        return unauthorized();
    }
    let db = db.lock().await;
    let chats: Vec<Value> = db.chats.iter().map(|c| db.chat_json(c)).collect();
    (StatusCode::OK, Json(Value::Array(chats)))
}

async fn chat_create(
    State(db): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authed(&headers) {
        return unauthorized();
    }
    let mut db = db.lock().await;
    let title = body["title"].as_str().unwrap_or("Untitled").to_string();
    let chat_id = db.add_chat(&title);
    (StatusCode::OK, Json(json!({"chatId": chat_id})))
}

async fn chat_delete(
    State(db): State<Shared>,
    headers: HeaderMap,
    Path(chat_id): Path<String>,
) -> (StatusCode, Json<Value>) {
    if !authed(&headers) {
        return unauthorized();
    }
    let mut db = db.lock().await;
    db.chats.retain(|c| c.chat_id != chat_id);
    db.messages.retain(|m| m.chat_id != chat_id);
    (StatusCode::OK, Json(json!({})))
}

async fn chat_messages(
    State(db): State<Shared>,
    headers: HeaderMap,
    Path(chat_id): Path<String>,
) -> (StatusCode, Json<Value>) {
    if !authed(&headers) {
        return unauthorized();
    }
    let delay = {
        let db = db.lock().await;
        db.load_delay_ms.get(&chat_id).copied().unwrap_or(0)
    };
    if delay > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
    }
    let db = db.lock().await;
    let messages: Vec<Value> = db
        .messages
        .iter()
        .filter(|m| m.chat_id == chat_id)
        .map(Db::message_json)
        .collect();
    (StatusCode::OK, Json(Value::Array(messages)))
}

async fn chat_send(
    State(db): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authed(&headers) {
        return unauthorized();
    }
    let delay = {
        let db = db.lock().await;
        db.send_delay_ms
    };
    if delay > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
    }
    let mut db = db.lock().await;
    if db.fail_send {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "Model backend unavailable"})),
        );
    }
    let chat_id = body["chatId"].as_str().unwrap_or_default().to_string();
    let content = body["content"].as_str().unwrap_or_default().to_string();
    db.send_count += 1;
    db.add_message(&chat_id, &content, true);
    db.add_message(&chat_id, &format!("reply to: {content}"), false);
    (StatusCode::OK, Json(json!({})))
}

async fn message_edit(
    State(db): State<Shared>,
    headers: HeaderMap,
    Path(message_id): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authed(&headers) {
        return unauthorized();
    }
    let mut db = db.lock().await;
    match db.messages.iter_mut().find(|m| m.message_id == message_id) {
        Some(msg) => {
            msg.content = body["content"].as_str().unwrap_or_default().to_string();
            msg.edited = true;
            (StatusCode::OK, Json(json!({})))
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"message": "Message not found"})),
        ),
    }
}

async fn message_delete(
    State(db): State<Shared>,
    headers: HeaderMap,
    Path(message_id): Path<String>,
) -> (StatusCode, Json<Value>) {
    if !authed(&headers) {
        return unauthorized();
    }
    let mut db = db.lock().await;
    db.messages.retain(|m| m.message_id != message_id);
    (StatusCode::OK, Json(json!({})))
}

async fn search(
    State(db): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authed(&headers) {
        return unauthorized();
    }
    let query = body["query"].as_str().unwrap_or_default().to_lowercase();
    let limit = body["limit"].as_u64().unwrap_or(50) as usize;
    let db = db.lock().await;
    let results: Vec<Value> = db
        .messages
        .iter()
        .filter(|m| m.content.to_lowercase().contains(&query))
        .take(limit)
        .map(Db::message_json)
        .collect();
    (StatusCode::OK, Json(json!({"results": results})))
}

async fn documents_list(
    State(db): State<Shared>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !authed(&headers) {
        return unauthorized();
    }
    let db = db.lock().await;
    let docs: Vec<Value> = db
        .documents
        .iter()
        .map(|d| {
            json!({
                "documentId": d.document_id,
                "filename": d.filename,
                "chunkCount": d.chunk_count,
                "uploadedAt": 0,
                "fileSize": d.file_size,
            })
        })
        .collect();
    (StatusCode::OK, Json(Value::Array(docs)))
}

async fn documents_upload(
    State(db): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authed(&headers) {
        return unauthorized();
    }
    let mut db = db.lock().await;
    db.upload_count += 1;
    let content = body["content"].as_str().unwrap_or_default();
    let filename = body["filename"].as_str().unwrap_or_default().to_string();
    let chunk_count = content.len() / 500 + 1;
    let document_id = db.next_id("doc");
    db.documents.push(DocRow {
        document_id: document_id.clone(),
        filename,
        chunk_count,
        file_size: content.len() as u64,
    });
    (
        StatusCode::OK,
        Json(json!({"documentId": document_id, "chunkCount": chunk_count})),
    )
}

async fn documents_delete(
    State(db): State<Shared>,
    headers: HeaderMap,
    Path(document_id): Path<String>,
) -> (StatusCode, Json<Value>) {
    if !authed(&headers) {
        return unauthorized();
    }
    let mut db = db.lock().await;
    db.documents.retain(|d| d.document_id != document_id);
    (StatusCode::OK, Json(json!({})))
}

async fn start_mock() -> (SocketAddr, Shared) {
    let db: Shared = Arc::new(Mutex::new(Db::default()));
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/logout", post(|| async { StatusCode::OK }))
        .route("/api/chat/list", get(chat_list))
        .route("/api/chat/create", post(chat_create))
        .route("/api/chat/:id", delete(chat_delete))
        .route("/api/chat/:id/messages", get(chat_messages))
        .route("/api/chat/message", post(chat_send))
        .route("/api/chat/message/:id", put(message_edit).delete(message_delete))
        .route("/api/chat/search", post(search))
        .route("/api/documents/list", get(documents_list))
        .route("/api/documents/upload", post(documents_upload))
        .route("/api/documents/:id", delete(documents_delete))
        .with_state(Arc::clone(&db));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, db)
}

fn config_for(addr: SocketAddr) -> Config {
    let mut config = Config::default();
    config.server.base_url = format!("http://{addr}");
    config.server.timeout_secs = 5;
    config
}

async fn logged_in_client(addr: SocketAddr) -> (TempDir, Client) {
    let dir = TempDir::new().unwrap();
    let client = Client::new(&config_for(addr), dir.path()).unwrap();
    client.session.login("ada", "secret").await.unwrap();
    (dir, client)
}

#[tokio::test]
async fn login_failure_carries_server_message() {
    let (addr, _db) = start_mock().await;
    let dir = TempDir::new().unwrap();
    let client = Client::new(&config_for(addr), dir.path()).unwrap();

    let err = client.session.login("ada", "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid credentials");
    assert!(!client.session.is_authenticated());
}

#[tokio::test]
async fn session_survives_restart() {
    let (addr, _db) = start_mock().await;
    let (dir, client) = logged_in_client(addr).await;
    drop(client);

    // A new client over the same data dir restores the persisted session
    let client = Client::new(&config_for(addr), dir.path()).unwrap();
    assert!(client.session.is_authenticated());
    assert_eq!(client.session.current().unwrap().username, "ada");
}

#[tokio::test]
async fn register_conflict_surfaces_message() {
    let (addr, _db) = start_mock().await;
    let dir = TempDir::new().unwrap();
    let client = Client::new(&config_for(addr), dir.path()).unwrap();

    let err = client
        .session
        .register("taken", "abcdef", "abcdef", None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Username already exists");
}

#[tokio::test]
async fn chat_list_sorts_and_auto_selects_most_recent() {
    let (addr, db) = start_mock().await;
    {
        let mut db = db.lock().await;
        let first = db.add_chat("older");
        let second = db.add_chat("newer");
        db.add_message(&first, "old traffic", true);
        // Most recent activity in the second chat
        db.add_message(&second, "new traffic", true);
    }
    let (_dir, client) = logged_in_client(addr).await;

    let chats = client.chats.refresh().await.unwrap();
    assert_eq!(chats[0].title, "newer");
    assert_eq!(
        client.state.selected_chat().unwrap(),
        chats[0].chat_id,
        "most recent chat should be auto-selected"
    );
}

#[tokio::test]
async fn create_chat_selects_it() {
    let (addr, db) = start_mock().await;
    {
        db.lock().await.add_chat("existing");
    }
    let (_dir, client) = logged_in_client(addr).await;
    client.chats.refresh().await.unwrap();

    let new_id = client.chats.create(Some("fresh")).await.unwrap();
    assert_eq!(client.state.selected_chat().unwrap(), new_id);
}

#[tokio::test]
async fn send_reconciles_messages_and_chat_summary() {
    let (addr, db) = start_mock().await;
    let chat_id = { db.lock().await.add_chat("work") };
    let (_dir, client) = logged_in_client(addr).await;
    client.chats.refresh().await.unwrap();
    client.messages.load(&chat_id).await.unwrap();

    client.state.set_draft("hello there");
    assert!(client.messages.send(true).await.unwrap());

    // Draft cleared, both sides of the exchange present via reload
    assert_eq!(client.state.draft(), "");
    let messages = client.state.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].is_user_message);
    assert_eq!(messages[1].content, "reply to: hello there");

    // Chat summary reflects the server-side count
    let chats = client.state.chats();
    assert_eq!(chats[0].message_count, 2);
}

#[tokio::test]
async fn failed_send_restores_draft_and_notifies() {
    let (addr, db) = start_mock().await;
    let chat_id = { db.lock().await.add_chat("work") };
    { db.lock().await.fail_send = true };
    let (_dir, client) = logged_in_client(addr).await;
    client.messages.load(&chat_id).await.unwrap();

    client.state.set_draft("precious draft");
    assert!(client.messages.send(false).await.is_err());

    assert_eq!(client.state.draft(), "precious draft");
    assert!(client.state.messages().is_empty());
    assert!(!client.state.active_notices().is_empty());
}

#[tokio::test]
async fn concurrent_sends_collapse_to_one() {
    let (addr, db) = start_mock().await;
    let chat_id = { db.lock().await.add_chat("work") };
    { db.lock().await.send_delay_ms = 150 };
    let (_dir, client) = logged_in_client(addr).await;
    client.messages.load(&chat_id).await.unwrap();

    client.state.set_draft("first");
    let svc = client.messages.clone();
    let first = tokio::spawn(async move { svc.send(false).await });
    // Give the first send time to claim the slot and hit the network
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    client.state.set_draft("second");
    let second = client.messages.send(false).await.unwrap();
    assert!(!second, "second send while one is in flight must be a no-op");
    assert_eq!(client.state.draft(), "second", "no-op must not consume the draft");

    assert!(first.await.unwrap().unwrap());
    assert_eq!(db.lock().await.send_count, 1);
}

#[tokio::test]
async fn send_completion_does_not_hijack_switched_selection() {
    let (addr, db) = start_mock().await;
    let (chat_a, chat_b) = {
        let mut db = db.lock().await;
        let a = db.add_chat("a");
        let b = db.add_chat("b");
        db.add_message(&b, "already in b", true);
        db.send_delay_ms = 200;
        (a, b)
    };
    let (_dir, client) = logged_in_client(addr).await;
    client.messages.load(&chat_a).await.unwrap();
    client.state.set_draft("to chat a");

    let svc = client.messages.clone();
    let send = tokio::spawn(async move { svc.send(false).await });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    // User moves to chat B while the send is still in flight
    client.messages.load(&chat_b).await.unwrap();
    assert!(send.await.unwrap().unwrap());

    assert_eq!(
        client.state.selected_chat().unwrap(),
        chat_b,
        "send completion must not re-select the originating chat"
    );
    let messages = client.state.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "already in b");

    // The summaries still reconciled the server-side change to chat A
    let summary = client
        .state
        .chats()
        .into_iter()
        .find(|c| c.chat_id == chat_a)
        .unwrap();
    assert_eq!(summary.message_count, 2);
}

#[tokio::test]
async fn late_response_for_previous_chat_is_discarded() {
    let (addr, db) = start_mock().await;
    let (slow, fast) = {
        let mut db = db.lock().await;
        let slow = db.add_chat("slow");
        let fast = db.add_chat("fast");
        db.add_message(&slow, "from slow chat", true);
        db.add_message(&fast, "from fast chat", true);
        db.load_delay_ms.insert(slow.clone(), 300);
        (slow, fast)
    };
    let (_dir, client) = logged_in_client(addr).await;

    let svc = client.messages.clone();
    let slow_id = slow.clone();
    let slow_load = tokio::spawn(async move { svc.load(&slow_id).await });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    // User switches to the fast chat before the slow fetch lands
    client.messages.load(&fast).await.unwrap();
    slow_load.await.unwrap().unwrap();

    let messages = client.state.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0].content, "from fast chat",
        "stale response for the slow chat must not overwrite"
    );
    assert_eq!(client.state.selected_chat().unwrap(), fast);
}

#[tokio::test]
async fn edit_reflects_server_authoritative_fields() {
    let (addr, db) = start_mock().await;
    let chat_id = { db.lock().await.add_chat("work") };
    let (_dir, client) = logged_in_client(addr).await;
    client.chats.refresh().await.unwrap();
    client.messages.load(&chat_id).await.unwrap();
    client.state.set_draft("original wording");
    client.messages.send(false).await.unwrap();

    let user_msg = client
        .state
        .messages()
        .into_iter()
        .find(|m| m.is_user_message)
        .unwrap();
    client
        .messages
        .edit(&user_msg.message_id, "better wording")
        .await
        .unwrap();

    let edited = client.state.find_message(&user_msg.message_id).unwrap();
    assert!(edited.is_edited);
    assert_eq!(edited.content, "better wording");
}

#[tokio::test]
async fn confirmed_message_delete_updates_both_collections() {
    let (addr, db) = start_mock().await;
    let chat_id = { db.lock().await.add_chat("work") };
    let (_dir, client) = logged_in_client(addr).await;
    client.chats.refresh().await.unwrap();
    client.messages.load(&chat_id).await.unwrap();
    client.state.set_draft("disposable");
    client.messages.send(false).await.unwrap();
    assert_eq!(client.state.chats()[0].message_count, 2);

    let target = client.state.messages()[0].clone();
    assert!(client.confirm.request(DeleteTarget::new(
        DeleteKind::Message,
        &target.message_id,
        "disposable",
    )));
    assert_eq!(client.confirm.confirm().await, ConfirmOutcome::Deleted);

    assert_eq!(client.state.messages().len(), 1);
    assert_eq!(client.state.chats()[0].message_count, 1);
}

#[tokio::test]
async fn deleting_selected_chat_clears_view() {
    let (addr, db) = start_mock().await;
    let chat_id = {
        let mut db = db.lock().await;
        let id = db.add_chat("only chat");
        db.add_message(&id, "hi", true);
        id
    };
    let (_dir, client) = logged_in_client(addr).await;
    client.chats.refresh().await.unwrap();
    client.messages.load(&chat_id).await.unwrap();
    assert!(!client.state.messages().is_empty());

    client.confirm.request(DeleteTarget::new(DeleteKind::Chat, &chat_id, "only chat"));
    assert_eq!(client.confirm.confirm().await, ConfirmOutcome::Deleted);

    assert!(client.state.selected_chat().is_none());
    assert!(client.state.messages().is_empty());
    assert!(client.state.chats().is_empty());
}

#[tokio::test]
async fn upload_validation_fails_before_any_network_call() {
    let (addr, db) = start_mock().await;
    let (_dir, client) = logged_in_client(addr).await;

    let files = TempDir::new().unwrap();
    let pdf = files.path().join("report.pdf");
    std::fs::write(&pdf, "%PDF-").unwrap();
    assert!(client.documents.upload(&pdf).await.is_err());

    let big = files.path().join("big.md");
    std::fs::write(&big, vec![b'a'; 6 * 1024 * 1024]).unwrap();
    assert!(client.documents.upload(&big).await.is_err());

    assert_eq!(db.lock().await.upload_count, 0);
}

#[tokio::test]
async fn upload_success_grows_collection_by_one() {
    let (addr, _db) = start_mock().await;
    let (_dir, client) = logged_in_client(addr).await;
    client.documents.refresh().await.unwrap();
    assert!(client.state.documents().is_empty());

    let files = TempDir::new().unwrap();
    let notes = files.path().join("notes.md");
    std::fs::write(&notes, "x".repeat(10 * 1024)).unwrap();

    let uploaded = client.documents.upload(&notes).await.unwrap();
    let documents = client.state.documents();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].chunk_count, uploaded.chunk_count);
    assert_eq!(documents[0].filename, "notes.md");
}

#[tokio::test]
async fn search_overlay_replaces_and_restores_view() {
    let (addr, db) = start_mock().await;
    let chat_id = {
        let mut db = db.lock().await;
        let a = db.add_chat("a");
        let b = db.add_chat("b");
        db.add_message(&a, "hello from a", true);
        db.add_message(&a, "unrelated", false);
        db.add_message(&b, "hello from b", true);
        a
    };
    let (_dir, client) = logged_in_client(addr).await;
    client.messages.load(&chat_id).await.unwrap();
    let before = client.state.visible_messages();
    assert_eq!(before.len(), 2);

    client.messages.search("hello").await.unwrap();
    assert!(client.state.in_search());
    let overlay = client.state.visible_messages();
    assert_eq!(overlay.len(), 2, "search is cross-chat");
    assert!(overlay.iter().all(|m| m.content.contains("hello")));

    client.messages.clear_search();
    let after = client.state.visible_messages();
    let ids = |msgs: &[forgechat::api::Message]| {
        msgs.iter().map(|m| m.message_id.clone()).collect::<Vec<_>>()
    };
    assert_eq!(ids(&before), ids(&after), "per-chat cache is untouched by search");
}

#[tokio::test]
async fn logout_gates_further_calls() {
    let (addr, _db) = start_mock().await;
    let (_dir, client) = logged_in_client(addr).await;

    let invalidation = client.session.logout();
    assert!(!client.session.is_authenticated());
    assert!(client.chats.refresh().await.is_err());

    // The remote invalidation settles within a bounded wait
    let task = invalidation.expect("a logged-in session spawns an invalidation");
    tokio::time::timeout(std::time::Duration::from_secs(2), task)
        .await
        .expect("invalidation did not settle in time")
        .unwrap();
}

#[tokio::test]
async fn rejected_credential_expires_the_session() {
    let (addr, _db) = start_mock().await;
    let dir = TempDir::new().unwrap();
    // A persisted record whose token the server no longer accepts
    std::fs::write(
        dir.path().join("session.json"),
        r#"{"userId":"u1","username":"ada","sessionToken":"stale"}"#,
    )
    .unwrap();
    let client = Client::new(&config_for(addr), dir.path()).unwrap();
    assert!(client.session.is_authenticated());

    assert!(client.chats.refresh().await.is_err());
    assert!(!client.session.is_authenticated());
    assert!(client
        .state
        .active_notices()
        .iter()
        .any(|n| n.message.contains("Session expired")));
}
