//! In-process Bot API double shared by the unit tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use {
    axum::{Json, Router, body::Bytes, extract::State, http::Uri, routing::post},
    secrecy::Secret,
    serde_json::{Value, json},
    teloxide::{
        Bot,
        types::{CallbackQuery, Message},
    },
    tokio::sync::oneshot,
};

use crate::config::TelegramGateConfig;

/// Records every call and answers like the Bot API.
///
/// `getChatMember` by handle fails unless `handle_resolves` is set; lookups
/// by numeric id return `member_status`. Responses queued with
/// [`MockTelegramApi::respond`] take precedence over the defaults.
#[derive(Clone)]
pub struct MockTelegramApi {
    requests: Arc<Mutex<Vec<(String, Value)>>>,
    pub member_status: Arc<Mutex<&'static str>>,
    handle_resolves: bool,
    queued: Arc<Mutex<HashMap<String, VecDeque<Value>>>>,
    fail_sends: Arc<Mutex<bool>>,
}

impl MockTelegramApi {
    pub fn new(handle_resolves: bool, member_status: &'static str) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            member_status: Arc::new(Mutex::new(member_status)),
            handle_resolves,
            queued: Arc::new(Mutex::new(HashMap::new())),
            fail_sends: Arc::new(Mutex::new(false)),
        }
    }

    /// Answer the next call to `method` with `response`.
    pub fn respond(&self, method: &str, response: Value) {
        self.queued
            .lock()
            .expect("queued lock")
            .entry(method.to_ascii_lowercase())
            .or_default()
            .push_back(response);
    }

    /// Reject every `sendMessage`, `sendPhoto` and `editMessageText`.
    pub fn fail_sends(&self, fail: bool) {
        *self.fail_sends.lock().expect("fail lock") = fail;
    }

    pub fn calls(&self, method: &str) -> Vec<Value> {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .filter(|(m, _)| m.eq_ignore_ascii_case(method))
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .map(|(m, _)| m.to_ascii_lowercase())
            .collect()
    }

    pub async fn serve(&self) -> MockServer {
        let app = Router::new()
            .route("/{*path}", post(telegram_api_handler))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("serve mock telegram api");
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let api_url = reqwest::Url::parse(&format!("http://{addr}/")).expect("parse api url");
        MockServer {
            bot: Bot::new("test-token").set_api_url(api_url),
            shutdown,
            server,
        }
    }
}

pub struct MockServer {
    pub bot: Bot,
    shutdown: oneshot::Sender<()>,
    server: tokio::task::JoinHandle<()>,
}

impl MockServer {
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        self.server.await.expect("server join");
    }
}

pub fn gate_config() -> TelegramGateConfig {
    TelegramGateConfig {
        token: Secret::new("test-token".to_string()),
        channel_handle: "@news".into(),
        channel_id: Some(-1002408689600),
        banner_files: Vec::new(),
        ..Default::default()
    }
}

fn start_message_json(user_id: u64) -> Value {
    json!({
        "message_id": 1,
        "date": 1,
        "chat": { "id": user_id, "type": "private", "first_name": "Bob" },
        "from": { "id": user_id, "is_bot": false, "first_name": "Bob" },
        "text": "/start",
        "entities": [{ "type": "bot_command", "offset": 0, "length": 6 }]
    })
}

pub fn start_message(user_id: u64) -> Message {
    serde_json::from_value(start_message_json(user_id)).expect("deserialize start message")
}

/// `getUpdates` response carrying one `/start` per user, update ids
/// matching the user ids.
pub fn start_updates(users: &[u64]) -> Value {
    let result: Vec<Value> = users
        .iter()
        .map(|&user| json!({ "update_id": user, "message": start_message_json(user) }))
        .collect();
    json!({ "ok": true, "result": result })
}

pub fn recheck_query(user_id: u64) -> CallbackQuery {
    serde_json::from_value(json!({
        "id": "cb-1",
        "from": { "id": user_id, "is_bot": false, "first_name": "Bob" },
        "chat_instance": "ci-1",
        "data": "check_subscription",
        "message": {
            "message_id": 5,
            "date": 1,
            "chat": { "id": user_id, "type": "private", "first_name": "Bob" },
            "text": "❌ Subscribe to the channel @news."
        }
    }))
    .expect("deserialize callback query")
}

pub fn api_error(code: u16, description: &str) -> Value {
    json!({ "ok": false, "error_code": code, "description": description })
}

pub fn retry_after(secs: u64) -> Value {
    json!({
        "ok": false,
        "error_code": 429,
        "description": format!("Too Many Requests: retry after {secs}"),
        "parameters": { "retry_after": secs }
    })
}

pub fn conflict() -> Value {
    api_error(
        409,
        "Conflict: terminated by other getUpdates request; make sure that only one bot instance is running",
    )
}

fn message_result(chat_id: i64, text: &str) -> Value {
    json!({
        "ok": true,
        "result": {
            "message_id": 5,
            "date": 1,
            "chat": { "id": chat_id, "type": "private", "first_name": "Bob" },
            "text": text
        }
    })
}

async fn telegram_api_handler(
    State(state): State<MockTelegramApi>,
    uri: Uri,
    body: Bytes,
) -> Json<Value> {
    let method = uri
        .path()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state
        .requests
        .lock()
        .expect("lock requests")
        .push((method.clone(), body.clone()));

    let queued = state
        .queued
        .lock()
        .expect("queued lock")
        .get_mut(&method)
        .and_then(VecDeque::pop_front);
    if let Some(response) = queued {
        return Json(response);
    }

    match method.as_str() {
        "getme" => Json(json!({
            "ok": true,
            "result": {
                "id": 1,
                "is_bot": true,
                "first_name": "Gate",
                "username": "gate_bot",
                "can_join_groups": false,
                "can_read_all_group_messages": false,
                "supports_inline_queries": false,
                "can_connect_to_business": false,
                "has_main_web_app": false
            }
        })),
        "getupdates" => Json(json!({ "ok": true, "result": [] })),
        "getchatmember" => {
            if body["chat_id"].is_string() && !state.handle_resolves {
                return Json(api_error(400, "Bad Request: chat not found"));
            }
            let status = *state.member_status.lock().expect("status lock");
            Json(json!({
                "ok": true,
                "result": {
                    "status": status,
                    "user": { "id": body["user_id"], "is_bot": false, "first_name": "Bob" }
                }
            }))
        },
        "sendmessage" | "editmessagetext" | "sendphoto" => {
            if *state.fail_sends.lock().expect("fail lock") {
                return Json(api_error(403, "Forbidden: bot was blocked by the user"));
            }
            let chat_id = body["chat_id"].as_i64().unwrap_or_default();
            let text = body["text"].as_str().unwrap_or_default().to_string();
            Json(message_result(chat_id, &text))
        },
        _ => Json(json!({ "ok": true, "result": true })),
    }
}
