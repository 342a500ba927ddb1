//! End-to-end tests against the real router, a throwaway SQLite database,
//! and a scripted model provider.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use chrono::TimeDelta;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use socialdesk_core::llm::box_provider::BoxLlmProvider;
use socialdesk_core::llm::provider::{LlmEventStream, LlmProvider};
use socialdesk_types::config::ServerConfig;
use socialdesk_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, MediaKind, StreamEvent, Usage,
};
use socialdesk_types::session::{Provider, SessionUser};

use crate::http::router::build_router;
use crate::state::AppState;

type Recorded = Arc<Mutex<Vec<CompletionRequest>>>;

struct FakeProvider {
    deltas: Vec<&'static str>,
    title: &'static str,
    streams: Recorded,
}

impl LlmProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Ok(CompletionResponse {
            id: "cmpl-1".to_string(),
            content: self.title.to_string(),
            model: request.model.clone(),
            usage: Usage::default(),
        })
    }

    fn stream(&self, request: CompletionRequest) -> LlmEventStream {
        self.streams.lock().unwrap().push(request);
        let mut events = vec![Ok(StreamEvent::Connected)];
        events.extend(self.deltas.iter().map(|text| {
            Ok(StreamEvent::TextDelta {
                text: text.to_string(),
            })
        }));
        events.push(Ok(StreamEvent::Model {
            name: "fake-model".to_string(),
        }));
        events.push(Ok(StreamEvent::Done));
        Box::pin(futures_util::stream::iter(events))
    }
}

struct TestApp {
    router: Router,
    state: AppState,
    streams: Recorded,
    _dir: TempDir,
}

async fn app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ServerConfig::default();
    config.chat.debounce_ms = 0;

    let streams = Recorded::default();
    let provider = FakeProvider {
        deltas: vec!["Hello", " there"],
        title: "\"Friendly Greeting.\"",
        streams: streams.clone(),
    };
    let state = AppState::with_provider(
        dir.path().to_path_buf(),
        config,
        BoxLlmProvider::new(provider),
        None,
    )
    .await
    .unwrap();

    TestApp {
        router: build_router(state.clone()),
        state,
        streams,
        _dir: dir,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn login(&self, id: &str, name: &str) -> String {
        let user = SessionUser {
            id: id.to_string(),
            provider_id: id.trim_start_matches("google_").to_string(),
            email: format!("{id}@example.com"),
            name: name.to_string(),
            picture: None,
            provider: Provider::Google,
        };
        let sid = self.state.sessions.create(user, TimeDelta::days(1)).await.unwrap();
        format!("session_id={sid}")
    }
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, cookie: Option<&str>, content_type: &str, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, content_type);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(body.into()).unwrap()
}

fn delete(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header(COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn percent_encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

fn chat_form(prompt: &str, attachments: Option<&str>) -> String {
    let mut body = format!("prompt={}", percent_encode(prompt));
    if let Some(attachments) = attachments {
        body.push_str(&format!("&attachments={}", percent_encode(attachments)));
    }
    body
}

const FORM: &str = "application/x-www-form-urlencoded";

async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

fn json_lines(text: &str) -> Vec<Value> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

/// `name=value` of the named cookie in the response's Set-Cookie headers.
fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

async fn new_conversation_id(app: &TestApp) -> String {
    let response = app
        .send(post("/chat/new-conversation", None, "application/json", Body::empty()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["conversation_id"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Run one anonymous turn and return the anonymous cookie it was run under.
async fn anonymous_turn(app: &TestApp, conversation_id: &str, cookie: Option<&str>) -> String {
    let response = app
        .send(post(
            &format!("/chat/{conversation_id}"),
            cookie,
            FORM,
            chat_form("hello", None),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let anon = set_cookie(&response, "anonymous_user_id").unwrap();
    body_text(response).await;
    anon
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let response = app.send(get("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_new_conversation_is_not_persisted() {
    let app = app().await;
    let id = new_conversation_id(&app).await;
    assert!(uuid::Uuid::parse_str(&id).is_ok());
    assert!(!app.state.conversations.exists(&id).await.unwrap());
}

#[tokio::test]
async fn test_first_turn_streams_and_persists() {
    let app = app().await;
    let id = new_conversation_id(&app).await;

    let response = app
        .send(post(&format!("/chat/{id}"), None, FORM, chat_form("hello", None)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let anon = set_cookie(&response, "anonymous_user_id").unwrap();
    assert!(
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .any(|v| v.to_str().unwrap().contains("HttpOnly; SameSite=Lax"))
    );

    let lines = json_lines(&body_text(response).await);
    assert_eq!(lines[0]["role"], "user");
    assert_eq!(lines[0]["content"], "hello");
    let last = lines.last().unwrap();
    assert_eq!(last["role"], "model");
    assert_eq!(last["content"], "Hello there");

    let response = app.send(get("/chat/conversations", Some(&anon))).await;
    let listed = body_json(response).await;
    let first = &listed["conversations"][0];
    assert_eq!(first["id"], id.as_str());
    assert_eq!(first["title"], "Friendly Greeting");
    assert_eq!(first["message_count"], 1);

    let response = app.send(get(&format!("/chat/{id}"), Some(&anon))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let history = json_lines(&body_text(response).await);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["content"], "hello");
    assert_eq!(history[1]["content"], "Hello there");
}

#[tokio::test]
async fn test_second_turn_replays_history() {
    let app = app().await;
    let id = new_conversation_id(&app).await;
    let anon = anonymous_turn(&app, &id, None).await;
    anonymous_turn(&app, &id, Some(&anon)).await;

    let streams = app.streams.lock().unwrap();
    assert_eq!(streams.len(), 2);
    // prior user + prior model + current user
    assert_eq!(streams[1].messages.len(), 3);
}

#[tokio::test]
async fn test_foreign_conversation_is_not_found() {
    let app = app().await;
    let id = new_conversation_id(&app).await;
    anonymous_turn(&app, &id, None).await;

    let stranger = format!("anonymous_user_id={}", socialdesk_types::user::new_anonymous_id());
    let response = app.send(get(&format!("/chat/{id}"), Some(&stranger))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["errors"][0]["code"], "CONVERSATION_NOT_FOUND");

    let response = app
        .send(post(&format!("/chat/{id}"), Some(&stranger), FORM, chat_form("hi", None)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.send(get("/chat/unknown-id", Some(&stranger))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_migrate_after_login() {
    let app = app().await;
    let id = new_conversation_id(&app).await;
    let anon = anonymous_turn(&app, &id, None).await;

    let session = app.login("google_1", "Ada Lovelace").await;
    let both = format!("{session}; {anon}");
    let response = app
        .send(post("/chat/migrate-conversations", Some(&both), FORM, Body::empty()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response, "anonymous_user_id").is_some());
    let body = body_json(response).await;
    assert_eq!(body["migrated_conversations"], 1);
    assert_eq!(body["user_id"], "google_1");

    let mine = body_json(app.send(get("/chat/conversations", Some(&session))).await).await;
    assert_eq!(mine["conversations"][0]["id"], id.as_str());

    let theirs = body_json(app.send(get("/chat/conversations", Some(&anon))).await).await;
    assert_eq!(theirs["conversations"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_migrate_requires_session() {
    let app = app().await;
    let anon = format!("anonymous_user_id={}", socialdesk_types::user::new_anonymous_id());
    let response = app
        .send(post("/chat/migrate-conversations", Some(&anon), FORM, Body::empty()))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_migrate_without_anonymous_cookie() {
    let app = app().await;
    let session = app.login("google_1", "Ada").await;
    let response = app
        .send(post("/chat/migrate-conversations", Some(&session), FORM, Body::empty()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["migrated_conversations"], 0);
}

#[tokio::test]
async fn test_unsupported_attachment_is_dropped() {
    let app = app().await;
    let id = new_conversation_id(&app).await;
    let attachments = r#"[
        {"url": "https://cdn.example.com/clip.mp4", "file_type": "video/mp4", "friendly_name": "clip"},
        {"url": "https://cdn.example.com/logo.png", "file_type": "image/png", "friendly_name": "logo"}
    ]"#;

    let response = app
        .send(post(
            &format!("/chat/{id}"),
            None,
            FORM,
            chat_form("caption this", Some(attachments)),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_text(response).await;

    let streams = app.streams.lock().unwrap();
    let user = streams[0].messages.last().unwrap();
    assert_eq!(user.media.len(), 1);
    assert_eq!(user.media[0].kind, MediaKind::Image);
}

#[tokio::test]
async fn test_multipart_form() {
    let app = app().await;
    let id = new_conversation_id(&app).await;
    let boundary = "XyZboundary";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"prompt\"\r\n\r\nhello from multipart\r\n--{boundary}--\r\n"
    );

    let response = app
        .send(post(
            &format!("/chat/{id}"),
            None,
            &format!("multipart/form-data; boundary={boundary}"),
            body,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let lines = json_lines(&body_text(response).await);
    assert_eq!(lines[0]["content"], "hello from multipart");
}

#[tokio::test]
async fn test_prompt_validation() {
    let app = app().await;
    let id = new_conversation_id(&app).await;

    let response = app
        .send(post(&format!("/chat/{id}"), None, FORM, chat_form("   ", None)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(post(&format!("/chat/{id}"), None, FORM, "attachments=%5B%5D"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!app.state.conversations.exists(&id).await.unwrap());
}

#[tokio::test]
async fn test_me_for_anonymous_and_authenticated() {
    let app = app().await;

    let response = app.send(get("/me", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response, "anonymous_user_id").is_some());
    let body = body_json(response).await;
    assert!(body["username"].as_str().unwrap().starts_with("Anonymous-"));

    let session = app.login("google_9", "Grace Hopper").await;
    let response = app.send(get("/me", Some(&session))).await;
    assert!(set_cookie(&response, "anonymous_user_id").is_none());
    let body = body_json(response).await;
    assert_eq!(body["id"], "google_9");
    assert_eq!(body["username"], "Grace");
}

#[tokio::test]
async fn test_auth_session_lifecycle() {
    let app = app().await;

    let status = body_json(app.send(get("/auth/status", None)).await).await;
    assert_eq!(status["authenticated"], false);

    let session = app.login("google_3", "Alan Turing").await;
    let status = body_json(app.send(get("/auth/status", Some(&session))).await).await;
    assert_eq!(status["authenticated"], true);
    assert_eq!(status["user"]["email"], "google_3@example.com");

    let response = app
        .send(post("/auth/refresh", Some(&session), FORM, Body::empty()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response, "session_id").is_some());

    let response = app
        .send(post("/auth/logout", Some(&session), FORM, Body::empty()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(set_cookie(&response, "session_id").as_deref(), Some("session_id="));

    let response = app.send(get("/auth/me", Some(&session))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_business_profile_flow() {
    let app = app().await;

    let anon = format!("anonymous_user_id={}", socialdesk_types::user::new_anonymous_id());
    let response = app.send(get("/business", Some(&anon))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let session = app.login("google_5", "Rosalind Franklin").await;
    let response = app.send(get("/business", Some(&session))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await.is_null());

    let response = app
        .send(post(
            "/business",
            Some(&session),
            "application/json",
            r#"{"name": "Crumbs Bakery", "url": "https://crumbs.example", "description": "Sourdough"}"#,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["name"], "Crumbs Bakery");

    // The profile feeds the system prompt of the next turn.
    let id = new_conversation_id(&app).await;
    let response = app
        .send(post(&format!("/chat/{id}"), Some(&session), FORM, chat_form("ideas?", None)))
        .await;
    body_text(response).await;
    {
        let streams = app.streams.lock().unwrap();
        let system = streams[0].system.as_deref().unwrap();
        assert!(system.contains("Business Name: Crumbs Bakery"));
    }

    let response = app.send(delete("/business", &session)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.send(delete("/business", &session)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
