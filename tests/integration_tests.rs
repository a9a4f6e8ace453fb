//! End-to-end tests over the built router: dispatch, validation envelopes,
//! session round trips, and custom store behavior.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use portico::{
    handler, App, AppConfig, EndpointError, MemoryStore, SessionRecord, SessionStore, StoreError,
    VariableRule,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

async fn get(router: &Router, uri: &str, cookie: Option<&str>) -> (StatusCode, Option<String>, serde_json::Value) {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = builder.body(Body::empty()).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, set_cookie, body)
}

fn counter_app(config: AppConfig) -> App {
    let mut app = App::new(config);
    app.endpoint(
        "counter",
        vec![],
        handler(|_args, session| async move {
            let next = match session.get("counter").and_then(|v| v.as_i64()) {
                Some(n) => n + 1,
                None => 0,
            };
            session.insert("counter", serde_json::json!(next));
            Ok(serde_json::json!(next))
        }),
    )
    .unwrap();
    app
}

#[tokio::test]
async fn dispatches_and_coerces_arguments() {
    let mut app = App::new(AppConfig::new("secret").namespace("query"));
    app.endpoint(
        "hello",
        vec![
            ("name", VariableRule::text()),
            ("age", VariableRule::number()),
        ],
        handler(|args, _session| async move {
            let name = args.text("name").unwrap().to_string();
            let age = args.number("age").unwrap();
            Ok(serde_json::json!(format!("hello, {} ({})", name, age)))
        }),
    )
    .unwrap();
    let router = app.into_router();

    let (status, _, body) = get(&router, "/query/hello?name=Alice&age=7.5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("error").is_none());
    assert_eq!(body["result"], "hello, Alice (7.5)");
}

#[tokio::test]
async fn validation_failures_use_error_envelope_and_skip_handler() {
    let invoked = Arc::new(AtomicBool::new(false));
    let mut app = App::new(AppConfig::new("secret"));

    for (name, rule) in [
        ("wantNumber", VariableRule::number()),
        ("wantArgument", VariableRule::text()),
        ("wantShortArgument", VariableRule::text().max_length(10)),
    ] {
        let flag = invoked.clone();
        app.endpoint(
            name,
            vec![("arg", rule)],
            handler(move |_args, _session| {
                let flag = flag.clone();
                async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok(serde_json::json!("ok"))
                }
            }),
        )
        .unwrap();
    }
    let router = app.into_router();

    let long_arg = "a".repeat(11);
    for uri in [
        "/q/wantNumber?arg=Hello".to_string(),
        "/q/wantArgument".to_string(),
        format!("/q/wantShortArgument?arg={}", long_arg),
    ] {
        let (status, _, body) = get(&router, &uri, None).await;
        // Errors are in-band: HTTP 200 with an error envelope.
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert!(body.get("result").is_none(), "{}", uri);
        let error = body.get("error").expect("error envelope");
        assert!(error["description"].as_str().unwrap().contains("arg"));
        assert!(error["code"].is_i64());
    }
    assert!(!invoked.load(Ordering::SeqCst), "handler must never run");
}

#[tokio::test]
async fn integer_accepts_round_floats_only() {
    let mut app = App::new(AppConfig::new("secret"));
    app.endpoint(
        "take",
        vec![("n", VariableRule::integer())],
        handler(|args, _session| async move {
            Ok(serde_json::json!(args.integer("n").unwrap()))
        }),
    )
    .unwrap();
    let router = app.into_router();

    let (_, _, body) = get(&router, "/q/take?n=3.0", None).await;
    assert_eq!(body["result"], 3);

    let (_, _, body) = get(&router, "/q/take?n=3.5", None).await;
    assert!(body.get("error").is_some());
}

#[tokio::test]
async fn unmatched_paths_fall_through_to_not_found() {
    let router = counter_app(AppConfig::new("secret")).into_router();

    for uri in ["/q/unknown", "/other/counter", "/q", "/q/counter/extra"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn session_counter_survives_across_requests() {
    let router = counter_app(AppConfig::new("secret")).into_router();

    let (status, set_cookie, body) = get(&router, "/q/counter", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], 0);
    let set_cookie = set_cookie.expect("first request must mint a cookie");
    assert!(set_cookie.starts_with("session_id="));
    let token = set_cookie.trim_start_matches("session_id=");
    assert!(portico::verify(token, "secret"));

    let (_, replay_cookie, body) = get(&router, "/q/counter", Some(&set_cookie)).await;
    assert_eq!(body["result"], 1);
    // Resumed session: no fresh cookie.
    assert!(replay_cookie.is_none());

    let (_, _, body) = get(&router, "/q/counter", Some(&set_cookie)).await;
    assert_eq!(body["result"], 2);
}

#[tokio::test]
async fn forged_cookie_starts_a_new_session() {
    let router = counter_app(AppConfig::new("secret")).into_router();

    let forged = "session_id=deadbeef.0000000000000000000000000000000000000000000000000000000000000000";
    let (status, set_cookie, body) = get(&router, "/q/counter", Some(forged)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], 0);
    let minted = set_cookie.expect("forged cookie must be replaced");
    assert_ne!(minted, forged);
}

#[tokio::test]
async fn evicted_session_keeps_its_verified_id() {
    // A validly signed cookie whose record the store no longer has: the
    // request is treated as new but keeps the id; no fresh cookie is minted.
    let cookie = format!("session_id={}", portico::new_session_id("secret"));
    let router = counter_app(AppConfig::new("secret")).into_router();

    let (status, set_cookie, body) = get(&router, "/q/counter", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], 0);
    assert!(set_cookie.is_none());

    let (_, _, body) = get(&router, "/q/counter", Some(&cookie)).await;
    assert_eq!(body["result"], 1);
}

struct CountingStore {
    inner: MemoryStore,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for CountingStore {
    async fn read(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(session_id).await
    }

    async fn write(&self, session_id: &str, record: SessionRecord) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write(session_id, record).await
    }
}

#[tokio::test]
async fn custom_store_read_is_skipped_for_brand_new_sessions() {
    let store = Arc::new(CountingStore::new());
    let router = counter_app(AppConfig::new("secret"))
        .with_store(store.clone())
        .into_router();

    let (_, set_cookie, _) = get(&router, "/q/counter", None).await;
    let cookie = set_cookie.unwrap();
    assert_eq!(store.reads.load(Ordering::SeqCst), 0);
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);

    let (_, _, body) = get(&router, "/q/counter", Some(&cookie)).await;
    assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    assert_eq!(body["result"], 1);
}

#[tokio::test]
async fn empty_sessions_are_never_written() {
    let store = Arc::new(CountingStore::new());
    let mut app = App::new(AppConfig::new("secret"));
    app.endpoint(
        "stateless",
        vec![],
        handler(|_args, _session| async { Ok(serde_json::json!("ok")) }),
    )
    .unwrap();
    let router = app.with_store(store.clone()).into_router();

    let (_, set_cookie, _) = get(&router, "/q/stateless", None).await;
    assert!(set_cookie.is_some());
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn handler_errors_are_enveloped_in_band() {
    let mut app = App::new(AppConfig::new("secret"));
    app.endpoint(
        "fails",
        vec![],
        handler(|_args, _session| async { Err(EndpointError::new("not allowed", 42)) }),
    )
    .unwrap();
    let router = app.into_router();

    let (status, _, body) = get(&router, "/q/fails", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["description"], "not allowed");
    assert_eq!(body["error"]["code"], 42);
}

#[tokio::test]
async fn session_provider_feeds_endpoint_variables() {
    let mut app = counter_app(AppConfig::new("secret"));
    app.endpoint(
        "report",
        vec![("counter", VariableRule::integer().from_session())],
        handler(|args, _session| async move {
            Ok(serde_json::json!(args.integer("counter").unwrap()))
        }),
    )
    .unwrap();
    let router = app.into_router();

    // No session value yet: the variable is missing.
    let (_, set_cookie, body) = get(&router, "/q/report", None).await;
    assert!(body.get("error").is_some());
    let cookie = set_cookie.unwrap();

    // Populate the session, then read it back through the session provider.
    let (_, _, body) = get(&router, "/q/counter", Some(&cookie)).await;
    assert_eq!(body["result"], 0);
    let (_, _, body) = get(&router, "/q/report", Some(&cookie)).await;
    assert_eq!(body["result"], 0);
}
