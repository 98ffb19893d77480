use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use fetchkit::{Client, FetchError, HttpClient, Request, RETRY_COUNT_HEADER, tls_config};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct AppState {
    hits: Arc<AtomicUsize>,
    retry_counts: Arc<Mutex<Vec<String>>>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Status {
    status: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Todo {
    id: u64,
    title: String,
    done: bool,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Keyed {
    key: String,
}

async fn test_ok() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn test_error() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "error creating response" })),
    )
}

async fn auth(headers: HeaderMap) -> impl IntoResponse {
    match headers.get(header::AUTHORIZATION) {
        Some(value) if value == "Bearer secret" => {
            (StatusCode::OK, Json(json!({ "status": "ok" })))
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "unauthorized" })),
        ),
    }
}

async fn malformed_ok() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "{]")
}

async fn malformed_error() -> impl IntoResponse {
    (
        StatusCode::BAD_GATEWAY,
        [(header::CONTENT_TYPE, "application/json")],
        "{]",
    )
}

async fn retry(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let count = headers
        .get(RETRY_COUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    state.retry_counts.lock().unwrap().push(count.clone());
    if count == "2" {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": format!("attempt {count}") })),
        )
    }
}

async fn slow() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_millis(150)).await;
    Json(json!({ "status": "late" }))
}

async fn xml() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/xml")],
        "<struct><key>value</key></struct>",
    )
}

async fn text() -> impl IntoResponse {
    "hello"
}

async fn echo(Json(body): Json<Value>) -> impl IntoResponse {
    (StatusCode::CREATED, Json(body))
}

async fn count(State(state): State<AppState>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "status": "counted" }))
}

async fn echo_headers(headers: HeaderMap) -> impl IntoResponse {
    let seen: HashMap<String, String> = ["content-type", "accept", "x-custom"]
        .into_iter()
        .filter_map(|name| {
            let value = headers.get(name)?.to_str().ok()?;
            Some((name.to_string(), value.to_string()))
        })
        .collect();
    Json(seen)
}

async fn spawn_server() -> (String, AppState) {
    let state = AppState::default();
    let app = Router::new()
        .route("/test", get(test_ok))
        .route("/error", get(test_error))
        .route("/auth", get(auth))
        .route("/malformed/ok", get(malformed_ok))
        .route("/malformed/error", get(malformed_error))
        .route("/retry", get(retry))
        .route("/slow", get(slow))
        .route("/xml", get(xml))
        .route("/text", get(text))
        .route("/echo", post(echo))
        .route("/count", post(count))
        .route("/headers", get(echo_headers))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

#[tokio::test]
async fn test_expected_status_decodes_response() {
    let (base, _) = spawn_server().await;
    let client = Client::default();

    let mut request = Request::new()
        .url(format!("{base}/test"))
        .with_response::<Status>();
    let body = request.send(&client).await.unwrap();

    assert_eq!(body.as_ref(), br#"{"status":"ok"}"#);
    assert_eq!(request.status_code(), 200);
    assert_eq!(request.response().unwrap().status, "ok");
    assert!(request.error_response().is_none());
}

#[tokio::test]
async fn test_unexpected_status_decodes_error() {
    let (base, _) = spawn_server().await;
    let client = Client::default();

    let mut request = Request::new()
        .url(format!("{base}/error"))
        .with_response::<Status>();
    let err = request.send(&client).await.unwrap_err();

    assert!(matches!(
        err,
        FetchError::UnexpectedStatus {
            expected: 200,
            actual: 500,
            ..
        }
    ));
    assert_eq!(
        err.body().unwrap().as_ref(),
        br#"{"error":"error creating response"}"#
    );
    assert_eq!(request.status_code(), 500);
    assert_eq!(request.error_response().unwrap().error, "error creating response");
    assert!(request.response().is_none());
}

#[tokio::test]
async fn test_custom_error_target() {
    let (base, _) = spawn_server().await;
    let client = Client::default();

    let mut request = Request::new()
        .url(format!("{base}/auth"))
        .bearer_auth("wrong")
        .with_error_response::<HashMap<String, String>>();
    let err = request.send(&client).await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(request.error_response().unwrap()["error"], "unauthorized");
}

#[tokio::test]
async fn test_bearer_auth() {
    let (base, _) = spawn_server().await;
    let client = Client::default();

    let mut request = Request::new()
        .url(format!("{base}/auth"))
        .bearer_auth("secret")
        .with_response::<Status>();
    request.send(&client).await.unwrap();
    assert_eq!(request.response().unwrap().status, "ok");
}

#[tokio::test]
async fn test_malformed_body_on_both_paths() {
    let (base, _) = spawn_server().await;
    let client = Client::default();

    let mut request = Request::new()
        .url(format!("{base}/malformed/ok"))
        .with_response::<Status>();
    let err = request.send(&client).await.unwrap_err();
    assert!(matches!(err, FetchError::Decode { .. }));
    assert_eq!(err.body().unwrap().as_ref(), b"{]");
    assert_eq!(request.status_code(), 200);

    // Decode failure wins over the status mismatch.
    let mut request = Request::new().url(format!("{base}/malformed/error"));
    let err = request.send(&client).await.unwrap_err();
    assert!(matches!(err, FetchError::Decode { .. }));
    assert_eq!(err.body().unwrap().as_ref(), b"{]");
    assert_eq!(request.status_code(), 502);
}

#[tokio::test]
async fn test_missing_url() {
    let client = Client::default();
    let mut request = Request::new();
    let err = request.send(&client).await.unwrap_err();
    assert!(matches!(err, FetchError::MissingUrl));
    assert!(err.body().is_none());
}

#[tokio::test]
async fn test_unencodable_body_is_never_sent() {
    let (base, state) = spawn_server().await;
    let client = Client::default();

    let mut request = Request::new()
        .method("POST")
        .url(format!("{base}/count"))
        .body(&json!({ "ratio": 1.0 }))
        .body(&f64::INFINITY);
    let err = request.send(&client).await.unwrap_err();

    assert!(matches!(err, FetchError::Encode(_)));
    assert_eq!(state.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unsupported_scheme() {
    let client = Client::default();
    let mut request = Request::new().url("w://localhost:0");
    let err = request.send(&client).await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn test_invalid_method() {
    let (base, state) = spawn_server().await;
    let client = Client::default();

    let mut request = Request::new().method("💀").url(format!("{base}/count"));
    let err = request.send(&client).await.unwrap_err();
    assert!(matches!(err, FetchError::RequestBuild(_)));
    assert_eq!(state.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Client::default();
    let mut request = Request::new().url(format!("http://{addr}/"));
    let err = request.send(&client).await.unwrap_err();
    assert!(err.is_transport(), "{err:?}");
    assert_eq!(request.status_code(), 0);
}

#[tokio::test]
async fn test_retries_until_success() {
    let (base, state) = spawn_server().await;
    let client = Client::default();

    let mut request = Request::new()
        .url(format!("{base}/retry"))
        .retries(3)
        .with_response::<Status>();
    let body = request.send(&client).await.unwrap();

    assert_eq!(body.as_ref(), br#"{"status":"ok"}"#);
    assert_eq!(*state.retry_counts.lock().unwrap(), vec!["0", "1", "2"]);
    assert_eq!(request.response().unwrap().status, "ok");
    assert!(request.error_response().is_none());
}

#[tokio::test]
async fn test_retries_exhausted() {
    let (base, state) = spawn_server().await;
    let client = Client::default();

    let mut request = Request::new().url(format!("{base}/retry")).retries(2);
    let err = request.send(&client).await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(*state.retry_counts.lock().unwrap(), vec!["0", "1"]);
    assert_eq!(request.error_response().unwrap().error, "attempt 1");
}

#[tokio::test]
async fn test_no_retry_header_without_retries() {
    let (base, state) = spawn_server().await;
    let client = Client::default();

    let mut request = Request::new().url(format!("{base}/retry"));
    request.send(&client).await.unwrap_err();
    assert_eq!(*state.retry_counts.lock().unwrap(), vec![""]);
}

#[tokio::test]
async fn test_client_timeout() {
    let (base, _) = spawn_server().await;
    let client = Client::builder()
        .timeout(Duration::from_millis(50))
        .build();

    let mut request = Request::new().url(format!("{base}/slow"));
    let err = request.send(&client).await.unwrap_err();
    assert!(
        matches!(err, FetchError::DeadlineExceeded(d) if d == Duration::from_millis(50)),
        "{err:?}"
    );
}

#[tokio::test]
async fn test_send_with_timeout() {
    let (base, _) = spawn_server().await;
    let client = Client::default();

    let mut request = Request::new().url(format!("{base}/slow"));
    let err = request
        .send_with_timeout(&client, Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::DeadlineExceeded(_)));

    let mut request = Request::new().url(format!("{base}/test"));
    request
        .send_with_timeout(&client, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(request.status_code(), 200);
}

#[tokio::test]
async fn test_xml_response() {
    let (base, _) = spawn_server().await;
    let client = Client::default();

    let mut request = Request::new()
        .url(format!("{base}/xml"))
        .with_response::<Keyed>();
    request.send(&client).await.unwrap();
    assert_eq!(request.response().unwrap().key, "value");
}

#[tokio::test]
async fn test_unsupported_content_type() {
    let (base, _) = spawn_server().await;
    let client = Client::default();

    let mut request = Request::new().url(format!("{base}/text"));
    let err = request.send(&client).await.unwrap_err();
    match err {
        FetchError::UnsupportedContentType { content_type, body } => {
            assert_eq!(content_type.as_deref(), Some("text/plain; charset=utf-8"));
            assert_eq!(body.as_ref(), b"hello");
        }
        other => panic!("expected unsupported content type, got {other:?}"),
    }
}

#[tokio::test]
async fn test_post_round_trip() {
    let (base, _) = spawn_server().await;
    let client = Client::default();

    let todo = Todo {
        id: 7,
        title: "Buy milk".to_string(),
        done: false,
    };
    let mut request = Request::new()
        .method("POST")
        .url(format!("{base}/echo"))
        .body(&todo)
        .expected_status(201)
        .with_response::<Todo>();
    request.send(&client).await.unwrap();

    assert_eq!(request.status_code(), 201);
    assert_eq!(request.into_response(), Some(todo));
}

#[tokio::test]
async fn test_headers_reach_server() {
    let (base, _) = spawn_server().await;
    let client = Client::default();

    let mut request = Request::new()
        .url(format!("{base}/headers"))
        .header("X-Custom", "1")
        .header("accept", "application/json; q=1")
        .with_response::<HashMap<String, String>>();
    request.send(&client).await.unwrap();

    let seen = request.into_response().unwrap();
    assert_eq!(seen["content-type"], "application/json");
    assert_eq!(seen["accept"], "application/json; q=1");
    assert_eq!(seen["x-custom"], "1");
}

#[tokio::test]
async fn test_tls_client_still_speaks_http() {
    let (base, _) = spawn_server().await;
    let fixtures = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");
    let tls = tls_config(
        &format!("{fixtures}/ca.crt"),
        &format!("{fixtures}/client.crt"),
        &format!("{fixtures}/client.key"),
        false,
    )
    .unwrap();
    let client = Client::builder().tls_config(tls).build();

    let mut request = Request::new().url(format!("{base}/test"));
    request.send(&client).await.unwrap();
    assert_eq!(request.status_code(), 200);
}

#[tokio::test]
async fn test_custom_http_client() {
    let (base, _) = spawn_server().await;
    let http = HttpClient::builder()
        .timeout(Duration::from_millis(50))
        .build();
    let client = Client::builder().http_client(http).build();

    let mut request = Request::new().url(format!("{base}/slow"));
    let err = request.send(&client).await.unwrap_err();
    assert!(matches!(err, FetchError::DeadlineExceeded(_)));
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Captured {
    type Writer = Captured;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn test_logs_go_to_client_logger() {
    let (base, _) = spawn_server().await;
    let captured = Captured::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(captured.clone())
        .with_ansi(false)
        .finish();
    let client = Client::builder().logger(subscriber).build();

    let mut request = Request::new();
    request.send(&client).await.unwrap_err();
    let logs = captured.contents();
    assert!(logs.contains("error creating request"), "{logs}");

    let mut request = Request::new().url(format!("{base}/error"));
    request.send(&client).await.unwrap_err();
    let logs = captured.contents();
    assert!(logs.contains("unexpected status code"), "{logs}");
    assert!(logs.contains("fetch{"), "{logs}");
}
