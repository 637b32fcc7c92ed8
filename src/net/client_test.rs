use super::*;
use crate::net::api::UserApi;
use crate::net::normalize::{GENERIC_FAILURE_MESSAGE, NETWORK_FAILURE_MESSAGE, SERVER_ERROR_MESSAGE};
use crate::net::types::RegisterRequest;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

// =========================================================================
// Stub backend
// =========================================================================

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_error(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_owned());
    }
}

fn backend() -> Router {
    Router::new()
        .route("/api/users/register", post(register_handler))
        .route("/api/users/{id}", get(user_handler))
        .route("/api/echo", any(echo_handler))
        .route("/api/status/{code}", get(status_handler))
        .route("/api/slow", get(slow_handler))
        .route("/api/loop", get(|| async { Redirect::temporary("/api/loop") }))
        .route("/api/html", get(|| async { "<html>maintenance</html>" }))
}

async fn register_handler(Json(body): Json<Value>) -> Response {
    match body.get("username").and_then(Value::as_str).unwrap_or_default() {
        "taken" => StatusCode::CONFLICT.into_response(),
        "bad" => (StatusCode::BAD_REQUEST, Json(json!({ "message": "email format invalid" }))).into_response(),
        "dup" => Json(json!({
            "code": "USER_EXISTS",
            "message": "username already registered",
            "data": null,
            "timestamp": 1_700_000_000_000_i64,
        }))
        .into_response(),
        "quiet" => Json(json!({ "code": 1001, "data": null })).into_response(),
        username => Json(json!({
            "code": "200",
            "message": "ok",
            "data": { "id": 42, "username": username },
            "timestamp": 1_700_000_000_000_i64,
        }))
        .into_response(),
    }
}

async fn user_handler(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "1" => Json(json!({
            "code": 200,
            "message": "ok",
            "data": { "id": 1, "username": "ada", "nickname": "Countess", "level": 3 },
        }))
        .into_response(),
        "2" => Json(json!({ "code": "SUCCESS", "data": "not a user" })).into_response(),
        raw if raw.contains(|c| c == '/' || c == '?') => {
            Json(json!({ "code": 200, "data": { "username": raw } })).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn echo_handler(method: Method, headers: HeaderMap) -> Json<Value> {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(ToOwned::to_owned);
    Json(json!({
        "code": "SUCCESS",
        "message": "",
        "data": { "method": method.as_str(), "content_type": content_type },
    }))
}

async fn status_handler(Path(code): Path<u16>) -> Response {
    StatusCode::from_u16(code).unwrap().into_response()
}

async fn slow_handler() -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(500)).await;
    Json(json!({ "code": 200, "data": "late" }))
}

async fn spawn_backend() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, backend()).await.unwrap();
    });
    format!("http://{addr}/api")
}

async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api")
}

/// Answers one request with headers promising 500 bytes, sends a fragment,
/// then closes the connection.
async fn truncated_body_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0_u8; 4096];
        let _ = socket.read(&mut buf).await;
        let head = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 500\r\n\r\n";
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(br#"{"code":200"#).await.unwrap();
        socket.shutdown().await.ok();
    });
    format!("http://{addr}/api")
}

fn client_for(base_url: &str, timeout_ms: u64) -> (ApiClient, Arc<RecordingNotifier>) {
    let config = ClientConfig::default()
        .with_base_url(base_url)
        .unwrap()
        .with_timeout_ms(timeout_ms);
    let notifier = Arc::new(RecordingNotifier::default());
    let client = ApiClient::with_notifier(&config, notifier.clone()).unwrap();
    (client, notifier)
}

fn register_request(username: &str) -> RegisterRequest {
    RegisterRequest {
        username: username.to_owned(),
        email: format!("{username}@example.test"),
        password: "hunter22".to_owned(),
        phone: "13800000000".to_owned(),
        nickname: "Nick".to_owned(),
    }
}

// =========================================================================
// request interceptor
// =========================================================================

#[test]
fn request_headers_force_json_for_body_methods() {
    for method in [Method::POST, Method::PUT, Method::PATCH] {
        let headers = request_headers(&method);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }
}

#[test]
fn request_headers_leave_other_methods_alone() {
    for method in [Method::GET, Method::DELETE, Method::HEAD, Method::OPTIONS] {
        assert!(request_headers(&method).is_empty());
    }
}

#[tokio::test]
async fn post_without_body_still_sends_json_content_type() {
    let (client, _) = client_for(&spawn_backend().await, 2_000);
    let data: Value = client.request::<Value, Value>(Method::POST, "/echo", None).await.unwrap();
    assert_eq!(data["method"], "POST");
    assert_eq!(data["content_type"], "application/json");
}

#[tokio::test]
async fn put_and_patch_send_json_content_type() {
    let (client, _) = client_for(&spawn_backend().await, 2_000);
    for method in [Method::PUT, Method::PATCH] {
        let data: Value = client.request(method, "/echo", Some(&json!({ "x": 1 }))).await.unwrap();
        assert_eq!(data["content_type"], "application/json");
    }
}

#[tokio::test]
async fn get_and_delete_have_no_content_type() {
    let (client, _) = client_for(&spawn_backend().await, 2_000);
    let data: Value = client.get("/echo").await.unwrap();
    assert_eq!(data["method"], "GET");
    assert_eq!(data["content_type"], Value::Null);

    let data: Value = client.request(Method::DELETE, "/echo", Some(&json!({ "x": 1 }))).await.unwrap();
    assert_eq!(data["content_type"], Value::Null);
}

// =========================================================================
// response interceptor
// =========================================================================

#[tokio::test]
async fn register_success_resolves_with_data() {
    let (client, notifier) = client_for(&spawn_backend().await, 2_000);
    let data = client.register(&register_request("ada")).await.unwrap();
    assert_eq!(data, json!({ "id": 42, "username": "ada" }));
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn business_failure_rejects_and_notifies() {
    let (client, notifier) = client_for(&spawn_backend().await, 2_000);
    let err = client.register(&register_request("dup")).await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Business { code: Some("USER_EXISTS".into()), message: "username already registered".into() }
    );
    assert_eq!(notifier.messages(), vec!["username already registered".to_owned()]);
}

#[tokio::test]
async fn business_failure_without_message_uses_fallback() {
    let (client, notifier) = client_for(&spawn_backend().await, 2_000);
    let err = client.register(&register_request("quiet")).await.unwrap_err();
    assert_eq!(err.message(), GENERIC_FAILURE_MESSAGE);
    assert_eq!(notifier.messages(), vec![GENERIC_FAILURE_MESSAGE.to_owned()]);
}

#[tokio::test]
async fn conflict_without_body_maps_to_duplicate_message() {
    let (client, notifier) = client_for(&spawn_backend().await, 2_000);
    let err = client.register(&register_request("taken")).await.unwrap_err();
    assert_eq!(err, ApiError::Http { status: 409, message: "username or email already exists".into() });
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn http_failure_prefers_body_message() {
    let (client, _) = client_for(&spawn_backend().await, 2_000);
    let err = client.register(&register_request("bad")).await.unwrap_err();
    assert_eq!(err, ApiError::Http { status: 400, message: "email format invalid".into() });
}

#[tokio::test]
async fn http_status_table_applies_to_empty_bodies() {
    let (client, _) = client_for(&spawn_backend().await, 2_000);
    let cases = [
        (401, "unauthorized, please log in again"),
        (403, "access denied"),
        (500, "internal server error"),
        (503, "connection error 503"),
    ];
    for (status, expected) in cases {
        let err = client.get::<Value>(&format!("/status/{status}")).await.unwrap_err();
        assert_eq!(err, ApiError::Http { status, message: expected.to_owned() });
    }
}

#[tokio::test]
async fn non_envelope_success_body_fails_generically() {
    let (client, _) = client_for(&spawn_backend().await, 2_000);
    let err = client.get::<Value>("/html").await.unwrap_err();
    assert_eq!(err.message(), GENERIC_FAILURE_MESSAGE);
}

#[tokio::test]
async fn get_user_info_decodes_user() {
    let (client, _) = client_for(&spawn_backend().await, 2_000);
    let user = client.get_user_info("1").await.unwrap();
    assert_eq!(user.username.as_deref(), Some("ada"));
    assert_eq!(user.nickname.as_deref(), Some("Countess"));
    assert_eq!(user.extra.get("level"), Some(&json!(3)));
}

#[tokio::test]
async fn get_user_info_shape_mismatch_is_decode_error() {
    let (client, notifier) = client_for(&spawn_backend().await, 2_000);
    let err = client.get_user_info("2").await.unwrap_err();
    assert_eq!(err.error_code(), "E_DECODE");
    assert_eq!(notifier.messages(), vec![err.message().to_owned()]);
}

#[tokio::test]
async fn get_user_info_keeps_id_in_one_segment() {
    let (client, _) = client_for(&spawn_backend().await, 2_000);
    for id in ["../admin", "1?x=2"] {
        let user = client.get_user_info(id).await.unwrap();
        assert_eq!(user.username.as_deref(), Some(id));
    }
}

#[test]
fn segment_url_percent_encodes_each_segment() {
    let config = ClientConfig::default().with_base_url("http://127.0.0.1:9/api").unwrap();
    let client = ApiClient::new(&config).unwrap();
    assert_eq!(client.segment_url(&["users", "7"]).unwrap(), "http://127.0.0.1:9/api/users/7");
    assert_eq!(client.segment_url(&["users", "../admin"]).unwrap(), "http://127.0.0.1:9/api/users/..%2Fadmin");
    assert_eq!(client.segment_url(&["users", "1?x=2"]).unwrap(), "http://127.0.0.1:9/api/users/1%3Fx=2");
}

#[tokio::test]
async fn get_user_info_not_found() {
    let (client, _) = client_for(&spawn_backend().await, 2_000);
    let err = client.get_user_info("999").await.unwrap_err();
    assert_eq!(err, ApiError::Http { status: 404, message: "requested resource not found".into() });
}

// =========================================================================
// network failures
// =========================================================================

#[tokio::test]
async fn unreachable_server_is_network_failure_for_any_method() {
    let (client, notifier) = client_for(&unreachable_base_url().await, 2_000);

    let err = client.get_user_info("1").await.unwrap_err();
    assert_eq!(err, ApiError::Network { message: NETWORK_FAILURE_MESSAGE.into() });

    let err = client.register(&register_request("ada")).await.unwrap_err();
    assert_eq!(err, ApiError::Network { message: NETWORK_FAILURE_MESSAGE.into() });

    assert_eq!(notifier.messages(), vec![NETWORK_FAILURE_MESSAGE.to_owned(); 2]);
}

#[tokio::test]
async fn truncated_body_is_network_failure() {
    let (client, notifier) = client_for(&truncated_body_base_url().await, 2_000);
    let err = client.get_user_info("1").await.unwrap_err();
    assert_eq!(err, ApiError::Network { message: NETWORK_FAILURE_MESSAGE.into() });
    assert_eq!(notifier.messages(), vec![NETWORK_FAILURE_MESSAGE.to_owned()]);
}

#[tokio::test]
async fn redirect_loop_falls_back_to_server_error() {
    let (client, notifier) = client_for(&spawn_backend().await, 2_000);
    let err = client.get::<Value>("/loop").await.unwrap_err();
    assert_eq!(err.message(), SERVER_ERROR_MESSAGE);
    assert_eq!(notifier.messages(), vec![SERVER_ERROR_MESSAGE.to_owned()]);
}

#[tokio::test]
async fn timeout_is_network_failure() {
    let (client, _) = client_for(&spawn_backend().await, 100);
    let err = client.get::<Value>("/slow").await.unwrap_err();
    assert_eq!(err.message(), NETWORK_FAILURE_MESSAGE);
}

#[test]
fn base_url_has_no_trailing_slash() {
    let config = ClientConfig::default().with_base_url("http://127.0.0.1:9/api/").unwrap();
    let client = ApiClient::new(&config).unwrap();
    assert_eq!(client.base_url(), "http://127.0.0.1:9/api");
}
