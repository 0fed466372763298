mod test_support;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use line_messaging_module::compute_signature;
use mockito::{Matcher, Server};
use serde_json::{json, Value};
use tower::ServiceExt;
use webhook_module::store::{Document, DocumentStore, MemoryStore, StoreError};
use webhook_module::{build_app, AppState, Collections, EventRouter, RecordStore};

use test_support::{line_client, router, seed_binding, seed_employee, text_event, webhook_body};

const REPLY_PATH: &str = "/v2/bot/message/reply";
const MAX_BODY: usize = 1024 * 1024;

fn app(memory: Arc<MemoryStore>, line_url: &str) -> Router {
    build_app(Arc::new(AppState::new(router(memory, line_url))), MAX_BODY)
}

fn post(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn read_body(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

#[tokio::test]
async fn batch_of_text_events_gets_one_reply_each() {
    let mut server = Server::new_async().await;
    let replies = server
        .mock("POST", REPLY_PATH)
        .match_header("authorization", "Bearer test-channel-token")
        .with_status(200)
        .with_body("{}")
        .expect(3)
        .create_async()
        .await;

    let memory = Arc::new(MemoryStore::new());
    seed_binding(&memory, "U-bound", "10023").await;
    seed_employee(&memory, "10023", "Somchai Jaidee").await;

    let body = webhook_body(vec![
        text_event("U-new", "rt-1", "12345"),
        text_event("U-bound", "rt-2", "profile"),
        text_event("U-bound", "rt-3", "my phone changed"),
        json!({
            "type": "message",
            "replyToken": "rt-4",
            "source": {"type": "user", "userId": "U-bound"},
            "message": {"id": "1", "type": "sticker", "packageId": "446", "stickerId": "1988"}
        }),
    ]);

    let response = app(memory.clone(), &server.url())
        .oneshot(post("/webhook", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload: Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(payload, json!({"status": "ok"}));
    replies.assert_async().await;

    assert_eq!(memory.len("messages").await, 1);
    let bindings = memory.documents("userMap").await;
    assert!(bindings.iter().any(|(id, _)| id == "U-new"));
}

#[tokio::test]
async fn reply_payload_matches_line_api() {
    let mut server = Server::new_async().await;
    let reply = server
        .mock("POST", REPLY_PATH)
        .match_body(Matcher::Json(json!({
            "replyToken": "rt-1",
            "messages": [{"type": "image", "originalContentUrl": "https://placehold.co/1200x780", "previewImageUrl": "https://placehold.co/1200x780"}]
        })))
        .with_status(200)
        .create_async()
        .await;

    let memory = Arc::new(MemoryStore::new());
    seed_binding(&memory, "U1", "10023").await;
    seed_employee(&memory, "10023", "Somchai Jaidee").await;

    let response = app(memory, &server.url())
        .oneshot(post(
            "/api/webhook",
            webhook_body(vec![text_event("U1", "rt-1", "ดูรูป")]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    reply.assert_async().await;
}

#[tokio::test]
async fn failed_reply_turns_batch_into_500() {
    let mut server = Server::new_async().await;
    let ok = server
        .mock("POST", REPLY_PATH)
        .match_body(Matcher::PartialJson(json!({"replyToken": "rt-good"})))
        .with_status(200)
        .create_async()
        .await;
    let rejected = server
        .mock("POST", REPLY_PATH)
        .match_body(Matcher::PartialJson(json!({"replyToken": "rt-expired"})))
        .with_status(400)
        .with_body(r#"{"message":"Invalid reply token"}"#)
        .create_async()
        .await;

    let memory = Arc::new(MemoryStore::new());
    let body = webhook_body(vec![
        text_event("U1", "rt-expired", "hello"),
        text_event("U2", "rt-good", "56789"),
    ]);

    let response = app(memory.clone(), &server.url())
        .oneshot(post("/webhook", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(read_body(response).await.is_empty());
    ok.assert_async().await;
    rejected.assert_async().await;
    // The sibling event still completed its write.
    assert_eq!(memory.len("userMap").await, 1);
}

#[tokio::test]
async fn malformed_body_is_a_server_error() {
    let server = Server::new_async().await;
    let memory = Arc::new(MemoryStore::new());

    for body in ["not json", r#"{"destination":"U"}"#, r#"{"events":{}}"#] {
        let response = app(memory.clone(), &server.url())
            .oneshot(post("/webhook", body.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{body}");
        assert!(read_body(response).await.is_empty());
    }
}

#[tokio::test]
async fn empty_batch_is_ok() {
    let server = Server::new_async().await;
    let response = app(Arc::new(MemoryStore::new()), &server.url())
        .oneshot(post("/webhook", webhook_body(vec![])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn non_post_is_method_not_allowed() {
    let server = Server::new_async().await;
    for method in [Method::GET, Method::PUT, Method::DELETE] {
        let request = Request::builder()
            .method(method.clone())
            .uri("/webhook")
            .body(Body::empty())
            .unwrap();
        let response = app(Arc::new(MemoryStore::new()), &server.url())
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert!(read_body(response).await.is_empty());
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let server = Server::new_async().await;
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app(Arc::new(MemoryStore::new()), &server.url())
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_body(response).await, b"ok");
}

#[tokio::test]
async fn enforced_signature_rejects_tampered_body() {
    let mut server = Server::new_async().await;
    let reply = server
        .mock("POST", REPLY_PATH)
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let memory = Arc::new(MemoryStore::new());
    let state = AppState::new(router(memory, &server.url())).with_signature("channel-secret", true);
    let app = build_app(Arc::new(state), MAX_BODY);

    let body = webhook_body(vec![text_event("U1", "rt-1", "hello")]);
    let signature = compute_signature("channel-secret", body.as_bytes()).unwrap();

    let mut signed = post("/webhook", body.clone());
    signed
        .headers_mut()
        .insert("x-line-signature", signature.parse().unwrap());
    let response = app.clone().oneshot(signed).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut tampered = post("/webhook", body.replace("hello", "hijack"));
    tampered
        .headers_mut()
        .insert("x-line-signature", signature.parse().unwrap());
    let response = app.clone().oneshot(tampered).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(read_body(response).await.is_empty());

    let response = app.oneshot(post("/webhook", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    reply.assert_async().await;
}

#[tokio::test]
async fn unenforced_signature_only_warns() {
    let mut server = Server::new_async().await;
    let reply = server
        .mock("POST", REPLY_PATH)
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let memory = Arc::new(MemoryStore::new());
    let state = AppState::new(router(memory, &server.url())).with_signature("channel-secret", false);
    let mut request = post(
        "/webhook",
        webhook_body(vec![text_event("U1", "rt-1", "hello")]),
    );
    request
        .headers_mut()
        .insert("x-line-signature", "bm90LWEtc2lnbmF0dXJl".parse().unwrap());

    let response = build_app(Arc::new(state), MAX_BODY)
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    reply.assert_async().await;
}

struct UnreachableStore;

#[async_trait]
impl DocumentStore for UnreachableStore {
    async fn get(&self, _collection: &str, _id: &str) -> Result<Option<Document>, StoreError> {
        Err(StoreError::Decode("connection reset".to_string()))
    }

    async fn merge(&self, _collection: &str, _id: &str, _fields: Document) -> Result<(), StoreError> {
        Err(StoreError::Decode("connection reset".to_string()))
    }

    async fn add(&self, _collection: &str, _fields: Document) -> Result<String, StoreError> {
        Err(StoreError::Decode("connection reset".to_string()))
    }
}

#[tokio::test]
async fn store_outage_is_a_server_error_without_replies() {
    let mut server = Server::new_async().await;
    let reply = server
        .mock("POST", REPLY_PATH)
        .with_status(200)
        .expect(0)
        .create_async()
        .await;

    let records = RecordStore::new(Arc::new(UnreachableStore), Collections::default());
    let router = EventRouter::new(records, line_client(&server.url()));
    let app = build_app(Arc::new(AppState::new(router)), MAX_BODY);

    let response = app
        .oneshot(post(
            "/webhook",
            webhook_body(vec![text_event("U1", "rt-1", "12345")]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(read_body(response).await.is_empty());
    reply.assert_async().await;
}
