#![allow(dead_code)]

use std::sync::Arc;

use line_messaging_module::{LineClient, LineClientConfig};
use serde_json::{json, Value};
use webhook_module::store::{Document, FieldValue, MemoryStore};
use webhook_module::{Collections, EventRouter, RecordStore};

pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/test_service_account_key.pem");

pub fn line_client(api_base_url: &str) -> Arc<LineClient> {
    let mut config = LineClientConfig::new("test-channel-token");
    config.api_base_url = api_base_url.to_string();
    Arc::new(LineClient::new(config).expect("line client"))
}

pub fn router(memory: Arc<MemoryStore>, line_api_base_url: &str) -> EventRouter {
    let records = RecordStore::new(memory, Collections::default());
    EventRouter::new(records, line_client(line_api_base_url))
}

pub async fn seed_binding(memory: &MemoryStore, user_id: &str, emp_id: &str) {
    let mut document = Document::new();
    document.insert("lastEmpId".to_string(), FieldValue::from(emp_id));
    memory.insert("userMap", user_id, document).await;
}

pub async fn seed_employee(memory: &MemoryStore, emp_id: &str, name: &str) {
    let mut document = Document::new();
    document.insert("name".to_string(), FieldValue::from(name));
    document.insert("empId".to_string(), FieldValue::from(emp_id));
    document.insert("department".to_string(), FieldValue::from("Production"));
    document.insert("status".to_string(), FieldValue::from("Active"));
    document.insert("safetyPatrolRecord".to_string(), FieldValue::from("Clear"));
    memory.insert("employees", emp_id, document).await;
}

pub fn text_event(user_id: &str, reply_token: &str, text: &str) -> Value {
    json!({
        "type": "message",
        "mode": "active",
        "timestamp": 1717228800000i64,
        "webhookEventId": format!("evt-{reply_token}"),
        "replyToken": reply_token,
        "source": {"type": "user", "userId": user_id},
        "message": {"id": "468789577898262530", "type": "text", "text": text}
    })
}

pub fn webhook_body(events: Vec<Value>) -> String {
    json!({"destination": "Ubot0000000000000000000000000000", "events": events}).to_string()
}
