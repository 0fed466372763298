use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::{validate_document_id, Document, DocumentStore, FieldValue, StoreError};
use crate::google_auth::GoogleAuth;

pub const DEFAULT_FIRESTORE_API_BASE_URL: &str = "https://firestore.googleapis.com";

const DEFAULT_DATABASE_ID: &str = "(default)";

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub database_id: String,
    /// `https://firestore.googleapis.com`, or `http://host:port` for the emulator
    pub api_base_url: String,
    pub timeout: Duration,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database_id: DEFAULT_DATABASE_ID.to_string(),
            api_base_url: DEFAULT_FIRESTORE_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Cloud Firestore over the v1 REST API.
#[derive(Debug, Clone)]
pub struct FirestoreStore {
    config: FirestoreConfig,
    client: Client,
    auth: GoogleAuth,
}

impl FirestoreStore {
    pub fn new(config: FirestoreConfig, auth: GoogleAuth) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config,
            client,
            auth,
        })
    }

    fn documents_root(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/{}/documents",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.project_id,
            self.config.database_id,
        )
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/{}",
            self.documents_root(),
            urlencoding::encode(collection)
        )
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(collection),
            urlencoding::encode(id)
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let token = self.auth.access_token().await?;
        Ok(request.bearer_auth(token).send().await?)
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        validate_document_id(id)?;
        let url = self.document_url(collection, id);
        debug!("firestore get {}/{}", collection, id);

        let response = self.send(self.client.get(&url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response).await?;
        let document: FirestoreDocument = response
            .json()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))?;
        Ok(Some(decode_fields(&document.fields)))
    }

    async fn merge(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        validate_document_id(id)?;
        if fields.is_empty() {
            return Ok(());
        }
        let url = self.document_url(collection, id);
        debug!("firestore merge {}/{} fields={:?}", collection, id, fields.keys());

        // The update mask limits the write to these fields, so the PATCH
        // creates missing documents and leaves other fields untouched.
        let mask: Vec<(&str, &str)> = fields
            .keys()
            .map(|name| ("updateMask.fieldPaths", name.as_str()))
            .collect();
        let request = self
            .client
            .patch(&url)
            .query(&mask)
            .json(&encode_document(&fields));

        let response = self.send(request).await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn add(&self, collection: &str, fields: Document) -> Result<String, StoreError> {
        let url = self.collection_url(collection);
        debug!("firestore add {}", collection);

        let request = self.client.post(&url).json(&encode_document(&fields));
        let response = ensure_success(self.send(request).await?).await?;
        let document: FirestoreDocument = response
            .json()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))?;

        document
            .name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| StoreError::Decode(format!("unexpected document name: {}", document.name)))
    }
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

async fn ensure_success(response: Response) -> Result<Response, StoreError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status { status, body })
}

fn encode_document(fields: &Document) -> Value {
    let encoded: Map<String, Value> = fields
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect();
    json!({ "fields": encoded })
}

fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => json!({ "nullValue": null }),
        FieldValue::Bool(value) => json!({ "booleanValue": value }),
        // int64 values travel as decimal strings
        FieldValue::Integer(value) => json!({ "integerValue": value.to_string() }),
        FieldValue::String(value) => json!({ "stringValue": value }),
        FieldValue::Timestamp(value) => {
            json!({ "timestampValue": value.to_rfc3339_opts(SecondsFormat::Micros, true) })
        }
    }
}

fn decode_fields(fields: &Map<String, Value>) -> Document {
    fields
        .iter()
        .filter_map(|(name, value)| match decode_value(value) {
            Some(decoded) => Some((name.clone(), decoded)),
            None => {
                warn!("firestore field {} has an unsupported value type, skipping", name);
                None
            }
        })
        .collect()
}

fn decode_value(value: &Value) -> Option<FieldValue> {
    let object = value.as_object()?;
    if let Some(value) = object.get("stringValue") {
        return value.as_str().map(|s| FieldValue::String(s.to_string()));
    }
    if let Some(value) = object.get("integerValue") {
        return match value {
            Value::String(raw) => raw.parse().ok().map(FieldValue::Integer),
            Value::Number(number) => number.as_i64().map(FieldValue::Integer),
            _ => None,
        };
    }
    if let Some(value) = object.get("booleanValue") {
        return value.as_bool().map(FieldValue::Bool);
    }
    if let Some(value) = object.get("timestampValue") {
        return value
            .as_str()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|parsed| FieldValue::Timestamp(parsed.with_timezone(&Utc)));
    }
    if object.contains_key("nullValue") {
        return Some(FieldValue::Null);
    }
    None
}
