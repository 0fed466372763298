//! Key-value document store used for bindings, employee profiles and notes.
//!
//! Documents are flat maps of field name to `FieldValue`. `FirestoreStore`
//! talks to Cloud Firestore over REST; `MemoryStore` backs tests and local
//! runs.

mod firestore;
mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use firestore::{FirestoreConfig, FirestoreStore, DEFAULT_FIRESTORE_API_BASE_URL};
pub use memory::MemoryStore;

use crate::google_auth::GoogleAuthError;

/// A typed document field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    String(String),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// Render scalar values as text; numeric employee codes are stored as
    /// integers by some importers.
    pub fn to_text(&self) -> Option<String> {
        match self {
            FieldValue::String(value) => Some(value.clone()),
            FieldValue::Integer(value) => Some(value.to_string()),
            FieldValue::Bool(value) => Some(value.to_string()),
            FieldValue::Timestamp(value) => Some(value.to_rfc3339()),
            FieldValue::Null => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Timestamp(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

pub type Document = BTreeMap<String, FieldValue>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("firestore returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("auth error: {0}")]
    Auth(#[from] GoogleAuthError),
    #[error("invalid document id: {0:?}")]
    InvalidId(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document; `Ok(None)` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create or update a document, writing only the given fields and
    /// leaving every other field of an existing document untouched.
    async fn merge(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError>;

    /// Append a new document with a store-assigned id and return that id.
    async fn add(&self, collection: &str, fields: Document) -> Result<String, StoreError>;
}

pub(crate) fn validate_document_id(id: &str) -> Result<(), StoreError> {
    let trimmed = id.trim();
    if trimmed.is_empty() || trimmed.contains('/') || trimmed == "." || trimmed == ".." {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(())
}
