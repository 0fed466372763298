//! Typed bindings, employee profiles and notes on top of `DocumentStore`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::store::{Document, DocumentStore, FieldValue, StoreError};

const FIELD_LAST_EMP_ID: &str = "lastEmpId";
const FIELD_UPDATED_AT: &str = "updatedAt";

const FIELD_NAME: &str = "name";
const FIELD_EMP_ID: &str = "empId";
const FIELD_DEPARTMENT: &str = "department";
const FIELD_STATUS: &str = "status";
const FIELD_SAFETY_RECORD: &str = "safetyPatrolRecord";
const FIELD_PHOTO_URL: &str = "photoUrl";

const FIELD_TS: &str = "ts";
const FIELD_USER_ID: &str = "userId";
const FIELD_MESSAGE: &str = "message";
const FIELD_SOURCE: &str = "source";

/// Collection names, overridable from the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Collections {
    pub user_map: String,
    pub employees: String,
    pub messages: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            user_map: "userMap".to_string(),
            employees: "employees".to_string(),
            messages: "messages".to_string(),
        }
    }
}

/// Link from a chat sender to an employee id.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub user_id: String,
    pub emp_id: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Employee master data, read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmployeeProfile {
    pub name: String,
    pub emp_id: String,
    pub department: String,
    pub status: String,
    pub safety_record: String,
    pub photo_url: Option<String>,
}

impl EmployeeProfile {
    fn from_document(document_id: &str, document: &Document) -> Self {
        let text = |field: &str| {
            document
                .get(field)
                .and_then(FieldValue::to_text)
                .unwrap_or_default()
        };
        let emp_id = Some(text(FIELD_EMP_ID))
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| document_id.to_string());
        let photo_url = document
            .get(FIELD_PHOTO_URL)
            .and_then(FieldValue::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Self {
            name: text(FIELD_NAME),
            emp_id,
            department: text(FIELD_DEPARTMENT),
            status: text(FIELD_STATUS),
            safety_record: text(FIELD_SAFETY_RECORD),
            photo_url,
        }
    }
}

/// Free-text submission kept for later review.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub ts: DateTime<Utc>,
    pub user_id: String,
    pub emp_id: String,
    pub message: String,
    pub source: String,
}

impl Note {
    fn to_document(&self) -> Document {
        let mut document = Document::new();
        document.insert(FIELD_TS.to_string(), FieldValue::Timestamp(self.ts));
        document.insert(FIELD_USER_ID.to_string(), self.user_id.clone().into());
        document.insert(FIELD_EMP_ID.to_string(), self.emp_id.clone().into());
        document.insert(FIELD_MESSAGE.to_string(), self.message.clone().into());
        document.insert(FIELD_SOURCE.to_string(), self.source.clone().into());
        document
    }

    /// Decode a stored note; `None` when required fields are missing.
    pub fn from_document(document: &Document) -> Option<Self> {
        let text = |field: &str| document.get(field).and_then(FieldValue::to_text);
        Some(Self {
            ts: document.get(FIELD_TS)?.as_timestamp()?,
            user_id: text(FIELD_USER_ID)?,
            emp_id: text(FIELD_EMP_ID)?,
            message: text(FIELD_MESSAGE)?,
            source: text(FIELD_SOURCE)?,
        })
    }
}

/// Record-level access to the three collections.
#[derive(Clone)]
pub struct RecordStore {
    store: Arc<dyn DocumentStore>,
    collections: Collections,
}

impl RecordStore {
    pub fn new(store: Arc<dyn DocumentStore>, collections: Collections) -> Self {
        Self { store, collections }
    }

    /// Binding for a sender. A document without a usable `lastEmpId` counts
    /// as no binding.
    pub async fn binding(&self, user_id: &str) -> Result<Option<Binding>, StoreError> {
        let Some(document) = self.store.get(&self.collections.user_map, user_id).await? else {
            return Ok(None);
        };
        let emp_id = document
            .get(FIELD_LAST_EMP_ID)
            .and_then(FieldValue::to_text)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Ok(emp_id.map(|emp_id| Binding {
            user_id: user_id.to_string(),
            emp_id,
            updated_at: document
                .get(FIELD_UPDATED_AT)
                .and_then(FieldValue::as_timestamp),
        }))
    }

    /// Upsert the binding, merging into any existing document.
    pub async fn bind(
        &self,
        user_id: &str,
        emp_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut fields = Document::new();
        fields.insert(FIELD_LAST_EMP_ID.to_string(), emp_id.into());
        fields.insert(FIELD_UPDATED_AT.to_string(), FieldValue::Timestamp(now));
        self.store
            .merge(&self.collections.user_map, user_id, fields)
            .await
    }

    pub async fn employee(&self, emp_id: &str) -> Result<Option<EmployeeProfile>, StoreError> {
        let document = self.store.get(&self.collections.employees, emp_id).await?;
        Ok(document.map(|document| EmployeeProfile::from_document(emp_id, &document)))
    }

    /// Append a note and return its document id.
    pub async fn append_note(&self, note: &Note) -> Result<String, StoreError> {
        self.store
            .add(&self.collections.messages, note.to_document())
            .await
    }
}
