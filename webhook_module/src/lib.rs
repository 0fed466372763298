pub mod config;
pub mod google_auth;
pub mod records;
pub mod router;
pub mod server;
pub mod store;

pub use config::{ConfigError, WebhookConfig};
pub use records::{Binding, Collections, EmployeeProfile, Note, RecordStore};
pub use router::{BatchReport, EventOutcome, EventRouter, RouteAction, RouterError};
pub use server::{build_app, AppState};
pub use store::{Document, DocumentStore, FieldValue, StoreError};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
