//! LINE Messaging API plumbing shared by the webhook service.
//!
//! - `webhook`: inbound webhook payload model
//! - `message`: outbound reply message model
//! - `client`: reply API client and the `ReplySender` seam
//! - `signature`: `x-line-signature` computation and verification

pub mod client;
pub mod message;
pub mod signature;
pub mod webhook;

pub use client::{LineClient, LineClientConfig, LineError, ReplySender, DEFAULT_LINE_API_BASE_URL};
pub use message::ReplyMessage;
pub use signature::{compute_signature, verify_signature, SIGNATURE_HEADER};
pub use webhook::{
    parse_webhook_body, EventMessage, EventSource, TextMessageEvent, WebhookBody, WebhookEvent,
};
