//! Event router: binds LINE senders to employees and answers their messages.
//!
//! Every processed text event gets exactly one reply and causes at most one
//! store write. Events of a batch run concurrently and independently; a
//! failing event never stops its siblings.

pub mod intent;
pub mod replies;

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use line_messaging_module::{LineError, ReplyMessage, ReplySender, TextMessageEvent, WebhookEvent};
use tracing::{debug, error, info};

use crate::records::{Note, RecordStore};
use crate::store::StoreError;

use intent::{classify, is_candidate_code, Intent};

pub const DEFAULT_NOTE_SOURCE: &str = "LINE_WEBHOOK";

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("reply failed: {0}")]
    Reply(#[from] LineError),
}

/// What the router did for one text message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAction {
    /// Unbound sender submitted a valid code
    Bound,
    /// Unbound sender submitted something else
    PromptedForCode,
    /// Bound sender whose employee record is missing
    ProfileNotFound,
    ShowedProfile,
    ShowedImage,
    /// Bound sender switched to another code
    Rebound,
    SavedNote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Not a text message event; nothing was sent or written
    Ignored,
    Replied(RouteAction),
}

/// Per-batch result.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub replied: usize,
    pub ignored: usize,
    /// Failed events by position in the batch
    pub failures: Vec<(usize, RouterError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Clone)]
pub struct EventRouter {
    records: RecordStore,
    sender: Arc<dyn ReplySender>,
    note_source: String,
}

impl EventRouter {
    pub fn new(records: RecordStore, sender: Arc<dyn ReplySender>) -> Self {
        Self {
            records,
            sender,
            note_source: DEFAULT_NOTE_SOURCE.to_string(),
        }
    }

    pub fn with_note_source(mut self, source: impl Into<String>) -> Self {
        self.note_source = source.into();
        self
    }

    /// Process every event of a webhook request concurrently and wait for
    /// all of them.
    pub async fn handle_batch(&self, events: &[WebhookEvent]) -> BatchReport {
        let outcomes = join_all(events.iter().map(|event| self.handle_event(event))).await;

        let mut report = BatchReport::default();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(EventOutcome::Replied(_)) => report.replied += 1,
                Ok(EventOutcome::Ignored) => report.ignored += 1,
                Err(err) => {
                    error!("webhook event {} failed: {}", index, err);
                    report.failures.push((index, err));
                }
            }
        }
        info!(
            "webhook batch done events={} replied={} ignored={} failed={}",
            events.len(),
            report.replied,
            report.ignored,
            report.failures.len()
        );
        report
    }

    /// Handle one event: route text messages and send their reply.
    pub async fn handle_event(&self, event: &WebhookEvent) -> Result<EventOutcome, RouterError> {
        let Some(message) = event.text_message() else {
            debug!(
                "ignoring webhook event type={} message_kind={:?}",
                event.event_type,
                event.message_kind()
            );
            return Ok(EventOutcome::Ignored);
        };

        let (action, reply) = self.route(&message).await?;
        self.sender.reply(&message.reply_token, &reply).await?;

        info!(
            "replied to {} action={:?} reply={}",
            message.user_id,
            action,
            reply.kind()
        );
        Ok(EventOutcome::Replied(action))
    }

    /// Decide the reply for a text message, performing its store write.
    pub async fn route(
        &self,
        message: &TextMessageEvent,
    ) -> Result<(RouteAction, ReplyMessage), RouterError> {
        match self.records.binding(&message.user_id).await? {
            Some(binding) => self.route_bound(message, &binding.emp_id).await,
            None => self.route_unbound(message).await,
        }
    }

    async fn route_unbound(
        &self,
        message: &TextMessageEvent,
    ) -> Result<(RouteAction, ReplyMessage), RouterError> {
        if !is_candidate_code(&message.text) {
            return Ok((RouteAction::PromptedForCode, replies::unbound_prompt()));
        }
        self.records
            .bind(&message.user_id, &message.text, Utc::now())
            .await?;
        info!("bound {} to employee {}", message.user_id, message.text);
        Ok((RouteAction::Bound, replies::bind_success(&message.text)))
    }

    async fn route_bound(
        &self,
        message: &TextMessageEvent,
        emp_id: &str,
    ) -> Result<(RouteAction, ReplyMessage), RouterError> {
        let Some(profile) = self.records.employee(emp_id).await? else {
            info!("no employee record {} for {}", emp_id, message.user_id);
            return Ok((RouteAction::ProfileNotFound, replies::profile_not_found()));
        };

        match classify(&message.text) {
            Intent::ViewProfile => Ok((RouteAction::ShowedProfile, replies::profile_summary(&profile))),
            Intent::ViewImage => Ok((RouteAction::ShowedImage, replies::profile_image(&profile))),
            Intent::Rebind => {
                self.records
                    .bind(&message.user_id, &message.text, Utc::now())
                    .await?;
                info!(
                    "rebound {} from {} to {}",
                    message.user_id, emp_id, message.text
                );
                Ok((RouteAction::Rebound, replies::bind_success(&message.text)))
            }
            Intent::Note => self.save_note(message, emp_id).await,
        }
    }

    async fn save_note(
        &self,
        message: &TextMessageEvent,
        emp_id: &str,
    ) -> Result<(RouteAction, ReplyMessage), RouterError> {
        let note = Note {
            ts: Utc::now(),
            user_id: message.user_id.clone(),
            emp_id: emp_id.to_string(),
            message: message.text.clone(),
            source: self.note_source.clone(),
        };
        let note_id = self.records.append_note(&note).await?;
        debug!("saved note {} from {}", note_id, message.user_id);
        Ok((RouteAction::SavedNote, replies::note_received()))
    }
}
