//! Inbound webhook payloads sent by the LINE platform.
//!
//! Event and message kinds are kept as plain strings so that kinds this
//! service does not handle (stickers, follows, postbacks, ...) still
//! deserialize and can be skipped instead of failing the whole batch.

use serde::Deserialize;

pub const EVENT_TYPE_MESSAGE: &str = "message";
pub const MESSAGE_TYPE_TEXT: &str = "text";

/// Top-level webhook request body.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookBody {
    /// Bot user ID the events are addressed to
    #[serde(default)]
    pub destination: Option<String>,
    /// Events in delivery order (may be empty for verification requests)
    pub events: Vec<WebhookEvent>,
}

/// A single webhook event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    /// Event type: "message", "follow", "unfollow", "postback", ...
    #[serde(rename = "type")]
    pub event_type: String,
    /// Token required to reply to this event
    #[serde(default)]
    pub reply_token: Option<String>,
    /// Where the event came from
    #[serde(default)]
    pub source: Option<EventSource>,
    /// Message content for "message" events
    #[serde(default)]
    pub message: Option<EventMessage>,
    /// Event time (Unix milliseconds)
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub webhook_event_id: Option<String>,
}

/// Event source.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    /// "user", "group" or "room"
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
}

/// Message content of a "message" event.
#[derive(Debug, Clone, Deserialize)]
pub struct EventMessage {
    #[serde(default)]
    pub id: Option<String>,
    /// "text", "image", "sticker", "video", "audio", "location", "file"
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// The parts of a text message event the router works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessageEvent {
    pub user_id: String,
    pub reply_token: String,
    /// Message text with surrounding whitespace removed
    pub text: String,
}

impl WebhookEvent {
    /// Message kind for message events, `None` for every other event type.
    pub fn message_kind(&self) -> Option<&str> {
        if self.event_type != EVENT_TYPE_MESSAGE {
            return None;
        }
        self.message
            .as_ref()
            .map(|message| message.message_type.as_str())
    }

    /// Extract a processable text message.
    ///
    /// Returns `None` for non-message events, non-text messages, and events
    /// that carry no user sender or no reply token.
    pub fn text_message(&self) -> Option<TextMessageEvent> {
        if self.message_kind() != Some(MESSAGE_TYPE_TEXT) {
            return None;
        }
        let text = self.message.as_ref()?.text.as_deref()?;
        let user_id = self
            .source
            .as_ref()?
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())?;
        let reply_token = self
            .reply_token
            .as_deref()
            .filter(|value| !value.trim().is_empty())?;

        Some(TextMessageEvent {
            user_id: user_id.to_string(),
            reply_token: reply_token.to_string(),
            text: text.trim().to_string(),
        })
    }
}

/// Parse a raw webhook request body.
pub fn parse_webhook_body(raw: &[u8]) -> Result<WebhookBody, serde_json::Error> {
    serde_json::from_slice(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_text_message_event() {
        let payload = r#"{
            "destination": "Ubot",
            "events": [
                {
                    "type": "message",
                    "mode": "active",
                    "timestamp": 1700000000000,
                    "source": {"type": "user", "userId": "U123"},
                    "webhookEventId": "01HXYZ",
                    "deliveryContext": {"isRedelivery": false},
                    "replyToken": "reply-1",
                    "message": {"id": "m1", "type": "text", "quoteToken": "q", "text": "  12345 \n"}
                }
            ]
        }"#;

        let body = parse_webhook_body(payload.as_bytes()).unwrap();
        assert_eq!(body.destination.as_deref(), Some("Ubot"));
        assert_eq!(body.events.len(), 1);

        let event = body.events[0].text_message().unwrap();
        assert_eq!(event.user_id, "U123");
        assert_eq!(event.reply_token, "reply-1");
        assert_eq!(event.text, "12345");
    }

    #[test]
    fn non_text_messages_are_not_text_events() {
        let payload = r#"{
            "events": [
                {
                    "type": "message",
                    "replyToken": "reply-2",
                    "source": {"type": "user", "userId": "U123"},
                    "message": {"id": "m2", "type": "sticker", "packageId": "1", "stickerId": "2"}
                },
                {
                    "type": "follow",
                    "replyToken": "reply-3",
                    "source": {"type": "user", "userId": "U123"}
                }
            ]
        }"#;

        let body = parse_webhook_body(payload.as_bytes()).unwrap();
        assert_eq!(body.events[0].message_kind(), Some("sticker"));
        assert!(body.events[0].text_message().is_none());
        assert_eq!(body.events[1].message_kind(), None);
        assert!(body.events[1].text_message().is_none());
    }

    #[test]
    fn text_event_without_user_is_skipped() {
        let payload = r#"{
            "events": [
                {
                    "type": "message",
                    "replyToken": "reply-4",
                    "source": {"type": "group", "groupId": "G1"},
                    "message": {"id": "m4", "type": "text", "text": "hello"}
                }
            ]
        }"#;

        let body = parse_webhook_body(payload.as_bytes()).unwrap();
        assert!(body.events[0].text_message().is_none());
    }

    #[test]
    fn missing_events_is_an_error() {
        assert!(parse_webhook_body(br#"{"destination": "Ubot"}"#).is_err());
        assert!(parse_webhook_body(b"not json").is_err());
    }

    #[test]
    fn empty_events_is_a_verification_request() {
        let body = parse_webhook_body(br#"{"destination": "Ubot", "events": []}"#).unwrap();
        assert!(body.events.is_empty());
    }
}
