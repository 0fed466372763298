use serde::{Deserialize, Serialize};

/// A reply message in the shape the reply API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReplyMessage {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        original_content_url: String,
        preview_image_url: String,
    },
}

impl ReplyMessage {
    pub fn text(text: impl Into<String>) -> Self {
        ReplyMessage::Text { text: text.into() }
    }

    /// Image reply that uses the same URL for the original and the preview.
    pub fn image(url: impl Into<String>) -> Self {
        let url = url.into();
        ReplyMessage::Image {
            original_content_url: url.clone(),
            preview_image_url: url,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReplyMessage::Text { .. } => "text",
            ReplyMessage::Image { .. } => "image",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_message_serializes_with_type_tag() {
        let value = serde_json::to_value(ReplyMessage::text("hello")).unwrap();
        assert_eq!(value, json!({"type": "text", "text": "hello"}));
    }

    #[test]
    fn image_message_uses_camel_case_and_same_urls() {
        let value = serde_json::to_value(ReplyMessage::image("https://example.com/a.png")).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "image",
                "originalContentUrl": "https://example.com/a.png",
                "previewImageUrl": "https://example.com/a.png"
            })
        );
    }
}
