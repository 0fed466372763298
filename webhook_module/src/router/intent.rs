//! Intent classification for messages from bound senders.
//!
//! Rules are evaluated top to bottom and the first match wins. The table
//! order is part of the contract: a text such as "photo 12345" is an image
//! request, not a rebind.

/// Keywords asking for the profile summary (matched case-insensitively).
pub const PROFILE_KEYWORDS: &[&str] = &["ข้อมูล", "โปรไฟล์", "info", "profile"];

/// Keywords asking for the profile photo.
pub const IMAGE_KEYWORDS: &[&str] = &["รูปภาพ", "ดูรูป", "image", "photo"];

pub const CODE_MIN_LEN: usize = 4;
pub const CODE_MAX_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    ViewProfile,
    ViewImage,
    Rebind,
    Note,
}

/// A message text in the forms the rules look at.
#[derive(Debug)]
pub struct MessageText<'a> {
    pub raw: &'a str,
    pub lowered: String,
}

impl<'a> MessageText<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            lowered: raw.to_lowercase(),
        }
    }
}

struct IntentRule {
    intent: Intent,
    matches: fn(&MessageText<'_>) -> bool,
}

const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        intent: Intent::ViewProfile,
        matches: mentions_profile,
    },
    IntentRule {
        intent: Intent::ViewImage,
        matches: mentions_image,
    },
    IntentRule {
        intent: Intent::Rebind,
        matches: is_code,
    },
    IntentRule {
        intent: Intent::Note,
        matches: always,
    },
];

/// Classify a bound sender's message.
pub fn classify(text: &str) -> Intent {
    let message = MessageText::new(text);
    INTENT_RULES
        .iter()
        .find(|rule| (rule.matches)(&message))
        .map(|rule| rule.intent)
        .unwrap_or(Intent::Note)
}

/// Intents in evaluation order.
pub fn precedence() -> Vec<Intent> {
    INTENT_RULES.iter().map(|rule| rule.intent).collect()
}

/// A plausible employee id: 4 to 8 ASCII digits. Leading zeros are kept;
/// signs, spaces and non-ASCII digits are rejected.
pub fn is_candidate_code(text: &str) -> bool {
    (CODE_MIN_LEN..=CODE_MAX_LEN).contains(&text.len())
        && text.bytes().all(|byte| byte.is_ascii_digit())
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| haystack.contains(keyword))
}

fn mentions_profile(message: &MessageText<'_>) -> bool {
    contains_any(&message.lowered, PROFILE_KEYWORDS)
}

fn mentions_image(message: &MessageText<'_>) -> bool {
    contains_any(&message.lowered, IMAGE_KEYWORDS)
}

fn is_code(message: &MessageText<'_>) -> bool {
    is_candidate_code(message.raw)
}

fn always(_: &MessageText<'_>) -> bool {
    true
}
