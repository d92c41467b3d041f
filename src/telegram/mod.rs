//! Telegram integration payloads
//!
//! Typed model of the action list a bot hands to the Telegram channel, with
//! the field limits the Bot API enforces.

pub mod markup;
pub mod payload;

pub use markup::ReplyMarkup;
pub use payload::BotAction;

use crate::error::{validation_errors_message, AppError};
use serde::Serialize;
use thiserror::Error;
use validator::Validate;

/// Problem with one action of a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionIssue {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    pub message: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayloadError {
    #[error("Payload must be a JSON array of actions")]
    NotAnArray,

    #[error("Payload has {} invalid action(s)", .0.len())]
    Invalid(Vec<ActionIssue>),
}

impl PayloadError {
    pub fn issues(&self) -> &[ActionIssue] {
        match self {
            PayloadError::NotAnArray => &[],
            PayloadError::Invalid(issues) => issues,
        }
    }
}

impl From<PayloadError> for AppError {
    fn from(err: PayloadError) -> Self {
        let details: Vec<String> = err
            .issues()
            .iter()
            .map(|i| format!("[{}] {}", i.index, i.message))
            .collect();
        if details.is_empty() {
            AppError::Validation(err.to_string())
        } else {
            AppError::Validation(format!("{}: {}", err, details.join("; ")))
        }
    }
}

/// Validated list of actions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Payload(Vec<BotAction>);

impl Payload {
    pub fn actions(&self) -> &[BotAction] {
        &self.0
    }

    /// Parse and validate raw JSON, reporting every bad action at once
    pub fn parse(value: serde_json::Value) -> Result<Self, PayloadError> {
        let serde_json::Value::Array(items) = value else {
            return Err(PayloadError::NotAnArray);
        };

        let mut actions = Vec::with_capacity(items.len());
        let mut issues = Vec::new();

        for (index, item) in items.into_iter().enumerate() {
            let function_name = item
                .get("function_name")
                .and_then(|v| v.as_str())
                .map(str::to_string);

            match serde_json::from_value::<BotAction>(item) {
                Ok(action) => match action.validate() {
                    Ok(()) => actions.push(action),
                    Err(e) => issues.push(ActionIssue {
                        index,
                        function_name,
                        message: validation_errors_message(&e),
                    }),
                },
                Err(e) => issues.push(ActionIssue {
                    index,
                    function_name,
                    message: e.to_string(),
                }),
            }
        }

        if issues.is_empty() {
            Ok(Payload(actions))
        } else {
            Err(PayloadError::Invalid(issues))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::payload::{ChatAction, PhotoSource};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_mixed_payload_parses() {
        let payload = Payload::parse(json!([
            { "function_name": "sendChatAction", "action": "typing" },
            {
                "function_name": "sendMessage",
                "text": "*Hello*",
                "parse_mode": "MarkdownV2",
                "reply_markup": { "inline_keyboard": [[{ "text": "Docs", "url": "https://docs.example.com" }]] }
            },
            { "function_name": "sendPhoto", "photo": { "url": "https://cdn.example.com/a.png", "filename": "a.png" } },
            { "function_name": "sendVenue", "latitude": 45.5, "longitude": -73.6, "title": "Office", "address": "1 Main St" }
        ]))
        .unwrap();

        let names: Vec<&str> = payload.actions().iter().map(|a| a.function_name()).collect();
        assert_eq!(names, vec!["sendChatAction", "sendMessage", "sendPhoto", "sendVenue"]);

        match &payload.actions()[0] {
            BotAction::SendChatAction(a) => assert_eq!(a.action, ChatAction::Typing),
            other => panic!("unexpected {:?}", other),
        }
        match &payload.actions()[2] {
            BotAction::SendPhoto(p) => assert!(matches!(p.photo, PhotoSource::Upload { .. })),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_all_issues_reported_with_index() {
        let err = Payload::parse(json!([
            { "function_name": "sendMessage", "text": "ok" },
            { "function_name": "sendLocation", "latitude": 91.0, "longitude": 0.0 },
            { "function_name": "sendTelepathy" },
            { "function_name": "sendMessage", "text": "x".repeat(4097) }
        ]))
        .unwrap_err();

        let indexes: Vec<usize> = err.issues().iter().map(|i| i.index).collect();
        assert_eq!(indexes, vec![1, 2, 3]);
        assert!(err.issues()[0].message.contains("Latitude"));
        assert_eq!(err.issues()[1].function_name.as_deref(), Some("sendTelepathy"));
    }

    #[test]
    fn test_not_an_array() {
        assert_eq!(
            Payload::parse(json!({ "function_name": "sendDice" })),
            Err(PayloadError::NotAnArray)
        );
    }

    #[test]
    fn test_poll_accepts_any_option_list() {
        let payload = Payload::parse(json!([
            {
                "function_name": "sendPoll",
                "question": "Lunch?",
                "options": ["Pizza", "Sushi"],
                "type": "quiz",
                "correct_option_id": 1
            },
            { "function_name": "sendPoll", "question": "", "options": ["Only"] }
        ]))
        .unwrap();
        assert_eq!(payload.actions().len(), 2);
    }

    #[test]
    fn test_numeric_fields_accept_fractions() {
        let payload = Payload::parse(json!([
            { "function_name": "sendVoice", "voice": "file-3", "duration": 1.5 },
            { "function_name": "sendVideoNote", "video_note": "file-4", "length": 240, "duration": 2.25 }
        ]))
        .unwrap();
        match &payload.actions()[0] {
            BotAction::SendVoice(v) => assert_eq!(v.duration, Some(1.5)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invoice_currency_is_three_letters() {
        let invoice = |currency: &str| {
            json!([{
                "function_name": "sendInvoice",
                "title": "Plan",
                "description": "Monthly plan",
                "payload": "plan-1",
                "provider_token": "tok",
                "start_parameter": "plan",
                "currency": currency,
                "prices": []
            }])
        };

        assert!(Payload::parse(invoice("usd")).is_ok());
        assert!(Payload::parse(invoice("EUR")).is_ok());

        let err = Payload::parse(invoice("dollars")).unwrap_err();
        let message = &err.issues()[0].message;
        assert!(message.contains("currency"), "{}", message);
    }

    #[test]
    fn test_media_group_items_tagged_by_type() {
        let payload = Payload::parse(json!([{
            "function_name": "sendMediaGroup",
            "media": [
                { "type": "photo", "media": "file-1" },
                { "type": "video", "media": "file-2", "supports_streaming": true }
            ]
        }]))
        .unwrap();
        assert_eq!(payload.actions().len(), 1);

        let err = Payload::parse(json!([{
            "function_name": "sendMediaGroup",
            "media": [{ "type": "photo", "media": "f", "caption": "c".repeat(1025) }]
        }]))
        .unwrap_err();
        assert!(err.issues()[0].message.contains("item 0"));
    }

    #[test]
    fn test_reply_markup_errors_surface_in_action() {
        let err = Payload::parse(json!([{
            "function_name": "sendSticker",
            "sticker": "file-9",
            "reply_markup": { "keyboard": [[{ "text": "k".repeat(65) }]] }
        }]))
        .unwrap_err();
        assert!(err.issues()[0].message.starts_with("reply_markup"));
    }

    #[test]
    fn test_roundtrip_preserves_function_name() {
        let payload = Payload::parse(json!([{ "function_name": "sendDice", "emoji": "🎲" }])).unwrap();
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!([{ "function_name": "sendDice", "emoji": "🎲" }])
        );
    }
}
