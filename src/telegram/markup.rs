//! Reply markup attached to outgoing bot messages
//!
//! On the wire the three markup kinds carry no explicit tag; each one is
//! recognised by its defining key (`keyboard`, `inline_keyboard`,
//! `force_reply`). Exactly one of those keys must be present.

use crate::error::validation_errors_message;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

/// Poll kind a keyboard button lets the user create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyboardPollKind {
    Quiz,
    Regular,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyboardButtonPollType {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<KeyboardPollKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct KeyboardButton {
    #[validate(length(max = 64, message = "Button text must be at most 64 characters"))]
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_contact: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_location: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_poll: Option<KeyboardButtonPollType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LoginUrl {
    #[validate(length(max = 64, message = "Login URL must be at most 64 characters"))]
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 64, message = "Forward text must be at most 64 characters"))]
    pub forward_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 64, message = "Bot username must be at most 64 characters"))]
    pub bot_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_write_access: Option<bool>,
}

/// Placeholder, holds no information
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallbackGame {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct InlineKeyboardButton {
    #[validate(length(max = 64, message = "Button text must be at most 64 characters"))]
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_button_url"))]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_login_url"))]
    pub login_url: Option<LoginUrl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 64, message = "Callback data must be at most 64 characters"))]
    pub callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch_inline_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch_inline_query_current_chat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_game: Option<CallbackGame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ReplyKeyboardMarkup {
    #[validate(custom(function = "validate_keyboard_rows"))]
    pub keyboard: Vec<Vec<KeyboardButton>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize_keyboard: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_time_keyboard: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selective: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct InlineKeyboardMarkup {
    #[validate(custom(function = "validate_inline_rows"))]
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 64, message = "Input field placeholder must be at most 64 characters"))]
    pub input_field_placeholder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ForceReply {
    #[serde(deserialize_with = "literal_true")]
    pub force_reply: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selective: Option<bool>,
}

fn literal_true<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match bool::deserialize(deserializer)? {
        true => Ok(true),
        false => Err(de::Error::custom("force_reply must be true")),
    }
}

/// Additional interface options for a message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Keyboard(ReplyKeyboardMarkup),
    InlineKeyboard(InlineKeyboardMarkup),
    ForceReply(ForceReply),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkupKind {
    Keyboard,
    InlineKeyboard,
    ForceReply,
}

impl MarkupKind {
    const ALL: [(MarkupKind, &'static str); 3] = [
        (MarkupKind::Keyboard, "keyboard"),
        (MarkupKind::InlineKeyboard, "inline_keyboard"),
        (MarkupKind::ForceReply, "force_reply"),
    ];

    fn detect(map: &Map<String, Value>) -> Result<Self, String> {
        let present: Vec<MarkupKind> = Self::ALL
            .iter()
            .filter(|(_, key)| map.contains_key(*key))
            .map(|(kind, _)| *kind)
            .collect();

        match present.as_slice() {
            [kind] => Ok(*kind),
            [] => Err("reply_markup must contain one of keyboard, inline_keyboard or force_reply".to_string()),
            _ => Err("reply_markup must contain only one of keyboard, inline_keyboard or force_reply".to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for ReplyMarkup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        let kind = MarkupKind::detect(&map).map_err(de::Error::custom)?;
        let value = Value::Object(map);

        let markup = match kind {
            MarkupKind::Keyboard => serde_json::from_value(value).map(ReplyMarkup::Keyboard),
            MarkupKind::InlineKeyboard => {
                serde_json::from_value(value).map(ReplyMarkup::InlineKeyboard)
            }
            MarkupKind::ForceReply => serde_json::from_value(value).map(ReplyMarkup::ForceReply),
        };
        markup.map_err(de::Error::custom)
    }
}

impl Validate for ReplyMarkup {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            ReplyMarkup::Keyboard(markup) => markup.validate(),
            ReplyMarkup::InlineKeyboard(markup) => markup.validate(),
            ReplyMarkup::ForceReply(markup) => markup.validate(),
        }
    }
}

/// Field-level hook used by every action that accepts `reply_markup`
pub fn validate_reply_markup(markup: &ReplyMarkup) -> Result<(), ValidationError> {
    markup.validate().map_err(|e| {
        let mut err = ValidationError::new("reply_markup");
        err.message = Some(validation_errors_message(&e).into());
        err
    })
}

fn validate_rows<T: Validate>(rows: &[Vec<T>], code: &'static str) -> Result<(), ValidationError> {
    for (r, row) in rows.iter().enumerate() {
        for (b, button) in row.iter().enumerate() {
            if let Err(e) = button.validate() {
                let mut err = ValidationError::new(code);
                err.message = Some(
                    format!("row {} button {}: {}", r, b, validation_errors_message(&e)).into(),
                );
                return Err(err);
            }
        }
    }
    Ok(())
}

fn validate_keyboard_rows(rows: &[Vec<KeyboardButton>]) -> Result<(), ValidationError> {
    validate_rows(rows, "keyboard")
}

fn validate_inline_rows(rows: &[Vec<InlineKeyboardButton>]) -> Result<(), ValidationError> {
    validate_rows(rows, "inline_keyboard")
}

fn validate_login_url(login_url: &LoginUrl) -> Result<(), ValidationError> {
    login_url.validate().map_err(|e| {
        let mut err = ValidationError::new("login_url");
        err.message = Some(validation_errors_message(&e).into());
        err
    })
}

/// HTTP(S) or tg:// links only
fn validate_button_url(raw: &str) -> Result<(), ValidationError> {
    match url::Url::parse(raw) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https" | "tg") => Ok(()),
        _ => {
            let mut err = ValidationError::new("button_url");
            err.message = Some("Button URL must be an http(s) or tg:// link".into());
            Err(err)
        }
    }
}
