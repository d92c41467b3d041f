//! Bot actions
//!
//! A payload is a list of actions, each discriminated by `function_name`.

use super::markup::{validate_reply_markup, ReplyMarkup};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

static CURRENCY_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{3}$").expect("valid currency pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    Markdown,
    MarkdownV2,
    #[serde(rename = "HTML")]
    Html,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SendMessage {
    #[validate(length(max = 4096, message = "Text must be at most 4096 characters"))]
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_reply_markup"))]
    pub reply_markup: Option<ReplyMarkup>,
}

/// Either a file reference (id, url, path) or an upload by URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhotoSource {
    Reference(String),
    Upload { url: String, filename: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SendPhoto {
    pub photo: PhotoSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1024, message = "Caption must be at most 1024 characters"))]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_reply_markup"))]
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SendAudio {
    pub audio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1024, message = "Caption must be at most 1024 characters"))]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_reply_markup"))]
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SendDocument {
    pub document: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1024, message = "Caption must be at most 1024 characters"))]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_reply_markup"))]
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SendVideo {
    pub video: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1024, message = "Caption must be at most 1024 characters"))]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_reply_markup"))]
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SendLocation {
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_reply_markup"))]
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SendVenue {
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: f64,
    pub title: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foursquare_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foursquare_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_reply_markup"))]
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SendContact {
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_reply_markup"))]
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SendAnimation {
    pub animation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1024, message = "Caption must be at most 1024 characters"))]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_reply_markup"))]
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SendVoice {
    pub voice: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1024, message = "Caption must be at most 1024 characters"))]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_reply_markup"))]
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SendVideoNote {
    pub video_note: String,
    /// Video width and height
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_reply_markup"))]
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct InputMediaPhoto {
    pub media: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1024, message = "Caption must be at most 1024 characters"))]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct InputMediaVideo {
    pub media: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1024, message = "Caption must be at most 1024 characters"))]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_streaming: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputMedia {
    Photo(InputMediaPhoto),
    Video(InputMediaVideo),
}

impl Validate for InputMedia {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            InputMedia::Photo(media) => media.validate(),
            InputMedia::Video(media) => media.validate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SendMediaGroup {
    #[validate(custom(function = "validate_media_items"))]
    pub media: Vec<InputMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_reply_markup"))]
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollKind {
    Regular,
    Quiz,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SendPoll {
    pub question: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_anonymous: Option<bool>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<PollKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allows_multiple_answers: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_option_id: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_reply_markup"))]
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SendDice {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_reply_markup"))]
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatAction {
    Typing,
    UploadPhoto,
    RecordVideo,
    UploadVideo,
    RecordAudio,
    UploadAudio,
    UploadDocument,
    FindLocation,
    RecordVideoNote,
    UploadVideoNote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SendChatAction {
    pub action: ChatAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SendSticker {
    pub sticker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_reply_markup"))]
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPrice {
    pub label: String,
    /// Smallest units of the currency
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SendInvoice {
    pub title: String,
    pub description: String,
    pub payload: String,
    pub provider_token: String,
    pub start_parameter: String,
    #[validate(custom(function = "validate_currency"))]
    pub currency: String,
    pub prices: Vec<LabeledPrice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_reply_markup"))]
    pub reply_markup: Option<ReplyMarkup>,
}

/// One outgoing bot action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "function_name", rename_all = "camelCase")]
pub enum BotAction {
    SendMessage(SendMessage),
    SendPhoto(SendPhoto),
    SendAudio(SendAudio),
    SendDocument(SendDocument),
    SendVideo(SendVideo),
    SendLocation(SendLocation),
    SendVenue(SendVenue),
    SendContact(SendContact),
    SendAnimation(SendAnimation),
    SendVoice(SendVoice),
    SendVideoNote(SendVideoNote),
    SendMediaGroup(SendMediaGroup),
    SendPoll(SendPoll),
    SendDice(SendDice),
    SendChatAction(SendChatAction),
    SendSticker(SendSticker),
    SendInvoice(SendInvoice),
}

impl BotAction {
    pub fn function_name(&self) -> &'static str {
        match self {
            BotAction::SendMessage(_) => "sendMessage",
            BotAction::SendPhoto(_) => "sendPhoto",
            BotAction::SendAudio(_) => "sendAudio",
            BotAction::SendDocument(_) => "sendDocument",
            BotAction::SendVideo(_) => "sendVideo",
            BotAction::SendLocation(_) => "sendLocation",
            BotAction::SendVenue(_) => "sendVenue",
            BotAction::SendContact(_) => "sendContact",
            BotAction::SendAnimation(_) => "sendAnimation",
            BotAction::SendVoice(_) => "sendVoice",
            BotAction::SendVideoNote(_) => "sendVideoNote",
            BotAction::SendMediaGroup(_) => "sendMediaGroup",
            BotAction::SendPoll(_) => "sendPoll",
            BotAction::SendDice(_) => "sendDice",
            BotAction::SendChatAction(_) => "sendChatAction",
            BotAction::SendSticker(_) => "sendSticker",
            BotAction::SendInvoice(_) => "sendInvoice",
        }
    }
}

impl Validate for BotAction {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            BotAction::SendMessage(a) => a.validate(),
            BotAction::SendPhoto(a) => a.validate(),
            BotAction::SendAudio(a) => a.validate(),
            BotAction::SendDocument(a) => a.validate(),
            BotAction::SendVideo(a) => a.validate(),
            BotAction::SendLocation(a) => a.validate(),
            BotAction::SendVenue(a) => a.validate(),
            BotAction::SendContact(a) => a.validate(),
            BotAction::SendAnimation(a) => a.validate(),
            BotAction::SendVoice(a) => a.validate(),
            BotAction::SendVideoNote(a) => a.validate(),
            BotAction::SendMediaGroup(a) => a.validate(),
            BotAction::SendPoll(a) => a.validate(),
            BotAction::SendDice(a) => a.validate(),
            BotAction::SendChatAction(a) => a.validate(),
            BotAction::SendSticker(a) => a.validate(),
            BotAction::SendInvoice(a) => a.validate(),
        }
    }
}

fn validate_currency(code: &str) -> Result<(), ValidationError> {
    if CURRENCY_CODE.is_match(code) {
        Ok(())
    } else {
        let mut err = ValidationError::new("currency");
        err.message = Some("Currency must be a three-letter code".into());
        Err(err)
    }
}

fn validate_media_items(items: &[InputMedia]) -> Result<(), ValidationError> {
    for (i, item) in items.iter().enumerate() {
        if let Err(e) = item.validate() {
            let mut err = ValidationError::new("media");
            err.message = Some(
                format!("item {}: {}", i, crate::error::validation_errors_message(&e)).into(),
            );
            return Err(err);
        }
    }
    Ok(())
}
