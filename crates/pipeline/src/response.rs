//! Response-shape resolution.
//!
//! Providers hand back raw JSON bodies whose layout depends on the service.
//! [`ResponseShape::parse`] recognises the common envelopes and falls back to
//! the serialized body, so text extraction never fails.

use serde_json::Value;

/// A recognised response layout, tried in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape {
    /// `choices[0].message.content` or legacy `choices[0].text`.
    ChatCompletion(String),
    /// `message.content`.
    MessageEnvelope(String),
    /// `content: [{ "type": "text", "text": ... }, ...]`, text blocks joined.
    ContentBlocks(String),
    /// A bare string, or a string under `text`, `output`, `response` or `content`.
    PlainText(String),
    /// Nothing matched; the whole body serialized.
    Fallback(String),
}

const PLAIN_TEXT_FIELDS: [&str; 4] = ["text", "output", "response", "content"];

impl ResponseShape {
    pub fn parse(value: &Value) -> Self {
        if let Some(text) = chat_completion(value) {
            return Self::ChatCompletion(text.to_string());
        }
        if let Some(text) = value
            .pointer("/message/content")
            .and_then(Value::as_str)
        {
            return Self::MessageEnvelope(text.to_string());
        }
        if let Some(text) = content_blocks(value) {
            return Self::ContentBlocks(text);
        }
        if let Some(text) = plain_text(value) {
            return Self::PlainText(text.to_string());
        }
        Self::Fallback(serde_json::to_string(value).unwrap_or_default())
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChatCompletion(_) => "chat_completion",
            Self::MessageEnvelope(_) => "message_envelope",
            Self::ContentBlocks(_) => "content_blocks",
            Self::PlainText(_) => "plain_text",
            Self::Fallback(_) => "fallback",
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::ChatCompletion(t)
            | Self::MessageEnvelope(t)
            | Self::ContentBlocks(t)
            | Self::PlainText(t)
            | Self::Fallback(t) => t,
        }
    }
}

/// Extract the text of a response body. Untrimmed.
pub fn resolve_text(value: &Value) -> String {
    ResponseShape::parse(value).into_text()
}

fn chat_completion(value: &Value) -> Option<&str> {
    let choice = value.get("choices")?.get(0)?;
    choice
        .pointer("/message/content")
        .and_then(Value::as_str)
        .or_else(|| choice.get("text").and_then(Value::as_str))
}

fn content_blocks(value: &Value) -> Option<String> {
    let blocks = value.get("content")?.as_array()?;
    let texts: Vec<&str> = blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.concat())
    }
}

fn plain_text(value: &Value) -> Option<&str> {
    if let Some(s) = value.as_str() {
        return Some(s);
    }
    PLAIN_TEXT_FIELDS
        .iter()
        .find_map(|field| value.get(field).and_then(Value::as_str))
}
