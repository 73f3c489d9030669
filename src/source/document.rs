//! Conversion of exported message documents into [`RawMessage`]s.
//!
//! Two shapes are accepted:
//! - mailbox API JSON (`payload.headers`, `payload.parts[0].body.data`)
//! - RFC 5322 `.eml` files, whose HTML part is re-encoded as base64url

use mail_parser::MessageParser;
use serde::Deserialize;

use crate::error::{CheckerError, Result};
use crate::model::message::{BodyPart, RawMessage};
use crate::parser::normalize::encode_transport;

/// Headers carrying the sender, in order of preference.
const SENDER_HEADERS: [&str; 2] = ["sender", "from"];

#[derive(Debug, Deserialize)]
struct ApiMessage {
    payload: ApiPayload,
}

#[derive(Debug, Deserialize)]
struct ApiPayload {
    #[serde(default)]
    headers: Vec<ApiHeader>,
    #[serde(default)]
    parts: Vec<ApiPart>,
    #[serde(default)]
    body: Option<ApiBody>,
}

#[derive(Debug, Deserialize)]
struct ApiHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct ApiPart {
    #[serde(default)]
    body: Option<ApiBody>,
}

#[derive(Debug, Deserialize)]
struct ApiBody {
    #[serde(default)]
    data: Option<String>,
}

/// Build a message from a mailbox API JSON document.
///
/// The first body part wins; single-part messages fall back to the
/// payload's own body. A message without any body data gets an empty one.
pub fn from_api_json(id: &str, json: &str) -> Result<RawMessage> {
    let message: ApiMessage = serde_json::from_str(json).map_err(|e| CheckerError::InvalidMessage {
        id: id.to_string(),
        reason: e.to_string(),
    })?;
    let payload = message.payload;

    let sender = SENDER_HEADERS
        .iter()
        .find_map(|wanted| {
            payload
                .headers
                .iter()
                .find(|h| h.name.eq_ignore_ascii_case(wanted))
        })
        .map(|h| h.value.clone())
        .unwrap_or_default();

    let data = payload
        .parts
        .into_iter()
        .next()
        .and_then(|part| part.body)
        .or(payload.body)
        .and_then(|body| body.data)
        .unwrap_or_default();

    Ok(RawMessage {
        id: id.to_string(),
        sender,
        body: BodyPart { data },
    })
}

/// Build a message from a raw RFC 5322 message.
pub fn from_eml(id: &str, bytes: &[u8]) -> Result<RawMessage> {
    let message = MessageParser::default()
        .parse(bytes)
        .ok_or_else(|| CheckerError::InvalidMessage {
            id: id.to_string(),
            reason: "not an RFC 5322 message".to_string(),
        })?;

    let sender = message
        .sender()
        .or_else(|| message.from())
        .and_then(|address| address.first())
        .map(|addr| match (addr.name(), addr.address()) {
            (Some(name), Some(address)) => format!("{name} <{address}>"),
            (None, Some(address)) => address.to_string(),
            (Some(name), None) => name.to_string(),
            (None, None) => String::new(),
        })
        .unwrap_or_default();

    let data = message
        .body_html(0)
        .map(|html| encode_transport(&html))
        .unwrap_or_default();

    Ok(RawMessage {
        id: id.to_string(),
        sender,
        body: BodyPart { data },
    })
}
