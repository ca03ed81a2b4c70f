//! Engine.IO v4 / Socket.IO v5 text framing.
//!
//! Only the default namespace and text packets are handled. Binary
//! attachments and acknowledgements are never requested by this client, so
//! they decode to [`Frame::Noop`].

use serde::Deserialize;
use serde_json::Value;

use super::NamedEvent;
use crate::error::{ClientError, Result};

/// Payload of the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    #[serde(default)]
    pub sid: String,
    /// Milliseconds between server pings.
    #[serde(default)]
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    #[serde(default)]
    pub ping_timeout: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Open(OpenInfo),
    Close,
    Ping,
    Pong,
    Connect,
    Disconnect,
    ConnectError(String),
    Event(NamedEvent),
    Noop,
}

impl Frame {
    pub fn decode(text: &str) -> Result<Frame> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| ClientError::Frame("empty frame".to_string()))?;
        let rest = chars.as_str();

        match kind {
            '0' => Ok(Frame::Open(serde_json::from_str(rest)?)),
            '1' => Ok(Frame::Close),
            '2' => Ok(Frame::Ping),
            '3' => Ok(Frame::Pong),
            '4' => decode_packet(rest),
            '5' | '6' => Ok(Frame::Noop),
            other => Err(ClientError::Frame(format!(
                "unknown engine packet type {:?}",
                other
            ))),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Frame::Open(_) | Frame::Noop => "6".to_string(),
            Frame::Close => "1".to_string(),
            Frame::Ping => "2".to_string(),
            Frame::Pong => "3".to_string(),
            Frame::Connect => "40".to_string(),
            Frame::Disconnect => "41".to_string(),
            Frame::ConnectError(message) => {
                format!("44{}", Value::from(message.as_str()))
            }
            Frame::Event(event) => {
                let mut args = vec![Value::from(event.name.as_str())];
                if !event.payload.is_null() {
                    args.push(event.payload.clone());
                }
                format!("42{}", Value::Array(args))
            }
        }
    }
}

fn decode_packet(packet: &str) -> Result<Frame> {
    let mut chars = packet.chars();
    let kind = chars
        .next()
        .ok_or_else(|| ClientError::Frame("empty socket packet".to_string()))?;
    let body = skip_namespace(chars.as_str());

    match kind {
        '0' => Ok(Frame::Connect),
        '1' => Ok(Frame::Disconnect),
        '2' => decode_event(body),
        '4' => {
            let message = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| body.to_string());
            Ok(Frame::ConnectError(message))
        }
        '3' | '5' | '6' => Ok(Frame::Noop),
        other => Err(ClientError::Frame(format!(
            "unknown socket packet type {:?}",
            other
        ))),
    }
}

/// Drops a `/nsp,` prefix and an ack id so only the JSON body remains.
fn skip_namespace(body: &str) -> &str {
    let body = if body.starts_with('/') {
        match body.find(',') {
            Some(pos) => &body[pos + 1..],
            None => "",
        }
    } else {
        body
    };
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn decode_event(body: &str) -> Result<Frame> {
    let args: Vec<Value> = serde_json::from_str(body)?;
    let mut args = args.into_iter();
    let name = match args.next() {
        Some(Value::String(name)) => name,
        _ => return Err(ClientError::Frame("event without a name".to_string())),
    };
    let payload = args.next().unwrap_or(Value::Null);
    Ok(Frame::Event(NamedEvent { name, payload }))
}
