//! Length-prefixed JSON command envelopes
//!
//! A frame is the JSON body prefixed with its byte length rendered as exactly
//! two uppercase hex digits: `14{"command":"status"}`. Two digits cap the
//! body at 255 bytes; larger bodies are rejected rather than truncated.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Width of the hex length prefix
pub const PREFIX_LEN: usize = 2;

/// Largest body a two-digit hex prefix can describe
pub const MAX_BODY_LEN: usize = 0xFF;

/// Body key holding the command name; payloads may not reuse it
pub const COMMAND_KEY: &str = "command";

/// Errors raised while encoding or decoding frames
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("encoded body is {0} bytes; frames are limited to 255")]
    Overflow(usize),

    #[error("payload key '{0}' is reserved for the command name")]
    ReservedKey(String),

    #[error("invalid length prefix {0:?}")]
    InvalidPrefix(String),

    #[error("frame declares {expected} body bytes but carries {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A command name plus an arbitrary key/value payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub command: String,

    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl CommandEnvelope {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            payload: Map::new(),
        }
    }

    /// Add a payload entry
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }
}

/// Encode an envelope as `<2 hex digits><json body>`
pub fn encode(envelope: &CommandEnvelope) -> Result<Vec<u8>, FramingError> {
    if envelope.payload.contains_key(COMMAND_KEY) {
        return Err(FramingError::ReservedKey(COMMAND_KEY.to_string()));
    }

    let body = serde_json::to_vec(envelope)?;
    if body.len() > MAX_BODY_LEN {
        return Err(FramingError::Overflow(body.len()));
    }

    let mut frame = format!("{:02X}", body.len()).into_bytes();
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decode one complete frame
pub fn decode(frame: &[u8]) -> Result<CommandEnvelope, FramingError> {
    if frame.len() < PREFIX_LEN {
        return Err(FramingError::InvalidPrefix(
            String::from_utf8_lossy(frame).into_owned(),
        ));
    }

    let (prefix, body) = frame.split_at(PREFIX_LEN);
    let expected = parse_prefix(prefix)?;
    if body.len() != expected {
        return Err(FramingError::LengthMismatch {
            expected,
            actual: body.len(),
        });
    }

    Ok(serde_json::from_slice(body)?)
}

/// Read one frame from a stream: two hex digits, then that many body bytes
pub async fn read_frame<R>(reader: &mut R) -> Result<CommandEnvelope, FramingError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; PREFIX_LEN];
    reader.read_exact(&mut prefix).await?;
    let len = parse_prefix(&prefix)?;

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(serde_json::from_slice(&body)?)
}

fn parse_prefix(prefix: &[u8]) -> Result<usize, FramingError> {
    let invalid = || FramingError::InvalidPrefix(String::from_utf8_lossy(prefix).into_owned());
    if !prefix.iter().all(u8::is_ascii_hexdigit) {
        return Err(invalid());
    }
    let text = std::str::from_utf8(prefix).map_err(|_| invalid())?;
    usize::from_str_radix(text, 16).map_err(|_| invalid())
}
