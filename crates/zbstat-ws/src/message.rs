//! Inbound status feed messages.
//!
//! The server sends one flat JSON object per text frame. Two variants
//! share the channel and are told apart by the `details` field:
//!
//! - `{"game": "genshin", "curr": 3, "max": 160}`: status update
//! - `{"details": ...}`: informational payload, not rendered

use crate::error::{WsError, WsResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Marker field of the details variant.
const DETAILS_FIELD: &str = "details";

/// Progress update for one tracked key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Tracked key.
    pub game: String,
    pub curr: i64,
    pub max: i64,
}

/// Decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Status(StatusUpdate),
    /// Carries the `details` value; the rest of the object is dropped.
    Details(Value),
}

impl InboundMessage {
    /// Decode a text frame.
    ///
    /// Any object holding a `details` key is the details variant,
    /// whatever the value. Everything else must be a complete status
    /// update with integer `curr`/`max`.
    pub fn parse(text: &str) -> WsResult<Self> {
        let value: Value = serde_json::from_str(text)?;

        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(WsError::ParseError(format!(
                    "expected JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        if let Some(details) = fields.remove(DETAILS_FIELD) {
            return Ok(Self::Details(details));
        }

        let update: StatusUpdate = serde_json::from_value(Value::Object(fields))?;
        Ok(Self::Status(update))
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Details(_) => "details",
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
