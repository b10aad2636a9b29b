//! Wire schema of the card-room protocol
//!
//! Outbound commands are typed and serialized with serde. Inbound payloads
//! come from the server in a loosely-typed shape with no message-type
//! discriminator, so they are classified by inspecting which keys are
//! present.

use crate::common::Strategy;
use crate::errors::{LoadError, Result};
use serde::Serialize;
use serde_json::Value;

/// Commands a virtual user sends to the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(
    tag = "command",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum OutboundMessage {
    CreateRoom {
        strategy: Strategy,
        room_id: String,
    },
    SelectCard {
        strategy: Strategy,
        room_id: String,
        user_id: String,
        card_value: String,
    },
    GetRoom {
        strategy: Strategy,
        room_id: String,
    },
}

impl OutboundMessage {
    pub fn create_room(strategy: Strategy, room_id: &str) -> Self {
        OutboundMessage::CreateRoom {
            strategy,
            room_id: room_id.to_string(),
        }
    }

    pub fn select_card(strategy: Strategy, room_id: &str, user_id: &str, card_value: &str) -> Self {
        OutboundMessage::SelectCard {
            strategy,
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            card_value: card_value.to_string(),
        }
    }

    pub fn get_room(strategy: Strategy, room_id: &str) -> Self {
        OutboundMessage::GetRoom {
            strategy,
            room_id: room_id.to_string(),
        }
    }

    /// Wire name of the command
    pub fn command(&self) -> &'static str {
        match self {
            OutboundMessage::CreateRoom { .. } => "CREATE_ROOM",
            OutboundMessage::SelectCard { .. } => "SELECT_CARD",
            OutboundMessage::GetRoom { .. } => "GET_ROOM",
        }
    }

    /// Encode as a JSON text frame
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// What an inbound payload was recognised as
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// `status == "CREATED"`
    RoomCreated,
    /// `status == "SELECTED"`
    CardSelected,
    /// Carries `roomId` and no `status`; assumed to be a room fetch result
    RoomRead { room_id: String },
    /// Carries an `error` field
    ServerError { message: String },
    /// Well-formed but none of the above
    Unrecognized(Value),
}

impl InboundMessage {
    /// Classify a raw text payload.
    ///
    /// Rules are evaluated in order: `status` first, then the room-read
    /// shape, then `error`. A payload carrying both `roomId` and `error`
    /// without a `status` is therefore counted as a room read.
    pub fn classify(payload: &str) -> Result<Self> {
        let json: Value = serde_json::from_str(payload).map_err(|e| LoadError::Protocol {
            payload: payload.to_string(),
            reason: e.to_string(),
        })?;

        // Keys can be looked up on any other value, but not on null
        if json.is_null() {
            return Err(LoadError::Protocol {
                payload: payload.to_string(),
                reason: "payload is null".to_string(),
            });
        }

        let status = json.get("status").filter(|v| is_present(v));
        match status.and_then(Value::as_str) {
            Some("CREATED") => return Ok(InboundMessage::RoomCreated),
            Some("SELECTED") => return Ok(InboundMessage::CardSelected),
            _ => {}
        }

        if status.is_none()
            && let Some(room_id) = json.get("roomId").filter(|v| is_present(v))
        {
            return Ok(InboundMessage::RoomRead {
                room_id: text_of(room_id),
            });
        }

        if let Some(error) = json.get("error").filter(|v| is_present(v)) {
            return Ok(InboundMessage::ServerError {
                message: text_of(error),
            });
        }

        Ok(InboundMessage::Unrecognized(json))
    }
}

/// Null, `false`, zero and empty strings count as absent
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
