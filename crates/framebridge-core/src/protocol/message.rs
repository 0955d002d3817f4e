//! Request / response / event envelopes (JSON).
//!
//! Outbound frames are built from the typed structs. Inbound payloads arrive as
//! untyped JSON from another window and are classified once by [`decode`]:
//! - `{id, func, args}` is a request (only children send these to us)
//! - `{id, args}` is a response to one of our requests
//! - `{func, args}` is an unsolicited event

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FrameBridgeError, Result};

/// Correlated request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRequest {
    /// Per-session correlation id, monotonically increasing from 0.
    pub id: u64,
    /// Function name understood by the receiver.
    pub func: String,
    /// Positional arguments.
    #[serde(default)]
    pub args: Vec<Value>,
    /// Send time, milliseconds since the unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

/// Reply to a [`MessageRequest`], matched by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: u64,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Id-less frame: host events, or events relayed to a child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub func: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Request(MessageRequest),
    Response(MessageResponse),
    Event(MessageEvent),
}

impl Inbound {
    pub fn id(&self) -> Option<u64> {
        match self {
            Inbound::Request(r) => Some(r.id),
            Inbound::Response(r) => Some(r.id),
            Inbound::Event(_) => None,
        }
    }

    pub fn func(&self) -> Option<&str> {
        match self {
            Inbound::Request(r) => Some(&r.func),
            Inbound::Event(e) => Some(&e.func),
            Inbound::Response(_) => None,
        }
    }
}

/// Classify an inbound JSON payload. Never panics on hostile input.
pub fn decode(data: &Value) -> Result<Inbound> {
    let obj = data
        .as_object()
        .ok_or_else(|| FrameBridgeError::BadRequest("frame is not an object".into()))?;

    let id = match obj.get("id") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_u64()
                .ok_or_else(|| FrameBridgeError::BadRequest("frame id is not a non-negative integer".into()))?,
        ),
    };
    let func = match obj.get("func") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(FrameBridgeError::BadRequest("frame func is not a string".into())),
    };
    let args = decode_args(obj)?;

    match (id, func) {
        (Some(id), Some(func)) => Ok(Inbound::Request(MessageRequest {
            id,
            func,
            args,
            timestamp: obj.get("timestamp").and_then(Value::as_u64),
        })),
        (Some(id), None) => Ok(Inbound::Response(MessageResponse { id, args })),
        (None, Some(func)) => Ok(Inbound::Event(MessageEvent { func, args })),
        (None, None) => Err(FrameBridgeError::BadRequest("frame has neither id nor func".into())),
    }
}

/// Parse a frame delivered as a JSON string (native bridge path).
pub fn decode_str(s: &str) -> Result<Inbound> {
    let v: Value = serde_json::from_str(s)
        .map_err(|e| FrameBridgeError::BadRequest(format!("invalid frame json: {e}")))?;
    decode(&v)
}

fn decode_args(obj: &Map<String, Value>) -> Result<Vec<Value>> {
    match obj.get("args") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(a)) => Ok(a.clone()),
        Some(_) => Err(FrameBridgeError::BadRequest("frame args is not an array".into())),
    }
}

/// Serialize an outbound envelope into the structured value handed to a window.
pub fn encode<T: Serialize>(frame: &T) -> Result<Value> {
    serde_json::to_value(frame).map_err(|e| FrameBridgeError::Internal(format!("json encode failed: {e}")))
}
