//! `initialize` handshake payloads.
//!
//! The reply is positional: `[frameContext, hostClientType, a, b]` where `a`/`b`
//! are a serialized runtime descriptor and the host's supported SDK version.
//! Host generations disagree on the order of `a` and `b` (and older ones send
//! only the version), so each trailing slot is classified on its own.

use serde_json::{json, Value};
use tracing::debug;

use crate::error::{FrameBridgeError, Result};
use crate::protocol::context::{FrameContext, HostClientType};
use crate::version::SdkVersion;

/// Function name of the handshake request.
pub const INITIALIZE_FUNC: &str = "initialize";

/// Arguments of the handshake request: `[sdkVersion, runtimeApiVersion]`.
pub fn initialize_args(sdk_version: &str, runtime_api_version: u32) -> Vec<Value> {
    vec![json!(sdk_version), json!(runtime_api_version)]
}

/// Normalized handshake reply.
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeReply {
    pub frame_context: FrameContext,
    pub host_client_type: HostClientType,
    /// Descriptor object as sent by the host, not yet validated against the schema.
    pub runtime_config: Option<Value>,
    pub client_supported_sdk_version: Option<SdkVersion>,
}

#[derive(Debug)]
enum Slot {
    Empty,
    Descriptor(Value),
    Version(SdkVersion),
    Unrecognized,
}

impl HandshakeReply {
    /// Interpret the reply args. Trailing slots that are neither a descriptor nor
    /// a version are ignored, and unknown context tags are kept as they are.
    /// Only a reply without a frame context or host client type is an error.
    pub fn from_args(args: &[Value]) -> Result<Self> {
        let frame_context = args
            .first()
            .and_then(Value::as_str)
            .map(FrameContext::parse)
            .ok_or_else(|| FrameBridgeError::MalformedHandshake("missing frame context".into()))?;
        if !frame_context.is_known() {
            debug!(%frame_context, "unknown frame context in handshake reply");
        }

        let host_client_type = args
            .get(1)
            .and_then(Value::as_str)
            .map(HostClientType::parse)
            .ok_or_else(|| FrameBridgeError::MalformedHandshake("missing host client type".into()))?;

        let mut runtime_config = None;
        let mut client_supported_sdk_version = None;
        for (pos, raw) in [(2usize, args.get(2)), (3, args.get(3))] {
            match classify(raw) {
                Slot::Descriptor(v) if runtime_config.is_none() => runtime_config = Some(v),
                Slot::Version(v) if client_supported_sdk_version.is_none() => {
                    client_supported_sdk_version = Some(v)
                }
                Slot::Empty => {}
                other => debug!(pos, slot = ?other, "ignoring handshake slot"),
            }
        }

        Ok(Self {
            frame_context,
            host_client_type,
            runtime_config,
            client_supported_sdk_version,
        })
    }
}

fn classify(raw: Option<&Value>) -> Slot {
    match raw {
        None | Some(Value::Null) => Slot::Empty,
        Some(Value::String(s)) if s.trim().is_empty() => Slot::Empty,
        Some(Value::String(s)) => {
            // Versions first: "2" is also valid JSON but never a descriptor.
            if let Ok(v) = SdkVersion::parse(s) {
                return Slot::Version(v);
            }
            match serde_json::from_str::<Value>(s) {
                Ok(v) if looks_like_descriptor(&v) => Slot::Descriptor(v),
                _ => Slot::Unrecognized,
            }
        }
        Some(v) if looks_like_descriptor(v) => Slot::Descriptor(v.clone()),
        Some(_) => Slot::Unrecognized,
    }
}

fn looks_like_descriptor(v: &Value) -> bool {
    v.get("apiVersion")
        .and_then(Value::as_u64)
        .is_some_and(|n| n > 0)
}
