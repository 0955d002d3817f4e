//! Shared error type across framebridge crates.

use thiserror::Error;

use crate::protocol::context::FrameContext;

/// Caller-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A call was made before the handshake completed.
    Uninitialized,
    /// A call restricted to some frame contexts was made outside them.
    WrongContext,
    /// The negotiated runtime does not carry the capability.
    NotSupportedOnPlatform,
    /// Inbound message from a sender outside the allow-list.
    OriginRejected,
    /// Handshake reply could not be interpreted.
    MalformedHandshake,
    /// Invalid configuration document.
    BadConfig,
    /// Invalid input / malformed message.
    BadRequest,
    /// Neither a parent, an opener nor a native bridge is reachable.
    NoParentWindow,
    /// The underlying window or bridge refused the frame.
    Transport,
    /// The session was torn down while the request was pending.
    Abandoned,
    /// The handshake did not complete within the configured time.
    Timeout,
    /// The host answered with an error.
    Host,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and by pattern-matching callers.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Uninitialized => "UNINITIALIZED",
            ErrorCode::WrongContext => "WRONG_CONTEXT",
            ErrorCode::NotSupportedOnPlatform => "NOT_SUPPORTED_ON_PLATFORM",
            ErrorCode::OriginRejected => "ORIGIN_REJECTED",
            ErrorCode::MalformedHandshake => "MALFORMED_HANDSHAKE",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::NoParentWindow => "NO_PARENT_WINDOW",
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::Abandoned => "ABANDONED",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Host => "HOST",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, FrameBridgeError>;

/// Unified error type used by core and sdk.
///
/// `Clone` so that one in-flight initialization outcome can be handed to every waiter.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FrameBridgeError {
    #[error("The library has not yet been initialized")]
    Uninitialized,
    #[error(
        "This call is only allowed in following contexts: {}. Current context: \"{}\".",
        context_list(.allowed),
        .actual
    )]
    WrongContext {
        allowed: Vec<FrameContext>,
        actual: FrameContext,
    },
    #[error("not supported on platform")]
    NotSupportedOnPlatform,
    #[error("origin rejected: {0}")]
    OriginRejected(String),
    #[error("malformed handshake: {0}")]
    MalformedHandshake(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("Initialization Failed. No Parent window found.")]
    NoParentWindow,
    #[error("transport: {0}")]
    Transport(String),
    #[error("request abandoned at session teardown")]
    Abandoned,
    #[error("{0}")]
    Timeout(String),
    #[error("host error {code}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Host { code: i64, message: Option<String> },
    #[error("internal: {0}")]
    Internal(String),
}

impl FrameBridgeError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            FrameBridgeError::Uninitialized => ErrorCode::Uninitialized,
            FrameBridgeError::WrongContext { .. } => ErrorCode::WrongContext,
            FrameBridgeError::NotSupportedOnPlatform => ErrorCode::NotSupportedOnPlatform,
            FrameBridgeError::OriginRejected(_) => ErrorCode::OriginRejected,
            FrameBridgeError::MalformedHandshake(_) => ErrorCode::MalformedHandshake,
            FrameBridgeError::BadConfig(_) => ErrorCode::BadConfig,
            FrameBridgeError::BadRequest(_) => ErrorCode::BadRequest,
            FrameBridgeError::NoParentWindow => ErrorCode::NoParentWindow,
            FrameBridgeError::Transport(_) => ErrorCode::Transport,
            FrameBridgeError::Abandoned => ErrorCode::Abandoned,
            FrameBridgeError::Timeout(_) => ErrorCode::Timeout,
            FrameBridgeError::Host { .. } => ErrorCode::Host,
            FrameBridgeError::Internal(_) => ErrorCode::Internal,
        }
    }
}

fn context_list(allowed: &[FrameContext]) -> String {
    let quoted: Vec<String> = allowed.iter().map(|c| format!("\"{c}\"")).collect();
    format!("[{}]", quoted.join(","))
}
