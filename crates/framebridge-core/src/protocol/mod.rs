//! Wire protocol modules.
//!
//! - `message`: request/response/event envelopes and inbound classification.
//! - `handshake`: the `initialize` exchange and its positional reply.
//! - `context`: frame context and host client tags.
//!
//! All decoders are panic-free: malformed input from another window is reported
//! as `FrameBridgeError` so a hostile embedder cannot crash the frame.

pub mod context;
pub mod handshake;
pub mod message;
