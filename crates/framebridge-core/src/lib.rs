//! framebridge core: transport-agnostic wire primitives, error types, and versions.
//!
//! This crate defines the message envelopes, handshake payloads and error surface
//! shared by the SDK and host-side tooling. It carries no window, runtime or
//! transport dependencies so it can be reused on either side of the frame boundary.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `FrameBridgeError`/`Result` so a malicious or
//! outdated host cannot take the frame down with a bad payload.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;
pub mod version;

/// Shared result type.
pub use error::{ErrorCode, FrameBridgeError, Result};
pub use version::SdkVersion;
