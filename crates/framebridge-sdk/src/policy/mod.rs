//! Origin policy layer.
//!
//! Compiles the configured and app-supplied origin patterns into a verifier that
//! gates every inbound message before it reaches the messenger or handlers.

pub mod origin;
pub mod verifier;

pub use origin::{is_allowed, validate_host_against_pattern, Origin, OriginPattern};
pub use verifier::{OriginDecision, OriginVerifier};
