//! Top-level facade crate for framebridge.
//!
//! Re-exports the wire primitives and the client SDK so embedders can depend on a single crate.

pub mod core {
    pub use framebridge_core::*;
}

pub mod sdk {
    pub use framebridge_sdk::*;
}
