//! Frame context negotiated by the handshake, shared read-only across layers.

pub mod frame;

pub use frame::FrameInfo;
