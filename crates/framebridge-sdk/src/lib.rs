//! framebridge SDK: the client side of the frame/host messaging substrate.
//!
//! A [`Session`] owns everything one embedded frame needs to talk to its host:
//! origin policy, the window messenger and correlation table, the handler
//! registry, the initialization state machine and the negotiated runtime
//! capability descriptor. Windows and the native bridge are supplied by the
//! embedder through the traits in [`transport`].
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied outside tests. Anything a
//! host or a hostile window sends is either handled or dropped with a
//! `tracing` event; it never unwinds into the embedder.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod app_window;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod policy;
pub mod runtime;
pub mod session;
pub mod transport;

pub use app_window::{ChildAppWindow, ParentAppWindow};
pub use config::SdkConfig;
pub use context::FrameInfo;
pub use dispatch::{BeforeUnloadHandler, Handler, ReadyToUnload};
pub use runtime::{CapabilitySet, RuntimeDescriptor};
pub use session::{InitPhase, Session};
pub use transport::{FrameEnvironment, HostWindow, InboundEvent, NativeBridge, Target, WindowId};
