//! Transport layer: window abstractions and the messenger that frames,
//! correlates and queues traffic to the parent and child windows.

pub mod messenger;
pub mod window;

pub use messenger::{Messenger, PendingCallback, Target};
pub use window::{FrameEnvironment, HostWindow, InboundEvent, NativeBridge, WindowId};
