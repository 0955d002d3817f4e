//! Handler dispatch for unsolicited host events.

pub mod handlers;

pub use handlers::{
    BeforeUnloadHandler, Handler, HandlerRegistry, ReadyToUnload, Registration, BEFORE_UNLOAD,
};
