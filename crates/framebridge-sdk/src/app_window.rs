//! Parent/child app windows: business-opaque messaging between a task window
//! and the window that opened it, routed through the host.

use std::sync::Arc;

use serde_json::Value;

use framebridge_core::error::Result;
use framebridge_core::protocol::context::FrameContext;

use crate::dispatch::Handler;
use crate::session::{Session, WeakSession};

/// Payloads from the opener to the task window travel under this name.
pub const MESSAGE_FOR_CHILD: &str = "messageForChild";
/// Payloads from the task window to its opener travel under this name.
pub const MESSAGE_FOR_PARENT: &str = "messageForParent";

fn listener_handler<F>(listener: F) -> Handler
where
    F: Fn(Value) + Send + Sync + 'static,
{
    Arc::new(move |args: &[Value]| {
        listener(args.first().cloned().unwrap_or(Value::Null));
        None
    })
}

/// Held by the opener: talks to the task window it spawned.
#[derive(Clone)]
pub struct ChildAppWindow {
    session: Session,
}

impl ChildAppWindow {
    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
        }
    }

    /// Send a payload to the task window. Resolves when the host accepted it.
    pub async fn post_message(&self, message: Value) -> Result<()> {
        self.session.ensure_initialized(&[])?;
        self.session
            .send_and_handle_status(MESSAGE_FOR_CHILD, vec![message])
            .await
    }

    /// Receive payloads the task window sends back. Replaces any earlier listener.
    pub fn add_message_listener<F>(&self, listener: F) -> Result<()>
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.session.ensure_initialized(&[])?;
        self.session
            .register_handler(MESSAGE_FOR_PARENT, Some(listener_handler(listener)));
        Ok(())
    }

    pub fn remove_message_listener(&self) -> Result<()> {
        self.session.ensure_initialized(&[])?;
        self.session.register_handler(MESSAGE_FOR_PARENT, None);
        Ok(())
    }
}

/// Held by a task window: talks to the window that opened it.
/// One per session, obtained through [`Session::parent_app_window`].
#[derive(Clone)]
pub struct ParentAppWindow {
    session: WeakSession,
}

impl ParentAppWindow {
    pub(crate) fn new(session: WeakSession) -> Self {
        Self { session }
    }

    fn task_session(&self) -> Result<Session> {
        let session = self.session.upgrade()?;
        session.ensure_initialized(&[FrameContext::Task])?;
        Ok(session)
    }

    pub async fn post_message(&self, message: Value) -> Result<()> {
        let session = self.task_session()?;
        session
            .send_and_handle_status(MESSAGE_FOR_PARENT, vec![message])
            .await
    }

    pub fn add_message_listener<F>(&self, listener: F) -> Result<()>
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        let session = self.task_session()?;
        session.register_handler(MESSAGE_FOR_CHILD, Some(listener_handler(listener)));
        Ok(())
    }

    pub fn remove_message_listener(&self) -> Result<()> {
        let session = self.task_session()?;
        session.register_handler(MESSAGE_FOR_CHILD, None);
        Ok(())
    }
}
