use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use framebridge_core::error::Result;

/// Stable identity of a window, used to tell parent, child and self apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

/// A window reachable through the platform's cross-window message primitive.
///
/// `post_message` must not call back into the session synchronously; replies
/// are delivered later through `Session::on_message`.
pub trait HostWindow: Send + Sync {
    fn id(&self) -> WindowId;

    /// Post a structured frame. `target_origin` is the origin the receiver must
    /// have for the platform to deliver it, or `"*"`.
    fn post_message(&self, frame: &Value, target_origin: &str) -> Result<()>;

    fn is_closed(&self) -> bool {
        false
    }
}

/// Native shell bridge used when there is no parent or opener window.
pub trait NativeBridge: Send + Sync {
    /// Deliver a JSON-encoded frame to the native host.
    fn frameless_post_message(&self, json: &str) -> Result<()>;
}

/// What the current window can see of its surroundings at startup.
#[derive(Clone)]
pub struct FrameEnvironment {
    pub current: WindowId,
    /// Origin of the current document, e.g. `https://app.contoso.com`.
    pub current_origin: String,
    /// Embedding window, when the current window is a frame.
    pub parent: Option<Arc<dyn HostWindow>>,
    /// Window that opened the current one, when it is a popup.
    pub opener: Option<Arc<dyn HostWindow>>,
    pub native_bridge: Option<Arc<dyn NativeBridge>>,
}

impl FrameEnvironment {
    pub fn new(current: WindowId, current_origin: impl Into<String>) -> Self {
        Self {
            current,
            current_origin: current_origin.into(),
            parent: None,
            opener: None,
            native_bridge: None,
        }
    }

    pub fn with_parent(mut self, parent: Arc<dyn HostWindow>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_opener(mut self, opener: Arc<dyn HostWindow>) -> Self {
        self.opener = Some(opener);
        self
    }

    pub fn with_native_bridge(mut self, bridge: Arc<dyn NativeBridge>) -> Self {
        self.native_bridge = Some(bridge);
        self
    }

    /// Parent if embedded, else opener.
    pub fn upstream(&self) -> Option<Arc<dyn HostWindow>> {
        self.parent.clone().or_else(|| self.opener.clone())
    }

    /// No upstream window but a native bridge is present.
    pub fn is_frameless(&self) -> bool {
        self.upstream().is_none() && self.native_bridge.is_some()
    }
}

impl fmt::Debug for FrameEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameEnvironment")
            .field("current", &self.current)
            .field("current_origin", &self.current_origin)
            .field("parent", &self.parent.as_ref().map(|w| w.id()))
            .field("opener", &self.opener.as_ref().map(|w| w.id()))
            .field("native_bridge", &self.native_bridge.is_some())
            .finish()
    }
}

/// One delivery of the platform message event.
#[derive(Clone)]
pub struct InboundEvent {
    pub source: Option<Arc<dyn HostWindow>>,
    pub origin: String,
    pub data: Value,
}

impl InboundEvent {
    pub fn new(source: Arc<dyn HostWindow>, origin: impl Into<String>, data: Value) -> Self {
        Self {
            source: Some(source),
            origin: origin.into(),
            data,
        }
    }
}
