use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;

/// Event handler. A returned value is used as the response when the event was
/// a request relayed from a child window.
pub type Handler = Arc<dyn Fn(&[Value]) -> Option<Value> + Send + Sync>;

/// Before-unload handler. Returns `true` if it took responsibility for calling
/// [`ReadyToUnload::signal`].
pub type BeforeUnloadHandler = Arc<dyn Fn(ReadyToUnload) -> bool + Send + Sync>;

/// Host event name for the before-unload notification.
pub const BEFORE_UNLOAD: &str = "beforeUnload";

/// Token handed to the before-unload handler.
#[derive(Clone)]
pub struct ReadyToUnload {
    signal: Arc<dyn Fn() + Send + Sync>,
}

impl ReadyToUnload {
    pub fn new(signal: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            signal: Arc::new(signal),
        }
    }

    /// Tell the host the app finished its cleanup.
    pub fn signal(&self) {
        (self.signal)()
    }
}

impl fmt::Debug for ReadyToUnload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReadyToUnload")
    }
}

/// Effect of a registration on the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First handler for the name.
    Added,
    /// Existing handler swapped out.
    Replaced,
    /// Handler removed.
    Removed,
    /// Removal of a name that had no handler.
    Absent,
}

/// Single-winner handler table keyed by event name.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<String, Handler>,
    before_unload: RwLock<Option<BeforeUnloadHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install, replace or (with `None`) remove the handler for `name`.
    pub fn set(&self, name: &str, handler: Option<Handler>) -> Registration {
        match handler {
            Some(h) => match self.handlers.insert(name.to_string(), h) {
                Some(_) => Registration::Replaced,
                None => Registration::Added,
            },
            None => match self.handlers.remove(name) {
                Some(_) => Registration::Removed,
                None => Registration::Absent,
            },
        }
    }

    pub fn set_before_unload(&self, handler: Option<BeforeUnloadHandler>) -> Registration {
        let mut slot = self.before_unload.write();
        let had = slot.is_some();
        let has = handler.is_some();
        *slot = handler;
        match (had, has) {
            (false, true) => Registration::Added,
            (true, true) => Registration::Replaced,
            (true, false) => Registration::Removed,
            (false, false) => Registration::Absent,
        }
    }

    pub fn get(&self, name: &str) -> Option<Handler> {
        self.handlers.get(name).map(|h| Arc::clone(h.value()))
    }

    pub fn before_unload(&self) -> Option<BeforeUnloadHandler> {
        self.before_unload.read().clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Invoke the handler for `name`. Outer `None` means nothing is registered.
    ///
    /// The table is not locked while the handler runs, so a handler may
    /// re-register itself or others.
    pub fn call(&self, name: &str, args: &[Value]) -> Option<Option<Value>> {
        let handler = self.get(name)?;
        Some(handler(args))
    }

    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        if self.before_unload.read().is_some() {
            names.push(BEFORE_UNLOAD.to_string());
        }
        names.sort();
        names
    }

    pub fn clear(&self) {
        self.handlers.clear();
        *self.before_unload.write() = None;
    }
}
