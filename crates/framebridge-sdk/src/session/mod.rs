//! Session: the explicit per-frame state owner.
//!
//! All mutable state (correlation table, queues, handlers, init state, extra
//! origins) lives in one `Epoch`. Teardown swaps in a fresh epoch in a single
//! step and discards the old one, so no caller can observe a partial reset.
//!
//! This is also the collaborator contract for capability namespaces:
//! `ensure_initialized`, `supports`, `send_request` and `register_handler`.

pub mod init;

use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use framebridge_core::error::{FrameBridgeError, Result};
use framebridge_core::protocol::context::FrameContext;
use framebridge_core::protocol::message::{decode, decode_str, Inbound};
use framebridge_core::version::{SdkVersion, DEFAULT_CLIENT_SUPPORTED_SDK_VERSION};

use crate::app_window::ParentAppWindow;
use crate::config::SdkConfig;
use crate::context::FrameInfo;
use crate::dispatch::{BeforeUnloadHandler, Handler, HandlerRegistry, ReadyToUnload, Registration, BEFORE_UNLOAD};
use crate::policy::OriginVerifier;
use crate::runtime::RuntimeDescriptor;
use crate::transport::{FrameEnvironment, InboundEvent, Messenger, PendingCallback, Target};

use self::init::InitState;
pub use self::init::InitPhase;

const REGISTER_HANDLER: &str = "registerHandler";
const UNREGISTER_HANDLER: &str = "unregisterHandler";
const READY_TO_UNLOAD: &str = "readyToUnload";

/// Error code reported for a failed status reply that carries no code.
const HOST_INTERNAL_ERROR: i64 = 500;

pub(crate) struct Epoch {
    messenger: Arc<Messenger>,
    handlers: HandlerRegistry,
    verifier: OriginVerifier,
    init: Mutex<InitState>,
}

impl Epoch {
    fn new(env: &FrameEnvironment, verifier: OriginVerifier) -> Self {
        Self {
            messenger: Arc::new(Messenger::new(env)),
            handlers: HandlerRegistry::new(),
            verifier,
            init: Mutex::new(InitState::Uninitialized),
        }
    }

    fn shutdown(&self) {
        self.messenger.shutdown();
        self.handlers.clear();
        *self.init.lock() = InitState::Uninitialized;
    }
}

struct SessionInner {
    cfg: SdkConfig,
    env: FrameEnvironment,
    base_verifier: OriginVerifier,
    epoch: RwLock<Arc<Epoch>>,
    parent_app_window: OnceLock<ParentAppWindow>,
}

#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

/// Non-owning handle, used by long-lived helpers that must not keep the session alive.
#[derive(Clone)]
pub(crate) struct WeakSession(Weak<SessionInner>);

impl WeakSession {
    pub(crate) fn upgrade(&self) -> Result<Session> {
        self.0
            .upgrade()
            .map(|inner| Session { inner })
            .ok_or(FrameBridgeError::Uninitialized)
    }
}

#[derive(Deserialize)]
struct SdkErrorPayload {
    #[serde(rename = "errorCode")]
    error_code: i64,
    #[serde(default)]
    message: Option<String>,
}

impl Session {
    /// Build a session for the given window surroundings.
    /// Returns Result so a bad config surfaces at construction, not at first message.
    pub fn new(cfg: SdkConfig, env: FrameEnvironment) -> Result<Self> {
        cfg.validate()?;
        let base_verifier = OriginVerifier::new(&cfg.origins)?;
        let epoch = Arc::new(Epoch::new(&env, base_verifier.clone()));

        debug!(env = ?env, "session created");
        Ok(Self {
            inner: Arc::new(SessionInner {
                cfg,
                env,
                base_verifier,
                epoch: RwLock::new(epoch),
                parent_app_window: OnceLock::new(),
            }),
        })
    }

    pub fn with_defaults(env: FrameEnvironment) -> Result<Self> {
        Self::new(SdkConfig::default(), env)
    }

    pub fn cfg(&self) -> &SdkConfig {
        &self.inner.cfg
    }

    pub fn env(&self) -> &FrameEnvironment {
        &self.inner.env
    }

    pub(crate) fn downgrade(&self) -> WeakSession {
        WeakSession(Arc::downgrade(&self.inner))
    }

    fn epoch(&self) -> Arc<Epoch> {
        self.inner.epoch.read().clone()
    }

    // ---------------------------------------------------------------------
    // Initialization
    // ---------------------------------------------------------------------

    /// Run the handshake, or join the one already in flight.
    ///
    /// `valid_origins` are extra `protocol://host[:port]` patterns trusted for
    /// the rest of this session; invalid entries are ignored.
    pub async fn initialize(&self, valid_origins: &[String]) -> Result<Arc<FrameInfo>> {
        let done = {
            let epoch = self.epoch();
            if !valid_origins.is_empty() {
                let added = epoch.verifier.add_additional(valid_origins);
                debug!(added, "additional origins registered");
            }
            init::begin(&epoch.init, &epoch.messenger, &self.inner.cfg.handshake)?
        };

        match self.inner.cfg.handshake.timeout_ms {
            0 => done.await,
            ms => tokio::time::timeout(Duration::from_millis(ms), done)
                .await
                .map_err(|_| FrameBridgeError::Timeout("SDK initialization timed out.".into()))?,
        }
    }

    pub fn phase(&self) -> InitPhase {
        self.epoch().init.lock().phase()
    }

    pub fn is_initialized(&self) -> bool {
        self.phase() == InitPhase::Initialized
    }

    pub fn frame_info(&self) -> Option<Arc<FrameInfo>> {
        self.epoch().init.lock().frame_info()
    }

    pub fn frame_context(&self) -> Option<FrameContext> {
        self.frame_info().map(|i| i.frame_context.clone())
    }

    pub fn runtime(&self) -> Option<Arc<RuntimeDescriptor>> {
        self.frame_info().map(|i| Arc::clone(&i.runtime))
    }

    /// Fail unless initialized and, when `allowed` is non-empty, running in one of those contexts.
    pub fn ensure_initialized(&self, allowed: &[FrameContext]) -> Result<Arc<FrameInfo>> {
        let info = self.frame_info().ok_or(FrameBridgeError::Uninitialized)?;
        if !allowed.is_empty() && !allowed.contains(&info.frame_context) {
            return Err(FrameBridgeError::WrongContext {
                allowed: allowed.to_vec(),
                actual: info.frame_context.clone(),
            });
        }
        Ok(info)
    }

    /// Pure read; `false` before initialization.
    pub fn supports(&self, name: &str) -> bool {
        self.frame_info().is_some_and(|i| i.supports(name))
    }

    pub fn supports_path(&self, path: &[&str]) -> bool {
        self.frame_info().is_some_and(|i| i.supports_path(path))
    }

    pub fn ensure_supported(&self, path: &[&str]) -> Result<()> {
        let info = self.ensure_initialized(&[])?;
        if info.supports_path(path) {
            Ok(())
        } else {
            Err(FrameBridgeError::NotSupportedOnPlatform)
        }
    }

    /// Compare against the host-reported SDK version (compatibility default before init).
    pub fn is_current_sdk_version_at_least(&self, required: SdkVersion) -> bool {
        let current = self
            .frame_info()
            .map(|i| i.client_supported_sdk_version)
            .unwrap_or(DEFAULT_CLIENT_SUPPORTED_SDK_VERSION);
        current >= required
    }

    pub fn is_host_client_mobile(&self) -> bool {
        self.frame_info().is_some_and(|i| i.is_host_client_mobile())
    }

    // ---------------------------------------------------------------------
    // Outbound
    // ---------------------------------------------------------------------

    /// Send a request to the parent and wait for its reply args.
    ///
    /// No timeout is applied. If the session is torn down first the call
    /// fails with `Abandoned`; if the frame could not be delivered once the
    /// parent became ready, with the transport error.
    pub async fn send_request(&self, func: &str, args: Vec<Value>) -> Result<Vec<Value>> {
        let rx = self.epoch().messenger.request(func, args)?;
        rx.await.unwrap_or(Err(FrameBridgeError::Abandoned))
    }

    /// Callback-style adapter over [`Session::send_request`]. The callback runs
    /// at most once, on a tokio task, and never after teardown.
    pub fn send_request_with_callback<F>(&self, func: &str, args: Vec<Value>, callback: F) -> Result<()>
    where
        F: FnOnce(Vec<Value>) + Send + 'static,
    {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| FrameBridgeError::Internal(format!("callback requests need a tokio runtime: {e}")))?;
        let rx = self.epoch().messenger.request(func, args)?;
        handle.spawn(async move {
            if let Ok(Ok(reply)) = rx.await {
                callback(reply);
            }
        });
        Ok(())
    }

    /// Reply convention: the first arg is the result.
    pub async fn send_and_unwrap<T: DeserializeOwned>(&self, func: &str, args: Vec<Value>) -> Result<T> {
        let reply = self.send_request(func, args).await?;
        let first = reply.into_iter().next().unwrap_or(Value::Null);
        serde_json::from_value(first)
            .map_err(|e| FrameBridgeError::BadRequest(format!("unexpected reply to {func}: {e}")))
    }

    /// Reply convention: `[ok: bool, reason?: string]`.
    pub async fn send_and_handle_status(&self, func: &str, args: Vec<Value>) -> Result<()> {
        let reply = self.send_request(func, args).await?;
        status_outcome(&reply, None)
    }

    /// Like [`Session::send_and_handle_status`], but a failure without a
    /// reason carries `default_error` as its message.
    pub async fn send_and_handle_status_with_default_error(
        &self,
        func: &str,
        default_error: &str,
        args: Vec<Value>,
    ) -> Result<()> {
        let reply = self.send_request(func, args).await?;
        status_outcome(&reply, Some(default_error))
    }

    /// Reply convention: `[error | null, result]`.
    pub async fn send_and_handle_sdk_error<T: DeserializeOwned>(
        &self,
        func: &str,
        args: Vec<Value>,
    ) -> Result<T> {
        let mut reply = self.send_request(func, args).await?.into_iter();
        let error = reply.next().unwrap_or(Value::Null);
        let result = reply.next().unwrap_or(Value::Null);

        if !error.is_null() {
            let e: SdkErrorPayload = serde_json::from_value(error)
                .map_err(|e| FrameBridgeError::BadRequest(format!("malformed error in reply to {func}: {e}")))?;
            return Err(FrameBridgeError::Host {
                code: e.error_code,
                message: e.message,
            });
        }
        serde_json::from_value(result)
            .map_err(|e| FrameBridgeError::BadRequest(format!("unexpected reply to {func}: {e}")))
    }

    /// Send an id-less event to the child window, queued until it is ready.
    pub fn send_message_event_to_child(&self, func: &str, args: Vec<Value>) -> Result<()> {
        self.epoch().messenger.send_event_to_child(func, args)
    }

    /// Resolve once nothing is queued for `target`.
    pub async fn wait_for_message_queue(&self, target: Target) {
        let signal = self.epoch().messenger.drain_signal(target);
        if let Some(rx) = signal {
            let _ = rx.await;
        }
    }

    pub fn queued_len(&self, target: Target) -> usize {
        self.epoch().messenger.queue_len(target)
    }

    pub fn pending_len(&self) -> usize {
        self.epoch().messenger.pending_count()
    }

    // ---------------------------------------------------------------------
    // Handlers
    // ---------------------------------------------------------------------

    /// Install, replace or (with `None`) remove the handler for a host event.
    ///
    /// The host is told once when a name gains its first handler and once when
    /// it loses it; replacing a handler sends nothing.
    pub fn register_handler(&self, name: &str, handler: Option<Handler>) {
        let epoch = self.epoch();
        let change = epoch.handlers.set(name, handler);
        notify_registration(&epoch, name, change);
    }

    pub fn register_before_unload_handler(&self, handler: Option<BeforeUnloadHandler>) {
        let epoch = self.epoch();
        let change = epoch.handlers.set_before_unload(handler);
        notify_registration(&epoch, BEFORE_UNLOAD, change);
    }

    pub fn registered_handlers(&self) -> Vec<String> {
        self.epoch().handlers.registered_names()
    }

    // ---------------------------------------------------------------------
    // Inbound
    // ---------------------------------------------------------------------

    /// Entry point for the platform message event.
    ///
    /// Messages from the current window, from rejected origins, or that are not
    /// valid frames are dropped without any effect on session state.
    pub fn on_message(&self, event: InboundEvent) {
        let Some(source) = event.source else {
            debug!(origin = %event.origin, "dropping message without source");
            return;
        };
        if source.id() == self.inner.env.current {
            return;
        }

        let epoch = self.epoch();
        let decision = epoch.verifier.evaluate(&event.origin, &self.inner.env.current_origin);
        if !decision.is_accepted() {
            debug!(origin = %event.origin, "dropping message from rejected origin");
            return;
        }

        let frame = match decode(&event.data) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(origin = %event.origin, error = %e, "dropping malformed frame");
                return;
            }
        };

        match epoch.messenger.accept_source(&source, &event.origin) {
            Target::Parent => self.handle_parent_message(&epoch, frame),
            Target::Child => self.handle_child_message(&epoch, frame),
        }
    }

    /// Entry point for frames delivered by the native bridge in frameless mode.
    pub fn on_native_message(&self, json: &str) {
        let epoch = self.epoch();
        if !epoch.messenger.is_frameless() {
            debug!("dropping native message outside frameless mode");
            return;
        }
        match decode_str(json) {
            Ok(frame) => self.handle_parent_message(&epoch, frame),
            Err(e) => debug!(error = %e, "dropping malformed native frame"),
        }
    }

    fn handle_parent_message(&self, epoch: &Arc<Epoch>, frame: Inbound) {
        match frame {
            Inbound::Response(r) => resolve(epoch, r.id, r.args),
            Inbound::Request(r) => resolve(epoch, r.id, r.args),
            Inbound::Event(e) => self.dispatch_parent_event(epoch, &e.func, e.args),
        }
    }

    fn dispatch_parent_event(&self, epoch: &Arc<Epoch>, func: &str, args: Vec<Value>) {
        if func == BEFORE_UNLOAD {
            handle_before_unload(epoch);
            return;
        }

        if epoch.handlers.call(func, &args).is_some() {
            debug!(func, "handler invoked");
            return;
        }

        if epoch.messenger.has_child() {
            debug!(func, "relaying unhandled event to child");
            if let Err(e) = epoch.messenger.send_event_to_child(func, args) {
                warn!(func, error = %e, "event relay to child failed");
            }
        } else {
            debug!(func, "no handler for event");
        }
    }

    fn handle_child_message(&self, epoch: &Arc<Epoch>, frame: Inbound) {
        let Inbound::Request(req) = frame else {
            debug!("ignoring non-request frame from child");
            return;
        };

        if let Some(Some(result)) = epoch.handlers.call(&req.func, &req.args) {
            let args = match result {
                Value::Array(a) => a,
                other => vec![other],
            };
            if let Err(e) = epoch.messenger.send_response_to_child(req.id, args) {
                warn!(id = req.id, error = %e, "response to child failed");
            }
            return;
        }

        let relay = PendingCallback::RelayToChild {
            child_request_id: req.id,
        };
        if let Err(e) = epoch.messenger.send_to_parent(&req.func, req.args, Some(relay)) {
            warn!(func = %req.func, error = %e, "proxying child request failed");
        }
    }

    // ---------------------------------------------------------------------
    // App windows / teardown
    // ---------------------------------------------------------------------

    /// The lazily created handle to the window that opened this task window.
    pub fn parent_app_window(&self) -> Result<ParentAppWindow> {
        self.ensure_initialized(&[FrameContext::Task])?;
        Ok(self
            .inner
            .parent_app_window
            .get_or_init(|| ParentAppWindow::new(self.downgrade()))
            .clone())
    }

    /// Reset every piece of session state in one step. Pending requests are
    /// abandoned, queued frames and handlers are discarded.
    pub fn teardown(&self) {
        let fresh = Arc::new(Epoch::new(&self.inner.env, self.inner.base_verifier.clone()));
        let old = std::mem::replace(&mut *self.inner.epoch.write(), fresh);
        let abandoned = old.messenger.pending_count();
        old.shutdown();
        info!(abandoned, "session torn down");
    }
}

fn status_outcome(reply: &[Value], default_error: Option<&str>) -> Result<()> {
    if reply.first().and_then(Value::as_bool).unwrap_or(false) {
        return Ok(());
    }
    let reason = reply
        .get(1)
        .and_then(Value::as_str)
        .filter(|r| !r.is_empty())
        .or(default_error);
    Err(FrameBridgeError::Host {
        code: HOST_INTERNAL_ERROR,
        message: reason.map(str::to_string),
    })
}

fn notify_registration(epoch: &Epoch, name: &str, change: Registration) {
    let func = match change {
        Registration::Added => REGISTER_HANDLER,
        Registration::Removed => UNREGISTER_HANDLER,
        Registration::Replaced | Registration::Absent => return,
    };
    if let Err(e) = epoch.messenger.send_to_parent(func, vec![json!(name)], None) {
        warn!(handler = name, control = func, error = %e, "handler registration not delivered");
    }
}

fn resolve(epoch: &Arc<Epoch>, id: u64, args: Vec<Value>) {
    match epoch.messenger.take_pending(id) {
        None => debug!(id, "dropping reply with unknown id"),
        Some(PendingCallback::Reply(tx)) => {
            debug!(id, "reply received");
            let _ = tx.send(Ok(args));
        }
        Some(PendingCallback::RelayToChild { child_request_id }) => {
            if let Err(e) = epoch.messenger.send_response_to_child(child_request_id, args) {
                warn!(id, child_request_id, error = %e, "relaying reply to child failed");
            }
        }
        Some(PendingCallback::Handshake) => init::complete(&epoch.init, &args),
    }
}

fn handle_before_unload(epoch: &Arc<Epoch>) {
    let messenger = Arc::clone(&epoch.messenger);
    let token = ReadyToUnload::new(move || {
        if let Err(e) = messenger.send_to_parent(READY_TO_UNLOAD, Vec::new(), None) {
            warn!(error = %e, "readyToUnload not delivered");
        }
    });

    if epoch.handlers.before_unload().is_some_and(|h| h(token.clone())) {
        return;
    }

    if epoch.messenger.has_child() {
        if let Err(e) = epoch.messenger.send_event_to_child(BEFORE_UNLOAD, Vec::new()) {
            warn!(error = %e, "beforeUnload relay to child failed");
        }
    } else {
        token.signal();
    }
}
