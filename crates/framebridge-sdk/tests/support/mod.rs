#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use framebridge_core::error::{FrameBridgeError, Result};
use framebridge_sdk::{FrameEnvironment, HostWindow, InboundEvent, NativeBridge, Session, WindowId};

pub const APP_ORIGIN: &str = "https://app.contoso.com";
pub const HOST_ORIGIN: &str = "https://teams.microsoft.com";
pub const CHILD_ORIGIN: &str = "https://tab.teams.microsoft.com";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Window that records every frame posted to it.
pub struct RecordingWindow {
    id: WindowId,
    closed: AtomicBool,
    fail: AtomicBool,
    frames: Mutex<Vec<(Value, String)>>,
}

impl RecordingWindow {
    pub fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            id: WindowId(id),
            closed: AtomicBool::new(false),
            fail: AtomicBool::new(false),
            frames: Mutex::new(Vec::new()),
        })
    }

    pub fn frames(&self) -> Vec<Value> {
        self.frames.lock().iter().map(|(f, _)| f.clone()).collect()
    }

    pub fn target_origins(&self) -> Vec<String> {
        self.frames.lock().iter().map(|(_, o)| o.clone()).collect()
    }

    pub fn funcs(&self) -> Vec<String> {
        self.frames()
            .iter()
            .filter_map(|f| f["func"].as_str().map(str::to_string))
            .collect()
    }

    pub fn last(&self) -> Value {
        self.frames().last().cloned().unwrap_or(Value::Null)
    }

    pub fn count(&self, func: &str) -> usize {
        self.frames().iter().filter(|f| f["func"] == func).count()
    }

    pub fn find(&self, func: &str) -> Option<Value> {
        self.frames().into_iter().find(|f| f["func"] == func)
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn fail_posts(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.frames.lock().clear();
    }
}

impl HostWindow for RecordingWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn post_message(&self, frame: &Value, target_origin: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(FrameBridgeError::Transport("window gone".into()));
        }
        self.frames.lock().push((frame.clone(), target_origin.to_string()));
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Native bridge that records JSON strings.
#[derive(Default)]
pub struct RecordingBridge {
    sent: Mutex<Vec<String>>,
}

impl RecordingBridge {
    pub fn sent(&self) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .map(|s| serde_json::from_str(s).unwrap_or(Value::Null))
            .collect()
    }
}

impl NativeBridge for RecordingBridge {
    fn frameless_post_message(&self, json: &str) -> Result<()> {
        self.sent.lock().push(json.to_string());
        Ok(())
    }
}

pub struct Harness {
    pub session: Session,
    pub app: Arc<RecordingWindow>,
    pub parent: Arc<RecordingWindow>,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let app = RecordingWindow::new(1);
        let parent = RecordingWindow::new(2);
        let env = FrameEnvironment::new(WindowId(1), APP_ORIGIN).with_parent(parent.clone());
        let session = Session::with_defaults(env).unwrap_or_else(|e| panic!("session: {e}"));
        Self { session, app, parent }
    }

    pub fn from_parent(&self, data: Value) {
        self.session
            .on_message(InboundEvent::new(self.parent.clone(), HOST_ORIGIN, data));
    }

    pub fn from_window(&self, window: &Arc<RecordingWindow>, origin: &str, data: Value) {
        self.session
            .on_message(InboundEvent::new(window.clone(), origin, data));
    }

    pub fn spawn_request(&self, func: &str) -> tokio::task::JoinHandle<Result<Vec<Value>>> {
        let session = self.session.clone();
        let func = func.to_string();
        tokio::spawn(async move { session.send_request(&func, vec![]).await })
    }

    pub fn count(&self, func: &str) -> usize {
        self.parent.count(func)
    }

    /// Id of the most recent request posted to the parent with this func.
    pub fn request_id(&self, func: &str) -> u64 {
        self.parent
            .frames()
            .iter()
            .rev()
            .find(|f| f["func"] == func)
            .and_then(|f| f["id"].as_u64())
            .unwrap_or_else(|| panic!("no {func} request posted"))
    }

    /// Answer the pending handshake.
    pub fn reply_handshake(&self, args: Value) {
        let id = self.request_id("initialize");
        self.from_parent(json!({ "id": id, "args": args }));
    }

    /// Run the handshake to completion with the given reply args.
    pub async fn initialize_with(&self, args: Value) {
        let before = self.count("initialize");
        let session = self.session.clone();
        let task = tokio::spawn(async move { session.initialize(&[]).await });
        wait_for(|| self.count("initialize") > before).await;
        self.reply_handshake(args);
        task.await
            .unwrap_or_else(|e| panic!("join: {e}"))
            .unwrap_or_else(|e| panic!("initialize: {e}"));
    }

    pub async fn initialize_as(&self, context: &str) {
        self.initialize_with(json!([context, "web", "", "2.0.5"])).await;
    }
}

/// Yield to the runtime until `cond` holds (bounded).
pub async fn wait_for(cond: impl Fn() -> bool) {
    for _ in 0..1_000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
