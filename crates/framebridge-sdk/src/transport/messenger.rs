//! Window messenger and correlation table.
//!
//! Every outbound request gets the next id from a per-session counter. If the
//! caller wants the reply, a [`PendingCallback`] is recorded under that id and
//! removed the moment the reply arrives, so a replayed reply finds nothing.
//!
//! Frames for a peer whose origin is not yet known are queued and flushed in
//! FIFO order as soon as an accepted message from that peer reveals it. The
//! handshake is the only frame that bypasses the queue (it goes out with `"*"`).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use framebridge_core::error::{FrameBridgeError, Result};
use framebridge_core::protocol::handshake::INITIALIZE_FUNC;
use framebridge_core::protocol::message::{encode, MessageEvent, MessageRequest, MessageResponse};

use super::window::{FrameEnvironment, HostWindow, NativeBridge, WindowId};

/// Communication partner of the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Parent,
    Child,
}

impl Target {
    pub fn as_str(self) -> &'static str {
        match self {
            Target::Parent => "parent",
            Target::Child => "child",
        }
    }
}

/// What to do with the reply to one outstanding request.
pub enum PendingCallback {
    /// Hand the reply args (or the transport failure) to a waiting future.
    Reply(oneshot::Sender<Result<Vec<Value>>>),
    /// Request proxied on behalf of the child; relay the reply under the child's id.
    RelayToChild { child_request_id: u64 },
    /// Reply to the `initialize` request.
    Handshake,
}

/// Frame waiting for its peer, with the request id it carries (if any).
struct Queued {
    id: Option<u64>,
    frame: Value,
}

#[derive(Default)]
struct Peer {
    window: Option<Arc<dyn HostWindow>>,
    origin: Option<String>,
    queue: VecDeque<Queued>,
    drain_waiters: Vec<oneshot::Sender<()>>,
}

impl Peer {
    fn is(&self, id: WindowId) -> bool {
        self.window.as_ref().is_some_and(|w| w.id() == id)
    }

    fn is_live(&self) -> bool {
        self.window.as_ref().is_some_and(|w| !w.is_closed())
    }

    fn is_ready(&self) -> bool {
        self.is_live() && self.origin.is_some()
    }

    fn forget_if_closed(&mut self) {
        if self.window.as_ref().is_some_and(|w| w.is_closed()) {
            self.window = None;
            self.origin = None;
        }
    }

    /// Post right away when the peer is ready and nothing is queued ahead.
    fn post_or_queue(&mut self, id: Option<u64>, frame: Value, target: Target) -> Result<()> {
        if self.queue.is_empty() && self.is_ready() {
            if let (Some(w), Some(origin)) = (self.window.as_ref(), self.origin.as_deref()) {
                return w.post_message(&frame, origin);
            }
        }
        self.queue.push_back(Queued { id, frame });
        trace!(target = target.as_str(), queued = self.queue.len(), "frame queued until peer is ready");
        Ok(())
    }

    /// Post every queued frame. Returns the ids of requests whose post failed,
    /// with the error, so their callbacks can be failed instead of left pending.
    fn flush(&mut self, target: Target) -> Vec<(u64, FrameBridgeError)> {
        let mut failed = Vec::new();
        if !self.is_ready() {
            return failed;
        }
        let (Some(w), Some(origin)) = (self.window.clone(), self.origin.clone()) else {
            return failed;
        };

        let flushed = self.queue.len();
        while let Some(Queued { id, frame }) = self.queue.pop_front() {
            if let Err(e) = w.post_message(&frame, &origin) {
                warn!(target = target.as_str(), id = ?id, error = %e, "dropping queued frame");
                if let Some(id) = id {
                    failed.push((id, e));
                }
            }
        }
        if flushed > 0 {
            debug!(target = target.as_str(), flushed, "flushed queued frames");
        }
        for tx in self.drain_waiters.drain(..) {
            let _ = tx.send(());
        }
        failed
    }

    fn reset(&mut self) {
        self.window = None;
        self.origin = None;
        self.queue.clear();
        self.drain_waiters.clear();
    }
}

struct Peers {
    parent: Peer,
    child: Peer,
}

impl Peers {
    fn get_mut(&mut self, target: Target) -> &mut Peer {
        match target {
            Target::Parent => &mut self.parent,
            Target::Child => &mut self.child,
        }
    }
}

pub struct Messenger {
    bridge: Option<Arc<dyn NativeBridge>>,
    frameless: bool,
    next_id: AtomicU64,
    pending: DashMap<u64, PendingCallback>,
    peers: Mutex<Peers>,
}

impl Messenger {
    pub fn new(env: &FrameEnvironment) -> Self {
        Self {
            bridge: env.native_bridge.clone(),
            frameless: env.is_frameless(),
            next_id: AtomicU64::new(0),
            pending: DashMap::new(),
            peers: Mutex::new(Peers {
                parent: Peer {
                    window: env.upstream(),
                    ..Peer::default()
                },
                child: Peer::default(),
            }),
        }
    }

    pub fn is_frameless(&self) -> bool {
        self.frameless
    }

    pub fn has_child(&self) -> bool {
        self.peers.lock().child.is_live()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn queue_len(&self, target: Target) -> usize {
        self.peers.lock().get_mut(target).queue.len()
    }

    /// Known origin of a peer, once an accepted message revealed it.
    pub fn peer_origin(&self, target: Target) -> Option<String> {
        self.peers.lock().get_mut(target).origin.clone()
    }

    fn next_request(&self, func: &str, args: Vec<Value>) -> MessageRequest {
        MessageRequest {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            func: func.to_string(),
            args,
            timestamp: Some(now_millis()),
        }
    }

    /// Send a request upstream. With `callback == None` the reply is ignored.
    pub fn send_to_parent(
        &self,
        func: &str,
        args: Vec<Value>,
        callback: Option<PendingCallback>,
    ) -> Result<u64> {
        let request = self.next_request(func, args);
        let id = request.id;
        let frame = encode(&request)?;

        if let Some(cb) = callback {
            self.pending.insert(id, cb);
        }

        let sent = if self.frameless {
            self.post_native(&frame)
        } else {
            self.peers.lock().parent.post_or_queue(Some(id), frame, Target::Parent)
        };

        match sent {
            Ok(()) => {
                debug!(id, func, "request sent to parent");
                Ok(id)
            }
            Err(e) => {
                self.pending.remove(&id);
                warn!(id, func, error = %e, "request to parent failed");
                Err(e)
            }
        }
    }

    /// Send a request upstream and get a receiver for the reply args.
    /// The receiver errors if the session is torn down first.
    pub fn request(&self, func: &str, args: Vec<Value>) -> Result<oneshot::Receiver<Result<Vec<Value>>>> {
        let (tx, rx) = oneshot::channel();
        self.send_to_parent(func, args, Some(PendingCallback::Reply(tx)))?;
        Ok(rx)
    }

    /// Send the `initialize` request. The parent's origin is not known yet, so
    /// the frame goes out immediately with target origin `"*"`.
    pub fn send_handshake(&self, args: Vec<Value>) -> Result<u64> {
        let parent = if self.frameless {
            None
        } else {
            let parent = self.peers.lock().parent.window.clone();
            Some(parent.ok_or(FrameBridgeError::NoParentWindow)?)
        };

        let request = self.next_request(INITIALIZE_FUNC, args);
        let id = request.id;
        let frame = encode(&request)?;
        self.pending.insert(id, PendingCallback::Handshake);

        let sent = match parent {
            Some(w) => w.post_message(&frame, "*"),
            None => self.post_native(&frame),
        };
        if let Err(e) = sent {
            self.pending.remove(&id);
            return Err(e);
        }

        debug!(id, frameless = self.frameless, "handshake sent");
        Ok(id)
    }

    /// Send an id-less event to the child, queued until the child is ready.
    pub fn send_event_to_child(&self, func: &str, args: Vec<Value>) -> Result<()> {
        let frame = encode(&MessageEvent {
            func: func.to_string(),
            args,
        })?;
        self.peers.lock().child.post_or_queue(None, frame, Target::Child)
    }

    /// Answer a child request. Dropped when the child is gone.
    pub fn send_response_to_child(&self, id: u64, args: Vec<Value>) -> Result<()> {
        let frame = encode(&MessageResponse { id, args })?;
        let peers = self.peers.lock();
        match (peers.child.is_ready(), &peers.child.window, &peers.child.origin) {
            (true, Some(w), Some(origin)) => w.post_message(&frame, origin),
            _ => {
                debug!(id, "no ready child window, dropping response");
                Ok(())
            }
        }
    }

    /// Record the sender of an accepted message and flush both queues.
    ///
    /// An unknown sender becomes the parent when no live parent is known,
    /// otherwise the child. In frameless mode every window sender is a child.
    pub fn accept_source(&self, source: &Arc<dyn HostWindow>, origin: &str) -> Target {
        let (target, failed) = self.record_source(source, origin);
        for (id, e) in failed {
            self.fail_pending(id, e);
        }
        target
    }

    fn record_source(
        &self,
        source: &Arc<dyn HostWindow>,
        origin: &str,
    ) -> (Target, Vec<(u64, FrameBridgeError)>) {
        let mut peers = self.peers.lock();

        let target = if !self.frameless && (!peers.parent.is_live() || peers.parent.is(source.id())) {
            Target::Parent
        } else {
            Target::Child
        };
        let peer = peers.get_mut(target);
        peer.window = Some(Arc::clone(source));
        peer.origin = Some(origin.to_string());

        peers.parent.forget_if_closed();
        peers.child.forget_if_closed();
        let mut failed = peers.parent.flush(Target::Parent);
        failed.extend(peers.child.flush(Target::Child));

        (target, failed)
    }

    /// Settle a request that will never be answered because its frame was not delivered.
    fn fail_pending(&self, id: u64, error: FrameBridgeError) {
        match self.take_pending(id) {
            Some(PendingCallback::Reply(tx)) => {
                let _ = tx.send(Err(error));
            }
            Some(_) => debug!(id, "dropped pending entry of undelivered frame"),
            None => {}
        }
    }

    /// Remove and return the callback for `id`. At most one caller ever gets it.
    pub fn take_pending(&self, id: u64) -> Option<PendingCallback> {
        self.pending.remove(&id).map(|(_, cb)| cb)
    }

    /// `None` when the queue is already empty, else a receiver fired on the next flush.
    pub fn drain_signal(&self, target: Target) -> Option<oneshot::Receiver<()>> {
        let mut peers = self.peers.lock();
        let peer = peers.get_mut(target);
        if peer.queue.is_empty() {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        peer.drain_waiters.push(tx);
        Some(rx)
    }

    /// Discard every pending callback, queued frame and peer reference.
    pub fn shutdown(&self) {
        let abandoned = self.pending.len();
        self.pending.clear();
        let mut peers = self.peers.lock();
        peers.parent.reset();
        peers.child.reset();
        debug!(abandoned, "messenger shut down");
    }

    fn post_native(&self, frame: &Value) -> Result<()> {
        let bridge = self.bridge.as_ref().ok_or(FrameBridgeError::NoParentWindow)?;
        let json = serde_json::to_string(frame)
            .map_err(|e| FrameBridgeError::Internal(format!("json encode failed: {e}")))?;
        bridge.frameless_post_message(&json)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
