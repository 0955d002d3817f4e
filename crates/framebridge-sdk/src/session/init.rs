//! Initialization state machine.
//!
//! `Uninitialized -> Initializing -> Initialized`; teardown swaps in a fresh
//! state. While `Initializing`, every caller awaits the same shared outcome,
//! so only one handshake is ever sent per session lifetime.

use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use framebridge_core::error::{FrameBridgeError, Result};
use framebridge_core::protocol::handshake::{initialize_args, HandshakeReply};
use framebridge_core::version::DEFAULT_CLIENT_SUPPORTED_SDK_VERSION;

use crate::config::HandshakeSection;
use crate::context::FrameInfo;
use crate::runtime::{legacy_descriptor, synthesize, RuntimeDescriptor};
use crate::transport::Messenger;

pub(crate) type InitOutcome = Result<Arc<FrameInfo>>;
pub(crate) type SharedInit = Shared<BoxFuture<'static, InitOutcome>>;

/// Observable phase of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitPhase {
    Uninitialized,
    Initializing,
    Initialized,
}

pub(crate) enum InitState {
    Uninitialized,
    Initializing {
        done: SharedInit,
        completer: Option<oneshot::Sender<InitOutcome>>,
    },
    Initialized(Arc<FrameInfo>),
}

impl InitState {
    pub(crate) fn phase(&self) -> InitPhase {
        match self {
            InitState::Uninitialized => InitPhase::Uninitialized,
            InitState::Initializing { .. } => InitPhase::Initializing,
            InitState::Initialized(_) => InitPhase::Initialized,
        }
    }

    pub(crate) fn frame_info(&self) -> Option<Arc<FrameInfo>> {
        match self {
            InitState::Initialized(info) => Some(Arc::clone(info)),
            _ => None,
        }
    }
}

/// Send the handshake if this is the first call, and return the outcome every
/// caller awaits. The state lock is held across the send so a racing reply
/// cannot observe `Uninitialized`.
pub(crate) fn begin(
    state: &Mutex<InitState>,
    messenger: &Messenger,
    handshake: &HandshakeSection,
) -> Result<SharedInit> {
    let mut st = state.lock();
    match &*st {
        InitState::Initialized(info) => return Ok(future::ready(Ok(Arc::clone(info))).boxed().shared()),
        InitState::Initializing { done, .. } => return Ok(done.clone()),
        InitState::Uninitialized => {}
    }

    messenger.send_handshake(initialize_args(&handshake.sdk_version, handshake.runtime_api_version))?;

    let (tx, rx) = oneshot::channel::<InitOutcome>();
    let done = rx
        .map(|r| r.unwrap_or(Err(FrameBridgeError::Abandoned)))
        .boxed()
        .shared();
    *st = InitState::Initializing {
        done: done.clone(),
        completer: Some(tx),
    };
    Ok(done)
}

/// Apply the host's handshake reply. A failed reply is cached as the outcome
/// of this initialization; only teardown clears it.
pub(crate) fn complete(state: &Mutex<InitState>, args: &[Value]) {
    let outcome = build_frame_info(args).map(Arc::new);

    let mut st = state.lock();
    let InitState::Initializing { completer, .. } = &mut *st else {
        debug!("handshake reply without a pending initialization");
        return;
    };
    if let Some(tx) = completer.take() {
        let _ = tx.send(outcome.clone());
    }

    match outcome {
        Ok(info) => {
            info!(
                frame_context = %info.frame_context,
                host_client_type = %info.host_client_type,
                client_supported_sdk_version = %info.client_supported_sdk_version,
                api_version = info.runtime.api_version(),
                legacy = info.runtime.is_legacy(),
                "initialized"
            );
            *st = InitState::Initialized(info);
        }
        Err(e) => warn!(error = %e, "handshake reply rejected"),
    }
}

/// Interpret the handshake reply args.
pub fn build_frame_info(args: &[Value]) -> Result<FrameInfo> {
    let reply = HandshakeReply::from_args(args)?;
    let runtime = resolve_runtime(&reply);
    Ok(FrameInfo {
        frame_context: reply.frame_context,
        host_client_type: reply.host_client_type,
        client_supported_sdk_version: reply
            .client_supported_sdk_version
            .unwrap_or(DEFAULT_CLIENT_SUPPORTED_SDK_VERSION),
        runtime: Arc::new(runtime),
    })
}

/// Host descriptor if valid, else the legacy descriptor widened by the
/// reported version (plain legacy when no version was reported).
pub fn resolve_runtime(reply: &HandshakeReply) -> RuntimeDescriptor {
    if let Some(raw) = &reply.runtime_config {
        match RuntimeDescriptor::from_value(raw) {
            Ok(d) => {
                debug!(api_version = d.api_version(), "using host runtime config");
                return d;
            }
            Err(e) => warn!(error = %e, "host runtime config unusable, falling back to legacy"),
        }
    }

    match reply.client_supported_sdk_version {
        Some(v) => {
            debug!(version = %v, client = %reply.host_client_type, "synthesizing legacy runtime config");
            synthesize(v, &reply.host_client_type)
        }
        None => legacy_descriptor(),
    }
}
