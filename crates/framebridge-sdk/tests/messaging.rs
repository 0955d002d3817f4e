#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use framebridge_core::FrameBridgeError;
use framebridge_sdk::{BeforeUnloadHandler, Handler, ReadyToUnload, Target};

use support::{wait_for, Harness, RecordingWindow, APP_ORIGIN, CHILD_ORIGIN, HOST_ORIGIN};

fn recorder() -> (Handler, Arc<Mutex<Vec<Vec<Value>>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler: Handler = Arc::new(move |args: &[Value]| {
        sink.lock().push(args.to_vec());
        None
    });
    (handler, seen)
}

#[tokio::test]
async fn replies_are_routed_by_id_not_by_order() {
    let h = Harness::new();
    h.initialize_as("content").await;

    let a = h.spawn_request("a");
    wait_for(|| h.count("a") == 1).await;
    let b = h.spawn_request("b");
    wait_for(|| h.count("b") == 1).await;
    let c = h.spawn_request("c");
    wait_for(|| h.count("c") == 1).await;

    let ids = [h.request_id("a"), h.request_id("b"), h.request_id("c")];
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    h.from_parent(json!({"id": ids[2], "args": ["C"]}));
    h.from_parent(json!({"id": ids[0], "args": ["A"]}));
    h.from_parent(json!({"id": ids[1], "args": ["B", 2]}));

    assert_eq!(a.await.unwrap().unwrap(), vec![json!("A")]);
    assert_eq!(b.await.unwrap().unwrap(), vec![json!("B"), json!(2)]);
    assert_eq!(c.await.unwrap().unwrap(), vec![json!("C")]);
    assert_eq!(h.session.pending_len(), 0);
}

#[tokio::test]
async fn requests_before_readiness_are_flushed_in_order() {
    let h = Harness::new();

    let a = h.spawn_request("a");
    wait_for(|| h.session.queued_len(Target::Parent) == 1).await;
    let b = h.spawn_request("b");
    wait_for(|| h.session.queued_len(Target::Parent) == 2).await;
    assert!(h.parent.frames().is_empty());

    h.initialize_as("content").await;

    assert_eq!(h.parent.funcs(), vec!["initialize", "a", "b"]);
    assert!(h.parent.target_origins()[1..].iter().all(|o| o == HOST_ORIGIN));
    assert_eq!(h.session.queued_len(Target::Parent), 0);

    h.from_parent(json!({"id": h.request_id("b"), "args": [2]}));
    h.from_parent(json!({"id": h.request_id("a"), "args": [1]}));
    assert_eq!(a.await.unwrap().unwrap(), vec![json!(1)]);
    assert_eq!(b.await.unwrap().unwrap(), vec![json!(2)]);
}

#[tokio::test]
async fn replayed_reply_is_delivered_once() {
    let h = Harness::new();
    h.initialize_as("content").await;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    h.session
        .send_request_with_callback("getContext", vec![], move |args| {
            assert_eq!(args, vec![json!({"locale": "en-us"})]);
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let id = h.request_id("getContext");
    let reply = json!({"id": id, "args": [{"locale": "en-us"}]});
    h.from_parent(reply.clone());
    wait_for(|| calls.load(Ordering::SeqCst) == 1).await;

    h.from_parent(reply);
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.session.pending_len(), 0);
}

#[tokio::test]
async fn rejected_origin_is_silently_dropped() {
    let h = Harness::new();
    h.initialize_as("content").await;

    let call = h.spawn_request("getContext");
    wait_for(|| h.count("getContext") == 1).await;
    let id = h.request_id("getContext");

    for origin in ["https://evil.com", "http://teams.microsoft.com", "https://teams.microsoft.com.evil.com", "null"] {
        h.from_window(&h.parent, origin, json!({"id": id, "args": ["spoofed"]}));
    }
    assert_eq!(h.session.pending_len(), 1);

    h.from_parent(json!({"id": id, "args": ["real"]}));
    assert_eq!(call.await.unwrap().unwrap(), vec![json!("real")]);
}

#[tokio::test]
async fn malformed_frames_and_own_window_are_ignored() {
    let h = Harness::new();
    h.initialize_as("content").await;
    let (handler, seen) = recorder();
    h.session.register_handler("themeChange", Some(handler));

    h.from_parent(json!("themeChange"));
    h.from_parent(json!({"func": 7}));
    h.from_parent(json!({"id": -1, "args": []}));
    h.from_window(&h.app, APP_ORIGIN, json!({"func": "themeChange", "args": ["dark"]}));
    assert!(seen.lock().is_empty());

    h.from_parent(json!({"func": "themeChange", "args": ["dark"]}));
    assert_eq!(*seen.lock(), vec![vec![json!("dark")]]);
}

#[tokio::test]
async fn handler_registration_is_single_winner() {
    let h = Harness::new();
    h.initialize_as("content").await;

    let (first, first_seen) = recorder();
    let (second, second_seen) = recorder();
    h.session.register_handler("themeChange", Some(first));
    h.session.register_handler("themeChange", Some(second));

    assert_eq!(h.count("registerHandler"), 1);
    assert_eq!(h.parent.find("registerHandler").unwrap()["args"], json!(["themeChange"]));

    h.from_parent(json!({"func": "themeChange", "args": ["contrast"]}));
    assert!(first_seen.lock().is_empty());
    assert_eq!(second_seen.lock().len(), 1);

    h.session.register_handler("themeChange", None);
    assert_eq!(h.parent.find("unregisterHandler").unwrap()["args"], json!(["themeChange"]));
    h.session.register_handler("themeChange", None);
    assert_eq!(h.count("unregisterHandler"), 1);

    h.from_parent(json!({"func": "themeChange", "args": ["light"]}));
    assert_eq!(second_seen.lock().len(), 1);

    let (third, _) = recorder();
    h.session.register_handler("themeChange", Some(third));
    assert_eq!(h.count("registerHandler"), 2);
    assert_eq!(h.session.registered_handlers(), vec!["themeChange".to_string()]);
}

#[tokio::test]
async fn handlers_registered_before_init_are_announced_after_handshake() {
    let h = Harness::new();
    let (handler, _) = recorder();
    h.session.register_handler("load", Some(handler));
    assert!(h.parent.frames().is_empty());

    h.initialize_as("content").await;
    assert_eq!(h.parent.funcs(), vec!["initialize", "registerHandler"]);
}

#[tokio::test]
async fn child_requests_are_answered_locally_or_proxied() {
    let h = Harness::new();
    h.initialize_as("content").await;
    let child = RecordingWindow::new(3);

    h.session.register_handler(
        "getTheme",
        Some(Arc::new(|_args: &[Value]| Some(json!("dark")))),
    );

    // answered by the local handler
    h.from_window(&child, CHILD_ORIGIN, json!({"id": 10, "func": "getTheme", "args": []}));
    assert_eq!(child.last(), json!({"id": 10, "args": ["dark"]}));
    assert_eq!(child.target_origins(), vec![CHILD_ORIGIN.to_string()]);

    // no handler: proxied to the parent, reply relayed under the child's id
    h.from_window(&child, CHILD_ORIGIN, json!({"id": 11, "func": "getContext", "args": [1]}));
    let proxied = h.parent.find("getContext").unwrap();
    assert_eq!(proxied["args"], json!([1]));
    assert_ne!(proxied["id"], 11);

    h.from_parent(json!({"id": proxied["id"], "args": [{"theme": "dark"}]}));
    assert_eq!(child.last(), json!({"id": 11, "args": [{"theme": "dark"}]}));
    assert_eq!(h.session.pending_len(), 0);

    // ids-less frames from the child are not requests
    let before = h.parent.frames().len();
    h.from_window(&child, CHILD_ORIGIN, json!({"func": "getContext", "args": []}));
    assert_eq!(h.parent.frames().len(), before);
}

#[tokio::test]
async fn unhandled_parent_events_are_relayed_to_child() {
    let h = Harness::new();
    h.initialize_as("content").await;
    let child = RecordingWindow::new(3);

    // no child yet: dropped
    h.from_parent(json!({"func": "focusEnter", "args": [true]}));

    h.from_window(&child, CHILD_ORIGIN, json!({"id": 0, "func": "ping", "args": []}));
    h.from_parent(json!({"func": "focusEnter", "args": [true]}));
    assert_eq!(child.last(), json!({"func": "focusEnter", "args": [true]}));
    assert_eq!(child.frames().len(), 1);
}

#[tokio::test]
async fn closed_child_is_forgotten() {
    let h = Harness::new();
    h.initialize_as("content").await;
    let child = RecordingWindow::new(3);
    h.from_window(&child, CHILD_ORIGIN, json!({"id": 0, "func": "ping", "args": []}));
    child.close();

    h.session.send_message_event_to_child("tick", vec![]).unwrap();
    assert_eq!(h.session.queued_len(Target::Child), 1);
    assert!(child.frames().is_empty());

    let replacement = RecordingWindow::new(4);
    h.from_window(&replacement, CHILD_ORIGIN, json!({"id": 0, "func": "ping", "args": []}));
    assert_eq!(replacement.find("tick").unwrap()["args"], json!([]));
}

#[tokio::test]
async fn message_events_to_child_wait_for_readiness() {
    let h = Harness::new();
    h.initialize_as("content").await;

    h.session.send_message_event_to_child("first", vec![json!(1)]).unwrap();
    h.session.send_message_event_to_child("second", vec![json!(2)]).unwrap();
    assert_eq!(h.session.queued_len(Target::Child), 2);

    let session = h.session.clone();
    let drained = tokio::spawn(async move { session.wait_for_message_queue(Target::Child).await });
    tokio::task::yield_now().await;
    assert!(!drained.is_finished());

    let child = RecordingWindow::new(3);
    h.from_window(&child, CHILD_ORIGIN, json!({"id": 0, "func": "ping", "args": []}));
    assert_eq!(child.funcs(), vec!["first", "second"]);
    drained.await.unwrap();

    // an empty queue resolves immediately
    h.session.wait_for_message_queue(Target::Parent).await;
}

#[tokio::test]
async fn own_origin_is_trusted_without_allow_list() {
    let h = Harness::new();
    h.initialize_as("content").await;
    h.session.register_handler("getTheme", Some(Arc::new(|_args: &[Value]| Some(json!(["a", "b"])))));

    let sibling = RecordingWindow::new(9);
    h.from_window(&sibling, APP_ORIGIN, json!({"id": 4, "func": "getTheme", "args": []}));
    assert_eq!(sibling.last(), json!({"id": 4, "args": ["a", "b"]}));
}

#[tokio::test]
async fn before_unload_defaults_to_ready() {
    let h = Harness::new();
    h.initialize_as("content").await;

    h.from_parent(json!({"func": "beforeUnload", "args": []}));
    assert_eq!(h.count("readyToUnload"), 1);
}

#[tokio::test]
async fn before_unload_handler_controls_readiness() {
    let h = Harness::new();
    h.initialize_as("content").await;

    let token: Arc<Mutex<Option<ReadyToUnload>>> = Arc::new(Mutex::new(None));
    let stash = Arc::clone(&token);
    let handler: BeforeUnloadHandler = Arc::new(move |ready| {
        *stash.lock() = Some(ready);
        true
    });
    h.session.register_before_unload_handler(Some(handler));
    assert_eq!(h.parent.find("registerHandler").unwrap()["args"], json!(["beforeUnload"]));

    h.from_parent(json!({"func": "beforeUnload", "args": []}));
    assert_eq!(h.count("readyToUnload"), 0);

    token.lock().take().unwrap().signal();
    assert_eq!(h.count("readyToUnload"), 1);

    // a handler that declines leaves it to the default
    h.session
        .register_before_unload_handler(Some(Arc::new(|_ready: ReadyToUnload| false)));
    h.from_parent(json!({"func": "beforeUnload", "args": []}));
    assert_eq!(h.count("readyToUnload"), 2);
    assert_eq!(h.count("registerHandler"), 1);
}

#[tokio::test]
async fn before_unload_is_relayed_to_child_when_present() {
    let h = Harness::new();
    h.initialize_as("content").await;
    let child = RecordingWindow::new(3);
    h.from_window(&child, CHILD_ORIGIN, json!({"id": 0, "func": "ping", "args": []}));

    h.from_parent(json!({"func": "beforeUnload", "args": []}));
    assert_eq!(child.last(), json!({"func": "beforeUnload", "args": []}));
    assert_eq!(h.count("readyToUnload"), 0);
}

#[tokio::test]
async fn reply_helpers_follow_host_conventions() {
    let h = Harness::new();
    h.initialize_as("content").await;

    let s = h.session.clone();
    let unwrap = tokio::spawn(async move { s.send_and_unwrap::<String>("getName", vec![]).await });
    wait_for(|| h.count("getName") == 1).await;
    h.from_parent(json!({"id": h.request_id("getName"), "args": ["contoso", "ignored"]}));
    assert_eq!(unwrap.await.unwrap().unwrap(), "contoso");

    let s = h.session.clone();
    let status = tokio::spawn(async move { s.send_and_handle_status("share", vec![json!("x")]).await });
    wait_for(|| h.count("share") == 1).await;
    h.from_parent(json!({"id": h.request_id("share"), "args": [false, "user cancelled"]}));
    assert_eq!(
        status.await.unwrap().unwrap_err(),
        FrameBridgeError::Host { code: 500, message: Some("user cancelled".into()) }
    );

    let s = h.session.clone();
    let status = tokio::spawn(async move { s.send_and_handle_status("share", vec![]).await });
    wait_for(|| h.count("share") == 2).await;
    h.from_parent(json!({"id": h.request_id("share"), "args": [true]}));
    assert!(status.await.unwrap().is_ok());

    let s = h.session.clone();
    let sdk = tokio::spawn(async move { s.send_and_handle_sdk_error::<Value>("getUser", vec![]).await });
    wait_for(|| h.count("getUser") == 1).await;
    h.from_parent(json!({"id": h.request_id("getUser"), "args": [{"errorCode": 100, "message": "no"}, null]}));
    let err = sdk.await.unwrap().unwrap_err();
    assert_eq!(err.code().as_str(), "HOST");
    assert_eq!(err.to_string(), "host error 100: no");

    let s = h.session.clone();
    let sdk = tokio::spawn(async move { s.send_and_handle_sdk_error::<Value>("getUser", vec![]).await });
    wait_for(|| h.count("getUser") == 2).await;
    h.from_parent(json!({"id": h.request_id("getUser"), "args": [null, {"id": "u1"}]}));
    assert_eq!(sdk.await.unwrap().unwrap(), json!({"id": "u1"}));
}

#[tokio::test]
async fn teardown_abandons_pending_requests() {
    let h = Harness::new();
    h.initialize_as("content").await;

    let call = h.spawn_request("getContext");
    wait_for(|| h.count("getContext") == 1).await;
    let id = h.request_id("getContext");

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    h.session
        .send_request_with_callback("getSettings", vec![], move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    let cb_id = h.request_id("getSettings");

    let (handler, seen) = recorder();
    h.session.register_handler("themeChange", Some(handler));

    h.session.teardown();
    assert_eq!(call.await.unwrap().unwrap_err(), FrameBridgeError::Abandoned);
    assert_eq!(h.session.pending_len(), 0);
    assert!(h.session.registered_handlers().is_empty());

    // late replies and events reach nothing
    h.from_parent(json!({"id": id, "args": ["late"]}));
    h.from_parent(json!({"id": cb_id, "args": ["late"]}));
    h.from_parent(json!({"func": "themeChange", "args": ["dark"]}));
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(seen.lock().is_empty());
}

#[tokio::test]
async fn transport_failure_surfaces_and_frees_the_id() {
    let h = Harness::new();
    h.initialize_as("content").await;
    h.parent.fail_posts();

    let err = h.session.send_request("getContext", vec![]).await.unwrap_err();
    assert_eq!(err.code().as_str(), "TRANSPORT");
    assert_eq!(h.session.pending_len(), 0);
}

#[tokio::test]
async fn queued_request_that_fails_to_flush_is_settled() {
    let h = Harness::new();

    let a = h.spawn_request("a");
    wait_for(|| h.session.queued_len(Target::Parent) == 1).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    h.session
        .send_request_with_callback("b", vec![], move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    assert_eq!(h.session.queued_len(Target::Parent), 2);

    let session = h.session.clone();
    let init = tokio::spawn(async move { session.initialize(&[]).await });
    wait_for(|| h.count("initialize") == 1).await;

    h.parent.fail_posts();
    h.reply_handshake(json!(["content", "web", "", "2.0.5"]));
    init.await.unwrap().unwrap();

    let err = a.await.unwrap().unwrap_err();
    assert_eq!(err.code().as_str(), "TRANSPORT");
    assert_eq!(h.session.pending_len(), 0);
    assert_eq!(h.session.queued_len(Target::Parent), 0);

    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn status_reply_falls_back_to_default_error() {
    let h = Harness::new();
    h.initialize_as("content").await;
    let default_error = "Cross-origin navigation is only supported for registered URLs.";

    let s = h.session.clone();
    let bare = tokio::spawn(async move {
        s.send_and_handle_status_with_default_error("navigateCrossDomain", default_error, vec![json!("https://x")])
            .await
    });
    wait_for(|| h.count("navigateCrossDomain") == 1).await;
    h.from_parent(json!({"id": h.request_id("navigateCrossDomain"), "args": [false]}));
    assert_eq!(
        bare.await.unwrap().unwrap_err(),
        FrameBridgeError::Host { code: 500, message: Some(default_error.into()) }
    );

    let s = h.session.clone();
    let reasoned = tokio::spawn(async move {
        s.send_and_handle_status_with_default_error("navigateCrossDomain", default_error, vec![]).await
    });
    wait_for(|| h.count("navigateCrossDomain") == 2).await;
    h.from_parent(json!({"id": h.request_id("navigateCrossDomain"), "args": [false, "blocked"]}));
    assert_eq!(
        reasoned.await.unwrap().unwrap_err(),
        FrameBridgeError::Host { code: 500, message: Some("blocked".into()) }
    );

    let s = h.session.clone();
    let ok = tokio::spawn(async move {
        s.send_and_handle_status_with_default_error("navigateCrossDomain", default_error, vec![]).await
    });
    wait_for(|| h.count("navigateCrossDomain") == 3).await;
    h.from_parent(json!({"id": h.request_id("navigateCrossDomain"), "args": [true]}));
    assert!(ok.await.unwrap().is_ok());
}
