//! Shutdown integration tests
//!
//! Fires the host's shutdown signal and checks that every extension
//! releases its resources exactly once

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;

use beacon_modifiers::modifiers::MODIFIER_NAMESPACE;
use beacon_modifiers::{PathRewriter, PluginHost, ShutdownSignal};

mod common;
use common::{FakeLoader, RecordingLogger, object, touch_all};

#[tokio::test]
async fn waiters_wake_on_shutdown() {
    let host = PluginHost::with_logger(None);
    let token = host.shutdown_token();

    let waiter = tokio::spawn(async move {
        token.cancelled().await;
        true
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(host.shutdown());

    let woke = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
    assert!(woke);
}

#[test]
fn modifiers_clean_up_once() {
    let dir = tempfile::tempdir().unwrap();
    touch_all(dir.path(), &["alpha.so", "beta.so"]);

    let (recorder, logger) = RecordingLogger::shared();
    let mut host = PluginHost::with_logger(Some(logger));
    host.load_all(dir.path(), ".so", &FakeLoader).unwrap();

    let _pipeline = host.pipeline(&object(json!({
        MODIFIER_NAMESPACE: {
            "name": [
                "omni.alpha-request",
                "omni.alpha-response",
                "omni.beta-request"
            ]
        }
    })));
    assert_eq!(host.shutdown_token().pending_cleanups(), 3);
    assert_eq!(recorder.count("Shutting down the service"), 0);

    assert!(host.shutdown());
    assert_eq!(recorder.count("Shutting down the service"), 3);
    assert_eq!(host.shutdown_token().pending_cleanups(), 0);

    assert!(!host.shutdown());
    assert_eq!(recorder.count("Shutting down the service"), 3);
}

#[test]
fn late_registration_cleans_up_immediately() {
    let (recorder, logger) = RecordingLogger::shared();
    let mut host = PluginHost::with_logger(Some(logger));
    host.shutdown();

    host.register(Arc::new(PathRewriter::with_name("omni.late")));
    let _pipeline = host.pipeline(&object(json!({
        MODIFIER_NAMESPACE: { "name": "omni.late-request" }
    })));

    assert_eq!(recorder.count("Shutting down the service"), 1);
}

#[test]
fn cleanups_from_many_tokens_run_once() {
    let signal = ShutdownSignal::new();
    let runs = Arc::new(AtomicUsize::new(0));

    for i in 0..4 {
        let runs = Arc::clone(&runs);
        signal.token().on_shutdown(format!("cleanup-{i}"), move || {
            runs.fetch_add(1, Ordering::SeqCst);
        });
    }

    assert!(signal.fire());
    assert!(!signal.fire());
    assert_eq!(runs.load(Ordering::SeqCst), 4);
}

#[test]
fn dropped_host_releases_extensions() {
    let rewriter = PathRewriter::with_name("omni.dropped");
    let state = Arc::downgrade(rewriter.state());

    let (_recorder, logger) = RecordingLogger::shared();
    let mut host = PluginHost::with_logger(Some(logger));
    host.register(Arc::new(rewriter));
    let pipeline = host.pipeline(&object(json!({
        MODIFIER_NAMESPACE: { "name": ["omni.dropped-request", "omni.dropped-response"] }
    })));
    assert_eq!(host.shutdown_token().pending_cleanups(), 2);

    drop(pipeline);
    drop(host);
    assert!(state.upgrade().is_none());
}

#[test]
fn rebuilt_pipelines_do_not_accumulate_cleanups() {
    let mut host = PluginHost::with_logger(None);
    host.register(Arc::new(PathRewriter::with_name("omni.rebuilt")));
    let extra = object(json!({
        MODIFIER_NAMESPACE: { "name": ["omni.rebuilt-request", "omni.rebuilt-response"] }
    }));

    for _ in 0..100 {
        drop(host.pipeline(&extra));
    }
    assert_eq!(host.shutdown_token().pending_cleanups(), 2);
}
