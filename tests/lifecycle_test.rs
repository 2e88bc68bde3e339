//! Shutdown orchestration over a real TCP listener.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::Method;
use tokio::sync::{oneshot, Notify};

use request_gate::http::HttpServer;
use request_gate::lifecycle::{CleanupFailure, LifecycleError, LifecycleState, ServerLifecycle};
use request_gate::routing::{self, RouteRegistry};
use request_gate::store::InMemoryCounterStore;

mod common;

fn server_with(routes: RouteRegistry) -> HttpServer {
    let config = common::test_config();
    HttpServer::new(&config, Arc::new(InMemoryCounterStore::new()), routes)
}

/// `/api/v1/slow` signals `entered`, sleeps for `delay`, then sets `finished`.
fn slow_routes(delay: Duration, entered: Arc<Notify>, finished: Arc<AtomicBool>) -> RouteRegistry {
    routing::routes("/api/v1").group("/api/v1", move |v1| {
        v1.register(Method::GET, "/slow", move || {
            let entered = entered.clone();
            let finished = finished.clone();
            async move {
                entered.notify_one();
                tokio::time::sleep(delay).await;
                finished.store(true, Ordering::SeqCst);
                "done"
            }
        })
    })
}

#[tokio::test]
async fn test_cleanups_run_in_order_after_signal() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut lifecycle = ServerLifecycle::new(Duration::from_secs(5));

    let log = calls.clone();
    lifecycle.on_shutdown("closeA", move || async move {
        log.lock().unwrap().push("closeA");
        Err::<(), _>("close failed")
    });
    let log = calls.clone();
    lifecycle.on_shutdown("closeB", move || async move {
        log.lock().unwrap().push("closeB");
        Ok::<(), std::io::Error>(())
    });

    let mut states = lifecycle.subscribe_state();
    let listener = lifecycle.bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (signal_tx, signal_rx) = oneshot::channel::<()>();
    let run = tokio::spawn(lifecycle.run(listener, server_with(routing::routes("/api/v1")), async move {
        let _ = signal_rx.await;
    }));

    states.wait_for(|s| *s == LifecycleState::Serving).await.unwrap();
    let body: serde_json::Value = reqwest::get(format!("http://{}/healthz", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert!(calls.lock().unwrap().is_empty());

    signal_tx.send(()).unwrap();
    let report = run.await.unwrap().unwrap();

    assert!(report.drained);
    assert_eq!(*calls.lock().unwrap(), vec!["closeA", "closeB"]);
    assert_eq!(
        report.cleanup_failures,
        vec![CleanupFailure {
            name: "closeA".to_string(),
            error: "close failed".to_string()
        }]
    );
    assert_eq!(*states.borrow(), LifecycleState::Closed);

    // The listener no longer accepts.
    assert!(reqwest::get(format!("http://{}/healthz", addr)).await.is_err());
}

#[tokio::test]
async fn test_in_flight_request_finishes_during_drain() {
    let entered = Arc::new(Notify::new());
    let lifecycle = ServerLifecycle::new(Duration::from_secs(5));
    let handle = lifecycle.shutdown_handle();
    let listener = lifecycle.bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let finished = Arc::new(AtomicBool::new(false));
    let server = server_with(slow_routes(Duration::from_millis(300), entered.clone(), finished.clone()));
    let run = tokio::spawn(lifecycle.run(listener, server, std::future::pending()));

    let request = tokio::spawn(reqwest::get(format!("http://{}/api/v1/slow", addr)));
    entered.notified().await;
    handle.trigger();

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "done");

    let report = run.await.unwrap().unwrap();
    assert!(report.drained);
    assert!(finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_drain_timeout_cancels_in_flight_handlers_before_cleanup() {
    let entered = Arc::new(Notify::new());
    let finished = Arc::new(AtomicBool::new(false));
    let finished_at_cleanup = Arc::new(Mutex::new(None));

    let mut lifecycle = ServerLifecycle::new(Duration::from_millis(100));
    {
        let finished = finished.clone();
        let seen = finished_at_cleanup.clone();
        lifecycle.on_shutdown("store", move || async move {
            *seen.lock().unwrap() = Some(finished.load(Ordering::SeqCst));
            Ok::<(), std::io::Error>(())
        });
    }
    let handle = lifecycle.shutdown_handle();
    let listener = lifecycle.bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = server_with(slow_routes(Duration::from_millis(800), entered.clone(), finished.clone()));
    let run = tokio::spawn(lifecycle.run(listener, server, std::future::pending()));

    let request = tokio::spawn(reqwest::get(format!("http://{}/api/v1/slow", addr)));
    entered.notified().await;
    handle.trigger();

    let report = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("drain window should bound shutdown")
        .unwrap()
        .unwrap();
    assert!(!report.drained);
    assert_eq!(*finished_at_cleanup.lock().unwrap(), Some(false));

    // The client sees the connection drop instead of a late response.
    let result = tokio::time::timeout(Duration::from_secs(5), request)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_err(), "expected a connection error, got {:?}", result.map(|r| r.status()));

    // Well past the handler's own deadline, it still never completed.
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(!finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_bind_conflict_is_fatal() {
    let lifecycle = ServerLifecycle::new(Duration::from_secs(1));
    let first = lifecycle.bind("127.0.0.1:0").await.unwrap();
    let addr = first.local_addr().unwrap().to_string();

    match lifecycle.bind(&addr).await {
        Err(LifecycleError::Bind { addr: failed, .. }) => assert_eq!(failed, addr),
        other => panic!("expected bind error, got {:?}", other.map(|_| ())),
    }
}
