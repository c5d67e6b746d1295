use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Notify};

use tsubasa_service_shared::{Lifecycle, LifecycleState, ShutdownOutcome};

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let base = format!("http://{}", listener.local_addr().expect("local addr"));
    (listener, base)
}

#[tokio::test]
async fn idle_server_stops_gracefully() {
    let (listener, base) = bind().await;
    let app = Router::new().route("/", get(|| async { "hi" }));

    let lifecycle = Lifecycle::new(Duration::from_secs(2));
    let mut states = lifecycle.subscribe();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(lifecycle.run(listener, app, async move {
        let _ = stop_rx.await;
    }));

    states
        .wait_for(|s| *s == LifecycleState::Listening)
        .await
        .expect("reaches listening");

    let body = reqwest::get(&base)
        .await
        .expect("request succeeds")
        .text()
        .await
        .expect("body");
    assert_eq!(body, "hi");

    stop_tx.send(()).expect("server still waiting");

    let outcome = server
        .await
        .expect("server task joins")
        .expect("server runs cleanly");
    assert_eq!(outcome, ShutdownOutcome::Graceful);
    assert_eq!(*states.borrow(), LifecycleState::Stopped);
}

#[tokio::test]
async fn slow_request_exceeds_the_grace_period() {
    let (listener, base) = bind().await;

    let started = Arc::new(Notify::new());
    let app = {
        let started = started.clone();
        Router::new().route(
            "/slow",
            get(move || {
                let started = started.clone();
                async move {
                    started.notify_one();
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    "too late"
                }
            }),
        )
    };

    let lifecycle = Lifecycle::new(Duration::from_millis(200));
    let mut states = lifecycle.subscribe();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(lifecycle.run(listener, app, async move {
        let _ = stop_rx.await;
    }));

    states
        .wait_for(|s| *s == LifecycleState::Listening)
        .await
        .expect("reaches listening");

    let _client = tokio::spawn(reqwest::get(format!("{base}/slow")));
    started.notified().await;

    stop_tx.send(()).expect("server still waiting");

    let outcome = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("shutdown is bounded by the grace period")
        .expect("server task joins")
        .expect("server runs cleanly");
    assert_eq!(outcome, ShutdownOutcome::DeadlineExceeded);
    assert!(!outcome.is_graceful());
    assert_eq!(*states.borrow(), LifecycleState::Stopped);
}
