//! Shutdown and drain behaviour of the running server.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use flproxy::lifecycle::{DrainOutcome, ServerLifecycle};
use flproxy::RetryPolicy;
use tokio::net::TcpStream;

mod common;

use common::Reply;

#[tokio::test]
async fn test_idle_server_drains_immediately() {
    let backend = common::unused_addr().await;
    let proxy = common::start_proxy(common::config_for(backend, 10)).await;
    let lifecycle = proxy.lifecycle.clone();
    assert_eq!(*lifecycle.borrow(), ServerLifecycle::Listening);

    let outcome = tokio::time::timeout(Duration::from_secs(1), proxy.stop())
        .await
        .expect("drain should finish");

    assert!(matches!(outcome, DrainOutcome::Clean { .. }));
    assert_eq!(*lifecycle.borrow(), ServerLifecycle::Terminated);
}

#[tokio::test]
async fn test_drain_lets_in_flight_requests_finish() {
    let backend = common::start_programmable_backend(|_| async {
        Reply::after(Duration::from_millis(500), "slow ok")
    })
    .await;
    let proxy = common::start_proxy(common::config_for(backend, 10)).await;
    let addr = proxy.addr;

    let client = common::client();
    let url = proxy.url("/slow");
    let in_flight = tokio::spawn(async move { client.get(url).send().await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    proxy.shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(*proxy.lifecycle.borrow(), ServerLifecycle::Draining);
    assert!(TcpStream::connect(addr).await.is_err(), "listener should be closed");

    let res = in_flight.await.unwrap().unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "slow ok");

    let outcome = proxy.task.await.unwrap();
    assert!(matches!(outcome, DrainOutcome::Clean { .. }));
    assert_eq!(*proxy.lifecycle.borrow(), ServerLifecycle::Terminated);
}

#[tokio::test]
async fn test_drain_window_force_closes_stragglers() {
    let backend = common::start_programmable_backend(|_| async {
        Reply::after(Duration::from_secs(3), "never seen")
    })
    .await;
    let mut config = common::config_for(backend, 10);
    config.timeouts.drain = Duration::from_millis(200);
    let proxy = common::start_proxy(config).await;

    let client = common::client();
    let url = proxy.url("/stuck");
    let in_flight = tokio::spawn(async move { client.get(url).send().await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let start = Instant::now();
    let lifecycle = proxy.lifecycle.clone();
    let outcome = proxy.stop().await;

    assert_eq!(outcome, DrainOutcome::Forced { remaining: 1 });
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(*lifecycle.borrow(), ServerLifecycle::Terminated);
    assert!(in_flight.await.unwrap().is_err());
}

#[tokio::test]
async fn test_drain_waits_for_request_in_backoff() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let backend = common::start_programmable_backend(move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if n == 0 {
                Reply::Hangup
            } else {
                Reply::ok("recovered")
            }
        }
    })
    .await;
    let mut config = common::config_for(backend, 10);
    config.retry = RetryPolicy {
        initial_interval: Duration::from_millis(400),
        multiplier: 1.5,
        randomization_factor: 0.0,
        max_interval: Duration::from_secs(1),
        max_elapsed_time: Duration::from_secs(5),
    };
    let proxy = common::start_proxy(config).await;

    let client = common::client();
    let url = proxy.url("/retry");
    let in_flight = tokio::spawn(async move { client.get(url).send().await });

    // First attempt fails at once; shut down while the 400ms backoff runs.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let outcome = proxy.stop().await;
    assert!(matches!(outcome, DrainOutcome::Clean { .. }), "got {:?}", outcome);

    let res = in_flight.await.unwrap().unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "recovered");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
