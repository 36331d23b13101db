//! Admission control under bursts of chat turns.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;

use chatline::chat::TurnInput;
use chatline::FailureKind;

mod common;

/// Backend that holds each chat request for `hold` and tracks concurrency.
async fn slow_backend(
    hold: Duration,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
) -> std::net::SocketAddr {
    common::start_programmable_backend(move |req| {
        let in_flight = in_flight.clone();
        let peak = peak.clone();
        let total = total.clone();
        async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            total.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(hold).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            let body = req.body_text();
            let tag = body
                .split("turn-")
                .nth(1)
                .and_then(|rest| rest.split(|c: char| !c.is_ascii_digit()).next())
                .unwrap_or("?")
                .to_string();
            common::json_reply(&format!("done-{}", tag))
        }
    })
    .await
}

#[tokio::test]
async fn test_five_turns_three_run_two_queue() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let total = Arc::new(AtomicUsize::new(0));
    let addr = slow_backend(
        Duration::from_millis(1000),
        in_flight.clone(),
        peak.clone(),
        total.clone(),
    )
    .await;

    let mut config = common::test_config(addr);
    config.dispatcher.max_concurrent = 3;
    config.dispatcher.max_queue_size = 5;
    let client = Arc::new(common::signed_in_client(&config));

    let turns: Vec<_> = (0..5)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                client.send_turn(TurnInput::text(format!("turn-{}", i))).await
            })
        })
        .collect();

    let settled = common::eventually(Duration::from_secs(5), || {
        let stats = client.diagnostics().dispatcher;
        stats.active == 3 && stats.queued == 2
    })
    .await;
    assert!(settled, "never saw 3 running and 2 queued");

    let mut replies: Vec<String> = join_all(turns)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().content)
        .collect();
    replies.sort();

    assert_eq!(replies, ["done-0", "done-1", "done-2", "done-3", "done-4"]);
    assert_eq!(total.load(Ordering::SeqCst), 5);
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(client.diagnostics().dispatcher.peak_active, 3);
    assert_eq!(client.conversation_len(), 10);
}

#[tokio::test]
async fn test_overflow_rejects_newest() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let total = Arc::new(AtomicUsize::new(0));
    let addr = slow_backend(
        Duration::from_millis(300),
        in_flight,
        peak.clone(),
        total.clone(),
    )
    .await;

    let mut config = common::test_config(addr);
    config.dispatcher.max_concurrent = 3;
    config.dispatcher.max_queue_size = 5;
    let client = Arc::new(common::signed_in_client(&config));

    let mut handles = Vec::new();
    for i in 0..10 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client.send_turn(TurnInput::text(format!("turn-{}", i))).await
        }));
        // Keep submission order deterministic.
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let rejected: Vec<usize> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| matches!(r, Err(e) if e.kind == FailureKind::QueueFull))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(rejected, [8, 9]);
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 8);
    assert_eq!(total.load(Ordering::SeqCst), 8);
    assert!(peak.load(Ordering::SeqCst) <= 3);

    // Queue-full is shown straight away, not routed through the limiter.
    assert!(client.recent_errors().is_empty());
}
