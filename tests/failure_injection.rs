//! Failure injection tests against a real HTTP backend.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chatline::chat::TurnInput;
use chatline::error::FALLBACK_MESSAGE;
use chatline::health::ConnectionState;
use chatline::transport::VoicePayload;
use chatline::FailureKind;

mod common;

#[tokio::test]
async fn test_retry_on_server_errors_then_success() {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = calls.clone();
    let addr = common::start_programmable_backend(move |req| {
        let seen = seen.clone();
        async move {
            assert_eq!(req.path, "/chat");
            if seen.fetch_add(1, Ordering::SeqCst) < 2 {
                (503, r#"{"detail":"busy"}"#.into())
            } else {
                common::json_reply("recovered")
            }
        }
    })
    .await;

    let client = common::signed_in_client(&common::test_config(addr));
    let reply = client.send_turn(TurnInput::text("hello")).await.unwrap();

    assert_eq!(reply.content, "recovered");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(client.recent_errors().is_empty());
}

#[tokio::test]
async fn test_multipart_fields_reach_backend() {
    let bodies = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = bodies.clone();
    let addr = common::start_programmable_backend(move |req| {
        sink.lock().unwrap().push(req.body_text());
        async { common::json_reply("ok") }
    })
    .await;

    let client = common::signed_in_client(&common::test_config(addr));
    client.send_turn(TurnInput::text("what about f1?")).await.unwrap();
    client
        .send_turn(TurnInput::Voice(VoicePayload::new(b"OggS".to_vec(), "audio/ogg")))
        .await
        .unwrap();

    let bodies = bodies.lock().unwrap();
    let text = &bodies[0];
    for field in ["message", "type", "sessionId", "userId", "username"] {
        assert!(text.contains(&format!("name=\"{}\"", field)), "missing {field}");
    }
    assert!(text.contains("what about f1?"));
    assert!(text.contains("0xtest"));
    assert!(text.contains(client.session_id()));
    assert!(!text.contains("name=\"audio\""));

    let voice = &bodies[1];
    assert!(voice.contains("name=\"audio\"; filename=\"audio.webm\""));
    assert!(voice.contains("audio/ogg"));
    assert!(voice.contains("voice"));
}

#[tokio::test]
async fn test_relative_audio_url_is_resolved() {
    let addr = common::start_programmable_backend(|_| async {
        (
            200,
            r#"{"message":"spoken","type":"voice","audioUrl":"/api/voice/reply.mp3"}"#.into(),
        )
    })
    .await;

    let client = common::signed_in_client(&common::test_config(addr));
    let reply = client.send_turn(TurnInput::text("say it")).await.unwrap();
    assert_eq!(
        reply.audio_url.as_deref(),
        Some(format!("http://{}/api/voice/reply.mp3", addr).as_str())
    );
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let addr = common::dead_address().await;
    let mut config = common::test_config(addr);
    config.retries.max_retries = 1;
    let client = common::signed_in_client(&config);

    let err = client.send_turn(TurnInput::text("anyone?")).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Network);
    assert!(err.surfaced);
    assert_eq!(err.message, FailureKind::Network.user_message());
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let addr = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        common::json_reply("too late")
    })
    .await;

    let mut config = common::test_config(addr);
    config.timeouts.chat_secs = 1;
    config.retries.max_retries = 0;
    let client = common::signed_in_client(&config);

    let err = client.send_turn(TurnInput::text("hurry")).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn test_cooldown_suppresses_fourth_error() {
    let addr = common::start_programmable_backend(|_| async { (500, "{}".to_string()) }).await;
    let mut config = common::test_config(addr);
    config.retries.max_retries = 0;
    let client = common::signed_in_client(&config);

    for _ in 0..3 {
        let err = client.send_turn(TurnInput::text("ping")).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Server);
        assert!(err.surfaced);
    }

    let err = client.send_turn(TurnInput::text("ping")).await.unwrap_err();
    assert!(!err.surfaced);
    assert_eq!(err.message, FALLBACK_MESSAGE);

    let diagnostics = client.diagnostics();
    assert!(diagnostics.rate_limit.in_cooldown);
    assert_eq!(diagnostics.recent_errors.len(), 4);
    assert!(!diagnostics.recent_errors[3].surfaced);
}

#[tokio::test]
async fn test_health_converges_both_ways() {
    let healthy = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = healthy.clone();
    let addr = common::start_programmable_backend(move |req| {
        let up = flag.load(Ordering::SeqCst);
        async move {
            match (req.path.as_str(), up) {
                ("/health", true) => (200, r#"{"status":"healthy"}"#.into()),
                ("/health", false) => (503, "{}".into()),
                _ => common::json_reply("ok"),
            }
        }
    })
    .await;

    let mut config = common::test_config(addr);
    config.health_check.enabled = true;
    config.health_check.interval_secs = 1;
    let client = common::signed_in_client(&config);
    let status = client.connection_status();

    let reached = tokio::time::timeout(
        Duration::from_secs(5),
        status.wait_for(ConnectionState::Disconnected),
    )
    .await;
    assert_eq!(reached, Ok(true));

    healthy.store(true, Ordering::SeqCst);
    let reached = tokio::time::timeout(
        Duration::from_secs(5),
        status.wait_for(ConnectionState::Connected),
    )
    .await;
    assert_eq!(reached, Ok(true));

    // Probe failures never show up as user-facing errors.
    assert!(client.recent_errors().is_empty());
    client.dispose();
}
