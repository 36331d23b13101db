//! Chat turn orchestration.
//!
//! # Responsibilities
//! - Reject bad input and missing identity before touching the network
//! - Offer the turn to the intent handler
//! - Dispatch the backend call under admission control, retries and deadlines
//! - Classify terminal failures and let the rate limiter decide visibility
//!
//! # Data Flow
//! ```text
//! send_turn(input)
//!     → validate_input            (validation, surfaced, no limiter)
//!     → IdentityProvider          (auth, surfaced, no limiter)
//!     → IntentHandler::intercept  (local reply, no network)
//!     → Dispatcher::execute(chat-turn)
//!         → RetryPolicy::run_with_hook
//!             → with_deadline(chat timeout, ChatBackend::send_chat)
//!     → Ok(reply) | classify → ErrorRateLimiter::report → surfaced / suppressed
//! ```
//!
//! # Design Decisions
//! - The whole retry loop runs inside one dispatcher slot
//! - Queue-full is shown immediately and never retried
//! - Policy lives behind an ArcSwap so config reloads apply to the next turn

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::time::Instant;

use crate::chat::identity::{IdentityProvider, IntentHandler};
use crate::chat::validate::{validate_input, TurnInput};
use crate::config::{ClientConfig, InputConfig};
use crate::conversation::MessageKind;
use crate::dispatch::{Dispatcher, RequestDescriptor};
use crate::error::{DispatchError, FailureKind, TransportError, TurnError};
use crate::observability::metrics;
use crate::resilience::{classify, ErrorRateLimiter, RateLimits, RetryPolicy};
use crate::resilience::timeouts::with_deadline;
use crate::transport::{ChatBackend, ChatRequest};

/// Per-turn settings that may change at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnPolicy {
    pub input: InputConfig,
    pub chat_timeout: Duration,
    pub retry: RetryPolicy,
}

impl TurnPolicy {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            input: config.input.clone(),
            chat_timeout: config.timeouts.chat(),
            retry: RetryPolicy::from_config(&config.retries),
        }
    }
}

/// Where a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Backend,
    Intent,
}

/// A displayable answer to a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    pub message: String,
    pub kind: MessageKind,
    pub audio_url: Option<String>,
    pub source: ReplySource,
}

pub struct ChatOrchestrator<B> {
    backend: Arc<B>,
    dispatcher: Dispatcher,
    limiter: ErrorRateLimiter,
    identity: Arc<dyn IdentityProvider>,
    intent: Arc<dyn IntentHandler>,
    policy: ArcSwap<TurnPolicy>,
    session_id: String,
}

impl<B: ChatBackend> ChatOrchestrator<B> {
    pub fn new(
        backend: Arc<B>,
        dispatcher: Dispatcher,
        limiter: ErrorRateLimiter,
        identity: Arc<dyn IdentityProvider>,
        intent: Arc<dyn IntentHandler>,
        policy: TurnPolicy,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            dispatcher,
            limiter,
            identity,
            intent,
            policy: ArcSwap::from_pointee(policy),
            session_id: session_id.into(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn policy(&self) -> Arc<TurnPolicy> {
        self.policy.load_full()
    }

    /// Swap in new input limits, timeouts, retry bounds and rate limits.
    pub fn apply_config(&self, config: &ClientConfig) {
        self.policy.store(Arc::new(TurnPolicy::from_config(config)));
        self.limiter.set_limits(RateLimits::from(&config.rate_limit));
        tracing::info!(
            max_retries = config.retries.max_retries,
            chat_timeout_secs = config.timeouts.chat_secs,
            "Turn policy updated"
        );
    }

    /// Send one chat turn.
    pub async fn send_turn(&self, input: TurnInput) -> Result<TurnReply, TurnError> {
        let start = Instant::now();
        let result = self.run_turn(input).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) if e.kind == FailureKind::QueueFull => "rejected",
            Err(e) if e.surfaced => "surfaced",
            Err(_) => "suppressed",
        };
        metrics::record_turn(outcome, start);
        result
    }

    async fn run_turn(&self, input: TurnInput) -> Result<TurnReply, TurnError> {
        let policy = self.policy.load_full();

        if let Err(e) = validate_input(&input, &policy.input) {
            tracing::debug!(reason = %e.message, "Turn rejected by validation");
            return Err(e);
        }

        let Some(user) = self.identity.current_user() else {
            tracing::debug!("Turn rejected, no signed-in user");
            return Err(TurnError::surfaced(FailureKind::Auth));
        };

        if let TurnInput::Text(text) = &input {
            if let Some(reply) = self.intent.intercept(text.trim()) {
                tracing::debug!("Turn handled by intent handler");
                return Ok(TurnReply {
                    message: reply,
                    kind: MessageKind::Text,
                    audio_url: None,
                    source: ReplySource::Intent,
                });
            }
        }

        let request = ChatRequest {
            message: input.message().to_string(),
            kind: input.kind(),
            session_id: self.session_id.clone(),
            user_id: user.wallet_address,
            username: user.username,
            audio: match input {
                TurnInput::Voice(audio) => Some(audio),
                TurnInput::Text(_) => None,
            },
        };

        let backend = self.backend.clone();
        let retry = policy.retry;
        let timeout = policy.chat_timeout;
        let outcome = self
            .dispatcher
            .execute(RequestDescriptor::chat_turn(move || async move {
                retry
                    .run_with_hook(
                        |_| with_deadline(timeout, backend.send_chat(&request)),
                        |_, _, err: &TransportError| metrics::record_retry(classify(err)),
                    )
                    .await
            }))
            .await;

        match outcome {
            Ok(Ok(reply)) => Ok(TurnReply {
                message: reply.message,
                kind: reply.kind,
                audio_url: reply.audio_url,
                source: ReplySource::Backend,
            }),
            Ok(Err(err)) => Err(self.gate(err)),
            Err(DispatchError::QueueFull { capacity }) => {
                metrics::record_error(FailureKind::QueueFull, true);
                tracing::warn!(capacity, "Chat turn rejected, dispatcher queue full");
                Err(TurnError::surfaced(FailureKind::QueueFull))
            }
            Err(DispatchError::Closed) => Err(TurnError::with_message(
                FailureKind::Unknown,
                "The chat client has shut down.",
            )),
        }
    }

    /// Classify a terminal failure and decide whether the user sees it.
    fn gate(&self, err: TransportError) -> TurnError {
        let kind = classify(&err);
        let surfaced = self.limiter.report(kind, err.to_string());
        if surfaced {
            tracing::warn!(kind = %kind, error = %err, "Chat turn failed");
            TurnError::surfaced(kind)
        } else {
            tracing::info!(kind = %kind, error = %err, "Chat turn failed, error suppressed");
            TurnError::suppressed(kind)
        }
    }
}
