//! The UI-facing chat client.
//!
//! # Responsibilities
//! - Own the shared pieces: dispatcher, rate limiter, health monitor, conversation
//! - Expose `send_turn`, `connection_state` and `recent_errors` to the UI
//! - Tear everything down on `dispose` (health interval, cooldown timer, queue)
//!
//! # Data Flow
//! ```text
//! UI ──send_turn──▶ ChatOrchestrator ──▶ Dispatcher ──▶ ChatBackend
//!  │                      │
//!  │                      └─ reply / TurnError ──▶ Conversation (append)
//!  │
//!  └─connection_state◀── HealthMonitor (own task, same Dispatcher)
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::chat::{
    validate_input, ChatOrchestrator, IdentityProvider, IntentHandler, PassThrough, TurnInput,
};
use crate::config::ClientConfig;
use crate::conversation::{Conversation, Message, MessageKind, WindowSettings};
use crate::dispatch::{Dispatcher, DispatcherStats};
use crate::error::{FailureKind, TransportError, TurnError};
use crate::health::{ConnectionState, ConnectionStatus, HealthMonitor, HealthSettings};
use crate::lifecycle::Shutdown;
use crate::resilience::{ErrorRateLimiter, ErrorRecord, RateLimitSnapshot, RateLimits};
use crate::transport::{ChatBackend, HttpBackend};

/// Everything the diagnostics view shows.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub session_id: String,
    pub connection: ConnectionState,
    pub dispatcher: DispatcherStats,
    pub rate_limit: RateLimitSnapshot,
    pub recent_errors: Vec<ErrorRecord>,
}

pub struct ChatClient<B: ChatBackend = HttpBackend> {
    orchestrator: ChatOrchestrator<B>,
    dispatcher: Dispatcher,
    limiter: ErrorRateLimiter,
    connection: ConnectionStatus,
    conversation: Mutex<Conversation>,
    window: WindowSettings,
    shutdown: Shutdown,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl ChatClient<HttpBackend> {
    /// Client talking HTTP to `config.backend`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(
        config: &ClientConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, TransportError> {
        let backend = HttpBackend::new(&config.backend)?;
        Ok(Self::new(Arc::new(backend), config, identity))
    }
}

impl<B: ChatBackend> ChatClient<B> {
    /// Must be called from within a Tokio runtime.
    pub fn new(
        backend: Arc<B>,
        config: &ClientConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self::with_intent_handler(backend, config, identity, Arc::new(PassThrough))
    }

    pub fn with_intent_handler(
        backend: Arc<B>,
        config: &ClientConfig,
        identity: Arc<dyn IdentityProvider>,
        intent: Arc<dyn IntentHandler>,
    ) -> Self {
        let session_id = Uuid::new_v4().to_string();
        let dispatcher = Dispatcher::new(&config.dispatcher);
        let limiter = ErrorRateLimiter::new(RateLimits::from(&config.rate_limit));
        let shutdown = Shutdown::new();

        let (monitor, connection) = HealthMonitor::new(
            backend.clone(),
            dispatcher.clone(),
            HealthSettings::from_config(config),
        );
        let monitor = monitor.spawn(shutdown.subscribe());

        let orchestrator = ChatOrchestrator::new(
            backend,
            dispatcher.clone(),
            limiter.clone(),
            identity,
            intent,
            crate::chat::TurnPolicy::from_config(config),
            session_id.clone(),
        );

        tracing::info!(
            session_id = %session_id,
            backend = %config.backend.base_url,
            max_concurrent = config.dispatcher.max_concurrent,
            max_queue_size = config.dispatcher.max_queue_size,
            "Chat client started"
        );

        Self {
            orchestrator,
            dispatcher,
            limiter,
            connection,
            conversation: Mutex::new(Conversation::new()),
            window: WindowSettings::from(&config.renderer),
            shutdown,
            monitor: Mutex::new(Some(monitor)),
        }
    }

    fn conversation_mut(&self) -> MutexGuard<'_, Conversation> {
        self.conversation.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Send a turn and append both sides to the conversation.
    ///
    /// Rejected input (validation, auth) leaves the conversation untouched.
    /// Every other failure is appended as a system message carrying the
    /// displayable error text.
    pub async fn send_turn(&self, input: TurnInput) -> Result<Message, TurnError> {
        validate_input(&input, &self.orchestrator.policy().input)?;
        let kind = input.kind();
        let text = input.message().to_string();

        match self.orchestrator.send_turn(input).await {
            Ok(reply) => {
                let mut conversation = self.conversation_mut();
                conversation.push_user(text, kind);
                Ok(conversation
                    .push_system(reply.message, reply.kind, reply.audio_url)
                    .clone())
            }
            Err(err) if err.kind == FailureKind::Auth => Err(err),
            Err(err) => {
                let mut conversation = self.conversation_mut();
                conversation.push_user(text, kind);
                conversation.push_system(err.message.clone(), MessageKind::Text, None);
                Err(err)
            }
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.get()
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection.clone()
    }

    /// Bounded list of recorded failures, oldest first.
    pub fn recent_errors(&self) -> Vec<ErrorRecord> {
        self.limiter.recent_errors()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            session_id: self.orchestrator.session_id().to_string(),
            connection: self.connection.get(),
            dispatcher: self.dispatcher.stats(),
            rate_limit: self.limiter.snapshot(),
            recent_errors: self.limiter.recent_errors(),
        }
    }

    /// Snapshot of the conversation so far.
    pub fn conversation(&self) -> Vec<Message> {
        self.conversation_mut().messages().to_vec()
    }

    pub fn conversation_len(&self) -> usize {
        self.conversation_mut().len()
    }

    pub fn window_settings(&self) -> WindowSettings {
        self.window
    }

    pub fn session_id(&self) -> &str {
        self.orchestrator.session_id()
    }

    /// Apply a reloaded config.
    ///
    /// Turn policy and rate limits change immediately. Dispatcher capacity,
    /// backend location and health cadence need a restart.
    pub fn apply_config(&self, config: &ClientConfig) {
        self.orchestrator.apply_config(config);
        let stats = self.dispatcher.stats();
        if stats.max_concurrent != config.dispatcher.max_concurrent
            || stats.max_queue_size != config.dispatcher.max_queue_size
        {
            tracing::warn!("Dispatcher limits changed, restart to apply");
        }
    }

    /// Stop the health monitor, cancel the cooldown timer and close the
    /// dispatcher. Idempotent.
    pub fn dispose(&self) {
        if !self.shutdown.trigger() {
            return;
        }
        if let Some(handle) = self.monitor.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
        self.limiter.dispose();
        self.dispatcher.dispose();
        tracing::info!(session_id = %self.orchestrator.session_id(), "Chat client disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.shutdown.is_triggered()
    }
}

impl<B: ChatBackend> Drop for ChatClient<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}
