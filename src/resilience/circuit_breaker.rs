//! Error rate limiter (circuit breaker over user-visible errors).
//!
//! # States
//! - Closed: errors are surfaced to the user
//! - Cooling down: errors are recorded but suppressed until expiry
//!
//! # State Transitions
//! ```text
//! Closed → Cooling down: consecutive errors >= max_consecutive
//! Cooling down → Closed: cooldown expiry (consecutive count reset to 0)
//! ```
//!
//! # Design Decisions
//! - Suppresses reporting only; requests keep flowing during cooldown
//! - Per-minute and per-hour budgets also suppress without entering cooldown
//! - One cooldown timer at a time; a new cooldown replaces the pending one
//! - Expiry is also applied lazily on every query, so a missed timer
//!   (no runtime, disposed limiter) never leaves the breaker stuck open

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::error::FailureKind;
use crate::observability::metrics;

const MINUTE: Duration = Duration::from_secs(60);

/// Thresholds for the limiter.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimits {
    pub per_minute: usize,
    pub per_hour: usize,
    pub max_consecutive: u32,
    pub cooldown: Duration,
    pub consecutive_window: Duration,
    pub retention: Duration,
    pub recent_capacity: usize,
}

impl From<&RateLimitConfig> for RateLimits {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            per_minute: config.per_minute,
            per_hour: config.per_hour,
            max_consecutive: config.max_consecutive,
            cooldown: Duration::from_millis(config.cooldown_ms),
            consecutive_window: Duration::from_millis(config.consecutive_window_ms),
            retention: Duration::from_secs(config.retention_secs),
            recent_capacity: config.recent_capacity,
        }
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self::from(&RateLimitConfig::default())
    }
}

/// One recorded failure.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub kind: FailureKind,
    /// Raw error text, for diagnostics only.
    pub detail: String,
    /// Whether the user was shown this error.
    pub surfaced: bool,
    /// Wall-clock timestamp in milliseconds since the Unix epoch.
    pub recorded_at_ms: u64,
    #[serde(skip)]
    at: Instant,
}

/// Point-in-time view of the limiter for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitSnapshot {
    pub consecutive_errors: u32,
    pub in_cooldown: bool,
    pub cooldown_remaining_ms: Option<u64>,
    pub errors_last_minute: usize,
    pub errors_retained: usize,
}

#[derive(Debug)]
struct LimiterState {
    limits: RateLimits,
    history: VecDeque<ErrorRecord>,
    consecutive: u32,
    last_error_at: Option<Instant>,
    cooldown_until: Option<Instant>,
    cooldown_timer: Option<JoinHandle<()>>,
    /// Bumped on every cooldown start so stale timers become no-ops.
    cooldown_epoch: u64,
}

impl LimiterState {
    /// Prune expired records and apply a due cooldown reset.
    fn refresh(&mut self, now: Instant) {
        let retention = self.limits.retention;
        while let Some(front) = self.history.front() {
            if now.saturating_duration_since(front.at) > retention {
                self.history.pop_front();
            } else {
                break;
            }
        }

        if let Some(until) = self.cooldown_until {
            if now >= until {
                self.end_cooldown();
            }
        }
    }

    fn end_cooldown(&mut self) {
        self.cooldown_until = None;
        self.consecutive = 0;
        tracing::info!("Error cooldown expired, surfacing errors again");
    }

    fn in_cooldown(&self) -> bool {
        self.cooldown_until.is_some()
    }

    fn errors_since(&self, now: Instant, window: Duration) -> usize {
        self.history
            .iter()
            .rev()
            .take_while(|r| now.saturating_duration_since(r.at) <= window)
            .count()
    }

    fn allows(&self, now: Instant) -> bool {
        !self.in_cooldown()
            && self.errors_since(now, MINUTE) < self.limits.per_minute
            && self.history.len() < self.limits.per_hour
            && self.consecutive < self.limits.max_consecutive
    }

    fn push(&mut self, now: Instant, kind: FailureKind, detail: String, surfaced: bool) -> bool {
        let window = self.limits.consecutive_window;
        let rapid = self
            .last_error_at
            .is_some_and(|prev| now.saturating_duration_since(prev) <= window);
        self.consecutive = if rapid {
            self.consecutive.saturating_add(1)
        } else {
            1
        };
        self.last_error_at = Some(now);

        self.history.push_back(ErrorRecord {
            kind,
            detail,
            surfaced,
            recorded_at_ms: wall_clock_ms(),
            at: now,
        });
        metrics::record_error(kind, surfaced);

        !self.in_cooldown() && self.consecutive >= self.limits.max_consecutive
    }
}

/// Tracks error frequency and decides whether a failure reaches the user.
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct ErrorRateLimiter {
    inner: Arc<Mutex<LimiterState>>,
}

impl ErrorRateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LimiterState {
                limits,
                history: VecDeque::new(),
                consecutive: 0,
                last_error_at: None,
                cooldown_until: None,
                cooldown_timer: None,
                cooldown_epoch: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether an error of this kind may be shown to the user right now.
    pub fn should_allow_error(&self, kind: FailureKind) -> bool {
        let now = Instant::now();
        let mut state = self.lock();
        state.refresh(now);
        let allowed = state.allows(now);
        if !allowed {
            tracing::debug!(
                kind = %kind,
                consecutive = state.consecutive,
                "Error suppressed by rate limiter"
            );
        }
        allowed
    }

    /// Record an error, entering cooldown when the consecutive threshold is hit.
    pub fn record_error(&self, kind: FailureKind, detail: impl Into<String>, surfaced: bool) {
        let now = Instant::now();
        let mut state = self.lock();
        state.refresh(now);
        if state.push(now, kind, detail.into(), surfaced) {
            let cooldown = state.limits.cooldown;
            self.start_cooldown(&mut state, now, cooldown);
        }
    }

    /// Check-and-record in one step. Returns whether the error is surfaced.
    pub fn report(&self, kind: FailureKind, detail: impl Into<String>) -> bool {
        let now = Instant::now();
        let mut state = self.lock();
        state.refresh(now);
        let surfaced = state.allows(now);
        if state.push(now, kind, detail.into(), surfaced) {
            let cooldown = state.limits.cooldown;
            self.start_cooldown(&mut state, now, cooldown);
        }
        surfaced
    }

    /// Force a cooldown, replacing any pending one.
    pub fn enter_cooldown(&self, duration: Duration) {
        let now = Instant::now();
        let mut state = self.lock();
        self.start_cooldown(&mut state, now, duration);
    }

    fn start_cooldown(&self, state: &mut LimiterState, now: Instant, duration: Duration) {
        if let Some(timer) = state.cooldown_timer.take() {
            timer.abort();
        }
        state.cooldown_epoch = state.cooldown_epoch.wrapping_add(1);
        let until = now + duration;
        state.cooldown_until = Some(until);
        metrics::record_cooldown_started();
        tracing::warn!(
            consecutive = state.consecutive,
            cooldown_ms = duration.as_millis() as u64,
            "Too many consecutive errors, entering cooldown"
        );

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let epoch = state.cooldown_epoch;
            let weak: Weak<Mutex<LimiterState>> = Arc::downgrade(&self.inner);
            state.cooldown_timer = Some(handle.spawn(async move {
                tokio::time::sleep_until(until).await;
                if let Some(inner) = weak.upgrade() {
                    let mut state = inner.lock().unwrap_or_else(|e| e.into_inner());
                    if state.cooldown_epoch == epoch && state.cooldown_until.is_some() {
                        state.end_cooldown();
                    }
                    state.cooldown_timer = None;
                }
            }));
        }
    }

    pub fn is_in_cooldown(&self) -> bool {
        let mut state = self.lock();
        state.refresh(Instant::now());
        state.in_cooldown()
    }

    pub fn consecutive_errors(&self) -> u32 {
        let mut state = self.lock();
        state.refresh(Instant::now());
        state.consecutive
    }

    /// The most recent records, oldest first, bounded by `recent_capacity`.
    pub fn recent_errors(&self) -> Vec<ErrorRecord> {
        let mut state = self.lock();
        state.refresh(Instant::now());
        let skip = state.history.len().saturating_sub(state.limits.recent_capacity);
        state.history.iter().skip(skip).cloned().collect()
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        let now = Instant::now();
        let mut state = self.lock();
        state.refresh(now);
        RateLimitSnapshot {
            consecutive_errors: state.consecutive,
            in_cooldown: state.in_cooldown(),
            cooldown_remaining_ms: state
                .cooldown_until
                .map(|until| until.saturating_duration_since(now).as_millis() as u64),
            errors_last_minute: state.errors_since(now, MINUTE),
            errors_retained: state.history.len(),
        }
    }

    /// Swap thresholds in place; history and cooldown are kept.
    pub fn set_limits(&self, limits: RateLimits) {
        self.lock().limits = limits;
    }

    /// Cancel the pending cooldown timer.
    pub fn dispose(&self) {
        if let Some(timer) = self.lock().cooldown_timer.take() {
            timer.abort();
        }
    }
}

impl Default for ErrorRateLimiter {
    fn default() -> Self {
        Self::new(RateLimits::default())
    }
}

fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    fn surface(limiter: &ErrorRateLimiter, kind: FailureKind) -> bool {
        limiter.report(kind, "test failure")
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_rapid_errors_enter_cooldown() {
        let limiter = ErrorRateLimiter::default();

        assert!(surface(&limiter, FailureKind::Network));
        advance(Duration::from_secs(1)).await;
        assert!(surface(&limiter, FailureKind::Network));
        advance(Duration::from_secs(1)).await;
        assert!(surface(&limiter, FailureKind::Network));
        assert!(limiter.is_in_cooldown());

        advance(Duration::from_secs(1)).await;
        assert!(!surface(&limiter, FailureKind::Network));

        let recent = limiter.recent_errors();
        assert_eq!(recent.len(), 4);
        assert!(!recent[3].surfaced);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_expiry_resets_consecutive() {
        let limiter = ErrorRateLimiter::default();
        for _ in 0..3 {
            limiter.record_error(FailureKind::Server, "boom", true);
        }
        assert!(limiter.is_in_cooldown());
        assert_eq!(limiter.consecutive_errors(), 3);

        advance(Duration::from_secs(29)).await;
        assert!(!limiter.should_allow_error(FailureKind::Server));

        advance(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert!(!limiter.is_in_cooldown());
        assert_eq!(limiter.consecutive_errors(), 0);
        assert!(limiter.should_allow_error(FailureKind::Server));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_errors_do_not_count_as_consecutive() {
        let limiter = ErrorRateLimiter::default();
        for _ in 0..4 {
            assert!(surface(&limiter, FailureKind::Timeout));
            advance(Duration::from_secs(6)).await;
        }
        assert_eq!(limiter.consecutive_errors(), 1);
        assert!(!limiter.is_in_cooldown());
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_minute_budget() {
        let limits = RateLimits {
            max_consecutive: 100,
            ..RateLimits::default()
        };
        let limiter = ErrorRateLimiter::new(limits);
        for _ in 0..5 {
            assert!(surface(&limiter, FailureKind::Server));
            advance(Duration::from_secs(1)).await;
        }
        assert!(!surface(&limiter, FailureKind::Server));

        advance(Duration::from_secs(61)).await;
        assert!(limiter.should_allow_error(FailureKind::Server));
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_hour_budget_and_retention() {
        let limits = RateLimits {
            max_consecutive: 100,
            per_minute: 100,
            per_hour: 3,
            ..RateLimits::default()
        };
        let limiter = ErrorRateLimiter::new(limits);
        for _ in 0..3 {
            limiter.record_error(FailureKind::Unknown, "x", true);
            advance(Duration::from_secs(120)).await;
        }
        assert!(!limiter.should_allow_error(FailureKind::Unknown));

        advance(Duration::from_secs(3600)).await;
        assert!(limiter.should_allow_error(FailureKind::Unknown));
        assert_eq!(limiter.snapshot().errors_retained, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_cooldown_replaces_pending_one() {
        let limiter = ErrorRateLimiter::default();
        limiter.enter_cooldown(Duration::from_secs(10));
        advance(Duration::from_secs(5)).await;
        limiter.enter_cooldown(Duration::from_secs(10));

        // The first timer would have fired here.
        advance(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;
        assert!(limiter.is_in_cooldown());

        advance(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert!(!limiter.is_in_cooldown());
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_during_cooldown_do_not_extend_it() {
        let limiter = ErrorRateLimiter::default();
        for _ in 0..3 {
            limiter.record_error(FailureKind::Network, "down", true);
        }
        advance(Duration::from_secs(20)).await;
        limiter.record_error(FailureKind::Network, "still down", false);

        advance(Duration::from_secs(11)).await;
        assert!(!limiter.is_in_cooldown());
    }

    #[test]
    fn test_recent_errors_bounded() {
        let limits = RateLimits {
            recent_capacity: 2,
            ..RateLimits::default()
        };
        let limiter = ErrorRateLimiter::new(limits);
        limiter.record_error(FailureKind::Network, "a", true);
        limiter.record_error(FailureKind::Server, "b", true);
        limiter.record_error(FailureKind::Timeout, "c", false);

        let recent = limiter.recent_errors();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].detail, "b");
        assert_eq!(recent[1].detail, "c");
    }
}
