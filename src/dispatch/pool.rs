//! Admission-controlled request pool.
//!
//! # Responsibilities
//! - Bound the number of backend requests in flight
//! - Queue excess work in FIFO order, up to a fixed depth
//! - Reject the newest request once the queue is full
//! - Start queued work as soon as a slot frees up
//!
//! # Invariants
//! - `active <= max_concurrent` at every point
//! - A request leaves the queue only together with taking a slot, under
//!   the same lock acquisition, so concurrent completions cannot over-admit

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::oneshot;

use crate::config::DispatcherConfig;
use crate::dispatch::request::{RequestDescriptor, RequestMeta};
use crate::error::DispatchError;
use crate::observability::metrics;

type Job = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

struct Pending {
    id: u64,
    meta: RequestMeta,
    job: Job,
}

struct PoolState {
    active: usize,
    queue: VecDeque<Pending>,
    closed: bool,
    peak_active: usize,
    next_id: u64,
}

struct PoolInner {
    max_concurrent: usize,
    max_queue_size: usize,
    state: Mutex<PoolState>,
}

impl PoolInner {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, state: &PoolState) {
        metrics::set_dispatch_depth(state.active, state.queue.len());
    }

    /// Release one slot and pull as much queued work as capacity allows.
    fn release(self: &Arc<Self>) {
        let ready: Vec<Pending> = {
            let mut state = self.lock();
            state.active = state.active.saturating_sub(1);
            let mut ready = Vec::new();
            while state.active < self.max_concurrent {
                match state.queue.pop_front() {
                    Some(pending) => {
                        state.active += 1;
                        state.peak_active = state.peak_active.max(state.active);
                        ready.push(pending);
                    }
                    None => break,
                }
            }
            self.publish(&state);
            ready
        };

        for pending in ready {
            tracing::debug!(
                kind = %pending.meta.kind,
                waited_ms = pending.meta.created_at.elapsed().as_millis() as u64,
                "Dequeued request"
            );
            launch(self, pending.job);
        }
    }

    /// Drop a still-queued request whose caller has gone away.
    fn withdraw(&self, id: u64) {
        let withdrawn = {
            let mut state = self.lock();
            let position = state.queue.iter().position(|pending| pending.id == id);
            let withdrawn = position.and_then(|pos| state.queue.remove(pos));
            if withdrawn.is_some() {
                self.publish(&state);
            }
            withdrawn
        };
        if let Some(pending) = withdrawn {
            tracing::debug!(
                kind = %pending.meta.kind,
                "Caller went away while queued, request withdrawn"
            );
        }
    }
}

/// Held by a queued caller; withdraws the request from the queue if the
/// caller is dropped before a slot is assigned.
struct QueuedTicket {
    pool: Arc<PoolInner>,
    id: u64,
}

impl Drop for QueuedTicket {
    fn drop(&mut self) {
        self.pool.withdraw(self.id);
    }
}

/// Returns the slot to the pool when the job finishes, fails or panics.
struct ActiveSlot {
    pool: Arc<PoolInner>,
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.pool.release();
    }
}

fn launch(pool: &Arc<PoolInner>, job: Job) {
    let slot = ActiveSlot { pool: pool.clone() };
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                let _slot = slot;
                job().await;
            });
        }
        Err(_) => {
            // No runtime to run on; dropping the job fails its caller with `Closed`.
            tracing::warn!("No async runtime available, dropping request");
            drop(job);
            drop(slot);
        }
    }
}

enum Admission {
    Run(Job),
    Queued(u64),
}

/// Snapshot of the pool for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    pub active: usize,
    pub queued: usize,
    pub peak_active: usize,
    pub max_concurrent: usize,
    pub max_queue_size: usize,
}

/// Admission-controlled dispatcher shared by chat turns and health probes.
///
/// Cheap to clone; clones share the same slots and queue.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<PoolInner>,
}

impl Dispatcher {
    pub fn new(config: &DispatcherConfig) -> Self {
        Self::with_limits(config.max_concurrent, config.max_queue_size)
    }

    pub fn with_limits(max_concurrent: usize, max_queue_size: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                max_concurrent: max_concurrent.max(1),
                max_queue_size,
                state: Mutex::new(PoolState {
                    active: 0,
                    queue: VecDeque::new(),
                    closed: false,
                    peak_active: 0,
                    next_id: 0,
                }),
            }),
        }
    }

    /// Run the descriptor's work now if a slot is free, otherwise queue it.
    ///
    /// Resolves with the work's output once it has run. Fails fast with
    /// [`DispatchError::QueueFull`] when the queue is at capacity. Dropping
    /// the returned future abandons the work, freeing its slot or its
    /// place in the queue.
    pub async fn execute<F, Fut, T>(
        &self,
        descriptor: RequestDescriptor<F>,
    ) -> Result<T, DispatchError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let RequestDescriptor { meta, work } = descriptor;
        let (tx, rx) = oneshot::channel::<T>();

        let job: Job = Box::new(move || {
            Box::pin(async move {
                let mut tx = tx;
                let output = tokio::select! {
                    output = work() => Some(output),
                    _ = tx.closed() => None,
                };
                match output {
                    Some(output) => {
                        let _ = tx.send(output);
                    }
                    None => {
                        tracing::debug!(kind = %meta.kind, "Caller went away, request abandoned")
                    }
                }
            })
        });

        let admission = {
            let mut state = self.inner.lock();
            if state.closed {
                return Err(DispatchError::Closed);
            }
            if state.active < self.inner.max_concurrent {
                state.active += 1;
                state.peak_active = state.peak_active.max(state.active);
                self.inner.publish(&state);
                Admission::Run(job)
            } else if state.queue.len() < self.inner.max_queue_size {
                let id = state.next_id;
                state.next_id = state.next_id.wrapping_add(1);
                state.queue.push_back(Pending { id, meta, job });
                tracing::debug!(
                    kind = %meta.kind,
                    queued = state.queue.len(),
                    "Dispatcher saturated, request queued"
                );
                self.inner.publish(&state);
                Admission::Queued(id)
            } else {
                tracing::warn!(
                    kind = %meta.kind,
                    capacity = self.inner.max_queue_size,
                    "Dispatcher queue full, rejecting request"
                );
                metrics::record_dispatch_rejected(meta.kind.as_str());
                return Err(DispatchError::QueueFull {
                    capacity: self.inner.max_queue_size,
                });
            }
        };

        // Once dequeued the entry is gone, so the ticket's drop is a no-op.
        let _ticket = match admission {
            Admission::Run(job) => {
                launch(&self.inner, job);
                None
            }
            Admission::Queued(id) => Some(QueuedTicket {
                pool: self.inner.clone(),
                id,
            }),
        };

        rx.await.map_err(|_| DispatchError::Closed)
    }

    pub fn stats(&self) -> DispatcherStats {
        let state = self.inner.lock();
        DispatcherStats {
            active: state.active,
            queued: state.queue.len(),
            peak_active: state.peak_active,
            max_concurrent: self.inner.max_concurrent,
            max_queue_size: self.inner.max_queue_size,
        }
    }

    /// Stop admitting work and fail everything still queued with `Closed`.
    ///
    /// Requests already running are left to finish.
    pub fn dispose(&self) {
        let dropped: Vec<Pending> = {
            let mut state = self.inner.lock();
            state.closed = true;
            let dropped = state.queue.drain(..).collect();
            self.inner.publish(&state);
            dropped
        };
        if !dropped.is_empty() {
            tracing::info!(count = dropped.len(), "Dispatcher closed, dropping queued requests");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("Dispatcher")
            .field("active", &stats.active)
            .field("queued", &stats.queued)
            .field("max_concurrent", &stats.max_concurrent)
            .field("max_queue_size", &stats.max_queue_size)
            .finish()
    }
}
