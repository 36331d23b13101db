//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Chat turn / health probe
//!     → request.rs (descriptor: work + kind + created_at)
//!     → pool.rs (admission control)
//!         - slot free   → run now
//!         - slot busy   → FIFO queue (bounded)
//!         - queue full  → fail fast (queue-full)
//!     → completion frees the slot and drains the queue
//! ```
//!
//! # Design Decisions
//! - One pool for all backend traffic, so probes and turns share the budget
//! - Reject-newest on overflow rather than evicting queued work
//! - Slot release is tied to a drop guard, so panics and cancellation
//!   cannot leak capacity

pub mod pool;
pub mod request;

pub use pool::{Dispatcher, DispatcherStats};
pub use request::{RequestDescriptor, RequestKind, RequestMeta};
