//! Conversation state and its virtualized view.
//!
//! # Data Flow
//! ```text
//! ChatClient::send_turn
//!     → Conversation::push_user / push_system (append-only)
//!     → VirtualizedView::on_length_change
//!     → compute_window → slice of messages to render
//! ```

pub mod message;
pub mod window;

pub use message::{Author, Conversation, Message, MessageKind};
pub use window::{compute_window, VirtualizedView, VisibleWindow, WindowSettings};
