//! Request descriptors.

use std::fmt;

use tokio::time::Instant;

/// What a dispatched request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    HealthCheck,
    ChatTurn,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::HealthCheck => "health-check",
            RequestKind::ChatTurn => "chat-turn",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable metadata attached to a descriptor at creation.
#[derive(Debug, Clone, Copy)]
pub struct RequestMeta {
    pub kind: RequestKind,
    pub created_at: Instant,
}

/// A unit of work (a closure producing a future) plus its metadata.
///
/// The closure is invoked exactly once, when the dispatcher grants a slot.
pub struct RequestDescriptor<F> {
    pub meta: RequestMeta,
    pub(crate) work: F,
}

impl<F> RequestDescriptor<F> {
    pub fn new(kind: RequestKind, work: F) -> Self {
        Self {
            meta: RequestMeta {
                kind,
                created_at: Instant::now(),
            },
            work,
        }
    }

    pub fn health_check(work: F) -> Self {
        Self::new(RequestKind::HealthCheck, work)
    }

    pub fn chat_turn(work: F) -> Self {
        Self::new(RequestKind::ChatTurn, work)
    }

    pub fn kind(&self) -> RequestKind {
        self.meta.kind
    }
}

impl<F> fmt::Debug for RequestDescriptor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("kind", &self.meta.kind)
            .field("created_at", &self.meta.created_at)
            .finish_non_exhaustive()
    }
}
