//! Chat turns: validation, collaborators and orchestration.

pub mod identity;
pub mod orchestrator;
pub mod validate;

pub use identity::{IdentityProvider, IntentHandler, PassThrough, StaticIdentity, UserIdentity};
pub use orchestrator::{ChatOrchestrator, ReplySource, TurnPolicy, TurnReply};
pub use validate::{validate_input, TurnInput, VOICE_PLACEHOLDER};
