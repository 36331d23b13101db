//! Input validation at the orchestrator boundary.
//!
//! Everything here runs before any network call. Failures are `validation`
//! errors and never reach the retry engine or the rate limiter.

use crate::config::InputConfig;
use crate::conversation::MessageKind;
use crate::error::{FailureKind, TurnError};
use crate::transport::VoicePayload;

/// Transcript placeholder sent (and displayed) for voice turns.
pub const VOICE_PLACEHOLDER: &str = "[Voice message]";

/// What the user submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnInput {
    Text(String),
    Voice(VoicePayload),
}

impl TurnInput {
    pub fn text(text: impl Into<String>) -> Self {
        TurnInput::Text(text.into())
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            TurnInput::Text(_) => MessageKind::Text,
            TurnInput::Voice(_) => MessageKind::Voice,
        }
    }

    /// The text carried in the `message` field.
    pub fn message(&self) -> &str {
        match self {
            TurnInput::Text(text) => text.trim(),
            TurnInput::Voice(_) => VOICE_PLACEHOLDER,
        }
    }
}

/// Check `input` against the configured ceilings.
pub fn validate_input(input: &TurnInput, limits: &InputConfig) -> Result<(), TurnError> {
    match input {
        TurnInput::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(reject("Please enter a message."));
            }
            let chars = trimmed.chars().count();
            if chars > limits.max_message_chars {
                return Err(reject(format!(
                    "Message is too long ({} characters, limit {}).",
                    chars, limits.max_message_chars
                )));
            }
        }
        TurnInput::Voice(audio) => {
            if audio.bytes.is_empty() {
                return Err(reject("The voice recording is empty."));
            }
            if !audio.content_type.starts_with("audio/") {
                return Err(reject("Voice messages must be audio recordings."));
            }
            if audio.bytes.len() > limits.max_audio_bytes {
                return Err(reject("The voice recording is too large."));
            }
        }
    }
    Ok(())
}

fn reject(message: impl Into<String>) -> TurnError {
    TurnError::with_message(FailureKind::Validation, message)
}
