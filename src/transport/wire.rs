//! Backend wire types.
//!
//! The chat endpoint takes a multipart form:
//! ```text
//! message    text (transcript placeholder for voice turns)
//! type       "text" | "voice"
//! sessionId  per-client session UUID
//! userId     wallet address of the current user
//! username   display name of the current user
//! audio      optional file part (voice turns only)
//! ```
//! and answers `{ "message": "...", "type": "text"|"voice", "audioUrl": "..."|null }`.

use serde::{Deserialize, Serialize};

use crate::conversation::MessageKind;

/// Recorded audio attached to a voice turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoicePayload {
    pub bytes: Vec<u8>,
    /// MIME type, e.g. "audio/webm".
    pub content_type: String,
    pub filename: String,
}

impl VoicePayload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
            filename: "audio.webm".to_string(),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }
}

/// One chat turn as sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub kind: MessageKind,
    pub session_id: String,
    pub user_id: String,
    pub username: String,
    pub audio: Option<VoicePayload>,
}

/// The backend's structured answer to a chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendReply {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    #[serde(rename = "audioUrl", default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

/// Optional JSON body of the health endpoint. Every field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HealthReport {
    pub status: Option<String>,
    pub service: Option<String>,
    pub backend_client: Option<UpstreamStatus>,
}

/// The backend's own view of its upstream model server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpstreamStatus {
    pub url: Option<String>,
    pub available: Option<bool>,
}
