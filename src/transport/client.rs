//! HTTP backend client.
//!
//! # Responsibilities
//! - Probe the health endpoint (GET, any 2xx is healthy)
//! - Post chat turns as multipart forms and decode the reply
//! - Translate reqwest failures into tagged [`TransportError`]s
//!
//! Deadlines are applied by the caller per attempt, not here.

use std::future::Future;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use url::Url;

use crate::config::BackendConfig;
use crate::error::TransportError;
use crate::transport::wire::{BackendReply, ChatRequest, HealthReport};

/// The backend operations the client depends on.
///
/// Implemented over HTTP by [`HttpBackend`]; tests substitute scripted fakes.
pub trait ChatBackend: Send + Sync + 'static {
    /// Liveness probe.
    fn check_health(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Deliver one chat turn and return the backend's reply.
    fn send_chat(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<BackendReply, TransportError>> + Send;
}

/// reqwest-backed implementation of [`ChatBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    health_url: Url,
    chat_url: Url,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, TransportError> {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &BackendConfig) -> Result<Self, TransportError> {
        let invalid = |e: url::ParseError| {
            TransportError::Other(format!("invalid backend URL '{}': {}", config.base_url, e))
        };
        let base_url = Url::parse(&config.base_url).map_err(invalid)?;
        let health_url = base_url.join(&config.health_path).map_err(invalid)?;
        let chat_url = base_url.join(&config.chat_path).map_err(invalid)?;

        Ok(Self {
            client,
            base_url,
            health_url,
            chat_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a possibly relative `audioUrl` against the backend base URL.
    pub fn resolve_audio_url(&self, raw: &str) -> Option<String> {
        if raw.is_empty() {
            return None;
        }
        match self.base_url.join(raw) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                tracing::warn!(audio_url = %raw, error = %e, "Ignoring unresolvable audio URL");
                None
            }
        }
    }

    fn build_form(request: &ChatRequest) -> Result<Form, TransportError> {
        let mut form = Form::new()
            .text("message", request.message.clone())
            .text("type", request.kind.as_str())
            .text("sessionId", request.session_id.clone())
            .text("userId", request.user_id.clone())
            .text("username", request.username.clone());

        if let Some(audio) = &request.audio {
            let part = Part::bytes(audio.bytes.clone())
                .file_name(audio.filename.clone())
                .mime_str(&audio.content_type)
                .map_err(|e| TransportError::Other(format!("invalid audio content type: {}", e)))?;
            form = form.part("audio", part);
        }
        Ok(form)
    }
}

impl ChatBackend for HttpBackend {
    async fn check_health(&self) -> Result<(), TransportError> {
        let response = self
            .client
            .get(self.health_url.clone())
            .header("user-agent", "chatline-health-check")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: String::new(),
            });
        }

        // The body is informational only.
        if let Ok(report) = response.json::<HealthReport>().await {
            tracing::debug!(
                status = ?report.status,
                service = ?report.service,
                upstream_available = ?report.backend_client.as_ref().and_then(|b| b.available),
                "Health report"
            );
        }
        Ok(())
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<BackendReply, TransportError> {
        let form = Self::build_form(request)?;
        let response = self
            .client
            .post(self.chat_url.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut reply: BackendReply = response.json().await?;
        reply.audio_url = reply
            .audio_url
            .as_deref()
            .and_then(|raw| self.resolve_audio_url(raw));
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::MessageKind;
    use crate::transport::wire::VoicePayload;

    fn backend() -> HttpBackend {
        HttpBackend::new(&BackendConfig {
            base_url: "http://127.0.0.1:8001".into(),
            ..BackendConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoints_resolved_from_base() {
        let b = backend();
        assert_eq!(b.health_url.as_str(), "http://127.0.0.1:8001/health");
        assert_eq!(b.chat_url.as_str(), "http://127.0.0.1:8001/chat");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpBackend::new(&BackendConfig {
            base_url: "::nope".into(),
            ..BackendConfig::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("invalid backend URL"));
    }

    #[test]
    fn test_audio_url_resolution() {
        let b = backend();
        assert_eq!(
            b.resolve_audio_url("/api/voice/reply.mp3").as_deref(),
            Some("http://127.0.0.1:8001/api/voice/reply.mp3")
        );
        assert_eq!(
            b.resolve_audio_url("https://cdn.example.com/a.mp3").as_deref(),
            Some("https://cdn.example.com/a.mp3")
        );
        assert_eq!(b.resolve_audio_url(""), None);
    }

    #[test]
    fn test_bad_audio_mime_is_rejected() {
        let request = ChatRequest {
            message: "voice".into(),
            kind: MessageKind::Voice,
            session_id: "s".into(),
            user_id: "u".into(),
            username: "n".into(),
            audio: Some(VoicePayload::new(vec![1, 2, 3], "not a mime")),
        };
        assert!(HttpBackend::build_form(&request).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let client = Client::builder().no_proxy().build().unwrap();
        let b = HttpBackend::with_client(
            client,
            &BackendConfig {
                base_url: "http://127.0.0.1:1".into(),
                ..BackendConfig::default()
            },
        )
        .unwrap();
        let err = b.check_health().await.unwrap_err();
        assert_eq!(crate::resilience::classify(&err), crate::error::FailureKind::Network);
    }
}
