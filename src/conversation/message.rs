//! Conversation messages.
//!
//! A [`Conversation`] is append-only for the life of a session: no edits, no
//! deletion. Ids are assigned in append order.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Voice,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Voice => "voice",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: u64,
    pub author: Author,
    pub content: String,
    pub kind: MessageKind,
    /// Unix epoch milliseconds.
    pub created_at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    next_id: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>, kind: MessageKind) -> &Message {
        self.push(Author::User, content.into(), kind, None)
    }

    pub fn push_system(
        &mut self,
        content: impl Into<String>,
        kind: MessageKind,
        audio_url: Option<String>,
    ) -> &Message {
        self.push(Author::System, content.into(), kind, audio_url)
    }

    fn push(
        &mut self,
        author: Author,
        content: String,
        kind: MessageKind,
        audio_url: Option<String>,
    ) -> &Message {
        let id = self.next_id;
        self.next_id += 1;
        let index = self.messages.len();
        self.messages.push(Message {
            id,
            author,
            content,
            kind,
            created_at_ms: now_ms(),
            audio_url,
        });
        &self.messages[index]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
