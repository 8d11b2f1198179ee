//! Client-visible streaming events.
//!
//! Each event is sent to the browser as one server-sent event whose data is
//! the JSON form of the event:
//! - `tool`  - a tool is about to run
//! - `text`  - the full answer so far (not a delta)
//! - `done`  - the exchange finished; `truncated` when the round limit hit
//! - `error` - the exchange failed

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A tool call is starting.
    Tool { name: String },

    /// The assistant's answer.
    Text { content: String },

    /// The stream is complete.
    Done {
        #[serde(default, skip_serializing_if = "is_false")]
        truncated: bool,
    },

    /// A generic, user-facing failure message.
    Error { message: String },
}

fn is_false(b: &bool) -> bool {
    !b
}

impl StreamEvent {
    pub fn tool(name: impl Into<String>) -> Self {
        Self::Tool { name: name.into() }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn done() -> Self {
        Self::Done { truncated: false }
    }

    pub fn truncated() -> Self {
        Self::Done { truncated: true }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Event name, matching the `type` tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Tool { .. } => "tool",
            Self::Text { .. } => "text",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
