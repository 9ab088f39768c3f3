// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream-event shapes emitted by the model CLI in `stream-json` mode.
//!
//! The CLI writes one JSON document per stdout line. Only the event kinds
//! the gateway reacts to are modeled with fields; everything else lands in
//! [`StreamEvent::Other`]. Lines that do not parse as JSON at all are not
//! events — callers keep them as raw output text.

use serde::Deserialize;

/// One line of the CLI's stream-json output.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// A full assistant message carrying content blocks. Depending on CLI
    /// version the blocks sit at the top level or under `message`.
    #[serde(rename = "message", alias = "assistant")]
    Message {
        #[serde(default)]
        content: Option<Vec<ContentBlock>>,
        #[serde(default)]
        message: Option<MessageBody>,
    },

    /// Incremental text append.
    #[serde(rename = "messageDelta")]
    MessageDelta {
        #[serde(default)]
        delta: Option<TextDelta>,
    },

    /// A content block opening; tool_use blocks become milestones.
    #[serde(rename = "contentBlockStart")]
    ContentBlockStart {
        #[serde(default, rename = "contentBlock")]
        content_block: Option<ContentBlock>,
    },

    /// Incremental block payload; tool_result deltas are debug-only.
    #[serde(rename = "contentBlockDelta")]
    ContentBlockDelta {
        #[serde(default)]
        delta: Option<BlockDelta>,
    },

    /// Terminal event carrying the canonical final answer.
    #[serde(rename = "result")]
    Result {
        #[serde(default)]
        result: Option<serde_json::Value>,
    },

    /// CLI-reported error.
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        error: Option<serde_json::Value>,
    },

    /// Recognized JSON with an unhandled `type` tag.
    #[serde(other)]
    Other,
}

impl StreamEvent {
    /// Parse one stdout line. `None` means "not an event" — the caller
    /// must keep the line as raw output, never discard it.
    pub fn parse_line(line: &str) -> Option<Self> {
        serde_json::from_str(line).ok()
    }

    /// Content blocks of a message event, wherever the CLI put them.
    pub fn blocks(&self) -> &[ContentBlock] {
        match self {
            StreamEvent::Message { content: Some(blocks), .. } => blocks,
            StreamEvent::Message { message: Some(body), .. } => &body.content,
            _ => &[],
        }
    }

    /// Final answer text of a `result` event.
    pub fn result_text(&self) -> Option<String> {
        match self {
            StreamEvent::Result { result: Some(value) } => Some(match value {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            }),
            _ => None,
        }
    }

    /// Human-readable error text of an `error` event.
    pub fn error_text(&self) -> Option<String> {
        match self {
            StreamEvent::Error { message: Some(text), .. } => Some(text.clone()),
            StreamEvent::Error { error: Some(value), .. } => Some(
                value
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string()),
            ),
            StreamEvent::Error { .. } => Some("unknown error".to_string()),
            _ => None,
        }
    }
}

/// Nested message body (`{"type":"assistant","message":{"content":[...]}}`).
#[derive(Debug, Clone, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// Text-append delta of a `messageDelta` event.
#[derive(Debug, Clone, Deserialize)]
pub struct TextDelta {
    #[serde(default)]
    pub content: Option<String>,
}

/// Delta payload of a `contentBlockDelta` event.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockDelta {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl BlockDelta {
    pub fn is_tool_result(&self) -> bool {
        self.kind.as_deref() == Some("tool_result")
    }
}

/// One content block inside a message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text {
        #[serde(default)]
        text: String,
    },
    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        name: String,
    },
    #[serde(other)]
    Other,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
