// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental decoder for the CLI's line-delimited event stream.
//!
//! Stdout arrives in arbitrary chunks; a line may span several reads. The
//! parser holds the residual partial line between calls to [`StreamParser::feed`]
//! and flushes it in [`StreamParser::finish`] once the stream closes.
//! Discarding unparseable bytes would be a correctness bug — anything that
//! is not a recognized JSON event is raw output text.

use gofer_core::{ContentBlock, StreamEvent};

/// Streaming event decoder plus output accumulator for one child process.
#[derive(Debug, Default)]
pub struct StreamParser {
    /// Residual partial line carried across reads.
    buffer: String,
    /// Accumulated output text.
    output: String,
    /// Canonical final answer from a `result` event, if seen.
    final_result: Option<String>,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a stdout chunk. Returns the progress strings to forward,
    /// in detection order.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        let mut progress = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            self.handle_line(line.trim_end_matches(['\n', '\r']), &mut progress);
        }
        progress
    }

    /// Flush the residual partial line after the stream closed.
    pub fn finish(&mut self) -> Vec<String> {
        let mut progress = Vec::new();
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.handle_line(&line, &mut progress);
        }
        progress
    }

    /// Append stderr text to the accumulated output.
    pub fn append_stderr(&mut self, chunk: &str) {
        self.output.push_str(chunk);
    }

    /// Whether anything at all was produced.
    pub fn has_output(&self) -> bool {
        self.final_result.is_some() || !self.output.trim().is_empty()
    }

    /// Final output: the canonical `result` text when the CLI sent one,
    /// the accumulated output otherwise.
    pub fn into_output(self) -> String {
        match self.final_result {
            Some(result) => result,
            None => self.output.trim().to_string(),
        }
    }

    fn handle_line(&mut self, line: &str, progress: &mut Vec<String>) {
        if line.is_empty() {
            return;
        }
        let Some(event) = StreamEvent::parse_line(line) else {
            // Not an event: raw output, kept verbatim.
            self.output.push_str(line);
            self.output.push('\n');
            return;
        };
        match &event {
            StreamEvent::Message { .. } => {
                for block in event.blocks() {
                    match block {
                        ContentBlock::Text { text } => {
                            self.output.push_str(text);
                            progress.push(text.clone());
                        }
                        ContentBlock::ToolUse { name } => {
                            progress.push(tool_milestone(name));
                        }
                        ContentBlock::Other => {}
                    }
                }
            }
            StreamEvent::MessageDelta { delta } => {
                if let Some(text) = delta.as_ref().and_then(|delta| delta.content.as_deref()) {
                    self.output.push_str(text);
                }
            }
            StreamEvent::ContentBlockStart { content_block } => {
                if let Some(ContentBlock::ToolUse { name }) = content_block {
                    progress.push(tool_milestone(name));
                }
            }
            StreamEvent::ContentBlockDelta { delta } => {
                if delta.as_ref().is_some_and(|delta| delta.is_tool_result()) {
                    tracing::debug!("tool result delta received");
                }
            }
            StreamEvent::Result { .. } => {
                if let Some(text) = event.result_text() {
                    self.final_result = Some(text);
                }
            }
            StreamEvent::Error { .. } => {
                if let Some(error) = event.error_text() {
                    self.output.push_str("\nError: ");
                    self.output.push_str(&error);
                    self.output.push('\n');
                    progress.push(format!("Error: {error}"));
                }
            }
            StreamEvent::Other => {}
        }
    }
}

/// Milestone line synthesized for a tool_use block.
fn tool_milestone(name: &str) -> String {
    let name = if name.is_empty() { "unknown" } else { name };
    format!("Using {name} tool")
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
