// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line classification for the progress stream.
//!
//! Two ordered pattern tables, compiled once: error patterns are checked
//! first, then the milestone families. First match wins, so the table
//! order *is* the priority order. Anything unmatched is a plain update.

use regex::Regex;

/// Classification of one progress line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventClass {
    /// Nothing noteworthy; buffered, never forwarded on its own.
    Update,
    /// Meaningful activity worth surfacing.
    Milestone,
    /// An error indicator; highest priority.
    Error,
}

/// Error-indicator patterns, bilingual.
const ERROR_PATTERNS: &[&str] = &[
    r"(?i)error",
    r"错误",
    r"(?i)failed",
    r"失败",
    r"(?i)warning",
    r"警告",
    r"(?i)exception",
    r"异常",
];

/// Milestone patterns, grouped by family. Order matters only across
/// families in that the first match decides; all yield `Milestone`.
const MILESTONE_PATTERNS: &[&str] = &[
    // tool use
    r"(?i)using\s+\S+\s+tool",
    r"(?i)called\s+\S+\s+tool",
    r"(?i)tool\s+runs?:",
    r"(?i)invoking\s+tool",
    // file operations
    r"(?i)\breading\b",
    r"(?i)\bwriting\s+to\b",
    r"(?i)\bwrote\b",
    r"(?i)\bedit(ing)?\b",
    r"(?i)\bgrep\b",
    r"(?i)\bglob\b",
    r"(?i)created\s+file",
    r"(?i)deleted\s+file",
    // search
    r"(?i)\bsearch(ed|ing)?\b",
    r"(?i)found\s+\d+\s+(match|matches|results?|files?)",
    r"(?i)looking\s+for",
    // execution
    r"(?i)executing:",
    r"(?i)running:",
    r"(?i)\bbash\s+command\b",
    r"(?i)\$\s*\S+",
    // build / test / install
    r"(?i)\bbuild(ing)?\b",
    r"(?i)\bcompil(e|ed|ing)\b",
    r"(?i)\btest(s|ed|ing)?\s+(pass|passed|failed|run|running)",
    r"(?i)running\s+tests?",
    r"(?i)\binstall(ed|ing)?\b",
    r"(?i)npm\s+(install|run|test)",
    r"(?i)cargo\s+(build|test|check|run)",
    // reasoning
    r"(?i)\bthinking\b",
    r"(?i)\bplanning\b",
    r"(?i)\banalyz(e|ed|ing)\b",
    // skills and agents
    r"(?i)using\s+\S+\s+skill",
    r"(?i)\bskill\b.*\b(running|started)\b",
    r"(?i)launch(ed|ing)\s+\S+\s+agent",
    r"(?i)\bagent\b.*\b(working|started)\b",
    // step counters
    r"(?i)step\s+\d+\s*/\s*\d+",
    r"\[\d+/\d+\]",
    r"\(\d+%\)",
    r"(?i)\bprogress:",
    // Chinese activity set
    r"正在\s*(读取|写入|搜索|查找|执行|运行|分析|处理|生成|编写|修改|安装|构建|测试)",
    r"(开始|完成|调用|使用)\s*\S+",
    r"(第\s*\d+\s*步|共\s*\d+\s*步)",
];

/// Compiled ordered classifier tables.
pub struct Classifier {
    errors: Vec<Regex>,
    milestones: Vec<Regex>,
}

impl Classifier {
    /// Compile both tables. Patterns are static, so compilation cannot
    /// fail at runtime; a bad pattern is a programming error caught by
    /// the table test.
    pub fn new() -> Self {
        Self {
            errors: compile(ERROR_PATTERNS),
            milestones: compile(MILESTONE_PATTERNS),
        }
    }

    /// Classify one line. Priority: error > milestone > update.
    pub fn classify_line(&self, line: &str) -> EventClass {
        if self.errors.iter().any(|pattern| pattern.is_match(line)) {
            return EventClass::Error;
        }
        if self.milestones.iter().any(|pattern| pattern.is_match(line)) {
            return EventClass::Milestone;
        }
        EventClass::Update
    }

    /// Split a chunk into classified, ANSI-stripped, non-empty lines.
    pub fn classify_chunk(&self, chunk: &str) -> Vec<(EventClass, String)> {
        let clean = strip_ansi(chunk);
        clean
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| (self.classify_line(line), line.to_string()))
            .collect()
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(error) => {
                tracing::error!(pattern, %error, "classifier pattern failed to compile");
                None
            }
        })
        .collect()
}

/// Remove ANSI escape sequences (CSI and two-byte escapes).
pub fn strip_ansi(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            result.push(c);
            continue;
        }
        match chars.peek() {
            // CSI sequence: ESC [ parameters final-byte
            Some('[') => {
                chars.next();
                for follow in chars.by_ref() {
                    if follow.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            // Two-byte escape
            Some(_) => {
                chars.next();
            }
            None => {}
        }
    }
    result
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
