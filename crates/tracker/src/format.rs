// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-facing message formatting.
//!
//! Smart sends get the editor-style activity line (emoji + bold name);
//! buffer flushes get deduped, prefixed lines truncated near a clause
//! boundary. The activity kind is a prioritized substring test — the
//! first matching family wins.

use crate::classify::EventClass;

/// Marker appended when a flush is cut short.
pub const TRUNCATION_MARKER: &str = "...(内容已截断)";

/// Format a smart-triggered line for delivery.
pub fn format_smart(class: EventClass, line: &str) -> String {
    match class {
        EventClass::Error => format!("❌ **Error**: {line}"),
        EventClass::Milestone => format_activity(line),
        EventClass::Update => line.to_string(),
    }
}

/// Editor-style rendering of a milestone line, by activity family.
fn format_activity(line: &str) -> String {
    // Tool use first: the supervisor synthesizes these lines itself.
    if let Some(name) = between(line, "Using ", " tool") {
        return format!("🔧 **Tool**: **{name}**");
    }
    if let Some(name) = between(line, "Called ", " tool") {
        return format!("🔧 **Tool**: **{name}**");
    }
    if let Some(name) = between(line, "Using ", " skill") {
        return format!("⚡ **skill**: **{name}** running...");
    }
    if let Some(name) = between(line, "Launching ", " agent") {
        return format!("🤖 **agent**: **{name}** working...");
    }
    if contains_ignore_case(line, "grep") {
        let pattern = quoted(line);
        let path = after_ignore_case(line, " in ");
        return match (pattern, path) {
            (Some(pattern), Some(path)) => {
                format!("🔍 **Grep**: \"{pattern}\" └ in {path}")
            }
            (Some(pattern), None) => format!("🔍 **Grep**: \"{pattern}\""),
            _ => format!("🔍 **Grep**: {}", remainder(line, "grep")),
        };
    }
    if contains_ignore_case(line, "reading") {
        return format!("📖 **Read**: {}", remainder(line, "reading"));
    }
    if contains_ignore_case(line, "read") {
        return format!("📖 **Read**: {}", remainder(line, "read"));
    }
    if contains_ignore_case(line, "edit") {
        return format!("✏️ **Edit**: {}", remainder(line, "edit"));
    }
    if let Some(cmd) = after_ignore_case(line, "executing:") {
        return format!("⚙️ **Bash**: {cmd}");
    }
    if let Some(cmd) = after_ignore_case(line, "running:") {
        return format!("⚙️ **Bash**: {cmd}");
    }
    if contains_ignore_case(line, "bash") {
        return format!("⚙️ **Bash**: {}", remainder(line, "bash"));
    }
    if contains_ignore_case(line, "thinking") || contains_ignore_case(line, "planning") {
        return format!("💭 **Thinking**: {line}");
    }
    format!("🔸 {line}")
}

/// Flush the buffered lines: set-dedup, emoji prefix by class, bounded
/// length with an explicit truncation marker.
pub fn format_flush(lines: &[(EventClass, String)], max_chars: usize) -> Option<String> {
    let mut seen = std::collections::HashSet::new();
    let mut rendered = Vec::new();
    for (class, line) in lines {
        if !seen.insert(line.as_str()) {
            continue;
        }
        let prefix = match class {
            EventClass::Error => "❌",
            EventClass::Milestone => "🔸",
            EventClass::Update => "ℹ️",
        };
        rendered.push(format!("{prefix} {line}"));
    }
    if rendered.is_empty() {
        return None;
    }
    Some(truncate_at_boundary(&rendered.join("\n"), max_chars))
}

/// Truncate near `max_chars`, preferring the last sentence/clause
/// boundary in the kept prefix, and append the truncation marker.
pub fn truncate_at_boundary(text: &str, max_chars: usize) -> String {
    const BOUNDARIES: &[char] =
        &['。', '！', '？', '；', '，', '.', '!', '?', ';', ',', '\n'];
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    let prefix: String = text.chars().take(max_chars).collect();
    let cut = prefix
        .rfind(BOUNDARIES)
        // A boundary in the first half is too aggressive a cut.
        .filter(|byte_pos| prefix[..*byte_pos].chars().count() >= max_chars / 2)
        .map(|byte_pos| byte_pos + prefix[byte_pos..].chars().next().map_or(0, char::len_utf8));
    let kept = match cut {
        Some(byte_pos) => &prefix[..byte_pos],
        None => prefix.as_str(),
    };
    format!("{}\n{TRUNCATION_MARKER}", kept.trim_end())
}

fn contains_ignore_case(line: &str, needle: &str) -> bool {
    line.to_lowercase().contains(needle)
}

/// Substring strictly between `start` and `end`, both required.
fn between<'a>(line: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = line.find(start)? + start.len();
    let to = line[from..].find(end)? + from;
    let name = line[from..to].trim();
    (!name.is_empty()).then_some(name)
}

/// First double-quoted span.
fn quoted(line: &str) -> Option<&str> {
    let from = line.find('"')? + 1;
    let to = line[from..].find('"')? + from;
    Some(&line[from..to])
}

/// Text after a case-insensitive needle.
fn after_ignore_case<'a>(line: &'a str, needle: &str) -> Option<&'a str> {
    let lower = line.to_lowercase();
    let at = lower.find(&needle.to_lowercase())?;
    let rest = line.get(at + needle.len()..)?.trim();
    (!rest.is_empty()).then_some(rest)
}

/// Text after the keyword, or the whole line when extraction fails.
fn remainder<'a>(line: &'a str, keyword: &str) -> &'a str {
    after_ignore_case(line, keyword).unwrap_or(line)
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
