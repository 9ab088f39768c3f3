// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-environment hygiene for model CLI spawns.
//!
//! The CLI refuses to run when it detects itself nested inside another CLI
//! session, which it does through its own environment markers. Every spawn
//! therefore goes through [`sanitized_process_env`], which drops any
//! variable carrying those markers before the child is created.

/// Variable-name prefixes that must never reach a spawned CLI.
pub const BLOCKED_PREFIXES: &[&str] = &["CLAUDE", "ANTHROPIC"];

/// Additional prefix stripped when the gateway itself runs inside the
/// editor integration (the CLI keys different behavior off these too).
pub const EDITOR_PREFIX: &str = "VSCODE_";

/// Whether a variable name must be stripped from a child environment.
pub fn is_blocked_var(name: &str, strip_editor: bool) -> bool {
    if BLOCKED_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
        return true;
    }
    strip_editor && name.starts_with(EDITOR_PREFIX)
}

/// Filter an arbitrary variable set down to the allowed ones.
pub fn sanitize_vars<I>(vars: I, strip_editor: bool) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter(|(name, _)| !is_blocked_var(name, strip_editor))
        .collect()
}

/// Current process environment minus the blocked variables.
///
/// Editor-marker stripping turns on automatically when the gateway itself
/// appears to run under the editor integration.
pub fn sanitized_process_env() -> Vec<(String, String)> {
    let strip_editor = running_under_editor();
    sanitize_vars(std::env::vars(), strip_editor)
}

/// Detect the editor integration from the gateway's own environment.
pub fn running_under_editor() -> bool {
    std::env::var_os("VSCODE_PID").is_some()
        || std::env::var("TERM_PROGRAM").is_ok_and(|term| term == "vscode")
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
