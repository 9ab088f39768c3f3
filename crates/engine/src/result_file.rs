// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result-file naming and layout for saved job output.

use chrono::{DateTime, Local};
use gofer_core::Job;

/// Keep only word characters, dashes, and CJK ideographs; everything else
/// is stripped so the name is safe on every filesystem.
pub fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .filter(|c| {
            c.is_ascii_alphanumeric()
                || *c == '_'
                || *c == '-'
                || ('\u{4e00}'..='\u{9fa5}').contains(c)
        })
        .collect()
}

/// `<sanitized-name>_<YYYY-MM-DD>_<HH-MM-SS>.txt`
pub fn result_file_name(job_name: &str, start: DateTime<Local>) -> String {
    format!(
        "{}_{}_{}.txt",
        sanitize_file_stem(job_name),
        start.format("%Y-%m-%d"),
        start.format("%H-%M-%S"),
    )
}

/// Render the saved-output document for a finished execution.
pub fn format_result_file(
    job: &Job,
    start: DateTime<Local>,
    finished: DateTime<Local>,
    stdout: &str,
) -> String {
    format!(
        "========================================\n\
         任务名称: {name}\n\
         任务ID: {id}\n\
         执行时间: {start}\n\
         执行命令: {command}\n\
         ========================================\n\
         \n\
         输出结果:\n\
         ----------------------------------------\n\
         {output}\n\
         ----------------------------------------\n\
         \n\
         执行完成: {finished}\n\
         ========================================\n",
        name = job.name,
        id = job.id,
        start = start.format("%Y-%m-%d %H:%M:%S"),
        command = job.command,
        output = stdout.trim(),
        finished = finished.format("%Y-%m-%d %H:%M:%S"),
    )
}

#[cfg(test)]
#[path = "result_file_tests.rs"]
mod tests;
