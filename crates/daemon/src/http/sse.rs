// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSE log tailing: stream lines appended to the daemon log file.

use super::{ApiError, AppState};
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::Stream;
use std::convert::Infallible;
use std::io::SeekFrom;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

/// `GET /api/logs/stream` — tail the daemon log as server-sent events.
pub async fn stream_logs(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let path = state
        .log_path
        .clone()
        .ok_or_else(|| ApiError::NotFound("log streaming disabled".to_string()))?;
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|error| ApiError::Internal(format!("log file unavailable: {error}")))?;
    let mut reader = BufReader::new(file);
    // Tail semantics: only lines appended after the subscription.
    reader
        .seek(SeekFrom::End(0))
        .await
        .map_err(|error| ApiError::Internal(error.to_string()))?;

    let stream = futures_util::stream::unfold(reader, |mut reader| async move {
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line).await {
                Ok(0) => tokio::time::sleep(Duration::from_millis(1_000)).await,
                Ok(_) => {
                    let event = Event::default().data(line.trim_end().to_string());
                    return Some((Ok(event), reader));
                }
                Err(error) => {
                    tracing::debug!(%error, "log tail read failed, closing stream");
                    return None;
                }
            }
        }
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
#[path = "sse_tests.rs"]
mod tests;
