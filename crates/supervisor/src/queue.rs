// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session FIFO execution queues.
//!
//! Each active [`SessionKey`] owns one bounded channel drained by one
//! consumer task, so work for a session runs strictly in arrival order.
//! The consumer never blocks on the channel: it drains under the map
//! lock and removes its own entry the moment the queue is empty, which
//! makes "entry exists" equivalent to "consumer alive". Submissions hold
//! the same lock, so a submit either reaches a live consumer or creates
//! the next one — never neither.

use gofer_core::SessionKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

type Work = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Errors from queue submission.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("session queue full ({0} pending)")]
    Full(usize),
}

/// FIFO work queues keyed by chat session.
#[derive(Clone)]
pub struct SessionQueues {
    inner: Arc<Mutex<HashMap<SessionKey, mpsc::Sender<Work>>>>,
    capacity: usize,
}

impl SessionQueues {
    pub fn new(capacity: usize) -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())), capacity }
    }

    /// Number of sessions with a live consumer.
    pub fn active_sessions(&self) -> usize {
        self.inner.lock().len()
    }

    /// Enqueue `work` for `key`, starting a consumer when none is live.
    pub fn submit<F>(&self, key: &SessionKey, work: F) -> Result<(), QueueError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let work: Work = Box::pin(work);
        let mut map = self.inner.lock();
        if let Some(sender) = map.get(key) {
            return sender
                .try_send(work)
                .map_err(|_| QueueError::Full(self.capacity));
        }
        let (sender, receiver) = mpsc::channel(self.capacity);
        // Capacity is at least 1, so the first send cannot fail.
        if sender.try_send(work).is_err() {
            return Err(QueueError::Full(self.capacity));
        }
        map.insert(key.clone(), sender);
        drop(map);
        self.spawn_consumer(key.clone(), receiver);
        Ok(())
    }

    fn spawn_consumer(&self, key: SessionKey, mut receiver: mpsc::Receiver<Work>) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                // Drain-or-exit decided atomically with the submit path.
                let next = {
                    let mut map = inner.lock();
                    match receiver.try_recv() {
                        Ok(work) => Some(work),
                        Err(_) => {
                            map.remove(&key);
                            None
                        }
                    }
                };
                match next {
                    Some(work) => work.await,
                    None => break,
                }
            }
            tracing::debug!(session = %key, "session queue drained");
        });
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
