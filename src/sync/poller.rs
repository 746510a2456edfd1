use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::{ApiError, ChatBackend};
use crate::message::{ConversationKey, Message};

use super::thread::SelectionToken;

/// A finished fetch, delivered to the task that owns the session.
#[derive(Debug)]
pub enum SyncEvent {
    /// One tick of the global log poller.
    Log {
        /// When the request was issued; the cursor advances at least to this.
        started_at: DateTime<Utc>,
        result: Result<Vec<Message>, ApiError>,
    },
    /// One tick of the active-thread poller.
    Thread {
        token: SelectionToken,
        result: Result<Vec<Message>, ApiError>,
    },
}

/// Boundary between already-counted and new log entries.
#[derive(Debug, Clone)]
pub struct Cursor {
    last_checked: DateTime<Utc>,
}

impl Cursor {
    /// Entries at or before `start` are history, not news.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            last_checked: start,
        }
    }

    pub fn last_checked(&self) -> DateTime<Utc> {
        self.last_checked
    }

    /// Messages strictly newer than the cursor.
    pub fn partition(&self, window: &[Message]) -> Vec<Message> {
        window
            .iter()
            .filter(|m| m.timestamp > self.last_checked)
            .cloned()
            .collect()
    }

    /// Move forward to `to`; never moves back.
    pub fn advance(&mut self, to: DateTime<Utc>) {
        if to > self.last_checked {
            self.last_checked = to;
        }
    }

    /// Advance after a successful poll issued at `issued_at` that yielded
    /// `fresh`. Server stamps can run ahead of our clock, so the cursor
    /// also moves past the newest fresh entry; otherwise that entry would
    /// be new again on the next tick.
    pub fn settle(&mut self, issued_at: DateTime<Utc>, fresh: &[Message]) {
        self.advance(issued_at);
        if let Some(newest) = fresh.iter().map(|m| m.timestamp).max() {
            self.advance(newest);
        }
    }
}

/// Poll the message log every `every`, forever.
///
/// The fetch is awaited inside the loop, so there is never more than one
/// request in flight; ticks that fire meanwhile are skipped, not queued.
pub fn spawn_log_poller(
    backend: Arc<dyn ChatBackend>,
    every: Duration,
    limit: usize,
    tx: UnboundedSender<SyncEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let started_at = Utc::now();
            let result = backend.fetch_log(limit).await;
            if tx.send(SyncEvent::Log { started_at, result }).is_err() {
                tracing::debug!("log poller: receiver gone, stopping");
                break;
            }
        }
    })
}

/// Poll one conversation's history every `every` until aborted.
/// The first fetch happens immediately.
pub fn spawn_thread_poller(
    backend: Arc<dyn ChatBackend>,
    key: ConversationKey,
    token: SelectionToken,
    every: Duration,
    limit: usize,
    tx: UnboundedSender<SyncEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let result = backend.fetch_history(&key, limit).await;
            if tx.send(SyncEvent::Thread { token, result }).is_err() {
                tracing::debug!(%key, "thread poller: receiver gone, stopping");
                break;
            }
        }
    })
}
