//! Conversation synchronization and unread tracking.
//!
//! The backend can only be polled. Two pollers feed this module: the global
//! message log (unread counters and the contact list) and the open
//! conversation's history (the thread view). `SyncSession` holds all of the
//! resulting state and is mutated only by the task that owns it; the pollers
//! talk to that task through `SyncEvent`s.

pub mod contacts;
pub mod engine;
pub mod keyer;
pub mod poller;
pub mod scroll;
pub mod thread;
pub mod unread;
pub mod viewed;

use chrono::{DateTime, Utc};

use crate::api::ApiError;
use crate::message::{Contact, ConversationKey, Message};

use self::poller::Cursor;
use self::thread::{ActiveThread, SelectionToken, ThreadUpdate};
use self::unread::UnreadAccumulator;
use self::viewed::ViewedSet;

pub use self::engine::SyncEngine;
pub use self::poller::SyncEvent;
pub use self::scroll::ScrollAction;

/// Result of feeding one log poll to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollReport {
    Applied {
        /// Entries newer than the cursor.
        fresh: usize,
        /// Of those, how many bumped an unread counter.
        counted: usize,
    },
    Failed,
}

/// All per-session synchronization state.
///
/// Nothing here survives a restart.
#[derive(Debug)]
pub struct SyncSession {
    cursor: Cursor,
    viewed: ViewedSet,
    unread: UnreadAccumulator,
    contacts: Vec<Contact>,
    window: Vec<Message>,
    thread: ActiveThread,
}

impl SyncSession {
    /// A fresh session; log entries up to `started_at` count as history.
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            cursor: Cursor::new(started_at),
            viewed: ViewedSet::new(),
            unread: UnreadAccumulator::new(),
            contacts: Vec::new(),
            window: Vec::new(),
            thread: ActiveThread::new(),
        }
    }

    /// Install a freshly fetched contact directory.
    pub fn set_directory(&mut self, directory: Vec<Contact>) {
        let seeded = contacts::reseed(directory, &self.contacts);
        self.contacts = contacts::reconcile(&seeded, &self.window, &self.unread);
    }

    /// Feed one tick of the log poller.
    ///
    /// On success the cursor moves to `started_at`, or past the newest
    /// fresh entry if that is later; on failure nothing changes and the
    /// next tick tries again.
    pub fn apply_log_poll(
        &mut self,
        started_at: DateTime<Utc>,
        result: Result<Vec<Message>, ApiError>,
    ) -> PollReport {
        let window = match result {
            Ok(window) => window,
            Err(e) => {
                tracing::warn!(error = %e, "message log poll failed; keeping cursor");
                return PollReport::Failed;
            }
        };

        let fresh = self.cursor.partition(&window);
        let counted = self
            .unread
            .increment(&fresh, &self.viewed, self.thread.active_key());
        self.cursor.settle(started_at, &fresh);
        self.contacts = contacts::reconcile(&self.contacts, &window, &self.unread);
        self.window = window;

        tracing::debug!(
            window = self.window.len(),
            fresh = fresh.len(),
            newest = fresh.first().map(|m| m.id.as_str()),
            counted,
            unread_total = self.unread.total(),
            "message log poll applied"
        );
        PollReport::Applied {
            fresh: fresh.len(),
            counted,
        }
    }

    /// Open a conversation: mark it viewed, zero its counter and start a
    /// new selection. Returns the token its history requests must carry.
    pub fn select(&mut self, key: ConversationKey) -> SelectionToken {
        self.viewed.mark(&key);
        self.unread.clear(&key);
        for contact in self.contacts.iter_mut().filter(|c| c.key == key) {
            contact.unread_count = 0;
        }
        let token = self.thread.select(key.clone());
        tracing::debug!(
            %key,
            token = token.value(),
            viewed = self.viewed.len(),
            state = ?self.thread.state(),
            "conversation selected"
        );
        token
    }

    pub fn deselect(&mut self) {
        if let Some(key) = self.thread.active_key() {
            tracing::debug!(%key, "conversation closed");
        }
        self.thread.deselect();
    }

    /// Feed one tick of the thread poller.
    pub fn apply_thread(
        &mut self,
        token: SelectionToken,
        result: Result<Vec<Message>, ApiError>,
    ) -> ThreadUpdate {
        match result {
            Ok(messages) => {
                let update = self.thread.apply(token, messages);
                if update == ThreadUpdate::Stale {
                    tracing::debug!(token = token.value(), "discarding stale thread response");
                }
                update
            }
            Err(e) => {
                let update = self.thread.fail(token);
                if update == ThreadUpdate::Failed {
                    tracing::warn!(error = %e, "thread poll failed; keeping previous thread");
                }
                update
            }
        }
    }

    /// Forget everything: viewed set, counters, selection. The contact
    /// directory is kept but its message data is dropped.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        if !self.viewed.is_empty() {
            tracing::debug!(viewed = self.viewed.len(), "forgetting viewed conversations");
        }
        self.cursor = Cursor::new(now);
        self.viewed.reset();
        self.unread.reset();
        self.window.clear();
        self.thread.deselect();
        for contact in &mut self.contacts {
            contact.last_message_timestamp = None;
            contact.last_message_preview = None;
            contact.unread_count = 0;
        }
        self.contacts.sort_by_key(|c| c.directory_index);
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn unread(&self) -> &UnreadAccumulator {
        &self.unread
    }

    pub fn viewed(&self) -> &ViewedSet {
        &self.viewed
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn thread(&self) -> &ActiveThread {
        &self.thread
    }

    pub fn active_key(&self) -> Option<&ConversationKey> {
        self.thread.active_key()
    }

    /// Display name for a key, if it is in the directory.
    pub fn contact_name(&self, key: &ConversationKey) -> Option<&str> {
        self.contacts
            .iter()
            .find(|c| &c.key == key)
            .map(|c| c.display_name.as_str())
    }
}
