use std::collections::HashMap;

use crate::message::{ConversationKey, Message};

use super::viewed::ViewedSet;

/// Per-conversation unread counters.
///
/// Counts only ever grow through `increment` and drop to zero through
/// `clear`; a tick adds to what is there instead of replacing it, so
/// messages from several ticks between two renders are never lost.
#[derive(Debug, Default, Clone)]
pub struct UnreadAccumulator {
    counts: HashMap<ConversationKey, u32>,
}

impl UnreadAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `new_messages` that qualify as unread: not sent by us, not a
    /// system event, not in a viewed conversation and not in the one that
    /// is open right now. Returns how many were counted.
    pub fn increment(
        &mut self,
        new_messages: &[Message],
        viewed: &ViewedSet,
        active: Option<&ConversationKey>,
    ) -> usize {
        let mut counted = 0;
        for msg in new_messages {
            if !msg.counts_as_unread() {
                continue;
            }
            let Some(key) = msg.conversation_key.as_ref() else {
                continue;
            };
            if viewed.contains(key) || active == Some(key) {
                continue;
            }
            let slot = self.counts.entry(key.clone()).or_insert(0);
            *slot = slot.saturating_add(1);
            counted += 1;
        }
        counted
    }

    pub fn clear(&mut self, key: &ConversationKey) {
        self.counts.insert(key.clone(), 0);
    }

    pub fn count(&self, key: &ConversationKey) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().fold(0u32, |acc, n| acc.saturating_add(*n))
    }

    /// Conversations with a nonzero count.
    pub fn unread_keys(&self) -> impl Iterator<Item = &ConversationKey> {
        self.counts
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(k, _)| k)
    }

    pub(crate) fn reset(&mut self) {
        self.counts.clear();
    }
}
