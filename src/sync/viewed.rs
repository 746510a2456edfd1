use std::collections::HashSet;

use crate::message::ConversationKey;

/// Conversations the user has opened at least once this session.
///
/// Only grows; cleared by a full session reset.
#[derive(Debug, Default, Clone)]
pub struct ViewedSet {
    keys: HashSet<ConversationKey>,
}

impl ViewedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time a key is marked.
    pub fn mark(&mut self, key: &ConversationKey) -> bool {
        self.keys.insert(key.clone())
    }

    pub fn contains(&self, key: &ConversationKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub(crate) fn reset(&mut self) {
        self.keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_is_idempotent() {
        let mut viewed = ViewedSet::new();
        let key = ConversationKey::group("1");
        assert!(viewed.mark(&key));
        assert!(!viewed.mark(&key));
        assert_eq!(viewed.len(), 1);
        assert!(viewed.contains(&key));
        assert!(!viewed.contains(&ConversationKey::private("1")));
    }

    #[test]
    fn reset_empties() {
        let mut viewed = ViewedSet::new();
        viewed.mark(&ConversationKey::group("1"));
        viewed.reset();
        assert!(viewed.is_empty());
    }
}
