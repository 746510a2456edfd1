use crate::message::{ConversationKey, Message};

use super::scroll::{ScrollAction, ScrollController};

/// Tags every history request with the selection it was made for.
///
/// Tokens increase monotonically over the life of a session; a response
/// whose token is not the current one belongs to a conversation the user
/// has already left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SelectionToken(u64);

impl SelectionToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadState {
    Idle,
    /// Selected, first history fetch not yet answered.
    Loading {
        key: ConversationKey,
        token: SelectionToken,
    },
    /// Selected, steady polling.
    Loaded {
        key: ConversationKey,
        token: SelectionToken,
    },
}

/// Outcome of feeding a history response to the active thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadUpdate {
    Applied(ScrollAction),
    /// Response for a selection that is no longer current.
    Stale,
    /// Fetch failed; the previous thread is kept.
    Failed,
}

/// The open conversation: which one it is, its messages, and scroll state.
#[derive(Debug)]
pub struct ActiveThread {
    state: ThreadState,
    last_token: u64,
    messages: Vec<Message>,
    scroll: ScrollController,
}

impl Default for ActiveThread {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveThread {
    pub fn new() -> Self {
        Self {
            state: ThreadState::Idle,
            last_token: 0,
            messages: Vec::new(),
            scroll: ScrollController::new(),
        }
    }

    /// Switch to `key`. Drops the old thread, resets the growth baseline
    /// and returns the token the new history requests must carry.
    pub fn select(&mut self, key: ConversationKey) -> SelectionToken {
        let token = self.bump();
        self.messages.clear();
        self.scroll.reset();
        self.state = ThreadState::Loading { key, token };
        token
    }

    pub fn deselect(&mut self) {
        self.bump();
        self.messages.clear();
        self.scroll.reset();
        self.state = ThreadState::Idle;
    }

    /// Replace the thread wholesale with a fresh server snapshot.
    pub fn apply(&mut self, token: SelectionToken, messages: Vec<Message>) -> ThreadUpdate {
        if !self.is_current(token) {
            return ThreadUpdate::Stale;
        }
        if let ThreadState::Loading { key, .. } = &self.state {
            self.state = ThreadState::Loaded {
                key: key.clone(),
                token,
            };
        }
        self.messages = messages;
        ThreadUpdate::Applied(self.scroll.observe(self.messages.len()))
    }

    /// Record a failed fetch; only checks that it was for this selection.
    pub fn fail(&self, token: SelectionToken) -> ThreadUpdate {
        if self.is_current(token) {
            ThreadUpdate::Failed
        } else {
            ThreadUpdate::Stale
        }
    }

    pub fn is_current(&self, token: SelectionToken) -> bool {
        self.token() == Some(token)
    }

    pub fn token(&self) -> Option<SelectionToken> {
        match &self.state {
            ThreadState::Idle => None,
            ThreadState::Loading { token, .. } | ThreadState::Loaded { token, .. } => Some(*token),
        }
    }

    pub fn active_key(&self) -> Option<&ConversationKey> {
        match &self.state {
            ThreadState::Idle => None,
            ThreadState::Loading { key, .. } | ThreadState::Loaded { key, .. } => Some(key),
        }
    }

    pub fn state(&self) -> &ThreadState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, ThreadState::Loading { .. })
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn bump(&mut self) -> SelectionToken {
        self.last_token += 1;
        SelectionToken(self.last_token)
    }
}
