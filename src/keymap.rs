use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Contact list has focus.
    Normal,
    /// Open conversation has focus.
    Thread,
    /// Typing a message into the input line.
    Compose,
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // Contact list
    MoveDown,
    MoveUp,
    JumpTop,
    JumpBottom,
    HalfPageDown,
    HalfPageUp,
    OpenConversation,
    CloseConversation,
    RefreshDirectory,
    ResetSession,

    // Thread
    FocusThread,
    FocusList,
    ScrollUp,
    ScrollDown,
    ScrollHalfPageUp,
    ScrollHalfPageDown,
    ScrollBottom,

    // Compose
    Compose,

    // Text input
    InputChar(char),
    InputBackspace,
    InputSubmit,
    InputCancel,

    // System
    Help,
    Quit,
    Noop,
}

/// Tracks multi-key sequences (`g g` for JumpTop).
#[derive(Debug, Default)]
pub struct KeyMapper {
    pending: Option<KeyCode>,
}

impl KeyMapper {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Process a key event and return an action, considering current input mode.
    pub fn handle(&mut self, key: KeyEvent, mode: InputMode) -> Action {
        // Ctrl+C quits from anywhere.
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.pending = None;
            return Action::Quit;
        }
        match mode {
            InputMode::Normal => self.handle_normal(key),
            InputMode::Thread => self.handle_thread(key),
            InputMode::Compose => self.handle_input(key),
            InputMode::Help => self.handle_help(key),
        }
    }

    fn handle_normal(&mut self, key: KeyEvent) -> Action {
        if let Some(first) = self.pending.take() {
            return self.handle_sequence(first, key);
        }

        match (key.code, key.modifiers) {
            (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, _) => Action::MoveDown,
            (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, _) => Action::MoveUp,
            (KeyCode::Char('g'), KeyModifiers::NONE) => {
                self.pending = Some(KeyCode::Char('g'));
                Action::Noop
            }
            (KeyCode::Char('G'), _) => Action::JumpBottom,
            (KeyCode::Char('d'), KeyModifiers::CONTROL) => Action::HalfPageDown,
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => Action::HalfPageUp,

            (KeyCode::Enter, _) => Action::OpenConversation,
            (KeyCode::Esc, _) => Action::CloseConversation,
            (KeyCode::Tab, _) | (KeyCode::Char('l'), KeyModifiers::NONE) => Action::FocusThread,
            (KeyCode::Char('i'), KeyModifiers::NONE) => Action::Compose,
            (KeyCode::Char('R'), _) => Action::RefreshDirectory,
            (KeyCode::Char('l'), KeyModifiers::CONTROL) => Action::ResetSession,

            (KeyCode::Char('?'), _) => Action::Help,
            (KeyCode::Char('q'), KeyModifiers::NONE) => Action::Quit,
            _ => Action::Noop,
        }
    }

    fn handle_sequence(&mut self, first: KeyCode, key: KeyEvent) -> Action {
        match (first, key.code) {
            (KeyCode::Char('g'), KeyCode::Char('g')) => Action::JumpTop,
            _ => Action::Noop,
        }
    }

    fn handle_thread(&mut self, key: KeyEvent) -> Action {
        match (key.code, key.modifiers) {
            (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, _) => Action::ScrollDown,
            (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, _) => Action::ScrollUp,
            (KeyCode::Char('d'), KeyModifiers::CONTROL) => Action::ScrollHalfPageDown,
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => Action::ScrollHalfPageUp,
            (KeyCode::Char('G'), _) => Action::ScrollBottom,
            (KeyCode::Tab, _) | (KeyCode::Char('h'), KeyModifiers::NONE) => Action::FocusList,
            (KeyCode::Esc, _) => Action::CloseConversation,
            (KeyCode::Char('i'), KeyModifiers::NONE) => Action::Compose,
            (KeyCode::Char('?'), _) => Action::Help,
            (KeyCode::Char('q'), KeyModifiers::NONE) => Action::Quit,
            _ => Action::Noop,
        }
    }

    fn handle_input(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => Action::InputCancel,
            KeyCode::Enter => Action::InputSubmit,
            KeyCode::Backspace => Action::InputBackspace,
            KeyCode::Char(c) => Action::InputChar(c),
            _ => Action::Noop,
        }
    }

    fn handle_help(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => Action::ScrollDown,
            KeyCode::Char('k') | KeyCode::Up => Action::ScrollUp,
            _ => Action::InputCancel,
        }
    }

    /// Cancel any pending sequence (e.g., on timeout).
    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_display(&self) -> Option<&str> {
        match self.pending {
            Some(KeyCode::Char('g')) => Some("g"),
            _ => None,
        }
    }
}
