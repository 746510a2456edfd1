pub mod contact_list;
pub mod help_overlay;
pub mod status_bar;
pub mod text;
pub mod thread_view;

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use futures::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

use crate::keymap::{Action, InputMode, KeyMapper};
use crate::message::ConversationKey;
use crate::sync::engine::EngineUpdate;
use crate::sync::thread::ThreadUpdate;
use crate::sync::{PollReport, ScrollAction, SyncEngine, SyncEvent};

use self::contact_list::ContactList;
use self::help_overlay::HelpOverlay;
use self::status_bar::{BottomBar, TopBar};
use self::thread_view::{ThreadPane, ThreadView};

const STATUS_TTL: Duration = Duration::from_secs(4);

/// Screen regions for one frame.
#[derive(Debug, Clone, Copy)]
struct Panes {
    top: Rect,
    list: Rect,
    /// Thread pane including its left border.
    thread_frame: Rect,
    thread: Rect,
    bottom: Rect,
}

impl Panes {
    fn split(area: Rect) -> Self {
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(area);
        let content = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(outer[1]);
        let thread_frame = content[1];
        let thread = Block::default().borders(Borders::LEFT).inner(thread_frame);
        Self {
            top: outer[0],
            list: content[0],
            thread_frame,
            thread,
            bottom: outer[2],
        }
    }
}

pub struct App {
    pub engine: SyncEngine,
    pub server_url: String,
    pub keymap: KeyMapper,
    pub mode: InputMode,
    /// Where Compose and Help return to.
    return_mode: InputMode,
    pub should_quit: bool,

    // Contact list: the cursor follows a key, not a row, since rows resort.
    cursor: Option<ConversationKey>,
    list_offset: usize,
    list_height: usize,

    // Thread view
    thread_scroll: usize,
    thread_width: u16,
    thread_height: usize,
    thread_lines: usize,

    pub help_scroll: u16,
    pub input: String,

    // Status message (temporary feedback)
    pub status_message: Option<String>,
    pub status_time: Option<Instant>,
}

impl App {
    pub fn new(engine: SyncEngine, server_url: impl Into<String>) -> Self {
        Self {
            engine,
            server_url: server_url.into(),
            keymap: KeyMapper::new(),
            mode: InputMode::Normal,
            return_mode: InputMode::Normal,
            should_quit: false,
            cursor: None,
            list_offset: 0,
            list_height: 20,
            thread_scroll: 0,
            thread_width: 60,
            thread_height: 20,
            thread_lines: 0,
            help_scroll: 0,
            input: String::new(),
            status_message: None,
            status_time: None,
        }
    }

    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_time = Some(Instant::now());
    }

    fn clear_stale_status(&mut self) {
        if let Some(t) = self.status_time {
            if t.elapsed() > STATUS_TTL {
                self.status_message = None;
                self.status_time = None;
            }
        }
    }

    // ── Contact list ────────────────────────────────────────────────

    fn selected_index(&self) -> usize {
        let contacts = self.engine.session().contacts();
        self.cursor
            .as_ref()
            .and_then(|key| contacts.iter().position(|c| &c.key == key))
            .unwrap_or(0)
    }

    fn select_row(&mut self, idx: usize) {
        let contacts = self.engine.session().contacts();
        if contacts.is_empty() {
            self.cursor = None;
            return;
        }
        let idx = idx.min(contacts.len() - 1);
        self.cursor = Some(contacts[idx].key.clone());
    }

    fn move_by(&mut self, delta: isize) {
        let current = self.selected_index() as isize;
        self.select_row((current + delta).max(0) as usize);
    }

    fn conversation_title(&self, key: &ConversationKey) -> String {
        self.engine
            .session()
            .contact_name(key)
            .map(str::to_string)
            .unwrap_or_else(|| key.to_string())
    }

    /// Open `key` unless it already is the open conversation.
    pub fn open(&mut self, key: ConversationKey) {
        if self.engine.session().active_key() == Some(&key) {
            return;
        }
        self.cursor = Some(key.clone());
        self.thread_scroll = 0;
        self.thread_lines = 0;
        let title = self.conversation_title(&key);
        self.engine.select(key);
        self.set_status(format!("Opened {}", title));
    }

    fn open_selected(&mut self) {
        let idx = self.selected_index();
        if let Some(key) = self.engine.session().contacts().get(idx).map(|c| c.key.clone()) {
            self.open(key);
        }
    }

    fn close(&mut self) {
        if self.engine.session().active_key().is_some() {
            self.engine.deselect();
            self.thread_scroll = 0;
            self.thread_lines = 0;
        }
        self.mode = InputMode::Normal;
    }

    async fn refresh_directory(&mut self) {
        match self.engine.refresh_directory().await {
            Ok(n) => self.set_status(format!("Loaded {} contacts", n)),
            Err(e) => self.set_status(format!("Contact refresh failed: {}", e)),
        }
    }

    // ── Thread view ─────────────────────────────────────────────────

    fn max_thread_scroll(&self) -> usize {
        self.thread_lines.saturating_sub(self.thread_height)
    }

    fn scroll_thread(&mut self, up: isize) {
        let next = (self.thread_scroll as isize + up).max(0) as usize;
        self.thread_scroll = next.min(self.max_thread_scroll());
    }

    fn on_thread_update(&mut self, action: ScrollAction) {
        let lines = ThreadView::line_count(
            self.engine.session().thread().messages(),
            self.thread_width,
        );
        match action {
            ScrollAction::Initial => self.thread_scroll = 0,
            // Pinned views follow on their own; a scrolled-up view keeps
            // its place.
            ScrollAction::Grown if self.thread_scroll > 0 => {
                self.thread_scroll += lines.saturating_sub(self.thread_lines);
                self.set_status("New messages below (G to jump)");
            }
            ScrollAction::Grown | ScrollAction::Unchanged => {}
        }
        self.thread_lines = lines;
    }

    pub fn on_sync_event(&mut self, event: SyncEvent) {
        match self.engine.handle(event) {
            EngineUpdate::Log(PollReport::Applied { .. }) => {}
            EngineUpdate::Log(PollReport::Failed) => {
                self.set_status("Message poll failed; retrying");
            }
            EngineUpdate::Thread(ThreadUpdate::Applied(action)) => self.on_thread_update(action),
            EngineUpdate::Thread(ThreadUpdate::Failed) => {
                self.set_status("Could not load conversation; retrying");
            }
            EngineUpdate::Thread(ThreadUpdate::Stale) => {}
        }
    }

    // ── Compose ─────────────────────────────────────────────────────

    fn start_compose(&mut self) {
        if self.engine.session().active_key().is_none() {
            self.set_status("Open a conversation first (Enter)");
            return;
        }
        self.return_mode = self.mode;
        self.mode = InputMode::Compose;
    }

    async fn submit_input(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            self.mode = self.return_mode;
            return;
        }
        let Some(key) = self.engine.session().active_key().cloned() else {
            self.set_status("Conversation closed; message not sent");
            self.mode = self.return_mode;
            return;
        };
        match self.engine.send(&key, &text).await {
            Ok(()) => {
                self.input.clear();
                self.mode = self.return_mode;
                self.thread_scroll = 0;
                self.engine.poke_thread();
                self.set_status("Sent");
            }
            // Keep the text so it can be retried.
            Err(e) => self.set_status(format!("Send failed: {}", e)),
        }
    }

    // ── Action dispatch ─────────────────────────────────────────────

    async fn handle_action(&mut self, action: Action) {
        match action {
            Action::MoveDown => self.move_by(1),
            Action::MoveUp => self.move_by(-1),
            Action::JumpTop => self.select_row(0),
            Action::JumpBottom => self.select_row(usize::MAX),
            Action::HalfPageDown => self.move_by((self.list_height / 2).max(1) as isize),
            Action::HalfPageUp => self.move_by(-((self.list_height / 2).max(1) as isize)),
            Action::OpenConversation => self.open_selected(),
            Action::CloseConversation => self.close(),
            Action::RefreshDirectory => self.refresh_directory().await,
            Action::ResetSession => {
                self.engine.reset();
                self.cursor = None;
                self.thread_scroll = 0;
                self.thread_lines = 0;
                self.mode = InputMode::Normal;
                self.set_status("Session reset");
            }

            Action::FocusThread => {
                if self.engine.session().active_key().is_some() {
                    self.mode = InputMode::Thread;
                }
            }
            Action::FocusList => self.mode = InputMode::Normal,
            Action::ScrollUp => match self.mode {
                InputMode::Help => self.help_scroll = self.help_scroll.saturating_sub(1),
                _ => self.scroll_thread(1),
            },
            Action::ScrollDown => match self.mode {
                InputMode::Help => self.help_scroll = self.help_scroll.saturating_add(1),
                _ => self.scroll_thread(-1),
            },
            Action::ScrollHalfPageUp => {
                self.scroll_thread((self.thread_height / 2).max(1) as isize)
            }
            Action::ScrollHalfPageDown => {
                self.scroll_thread(-((self.thread_height / 2).max(1) as isize))
            }
            Action::ScrollBottom => self.thread_scroll = 0,

            Action::Compose => self.start_compose(),
            Action::InputChar(c) => {
                if self.mode == InputMode::Compose {
                    self.input.push(c);
                }
            }
            Action::InputBackspace => {
                self.input.pop();
            }
            Action::InputSubmit => {
                if self.mode == InputMode::Compose {
                    self.submit_input().await;
                }
            }
            Action::InputCancel => match self.mode {
                InputMode::Compose | InputMode::Help => self.mode = self.return_mode,
                _ => {}
            },

            Action::Help => {
                self.return_mode = self.mode;
                self.help_scroll = 0;
                self.mode = InputMode::Help;
            }
            Action::Quit => self.should_quit = true,
            Action::Noop => {}
        }
    }

    // ── Rendering ───────────────────────────────────────────────────

    /// Record pane geometry and keep scroll offsets in range.
    fn fit(&mut self, panes: &Panes) {
        self.list_height = panes.list.height as usize;
        let (offset, _) = ContactList::visible_range(
            self.selected_index(),
            self.list_offset,
            self.list_height,
            self.engine.session().contacts().len(),
        );
        self.list_offset = offset;

        if panes.thread.width != self.thread_width {
            self.thread_width = panes.thread.width;
            self.thread_lines = ThreadView::line_count(
                self.engine.session().thread().messages(),
                self.thread_width,
            );
        }
        self.thread_height = panes.thread.height.saturating_sub(1) as usize;
        self.thread_scroll = self.thread_scroll.min(self.max_thread_scroll());
    }

    fn draw(&self, frame: &mut Frame, panes: &Panes) {
        let session = self.engine.session();

        frame.render_widget(
            TopBar {
                server: &self.server_url,
                unread_total: session.unread().total(),
                unread_conversations: session.unread().unread_keys().count(),
                contact_count: session.contacts().len(),
            },
            panes.top,
        );

        frame.render_widget(
            ContactList {
                contacts: session.contacts(),
                selected: self.selected_index(),
                offset: self.list_offset,
                active: session.active_key(),
                focused: matches!(self.mode, InputMode::Normal),
            },
            panes.list,
        );

        frame.render_widget(
            Block::default()
                .borders(Borders::LEFT)
                .border_style(Style::default().fg(Color::DarkGray)),
            panes.thread_frame,
        );
        let title = session.active_key().map(|k| self.conversation_title(k));
        let thread = session.thread();
        let pane = match title.as_deref() {
            None => ThreadPane::Empty,
            Some(title) if thread.is_loading() => ThreadPane::Loading { title },
            Some(title) => ThreadPane::Loaded {
                title,
                messages: thread.messages(),
            },
        };
        frame.render_widget(
            ThreadView {
                pane,
                scroll_from_bottom: self.thread_scroll,
                focused: self.mode == InputMode::Thread,
            },
            panes.thread,
        );

        frame.render_widget(
            BottomBar {
                mode: self.mode,
                pending_key: self.keymap.pending_display(),
                status_message: self.status_message.as_deref(),
                input: (self.mode == InputMode::Compose).then_some(self.input.as_str()),
            },
            panes.bottom,
        );

        if self.mode == InputMode::Help {
            frame.render_widget(
                HelpOverlay {
                    scroll: self.help_scroll,
                },
                frame.area(),
            );
        }
    }
}

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Load the directory, start polling, optionally open `initial`, then run
/// the UI until the user quits.
pub async fn run(
    mut app: App,
    mut events: UnboundedReceiver<SyncEvent>,
    initial: Option<ConversationKey>,
) -> Result<()> {
    app.refresh_directory().await;
    app.engine.start();
    if let Some(key) = initial {
        app.open(key);
    }

    terminal::enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = event_loop(&mut app, &mut events, &mut terminal).await;

    terminal::disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;
    app.engine.shutdown();
    result
}

async fn event_loop(
    app: &mut App,
    events: &mut UnboundedReceiver<SyncEvent>,
    terminal: &mut Term,
) -> Result<()> {
    let sequence_timeout = Duration::from_millis(1000);
    let mut last_key_time = Instant::now();
    let mut event_stream = EventStream::new();

    loop {
        app.clear_stale_status();

        let size = terminal.size()?;
        let panes = Panes::split(Rect::new(0, 0, size.width, size.height));
        app.fit(&panes);
        terminal.draw(|frame| app.draw(frame, &panes))?;

        if app.should_quit {
            break;
        }

        if app.keymap.has_pending() && last_key_time.elapsed() > sequence_timeout {
            app.keymap.cancel_pending();
        }

        let timeout = if app.keymap.has_pending() {
            sequence_timeout
        } else {
            Duration::from_millis(250)
        };

        let event = tokio::select! {
            ev = event_stream.next() => ev.and_then(|r| r.ok()),
            ev = events.recv() => {
                if let Some(ev) = ev {
                    app.on_sync_event(ev);
                    // Apply whatever else is queued before redrawing.
                    while let Ok(ev) = events.try_recv() {
                        app.on_sync_event(ev);
                    }
                }
                continue;
            }
            _ = tokio::time::sleep(timeout) => None,
        };

        if let Some(Event::Key(key)) = event {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            last_key_time = Instant::now();
            let action = app.keymap.handle(key, app.mode);
            app.handle_action(action).await;
        }
    }
    Ok(())
}
