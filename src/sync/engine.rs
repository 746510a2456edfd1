use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::api::{ApiError, ChatBackend};
use crate::config::PollingConfig;
use crate::message::ConversationKey;

use super::poller::{spawn_log_poller, spawn_thread_poller, SyncEvent};
use super::thread::{SelectionToken, ThreadUpdate};
use super::{PollReport, SyncSession};

/// What handling one `SyncEvent` did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineUpdate {
    Log(PollReport),
    Thread(ThreadUpdate),
}

/// Owns a `SyncSession` and the polling tasks that feed it.
///
/// Not shared: the UI loop holds it, drains the receiver returned by
/// `new`, and passes each event to `handle`.
pub struct SyncEngine {
    session: SyncSession,
    backend: Arc<dyn ChatBackend>,
    polling: PollingConfig,
    events_tx: UnboundedSender<SyncEvent>,
    log_task: Option<JoinHandle<()>>,
    thread_task: Option<JoinHandle<()>>,
}

impl SyncEngine {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        polling: PollingConfig,
    ) -> (Self, UnboundedReceiver<SyncEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let engine = Self {
            session: SyncSession::new(Utc::now()),
            backend,
            polling,
            events_tx,
            log_task: None,
            thread_task: None,
        };
        (engine, events_rx)
    }

    /// Start the global log poller. Calling it again restarts the poller.
    pub fn start(&mut self) {
        if let Some(task) = self.log_task.take() {
            task.abort();
        }
        tracing::info!(
            every_ms = self.polling.log_interval_ms,
            limit = self.polling.log_limit,
            since = %self.session.cursor().last_checked(),
            "starting message log poller"
        );
        self.log_task = Some(spawn_log_poller(
            self.backend.clone(),
            self.polling.log_interval(),
            self.polling.log_limit,
            self.events_tx.clone(),
        ));
    }

    /// Fetch the contact directory and install it.
    ///
    /// On failure the current directory (empty at start-up) is kept.
    pub async fn refresh_directory(&mut self) -> Result<usize, ApiError> {
        match self.backend.fetch_contacts().await {
            Ok(directory) => {
                let n = directory.len();
                self.session.set_directory(directory);
                tracing::info!(contacts = n, "contact directory loaded");
                Ok(n)
            }
            Err(e) => {
                tracing::warn!(error = %e, "contact directory fetch failed");
                Err(e)
            }
        }
    }

    /// Open `key` and start polling its history.
    pub fn select(&mut self, key: ConversationKey) -> SelectionToken {
        self.stop_thread_task();
        let token = self.session.select(key.clone());
        self.spawn_thread_task(key, token);
        token
    }

    pub fn deselect(&mut self) {
        self.stop_thread_task();
        self.session.deselect();
    }

    /// Re-fetch the open thread now instead of waiting for the next tick.
    pub fn poke_thread(&mut self) {
        let (Some(key), Some(token)) = (
            self.session.active_key().cloned(),
            self.session.thread().token(),
        ) else {
            return;
        };
        self.stop_thread_task();
        self.spawn_thread_task(key, token);
    }

    pub fn handle(&mut self, event: SyncEvent) -> EngineUpdate {
        match event {
            SyncEvent::Log { started_at, result } => {
                EngineUpdate::Log(self.session.apply_log_poll(started_at, result))
            }
            SyncEvent::Thread { token, result } => {
                EngineUpdate::Thread(self.session.apply_thread(token, result))
            }
        }
    }

    /// Send `text` to `key`. Nothing is appended locally; the message shows
    /// up once the history poll returns it.
    pub async fn send(&self, key: &ConversationKey, text: &str) -> Result<(), ApiError> {
        match self.backend.send(key, text).await {
            Ok(()) => {
                tracing::info!(%key, chars = text.chars().count(), "message sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(%key, error = %e, "send failed");
                Err(e)
            }
        }
    }

    /// Forget all session state and restart the log poller.
    pub fn reset(&mut self) {
        self.stop_thread_task();
        self.session.reset(Utc::now());
        self.start();
    }

    pub fn session(&self) -> &SyncSession {
        &self.session
    }

    pub fn shutdown(&mut self) {
        self.stop_thread_task();
        if let Some(task) = self.log_task.take() {
            task.abort();
        }
    }

    fn spawn_thread_task(&mut self, key: ConversationKey, token: SelectionToken) {
        self.thread_task = Some(spawn_thread_poller(
            self.backend.clone(),
            key,
            token,
            self.polling.thread_interval(),
            self.polling.history_limit,
            self.events_tx.clone(),
        ));
    }

    fn stop_thread_task(&mut self) {
        if let Some(task) = self.thread_task.take() {
            task.abort();
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeBackend;
    use crate::message::{Contact, ContactMeta, Message};
    use crate::sync::ScrollAction;
    use chrono::Duration as ChronoDuration;

    fn polling() -> PollingConfig {
        PollingConfig {
            log_interval_ms: 1000,
            log_limit: 50,
            thread_interval_ms: 300,
            history_limit: 20,
        }
    }

    fn msg(key: &ConversationKey, body: &str, age_secs: i64) -> Message {
        Message {
            id: body.to_string(),
            conversation_key: Some(key.clone()),
            timestamp: Utc::now() - ChronoDuration::seconds(age_secs),
            body: body.to_string(),
            ..Default::default()
        }
    }

    fn directory() -> Vec<Contact> {
        vec![
            Contact::new(
                ConversationKey::group("100"),
                "Rust",
                ContactMeta::Group {
                    member_count: 3,
                    max_member_count: 10,
                },
                0,
            ),
            Contact::new(
                ConversationKey::private("7"),
                "Ann",
                ContactMeta::Friend {
                    remark: String::new(),
                },
                1,
            ),
        ]
    }

    fn engine_with(backend: Arc<FakeBackend>) -> (SyncEngine, UnboundedReceiver<SyncEvent>) {
        SyncEngine::new(backend, polling())
    }

    #[tokio::test]
    async fn directory_failure_degrades_to_empty() {
        let backend = Arc::new(FakeBackend::default());
        *backend.fail_contacts.lock().unwrap() = true;
        let (mut engine, _rx) = engine_with(backend);
        assert!(engine.refresh_directory().await.is_err());
        assert!(engine.session().contacts().is_empty());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_directory() {
        let backend = Arc::new(FakeBackend::default());
        *backend.contacts.lock().unwrap() = directory();
        let (mut engine, _rx) = engine_with(backend.clone());
        assert_eq!(engine.refresh_directory().await.unwrap(), 2);

        *backend.fail_contacts.lock().unwrap() = true;
        assert!(engine.refresh_directory().await.is_err());
        assert_eq!(engine.session().contacts().len(), 2);
    }

    #[tokio::test]
    async fn log_events_update_unread() {
        let backend = Arc::new(FakeBackend::default());
        *backend.contacts.lock().unwrap() = directory();
        let (mut engine, mut rx) = engine_with(backend.clone());
        engine.refresh_directory().await.unwrap();

        let key = ConversationKey::group("100");
        // Arrives after the session started.
        let fresh = Message {
            timestamp: Utc::now() + ChronoDuration::seconds(1),
            ..msg(&key, "hello", 0)
        };
        *backend.log.lock().unwrap() = vec![fresh, msg(&key, "old", 3600)];

        engine.start();
        let event = rx.recv().await.unwrap();
        assert_eq!(
            engine.handle(event),
            EngineUpdate::Log(PollReport::Applied { fresh: 1, counted: 1 })
        );
        assert_eq!(engine.session().unread().count(&key), 1);
        assert_eq!(engine.session().contacts()[0].key, key);
        assert_eq!(engine.session().contacts()[0].unread_count, 1);
        engine.shutdown();
    }

    #[tokio::test]
    async fn select_loads_thread() {
        let backend = Arc::new(FakeBackend::default());
        let key = ConversationKey::private("7");
        backend.histories.lock().unwrap().insert(
            key.clone(),
            vec![msg(&key, "a", 30), msg(&key, "b", 20), msg(&key, "c", 10)],
        );
        let (mut engine, mut rx) = engine_with(backend);
        let token = engine.select(key.clone());

        match rx.recv().await.unwrap() {
            event @ SyncEvent::Thread { .. } => {
                assert_eq!(
                    engine.handle(event),
                    EngineUpdate::Thread(ThreadUpdate::Applied(ScrollAction::Initial))
                );
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(engine.session().thread().is_current(token));
        assert_eq!(engine.session().thread().messages().len(), 3);
        assert!(engine.session().viewed().contains(&key));
    }

    #[tokio::test]
    async fn switching_discards_late_responses() {
        let backend = Arc::new(FakeBackend::default());
        let a = ConversationKey::group("100");
        let b = ConversationKey::private("7");
        backend
            .histories
            .lock()
            .unwrap()
            .insert(b.clone(), vec![msg(&b, "b1", 5)]);
        let (mut engine, mut rx) = engine_with(backend);
        let token_a = engine.select(a.clone());
        engine.select(b.clone());

        // A response for A that resolved before its task was aborted.
        let late = SyncEvent::Thread {
            token: token_a,
            result: Ok(vec![msg(&a, "a1", 5), msg(&a, "a2", 4)]),
        };
        assert_eq!(engine.handle(late), EngineUpdate::Thread(ThreadUpdate::Stale));
        assert_eq!(engine.session().active_key(), Some(&b));
        assert!(engine.session().thread().messages().is_empty());

        loop {
            let event = rx.recv().await.unwrap();
            if let EngineUpdate::Thread(ThreadUpdate::Applied(_)) = engine.handle(event) {
                break;
            }
        }
        assert_eq!(engine.session().thread().messages()[0].body, "b1");
    }

    #[tokio::test]
    async fn deselect_stops_thread_updates() {
        let backend = Arc::new(FakeBackend::default());
        let key = ConversationKey::group("100");
        let (mut engine, _rx) = engine_with(backend);
        let token = engine.select(key.clone());
        engine.deselect();
        let late = SyncEvent::Thread {
            token,
            result: Ok(vec![msg(&key, "x", 1)]),
        };
        assert_eq!(engine.handle(late), EngineUpdate::Thread(ThreadUpdate::Stale));
        assert_eq!(engine.session().active_key(), None);
    }

    #[tokio::test]
    async fn send_does_not_append_locally() {
        let backend = Arc::new(FakeBackend::default());
        let key = ConversationKey::group("100");
        let (mut engine, _rx) = engine_with(backend.clone());
        engine.select(key.clone());
        engine.send(&key, "hi").await.unwrap();
        assert_eq!(
            backend.sent.lock().unwrap().as_slice(),
            &[(key.clone(), "hi".to_string())]
        );
        assert!(engine.session().thread().messages().is_empty());
    }

    #[tokio::test]
    async fn send_failure_is_returned() {
        let backend = Arc::new(FakeBackend::default());
        *backend.fail_send.lock().unwrap() = true;
        let (engine, _rx) = engine_with(backend.clone());
        let err = engine
            .send(&ConversationKey::group("1"), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Rejected(_)));
        assert!(backend.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn poke_refetches_current_selection() {
        let backend = Arc::new(FakeBackend::default());
        let key = ConversationKey::group("100");
        let (mut engine, mut rx) = engine_with(backend.clone());
        let token = engine.select(key);
        rx.recv().await.unwrap();
        engine.poke_thread();
        match rx.recv().await.unwrap() {
            SyncEvent::Thread { token: got, .. } => assert_eq!(got, token),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(*backend.history_calls.lock().unwrap() >= 2);
    }
}
