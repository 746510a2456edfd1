use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::message::{Contact, ConversationKey, Message};
use crate::wire::{
    ContactsResponse, ErrorBody, HistoryEntry, LogEntry, LoginRequest, LoginResponse,
    SendRequest, SendResponse,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("unauthorized (token missing or expired)")]
    Unauthorized,
    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("send rejected: {0}")]
    Rejected(String),
}

/// Everything the sync engine needs from the dashboard backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Most recent log entries, newest first, at most `limit`.
    async fn fetch_log(&self, limit: usize) -> Result<Vec<Message>, ApiError>;

    /// Full bounded history of one conversation, oldest first.
    async fn fetch_history(
        &self,
        key: &ConversationKey,
        limit: usize,
    ) -> Result<Vec<Message>, ApiError>;

    /// The contact directory in directory order.
    async fn fetch_contacts(&self) -> Result<Vec<Contact>, ApiError>;

    async fn send(&self, key: &ConversationKey, text: &str) -> Result<(), ApiError>;
}

/// `ChatBackend` over the dashboard's REST API.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, token: String, timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: normalize_base(base_url),
            token,
        })
    }

    /// Exchange username and password for a bearer token.
    pub async fn login(
        base_url: &str,
        timeout: Duration,
        username: &str,
        password: &str,
    ) -> Result<String, ApiError> {
        let client = build_client(timeout)?;
        let url = format!("{}/api/auth/login", normalize_base(base_url));
        tracing::debug!(%url, username, "logging in");
        let resp = client
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        let login: LoginResponse = decode(resp).await?;
        Ok(login.access_token)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;
        decode(resp).await
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn fetch_log(&self, limit: usize) -> Result<Vec<Message>, ApiError> {
        let entries: Vec<LogEntry> = self
            .get_json("/api/messages/log", &[("limit", limit.to_string())])
            .await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let raw = entry.timestamp.clone();
                let msg = entry.into_message();
                if msg.is_none() {
                    tracing::warn!(timestamp = %raw, "skipping log entry with unreadable timestamp");
                }
                msg
            })
            .collect())
    }

    async fn fetch_history(
        &self,
        key: &ConversationKey,
        limit: usize,
    ) -> Result<Vec<Message>, ApiError> {
        let path = format!("/api/chat/history/{}/{}", key.kind.as_str(), key.id);
        let entries: Vec<HistoryEntry> = self
            .get_json(&path, &[("limit", limit.to_string())])
            .await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| entry.into_message(key))
            .collect())
    }

    async fn fetch_contacts(&self) -> Result<Vec<Contact>, ApiError> {
        let resp: ContactsResponse = self.get_json("/api/chat/contacts", &[]).await?;
        Ok(resp.into_directory())
    }

    async fn send(&self, key: &ConversationKey, text: &str) -> Result<(), ApiError> {
        let resp = self
            .client
            .post(self.url("/api/chat/send"))
            .bearer_auth(&self.token)
            .json(&SendRequest {
                kind: key.kind.as_str(),
                id: &key.id,
                message: text,
            })
            .send()
            .await?;
        let sent: SendResponse = decode(resp).await?;
        if !sent.success {
            return Err(ApiError::Rejected(format!("backend refused message to {}", key)));
        }
        tracing::debug!(%key, message_id = ?sent.message_id, "message sent");
        Ok(())
    }
}

fn build_client(timeout: Duration) -> Result<Client, ApiError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

fn normalize_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Read a response body, mapping non-2xx statuses to `ApiError`.
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(status_error(status, &body));
    }
    Ok(serde_json::from_str(&body)?)
}

fn status_error(status: StatusCode, body: &str) -> ApiError {
    if status == StatusCode::UNAUTHORIZED {
        return ApiError::Unauthorized;
    }
    let detail = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message())
        .unwrap_or_else(|_| body.trim().chars().take(200).collect());
    ApiError::Status {
        status: status.as_u16(),
        detail,
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory backend for engine and task tests.
    #[derive(Default)]
    pub struct FakeBackend {
        pub log: Mutex<Vec<Message>>,
        pub histories: Mutex<HashMap<ConversationKey, Vec<Message>>>,
        pub contacts: Mutex<Vec<Contact>>,
        pub sent: Mutex<Vec<(ConversationKey, String)>>,
        pub fail_log: Mutex<bool>,
        pub fail_contacts: Mutex<bool>,
        pub fail_send: Mutex<bool>,
        pub log_calls: Mutex<usize>,
        pub history_calls: Mutex<usize>,
        pub log_in_flight: Mutex<usize>,
        pub max_log_in_flight: Mutex<usize>,
        /// Simulated latency for log fetches.
        pub log_delay: Mutex<Duration>,
    }

    fn unavailable() -> ApiError {
        ApiError::Status {
            status: 503,
            detail: "unavailable".into(),
        }
    }

    #[async_trait]
    impl ChatBackend for FakeBackend {
        async fn fetch_log(&self, limit: usize) -> Result<Vec<Message>, ApiError> {
            *self.log_calls.lock().unwrap() += 1;
            {
                let mut in_flight = self.log_in_flight.lock().unwrap();
                *in_flight += 1;
                let mut max = self.max_log_in_flight.lock().unwrap();
                *max = (*max).max(*in_flight);
            }
            let delay = *self.log_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            *self.log_in_flight.lock().unwrap() -= 1;
            if *self.fail_log.lock().unwrap() {
                return Err(unavailable());
            }
            Ok(self.log.lock().unwrap().iter().take(limit).cloned().collect())
        }

        async fn fetch_history(
            &self,
            key: &ConversationKey,
            limit: usize,
        ) -> Result<Vec<Message>, ApiError> {
            *self.history_calls.lock().unwrap() += 1;
            let all = self
                .histories
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .unwrap_or_default();
            let skip = all.len().saturating_sub(limit);
            Ok(all.into_iter().skip(skip).collect())
        }

        async fn fetch_contacts(&self) -> Result<Vec<Contact>, ApiError> {
            if *self.fail_contacts.lock().unwrap() {
                return Err(unavailable());
            }
            Ok(self.contacts.lock().unwrap().clone())
        }

        async fn send(&self, key: &ConversationKey, text: &str) -> Result<(), ApiError> {
            if *self.fail_send.lock().unwrap() {
                return Err(ApiError::Rejected("nope".into()));
            }
            self.sent.lock().unwrap().push((key.clone(), text.to_string()));
            Ok(())
        }
    }
}
