//! JSON shapes exchanged with the dashboard backend, and their conversion
//! into the client's own model.

use serde::{Deserialize, Serialize};

use crate::message::{parse_timestamp, Contact, ContactMeta, ConversationKey, Message};
use crate::sync::keyer;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Sender {
    pub nickname: Option<String>,
    /// Group card name; preferred over the nickname when set.
    pub card: Option<String>,
}

impl Sender {
    fn display_name(&self) -> Option<String> {
        self.card
            .as_deref()
            .filter(|c| !c.is_empty())
            .or(self.nickname.as_deref().filter(|n| !n.is_empty()))
            .map(str::to_string)
    }
}

/// One entry of `GET /api/messages/log`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogEntry {
    pub id: Option<String>,
    pub timestamp: String,
    pub message_type: Option<String>,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    pub is_self: bool,
    pub is_system: bool,
    pub message: String,
    pub sender: Option<Sender>,
}

impl LogEntry {
    /// Convert into a `Message`. Returns `None` if the timestamp is unreadable.
    pub fn into_message(self) -> Option<Message> {
        let timestamp = parse_timestamp(&self.timestamp)?;
        let conversation_key = keyer::conversation_key(&self);
        let sender_id = self.user_id.clone().unwrap_or_default();
        let id = self
            .id
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.timestamp, sender_id));
        Some(Message {
            id,
            conversation_key,
            timestamp,
            sender_id,
            sender_name: self.sender.as_ref().and_then(Sender::display_name),
            is_self: self.is_self,
            is_system_event: self.is_system,
            body: self.message,
        })
    }
}

/// One entry of `GET /api/chat/history/{kind}/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: String,
    pub user_id: String,
    pub message: String,
    pub sender: Option<Sender>,
    pub is_self: bool,
}

impl HistoryEntry {
    pub fn into_message(self, key: &ConversationKey) -> Option<Message> {
        let timestamp = parse_timestamp(&self.timestamp)?;
        Some(Message {
            id: self.id,
            conversation_key: Some(key.clone()),
            timestamp,
            sender_name: self.sender.as_ref().and_then(Sender::display_name),
            sender_id: self.user_id,
            is_self: self.is_self,
            is_system_event: false,
            body: self.message,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GroupEntry {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub member_count: u32,
    pub max_member_count: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FriendEntry {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub remark: String,
}

/// Body of `GET /api/chat/contacts`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactsResponse {
    pub groups: Vec<GroupEntry>,
    pub friends: Vec<FriendEntry>,
}

impl ContactsResponse {
    /// Flatten into directory order: groups first, then friends, each in
    /// server order. Entries without an id are dropped.
    pub fn into_directory(self) -> Vec<Contact> {
        let groups = self.groups.into_iter().filter(|g| !g.id.is_empty()).map(|g| {
            let mut c = Contact::new(
                ConversationKey::group(g.id),
                g.name,
                ContactMeta::Group {
                    member_count: g.member_count,
                    max_member_count: g.max_member_count,
                },
                0,
            );
            c.avatar_ref = g.avatar;
            c
        });
        let friends = self.friends.into_iter().filter(|f| !f.id.is_empty()).map(|f| {
            let mut c = Contact::new(
                ConversationKey::private(f.id),
                f.name,
                ContactMeta::Friend { remark: f.remark },
                0,
            );
            c.avatar_ref = f.avatar;
            c
        });
        groups
            .chain(friends)
            .enumerate()
            .map(|(idx, mut c)| {
                c.directory_index = idx;
                c
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub id: &'a str,
    pub message: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SendResponse {
    pub success: bool,
    pub message_id: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

/// FastAPI error body: `{"detail": "..."}` or `{"detail": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
