use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

/// Longest preview shown next to a contact, in characters.
const PREVIEW_CHARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChatKind {
    Group,
    Private,
}

impl ChatKind {
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "group" => Some(ChatKind::Group),
            "private" => Some(ChatKind::Private),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatKind::Group => "group",
            ChatKind::Private => "private",
        }
    }
}

/// Identifies one conversation: a group thread or a private thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationKey {
    pub kind: ChatKind,
    pub id: String,
}

impl ConversationKey {
    pub fn new(kind: ChatKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self::new(ChatKind::Group, id)
    }

    pub fn private(id: impl Into<String>) -> Self {
        Self::new(ChatKind::Private, id)
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

impl FromStr for ConversationKey {
    type Err = String;

    /// Parse `group:123` / `private:456`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| format!("expected KIND:ID, got {:?}", s))?;
        let kind = ChatKind::from_wire(kind)
            .ok_or_else(|| format!("unknown conversation kind {:?}", kind))?;
        if id.is_empty() {
            return Err("conversation id is empty".to_string());
        }
        Ok(Self::new(kind, id))
    }
}

/// A single chat line, immutable once received.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    /// `None` for log entries that belong to no conversation we can address.
    pub conversation_key: Option<ConversationKey>,
    pub timestamp: DateTime<Utc>,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub is_self: bool,
    pub is_system_event: bool,
    pub body: String,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            id: String::new(),
            conversation_key: None,
            timestamp: Utc::now(),
            sender_id: String::new(),
            sender_name: None,
            is_self: false,
            is_system_event: false,
            body: String::new(),
        }
    }
}

impl Message {
    /// Whether this message can ever bump an unread counter.
    pub fn counts_as_unread(&self) -> bool {
        !self.is_self && !self.is_system_event
    }

    /// Sender for the thread view (display name, falls back to the id).
    pub fn sender_display(&self) -> String {
        if self.is_self {
            return "me".to_string();
        }
        self.sender_name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.sender_id.clone())
    }

    /// One-line preview for the contact list. System events are kept as
    /// the server wrote them.
    pub fn preview(&self) -> String {
        if self.is_system_event {
            return self.body.clone();
        }
        let collapsed = self.body.split_whitespace().collect::<Vec<_>>().join(" ");
        let chars: Vec<char> = collapsed.chars().collect();
        if chars.len() <= PREVIEW_CHARS {
            collapsed
        } else {
            let mut out: String = chars[..PREVIEW_CHARS - 1].iter().collect();
            out.push('\u{2026}');
            out
        }
    }

    pub fn date_display(&self) -> String {
        date_display(self.timestamp)
    }
}

/// Compact relative date for list and thread views.
pub fn date_display(date: DateTime<Utc>) -> String {
    let now = Utc::now();
    let local = date.with_timezone(&Local);
    if now.with_timezone(&Local).date_naive() == local.date_naive() {
        local.format("%H:%M").to_string()
    } else if (now - date).num_days() < 7 {
        local.format("%a %H:%M").to_string()
    } else if now.with_timezone(&Local).format("%Y").to_string() == local.format("%Y").to_string() {
        local.format("%b %d").to_string()
    } else {
        local.format("%Y-%m-%d").to_string()
    }
}

/// Parse a backend timestamp.
///
/// RFC 3339 strings keep their offset. Naive ISO-8601 strings (what the
/// backend emits for its own event clock) are read as local time.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactMeta {
    Group {
        member_count: u32,
        max_member_count: u32,
    },
    Friend {
        remark: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub key: ConversationKey,
    pub display_name: String,
    /// Avatar URL from the directory; not drawn in the terminal.
    #[allow(dead_code)]
    pub avatar_ref: String,
    pub metadata: ContactMeta,
    /// Position in the directory as fetched; the sort tie-breaker.
    pub directory_index: usize,
    pub last_message_timestamp: Option<DateTime<Utc>>,
    pub last_message_preview: Option<String>,
    pub unread_count: u32,
}

impl Contact {
    pub fn new(
        key: ConversationKey,
        display_name: impl Into<String>,
        metadata: ContactMeta,
        directory_index: usize,
    ) -> Self {
        Self {
            key,
            display_name: display_name.into(),
            avatar_ref: String::new(),
            metadata,
            directory_index,
            last_message_timestamp: None,
            last_message_preview: None,
            unread_count: 0,
        }
    }

    /// Secondary line under the name when there is no message yet.
    pub fn subtitle(&self) -> String {
        match &self.metadata {
            ContactMeta::Group {
                member_count,
                max_member_count,
            } if *max_member_count > 0 => format!("{}/{} members", member_count, max_member_count),
            ContactMeta::Group { member_count, .. } => format!("{} members", member_count),
            ContactMeta::Friend { remark } if !remark.is_empty() => remark.clone(),
            ContactMeta::Friend { .. } => self.key.to_string(),
        }
    }

    pub fn date_display(&self) -> String {
        self.last_message_timestamp
            .map(date_display)
            .unwrap_or_default()
    }
}
