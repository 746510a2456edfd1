use crate::message::{ChatKind, ConversationKey};
use crate::wire::LogEntry;

/// Map a log entry to the conversation it belongs to.
///
/// Group messages key on `group_id`, private messages on `user_id`. Notice
/// and request entries carry no `message_type`; they land in a group thread
/// when they name a group and are otherwise left unkeyed.
pub fn conversation_key(entry: &LogEntry) -> Option<ConversationKey> {
    let group_id = non_empty(entry.group_id.as_deref());
    let user_id = non_empty(entry.user_id.as_deref());

    match entry.message_type.as_deref().and_then(ChatKind::from_wire) {
        Some(ChatKind::Group) => group_id.map(ConversationKey::group),
        Some(ChatKind::Private) => user_id.map(ConversationKey::private),
        None => group_id.map(ConversationKey::group),
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}
