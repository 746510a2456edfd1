use std::cmp::Ordering;
use std::collections::HashMap;

use crate::message::{Contact, ConversationKey, Message};

use super::unread::UnreadAccumulator;

/// Merge the latest poll window into the contact list.
///
/// A contact's last-message fields move only when the window holds a
/// strictly newer message for its key. The result is sorted newest first;
/// contacts that never had a message go last, and ties fall back to
/// directory order. Running it twice on the same inputs gives the same list.
pub fn reconcile(
    previous: &[Contact],
    window: &[Message],
    unread: &UnreadAccumulator,
) -> Vec<Contact> {
    let latest = latest_per_key(window);

    let mut contacts: Vec<Contact> = previous
        .iter()
        .map(|contact| {
            let mut contact = contact.clone();
            if let Some(msg) = latest.get(&contact.key) {
                let newer = match contact.last_message_timestamp {
                    Some(ts) => msg.timestamp > ts,
                    None => true,
                };
                if newer {
                    contact.last_message_timestamp = Some(msg.timestamp);
                    contact.last_message_preview = Some(msg.preview());
                }
            }
            contact.unread_count = unread.count(&contact.key);
            contact
        })
        .collect();

    contacts.sort_by(recency_order);
    contacts
}

/// Replace the directory, keeping what we already learned about contacts
/// that are still in it.
pub fn reseed(directory: Vec<Contact>, previous: &[Contact]) -> Vec<Contact> {
    let known: HashMap<&ConversationKey, &Contact> =
        previous.iter().map(|c| (&c.key, c)).collect();
    directory
        .into_iter()
        .map(|mut contact| {
            if let Some(old) = known.get(&contact.key) {
                contact.last_message_timestamp = old.last_message_timestamp;
                contact.last_message_preview = old.last_message_preview.clone();
            }
            contact
        })
        .collect()
}

fn latest_per_key(window: &[Message]) -> HashMap<&ConversationKey, &Message> {
    let mut latest: HashMap<&ConversationKey, &Message> = HashMap::new();
    for msg in window {
        let Some(key) = msg.conversation_key.as_ref() else {
            continue;
        };
        match latest.get(key) {
            Some(current) if current.timestamp >= msg.timestamp => {}
            _ => {
                latest.insert(key, msg);
            }
        }
    }
    latest
}

fn recency_order(a: &Contact, b: &Contact) -> Ordering {
    match (a.last_message_timestamp, b.last_message_timestamp) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then(a.directory_index.cmp(&b.directory_index))
}
