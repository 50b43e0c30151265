//! One-time notifications.
//!
//! Saves and actions leave a [`Message`] in the site's [`MessageStorage`]; the
//! next read of `/messages/` drains them.

use serde::{Deserialize, Serialize};

/// How a notification is presented, least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl MessageLevel {
    /// CSS-style class the admin front end renders the message with.
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A queued notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub level: MessageLevel,
    pub text: String,
    pub tags: String,
}

impl Message {
    pub fn new(level: MessageLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            tags: level.css_class().to_string(),
        }
    }
}

/// Notifications waiting to be read, oldest first.
///
/// ```
/// use storefront_admin::contrib::messages::{MessageLevel, MessageStorage};
///
/// let mut storage = MessageStorage::new();
/// storage.add(MessageLevel::Success, "3 products were successfully updated");
/// storage.add(MessageLevel::Warning, "No action selected.");
///
/// assert_eq!(storage.drain().len(), 2);
/// assert!(storage.drain().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageStorage {
    queue: Vec<Message>,
}

impl MessageStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, level: MessageLevel, text: &str) {
        self.queue.push(Message::new(level, text));
    }

    /// Takes every queued message.
    pub fn drain(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered_by_severity() {
        assert!(MessageLevel::Info < MessageLevel::Success);
        assert!(MessageLevel::Success < MessageLevel::Warning);
        assert!(MessageLevel::Warning < MessageLevel::Error);
    }

    #[test]
    fn test_drain_keeps_insertion_order() {
        let mut storage = MessageStorage::new();
        storage.add(MessageLevel::Success, "one");
        storage.add(MessageLevel::Warning, "two");
        storage.add(MessageLevel::Error, "three");

        let texts: Vec<_> = storage.drain().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert!(storage.drain().is_empty());
    }

    #[test]
    fn test_message_json() {
        let json = serde_json::to_value(Message::new(MessageLevel::Warning, "Careful")).unwrap();
        assert_eq!(json["level"], "Warning");
        assert_eq!(json["tags"], "warning");
        assert_eq!(json["text"], "Careful");
    }
}
