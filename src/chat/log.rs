//! Ordered message log and the streaming fold.
//!
//! The log is append-mostly: only the tail can change, either by merging a
//! streamed fragment into it or by dropping a loading placeholder.

use std::sync::Arc;

use tracing::{debug, trace};

use super::message::ChatMessage;

/// Immutable view of the log handed to subscribers.
pub type LogSnapshot = Arc<Vec<ChatMessage>>;

/// Which fold rule an inbound message hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoldOutcome {
    /// The log was empty; the message became its first entry.
    Seeded,
    /// The fragment was appended to the streaming tail.
    Merged { fragment: String },
    /// Same `part` as the tail; nothing changed.
    Duplicate,
    /// Appended as a new tail, after dropping a placeholder if one was there.
    Appended { cleared_loading: bool },
}

impl FoldOutcome {
    /// Whether the fold changed the log.
    pub fn changed_log(&self) -> bool {
        !matches!(self, FoldOutcome::Duplicate)
    }
}

/// The session's ordered message log.
///
/// Backed by a shared vector: [`snapshot`](Self::snapshot) is a cheap
/// clone, and a mutation while a snapshot is alive copies first.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Arc<Vec<ChatMessage>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn get(&self, index: usize) -> Option<&ChatMessage> {
        self.messages.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn snapshot(&self) -> LogSnapshot {
        Arc::clone(&self.messages)
    }

    /// Whether the tail is a loading placeholder.
    pub fn has_loading(&self) -> bool {
        self.last().is_some_and(ChatMessage::is_loading)
    }

    /// Fold one inbound message into the log.
    pub fn fold(&mut self, response: ChatMessage) -> FoldOutcome {
        let Some(tail) = self.messages.last() else {
            self.push(response);
            return FoldOutcome::Seeded;
        };

        if tail.is_streaming_reply() {
            if tail.part() == response.part() {
                debug!(part = ?response.part(), "Dropping duplicate stream fragment");
                return FoldOutcome::Duplicate;
            }

            let fragment = response.content;
            let messages = Arc::make_mut(&mut self.messages);
            if let Some(tail) = messages.last_mut() {
                tail.append_content(&fragment);
                tail.props = response.props;
            }
            trace!(len = fragment.len(), "Merged stream fragment");
            return FoldOutcome::Merged { fragment };
        }

        let cleared_loading = self.clear_loading();
        self.push(response);
        FoldOutcome::Appended { cleared_loading }
    }

    /// Append a message as the new tail.
    pub(crate) fn push(&mut self, message: ChatMessage) {
        Arc::make_mut(&mut self.messages).push(message);
    }

    /// Drop a trailing loading placeholder. Returns whether one was removed.
    pub(crate) fn clear_loading(&mut self) -> bool {
        if !self.has_loading() {
            return false;
        }
        Arc::make_mut(&mut self.messages).pop();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::{Action, Props, Role};
    use serde_json::json;

    fn props(value: serde_json::Value) -> Props {
        value.as_object().cloned().unwrap()
    }

    fn fragment(content: &str, part: i64) -> ChatMessage {
        ChatMessage::assistant(Action::StreamChat, content).with_props(props(json!({"part": part})))
    }

    fn streaming_log() -> MessageLog {
        let mut log = MessageLog::new();
        log.push(ChatMessage::user(Action::StreamChat, "how are sales?"));
        log.push(fragment("foo", 1));
        log
    }

    // =========================================================================
    // Seed
    // =========================================================================

    #[test]
    fn test_seed_empty_log() {
        let mut log = MessageLog::new();
        let reply = ChatMessage::assistant(Action::Chat, "hello");

        let outcome = log.fold(reply.clone());

        assert_eq!(outcome, FoldOutcome::Seeded);
        assert_eq!(log.as_slice(), &[reply]);
    }

    #[test]
    fn test_seed_with_stream_fragment() {
        let mut log = MessageLog::new();
        assert_eq!(log.fold(fragment("a", 0)), FoldOutcome::Seeded);
        assert_eq!(log.len(), 1);
    }

    // =========================================================================
    // Merge
    // =========================================================================

    #[test]
    fn test_merge_same_part_is_noop() {
        let mut log = streaming_log();
        let before = log.as_slice().to_vec();

        let outcome = log.fold(fragment("foo", 1));

        assert_eq!(outcome, FoldOutcome::Duplicate);
        assert!(!outcome.changed_log());
        assert_eq!(log.as_slice(), before.as_slice());
    }

    #[test]
    fn test_merge_accumulates_content() {
        let mut log = streaming_log();

        let outcome = log.fold(fragment("bar", 2));

        assert_eq!(
            outcome,
            FoldOutcome::Merged {
                fragment: "bar".to_string()
            }
        );
        assert_eq!(log.len(), 2);
        let tail = log.last().unwrap();
        assert_eq!(tail.content, "foobar");
        assert_eq!(tail.part(), Some(&json!(2)));
    }

    #[test]
    fn test_merge_replaces_props_wholesale() {
        let mut log = MessageLog::new();
        log.push(
            ChatMessage::assistant(Action::StreamChat, "a")
                .with_props(props(json!({"part": 1, "entity_id": "e-1"}))),
        );

        log.fold(fragment("b", 2));

        let tail_props = log.last().unwrap().props.as_ref().unwrap();
        assert_eq!(tail_props.len(), 1);
        assert!(tail_props.get("entity_id").is_none());
    }

    #[test]
    fn test_merge_many_fragments_in_order() {
        let mut log = MessageLog::new();
        for (i, word) in ["The ", "trend ", "is ", "flat."].iter().enumerate() {
            log.fold(fragment(word, i as i64));
        }
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().unwrap().content, "The trend is flat.");
    }

    #[test]
    fn test_merge_interleaved_duplicates() {
        let mut log = MessageLog::new();
        log.fold(fragment("a", 1));
        log.fold(fragment("a", 1));
        log.fold(fragment("b", 2));
        log.fold(fragment("b", 2));
        log.fold(fragment("c", 3));
        assert_eq!(log.last().unwrap().content, "abc");
    }

    #[test]
    fn test_merge_without_parts_on_either_side_is_duplicate() {
        let mut log = MessageLog::new();
        log.push(ChatMessage::assistant(Action::StreamChat, "a"));

        let outcome = log.fold(ChatMessage::assistant(Action::StreamChat, "b"));

        assert_eq!(outcome, FoldOutcome::Duplicate);
        assert_eq!(log.last().unwrap().content, "a");
    }

    #[test]
    fn test_non_stream_reply_merges_onto_stream_tail() {
        let mut log = streaming_log();

        let outcome = log.fold(ChatMessage::assistant(Action::Chat, "done"));

        assert_eq!(
            outcome,
            FoldOutcome::Merged {
                fragment: "done".to_string()
            }
        );
        assert_eq!(log.len(), 2);
        let tail = log.last().unwrap();
        assert_eq!(tail.content, "foodone");
        assert_eq!(tail.action, Action::StreamChat);
        assert!(tail.part().is_none());
    }

    #[test]
    fn test_unnumbered_fragment_merges_onto_numbered_tail() {
        let mut log = streaming_log();

        let outcome = log.fold(ChatMessage::assistant(Action::StreamChat, "!"));

        assert!(matches!(outcome, FoldOutcome::Merged { .. }));
        assert_eq!(log.len(), 2);
        assert_eq!(log.last().unwrap().content, "foo!");
    }

    #[test]
    fn test_user_stream_tail_does_not_merge() {
        let mut log = MessageLog::new();
        log.push(ChatMessage::user(Action::StreamChat, "q"));

        let outcome = log.fold(fragment("a", 0));

        assert_eq!(
            outcome,
            FoldOutcome::Appended {
                cleared_loading: false
            }
        );
        assert_eq!(log.len(), 2);
    }

    // =========================================================================
    // Append and clear loading
    // =========================================================================

    #[test]
    fn test_loading_placeholder_is_replaced() {
        let user = ChatMessage::user(Action::Chat, "forecast Q3");
        let reply = ChatMessage::assistant(Action::Chat, "Q3 looks strong");
        let mut log = MessageLog::new();
        log.push(user.clone());
        log.push(ChatMessage::loading());

        let outcome = log.fold(reply.clone());

        assert_eq!(
            outcome,
            FoldOutcome::Appended {
                cleared_loading: true
            }
        );
        assert_eq!(log.as_slice(), &[user, reply]);
        assert!(!log.has_loading());
    }

    #[test]
    fn test_first_stream_fragment_replaces_loading() {
        let mut log = MessageLog::new();
        log.push(ChatMessage::user(Action::StreamChat, "q"));
        log.push(ChatMessage::loading());

        log.fold(fragment("a", 0));
        log.fold(fragment("b", 1));

        assert_eq!(log.len(), 2);
        assert_eq!(log.last().unwrap().content, "ab");
        assert_eq!(log.last().unwrap().role, Role::Assistant);
    }

    #[test]
    fn test_append_keeps_non_trailing_messages() {
        let mut log = MessageLog::new();
        log.push(ChatMessage::assistant(Action::Chat, "one"));

        log.fold(ChatMessage::assistant(Action::Chat, "two"));

        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_fold_order_is_arrival_order() {
        let e1 = ChatMessage::assistant(Action::Chat, "first");
        let e2 = ChatMessage::assistant(Action::Chat, "second")
            .with_additional_type(crate::chat::AdditionalType::Metric);
        let mut log = MessageLog::new();
        log.push(ChatMessage::user(Action::Chat, "q"));

        log.fold(e1.clone());
        log.fold(e2.clone());

        assert_eq!(&log.as_slice()[1..], &[e1, e2]);
    }

    #[test]
    fn test_clear_loading_only_touches_tail() {
        let mut log = MessageLog::new();
        assert!(!log.clear_loading());
        log.push(ChatMessage::user(Action::Chat, "q"));
        assert!(!log.clear_loading());
        assert_eq!(log.len(), 1);
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    #[test]
    fn test_snapshot_is_unaffected_by_later_folds() {
        let mut log = streaming_log();
        let snapshot = log.snapshot();

        log.fold(fragment("bar", 2));
        log.push(ChatMessage::user(Action::Chat, "and now?"));
        log.fold(ChatMessage::assistant(Action::Chat, "done"));

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].content, "foo");
        assert_eq!(log.get(1).unwrap().content, "foobar");
        assert_eq!(log.len(), 4);
        assert_eq!(log.last().unwrap().content, "done");
    }
}
