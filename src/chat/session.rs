//! Chat session state container.
//!
//! A [`ChatSession`] owns the message log, the composer buffer and the
//! outbound transport of one conversation. Views hold the session (or a
//! [`LogReceiver`] from [`ChatSession::subscribe`]) explicitly; nothing is
//! looked up globally.
//!
//! Every mutation goes through `&mut self`, so whoever drives the session
//! (the REPL event loop, a test) serializes user input and inbound frames.

use tracing::{debug, warn};

use super::dispatch::{build_request, DispatchError};
use super::log::{FoldOutcome, LogSnapshot, MessageLog};
use super::message::{Action, ChatMessage, Props};
use crate::messaging::{InboundEnvelope, LogBus, LogChange, LogReceiver, OutboundEnvelope};
use crate::transport::Transport;

pub struct ChatSession<T: Transport> {
    log: MessageLog,
    input: String,
    transport: T,
    bus: LogBus,
}

impl<T: Transport> ChatSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            log: MessageLog::new(),
            input: String::new(),
            transport,
            bus: LogBus::new(),
        }
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn snapshot(&self) -> LogSnapshot {
        self.log.snapshot()
    }

    /// Receive a [`LogEvent`](crate::messaging::LogEvent) after every change.
    pub fn subscribe(&self) -> LogReceiver {
        self.bus.subscribe()
    }

    /// Current composer text.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Whether the composer holds anything worth sending.
    pub fn can_send(&self) -> bool {
        !self.input.is_empty()
    }

    /// Send the composer contents (or a context load) to the backend.
    ///
    /// On success the user message and a loading placeholder are appended and
    /// the composer is cleared. A transport failure is logged and otherwise
    /// ignored. Invalid arguments leave the session untouched.
    pub fn send(&mut self, action: Action, props: Option<&Props>) -> Result<(), DispatchError> {
        let request = build_request(action, props, &self.input)?;
        let frame = OutboundEnvelope::new(self.log.iter(), request.clone()).to_frame()?;

        if let Err(e) = self.transport.send_text(frame) {
            warn!(error = %e, ?action, "Request not delivered");
        }
        self.input.clear();

        let cleared_loading = self.log.clear_loading();
        self.log.push(request);
        let user_index = self.log.len() - 1;
        self.log.push(ChatMessage::loading());

        self.bus.sender().publish(
            LogChange::Dispatched {
                user_index,
                loading_index: user_index + 1,
                cleared_loading,
            },
            self.log.snapshot(),
        );
        Ok(())
    }

    /// Replace the composer with `text` and send it.
    pub fn submit(&mut self, action: Action, text: impl Into<String>) -> Result<(), DispatchError> {
        self.set_input(text);
        self.send(action, None)
    }

    /// Ask subscribers to print the whole log.
    pub fn publish_transcript(&self) {
        self.bus
            .sender()
            .publish(LogChange::Transcript, self.log.snapshot());
    }

    /// Fold a raw text frame. Returns `None` when the frame was ignored.
    pub fn receive_frame(&mut self, frame: &str) -> Option<FoldOutcome> {
        let envelope = InboundEnvelope::decode(frame)?;
        Some(self.receive(envelope.response))
    }

    /// Fold a decoded response into the log and notify subscribers.
    pub fn receive(&mut self, response: ChatMessage) -> FoldOutcome {
        let outcome = self.log.fold(response);
        let index = self.log.len().saturating_sub(1);

        let change = match &outcome {
            FoldOutcome::Seeded => LogChange::Seeded { index },
            FoldOutcome::Merged { fragment } => LogChange::Merged {
                index,
                fragment: fragment.clone(),
            },
            FoldOutcome::Appended { cleared_loading } => LogChange::Appended {
                index,
                cleared_loading: *cleared_loading,
            },
            FoldOutcome::Duplicate => {
                debug!(index, "Duplicate fragment suppressed");
                return outcome;
            }
        };

        self.bus.sender().publish(change, self.log.snapshot());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::dispatch::context_props;
    use crate::chat::Role;
    use crate::transport::testing::RecordingTransport;
    use serde_json::{json, Value};

    fn session() -> (ChatSession<RecordingTransport>, RecordingTransport) {
        let transport = RecordingTransport::open();
        (ChatSession::new(transport.clone()), transport)
    }

    fn frame(value: Value) -> String {
        json!({ "response": value }).to_string()
    }

    #[test]
    fn test_send_chat_appends_user_and_loading() {
        let (mut session, transport) = session();
        session.set_input("forecast next quarter");
        assert!(session.can_send());

        session.send(Action::Chat, None).unwrap();

        let log = session.log();
        assert_eq!(log.len(), 2);
        assert_eq!(log.get(0).unwrap().role, Role::User);
        assert_eq!(log.get(0).unwrap().content, "forecast next quarter");
        assert!(log.get(1).unwrap().is_loading());
        assert_eq!(session.input(), "");
        assert!(!session.can_send());

        let frames = transport.frames();
        assert_eq!(frames.len(), 1);
        let sent: Value = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(sent["message_history"], json!([]));
        assert_eq!(sent["request"]["content"], "forecast next quarter");
        assert_eq!(sent["request"]["action"], "chat");
        assert!(sent["request"]["props"].is_null());
    }

    #[test]
    fn test_history_contains_prior_entries() {
        let (mut session, transport) = session();
        session.submit(Action::Chat, "q1").unwrap();
        session.receive_frame(&frame(json!({
            "role": "assistant", "action": "chat", "content": "a1"
        })));

        session.submit(Action::StreamChat, "q2").unwrap();

        let sent: Value = serde_json::from_str(&transport.frames()[1]).unwrap();
        assert_eq!(
            sent["message_history"],
            json!([
                {"role": "user", "content": "q1"},
                {"role": "assistant", "content": "a1"}
            ])
        );
    }

    #[test]
    fn test_load_context_without_props_changes_nothing() {
        let (mut session, transport) = session();
        session.set_input("draft");

        let result = session.send(Action::LoadContext, None);

        assert!(matches!(result, Err(DispatchError::InvalidArgument(_))));
        assert!(session.log().is_empty());
        assert!(transport.frames().is_empty());
        assert_eq!(session.input(), "draft");
    }

    #[test]
    fn test_load_context_with_props() {
        let (mut session, transport) = session();
        let props = context_props("sales", "store-9");

        session.send(Action::LoadContext, Some(&props)).unwrap();

        let sent: Value = serde_json::from_str(&transport.frames()[0]).unwrap();
        assert_eq!(sent["request"]["additional_type"], "trend");
        assert_eq!(sent["request"]["props"]["entity_id"], "store-9");
        assert_eq!(session.log().len(), 2);
    }

    #[test]
    fn test_send_on_closed_transport_is_silent() {
        let transport = RecordingTransport::closed();
        let mut session = ChatSession::new(transport.clone());

        session.submit(Action::Chat, "hello?").unwrap();

        assert!(transport.frames().is_empty());
        assert_eq!(session.log().len(), 2);
    }

    #[test]
    fn test_second_send_replays_pending_placeholder() {
        let (mut session, transport) = session();
        session.submit(Action::Chat, "one").unwrap();
        session.submit(Action::Chat, "two").unwrap();

        let sent: Value = serde_json::from_str(&transport.frames()[1]).unwrap();
        assert_eq!(
            sent["message_history"],
            json!([
                {"role": "user", "content": "one"},
                {"role": "assistant", "content": ""}
            ])
        );
    }

    #[test]
    fn test_second_send_keeps_single_trailing_loading() {
        let (mut session, _transport) = session();
        session.submit(Action::Chat, "one").unwrap();
        session.submit(Action::Chat, "two").unwrap();

        let loading: Vec<_> = session.log().iter().filter(|m| m.is_loading()).collect();
        assert_eq!(loading.len(), 1);
        assert!(session.log().last().unwrap().is_loading());
        assert_eq!(session.log().len(), 3);
    }

    #[test]
    fn test_stream_reply_replaces_loading_and_merges() {
        let (mut session, _transport) = session();
        session.submit(Action::StreamChat, "why the dip?").unwrap();

        for (part, text) in [(0, "Holiday "), (1, "seasonality"), (1, "seasonality")] {
            session.receive_frame(&frame(json!({
                "role": "assistant",
                "action": "stream_chat",
                "props": {"part": part},
                "content": text
            })));
        }

        let log = session.log();
        assert_eq!(log.len(), 2);
        assert_eq!(log.last().unwrap().content, "Holiday seasonality");
        assert!(!log.has_loading());
    }

    #[test]
    fn test_unrecognized_frames_are_ignored() {
        let (mut session, _transport) = session();
        let mut receiver = session.subscribe();

        assert!(session.receive_frame(r#"{"status": "ok"}"#).is_none());
        assert!(session.receive_frame("garbage").is_none());

        assert!(session.log().is_empty());
        assert!(receiver.try_recv().unwrap().is_none());
    }

    #[test]
    fn test_subscribers_see_every_change() {
        let (mut session, _transport) = session();
        let mut receiver = session.subscribe();

        session.submit(Action::StreamChat, "q").unwrap();
        let fragment = |part: i64, text: &str| {
            frame(json!({
                "role": "assistant", "action": "stream_chat",
                "props": {"part": part}, "content": text
            }))
        };
        session.receive_frame(&fragment(1, "a"));
        session.receive_frame(&fragment(1, "a"));
        session.receive_frame(&fragment(2, "b"));

        let dispatched = receiver.try_recv().unwrap().unwrap();
        assert_eq!(
            dispatched.change,
            LogChange::Dispatched {
                user_index: 0,
                loading_index: 1,
                cleared_loading: false
            }
        );
        assert_eq!(dispatched.snapshot.len(), 2);

        let appended = receiver.try_recv().unwrap().unwrap();
        assert_eq!(
            appended.change,
            LogChange::Appended {
                index: 1,
                cleared_loading: true
            }
        );

        let merged = receiver.try_recv().unwrap().unwrap();
        assert_eq!(
            merged.change,
            LogChange::Merged {
                index: 1,
                fragment: "b".into()
            }
        );
        assert_eq!(merged.snapshot[1].content, "ab");
        assert!(receiver.try_recv().unwrap().is_none());
    }

    #[test]
    fn test_seed_publishes_seeded() {
        let (mut session, _transport) = session();
        let mut receiver = session.subscribe();

        let outcome = session.receive(ChatMessage::assistant(Action::Chat, "welcome"));

        assert_eq!(outcome, FoldOutcome::Seeded);
        assert_eq!(
            receiver.try_recv().unwrap().unwrap().change,
            LogChange::Seeded { index: 0 }
        );
    }

    #[tokio::test]
    async fn test_ordering_across_tasks() {
        let (mut session, _transport) = session();
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);

        let producer = tokio::spawn(async move {
            for text in ["e1", "e2"] {
                tx.send(frame(json!({
                    "role": "assistant", "action": "chat", "content": text
                })))
                .await
                .unwrap();
                tokio::task::yield_now().await;
            }
        });

        while let Some(text) = rx.recv().await {
            session.receive_frame(&text);
        }
        producer.await.unwrap();

        let contents: Vec<_> = session.log().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["e1", "e2"]);
    }
}
