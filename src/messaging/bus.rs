//! Broadcast bus for log change notifications.

use tokio::sync::broadcast;

use crate::chat::LogSnapshot;

/// What a session did to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogChange {
    /// First message of an empty log.
    Seeded { index: usize },
    /// A stream fragment was appended to the message at `index`.
    Merged { index: usize, fragment: String },
    /// A new tail was appended, possibly replacing a loading placeholder.
    Appended { index: usize, cleared_loading: bool },
    /// A user request was sent and followed by a loading placeholder.
    Dispatched {
        user_index: usize,
        loading_index: usize,
        cleared_loading: bool,
    },
    /// Nothing changed; views should show the whole log.
    Transcript,
}

/// A change plus the log as it stood right after it.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub change: LogChange,
    pub snapshot: LogSnapshot,
}

/// Sender half of the log bus.
#[derive(Clone)]
pub struct LogSender {
    tx: broadcast::Sender<LogEvent>,
}

impl LogSender {
    /// Publish an event.
    pub fn send(&self, event: LogEvent) -> Result<(), BusError> {
        self.tx.send(event).map_err(|_| BusError::Closed)?;
        Ok(())
    }

    /// Publish an event, ignoring the no-subscriber case.
    pub fn publish(&self, change: LogChange, snapshot: LogSnapshot) {
        let _ = self.send(LogEvent { change, snapshot });
    }
}

/// Receiver half of the log bus.
pub struct LogReceiver {
    rx: broadcast::Receiver<LogEvent>,
}

impl LogReceiver {
    /// Receive the next event.
    pub async fn recv(&mut self) -> Result<LogEvent, BusError> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => BusError::Closed,
            broadcast::error::RecvError::Lagged(n) => BusError::Lagged(n),
        })
    }

    /// Try to receive an event without waiting.
    pub fn try_recv(&mut self) -> Result<Option<LogEvent>, BusError> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(BusError::Closed),
            Err(broadcast::error::TryRecvError::Lagged(n)) => Err(BusError::Lagged(n)),
        }
    }
}

/// Bus for session-to-view notifications.
pub struct LogBus {
    tx: broadcast::Sender<LogEvent>,
}

impl LogBus {
    /// Create a new bus.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Get a sender.
    pub fn sender(&self) -> LogSender {
        LogSender {
            tx: self.tx.clone(),
        }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> LogReceiver {
        LogReceiver {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for LogBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Bus errors.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Channel closed")]
    Closed,
    #[error("Lagged behind by {0} events")]
    Lagged(u64),
}
