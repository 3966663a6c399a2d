//! WebSocket transport built on `tokio-tungstenite`.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use super::{ReadyState, Transport, TransportError, TransportEvent};
use crate::messaging::Handshake;

/// Inbound events buffered before the reader waits on the session.
const EVENT_BUFFER: usize = 256;

/// Outbound half of an open WebSocket.
///
/// Frames are queued to a writer task; dropping the channel closes the socket.
pub struct WsChannel {
    tx: mpsc::UnboundedSender<String>,
    state: Arc<AtomicU8>,
}

impl Transport for WsChannel {
    fn ready_state(&self) -> ReadyState {
        ReadyState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn send_text(&self, text: String) -> Result<(), TransportError> {
        let state = self.ready_state();
        if matches!(state, ReadyState::Closing | ReadyState::Closed) {
            debug!(?state, "Dropping frame for a socket that is not open");
            return Err(TransportError::Closed);
        }
        self.tx.send(text).map_err(|_| TransportError::Closed)
    }
}

/// Open a WebSocket to `url` and send the handshake frame.
///
/// Returns the outbound channel and a receiver of inbound events. The
/// receiver ends with a single [`TransportEvent::Closed`].
pub async fn connect(
    url: &str,
    handshake: &Handshake,
) -> Result<(WsChannel, mpsc::Receiver<TransportEvent>), TransportError> {
    let state = Arc::new(AtomicU8::new(ReadyState::Connecting as u8));
    let connect_error = |message: String| TransportError::Connect {
        url: url.to_string(),
        message,
    };

    let (stream, _response) = connect_async(url)
        .await
        .map_err(|e| connect_error(e.to_string()))?;
    let (mut sink, mut source) = stream.split();

    let hello = serde_json::to_string(handshake)?;
    sink.send(Message::Text(hello))
        .await
        .map_err(|e| connect_error(e.to_string()))?;
    state.store(ReadyState::Open as u8, Ordering::Release);
    info!(url, user = %handshake.user_id, "Connected to copilot");

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

    let writer_state = Arc::clone(&state);
    tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if let Err(e) = sink.send(Message::Text(text)).await {
                warn!(error = %e, "Failed to write frame");
                break;
            }
        }
        let _ = writer_state.compare_exchange(
            ReadyState::Open as u8,
            ReadyState::Closing as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        let _ = sink.close().await;
    });

    let reader_state = Arc::clone(&state);
    tokio::spawn(async move {
        let reason = loop {
            match source.next().await {
                Some(Ok(Message::Text(text))) => {
                    if event_tx.send(TransportEvent::Frame(text)).await.is_err() {
                        break None;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    break frame.map(|f| f.reason.to_string());
                }
                Some(Ok(other)) => {
                    debug!(kind = ?other, "Ignoring non-text frame");
                }
                Some(Err(e)) => break Some(e.to_string()),
                None => break None,
            }
        };
        reader_state.store(ReadyState::Closed as u8, Ordering::Release);
        info!(reason = ?reason, "Copilot connection closed");
        let _ = event_tx.send(TransportEvent::Closed { reason }).await;
    });

    Ok((WsChannel { tx: out_tx, state }, event_rx))
}
