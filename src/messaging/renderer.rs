//! Terminal renderer for the chat log.

use std::io::{self, Stdout, Write};

use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use tracing::warn;

use super::{BusError, LogChange, LogEvent, LogReceiver};
use crate::chat::{ChatMessage, Role};

const USER_COLOR: Color = Color::Green;
const ASSISTANT_COLOR: Color = Color::Cyan;
const HINT_COLOR: Color = Color::DarkGrey;

/// A streaming reply still being printed on the current line.
#[derive(Debug, Clone, Copy)]
struct OpenStream {
    index: usize,
    /// Bytes of the message content already on screen.
    printed: usize,
}

/// Renders log events as they happen.
///
/// A streaming reply is left open on its line so merged fragments continue
/// it; the loading line is erased when the first reply replaces it.
///
/// Stream text is printed from each event's snapshot rather than from the
/// fragment alone, so fragments lost when the bus lags are still shown.
pub struct TerminalRenderer<W: Write = Stdout> {
    out: W,
    open_stream: Option<OpenStream>,
    loading_shown: bool,
    lagged: bool,
}

impl TerminalRenderer<Stdout> {
    /// Create a renderer on stdout.
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for TerminalRenderer<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            out,
            open_stream: None,
            loading_shown: false,
            lagged: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Render one log event.
    pub fn handle(&mut self, event: &LogEvent) -> io::Result<()> {
        self.sync_stream(&event.snapshot)?;

        match &event.change {
            LogChange::Dispatched {
                cleared_loading, ..
            } => {
                if *cleared_loading {
                    self.erase_loading()?;
                }
                self.close_stream()?;
                self.show_loading()?;
            }
            LogChange::Seeded { index } => {
                self.render_new(&event.snapshot, *index)?;
            }
            LogChange::Appended {
                index,
                cleared_loading,
            } => {
                if *cleared_loading {
                    self.erase_loading()?;
                }
                self.render_new(&event.snapshot, *index)?;
            }
            LogChange::Merged { index, fragment } => {
                if self.open_stream.map(|open| open.index) != Some(*index) {
                    self.close_stream()?;
                    self.header(Role::Assistant)?;
                    let content = event
                        .snapshot
                        .get(*index)
                        .map(|m| m.content.as_str())
                        .unwrap_or_default();
                    // after a lag the start of this reply was never shown
                    let text = if self.lagged { content } else { fragment.as_str() };
                    queue!(self.out, Print(text))?;
                    self.open_stream = Some(OpenStream {
                        index: *index,
                        printed: content.len(),
                    });
                }
            }
            LogChange::Transcript => {
                let pending = self.loading_shown;
                self.erase_loading()?;
                self.render_transcript(&event.snapshot)?;
                if pending {
                    self.show_loading()?;
                }
            }
        }
        self.lagged = false;
        self.out.flush()
    }

    /// Print a whole log, one message per block.
    pub fn render_transcript(&mut self, messages: &[ChatMessage]) -> io::Result<()> {
        self.close_stream()?;
        for message in messages.iter().filter(|m| !m.is_loading()) {
            self.header(message.role)?;
            queue!(self.out, Print(&message.content), Print("\n"))?;
            self.render_hint(message)?;
        }
        self.out.flush()
    }

    /// Drive the renderer from a bus until it closes.
    pub async fn run_loop(&mut self, mut receiver: LogReceiver) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.handle(&event) {
                        warn!(error = %e, "Failed to render log event");
                    }
                }
                Err(BusError::Lagged(n)) => {
                    warn!(skipped = n, "Renderer fell behind, resyncing from next snapshot");
                    self.lagged = true;
                }
                Err(BusError::Closed) => break,
            }
        }
        let _ = self.close_stream();
        let _ = self.out.flush();
    }

    fn render_new(&mut self, snapshot: &[ChatMessage], index: usize) -> io::Result<()> {
        self.close_stream()?;
        let Some(message) = snapshot.get(index) else {
            return Ok(());
        };

        if message.is_loading() {
            return self.show_loading();
        }

        self.header(message.role)?;
        queue!(self.out, Print(&message.content))?;
        if message.is_streaming_reply() {
            self.open_stream = Some(OpenStream {
                index,
                printed: message.content.len(),
            });
        } else {
            queue!(self.out, Print("\n"))?;
            self.render_hint(message)?;
        }
        Ok(())
    }

    fn header(&mut self, role: Role) -> io::Result<()> {
        let (color, label) = match role {
            Role::User => (USER_COLOR, "you"),
            Role::Assistant => (ASSISTANT_COLOR, "copilot"),
        };
        queue!(
            self.out,
            SetForegroundColor(color),
            SetAttribute(Attribute::Bold),
            Print(label),
            Print(" › "),
            SetAttribute(Attribute::Reset),
            ResetColor
        )
    }

    /// Tag line for chart/metric/trend payloads.
    fn render_hint(&mut self, message: &ChatMessage) -> io::Result<()> {
        let Some(kind) = message.additional_type else {
            return Ok(());
        };
        let props = message
            .props
            .as_ref()
            .and_then(|p| serde_json::to_string(p).ok())
            .unwrap_or_default();
        queue!(
            self.out,
            SetForegroundColor(HINT_COLOR),
            Print(format!("  [{}] {}\n", kind.as_str(), props)),
            ResetColor
        )
    }

    fn show_loading(&mut self) -> io::Result<()> {
        queue!(
            self.out,
            SetForegroundColor(HINT_COLOR),
            Print("⋯ thinking"),
            ResetColor
        )?;
        self.loading_shown = true;
        Ok(())
    }

    fn erase_loading(&mut self) -> io::Result<()> {
        if self.loading_shown {
            queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
            self.loading_shown = false;
        }
        Ok(())
    }

    /// Print whatever the open stream gained since it was last shown.
    fn sync_stream(&mut self, snapshot: &[ChatMessage]) -> io::Result<()> {
        let Some(open) = self.open_stream.as_mut() else {
            return Ok(());
        };
        let Some(rest) = snapshot
            .get(open.index)
            .and_then(|m| m.content.get(open.printed..))
        else {
            return Ok(());
        };
        if !rest.is_empty() {
            open.printed += rest.len();
            queue!(self.out, Print(rest))?;
        }
        Ok(())
    }

    fn close_stream(&mut self) -> io::Result<()> {
        if self.open_stream.take().is_some() {
            queue!(self.out, Print("\n"))?;
        }
        Ok(())
    }
}
