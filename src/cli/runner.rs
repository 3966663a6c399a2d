//! CLI runner for interactive and single-prompt modes.

use std::io::{BufRead, BufReader};
use std::time::Duration;

use anyhow::{bail, Context};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::commands::{parse_command, Command, HELP_TEXT};
use crate::chat::{context_props, Action, ChatSession};
use crate::config::ChatConfig;
use crate::messaging::{Handshake, LogReceiver, TerminalRenderer};
use crate::transport::{self, Transport, TransportEvent, WsChannel};

type Events = mpsc::Receiver<TransportEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Run a single prompt and exit.
///
/// With `context`, the entity is loaded and its reply settled before the
/// prompt is sent.
pub async fn run_single_prompt(
    config: &ChatConfig,
    prompt: &str,
    context: Option<(String, String)>,
) -> anyhow::Result<()> {
    if prompt.trim().is_empty() {
        bail!("Prompt is empty");
    }

    let url = config.ws_url()?;
    let (mut session, mut events) = open_session(&url, config).await?;
    let renderer = spawn_renderer(session.subscribe());
    let idle = config.idle_timeout();

    let mut open = true;
    if let Some((dataset_id, entity_id)) = context {
        let props = context_props(dataset_id, entity_id);
        session.send(Action::LoadContext, Some(&props))?;
        open = settle(&mut session, &mut events, idle).await;
    }
    if open {
        session.submit(config.default_action(), prompt)?;
        settle(&mut session, &mut events, idle).await;
    }

    drop(session);
    renderer.await.context("Renderer task failed")?;
    Ok(())
}

/// Run in interactive mode.
pub async fn run_interactive(
    config: &ChatConfig,
    context: Option<(String, String)>,
) -> anyhow::Result<()> {
    let url = config.ws_url()?;
    let (mut session, mut events) = open_session(&url, config).await?;
    let renderer = spawn_renderer(session.subscribe());

    print_banner(&url);
    if let Some((dataset_id, entity_id)) = context {
        session.send(Action::LoadContext, Some(&context_props(dataset_id, entity_id)))?;
    }
    let mut lines = spawn_stdin_reader();

    loop {
        tokio::select! {
            line = lines.recv() => match line {
                Some(line) => {
                    if handle_line(&mut session, &line, config) == Flow::Quit {
                        break;
                    }
                }
                None => {
                    // stdin closed; let an outstanding reply finish
                    settle(&mut session, &mut events, config.idle_timeout()).await;
                    break;
                }
            },
            event = events.recv() => match event {
                Some(TransportEvent::Frame(text)) => {
                    session.receive_frame(&text);
                }
                Some(TransportEvent::Closed { reason }) => {
                    report_closed(reason);
                    break;
                }
                None => break,
            },
        }
    }

    drop(session);
    renderer.await.context("Renderer task failed")?;
    Ok(())
}

/// Print the welcome banner.
pub fn print_banner(url: &str) {
    println!();
    println!(
        "  \x1b[1;36mcopilot\x1b[0m  \x1b[2mv{}\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    println!("  \x1b[2mConnected to {}\x1b[0m", url);
    println!("  \x1b[2mType \x1b[0m\x1b[1;36m/help\x1b[0m\x1b[2m for commands, or ask a question.\x1b[0m");
    println!();
}

async fn open_session(
    url: &str,
    config: &ChatConfig,
) -> anyhow::Result<(ChatSession<WsChannel>, Events)> {
    let handshake = Handshake::new(config.user_id.clone());
    let (channel, events) = transport::connect(url, &handshake).await?;
    Ok((ChatSession::new(channel), events))
}

fn spawn_renderer(receiver: LogReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        TerminalRenderer::new().run_loop(receiver).await;
    })
}

/// Forward stdin lines from a blocking thread.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let reader = BufReader::new(stdin.lock());
        for line in reader.lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Apply one line of REPL input to the session.
fn handle_line<T: Transport>(session: &mut ChatSession<T>, line: &str, config: &ChatConfig) -> Flow {
    match parse_command(line, config.default_action()) {
        Command::Empty => {}
        Command::Send { action, text } => {
            session.set_input(text);
            if session.can_send() {
                if let Err(e) = session.send(action, None) {
                    eprintln!("Error: {}", e);
                }
            }
        }
        Command::LoadContext {
            dataset_id,
            entity_id,
        } => {
            let props = context_props(dataset_id, entity_id);
            if let Err(e) = session.send(Action::LoadContext, Some(&props)) {
                eprintln!("Error: {}", e);
            }
        }
        Command::History => session.publish_transcript(),
        Command::Help => println!("{}", HELP_TEXT),
        Command::Quit => return Flow::Quit,
        Command::Invalid(hint) => eprintln!("{}", hint),
    }
    Flow::Continue
}

/// Fold frames until no reply is pending and the socket has been quiet for
/// `idle`. Returns `false` once the connection is gone.
async fn settle<T: Transport>(
    session: &mut ChatSession<T>,
    events: &mut Events,
    idle: Duration,
) -> bool {
    loop {
        let next = if session.log().has_loading() {
            events.recv().await
        } else {
            match tokio::time::timeout(idle, events.recv()).await {
                Ok(event) => event,
                Err(_) => {
                    debug!(?idle, "Reply settled");
                    return true;
                }
            }
        };

        match next {
            Some(TransportEvent::Frame(text)) => {
                session.receive_frame(&text);
            }
            Some(TransportEvent::Closed { reason }) => {
                report_closed(reason);
                return false;
            }
            None => return false,
        }
    }
}

fn report_closed(reason: Option<String>) {
    match reason.filter(|r| !r.is_empty()) {
        Some(reason) => eprintln!("Connection closed: {}", reason),
        None => eprintln!("Connection closed"),
    }
}
