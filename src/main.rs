//! copilot - terminal client for the dashboard copilot.

use std::path::PathBuf;

use clap::Parser;
use copilot_chat::cli::{self, parse_context_arg};
use copilot_chat::config::{ChatConfig, ChatView, ConfigOverrides, XdgDirs};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Chat with the dashboard copilot from your terminal.
#[derive(Parser, Debug)]
#[command(name = "copilot")]
#[command(version, about, long_about = None)]
struct Args {
    /// Config file (default: $XDG_CONFIG_HOME/copilot-chat/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend host, e.g. wss://dashboard.example.com
    #[arg(long, env = "COPILOT_BACKEND_HOST")]
    host: Option<String>,

    /// Which copilot to talk to
    #[arg(long, value_enum, env = "COPILOT_VIEW")]
    view: Option<ChatView>,

    /// User id sent in the handshake
    #[arg(short, long, env = "COPILOT_USER")]
    user: Option<String>,

    /// Send a single prompt, print the reply and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Load DATASET:ENTITY into the conversation before chatting
    #[arg(long, value_name = "DATASET:ENTITY", value_parser = parse_context_arg)]
    context: Option<(String, String)>,

    /// Ask for single replies instead of streamed ones
    #[arg(long)]
    no_stream: bool,

    /// Seconds of silence that end a single prompt run
    #[arg(long, value_name = "SECS")]
    idle_timeout: Option<u64>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Write the effective configuration to the config file and exit
    #[arg(long, conflicts_with = "print_config")]
    save_config: bool,

    /// Enable debug logging (equivalent to RUST_LOG=debug)
    #[arg(short = 'd', long)]
    debug: bool,

    /// Enable verbose logging (equivalent to RUST_LOG=trace)
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            backend_host: self.host.clone(),
            view: self.view,
            user_id: self.user.clone(),
            stream: self.no_stream.then_some(false),
            idle_timeout_secs: self.idle_timeout,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    // a file that does not exist yet is fine when we are about to write it
    let mut config = match args.config.as_deref() {
        Some(path) if args.save_config && !path.exists() => ChatConfig::default(),
        path => ChatConfig::load(path)?,
    };
    config.apply(args.overrides());

    if args.save_config {
        config.ws_url()?;
        let path = args
            .config
            .clone()
            .unwrap_or_else(|| XdgDirs::new().config_file());
        config.save_to_path(&path)?;
        println!("Saved config to {}", path.display());
        return Ok(());
    }

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        println!("ws_url: {}", config.ws_url()?);
        return Ok(());
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        match args.prompt.as_deref() {
            Some(prompt) => cli::run_single_prompt(&config, prompt, args.context.clone()).await,
            None => cli::run_interactive(&config, args.context.clone()).await,
        }
    })
}

fn init_tracing(args: &Args) {
    let default_filter = if args.verbose {
        "trace"
    } else if args.debug {
        "debug"
    } else {
        "warn" // Quiet by default for normal use
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if args.debug || args.verbose {
        tracing::info!("Debug logging enabled");
    }
}
