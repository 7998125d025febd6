mod chat;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use tandem_core::utils::DEFAULT_APP;
use tandem_core::{IceServerConfig, ShareLink};
use tandem_peer::{
    ConnectionCoordinator, CoordinatorConfig, DEFAULT_FETCH_ATTEMPTS, DEFAULT_SHARE_BASE,
    EngineConfig, RtcEngineFactory, SessionConfig, SignalingError, SignalingSession,
};
use tandem_relay::server::{self, RelayStore};
use tandem_relay::{DEFAULT_PROXY_PREFIX, DEFAULT_RELAY_URL, RelayClient, RelayConfig, SessionCache};

#[derive(Parser)]
#[command(name = "tandem")]
#[command(about = "Peer-to-peer chat, signalled through a public key-value relay")]
struct Cli {
    #[command(flatten)]
    opts: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct GlobalOpts {
    /// Base URL of the relay.
    #[arg(long, global = true, env = "TANDEM_RELAY_URL", default_value = DEFAULT_RELAY_URL)]
    relay: String,

    /// Prefix for retrying unreachable relay requests through a proxy.
    #[arg(long, global = true, env = "TANDEM_PROXY", default_value = DEFAULT_PROXY_PREFIX)]
    proxy: String,

    #[arg(long, global = true)]
    no_proxy: bool,

    /// Namespace for relay topics. Both sides must agree.
    #[arg(long, global = true, env = "TANDEM_APP", default_value = DEFAULT_APP)]
    app: String,

    /// Page the printed share link points at.
    #[arg(long, global = true, env = "TANDEM_SHARE_BASE", default_value = DEFAULT_SHARE_BASE)]
    share_base: String,

    /// STUN server URL; repeat for more. Defaults to public servers.
    #[arg(long, global = true, env = "TANDEM_STUN", value_delimiter = ',')]
    stun: Vec<String>,

    /// Relay fetch attempts per handshake step.
    #[arg(long, global = true, default_value_t = DEFAULT_FETCH_ATTEMPTS)]
    attempts: u32,

    /// Delay between relay fetch attempts.
    #[arg(long, global = true, default_value_t = 2000)]
    delay_ms: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session and wait for someone to join.
    Offer,

    /// Join a session by code or link.
    Answer {
        /// Session code or share link; prompted for when omitted.
        code: Option<String>,
    },

    /// Serve a relay on this machine.
    Relay {
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Offer => run_offer(&cli.opts).await,
        Commands::Answer { code } => run_answer(&cli.opts, code).await,
        Commands::Relay { listen } => run_relay(&listen).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_session(opts: &GlobalOpts) -> Result<SignalingSession> {
    let relay_config = RelayConfig::new(&opts.relay);
    let relay_config = if opts.no_proxy {
        relay_config.without_proxy()
    } else {
        relay_config.with_proxy(&opts.proxy)
    };
    let relay = RelayClient::new(relay_config).context("Failed to build relay client")?;

    let engine = if opts.stun.is_empty() {
        EngineConfig::default()
    } else {
        EngineConfig {
            ice_servers: opts
                .stun
                .iter()
                .map(|url| IceServerConfig::stun(url.as_str()))
                .collect(),
        }
    };
    let coordinator = ConnectionCoordinator::new(
        Arc::new(RtcEngineFactory),
        CoordinatorConfig {
            engine,
            ..Default::default()
        },
    );

    let config = SessionConfig {
        app: opts.app.clone(),
        share_base: opts.share_base.clone(),
        fetch_attempts: opts.attempts,
        fetch_delay: Duration::from_millis(opts.delay_ms),
    };
    Ok(SignalingSession::new(
        config,
        relay,
        Arc::new(SessionCache::new()),
        Arc::new(coordinator),
    ))
}

async fn run_offer(opts: &GlobalOpts) -> Result<()> {
    let session = build_session(opts)?;

    println!("{}", "Gathering connection details...".cyan());
    let link = session
        .start_offer()
        .await
        .context("Failed to start session")?;
    let url = session
        .config()
        .share_url(&link)
        .context("Invalid share base URL")?;

    info!(session_id = %link.session_id, "offer published");
    println!("{}", "Session ready.".green().bold());
    println!("   Code: {}", link.session_id.as_str().bold());
    println!("   Link: {}", url);
    println!("{}", "Waiting for the other side to answer...".cyan());

    loop {
        match session.await_answer().await {
            Ok(()) => break,
            Err(SignalingError::AnswerUnavailable(session_id)) => {
                debug!(%session_id, "no answer yet");
                println!("{}", "   still waiting...".dimmed());
            }
            Err(e) => {
                session.close().await;
                return Err(e).context("Failed to apply the answer");
            }
        }
    }

    chat::connect_and_chat(&session).await
}

async fn run_answer(opts: &GlobalOpts, code: Option<String>) -> Result<()> {
    let input = match code {
        Some(code) => code,
        None => dialoguer::Input::<String>::new()
            .with_prompt("Session code or link")
            .interact_text()
            .context("Failed to read session code")?,
    };
    let link = ShareLink::parse(&input).context("Not a session code or link")?;

    let session = build_session(opts)?;
    println!(
        "{} {}",
        "Joining session".cyan(),
        link.session_id.as_str().bold()
    );
    let reply = session
        .join(&link)
        .await
        .context("Failed to join session")?;
    info!(session_id = %reply.session_id, "answer published");
    if let Ok(url) = session.config().share_url(&reply) {
        println!("   Answer published: {}", url);
    }

    chat::connect_and_chat(&session).await
}

async fn run_relay(listen: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {listen}"))?;
    println!(
        "{} http://{}",
        "Relay listening on".green().bold(),
        listener.local_addr()?
    );
    server::serve(listener, RelayStore::new())
        .await
        .context("Relay server stopped")
}
