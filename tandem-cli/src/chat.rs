use anyhow::{Result, bail};
use colored::*;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use tandem_peer::{ChannelState, CoordinatorEvent, SignalingPhase, SignalingSession};

/// Upper bound on ICE connectivity after the descriptions are exchanged.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Polls the peer's candidates until the data channel opens, then relays
/// stdin lines as `{"text": ..}` messages until either side leaves.
pub async fn connect_and_chat(session: &SignalingSession) -> Result<()> {
    let coordinator = session.coordinator().clone();

    let (ended_tx, mut ended_rx) = watch::channel(false);
    let sub = coordinator.subscribe(move |event| match event {
        CoordinatorEvent::Message(value) => print_message(value),
        CoordinatorEvent::ChannelClosed => {
            println!("{}", "Peer left.".yellow());
            ended_tx.send_replace(true);
        }
        CoordinatorEvent::PhaseChanged(SignalingPhase::Failed) => {
            println!("{}", "Connection failed.".red().bold());
            ended_tx.send_replace(true);
        }
        _ => {}
    });

    println!("{}", "Connecting...".cyan());
    let deadline = Instant::now() + CONNECT_TIMEOUT;
    while coordinator.channel_state() != Some(ChannelState::Open) {
        if coordinator.phase().is_terminal() {
            sub.unsubscribe();
            session.close().await;
            bail!("Connection ended before the channel opened");
        }
        if Instant::now() >= deadline {
            sub.unsubscribe();
            session.close().await;
            bail!("Timed out waiting for the peer connection");
        }
        if let Some(disposition) = session.poll_remote_candidate().await {
            debug!(?disposition, "remote candidate polled");
        }
        tokio::time::sleep(session.config().fetch_delay).await;
    }

    info!(session_id = ?session.session_id(), "data channel open");
    println!(
        "{}",
        "Connected. Type a message and press enter; Ctrl-D to quit."
            .green()
            .bold()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(text) = line? else { break };
                if text.trim().is_empty() {
                    continue;
                }
                if !coordinator.send(&json!({ "text": text })).await {
                    warn!("message not sent; channel is {:?}", coordinator.channel_state());
                    println!("{}", "   (not sent: channel is not open)".dimmed());
                }
            }
            _ = ended_rx.wait_for(|ended| *ended) => break,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    sub.unsubscribe();
    session.close().await;
    println!("{}", "Bye.".cyan());
    Ok(())
}

fn print_message(value: &Value) {
    match value.get("text").and_then(Value::as_str) {
        Some(text) => println!("{} {}", "peer:".magenta().bold(), text),
        None => println!("{} {}", "peer:".magenta(), value),
    }
}
