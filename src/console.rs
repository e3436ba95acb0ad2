//! Terminal player: narration to stdout, commands from stdin

use anyhow::Result;
use mudlark_core::NodeId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Words that end the session instead of being sent to the world.
const QUIT: &[&str] = &["quit", "exit"];

/// Print narration until the transport is dropped.
pub async fn print_narration(mut rx: mpsc::UnboundedReceiver<(NodeId, String)>) {
    while let Some((_, text)) = rx.recv().await {
        println!("{}", text);
    }
}

/// Forward stdin lines as commands until EOF, a quit word, or the soul goes
/// away.
pub async fn read_commands(commands: mpsc::Sender<String>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if QUIT.contains(&line.to_lowercase().as_str()) {
            break;
        }
        if commands.send(line.to_string()).await.is_err() {
            tracing::info!("Player soul gone, leaving");
            break;
        }
    }
    Ok(())
}
