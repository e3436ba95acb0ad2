//! Player relay soul
//!
//! Narration goes out through a `PlayerTransport`; commands come in over a
//! queue and are executed in order by a pump task that stops with the soul.

use crate::error::{Result, SoulError};
use crate::soul::{Soul, SoulContext};
use async_trait::async_trait;
use mudlark_core::NodeId;
use mudlark_events::{ActionOutcome, Observation};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Outbound side of a connected player.
#[async_trait]
pub trait PlayerTransport: Send + Sync {
    async fn send(&self, agent: &NodeId, text: &str) -> Result<()>;
}

/// Forwards `(agent, text)` pairs into a channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<(NodeId, String)>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(NodeId, String)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl PlayerTransport for ChannelTransport {
    async fn send(&self, agent: &NodeId, text: &str) -> Result<()> {
        self.tx
            .send((agent.clone(), text.to_string()))
            .map_err(|_| SoulError::transport("player disconnected"))
    }
}

pub struct PlayerSoul {
    transport: Arc<dyn PlayerTransport>,
    commands: Option<mpsc::Receiver<String>>,
    pump: Option<JoinHandle<()>>,
}

impl PlayerSoul {
    pub fn new(transport: Arc<dyn PlayerTransport>, commands: mpsc::Receiver<String>) -> Self {
        Self {
            transport,
            commands: Some(commands),
            pump: None,
        }
    }
}

async fn pump(mut commands: mpsc::Receiver<String>, ctx: SoulContext) {
    loop {
        let command = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            command = commands.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };
        let command = command.trim();
        if command.is_empty() {
            continue;
        }
        match ctx.act(command).await {
            Ok(Some(ActionOutcome::Executed(events))) => {
                debug!(agent = %ctx.agent, command, events = events.len(), "Player command executed")
            }
            Ok(Some(ActionOutcome::Rejected(_))) => {}
            Ok(None) => break,
            Err(e) => warn!(agent = %ctx.agent, command, error = %e, "Player command failed"),
        }
    }
}

#[async_trait]
impl Soul for PlayerSoul {
    fn name(&self) -> &str {
        "player"
    }

    async fn on_attach(&mut self, ctx: &SoulContext) -> Result<()> {
        if let Some(commands) = self.commands.take() {
            self.pump = Some(tokio::spawn(pump(commands, ctx.clone())));
        }
        Ok(())
    }

    async fn observe(&mut self, observation: Observation, _ctx: &SoulContext) -> Result<()> {
        self.transport.send(&observation.recipient, &observation.text).await
    }

    fn reap(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}
