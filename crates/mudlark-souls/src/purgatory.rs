//! Purgatory: which soul animates which agent
//!
//! The soul table is shared with the world as its `ObservationSink`, so
//! broadcast hands observations straight to each soul's queue without ever
//! waiting on a soul. An observation addressed to a dead agent detaches that
//! agent's soul instead of being delivered.

use crate::config::PurgatoryConfig;
use crate::error::{Result, SoulError};
use crate::player::{PlayerSoul, PlayerTransport};
use crate::soul::{queue, run_soul, Inbox, Refused, SharedWorld, Soul, SoulContext};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use mudlark_core::NodeId;
use mudlark_events::{Observation, ObservationSink};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Builds a filler soul for a free agent.
pub type FillerFactory = Arc<dyn Fn(&NodeId) -> Box<dyn Soul> + Send + Sync>;

/// Capacity of a player's inbound command queue.
const PLAYER_COMMAND_BUFFER: usize = 64;

struct SoulHandle {
    name: String,
    inbox: Inbox,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    filler: bool,
}

/// The attachment table. Lives behind an `Arc` shared with the world.
struct SoulTable {
    souls: DashMap<NodeId, SoulHandle>,
    config: PurgatoryConfig,
}

impl SoulTable {
    /// Queue an observation for its recipient's soul. `Ok(false)` means
    /// there was no soul to give it to. A soul whose bounded queue is full
    /// is detached and the overflow returned as an error.
    fn dispatch(&self, observation: Observation) -> Result<bool> {
        let agent = observation.recipient.clone();
        if observation.recipient_dead {
            if let Some((_, handle)) = self.souls.remove(&agent) {
                handle.cancel.cancel();
                info!(agent = %agent, soul = %handle.name, "Agent died, soul detached");
            }
            return Ok(false);
        }
        let refused = {
            let Some(handle) = self.souls.get(&agent) else {
                return Ok(false);
            };
            let offered = handle.inbox.offer(observation);
            match offered {
                Ok(()) => return Ok(true),
                Err(refused) => refused,
            }
        };
        let Some((_, handle)) = self.souls.remove(&agent) else {
            return Ok(false);
        };
        handle.cancel.cancel();
        match refused {
            Refused::Full => Err(SoulError::Overflow(agent)),
            Refused::Closed => {
                warn!(agent = %agent, soul = %handle.name, "Soul stopped receiving, detached");
                Ok(false)
            }
        }
    }
}

impl ObservationSink for SoulTable {
    fn deliver(&self, observation: Observation) {
        if let Err(e) = self.dispatch(observation) {
            error!(error = %e, capacity = self.config.observation_buffer, "Observation lost");
        }
    }
}

/// A connected player's handle on their agent.
#[derive(Debug, Clone)]
pub struct PlayerSlot {
    pub agent: NodeId,
    /// Command text typed by the player, executed in order.
    pub commands: mpsc::Sender<String>,
}

pub struct Purgatory {
    world: SharedWorld,
    table: Arc<SoulTable>,
    fillers: Vec<FillerFactory>,
    /// Serializes player-slot selection against other slot changes.
    slot_lock: Mutex<()>,
    /// Parent of every soul's token.
    shutdown: CancellationToken,
}

impl Purgatory {
    /// Create a purgatory and install it as the world's observation sink.
    pub async fn new(world: SharedWorld, config: PurgatoryConfig) -> Self {
        let table = Arc::new(SoulTable {
            souls: DashMap::new(),
            config,
        });
        world.lock().await.set_sink(table.clone());
        Self {
            world,
            table,
            fillers: Vec::new(),
            slot_lock: Mutex::new(()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Register a filler soul factory. Factories are used round-robin.
    pub fn with_filler(mut self, factory: FillerFactory) -> Self {
        self.fillers.push(factory);
        self
    }

    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    pub fn config(&self) -> &PurgatoryConfig {
        &self.table.config
    }

    // -----------------------------------------------------------------------
    // Attachment
    // -----------------------------------------------------------------------

    /// Bind `soul` to a live agent and start its task. Fails if the agent
    /// already has a soul; detach it first.
    pub async fn attach(&self, agent: &NodeId, soul: Box<dyn Soul>) -> Result<()> {
        self.attach_as(agent, soul, false).await
    }

    async fn attach_as(&self, agent: &NodeId, soul: Box<dyn Soul>, filler: bool) -> Result<()> {
        // Held until the soul is in the table, so a death in the world
        // always finds it there.
        let world = self.world.lock().await;
        if !world.graph().agent(agent)?.is_alive() {
            return Err(SoulError::Dead(agent.clone()));
        }
        match self.table.souls.entry(agent.clone()) {
            Entry::Occupied(_) => Err(SoulError::AlreadyAttached(agent.clone())),
            Entry::Vacant(slot) => {
                let name = soul.name().to_string();
                let cancel = self.shutdown.child_token();
                let (inbox, outbox) = queue(self.table.config.observation_buffer);
                let ctx = SoulContext::new(agent.clone(), self.world.clone(), cancel.clone());
                let task = tokio::spawn(run_soul(soul, ctx, outbox));
                info!(agent = %agent, soul = %name, filler, "Soul attached");
                slot.insert(SoulHandle {
                    name,
                    inbox,
                    cancel,
                    task,
                    filler,
                });
                Ok(())
            }
        }
    }

    /// Cancel an agent's soul and wait until it has been reaped.
    pub async fn detach(&self, agent: &NodeId) -> Result<()> {
        let (_, handle) = self
            .table
            .souls
            .remove(agent)
            .ok_or_else(|| SoulError::NotAttached(agent.clone()))?;
        handle.cancel.cancel();
        if let Err(e) = handle.task.await {
            warn!(agent = %agent, soul = %handle.name, error = %e, "Soul task ended abnormally");
        }
        {
            let mut world = self.world.lock().await;
            if let Ok(data) = world.graph_mut().agent_mut(agent) {
                data.is_player = false;
            }
        }
        info!(agent = %agent, soul = %handle.name, "Soul detached");
        Ok(())
    }

    /// Hand one observation to its recipient's soul. Returns whether it was
    /// queued. Observations for dead agents detach the soul instead, and a
    /// full bounded queue detaches the soul and fails with `Overflow`.
    pub fn dispatch_observation(&self, observation: Observation) -> Result<bool> {
        self.table.dispatch(observation)
    }

    pub fn is_attached(&self, agent: &NodeId) -> bool {
        self.table.souls.contains_key(agent)
    }

    /// `(agent, soul name)` for every attachment, sorted by agent.
    pub fn attached(&self) -> Vec<(NodeId, String)> {
        let mut out: Vec<(NodeId, String)> = self
            .table
            .souls
            .iter()
            .map(|e| (e.key().clone(), e.value().name.clone()))
            .collect();
        out.sort();
        out
    }

    // -----------------------------------------------------------------------
    // Players and fillers
    // -----------------------------------------------------------------------

    /// Pick a free living agent for a new player, attach a player soul to it
    /// and announce the arrival. Agents without a soul are preferred; an
    /// agent animated by a filler is taken over otherwise.
    pub async fn acquire_player_slot(&self, transport: Arc<dyn PlayerTransport>) -> Result<PlayerSlot> {
        let _slot = self.slot_lock.lock().await;

        let (agent, replacing) = {
            let mut world = self.world.lock().await;
            let graph = world.graph();
            let mut free = None;
            let mut filled = None;
            for id in graph.agents() {
                let Ok(data) = graph.agent(id) else { continue };
                if !data.is_alive() || data.is_player {
                    continue;
                }
                match self.table.souls.get(id) {
                    None => {
                        free = Some(id.clone());
                        break;
                    }
                    Some(handle) if handle.filler && filled.is_none() => filled = Some(id.clone()),
                    Some(_) => {}
                }
            }
            let (agent, replacing) = match (free, filled) {
                (Some(agent), _) => (agent, false),
                (None, Some(agent)) => (agent, true),
                (None, None) => return Err(SoulError::NoFreeAgent),
            };
            world.graph_mut().agent_mut(&agent)?.is_player = true;
            (agent, replacing)
        };

        if replacing {
            debug!(agent = %agent, "Replacing filler soul with player");
            self.detach(&agent).await?;
            self.world.lock().await.graph_mut().agent_mut(&agent)?.is_player = true;
        }

        let (commands, inbound) = mpsc::channel(PLAYER_COMMAND_BUFFER);
        self.attach(&agent, Box::new(PlayerSoul::new(transport, inbound))).await?;
        self.world.lock().await.spawn(&agent)?;
        info!(agent = %agent, "Player joined");
        Ok(PlayerSlot { agent, commands })
    }

    /// Attach filler souls to every living, non-player agent that has no
    /// soul. Returns how many were attached.
    pub async fn fill_all(&self) -> Result<usize> {
        if !self.table.config.filler_enabled || self.fillers.is_empty() {
            return Ok(0);
        }
        let _slot = self.slot_lock.lock().await;
        let free: Vec<NodeId> = {
            let world = self.world.lock().await;
            let graph = world.graph();
            graph
                .agents()
                .filter(|id| {
                    graph.agent(id).is_ok_and(|a| a.is_alive() && !a.is_player)
                        && !self.table.souls.contains_key(*id)
                })
                .cloned()
                .collect()
        };
        let mut attached = 0;
        for (i, agent) in free.iter().enumerate() {
            let soul = (self.fillers[i % self.fillers.len()])(agent);
            match self.attach_as(agent, soul, true).await {
                Ok(()) => attached += 1,
                // Died or was taken since the scan.
                Err(e @ (SoulError::Dead(_) | SoulError::AlreadyAttached(_) | SoulError::World(_))) => {
                    debug!(agent = %agent, error = %e, "Skipping filler");
                }
                Err(e) => return Err(e),
            }
        }
        if attached > 0 {
            info!(count = attached, "Filler souls attached");
        }
        Ok(attached)
    }

    /// Detach every soul and wait for all of them to be reaped.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let agents: Vec<NodeId> = self.table.souls.iter().map(|e| e.key().clone()).collect();
        let results = join_all(agents.iter().map(|agent| self.detach(agent))).await;
        for (agent, result) in agents.iter().zip(results) {
            match result {
                Ok(()) | Err(SoulError::NotAttached(_)) => {}
                Err(e) => warn!(agent = %agent, error = %e, "Detach failed during shutdown"),
            }
        }
        info!("Purgatory shut down");
    }
}
