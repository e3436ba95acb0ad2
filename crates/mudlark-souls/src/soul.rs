//! The `Soul` trait and the task that drives one
//!
//! Every attached soul gets its own inbound queue and its own tokio task.
//! Observations for one agent are therefore handled strictly in broadcast
//! order, while different agents' souls react independently. Cancelling the
//! soul's token stops the task, including a reaction that is still in
//! flight, and then calls `reap`.

use crate::error::Result;
use async_trait::async_trait;
use mudlark_core::NodeId;
use mudlark_events::{ActionOutcome, EventTag, Observation, World};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// The world as shared between souls. Graph mutation happens synchronously
/// while the lock is held; nothing awaits with it held.
pub type SharedWorld = Arc<Mutex<World>>;

pub fn shared(world: World) -> SharedWorld {
    Arc::new(Mutex::new(world))
}

/// Decision unit bound to one live agent.
#[async_trait]
pub trait Soul: Send {
    /// Short label for logs ("player", "wander", ...).
    fn name(&self) -> &str;

    /// Called once on the soul's own task before any observation.
    async fn on_attach(&mut self, _ctx: &SoulContext) -> Result<()> {
        Ok(())
    }

    /// React to one observation. May act through `ctx`.
    async fn observe(&mut self, observation: Observation, ctx: &SoulContext) -> Result<()>;

    /// Release resources. Called exactly once, after the last observation.
    fn reap(&mut self) {}
}

/// What a soul can reach: its agent, the world, and its cancellation token.
#[derive(Clone)]
pub struct SoulContext {
    pub agent: NodeId,
    pub world: SharedWorld,
    pub cancel: CancellationToken,
}

impl SoulContext {
    pub fn new(agent: NodeId, world: SharedWorld, cancel: CancellationToken) -> Self {
        Self { agent, world, cancel }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run a command as this soul's agent. Returns `None` without touching
    /// the world when the soul has been cancelled, including while it was
    /// waiting for the lock, or when the agent no longer exists.
    pub async fn act(&self, command: &str) -> Result<Option<ActionOutcome>> {
        if self.is_cancelled() {
            return Ok(None);
        }
        let mut world = self.world.lock().await;
        if self.is_cancelled() || !world.graph().contains_node(&self.agent) {
            return Ok(None);
        }
        debug!(agent = %self.agent, command, "Soul acting");
        Ok(Some(world.parse_exec(&self.agent, command)?))
    }

    /// Commands the agent could issue right now.
    pub async fn legal_commands(&self, kinds: Option<&[EventTag]>) -> Result<Vec<String>> {
        let world = self.world.lock().await;
        if !world.graph().contains_node(&self.agent) {
            return Ok(Vec::new());
        }
        Ok(world
            .enumerate_legal_events(&self.agent, kinds)?
            .into_iter()
            .map(|a| a.command)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Inbound queue
// ---------------------------------------------------------------------------

/// Sending half of a soul's observation queue.
#[derive(Clone)]
pub(crate) enum Inbox {
    Bounded(mpsc::Sender<Observation>),
    Unbounded(mpsc::UnboundedSender<Observation>),
}

pub(crate) enum Outbox {
    Bounded(mpsc::Receiver<Observation>),
    Unbounded(mpsc::UnboundedReceiver<Observation>),
}

/// A queue of the given capacity; zero means unbounded.
pub(crate) fn queue(capacity: usize) -> (Inbox, Outbox) {
    if capacity == 0 {
        let (tx, rx) = mpsc::unbounded_channel();
        (Inbox::Unbounded(tx), Outbox::Unbounded(rx))
    } else {
        let (tx, rx) = mpsc::channel(capacity);
        (Inbox::Bounded(tx), Outbox::Bounded(rx))
    }
}

/// Why an observation could not be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Refused {
    /// A bounded queue is at capacity.
    Full,
    /// The soul's task has stopped receiving.
    Closed,
}

impl Inbox {
    /// Enqueue without waiting.
    pub(crate) fn offer(&self, observation: Observation) -> std::result::Result<(), Refused> {
        match self {
            Self::Bounded(tx) => tx.try_send(observation).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => Refused::Full,
                mpsc::error::TrySendError::Closed(_) => Refused::Closed,
            }),
            Self::Unbounded(tx) => tx.send(observation).map_err(|_| Refused::Closed),
        }
    }
}

impl Outbox {
    async fn recv(&mut self) -> Option<Observation> {
        match self {
            Self::Bounded(rx) => rx.recv().await,
            Self::Unbounded(rx) => rx.recv().await,
        }
    }
}

// ---------------------------------------------------------------------------
// Task loop
// ---------------------------------------------------------------------------

/// Drive `soul` until its token is cancelled or its queue closes, then reap.
pub(crate) async fn run_soul(mut soul: Box<dyn Soul>, ctx: SoulContext, mut outbox: Outbox) {
    let attached = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => false,
        result = soul.on_attach(&ctx) => {
            if let Err(e) = result {
                warn!(agent = %ctx.agent, soul = soul.name(), error = %e, "Soul failed to start");
            }
            true
        }
    };

    while attached {
        let next = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => None,
            next = outbox.recv() => next,
        };
        let Some(observation) = next else { break };
        let finished = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => false,
            result = soul.observe(observation, &ctx) => {
                if let Err(e) = result {
                    warn!(agent = %ctx.agent, soul = soul.name(), error = %e, "Soul reaction failed");
                }
                true
            }
        };
        if !finished {
            break;
        }
    }

    soul.reap();
    debug!(agent = %ctx.agent, soul = soul.name(), "Soul reaped");
}
