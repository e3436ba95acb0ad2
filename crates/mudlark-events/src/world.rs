//! World mediator
//!
//! Owns the graph, the random generator and the per-agent auxiliary table.
//! All graph mutation goes through `World::execute`, which runs an event and
//! its follow-ons depth-first and synchronously; nothing in here awaits.

use crate::config::WorldConfig;
use crate::error::{ActionError, EventError, Result};
use crate::event::{Audience, EventKind, EventTag, GraphEvent, NodeRef};
use crate::kinds;
use crate::observe::{EventRecorder, Observation, ObservationSink};
use crate::pipeline;
use mudlark_core::{Graph, NodeId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

/// Cross-cutting per-agent state that is not part of the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxState {
    /// Agent most recently interacted with, in either direction.
    pub last_partner: Option<NodeId>,
    /// Most recent things this agent said, oldest first.
    pub recent_utterances: VecDeque<String>,
    /// Commands submitted through `parse_exec`, refused ones included.
    pub command_count: u64,
}

/// Result of running a command.
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    /// Every event executed, in depth-first order.
    Executed(Vec<GraphEvent>),
    /// The command was refused; the refusal was narrated to the actor.
    Rejected(ActionError),
}

impl ActionOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed(_))
    }

    pub fn events(&self) -> &[GraphEvent] {
        match self {
            Self::Executed(events) => events,
            Self::Rejected(_) => &[],
        }
    }

    pub fn tags(&self) -> Vec<EventTag> {
        self.events().iter().map(GraphEvent::tag).collect()
    }
}

/// A command the actor could issue right now, with the event it builds.
#[derive(Debug, Clone)]
pub struct LegalAction {
    pub command: String,
    pub event: GraphEvent,
}

/// Everything needed to resume a world exactly where it left off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub graph: Graph,
    pub config: WorldConfig,
    pub rng: ChaCha8Rng,
    pub next_event_id: u64,
    pub aux: BTreeMap<NodeId, AuxState>,
}

impl WorldSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: WorldSnapshot = serde_json::from_str(json)?;
        snapshot.graph.validate()?;
        Ok(snapshot)
    }
}

pub struct World {
    graph: Graph,
    config: WorldConfig,
    rng: ChaCha8Rng,
    next_event_id: u64,
    aux: BTreeMap<NodeId, AuxState>,
    sink: Option<Arc<dyn ObservationSink>>,
    recorder: Option<Arc<dyn EventRecorder>>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("nodes", &self.graph.len())
            .field("next_event_id", &self.next_event_id)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl World {
    pub fn new(graph: Graph, config: WorldConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            graph,
            config,
            rng,
            next_event_id: 1,
            aux: BTreeMap::new(),
            sink: None,
            recorder: None,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Direct graph access for world building. Gameplay goes through
    /// `parse_exec` and `execute`.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn set_sink(&mut self, sink: Arc<dyn ObservationSink>) {
        self.sink = Some(sink);
    }

    pub fn set_recorder(&mut self, recorder: Arc<dyn EventRecorder>) {
        self.recorder = Some(recorder);
    }

    pub fn aux(&self, agent: &NodeId) -> Option<&AuxState> {
        self.aux.get(agent)
    }

    pub(crate) fn next_event_id(&mut self) -> u64 {
        let id = self.next_event_id;
        self.next_event_id += 1;
        id
    }

    /// Roll number `index` of an event. Events run through `replay` carry
    /// their rolls and reuse them; fresh ones draw from the world generator.
    pub(crate) fn roll(&mut self, tape: &mut Vec<i32>, index: usize, low: i32, high: i32) -> i32 {
        if let Some(value) = tape.get(index) {
            return *value;
        }
        let value = if high <= low { low } else { self.rng.gen_range(low..=high) };
        tape.push(value);
        value
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Resolve and construct a command without executing it.
    pub fn plan(&self, actor: &NodeId, text: &str) -> Result<std::result::Result<GraphEvent, ActionError>> {
        match pipeline::plan(self, actor, text) {
            Ok(event) => Ok(Ok(event)),
            Err(EventError::Action(err)) => Ok(Err(err)),
            Err(EventError::Core(err)) => Err(err),
        }
    }

    /// Run a text command for `actor` through the whole lifecycle.
    pub fn parse_exec(&mut self, actor: &NodeId, text: &str) -> Result<ActionOutcome> {
        self.graph.agent(actor)?;
        self.aux.entry(actor.clone()).or_default().command_count += 1;
        match self.plan(actor, text)? {
            Ok(event) => Ok(ActionOutcome::Executed(self.execute(event)?)),
            Err(err) => {
                debug!(actor = %actor, kind = %err.kind, text = %err.text, "Command refused");
                self.narrate_error(&err)?;
                Ok(ActionOutcome::Rejected(err))
            }
        }
    }

    /// Execute a constructed event and everything it triggers, depth-first.
    pub fn execute(&mut self, event: GraphEvent) -> Result<Vec<GraphEvent>> {
        let mut done = Vec::new();
        let mut pending = vec![event];
        while let Some(mut next) = pending.pop() {
            let follow_ons = next.execute(self)?;
            self.note_interaction(&next);
            if let Some(recorder) = &self.recorder {
                recorder.record(&next);
            }
            done.push(next);
            pending.extend(follow_ons.into_iter().rev());
        }
        Ok(done)
    }

    /// Run a recorded event again, along with whatever it triggers now.
    /// The recorded rolls are reused, so from the same starting graph the
    /// event lands the same way whatever state the generator is in.
    pub fn replay(&mut self, recorded: &GraphEvent) -> Result<Vec<GraphEvent>> {
        debug!(kind = %recorded.tag(), actor = %recorded.actor_id(), rolls = recorded.rolls.len(), "Replaying event");
        self.execute(recorded.rearmed())
    }

    fn narrate_error(&mut self, err: &ActionError) -> Result<()> {
        let Some(actor) = self.graph.get(&err.actor) else {
            return Ok(());
        };
        let mut event = GraphEvent::new(EventTag::Error, NodeRef::of(actor), Vec::new(), Some(err.text.clone()));
        event.kind = EventKind::Error {
            error_kind: err.kind,
            failed: err.tag,
        };
        event.narration.actor = Some(err.text.clone());
        event.audience = Audience::Actor;
        self.execute(event)?;
        Ok(())
    }

    /// Announce that a soul has taken over `agent`.
    pub fn spawn(&mut self, agent: &NodeId) -> Result<Vec<GraphEvent>> {
        let event = kinds::internal(self, EventTag::Spawn, agent, &[], None)?;
        info!(agent = %agent, "Agent spawned");
        self.execute(event)
    }

    fn note_interaction(&mut self, event: &GraphEvent) {
        let actor = event.actor_id().clone();
        let limit = self.config.utterance_memory;
        if matches!(
            event.tag(),
            EventTag::Say | EventTag::Shout | EventTag::Whisper | EventTag::Tell
        ) {
            if let Some(text) = &event.text {
                let said = &mut self.aux.entry(actor.clone()).or_default().recent_utterances;
                said.push_back(text.clone());
                while said.len() > limit {
                    said.pop_front();
                }
            }
        }
        let social = matches!(
            event.tag(),
            EventTag::Whisper
                | EventTag::Tell
                | EventTag::Hit
                | EventTag::Hug
                | EventTag::Give
                | EventTag::Steal
                | EventTag::Follow
                | EventTag::Block
        );
        if let (true, Some(partner)) = (social, event.target_id(0)) {
            self.aux.entry(actor.clone()).or_default().last_partner = Some(partner.clone());
            if self.graph.contains_node(partner) {
                self.aux.entry(partner.clone()).or_default().last_partner = Some(actor);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Broadcast
    // -----------------------------------------------------------------------

    /// Deliver an executed event to its audience: each recipient that gets
    /// any text has it appended to its observation buffer and forwarded to
    /// the sink.
    pub fn broadcast(&mut self, event: &GraphEvent) -> Result<()> {
        let recipients = self.recipients(event)?;
        if recipients.is_empty() {
            return Ok(());
        }
        let shared = Arc::new(event.clone());
        let limit = self.config.observation_limit;
        for recipient in recipients {
            let Some(text) = event.view_as(&recipient) else {
                continue;
            };
            let recipient_dead = match self.graph.agent_mut(&recipient) {
                Ok(agent) => {
                    agent.observations.push(text.clone());
                    let excess = agent.observations.len().saturating_sub(limit);
                    agent.observations.drain(..excess);
                    agent.dead
                }
                Err(_) => true,
            };
            if let Some(sink) = &self.sink {
                sink.deliver(Observation {
                    recipient,
                    recipient_dead,
                    text,
                    event: Arc::clone(&shared),
                });
            }
        }
        Ok(())
    }

    fn recipients(&self, event: &GraphEvent) -> Result<Vec<NodeId>> {
        let in_room = |world: &World| -> Result<Vec<NodeId>> {
            match &event.room {
                Some(room) if world.graph.contains_node(room.id()) => world.graph.room_agents(room.id()),
                _ => Ok(Vec::new()),
            }
        };
        Ok(match &event.audience {
            Audience::Nobody => Vec::new(),
            Audience::Actor => vec![event.actor_id().clone()],
            Audience::Room => in_room(self)?,
            Audience::RoomAndActor => {
                let mut agents = in_room(self)?;
                if !agents.contains(event.actor_id()) {
                    agents.push(event.actor_id().clone());
                }
                agents
            }
            Audience::Agents(agents) => agents.clone(),
        })
    }

    /// Take and clear an agent's observation buffer.
    pub fn drain_observations(&mut self, agent: &NodeId) -> Result<Vec<String>> {
        Ok(std::mem::take(&mut self.graph.agent_mut(agent)?.observations))
    }

    // -----------------------------------------------------------------------
    // Enumeration
    // -----------------------------------------------------------------------

    /// Every command `actor` could successfully issue right now, optionally
    /// restricted to some kinds.
    pub fn enumerate_legal_events(&self, actor: &NodeId, filter: Option<&[EventTag]>) -> Result<Vec<LegalAction>> {
        let room = self.graph.room_of(actor)?;
        let mut out: Vec<LegalAction> = Vec::new();
        for tag in EventTag::ALL {
            if tag.verb().is_none() || filter.is_some_and(|f| !f.contains(tag)) {
                continue;
            }
            for command in kinds::propose(&self.graph, actor, &room, *tag)? {
                if out.iter().any(|a| a.command == command) {
                    continue;
                }
                match pipeline::plan(self, actor, &command) {
                    Ok(event) if event.tag() == *tag => out.push(LegalAction { command, event }),
                    Ok(_) | Err(EventError::Action(_)) => {}
                    Err(EventError::Core(err)) => return Err(err),
                }
            }
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Episodes and persistence
    // -----------------------------------------------------------------------

    pub fn begin_episode(&self) {
        if let Some(recorder) = &self.recorder {
            recorder.record_snapshot("episode_start", &self.graph);
        }
    }

    pub fn end_episode(&self) {
        if let Some(recorder) = &self.recorder {
            recorder.record_snapshot("episode_end", &self.graph);
        }
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            graph: self.graph.clone(),
            config: self.config.clone(),
            rng: self.rng.clone(),
            next_event_id: self.next_event_id,
            aux: self.aux.clone(),
        }
    }

    /// Replace the world state with a snapshot. The sink and recorder stay.
    pub fn restore(&mut self, snapshot: WorldSnapshot) -> Result<()> {
        snapshot.graph.validate()?;
        self.graph = snapshot.graph;
        self.config = snapshot.config;
        self.rng = snapshot.rng;
        self.next_event_id = snapshot.next_event_id;
        self.aux = snapshot.aux;
        info!(nodes = self.graph.len(), "World restored from snapshot");
        Ok(())
    }

    pub fn from_snapshot(snapshot: WorldSnapshot) -> Result<Self> {
        let mut world = World::new(Graph::new(), snapshot.config.clone());
        world.restore(snapshot)?;
        Ok(world)
    }
}
