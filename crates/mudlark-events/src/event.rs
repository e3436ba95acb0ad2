//! The event model
//!
//! Every command, and every consequence of a command, becomes a
//! `GraphEvent`. An event moves through a fixed lifecycle:
//!
//! 1. constructed by the pipeline (`World::plan`) or by another event as a
//!    follow-on, bound to an actor and concrete targets;
//! 2. executed exactly once, which mutates the graph, captures every roll
//!    and every narration string, and broadcasts to the audience;
//! 3. narrated per viewer from the captured strings only;
//! 4. serialized, and bound back to a live world with `from_json`.
//!
//! Kind-specific state lives in the `EventKind` payload so that dispatch is
//! an exhaustive match.

use crate::error::{ActionErrorKind, Error, Result};
use crate::kinds;
use crate::world::World;
use mudlark_core::{Node, NodeId, NodeKind, NodeTag, ObjectData, RoomData};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ===========================================================================
// Tags
// ===========================================================================

/// Discriminant of an event kind, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTag {
    Go,
    Leave,
    Arrive,
    Follow,
    Unfollow,
    Block,
    Unblock,
    TriggerFollow,
    Look,
    Examine,
    Inventory,
    Health,
    Help,
    Wait,
    Say,
    Shout,
    Whisper,
    Tell,
    Emote,
    Hit,
    Hug,
    Death,
    Get,
    Put,
    Drop,
    Give,
    Steal,
    Wear,
    Wield,
    Remove,
    Eat,
    Drink,
    Lock,
    Unlock,
    Error,
    Spawn,
}

/// How the argument text of a command is split into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// No arguments.
    Bare,
    /// One target name.
    One,
    /// Two target names joined by one of the separators. When `optional`
    /// is set the whole text may also stand alone as the first name.
    Pair {
        separators: &'static [&'static str],
        optional: bool,
    },
    /// Free text.
    Text,
    /// A target name followed by free text.
    TargetText,
}

impl EventTag {
    /// Every tag, in help-listing order.
    pub const ALL: &'static [EventTag] = &[
        Self::Go,
        Self::Leave,
        Self::Arrive,
        Self::Follow,
        Self::Unfollow,
        Self::Block,
        Self::Unblock,
        Self::TriggerFollow,
        Self::Look,
        Self::Examine,
        Self::Inventory,
        Self::Health,
        Self::Help,
        Self::Wait,
        Self::Say,
        Self::Shout,
        Self::Whisper,
        Self::Tell,
        Self::Emote,
        Self::Hit,
        Self::Hug,
        Self::Death,
        Self::Get,
        Self::Put,
        Self::Drop,
        Self::Give,
        Self::Steal,
        Self::Wear,
        Self::Wield,
        Self::Remove,
        Self::Eat,
        Self::Drink,
        Self::Lock,
        Self::Unlock,
        Self::Error,
        Self::Spawn,
    ];

    /// Command words for this kind. The first is the canonical verb; kinds
    /// with no words are only ever created by other events.
    pub fn verbs(&self) -> &'static [&'static str] {
        match self {
            Self::Go => &["go", "walk", "move", "travel", "enter"],
            Self::Follow => &["follow"],
            Self::Unfollow => &["unfollow"],
            Self::Block => &["block"],
            Self::Unblock => &["unblock"],
            Self::Look => &["look", "l"],
            Self::Examine => &["examine", "ex", "x", "inspect", "read"],
            Self::Inventory => &["inventory", "inv", "i"],
            Self::Health => &["health", "status", "hp"],
            Self::Help => &["help", "commands"],
            Self::Wait => &["wait"],
            Self::Say => &["say"],
            Self::Shout => &["shout", "yell"],
            Self::Whisper => &["whisper"],
            Self::Tell => &["tell"],
            Self::Emote => &["emote", "act"],
            Self::Hit => &["hit", "attack", "punch", "kick", "fight"],
            Self::Hug => &["hug"],
            Self::Get => &["get", "take", "grab", "pick"],
            Self::Put => &["put", "place", "stash"],
            Self::Drop => &["drop", "discard"],
            Self::Give => &["give", "hand", "offer"],
            Self::Steal => &["steal", "swipe"],
            Self::Wear => &["wear", "don"],
            Self::Wield => &["wield"],
            Self::Remove => &["remove", "unwield", "unwear", "doff"],
            Self::Eat => &["eat", "consume"],
            Self::Drink => &["drink", "sip"],
            Self::Lock => &["lock"],
            Self::Unlock => &["unlock"],
            Self::Leave
            | Self::Arrive
            | Self::TriggerFollow
            | Self::Death
            | Self::Error
            | Self::Spawn => &[],
        }
    }

    pub fn from_verb(word: &str) -> Option<EventTag> {
        let word = word.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|tag| tag.verbs().contains(&word.as_str()))
    }

    /// Canonical command word, if the kind can be typed.
    pub fn verb(&self) -> Option<&'static str> {
        self.verbs().first().copied()
    }

    pub fn shape(&self) -> Shape {
        match self {
            Self::Go
            | Self::Follow
            | Self::Block
            | Self::Examine
            | Self::Hit
            | Self::Hug
            | Self::Drop
            | Self::Wear
            | Self::Wield
            | Self::Remove
            | Self::Eat
            | Self::Drink
            | Self::Emote => Shape::One,
            Self::Get => Shape::Pair {
                separators: &["from", "out of", "in"],
                optional: true,
            },
            Self::Put => Shape::Pair {
                separators: &["into", "in", "inside", "on"],
                optional: false,
            },
            Self::Give => Shape::Pair {
                separators: &["to"],
                optional: false,
            },
            Self::Steal => Shape::Pair {
                separators: &["from"],
                optional: false,
            },
            Self::Lock | Self::Unlock => Shape::Pair {
                separators: &["with", "using"],
                optional: true,
            },
            Self::Say | Self::Shout => Shape::Text,
            Self::Whisper | Self::Tell => Shape::TargetText,
            _ => Shape::Bare,
        }
    }

    /// One-line usage shown by `help`.
    pub fn usage(&self) -> Option<&'static str> {
        Some(match self {
            Self::Go => "go <direction>",
            Self::Follow => "follow <agent>",
            Self::Unfollow => "unfollow",
            Self::Block => "block <agent>",
            Self::Unblock => "unblock",
            Self::Look => "look",
            Self::Examine => "examine <thing>",
            Self::Inventory => "inventory",
            Self::Health => "health",
            Self::Help => "help",
            Self::Wait => "wait",
            Self::Say => "say \"<words>\"",
            Self::Shout => "shout \"<words>\"",
            Self::Whisper => "whisper <agent> \"<words>\"",
            Self::Tell => "tell <agent> \"<words>\"",
            Self::Emote => "emote <gesture>",
            Self::Hit => "hit <agent>",
            Self::Hug => "hug <agent>",
            Self::Get => "get <thing> [from <container>]",
            Self::Put => "put <thing> in <container>",
            Self::Drop => "drop <thing>",
            Self::Give => "give <thing> to <agent>",
            Self::Steal => "steal <thing> from <agent>",
            Self::Wear => "wear <thing>",
            Self::Wield => "wield <thing>",
            Self::Remove => "remove <thing>",
            Self::Eat => "eat <thing>",
            Self::Drink => "drink <thing>",
            Self::Lock => "lock <path or container> [with <key>]",
            Self::Unlock => "unlock <path or container> [with <key>]",
            _ => return None,
        })
    }
}

impl std::fmt::Display for EventTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(s)) => write!(f, "{}", s),
            _ => write!(f, "{:?}", self),
        }
    }
}

// ===========================================================================
// Payloads
// ===========================================================================

/// What happened when an agent tried to move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoOutcome {
    Moved,
    Exhausted,
    Blocked { by: NodeId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "__kind", rename_all = "snake_case")]
pub enum EventKind {
    Go {
        #[serde(default)]
        outcome: Option<GoOutcome>,
    },
    Leave,
    Arrive,
    Follow,
    Unfollow,
    Block,
    Unblock,
    TriggerFollow {
        #[serde(default)]
        followed: bool,
    },
    Look,
    Examine,
    Inventory,
    Health,
    Help,
    Wait,
    Say,
    Shout {
        #[serde(default)]
        listeners: Vec<NodeId>,
    },
    Whisper,
    Tell,
    Emote,
    Hit {
        #[serde(default)]
        attack: i32,
        #[serde(default)]
        defense: i32,
        #[serde(default)]
        dealt: i32,
        #[serde(default)]
        health_after: i32,
    },
    Hug,
    Death {
        #[serde(default)]
        corpse: Option<NodeId>,
    },
    Get,
    Put,
    Drop,
    Give,
    Steal {
        #[serde(default)]
        success: bool,
    },
    Wear,
    Wield,
    Remove,
    Eat {
        #[serde(default)]
        energy: i32,
        #[serde(default)]
        health_after: i32,
    },
    Drink {
        #[serde(default)]
        energy: i32,
        #[serde(default)]
        health_after: i32,
    },
    Lock,
    Unlock,
    Error {
        error_kind: ActionErrorKind,
        #[serde(default)]
        failed: Option<EventTag>,
    },
    Spawn,
}

impl EventKind {
    /// A payload for `tag` with nothing captured yet.
    pub fn fresh(tag: EventTag) -> Self {
        match tag {
            EventTag::Go => Self::Go { outcome: None },
            EventTag::Leave => Self::Leave,
            EventTag::Arrive => Self::Arrive,
            EventTag::Follow => Self::Follow,
            EventTag::Unfollow => Self::Unfollow,
            EventTag::Block => Self::Block,
            EventTag::Unblock => Self::Unblock,
            EventTag::TriggerFollow => Self::TriggerFollow { followed: false },
            EventTag::Look => Self::Look,
            EventTag::Examine => Self::Examine,
            EventTag::Inventory => Self::Inventory,
            EventTag::Health => Self::Health,
            EventTag::Help => Self::Help,
            EventTag::Wait => Self::Wait,
            EventTag::Say => Self::Say,
            EventTag::Shout => Self::Shout { listeners: Vec::new() },
            EventTag::Whisper => Self::Whisper,
            EventTag::Tell => Self::Tell,
            EventTag::Emote => Self::Emote,
            EventTag::Hit => Self::Hit {
                attack: 0,
                defense: 0,
                dealt: 0,
                health_after: 0,
            },
            EventTag::Hug => Self::Hug,
            EventTag::Death => Self::Death { corpse: None },
            EventTag::Get => Self::Get,
            EventTag::Put => Self::Put,
            EventTag::Drop => Self::Drop,
            EventTag::Give => Self::Give,
            EventTag::Steal => Self::Steal { success: false },
            EventTag::Wear => Self::Wear,
            EventTag::Wield => Self::Wield,
            EventTag::Remove => Self::Remove,
            EventTag::Eat => Self::Eat {
                energy: 0,
                health_after: 0,
            },
            EventTag::Drink => Self::Drink {
                energy: 0,
                health_after: 0,
            },
            EventTag::Lock => Self::Lock,
            EventTag::Unlock => Self::Unlock,
            EventTag::Error => Self::Error {
                error_kind: ActionErrorKind::Parse,
                failed: None,
            },
            EventTag::Spawn => Self::Spawn,
        }
    }

    pub fn tag(&self) -> EventTag {
        match self {
            Self::Go { .. } => EventTag::Go,
            Self::Leave => EventTag::Leave,
            Self::Arrive => EventTag::Arrive,
            Self::Follow => EventTag::Follow,
            Self::Unfollow => EventTag::Unfollow,
            Self::Block => EventTag::Block,
            Self::Unblock => EventTag::Unblock,
            Self::TriggerFollow { .. } => EventTag::TriggerFollow,
            Self::Look => EventTag::Look,
            Self::Examine => EventTag::Examine,
            Self::Inventory => EventTag::Inventory,
            Self::Health => EventTag::Health,
            Self::Help => EventTag::Help,
            Self::Wait => EventTag::Wait,
            Self::Say => EventTag::Say,
            Self::Shout { .. } => EventTag::Shout,
            Self::Whisper => EventTag::Whisper,
            Self::Tell => EventTag::Tell,
            Self::Emote => EventTag::Emote,
            Self::Hit { .. } => EventTag::Hit,
            Self::Hug => EventTag::Hug,
            Self::Death { .. } => EventTag::Death,
            Self::Get => EventTag::Get,
            Self::Put => EventTag::Put,
            Self::Drop => EventTag::Drop,
            Self::Give => EventTag::Give,
            Self::Steal { .. } => EventTag::Steal,
            Self::Wear => EventTag::Wear,
            Self::Wield => EventTag::Wield,
            Self::Remove => EventTag::Remove,
            Self::Eat { .. } => EventTag::Eat,
            Self::Drink { .. } => EventTag::Drink,
            Self::Lock => EventTag::Lock,
            Self::Unlock => EventTag::Unlock,
            Self::Error { .. } => EventTag::Error,
            Self::Spawn => EventTag::Spawn,
        }
    }
}

// ===========================================================================
// Event
// ===========================================================================

/// A node as an event saw it: enough to narrate, and to rebuild the node
/// when replaying against a graph that no longer has it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    pub target_id: NodeId,
    pub name: String,
    pub tag: NodeTag,
}

impl NodeRef {
    pub fn of(node: &Node) -> Self {
        Self {
            target_id: node.node_id.clone(),
            name: node.name.clone(),
            tag: node.tag(),
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.target_id
    }
}

/// Narration captured at execution time, by perspective.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narration {
    /// What the actor reads.
    pub actor: Option<String>,
    /// What the first target reads; falls back to `others` when unset.
    pub target: Option<String>,
    /// What everyone else in the audience reads.
    pub others: Option<String>,
}

/// Who an executed event is broadcast to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    #[default]
    Nobody,
    Actor,
    /// Agents in the event's room.
    Room,
    /// Agents in the event's room, plus the actor wherever it is.
    RoomAndActor,
    /// An explicit list captured at execution time.
    Agents(Vec<NodeId>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEvent {
    /// Position in the world's execution order; zero until executed.
    #[serde(default)]
    pub event_id: u64,
    pub actor: NodeRef,
    #[serde(default)]
    pub targets: Vec<NodeRef>,
    #[serde(default)]
    pub text: Option<String>,
    /// Room the event takes place in.
    #[serde(default)]
    pub room: Option<NodeRef>,
    #[serde(default)]
    pub executed: bool,
    /// Random rolls, in draw order. Replaying an event reuses them.
    #[serde(default)]
    pub rolls: Vec<i32>,
    #[serde(default)]
    pub narration: Narration,
    #[serde(default)]
    pub audience: Audience,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl GraphEvent {
    pub fn new(tag: EventTag, actor: NodeRef, targets: Vec<NodeRef>, text: Option<String>) -> Self {
        Self {
            event_id: 0,
            actor,
            targets,
            text,
            room: None,
            executed: false,
            rolls: Vec::new(),
            narration: Narration::default(),
            audience: Audience::Nobody,
            kind: EventKind::fresh(tag),
        }
    }

    pub fn tag(&self) -> EventTag {
        self.kind.tag()
    }

    pub fn actor_id(&self) -> &NodeId {
        &self.actor.target_id
    }

    pub fn target_id(&self, index: usize) -> Option<&NodeId> {
        self.targets.get(index).map(NodeRef::id)
    }

    /// Apply the event to the world exactly once. Returns the follow-on
    /// events, which the caller must execute depth-first before anything
    /// else.
    pub fn execute(&mut self, world: &mut World) -> Result<Vec<GraphEvent>> {
        if self.executed {
            return Err(Error::invariant(format!(
                "{} event {} by {} executed twice",
                self.tag(),
                self.event_id,
                self.actor.target_id
            )));
        }
        self.executed = true;
        self.event_id = world.next_event_id();
        debug!(event_id = self.event_id, kind = %self.tag(), actor = %self.actor.target_id, "Executing event");

        let follow_ons = kinds::execute(self, world)?;
        world.broadcast(self)?;
        Ok(follow_ons)
    }

    /// A copy of an executed event that can run again. Actor, targets,
    /// text and the roll tape are kept; what execution captured is cleared.
    /// Error events keep their narration since it is written up front.
    pub fn rearmed(&self) -> GraphEvent {
        let mut event = self.clone();
        event.executed = false;
        event.event_id = 0;
        if !matches!(event.kind, EventKind::Error { .. }) {
            event.narration = Narration::default();
            event.audience = Audience::Nobody;
            event.kind = EventKind::fresh(event.tag());
        }
        event
    }

    /// What `viewer` reads about this event, or `None` if they should see
    /// nothing. Uses only state captured during execution.
    pub fn view_as(&self, viewer: &NodeId) -> Option<String> {
        if !self.executed {
            return None;
        }
        if &self.actor.target_id == viewer {
            return self.narration.actor.clone();
        }
        if self.targets.first().is_some_and(|t| &t.target_id == viewer) {
            if let Some(text) = &self.narration.target {
                return Some(text.clone());
            }
        }
        self.narration.others.clone()
    }

    /// Serialize the full event, tagged with the viewer it is meant for.
    pub fn to_json(&self, viewer: Option<&NodeId>) -> Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        if let serde_json::Value::Object(map) = &mut value {
            map.insert(
                "viewer".to_string(),
                viewer.map_or(serde_json::Value::Null, |v| serde_json::Value::String(v.to_string())),
            );
        }
        Ok(value)
    }

    /// Rebuild an event and bind it to `world`. Nodes the world no longer
    /// has are recreated fresh in the void under their old identifiers.
    pub fn from_json(value: &serde_json::Value, world: &mut World) -> Result<GraphEvent> {
        let mut value = value.clone();
        if let serde_json::Value::Object(map) = &mut value {
            map.remove("viewer");
        }
        let event: GraphEvent = serde_json::from_value(value)?;
        let refs = std::iter::once(&event.actor)
            .chain(&event.targets)
            .chain(event.room.as_ref());
        for node in refs {
            rebind(node, world)?;
        }
        Ok(event)
    }
}

fn rebind(node: &NodeRef, world: &mut World) -> Result<()> {
    if world.graph().contains_node(&node.target_id) {
        return Ok(());
    }
    let kind = match node.tag {
        NodeTag::Room => NodeKind::Room(RoomData::default()),
        NodeTag::Agent => NodeKind::Agent(world.config().agent_template()),
        NodeTag::Object => NodeKind::Object(ObjectData::default()),
        NodeTag::Void => {
            return Err(Error::invariant(format!(
                "event references a second void {}",
                node.target_id
            )))
        }
    };
    debug!(node = %node.target_id, "Recreating node referenced by replayed event");
    world
        .graph_mut()
        .insert_node(Node::new(node.target_id.clone(), &node.name, kind))?;
    Ok(())
}
