//! Search scopes for resolving names in command text

use crate::error::Result;
use mudlark_core::{Graph, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Everything directly in the actor's room, the actor excluded.
    Room,
    /// Agents in the actor's room. The actor only answers to "me".
    RoomAgents,
    /// Objects held but not worn or wielded.
    Carried,
    /// Objects worn or wielded.
    Equipped,
    /// Everything held.
    Inventory,
    /// Inventory first, then the room, then the actor and the room itself.
    Nearby,
}

const SELF_WORDS: &[&str] = &["me", "myself", "self"];
const ROOM_WORDS: &[&str] = &["here", "room", "around"];

impl Scope {
    /// Refusal text when nothing in scope answers to `name`.
    pub fn missing(&self, name: &str) -> String {
        match self {
            Self::Room | Self::Nearby => format!("You don't see {} here.", name),
            Self::RoomAgents => format!("There is nobody called {} here.", name),
            Self::Carried | Self::Inventory => format!("You don't have {}.", name),
            Self::Equipped => format!("You aren't wearing or wielding {}.", name),
        }
    }

    /// Candidate nodes, in search order.
    pub fn candidates(&self, graph: &Graph, actor: &NodeId, room: &NodeId) -> Result<Vec<NodeId>> {
        let mut out = match self {
            Self::Room => graph.contents(room)?,
            Self::RoomAgents => graph.room_agents(room)?,
            Self::Carried => graph.carried(actor)?,
            Self::Equipped => graph.equipped(actor)?,
            Self::Inventory => {
                let mut held = graph.carried(actor)?;
                held.extend(graph.equipped(actor)?);
                held
            }
            Self::Nearby => {
                let mut near = graph.carried(actor)?;
                near.extend(graph.equipped(actor)?);
                near.extend(graph.contents(room)?);
                near
            }
        };
        if !matches!(self, Self::Nearby) {
            out.retain(|id| id != actor);
        }
        Ok(out)
    }

    /// First node in scope answering to `name`.
    pub fn find(&self, graph: &Graph, actor: &NodeId, room: &NodeId, name: &str) -> Result<Option<NodeId>> {
        let all = self.find_all(graph, actor, room, name)?;
        Ok(all.into_iter().next())
    }

    /// Every node in scope answering to `name`, in search order.
    pub fn find_all(&self, graph: &Graph, actor: &NodeId, room: &NodeId, name: &str) -> Result<Vec<NodeId>> {
        let wanted = name.trim().to_lowercase();
        if matches!(self, Self::Nearby | Self::RoomAgents) && SELF_WORDS.contains(&wanted.as_str()) {
            return Ok(vec![actor.clone()]);
        }
        if matches!(self, Self::Nearby) && ROOM_WORDS.contains(&wanted.as_str()) {
            return Ok(vec![room.clone()]);
        }
        Ok(self
            .candidates(graph, actor, room)?
            .into_iter()
            .filter(|id| graph.get(id).is_some_and(|n| n.matches_name(name)))
            .collect())
    }
}
