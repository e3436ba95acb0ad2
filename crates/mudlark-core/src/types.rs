//! Core identifier and edge types

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Node identifier - cheaply cloneable, stable across serialization.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Arc<str>);

impl NodeId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier given to the corpse an agent leaves behind.
    pub fn corpse_of(agent: &NodeId) -> Self {
        Self::new(format!("{}__dead__", agent.0))
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of the root node that holds everything ownerless.
pub const VOID_ID: &str = "VOID";

pub fn void_id() -> NodeId {
    NodeId::new(VOID_ID)
}

/// A non-owning reference to another node, resolved through the graph.
/// Serializes as `{"target_id": "..."}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub target_id: NodeId,
}

impl Edge {
    pub fn to(target: &NodeId) -> Self {
        Self {
            target_id: target.clone(),
        }
    }
}

/// Discriminant of a node variant, without the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeTag {
    Void,
    Room,
    Agent,
    Object,
}

impl std::fmt::Display for NodeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Room => write!(f, "room"),
            Self::Agent => write!(f, "agent"),
            Self::Object => write!(f, "object"),
        }
    }
}

/// Position of a room on the world grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridLocation {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridLocation {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Manhattan distance between two grid cells.
    pub fn distance(&self, other: &GridLocation) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) + self.z.abs_diff(other.z)
    }
}

/// How an object is currently equipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipSlot {
    Worn,
    Wielded,
}

impl EquipSlot {
    pub fn verb_past(&self) -> &'static str {
        match self {
            Self::Worn => "wearing",
            Self::Wielded => "wielding",
        }
    }
}

impl std::fmt::Display for EquipSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Worn => write!(f, "worn"),
            Self::Wielded => write!(f, "wielded"),
        }
    }
}
