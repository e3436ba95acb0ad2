//! Node variants and the per-variant payloads
//!
//! A `Node` carries the fields every graph entity shares (names, size,
//! containment) plus a `NodeKind` payload for the variant. Edges are plain
//! `NodeId`s resolved through the `Graph`; nodes never own each other.

use crate::types::{Edge, EquipSlot, GridLocation, NodeId, NodeTag};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_OBJECT_SIZE: u32 = 1;
pub const DEFAULT_CONTAINER_CAPACITY: u32 = 5;
pub const DEFAULT_AGENT_SIZE: u32 = 20;
pub const DEFAULT_AGENT_CAPACITY: u32 = 20;
pub const DEFAULT_ROOM_CAPACITY: u32 = 100_000;
pub const DEFAULT_HEALTH: i32 = 10;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub node_id: NodeId,
    pub name: String,
    /// Synonyms the node also answers to.
    #[serde(default)]
    pub names: BTreeSet<String>,
    /// Article used when narrating the node ("a", "an", "the", or empty).
    #[serde(default)]
    pub name_prefix: String,
    #[serde(default)]
    pub is_plural: bool,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub classes: BTreeSet<String>,
    pub size: u32,
    /// Remaining capacity for holding other nodes.
    pub contain_size: u32,
    pub container_node: Option<Edge>,
    #[serde(default)]
    pub contained_nodes: BTreeMap<NodeId, Edge>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node_type", rename_all = "lowercase")]
pub enum NodeKind {
    Void,
    Room(RoomData),
    Agent(AgentData),
    Object(ObjectData),
}

/// A lock on a path or a container. `target_id` is the key that opens it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEdge {
    pub target_id: NodeId,
    pub locked: bool,
    #[serde(default)]
    pub lock_desc: Option<String>,
}

/// A directed path from one room to a neighbor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEdge {
    pub target_id: NodeId,
    pub label: String,
    #[serde(default)]
    pub examine_desc: Option<String>,
    #[serde(default)]
    pub locked_edge: Option<LockEdge>,
}

impl PathEdge {
    pub fn is_locked(&self) -> bool {
        self.locked_edge.as_ref().is_some_and(|l| l.locked)
    }

    /// Whether `text` names this path: the full label, the label without a
    /// leading article, or the label's last word ("north" for "the north").
    pub fn matches(&self, text: &str) -> bool {
        let text = normalize_name(text);
        let label = normalize_name(&self.label);
        label == text || label.rsplit(' ').next() == Some(text.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomData {
    #[serde(default)]
    pub grid_location: GridLocation,
    #[serde(default)]
    pub neighbors: BTreeMap<NodeId, PathEdge>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentData {
    pub health: i32,
    pub strength: i32,
    pub dexterity: i32,
    pub damage: i32,
    pub defense: i32,
    pub speed: i32,
    pub num_wearable_items: u32,
    pub max_wearable_items: u32,
    pub num_wieldable_items: u32,
    pub max_wieldable_items: u32,
    #[serde(default)]
    pub following: Option<Edge>,
    #[serde(default)]
    pub followed_by: BTreeSet<NodeId>,
    #[serde(default)]
    pub blocking: Option<Edge>,
    #[serde(default)]
    pub blocked_by: BTreeSet<NodeId>,
    /// Narration produced for this agent and not yet consumed by its soul.
    #[serde(default)]
    pub observations: Vec<String>,
    #[serde(default)]
    pub is_player: bool,
    #[serde(default)]
    pub dead: bool,
    #[serde(default)]
    pub dying: bool,
    #[serde(default)]
    pub persona: String,
    #[serde(default)]
    pub mission: String,
}

impl Default for AgentData {
    fn default() -> Self {
        Self {
            health: DEFAULT_HEALTH,
            strength: 0,
            dexterity: 0,
            damage: 1,
            defense: 0,
            speed: 5,
            num_wearable_items: 0,
            max_wearable_items: 3,
            num_wieldable_items: 0,
            max_wieldable_items: 1,
            following: None,
            followed_by: BTreeSet::new(),
            blocking: None,
            blocked_by: BTreeSet::new(),
            observations: Vec::new(),
            is_player: false,
            dead: false,
            dying: false,
            persona: String::new(),
            mission: String::new(),
        }
    }
}

impl AgentData {
    pub fn is_alive(&self) -> bool {
        !self.dead && !self.dying
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectData {
    #[serde(default)]
    pub is_container: bool,
    #[serde(default)]
    pub is_gettable: bool,
    #[serde(default)]
    pub is_wearable: bool,
    #[serde(default)]
    pub is_weapon: bool,
    #[serde(default)]
    pub is_food: bool,
    #[serde(default)]
    pub is_drink: bool,
    /// Health gained (or lost, when negative) by ingesting this object.
    #[serde(default)]
    pub food_energy: i32,
    #[serde(default)]
    pub value: i32,
    #[serde(default)]
    pub equipped: Option<EquipSlot>,
    /// Bonuses applied to whoever wears or wields this object.
    #[serde(default)]
    pub stats: BTreeMap<String, i32>,
    #[serde(default)]
    pub locked_edge: Option<LockEdge>,
    /// Set on the container left behind when an agent dies.
    #[serde(default)]
    pub is_corpse: bool,
}

impl ObjectData {
    pub fn stat(&self, name: &str) -> i32 {
        self.stats.get(name).copied().unwrap_or(0)
    }

    pub fn is_locked(&self) -> bool {
        self.locked_edge.as_ref().is_some_and(|l| l.locked)
    }
}

impl Node {
    /// A fresh node with the defaults for its variant. The graph assigns the
    /// identifier and places it in the void.
    pub fn new(node_id: NodeId, name: &str, kind: NodeKind) -> Self {
        let (size, contain_size, name_prefix) = match &kind {
            NodeKind::Void => (0, u32::MAX, ""),
            NodeKind::Room(_) => (0, DEFAULT_ROOM_CAPACITY, "the"),
            NodeKind::Agent(_) => (DEFAULT_AGENT_SIZE, DEFAULT_AGENT_CAPACITY, ""),
            NodeKind::Object(o) if o.is_container => {
                (DEFAULT_OBJECT_SIZE, DEFAULT_CONTAINER_CAPACITY, article_for(name))
            }
            NodeKind::Object(_) => (DEFAULT_OBJECT_SIZE, 0, article_for(name)),
        };
        Self {
            node_id,
            name: name.to_string(),
            names: BTreeSet::new(),
            name_prefix: name_prefix.to_string(),
            is_plural: false,
            desc: String::new(),
            classes: BTreeSet::new(),
            size,
            contain_size,
            container_node: None,
            contained_nodes: BTreeMap::new(),
            kind,
        }
    }

    pub fn tag(&self) -> NodeTag {
        match self.kind {
            NodeKind::Void => NodeTag::Void,
            NodeKind::Room(_) => NodeTag::Room,
            NodeKind::Agent(_) => NodeTag::Agent,
            NodeKind::Object(_) => NodeTag::Object,
        }
    }

    pub fn is_room(&self) -> bool {
        matches!(self.kind, NodeKind::Room(_))
    }

    pub fn is_agent(&self) -> bool {
        matches!(self.kind, NodeKind::Agent(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind, NodeKind::Object(_))
    }

    pub fn as_room(&self) -> Option<&RoomData> {
        match &self.kind {
            NodeKind::Room(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_room_mut(&mut self) -> Option<&mut RoomData> {
        match &mut self.kind {
            NodeKind::Room(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_agent(&self) -> Option<&AgentData> {
        match &self.kind {
            NodeKind::Agent(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_agent_mut(&mut self) -> Option<&mut AgentData> {
        match &mut self.kind {
            NodeKind::Agent(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectData> {
        match &self.kind {
            NodeKind::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectData> {
        match &mut self.kind {
            NodeKind::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn container(&self) -> Option<&NodeId> {
        self.container_node.as_ref().map(|e| &e.target_id)
    }

    /// Name with its article, as used mid-sentence ("a rusty sword").
    pub fn view_name(&self) -> String {
        if self.name_prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name_prefix, self.name)
        }
    }

    /// Whether `text` refers to this node by name or synonym.
    pub fn matches_name(&self, text: &str) -> bool {
        let wanted = normalize_name(text);
        if wanted.is_empty() {
            return false;
        }
        normalize_name(&self.name) == wanted || self.names.iter().any(|n| normalize_name(n) == wanted)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }
}

/// Lowercase, collapse whitespace, and drop a leading article.
pub fn normalize_name(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    let words = match words.first() {
        Some(&"the") | Some(&"a") | Some(&"an") | Some(&"some") if words.len() > 1 => &words[1..],
        _ => &words[..],
    };
    words.join(" ")
}

fn article_for(name: &str) -> &'static str {
    match name.trim().chars().next().map(|c| c.to_ascii_lowercase()) {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        Some(_) => "a",
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_articles_and_case() {
        assert_eq!(normalize_name("The  Rusty Sword"), "rusty sword");
        assert_eq!(normalize_name("an apple"), "apple");
        // A lone article is a name, not an article.
        assert_eq!(normalize_name("a"), "a");
    }

    #[test]
    fn object_defaults_pick_article() {
        let apple = Node::new("apple_1".into(), "apple", NodeKind::Object(ObjectData::default()));
        assert_eq!(apple.view_name(), "an apple");
        assert_eq!(apple.size, DEFAULT_OBJECT_SIZE);
        assert_eq!(apple.contain_size, 0);

        let chest = Node::new(
            "chest_2".into(),
            "chest",
            NodeKind::Object(ObjectData { is_container: true, ..Default::default() }),
        );
        assert_eq!(chest.contain_size, DEFAULT_CONTAINER_CAPACITY);
    }

    #[test]
    fn path_matches_last_word() {
        let path = PathEdge {
            target_id: "cellar_3".into(),
            label: "the cellar stairs".into(),
            examine_desc: None,
            locked_edge: None,
        };
        assert!(path.matches("stairs"));
        assert!(path.matches("cellar stairs"));
        assert!(path.matches("The Cellar Stairs"));
        assert!(!path.matches("cellar"));
    }

    #[test]
    fn matches_synonyms() {
        let mut node = Node::new("mug_4".into(), "mug of ale", NodeKind::Object(ObjectData::default()));
        node.names.insert("ale".into());
        assert!(node.matches_name("the ale"));
        assert!(node.matches_name("Mug of Ale"));
        assert!(!node.matches_name("mug"));
        assert!(!node.matches_name(""));
    }
}
