//! Graph registry: the sole owner of every node
//!
//! All nodes live in one sorted map keyed by `NodeId`. Edges (containment,
//! paths, follow/block, locks) are identifiers resolved through this map, so
//! the registry is the only place that can keep both ends of an edge in sync.
//!
//! Invariants enforced here:
//! - every node except the void has exactly one container, and the
//!   container lists it back;
//! - no node contains itself, directly or transitively;
//! - the non-forced containment API never lets the sizes held by a
//!   container exceed its initial capacity.

use crate::error::{Error, Result};
use crate::node::{AgentData, LockEdge, Node, NodeKind, ObjectData, PathEdge, RoomData};
use crate::types::{void_id, Edge, GridLocation, NodeId, NodeTag, VOID_ID};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    nodes: BTreeMap<NodeId, Node>,
    rooms: BTreeSet<NodeId>,
    objects: BTreeSet<NodeId>,
    agents: BTreeSet<NodeId>,
    #[serde(default)]
    next_id: u64,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

fn is_void(id: &NodeId) -> bool {
    id.as_str() == VOID_ID
}

impl Graph {
    pub fn new() -> Self {
        let void = void_id();
        let mut root = Node::new(void.clone(), "the void", NodeKind::Void);
        root.container_node = Some(Edge::to(&void));
        let mut nodes = BTreeMap::new();
        nodes.insert(void, root);
        Self {
            nodes,
            rooms: BTreeSet::new(),
            objects: BTreeSet::new(),
            agents: BTreeSet::new(),
            next_id: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &NodeId) -> Result<&Node> {
        self.nodes.get(id).ok_or_else(|| Error::NodeNotFound(id.clone()))
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id).ok_or_else(|| Error::NodeNotFound(id.clone()))
    }

    pub fn agent(&self, id: &NodeId) -> Result<&AgentData> {
        self.node(id)?.as_agent().ok_or_else(|| Error::wrong_type(id, "agent"))
    }

    pub fn agent_mut(&mut self, id: &NodeId) -> Result<&mut AgentData> {
        self.node_mut(id)?
            .as_agent_mut()
            .ok_or_else(|| Error::wrong_type(id, "agent"))
    }

    pub fn object(&self, id: &NodeId) -> Result<&ObjectData> {
        self.node(id)?.as_object().ok_or_else(|| Error::wrong_type(id, "object"))
    }

    pub fn object_mut(&mut self, id: &NodeId) -> Result<&mut ObjectData> {
        self.node_mut(id)?
            .as_object_mut()
            .ok_or_else(|| Error::wrong_type(id, "object"))
    }

    pub fn room(&self, id: &NodeId) -> Result<&RoomData> {
        self.node(id)?.as_room().ok_or_else(|| Error::wrong_type(id, "room"))
    }

    pub fn room_mut(&mut self, id: &NodeId) -> Result<&mut RoomData> {
        self.node_mut(id)?
            .as_room_mut()
            .ok_or_else(|| Error::wrong_type(id, "room"))
    }

    pub fn rooms(&self) -> impl Iterator<Item = &NodeId> {
        self.rooms.iter()
    }

    pub fn objects(&self) -> impl Iterator<Item = &NodeId> {
        self.objects.iter()
    }

    pub fn agents(&self) -> impl Iterator<Item = &NodeId> {
        self.agents.iter()
    }

    /// Number of nodes, including the void.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    fn fresh_id(&mut self, name: &str) -> NodeId {
        let slug: String = name
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let slug = if slug.is_empty() { "node".to_string() } else { slug };
        loop {
            self.next_id += 1;
            let id = NodeId::new(format!("{}_{}", slug, self.next_id));
            if !self.nodes.contains_key(&id) {
                return id;
            }
        }
    }

    /// Create a node with a generated identifier, placed in the void.
    pub fn add_node(&mut self, name: &str, kind: NodeKind) -> NodeId {
        let id = self.fresh_id(name);
        let node = Node::new(id.clone(), name, kind);
        self.register(node);
        id
    }

    pub fn add_room(&mut self, name: &str, desc: &str) -> NodeId {
        let id = self.add_node(name, NodeKind::Room(RoomData::default()));
        self.set_desc(&id, desc);
        id
    }

    pub fn add_agent(&mut self, name: &str, desc: &str) -> NodeId {
        let id = self.add_node(name, NodeKind::Agent(AgentData::default()));
        self.set_desc(&id, desc);
        id
    }

    pub fn add_object(&mut self, name: &str, desc: &str, data: ObjectData) -> NodeId {
        let id = self.add_node(name, NodeKind::Object(data));
        self.set_desc(&id, desc);
        id
    }

    fn set_desc(&mut self, id: &NodeId, desc: &str) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.desc = desc.to_string();
        }
    }

    /// Insert a fully formed node under its own identifier, placed in the
    /// void. Fails if the identifier is taken.
    pub fn insert_node(&mut self, mut node: Node) -> Result<NodeId> {
        if self.nodes.contains_key(&node.node_id) {
            return Err(Error::invariant(format!("duplicate node id {}", node.node_id)));
        }
        if matches!(node.kind, NodeKind::Void) {
            return Err(Error::invariant("only one void may exist"));
        }
        node.container_node = None;
        node.contained_nodes.clear();
        let id = node.node_id.clone();
        self.register(node);
        Ok(id)
    }

    fn register(&mut self, mut node: Node) {
        let id = node.node_id.clone();
        match node.tag() {
            NodeTag::Room => self.rooms.insert(id.clone()),
            NodeTag::Agent => self.agents.insert(id.clone()),
            NodeTag::Object => self.objects.insert(id.clone()),
            NodeTag::Void => false,
        };
        node.container_node = Some(Edge::to(&void_id()));
        self.nodes.insert(id.clone(), node);
        if let Some(void) = self.nodes.get_mut(&void_id()) {
            void.contained_nodes.insert(id.clone(), Edge::to(&id));
        }
    }

    // -----------------------------------------------------------------------
    // Containment
    // -----------------------------------------------------------------------

    /// Whether `node` fits in the remaining capacity of `container`.
    pub fn would_fit(&self, container: &NodeId, node: &NodeId) -> bool {
        if is_void(container) {
            return true;
        }
        match (self.nodes.get(container), self.nodes.get(node)) {
            (Some(c), Some(n)) => n.size <= c.contain_size,
            _ => false,
        }
    }

    /// Reject placing `node` inside `container` when that would make `node`
    /// contain itself.
    fn check_no_cycle(&self, container: &NodeId, node: &NodeId) -> Result<()> {
        if container == node {
            return Err(Error::invariant(format!("{} cannot contain itself", node)));
        }
        let mut visited = BTreeSet::new();
        let mut current = container.clone();
        loop {
            if &current == node {
                return Err(Error::invariant(format!(
                    "placing {} in {} would create a containment cycle",
                    node, container
                )));
            }
            if is_void(&current) {
                return Ok(());
            }
            if !visited.insert(current.clone()) {
                return Err(Error::invariant(format!("containment cycle above {}", container)));
            }
            current = self
                .node(&current)?
                .container()
                .cloned()
                .ok_or_else(|| Error::invariant(format!("{} has no container", current)))?;
        }
    }

    fn link(&mut self, container: &NodeId, node: &NodeId) -> Result<()> {
        let size = self.node(node)?.size;
        let parent = self.node_mut(container)?;
        parent.contained_nodes.insert(node.clone(), Edge::to(node));
        if !is_void(container) {
            parent.contain_size = parent.contain_size.saturating_sub(size);
        }
        self.node_mut(node)?.container_node = Some(Edge::to(container));
        Ok(())
    }

    fn unlink(&mut self, node: &NodeId) -> Result<()> {
        let (size, parent) = {
            let n = self.node(node)?;
            (n.size, n.container().cloned())
        };
        let parent =
            parent.ok_or_else(|| Error::invariant(format!("{} has no container", node)))?;
        let container = self.node_mut(&parent)?;
        if container.contained_nodes.remove(node).is_none() {
            return Err(Error::invariant(format!(
                "{} claims container {} which does not list it",
                node, parent
            )));
        }
        if !is_void(&parent) {
            container.contain_size = container.contain_size.saturating_add(size);
        }
        self.node_mut(node)?.container_node = None;
        Ok(())
    }

    /// Place an ownerless node (one held by the void) inside `container`.
    ///
    /// Fails if the node is held elsewhere, if the placement would create a
    /// cycle, or if the container lacks capacity. On success the container's
    /// remaining capacity shrinks by the node's size.
    pub fn add_contained(&mut self, container: &NodeId, node: &NodeId) -> Result<()> {
        let current = self
            .node(node)?
            .container()
            .cloned()
            .ok_or_else(|| Error::invariant(format!("{} has no container", node)))?;
        if !is_void(&current) {
            return Err(Error::invariant(format!(
                "{} is already contained by {}",
                node, current
            )));
        }
        self.node(container)?;
        self.check_no_cycle(container, node)?;
        if !self.would_fit(container, node) {
            return Err(Error::Capacity {
                container: container.clone(),
                node: node.clone(),
            });
        }
        self.unlink(node)?;
        self.link(container, node)
    }

    /// Take `node` out of `container`, returning it to the void and giving
    /// the container its capacity back.
    pub fn remove_contained(&mut self, container: &NodeId, node: &NodeId) -> Result<()> {
        let current = self.node(node)?.container().cloned();
        if current.as_ref() != Some(container) {
            return Err(Error::invariant(format!(
                "{} is not contained by {}",
                node, container
            )));
        }
        self.unlink(node)?;
        self.link(&void_id(), node)
    }

    /// Move `node` into `dest`. All checks run before anything changes, so a
    /// failed move leaves the graph untouched.
    pub fn move_to(&mut self, node: &NodeId, dest: &NodeId) -> Result<()> {
        if is_void(node) {
            return Err(Error::invariant("the void cannot be moved"));
        }
        self.node(dest)?;
        if self.node(node)?.container() == Some(dest) {
            return Ok(());
        }
        self.check_no_cycle(dest, node)?;
        if !self.would_fit(dest, node) {
            return Err(Error::Capacity {
                container: dest.clone(),
                node: node.clone(),
            });
        }
        self.unlink(node)?;
        self.link(dest, node)
    }

    /// Move without a capacity check. Only reachable through `GraphBuilder`
    /// and the death conversion; the destination's `contain_size` saturates
    /// at zero instead of tracking an overflow.
    pub(crate) fn force_move(&mut self, node: &NodeId, dest: &NodeId) -> Result<()> {
        if is_void(node) {
            return Err(Error::invariant("the void cannot be moved"));
        }
        self.node(dest)?;
        if self.node(node)?.container() == Some(dest) {
            return Ok(());
        }
        self.check_no_cycle(dest, node)?;
        self.unlink(node)?;
        self.link(dest, node)
    }

    /// Walk the containment chain to the first room. Returns `None` when the
    /// chain reaches the void without crossing a room.
    pub fn get_room(&self, node: &NodeId) -> Result<Option<NodeId>> {
        let mut visited = BTreeSet::new();
        let mut current = node.clone();
        loop {
            let n = self.node(&current)?;
            if n.is_room() {
                return Ok(Some(current));
            }
            if is_void(&current) {
                return Ok(None);
            }
            if !visited.insert(current.clone()) {
                return Err(Error::invariant(format!(
                    "containment cycle while finding the room of {}",
                    node
                )));
            }
            current = n
                .container()
                .cloned()
                .ok_or_else(|| Error::invariant(format!("{} has no container", current)))?;
        }
    }

    /// Like `get_room` but a missing room is an invariant violation.
    pub fn room_of(&self, node: &NodeId) -> Result<NodeId> {
        self.get_room(node)?
            .ok_or_else(|| Error::invariant(format!("{} is not in any room", node)))
    }

    pub fn same_room(&self, a: &NodeId, b: &NodeId) -> Result<bool> {
        let ra = self.get_room(a)?;
        Ok(ra.is_some() && ra == self.get_room(b)?)
    }

    // -----------------------------------------------------------------------
    // Structural queries
    // -----------------------------------------------------------------------

    /// Direct contents of a node, in identifier order.
    pub fn contents(&self, id: &NodeId) -> Result<Vec<NodeId>> {
        Ok(self.node(id)?.contained_nodes.keys().cloned().collect())
    }

    pub fn room_agents(&self, room: &NodeId) -> Result<Vec<NodeId>> {
        Ok(self
            .node(room)?
            .contained_nodes
            .keys()
            .filter(|id| self.agents.contains(*id))
            .cloned()
            .collect())
    }

    pub fn room_objects(&self, room: &NodeId) -> Result<Vec<NodeId>> {
        Ok(self
            .node(room)?
            .contained_nodes
            .keys()
            .filter(|id| self.objects.contains(*id))
            .cloned()
            .collect())
    }

    /// Objects an agent holds that are not worn or wielded.
    pub fn carried(&self, agent: &NodeId) -> Result<Vec<NodeId>> {
        self.held_where(agent, |o| o.equipped.is_none())
    }

    /// Objects an agent is wearing or wielding.
    pub fn equipped(&self, agent: &NodeId) -> Result<Vec<NodeId>> {
        self.held_where(agent, |o| o.equipped.is_some())
    }

    fn held_where(&self, agent: &NodeId, keep: impl Fn(&ObjectData) -> bool) -> Result<Vec<NodeId>> {
        Ok(self
            .node(agent)?
            .contained_nodes
            .keys()
            .filter(|id| self.get(id).and_then(Node::as_object).is_some_and(&keep))
            .cloned()
            .collect())
    }

    /// Every node below `id` in the containment tree, depth first.
    pub fn all_contained(&self, id: &NodeId) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut stack = self.contents(id)?;
        stack.reverse();
        let mut seen = BTreeSet::new();
        while let Some(next) = stack.pop() {
            if !seen.insert(next.clone()) {
                return Err(Error::invariant(format!("containment cycle below {}", id)));
            }
            let mut children = self.contents(&next)?;
            children.reverse();
            stack.extend(children);
            out.push(next);
        }
        Ok(out)
    }

    /// First candidate (in the given order) answering to `name`.
    pub fn find_in<'a>(
        &self,
        candidates: impl IntoIterator<Item = &'a NodeId>,
        name: &str,
    ) -> Option<NodeId> {
        candidates
            .into_iter()
            .find(|id| self.get(id).is_some_and(|n| n.matches_name(name)))
            .cloned()
    }

    // -----------------------------------------------------------------------
    // Room topology
    // -----------------------------------------------------------------------

    /// Create the directed path `room -> other`. The reverse direction is a
    /// separate edge with its own label. Fails if the path already exists;
    /// remove it first to relabel or relock it.
    pub fn add_neighbor(
        &mut self,
        room: &NodeId,
        other: &NodeId,
        label: &str,
        lock: Option<LockEdge>,
    ) -> Result<()> {
        self.room(other)?;
        if room == other {
            return Err(Error::invariant(format!("{} cannot neighbor itself", room)));
        }
        if self.room(room)?.neighbors.contains_key(other) {
            return Err(Error::invariant(format!("path from {} to {} already exists", room, other)));
        }
        self.room_mut(room)?.neighbors.insert(
            other.clone(),
            PathEdge {
                target_id: other.clone(),
                label: label.to_string(),
                examine_desc: None,
                locked_edge: lock,
            },
        );
        Ok(())
    }

    pub fn remove_neighbor(&mut self, room: &NodeId, other: &NodeId) -> Result<PathEdge> {
        self.room_mut(room)?
            .neighbors
            .remove(other)
            .ok_or_else(|| Error::invariant(format!("no path from {} to {}", room, other)))
    }

    pub fn path(&self, from: &NodeId, to: &NodeId) -> Option<&PathEdge> {
        self.get(from)?.as_room()?.neighbors.get(to)
    }

    pub fn path_mut(&mut self, from: &NodeId, to: &NodeId) -> Option<&mut PathEdge> {
        self.nodes.get_mut(from)?.as_room_mut()?.neighbors.get_mut(to)
    }

    /// The path out of `room` that `text` names, by label or by the name of
    /// the room it leads to.
    pub fn find_path(&self, room: &NodeId, text: &str) -> Option<&PathEdge> {
        let neighbors = &self.get(room)?.as_room()?.neighbors;
        neighbors
            .values()
            .find(|p| p.matches(text))
            .or_else(|| {
                neighbors
                    .values()
                    .find(|p| self.get(&p.target_id).is_some_and(|n| n.matches_name(text)))
            })
    }

    /// How `room` looks from `observer_room`: the connecting path's label if
    /// the observer is an immediate neighbor, otherwise the room's own name.
    pub fn get_view_from(&self, room: &NodeId, observer_room: &NodeId) -> Result<String> {
        match self.path(observer_room, room) {
            Some(path) => Ok(path.label.clone()),
            None => Ok(self.node(room)?.view_name()),
        }
    }

    pub fn room_distance(&self, a: &NodeId, b: &NodeId) -> Result<u32> {
        Ok(self.room(a)?.grid_location.distance(&self.room(b)?.grid_location))
    }

    /// Rooms whose grid distance from `room` is at most `range`, `room`
    /// itself included.
    pub fn rooms_within(&self, room: &NodeId, range: u32) -> Result<Vec<NodeId>> {
        let origin: GridLocation = self.room(room)?.grid_location;
        Ok(self
            .rooms
            .iter()
            .filter(|r| {
                self.get(r)
                    .and_then(Node::as_room)
                    .is_some_and(|d| d.grid_location.distance(&origin) <= range)
            })
            .cloned()
            .collect())
    }

    // -----------------------------------------------------------------------
    // Follow / block edges
    // -----------------------------------------------------------------------

    pub fn set_following(&mut self, agent: &NodeId, target: Option<&NodeId>) -> Result<()> {
        if let Some(target) = target {
            self.agent(target)?;
            if target == agent {
                return Err(Error::invariant(format!("{} cannot follow itself", agent)));
            }
        }
        let previous = self.agent_mut(agent)?.following.take();
        if let Some(prev) = previous {
            if let Ok(prev) = self.agent_mut(&prev.target_id) {
                prev.followed_by.remove(agent);
            }
        }
        if let Some(target) = target {
            self.agent_mut(target)?.followed_by.insert(agent.clone());
            self.agent_mut(agent)?.following = Some(Edge::to(target));
        }
        Ok(())
    }

    pub fn set_blocking(&mut self, agent: &NodeId, target: Option<&NodeId>) -> Result<()> {
        if let Some(target) = target {
            self.agent(target)?;
            if target == agent {
                return Err(Error::invariant(format!("{} cannot block itself", agent)));
            }
        }
        let previous = self.agent_mut(agent)?.blocking.take();
        if let Some(prev) = previous {
            if let Ok(prev) = self.agent_mut(&prev.target_id) {
                prev.blocked_by.remove(agent);
            }
        }
        if let Some(target) = target {
            self.agent_mut(target)?.blocked_by.insert(agent.clone());
            self.agent_mut(agent)?.blocking = Some(Edge::to(target));
        }
        Ok(())
    }

    /// Drop the follow and block edges of `agent` that no longer join two
    /// agents in the same room. Followers are left alone: they get a chance
    /// to catch up before their own edge is judged.
    pub fn sever_stale_edges(&mut self, agent: &NodeId) -> Result<()> {
        let data = self.agent(agent)?.clone();
        if let Some(edge) = &data.following {
            if !self.same_room(agent, &edge.target_id)? {
                self.set_following(agent, None)?;
            }
        }
        if let Some(edge) = &data.blocking {
            if !self.same_room(agent, &edge.target_id)? {
                self.set_blocking(agent, None)?;
            }
        }
        for blocker in &data.blocked_by {
            if !self.same_room(agent, blocker)? {
                self.set_blocking(blocker, None)?;
            }
        }
        Ok(())
    }

    fn sever_all_social_edges(&mut self, agent: &NodeId) -> Result<()> {
        self.set_following(agent, None)?;
        self.set_blocking(agent, None)?;
        let data = self.agent(agent)?.clone();
        for follower in &data.followed_by {
            self.set_following(follower, None)?;
        }
        for blocker in &data.blocked_by {
            self.set_blocking(blocker, None)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Deletion and death
    // -----------------------------------------------------------------------

    /// Delete a node and everything it contains, severing every edge that
    /// references any deleted node. Returns the deleted identifiers.
    pub fn delete_node(&mut self, id: &NodeId) -> Result<Vec<NodeId>> {
        if is_void(id) {
            return Err(Error::invariant("the void cannot be deleted"));
        }
        let mut deleted = Vec::new();
        for child in self.contents(id)? {
            deleted.extend(self.delete_node(&child)?);
        }

        if self.agents.contains(id) {
            self.sever_all_social_edges(id)?;
        }
        if self.rooms.contains(id) {
            for room in self.rooms.clone() {
                if let Ok(data) = self.room_mut(&room) {
                    data.neighbors.remove(id);
                }
            }
        }
        self.drop_locks_keyed_by(id);

        self.unlink(id)?;
        self.nodes.remove(id);
        self.rooms.remove(id);
        self.objects.remove(id);
        self.agents.remove(id);
        debug!(node = %id, "Node deleted");
        deleted.push(id.clone());
        Ok(deleted)
    }

    fn drop_locks_keyed_by(&mut self, key: &NodeId) {
        for node in self.nodes.values_mut() {
            match &mut node.kind {
                NodeKind::Room(room) => {
                    for path in room.neighbors.values_mut() {
                        if path.locked_edge.as_ref().is_some_and(|l| &l.target_id == key) {
                            path.locked_edge = None;
                        }
                    }
                }
                NodeKind::Object(obj) => {
                    if obj.locked_edge.as_ref().is_some_and(|l| &l.target_id == key) {
                        obj.locked_edge = None;
                    }
                }
                _ => {}
            }
        }
    }

    /// Replace an agent with a corpse: a container object with a derived
    /// identifier, holding everything the agent carried, in the agent's place.
    pub fn agent_die(&mut self, agent: &NodeId) -> Result<NodeId> {
        let node = self.node(agent)?.clone();
        if !node.is_agent() {
            return Err(Error::wrong_type(agent, "agent"));
        }
        self.sever_all_social_edges(agent)?;

        let corpse_id = NodeId::corpse_of(agent);
        let contents = self.contents(agent)?;
        let held: u32 = contents
            .iter()
            .filter_map(|c| self.get(c))
            .map(|c| c.size)
            .sum();

        let mut corpse = Node::new(
            corpse_id.clone(),
            &format!("{}'s corpse", node.name),
            NodeKind::Object(ObjectData {
                is_container: true,
                is_corpse: true,
                ..Default::default()
            }),
        );
        corpse.name_prefix = String::new();
        corpse.names = ["corpse", "body"].iter().map(|s| s.to_string()).collect();
        corpse.names.insert(format!("{} corpse", node.name));
        corpse.desc = format!("The lifeless body of {}.", node.name);
        corpse.size = node.size;
        corpse.contain_size = node.contain_size.saturating_add(held);
        self.insert_node(corpse)?;

        for item in &contents {
            if let Ok(obj) = self.object_mut(item) {
                obj.equipped = None;
            }
            self.force_move(item, &corpse_id)?;
        }
        let place = node.container().cloned().unwrap_or_else(void_id);
        self.unlink(agent)?;
        self.nodes.remove(agent);
        self.agents.remove(agent);
        self.force_move(&corpse_id, &place)?;
        debug!(agent = %agent, corpse = %corpse_id, "Agent converted to corpse");
        Ok(corpse_id)
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parse a graph and check every structural invariant before handing it
    /// out.
    pub fn from_json(json: &str) -> Result<Self> {
        let graph: Graph = serde_json::from_str(json)?;
        graph.validate()?;
        Ok(graph)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let graph: Graph = serde_json::from_value(value)?;
        graph.validate()?;
        Ok(graph)
    }

    /// Check the structural invariants of the whole graph.
    pub fn validate(&self) -> Result<()> {
        let void = self.node(&void_id())?;
        if !matches!(void.kind, NodeKind::Void) {
            return Err(Error::invariant("VOID is not the void node"));
        }
        for (id, node) in &self.nodes {
            if &node.node_id != id {
                return Err(Error::invariant(format!("{} stored under {}", node.node_id, id)));
            }
            let registered = match node.tag() {
                NodeTag::Room => self.rooms.contains(id),
                NodeTag::Agent => self.agents.contains(id),
                NodeTag::Object => self.objects.contains(id),
                NodeTag::Void => is_void(id),
            };
            if !registered {
                return Err(Error::invariant(format!("{} missing from its {} index", id, node.tag())));
            }
            if !is_void(id) {
                let parent = node
                    .container()
                    .ok_or_else(|| Error::invariant(format!("{} has no container", id)))?;
                if !self.node(parent)?.contained_nodes.contains_key(id) {
                    return Err(Error::invariant(format!("{} not listed by container {}", id, parent)));
                }
            }
            for child in node.contained_nodes.keys() {
                if self.node(child)?.container() != Some(id) {
                    return Err(Error::invariant(format!("{} lists {} it does not hold", id, child)));
                }
            }
            self.get_room(id)?;
            if let Some(room) = node.as_room() {
                for target in room.neighbors.keys() {
                    self.room(target)?;
                }
            }
            if let Some(agent) = node.as_agent() {
                if let Some(edge) = &agent.following {
                    if !self.agent(&edge.target_id)?.followed_by.contains(id) {
                        return Err(Error::invariant(format!("{} follow edge has no back-reference", id)));
                    }
                }
                if let Some(edge) = &agent.blocking {
                    if !self.agent(&edge.target_id)?.blocked_by.contains(id) {
                        return Err(Error::invariant(format!("{} block edge has no back-reference", id)));
                    }
                }
            }
        }
        for id in self.rooms.iter().chain(&self.agents).chain(&self.objects) {
            self.node(id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container_data() -> ObjectData {
        ObjectData {
            is_container: true,
            is_gettable: true,
            ..Default::default()
        }
    }

    #[test]
    fn new_nodes_start_in_the_void() {
        let mut g = Graph::new();
        let room = g.add_room("Old Tavern", "Smoky.");
        assert_eq!(room.as_str(), "old_tavern_1");
        assert_eq!(g.node(&room).unwrap().container(), Some(&void_id()));
        assert_eq!(g.get_room(&room).unwrap(), Some(room.clone()));
    }

    #[test]
    fn add_contained_rejects_double_containment() {
        let mut g = Graph::new();
        let a = g.add_object("box", "", container_data());
        let b = g.add_object("crate", "", container_data());
        let coin = g.add_object("coin", "", ObjectData::default());
        g.add_contained(&a, &coin).unwrap();
        let err = g.add_contained(&b, &coin).unwrap_err();
        assert!(err.is_invariant());
    }

    #[test]
    fn add_contained_rejects_cycles() {
        let mut g = Graph::new();
        let a = g.add_object("box", "", container_data());
        let b = g.add_object("crate", "", container_data());
        g.add_contained(&a, &b).unwrap();
        assert!(g.add_contained(&a, &a).is_err());
        assert!(g.move_to(&a, &b).unwrap_err().is_invariant());
    }

    #[test]
    fn capacity_is_consumed_and_restored() {
        let mut g = Graph::new();
        let chest = g.add_object("chest", "", container_data());
        let brick = g.add_object("brick", "", ObjectData::default());
        g.node_mut(&brick).unwrap().size = 3;
        g.add_contained(&chest, &brick).unwrap();
        assert_eq!(g.node(&chest).unwrap().contain_size, 2);
        g.remove_contained(&chest, &brick).unwrap();
        assert_eq!(g.node(&chest).unwrap().contain_size, 5);
    }

    #[test]
    fn failed_move_changes_nothing() {
        let mut g = Graph::new();
        let small = g.add_object("pouch", "", container_data());
        let big = g.add_object("anvil", "", ObjectData::default());
        g.node_mut(&big).unwrap().size = 50;
        let before = g.clone();
        assert!(matches!(g.move_to(&big, &small), Err(Error::Capacity { .. })));
        assert_eq!(g, before);
    }

    #[test]
    fn get_room_detects_corrupt_cycles() {
        let mut g = Graph::new();
        let a = g.add_object("box", "", container_data());
        let b = g.add_object("crate", "", container_data());
        g.node_mut(&a).unwrap().container_node = Some(Edge::to(&b));
        g.node_mut(&b).unwrap().container_node = Some(Edge::to(&a));
        assert!(g.get_room(&a).unwrap_err().is_invariant());
    }

    #[test]
    fn view_from_neighbor_uses_label() {
        let mut g = Graph::new();
        let hall = g.add_room("hall", "");
        let yard = g.add_room("yard", "");
        let cave = g.add_room("cave", "");
        g.add_neighbor(&hall, &yard, "the north", None).unwrap();
        assert_eq!(g.get_view_from(&yard, &hall).unwrap(), "the north");
        assert_eq!(g.get_view_from(&cave, &hall).unwrap(), "the cave");
        assert!(g.remove_neighbor(&yard, &hall).is_err());
    }

    #[test]
    fn add_neighbor_keeps_an_existing_path() {
        let mut g = Graph::new();
        let hall = g.add_room("hall", "");
        let yard = g.add_room("yard", "");
        let key = g.add_object("key", "", ObjectData::default());
        let lock = LockEdge {
            target_id: key,
            locked: true,
            lock_desc: None,
        };
        g.add_neighbor(&hall, &yard, "the south", Some(lock)).unwrap();
        assert!(g.add_neighbor(&hall, &yard, "the gate", None).unwrap_err().is_invariant());

        let path = g.path(&hall, &yard).unwrap();
        assert_eq!(path.label, "the south");
        assert!(path.is_locked());

        g.remove_neighbor(&hall, &yard).unwrap();
        g.add_neighbor(&hall, &yard, "the gate", None).unwrap();
        assert_eq!(g.path(&hall, &yard).unwrap().label, "the gate");
    }
}
