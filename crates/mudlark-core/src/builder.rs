//! Construction-phase access to the graph
//!
//! World building sometimes needs to place nodes without honoring capacity
//! (a crowded tavern, a dragon sitting on its hoard).
//! A `GraphBuilder` owns the graph it builds and only hands it over from
//! `finish`, so no live graph can be wrapped back into one and gameplay
//! code has no way to reach `force_move_to`.

use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::node::{AgentData, LockEdge, Node, ObjectData};
use crate::types::{GridLocation, NodeId};

#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: Graph,
}

impl GraphBuilder {
    /// Start from an empty graph holding only the void.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room(&mut self, name: &str, desc: &str, grid: GridLocation) -> Result<NodeId> {
        let id = self.graph.add_room(name, desc);
        self.graph.room_mut(&id)?.grid_location = grid;
        Ok(id)
    }

    /// Create an agent with the given stats and put it in `room`.
    pub fn agent(&mut self, name: &str, desc: &str, data: AgentData, room: &NodeId) -> Result<NodeId> {
        let id = self.graph.add_agent(name, desc);
        *self.graph.agent_mut(&id)? = data;
        self.graph.move_to(&id, room)?;
        Ok(id)
    }

    /// Create an object inside `container`, honoring capacity.
    pub fn object(
        &mut self,
        name: &str,
        desc: &str,
        data: ObjectData,
        container: &NodeId,
    ) -> Result<NodeId> {
        let id = self.graph.add_object(name, desc, data);
        self.graph.move_to(&id, container)?;
        Ok(id)
    }

    /// Connect two rooms in both directions with their own labels.
    pub fn connect(&mut self, a: &NodeId, b: &NodeId, a_to_b: &str, b_to_a: &str) -> Result<()> {
        self.graph.add_neighbor(a, b, a_to_b, None)?;
        self.graph.add_neighbor(b, a, b_to_a, None)
    }

    /// Put a lock opened by `key` on both directions of an existing path.
    pub fn lock_path(&mut self, a: &NodeId, b: &NodeId, key: &NodeId, locked: bool) -> Result<()> {
        self.graph.node(key)?;
        for (from, to) in [(a, b), (b, a)] {
            if let Some(path) = self.graph.path_mut(from, to) {
                path.locked_edge = Some(LockEdge {
                    target_id: key.clone(),
                    locked,
                    lock_desc: None,
                });
            }
        }
        if self.graph.path(a, b).is_none() && self.graph.path(b, a).is_none() {
            return Err(Error::invariant(format!("no path between {} and {}", a, b)));
        }
        Ok(())
    }

    pub fn lock_container(&mut self, container: &NodeId, key: &NodeId, locked: bool) -> Result<()> {
        self.graph.node(key)?;
        self.graph.object_mut(container)?.locked_edge = Some(LockEdge {
            target_id: key.clone(),
            locked,
            lock_desc: None,
        });
        Ok(())
    }

    /// Move without a capacity check. The destination's remaining capacity
    /// bottoms out at zero and should not be trusted afterwards.
    pub fn force_move_to(&mut self, node: &NodeId, dest: &NodeId) -> Result<()> {
        self.graph.force_move(node, dest)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Result<&mut Node> {
        self.graph.node_mut(id)
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Check the finished graph and hand it over.
    pub fn finish(self) -> Result<Graph> {
        self.graph.validate()?;
        Ok(self.graph)
    }
}
