//! Lock, Unlock
//!
//! A lock sits on a path edge or on a container object and names the key
//! that works it. Path locks also work the reverse path when both sides
//! share a key.

use super::{capture, first, room, target, token};
use crate::error::{ActionResult, Error, Result};
use crate::event::{Audience, EventTag, GraphEvent};
use crate::narrate::{cap, name};
use crate::pipeline::{Cx, Resolved};
use crate::scope::Scope;
use crate::world::World;
use mudlark_core::{Graph, LockEdge, Node, NodeId};

fn has_lock(node: &Node) -> bool {
    node.as_object().is_some_and(|o| o.locked_edge.is_some())
}

pub(crate) fn resolve(cx: &Cx<'_>, tokens: &[String]) -> ActionResult<Resolved> {
    let wanted = token(tokens, 0);
    let mut resolved = match cx.graph.find_path(&cx.room, wanted) {
        Some(path) => Resolved {
            targets: vec![path.target_id.clone()],
            text: Some(path.label.clone()),
        },
        None => {
            let found = cx.require_where(Scope::Nearby, wanted, has_lock, |cx, guess| {
                format!("{} has no lock.", cap(&cx.the(guess)))
            })?;
            Resolved::targets(vec![found])
        }
    };
    if tokens.len() > 1 {
        resolved.targets.push(cx.require(Scope::Inventory, token(tokens, 1))?);
    }
    Ok(resolved)
}

/// The lock a command is aimed at: the path from the actor's room, or the
/// container's own lock.
fn lock_of<'g>(graph: &'g Graph, room: &NodeId, target: &NodeId) -> Result<Option<&'g LockEdge>> {
    if graph.node(target)?.is_room() {
        return Ok(graph.path(room, target).and_then(|p| p.locked_edge.as_ref()));
    }
    Ok(graph.object(target)?.locked_edge.as_ref())
}

pub(crate) fn construct(cx: &Cx<'_>, resolved: Resolved) -> ActionResult<GraphEvent> {
    let locking = cx.tag == EventTag::Lock;
    let lockable = first(cx, &resolved)?;
    let Some(lock) = lock_of(cx.graph, &cx.room, lockable)? else {
        return Err(cx.refuse("There is no lock on that."));
    };
    if lock.locked == locking {
        return Err(cx.refuse(format!("It's already {}.", if locking { "locked" } else { "unlocked" })));
    }

    let key = match resolved.targets.get(1) {
        Some(key) if key != &lock.target_id => {
            return Err(cx.refuse(format!("{} doesn't fit.", cap(&cx.the(key)))))
        }
        Some(key) => key.clone(),
        None => {
            let held = Scope::Inventory.candidates(cx.graph, &cx.actor, &cx.room)?;
            if !held.contains(&lock.target_id) {
                return Err(cx.refuse("You don't have the key."));
            }
            lock.target_id.clone()
        }
    };
    cx.event(&[lockable.clone(), key], resolved.text.clone())
}

pub(crate) fn execute(event: &mut GraphEvent, world: &mut World) -> Result<Vec<GraphEvent>> {
    let actor = event.actor_id().clone();
    let lockable = target(event, 0)?;
    let key = target(event, 1)?;
    let here = room(event)?;
    let locking = match event.tag() {
        EventTag::Lock => true,
        EventTag::Unlock => false,
        other => return Err(Error::invariant(format!("{} routed to locks", other))),
    };

    let graph = world.graph();
    let who = cap(&name(graph, &actor));
    let is_path = graph.node(&lockable)?.is_room();
    let thing = match (&event.text, is_path) {
        (Some(label), true) => format!("the path to {}", label),
        _ => name(graph, &lockable),
    };

    let graph = world.graph_mut();
    if is_path {
        set_path_lock(graph, &here, &lockable, &key, locking);
        set_path_lock(graph, &lockable, &here, &key, locking);
    } else if let Some(lock) = graph.object_mut(&lockable)?.locked_edge.as_mut() {
        lock.locked = locking;
    } else {
        return Err(Error::invariant(format!("{} has no lock", lockable)));
    }

    let (verb_you, verb_them) = if locking { ("lock", "locks") } else { ("unlock", "unlocks") };
    capture(
        event,
        Audience::Room,
        Some(format!("You {} {}.", verb_you, thing)),
        None,
        Some(format!("{} {} {}.", who, verb_them, thing)),
    );
    Ok(Vec::new())
}

/// Set the lock on `from -> to` when it exists and takes `key`.
fn set_path_lock(graph: &mut Graph, from: &NodeId, to: &NodeId, key: &NodeId, locked: bool) {
    if let Some(lock) = graph
        .path_mut(from, to)
        .and_then(|p| p.locked_edge.as_mut())
        .filter(|l| &l.target_id == key)
    {
        lock.locked = locked;
    }
}

pub(crate) fn propose(graph: &Graph, actor: &NodeId, room: &NodeId, verb: &str) -> Result<Vec<String>> {
    let mut out: Vec<String> = graph
        .room(room)?
        .neighbors
        .values()
        .filter(|p| p.locked_edge.is_some())
        .map(|p| format!("{} {}", verb, p.label))
        .collect();
    out.extend(
        Scope::Nearby
            .candidates(graph, actor, room)?
            .iter()
            .filter_map(|id| graph.get(id))
            .filter(|n| has_lock(n))
            .map(|n| format!("{} {}", verb, n.name)),
    );
    Ok(out)
}
