//! Eat, Drink

use super::{capture, first, internal, target, token};
use crate::error::{ActionResult, Error, Result};
use crate::event::{Audience, EventKind, EventTag, GraphEvent};
use crate::narrate::{cap, name};
use crate::pipeline::{Cx, Resolved};
use crate::scope::Scope;
use crate::world::World;
use mudlark_core::{Graph, Node, NodeId};
use tracing::debug;

fn edible(tag: EventTag, node: &Node) -> bool {
    node.as_object().is_some_and(|o| {
        o.equipped.is_none()
            && match tag {
                EventTag::Eat => o.is_food,
                _ => o.is_drink,
            }
    })
}

pub(crate) fn resolve(cx: &Cx<'_>, tokens: &[String]) -> ActionResult<Resolved> {
    let tag = cx.tag;
    let item = cx.require_where(Scope::Nearby, token(tokens, 0), |n| edible(tag, n), |cx, guess| {
        format!("You can't {} {}.", cx.verb(), cx.the(guess))
    })?;
    Ok(Resolved::targets(vec![item]))
}

pub(crate) fn construct(cx: &Cx<'_>, resolved: Resolved) -> ActionResult<GraphEvent> {
    let item = first(cx, &resolved)?;
    cx.event(std::slice::from_ref(item), None)
}

/// Health after ingesting something worth `energy`, capped at `max_health`.
/// An agent already above the cap is brought down to it.
pub fn health_after_ingesting(health: i32, energy: i32, max_health: i32) -> i32 {
    (health + energy).min(max_health)
}

pub(crate) fn execute(event: &mut GraphEvent, world: &mut World) -> Result<Vec<GraphEvent>> {
    let actor = event.actor_id().clone();
    let item = target(event, 0)?;
    let tag = event.tag();
    let (verb_you, verb_them) = match tag {
        EventTag::Eat => ("eat", "eats"),
        EventTag::Drink => ("drink", "drinks"),
        other => return Err(Error::invariant(format!("{} routed to consume", other))),
    };

    let graph = world.graph();
    let (who, thing) = (cap(&name(graph, &actor)), name(graph, &item));
    let energy = graph.object(&item)?.food_energy;
    let health = graph.agent(&actor)?.health;
    let health_after = health_after_ingesting(health, energy, world.config().max_health);

    let graph = world.graph_mut();
    graph.delete_node(&item)?;
    let agent = graph.agent_mut(&actor)?;
    agent.health = health_after;
    if health_after <= 0 {
        agent.dying = true;
    }
    debug!(agent = %actor, energy, health_after, "Ingested");

    event.kind = match tag {
        EventTag::Eat => EventKind::Eat { energy, health_after },
        _ => EventKind::Drink { energy, health_after },
    };
    let aftertaste = match energy {
        e if e > 0 => " You feel better.",
        e if e < 0 => " It tastes foul!",
        _ => "",
    };
    capture(
        event,
        Audience::Room,
        Some(format!("You {} {}.{}", verb_you, thing, aftertaste)),
        None,
        Some(format!("{} {} {}.", who, verb_them, thing)),
    );

    let next = if health_after <= 0 { EventTag::Death } else { EventTag::Health };
    Ok(vec![internal(world, next, &actor, &[], None)?])
}

pub(crate) fn propose(graph: &Graph, actor: &NodeId, room: &NodeId, verb: &str) -> Result<Vec<String>> {
    let tag = EventTag::from_verb(verb).unwrap_or(EventTag::Eat);
    Ok(Scope::Nearby
        .candidates(graph, actor, room)?
        .iter()
        .filter_map(|id| graph.get(id))
        .filter(|n| edible(tag, n))
        .map(|n| format!("{} {}", verb, n.name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::health_after_ingesting;

    #[test]
    fn ingestion_is_capped() {
        assert_eq!(health_after_ingesting(5, 3, 10), 8);
        assert_eq!(health_after_ingesting(9, 3, 10), 10);
        assert_eq!(health_after_ingesting(12, 3, 10), 10);
        assert_eq!(health_after_ingesting(2, -5, 10), -3);
    }
}
