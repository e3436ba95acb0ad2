//! Hit, Hug, Death

use super::{capture, first, internal, room, target, token};
use crate::error::{ActionResult, Error, Result};
use crate::event::{Audience, EventKind, EventTag, GraphEvent};
use crate::narrate::{cap, name};
use crate::pipeline::{Cx, Resolved};
use crate::scope::Scope;
use crate::world::World;
use mudlark_core::{Graph, Node, NodeId};
use tracing::info;

pub(crate) fn resolve(cx: &Cx<'_>, tokens: &[String]) -> ActionResult<Resolved> {
    let verb = cx.verb();
    let found = cx.require_where(Scope::Nearby, token(tokens, 0), Node::is_agent, |cx, guess| {
        format!("You can't {} {}.", verb, cx.the(guess))
    })?;
    Ok(Resolved::targets(vec![found]))
}

pub(crate) fn construct(cx: &Cx<'_>, resolved: Resolved) -> ActionResult<GraphEvent> {
    let other = first(cx, &resolved)?;
    if other == &cx.actor {
        return Err(cx.refuse(format!("You can't {} yourself.", cx.verb())));
    }
    if cx.tag == EventTag::Hit && !cx.graph.agent(other)?.is_alive() {
        return Err(cx.refuse(format!("{} is already beyond help.", cap(&cx.name(other)))));
    }
    cx.event(std::slice::from_ref(other), None)
}

pub(crate) fn execute(event: &mut GraphEvent, world: &mut World) -> Result<Vec<GraphEvent>> {
    let actor = event.actor_id().clone();
    match event.tag() {
        EventTag::Hit => execute_hit(event, world, &actor),
        EventTag::Hug => {
            let other = target(event, 0)?;
            let graph = world.graph();
            let (who, them) = (cap(&name(graph, &actor)), name(graph, &other));
            capture(
                event,
                Audience::Room,
                Some(format!("You hug {}.", them)),
                Some(format!("{} hugs you.", who)),
                Some(format!("{} hugs {}.", who, them)),
            );
            Ok(Vec::new())
        }
        EventTag::Death => execute_death(event, world, &actor),
        other => Err(Error::invariant(format!("{} routed to combat", other))),
    }
}

/// Sum of a stat over everything an agent wears or wields.
pub fn equipped_stat(graph: &Graph, agent: &NodeId, stat: &str) -> Result<i32> {
    Ok(graph
        .equipped(agent)?
        .iter()
        .filter_map(|id| graph.object(id).ok())
        .map(|o| o.stat(stat))
        .sum())
}

/// Damage that gets through a defense roll.
pub fn damage_dealt(attack: i32, defense: i32) -> i32 {
    (attack - defense).max(0)
}

fn execute_hit(event: &mut GraphEvent, world: &mut World, actor: &NodeId) -> Result<Vec<GraphEvent>> {
    let victim = target(event, 0)?;
    let (damage, defense, health) = {
        let graph = world.graph();
        let damage = graph.agent(actor)?.damage + equipped_stat(graph, actor, "damage")?;
        let them = graph.agent(&victim)?;
        let defense = them.defense + equipped_stat(graph, &victim, "defense")?;
        (damage, defense, them.health)
    };

    let attack = world.roll(&mut event.rolls, 0, 1, damage.max(1));
    let blocked = world.roll(&mut event.rolls, 1, 0, defense.max(0));
    let dealt = damage_dealt(attack, blocked);
    let health_after = (health - dealt).max(0);
    {
        let them = world.graph_mut().agent_mut(&victim)?;
        them.health = health_after;
        if health_after == 0 {
            them.dying = true;
        }
    }
    event.kind = EventKind::Hit {
        attack,
        defense: blocked,
        dealt,
        health_after,
    };

    let graph = world.graph();
    let (who, them) = (cap(&name(graph, actor)), name(graph, &victim));
    if dealt > 0 {
        capture(
            event,
            Audience::Room,
            Some(format!("You hit {} for {} damage.", them, dealt)),
            Some(format!("{} hits you for {} damage!", who, dealt)),
            Some(format!("{} hits {}.", who, them)),
        );
    } else {
        capture(
            event,
            Audience::Room,
            Some(format!("You swing at {} but fail to hurt them.", them)),
            Some(format!("{} swings at you but doesn't hurt you.", who)),
            Some(format!("{} swings at {} and misses.", who, them)),
        );
    }

    if health_after == 0 {
        return Ok(vec![internal(world, EventTag::Death, &victim, &[], None)?]);
    }
    Ok(Vec::new())
}

fn execute_death(event: &mut GraphEvent, world: &mut World, dying: &NodeId) -> Result<Vec<GraphEvent>> {
    let here = room(event)?;
    let witnesses = world.graph().room_agents(&here)?;
    let who = cap(&name(world.graph(), dying));

    world.graph_mut().agent_mut(dying)?.dead = true;
    let corpse = world.graph_mut().agent_die(dying)?;
    info!(agent = %dying, corpse = %corpse, "Agent died");

    event.kind = EventKind::Death {
        corpse: Some(corpse),
    };
    capture(
        event,
        Audience::Agents(witnesses),
        Some("You have died.".into()),
        None,
        Some(format!("{} died!", who)),
    );
    Ok(Vec::new())
}

pub(crate) fn propose(graph: &Graph, actor: &NodeId, room: &NodeId, verb: &str) -> Result<Vec<String>> {
    Ok(graph
        .room_agents(room)?
        .iter()
        .filter(|a| *a != actor)
        .filter_map(|a| graph.get(a))
        .map(|a| format!("{} {}", verb, a.name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::damage_dealt;

    #[test]
    fn defense_never_heals() {
        assert_eq!(damage_dealt(5, 2), 3);
        assert_eq!(damage_dealt(1, 4), 0);
    }
}
