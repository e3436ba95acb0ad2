//! Get, Put, Drop, Give, Steal

use super::{capture, first, room, target, token};
use crate::error::{ActionResult, Error, Result};
use crate::event::{Audience, EventKind, EventTag, GraphEvent};
use crate::narrate::{cap, name};
use crate::pipeline::{Cx, Resolved};
use crate::scope::Scope;
use crate::world::World;
use mudlark_core::{Graph, Node, NodeId};

fn is_gettable(node: &Node) -> bool {
    node.as_object().is_some_and(|o| o.is_gettable)
}

fn is_container(node: &Node) -> bool {
    node.as_object().is_some_and(|o| o.is_container)
}

fn is_unequipped(node: &Node) -> bool {
    node.as_object().is_some_and(|o| o.equipped.is_none())
}

/// Something the actor holds in hand.
pub(crate) fn held(cx: &Cx<'_>, wanted: &str) -> ActionResult<NodeId> {
    cx.require_where(Scope::Inventory, wanted, is_unequipped, |cx, guess| {
        if cx.graph.get(guess).is_some_and(Node::is_object) {
            format!("You need to remove {} first.", cx.the(guess))
        } else {
            format!("You can't {} {}.", cx.verb(), cx.the(guess))
        }
    })
}

pub(crate) fn resolve(cx: &Cx<'_>, tokens: &[String]) -> ActionResult<Resolved> {
    match cx.tag {
        EventTag::Get if tokens.len() < 2 => {
            let item = cx.require_where(Scope::Room, token(tokens, 0), is_gettable, |cx, guess| {
                format!("You can't pick up {}.", cx.the(guess))
            })?;
            Ok(Resolved::targets(vec![item]))
        }
        EventTag::Get => {
            let container = cx.require_where(Scope::Nearby, token(tokens, 1), is_container, |cx, guess| {
                format!("There's nothing inside {}.", cx.the(guess))
            })?;
            let wanted = token(tokens, 0);
            let inside = cx.graph.contents(&container)?;
            let item = cx.graph.find_in(&inside, wanted).ok_or_else(|| {
                cx.not_found(format!("You don't see {} in {}.", wanted, cx.the(&container)))
            })?;
            if !cx.graph.get(&item).is_some_and(is_gettable) {
                return Err(cx.wrong(format!("You can't pick up {}.", cx.the(&item)), &item));
            }
            Ok(Resolved::targets(vec![item, container]))
        }
        EventTag::Put => {
            let item = held(cx, token(tokens, 0))?;
            let container = cx.require_where(Scope::Nearby, token(tokens, 1), is_container, |cx, guess| {
                format!("{} can't hold anything.", cap(&cx.the(guess)))
            })?;
            Ok(Resolved::targets(vec![item, container]))
        }
        EventTag::Drop => Ok(Resolved::targets(vec![held(cx, token(tokens, 0))?])),
        EventTag::Give => {
            let item = held(cx, token(tokens, 0))?;
            let recipient = cx.require_where(Scope::Nearby, token(tokens, 1), Node::is_agent, |cx, guess| {
                format!("You can't give things to {}.", cx.the(guess))
            })?;
            Ok(Resolved::targets(vec![recipient, item]))
        }
        EventTag::Steal => {
            let victim = cx.require_where(Scope::Nearby, token(tokens, 1), Node::is_agent, |cx, guess| {
                format!("You can't steal from {}.", cx.the(guess))
            })?;
            let wanted = token(tokens, 0);
            let carried = cx.graph.carried(&victim)?;
            let item = cx.graph.find_in(&carried, wanted).ok_or_else(|| {
                cx.not_found(format!("{} doesn't have {}.", cap(&cx.name(&victim)), wanted))
            })?;
            Ok(Resolved::targets(vec![victim, item]))
        }
        _ => Err(cx.parse_error("That isn't something you do with things.")),
    }
}

pub(crate) fn construct(cx: &Cx<'_>, resolved: Resolved) -> ActionResult<GraphEvent> {
    let primary = first(cx, &resolved)?;
    let second = resolved.targets.get(1);
    match cx.tag {
        EventTag::Get => {
            if let Some(container) = second {
                if cx.graph.object(container)?.is_locked() {
                    return Err(cx.refuse(format!("{} is locked.", cap(&cx.the(container)))));
                }
            }
            if !cx.graph.would_fit(&cx.actor, primary) {
                return Err(cx.refuse(format!("{} is too big for you to carry.", cap(&cx.the(primary)))));
            }
        }
        EventTag::Put => {
            let container = second.ok_or_else(|| cx.parse_error("Put it where?"))?;
            if container == primary {
                return Err(cx.refuse(format!("You can't put {} inside itself.", cx.the(primary))));
            }
            if cx.graph.object(container)?.is_locked() {
                return Err(cx.refuse(format!("{} is locked.", cap(&cx.the(container)))));
            }
            if cx.graph.all_contained(primary)?.contains(container) {
                return Err(cx.refuse(format!(
                    "{} is inside {}.",
                    cap(&cx.the(container)),
                    cx.the(primary)
                )));
            }
            if !cx.graph.would_fit(container, primary) {
                return Err(cx.refuse(format!(
                    "{} has no room for {}.",
                    cap(&cx.the(container)),
                    cx.the(primary)
                )));
            }
        }
        EventTag::Drop => {
            if !cx.graph.would_fit(&cx.room, primary) {
                return Err(cx.refuse(format!("There is no room here for {}.", cx.the(primary))));
            }
        }
        EventTag::Give | EventTag::Steal => {
            let item = second.ok_or_else(|| cx.parse_error(format!("What do you want to {}?", cx.verb())))?;
            if primary == &cx.actor {
                return Err(cx.refuse(format!("You can't {} yourself.", match cx.tag {
                    EventTag::Give => "give things to",
                    _ => "steal from",
                })));
            }
            let (taker, refusal) = match cx.tag {
                EventTag::Give => (primary, format!("{} can't carry {}.", cap(&cx.name(primary)), cx.the(item))),
                _ => (&cx.actor, format!("{} is too big for you to carry.", cap(&cx.the(item)))),
            };
            if !cx.graph.would_fit(taker, item) {
                return Err(cx.refuse(refusal));
            }
        }
        _ => return Err(cx.parse_error("That isn't something you do with things.")),
    }
    cx.event(&resolved.targets, None)
}

/// Whether a thief gets away with it.
pub fn steal_succeeds(roll: i32, thief_dex: i32, victim_dex: i32) -> bool {
    roll + (thief_dex - victim_dex).clamp(-8, 8) > 10
}

pub(crate) fn execute(event: &mut GraphEvent, world: &mut World) -> Result<Vec<GraphEvent>> {
    let actor = event.actor_id().clone();
    let primary = target(event, 0)?;
    let who = cap(&name(world.graph(), &actor));
    match event.tag() {
        EventTag::Get => {
            let item = name(world.graph(), &primary);
            let from = match event.target_id(1) {
                Some(container) => format!(" from {}", name(world.graph(), container)),
                None => String::new(),
            };
            world.graph_mut().move_to(&primary, &actor)?;
            capture(
                event,
                Audience::Room,
                Some(format!("You get {}{}.", item, from)),
                None,
                Some(format!("{} gets {}{}.", who, item, from)),
            );
        }
        EventTag::Put => {
            let container = target(event, 1)?;
            let (item, into) = (name(world.graph(), &primary), name(world.graph(), &container));
            world.graph_mut().move_to(&primary, &container)?;
            capture(
                event,
                Audience::Room,
                Some(format!("You put {} in {}.", item, into)),
                None,
                Some(format!("{} puts {} in {}.", who, item, into)),
            );
        }
        EventTag::Drop => {
            let here = room(event)?;
            let item = name(world.graph(), &primary);
            world.graph_mut().move_to(&primary, &here)?;
            capture(
                event,
                Audience::Room,
                Some(format!("You drop {}.", item)),
                None,
                Some(format!("{} drops {}.", who, item)),
            );
        }
        EventTag::Give => {
            let item = target(event, 1)?;
            let (them, thing) = (name(world.graph(), &primary), name(world.graph(), &item));
            world.graph_mut().move_to(&item, &primary)?;
            capture(
                event,
                Audience::Room,
                Some(format!("You give {} to {}.", thing, them)),
                Some(format!("{} gives you {}.", who, thing)),
                Some(format!("{} gives {} to {}.", who, thing, them)),
            );
        }
        EventTag::Steal => {
            let item = target(event, 1)?;
            let graph = world.graph();
            let (them, thing) = (name(graph, &primary), name(graph, &item));
            let (thief_dex, victim_dex) = (graph.agent(&actor)?.dexterity, graph.agent(&primary)?.dexterity);
            let sides = world.config().steal_roll_sides;
            let roll = world.roll(&mut event.rolls, 0, 0, sides);
            let success = steal_succeeds(roll, thief_dex, victim_dex);
            event.kind = EventKind::Steal { success };
            if success {
                world.graph_mut().move_to(&item, &actor)?;
                capture(
                    event,
                    Audience::Room,
                    Some(format!("You steal {} from {}.", thing, them)),
                    Some(format!("{} stole {} from you!", who, thing)),
                    Some(format!("{} steals {} from {}.", who, thing, them)),
                );
            } else {
                capture(
                    event,
                    Audience::Room,
                    Some(format!("You fail to steal {} from {}.", thing, them)),
                    Some(format!("{} tried to steal {} from you!", who, thing)),
                    Some(format!("{} tries to steal from {} and fails.", who, them)),
                );
            }
        }
        other => return Err(Error::invariant(format!("{} routed to items", other))),
    }
    Ok(Vec::new())
}

pub(crate) fn propose(
    graph: &Graph,
    actor: &NodeId,
    room: &NodeId,
    tag: EventTag,
    verb: &str,
) -> Result<Vec<String>> {
    let label = |id: &NodeId| graph.get(id).map(|n| n.name.clone());
    let carried: Vec<String> = graph.carried(actor)?.iter().filter_map(label).collect();
    let others: Vec<NodeId> = graph.room_agents(room)?.into_iter().filter(|a| a != actor).collect();
    let mut out = Vec::new();
    match tag {
        EventTag::Get => {
            for id in graph.room_objects(room)? {
                let Some(node) = graph.get(&id) else { continue };
                if is_gettable(node) {
                    out.push(format!("{} {}", verb, node.name));
                }
                if node.as_object().is_some_and(|o| o.is_container && !o.is_locked()) {
                    for inner in graph.contents(&id)?.iter().filter_map(label) {
                        out.push(format!("{} {} from {}", verb, inner, node.name));
                    }
                }
            }
        }
        EventTag::Put => {
            let mut containers = graph.room_objects(room)?;
            containers.extend(graph.carried(actor)?);
            for container in containers.iter().filter(|c| graph.get(c).is_some_and(is_container)) {
                let Some(into) = label(container) else { continue };
                for item in carried.iter().filter(|i| **i != into) {
                    out.push(format!("{} {} in {}", verb, item, into));
                }
            }
        }
        EventTag::Drop => out.extend(carried.iter().map(|i| format!("{} {}", verb, i))),
        EventTag::Give => {
            for them in others.iter().filter_map(label) {
                out.extend(carried.iter().map(|i| format!("{} {} to {}", verb, i, them)));
            }
        }
        _ => {
            for victim in &others {
                let Some(them) = label(victim) else { continue };
                for item in graph.carried(victim)?.iter().filter_map(label) {
                    out.push(format!("{} {} from {}", verb, item, them));
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::steal_succeeds;

    #[test]
    fn steal_needs_to_beat_ten() {
        assert!(!steal_succeeds(10, 0, 0));
        assert!(steal_succeeds(11, 0, 0));
        assert!(steal_succeeds(3, 30, 0));
        assert!(!steal_succeeds(18, 0, 30));
    }
}
