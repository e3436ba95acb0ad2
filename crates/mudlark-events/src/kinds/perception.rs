//! Look, Examine, Inventory, Health, Help, Wait

use super::{capture, first, room, target, token};
use crate::error::{ActionResult, Error, Result};
use crate::event::{Audience, EventTag, GraphEvent};
use crate::narrate::{cap, health_phrase, list, name};
use crate::pipeline::{Cx, Resolved};
use crate::scope::Scope;
use crate::world::World;
use mudlark_core::{EquipSlot, Graph, NodeId};

pub(crate) fn resolve(cx: &Cx<'_>, tokens: &[String]) -> ActionResult<Resolved> {
    if cx.tag != EventTag::Examine {
        return Ok(Resolved::nothing());
    }
    let wanted = token(tokens, 0);
    if let Some(found) = Scope::Nearby.find(cx.graph, &cx.actor, &cx.room, wanted)? {
        return Ok(Resolved::targets(vec![found]));
    }
    match cx.graph.find_path(&cx.room, wanted) {
        Some(path) => Ok(Resolved {
            targets: vec![path.target_id.clone()],
            text: Some(path.label.clone()),
        }),
        None => Err(cx.not_found(Scope::Nearby.missing(wanted))),
    }
}

pub(crate) fn construct(cx: &Cx<'_>, resolved: Resolved) -> ActionResult<GraphEvent> {
    match cx.tag {
        EventTag::Examine => {
            let seen = first(cx, &resolved)?;
            cx.event(std::slice::from_ref(seen), resolved.text.clone())
        }
        _ => cx.event(&[], None),
    }
}

pub(crate) fn execute(event: &mut GraphEvent, world: &mut World) -> Result<Vec<GraphEvent>> {
    let actor = event.actor_id().clone();
    let graph = world.graph();
    match event.tag() {
        EventTag::Look => {
            let here = graph.room_of(&actor)?;
            let text = describe_room(graph, &here, &actor)?;
            capture(event, Audience::Actor, Some(text), None, None);
        }
        EventTag::Examine => {
            let seen = target(event, 0)?;
            let here = room(event)?;
            let who = cap(&name(graph, &actor));
            if let Some(label) = event.text.clone() {
                let text = describe_path(graph, &here, &seen, &label)?;
                capture(event, Audience::Actor, Some(text), None, None);
            } else if seen == here {
                let text = describe_room(graph, &here, &actor)?;
                capture(event, Audience::Actor, Some(text), None, None);
            } else if seen == actor {
                let text = describe_self(graph, &actor, world.config().max_health)?;
                capture(event, Audience::Actor, Some(text), None, None);
            } else {
                let text = describe_node(graph, &seen, world.config().max_health)?;
                let others = format!("{} examines {}.", who, name(graph, &seen));
                capture(
                    event,
                    Audience::Room,
                    Some(text),
                    Some(format!("{} looks you over.", who)),
                    Some(others),
                );
            }
        }
        EventTag::Inventory => {
            let text = describe_inventory(graph, &actor, "You are")?;
            capture(event, Audience::Actor, Some(text), None, None);
        }
        EventTag::Health => {
            let health = graph.agent(&actor)?.health;
            let phrase = health_phrase(health, world.config().max_health);
            let text = format!("You are {} ({} health).", phrase, health);
            capture(event, Audience::Actor, Some(text), None, None);
        }
        EventTag::Help => {
            let lines: Vec<String> = EventTag::ALL
                .iter()
                .filter_map(EventTag::usage)
                .map(|u| format!("  {}", u))
                .collect();
            let text = format!("You can:\n{}", lines.join("\n"));
            capture(event, Audience::Actor, Some(text), None, None);
        }
        EventTag::Wait => {
            capture(event, Audience::Actor, Some("You wait.".into()), None, None);
        }
        other => return Err(Error::invariant(format!("{} routed to perception", other))),
    }
    Ok(Vec::new())
}

/// Full view of a room from inside it.
pub fn describe_room(graph: &Graph, room: &NodeId, viewer: &NodeId) -> Result<String> {
    let node = graph.node(room)?;
    let mut lines = vec![cap(&node.view_name())];
    if !node.desc.is_empty() {
        lines.push(node.desc.clone());
    }

    let objects: Vec<String> = graph
        .room_objects(room)?
        .iter()
        .map(|id| name(graph, id))
        .collect();
    if !objects.is_empty() {
        lines.push(format!("You see {}.", list(&objects)));
    }

    let agents: Vec<String> = graph
        .room_agents(room)?
        .iter()
        .filter(|id| *id != viewer)
        .map(|id| name(graph, id))
        .collect();
    match agents.len() {
        0 => {}
        1 => lines.push(format!("{} is here.", cap(&agents[0]))),
        _ => lines.push(format!("{} are here.", cap(&list(&agents)))),
    }

    let exits: Vec<String> = graph
        .room(room)?
        .neighbors
        .values()
        .map(|p| p.label.clone())
        .collect();
    match exits.len() {
        0 => lines.push("There is no obvious way out.".into()),
        1 => lines.push(format!("There is a path to {}.", exits[0])),
        _ => lines.push(format!("There are paths to {}.", list(&exits))),
    }
    Ok(lines.join("\n"))
}

fn describe_path(graph: &Graph, room: &NodeId, dest: &NodeId, label: &str) -> Result<String> {
    let path = graph
        .path(room, dest)
        .ok_or_else(|| Error::invariant(format!("no path from {} to {}", room, dest)))?;
    let mut text = match &path.examine_desc {
        Some(desc) => desc.clone(),
        None => format!("The path to {} leads to {}.", label, name(graph, dest)),
    };
    if let Some(lock) = &path.locked_edge {
        text.push_str(if lock.locked { " It is locked." } else { " It is unlocked." });
    }
    Ok(text)
}

fn describe_self(graph: &Graph, actor: &NodeId, max_health: i32) -> Result<String> {
    let health = graph.agent(actor)?.health;
    let node = graph.node(actor)?;
    let mut lines = vec![format!("You are {}, {}.", node.name, health_phrase(health, max_health))];
    if !node.desc.is_empty() {
        lines.push(node.desc.clone());
    }
    lines.push(describe_inventory(graph, actor, "You are")?);
    Ok(lines.join("\n"))
}

fn describe_node(graph: &Graph, id: &NodeId, max_health: i32) -> Result<String> {
    let node = graph.node(id)?;
    let title = cap(&node.view_name());
    let mut lines = vec![if node.desc.is_empty() {
        format!("{} looks ordinary.", title)
    } else {
        node.desc.clone()
    }];
    if let Some(agent) = node.as_agent() {
        lines.push(format!("{} is {}.", title, health_phrase(agent.health, max_health)));
        let equipped = graph.equipped(id)?;
        if !equipped.is_empty() {
            lines.push(describe_equipped(graph, &equipped, &format!("{} is", title))?);
        }
    } else if let Some(object) = node.as_object() {
        if object.is_container {
            if object.is_locked() {
                lines.push("It is locked.".into());
            } else {
                let inside: Vec<String> = graph.contents(id)?.iter().map(|c| name(graph, c)).collect();
                lines.push(format!("Inside you see {}.", list(&inside)));
            }
        }
    }
    Ok(lines.join("\n"))
}

/// "You are carrying ..." plus worn and wielded lines. `subject` is the
/// sentence start ("You are", "Bob is").
pub fn describe_inventory(graph: &Graph, agent: &NodeId, subject: &str) -> Result<String> {
    let carried: Vec<String> = graph.carried(agent)?.iter().map(|c| name(graph, c)).collect();
    let mut lines = vec![format!("{} carrying {}.", subject, list(&carried))];
    let equipped = graph.equipped(agent)?;
    if !equipped.is_empty() {
        lines.push(describe_equipped(graph, &equipped, subject)?);
    }
    Ok(lines.join("\n"))
}

fn describe_equipped(graph: &Graph, equipped: &[NodeId], subject: &str) -> Result<String> {
    let mut lines = Vec::new();
    for slot in [EquipSlot::Worn, EquipSlot::Wielded] {
        let items: Vec<String> = equipped
            .iter()
            .filter(|id| graph.object(id).is_ok_and(|o| o.equipped == Some(slot)))
            .map(|id| name(graph, id))
            .collect();
        if !items.is_empty() {
            lines.push(format!("{} {} {}.", subject, slot.verb_past(), list(&items)));
        }
    }
    Ok(lines.join("\n"))
}

pub(crate) fn propose(graph: &Graph, actor: &NodeId, room: &NodeId, verb: &str) -> Result<Vec<String>> {
    Ok(Scope::Nearby
        .candidates(graph, actor, room)?
        .iter()
        .filter(|id| *id != actor)
        .filter_map(|id| graph.get(id))
        .map(|n| format!("{} {}", verb, n.name))
        .collect())
}
