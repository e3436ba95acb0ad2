//! Wear, Wield, Remove

use super::{capture, first, target, token};
use crate::error::{ActionResult, Error, Result};
use crate::event::{Audience, EventTag, GraphEvent};
use crate::kinds::items::held;
use crate::narrate::{cap, name};
use crate::pipeline::{Cx, Resolved};
use crate::scope::Scope;
use crate::world::World;
use mudlark_core::{EquipSlot, Graph, Node, NodeId, ObjectData};

fn fits_slot(tag: EventTag, object: &ObjectData) -> bool {
    match tag {
        EventTag::Wear => object.is_wearable,
        EventTag::Wield => object.is_weapon,
        _ => false,
    }
}

pub(crate) fn resolve(cx: &Cx<'_>, tokens: &[String]) -> ActionResult<Resolved> {
    let wanted = token(tokens, 0);
    let item = match cx.tag {
        EventTag::Remove => cx.require_where(Scope::Equipped, wanted, Node::is_object, |cx, guess| {
            format!("You can't remove {}.", cx.the(guess))
        })?,
        _ => {
            let item = held(cx, wanted)?;
            if !fits_slot(cx.tag, cx.graph.object(&item)?) {
                return Err(cx.wrong(format!("You can't {} {}.", cx.verb(), cx.the(&item)), &item));
            }
            item
        }
    };
    Ok(Resolved::targets(vec![item]))
}

pub(crate) fn construct(cx: &Cx<'_>, resolved: Resolved) -> ActionResult<GraphEvent> {
    let item = first(cx, &resolved)?;
    let agent = cx.graph.agent(&cx.actor)?;
    match cx.tag {
        EventTag::Wear if agent.num_wearable_items >= agent.max_wearable_items => {
            Err(cx.refuse("You can't wear anything more."))
        }
        EventTag::Wield if agent.num_wieldable_items >= agent.max_wieldable_items => {
            Err(cx.refuse("Your hands are full."))
        }
        _ => cx.event(std::slice::from_ref(item), None),
    }
}

pub(crate) fn execute(event: &mut GraphEvent, world: &mut World) -> Result<Vec<GraphEvent>> {
    let actor = event.actor_id().clone();
    let item = target(event, 0)?;
    let (who, thing) = {
        let graph = world.graph();
        (cap(&name(graph, &actor)), name(graph, &item))
    };
    let graph = world.graph_mut();
    let (verb_you, verb_them) = match event.tag() {
        EventTag::Wear => {
            graph.object_mut(&item)?.equipped = Some(EquipSlot::Worn);
            graph.agent_mut(&actor)?.num_wearable_items += 1;
            ("wear", "wears")
        }
        EventTag::Wield => {
            graph.object_mut(&item)?.equipped = Some(EquipSlot::Wielded);
            graph.agent_mut(&actor)?.num_wieldable_items += 1;
            ("wield", "wields")
        }
        EventTag::Remove => {
            let slot = graph.object_mut(&item)?.equipped.take();
            let agent = graph.agent_mut(&actor)?;
            match slot {
                Some(EquipSlot::Worn) => {
                    agent.num_wearable_items = agent.num_wearable_items.saturating_sub(1)
                }
                Some(EquipSlot::Wielded) => {
                    agent.num_wieldable_items = agent.num_wieldable_items.saturating_sub(1)
                }
                None => {}
            }
            ("remove", "removes")
        }
        other => return Err(Error::invariant(format!("{} routed to equipment", other))),
    };
    capture(
        event,
        Audience::Room,
        Some(format!("You {} {}.", verb_you, thing)),
        None,
        Some(format!("{} {} {}.", who, verb_them, thing)),
    );
    Ok(Vec::new())
}

pub(crate) fn propose(graph: &Graph, actor: &NodeId, tag: EventTag, verb: &str) -> Result<Vec<String>> {
    let items = match tag {
        EventTag::Remove => graph.equipped(actor)?,
        _ => graph
            .carried(actor)?
            .into_iter()
            .filter(|id| graph.object(id).is_ok_and(|o| fits_slot(tag, o)))
            .collect(),
    };
    Ok(items
        .iter()
        .filter_map(|id| graph.get(id))
        .map(|n| format!("{} {}", verb, n.name))
        .collect())
}
