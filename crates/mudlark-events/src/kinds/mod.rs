//! Per-kind behavior, grouped by family
//!
//! Each family module provides `resolve`, `construct` and `execute` for its
//! kinds, plus `propose`, which lists command texts worth trying when
//! enumerating legal actions.

pub mod combat;
pub mod consume;
pub mod equipment;
pub mod items;
pub mod locks;
pub mod meta;
pub mod movement;
pub mod perception;
pub mod social;

use crate::error::{ActionResult, Error, Result};
use crate::event::{Audience, EventTag, GraphEvent, NodeRef};
use crate::pipeline::{Cx, Resolved};
use crate::world::World;
use mudlark_core::{Graph, NodeId};

use EventTag as T;

pub(crate) fn resolve(cx: &Cx<'_>, tokens: &[String]) -> ActionResult<Resolved> {
    match cx.tag {
        T::Go | T::Follow | T::Unfollow | T::Block | T::Unblock => movement::resolve(cx, tokens),
        T::Look | T::Examine | T::Inventory | T::Health | T::Help | T::Wait => perception::resolve(cx, tokens),
        T::Say | T::Shout | T::Whisper | T::Tell | T::Emote => social::resolve(cx, tokens),
        T::Hit | T::Hug => combat::resolve(cx, tokens),
        T::Get | T::Put | T::Drop | T::Give | T::Steal => items::resolve(cx, tokens),
        T::Wear | T::Wield | T::Remove => equipment::resolve(cx, tokens),
        T::Eat | T::Drink => consume::resolve(cx, tokens),
        T::Lock | T::Unlock => locks::resolve(cx, tokens),
        T::Leave | T::Arrive | T::TriggerFollow | T::Death | T::Error | T::Spawn => meta::resolve(cx, tokens),
    }
}

pub(crate) fn construct(cx: &Cx<'_>, resolved: Resolved) -> ActionResult<GraphEvent> {
    match cx.tag {
        T::Go | T::Follow | T::Unfollow | T::Block | T::Unblock => movement::construct(cx, resolved),
        T::Look | T::Examine | T::Inventory | T::Health | T::Help | T::Wait => perception::construct(cx, resolved),
        T::Say | T::Shout | T::Whisper | T::Tell | T::Emote => social::construct(cx, resolved),
        T::Hit | T::Hug => combat::construct(cx, resolved),
        T::Get | T::Put | T::Drop | T::Give | T::Steal => items::construct(cx, resolved),
        T::Wear | T::Wield | T::Remove => equipment::construct(cx, resolved),
        T::Eat | T::Drink => consume::construct(cx, resolved),
        T::Lock | T::Unlock => locks::construct(cx, resolved),
        T::Leave | T::Arrive | T::TriggerFollow | T::Death | T::Error | T::Spawn => meta::construct(cx, resolved),
    }
}

pub(crate) fn execute(event: &mut GraphEvent, world: &mut World) -> Result<Vec<GraphEvent>> {
    match event.tag() {
        T::Go | T::Leave | T::Arrive | T::Follow | T::Unfollow | T::Block | T::Unblock | T::TriggerFollow => {
            movement::execute(event, world)
        }
        T::Look | T::Examine | T::Inventory | T::Health | T::Help | T::Wait => perception::execute(event, world),
        T::Say | T::Shout | T::Whisper | T::Tell | T::Emote => social::execute(event, world),
        T::Hit | T::Hug | T::Death => combat::execute(event, world),
        T::Get | T::Put | T::Drop | T::Give | T::Steal => items::execute(event, world),
        T::Wear | T::Wield | T::Remove => equipment::execute(event, world),
        T::Eat | T::Drink => consume::execute(event, world),
        T::Lock | T::Unlock => locks::execute(event, world),
        T::Error | T::Spawn => meta::execute(event, world),
    }
}

/// Command texts that might be legal for `actor` right now.
pub(crate) fn propose(graph: &Graph, actor: &NodeId, room: &NodeId, tag: EventTag) -> Result<Vec<String>> {
    let Some(verb) = tag.verb() else {
        return Ok(Vec::new());
    };
    match tag {
        T::Go | T::Follow | T::Block => movement::propose(graph, actor, room, tag, verb),
        T::Hit | T::Hug => combat::propose(graph, actor, room, verb),
        T::Examine => perception::propose(graph, actor, room, verb),
        T::Emote => Ok(social::EMOTES.iter().map(|e| format!("{} {}", verb, e)).collect()),
        T::Get | T::Put | T::Drop | T::Give | T::Steal => items::propose(graph, actor, room, tag, verb),
        T::Wear | T::Wield | T::Remove => equipment::propose(graph, actor, tag, verb),
        T::Eat | T::Drink => consume::propose(graph, actor, room, verb),
        T::Lock | T::Unlock => locks::propose(graph, actor, room, verb),
        T::Say | T::Shout | T::Whisper | T::Tell => Ok(Vec::new()),
        _ => Ok(vec![verb.to_string()]),
    }
}

/// Build an event directly, bypassing resolution. Used for follow-ons and
/// for kinds that cannot be typed.
pub(crate) fn internal(
    world: &World,
    tag: EventTag,
    actor: &NodeId,
    targets: &[NodeId],
    text: Option<String>,
) -> Result<GraphEvent> {
    let graph = world.graph();
    let refs = targets
        .iter()
        .map(|id| Ok(NodeRef::of(graph.node(id)?)))
        .collect::<Result<Vec<_>>>()?;
    let mut event = GraphEvent::new(tag, NodeRef::of(graph.node(actor)?), refs, text);
    if let Some(room) = graph.get_room(actor)? {
        event.room = Some(NodeRef::of(graph.node(&room)?));
    }
    Ok(event)
}

pub(crate) fn target(event: &GraphEvent, index: usize) -> Result<NodeId> {
    event.target_id(index).cloned().ok_or_else(|| {
        Error::invariant(format!("{} event is missing target {}", event.tag(), index))
    })
}

pub(crate) fn room(event: &GraphEvent) -> Result<NodeId> {
    event
        .room
        .as_ref()
        .map(|r| r.target_id.clone())
        .ok_or_else(|| Error::invariant(format!("{} event has no room", event.tag())))
}

/// Capture narration for each perspective and pick the audience.
pub(crate) fn capture(
    event: &mut GraphEvent,
    audience: Audience,
    actor: Option<String>,
    target: Option<String>,
    others: Option<String>,
) {
    event.narration.actor = actor;
    event.narration.target = target;
    event.narration.others = others;
    event.audience = audience;
}

/// The first resolved target; resolution always supplies one for kinds
/// that take arguments.
pub(crate) fn first<'r>(cx: &Cx<'_>, resolved: &'r Resolved) -> ActionResult<&'r NodeId> {
    resolved
        .targets
        .first()
        .ok_or_else(|| cx.parse_error(format!("What do you want to {}?", cx.verb())))
}

pub(crate) fn token(tokens: &[String], index: usize) -> &str {
    tokens.get(index).map(String::as_str).unwrap_or("")
}
