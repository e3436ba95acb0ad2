//! Go, Leave, Arrive, Follow, Unfollow, Block, Unblock, TriggerFollow

use super::{capture, first, internal, room, target, token};
use crate::error::{ActionResult, Error, EventError, Result};
use crate::event::{Audience, EventKind, EventTag, GoOutcome, GraphEvent, NodeRef};
use crate::narrate::{cap, name};
use crate::pipeline::{Cx, Resolved};
use crate::scope::Scope;
use crate::world::World;
use mudlark_core::{Graph, Node, NodeId};
use tracing::debug;

pub(crate) fn resolve(cx: &Cx<'_>, tokens: &[String]) -> ActionResult<Resolved> {
    match cx.tag {
        EventTag::Go => {
            let wanted = token(tokens, 0);
            let path = cx
                .graph
                .find_path(&cx.room, wanted)
                .ok_or_else(|| cx.not_found("You can't go that way."))?;
            Ok(Resolved::targets(vec![path.target_id.clone()]))
        }
        EventTag::Follow | EventTag::Block => {
            let verb = cx.verb();
            let found = cx.require_where(Scope::Nearby, token(tokens, 0), Node::is_agent, |cx, guess| {
                format!("{} isn't someone you can {}.", cap(&cx.the(guess)), verb)
            })?;
            Ok(Resolved::targets(vec![found]))
        }
        _ => Ok(Resolved::nothing()),
    }
}

pub(crate) fn construct(cx: &Cx<'_>, resolved: Resolved) -> ActionResult<GraphEvent> {
    let agent = cx.graph.agent(&cx.actor)?;
    match cx.tag {
        EventTag::Go => go_towards(cx, first(cx, &resolved)?),
        EventTag::Follow => {
            let leader = first(cx, &resolved)?;
            if leader == &cx.actor {
                return Err(cx.refuse("You can't follow yourself."));
            }
            if agent.following.as_ref().is_some_and(|e| &e.target_id == leader) {
                return Err(cx.refuse(format!("You are already following {}.", cx.name(leader))));
            }
            cx.event(std::slice::from_ref(leader), None)
        }
        EventTag::Unfollow => match &agent.following {
            Some(edge) => cx.event(&[edge.target_id.clone()], None),
            None => Err(cx.refuse("You aren't following anyone.")),
        },
        EventTag::Block => {
            let victim = first(cx, &resolved)?;
            if victim == &cx.actor {
                return Err(cx.refuse("You can't block yourself."));
            }
            if agent.blocking.as_ref().is_some_and(|e| &e.target_id == victim) {
                return Err(cx.refuse(format!("You are already blocking {}.", cx.name(victim))));
            }
            cx.event(std::slice::from_ref(victim), None)
        }
        EventTag::Unblock => match &agent.blocking {
            Some(edge) => cx.event(&[edge.target_id.clone()], None),
            None => Err(cx.refuse("You aren't blocking anyone.")),
        },
        _ => Err(cx.parse_error("That isn't a movement.")),
    }
}

/// A Go event from the actor's room to a neighboring room.
pub(crate) fn go_towards(cx: &Cx<'_>, dest: &NodeId) -> ActionResult<GraphEvent> {
    let path = cx
        .graph
        .path(&cx.room, dest)
        .ok_or_else(|| cx.not_found("You can't go that way."))?;
    if path.is_locked() {
        return Err(cx.refuse(format!("The path to {} is locked.", path.label)));
    }
    if !cx.graph.would_fit(dest, &cx.actor) {
        return Err(cx.refuse(format!("{} is too crowded to enter.", cap(&cx.name(dest)))));
    }
    let mut event = cx.event(&[dest.clone()], Some(path.label.clone()))?;
    event.kind = EventKind::Go { outcome: None };
    Ok(event)
}

pub(crate) fn execute(event: &mut GraphEvent, world: &mut World) -> Result<Vec<GraphEvent>> {
    let actor = event.actor_id().clone();
    match event.tag() {
        EventTag::Go => execute_go(event, world, &actor),
        EventTag::Leave => {
            let label = event.text.clone().unwrap_or_default();
            let who = cap(&name(world.graph(), &actor));
            capture(
                event,
                Audience::RoomAndActor,
                Some(format!("You leave towards {}.", label)),
                None,
                Some(format!("{} left towards {}.", who, label)),
            );
            Ok(Vec::new())
        }
        EventTag::Arrive => {
            let here = room(event)?;
            let from = event.text.clone().unwrap_or_default();
            let graph = world.graph();
            let (you, who) = (name(graph, &here), cap(&name(graph, &actor)));
            capture(
                event,
                Audience::Room,
                Some(format!("You arrive at {}.", you)),
                None,
                Some(format!("{} arrived from {}.", who, from)),
            );
            Ok(Vec::new())
        }
        EventTag::Follow | EventTag::Unfollow | EventTag::Block | EventTag::Unblock => {
            execute_edge(event, world, &actor)
        }
        EventTag::TriggerFollow => execute_trigger_follow(event, world, &actor),
        other => Err(Error::invariant(format!("{} routed to movement", other))),
    }
}

fn execute_go(event: &mut GraphEvent, world: &mut World, actor: &NodeId) -> Result<Vec<GraphEvent>> {
    let dest = target(event, 0)?;
    let origin = world.graph().room_of(actor)?;
    let label = event.text.clone().unwrap_or_default();
    let mover = world.graph().agent(actor)?.clone();
    let cost = world.config().movement_cost;

    if mover.health <= cost {
        event.kind = EventKind::Go { outcome: Some(GoOutcome::Exhausted) };
        capture(event, Audience::Actor, Some("You are too exhausted to move.".into()), None, None);
        world.graph_mut().sever_stale_edges(actor)?;
        return Ok(Vec::new());
    }

    let sides = world.config().block_roll_sides;
    let mut blockers = Vec::new();
    for blocker in &mover.blocked_by {
        if world.graph().same_room(actor, blocker)? {
            blockers.push(blocker.clone());
        }
    }
    for (index, blocker) in blockers.iter().enumerate() {
        let their_dex = world.graph().agent(blocker)?.dexterity;
        let roll = world.roll(&mut event.rolls, index, 0, sides);
        if !escapes(roll, mover.dexterity, their_dex) {
            let graph = world.graph();
            let (them, who) = (cap(&name(graph, blocker)), cap(&name(graph, actor)));
            event.kind = EventKind::Go {
                outcome: Some(GoOutcome::Blocked { by: blocker.clone() }),
            };
            capture(
                event,
                Audience::Room,
                Some(format!("{} blocks your way!", them)),
                None,
                Some(format!("{} blocks {}'s way.", them, who)),
            );
            debug!(agent = %actor, blocker = %blocker, "Move blocked");
            // A follower left behind by its leader lets go here.
            world.graph_mut().sever_stale_edges(actor)?;
            return Ok(Vec::new());
        }
    }

    let graph = world.graph_mut();
    graph.move_to(actor, &dest)?;
    graph.agent_mut(actor)?.health -= cost;
    graph.sever_stale_edges(actor)?;
    event.kind = EventKind::Go { outcome: Some(GoOutcome::Moved) };
    capture(event, Audience::Nobody, None, None, None);

    let back = world.graph().get_view_from(&origin, &dest)?;
    let origin_ref = NodeRef::of(world.graph().node(&origin)?);
    let mut leave = internal(world, EventTag::Leave, actor, &[dest.clone()], Some(label.clone()))?;
    leave.room = Some(origin_ref.clone());
    let arrive = internal(world, EventTag::Arrive, actor, &[origin.clone()], Some(back))?;
    let look = internal(world, EventTag::Look, actor, &[], None)?;

    let mut follow_ons = vec![leave, arrive, look];
    for follower in &mover.followed_by {
        if world.graph().get_room(follower)?.as_ref() == Some(&origin) {
            let mut trigger = internal(
                world,
                EventTag::TriggerFollow,
                follower,
                &[actor.clone(), dest.clone()],
                Some(label.clone()),
            )?;
            trigger.room = Some(origin_ref.clone());
            follow_ons.push(trigger);
        }
    }
    Ok(follow_ons)
}

/// Whether a mover slips past one blocker.
pub fn escapes(roll: i32, mover_dex: i32, blocker_dex: i32) -> bool {
    roll + (mover_dex - blocker_dex).clamp(-8, 8) >= 10
}

fn execute_edge(event: &mut GraphEvent, world: &mut World, actor: &NodeId) -> Result<Vec<GraphEvent>> {
    let other = target(event, 0)?;
    let (who, them) = {
        let graph = world.graph();
        (cap(&name(graph, actor)), name(graph, &other))
    };
    let graph = world.graph_mut();
    let (you, target_text, others) = match event.tag() {
        EventTag::Follow => {
            graph.set_following(actor, Some(&other))?;
            (
                format!("You start following {}.", them),
                format!("{} starts following you.", who),
                format!("{} starts following {}.", who, them),
            )
        }
        EventTag::Unfollow => {
            graph.set_following(actor, None)?;
            (
                format!("You stop following {}.", them),
                format!("{} stops following you.", who),
                format!("{} stops following {}.", who, them),
            )
        }
        EventTag::Block => {
            graph.set_blocking(actor, Some(&other))?;
            (
                format!("You move to block {}.", them),
                format!("{} is blocking your way!", who),
                format!("{} moves to block {}.", who, them),
            )
        }
        _ => {
            graph.set_blocking(actor, None)?;
            (
                format!("You stop blocking {}.", them),
                format!("{} stops blocking you.", who),
                format!("{} stops blocking {}.", who, them),
            )
        }
    };
    capture(event, Audience::Room, Some(you), Some(target_text), Some(others));
    Ok(Vec::new())
}

fn execute_trigger_follow(event: &mut GraphEvent, world: &mut World, follower: &NodeId) -> Result<Vec<GraphEvent>> {
    let leader = target(event, 0)?;
    let dest = target(event, 1)?;
    let still_following = world
        .graph()
        .get(follower)
        .and_then(Node::as_agent)
        .is_some_and(|a| a.is_alive() && a.following.as_ref().is_some_and(|e| e.target_id == leader));
    if !still_following {
        capture(event, Audience::Nobody, None, None, None);
        return Ok(Vec::new());
    }

    let leader_name = name(world.graph(), &leader);
    let attempt = match Cx::new(world, follower, EventTag::Go) {
        Ok(cx) => go_towards(&cx, &dest),
        Err(err) => Err(err),
    };
    match attempt {
        Ok(go) => {
            event.kind = EventKind::TriggerFollow { followed: true };
            capture(
                event,
                Audience::Actor,
                Some(format!("You follow {}.", leader_name)),
                None,
                None,
            );
            Ok(vec![go])
        }
        Err(EventError::Action(err)) => {
            world.graph_mut().set_following(follower, None)?;
            capture(
                event,
                Audience::Actor,
                Some(format!("You lose track of {}. {}", leader_name, err.text)),
                None,
                None,
            );
            Ok(Vec::new())
        }
        Err(EventError::Core(err)) => Err(err),
    }
}

pub(crate) fn propose(graph: &Graph, actor: &NodeId, room: &NodeId, tag: EventTag, verb: &str) -> Result<Vec<String>> {
    if tag == EventTag::Go {
        return Ok(graph
            .room(room)?
            .neighbors
            .values()
            .map(|p| format!("{} {}", verb, p.label))
            .collect());
    }
    Ok(graph
        .room_agents(room)?
        .iter()
        .filter(|a| *a != actor)
        .filter_map(|a| graph.get(a))
        .map(|a| format!("{} {}", verb, a.name))
        .collect())
}
