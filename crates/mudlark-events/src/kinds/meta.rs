//! Kinds that are never typed: Leave, Arrive, TriggerFollow, Death, Error,
//! Spawn. Only Error and Spawn execute here; the rest belong to their
//! families.

use super::{capture, internal};
use crate::error::{ActionResult, Error, Result};
use crate::event::{Audience, EventTag, GraphEvent};
use crate::narrate::{cap, name};
use crate::pipeline::{Cx, Resolved};
use crate::world::World;

pub(crate) fn resolve(cx: &Cx<'_>, _tokens: &[String]) -> ActionResult<Resolved> {
    Err(cx.parse_error("That can't be done on purpose."))
}

pub(crate) fn construct(cx: &Cx<'_>, _resolved: Resolved) -> ActionResult<GraphEvent> {
    Err(Error::invariant(format!("{} events are only created by other events", cx.tag)).into())
}

pub(crate) fn execute(event: &mut GraphEvent, world: &mut World) -> Result<Vec<GraphEvent>> {
    match event.tag() {
        // Narration is set when the refusal is recorded.
        EventTag::Error => Ok(Vec::new()),
        EventTag::Spawn => {
            let actor = event.actor_id().clone();
            let who = name(world.graph(), &actor);
            capture(
                event,
                Audience::Room,
                Some(format!("You wake up as {}.", who)),
                None,
                Some(format!("{} stirs and looks around.", cap(&who))),
            );
            Ok(vec![internal(world, EventTag::Look, &actor, &[], None)?])
        }
        other => Err(Error::invariant(format!("{} routed to meta", other))),
    }
}
