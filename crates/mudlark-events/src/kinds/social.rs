//! Say, Shout, Whisper, Tell, Emote

use super::{capture, first, room, target, token};
use crate::error::{ActionResult, Error, Result};
use crate::event::{Audience, EventKind, EventTag, GraphEvent};
use crate::narrate::{cap, name, third_person, unquote};
use crate::pipeline::{Cx, Resolved};
use crate::scope::Scope;
use crate::world::World;
use mudlark_core::Node;

/// Gestures usable with `emote <word>` or as a bare command.
pub const EMOTES: &[&str] = &[
    "laugh", "cry", "smile", "nod", "wave", "frown", "shrug", "grin", "sigh", "dance", "blush",
    "wink", "yawn", "gasp", "ponder", "scream", "groan", "growl",
];

pub(crate) fn resolve(cx: &Cx<'_>, tokens: &[String]) -> ActionResult<Resolved> {
    match cx.tag {
        EventTag::Say | EventTag::Shout => Ok(Resolved {
            targets: Vec::new(),
            text: Some(token(tokens, 0).to_string()),
        }),
        EventTag::Emote => {
            let gesture = token(tokens, 0).to_lowercase();
            if !EMOTES.contains(&gesture.as_str()) {
                return Err(cx.not_found(format!("You don't know how to {}.", gesture)));
            }
            Ok(Resolved {
                targets: Vec::new(),
                text: Some(gesture),
            })
        }
        _ => {
            let listener = cx.require_where(Scope::Nearby, token(tokens, 0), Node::is_agent, |cx, guess| {
                format!("{} isn't someone you can talk to.", cap(&cx.the(guess)))
            })?;
            let said = unquote(token(tokens, 1));
            if said.is_empty() {
                return Err(cx.parse_error(format!("What do you want to {}?", cx.verb())));
            }
            Ok(Resolved {
                targets: vec![listener],
                text: Some(said.to_string()),
            })
        }
    }
}

pub(crate) fn construct(cx: &Cx<'_>, resolved: Resolved) -> ActionResult<GraphEvent> {
    match cx.tag {
        EventTag::Whisper | EventTag::Tell => {
            let listener = first(cx, &resolved)?;
            if listener == &cx.actor {
                return Err(cx.refuse("Talking to yourself won't help."));
            }
            cx.event(std::slice::from_ref(listener), resolved.text.clone())
        }
        _ => cx.event(&[], resolved.text.clone()),
    }
}

pub(crate) fn execute(event: &mut GraphEvent, world: &mut World) -> Result<Vec<GraphEvent>> {
    let actor = event.actor_id().clone();
    let said = event.text.clone().unwrap_or_default();
    let graph = world.graph();
    let who = cap(&name(graph, &actor));
    match event.tag() {
        EventTag::Say => capture(
            event,
            Audience::Room,
            Some(format!("You said \"{}\".", said)),
            None,
            Some(format!("{} said \"{}\".", who, said)),
        ),
        EventTag::Shout => {
            let here = room(event)?;
            let mut listeners = Vec::new();
            for nearby in graph.rooms_within(&here, world.config().shout_range)? {
                listeners.extend(graph.room_agents(&nearby)?);
            }
            event.kind = EventKind::Shout {
                listeners: listeners.clone(),
            };
            capture(
                event,
                Audience::Agents(listeners),
                Some(format!("You shouted \"{}\".", said)),
                None,
                Some(format!("{} shouted \"{}\".", who, said)),
            );
        }
        EventTag::Whisper => {
            let them = name(graph, &target(event, 0)?);
            capture(
                event,
                Audience::Room,
                Some(format!("You whispered \"{}\" to {}.", said, them)),
                Some(format!("{} whispered \"{}\" to you.", who, said)),
                Some(format!("{} whispered something to {}.", who, them)),
            );
        }
        EventTag::Tell => {
            let them = name(graph, &target(event, 0)?);
            capture(
                event,
                Audience::Room,
                Some(format!("You told {} \"{}\".", them, said)),
                Some(format!("{} told you \"{}\".", who, said)),
                Some(format!("{} told {} \"{}\".", who, them, said)),
            );
        }
        EventTag::Emote => capture(
            event,
            Audience::Room,
            Some(format!("You {}.", said)),
            None,
            Some(format!("{} {}.", who, third_person(&said))),
        ),
        other => return Err(Error::invariant(format!("{} routed to social", other))),
    }
    Ok(Vec::new())
}
