//! Command text to constructed event
//!
//! `plan` runs the pure half of the lifecycle: verb dispatch, tokenization,
//! target resolution and construction. Nothing here mutates the world; a
//! refusal at any stage comes back as an `ActionError`.

use crate::error::{ActionError, ActionErrorKind, ActionResult, EventError};
use crate::event::{EventTag, GraphEvent, NodeRef, Shape};
use crate::kinds;
use crate::kinds::social::EMOTES;
use crate::narrate;
use crate::scope::Scope;
use crate::world::World;
use mudlark_core::{Graph, Node, NodeId};

/// Targets found for one tokenization, plus any free text.
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    pub targets: Vec<NodeId>,
    pub text: Option<String>,
}

impl Resolved {
    pub fn targets(targets: Vec<NodeId>) -> Self {
        Self { targets, text: None }
    }

    pub fn nothing() -> Self {
        Self::default()
    }
}

/// Everything resolution and construction need to know about a command.
pub struct Cx<'w> {
    pub world: &'w World,
    pub graph: &'w Graph,
    pub actor: NodeId,
    pub room: NodeId,
    pub tag: EventTag,
}

impl<'w> Cx<'w> {
    pub fn new(world: &'w World, actor: &NodeId, tag: EventTag) -> ActionResult<Self> {
        let graph = world.graph();
        let agent = graph.agent(actor)?;
        let room = graph.room_of(actor)?;
        let cx = Self {
            world,
            graph,
            actor: actor.clone(),
            room,
            tag,
        };
        if !agent.is_alive() {
            return Err(cx.refuse("You can't do anything, you're dead."));
        }
        Ok(cx)
    }

    fn error(&self, kind: ActionErrorKind, text: impl Into<String>, guess: Vec<NodeId>) -> EventError {
        EventError::Action(ActionError {
            kind,
            tag: Some(self.tag),
            actor: self.actor.clone(),
            text: text.into(),
            guess,
        })
    }

    pub fn parse_error(&self, text: impl Into<String>) -> EventError {
        self.error(ActionErrorKind::Parse, text, Vec::new())
    }

    pub fn not_found(&self, text: impl Into<String>) -> EventError {
        self.error(ActionErrorKind::Resolution, text, Vec::new())
    }

    /// Found something by that name, but not something the command accepts.
    pub fn wrong(&self, text: impl Into<String>, guess: &NodeId) -> EventError {
        self.error(ActionErrorKind::Resolution, text, vec![guess.clone()])
    }

    pub fn refuse(&self, text: impl Into<String>) -> EventError {
        self.error(ActionErrorKind::Construction, text, Vec::new())
    }

    pub fn verb(&self) -> &'static str {
        self.tag.verb().unwrap_or("do")
    }

    pub fn node(&self, id: &NodeId) -> ActionResult<&'w Node> {
        Ok(self.graph.node(id)?)
    }

    pub fn name(&self, id: &NodeId) -> String {
        narrate::name(self.graph, id)
    }

    pub fn the(&self, id: &NodeId) -> String {
        narrate::the(self.graph, id)
    }

    /// First node in `scope` called `name`.
    pub fn require(&self, scope: Scope, name: &str) -> ActionResult<NodeId> {
        scope
            .find(self.graph, &self.actor, &self.room, name)?
            .ok_or_else(|| self.not_found(scope.missing(name)))
    }

    /// First node in `scope` called `name` that satisfies `accept`. When
    /// something by that name exists but is rejected, the error names it.
    pub fn require_where(
        &self,
        scope: Scope,
        name: &str,
        accept: impl Fn(&Node) -> bool,
        rejected: impl FnOnce(&Self, &NodeId) -> String,
    ) -> ActionResult<NodeId> {
        let found = scope.find_all(self.graph, &self.actor, &self.room, name)?;
        if let Some(id) = found
            .iter()
            .find(|id| self.graph.get(id).is_some_and(&accept))
        {
            return Ok(id.clone());
        }
        match found.first() {
            Some(guess) => Err(self.wrong(rejected(self, guess), guess)),
            None => Err(self.not_found(scope.missing(name))),
        }
    }

    pub fn noderef(&self, id: &NodeId) -> ActionResult<NodeRef> {
        Ok(NodeRef::of(self.node(id)?))
    }

    /// A constructed, unexecuted event of this command's kind.
    pub fn event(&self, targets: &[NodeId], text: Option<String>) -> ActionResult<GraphEvent> {
        let refs = targets
            .iter()
            .map(|id| self.noderef(id))
            .collect::<ActionResult<Vec<_>>>()?;
        let mut event = GraphEvent::new(self.tag, self.noderef(&self.actor)?, refs, text);
        event.room = Some(self.noderef(&self.room)?);
        Ok(event)
    }
}

fn unrecognised(actor: &NodeId, text: String) -> EventError {
    EventError::Action(ActionError {
        kind: ActionErrorKind::Parse,
        tag: None,
        actor: actor.clone(),
        text,
        guess: Vec::new(),
    })
}

/// Pick the event kind for a command and return it with the argument text.
pub fn parse_command(world: &World, actor: &NodeId, text: &str) -> ActionResult<(EventTag, String)> {
    let text = text.trim();
    let (verb, rest) = match text.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb.to_lowercase(), rest.trim().to_string()),
        None => (text.to_lowercase(), String::new()),
    };
    if verb.is_empty() {
        return Err(unrecognised(actor, "What do you want to do?".to_string()));
    }

    match (verb.as_str(), rest.as_str()) {
        ("look" | "l", "") => return Ok((EventTag::Look, String::new())),
        ("look" | "l", _) => {
            let rest = rest.strip_prefix("at ").unwrap_or(&rest).trim().to_string();
            return Ok((EventTag::Examine, rest));
        }
        ("pick", _) => {
            let rest = rest.strip_prefix("up ").unwrap_or(&rest).trim().to_string();
            return Ok((EventTag::Get, rest));
        }
        _ => {}
    }

    if let Some(tag) = EventTag::from_verb(&verb) {
        return Ok((tag, rest));
    }
    if EMOTES.contains(&verb.as_str()) {
        return Ok((EventTag::Emote, verb));
    }
    let room = world.graph().room_of(actor)?;
    if world.graph().find_path(&room, text).is_some() {
        return Ok((EventTag::Go, text.to_string()));
    }
    Err(unrecognised(
        actor,
        format!("You don't know how to \"{}\". Type help for a list of commands.", verb),
    ))
}

/// Candidate tokenizations of the argument text, most specific first.
pub fn split_text_args(cx: &Cx<'_>, rest: &str) -> ActionResult<Vec<Vec<String>>> {
    let rest = rest.trim();
    let ask = || cx.parse_error(format!("What do you want to {}?", cx.verb()));
    match cx.tag.shape() {
        Shape::Bare => Ok(vec![Vec::new()]),
        Shape::One => {
            if rest.is_empty() {
                return Err(ask());
            }
            Ok(vec![vec![rest.to_string()]])
        }
        Shape::Text => {
            let said = narrate::unquote(rest);
            if said.is_empty() {
                return Err(ask());
            }
            Ok(vec![vec![said.to_string()]])
        }
        Shape::Pair { separators, optional } => {
            if rest.is_empty() {
                return Err(ask());
            }
            let words: Vec<&str> = rest.split_whitespace().collect();
            let mut out = Vec::new();
            for sep in separators {
                let sep_words: Vec<&str> = sep.split(' ').collect();
                let width = sep_words.len();
                for i in 1..words.len().saturating_sub(width) {
                    let hit = words[i..i + width]
                        .iter()
                        .zip(&sep_words)
                        .all(|(w, s)| w.eq_ignore_ascii_case(s));
                    if hit {
                        out.push(vec![words[..i].join(" "), words[i + width..].join(" ")]);
                    }
                }
            }
            if optional {
                out.push(vec![rest.to_string()]);
            }
            if out.is_empty() {
                let usage = cx.tag.usage().unwrap_or("help");
                return Err(cx.parse_error(format!("Try: {}", usage)));
            }
            Ok(out)
        }
        Shape::TargetText => {
            if let Some((target, said)) = rest.split_once('"') {
                let said = said.trim_end_matches('"').trim();
                if target.trim().is_empty() || said.is_empty() {
                    return Err(cx.parse_error(format!(
                        "Try: {}",
                        cx.tag.usage().unwrap_or("help")
                    )));
                }
                return Ok(vec![vec![target.trim().to_string(), said.to_string()]]);
            }
            let words: Vec<&str> = rest.split_whitespace().collect();
            if words.len() < 2 {
                return Err(cx.parse_error(format!(
                    "What do you want to {}, and to whom?",
                    cx.verb()
                )));
            }
            Ok((1..words.len())
                .map(|i| vec![words[..i].join(" "), words[i..].join(" ")])
                .collect())
        }
    }
}

/// Run everything up to construction. The first tokenization that resolves
/// wins; when none do, the first refusal is reported.
pub fn plan(world: &World, actor: &NodeId, text: &str) -> ActionResult<GraphEvent> {
    let (tag, rest) = parse_command(world, actor, text)?;
    let cx = Cx::new(world, actor, tag)?;
    let mut first_error = None;
    for tokens in split_text_args(&cx, &rest)? {
        match kinds::resolve(&cx, &tokens) {
            Ok(resolved) => return kinds::construct(&cx, resolved),
            Err(EventError::Action(err)) => {
                first_error.get_or_insert(err);
            }
            Err(other) => return Err(other),
        }
    }
    Err(match first_error {
        Some(err) => EventError::Action(err),
        None => cx.parse_error(format!("What do you want to {}?", cx.verb())),
    })
}
