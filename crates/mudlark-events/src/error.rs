//! Failure types of the command pipeline
//!
//! Two very different things can stop a command. An `ActionError` is an
//! ordinary refusal ("You don't see that here.") that is narrated to the
//! actor and never touches the graph. A core `Error` means the graph is
//! broken or the engine was misused, and propagates to the caller.

use crate::event::EventTag;
use mudlark_core::NodeId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use mudlark_core::{Error, Result};

/// Which stage of the pipeline refused the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionErrorKind {
    /// The command text was malformed.
    Parse,
    /// A named target could not be found or is the wrong sort of thing.
    Resolution,
    /// The targets exist but a precondition failed.
    Construction,
}

impl std::fmt::Display for ActionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse => write!(f, "parse"),
            Self::Resolution => write!(f, "resolution"),
            Self::Construction => write!(f, "construction"),
        }
    }
}

/// A user-facing refusal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionError {
    pub kind: ActionErrorKind,
    /// The event kind that failed, when the verb was recognised.
    pub tag: Option<EventTag>,
    pub actor: NodeId,
    /// Short sentence explaining the refusal.
    pub text: String,
    /// What was found instead of what was asked for, if anything.
    #[serde(default)]
    pub guess: Vec<NodeId>,
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {}", self.kind, self.text)
    }
}

impl std::error::Error for ActionError {}

/// Internal pipeline failure: either a refusal or a broken graph.
#[derive(Error, Debug)]
pub enum EventError {
    #[error("{0}")]
    Action(ActionError),

    #[error(transparent)]
    Core(#[from] Error),
}

impl From<ActionError> for EventError {
    fn from(err: ActionError) -> Self {
        Self::Action(err)
    }
}

pub type ActionResult<T> = std::result::Result<T, EventError>;
