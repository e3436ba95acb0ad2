//! Error types for the world graph

use crate::types::NodeId;
use thiserror::Error;

/// Failures that indicate a programming bug or a corrupted graph.
///
/// User-facing action failures ("you don't see that here") are not errors at
/// this level; they live with the event pipeline and never mutate state.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("insufficient capacity: {container} cannot hold {node}")]
    Capacity { container: NodeId, node: NodeId },

    #[error("wrong node type: {id} is not a {expected}")]
    WrongNodeType { id: NodeId, expected: &'static str },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    pub fn wrong_type(id: &NodeId, expected: &'static str) -> Self {
        Self::WrongNodeType {
            id: id.clone(),
            expected,
        }
    }

    /// Whether this error means the graph itself can no longer be trusted.
    pub fn is_invariant(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}
