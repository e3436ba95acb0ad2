//! Error types for the soul layer

use mudlark_core::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SoulError {
    #[error("agent {0} already has a soul")]
    AlreadyAttached(NodeId),

    #[error("agent {0} has no soul")]
    NotAttached(NodeId),

    #[error("agent {0} is dead or dying")]
    Dead(NodeId),

    #[error("observation queue for agent {0} overflowed, soul detached")]
    Overflow(NodeId),

    #[error("no free agent to take over")]
    NoFreeAgent,

    #[error("decision provider failed: {0}")]
    Decision(String),

    #[error("player transport failed: {0}")]
    Transport(String),

    #[error(transparent)]
    World(#[from] mudlark_core::Error),
}

pub type Result<T> = std::result::Result<T, SoulError>;

impl SoulError {
    pub fn decision(message: impl Into<String>) -> Self {
        Self::Decision(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}
