//! Mudlark Core - world graph, nodes, edges, and invariants

pub mod builder;
pub mod error;
pub mod graph;
pub mod node;
pub mod types;

pub use builder::GraphBuilder;
pub use error::{Error, Result};
pub use graph::Graph;
pub use node::*;
pub use types::*;
