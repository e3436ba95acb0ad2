//! Event model and world mediator for the mudlark engine
//!
//! Text commands become `GraphEvent`s through `pipeline::plan`; `World`
//! executes them against the graph, captures narration and hands it to an
//! `ObservationSink`.

pub mod config;
pub mod error;
pub mod event;
pub mod kinds;
pub mod narrate;
pub mod observe;
pub mod pipeline;
pub mod scope;
pub mod world;

pub use config::WorldConfig;
pub use error::{ActionError, ActionErrorKind, ActionResult, Error, EventError, Result};
pub use event::{Audience, EventKind, EventTag, GoOutcome, GraphEvent, Narration, NodeRef, Shape};
pub use observe::{EventRecorder, MemoryRecorder, Observation, ObservationLog, ObservationSink};
pub use scope::Scope;
pub use world::{ActionOutcome, AuxState, LegalAction, World, WorldSnapshot};
