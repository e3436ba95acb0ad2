//! Souls and purgatory: the concurrent layer that animates agents
//!
//! Each agent may carry one `Soul`. Purgatory owns the attachments, runs
//! every soul on its own task with an ordered inbound queue, and detaches
//! souls whose agents die.

pub mod config;
pub mod decision;
pub mod error;
pub mod player;
pub mod purgatory;
pub mod recording;
pub mod soul;

pub use config::PurgatoryConfig;
pub use decision::{
    Decision, DecisionContext, DecisionProvider, DecisionSoul, InteractionTracker, ScriptedProvider,
    WanderProvider,
};
pub use error::{Result, SoulError};
pub use player::{ChannelTransport, PlayerSoul, PlayerTransport};
pub use purgatory::{FillerFactory, PlayerSlot, Purgatory};
pub use recording::{Recording, RecordingSoul};
pub use soul::{shared, SharedWorld, Soul, SoulContext};
