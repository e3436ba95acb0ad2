//! World rules configuration
//!
//! Every tunable constant of the simulation in one place. The binary loads
//! it from the `[world]` table of its TOML file.

use mudlark_core::AgentData;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Seed for the world's random generator.
    pub seed: u64,
    /// Grid distance a shout carries.
    pub shout_range: u32,
    /// Health spent per move. Moving is refused when health would not
    /// stay above it.
    pub movement_cost: i32,
    /// Wearable slots given to newly created agents.
    pub max_wearable: u32,
    /// Wieldable slots given to newly created agents.
    pub max_wieldable: u32,
    /// Sides of the die rolled to slip past a blocker.
    pub block_roll_sides: i32,
    /// Sides of the die rolled to steal.
    pub steal_roll_sides: i32,
    /// Health cap when eating or drinking.
    pub max_health: i32,
    /// Narration lines kept in an agent's observation buffer.
    pub observation_limit: usize,
    /// Utterances remembered per agent in the auxiliary table.
    pub utterance_memory: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            shout_range: 3,
            movement_cost: 0,
            max_wearable: 3,
            max_wieldable: 1,
            block_roll_sides: 20,
            steal_roll_sides: 20,
            max_health: 20,
            observation_limit: 50,
            utterance_memory: 10,
        }
    }
}

impl WorldConfig {
    /// Stats for a freshly created agent under these rules.
    pub fn agent_template(&self) -> AgentData {
        AgentData {
            max_wearable_items: self.max_wearable,
            max_wieldable_items: self.max_wieldable,
            ..AgentData::default()
        }
    }
}
