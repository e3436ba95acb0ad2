//! Purgatory configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurgatoryConfig {
    /// Capacity of each soul's inbound observation queue. Zero means
    /// unbounded. A soul that fills a bounded queue is detached rather than
    /// shown a history with gaps in it.
    pub observation_buffer: usize,
    /// Whether `fill_all` animates free agents with filler souls.
    pub filler_enabled: bool,
    /// Pause before an autonomous soul reacts, in milliseconds.
    pub reaction_delay_ms: u64,
}

impl Default for PurgatoryConfig {
    fn default() -> Self {
        Self {
            observation_buffer: 0,
            filler_enabled: true,
            reaction_delay_ms: 250,
        }
    }
}
