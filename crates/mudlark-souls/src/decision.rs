//! Autonomous souls
//!
//! A `DecisionSoul` is a composition: an `InteractionTracker` that keeps the
//! soul's short-term memory and a `DecisionProvider` that picks the reaction.
//! Providers are where anything clever (a dialogue model, a planner) plugs
//! in; the two here are a random wanderer and a fixed script.

use crate::error::Result;
use crate::soul::{Soul, SoulContext};
use async_trait::async_trait;
use mudlark_core::NodeId;
use mudlark_events::{EventTag, Observation};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// What a provider chose to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Issue this command.
    Act(String),
    Pass,
}

/// Everything a provider gets to look at.
#[derive(Debug, Clone)]
pub struct DecisionContext {
    pub agent: NodeId,
    /// The observation being reacted to.
    pub observation: String,
    /// Earlier observations, oldest first.
    pub recent: Vec<String>,
    /// Agent most recently interacted with.
    pub partner: Option<NodeId>,
    /// Commands that would currently succeed, limited to `kinds()`.
    pub legal: Vec<String>,
}

#[async_trait]
pub trait DecisionProvider: Send + Sync {
    async fn decide(&self, context: &DecisionContext) -> Result<Decision>;

    /// Kinds worth enumerating for this provider. `None` means all.
    fn kinds(&self) -> Option<Vec<EventTag>> {
        None
    }
}

// ---------------------------------------------------------------------------
// Interaction tracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct InteractionTracker {
    recent: VecDeque<String>,
    limit: usize,
    reactions: u64,
}

impl InteractionTracker {
    pub fn new(limit: usize) -> Self {
        Self {
            recent: VecDeque::new(),
            limit,
            reactions: 0,
        }
    }

    pub fn note(&mut self, text: &str) {
        self.recent.push_back(text.to_string());
        while self.recent.len() > self.limit {
            self.recent.pop_front();
        }
    }

    pub fn recent(&self) -> Vec<String> {
        self.recent.iter().cloned().collect()
    }

    pub fn reacted(&mut self) {
        self.reactions += 1;
    }

    pub fn reactions(&self) -> u64 {
        self.reactions
    }
}

impl Default for InteractionTracker {
    fn default() -> Self {
        Self::new(16)
    }
}

// ---------------------------------------------------------------------------
// Decision soul
// ---------------------------------------------------------------------------

pub struct DecisionSoul {
    label: String,
    provider: Arc<dyn DecisionProvider>,
    tracker: InteractionTracker,
    delay: Duration,
}

impl DecisionSoul {
    pub fn new(label: impl Into<String>, provider: Arc<dyn DecisionProvider>, delay: Duration) -> Self {
        Self {
            label: label.into(),
            provider,
            tracker: InteractionTracker::default(),
            delay,
        }
    }

    pub fn with_tracker(mut self, tracker: InteractionTracker) -> Self {
        self.tracker = tracker;
        self
    }
}

#[async_trait]
impl Soul for DecisionSoul {
    fn name(&self) -> &str {
        &self.label
    }

    async fn observe(&mut self, observation: Observation, ctx: &SoulContext) -> Result<()> {
        let earlier = self.tracker.recent();
        self.tracker.note(&observation.text);
        // Only other agents' doings are worth a reaction.
        if observation.event.actor_id() == &ctx.agent {
            return Ok(());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let kinds = self.provider.kinds();
        let legal = ctx.legal_commands(kinds.as_deref()).await?;
        let partner = {
            let world = ctx.world.lock().await;
            world.aux(&ctx.agent).and_then(|a| a.last_partner.clone())
        };
        let context = DecisionContext {
            agent: ctx.agent.clone(),
            observation: observation.text,
            recent: earlier,
            partner,
            legal,
        };

        match self.provider.decide(&context).await? {
            Decision::Act(command) => {
                debug!(agent = %ctx.agent, soul = %self.label, command = %command, "Reacting");
                self.tracker.reacted();
                ctx.act(&command).await?;
            }
            Decision::Pass => {}
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Wanders through exits and emotes at random.
pub struct WanderProvider {
    rng: Mutex<StdRng>,
    /// Chance of doing nothing, between 0 and 1.
    pass_chance: f64,
}

impl WanderProvider {
    pub fn new(seed: u64, pass_chance: f64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            pass_chance: pass_chance.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl DecisionProvider for WanderProvider {
    async fn decide(&self, context: &DecisionContext) -> Result<Decision> {
        let Ok(mut rng) = self.rng.lock() else {
            return Ok(Decision::Pass);
        };
        if rng.gen_bool(self.pass_chance) {
            return Ok(Decision::Pass);
        }
        Ok(context
            .legal
            .choose(&mut *rng)
            .map_or(Decision::Pass, |c| Decision::Act(c.clone())))
    }

    fn kinds(&self) -> Option<Vec<EventTag>> {
        Some(vec![EventTag::Go, EventTag::Emote])
    }
}

/// Plays back a fixed list of commands, one per reaction.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<String>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(commands.into_iter().map(Into::into).collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl DecisionProvider for ScriptedProvider {
    async fn decide(&self, _context: &DecisionContext) -> Result<Decision> {
        Ok(self
            .script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .map_or(Decision::Pass, Decision::Act))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(legal: &[&str]) -> DecisionContext {
        DecisionContext {
            agent: NodeId::new("bob_1"),
            observation: "Alice waves.".into(),
            recent: Vec::new(),
            partner: None,
            legal: legal.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn tracker_forgets_the_oldest() {
        let mut tracker = InteractionTracker::new(2);
        for text in ["a", "b", "c"] {
            tracker.note(text);
        }
        assert_eq!(tracker.recent(), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn wanderer_only_picks_legal_commands() {
        let provider = WanderProvider::new(7, 0.0);
        let ctx = context(&["go north", "wave"]);
        for _ in 0..20 {
            match provider.decide(&ctx).await.unwrap() {
                Decision::Act(c) => assert!(ctx.legal.contains(&c)),
                Decision::Pass => panic!("pass chance is zero"),
            }
        }
        assert_eq!(provider.decide(&context(&[])).await.unwrap(), Decision::Pass);
    }

    #[tokio::test]
    async fn script_runs_out() {
        let provider = ScriptedProvider::new(["wave"]);
        let ctx = context(&[]);
        assert_eq!(provider.decide(&ctx).await.unwrap(), Decision::Act("wave".into()));
        assert_eq!(provider.decide(&ctx).await.unwrap(), Decision::Pass);
        assert_eq!(provider.remaining(), 0);
    }
}
