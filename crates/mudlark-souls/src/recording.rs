//! A soul that only remembers what it saw

use crate::error::Result;
use crate::soul::{Soul, SoulContext};
use async_trait::async_trait;
use mudlark_events::Observation;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Shared view of a `RecordingSoul`'s history, usable after the soul has
/// been handed to purgatory.
#[derive(Debug, Clone, Default)]
pub struct Recording {
    seen: Arc<Mutex<Vec<Observation>>>,
    reaped: Arc<AtomicBool>,
    changed: Arc<Notify>,
}

impl Recording {
    pub fn observations(&self) -> Vec<Observation> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn texts(&self) -> Vec<String> {
        self.observations().into_iter().map(|o| o.text).collect()
    }

    pub fn is_reaped(&self) -> bool {
        self.reaped.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` observations arrived or the soul was
    /// reaped. Returns false on timeout.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let ready = || self.observations().len() >= count || self.is_reaped();
        tokio::time::timeout(timeout, async {
            loop {
                let changed = self.changed.notified();
                if ready() {
                    return;
                }
                changed.await;
            }
        })
        .await
        .is_ok()
            && self.observations().len() >= count
    }

    /// Wait until the soul has been reaped. Returns false on timeout.
    pub async fn wait_reaped(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let changed = self.changed.notified();
                if self.is_reaped() {
                    return;
                }
                changed.await;
            }
        })
        .await
        .is_ok()
    }
}

#[derive(Debug, Default)]
pub struct RecordingSoul {
    recording: Recording,
}

impl RecordingSoul {
    pub fn new() -> (Self, Recording) {
        let recording = Recording::default();
        (
            Self {
                recording: recording.clone(),
            },
            recording,
        )
    }
}

#[async_trait]
impl Soul for RecordingSoul {
    fn name(&self) -> &str {
        "recording"
    }

    async fn observe(&mut self, observation: Observation, _ctx: &SoulContext) -> Result<()> {
        if let Ok(mut seen) = self.recording.seen.lock() {
            seen.push(observation);
        }
        self.recording.changed.notify_waiters();
        Ok(())
    }

    fn reap(&mut self) {
        self.recording.reaped.store(true, Ordering::SeqCst);
        self.recording.changed.notify_waiters();
    }
}
