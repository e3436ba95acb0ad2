//! Observation delivery and audit hooks
//!
//! The world never talks to souls or loggers directly. It hands each
//! narrated event to an `ObservationSink` (the soul layer) and each executed
//! event to an `EventRecorder` (persistence, tests).

use crate::event::GraphEvent;
use mudlark_core::{Graph, NodeId};
use std::sync::{Arc, Mutex};

/// One narrated event, addressed to one agent.
#[derive(Debug, Clone)]
pub struct Observation {
    pub recipient: NodeId,
    /// Set when the recipient died in this event or no longer exists. The
    /// soul layer detaches such agents instead of delivering.
    pub recipient_dead: bool,
    pub text: String,
    pub event: Arc<GraphEvent>,
}

/// Receives observations as they are broadcast. Called while the world is
/// being mutated, so implementations must not block or call back into the
/// world.
pub trait ObservationSink: Send + Sync {
    fn deliver(&self, observation: Observation);
}

/// Audit hook for executed events and graph snapshots.
pub trait EventRecorder: Send + Sync {
    fn record(&self, event: &GraphEvent);

    fn record_snapshot(&self, label: &str, graph: &Graph);
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: Mutex<Vec<GraphEvent>>,
    snapshots: Mutex<Vec<(String, String)>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GraphEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Recorded snapshots as `(label, graph json)` pairs.
    pub fn snapshots(&self) -> Vec<(String, String)> {
        self.snapshots.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl EventRecorder for MemoryRecorder {
    fn record(&self, event: &GraphEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }

    fn record_snapshot(&self, label: &str, graph: &Graph) {
        let json = match graph.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(label, error = %e, "Failed to serialize snapshot");
                return;
            }
        };
        if let Ok(mut snapshots) = self.snapshots.lock() {
            snapshots.push((label.to_string(), json));
        }
    }
}

/// Collects every observation; handy for driving the world without souls.
#[derive(Debug, Default)]
pub struct ObservationLog {
    seen: Mutex<Vec<Observation>>,
}

impl ObservationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Observation> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Observations addressed to one agent, in delivery order.
    pub fn for_agent(&self, agent: &NodeId) -> Vec<Observation> {
        self.all()
            .into_iter()
            .filter(|o| &o.recipient == agent)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.clear();
        }
    }
}

impl ObservationSink for ObservationLog {
    fn deliver(&self, observation: Observation) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(observation);
        }
    }
}
