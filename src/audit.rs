//! Audit trail for a play session
//!
//! Executed events go to the log under the `mudlark::audit` target. Episode
//! snapshots are logged too and, when a directory is given, written there as
//! pretty JSON named after their label.

use mudlark_core::Graph;
use mudlark_events::{EventRecorder, GraphEvent};
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct AuditLog {
    snapshot_dir: Option<PathBuf>,
}

impl AuditLog {
    pub fn new(snapshot_dir: Option<PathBuf>) -> Self {
        Self { snapshot_dir }
    }
}

impl EventRecorder for AuditLog {
    fn record(&self, event: &GraphEvent) {
        debug!(
            target: "mudlark::audit",
            id = event.event_id,
            tag = %event.tag(),
            actor = %event.actor_id(),
            targets = event.targets.len(),
            rolls = ?event.rolls,
            "Event executed"
        );
    }

    fn record_snapshot(&self, label: &str, graph: &Graph) {
        info!(target: "mudlark::audit", label, nodes = graph.len(), "Snapshot");
        let Some(dir) = &self.snapshot_dir else {
            return;
        };
        let path = dir.join(format!("{}.json", label));
        let written = graph
            .to_json_pretty()
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            warn!(path = %path.display(), error = %e, "Failed to write snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_land_in_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(Some(dir.path().to_path_buf()));
        let mut graph = Graph::new();
        graph.add_room("attic", "Dusty.");
        log.record_snapshot("episode_start", &graph);

        let json = std::fs::read_to_string(dir.path().join("episode_start.json")).unwrap();
        let back = Graph::from_json(&json).unwrap();
        assert_eq!(back.len(), graph.len());
    }
}
