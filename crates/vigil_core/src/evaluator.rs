//! Single-pass orchestration: position refresh, radius queries, diff.

use crate::config::MonitorSettings;
use crate::conflict::ConflictTracker;
use crate::pass::{ObjectId, PassInput, PassReport};
use crate::spatial::{build_index, SpatialIndex};
use thiserror::Error;

/// Internal consistency faults that abort a pass.
///
/// An aborted pass leaves the conflict record exactly as the previous pass
/// left it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PassError {
    #[error("object {0:?} has no position in the pass snapshot")]
    MissingPosition(ObjectId),

    #[error("object {0:?} has no affiliation in the pass snapshot")]
    MissingAffiliation(ObjectId),
}

/// Runs one pass over an immutable input snapshot.
///
/// Owns the spatial index and the conflict tracker; the registry reaches
/// both only through this type, and only between passes.
pub struct Evaluator {
    index: Box<dyn SpatialIndex>,
    tracker: ConflictTracker,
    settings: MonitorSettings,
    scratch: Vec<ObjectId>,
}

impl Evaluator {
    pub fn new(settings: MonitorSettings) -> Self {
        Self {
            index: build_index(&settings),
            tracker: ConflictTracker::new(),
            settings,
            scratch: Vec::new(),
        }
    }

    /// Remove every trace of an unregistered id from index and tracker.
    pub fn purge(&mut self, id: ObjectId) {
        self.index.remove(id);
        self.tracker.forget(id);
    }

    pub fn tracker(&self) -> &ConflictTracker {
        &self.tracker
    }

    /// Execute one pass: refresh every position in the index, range-query
    /// each id at its own threshold, filter to differing affiliations and
    /// diff against the conflict record.
    pub fn run_pass(&mut self, input: &PassInput) -> Result<PassReport, PassError> {
        // Validate the snapshot before touching any state, so a fault
        // cannot leave the conflict record half-updated.
        for &id in &input.object_ids {
            if !input.coordinates.contains_key(&id) {
                return Err(PassError::MissingPosition(id));
            }
            if !input.affiliations.contains_key(&id) {
                return Err(PassError::MissingAffiliation(id));
            }
        }

        for &id in &input.object_ids {
            let Some(&(_, position)) = input.coordinates.get(&id) else {
                continue;
            };
            self.index.upsert(id, position);
        }

        let mut report = PassReport::default();
        let mut candidates = Vec::new();

        for &id in &input.object_ids {
            let Some(&(threshold, position)) = input.coordinates.get(&id) else {
                continue;
            };
            let Some(affiliation) = input.affiliations.get(&id) else {
                continue;
            };

            self.scratch.clear();
            self.index.query_radius(position, threshold, &mut self.scratch);

            candidates.clear();
            for &hit in &self.scratch {
                if hit == id {
                    continue;
                }
                // Same-affiliation objects never conflict; ids the snapshot
                // does not know are not part of this pass.
                match input.affiliations.get(&hit) {
                    Some(other) if other != affiliation => candidates.push(hit),
                    _ => {}
                }
            }

            self.tracker
                .diff(id, &candidates, self.settings.end_mode, &mut report);
        }

        Ok(report)
    }
}
