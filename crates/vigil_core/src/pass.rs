//! Pass input/output value types
//!
//! A pass is one complete cycle of position refresh, spatial query and
//! conflict diff. Its input is an immutable snapshot built by the registry;
//! its output is a report of every conflict transition the pass produced.
//! Both sides speak plain object ids; host handles never cross into a pass,
//! which is what lets a pass run on the background worker.

use glam::Vec3;
use std::collections::HashMap;
use std::sync::Arc;

/// Tracked object id. Assigned monotonically on registration, never reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// Category label partitioning objects into conflict-eligible groups.
/// Objects sharing an affiliation never conflict with each other.
/// `Arc<str>` keeps per-pass snapshot clones cheap.
pub type Affiliation = Arc<str>;

/// Immutable snapshot handed to one pass.
#[derive(Debug, Clone)]
pub struct PassInput {
    /// Ids in registration order; the pass iterates these.
    pub object_ids: Vec<ObjectId>,
    /// id -> (threshold, position) as sampled at snapshot time.
    pub coordinates: HashMap<ObjectId, (f32, Vec3)>,
    /// id -> affiliation label at snapshot time.
    pub affiliations: HashMap<ObjectId, Affiliation>,
}

impl PassInput {
    pub fn is_empty(&self) -> bool {
        self.object_ids.is_empty()
    }
}

/// Conflict transitions produced by one pass.
///
/// The subject/partner vectors are index-aligned: `enter_partners[i]` are
/// the partners `enter_subjects[i]` gained this pass, and likewise for the
/// leave pair. An id reported in `enter_subjects` is never also reported in
/// `leave_subjects` for the same pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    /// Ids that gained at least one new conflict partner this pass.
    pub enter_subjects: Vec<ObjectId>,
    /// New partners per entry of `enter_subjects`.
    pub enter_partners: Vec<Vec<ObjectId>>,
    /// Ids whose leaving is reportable under the active end mode.
    pub leave_subjects: Vec<ObjectId>,
    /// Departed partners per entry of `leave_subjects`.
    pub leave_partners: Vec<Vec<ObjectId>>,
    /// Ids whose entire conflict set became empty this pass.
    pub fully_cleared: Vec<ObjectId>,
}

impl PassReport {
    pub fn is_empty(&self) -> bool {
        self.enter_subjects.is_empty()
            && self.leave_subjects.is_empty()
            && self.fully_cleared.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report() {
        let report = PassReport::default();
        assert!(report.is_empty());
    }

    #[test]
    fn object_ids_order_by_value() {
        assert!(ObjectId(3) < ObjectId(10));
    }
}
