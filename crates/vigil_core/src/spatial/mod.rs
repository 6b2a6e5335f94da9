//! Spatial strategies for radius queries over tracked object positions.
//!
//! Both strategies implement [`SpatialIndex`] so the evaluator never knows
//! which one it is driving. The octree is the production strategy; the
//! exhaustive scan exists for small populations and as a correctness
//! baseline for the octree.

mod exhaustive;
mod octree;

pub use exhaustive::ExhaustiveIndex;
pub use octree::PointOctree;

use crate::config::{ExecutionStrategy, MonitorSettings};
use crate::pass::ObjectId;
use glam::Vec3;

/// A point-indexed spatial partition keyed by object id.
///
/// `query_radius` appends into a caller-owned buffer so per-pass queries
/// avoid reallocating. The boundary is inclusive and the caller is
/// responsible for filtering out the query's own id.
pub trait SpatialIndex: Send {
    /// Insert `id` at `position`, replacing any prior entry for `id`.
    fn upsert(&mut self, id: ObjectId, position: Vec3);

    /// Remove `id` if present. Returns whether an entry was removed.
    fn remove(&mut self, id: ObjectId) -> bool;

    /// Append every id within `radius` of `center` (inclusive) to `out`.
    fn query_radius(&self, center: Vec3, radius: f32, out: &mut Vec<ObjectId>);

    /// Number of indexed objects.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build the index the settings ask for.
pub fn build_index(settings: &MonitorSettings) -> Box<dyn SpatialIndex> {
    match settings.strategy {
        ExecutionStrategy::Indexed => Box::new(PointOctree::new(
            settings.initial_world_size,
            settings.world_origin,
            settings.min_cell_size,
        )),
        ExecutionStrategy::Exhaustive => Box::new(ExhaustiveIndex::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorSettings;

    #[test]
    fn strategy_selection() {
        let mut settings = MonitorSettings::default();
        settings.strategy = ExecutionStrategy::Exhaustive;
        let mut index = build_index(&settings);
        index.upsert(ObjectId(0), Vec3::ZERO);
        assert_eq!(index.len(), 1);
    }

    /// The two strategies must agree on query results.
    #[test]
    fn octree_matches_exhaustive() {
        let mut octree = PointOctree::new(40.0, Vec3::ZERO, 1.0);
        let mut exhaustive = ExhaustiveIndex::new();

        // Deterministic scatter over a volume larger than the initial bounds.
        let mut seed = 0x2545_f491u64;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((seed >> 33) as f32 / (u32::MAX >> 1) as f32 - 0.5) * 120.0
        };

        for i in 0..200 {
            let p = Vec3::new(next(), next(), next());
            octree.upsert(ObjectId(i), p);
            exhaustive.upsert(ObjectId(i), p);
        }

        for i in (0..200).step_by(17) {
            let center = Vec3::new(next(), next(), next());
            let radius = 5.0 + (i as f32);
            let mut a = Vec::new();
            let mut b = Vec::new();
            octree.query_radius(center, radius, &mut a);
            exhaustive.query_radius(center, radius, &mut b);
            a.sort();
            b.sort();
            assert_eq!(a, b, "strategies disagree at radius {radius}");
        }
    }
}
