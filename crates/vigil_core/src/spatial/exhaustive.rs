//! All-pairs fallback strategy.

use super::SpatialIndex;
use crate::pass::ObjectId;
use glam::Vec3;
use std::collections::HashMap;

/// Linear-scan index: every query compares against every entry.
///
/// O(n) per query, O(n^2) per pass. Strictly worse than the octree at
/// scale; useful for a handful of objects and for validating the octree in
/// tests.
#[derive(Debug, Default)]
pub struct ExhaustiveIndex {
    entries: HashMap<ObjectId, Vec3>,
}

impl ExhaustiveIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpatialIndex for ExhaustiveIndex {
    fn upsert(&mut self, id: ObjectId, position: Vec3) {
        self.entries.insert(id, position);
    }

    fn remove(&mut self, id: ObjectId) -> bool {
        self.entries.remove(&id).is_some()
    }

    fn query_radius(&self, center: Vec3, radius: f32, out: &mut Vec<ObjectId>) {
        let radius_squared = radius * radius;
        for (&id, &position) in &self.entries {
            if center.distance_squared(position) <= radius_squared {
                out.push(id);
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_is_inclusive() {
        let mut index = ExhaustiveIndex::new();
        index.upsert(ObjectId(1), Vec3::new(5.0, 0.0, 0.0));

        let mut out = Vec::new();
        index.query_radius(Vec3::ZERO, 5.0, &mut out);
        assert_eq!(out, vec![ObjectId(1)]);

        out.clear();
        index.query_radius(Vec3::ZERO, 4.99, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn upsert_replaces() {
        let mut index = ExhaustiveIndex::new();
        index.upsert(ObjectId(7), Vec3::ZERO);
        index.upsert(ObjectId(7), Vec3::new(50.0, 0.0, 0.0));
        assert_eq!(index.len(), 1);

        let mut out = Vec::new();
        index.query_radius(Vec3::ZERO, 1.0, &mut out);
        assert!(out.is_empty());
    }
}
