//! Point octree with geometric growth.
//!
//! Nodes are arena-indexed rather than boxed so growth and subdivision
//! never move entries. The tree starts from the configured world bounds and
//! doubles toward any point inserted outside them, reparenting the old root
//! as one octant of the new one, so existing entries survive growth
//! untouched.

use super::SpatialIndex;
use crate::pass::ObjectId;
use glam::Vec3;
use std::collections::HashMap;

/// Objects a leaf holds before it subdivides.
const NODE_CAPACITY: usize = 8;

#[derive(Debug)]
struct Node {
    center: Vec3,
    /// Half the node's side length.
    half: f32,
    children: Option<[usize; 8]>,
    objects: Vec<(ObjectId, Vec3)>,
}

impl Node {
    fn new(center: Vec3, half: f32) -> Self {
        Self {
            center,
            half,
            children: None,
            objects: Vec::new(),
        }
    }
}

/// Production spatial strategy: O(log n) upsert/remove/query.
#[derive(Debug)]
pub struct PointOctree {
    nodes: Vec<Node>,
    root: usize,
    min_cell_size: f32,
    /// Exact stored position per id, for removal descent and membership.
    positions: HashMap<ObjectId, Vec3>,
}

impl PointOctree {
    /// `initial_world_size` is the full side length of the starting volume
    /// around `origin`; `min_cell_size` is the smallest region a node will
    /// subdivide down to.
    pub fn new(initial_world_size: f32, origin: Vec3, min_cell_size: f32) -> Self {
        assert!(initial_world_size > 0.0, "world size must be positive");
        assert!(min_cell_size > 0.0, "minimum cell size must be positive");
        let half = (initial_world_size / 2.0).max(min_cell_size / 2.0);
        Self {
            nodes: vec![Node::new(origin, half)],
            root: 0,
            min_cell_size,
            positions: HashMap::new(),
        }
    }

    /// Octant of `position` relative to `center`. Boundary points land on
    /// the positive side, so descent is deterministic.
    fn octant(center: Vec3, position: Vec3) -> usize {
        (position.x >= center.x) as usize
            | ((position.y >= center.y) as usize) << 1
            | ((position.z >= center.z) as usize) << 2
    }

    fn octant_offset(index: usize, magnitude: f32) -> Vec3 {
        Vec3::new(
            if index & 1 != 0 { magnitude } else { -magnitude },
            if index & 2 != 0 { magnitude } else { -magnitude },
            if index & 4 != 0 { magnitude } else { -magnitude },
        )
    }

    fn contains_root(&self, position: Vec3) -> bool {
        let root = &self.nodes[self.root];
        (position - root.center).abs().max_element() <= root.half
    }

    fn alloc(&mut self, center: Vec3, half: f32) -> usize {
        self.nodes.push(Node::new(center, half));
        self.nodes.len() - 1
    }

    /// Double the volume toward `toward`, keeping the old root as one
    /// octant of the new root.
    fn grow(&mut self, toward: Vec3) {
        let old_root = self.root;
        let old_center = self.nodes[old_root].center;
        let old_half = self.nodes[old_root].half;
        let direction = toward - old_center;

        let new_center = old_center
            + Vec3::new(
                if direction.x >= 0.0 { old_half } else { -old_half },
                if direction.y >= 0.0 { old_half } else { -old_half },
                if direction.z >= 0.0 { old_half } else { -old_half },
            );

        let occupied = Self::octant(new_center, old_center);
        let mut children = [usize::MAX; 8];
        for (index, child) in children.iter_mut().enumerate() {
            *child = if index == occupied {
                old_root
            } else {
                let offset = Self::octant_offset(index, old_half);
                self.alloc(new_center + offset, old_half)
            };
        }

        let new_root = self.alloc(new_center, old_half * 2.0);
        self.nodes[new_root].children = Some(children);
        self.root = new_root;
    }

    fn insert_into(&mut self, mut node: usize, id: ObjectId, position: Vec3) {
        loop {
            if let Some(children) = self.nodes[node].children {
                node = children[Self::octant(self.nodes[node].center, position)];
                continue;
            }
            self.nodes[node].objects.push((id, position));
            // Subdivide unless children would drop below the minimum cell.
            if self.nodes[node].objects.len() > NODE_CAPACITY
                && self.nodes[node].half >= self.min_cell_size
            {
                self.split(node);
            }
            return;
        }
    }

    fn split(&mut self, node: usize) {
        let center = self.nodes[node].center;
        let child_half = self.nodes[node].half / 2.0;

        let mut children = [usize::MAX; 8];
        for (index, child) in children.iter_mut().enumerate() {
            let offset = Self::octant_offset(index, child_half);
            *child = self.alloc(center + offset, child_half);
        }

        let objects = std::mem::take(&mut self.nodes[node].objects);
        self.nodes[node].children = Some(children);
        for (id, position) in objects {
            self.insert_into(children[Self::octant(center, position)], id, position);
        }
    }

    fn remove_from_leaf(&mut self, id: ObjectId, position: Vec3) {
        let mut node = self.root;
        loop {
            if let Some(children) = self.nodes[node].children {
                node = children[Self::octant(self.nodes[node].center, position)];
                continue;
            }
            let objects = &mut self.nodes[node].objects;
            if let Some(slot) = objects.iter().position(|(other, _)| *other == id) {
                objects.swap_remove(slot);
                return;
            }
            break;
        }
        // Growth can re-route a point sitting exactly on a new bisection
        // plane; fall back to a full sweep so no ghost entry survives.
        for current in &mut self.nodes {
            if let Some(slot) = current.objects.iter().position(|(other, _)| *other == id) {
                current.objects.swap_remove(slot);
                return;
            }
        }
    }

    fn gather(&self, node: usize, center: Vec3, radius_squared: f32, out: &mut Vec<ObjectId>) {
        let current = &self.nodes[node];

        // Squared distance from the query center to the node's volume.
        let outside = ((center - current.center).abs() - Vec3::splat(current.half)).max(Vec3::ZERO);
        if outside.length_squared() > radius_squared {
            return;
        }

        if let Some(children) = current.children {
            for child in children {
                self.gather(child, center, radius_squared, out);
            }
        } else {
            for &(id, position) in &current.objects {
                if center.distance_squared(position) <= radius_squared {
                    out.push(id);
                }
            }
        }
    }
}

impl SpatialIndex for PointOctree {
    fn upsert(&mut self, id: ObjectId, position: Vec3) {
        if let Some(previous) = self.positions.insert(id, position) {
            self.remove_from_leaf(id, previous);
        }
        while !self.contains_root(position) {
            self.grow(position);
        }
        self.insert_into(self.root, id, position);
    }

    fn remove(&mut self, id: ObjectId) -> bool {
        match self.positions.remove(&id) {
            Some(position) => {
                self.remove_from_leaf(id, position);
                true
            }
            None => false,
        }
    }

    fn query_radius(&self, center: Vec3, radius: f32, out: &mut Vec<ObjectId>) {
        self.gather(self.root, center, radius * radius, out);
    }

    fn len(&self) -> usize {
        self.positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids_within(octree: &PointOctree, center: Vec3, radius: f32) -> Vec<ObjectId> {
        let mut out = Vec::new();
        octree.query_radius(center, radius, &mut out);
        out.sort();
        out
    }

    #[test]
    fn radius_boundary_is_inclusive() {
        let mut octree = PointOctree::new(100.0, Vec3::ZERO, 1.0);
        octree.upsert(ObjectId(0), Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(ids_within(&octree, Vec3::ZERO, 3.0), vec![ObjectId(0)]);
        assert!(ids_within(&octree, Vec3::ZERO, 2.9).is_empty());
    }

    #[test]
    fn growth_preserves_existing_entries() {
        let mut octree = PointOctree::new(10.0, Vec3::ZERO, 1.0);
        octree.upsert(ObjectId(0), Vec3::new(1.0, 1.0, 1.0));
        octree.upsert(ObjectId(1), Vec3::new(-2.0, 0.0, 3.0));

        // Far outside the initial 10-unit volume; forces repeated doubling.
        octree.upsert(ObjectId(2), Vec3::new(400.0, -250.0, 90.0));

        assert_eq!(octree.len(), 3);
        assert_eq!(
            ids_within(&octree, Vec3::ZERO, 5.0),
            vec![ObjectId(0), ObjectId(1)]
        );
        assert_eq!(
            ids_within(&octree, Vec3::new(400.0, -250.0, 90.0), 0.1),
            vec![ObjectId(2)]
        );
    }

    #[test]
    fn upsert_moves_an_entry() {
        let mut octree = PointOctree::new(100.0, Vec3::ZERO, 1.0);
        octree.upsert(ObjectId(5), Vec3::ZERO);
        octree.upsert(ObjectId(5), Vec3::new(20.0, 0.0, 0.0));

        assert_eq!(octree.len(), 1);
        assert!(ids_within(&octree, Vec3::ZERO, 1.0).is_empty());
        assert_eq!(
            ids_within(&octree, Vec3::new(20.0, 0.0, 0.0), 1.0),
            vec![ObjectId(5)]
        );
    }

    #[test]
    fn remove_is_idempotent() {
        let mut octree = PointOctree::new(100.0, Vec3::ZERO, 1.0);
        octree.upsert(ObjectId(9), Vec3::new(4.0, 4.0, 4.0));
        assert!(octree.remove(ObjectId(9)));
        assert!(!octree.remove(ObjectId(9)));
        assert!(octree.is_empty());
    }

    #[test]
    fn subdivision_keeps_queries_correct() {
        let mut octree = PointOctree::new(64.0, Vec3::ZERO, 1.0);
        // Cluster enough objects in one octant to force several splits.
        for i in 0..64 {
            let offset = Vec3::new(
                (i % 4) as f32 * 0.5,
                ((i / 4) % 4) as f32 * 0.5,
                (i / 16) as f32 * 0.5,
            );
            octree.upsert(ObjectId(i), Vec3::new(10.0, 10.0, 10.0) + offset);
        }
        assert_eq!(octree.len(), 64);
        assert_eq!(
            ids_within(&octree, Vec3::new(10.75, 10.75, 10.75), 3.0).len(),
            64
        );
    }

    #[test]
    fn coincident_points_respect_min_cell_floor() {
        let mut octree = PointOctree::new(16.0, Vec3::ZERO, 2.0);
        // More coincident points than a leaf holds; the min-cell floor must
        // stop subdivision from recursing forever.
        for i in 0..32 {
            octree.upsert(ObjectId(i), Vec3::new(1.0, 1.0, 1.0));
        }
        assert_eq!(ids_within(&octree, Vec3::new(1.0, 1.0, 1.0), 0.0).len(), 32);
    }
}
