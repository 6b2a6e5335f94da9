//! Monitor configuration
//!
//! All knobs live on one settings struct so a host can deserialize them
//! from its own config file and hand them to `WorldRegistry::new`.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Granularity at which "conflict ended" transitions are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictEndMode {
    /// Report an object once, when its last active conflict ends.
    OnAllConflictsEnded,
    /// Report an object every pass in which at least one partner leaves.
    OnIndividualConflictEnded,
    /// Never report leavers or conflict endings.
    NoConflictEndEvents,
}

/// Which spatial strategy evaluates a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStrategy {
    /// Point octree, O(log n) per operation. The production strategy.
    Indexed,
    /// All-pairs distance comparison, O(n^2) per pass. Intended for small
    /// populations and for validating the indexed strategy.
    Exhaustive,
}

/// Configuration for a [`WorldRegistry`](crate::registry::WorldRegistry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    pub end_mode: ConflictEndMode,
    pub strategy: ExecutionStrategy,
    /// Run every pass on the calling thread instead of the background worker.
    pub synchronous_only: bool,
    /// Position the octree initially surrounds.
    pub world_origin: Vec3,
    /// Widest lateral distance the world traverses in x, y or z. The octree
    /// grows geometrically past this, so it only affects start-up cost.
    pub initial_world_size: f32,
    /// Smallest region an octree node will subdivide down to.
    pub min_cell_size: f32,
    /// Capacity ceiling for registrations.
    pub max_tracked_objects: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            end_mode: ConflictEndMode::OnAllConflictsEnded,
            strategy: ExecutionStrategy::Indexed,
            synchronous_only: false,
            world_origin: Vec3::ZERO,
            initial_world_size: 100.0,
            min_cell_size: 1.0,
            max_tracked_objects: 1024,
        }
    }
}
