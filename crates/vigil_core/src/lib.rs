//! Vigil Core
//!
//! Proximity awareness for simulations:
//! - Point octree spatial index with an exhaustive fallback
//! - Incremental conflict-state diffing with configurable end reporting
//! - Single-worker pass scheduling with a poll-able completion signal
//! - Tracked object registry with per-owner event fan-out

pub mod config;
pub mod conflict;
pub mod evaluator;
pub mod labels;
pub mod observer;
pub mod pass;
pub mod registry;
pub mod scheduler;
pub mod spatial;

pub use glam;

pub use config::{ConflictEndMode, ExecutionStrategy, MonitorSettings};
pub use observer::{ConflictObserver, PositionSource};
pub use pass::{Affiliation, ObjectId, PassInput, PassReport};
pub use registry::{
    Observer, RegistryError, TickError, TickEvents, TickOutcome, WorldRegistry,
};
pub use scheduler::{PassState, ScheduleError};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
