//! Tracked object registry and per-tick driver.
//!
//! The registry owns the entity table and drives one scheduler pass per
//! tick. Host handles stay on this side of the worker boundary; a pass
//! sees only ids, and the registry translates id-space results back into
//! handle-space before fanning events out to owners.

use crate::config::MonitorSettings;
use crate::evaluator::{Evaluator, PassError};
use crate::observer::{ConflictObserver, PositionSource};
use crate::pass::{Affiliation, ObjectId, PassInput, PassReport};
use crate::scheduler::{PassScheduler, PassState, ScheduleError};
use glam::Vec3;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use vigil_metrics::{Counter, PassTimer};

/// Owner reference; compared by identity when unregistering.
pub type Observer<H> = Arc<dyn ConflictObserver<H>>;

/// Ticks a pass may stay in flight before the registry says so out loud.
const STALL_WARN_TICKS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("tracked object capacity ({0}) exceeded")]
    CapacityExceeded(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TickError {
    #[error(transparent)]
    Pass(#[from] PassError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Events delivered while consuming one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickEvents {
    pub enters: usize,
    pub leaves: usize,
    pub ended: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The previous pass is still running; nothing was dispatched.
    InFlight,
    /// A pass was consumed (possibly empty) and the next one dispatched.
    Events(TickEvents),
}

struct TrackedObject<H> {
    handle: H,
    affiliation: Affiliation,
    threshold: f32,
    owners: Vec<Observer<H>>,
    /// Fallback when the position source has nothing newer.
    last_position: Vec3,
}

/// Entity table plus the pass pipeline built from one settings value.
pub struct WorldRegistry<H> {
    settings: MonitorSettings,
    evaluator: Arc<Mutex<Evaluator>>,
    scheduler: PassScheduler,
    objects: HashMap<ObjectId, TrackedObject<H>>,
    ids_by_handle: HashMap<H, ObjectId>,
    /// Registration order; also the pass iteration order.
    order: Vec<ObjectId>,
    next_id: u32,
    /// Ids whose index/tracker state is purged at the next dispatch.
    pending_purge: Vec<ObjectId>,
    skipped_ticks: u32,
    timer: PassTimer,
    counters: Counter,
}

impl<H: Clone + Eq + Hash> WorldRegistry<H> {
    pub fn new(settings: MonitorSettings) -> Self {
        let evaluator = Arc::new(Mutex::new(Evaluator::new(settings.clone())));
        let scheduler = PassScheduler::new(Arc::clone(&evaluator));
        Self {
            settings,
            evaluator,
            scheduler,
            objects: HashMap::new(),
            ids_by_handle: HashMap::new(),
            order: Vec::new(),
            next_id: 0,
            pending_purge: Vec::new(),
            skipped_ticks: 0,
            timer: PassTimer::new(64),
            counters: Counter::default(),
        }
    }

    /// Number of tracked objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn id_of(&self, handle: &H) -> Option<ObjectId> {
        self.ids_by_handle.get(handle).copied()
    }

    /// Start tracking `handle`, or add `owner` to an already-tracked
    /// handle's owner set. Ids are monotonic and never reused.
    pub fn register(
        &mut self,
        handle: H,
        owner: Observer<H>,
        affiliation: impl Into<Affiliation>,
        threshold: f32,
    ) -> Result<ObjectId, RegistryError> {
        if let Some(&id) = self.ids_by_handle.get(&handle) {
            let object = self
                .objects
                .get_mut(&id)
                .expect("handle map and object table out of sync");
            if !object.owners.iter().any(|o| Arc::ptr_eq(o, &owner)) {
                object.owners.push(owner);
            }
            return Ok(id);
        }

        if self.objects.len() >= self.settings.max_tracked_objects {
            return Err(RegistryError::CapacityExceeded(
                self.settings.max_tracked_objects,
            ));
        }

        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.insert(
            id,
            TrackedObject {
                handle: handle.clone(),
                affiliation: affiliation.into(),
                threshold,
                owners: vec![owner],
                last_position: Vec3::ZERO,
            },
        );
        self.ids_by_handle.insert(handle, id);
        self.order.push(id);
        tracing::debug!(id = id.0, total = self.objects.len(), "object registered");
        Ok(id)
    }

    /// Stop tracking for one owner, or drop the object entirely.
    ///
    /// With `owner` given and `keep_other_owners` set, only that owner is
    /// detached and the object survives while other owners remain. In every
    /// other case the object is removed; its spatial and conflict state is
    /// purged at the next dispatch, and any in-flight result fragment that
    /// still references it is discarded at consumption.
    pub fn unregister(
        &mut self,
        handle: &H,
        owner: Option<&Observer<H>>,
        keep_other_owners: bool,
    ) -> bool {
        let Some(&id) = self.ids_by_handle.get(handle) else {
            return false;
        };

        if let (Some(owner), true) = (owner, keep_other_owners) {
            let Some(object) = self.objects.get_mut(&id) else {
                return false;
            };
            object.owners.retain(|o| !Arc::ptr_eq(o, owner));
            if !object.owners.is_empty() {
                return true;
            }
        }

        self.objects.remove(&id);
        self.ids_by_handle.remove(handle);
        self.order.retain(|&other| other != id);
        self.pending_purge.push(id);
        tracing::debug!(id = id.0, total = self.objects.len(), "object unregistered");
        true
    }

    /// Update one object's threshold. `false` if the handle is untracked.
    pub fn set_threshold(&mut self, handle: &H, threshold: f32) -> bool {
        let Some(&id) = self.ids_by_handle.get(handle) else {
            return false;
        };
        if let Some(object) = self.objects.get_mut(&id) {
            object.threshold = threshold;
            return true;
        }
        false
    }

    /// Update the threshold of every object sharing `affiliation`; returns
    /// how many were touched. Walks the whole table, so this is the
    /// higher-cost variant.
    pub fn set_affiliation_threshold(&mut self, affiliation: &str, threshold: f32) -> usize {
        let mut updated = 0;
        for object in self.objects.values_mut() {
            if object.affiliation.as_ref() == affiliation {
                object.threshold = threshold;
                updated += 1;
            }
        }
        updated
    }

    /// Drive one simulation tick.
    ///
    /// Consumes the previous pass if it finished (translating ids to
    /// handles and notifying owners), then snapshots current positions and
    /// dispatches the next pass. While a pass is still running the tick
    /// only counts the skip; at most one pass is ever queued.
    pub fn advance(&mut self, source: &impl PositionSource<H>) -> Result<TickOutcome, TickError> {
        match self.scheduler.state() {
            PassState::Running => {
                self.skipped_ticks += 1;
                if self.skipped_ticks == STALL_WARN_TICKS {
                    tracing::warn!(
                        ticks = self.skipped_ticks,
                        "pass still running; skipping dispatch"
                    );
                }
                Ok(TickOutcome::InFlight)
            }
            PassState::Idle => {
                self.dispatch(source)?;
                Ok(TickOutcome::Events(TickEvents::default()))
            }
            PassState::Done => {
                self.skipped_ticks = 0;
                let events = match self.scheduler.take_result() {
                    Some(Ok(report)) => {
                        self.timer.end();
                        self.deliver(&report)
                    }
                    Some(Err(fault)) => return Err(fault.into()),
                    None => TickEvents::default(),
                };
                self.dispatch(source)?;
                Ok(TickOutcome::Events(events))
            }
        }
    }

    /// Cancel any in-flight pass; used on shutdown.
    pub fn shutdown(&mut self) {
        self.scheduler.cancel();
    }

    /// Ids currently holding at least one conflict. Blocks if called while
    /// a background pass is running; meant for between-pass inspection.
    pub fn active_conflicts(&self) -> usize {
        match self.evaluator.lock() {
            Ok(guard) => guard.tracker().conflicting_count(),
            Err(poisoned) => poisoned.into_inner().tracker().conflicting_count(),
        }
    }

    /// Rolling dispatch-to-consumption pass latency (zero without the
    /// `metrics` feature).
    pub fn pass_latency_ms(&self) -> f64 {
        self.timer.latency_ms()
    }

    /// Total delivered events by name: `conflicts_entered`,
    /// `conflicts_left`, `conflicts_ended` (zero without `metrics`).
    pub fn event_count(&self, name: &str) -> usize {
        self.counters.get(name)
    }

    fn dispatch(&mut self, source: &impl PositionSource<H>) -> Result<(), TickError> {
        // Apply deferred removals while no worker can hold the evaluator.
        if !self.pending_purge.is_empty() {
            let mut evaluator = match self.evaluator.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            for id in self.pending_purge.drain(..) {
                evaluator.purge(id);
            }
        }

        let mut coordinates = HashMap::with_capacity(self.order.len());
        let mut affiliations = HashMap::with_capacity(self.order.len());
        for &id in &self.order {
            let Some(object) = self.objects.get_mut(&id) else {
                continue;
            };
            if let Some(position) = source.position_of(&object.handle) {
                object.last_position = position;
            }
            coordinates.insert(id, (object.threshold, object.last_position));
            affiliations.insert(id, object.affiliation.clone());
        }

        let input = PassInput {
            object_ids: self.order.clone(),
            coordinates,
            affiliations,
        };
        self.scheduler
            .start_pass(input, self.settings.synchronous_only)?;
        self.timer.begin();
        Ok(())
    }

    /// Translate a report into handle-space and notify owners. Fragments
    /// referencing ids unregistered while the pass was in flight are
    /// dropped here.
    fn deliver(&mut self, report: &PassReport) -> TickEvents {
        let mut events = TickEvents::default();

        for (slot, &subject) in report.enter_subjects.iter().enumerate() {
            let Some(object) = self.objects.get(&subject) else {
                continue;
            };
            let (handles, labels) = self.resolve(&report.enter_partners[slot]);
            if handles.is_empty() {
                continue;
            }
            for owner in &object.owners {
                owner.on_enter(&object.handle, &handles, &labels);
            }
            events.enters += 1;
        }

        for (slot, &subject) in report.leave_subjects.iter().enumerate() {
            let Some(object) = self.objects.get(&subject) else {
                continue;
            };
            let (handles, labels) = self.resolve(&report.leave_partners[slot]);
            if handles.is_empty() {
                continue;
            }
            for owner in &object.owners {
                owner.on_leave(&object.handle, &handles, &labels);
            }
            events.leaves += 1;
        }

        for &subject in &report.fully_cleared {
            let Some(object) = self.objects.get(&subject) else {
                continue;
            };
            for owner in &object.owners {
                owner.on_conflict_ended(&object.handle);
            }
            events.ended += 1;
        }

        self.counters.increment("conflicts_entered", events.enters);
        self.counters.increment("conflicts_left", events.leaves);
        self.counters.increment("conflicts_ended", events.ended);
        events
    }

    /// Counterpart ids to (handles, affiliations), skipping unregistered
    /// ids.
    fn resolve(&self, ids: &[ObjectId]) -> (Vec<H>, Vec<Affiliation>) {
        let mut handles = Vec::with_capacity(ids.len());
        let mut labels = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(object) = self.objects.get(id) {
                handles.push(object.handle.clone());
                labels.push(object.affiliation.clone());
            }
        }
        (handles, labels)
    }
}
