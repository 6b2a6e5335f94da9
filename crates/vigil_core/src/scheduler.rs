//! Pass job lifecycle.
//!
//! At most one pass runs at a time, either inline on the calling thread or
//! on a single background worker. The only state shared with the worker is
//! an atomic completion flag, a cooperative cancellation flag and the
//! result slot; the evaluator itself sits behind a mutex the worker holds
//! for the duration of one pass.

use crate::evaluator::{Evaluator, PassError};
use crate::pass::{PassInput, PassReport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// What one pass produced.
pub type PassOutcome = Result<PassReport, PassError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// `start_pass` was called while a previous pass was still running.
    #[error("a pass is already in flight")]
    PassInFlight,
}

/// Observable lifecycle of the most recent pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Running,
    Done,
}

/// A mutex guard, recovering the data if a worker panicked mid-pass.
fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Runs exactly one evaluator pass at a time.
pub struct PassScheduler {
    evaluator: Arc<Mutex<Evaluator>>,
    done: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
    slot: Arc<Mutex<Option<PassOutcome>>>,
    worker: Option<JoinHandle<()>>,
    started: bool,
}

impl PassScheduler {
    pub fn new(evaluator: Arc<Mutex<Evaluator>>) -> Self {
        Self {
            evaluator,
            done: Arc::new(AtomicBool::new(false)),
            cancelled: Arc::new(AtomicBool::new(false)),
            slot: Arc::new(Mutex::new(None)),
            worker: None,
            started: false,
        }
    }

    pub fn state(&self) -> PassState {
        if !self.started {
            PassState::Idle
        } else if self.done.load(Ordering::Acquire) {
            PassState::Done
        } else {
            PassState::Running
        }
    }

    /// Whether the most recently started pass has completed.
    /// Side-effect-free.
    pub fn poll(&self) -> bool {
        self.started && self.done.load(Ordering::Acquire)
    }

    /// Begin a pass over `input`. With `synchronous` the pass runs on the
    /// calling thread and is `Done` on return; otherwise a single worker
    /// thread is spawned.
    pub fn start_pass(&mut self, input: PassInput, synchronous: bool) -> Result<(), ScheduleError> {
        if self.started && !self.done.load(Ordering::Acquire) {
            return Err(ScheduleError::PassInFlight);
        }
        self.reap();

        self.started = true;
        self.cancelled.store(false, Ordering::Release);
        self.done.store(false, Ordering::Release);
        *lock_or_recover(&self.slot) = None;

        if synchronous {
            let outcome = lock_or_recover(&self.evaluator).run_pass(&input);
            *lock_or_recover(&self.slot) = Some(outcome);
            self.done.store(true, Ordering::Release);
            return Ok(());
        }

        let evaluator = Arc::clone(&self.evaluator);
        let slot = Arc::clone(&self.slot);
        let done = Arc::clone(&self.done);
        let cancelled = Arc::clone(&self.cancelled);

        self.worker = Some(thread::spawn(move || {
            let mut guard = lock_or_recover(&evaluator);
            // Cancellation is checked at pass granularity: once before the
            // pass runs and once before the result is published.
            if !cancelled.load(Ordering::Acquire) {
                let outcome = guard.run_pass(&input);
                drop(guard);
                if !cancelled.load(Ordering::Acquire) {
                    *lock_or_recover(&slot) = Some(outcome);
                }
            }
            done.store(true, Ordering::Release);
        }));

        Ok(())
    }

    /// Consume the completed pass's outcome, returning the scheduler to
    /// `Idle`. `None` if no pass has completed or the pass was cancelled.
    pub fn take_result(&mut self) -> Option<PassOutcome> {
        if !self.poll() {
            return None;
        }
        self.reap();
        self.started = false;
        lock_or_recover(&self.slot).take()
    }

    /// Request termination of any in-flight worker. The worker exits at its
    /// next cancellation check and its result is discarded; nothing is
    /// consumed after this call until a new pass starts.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        *lock_or_recover(&self.slot) = None;
        self.started = false;
    }

    fn reap(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for PassScheduler {
    fn drop(&mut self) {
        self.cancel();
        self.reap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExecutionStrategy, MonitorSettings};
    use crate::pass::ObjectId;
    use glam::Vec3;
    use std::collections::HashMap;
    use std::time::Duration;

    fn scheduler() -> (PassScheduler, Arc<Mutex<Evaluator>>) {
        let settings = MonitorSettings {
            strategy: ExecutionStrategy::Exhaustive,
            ..MonitorSettings::default()
        };
        let evaluator = Arc::new(Mutex::new(Evaluator::new(settings)));
        (PassScheduler::new(Arc::clone(&evaluator)), evaluator)
    }

    fn two_object_input() -> PassInput {
        let mut coordinates = HashMap::new();
        coordinates.insert(ObjectId(0), (5.0, Vec3::ZERO));
        coordinates.insert(ObjectId(1), (5.0, Vec3::new(1.0, 0.0, 0.0)));
        let mut affiliations = HashMap::new();
        affiliations.insert(ObjectId(0), "A".into());
        affiliations.insert(ObjectId(1), "B".into());
        PassInput {
            object_ids: vec![ObjectId(0), ObjectId(1)],
            coordinates,
            affiliations,
        }
    }

    fn wait_done(scheduler: &PassScheduler) {
        for _ in 0..500 {
            if scheduler.poll() {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("pass never completed");
    }

    #[test]
    fn synchronous_pass_is_done_on_return() {
        let (mut scheduler, _) = scheduler();
        assert_eq!(scheduler.state(), PassState::Idle);
        scheduler
            .start_pass(two_object_input(), true)
            .expect("start");
        assert_eq!(scheduler.state(), PassState::Done);

        let report = scheduler.take_result().expect("outcome").expect("report");
        assert_eq!(report.enter_subjects.len(), 2);
        assert_eq!(scheduler.state(), PassState::Idle);
    }

    #[test]
    fn background_pass_completes() {
        let (mut scheduler, _) = scheduler();
        scheduler
            .start_pass(two_object_input(), false)
            .expect("start");
        wait_done(&scheduler);
        let report = scheduler.take_result().expect("outcome").expect("report");
        assert_eq!(report.enter_subjects.len(), 2);
    }

    #[test]
    fn start_while_running_is_rejected() {
        let (mut scheduler, evaluator) = scheduler();

        // Hold the evaluator so the worker cannot begin its pass.
        let guard = evaluator.lock().expect("evaluator");
        scheduler
            .start_pass(two_object_input(), false)
            .expect("start");
        assert_eq!(scheduler.state(), PassState::Running);
        assert_eq!(
            scheduler.start_pass(two_object_input(), false),
            Err(ScheduleError::PassInFlight)
        );
        drop(guard);

        wait_done(&scheduler);
        assert!(scheduler.take_result().is_some());
    }

    #[test]
    fn cancelled_pass_discards_its_result() {
        let (mut scheduler, evaluator) = scheduler();

        let guard = evaluator.lock().expect("evaluator");
        scheduler
            .start_pass(two_object_input(), false)
            .expect("start");
        scheduler.cancel();
        drop(guard);

        // The worker observes the flag at its pass boundary and exits
        // without publishing anything.
        for _ in 0..500 {
            if scheduler.done.load(Ordering::Acquire) {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
        assert!(scheduler.take_result().is_none());

        // The scheduler is reusable after a cancel.
        scheduler
            .start_pass(two_object_input(), true)
            .expect("start");
        assert!(scheduler.take_result().is_some());
    }
}
