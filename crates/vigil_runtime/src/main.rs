//! Vigil Runtime
//!
//! Demo binary: two affiliations of wandering objects inside a bounded
//! volume, with every conflict transition logged as it is delivered.
//! Pass an optional path to a `MonitorSettings` JSON file to override the
//! defaults.

use anyhow::Result;
use glam::Vec3;
use std::sync::Arc;
use std::time::Duration;
use vigil_core::{labels, ConflictObserver, MonitorSettings, TickOutcome, WorldRegistry};

const OBJECT_COUNT: usize = 24;
const WANDER_EXTENT: f32 = 25.0;
const TICK_DURATION: Duration = Duration::from_millis(16);
const TICK_COUNT: u32 = 600;

/// Logs every delivered transition, the way a host AI layer would react
/// to them.
struct ConsoleObserver;

impl ConflictObserver<usize> for ConsoleObserver {
    fn on_enter(
        &self,
        subject: &usize,
        counterparts: &[usize],
        affiliations: &[vigil_core::Affiliation],
    ) {
        tracing::info!(subject, ?counterparts, ?affiliations, "conflict entered");
    }

    fn on_leave(
        &self,
        subject: &usize,
        counterparts: &[usize],
        _affiliations: &[vigil_core::Affiliation],
    ) {
        tracing::info!(subject, ?counterparts, "conflict left");
    }

    fn on_conflict_ended(&self, subject: &usize) {
        tracing::info!(subject, "all conflicts ended");
    }
}

/// Deterministic pseudo-random (LCG) so demo runs are reproducible.
struct DemoRng {
    state: u64,
}

impl DemoRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_f32(&mut self) -> f32 {
        const A: u64 = 1664525;
        const C: u64 = 1013904223;
        self.state = A.wrapping_mul(self.state).wrapping_add(C) % (1u64 << 32);
        self.state as f32 / (1u64 << 32) as f32
    }

    /// Uniform in [-1, 1].
    fn next_signed(&mut self) -> f32 {
        self.next_f32() * 2.0 - 1.0
    }
}

fn load_settings() -> Result<MonitorSettings> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(MonitorSettings::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("Vigil v{}", vigil_core::VERSION);

    let settings = load_settings()?;
    let mut registry: WorldRegistry<usize> = WorldRegistry::new(settings);
    let observer: Arc<dyn ConflictObserver<usize>> = Arc::new(ConsoleObserver);

    let mut rng = DemoRng::new(0x5eed);
    let mut positions = Vec::with_capacity(OBJECT_COUNT);
    let mut velocities = Vec::with_capacity(OBJECT_COUNT);

    for index in 0..OBJECT_COUNT {
        positions.push(Vec3::new(
            rng.next_signed() * WANDER_EXTENT,
            0.0,
            rng.next_signed() * WANDER_EXTENT,
        ));
        // Keep every component well away from zero so objects actually roam.
        let sign = |value: f32| if value < 0.0 { -1.0 } else { 1.0 };
        let direction = Vec3::new(
            (rng.next_f32() * 0.5 + 0.5) * sign(rng.next_signed()),
            0.0,
            (rng.next_f32() * 0.5 + 0.5) * sign(rng.next_signed()),
        );
        velocities.push(direction.normalize() * 5.0);

        let affiliation = labels::affiliation_label(index % 2);
        registry.register(index, observer.clone(), affiliation, 6.0)?;
    }
    tracing::info!(objects = registry.len(), "registry populated");

    let dt = TICK_DURATION.as_secs_f32();
    for _ in 0..TICK_COUNT {
        for (position, velocity) in positions.iter_mut().zip(velocities.iter_mut()) {
            *position += *velocity * dt;
            for axis in 0..3 {
                if position[axis].abs() > WANDER_EXTENT {
                    position[axis] = position[axis].clamp(-WANDER_EXTENT, WANDER_EXTENT);
                    velocity[axis] = -velocity[axis];
                }
            }
        }

        let outcome = registry.advance(&|handle: &usize| positions.get(*handle).copied())?;
        if outcome == TickOutcome::InFlight {
            tracing::debug!("pass still in flight; tick skipped");
        }

        std::thread::sleep(TICK_DURATION);
    }

    tracing::info!(
        pass_latency_ms = registry.pass_latency_ms(),
        entered = registry.event_count("conflicts_entered"),
        left = registry.event_count("conflicts_left"),
        ended = registry.event_count("conflicts_ended"),
        "demo complete"
    );
    registry.shutdown();
    Ok(())
}
