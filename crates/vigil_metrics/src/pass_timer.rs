//! Pass latency tracking

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

/// Measures dispatch-to-consumption latency over a rolling window.
pub struct PassTimer {
    pass_start: Instant,
    latencies: RingBuffer<Duration>,
}

impl PassTimer {
    pub fn new(capacity: usize) -> Self {
        Self {
            pass_start: Instant::now(),
            latencies: RingBuffer::new(capacity),
        }
    }

    /// Mark a pass as dispatched.
    pub fn begin(&mut self) {
        self.pass_start = Instant::now();
    }

    /// Mark the dispatched pass as consumed.
    pub fn end(&mut self) {
        self.latencies.push(self.pass_start.elapsed());
    }

    /// Rolling average latency in milliseconds.
    pub fn latency_ms(&self) -> f64 {
        self.latencies.average().as_secs_f64() * 1000.0
    }

    /// (min, max) latency over the window, in milliseconds.
    pub fn latency_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.latencies.min_max();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }
}
