//! Simulation context implementing SimClock for deterministic replay.

use dnssim_env::SimClock;
use parking_lot::Mutex;
use std::sync::Arc;

/// Simulation context backed by a virtual clock.
///
/// Time only moves when the driver moves it. Clones share the same clock,
/// so a runner and the workers it hands clones to always agree on "now".
#[derive(Debug, Clone)]
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,

    /// Current virtual time (milliseconds since simulation start)
    virtual_time_ms: Arc<Mutex<f64>>,
}

impl SimContext {
    /// Creates a new SimContext with the given seed, at t=0.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            virtual_time_ms: Arc::new(Mutex::new(0.0)),
        }
    }

    /// Advances virtual time by `ms` milliseconds.
    pub fn advance_ms(&self, ms: f64) {
        *self.virtual_time_ms.lock() += ms;
    }

    /// Sets the virtual time to a specific instant.
    ///
    /// May move the clock backwards; replaying a timeline out of order
    /// relies on that.
    pub fn set_time_ms(&self, time_ms: f64) {
        *self.virtual_time_ms.lock() = time_ms;
    }
}

impl SimClock for SimContext {
    fn now_ms(&self) -> f64 {
        *self.virtual_time_ms.lock()
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}
