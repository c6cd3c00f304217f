//! Simulated clock abstraction.

/// The source of "now" for a simulation pass.
///
/// The DNS model itself never reads a clock; the driver does, and passes
/// the instant into the cache. Keeping the clock behind a trait lets the
/// harness swap a virtual clock for a replayed trace without touching the
/// driver loop.
///
/// # Units
///
/// All instants are milliseconds on the synthetic timeline, starting at 0.
pub trait SimClock: Send + Sync {
    /// Returns the current simulated instant in milliseconds.
    fn now_ms(&self) -> f64;

    /// Returns the seed that drives this clock's run.
    ///
    /// Workloads replayed against the clock derive their own seed from it.
    fn seed(&self) -> u64;
}
