//! DnsSim Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" vocabulary shared by the DNS latency
//! model and the simulation harness that drives it.
//!
//! # Core Concept
//!
//! The resolution cache never looks at a real clock or a real resolver.
//! Everything it needs from the outside world comes through this crate:
//! - Requests (`NetworkRequest`, anything `Resolvable`)
//! - Time (`SimClock::now_ms()`)
//!
//! # Example
//!
//! ```ignore
//! use dnssim_env::{NetworkRequest, SimClock};
//!
//! fn replay<C: SimClock>(clock: &C, cache: &mut DnsCache, req: &NetworkRequest) -> f64 {
//!     cache.estimate_and_record(req, clock.now_ms())
//! }
//! ```

mod clock;
mod error;
mod types;

pub use clock::SimClock;
pub use error::EnvError;
pub use types::{DomainName, NetworkRequest, Resolvable};
