//! DnsSim Deterministic Simulation Testing (DST) Harness
//!
//! This crate provides the controlled environment in which the DNS
//! resolution cache is exercised: synthetic page-load timelines are replayed
//! through a cache while the harness checks its timing invariants.
//!
//! # Core Principle
//!
//! All sources of non-determinism are controlled:
//! - **Time**: a virtual clock that only moves when the driver moves it
//! - **Workload**: request arrivals and hosts derived from one 64-bit seed
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                   ScenarioRunner                      │
//! │  ┌──────────────────┐        ┌──────────────────────┐ │
//! │  │ RequestGenerator │──────► │ timeline (t, request)│ │
//! │  └──────────────────┘        └──────────┬───────────┘ │
//! │                                          │             │
//! │  ┌────────────┐   now_ms()   ┌───────────▼──────────┐ │
//! │  │ SimContext │────────────► │ DnsCache / Shared    │ │
//! │  └────────────┘              └───────────┬──────────┘ │
//! │                                          │ waits       │
//! │                              ┌───────────▼──────────┐ │
//! │                              │ invariant checks     │ │
//! │                              │ ReplayExport (JSON)  │ │
//! │                              └──────────────────────┘ │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use dnssim_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let runner = ScenarioRunner::new(42, 100.0).with_requests(500);
//! let result = runner.run(ScenarioId::OutOfOrder);
//! assert!(result.passed);
//! ```

mod context;
mod error;
mod exporter;
mod runner;
mod workload;
pub mod scenarios;

pub use context::SimContext;
pub use error::SimError;
pub use exporter::{CacheEntry, ReplayExport, ReplayFrame};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use workload::{RequestGenerator, TimedRequest, WorkloadConfig};
