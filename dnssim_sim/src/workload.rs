//! Synthetic request workload for simulation.
//!
//! The generator plays the part of the page being loaded:
//! - Request arrival times (exponential gaps)
//! - Which host each request goes to (Zipf popularity)
//! - Replay order perturbations and alternate timestamps for side-queries

use crate::error::SimError;
use dnssim_env::{DomainName, NetworkRequest};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp, Zipf};
use serde::{Deserialize, Serialize};

/// A request placed on the simulated timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedRequest {
    /// The request itself
    pub request: NetworkRequest,

    /// Simulated instant the request is issued (ms)
    pub requested_at: f64,
}

/// Shape of a generated workload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkloadConfig {
    /// Number of requests in the timeline
    pub num_requests: usize,

    /// Size of the host pool
    pub num_domains: usize,

    /// Mean gap between consecutive requests (ms)
    pub mean_gap_ms: f64,

    /// Zipf exponent for host popularity (higher = more skewed)
    pub zipf_exponent: f64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            num_requests: 200,
            num_domains: 12,
            mean_gap_ms: 25.0,
            zipf_exponent: 1.1,
        }
    }
}

/// Seeded request generator.
pub struct RequestGenerator {
    /// RNG for arrivals, host choice and shuffling
    rng: ChaCha8Rng,

    /// Workload shape
    config: WorkloadConfig,
}

impl RequestGenerator {
    /// Creates a generator. Same seed and config give the same timelines.
    pub fn new(workload_seed: u64, config: WorkloadConfig) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(workload_seed),
            config,
        }
    }

    /// Host name for pool slot `index`.
    pub fn domain(index: usize) -> DomainName {
        DomainName::new(format!("host-{}.example", index))
    }

    /// Generates a time-ordered timeline over the Zipf-weighted host pool.
    pub fn timeline(&mut self) -> Result<Vec<TimedRequest>, SimError> {
        let num_domains = self.config.num_domains.max(1);
        let zipf = Zipf::new(num_domains as u64, self.config.zipf_exponent)
            .map_err(|e| SimError::Workload(format!("zipf: {:?}", e)))?;

        self.arrivals(|rng, _| {
            // Zipf samples ranks in [1, n]
            let rank = zipf.sample(rng) as usize;
            rank.clamp(1, num_domains) - 1
        })
    }

    /// Generates a time-ordered timeline where every request has its own host.
    pub fn distinct_timeline(&mut self) -> Result<Vec<TimedRequest>, SimError> {
        self.arrivals(|_, request_id| request_id as usize)
    }

    /// Shuffles a timeline in place, keeping each request's timestamp.
    pub fn shuffle(&mut self, timeline: &mut [TimedRequest]) {
        timeline.shuffle(&mut self.rng);
    }

    /// Picks up to `count` distinct hosts from the pool.
    pub fn sample_domains(&mut self, count: usize) -> Vec<DomainName> {
        let mut slots: Vec<usize> = (0..self.config.num_domains).collect();
        slots.shuffle(&mut self.rng);
        slots.into_iter().take(count).map(Self::domain).collect()
    }

    /// Picks an alternate timestamp within `spread_ms` of `around`, never below 0.
    pub fn alternate_time(&mut self, around: f64, spread_ms: f64) -> f64 {
        if spread_ms <= 0.0 {
            return around.max(0.0);
        }
        let offset = self.rng.gen_range(-spread_ms..spread_ms);
        (around + offset).max(0.0)
    }

    /// Picks a timestamp uniformly in `[0, horizon_ms)`.
    pub fn instant_before(&mut self, horizon_ms: f64) -> f64 {
        if horizon_ms <= 0.0 {
            return 0.0;
        }
        self.rng.gen_range(0.0..horizon_ms)
    }

    fn arrivals<F>(&mut self, mut pick_slot: F) -> Result<Vec<TimedRequest>, SimError>
    where
        F: FnMut(&mut ChaCha8Rng, u64) -> usize,
    {
        let gap = Exp::new(1.0 / self.config.mean_gap_ms)
            .map_err(|e| SimError::Workload(format!("arrival gap: {:?}", e)))?;

        let mut now = 0.0;
        let mut timeline = Vec::with_capacity(self.config.num_requests);

        for request_id in 0..self.config.num_requests as u64 {
            let slot = pick_slot(&mut self.rng, request_id);
            let url = format!("https://{}/asset/{}", Self::domain(slot), request_id);
            let request = NetworkRequest::from_url(request_id, &url)?;

            timeline.push(TimedRequest {
                request,
                requested_at: now,
            });
            now += gap.sample(&mut self.rng);
        }

        Ok(timeline)
    }
}
