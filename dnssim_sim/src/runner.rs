//! Scenario runner - replays request timelines through the resolution cache.

use crate::context::SimContext;
use crate::error::SimError;
use crate::exporter::{ReplayExport, ReplayFrame};
use crate::scenarios::ScenarioId;
use crate::workload::{RequestGenerator, TimedRequest, WorkloadConfig};

use dnssim_core::{DnsCache, DnsCacheOptions, SharedDnsCache};
use dnssim_env::{DomainName, Resolvable, SimClock};
use serde::Serialize;
use std::collections::HashMap;
use std::thread;
use tracing::{debug, info, warn};

/// Relative tolerance when comparing accumulated instants.
const INSTANT_TOLERANCE: f64 = 1e-9;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Simulated instant of the last request issued (ms)
    pub final_time_ms: f64,

    /// Domains in the cache at the end
    pub cached_domains: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScenarioMetrics {
    /// Authoritative estimates issued
    pub requests: u64,

    /// Requests to a domain with no cache entry
    pub cold_lookups: u64,

    /// Requests served from an existing entry without changing it
    pub warm_hits: u64,

    /// Requests that moved a stored instant earlier
    pub tightenings: u64,

    /// Requests whose domain was already resolved (zero wait)
    pub free_resolutions: u64,

    /// Sum of all DNS waits (ms)
    pub total_dns_ms: f64,

    /// Largest single DNS wait (ms)
    pub max_dns_ms: f64,

    /// Side-queries issued
    pub peeks: u64,
}

impl ScenarioMetrics {
    fn record_wait(&mut self, wait: f64) {
        self.requests += 1;
        self.total_dns_ms += wait;
        self.max_dns_ms = self.max_dns_ms.max(wait);
        if wait == 0.0 {
            self.free_resolutions += 1;
        }
    }

    /// Classifies one authoritative estimate by its entry before and after.
    fn record_transition(&mut self, before: Option<f64>, after: Option<f64>) {
        match (before, after) {
            (None, _) => self.cold_lookups += 1,
            (Some(b), Some(a)) if b - a > INSTANT_TOLERANCE * b.abs().max(1.0) => {
                self.tightenings += 1
            }
            _ => self.warm_hits += 1,
        }
    }

    fn merge(&mut self, other: &ScenarioMetrics) {
        self.requests += other.requests;
        self.cold_lookups += other.cold_lookups;
        self.warm_hits += other.warm_hits;
        self.tightenings += other.tightenings;
        self.free_resolutions += other.free_resolutions;
        self.total_dns_ms += other.total_dns_ms;
        self.max_dns_ms = self.max_dns_ms.max(other.max_dns_ms);
        self.peeks += other.peeks;
    }

    /// Mean DNS wait per request (ms).
    pub fn mean_dns_ms(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.total_dns_ms / self.requests as f64
        }
    }
}

/// One simulation pass: a clock, a cache, and what was observed.
struct Replay {
    context: SimContext,
    cache: DnsCache,
    metrics: ScenarioMetrics,
    frames: Vec<ReplayFrame>,
    failure: Option<String>,
}

impl Replay {
    fn new(seed: u64, cache: DnsCache) -> Self {
        Self {
            context: SimContext::new(seed),
            cache,
            metrics: ScenarioMetrics::default(),
            frames: Vec::new(),
            failure: None,
        }
    }

    /// Issues the request at its timestamp and checks the per-step invariants.
    fn step(&mut self, timed: &TimedRequest) -> f64 {
        self.context.set_time_ms(timed.requested_at);
        let now = self.context.now_ms();
        let domain = timed.request.domain();

        let before = self.cache.resolved_at(domain.as_str());
        let wait = self.cache.estimate_and_record(&timed.request, now);
        let after = self.cache.resolved_at(domain.as_str());

        self.metrics.record_wait(wait);
        self.metrics.record_transition(before, after);

        let baseline = self.cache.baseline();
        if !(0.0..=baseline).contains(&wait) {
            self.fail(format!(
                "request {} to {} waited {:.3}ms, outside [0, {:.3}]",
                timed.request.request_id, domain, wait, baseline
            ));
        }
        if let (Some(b), Some(a)) = (before, after) {
            if a > b {
                self.fail(format!(
                    "{} resolution moved later: {:.3} -> {:.3}",
                    domain, b, a
                ));
            }
        }

        self.frames
            .push(ReplayFrame::new(timed.request.request_id, domain, now, wait));
        wait
    }

    fn fail(&mut self, reason: String) {
        warn!("  ✗ {}", reason);
        if self.failure.is_none() {
            self.failure = Some(reason);
        }
    }
}

/// Runs replay scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Cache options for every run
    options: DnsCacheOptions,

    /// Workload shape
    workload: WorkloadConfig,

    /// Worker threads for the contended scenario
    workers: usize,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64, rtt_ms: f64) -> Self {
        Self {
            seed,
            options: DnsCacheOptions::with_rtt(rtt_ms),
            workload: WorkloadConfig::default(),
            workers: 4,
        }
    }

    /// Replaces the cache options.
    pub fn with_options(mut self, options: DnsCacheOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the number of requests per timeline.
    pub fn with_requests(mut self, num_requests: usize) -> Self {
        self.workload.num_requests = num_requests;
        self
    }

    /// Sets the size of the host pool.
    pub fn with_domains(mut self, num_domains: usize) -> Self {
        self.workload.num_domains = num_domains.max(1);
        self
    }

    /// Sets the mean gap between requests.
    pub fn with_mean_gap(mut self, mean_gap_ms: f64) -> Self {
        self.workload.mean_gap_ms = mean_gap_ms;
        self
    }

    /// Sets the worker count for the contended scenario.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.run_with_export(scenario).0
    }

    /// Runs a scenario and also returns the per-request export.
    pub fn run_with_export(&self, scenario: ScenarioId) -> (ScenarioResult, ReplayExport) {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        if scenario.is_concurrent() {
            debug!("  {} worker threads share one cache", self.workers);
        }

        let rtt = self.options.rtt.unwrap_or(0.0);
        let cache = match DnsCache::new(self.options) {
            Ok(cache) => cache,
            Err(e) => {
                let reason = e.to_string();
                let mut export = ReplayExport::new(scenario.name(), self.seed, rtt, 0.0);
                export.finalize(false, Some(reason.clone()), Vec::new());
                return (self.failed(scenario, reason), export);
            }
        };

        let mut export = ReplayExport::new(scenario.name(), self.seed, rtt, cache.baseline());
        let mut replay = Replay::new(self.seed, cache);

        let outcome = match scenario {
            ScenarioId::ColdStart => self.run_cold_start(&mut replay),
            ScenarioId::WarmCache => self.run_warm_cache(&mut replay),
            ScenarioId::OutOfOrder => self.run_out_of_order(&mut replay),
            ScenarioId::Prewarmed => self.run_prewarmed(&mut replay),
            ScenarioId::WhatIf => self.run_what_if(&mut replay),
            ScenarioId::Contended => self.run_contended(&mut replay),
        };
        if let Err(e) = outcome {
            replay.fail(e.to_string());
        }

        let passed = replay.failure.is_none();
        if passed {
            info!(
                "✓ {} complete: {} requests, {} cold, {} warm, mean DNS {:.1}ms",
                scenario.name(),
                replay.metrics.requests,
                replay.metrics.cold_lookups,
                replay.metrics.warm_hits,
                replay.metrics.mean_dns_ms()
            );
        }

        for frame in replay.frames.drain(..) {
            export.add_frame(frame);
        }
        export.finalize(passed, replay.failure.clone(), replay.cache.snapshot());

        let result = ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            final_time_ms: replay.context.now_ms(),
            cached_domains: replay.cache.len(),
            failure_reason: replay.failure,
            metrics: replay.metrics,
        };
        (result, export)
    }

    /// Workload generator for a pass, seeded from the pass's clock seed.
    fn generator(&self, context: &SimContext) -> RequestGenerator {
        let workload_seed = context.seed().wrapping_mul(0x9e3779b97f4a7c15);
        RequestGenerator::new(workload_seed, self.workload)
    }

    fn failed(&self, scenario: ScenarioId, reason: String) -> ScenarioResult {
        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: false,
            final_time_ms: 0.0,
            cached_domains: 0,
            failure_reason: Some(reason),
            metrics: ScenarioMetrics::default(),
        }
    }

    /// DNS-001: ColdStart - every host is new, so every wait is the baseline.
    fn run_cold_start(&self, replay: &mut Replay) -> Result<(), SimError> {
        info!("DNS-001: ColdStart - one lookup per host");
        let timeline = self.generator(&replay.context).distinct_timeline()?;
        let baseline = replay.cache.baseline();

        for timed in &timeline {
            let wait = replay.step(timed);
            if wait != baseline {
                replay.fail(format!(
                    "cold lookup for {} took {:.3}ms, expected {:.3}ms",
                    timed.request.host, wait, baseline
                ));
            }
        }

        if replay.metrics.cold_lookups != timeline.len() as u64 {
            replay.fail(format!(
                "{} cold lookups for {} distinct hosts",
                replay.metrics.cold_lookups,
                timeline.len()
            ));
        }
        Ok(())
    }

    /// DNS-002: WarmCache - in-order replay reuses resolutions and never tightens.
    fn run_warm_cache(&self, replay: &mut Replay) -> Result<(), SimError> {
        info!("DNS-002: WarmCache - popular hosts in time order");
        let timeline = self.generator(&replay.context).timeline()?;

        for timed in &timeline {
            replay.step(timed);
        }

        // In time order a later request can never finish a lookup sooner
        if replay.metrics.tightenings > 0 {
            replay.fail(format!(
                "{} tightenings during in-order replay",
                replay.metrics.tightenings
            ));
        }
        check_earliest_resolution(replay, &timeline);
        Ok(())
    }

    /// DNS-003: OutOfOrder - shuffled replay still converges to the earliest lookup.
    fn run_out_of_order(&self, replay: &mut Replay) -> Result<(), SimError> {
        info!("DNS-003: OutOfOrder - shuffled replay");
        let mut generator = self.generator(&replay.context);
        let mut timeline = generator.timeline()?;
        generator.shuffle(&mut timeline);

        for (i, timed) in timeline.iter().enumerate() {
            replay.step(timed);
            if i % 50 == 0 {
                debug!(
                    "  step {} | t={:.1}ms | domains={} | tightenings={}",
                    i,
                    timed.requested_at,
                    replay.cache.len(),
                    replay.metrics.tightenings
                );
            }
        }

        check_earliest_resolution(replay, &timeline);
        Ok(())
    }

    /// DNS-004: Prewarmed - seeded hosts are free once their forced instant passes.
    fn run_prewarmed(&self, replay: &mut Replay) -> Result<(), SimError> {
        info!("DNS-004: Prewarmed - force-seeded cache");
        let mut generator = self.generator(&replay.context);
        let timeline = generator.timeline()?;
        let horizon = timeline.last().map(|t| t.requested_at).unwrap_or(0.0) / 2.0;

        let seeded_count = (self.workload.num_domains / 3).max(1);
        let mut forced: HashMap<DomainName, f64> = HashMap::new();
        for domain in generator.sample_domains(seeded_count) {
            let at = generator.instant_before(horizon);
            replay.cache.set_resolved_at(domain.clone(), at);
            forced.insert(domain, at);
        }
        debug!("  seeded {} hosts before t={:.1}ms", forced.len(), horizon);

        let baseline = replay.cache.baseline();
        for timed in &timeline {
            let domain = timed.request.domain();
            // Only the first request after seeding sees the forced instant untouched
            let first_visit = forced.remove(domain);
            let wait = replay.step(timed);

            if let Some(at) = first_visit {
                let expected = (at - timed.requested_at).max(0.0).min(baseline);
                if wait != expected {
                    replay.fail(format!(
                        "prewarmed {} forced at {:.3} waited {:.3}ms at t={:.3}, expected {:.3}ms",
                        domain, at, wait, timed.requested_at, expected
                    ));
                }
                let stored = replay.cache.resolved_at(domain.as_str()).unwrap_or(f64::INFINITY);
                if stored > at {
                    replay.fail(format!("prewarmed {} moved later than {:.3}", domain, at));
                }
            }
        }
        Ok(())
    }

    /// DNS-005: WhatIf - side-queries between estimates leave the cache untouched.
    fn run_what_if(&self, replay: &mut Replay) -> Result<(), SimError> {
        info!("DNS-005: WhatIf - side-queries on alternate timestamps");
        let mut generator = self.generator(&replay.context);
        let timeline = generator.timeline()?;
        let num_domains = self.workload.num_domains;
        let baseline = replay.cache.baseline();

        for (i, timed) in timeline.iter().enumerate() {
            replay.step(timed);

            let before = replay.cache.snapshot();
            let probe = RequestGenerator::domain(i % num_domains);
            let at = generator.alternate_time(timed.requested_at, baseline * 4.0);

            let first = replay.cache.peek(&probe, at);
            let second = replay.cache.peek(&timed.request, at);
            replay.metrics.peeks += 2;

            if replay.cache.peek(&probe, at) != first {
                replay.fail(format!("repeated peek for {} at {:.3} disagreed", probe, at));
            }
            if !(0.0..=baseline).contains(&first) || !(0.0..=baseline).contains(&second) {
                replay.fail(format!("peek at {:.3} out of range", at));
            }
            if replay.cache.snapshot() != before {
                replay.fail(format!("peek at {:.3} mutated the cache", at));
            }
        }
        Ok(())
    }

    /// DNS-006: Contended - worker threads share one cache through a single lock.
    fn run_contended(&self, replay: &mut Replay) -> Result<(), SimError> {
        info!(
            "DNS-006: Contended - {} workers, one shared cache",
            self.workers
        );
        let timeline = self.generator(&replay.context).timeline()?;
        let shared = SharedDnsCache::new(replay.cache.clone());
        let baseline = shared.baseline();

        // Round-robin split; each worker walks its share in time order
        let mut shards: Vec<Vec<&TimedRequest>> = vec![Vec::new(); self.workers];
        for (i, timed) in timeline.iter().enumerate() {
            shards[i % self.workers].push(timed);
        }

        let outputs: Vec<(ScenarioMetrics, Vec<ReplayFrame>)> = thread::scope(|s| {
            let handles: Vec<_> = shards
                .iter()
                .map(|shard| {
                    let shared = shared.clone();
                    s.spawn(move || {
                        let mut metrics = ScenarioMetrics::default();
                        let mut frames = Vec::with_capacity(shard.len());
                        for timed in shard {
                            let domain = timed.request.domain();
                            // Classify under the same lock as the estimate
                            let (before, wait, after) = shared.with_lock(|cache| {
                                let before = cache.resolved_at(domain.as_str());
                                let wait =
                                    cache.estimate_and_record(&timed.request, timed.requested_at);
                                (before, wait, cache.resolved_at(domain.as_str()))
                            });
                            metrics.record_wait(wait);
                            metrics.record_transition(before, after);
                            frames.push(ReplayFrame::new(
                                timed.request.request_id,
                                timed.request.domain(),
                                timed.requested_at,
                                wait,
                            ));
                        }
                        (metrics, frames)
                    })
                })
                .collect();

            handles.into_iter().filter_map(|h| h.join().ok()).collect()
        });

        if outputs.len() != self.workers {
            replay.fail(format!(
                "{} of {} workers panicked",
                self.workers - outputs.len(),
                self.workers
            ));
        }

        let mut frames = Vec::with_capacity(timeline.len());
        for (metrics, worker_frames) in &outputs {
            replay.metrics.merge(metrics);
            frames.extend(worker_frames.iter().cloned());
        }
        frames.sort_by_key(|f| f.request_id);

        for frame in &frames {
            if !(0.0..=baseline).contains(&frame.dns_ms) {
                replay.fail(format!(
                    "request {} waited {:.3}ms, outside [0, {:.3}]",
                    frame.request_id, frame.dns_ms, baseline
                ));
            }
        }

        // Adopt the shared cache's final state for the checks below
        for (domain, at) in shared.snapshot() {
            replay.cache.set_resolved_at(domain, at);
        }
        if let Some(last) = timeline.last() {
            replay.context.set_time_ms(last.requested_at);
        }
        replay.frames = frames;

        check_earliest_resolution(replay, &timeline);
        Ok(())
    }
}

/// Checks every domain settled on its earliest request's cold-lookup finish.
///
/// Holds for any replay order when the cache started empty: every estimate
/// resolves no earlier than `min(t) + baseline`, and the earliest request
/// resolves no later than that.
fn check_earliest_resolution(replay: &mut Replay, timeline: &[TimedRequest]) {
    let baseline = replay.cache.baseline();
    let mut earliest: HashMap<&DomainName, f64> = HashMap::new();
    for timed in timeline {
        let entry = earliest
            .entry(timed.request.domain())
            .or_insert(timed.requested_at);
        *entry = entry.min(timed.requested_at);
    }

    let mut mismatches = Vec::new();
    for (domain, first) in earliest {
        let expected = first + baseline;
        match replay.cache.resolved_at(domain.as_str()) {
            Some(stored) if (stored - expected).abs() <= INSTANT_TOLERANCE * expected.max(1.0) => {}
            Some(stored) => mismatches.push(format!(
                "{} settled at {:.3}, expected {:.3}",
                domain, stored, expected
            )),
            None => mismatches.push(format!("{} missing from cache", domain)),
        }
    }

    if let Some(first) = mismatches.into_iter().next() {
        replay.fail(first);
    }
}
