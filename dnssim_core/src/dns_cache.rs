//! The resolution cache - per-domain DNS timing for a simulation run.
//!
//! Every simulated request has to wait for its host to resolve before it can
//! open a connection. The first request to a domain pays a cold lookup; the
//! cache then remembers *when* that lookup finished so later requests only
//! wait for whatever part of it is still outstanding.
//!
//! ```text
//!   requested_at          resolved_at (R)
//!        |---- max(R - t, 0) ----|
//!        |------- rtt * 1.5 --------------|   (cold lookup, upper bound)
//! ```
//!
//! Stored instants only ever move earlier on the estimation path, so a
//! domain never becomes "slower" to resolve as the simulation progresses.

use crate::error::CacheError;
use crate::options::DnsCacheOptions;
use dnssim_env::{DomainName, Resolvable};
use std::collections::HashMap;
use tracing::{debug, trace};

/// DNS resolution cache for one simulation run.
///
/// All instants and durations are milliseconds on the synthetic timeline.
#[derive(Debug, Clone)]
pub struct DnsCache {
    /// Round-trip time baseline (always positive and finite)
    rtt: f64,

    /// Earliest known resolved-at instant per domain
    resolved_at: HashMap<DomainName, f64>,
}

impl DnsCache {
    /// Cost of a cold lookup, in multiples of the RTT.
    pub const RTT_MULTIPLIER: f64 = 1.5;

    /// Creates an empty cache.
    ///
    /// # Errors
    /// `CacheError::InvalidConfiguration` if `options.rtt` is missing, zero,
    /// NaN, negative or infinite.
    pub fn new(options: DnsCacheOptions) -> Result<Self, CacheError> {
        let rtt = options.validate()?;

        Ok(Self {
            rtt,
            resolved_at: HashMap::new(),
        })
    }

    /// Creates an empty cache with the given RTT.
    pub fn with_rtt(rtt: f64) -> Result<Self, CacheError> {
        Self::new(DnsCacheOptions::with_rtt(rtt))
    }

    /// Returns the RTT this cache was built with.
    pub fn rtt(&self) -> f64 {
        self.rtt
    }

    /// Returns the cost of a cold lookup (`rtt * RTT_MULTIPLIER`).
    pub fn baseline(&self) -> f64 {
        self.rtt * Self::RTT_MULTIPLIER
    }

    /// Estimates the wait for `request` at `now` and commits the result.
    ///
    /// This is the authoritative path used while walking the canonical
    /// timeline. The domain's stored resolution instant becomes the earlier
    /// of its current value and `now + returned duration`.
    ///
    /// # Returns
    /// Milliseconds until the domain is resolved, in `[0, baseline]`.
    pub fn estimate_and_record<R: Resolvable + ?Sized>(&mut self, request: &R, now: f64) -> f64 {
        let domain = request.domain();
        let time_until_resolved = self.time_until_resolution(domain, now);
        let resolved_at = now + time_until_resolved;

        match self.resolved_at.get_mut(domain) {
            Some(stored) if resolved_at < *stored => {
                debug!(
                    "DNS tightened {}: t={:.1}ms wait={:.1}ms resolved_at {:.1} -> {:.1}",
                    domain, now, time_until_resolved, *stored, resolved_at
                );
                *stored = resolved_at;
            }
            Some(stored) => {
                debug!(
                    "DNS warm {}: t={:.1}ms wait={:.1}ms resolved_at={:.1}",
                    domain, now, time_until_resolved, *stored
                );
            }
            None => {
                debug!(
                    "DNS cold {}: t={:.1}ms wait={:.1}ms resolved_at={:.1}",
                    domain, now, time_until_resolved, resolved_at
                );
                self.resolved_at.insert(domain.clone(), resolved_at);
            }
        }

        time_until_resolved
    }

    /// Estimates the wait for `request` at `requested_at` without committing.
    ///
    /// Side-query for alternate simulation branches: calling it any number
    /// of times leaves the cache exactly as it was.
    pub fn peek<R: Resolvable + ?Sized>(&self, request: &R, requested_at: f64) -> f64 {
        self.time_until_resolution(request.domain(), requested_at)
    }

    /// Forcefully sets the resolution instant for a domain.
    ///
    /// Bypasses the earliest-wins rule. Useful for seeding deterministic
    /// state in tests and alternate execution simulations.
    pub fn set_resolved_at(&mut self, domain: impl Into<DomainName>, resolved_at: f64) {
        let domain = domain.into();
        trace!("DNS force-set {} resolved_at={:.1}", domain, resolved_at);
        self.resolved_at.insert(domain, resolved_at);
    }

    /// Returns the stored resolution instant for `domain`, if any.
    pub fn resolved_at(&self, domain: &str) -> Option<f64> {
        self.resolved_at.get(domain).copied()
    }

    /// Number of domains with a stored resolution instant.
    pub fn len(&self) -> usize {
        self.resolved_at.len()
    }

    /// Returns true if no domain has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.resolved_at.is_empty()
    }

    /// Iterates over all stored entries in arbitrary order.
    pub fn entries(&self) -> impl Iterator<Item = (&DomainName, f64)> + '_ {
        self.resolved_at.iter().map(|(domain, &at)| (domain, at))
    }

    /// Returns all stored entries sorted by domain.
    pub fn snapshot(&self) -> Vec<(DomainName, f64)> {
        let mut entries: Vec<(DomainName, f64)> = self
            .resolved_at
            .iter()
            .map(|(domain, &at)| (domain.clone(), at))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    fn time_until_resolution(&self, domain: &DomainName, requested_at: f64) -> f64 {
        let baseline = self.baseline();

        match self.resolved_at.get(domain) {
            Some(&resolved_at) => {
                let time_until_cached = (resolved_at - requested_at).max(0.0);
                time_until_cached.min(baseline)
            }
            None => baseline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use dnssim_env::NetworkRequest;

    fn cache(rtt: f64) -> DnsCache {
        DnsCache::with_rtt(rtt).unwrap()
    }

    fn request(host: &str) -> NetworkRequest {
        NetworkRequest::new(0, host)
    }

    #[test]
    fn test_construction_requires_rtt() {
        assert!(DnsCache::new(DnsCacheOptions::default()).is_err());
        assert!(matches!(
            DnsCache::with_rtt(0.0),
            Err(CacheError::InvalidConfiguration(_))
        ));

        let cache = cache(100.0);
        assert_eq!(cache.rtt(), 100.0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_rtt_multiplier() {
        assert_eq!(DnsCache::RTT_MULTIPLIER, 1.5);
        assert_relative_eq!(cache(0.1).baseline(), 0.15);
    }

    #[test]
    fn test_unseen_domain_costs_baseline() {
        let mut cache = cache(100.0);

        assert_eq!(cache.peek(&request("a.com"), 500.0), 150.0);
        assert_eq!(cache.estimate_and_record(&request("b.com"), 0.0), 150.0);
        assert_eq!(cache.estimate_and_record(&request("c.com"), 1234.5), 150.0);
    }

    #[test]
    fn test_warm_request_waits_for_outstanding_lookup() {
        let mut cache = cache(100.0);
        let req = request("a.com");

        assert_eq!(cache.estimate_and_record(&req, 0.0), 150.0);
        assert_eq!(cache.resolved_at("a.com"), Some(150.0));

        // Second request arrives while the first lookup is in flight
        assert_eq!(cache.estimate_and_record(&req, 100.0), 50.0);
        assert_eq!(cache.resolved_at("a.com"), Some(150.0));
    }

    #[test]
    fn test_past_resolution_is_free() {
        let mut cache = cache(100.0);
        cache.set_resolved_at("b.com", 20.0);

        assert_eq!(cache.estimate_and_record(&request("b.com"), 30.0), 0.0);
        // Stays at the earlier forced value
        assert_eq!(cache.resolved_at("b.com"), Some(20.0));
    }

    #[test]
    fn test_forced_value_read_back_exactly() {
        let mut cache = cache(100.0);
        cache.set_resolved_at("c.com", 400.0);

        assert_eq!(cache.resolved_at("c.com"), Some(400.0));
        assert_eq!(cache.estimate_and_record(&request("c.com"), 400.0), 0.0);
        assert_eq!(cache.resolved_at("c.com"), Some(400.0));
    }

    #[test]
    fn test_future_resolution_capped_at_baseline() {
        let mut cache = cache(100.0);
        cache.set_resolved_at("slow.com", 10_000.0);

        // A cached lookup can never be slower than a cold one
        assert_eq!(cache.estimate_and_record(&request("slow.com"), 0.0), 150.0);
        // ...and the stored instant tightens to the cold-lookup finish
        assert_eq!(cache.resolved_at("slow.com"), Some(150.0));
    }

    #[test]
    fn test_force_set_overrides_monotonic_rule() {
        let mut cache = cache(100.0);
        cache.estimate_and_record(&request("a.com"), 0.0);
        assert_eq!(cache.resolved_at("a.com"), Some(150.0));

        cache.set_resolved_at("a.com", 900.0);
        assert_eq!(cache.resolved_at("a.com"), Some(900.0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_peek_does_not_mutate() {
        let mut cache = cache(100.0);
        cache.estimate_and_record(&request("a.com"), 50.0);
        let before = cache.snapshot();

        let first = cache.peek(&request("a.com"), 0.0);
        for _ in 0..5 {
            assert_eq!(cache.peek(&request("a.com"), 0.0), first);
        }
        cache.peek(&request("never-seen.com"), 10.0);

        assert_eq!(cache.snapshot(), before);
        assert_eq!(first, 150.0);
    }

    #[test]
    fn test_earlier_request_tightens_entry() {
        let mut cache = cache(100.0);
        let req = request("a.com");

        cache.estimate_and_record(&req, 500.0);
        assert_eq!(cache.resolved_at("a.com"), Some(650.0));

        // Out-of-order replay: an earlier request finishes its lookup sooner
        assert_eq!(cache.estimate_and_record(&req, 100.0), 150.0);
        assert_eq!(cache.resolved_at("a.com"), Some(250.0));
    }

    #[test]
    fn test_accepts_bare_domain_names() {
        let mut cache = cache(10.0);
        let domain = DomainName::new("x.org");

        cache.estimate_and_record(&domain, 0.0);
        assert_eq!(cache.peek(&domain, 5.0), 10.0);
    }

    #[test]
    fn test_snapshot_sorted() {
        let mut cache = cache(10.0);
        cache.set_resolved_at("z.com", 1.0);
        cache.set_resolved_at("a.com", 2.0);
        cache.set_resolved_at("m.com", 3.0);

        let domains: Vec<String> = cache
            .snapshot()
            .into_iter()
            .map(|(d, _)| d.to_string())
            .collect();
        assert_eq!(domains, vec!["a.com", "m.com", "z.com"]);
        assert_eq!(cache.entries().count(), 3);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        const DOMAINS: [&str; 4] = ["a.com", "b.com", "c.com", "d.com"];

        proptest! {
            #[test]
            fn prop_stored_instants_never_increase(
                rtt in 0.1f64..500.0,
                steps in prop::collection::vec((0usize..4, 0.0f64..1_000.0), 1..64),
            ) {
                let mut cache = DnsCache::with_rtt(rtt).unwrap();
                let mut now = 0.0;

                for (idx, gap) in steps {
                    now += gap;
                    let domain = DomainName::new(DOMAINS[idx]);
                    let before = cache.resolved_at(domain.as_str());

                    let wait = cache.estimate_and_record(&domain, now);
                    prop_assert!(wait >= 0.0);
                    prop_assert!(wait <= cache.baseline());

                    let after = cache.resolved_at(domain.as_str()).unwrap();
                    if let Some(before) = before {
                        prop_assert!(after <= before);
                    }
                }
            }

            #[test]
            fn prop_out_of_order_never_increases(
                rtt in 0.1f64..500.0,
                times in prop::collection::vec(0.0f64..10_000.0, 1..64),
            ) {
                let mut cache = DnsCache::with_rtt(rtt).unwrap();
                let domain = DomainName::new("a.com");
                let mut previous = f64::INFINITY;

                for t in times {
                    cache.estimate_and_record(&domain, t);
                    let stored = cache.resolved_at("a.com").unwrap();
                    prop_assert!(stored <= previous);
                    previous = stored;
                }
            }

            #[test]
            fn prop_cached_term_is_clamped(
                resolved in 0.0f64..10_000.0,
                t in 0.0f64..10_000.0,
            ) {
                let mut cache = DnsCache::with_rtt(100.0).unwrap();
                cache.set_resolved_at("a.com", resolved);

                let expected = (resolved - t).max(0.0).min(150.0);
                prop_assert_eq!(cache.peek(&DomainName::new("a.com"), t), expected);
            }

            #[test]
            fn prop_peek_is_pure(
                seeded in prop::collection::vec((0usize..4, 0.0f64..1_000.0), 0..16),
                queries in prop::collection::vec((0usize..4, 0.0f64..2_000.0), 1..32),
            ) {
                let mut cache = DnsCache::with_rtt(40.0).unwrap();
                for (idx, at) in seeded {
                    cache.set_resolved_at(DOMAINS[idx], at);
                }
                let before = cache.snapshot();

                for (idx, t) in queries {
                    let domain = DomainName::new(DOMAINS[idx]);
                    let first = cache.peek(&domain, t);
                    prop_assert_eq!(cache.peek(&domain, t), first);
                }

                prop_assert_eq!(cache.snapshot(), before);
            }
        }
    }
}
