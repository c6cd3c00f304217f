//! Lock-protected handle to a single run's resolution cache.
//!
//! A `DnsCache` is plain `&mut self` state and is meant to be owned by one
//! simulation pass. When a pass fans its requests out across threads, they
//! share the cache through this handle. Each operation takes the lock once,
//! so the lookup / compare / store sequence of `estimate_and_record` cannot
//! interleave with another estimate for the same domain.

use crate::dns_cache::DnsCache;
use dnssim_env::{DomainName, Resolvable};
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable, thread-safe handle to one `DnsCache`.
#[derive(Debug, Clone)]
pub struct SharedDnsCache {
    inner: Arc<Mutex<DnsCache>>,
}

impl SharedDnsCache {
    /// Wraps a cache for sharing.
    pub fn new(cache: DnsCache) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    /// See `DnsCache::estimate_and_record`. Runs under a single lock.
    pub fn estimate_and_record<R: Resolvable + ?Sized>(&self, request: &R, now: f64) -> f64 {
        self.inner.lock().estimate_and_record(request, now)
    }

    /// Runs `f` against the cache under a single lock acquisition.
    ///
    /// For callers that need to read and write an entry as one step, e.g.
    /// observing a domain's entry on both sides of an estimate.
    pub fn with_lock<T>(&self, f: impl FnOnce(&mut DnsCache) -> T) -> T {
        f(&mut self.inner.lock())
    }

    /// See `DnsCache::peek`.
    pub fn peek<R: Resolvable + ?Sized>(&self, request: &R, requested_at: f64) -> f64 {
        self.inner.lock().peek(request, requested_at)
    }

    /// See `DnsCache::set_resolved_at`.
    pub fn set_resolved_at(&self, domain: impl Into<DomainName>, resolved_at: f64) {
        self.inner.lock().set_resolved_at(domain, resolved_at);
    }

    /// See `DnsCache::resolved_at`.
    pub fn resolved_at(&self, domain: &str) -> Option<f64> {
        self.inner.lock().resolved_at(domain)
    }

    /// Returns the cold-lookup cost of the wrapped cache.
    pub fn baseline(&self) -> f64 {
        self.inner.lock().baseline()
    }

    /// See `DnsCache::snapshot`.
    pub fn snapshot(&self) -> Vec<(DomainName, f64)> {
        self.inner.lock().snapshot()
    }

    /// Number of stored domains.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if no domain has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Recovers the cache if this is the last handle.
    ///
    /// Returns the handle back when other clones are still alive.
    pub fn into_inner(self) -> Result<DnsCache, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clones_share_state() {
        let shared = SharedDnsCache::new(DnsCache::with_rtt(100.0).unwrap());
        let other = shared.clone();

        shared.estimate_and_record(&DomainName::new("a.com"), 0.0);
        assert_eq!(other.resolved_at("a.com"), Some(150.0));
        assert_eq!(other.peek(&DomainName::new("a.com"), 100.0), 50.0);
    }

    #[test]
    fn test_with_lock_sees_both_sides_of_estimate() {
        let shared = SharedDnsCache::new(DnsCache::with_rtt(100.0).unwrap());
        let domain = DomainName::new("a.com");

        let (before, wait, after) = shared.with_lock(|cache| {
            let before = cache.resolved_at("a.com");
            let wait = cache.estimate_and_record(&domain, 500.0);
            (before, wait, cache.resolved_at("a.com"))
        });
        assert_eq!((before, wait, after), (None, 150.0, Some(650.0)));

        let (before, after) = shared.with_lock(|cache| {
            let before = cache.resolved_at("a.com");
            cache.estimate_and_record(&domain, 100.0);
            (before, cache.resolved_at("a.com"))
        });
        assert_eq!((before, after), (Some(650.0), Some(250.0)));
    }

    #[test]
    fn test_into_inner_requires_unique_handle() {
        let shared = SharedDnsCache::new(DnsCache::with_rtt(100.0).unwrap());
        let other = shared.clone();

        let shared = shared.into_inner().unwrap_err();
        drop(other);

        let cache = shared.into_inner().unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_estimates_keep_earliest_instant() {
        let shared = SharedDnsCache::new(DnsCache::with_rtt(10.0).unwrap());
        let domain = DomainName::new("hot.com");

        thread::scope(|s| {
            for worker in 0..8u32 {
                let shared = shared.clone();
                let domain = domain.clone();
                s.spawn(move || {
                    for i in 0..200u32 {
                        let now = f64::from(worker * 1_000 + i);
                        let wait = shared.estimate_and_record(&domain, now);
                        assert!(wait >= 0.0 && wait <= 15.0);
                    }
                });
            }
        });

        // Worker 0 issued a request at t=0 which cold-resolves at t=15;
        // whatever the interleaving, nothing may have pushed it later.
        let stored = shared.resolved_at("hot.com").unwrap();
        assert!(stored <= 15.0, "stored instant {} drifted later", stored);
    }
}
