//! DnsSim Core - DNS Resolution Latency Model
//!
//! Models how long a simulated network request has to wait before its
//! domain name is resolvable, and remembers resolution instants so that
//! later requests to the same domain reuse them:
//! 1. **Cold lookups** cost `rtt * RTT_MULTIPLIER`
//! 2. **Warm lookups** cost whatever is left until the cached resolution
//!    instant, never more than a cold lookup
//! 3. **Side-queries** (`peek`) read the cache without touching it, so an
//!    alternate simulation branch cannot perturb the canonical state

pub mod dns_cache;
pub mod error;
pub mod options;
pub mod shared;

// Re-export key types for convenience
pub use dns_cache::DnsCache;
pub use error::CacheError;
pub use options::DnsCacheOptions;
pub use shared::SharedDnsCache;
