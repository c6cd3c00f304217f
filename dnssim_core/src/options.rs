//! Construction options for the resolution cache.

use crate::error::CacheError;
use serde::{Deserialize, Serialize};

/// Options accepted by `DnsCache::new`.
///
/// `rtt` is the only recognized option. It is the simulated round-trip time
/// in milliseconds and is required.
///
/// ```text
/// { "rtt": 100 }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DnsCacheOptions {
    /// Round-trip time baseline in milliseconds
    pub rtt: Option<f64>,
}

impl DnsCacheOptions {
    /// Creates options with the given RTT.
    pub fn with_rtt(rtt: f64) -> Self {
        Self { rtt: Some(rtt) }
    }

    /// Parses options from a JSON document.
    ///
    /// Parse failures and unknown fields are reported as
    /// `CacheError::InvalidConfiguration`. The RTT itself is not checked
    /// here; that happens in `validate`.
    pub fn from_json(json: &str) -> Result<Self, CacheError> {
        serde_json::from_str(json)
            .map_err(|e| CacheError::invalid(format!("cannot parse DNS cache options: {}", e)))
    }

    /// Returns the RTT if it is usable.
    ///
    /// Missing, zero and NaN values are rejected alike. Negative and
    /// infinite values would make every estimate meaningless, so they are
    /// rejected too.
    pub fn validate(&self) -> Result<f64, CacheError> {
        let rtt = self
            .rtt
            .ok_or_else(|| CacheError::invalid("Cannot create DNS cache with no rtt"))?;

        if rtt == 0.0 || rtt.is_nan() {
            return Err(CacheError::invalid("Cannot create DNS cache with no rtt"));
        }
        if !rtt.is_finite() || rtt < 0.0 {
            return Err(CacheError::invalid(format!(
                "DNS cache rtt must be a positive finite duration, got {}",
                rtt
            )));
        }

        Ok(rtt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let options = DnsCacheOptions::from_json(r#"{"rtt": 100}"#).unwrap();
        assert_eq!(options.rtt, Some(100.0));
        assert_eq!(options.validate(), Ok(100.0));
    }

    #[test]
    fn test_from_json_missing_rtt() {
        let options = DnsCacheOptions::from_json("{}").unwrap();
        assert_eq!(options.rtt, None);
        assert!(matches!(
            options.validate(),
            Err(CacheError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_from_json_rejects_unknown_fields() {
        let err = DnsCacheOptions::from_json(r#"{"rtt": 100, "ttl": 300}"#).unwrap_err();
        assert!(err.to_string().contains("ttl"));
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        assert!(DnsCacheOptions::from_json("rtt = 100").is_err());
    }

    #[test]
    fn test_validate_rejects_falsy_and_nonsense() {
        for rtt in [0.0, -0.0, f64::NAN, -5.0, f64::INFINITY] {
            assert!(
                DnsCacheOptions::with_rtt(rtt).validate().is_err(),
                "rtt {} should be rejected",
                rtt
            );
        }
    }

    #[test]
    fn test_validate_accepts_fractional() {
        assert_eq!(DnsCacheOptions::with_rtt(0.25).validate(), Ok(0.25));
    }
}
