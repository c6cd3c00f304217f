//! JSON exporter for replay runs.
//!
//! Exports the per-request DNS timings and the final cache state so a run
//! can be inspected or diffed against another seed.

use crate::error::SimError;
use dnssim_env::DomainName;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// DNS timing for a single replayed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub request_id: u64,
    pub domain: String,
    /// Instant the request was issued (ms)
    pub requested_at: f64,
    /// Wait until the domain resolved (ms)
    pub dns_ms: f64,
    pub resolved_at: f64,
}

impl ReplayFrame {
    pub fn new(request_id: u64, domain: &DomainName, requested_at: f64, dns_ms: f64) -> Self {
        Self {
            request_id,
            domain: domain.to_string(),
            requested_at,
            dns_ms,
            resolved_at: requested_at + dns_ms,
        }
    }
}

/// One cache entry at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub domain: String,
    pub resolved_at: f64,
}

/// Complete replay export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Cache RTT (ms)
    pub rtt_ms: f64,

    /// Cold lookup cost (ms)
    pub baseline_ms: f64,

    /// All frames, in replay order
    pub frames: Vec<ReplayFrame>,

    /// Cache state after the last request, sorted by domain
    pub final_cache: Vec<CacheEntry>,

    /// Final result
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl ReplayExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64, rtt_ms: f64, baseline_ms: f64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            rtt_ms,
            baseline_ms,
            frames: Vec::new(),
            final_cache: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: ReplayFrame) {
        self.frames.push(frame);
    }

    /// Finalizes the export with the run outcome and final cache snapshot.
    pub fn finalize(
        &mut self,
        passed: bool,
        failure_reason: Option<String>,
        snapshot: Vec<(DomainName, f64)>,
    ) {
        self.passed = passed;
        self.failure_reason = failure_reason;
        self.final_cache = snapshot
            .into_iter()
            .map(|(domain, resolved_at)| CacheEntry {
                domain: domain.to_string(),
                resolved_at,
            })
            .collect();
    }

    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> Result<(), SimError> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_json_shape() {
        let mut export = ReplayExport::new("warm_cache", 42, 100.0, 150.0);
        export.add_frame(ReplayFrame::new(0, &DomainName::new("a.com"), 0.0, 150.0));
        export.add_frame(ReplayFrame::new(1, &DomainName::new("a.com"), 100.0, 50.0));
        export.finalize(true, None, vec![(DomainName::new("a.com"), 150.0)]);

        let value: serde_json::Value = serde_json::from_str(&export.to_json().unwrap()).unwrap();
        assert_eq!(value["scenario"], "warm_cache");
        assert_eq!(value["frames"][1]["resolved_at"], 150.0);
        assert_eq!(value["final_cache"][0]["domain"], "a.com");
        // Omitted when the run passed
        assert!(value.get("failure_reason").is_none());
    }

    #[test]
    fn test_export_round_trips_failure() {
        let mut export = ReplayExport::new("prewarmed", 1, 10.0, 15.0);
        export.finalize(false, Some("boom".to_string()), Vec::new());

        let back: ReplayExport = serde_json::from_str(&export.to_json().unwrap()).unwrap();
        assert!(!back.passed);
        assert_eq!(back.failure_reason.as_deref(), Some("boom"));
    }

    #[test]
    fn test_write_to_unwritable_path_errors() {
        let export = ReplayExport::new("cold_start", 1, 10.0, 15.0);
        let err = export
            .write_to_file("/nonexistent-dir/replay.json")
            .unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
    }
}
