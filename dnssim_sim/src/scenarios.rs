//! Replay scenarios for DST.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// DNS-001: every request hits a fresh domain
    ColdStart,

    /// DNS-002: popular domains replayed in time order
    WarmCache,

    /// DNS-003: same workload, shuffled replay order
    OutOfOrder,

    /// DNS-004: part of the cache seeded before replay
    Prewarmed,

    /// DNS-005: side-queries interleaved with authoritative estimates
    WhatIf,

    /// DNS-006: one cache shared by several worker threads
    Contended,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::ColdStart,
            ScenarioId::WarmCache,
            ScenarioId::OutOfOrder,
            ScenarioId::Prewarmed,
            ScenarioId::WhatIf,
            ScenarioId::Contended,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::ColdStart => "cold_start",
            ScenarioId::WarmCache => "warm_cache",
            ScenarioId::OutOfOrder => "out_of_order",
            ScenarioId::Prewarmed => "prewarmed",
            ScenarioId::WhatIf => "what_if",
            ScenarioId::Contended => "contended",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::ColdStart => "Distinct domain per request, every lookup costs rtt * 1.5",
            ScenarioId::WarmCache => "Zipf-popular domains in time order, cached lookups reused",
            ScenarioId::OutOfOrder => "Shuffled replay, resolution instants must never move later",
            ScenarioId::Prewarmed => "Force-seeded domains resolve for free once their instant passes",
            ScenarioId::WhatIf => "Side-queries at alternate timestamps must not touch the cache",
            ScenarioId::Contended => "Worker threads share one cache behind a single lock",
        }
    }

    /// Returns true if the scenario spawns threads.
    pub fn is_concurrent(&self) -> bool {
        matches!(self, ScenarioId::Contended)
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cold_start" | "coldstart" | "dns-001" => Ok(ScenarioId::ColdStart),
            "warm_cache" | "warmcache" | "dns-002" => Ok(ScenarioId::WarmCache),
            "out_of_order" | "outoforder" | "dns-003" => Ok(ScenarioId::OutOfOrder),
            "prewarmed" | "dns-004" => Ok(ScenarioId::Prewarmed),
            "what_if" | "whatif" | "dns-005" => Ok(ScenarioId::WhatIf),
            "contended" | "dns-006" => Ok(ScenarioId::Contended),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
