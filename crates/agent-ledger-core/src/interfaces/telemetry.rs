// crates/agent-ledger-core/src/interfaces/telemetry.rs
// ============================================================================
// Module: Store Telemetry
// Description: Observability hooks for store operations.
// Purpose: Provide counter events without hard observability dependencies.
// Dependencies: none
// ============================================================================

//! ## Overview
//! This module exposes a thin metrics interface for store counters. It is
//! intentionally dependency-light so downstream deployments can plug in
//! Prometheus or OpenTelemetry without redesign; the core never exposes
//! metrics itself.

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Store operation classification for counters.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMetric {
    /// A record was appended successfully.
    AppendOk,
    /// An append lost the conditional-create race.
    AppendConflict,
    /// A read stream completed successfully.
    ReadOk,
    /// A read surfaced an integrity failure.
    IntegrityFailure,
    /// A cached head indicator was rebuilt from the backing store.
    HeadRebuilt,
}

impl StoreMetric {
    /// Returns a stable label for the metric.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AppendOk => "append_ok",
            Self::AppendConflict => "append_conflict",
            Self::ReadOk => "read_ok",
            Self::IntegrityFailure => "integrity_failure",
            Self::HeadRebuilt => "head_rebuilt",
        }
    }
}

// ============================================================================
// SECTION: Telemetry Sink
// ============================================================================

/// Counter sink implemented by host observability layers.
pub trait StoreTelemetry: Send + Sync {
    /// Records one occurrence of the given metric.
    fn incr(&self, metric: StoreMetric);
}

/// Telemetry sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl StoreTelemetry for NoopTelemetry {
    fn incr(&self, _metric: StoreMetric) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::NoopTelemetry;
    use super::StoreMetric;
    use super::StoreTelemetry;

    #[test]
    fn labels_are_stable() {
        assert_eq!(StoreMetric::AppendOk.as_str(), "append_ok");
        assert_eq!(StoreMetric::HeadRebuilt.as_str(), "head_rebuilt");
    }

    #[test]
    fn noop_accepts_all_metrics() {
        let sink = NoopTelemetry;
        sink.incr(StoreMetric::AppendConflict);
        sink.incr(StoreMetric::IntegrityFailure);
    }
}
