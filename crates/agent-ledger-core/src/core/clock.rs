// crates/agent-ledger-core/src/core/clock.rs
// ============================================================================
// Module: Deterministic Clock
// Description: Monotonic logical clock for event timestamps.
// Purpose: Replace wall-clock reads with a replayable, explicit time value.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The engine never reads wall-clock time. Event timestamps come from a
//! logical clock that callers thread explicitly through the call graph.
//! Advancing the clock consumes it and yields a fresh instance, so a stale
//! clock value cannot be reused by accident.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Logical Clock
// ============================================================================

/// Monotonic logical clock.
///
/// # Invariants
/// - `tick` is strictly monotonic: each call yields a value greater than any
///   previously observed value of the same lineage.
/// - Reading via [`LogicalClock::now`] never advances the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalClock(u64);

impl LogicalClock {
    /// Creates a clock at logical time zero.
    #[must_use]
    pub const fn start() -> Self {
        Self(0)
    }

    /// Creates a clock seeded at an explicit logical time.
    ///
    /// Used when resuming from a replayed log whose last event carries `ts`.
    #[must_use]
    pub const fn at(value: u64) -> Self {
        Self(value)
    }

    /// Advances the clock, returning the successor clock and the fresh value.
    #[must_use]
    pub const fn tick(self) -> (Self, u64) {
        let next = self.0 + 1;
        (Self(next), next)
    }

    /// Returns the current logical time without advancing.
    #[must_use]
    pub const fn now(&self) -> u64 {
        self.0
    }
}

impl Default for LogicalClock {
    fn default() -> Self {
        Self::start()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
