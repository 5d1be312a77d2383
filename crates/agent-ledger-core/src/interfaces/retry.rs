// crates/agent-ledger-core/src/interfaces/retry.rs
// ============================================================================
// Module: Append Retry
// Description: Conditional append with bounded backoff, jitter, and deadline.
// Purpose: Absorb benign append races without hiding persistent failures.
// Dependencies: crate::interfaces, rand, std::time
// ============================================================================

//! ## Overview
//! `append_with_retry` composes the store primitives: read the tail, append
//! with that tail as the precondition, and on [`StoreError::Conflict`] refresh
//! the view and try again with exponential backoff and bounded jitter. A
//! caller-supplied deadline is honored; on expiry the call returns a timeout
//! outcome without having mutated anything. Every other store error surfaces
//! unchanged on the first occurrence.
//!
//! Jitter only perturbs sleep durations between attempts; it never touches
//! the hashed surface, so determinism of the log content is unaffected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread;
use std::time::Duration;
use std::time::Instant;

use rand::Rng;
use thiserror::Error;

use crate::core::event::EventDraft;
use crate::core::event::LogRecord;
use crate::interfaces::EventStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Retry Policy
// ============================================================================

/// Bounded retry parameters for conditional appends.
///
/// # Invariants
/// - `max_attempts >= 1`; zero is normalized to one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of append attempts.
    pub max_attempts: u32,
    /// Base backoff applied after the first conflict.
    pub base_backoff: Duration,
    /// Upper bound for the random jitter added to each backoff.
    pub jitter_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff: Duration::from_millis(25),
            jitter_cap: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// Computes the sleep before the given retry attempt (1-based).
    fn backoff_for(self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base = self.base_backoff.saturating_mul(1_u32 << exponent);
        let jitter_ms = u64::try_from(self.jitter_cap.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return base;
        }
        let jitter = rand::thread_rng().gen_range(0 ..= jitter_ms);
        base.saturating_add(Duration::from_millis(jitter))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Retry outcomes that did not produce a stored record.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum RetryError {
    /// Every attempt lost the append race.
    #[error("append conflicted after {attempts} attempts")]
    AttemptsExhausted {
        /// Number of attempts made.
        attempts: u32,
    },
    /// The caller-supplied deadline expired between attempts.
    #[error("append deadline exceeded after {attempts} attempts")]
    DeadlineExceeded {
        /// Number of attempts made before expiry.
        attempts: u32,
    },
    /// A non-retryable store error surfaced.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Append With Retry
// ============================================================================

/// Appends a draft, absorbing conflicts with bounded backoff and jitter.
///
/// # Errors
///
/// Returns [`RetryError::AttemptsExhausted`] when the race is lost on every
/// attempt, [`RetryError::DeadlineExceeded`] when the deadline expires, and
/// [`RetryError::Store`] for any non-conflict store error.
pub fn append_with_retry(
    store: &dyn EventStore,
    draft: &EventDraft,
    policy: RetryPolicy,
    deadline: Option<Duration>,
) -> Result<LogRecord, RetryError> {
    let started = Instant::now();
    let attempts = policy.max_attempts.max(1);
    for attempt in 1 ..= attempts {
        if let Some(limit) = deadline
            && started.elapsed() >= limit
        {
            return Err(RetryError::DeadlineExceeded { attempts: attempt - 1 });
        }
        let tail = store.tail().map_err(RetryError::Store)?;
        match store.append(draft.clone(), &tail.last_event_hash) {
            Ok(record) => return Ok(record),
            Err(StoreError::Conflict { .. }) if attempt < attempts => {
                thread::sleep(policy.backoff_for(attempt));
            }
            Err(StoreError::Conflict { .. }) => {
                return Err(RetryError::AttemptsExhausted { attempts });
            }
            Err(other) => return Err(RetryError::Store(other)),
        }
    }
    Err(RetryError::AttemptsExhausted { attempts })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
