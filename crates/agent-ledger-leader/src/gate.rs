// crates/agent-ledger-leader/src/gate.rs
// ============================================================================
// Module: Leader Gate State Machine
// Description: Follower/Leader/CoolingDown discipline with fencing tokens.
// Purpose: Gate side effects on lease holdership with a post-loss cooldown.
// Dependencies: crate::lease, agent-ledger-core, thiserror
// ============================================================================

//! ## Overview
//! One gate instance runs per replica:
//!
//! - `Follower` → `Leader` when acquisition succeeds.
//! - `Leader` → `Leader` on successful renewal.
//! - `Leader` → `CoolingDown` when renewal fails or a takeover is observed;
//!   side effects are suppressed and appends refused for one full lease
//!   duration.
//! - `CoolingDown` → `Follower` once the cooldown expires.
//!
//! The fencing token derived from the grant is forensic: it lets a
//! post-mortem attribute every event to an epoch and detect overlap, but the
//! store-side conditional append is what actually prevents collisions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use agent_ledger_core::FencingToken;
use agent_ledger_core::WriterId;
use thiserror::Error;

use crate::lease::LeaseApi;
use crate::lease::LeaseError;
use crate::lease::LeaseGrant;

// ============================================================================
// SECTION: Timings
// ============================================================================

/// Leader-gate timing parameters in caller milliseconds.
///
/// # Invariants
/// - `renew_deadline_ms < lease_duration_ms`.
/// - `retry_period_ms < renew_deadline_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseTimings {
    /// Full lease term granted on acquire and renew.
    pub lease_duration_ms: u64,
    /// Time after the last successful renewal at which leadership is
    /// considered lost locally.
    pub renew_deadline_ms: u64,
    /// Interval between acquisition attempts while following.
    pub retry_period_ms: u64,
}

impl Default for LeaseTimings {
    fn default() -> Self {
        Self { lease_duration_ms: 15_000, renew_deadline_ms: 10_000, retry_period_ms: 2_000 }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Leader-gate errors. Never fatal to the process; they only gate effects.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum LeaderError {
    /// The replica is not the current leader.
    #[error("not leader (state {state:?})")]
    NotLeader {
        /// Gate state at the time of the check.
        state: GateState,
    },
    /// The replica is cooling down after losing the lease.
    #[error("cooling down until {until_ms}")]
    CoolingDown {
        /// Caller-millisecond instant at which the cooldown ends.
        until_ms: u64,
    },
    /// Leadership was lost after an externally observable side effect.
    #[error("leadership lost after side effect; cooling down until {until_ms}")]
    LostAfterAction {
        /// Caller-millisecond instant at which the cooldown ends.
        until_ms: u64,
    },
    /// The coordination store failed.
    #[error(transparent)]
    Lease(#[from] LeaseError),
}

// ============================================================================
// SECTION: Gate State
// ============================================================================

/// Replica-local leadership state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Not holding the lease; acquisition attempts are allowed.
    Follower,
    /// Holding the lease; side effects are allowed.
    Leader,
    /// Recently lost the lease; side effects suppressed until the instant.
    CoolingDown {
        /// Caller-millisecond instant at which the cooldown ends.
        until_ms: u64,
    },
}

/// Leader gate for one replica.
///
/// # Invariants
/// - All time values are caller-supplied milliseconds; the gate never reads
///   a wall clock.
#[derive(Debug)]
pub struct LeaderGate<L: LeaseApi> {
    /// Replica identity used as the lease holder id.
    writer_id: WriterId,
    /// Coordination-store lease handle.
    lease: L,
    /// Gate timings.
    timings: LeaseTimings,
    /// Current state.
    state: GateState,
    /// Grant backing the current leadership, when leading.
    grant: Option<LeaseGrant>,
    /// Instant of the last successful acquire or renew.
    last_renewal_ms: u64,
}

impl<L: LeaseApi> LeaderGate<L> {
    /// Creates a follower gate around a lease handle.
    #[must_use]
    pub const fn new(writer_id: WriterId, lease: L, timings: LeaseTimings) -> Self {
        Self {
            writer_id,
            lease,
            timings,
            state: GateState::Follower,
            grant: None,
            last_renewal_ms: 0,
        }
    }

    /// Returns the current gate state.
    #[must_use]
    pub const fn state(&self) -> GateState {
        self.state
    }

    /// Returns the writer identity this gate speaks for.
    #[must_use]
    pub const fn writer_id(&self) -> &WriterId {
        &self.writer_id
    }

    /// Returns the underlying lease handle.
    #[must_use]
    pub const fn lease_handle(&self) -> &L {
        &self.lease
    }

    /// Returns the forensic fencing token for the current epoch.
    #[must_use]
    pub fn fencing_token(&self) -> Option<FencingToken> {
        self.grant.as_ref().map(|grant| {
            FencingToken::new(format!("{:016x}:{}", grant.epoch, grant.holder_id))
        })
    }

    /// Drives the state machine one step at the given instant.
    ///
    /// Followers attempt acquisition, leaders renew when due, and cooldowns
    /// expire back to follower. Acquisition failure while following is not
    /// an error; the gate simply stays a follower.
    ///
    /// # Errors
    ///
    /// Returns [`LeaderError::Lease`] on coordination-store transport
    /// failure.
    pub fn poll(&mut self, now_ms: u64) -> Result<GateState, LeaderError> {
        match self.state {
            GateState::Follower => self.try_acquire(now_ms),
            GateState::Leader => self.try_renew(now_ms),
            GateState::CoolingDown { until_ms } => {
                if now_ms >= until_ms {
                    self.state = GateState::Follower;
                }
                Ok(self.state)
            }
        }
    }

    /// Pre-action check: permits a side effect or append only while leading.
    ///
    /// # Errors
    ///
    /// Returns [`LeaderError::NotLeader`] or [`LeaderError::CoolingDown`]
    /// when the replica must not act.
    pub fn pre_action_check(&mut self, now_ms: u64) -> Result<FencingToken, LeaderError> {
        match self.state {
            GateState::CoolingDown { until_ms } => {
                Err(LeaderError::CoolingDown { until_ms })
            }
            GateState::Follower => Err(LeaderError::NotLeader { state: self.state }),
            GateState::Leader => {
                if now_ms.saturating_sub(self.last_renewal_ms) > self.timings.renew_deadline_ms {
                    // Local belief expired; demote before acting.
                    self.enter_cooldown(now_ms);
                    return Err(LeaderError::NotLeader { state: self.state });
                }
                self.fencing_token().ok_or(LeaderError::NotLeader { state: self.state })
            }
        }
    }

    /// Post-action check: re-confirms holdership after a side effect.
    ///
    /// On loss the gate enters cooldown and reports the loss so callers can
    /// flag the completed effect for forensic review.
    ///
    /// # Errors
    ///
    /// Returns [`LeaderError::LostAfterAction`] when holdership moved while
    /// the effect was in flight, or [`LeaderError::Lease`] on transport
    /// failure.
    pub fn post_action_check(&mut self, now_ms: u64) -> Result<(), LeaderError> {
        let current = self.lease.current()?;
        let still_holder = current
            .as_ref()
            .is_some_and(|grant| {
                grant.holder_id == self.writer_id.as_str() && grant.expires_at_ms > now_ms
            });
        if still_holder {
            return Ok(());
        }
        let until_ms = self.enter_cooldown(now_ms);
        Err(LeaderError::LostAfterAction { until_ms })
    }

    /// Attempts acquisition while following.
    fn try_acquire(&mut self, now_ms: u64) -> Result<GateState, LeaderError> {
        match self.lease.acquire(
            self.writer_id.as_str(),
            now_ms,
            self.timings.lease_duration_ms,
        ) {
            Ok(grant) => {
                self.grant = Some(grant);
                self.last_renewal_ms = now_ms;
                self.state = GateState::Leader;
                Ok(self.state)
            }
            Err(LeaseError::Held { .. } | LeaseError::NotHolder { .. }) => Ok(self.state),
            Err(err @ LeaseError::Backend(_)) => Err(LeaderError::Lease(err)),
        }
    }

    /// Attempts renewal while leading; failure demotes into cooldown.
    fn try_renew(&mut self, now_ms: u64) -> Result<GateState, LeaderError> {
        if now_ms.saturating_sub(self.last_renewal_ms) > self.timings.renew_deadline_ms {
            self.enter_cooldown(now_ms);
            return Ok(self.state);
        }
        match self.lease.renew(
            self.writer_id.as_str(),
            now_ms,
            self.timings.lease_duration_ms,
        ) {
            Ok(grant) => {
                self.grant = Some(grant);
                self.last_renewal_ms = now_ms;
                Ok(self.state)
            }
            Err(LeaseError::NotHolder { .. } | LeaseError::Held { .. }) => {
                // Takeover observed.
                self.enter_cooldown(now_ms);
                Ok(self.state)
            }
            Err(err @ LeaseError::Backend(_)) => Err(LeaderError::Lease(err)),
        }
    }

    /// Enters cooldown for one full lease duration, returning its end.
    fn enter_cooldown(&mut self, now_ms: u64) -> u64 {
        let until_ms = now_ms + self.timings.lease_duration_ms;
        self.state = GateState::CoolingDown { until_ms };
        self.grant = None;
        until_ms
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use agent_ledger_core::WriterId;

    use super::GateState;
    use super::LeaderError;
    use super::LeaderGate;
    use super::LeaseTimings;
    use crate::lease::InMemoryLease;
    use crate::lease::LeaseApi;

    /// Returns compact timings for scripted tests.
    fn timings() -> LeaseTimings {
        LeaseTimings { lease_duration_ms: 1000, renew_deadline_ms: 600, retry_period_ms: 100 }
    }

    #[test]
    fn follower_becomes_leader_on_free_lease() {
        let mut gate = LeaderGate::new(WriterId::new("r1"), InMemoryLease::new(), timings());
        assert_eq!(gate.poll(0).unwrap(), GateState::Leader);
        assert!(gate.fencing_token().is_some());
    }

    #[test]
    fn pre_action_check_refuses_followers() {
        let lease = InMemoryLease::new();
        lease.acquire("other", 0, 1000).unwrap();
        let mut gate = LeaderGate::new(WriterId::new("r1"), lease, timings());
        assert_eq!(gate.poll(0).unwrap(), GateState::Follower);
        assert!(matches!(
            gate.pre_action_check(0),
            Err(LeaderError::NotLeader { .. })
        ));
    }

    #[test]
    fn missed_renew_deadline_enters_cooldown_for_a_full_lease_duration() {
        let mut gate = LeaderGate::new(WriterId::new("r1"), InMemoryLease::new(), timings());
        gate.poll(0).unwrap();
        // Way past the renew deadline.
        let state = gate.poll(700).unwrap();
        assert_eq!(state, GateState::CoolingDown { until_ms: 1700 });
        assert!(matches!(
            gate.pre_action_check(800),
            Err(LeaderError::CoolingDown { until_ms: 1700 })
        ));
        // Cooldown expires back to follower.
        assert_eq!(gate.poll(1700).unwrap(), GateState::Follower);
    }

    #[test]
    fn post_action_check_detects_takeover() {
        let lease = InMemoryLease::new();
        let mut gate = LeaderGate::new(WriterId::new("r1"), lease, timings());
        gate.poll(0).unwrap();
        gate.pre_action_check(100).unwrap();

        // The operator deletes the lease and a rival takes it.
        {
            let lease = gate.lease_handle();
            lease.evict_holder().unwrap();
            lease.acquire("r2", 150, 1000).unwrap();
        }
        let err = gate.post_action_check(200).unwrap_err();
        assert!(matches!(err, LeaderError::LostAfterAction { until_ms: 1200 }));
        assert!(matches!(gate.state(), GateState::CoolingDown { .. }));
    }

    #[test]
    fn fencing_token_carries_epoch_and_holder() {
        let mut gate = LeaderGate::new(WriterId::new("r1"), InMemoryLease::new(), timings());
        gate.poll(0).unwrap();
        let token = gate.fencing_token().unwrap();
        assert_eq!(token.as_str(), "0000000000000001:r1");
    }
}
