// crates/agent-ledger-leader/src/lease.rs
// ============================================================================
// Module: Lease Contract
// Description: Coordination-store lease API and an in-memory implementation.
// Purpose: Define how replicas acquire, renew, and observe the writer lease.
// Dependencies: serde, thiserror, std::sync
// ============================================================================

//! ## Overview
//! The lease lives in the platform's coordination store; this module only
//! defines the contract and ships an in-memory implementation for tests and
//! single-host deployments. Grants carry a monotonic epoch (the resource
//! version of the lease object) that seeds fencing tokens.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::MutexGuard;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Lease operation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; none are fatal to the
///   process; they only gate side effects.
#[derive(Debug, Error)]
pub enum LeaseError {
    /// Another holder currently owns the lease.
    #[error("lease held by {holder_id} until {expires_at_ms}")]
    Held {
        /// Current holder identity.
        holder_id: String,
        /// Expiry of the current grant in caller milliseconds.
        expires_at_ms: u64,
    },
    /// The caller does not hold the lease it tried to renew or release.
    #[error("lease not held by {holder_id}")]
    NotHolder {
        /// Identity that attempted the operation.
        holder_id: String,
    },
    /// Transport failure against the coordination store.
    #[error("lease backend error: {0}")]
    Backend(String),
}

// ============================================================================
// SECTION: Grants
// ============================================================================

/// One granted lease term.
///
/// # Invariants
/// - `epoch` increases every time holdership changes hands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseGrant {
    /// Holder identity.
    pub holder_id: String,
    /// Monotonic epoch; the lease object's resource version.
    pub epoch: u64,
    /// Expiry in caller milliseconds.
    pub expires_at_ms: u64,
}

// ============================================================================
// SECTION: Lease API
// ============================================================================

/// Coordination-store lease operations.
///
/// Implementations must provide compare-and-swap semantics on the lease
/// object so two replicas cannot both acquire the same term.
pub trait LeaseApi {
    /// Acquires the lease when free or expired.
    ///
    /// # Errors
    ///
    /// Returns [`LeaseError::Held`] while another holder's grant is live and
    /// [`LeaseError::Backend`] on transport failure.
    fn acquire(
        &self,
        holder_id: &str,
        now_ms: u64,
        duration_ms: u64,
    ) -> Result<LeaseGrant, LeaseError>;

    /// Extends the caller's grant.
    ///
    /// # Errors
    ///
    /// Returns [`LeaseError::NotHolder`] when holdership changed hands and
    /// [`LeaseError::Backend`] on transport failure.
    fn renew(
        &self,
        holder_id: &str,
        now_ms: u64,
        duration_ms: u64,
    ) -> Result<LeaseGrant, LeaseError>;

    /// Releases the caller's grant early.
    ///
    /// # Errors
    ///
    /// Returns [`LeaseError::NotHolder`] when the caller does not hold the
    /// lease and [`LeaseError::Backend`] on transport failure.
    fn release(&self, holder_id: &str) -> Result<(), LeaseError>;

    /// Returns the current grant, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LeaseError::Backend`] on transport failure.
    fn current(&self) -> Result<Option<LeaseGrant>, LeaseError>;
}

// ============================================================================
// SECTION: In-Memory Lease
// ============================================================================

/// Mutable lease record guarded for concurrent replicas.
#[derive(Debug, Default)]
struct LeaseSlot {
    /// Current grant, if any.
    grant: Option<LeaseGrant>,
    /// Epoch counter advanced on every holdership change.
    epoch: u64,
}

/// In-memory lease for tests and single-host deployments.
///
/// # Invariants
/// - Compare-and-swap semantics hold across threads sharing one instance.
#[derive(Debug, Default)]
pub struct InMemoryLease {
    /// Guarded lease slot.
    slot: Mutex<LeaseSlot>,
}

impl InMemoryLease {
    /// Creates a free lease.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forcibly deletes the current grant, simulating operator intervention.
    ///
    /// # Errors
    ///
    /// Returns [`LeaseError::Backend`] when the internal lock is poisoned.
    pub fn evict_holder(&self) -> Result<(), LeaseError> {
        let mut slot = self.slot()?;
        slot.grant = None;
        Ok(())
    }

    /// Acquires the slot lock, mapping poisoning to a backend error.
    fn slot(&self) -> Result<MutexGuard<'_, LeaseSlot>, LeaseError> {
        self.slot.lock().map_err(|_| LeaseError::Backend("lease lock poisoned".to_string()))
    }
}

impl LeaseApi for InMemoryLease {
    fn acquire(
        &self,
        holder_id: &str,
        now_ms: u64,
        duration_ms: u64,
    ) -> Result<LeaseGrant, LeaseError> {
        let mut slot = self.slot()?;
        if let Some(grant) = &slot.grant
            && grant.expires_at_ms > now_ms
            && grant.holder_id != holder_id
        {
            return Err(LeaseError::Held {
                holder_id: grant.holder_id.clone(),
                expires_at_ms: grant.expires_at_ms,
            });
        }
        let fresh_holder = slot.grant.as_ref().is_none_or(|grant| grant.holder_id != holder_id);
        if fresh_holder {
            slot.epoch += 1;
        }
        let grant = LeaseGrant {
            holder_id: holder_id.to_string(),
            epoch: slot.epoch,
            expires_at_ms: now_ms + duration_ms,
        };
        slot.grant = Some(grant.clone());
        Ok(grant)
    }

    fn renew(
        &self,
        holder_id: &str,
        now_ms: u64,
        duration_ms: u64,
    ) -> Result<LeaseGrant, LeaseError> {
        let mut slot = self.slot()?;
        match &slot.grant {
            Some(grant) if grant.holder_id == holder_id => {
                let renewed = LeaseGrant {
                    holder_id: holder_id.to_string(),
                    epoch: grant.epoch,
                    expires_at_ms: now_ms + duration_ms,
                };
                slot.grant = Some(renewed.clone());
                Ok(renewed)
            }
            _ => Err(LeaseError::NotHolder { holder_id: holder_id.to_string() }),
        }
    }

    fn release(&self, holder_id: &str) -> Result<(), LeaseError> {
        let mut slot = self.slot()?;
        match &slot.grant {
            Some(grant) if grant.holder_id == holder_id => {
                slot.grant = None;
                Ok(())
            }
            _ => Err(LeaseError::NotHolder { holder_id: holder_id.to_string() }),
        }
    }

    fn current(&self) -> Result<Option<LeaseGrant>, LeaseError> {
        Ok(self.slot()?.grant.clone())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
