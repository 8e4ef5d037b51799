//! Counting-semaphore gates
//!
//! Two independent gates share this primitive: the provider gate that caps
//! simultaneous model calls (waiters suspend, FIFO), and the admission gate
//! for heavy endpoints (non-blocking, excess requests are shed).
//!
//! Both sit on `tokio::sync::Semaphore`. Acquisition is a single atomic step
//! (`acquire_owned` / `try_acquire_owned`); nothing reads the available count
//! and then acts on it. Permits release on drop, so error and cancellation
//! paths give them back without any extra bookkeeping.

pub mod admission;

pub use admission::{Admission, AdmissionGate, AdmissionTicket, HEAVY_ENDPOINTS};

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

#[derive(Debug, Error)]
pub enum GateError {
    #[error("{0} gate is closed")]
    Closed(&'static str),
}

/// A fixed-capacity concurrency gate
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    name: &'static str,
    capacity: usize,
    semaphore: Arc<Semaphore>,
}

impl ConcurrencyGate {
    /// # Panics
    ///
    /// Panics if `capacity` is zero; configuration validation rejects that
    /// before any gate is built.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        assert!(capacity > 0, "{name} gate capacity must be positive");
        Self {
            name,
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// Wait for a permit. Waiters are served first-come-first-served.
    pub async fn acquire(&self) -> Result<GatePermit, GateError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| GateError::Closed(self.name))?;
        Ok(GatePermit::new(self.name, permit))
    }

    /// Take a permit only if one is free right now
    pub fn try_acquire(&self) -> Option<GatePermit> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => Some(GatePermit::new(self.name, permit)),
            Err(TryAcquireError::NoPermits | TryAcquireError::Closed) => None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently held
    pub fn in_use(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }
}

/// A held permit. Dropping it releases the slot.
#[derive(Debug)]
#[must_use = "the gate slot is released as soon as the permit is dropped"]
pub struct GatePermit {
    gate: &'static str,
    _permit: OwnedSemaphorePermit,
}

impl GatePermit {
    fn new(gate: &'static str, permit: OwnedSemaphorePermit) -> Self {
        tracing::trace!(gate, "permit acquired");
        Self {
            gate,
            _permit: permit,
        }
    }

    /// Release explicitly. Equivalent to dropping the permit.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        tracing::trace!(gate = self.gate, "permit released");
    }
}
