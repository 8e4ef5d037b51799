//! Load shedding for heavy endpoints
//!
//! Heavy requests take a slot with a non-blocking try-acquire. When the gate
//! is full the request is rejected on the spot with a retry hint; it is never
//! queued. Requests outside the heavy set never touch the gate.

use super::{ConcurrencyGate, GatePermit};
use std::sync::Arc;
use std::time::Duration;

/// Endpoints that drive model calls and are subject to admission control
pub const HEAVY_ENDPOINTS: &[&str] = &["/api/chat", "/api/chat/stream"];

/// Outcome of an admission attempt
#[derive(Debug)]
pub enum Admission {
    /// Endpoint is not in the heavy set
    Bypass,
    Admitted(AdmissionTicket),
    Rejected { retry_after: Duration },
}

/// Shared handle on an admission permit.
///
/// Cloneable so it can ride in request extensions and be moved into a
/// streaming task; the slot frees when the last clone drops.
#[derive(Debug, Clone)]
pub struct AdmissionTicket(#[allow(dead_code)] Arc<GatePermit>);

pub struct AdmissionGate {
    gate: ConcurrencyGate,
    heavy: &'static [&'static str],
    retry_after: Duration,
}

impl AdmissionGate {
    pub fn new(capacity: usize, retry_after: Duration) -> Self {
        Self::with_endpoints(capacity, retry_after, HEAVY_ENDPOINTS)
    }

    pub fn with_endpoints(
        capacity: usize,
        retry_after: Duration,
        heavy: &'static [&'static str],
    ) -> Self {
        Self {
            gate: ConcurrencyGate::new("admission", capacity),
            heavy,
            retry_after,
        }
    }

    pub fn is_heavy(&self, endpoint: &str) -> bool {
        let endpoint = endpoint.trim_end_matches('/');
        self.heavy.iter().any(|h| *h == endpoint)
    }

    /// Decide whether a request to `endpoint` may proceed
    pub fn admit(&self, endpoint: &str) -> Admission {
        if !self.is_heavy(endpoint) {
            return Admission::Bypass;
        }

        match self.gate.try_acquire() {
            Some(permit) => Admission::Admitted(AdmissionTicket(Arc::new(permit))),
            None => {
                tracing::warn!(
                    endpoint,
                    capacity = self.gate.capacity(),
                    "Heavy endpoint at capacity, shedding request"
                );
                Admission::Rejected {
                    retry_after: self.retry_after,
                }
            }
        }
    }

    pub fn retry_after(&self) -> Duration {
        self.retry_after
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }
}
