//! HTTP API
//!
//! Chat endpoints sit behind the admission gate; everything else bypasses it.

mod admission;
mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::agent::Orchestrator;
use crate::gate::AdmissionGate;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub admission: Arc<AdmissionGate>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        admission: AdmissionGate,
        request_timeout: Duration,
    ) -> Self {
        Self {
            orchestrator,
            admission: Arc::new(admission),
            request_timeout,
        }
    }
}
