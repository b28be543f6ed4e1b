//! Health reporting for external services, surfaced through a read-only
//! snapshot API (spec.md §3, `ServiceHealth`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The observed state of a named external service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Healthy,
    Degraded,
    Failing,
    Down,
    CircuitOpen,
}

/// A point-in-time snapshot of one service's health, safe to clone out of
/// the live [`crate::resilience::degradation::DegradationManager`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub service_name: String,
    pub state: ServiceState,
    pub success_count: u64,
    pub failure_count: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    /// Exponential moving average of response time, in milliseconds.
    pub avg_response_time_ms: f64,
    /// When the circuit breaker is open, when it will allow a half-open probe.
    pub circuit_half_open_at: Option<DateTime<Utc>>,
}

impl ServiceHealth {
    /// A freshly-registered, healthy service with no observed traffic yet.
    pub fn new(service_name: impl Into<String>) -> Self {
        ServiceHealth {
            service_name: service_name.into(),
            state: ServiceState::Healthy,
            success_count: 0,
            failure_count: 0,
            last_success: None,
            last_failure: None,
            avg_response_time_ms: 0.0,
            circuit_half_open_at: None,
        }
    }
}
