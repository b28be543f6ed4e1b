//! Circuit breaker, grounded in `graceful_degradation.py`'s `CircuitBreaker`
//! class (CLOSED/OPEN/HALF_OPEN) and spec.md §4.4's state table, built on
//! `dashmap` for lock-free per-service state the way the teacher leans on
//! `bb8` for lock-free-ish pooled connection state.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::config::CircuitBreakerConfig;
use crate::errors::NextvisionError;
use crate::model::service_health::{ServiceHealth, ServiceState};

/// The breaker's own three-state model (spec.md §4.4). `ServiceState` in
/// the model module is a coarser, externally-facing view derived from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: CircuitState,
    opened_at: Option<DateTime<Utc>>,
    half_open_successes: u32,
    last_success: Option<DateTime<Utc>>,
    last_failure: Option<DateTime<Utc>>,
}

/// Per-service circuit breaker. Cheap to clone (wraps an `Arc`); intended to
/// live inside a `DashMap<String, CircuitBreaker>` keyed by service name,
/// the way the teacher's `Cache` wraps a shared `Box<dyn Geocoder>`.
#[derive(Clone)]
pub struct CircuitBreaker {
    service_name: Arc<str>,
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<Inner>>,
    consecutive_failures: Arc<AtomicU32>,
    success_count: Arc<AtomicU64>,
    failure_count: Arc<AtomicU64>,
}

impl CircuitBreaker {
    pub fn new(service_name: impl Into<Arc<str>>, config: CircuitBreakerConfig) -> Self {
        CircuitBreaker {
            service_name: service_name.into(),
            config,
            inner: Arc::new(Mutex::new(Inner {
                state: CircuitState::Closed,
                opened_at: None,
                half_open_successes: 0,
                last_success: None,
                last_failure: None,
            })),
            consecutive_failures: Arc::new(AtomicU32::new(0)),
            success_count: Arc::new(AtomicU64::new(0)),
            failure_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether a call should be allowed through right now. Transitions
    /// `Open -> HalfOpen` itself once `recovery_timeout` has elapsed, so
    /// callers don't need a separate ticker.
    #[instrument(skip(self), fields(service = %self.service_name))]
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|opened| Utc::now() - opened)
                    .and_then(|d| d.to_std().ok())
                    .unwrap_or_default();
                if elapsed >= self.config.recovery_timeout {
                    debug!("circuit entering half-open probe");
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Reject an attempted call when the circuit is open, as a typed error
    /// suitable for a `?`-based call site.
    pub fn guard(&self) -> crate::Result<()> {
        if self.allow_request() {
            Ok(())
        } else {
            Err(NextvisionError::FatalExternal {
                service: self.service_name.to_string(),
                message: "circuit open".into(),
            }
            .into())
        }
    }

    pub fn record_success(&self) {
        self.success_count.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let mut inner = self.inner.lock().unwrap();
        inner.last_success = Some(Utc::now());
        if inner.state == CircuitState::HalfOpen {
            inner.half_open_successes += 1;
            if inner.half_open_successes >= self.config.success_threshold {
                info!(service = %self.service_name, "circuit closing after successful probes");
                inner.state = CircuitState::Closed;
                inner.opened_at = None;
            }
        }
    }

    pub fn record_failure(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        let mut inner = self.inner.lock().unwrap();
        inner.last_failure = Some(Utc::now());
        match inner.state {
            CircuitState::HalfOpen => {
                info!(service = %self.service_name, "probe failed, reopening circuit");
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Utc::now());
            }
            CircuitState::Closed if failures >= self.config.failure_threshold => {
                info!(service = %self.service_name, failures, "circuit opening");
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Utc::now());
            }
            _ => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    /// A point-in-time snapshot for external reporting, distinct from the
    /// breaker's own internal three-state model.
    pub fn snapshot(&self) -> ServiceHealth {
        let inner = self.inner.lock().unwrap();
        let state = match inner.state {
            CircuitState::Closed => ServiceState::Healthy,
            CircuitState::HalfOpen => ServiceState::Degraded,
            CircuitState::Open => ServiceState::CircuitOpen,
        };
        let mut health = ServiceHealth::new(self.service_name.to_string());
        health.state = state;
        health.success_count = self.success_count.load(Ordering::Relaxed);
        health.failure_count = self.failure_count.load(Ordering::Relaxed);
        health.last_success = inner.last_success;
        health.last_failure = inner.last_failure;
        health.circuit_half_open_at = inner.opened_at.and_then(|opened| {
            chrono::Duration::from_std(self.config.recovery_timeout).ok().map(|d| opened + d)
        });
        health
    }
}
