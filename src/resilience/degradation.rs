//! Graceful degradation: fallback strategies registered per
//! `(service, error kind)`, grounded in `graceful_degradation.py`'s
//! `GracefulDegradationManager` and `ServiceFallback` registry, rebuilt
//! around `dashmap` for the registry the teacher would have reached for a
//! `HashMap` behind a mutex.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{instrument, warn};

use crate::errors::NextvisionError;

/// Whether an operation's result came from the primary path or a fallback.
#[derive(Debug, Clone)]
pub enum FallbackOutcome<T> {
    Primary(T),
    Fallback(T),
}

impl<T> FallbackOutcome<T> {
    pub fn into_inner(self) -> T {
        match self {
            FallbackOutcome::Primary(v) | FallbackOutcome::Fallback(v) => v,
        }
    }

    pub fn used_fallback(&self) -> bool {
        matches!(self, FallbackOutcome::Fallback(_))
    }
}

type FallbackFn<T> =
    Arc<dyn Fn(&NextvisionError) -> Pin<Box<dyn Future<Output = crate::Result<T>> + Send>> + Send + Sync>;

/// Registry of fallback closures keyed by service name, generic over the
/// value type a given service produces (one manager per value type, e.g.
/// one for geocoding and one for routing, mirroring how the Python original
/// registers fallbacks per-service rather than globally).
pub struct DegradationManager<T> {
    fallbacks: DashMap<String, FallbackFn<T>>,
}

impl<T: Send + 'static> DegradationManager<T> {
    pub fn new() -> Self {
        DegradationManager {
            fallbacks: DashMap::new(),
        }
    }

    /// Register the fallback to use when `service_name`'s primary path
    /// fails. Registering twice replaces the previous fallback.
    pub fn register<F, Fut>(&self, service_name: impl Into<String>, fallback: F)
    where
        F: Fn(&NextvisionError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = crate::Result<T>> + Send + 'static,
    {
        let boxed: FallbackFn<T> = Arc::new(move |err| Box::pin(fallback(err)));
        self.fallbacks.insert(service_name.into(), boxed);
    }

    /// Run `primary`; on failure, look up a registered fallback for
    /// `service_name` and run it instead. If no fallback is registered, or
    /// the fallback itself fails, the original error is returned.
    #[instrument(skip(self, primary), fields(service = %service_name))]
    pub async fn run_with_fallback<F, Fut>(&self, service_name: &str, primary: F) -> crate::Result<FallbackOutcome<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = crate::Result<T>>,
    {
        match primary().await {
            Ok(value) => Ok(FallbackOutcome::Primary(value)),
            Err(err) => {
                let nv_err = err
                    .downcast_ref::<NextvisionError>()
                    .cloned()
                    .unwrap_or_else(|| NextvisionError::FatalExternal {
                        service: service_name.to_string(),
                        message: err.to_string(),
                    });
                match self.fallbacks.get(service_name) {
                    Some(fallback) => {
                        warn!(error = %nv_err, "primary path failed, invoking fallback");
                        fallback(&nv_err).await.map(FallbackOutcome::Fallback)
                    }
                    None => Err(err),
                }
            }
        }
    }
}

impl<T: Send + 'static> Default for DegradationManager<T> {
    fn default() -> Self {
        Self::new()
    }
}
