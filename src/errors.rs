//! Error types and classification.
//!
//! Internal plumbing (HTTP clients, (de)serialization, connection pools)
//! chains causes with [`anyhow::Error`], the same way the teacher's
//! `geocoders` and `key_value_stores` modules do. At the boundary of a
//! component that the rest of the engine depends on directly (`Geocoder`,
//! `Router`, `MatchEngine`, `BatchOrchestrator`), failures are classified
//! into [`NextvisionError`] so callers can make a retry/give-up decision
//! without inspecting error chains.

use thiserror::Error;

/// A recovery suggestion to surface to a caller, alongside a classified error.
pub type RecoverySuggestion = &'static str;

/// Errors produced at the boundary of the core scoring/orchestration engine.
///
/// Variants correspond to the error-kind classification in the error
/// handling design: input errors are never retried, transient errors are
/// retried by [`crate::resilience::retry`] before surfacing, quota errors
/// degrade immediately, fatal-external errors degrade with a health signal,
/// invariant violations fail only the offending match, and cancellation is
/// its own non-retryable class.
#[derive(Debug, Clone, Error)]
pub enum NextvisionError {
    /// Missing required fields, invalid addresses, out-of-range numerics.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Human-readable explanation.
        message: String,
    },

    /// Timeouts, 5xx from a map provider, dropped cache connections — the
    /// retry budget for this call has been exhausted.
    #[error("transient failure in {service} after retries: {message}")]
    Transient {
        /// The external service that failed.
        service: String,
        /// Human-readable explanation.
        message: String,
    },

    /// The map provider reported we are over (or near) our daily quota.
    #[error("quota exceeded for {service}")]
    QuotaExceeded {
        /// The external service whose quota was exceeded.
        service: String,
    },

    /// A dependency we cannot function without is unreachable, but we can
    /// degrade and keep matching (e.g. L2 cache unreachable → L1-only).
    #[error("fatal external failure in {service}: {message}")]
    FatalExternal {
        /// The external service that failed.
        service: String,
        /// Human-readable explanation.
        message: String,
    },

    /// A subscore left [0,1] or weights failed to sum to 1 — a bug, not an
    /// external failure. Fails only the one match.
    #[error("internal invariant violated: {message}")]
    InvariantViolation {
        /// Human-readable explanation.
        message: String,
    },

    /// The caller's cancellation signal fired.
    #[error("operation cancelled")]
    Cancelled,
}

impl NextvisionError {
    /// A short, user-facing recovery suggestion, where one exists.
    pub fn recovery_suggestion(&self) -> Option<RecoverySuggestion> {
        match self {
            NextvisionError::InvalidInput { .. } => {
                Some("provide a more specific address or complete the missing field")
            }
            NextvisionError::Transient { .. } => Some("retry later"),
            NextvisionError::QuotaExceeded { .. } => {
                Some("retry after the daily quota window resets, or reduce request volume")
            }
            NextvisionError::FatalExternal { .. } => {
                Some("results are degraded; check service health before relying on transport data")
            }
            NextvisionError::InvariantViolation { .. } => None,
            NextvisionError::Cancelled => None,
        }
    }

    /// Whether this error class is ever retryable by [`crate::resilience::retry`].
    ///
    /// Only transient, service-level failures are retryable. Input errors,
    /// quota errors, and cancellation are terminal by definition.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NextvisionError::Transient { .. })
    }
}

/// Convenience alias used throughout the crate for fallible internal calls.
pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// Display an error plus its full chain of underlying causes.
///
/// Grounded in the teacher's `display_causes_and_backtrace`, used by test
/// harnesses and any host application that wants a friendly dump of a
/// failed match.
pub fn display_causes(err: &anyhow::Error) -> String {
    let mut out = format!("Error: {err}");
    for cause in err.chain().skip(1) {
        out.push_str(&format!("\n  caused by: {cause}"));
    }
    out
}
