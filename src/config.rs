//! Single configuration object for the engine (spec.md §6.4).
//!
//! Mirrors the teacher's command-line-driven configuration
//! (`geocode-csv`'s `Opt` struct in `main.rs`) but as a data object meant to
//! be deserialized by a host application, not parsed from `argv` — the CLI
//! surface is out of scope for this crate.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::retry::RetryStrategyKind;

/// Deployment environment. Outside of `Development`, unknown configuration
/// keys are rejected at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Staging,
    Production,
    Testing,
}

/// Credentials and quota policy for the external map provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapProviderConfig {
    /// Base URL of the external map provider's geocode endpoint.
    pub endpoint_url: String,
    pub api_key: String,
    /// Requests allowed per rolling day, before the Geocoder starts
    /// preferring cache-only reads (spec.md §4.1). Region-specific; not a
    /// constant (spec.md §9 open question).
    pub daily_request_ceiling: u64,
    /// Fraction of `daily_request_ceiling` at which the Geocoder begins
    /// preferring cache-only reads and emits a warning signal.
    pub quota_warning_fraction: f64,
    /// Locale bias sent with every geocoding request (spec.md §4.1).
    pub locale_bias: String,
    /// The region-default fallback centroid used when geocoding fails
    /// entirely (latitude, longitude).
    pub fallback_centroid: (f64, f64),
}

/// Credentials and endpoint for the external routing provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteProviderConfig {
    pub endpoint_url: String,
    pub api_key: String,
}

/// Connection descriptor for the remote (L2) key/value store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteStoreConfig {
    /// A `redis://` or `bigtable://` URL, same scheme convention as the
    /// teacher's `KeyValueStore::new_from_url`.
    pub url: String,
    pub key_prefix: String,
}

/// Per-namespace TTL policy for the [`crate::cache::MultiLevelCache`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheNamespaceTtls {
    pub geocoding: Duration,
    pub routing: Duration,
    pub match_result: Duration,
    pub bridge_cache: Duration,
}

impl Default for CacheNamespaceTtls {
    fn default() -> Self {
        CacheNamespaceTtls {
            geocoding: Duration::from_secs(24 * 3600),
            routing: Duration::from_secs(3600),
            match_result: Duration::from_secs(15 * 60),
            bridge_cache: Duration::from_secs(60),
        }
    }
}

/// Thresholds controlling [`crate::resilience::circuit_breaker::CircuitBreaker`]
/// state transitions (spec.md §4.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        CircuitBreakerConfig {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 3,
        }
    }
}

/// Retry strategy and limits for [`crate::resilience::retry::RetryExecutor`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub strategy: RetryStrategyKind,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            strategy: RetryStrategyKind::JitteredExponential,
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            jitter_factor: 0.1,
        }
    }
}

/// Concurrency shape for [`crate::batch::BatchOrchestrator`] (spec.md §4.10).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BatchConfig {
    pub max_concurrency: usize,
    pub chunk_size: usize,
    pub per_chunk_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            max_concurrency: 10,
            chunk_size: 50,
            per_chunk_timeout: Duration::from_secs(60),
        }
    }
}

/// Base weight vector and "listening reason" adjustment rules for
/// [`crate::scoring::weights::AdaptiveWeighter`] (spec.md §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeighterConfig {
    /// Base weights, keyed by component name; must sum to 1.0.
    pub base_weights: HashMap<String, f64>,
    /// Confidence, in [0,1], below which the motivations subscore is
    /// treated as absent and its weight redistributed.
    pub motivations_confidence_threshold: f64,
}

impl Default for WeighterConfig {
    fn default() -> Self {
        let base_weights = HashMap::from([
            ("semantic".to_string(), 0.27),
            ("hierarchical".to_string(), 0.14),
            ("compensation".to_string(), 0.18),
            ("experience".to_string(), 0.15),
            ("location".to_string(), 0.13),
            ("sector".to_string(), 0.05),
            ("motivations".to_string(), 0.08),
        ]);
        WeighterConfig {
            base_weights,
            motivations_confidence_threshold: 0.5,
        }
    }
}

/// Weekday+hour rush-hour windows, used by the Router to detect traffic
/// conditions and derive a traffic factor (spec.md §4.2). Region-specific,
/// hence configuration rather than a constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RushHourWindows {
    /// `(start_hour, end_hour)` pairs, in local time, applied Mon-Fri.
    pub windows: Vec<(u8, u8)>,
}

impl Default for RushHourWindows {
    fn default() -> Self {
        RushHourWindows {
            windows: vec![(7, 9), (17, 19)],
        }
    }
}

/// The single configuration object enumerating every tunable the engine
/// needs (spec.md §6.4). All fields are documented; unknown keys are
/// rejected outside of [`Environment::Development`] by [`NextvisionConfig::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextvisionConfig {
    pub environment: Environment,
    pub map_provider: MapProviderConfig,
    pub route_provider: RouteProviderConfig,
    pub remote_store: RemoteStoreConfig,
    pub cache_ttls: CacheNamespaceTtls,
    pub circuit_breaker: CircuitBreakerConfig,
    pub retry: RetryConfig,
    pub batch: BatchConfig,
    pub weighter: WeighterConfig,
    pub rush_hour: RushHourWindows,
    /// Tolerance applied to a mode's allowed time when deciding feasibility:
    /// `feasible ⇔ actual ≤ allowed × (1 + tolerance)` (spec.md §3).
    pub transport_time_tolerance: f64,
    /// Sector A -> Sector B -> penalty multiplier, for pairs considered
    /// incompatible (e.g. tech -> accounting = 0.5).
    pub sector_incompatibility_table: HashMap<String, HashMap<String, f64>>,
    /// Sector A -> Sector B -> compatibility score, for pairs considered
    /// compatible-but-not-identical (0.8-0.9 per spec.md §4.7).
    pub sector_compatibility_table: HashMap<String, HashMap<String, f64>>,
    /// skill -> [(synonym, confidence)], scoped per sector by the caller
    /// (keys are `"{sector}:{skill}"` to match spec.md's "within sector"
    /// qualifier).
    pub skill_synonym_table: HashMap<String, Vec<(String, f64)>>,
}

impl NextvisionConfig {
    /// Reject unknown keys outside of development, per spec.md §6.4.
    ///
    /// `serde`'s `deny_unknown_fields` can't be toggled at runtime, so
    /// callers that deserialize from an externally-controlled source (e.g.
    /// a config file endpoint) should deserialize into
    /// `serde_json::Value` first, diff its top-level keys against this
    /// struct's known field names, and call this purely as a documented
    /// policy check once the structured `NextvisionConfig` is built.
    pub fn validate(&self, known_top_level_keys: &[&str], seen_keys: &[String]) -> crate::Result<()> {
        if self.environment == Environment::Development {
            return Ok(());
        }
        for key in seen_keys {
            if !known_top_level_keys.contains(&key.as_str()) {
                anyhow::bail!("unknown configuration key {:?} rejected outside development", key);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_weights_sum_to_one() {
        let w = WeighterConfig::default();
        let sum: f64 = w.base_weights.values().sum();
        assert!((sum - 1.0).abs() < 1e-9, "sum was {sum}");
    }

    #[test]
    fn validate_allows_anything_in_development() {
        let cfg = test_config();
        assert!(cfg
            .validate(&["environment"], &["totally_unknown".to_string()])
            .is_ok());
    }

    fn test_config() -> NextvisionConfig {
        NextvisionConfig {
            environment: Environment::Development,
            map_provider: MapProviderConfig {
                endpoint_url: "https://maps.example.invalid/v1/geocode".into(),
                api_key: "test".into(),
                daily_request_ceiling: 25_000,
                quota_warning_fraction: 0.9,
                locale_bias: "fr".into(),
                fallback_centroid: (48.8566, 2.3522),
            },
            route_provider: RouteProviderConfig {
                endpoint_url: "https://maps.example.invalid/v1/route".into(),
                api_key: "test".into(),
            },
            remote_store: RemoteStoreConfig {
                url: "redis://localhost".into(),
                key_prefix: "nv:".into(),
            },
            cache_ttls: CacheNamespaceTtls::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            retry: RetryConfig::default(),
            batch: BatchConfig::default(),
            weighter: WeighterConfig::default(),
            rush_hour: RushHourWindows::default(),
            transport_time_tolerance: 0.1,
            sector_incompatibility_table: HashMap::new(),
            sector_compatibility_table: HashMap::new(),
            skill_synonym_table: HashMap::new(),
        }
    }
}
