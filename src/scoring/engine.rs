//! The match engine (spec.md §4.9): composes every component subscore, the
//! transport analysis, the adaptive weight vector, and the multiplicative
//! penalties into a single [`MatchResult`].

use std::collections::{BTreeMap, BTreeSet};

use tracing::instrument;

use crate::config::NextvisionConfig;
use crate::errors::NextvisionError;
use crate::geocoding::Geocoder;
use crate::model::candidate::CandidateProfile;
use crate::model::job::JobRequirement;
use crate::model::match_result::{Alert, EngineMetadata, MatchResult, RecommendationClass};
use crate::model::HierarchicalLevel;
use crate::routing::Router;
use crate::transport::{TransportContext, TransportScorer};

use super::weights::AdaptiveWeighter;
use super::{compensation, experience, hierarchical, penalties, sectoral, semantic};

/// The engine's own version string, surfaced in every result's
/// `engine_metadata` (spec.md §6.2) so a host application can tell which
/// scoring logic produced a cached replay.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

const STRONG_MATCH_THRESHOLD: f64 = 0.80;
const MATCH_THRESHOLD: f64 = 0.65;
const WEAK_MATCH_THRESHOLD: f64 = 0.45;
const SECTORAL_NO_MATCH_CEILING: f64 = 0.3;

const CONFIDENCE_BASELINE: f64 = 0.85;
const CONFIDENCE_LIVE_TRANSPORT_BONUS: f64 = 0.05;
const CONFIDENCE_MOTIVATIONS_BONUS: f64 = 0.05;
const CONFIDENCE_CAP: f64 = 0.98;

const SEMANTIC: &str = "semantic";
const HIERARCHICAL: &str = "hierarchical";
const COMPENSATION: &str = "compensation";
const EXPERIENCE: &str = "experience";
const LOCATION: &str = "location";
const SECTOR: &str = "sector";
const MOTIVATIONS: &str = "motivations";

/// Composes [`super::semantic`], [`super::hierarchical`], [`super::sectoral`],
/// [`super::compensation`], [`super::experience`], [`TransportScorer`], and
/// [`AdaptiveWeighter`] into a final [`MatchResult`] for one candidate/job pair.
pub struct MatchEngine<'a> {
    config: &'a NextvisionConfig,
}

impl<'a> MatchEngine<'a> {
    pub fn new(config: &'a NextvisionConfig) -> Self {
        MatchEngine { config }
    }

    /// Score one candidate against one job. Component scoring is
    /// synchronous and in-memory; only the transport analysis suspends, at
    /// the [`Geocoder`]/[`Router`] calls inside it (spec.md §5).
    #[instrument(skip(self, candidate, job, geocoder, router), fields(candidate_id = ?candidate.id, job_id = ?job.id))]
    pub async fn score(
        &self,
        candidate: &CandidateProfile,
        job: &JobRequirement,
        geocoder: &dyn Geocoder,
        router: &dyn Router,
        transport_context: TransportContext,
    ) -> crate::Result<MatchResult> {
        let semantic_result = semantic::score(
            &candidate.skills,
            &job.required_skills,
            &job.preferred_skills,
            &job.sector,
            &self.config.skill_synonym_table,
        );
        let hierarchical_subscore = hierarchical::score(candidate.level, job.required_level);
        let sectoral_subscore = sectoral::score(
            &candidate.sector,
            &job.sector,
            &self.config.sector_compatibility_table,
            &self.config.sector_incompatibility_table,
        );
        let compensation_subscore = compensation::score(candidate.expected_compensation.or(candidate.current_compensation), job.salary_min, job.salary_max);
        let experience_subscore = experience::score(candidate.years_of_experience, job.min_years_experience, job.max_years_experience);

        let transport_score = TransportScorer::new(self.config)
            .score(candidate, job, geocoder, router, transport_context)
            .await?;

        let motivations_available = candidate
            .motivations_confidence
            .map(|c| c >= self.config.weighter.motivations_confidence_threshold)
            .unwrap_or(false);
        let motivations_subscore = candidate.motivations_confidence.filter(|_| motivations_available);

        let weights = AdaptiveWeighter::new(&self.config.weighter).weights_for(candidate, motivations_available);
        let weight_sum: f64 = weights.values().sum();
        if (weight_sum - 1.0).abs() > 1e-6 {
            return Err(NextvisionError::InvariantViolation {
                message: format!("adaptive weights summed to {weight_sum}, not 1.0"),
            }
            .into());
        }

        let mut component_scores: BTreeMap<String, f64> = BTreeMap::new();
        component_scores.insert(SEMANTIC.to_string(), semantic_result.subscore);
        component_scores.insert(HIERARCHICAL.to_string(), hierarchical_subscore);
        component_scores.insert(SECTOR.to_string(), sectoral_subscore);
        component_scores.insert(COMPENSATION.to_string(), compensation_subscore);
        component_scores.insert(EXPERIENCE.to_string(), experience_subscore);
        component_scores.insert(LOCATION.to_string(), transport_score.final_transport);
        if let Some(motivations) = motivations_subscore {
            component_scores.insert(MOTIVATIONS.to_string(), motivations);
        }

        for (name, &value) in &component_scores {
            if !(0.0..=1.0).contains(&value) {
                return Err(NextvisionError::InvariantViolation {
                    message: format!("component {name:?} subscore {value} outside [0,1]"),
                }
                .into());
            }
        }

        let weighted_sum: f64 = weights
            .iter()
            .map(|(name, weight)| component_scores.get(name).copied().unwrap_or(0.0) * weight)
            .sum();

        let sectoral_penalty = penalties::sectoral_penalty(&candidate.sector, &job.sector, &self.config.sector_incompatibility_table);
        let overqualification_penalty = penalties::overqualification_penalty(candidate.level, job.required_level);
        let penalty_product = sectoral_penalty.unwrap_or(1.0) * overqualification_penalty;

        let final_score = (weighted_sum * penalty_product).clamp(0.0, 1.0);

        let mut alerts: BTreeSet<Alert> = BTreeSet::new();
        if sectoral_penalty.is_some() {
            alerts.insert(Alert::SectoralPenalty);
        }
        if overqualification_penalty < 1.0 {
            alerts.insert(Alert::Overqualification);
        }
        if transport_score.time_compatibility == 0.0 {
            alerts.insert(Alert::NoModeCompatible);
        }
        if !transport_score.used_live_map_data {
            alerts.insert(Alert::TransportDegraded);
        }

        let recommendation_class = if final_score >= STRONG_MATCH_THRESHOLD {
            RecommendationClass::StrongMatch
        } else if final_score >= MATCH_THRESHOLD {
            RecommendationClass::Match
        } else if final_score >= WEAK_MATCH_THRESHOLD {
            RecommendationClass::WeakMatch
        } else if sectoral_penalty.is_some() && final_score < SECTORAL_NO_MATCH_CEILING {
            RecommendationClass::NoMatchSectoral
        } else {
            RecommendationClass::NoMatch
        };

        let mut confidence: f64 = CONFIDENCE_BASELINE;
        if transport_score.used_live_map_data {
            confidence += CONFIDENCE_LIVE_TRANSPORT_BONUS;
        }
        if motivations_subscore.is_some() {
            confidence += CONFIDENCE_MOTIVATIONS_BONUS;
        }
        let confidence = confidence.min(CONFIDENCE_CAP);

        let explanations = build_explanations(&component_scores, &weights, &semantic_result, &transport_score, &alerts, hierarchical_gap(candidate.level, job.required_level));
        let used_live_map_data = transport_score.used_live_map_data;

        Ok(MatchResult {
            final_score,
            confidence,
            component_scores,
            weights_used: weights,
            transport_analysis: transport_score,
            alerts,
            explanations,
            recommendation_class,
            engine_metadata: EngineMetadata {
                engine_version: ENGINE_VERSION.to_string(),
                computed_at: chrono::Utc::now(),
                used_live_map_data,
            },
        })
    }
}

fn hierarchical_gap(candidate_level: HierarchicalLevel, job_level: HierarchicalLevel) -> i32 {
    candidate_level.rank() - job_level.rank()
}

fn build_explanations(
    component_scores: &BTreeMap<String, f64>,
    weights: &BTreeMap<String, f64>,
    semantic_result: &semantic::SemanticScore,
    transport_score: &crate::transport::TransportScore,
    alerts: &BTreeSet<Alert>,
    hierarchical_gap: i32,
) -> Vec<String> {
    let mut explanations = Vec::new();

    if semantic_result.no_requirement {
        explanations.push("semantic: no-skill-requirement (job lists no required skills), subscore 1.00".to_string());
    } else {
        explanations.push(format!(
            "semantic: {}/{} required skills matched (mean confidence {:.2}), subscore {:.2}, weight {:.2}{}",
            semantic_result.required_matched,
            semantic_result.required_total,
            semantic_result.mean_confidence_required,
            component_scores.get("semantic").copied().unwrap_or(0.0),
            weights.get("semantic").copied().unwrap_or(0.0),
            if semantic_result.perfect_match_bonus_applied { " (perfect-match bonus applied)" } else { "" },
        ));
    }

    for name in ["hierarchical", "sector", "compensation", "experience"] {
        if let (Some(&subscore), Some(&weight)) = (component_scores.get(name), weights.get(name)) {
            explanations.push(format!("{name}: subscore {subscore:.2}, weight {weight:.2}"));
        }
    }
    explanations.push(format!("hierarchical gap: {hierarchical_gap} step(s) (candidate rank minus job rank)"));

    if let Some(&motivations) = component_scores.get("motivations") {
        explanations.push(format!("motivations: subscore {:.2}, weight {:.2}", motivations, weights.get("motivations").copied().unwrap_or(0.0)));
    } else {
        explanations.push("motivations: no evidence above confidence threshold, weight redistributed".to_string());
    }

    match transport_score.best_mode {
        Some(mode) => explanations.push(format!(
            "transport: best mode {mode:?}, final transport subscore {:.2}, weight {:.2}{}",
            transport_score.final_transport,
            weights.get("location").copied().unwrap_or(0.0),
            if transport_score.used_live_map_data { "" } else { " (degraded: fallback routing used)" },
        )),
        None => explanations.push(format!(
            "transport: no mode feasible, conservative/remote-mitigated subscore {:.2}, weight {:.2}{}",
            transport_score.final_transport,
            weights.get("location").copied().unwrap_or(0.0),
            if transport_score.remote_mitigation_applied { " (remote mitigation applied)" } else { "" },
        )),
    }

    for alert in alerts {
        explanations.push(format!("alert: {alert:?}"));
    }

    explanations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheNamespaceTtls, CircuitBreakerConfig, RetryConfig, BatchConfig, WeighterConfig, RushHourWindows};
    use crate::model::candidate::{CandidateId, ListeningReason, MobilityConstraints};
    use crate::model::job::{JobId, RemotePolicy};
    use crate::model::route::TransportMode;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::time::Duration;

    struct FakeGeocoder;
    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn geocode(&self, address: &str) -> crate::Result<crate::model::geocode::GeocodeResult> {
            Ok(crate::model::geocode::GeocodeResult {
                input_address: address.to_string(),
                formatted_address: address.to_string(),
                latitude: 48.8566,
                longitude: 2.3522,
                quality: crate::model::geocode::QualityTier::Exact,
                place_id: None,
                cached_at: Utc::now(),
            })
        }
    }

    struct FakeRouter;
    #[async_trait]
    impl Router for FakeRouter {
        async fn route(
            &self,
            origin: &crate::model::geocode::GeocodeResult,
            destination: &crate::model::geocode::GeocodeResult,
            mode: TransportMode,
            _departure_time: Option<DateTime<Utc>>,
        ) -> crate::Result<crate::model::route::Route> {
            let now = Utc::now();
            Ok(crate::model::route::Route {
                origin: origin.clone(),
                destination: destination.clone(),
                mode,
                duration_seconds: 600,
                distance_meters: 2000,
                traffic_factor: None,
                transfer_count: Some(0),
                computed_at: now,
                cache_until: now,
                from_live_provider: true,
            })
        }
    }

    fn test_config() -> NextvisionConfig {
        use crate::config::{Environment, MapProviderConfig, RemoteStoreConfig, RouteProviderConfig};
        NextvisionConfig {
            environment: Environment::Testing,
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
                url: "memory://local".into(),
                key_prefix: "nv:".into(),
            },
            cache_ttls: CacheNamespaceTtls::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            retry: RetryConfig {
                strategy: crate::resilience::RetryStrategyKind::JitteredExponential,
                max_attempts: 5,
                base_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(10),
                jitter_factor: 0.1,
            },
            batch: BatchConfig::default(),
            weighter: WeighterConfig::default(),
            rush_hour: RushHourWindows::default(),
            transport_time_tolerance: 0.1,
            sector_incompatibility_table: HashMap::from([("tech".to_string(), HashMap::from([("accounting".to_string(), 0.5)]))]),
            sector_compatibility_table: HashMap::new(),
            skill_synonym_table: HashMap::new(),
        }
    }

    fn candidate(level: HierarchicalLevel, sector: &str, skills: Vec<&str>) -> CandidateProfile {
        CandidateProfile {
            id: CandidateId::new(),
            skills: skills.into_iter().map(String::from).collect(),
            years_of_experience: 5,
            level,
            current_compensation: Some(55_000),
            expected_compensation: Some(60_000),
            sector: sector.into(),
            home_address: "Paris".into(),
            mobility: MobilityConstraints {
                accepted_modes: vec![TransportMode::Walking],
                max_minutes_by_mode: HashMap::from([(TransportMode::Walking, 15)]),
                remote_days_acceptable: 0,
                flexible_hours: false,
            },
            listening_reason: ListeningReason::Unknown,
            motivations_confidence: None,
        }
    }

    fn job(level: HierarchicalLevel, sector: &str, required_skills: Vec<&str>) -> JobRequirement {
        JobRequirement {
            id: JobId::new(),
            required_skills: required_skills.into_iter().map(String::from).collect(),
            preferred_skills: vec![],
            min_years_experience: 2,
            max_years_experience: Some(8),
            required_level: level,
            salary_min: 40_000,
            salary_max: 70_000,
            sector: sector.into(),
            office_address: "La Defense".into(),
            remote_policy: RemotePolicy::Hybrid,
            hybrid_remote_days: Some(3),
            parking_provided: false,
            flexible_hours: false,
        }
    }

    #[tokio::test]
    async fn final_score_and_confidence_stay_in_unit_interval() {
        let config = test_config();
        let engine = MatchEngine::new(&config);
        let result = engine
            .score(
                &candidate(HierarchicalLevel::Senior, "tech", vec!["React", "TypeScript"]),
                &job(HierarchicalLevel::Senior, "tech", vec!["React"]),
                &FakeGeocoder,
                &FakeRouter,
                TransportContext::default(),
            )
            .await
            .unwrap();
        assert!((0.0..=1.0).contains(&result.final_score));
        assert!((0.0..=1.0).contains(&result.confidence));
        let weight_sum: f64 = result.weights_used.values().sum();
        assert!((weight_sum - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn overqualified_executive_vs_entry_role_triggers_penalty_and_alert() {
        let config = test_config();
        let engine = MatchEngine::new(&config);
        let result = engine
            .score(
                &candidate(HierarchicalLevel::Executive, "finance", vec!["Leadership", "Strategy"]),
                &job(HierarchicalLevel::Entry, "finance", vec!["Bookkeeping"]),
                &FakeGeocoder,
                &FakeRouter,
                TransportContext::default(),
            )
            .await
            .unwrap();
        assert!(result.alerts.contains(&Alert::Overqualification));
        assert!(result.final_score < component_scores_semantic(&result));
    }

    fn component_scores_semantic(result: &MatchResult) -> f64 {
        *result.component_scores.get("semantic").unwrap()
    }

    #[tokio::test]
    async fn cross_sector_incompatibility_applies_sectoral_penalty() {
        let config = test_config();
        let engine = MatchEngine::new(&config);
        let result = engine
            .score(
                &candidate(HierarchicalLevel::Senior, "tech", vec!["Python", "React"]),
                &job(HierarchicalLevel::Entry, "accounting", vec!["Bookkeeping", "Tax law"]),
                &FakeGeocoder,
                &FakeRouter,
                TransportContext::default(),
            )
            .await
            .unwrap();
        assert!(result.alerts.contains(&Alert::SectoralPenalty));
    }
}
