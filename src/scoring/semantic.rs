//! Semantic (skills) component scorer (spec.md §4.7).
//!
//! Computes how well a candidate's skills cover a job's required and
//! preferred skill lists. Sectoral and overqualification penalties are
//! deliberately *not* applied here — spec.md §9's penalty-composition
//! design note fixes those as multiplicative factors on the final score,
//! applied once in [`crate::scoring::engine::MatchEngine`]; the perfect-match
//! bonus, by contrast, is multiplicative on this subscore only, and is
//! applied right here.

use std::collections::HashMap;

/// Per-skill-list matching result, kept around so [`MatchEngine`] can build
/// an explanation without recomputing anything.
///
/// [`MatchEngine`]: crate::scoring::engine::MatchEngine
#[derive(Debug, Clone, Copy)]
struct SkillListMatch {
    matched: usize,
    total: usize,
    mean_confidence: f64,
}

impl SkillListMatch {
    fn subscore(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        0.6 * (self.matched as f64 / self.total as f64) + 0.4 * self.mean_confidence
    }
}

/// The semantic component's full result.
#[derive(Debug, Clone)]
pub struct SemanticScore {
    pub subscore: f64,
    pub required_matched: usize,
    pub required_total: usize,
    pub mean_confidence_required: f64,
    pub perfect_match_bonus_applied: bool,
    /// True when `job.required_skills` was empty (spec.md §8 boundary:
    /// "Empty required-skills set -> semantic subscore = 1.0 with a
    /// 'no-skill-requirement' explanation").
    pub no_requirement: bool,
}

/// Confidence that `candidate_skill` satisfies `required_skill`:
/// exact match (1.0), substring match (0.8), or a sector-scoped synonym
/// table entry (0.7-0.9, spec.md §4.7). Case-insensitive throughout.
fn skill_confidence(required_skill: &str, candidate_skill: &str, sector: &str, synonyms: &HashMap<String, Vec<(String, f64)>>) -> f64 {
    let required_lower = required_skill.to_lowercase();
    let candidate_lower = candidate_skill.to_lowercase();

    if required_lower == candidate_lower {
        return 1.0;
    }
    if candidate_lower.contains(&required_lower) || required_lower.contains(&candidate_lower) {
        return 0.8;
    }

    let synonym_key = format!("{}:{}", sector.to_lowercase(), required_lower);
    if let Some(entries) = synonyms.get(&synonym_key) {
        for (synonym, confidence) in entries {
            if synonym.to_lowercase() == candidate_lower {
                return *confidence;
            }
        }
    }
    0.0
}

/// Best confidence across all of the candidate's skills for one required skill.
fn best_confidence(required_skill: &str, candidate_skills: &[String], sector: &str, synonyms: &HashMap<String, Vec<(String, f64)>>) -> f64 {
    candidate_skills
        .iter()
        .map(|candidate_skill| skill_confidence(required_skill, candidate_skill, sector, synonyms))
        .fold(0.0, f64::max)
}

/// A skill counts as matched when its best confidence clears 0.5 (spec.md §4.7).
const MATCH_THRESHOLD: f64 = 0.5;

fn match_list(skills: &[String], candidate_skills: &[String], sector: &str, synonyms: &HashMap<String, Vec<(String, f64)>>) -> SkillListMatch {
    if skills.is_empty() {
        return SkillListMatch { matched: 0, total: 0, mean_confidence: 1.0 };
    }
    let confidences: Vec<f64> = skills.iter().map(|skill| best_confidence(skill, candidate_skills, sector, synonyms)).collect();
    let matched = confidences.iter().filter(|&&c| c > MATCH_THRESHOLD).count();
    let mean_confidence = confidences.iter().sum::<f64>() / confidences.len() as f64;
    SkillListMatch { matched, total: skills.len(), mean_confidence }
}

/// Score a candidate's skills against one job's required/preferred lists.
///
/// `sector` scopes the synonym lookup ("within sector" per spec.md §4.7) and
/// is the job's sector, since the synonym table describes how a given
/// industry names its skills.
pub fn score(
    candidate_skills: &[String],
    required_skills: &[String],
    preferred_skills: &[String],
    sector: &str,
    synonyms: &HashMap<String, Vec<(String, f64)>>,
) -> SemanticScore {
    if required_skills.is_empty() {
        return SemanticScore {
            subscore: 1.0,
            required_matched: 0,
            required_total: 0,
            mean_confidence_required: 1.0,
            perfect_match_bonus_applied: false,
            no_requirement: true,
        };
    }

    let required = match_list(required_skills, candidate_skills, sector, synonyms);
    let preferred = if preferred_skills.is_empty() {
        SkillListMatch { matched: 0, total: 0, mean_confidence: 1.0 }
    } else {
        match_list(preferred_skills, candidate_skills, sector, synonyms)
    };

    let mut combined = 0.75 * required.subscore() + 0.25 * preferred.subscore();

    let perfect_match = required.matched == required.total && required.mean_confidence > 0.9;
    if perfect_match {
        combined = (combined * 1.1).min(1.0);
    }

    SemanticScore {
        subscore: combined.clamp(0.0, 1.0),
        required_matched: required.matched,
        required_total: required.total,
        mean_confidence_required: required.mean_confidence,
        perfect_match_bonus_applied: perfect_match,
        no_requirement: false,
    }
}
