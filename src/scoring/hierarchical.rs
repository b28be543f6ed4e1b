//! Hierarchical-level component scorer (spec.md §4.7): how close the
//! candidate's seniority is to what the job asks for. The overqualification
//! *penalty* that also derives from this gap lives in
//! [`crate::scoring::penalties`] and is applied multiplicatively on the
//! final score, not here (spec.md §9).

use crate::model::HierarchicalLevel;

/// Per hierarchical-ladder step of difference, the subscore decays by 0.15,
/// floored at 0.1 (spec.md §4.7).
const DECAY_PER_STEP: f64 = 0.15;
const FLOOR: f64 = 0.1;

/// The hierarchical gap, `candidate.rank() - job.rank()`: positive means the
/// candidate is more senior than the job requires (spec.md glossary).
pub fn gap(candidate_level: HierarchicalLevel, job_level: HierarchicalLevel) -> i32 {
    candidate_level.rank() - job_level.rank()
}

/// Subscore for the hierarchical component: 1.0 on an exact match, decaying
/// symmetrically (overqualified or underqualified) with the absolute gap.
pub fn score(candidate_level: HierarchicalLevel, job_level: HierarchicalLevel) -> f64 {
    let steps = gap(candidate_level, job_level).unsigned_abs() as f64;
    (1.0 - DECAY_PER_STEP * steps).max(FLOOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_level_match_scores_one() {
        assert_eq!(score(HierarchicalLevel::Senior, HierarchicalLevel::Senior), 1.0);
    }

    #[test]
    fn decays_by_fixed_step_either_direction() {
        assert!((score(HierarchicalLevel::Manager, HierarchicalLevel::Senior) - 0.85).abs() < 1e-9);
        assert!((score(HierarchicalLevel::Junior, HierarchicalLevel::Senior) - 0.85).abs() < 1e-9);
    }

    #[test]
    fn decays_to_quarter_at_the_ladder_s_widest_gap() {
        // Entry..Executive is the widest possible gap (5 steps); the 0.1
        // floor exists for ladders with more steps than this one has and
        // is never actually reached here.
        assert!((score(HierarchicalLevel::Executive, HierarchicalLevel::Entry) - 0.25).abs() < 1e-9);
    }
}
