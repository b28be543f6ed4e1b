//! Multiplicative final-score penalties (spec.md §9's penalty-composition
//! design note): sectoral incompatibility and overqualification. Both are
//! applied once, on `final_score` only, in [`crate::scoring::engine::MatchEngine`]
//! — never pre-applied to an individual component subscore.

use std::collections::HashMap;

use crate::model::HierarchicalLevel;

/// Multiplicative penalty for an outright-incompatible sector pair (e.g.
/// tech <-> accounting = 0.5), looked up symmetrically in
/// `incompatibility_table`. `None` when the pair isn't flagged as
/// incompatible at all (not every cross-sector pair is a penalty case —
/// most just get the sectoral component's own lower subscore).
pub fn sectoral_penalty(candidate_sector: &str, job_sector: &str, incompatibility_table: &HashMap<String, HashMap<String, f64>>) -> Option<f64> {
    let a = candidate_sector.to_lowercase();
    let b = job_sector.to_lowercase();
    if a == b {
        return None;
    }
    incompatibility_table
        .get(&a)
        .and_then(|m| m.get(&b))
        .or_else(|| incompatibility_table.get(&b).and_then(|m| m.get(&a)))
        .copied()
}

/// Multiplicative overqualification penalty from the hierarchical gap
/// (spec.md §4.7/§8): gap 0 -> 1.0, 1 -> 0.9, 2 -> 0.7, >=3 -> 0.5.
/// Underqualified candidates (negative gap) are penalized via the
/// hierarchical component's own subscore, not here.
pub fn overqualification_penalty(candidate_level: HierarchicalLevel, job_level: HierarchicalLevel) -> f64 {
    let gap = candidate_level.rank() - job_level.rank();
    match gap {
        g if g <= 0 => 1.0,
        1 => 0.9,
        2 => 0.7,
        _ => 0.5,
    }
}
