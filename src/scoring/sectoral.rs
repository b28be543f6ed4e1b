//! Sectoral component scorer (spec.md §4.7): how compatible the candidate's
//! and the job's industries are. The separate multiplicative
//! `SECTORAL_PENALTY` for outright-incompatible pairs lives in
//! [`crate::scoring::penalties`] and is applied once on the final score
//! (spec.md §9) — it reads the same incompatibility table this scorer falls
//! back to when no compatible-family entry exists, since spec.md §4.7 and
//! the design notes both describe that table as "the" sector-incompatibility
//! data rather than two independent tables.

use std::collections::HashMap;

/// Default subscore when sectors differ and neither the compatibility nor
/// the incompatibility table names the pair (spec.md §4.7).
const DEFAULT_CROSS_SECTOR_SCORE: f64 = 0.6;

fn lookup(table: &HashMap<String, HashMap<String, f64>>, a: &str, b: &str) -> Option<f64> {
    table
        .get(a)
        .and_then(|m| m.get(b))
        .or_else(|| table.get(b).and_then(|m| m.get(a)))
        .copied()
}

/// Subscore for the sectoral component.
pub fn score(
    candidate_sector: &str,
    job_sector: &str,
    compatibility_table: &HashMap<String, HashMap<String, f64>>,
    incompatibility_table: &HashMap<String, HashMap<String, f64>>,
) -> f64 {
    let a = candidate_sector.to_lowercase();
    let b = job_sector.to_lowercase();
    if a == b {
        return 1.0;
    }
    if let Some(compatible) = lookup(compatibility_table, &a, &b) {
        return compatible.clamp(0.0, 1.0);
    }
    if let Some(incompatible) = lookup(incompatibility_table, &a, &b) {
        return incompatible.clamp(0.0, 1.0);
    }
    DEFAULT_CROSS_SECTOR_SCORE
}
