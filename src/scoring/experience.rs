//! Experience component scorer (spec.md §4.7).

/// Decay tiers mirroring the overqualification penalty's shape (spec.md
/// §4.7: "above max -> decay mirroring overqualification"), expressed as a
/// multiple of the job's own `[min, max]` span rather than fixed years, so
/// a wide band (junior, 0-3y) and a narrow one (staff, 8-10y) decay at a
/// comparable rate.
fn mirrored_overqualification_decay(excess_ratio: f64) -> f64 {
    if excess_ratio <= 0.0 {
        1.0
    } else if excess_ratio < 1.0 {
        0.9
    } else if excess_ratio < 2.0 {
        0.7
    } else {
        0.5
    }
}

/// Subscore for years of experience against a job's `[min, max_opt]` range.
/// `max_years_experience: None` means uncapped — no above-range decay
/// applies.
pub fn score(years: u32, min_years: u32, max_years_experience: Option<u32>) -> f64 {
    if years < min_years {
        if min_years == 0 {
            return 1.0;
        }
        let deficit = (min_years - years) as f64 / min_years as f64;
        return (1.0 - deficit).max(0.0);
    }

    let Some(max_years) = max_years_experience else {
        return 1.0;
    };
    if years <= max_years {
        return 1.0;
    }

    let span = (max_years.saturating_sub(min_years)).max(1) as f64;
    let excess_ratio = (years - max_years) as f64 / span;
    mirrored_overqualification_decay(excess_ratio)
}
