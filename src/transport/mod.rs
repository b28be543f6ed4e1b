//! Transport Intelligence: geocoding, routing, and mode-by-mode commute
//! scoring composed into a single [`TransportScorer`] (spec.md §4.6).

pub mod modes;
pub mod scorer;

pub use modes::ModeAnalysis;
pub use scorer::{TransportContext, TransportScore, TransportScorer};
