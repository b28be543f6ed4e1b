//! Component Scorers, AdaptiveWeighter, and the MatchEngine that composes
//! them (spec.md §4.7-4.9).

pub mod compensation;
pub mod engine;
pub mod experience;
pub mod hierarchical;
pub mod penalties;
pub mod sectoral;
pub mod semantic;
pub mod weights;

pub use engine::MatchEngine;
pub use weights::AdaptiveWeighter;
