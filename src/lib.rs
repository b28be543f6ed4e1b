//! Nextvision: a bidirectional candidate/job matching engine.
//!
//! Scores a candidate against a job (or a job against many candidates) on
//! six weighted components — semantic skill overlap, hierarchical level,
//! sector compatibility, compensation fit, experience fit, and
//! transport-aware location fit — behind external geocoding and routing
//! providers that degrade gracefully under failure or quota pressure.
//!
//! [`NextvisionContext`] is the composition root: build one per process
//! (or per tenant) with [`NextvisionContext::new`] and share it by `Arc`.
//! [`scoring::MatchEngine`] scores a single pair; [`batch::BatchOrchestrator`]
//! fans a pair out across many candidates or many jobs with bounded
//! concurrency and a match-result cache.

pub mod batch;
pub mod cache;
pub mod config;
pub mod context;
pub mod errors;
pub mod geocoding;
pub mod kv_store;
pub mod model;
pub mod resilience;
pub mod routing;
pub mod scoring;
pub mod transport;

pub use context::NextvisionContext;
pub use errors::{NextvisionError, Result};
