//! BatchOrchestrator (spec.md §4.10): fans out one candidate against many
//! jobs, or one job against many candidates, over a bounded worker pool
//! with backpressure, preserving input order in the result array.
//!
//! Grounded in the teacher's `pipeline.rs` chunked-channel worker pool
//! (bounded concurrency via a fixed number of workers draining a channel),
//! generalized here to a semaphore-bounded `futures::future::join_all` fan-out
//! since the unit of work is one (candidate, job) pair rather than one CSV
//! row, and per-chunk cancellation/timeout needs to be independent per chunk.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::cache::Namespace;
use crate::context::NextvisionContext;
use crate::model::candidate::CandidateProfile;
use crate::model::job::JobRequirement;
use crate::model::match_result::MatchResult;
use crate::scoring::{AdaptiveWeighter, MatchEngine};
use crate::transport::TransportContext;

/// The execution-mode label spec.md §4.10 attaches to a batch for
/// observability purposes. All four modes run the same chunked,
/// semaphore-bounded algorithm; what changes size-to-size is really just
/// this label plus the `chunk_size`/`max_concurrency` the caller configured
/// — a huge batch getting an "additional outer fan-out" is already what
/// `run` does by processing every chunk concurrently, not sequentially.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Fewer than 10 items: a single cooperative pass, barely worth
    /// chunking.
    Cooperative,
    /// Fewer than 50 items: one pooled worker group (one chunk).
    PooledWorkerGroup,
    /// 50 or more items: a parallel worker group across multiple chunks.
    ParallelWorkerGroup,
    /// More than 200 items: the same parallel worker group, with enough
    /// chunks that the outer fan-out itself saturates `max_concurrency`.
    HugeFanOut,
}

impl ExecutionMode {
    pub fn for_size(n: usize) -> Self {
        if n < 10 {
            ExecutionMode::Cooperative
        } else if n < 50 {
            ExecutionMode::PooledWorkerGroup
        } else if n <= 200 {
            ExecutionMode::ParallelWorkerGroup
        } else {
            ExecutionMode::HugeFanOut
        }
    }
}

/// The outcome of one (candidate, job) match inside a batch. Distinguishes
/// a cancelled position from a failed one so a cancelled batch's result
/// list still has the invariant length (spec.md §8: "result list has
/// length N").
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Success(MatchResult),
    Failed { message: String },
    Cancelled,
}

/// Per-batch counters surfaced alongside the result list (spec.md §6.1's
/// `BatchResult { results, stats }`).
#[derive(Debug, Clone)]
pub struct BatchStats {
    pub total: usize,
    pub cache_hits: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub execution_mode: ExecutionMode,
    pub effective_concurrency: usize,
}

/// The full result of a batch call.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub results: Vec<MatchOutcome>,
    pub stats: BatchStats,
}

/// Fingerprint the weight vector that would be used for `candidate`, for
/// the match-result cache key `(candidate_id, job_id, weights_fingerprint)`
/// (spec.md §4.10). Two candidates that land on the same adaptive weight
/// vector share cache entries even if their ids differ is *not* intended —
/// `candidate_id` is already part of the key — this only guards against
/// reusing a stale result after a configuration change shifts the weights.
fn weights_fingerprint(candidate: &CandidateProfile, config: &crate::config::NextvisionConfig) -> String {
    let motivations_available = candidate
        .motivations_confidence
        .map(|c| c >= config.weighter.motivations_confidence_threshold)
        .unwrap_or(false);
    let weights = AdaptiveWeighter::new(&config.weighter).weights_for(candidate, motivations_available);

    let mut hasher = DefaultHasher::new();
    for (name, weight) in &weights {
        name.hash(&mut hasher);
        weight.to_bits().hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}

/// Runs candidate/job matches through [`MatchEngine`] with bounded
/// concurrency, a per-chunk timeout, a match-result cache probe, and
/// cooperative cancellation. Holds only an `Arc<NextvisionContext>` —
/// cheap to construct per request, since all the expensive state (cache,
/// HTTP clients, circuit breakers) already lives behind that `Arc`.
pub struct BatchOrchestrator {
    context: Arc<NextvisionContext>,
}

impl BatchOrchestrator {
    pub fn new(context: Arc<NextvisionContext>) -> Self {
        BatchOrchestrator { context }
    }

    /// One candidate scored against every job in `jobs`.
    pub async fn match_candidate_against_jobs(
        &self,
        candidate: CandidateProfile,
        jobs: Vec<JobRequirement>,
        cancellation: CancellationToken,
    ) -> BatchResult {
        let candidate = Arc::new(candidate);
        let pairs = jobs.into_iter().map(|job| (candidate.clone(), Arc::new(job))).collect();
        self.run(pairs, cancellation).await
    }

    /// One job scored against every candidate in `candidates`.
    pub async fn match_job_against_candidates(
        &self,
        job: JobRequirement,
        candidates: Vec<CandidateProfile>,
        cancellation: CancellationToken,
    ) -> BatchResult {
        let job = Arc::new(job);
        let pairs = candidates.into_iter().map(|candidate| (Arc::new(candidate), job.clone())).collect();
        self.run(pairs, cancellation).await
    }

    #[instrument(skip(self, pairs, cancellation), fields(n = pairs.len()))]
    async fn run(&self, pairs: Vec<(Arc<CandidateProfile>, Arc<JobRequirement>)>, cancellation: CancellationToken) -> BatchResult {
        let n = pairs.len();
        let execution_mode = ExecutionMode::for_size(n);

        let mut effective_concurrency = self.context.config.batch.max_concurrency.max(1);
        if self.context.geocoder.quota_pressure() {
            warn!("geocoder near daily quota, halving batch concurrency");
            effective_concurrency = (effective_concurrency / 2).max(1);
        }
        let semaphore = Arc::new(Semaphore::new(effective_concurrency));

        let cache_hits = Arc::new(AtomicUsize::new(0));
        let succeeded = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        let cancelled = Arc::new(AtomicUsize::new(0));

        let chunk_size = self.context.config.batch.chunk_size.max(1);
        let per_chunk_timeout = self.context.config.batch.per_chunk_timeout;

        let indexed: Vec<(usize, Arc<CandidateProfile>, Arc<JobRequirement>)> =
            pairs.into_iter().enumerate().map(|(i, (c, j))| (i, c, j)).collect();

        let chunk_futures = indexed.chunks(chunk_size).map(|chunk| {
            let chunk = chunk.to_vec();
            let semaphore = semaphore.clone();
            let context = self.context.clone();
            let cancellation = cancellation.clone();
            let cache_hits = cache_hits.clone();
            let succeeded = succeeded.clone();
            let failed = failed.clone();
            let cancelled = cancelled.clone();

            async move {
                let item_futures = chunk.into_iter().map(|(idx, candidate, job)| {
                    let semaphore = semaphore.clone();
                    let context = context.clone();
                    let cancellation = cancellation.clone();
                    let cache_hits = cache_hits.clone();
                    let succeeded = succeeded.clone();
                    let failed = failed.clone();
                    let cancelled = cancelled.clone();
                    async move {
                        if cancellation.is_cancelled() {
                            cancelled.fetch_add(1, Ordering::Relaxed);
                            return (idx, MatchOutcome::Cancelled);
                        }
                        let Ok(_permit) = semaphore.acquire().await else {
                            cancelled.fetch_add(1, Ordering::Relaxed);
                            return (idx, MatchOutcome::Cancelled);
                        };
                        let outcome = match_one(&context, &candidate, &job, &cancellation, &cache_hits).await;
                        match &outcome {
                            MatchOutcome::Success(_) => {
                                succeeded.fetch_add(1, Ordering::Relaxed);
                            }
                            MatchOutcome::Failed { .. } => {
                                failed.fetch_add(1, Ordering::Relaxed);
                            }
                            MatchOutcome::Cancelled => {
                                cancelled.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                        (idx, outcome)
                    }
                });

                match tokio::time::timeout(per_chunk_timeout, join_all(item_futures)).await {
                    Ok(outcomes) => outcomes,
                    Err(_) => {
                        warn!("chunk timed out, remaining in-flight matches in this chunk are marked cancelled");
                        vec![]
                    }
                }
            }
        });

        let chunk_results = join_all(chunk_futures).await;

        let mut results: Vec<Option<MatchOutcome>> = (0..n).map(|_| None).collect();
        for chunk in chunk_results {
            for (idx, outcome) in chunk {
                results[idx] = Some(outcome);
            }
        }
        // A chunk-level timeout drops its items entirely rather than
        // racing to report each one's true in-flight state; any `None`
        // left here means "the chunk timed out before this item finished".
        let results: Vec<MatchOutcome> = results
            .into_iter()
            .map(|outcome| {
                outcome.unwrap_or_else(|| {
                    cancelled.fetch_add(1, Ordering::Relaxed);
                    MatchOutcome::Cancelled
                })
            })
            .collect();

        BatchResult {
            results,
            stats: BatchStats {
                total: n,
                cache_hits: cache_hits.load(Ordering::Relaxed),
                succeeded: succeeded.load(Ordering::Relaxed),
                failed: failed.load(Ordering::Relaxed),
                cancelled: cancelled.load(Ordering::Relaxed),
                execution_mode,
                effective_concurrency,
            },
        }
    }
}

async fn match_one(
    context: &Arc<NextvisionContext>,
    candidate: &Arc<CandidateProfile>,
    job: &Arc<JobRequirement>,
    cancellation: &CancellationToken,
    cache_hits: &Arc<AtomicUsize>,
) -> MatchOutcome {
    let fingerprint = weights_fingerprint(candidate, &context.config);
    let cache_key = format!("{}:{}:{}", candidate.id.0, job.id.0, fingerprint);

    if let Ok(Some(cached)) = context.cache.get::<MatchResult>(Namespace::MatchResult, &cache_key).await {
        cache_hits.fetch_add(1, Ordering::Relaxed);
        return MatchOutcome::Success(cached);
    }

    let engine = MatchEngine::new(&context.config);
    let scoring = engine.score(candidate, job, context.geocoder.as_ref(), context.router.as_ref(), TransportContext::default());

    tokio::select! {
        biased;
        _ = cancellation.cancelled() => MatchOutcome::Cancelled,
        result = scoring => match result {
            Ok(match_result) => {
                let _ = context.cache.set(Namespace::MatchResult, &cache_key, &match_result).await;
                MatchOutcome::Success(match_result)
            }
            Err(err) => MatchOutcome::Failed { message: err.to_string() },
        },
    }
}
