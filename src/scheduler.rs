//! Supersource dispatch across a rayon worker pool (spec.md §5).
//!
//! Each supersource is fully independent, so workers carry private
//! `WavefieldState`/`GradientAccumulator`/`Illumination` state and never
//! touch a lock in the hot loop; results are joined once at the end via
//! `reduce`, which only needs commutative addition (`add_assign` on
//! `GradientAccumulator`/`Illumination`).

use crate::errors::*;
use rayon::prelude::*;
use rayon::ThreadPool;

/// Builds a dedicated thread pool sized by `nworker` (0 lets rayon choose
/// the default, the number of logical CPUs).
pub fn build_pool(nworker: usize) -> Result<ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if nworker > 0 {
        builder = builder.num_threads(nworker);
    }
    builder
        .build()
        .map_err(|e| ErrorKind::ResourceError(format!("failed to build worker pool: {}", e)).into())
}

/// Runs `per_item` over every item in `items` on `pool`, in parallel, and
/// folds the results together with `reduce` starting from `identity()`.
///
/// `per_item` must be safe to call concurrently from multiple threads; it
/// typically allocates or reuses one worker-local `WavefieldState` per
/// call rather than sharing one across items.
pub fn dispatch<T, R, F, I, C>(pool: &ThreadPool, items: &[T], identity: I, per_item: F, combine: C) -> R
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
    I: Fn() -> R + Sync,
    C: Fn(R, R) -> R + Sync + Send,
{
    pool.install(|| {
        items
            .par_iter()
            .map(|item| per_item(item))
            .reduce(&identity, |a, b| combine(a, b))
    })
}
