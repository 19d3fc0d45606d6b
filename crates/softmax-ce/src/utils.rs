//! Parallelism configuration and thread-pool setup.
//!
//! Batch operations take a [`Parallelism`] flag and process rows either on the
//! current thread or on the `rayon` pool. The pool itself is set up once at the
//! API boundary via [`run_with_threads`].

use ndarray::ArrayView1;
use rayon::prelude::*;

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// When `Parallel`, batch operations may use `rayon` parallel iterators.
/// Results are always returned in input row order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Parallelism {
    #[default]
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if rayon pool has multiple threads, sequential otherwise)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Fallible map over `iter`, preserving order.
    ///
    /// Sequential mode stops at the first error. Parallel mode reports one of
    /// the errors, not necessarily the one with the lowest index.
    #[inline]
    pub fn maybe_par_try_map<T, B, E, I, F>(self, iter: I, f: F) -> Result<Vec<B>, E>
    where
        T: Send,
        B: Send,
        E: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) -> Result<B, E> + Sync + Send,
    {
        if self.is_parallel() {
            iter.into_par_iter().map(f).collect()
        } else {
            iter.into_iter().map(f).collect()
        }
    }

    /// Fallible for_each over an iterator that is not `IntoParallelIterator`
    /// (such as `axis_iter_mut`).
    #[inline]
    pub fn maybe_par_bridge_try_for_each<T, E, I, F>(self, mut iter: I, f: F) -> Result<(), E>
    where
        T: Send,
        E: Send,
        I: Iterator<Item = T> + Send,
        F: Fn(T) -> Result<(), E> + Sync + Send,
    {
        if self.is_parallel() {
            iter.par_bridge().try_for_each(f)
        } else {
            iter.try_for_each(f)
        }
    }
}

// =============================================================================
// Row access
// =============================================================================

/// Call `f` on `row` as a slice, copying it first if it is strided.
#[inline]
pub(crate) fn with_row_slice<R>(row: ArrayView1<'_, f64>, f: impl FnOnce(&[f64]) -> R) -> R {
    match row.as_slice() {
        Some(values) => f(values),
        None => f(&row.to_vec()),
    }
}

// =============================================================================
// Thread Pool Setup
// =============================================================================

/// Run a closure with the appropriate thread pool.
///
/// Thread count semantics:
/// - `0` = auto (use the global rayon pool)
/// - `1` = sequential (no thread pool)
/// - `n > 1` = use exactly `n` threads
///
/// If a dedicated pool cannot be created, the closure runs on the global pool.
///
/// # Example
///
/// ```
/// use softmax_ce::run_with_threads;
///
/// let n = run_with_threads(1, |parallelism| parallelism.is_parallel());
/// assert!(!n);
/// ```
#[inline]
pub fn run_with_threads<T: Send>(n_threads: usize, f: impl FnOnce(Parallelism) -> T + Send) -> T {
    let parallelism = Parallelism::from_threads(n_threads);

    match parallelism {
        Parallelism::Sequential => f(Parallelism::Sequential),
        Parallelism::Parallel if n_threads == 0 => f(Parallelism::Parallel),
        Parallelism::Parallel => {
            match rayon::ThreadPoolBuilder::new().num_threads(n_threads).build() {
                Ok(pool) => pool.install(|| f(Parallelism::Parallel)),
                Err(err) => {
                    log::warn!("failed to build a {n_threads}-thread pool, using the global one: {err}");
                    f(Parallelism::Parallel)
                }
            }
        }
    }
}
