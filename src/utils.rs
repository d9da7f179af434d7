//! Thread-pool plumbing shared by training and cross-validation.

/// Run a closure under the thread-count setting.
///
/// - `n <= 0`: run in the ambient rayon pool (all available cores)
/// - `n > 0`: install a scoped pool capped at exactly `n` threads
///
/// Components never manage pools themselves; they use rayon iterators
/// and inherit whatever pool this installed.
pub fn run_with_threads<T: Send>(n_threads: i32, f: impl FnOnce() -> T + Send) -> T {
    if n_threads > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads as usize)
            .build()
            .expect("failed to build thread pool");
        pool.install(f)
    } else {
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambient_pool_passthrough() {
        assert_eq!(run_with_threads(-1, || 42), 42);
    }

    #[test]
    fn capped_pool_has_requested_threads() {
        let threads = run_with_threads(2, rayon::current_num_threads);
        assert_eq!(threads, 2);
    }

    #[test]
    fn single_thread_is_sequential() {
        let threads = run_with_threads(1, rayon::current_num_threads);
        assert_eq!(threads, 1);
    }
}
