use std::cmp::Ordering;
use std::thread::available_parallelism;

use eyre::{Result, WrapErr};
use rayon::{ThreadPool, ThreadPoolBuilder};

fn _normalize(requested: isize, max: isize) -> usize {
    match requested.cmp(&0) {
        // -n means "everything except n - 1 threads"
        Ordering::Less => (max + requested + 1).max(1) as usize,
        Ordering::Equal => 1,
        Ordering::Greater => requested.min(max) as usize,
    }
}

/// Resolve the requested number of threads against the machine's parallelism.
///
/// * `0` runs on a single thread;
/// * positive values are capped at the number of available cores;
/// * negative values count back from the number of available cores (`-1` = all of them).
pub fn available(requested: isize) -> Result<usize> {
    let max = available_parallelism()?.get() as isize;
    Ok(_normalize(requested, max))
}

/// Build a rayon thread pool with the resolved number of threads.
pub fn pool(requested: isize) -> Result<ThreadPool> {
    let threads = available(requested)?;
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|ind| format!("isle-worker-{ind}"))
        .build()
        .wrap_err_with(|| format!("Failed to start a thread pool with {threads} threads"))
}
