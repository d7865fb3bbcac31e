// src/pool.rs
//! Fixed-size worker pool for independent jobs.

use rayon::prelude::*;

/// Applies `f` to every job on `workers` threads and returns the results in
/// job order. One worker, or a pool that fails to build, runs inline.
pub fn map_indexed<T, R, F>(jobs: &[T], workers: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    if jobs.is_empty() {
        return Vec::new();
    }
    if workers <= 1 {
        return jobs.iter().map(f).collect();
    }

    let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build();
    let mut indexed: Vec<(usize, R)> = match pool {
        Ok(pool) => pool.install(|| {
            jobs.par_iter()
                .enumerate()
                .map(|(i, job)| (i, f(job)))
                .collect()
        }),
        Err(e) => {
            tracing::warn!(error = %e, "worker pool unavailable, running serially");
            jobs.iter().enumerate().map(|(i, job)| (i, f(job))).collect()
        }
    };
    indexed.sort_by_key(|(i, _)| *i);
    indexed.into_iter().map(|(_, r)| r).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_independent_of_workers() {
        let jobs: Vec<u64> = (0..200).collect();
        let serial = map_indexed(&jobs, 1, |x| x * x);
        let parallel = map_indexed(&jobs, 4, |x| x * x);
        assert_eq!(serial, parallel);
        assert_eq!(parallel[13], 169);
    }

    #[test]
    fn empty_input_is_empty_output() {
        let out: Vec<u8> = map_indexed(&Vec::<u8>::new(), 3, |x| *x);
        assert!(out.is_empty());
    }
}
