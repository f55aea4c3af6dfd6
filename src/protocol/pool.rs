//! Multi-fold worker pool

use crate::error::{Error, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Fixed pool with one worker per device
///
/// Fold `k` is bound to device `k mod D`. Tasks share nothing mutable; results
/// come back in fold order and the first failure fails the whole dispatch.
pub struct FoldPool {
    devices: Vec<String>,
    pool: ThreadPool,
}

impl FoldPool {
    /// Build a pool sized to `devices`
    pub fn new(devices: &[String]) -> Result<Self> {
        if devices.is_empty() {
            return Err(Error::Worker("no devices configured".into()));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(devices.len())
            .thread_name(|i| format!("fold-worker-{i}"))
            .build()
            .map_err(|e| Error::Worker(format!("failed to start fold pool: {e}")))?;
        Ok(Self {
            devices: devices.to_vec(),
            pool,
        })
    }

    /// Number of workers
    pub fn workers(&self) -> usize {
        self.devices.len()
    }

    /// Device bound to `fold`
    pub fn device_for(&self, fold: usize) -> &str {
        &self.devices[fold % self.devices.len()]
    }

    /// Run `task(fold, device)` for every fold and join
    pub fn run<T, F>(&self, folds: usize, task: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize, &str) -> Result<T> + Sync,
    {
        tracing::info!(folds, workers = self.workers(), "dispatching folds");
        self.pool.install(|| {
            (0..folds)
                .into_par_iter()
                .map(|fold| {
                    task(fold, self.device_for(fold)).map_err(|e| match e {
                        Error::Worker(_) => e,
                        other => Error::Worker(format!("fold {fold}: {other}")),
                    })
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn devices(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("cuda:{i}")).collect()
    }

    #[test]
    fn test_empty_device_list_rejected() {
        assert!(matches!(FoldPool::new(&[]), Err(Error::Worker(_))));
    }

    #[test]
    fn test_device_round_robin() {
        let pool = FoldPool::new(&devices(2)).unwrap();
        assert_eq!(pool.workers(), 2);
        assert_eq!(pool.device_for(0), "cuda:0");
        assert_eq!(pool.device_for(1), "cuda:1");
        assert_eq!(pool.device_for(4), "cuda:0");
    }

    #[test]
    fn test_results_in_fold_order() {
        let pool = FoldPool::new(&devices(3)).unwrap();
        let calls = AtomicUsize::new(0);
        let results = pool
            .run(7, |fold, device| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok((fold, device.to_string()))
            })
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 7);
        for (i, (fold, device)) in results.iter().enumerate() {
            assert_eq!(*fold, i);
            assert_eq!(*device, format!("cuda:{}", i % 3));
        }
    }

    #[test]
    fn test_single_failure_fails_dispatch() {
        let pool = FoldPool::new(&devices(2)).unwrap();
        let err = pool
            .run(4, |fold, _| {
                if fold == 2 {
                    Err(Error::Evaluation("boom".into()))
                } else {
                    Ok(fold)
                }
            })
            .unwrap_err();
        match err {
            Error::Worker(message) => {
                assert!(message.contains("fold 2"));
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
