use std::thread;

/// Fixed-size worker pool for embarrassingly parallel per-item transforms.
///
/// Work is split into contiguous index ranges, one per worker, so results
/// come back in the original input order without any shared mutable state.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Pool sized to the available CPU cores.
    pub fn with_available_parallelism() -> Self {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(workers)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Apply `f` to every item, in parallel, returning outputs aligned with
    /// the input indices. `f` receives the global item index.
    pub fn map<T, U, F>(&self, items: &[T], f: F) -> Vec<U>
    where
        T: Sync,
        U: Send,
        F: Fn(usize, &T) -> U + Sync,
    {
        if items.is_empty() {
            return Vec::new();
        }

        let workers = self.workers.min(items.len());
        let chunk_size = items.len().div_ceil(workers);

        thread::scope(|scope| {
            let f = &f;
            let handles: Vec<_> = items
                .chunks(chunk_size)
                .enumerate()
                .map(|(chunk_idx, chunk)| {
                    scope.spawn(move || {
                        let base = chunk_idx * chunk_size;
                        chunk
                            .iter()
                            .enumerate()
                            .map(|(offset, item)| f(base + offset, item))
                            .collect::<Vec<U>>()
                    })
                })
                .collect();

            let mut results = Vec::with_capacity(items.len());
            for handle in handles {
                match handle.join() {
                    Ok(chunk) => results.extend(chunk),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            results
        })
    }
}
