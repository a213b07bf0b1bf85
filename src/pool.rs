use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};

use crate::errors::{SearchError, SearchResult};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size worker pool with a FIFO task queue.
///
/// Workers block on a condition variable until a task is enqueued or
/// shutdown is signaled. The queue plus a "currently working" counter are
/// the only shared mutable state, guarded by one mutex with two condvars:
/// one waking idle workers, one waking [`ThreadPool::wait_all`] callers.
///
/// Shutdown happens on drop: the flag is set, all workers are woken and
/// joined, and any tasks still queued at that point are discarded. A clean
/// shutdown therefore requires `wait_all` to have been called first.
pub struct ThreadPool {
    inner: Arc<PoolInner>,
    workers: Vec<JoinHandle<()>>,
}

struct PoolInner {
    state: Mutex<PoolState>,
    work_available: Condvar,
    all_done: Condvar,
}

struct PoolState {
    queue: VecDeque<Job>,
    working: usize,
    shutdown: bool,
}

fn lock_state(inner: &PoolInner) -> MutexGuard<'_, PoolState> {
    // A worker can only poison the lock by panicking between the guarded
    // sections; the state itself stays consistent, so recover it.
    inner
        .state
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

impl ThreadPool {
    /// Spawns `size` workers. Fails if the OS refuses to spawn a thread.
    pub fn new(size: NonZeroUsize) -> SearchResult<Self> {
        let inner = Arc::new(PoolInner {
            state: Mutex::new(PoolState {
                queue: VecDeque::new(),
                working: 0,
                shutdown: false,
            }),
            work_available: Condvar::new(),
            all_done: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(size.get());
        for id in 0..size.get() {
            let inner = Arc::clone(&inner);
            let handle = thread::Builder::new()
                .name(format!("turbogrep-worker-{id}"))
                .spawn(move || worker_loop(id, &inner))
                .map_err(|e| SearchError::PoolUnavailable(e.to_string()))?;
            workers.push(handle);
        }

        debug!("thread pool started with {} workers", size.get());
        Ok(Self { inner, workers })
    }

    /// Enqueues a task. Returns the task back to the caller if the pool has
    /// already shut down, so it can be run inline instead.
    pub fn execute<F>(&self, job: F) -> Result<(), F>
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut state = lock_state(&self.inner);
            if state.shutdown {
                return Err(job);
            }
            state.queue.push_back(Box::new(job));
        }
        self.inner.work_available.notify_one();
        Ok(())
    }

    /// Blocks until every submitted task has fully drained: the queue is
    /// empty and no worker is mid-task. Results produced by tasks are only
    /// valid to read after this returns.
    pub fn wait_all(&self) {
        let mut state = lock_state(&self.inner);
        while !(state.queue.is_empty() && state.working == 0) {
            state = self
                .inner
                .all_done
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        {
            let mut state = lock_state(&self.inner);
            state.shutdown = true;
            // Still-queued tasks are discarded, never executed.
            state.queue.clear();
        }
        self.inner.work_available.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(id: usize, inner: &PoolInner) {
    loop {
        let job = {
            let mut state = lock_state(inner);
            loop {
                if state.shutdown {
                    trace!("worker {id} exiting");
                    return;
                }
                if let Some(job) = state.queue.pop_front() {
                    state.working += 1;
                    break job;
                }
                state = inner
                    .work_available
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        job();

        let mut state = lock_state(inner);
        state.working -= 1;
        if state.working == 0 && state.queue.is_empty() {
            inner.all_done.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pool(n: usize) -> ThreadPool {
        ThreadPool::new(NonZeroUsize::new(n).unwrap()).unwrap()
    }

    #[test]
    fn test_runs_all_tasks() {
        let pool = pool(4);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            pool.execute(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            })
            .ok()
            .unwrap();
        }

        pool.wait_all();
        assert_eq!(counter.load(Ordering::Relaxed), 100);
    }

    #[test]
    fn test_wait_all_with_no_tasks_returns() {
        let pool = pool(2);
        pool.wait_all();
    }

    #[test]
    fn test_wait_all_covers_in_flight_tasks() {
        let pool = pool(2);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            pool.execute(move || {
                std::thread::sleep(std::time::Duration::from_millis(10));
                counter.fetch_add(1, Ordering::Relaxed);
            })
            .ok()
            .unwrap();
        }

        pool.wait_all();
        assert_eq!(counter.load(Ordering::Relaxed), 8);
    }

    #[test]
    fn test_reusable_across_batches() {
        let pool = pool(3);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            for _ in 0..10 {
                let counter = Arc::clone(&counter);
                pool.execute(move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                })
                .ok()
                .unwrap();
            }
            pool.wait_all();
        }

        assert_eq!(counter.load(Ordering::Relaxed), 30);
    }

    #[test]
    fn test_worker_count() {
        assert_eq!(pool(5).worker_count(), 5);
    }
}
