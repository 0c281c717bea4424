//! Worker pool that runs function bodies off the caller's thread.
//!
//! Every map operation is submitted here and returns immediately; a fixed
//! set of worker threads drains a FIFO queue. The queue is bounded: a full
//! queue rejects new work instead of blocking the caller.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{JoinHandle, ThreadId};
use tracing::{debug, error};

use cachet_core::{Error, Result};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Executor metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorStats {
    /// Number of tasks waiting in the queue.
    pub queue_depth: usize,
    /// Number of tasks currently being executed by workers.
    pub active_tasks: usize,
    /// Total number of tasks completed since creation.
    pub tasks_completed: u64,
    /// Number of worker threads.
    pub worker_count: usize,
}

struct ExecutorInner {
    queue: Mutex<VecDeque<Task>>,
    work_ready: Condvar,
    drain_cond: Condvar,
    shutdown: AtomicBool,
    queue_depth: AtomicUsize,
    active_tasks: AtomicUsize,
    max_queue_depth: usize,
    tasks_completed: AtomicU64,
}

/// Fixed-size pool of worker threads with a bounded FIFO queue.
pub struct Executor {
    inner: Arc<ExecutorInner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_ids: Vec<ThreadId>,
    num_threads: usize,
}

impl Executor {
    /// Create an executor with `num_threads` workers named `{name}-0`,
    /// `{name}-1`, and so on.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread cannot be spawned.
    pub fn new(name: &str, num_threads: usize, max_queue_depth: usize) -> Result<Self> {
        let num_threads = num_threads.max(1);
        let inner = Arc::new(ExecutorInner {
            queue: Mutex::new(VecDeque::new()),
            work_ready: Condvar::new(),
            drain_cond: Condvar::new(),
            shutdown: AtomicBool::new(false),
            queue_depth: AtomicUsize::new(0),
            active_tasks: AtomicUsize::new(0),
            max_queue_depth,
            tasks_completed: AtomicU64::new(0),
        });

        let mut workers = Vec::with_capacity(num_threads);
        for i in 0..num_threads {
            let inner_clone = Arc::clone(&inner);
            let spawned = std::thread::Builder::new()
                .name(format!("{}-{}", name, i))
                .spawn(move || worker_loop(&inner_clone));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Release the workers that did start before bailing out
                    inner.shutdown.store(true, Ordering::Release);
                    inner.work_ready.notify_all();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(Error::Io(e));
                }
            }
        }
        let worker_ids = workers.iter().map(|h| h.thread().id()).collect();
        debug!(name, num_threads, max_queue_depth, "Executor started");

        Ok(Self {
            inner,
            workers: Mutex::new(workers),
            worker_ids,
            num_threads,
        })
    }

    /// Submit a task.
    ///
    /// Returns `Err(Error::Rejected)` if the queue is at capacity or the
    /// executor has been shut down.
    pub fn submit(&self, work: impl FnOnce() + Send + 'static) -> Result<()> {
        if self.inner.shutdown.load(Ordering::Acquire) {
            return Err(Error::Rejected);
        }
        if self.inner.queue_depth.load(Ordering::Acquire) >= self.inner.max_queue_depth {
            return Err(Error::Rejected);
        }

        {
            let mut queue = self.inner.queue.lock();
            queue.push_back(Box::new(work));
            self.inner.queue_depth.fetch_add(1, Ordering::Release);
        }

        self.inner.work_ready.notify_one();
        Ok(())
    }

    /// Whether the calling thread is one of this executor's workers.
    pub fn is_worker_thread(&self) -> bool {
        let current = std::thread::current().id();
        self.worker_ids.contains(&current)
    }

    /// Block until all queued and in-flight tasks have completed.
    ///
    /// Workers remain running after drain completes.
    pub fn drain(&self) {
        let mut queue = self.inner.queue.lock();
        while self.inner.queue_depth.load(Ordering::Acquire) > 0
            || self.inner.active_tasks.load(Ordering::Acquire) > 0
        {
            self.inner.drain_cond.wait(&mut queue);
        }
    }

    /// Signal workers to exit after the queue empties and join them.
    ///
    /// Idempotent. When called from one of the workers, that worker is not
    /// joined (it exits once the current task returns).
    pub fn shutdown(&self) {
        if self.inner.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        // Lock the queue before notifying to prevent lost wake-ups
        {
            let _queue = self.inner.queue.lock();
            self.inner.work_ready.notify_all();
        }

        let current = std::thread::current().id();
        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            if handle.thread().id() != current {
                let _ = handle.join();
            }
        }
        debug!("Executor shut down");
    }

    /// Whether `shutdown` has been called.
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    /// Return a snapshot of executor metrics.
    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            queue_depth: self.inner.queue_depth.load(Ordering::Relaxed),
            active_tasks: self.inner.active_tasks.load(Ordering::Relaxed),
            tasks_completed: self.inner.tasks_completed.load(Ordering::Relaxed),
            worker_count: self.num_threads,
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("stats", &self.stats())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

/// Decrements `active_tasks` and notifies drain waiters on drop, so a
/// panicking task cannot leave the counter inflated.
struct ActiveTaskGuard<'a> {
    inner: &'a ExecutorInner,
}

impl<'a> Drop for ActiveTaskGuard<'a> {
    fn drop(&mut self) {
        let prev_active = self.inner.active_tasks.fetch_sub(1, Ordering::Release);
        self.inner.tasks_completed.fetch_add(1, Ordering::Relaxed);

        if prev_active == 1 && self.inner.queue_depth.load(Ordering::Acquire) == 0 {
            let _queue = self.inner.queue.lock();
            self.inner.drain_cond.notify_all();
        }
    }
}

fn worker_loop(inner: &ExecutorInner) {
    loop {
        let task = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(task) = queue.pop_front() {
                    inner.queue_depth.fetch_sub(1, Ordering::Release);
                    inner.active_tasks.fetch_add(1, Ordering::Release);
                    break task;
                }
                if inner.shutdown.load(Ordering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let _guard = ActiveTaskGuard { inner };

        if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)) {
            error!(
                "executor task panicked: {:?}",
                e.downcast_ref::<&str>().copied().unwrap_or("(non-string panic)")
            );
        }
    }
}
