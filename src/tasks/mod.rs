// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Background task scheduling for the acoustic generators.

Generator tasks (wavefront propagation, biverb overlap, envelope
accumulation) run on a bounded rayon thread pool sized to the hardware
by default. Tasks are cooperative: each one polls an abort flag at its
outer loop boundaries and suppresses publication when aborted. A later
update for the same sensor or pair aborts the earlier in-flight task
before spawning its successor. User code can poll `wait_for_idle` to
block until every outstanding task has drained.

A process-wide default pool is provided for convenience, but every
generator also accepts an explicit pool handle so test harnesses can own
independent worlds.
*/

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace};


lazy_static! {
    /// Process-wide default worker pool, sized to the hardware.
    static ref DEFAULT_POOL: Arc<WorkerPool> =
        Arc::new(WorkerPool::new(0).expect("failed to build default worker pool"));
}

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Cooperative cancellation flag shared between a task and its owner.
#[derive(Clone, Debug, Default)]
pub struct AbortFlag {
    flag: Arc<AtomicBool>,
}

impl AbortFlag {
    /// Fresh, unset flag.
    pub fn new() -> Self {
        AbortFlag::default()
    }

    /// Request that the owning task stop at its next checkpoint.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// True once an abort has been requested. Generators poll this at
    /// every outer loop boundary.
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Handle to a spawned background task.
#[derive(Clone, Debug)]
pub struct TaskHandle {
    id: u64,
    abort: AbortFlag,
    done: Arc<AtomicBool>,
}

impl TaskHandle {
    /// Unique id of this task, for logging.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Request that this task stop at its next checkpoint.
    pub fn abort(&self) {
        debug!("task #{} abort requested", self.id);
        self.abort.abort();
    }

    /// The abort flag polled by the task body.
    pub fn abort_flag(&self) -> &AbortFlag {
        &self.abort
    }

    /// True once the task body has returned.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Spin until the task body has returned. Used by tests and by
    /// shutdown paths that must observe a predecessor finish before
    /// publishing a successor.
    pub fn join(&self) {
        while !self.is_done() {
            std::thread::sleep(Duration::from_micros(100));
        }
    }
}

/// Bounded pool of worker threads executing generator tasks.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    active: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Build a pool with the requested number of worker threads. Zero
    /// selects the hardware concurrency.
    pub fn new(num_threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|n| format!("hydroray-worker-{n}"))
            .build()?;
        Ok(WorkerPool {
            pool,
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// The process-wide default pool.
    pub fn default_pool() -> Arc<WorkerPool> {
        DEFAULT_POOL.clone()
    }

    /// Number of tasks spawned but not yet finished.
    pub fn active_tasks(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Spawn a task body onto the pool. The body receives the abort
    /// flag of its own handle and must poll it between algorithmic
    /// phases.
    pub fn run<F>(&self, body: F) -> TaskHandle
    where
        F: FnOnce(&AbortFlag) + Send + 'static,
    {
        let handle = TaskHandle {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            abort: AbortFlag::new(),
            done: Arc::new(AtomicBool::new(false)),
        };
        let task = handle.clone();
        let active = self.active.clone();
        active.fetch_add(1, Ordering::AcqRel);
        trace!("task #{} spawned", handle.id());
        self.pool.spawn(move || {
            (body)(&task.abort);
            task.done.store(true, Ordering::Release);
            active.fetch_sub(1, Ordering::AcqRel);
            trace!("task #{} finished", task.id());
        });
        handle
    }

    /// Block the calling thread until no tasks are active, or until the
    /// timeout elapses. Returns true when the pool went idle.
    pub fn wait_for_idle(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        while self.active_tasks() > 0 {
            if start.elapsed() > timeout {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }
}
