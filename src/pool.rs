//! Fixed-size worker pool with a FIFO queue and a completion barrier.
//!
//! Work items are plain by-value records of one type `W`, executed by a
//! fixed-signature handler function chosen at pool construction. The pool
//! makes no ordering guarantee between queued items; [`WorkerPool::wait`]
//! blocks until the queue is drained *and* every worker is idle, which is
//! the only synchronization the render path needs.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use crate::error::Error;

/// A fixed pool of named OS worker threads.
pub struct WorkerPool<W: Send + 'static> {
    shared: Arc<Shared<W>>,
    workers: Vec<JoinHandle<()>>,
}

struct Shared<W> {
    handler: fn(W),
    state: Mutex<State<W>>,
    work_available: Condvar,
    all_idle: Condvar,
}

struct State<W> {
    queue: VecDeque<W>,
    working: usize,
    stopped: bool,
}

impl<W> Shared<W> {
    fn lock(&self) -> MutexGuard<'_, State<W>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Send + 'static> WorkerPool<W> {
    /// Spawn `threads` workers (at least one) that run `handler` on every
    /// submitted item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThreadSpawn`] when the OS refuses a thread.
    pub fn new(threads: usize, handler: fn(W)) -> Result<Self, Error> {
        let shared = Arc::new(Shared {
            handler,
            state: Mutex::new(State {
                queue: VecDeque::new(),
                working: 0,
                stopped: false,
            }),
            work_available: Condvar::new(),
            all_idle: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(threads.max(1));
        for i in 0..threads.max(1) {
            let shared = Arc::clone(&shared);
            let handle = std::thread::Builder::new()
                .name(format!("stipple-worker-{i}"))
                .spawn(move || worker_loop(&shared))
                .map_err(Error::ThreadSpawn)?;
            workers.push(handle);
        }

        Ok(Self { shared, workers })
    }

    /// Enqueue one work item and wake one waiting worker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolShutdown`] when the pool has stopped.
    pub fn submit(&self, work: W) -> Result<(), Error> {
        let mut state = self.shared.lock();
        if state.stopped {
            return Err(Error::PoolShutdown);
        }
        state.queue.push_back(work);
        drop(state);
        self.shared.work_available.notify_one();
        Ok(())
    }

    /// Block until the queue is empty and no worker is executing.
    ///
    /// Returns immediately when nothing is outstanding. After a shutdown,
    /// returns as soon as in-flight items finish; abandoned queue entries
    /// are not waited for.
    pub fn wait(&self) {
        let mut state = self.shared.lock();
        while state.working > 0
            || (!state.stopped && !state.queue.is_empty())
        {
            state = self
                .shared
                .all_idle
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Stop accepting work, wake every worker, and join them.
    ///
    /// Queued items that no worker has picked up are dropped; in-flight
    /// items run to completion. Idempotent.
    pub fn shutdown(&mut self) {
        {
            let mut state = self.shared.lock();
            state.stopped = true;
        }
        self.shared.work_available.notify_all();
        self.shared.all_idle.notify_all();

        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }

    /// Number of worker threads.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.workers.len()
    }
}

impl<W: Send + 'static> Drop for WorkerPool<W> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop<W>(shared: &Shared<W>) {
    loop {
        let work = {
            let mut state = shared.lock();
            loop {
                if state.stopped {
                    return;
                }
                if let Some(work) = state.queue.pop_front() {
                    state.working += 1;
                    break work;
                }
                state = shared
                    .work_available
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        (shared.handler)(work);

        let mut state = shared.lock();
        state.working -= 1;
        if state.working == 0 && state.queue.is_empty() {
            drop(state);
            shared.all_idle.notify_all();
        }
    }
}
