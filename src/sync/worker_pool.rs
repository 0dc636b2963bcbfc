use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

type Task = Box<dyn FnOnce() + Send + 'static>;

struct PoolState {
    queue: VecDeque<Task>,
    /// Submitted but not yet completed. Counts queued and running tasks, so
    /// the barrier cannot wake while a running task is still fanning out.
    pending: usize,
    shutdown: bool,
}

struct PoolInner {
    state: Mutex<PoolState>,
    task_ready: Condvar,
    all_done: Condvar,
}

/// Fixed-size pool of worker threads with a FIFO task queue.
///
/// Tasks may submit further tasks; `barrier` waits on the outstanding-task
/// count rather than queue emptiness, so it only returns once the whole
/// transitive fan-out has completed. A panicking task is logged and swallowed
/// without taking its worker down.
pub struct WorkerPool {
    inner: Arc<PoolInner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Self {
        let size = threads.max(1);
        let inner = Arc::new(PoolInner {
            state: Mutex::new(PoolState {
                queue: VecDeque::new(),
                pending: 0,
                shutdown: false,
            }),
            task_ready: Condvar::new(),
            all_done: Condvar::new(),
        });

        let workers = (0..size)
            .map(|_| {
                let inner = Arc::clone(&inner);
                thread::spawn(move || worker_loop(&inner))
            })
            .collect();

        WorkerPool {
            inner,
            workers: Mutex::new(workers),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Enqueue a task. After `shutdown` the task is dropped with a warning.
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) {
        {
            let mut state = self.inner.state.lock();
            if state.shutdown {
                tracing::warn!("task submitted after shutdown; dropping it");
                return;
            }
            state.pending += 1;
            state.queue.push_back(Box::new(task));
        }
        self.inner.task_ready.notify_one();
    }

    /// Block until every submitted task, including tasks submitted by other
    /// tasks, has completed. The pool stays usable afterwards.
    pub fn barrier(&self) {
        let mut state = self.inner.state.lock();
        while state.pending > 0 {
            self.inner.all_done.wait(&mut state);
        }
    }

    /// Stop accepting work. Workers exit once the queue drains.
    pub fn shutdown(&self) {
        {
            let mut state = self.inner.state.lock();
            state.shutdown = true;
        }
        self.inner.task_ready.notify_all();
    }

    /// Drain outstanding work, stop the pool, and wait for every worker to
    /// exit. Idempotent.
    pub fn join(&self) {
        self.barrier();
        self.shutdown();

        let handles: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("worker thread exited by panic");
            }
        }
    }
}

fn worker_loop(inner: &PoolInner) {
    loop {
        let task = {
            let mut state = inner.state.lock();
            loop {
                if let Some(task) = state.queue.pop_front() {
                    break task;
                }
                if state.shutdown {
                    return;
                }
                inner.task_ready.wait(&mut state);
            }
        };

        // the guard decrements on every exit path, panic included
        let _pending = PendingGuard { inner };
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            tracing::error!("task panicked: {}", panic_message(&payload));
        }
    }
}

struct PendingGuard<'a> {
    inner: &'a PoolInner,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        state.pending -= 1;
        if state.pending == 0 {
            self.inner.all_done.notify_all();
        }
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn runs_every_submitted_task() {
        let pool = WorkerPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..50 {
            let counter = Arc::clone(&counter);
            pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.join();

        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn barrier_covers_tasks_submitted_by_tasks() {
        let pool = Arc::new(WorkerPool::new(2));
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..4 {
            let pool_handle = Arc::clone(&pool);
            let counter = Arc::clone(&counter);
            pool.submit(move || {
                thread::sleep(Duration::from_millis(10));
                let counter_inner = Arc::clone(&counter);
                pool_handle.submit(move || {
                    thread::sleep(Duration::from_millis(10));
                    counter_inner.fetch_add(1, Ordering::SeqCst);
                });
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.barrier();

        // four parents plus four children, none missed by the barrier
        assert_eq!(counter.load(Ordering::SeqCst), 8);
        pool.join();
    }

    #[test]
    fn pool_survives_panicking_tasks() {
        let pool = WorkerPool::new(1);
        let counter = Arc::new(AtomicUsize::new(0));

        pool.submit(|| panic!("deliberate"));
        let counter_clone = Arc::clone(&counter);
        pool.submit(move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });
        pool.join();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pool_is_reusable_after_barrier() {
        let pool = WorkerPool::new(2);
        let counter = Arc::new(AtomicUsize::new(0));

        for round in 0..3 {
            let counter = Arc::clone(&counter);
            pool.submit(move || {
                counter.fetch_add(round + 1, Ordering::SeqCst);
            });
            pool.barrier();
        }
        pool.join();

        assert_eq!(counter.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn submissions_after_shutdown_are_dropped() {
        let pool = WorkerPool::new(2);
        let counter = Arc::new(AtomicUsize::new(0));

        pool.join();
        let counter_clone = Arc::clone(&counter);
        pool.submit(move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });
        pool.barrier();

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn barrier_on_idle_pool_returns_immediately() {
        let pool = WorkerPool::new(3);
        pool.barrier();
        pool.join();
    }
}
