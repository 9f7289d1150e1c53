//! A fixed-size worker pool for asynchronous loads.

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::{
    num::NonZeroUsize,
    panic::{self, AssertUnwindSafe},
    thread::{self, JoinHandle},
};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Default number of workers: the available parallelism, capped at 4.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .min(4)
}

/// Runs submitted jobs on a fixed set of threads.
///
/// The job queue is unbounded so submitting never blocks; the number of
/// threads is fixed at construction. Dropping the pool lets queued jobs finish
/// and then joins the workers.
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` workers. Returns `None` if `size` is zero or no thread
    /// could be spawned.
    pub fn new(size: usize) -> Option<Self> {
        if size == 0 {
            return None;
        }
        let (sender, receiver) = unbounded::<Job>();
        let workers: Vec<_> = (0..size)
            .filter_map(|id| Self::spawn_worker(id, receiver.clone()))
            .collect();
        if workers.is_empty() {
            return None;
        }
        Some(Self {
            sender: Some(sender),
            workers,
        })
    }

    fn spawn_worker(id: usize, receiver: Receiver<Job>) -> Option<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("relinker-{id}"))
            .spawn(move || {
                while let Ok(job) = receiver.recv() {
                    // A panicking job must not take the worker down with it.
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        log::error!("[Pool] job panicked on worker {}", id);
                    }
                }
                log::trace!("[Pool] worker {} exiting", id);
            })
            .map_err(|err| log::warn!("failed to spawn relinker worker {id}: {err}"))
            .ok()
    }

    /// Queues `job`. Hands the job back if the pool is shutting down.
    pub fn submit(&self, job: Job) -> Result<(), Job> {
        match &self.sender {
            Some(sender) => sender.send(job).map_err(|err| err.into_inner()),
            None => Err(job),
        }
    }

    /// Number of worker threads.
    #[inline]
    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel ends each worker's receive loop.
        drop(self.sender.take());
        let current = thread::current().id();
        for worker in self.workers.drain(..) {
            // The last handle may be released by a job running on a worker.
            if worker.thread().id() != current {
                let _ = worker.join();
            }
        }
    }
}
