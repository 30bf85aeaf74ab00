//! Background generation on a worker pool with a polled completion queue
//!
//! Jobs run on a dedicated rayon pool. Finished outputs are pushed onto a
//! mutex-protected queue that the owning thread drains once per tick, so all
//! state changes caused by a completion happen on the owner's thread.
//! A job that fails or panics still delivers a completion, carrying the error.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::{Error, Result};

/// A finished job, tagged with what requested it.
#[derive(Debug)]
pub struct Completed<K, T> {
    pub key: K,
    /// Ticket returned by the [`GenerationRequester::request`] call that produced this.
    pub ticket: u64,
    pub output: Result<T>,
}

/// Runs generation jobs off the owning thread.
///
/// There is no cancellation. Callers that no longer want a result compare its
/// ticket with the one they stored and drop it.
pub struct GenerationRequester<K, T> {
    pool: rayon::ThreadPool,
    completed: Arc<Mutex<VecDeque<Completed<K, T>>>>,
    in_flight: Arc<AtomicUsize>,
    next_ticket: u64,
}

impl<K, T> GenerationRequester<K, T>
where
    K: Send + 'static,
    T: Send + 'static,
{
    /// Create a requester with `threads` workers (0 picks one per core).
    pub fn new(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("terrain-gen-{}", i))
            .panic_handler(|_| log::error!("Terrain generation job panicked"))
            .build()
            .map_err(|e| Error::Streaming(format!("failed to build worker pool: {}", e)))?;

        log::debug!(
            "Generation requester started with {} worker threads",
            pool.current_num_threads()
        );

        Ok(Self {
            pool,
            completed: Arc::new(Mutex::new(VecDeque::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            next_ticket: 0,
        })
    }

    /// Queue `job` and return its ticket. Tickets increase monotonically.
    ///
    /// A panic inside `job` is caught and reported as [`Error::Streaming`].
    pub fn request<F>(&mut self, key: K, job: F) -> u64
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let completed = Arc::clone(&self.completed);
        let in_flight = Arc::clone(&self.in_flight);
        in_flight.fetch_add(1, Ordering::AcqRel);

        self.pool.spawn(move || {
            let output = panic::catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|payload| {
                Err(Error::Streaming(format!(
                    "generation job panicked: {}",
                    panic_message(payload.as_ref())
                )))
            });
            let mut queue = completed.lock().unwrap_or_else(PoisonError::into_inner);
            queue.push_back(Completed { key, ticket, output });
            // Under the lock so a poll never sees the result while it still counts as in flight.
            in_flight.fetch_sub(1, Ordering::AcqRel);
        });

        ticket
    }

    /// Take every result finished since the last poll, in completion order.
    pub fn poll_completed(&self) -> Vec<Completed<K, T>> {
        let mut completed = self
            .completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        completed.drain(..).collect()
    }

    /// Jobs queued or running whose results have not been pushed yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Results waiting to be polled.
    pub fn completed_count(&self) -> usize {
        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drop every result that has not been polled yet.
    pub fn clear_completed(&self) {
        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}
