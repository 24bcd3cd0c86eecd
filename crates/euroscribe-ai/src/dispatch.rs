//! Bounded worker pool over a shared FIFO of reports.
//!
//! All items are enqueued up front. K workers pull from one queue and run each
//! report's escalation to completion before taking the next. Finished outcomes
//! travel over a result channel to the dispatching task, which is the only
//! writer of the [`Aggregator`]. Once every item is back, one shutdown sentinel
//! per worker is queued and the pool is joined.

use std::sync::Arc;
use std::time::Instant;

use euroscribe_core::{Aggregator, ItemOutcome, ReportItem};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::client::ModelClient;
use crate::error::DispatchError;
use crate::escalation::Escalation;

pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug)]
enum Job {
    Report(ReportItem),
    Shutdown,
}

type JobQueue = Arc<Mutex<mpsc::UnboundedReceiver<Job>>>;

/// Totals for one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DispatchStats {
    pub items: usize,
    pub attempts: usize,
    pub accepted: usize,
    pub elapsed_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatcher {
    workers: usize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl Dispatcher {
    /// `workers` is clamped to at least 1.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Process every item exactly once and fold the outcomes into `aggregator`.
    ///
    /// Returns only after all items are resolved and all workers have exited.
    pub async fn run(
        &self,
        items: Vec<ReportItem>,
        escalation: Escalation,
        client: Arc<dyn ModelClient>,
        aggregator: &mut Aggregator,
    ) -> Result<DispatchStats, DispatchError> {
        let started = Instant::now();
        let expected = items.len();

        // `queue` holds the receiver until the pool is joined, so sends on
        // `job_tx` cannot fail.
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        for item in items {
            let _ = job_tx.send(Job::Report(item));
        }
        let queue: JobQueue = Arc::new(Mutex::new(job_rx));

        let (result_tx, mut result_rx) = mpsc::unbounded_channel();
        let mut pool = JoinSet::new();
        for id in 0..self.workers {
            pool.spawn(worker(
                id,
                queue.clone(),
                escalation,
                client.clone(),
                result_tx.clone(),
            ));
        }
        drop(result_tx);

        info!(items = expected, workers = self.workers, "dispatching reports");

        let mut stats = DispatchStats {
            items: expected,
            ..Default::default()
        };
        let mut received = 0;
        while received < expected {
            tokio::select! {
                outcome = result_rx.recv() => {
                    let Some(outcome) = outcome else {
                        return Err(DispatchError::Incomplete { expected, received });
                    };
                    received += 1;
                    let accepted = outcome.accepted().is_some();
                    stats.attempts += outcome.attempt_count();
                    stats.accepted += usize::from(accepted);
                    info!(
                        report = outcome.index,
                        attempts = outcome.attempt_count(),
                        accepted,
                        done = received,
                        total = expected,
                        "report resolved"
                    );
                    aggregator.absorb(&outcome);
                }
                Some(joined) = pool.join_next() => {
                    joined?;
                }
            }
        }

        for _ in 0..self.workers {
            let _ = job_tx.send(Job::Shutdown);
        }
        while let Some(joined) = pool.join_next().await {
            joined?;
        }
        drop(queue);

        stats.elapsed_secs = started.elapsed().as_secs_f64();
        Ok(stats)
    }
}

async fn worker(
    id: usize,
    queue: JobQueue,
    escalation: Escalation,
    client: Arc<dyn ModelClient>,
    results: mpsc::UnboundedSender<ItemOutcome>,
) {
    loop {
        let job = queue.lock().await.recv().await;
        match job {
            Some(Job::Report(item)) => {
                debug!(worker = id, report = item.index, "picked up report");
                let outcome = escalation.run(client.as_ref(), &item).await;
                if results.send(outcome).is_err() {
                    break;
                }
            }
            Some(Job::Shutdown) | None => break,
        }
    }
    debug!(worker = id, "worker exiting");
}
