// Bounded worker pool for job dispatch

use crate::dispatch::executor::{JobRunner, RunOutcome};
use crate::types::Job;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Runs jobs with a fixed number of workers pulling from one shared queue.
pub struct Dispatcher {
    workers: usize,
    runner: Arc<dyn JobRunner>,
}

/// Tally of a finished dispatch. The sweep itself never fails on these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub simulated: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tally {
    succeeded: usize,
    failed: usize,
    simulated: usize,
}

impl Tally {
    fn record(&mut self, outcome: &RunOutcome) {
        match outcome {
            RunOutcome::Succeeded => self.succeeded += 1,
            RunOutcome::Failed(_) | RunOutcome::SpawnFailed(_) => self.failed += 1,
            RunOutcome::Simulated => self.simulated += 1,
        }
    }
}

impl Dispatcher {
    pub fn new(workers: usize, runner: Arc<dyn JobRunner>) -> Self {
        Self {
            workers: workers.max(1),
            runner,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every job and wait for all of them.
    ///
    /// Completion order is whatever the pool produces. Per-job failures are
    /// counted, never propagated.
    pub async fn dispatch(&self, jobs: Vec<Job>) -> DispatchSummary {
        let started_at = Utc::now();
        let total = jobs.len();
        let queue = Arc::new(Mutex::new(jobs.into_iter().collect::<VecDeque<_>>()));
        let tally = Arc::new(Mutex::new(Tally::default()));

        let pool_size = self.workers.min(total).max(1);
        info!("Dispatching {} jobs on {} workers", total, pool_size);

        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(pool_size);
        for worker_id in 0..pool_size {
            let queue_clone = queue.clone();
            let tally_clone = tally.clone();
            let runner = self.runner.clone();

            handles.push(tokio::spawn(async move {
                Self::worker_loop(worker_id, queue_clone, tally_clone, runner).await;
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Dispatch worker ended abnormally: {}", e);
            }
        }

        let tally = tally.lock().await;
        let summary = DispatchSummary {
            total,
            succeeded: tally.succeeded,
            failed: tally.failed,
            simulated: tally.simulated,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            "Dispatch finished: {} succeeded, {} failed, {} simulated in {:.1}s",
            summary.succeeded,
            summary.failed,
            summary.simulated,
            (summary.finished_at - summary.started_at).num_milliseconds() as f64 / 1000.0
        );

        summary
    }

    async fn worker_loop(
        worker_id: usize,
        queue: Arc<Mutex<VecDeque<Job>>>,
        tally: Arc<Mutex<Tally>>,
        runner: Arc<dyn JobRunner>,
    ) {
        tracing::debug!("Worker {} started", worker_id);

        loop {
            // Get next job
            let job = {
                let mut q = queue.lock().await;
                q.pop_front()
            };

            let Some(job) = job else {
                break;
            };

            tracing::debug!("Worker {} picked job in {}", worker_id, job.dir.display());
            let outcome = runner.run(&job).await;
            tally.lock().await.record(&outcome);
        }

        tracing::debug!("Worker {} drained the queue", worker_id);
    }
}
