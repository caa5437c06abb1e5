use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::signal;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, Instrument};

use crate::utils::logger::RESULT_TARGET;

/// Why a worker stopped without producing its own result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    #[error("cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// Runs labelled jobs as independent tasks and joins them in submission order.
///
/// A job that fails, panics or is stopped never affects its siblings; every
/// job gets exactly one slot in the returned vector.
#[derive(Debug, Clone)]
pub struct WorkerRunner {
    token: CancellationToken,
    deadline: Option<Duration>,
}

impl Default for WorkerRunner {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

impl WorkerRunner {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Stop every job still running after `deadline`. `None` waits forever.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Cancel `token` on the first Ctrl+C.
    pub fn cancel_on_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("🛑 Received Ctrl+C. Resolving pending workers as cancelled...");
                    token.cancel();
                }
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                }
            }
        })
    }

    pub async fn run_ordered<T, Fut>(&self, jobs: Vec<(String, Fut)>) -> Vec<Result<T, WorkerExit>>
    where
        T: Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let start_time = Instant::now();
        debug!("Starting {} workers", jobs.len());

        // Every job is spawned before any is awaited
        let handles: Vec<JoinHandle<Result<T, WorkerExit>>> = jobs
            .into_iter()
            .map(|(label, job)| {
                let token = self.token.clone();
                let deadline = self.deadline;
                // The file layer only records spans under the race target
                let span =
                    tracing::info_span!(target: RESULT_TARGET, "unit", label = label.as_str());

                tokio::spawn(
                    async move {
                        let work = async move {
                            match deadline {
                                Some(limit) => tokio::time::timeout(limit, job)
                                    .await
                                    .map_err(|_| WorkerExit::DeadlineExceeded),
                                None => Ok(job.await),
                            }
                        };

                        tokio::select! {
                            _ = token.cancelled() => Err(WorkerExit::Cancelled),
                            res = work => res,
                        }
                    }
                    .instrument(span),
                )
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(match handle.await {
                Ok(res) => res,
                Err(e) => Err(join_failure(e)),
            });
        }

        debug!(
            "All {} workers joined in {:.3}s",
            results.len(),
            start_time.elapsed().as_secs_f64()
        );

        results
    }
}

fn join_failure(e: JoinError) -> WorkerExit {
    if e.is_panic() {
        let payload = e.into_panic();
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        error!("A worker task panicked: {}", msg);
        WorkerExit::Panicked(msg)
    } else {
        WorkerExit::Cancelled
    }
}
