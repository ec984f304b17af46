//! Intra-process worker fan-out.
//!
//! Spawns a bounded, time-staggered sequence of workers inside one process.
//! The first worker starts immediately and each subsequent one waits the
//! configured delay, deliberately different from the process tier, which
//! delays before every spawn including the first. The asymmetry matches the
//! observed launcher behavior and is preserved rather than unified.

use crate::config::WorkerProcessConfig;
use crate::identity::SerialNumber;
use crate::session::{Session, SessionError};
use fleetsim_model::DeviceModel;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tracing::{error, info};

/// The single terminal outcome of one worker unit.
#[derive(Debug)]
pub enum WorkerOutcome {
    /// The endpoint session ran to completion.
    Completed(SerialNumber),

    /// The endpoint session reported a runtime error.
    Failed {
        serial: SerialNumber,
        error: SessionError,
    },
}

/// Tally of worker outcomes for one process.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SpawnReport {
    pub completed: u64,
    pub failed: u64,
    /// Workers that terminated abnormally (panicked) rather than reporting.
    pub aborted: u64,
}

/// Spawns this process's workers and aggregates their outcomes.
///
/// Worker `j` (0-indexed) is assigned serial `serial_start + j` and receives
/// the shared read-only device model plus the target URL. Completion order
/// is unconstrained; one worker's failure never blocks or aborts the
/// spawning of subsequently scheduled workers.
pub struct WorkerSpawner<S> {
    session: Arc<S>,
    model: Arc<DeviceModel>,
    config: WorkerProcessConfig,
}

impl<S: Session> WorkerSpawner<S> {
    pub fn new(session: S, model: DeviceModel, config: WorkerProcessConfig) -> Self {
        Self {
            session: Arc::new(session),
            model: Arc::new(model),
            config,
        }
    }

    /// Run the fan-out to completion and return the outcome tally.
    ///
    /// Spawning and outcome handling interleave: the loop selects between
    /// the next scheduled spawn and the next finished worker, so a slow or
    /// failing worker never delays its siblings beyond the configured
    /// stagger.
    pub async fn run(self) -> SpawnReport {
        let total = self.config.worker_count;
        let range = self.config.range();
        let mut workers: JoinSet<WorkerOutcome> = JoinSet::new();
        // Task id to serial, so an abnormal exit can still be attributed.
        let mut serials: HashMap<tokio::task::Id, SerialNumber> = HashMap::new();
        let mut report = SpawnReport::default();
        let mut spawned = 0u64;
        // First spawn fires immediately; each later one waits the delay.
        let mut next_spawn = Instant::now();

        info!(
            range = %range,
            workers = total,
            worker_delay_ms = self.config.worker_delay.as_millis() as u64,
            "starting worker fan-out"
        );

        loop {
            if spawned == total && workers.is_empty() {
                break;
            }
            tokio::select! {
                _ = time::sleep_until(next_spawn), if spawned < total => {
                    let serial = range.serial(spawned);
                    let id = self.spawn_worker(&mut workers, serial);
                    serials.insert(id, serial);
                    spawned += 1;
                    next_spawn = Instant::now() + self.config.worker_delay;
                }
                Some(joined) = workers.join_next_with_id(), if !workers.is_empty() => {
                    record_outcome(joined, &mut serials, &mut report);
                }
            }
        }

        info!(
            range = %range,
            completed = report.completed,
            failed = report.failed,
            aborted = report.aborted,
            "worker fan-out finished"
        );
        report
    }

    fn spawn_worker(
        &self,
        workers: &mut JoinSet<WorkerOutcome>,
        serial: SerialNumber,
    ) -> tokio::task::Id {
        let session = Arc::clone(&self.session);
        let model = Arc::clone(&self.model);
        let url = self.config.url.clone();
        info!(serial = %serial, "starting worker");
        workers
            .spawn(async move {
                match session.run(model, serial, url).await {
                    Ok(()) => WorkerOutcome::Completed(serial),
                    Err(error) => WorkerOutcome::Failed { serial, error },
                }
            })
            .id()
    }
}

/// Log one joined worker and update the tally. Failures stay isolated to
/// the worker they occurred in.
fn record_outcome(
    joined: Result<(tokio::task::Id, WorkerOutcome), tokio::task::JoinError>,
    serials: &mut HashMap<tokio::task::Id, SerialNumber>,
    report: &mut SpawnReport,
) {
    match joined {
        Ok((id, WorkerOutcome::Completed(serial))) => {
            serials.remove(&id);
            info!(serial = %serial, "worker completed");
            report.completed += 1;
        }
        Ok((id, WorkerOutcome::Failed { serial, error })) => {
            serials.remove(&id);
            error!(serial = %serial, error = %error, "worker failed");
            report.failed += 1;
        }
        Err(join_error) => {
            let serial = serials.remove(&join_error.id());
            match serial {
                Some(serial) => {
                    error!(serial = %serial, error = %join_error, "worker terminated abnormally")
                }
                None => error!(error = %join_error, "worker terminated abnormally"),
            }
            report.aborted += 1;
        }
    }
}
