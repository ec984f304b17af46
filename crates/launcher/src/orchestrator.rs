//! Top-level worker process fan-out.
//!
//! Spawns a staggered sequence of OS-level worker processes, each with a
//! disjoint serial range, and monitors them for the lifetime of the run.
//! The process tier waits the configured delay before every spawn,
//! including the first. This is unlike the worker tier inside each process,
//! which starts its first worker immediately; the asymmetry is observed
//! launcher behavior and is preserved as-is.
//!
//! Shutdown is a hard-termination policy: an interrupt kills every tracked
//! process immediately, with no graceful drain of in-flight endpoint
//! sessions, then the orchestrator exits.

use crate::config::SpawnConfig;
use crate::error::LauncherError;
use crate::identity::SerialRange;
use std::path::Path;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Exit record for one tracked worker process.
#[derive(Debug)]
pub struct ProcessExit {
    /// Serial range the process owned.
    pub range: SerialRange,

    /// Exit status, if the process could be reaped.
    pub status: Option<ExitStatus>,

    /// Whether the process was killed by the shutdown path.
    pub killed: bool,
}

/// Tally of process fates for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessReport {
    /// Processes spawned and tracked.
    pub spawned: u64,

    /// Processes that exited on their own.
    pub exited: u64,

    /// Processes killed by the shutdown path.
    pub killed: u64,
}

/// Orchestrates the OS-process tier of the fan-out.
///
/// Every spawned child is tracked by a monitor task owned by this struct;
/// there is no ambient global registry. Cancellation flows through a single
/// token into every monitor, which performs the kill for its own child.
pub struct ProcessOrchestrator {
    config: SpawnConfig,
    /// One monitor task per tracked worker process.
    processes: JoinSet<ProcessExit>,
    shutdown: CancellationToken,
}

impl ProcessOrchestrator {
    /// Validate the configuration and construct the orchestrator.
    ///
    /// Fails fast on an invalid target URL or fan-out shape, before any
    /// process is spawned.
    pub fn new(config: SpawnConfig) -> Result<Self, LauncherError> {
        config.validate()?;
        Ok(Self {
            config,
            processes: JoinSet::new(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Token that triggers hard termination of every tracked process.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the process fan-out to completion (or interruption).
    ///
    /// Spawning and exit monitoring run concurrently; a process exiting
    /// early is logged with its serial range but never restarted. A
    /// cancelled shutdown token stops further spawns and kills exactly the
    /// processes tracked so far.
    pub async fn run(mut self) -> Result<ProcessReport, LauncherError> {
        let exe = std::env::current_exe().map_err(LauncherError::Spawn)?;

        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, terminating worker processes");
                shutdown.cancel();
            }
        });

        info!(
            processes = self.config.processes,
            workers_per_process = self.config.workers_per_process,
            url = %self.config.url,
            "starting process fan-out"
        );

        let shutdown = self.shutdown.clone();
        staggered_spawns(
            self.config.processes,
            self.config.process_delay,
            &shutdown,
            |index| self.spawn_process(&exe, index),
        )
        .await;

        let mut report = ProcessReport {
            spawned: self.processes.len() as u64,
            ..Default::default()
        };
        while let Some(joined) = self.processes.join_next().await {
            match joined {
                Ok(exit) if exit.killed => report.killed += 1,
                Ok(_) => report.exited += 1,
                Err(join_error) => {
                    error!(error = %join_error, "process monitor task failed");
                }
            }
        }

        info!(
            spawned = report.spawned,
            exited = report.exited,
            killed = report.killed,
            "process fan-out finished"
        );
        Ok(report)
    }

    /// Spawn one worker process and hand it to a monitor task.
    ///
    /// A spawn failure is isolated to that process slot: it is logged and
    /// the remaining processes are still scheduled.
    fn spawn_process(&mut self, exe: &Path, index: u64) {
        let range = self.config.range_for(index);
        let mut command = Command::new(exe);
        command.arg("worker").kill_on_drop(true);
        for (key, value) in self.config.worker_config(index).to_env() {
            command.env(key, value);
        }

        match command.spawn() {
            Ok(child) => {
                info!(process = index, pid = child.id(), range = %range, "spawned worker process");
                self.processes
                    .spawn(monitor_process(child, range, self.shutdown.clone()));
            }
            Err(error) => {
                error!(process = index, range = %range, error = %error, "failed to spawn worker process");
            }
        }
    }
}

/// Drive the staggered spawn schedule, invoking `spawn` once per index.
///
/// Waits `delay` before every invocation, the first included. Stops
/// scheduling as soon as `shutdown` fires.
async fn staggered_spawns(
    count: u64,
    delay: Duration,
    shutdown: &CancellationToken,
    mut spawn: impl FnMut(u64),
) {
    for index in 0..count {
        tokio::select! {
            _ = sleep(delay) => {}
            _ = shutdown.cancelled() => break,
        }
        spawn(index);
    }
}

/// Wait for one worker process to exit, or kill it on shutdown.
///
/// At-most-once spawn: an exit is logged with the process's serial range
/// and exit code or signal, and the process is never restarted.
async fn monitor_process(
    mut child: Child,
    range: SerialRange,
    shutdown: CancellationToken,
) -> ProcessExit {
    tokio::select! {
        status = child.wait() => match status {
            Ok(status) => {
                info!(range = %range, exit = %describe_exit(&status), "worker process exited");
                ProcessExit { range, status: Some(status), killed: false }
            }
            Err(error) => {
                error!(range = %range, error = %error, "failed to wait on worker process");
                ProcessExit { range, status: None, killed: false }
            }
        },
        _ = shutdown.cancelled() => {
            if let Err(error) = child.start_kill() {
                warn!(range = %range, error = %error, "failed to kill worker process");
            }
            let status = child.wait().await.ok();
            info!(range = %range, "worker process terminated on shutdown");
            ProcessExit { range, status, killed: true }
        }
    }
}

/// Human-readable exit code or signal of a reaped process.
fn describe_exit(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("code {code}");
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("signal {signal}");
        }
    }
    "unknown".to_string()
}
