//! Fleetsim launcher CLI
//!
//! Launches a fleet of simulated client endpoints against a management
//! server: a staggered set of worker processes, each running a staggered
//! set of endpoint workers with unique serial numbers.

use clap::{Parser, Subcommand};
use fleetsim_launcher::config::{SpawnConfig, WorkerProcessConfig};
use fleetsim_launcher::orchestrator::ProcessOrchestrator;
use fleetsim_launcher::session::HttpSession;
use fleetsim_launcher::spawner::WorkerSpawner;
use fleetsim_model::DeviceModel;
use std::path::PathBuf;
use std::time::Duration;
use tracing::error;

#[derive(Parser)]
#[command(name = "fleetsim")]
#[command(about = "Simulated endpoint fleet launcher")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the simulated endpoint fleet
    Run {
        /// Management server URL (http or https)
        #[arg(short, long, default_value = "http://127.0.0.1:7547/")]
        url: String,

        /// Device model file (.csv is tabular, anything else is JSON)
        #[arg(short, long, default_value = "data/device-default.csv")]
        model: PathBuf,

        /// Number of worker processes
        #[arg(short, long, default_value = "1")]
        processes: u64,

        /// Workers per process
        #[arg(short, long, default_value = "10")]
        workers: u64,

        /// Delay before each process spawn, in milliseconds
        #[arg(long, default_value = "5000")]
        process_delay_ms: u64,

        /// Delay between worker spawns within a process, in milliseconds
        #[arg(long, default_value = "20")]
        worker_delay_ms: u64,

        /// Starting serial number offset
        #[arg(long, default_value = "0")]
        serial_offset: u64,
    },

    /// Worker-process entry point; configured via FLEETSIM_* environment
    #[command(hide = true)]
    Worker,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            url,
            model,
            processes,
            workers,
            process_delay_ms,
            worker_delay_ms,
            serial_offset,
        } => {
            let config = SpawnConfig::new(url, model)
                .with_processes(processes)
                .with_workers_per_process(workers)
                .with_process_delay(Duration::from_millis(process_delay_ms))
                .with_worker_delay(Duration::from_millis(worker_delay_ms))
                .with_serial_offset(serial_offset);

            // Validation failure exits non-zero with nothing spawned.
            let orchestrator = ProcessOrchestrator::new(config)?;
            orchestrator.run().await?;
        }

        Commands::Worker => {
            // Startup failures below are fatal to this process only; sibling
            // processes keep running. Both are tagged with this process's id.
            let pid = std::process::id();
            let config = WorkerProcessConfig::from_env().inspect_err(|e| {
                error!(pid, error = %e, "invalid worker process configuration");
            })?;
            let model = DeviceModel::load(&config.model_path).inspect_err(|e| {
                error!(pid, error = %e, "failed to load device model");
            })?;

            WorkerSpawner::new(HttpSession::new(), model, config)
                .run()
                .await;
        }
    }

    Ok(())
}
