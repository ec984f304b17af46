//! Launcher configuration and its propagation across the process boundary.

use crate::error::LauncherError;
use crate::identity::{SerialRange, SERIAL_DIGITS, SERIAL_SPACE};
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

/// Accepted URL schemes for the target management server.
fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("^https?://").expect("static pattern"))
}

/// Top-level configuration for one fleet run.
///
/// Constructed once from CLI input and immutable for the run.
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Target management server URL.
    pub url: String,

    /// Device model source file.
    pub model_path: PathBuf,

    /// Number of OS-level worker processes.
    pub processes: u64,

    /// Number of workers spawned inside each process.
    pub workers_per_process: u64,

    /// Wait before each process spawn (including the first).
    pub process_delay: Duration,

    /// Wait between worker spawns within a process (not before the first).
    pub worker_delay: Duration,

    /// Starting offset of the global serial range.
    pub serial_offset: u64,
}

impl SpawnConfig {
    /// Create a configuration with the default fan-out shape.
    pub fn new(url: impl Into<String>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            model_path: model_path.into(),
            processes: 1,
            workers_per_process: 10,
            process_delay: Duration::from_millis(5000),
            worker_delay: Duration::from_millis(20),
            serial_offset: 0,
        }
    }

    /// Set the number of worker processes.
    pub fn with_processes(mut self, processes: u64) -> Self {
        self.processes = processes;
        self
    }

    /// Set the number of workers per process.
    pub fn with_workers_per_process(mut self, workers: u64) -> Self {
        self.workers_per_process = workers;
        self
    }

    /// Set the inter-process spawn delay.
    pub fn with_process_delay(mut self, delay: Duration) -> Self {
        self.process_delay = delay;
        self
    }

    /// Set the inter-worker spawn delay.
    pub fn with_worker_delay(mut self, delay: Duration) -> Self {
        self.worker_delay = delay;
        self
    }

    /// Set the starting serial offset.
    pub fn with_serial_offset(mut self, offset: u64) -> Self {
        self.serial_offset = offset;
        self
    }

    /// Validate the configuration before anything is spawned.
    ///
    /// Rejects URLs outside the accepted schemes, zero counts, and serial
    /// ranges that would not fit the fixed-width serial encoding.
    pub fn validate(&self) -> Result<(), LauncherError> {
        if !url_pattern().is_match(&self.url) {
            return Err(LauncherError::InvalidUrl {
                url: self.url.clone(),
            });
        }
        if self.processes == 0 {
            return Err(LauncherError::InvalidCount { name: "processes" });
        }
        if self.workers_per_process == 0 {
            return Err(LauncherError::InvalidCount {
                name: "workers-per-process",
            });
        }

        let total = self
            .processes
            .checked_mul(self.workers_per_process)
            .ok_or_else(|| overflow_err(self))?;
        let end = self
            .serial_offset
            .checked_add(total)
            .ok_or_else(|| overflow_err(self))?;
        if end > SERIAL_SPACE {
            return Err(overflow_err(self));
        }
        Ok(())
    }

    /// Total number of workers across all processes.
    pub fn total_workers(&self) -> u64 {
        self.processes * self.workers_per_process
    }

    /// Serial range allocated to the `index`-th process.
    pub fn range_for(&self, index: u64) -> SerialRange {
        SerialRange::for_process(self.serial_offset, self.workers_per_process, index)
    }

    /// The configuration share propagated to the `index`-th process.
    pub fn worker_config(&self, index: u64) -> WorkerProcessConfig {
        WorkerProcessConfig {
            worker_count: self.workers_per_process,
            serial_start: self.range_for(index).start,
            url: self.url.clone(),
            model_path: self.model_path.clone(),
            worker_delay: self.worker_delay,
        }
    }
}

fn overflow_err(config: &SpawnConfig) -> LauncherError {
    LauncherError::SerialOverflow {
        offset: config.serial_offset,
        total: config.processes.saturating_mul(config.workers_per_process),
        digits: SERIAL_DIGITS,
    }
}

const ENV_WORKER_COUNT: &str = "FLEETSIM_WORKER_COUNT";
const ENV_SERIAL_START: &str = "FLEETSIM_SERIAL_START";
const ENV_URL: &str = "FLEETSIM_URL";
const ENV_MODEL_PATH: &str = "FLEETSIM_MODEL_PATH";
const ENV_WORKER_DELAY_MS: &str = "FLEETSIM_WORKER_DELAY_MS";

/// One process's share of the run configuration.
///
/// Crosses the process boundary as plain environment variables; the
/// receiving side validates presence and type of every field before it
/// builds the device model or spawns anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerProcessConfig {
    /// Number of workers this process spawns.
    pub worker_count: u64,

    /// First serial of this process's range.
    pub serial_start: u64,

    /// Target management server URL.
    pub url: String,

    /// Device model source file.
    pub model_path: PathBuf,

    /// Wait between worker spawns (not before the first).
    pub worker_delay: Duration,
}

impl WorkerProcessConfig {
    /// Serialize to environment key/value pairs for the child process.
    pub fn to_env(&self) -> Vec<(&'static str, String)> {
        vec![
            (ENV_WORKER_COUNT, self.worker_count.to_string()),
            (ENV_SERIAL_START, self.serial_start.to_string()),
            (ENV_URL, self.url.clone()),
            (ENV_MODEL_PATH, self.model_path.display().to_string()),
            (
                ENV_WORKER_DELAY_MS,
                self.worker_delay.as_millis().to_string(),
            ),
        ]
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, LauncherError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through a variable lookup function.
    pub fn from_lookup(
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, LauncherError> {
        let require = |name: &'static str| -> Result<String, LauncherError> {
            lookup(name).ok_or(LauncherError::MissingEnv { name })
        };
        let parse = |name: &'static str| -> Result<u64, LauncherError> {
            let value = require(name)?;
            value
                .parse()
                .map_err(|_| LauncherError::InvalidEnv { name, value })
        };

        Ok(Self {
            worker_count: parse(ENV_WORKER_COUNT)?,
            serial_start: parse(ENV_SERIAL_START)?,
            url: require(ENV_URL)?,
            model_path: PathBuf::from(require(ENV_MODEL_PATH)?),
            worker_delay: Duration::from_millis(parse(ENV_WORKER_DELAY_MS)?),
        })
    }

    /// This process's serial range.
    pub fn range(&self) -> SerialRange {
        SerialRange {
            start: self.serial_start,
            count: self.worker_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config() -> SpawnConfig {
        SpawnConfig::new("http://127.0.0.1:7547/", "model.csv")
    }

    #[test]
    fn test_accepts_http_and_https() {
        assert!(config().validate().is_ok());
        let https = SpawnConfig::new("https://acs.example/cwmp", "model.csv");
        assert!(https.validate().is_ok());
    }

    #[test]
    fn test_rejects_other_schemes() {
        let ftp = SpawnConfig::new("ftp://host", "model.csv");
        assert!(matches!(
            ftp.validate(),
            Err(LauncherError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_counts() {
        assert!(matches!(
            config().with_processes(0).validate(),
            Err(LauncherError::InvalidCount { name: "processes" })
        ));
        assert!(matches!(
            config().with_workers_per_process(0).validate(),
            Err(LauncherError::InvalidCount { .. })
        ));
    }

    #[test]
    fn test_rejects_serial_overflow() {
        let too_big = config()
            .with_processes(100)
            .with_workers_per_process(10_000)
            .with_serial_offset(1);
        assert!(matches!(
            too_big.validate(),
            Err(LauncherError::SerialOverflow { .. })
        ));

        // Exactly filling the serial space is fine.
        let full = config()
            .with_processes(100)
            .with_workers_per_process(10_000)
            .with_serial_offset(0);
        assert!(full.validate().is_ok());
    }

    #[test]
    fn test_worker_config_ranges_are_disjoint() {
        let config = config()
            .with_processes(3)
            .with_workers_per_process(4)
            .with_serial_offset(10);
        let starts: Vec<u64> = (0..3).map(|i| config.worker_config(i).serial_start).collect();
        assert_eq!(starts, [10, 14, 18]);
        assert_eq!(config.total_workers(), 12);
    }

    #[test]
    fn test_env_round_trip() {
        let original = config().with_worker_delay(Duration::from_millis(35)).worker_config(2);
        let env: HashMap<&'static str, String> = original.to_env().into_iter().collect();
        let decoded =
            WorkerProcessConfig::from_lookup(|name| env.get(name).cloned()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_missing_env_is_named() {
        let err = WorkerProcessConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(
            err,
            LauncherError::MissingEnv {
                name: "FLEETSIM_WORKER_COUNT"
            }
        ));
    }

    #[test]
    fn test_invalid_env_is_named() {
        let mut env: HashMap<&'static str, String> =
            config().worker_config(0).to_env().into_iter().collect();
        env.insert("FLEETSIM_WORKER_COUNT", "ten".into());
        let err = WorkerProcessConfig::from_lookup(|name| env.get(name).cloned()).unwrap_err();
        match err {
            LauncherError::InvalidEnv { name, value } => {
                assert_eq!(name, "FLEETSIM_WORKER_COUNT");
                assert_eq!(value, "ten");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
