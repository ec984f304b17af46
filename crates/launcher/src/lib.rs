//! Two-tier spawn orchestrator for a simulated endpoint fleet.
//!
//! The launcher fans out in two stages: the [`orchestrator`] creates a
//! staggered sequence of OS-level worker processes, each of which runs the
//! [`spawner`] to create a staggered sequence of lightweight workers. Every
//! worker owns one simulated endpoint identity and runs the opaque endpoint
//! logic behind the [`session::Session`] boundary against the target
//! management server.
//!
//! Identity assignment is deterministic: process `i` receives the contiguous
//! serial range starting at `offset + i * workers_per_process`, and worker
//! `j` within it is `start + j`. Ranges never overlap and leave no gaps.

pub mod config;
pub mod error;
pub mod identity;
pub mod orchestrator;
pub mod session;
pub mod spawner;

pub use config::{SpawnConfig, WorkerProcessConfig};
pub use error::LauncherError;
pub use identity::{SerialNumber, SerialRange};
pub use orchestrator::{ProcessExit, ProcessOrchestrator, ProcessReport};
pub use session::{HttpSession, Session, SessionError};
pub use spawner::{SpawnReport, WorkerOutcome, WorkerSpawner};
