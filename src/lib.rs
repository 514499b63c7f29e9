// Core modules
mod config;
pub mod dispatch;
mod enumerator;
mod error;
mod types;

// Re-export key types and functions
pub use config::{
    DEFAULT_PRESET, DEFAULT_WORKERS, PRESETS, SweepConfig, load_sweep_config, parse_config,
};
pub use dispatch::{
    DispatchSummary, Dispatcher, JobRunner, ProcessRunner, RunOutcome, SimulatedRunner,
};
pub use enumerator::{enumerate, group_dir_name, job_dir_name};
pub use error::{SweepError, SweepResult};
pub use types::{Group, GroupLabel, InputFile, InputId, Job, OffsetTuple};

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

/// Whether jobs are actually executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Execute,
    Simulate,
}

impl RunMode {
    /// Interpret the legacy positional mode argument: anything starting
    /// with `sim` means simulate.
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            Some(a) if a.starts_with("sim") => RunMode::Simulate,
            _ => RunMode::Execute,
        }
    }

    pub fn runner(self) -> Arc<dyn JobRunner> {
        match self {
            RunMode::Execute => Arc::new(ProcessRunner::new()),
            RunMode::Simulate => Arc::new(SimulatedRunner::new()),
        }
    }
}

/// Convenience function to enumerate a sweep under `root` and dispatch it.
///
/// Enumeration errors abort before anything runs; job failures only show
/// up in the returned summary.
pub async fn run_sweep(
    config: &SweepConfig,
    root: &Path,
    mode: RunMode,
) -> Result<DispatchSummary> {
    let jobs = enumerate(config, root)?;
    let dispatcher = Dispatcher::new(config.workers, mode.runner());
    Ok(dispatcher.dispatch(jobs).await)
}
