// Job execution

use crate::types::Job;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Runs a single job to completion.
///
/// Implementations must not touch the parent's working directory; the job
/// carries its own.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: &Job) -> RunOutcome;
}

/// What happened to one job. Never an error: a bad job does not stop the
/// sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    /// The process ran but exited non-zero (or was killed, `None`).
    Failed(Option<i32>),
    /// The process could not be started at all.
    SpawnFailed(String),
    Simulated,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded)
    }
}

/// Spawns the learner as a child process in the job directory.
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    /// Relative program paths with a directory part are resolved against
    /// the job directory; bare names go through `PATH`.
    fn resolve_program(job: &Job) -> PathBuf {
        let program = Path::new(&job.program);
        if program.is_relative() && program.components().count() > 1 {
            job.dir.join(program)
        } else {
            program.to_path_buf()
        }
    }
}

#[async_trait]
impl JobRunner for ProcessRunner {
    async fn run(&self, job: &Job) -> RunOutcome {
        info!("Running in {}: {}", job.dir.display(), job.command_line());

        let status = Command::new(Self::resolve_program(job))
            .args(&job.args)
            .current_dir(&job.dir)
            .stdin(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => {
                debug!("Job in {} finished", job.dir.display());
                RunOutcome::Succeeded
            }
            Ok(status) => {
                warn!("Job in {} exited with {}", job.dir.display(), status);
                RunOutcome::Failed(status.code())
            }
            Err(e) => {
                warn!("Could not start `{}` in {}: {}", job.program, job.dir.display(), e);
                RunOutcome::SpawnFailed(e.to_string())
            }
        }
    }
}

/// Logs what would run and does nothing else.
#[derive(Debug, Default, Clone)]
pub struct SimulatedRunner;

impl SimulatedRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl JobRunner for SimulatedRunner {
    async fn run(&self, job: &Job) -> RunOutcome {
        info!("cd to {}", job.dir.display());
        info!("[simulate] {}", job.command_line());
        RunOutcome::Simulated
    }
}
