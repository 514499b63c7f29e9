//! Turns a sweep configuration into an ordered list of jobs.
//!
//! Group directories live directly under the sweep root and job directories
//! one level below them, so every path handed to the learner is expressed
//! relative to `../..` from the job's working directory.

use crate::config::SweepConfig;
use crate::error::SweepError;
use crate::types::{Group, InputFile, Job, OffsetTuple};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Enumerate every job of the sweep, creating the directory tree under
/// `root` as it goes.
///
/// Order is groups as declared, then tuples, then primaries, then maps.
/// Directories that already exist are reused, so running this twice over
/// the same root yields the same list. A relative `root` is taken against
/// the current directory; job directories are always absolute.
pub fn enumerate(config: &SweepConfig, root: &Path) -> Result<Vec<Job>> {
    config.validate()?;
    let root = std::path::absolute(root)
        .with_context(|| format!("Failed to resolve sweep root {}", root.display()))?;
    let root = root.as_path();

    let mut jobs = Vec::with_capacity(config.job_count());
    let mut seen_dirs = HashSet::new();

    for group in &config.groups {
        let group_dir = root.join(group_dir_name(group, &config.suffix));
        ensure_dir(&group_dir)?;
        debug!("Group `{}` -> {}", group.label, group_dir.display());

        for tuple in &group.tuples {
            for primary in &config.primaries {
                for map in &config.maps {
                    let dir = group_dir.join(job_dir_name(primary, map, tuple));
                    ensure_dir(&dir)?;

                    if !seen_dirs.insert(dir.clone()) {
                        warn!(
                            "Job directory {} is shared by more than one job; later runs overwrite earlier output",
                            dir.display()
                        );
                    }

                    jobs.push(build_job(config, group, tuple, primary, map, dir));
                }
            }
        }
    }

    info!(
        "Enumerated {} jobs across {} groups under {}",
        jobs.len(),
        config.groups.len(),
        root.display()
    );

    Ok(jobs)
}

pub fn group_dir_name(group: &Group, suffix: &str) -> String {
    format!("{}{}", group.label, suffix)
}

pub fn job_dir_name(primary: &InputFile, map: &InputFile, tuple: &OffsetTuple) -> String {
    format!("ee_{}_{}_{}", primary.id, map.id, tuple)
}

fn build_job(
    config: &SweepConfig,
    group: &Group,
    tuple: &OffsetTuple,
    primary: &InputFile,
    map: &InputFile,
    dir: PathBuf,
) -> Job {
    let mut args = config.verb.clone();
    args.push(from_job_dir(&primary.path));
    args.push(from_job_dir(&map.path));
    args.extend(tuple.to_args());

    Job {
        group: group.label.clone(),
        tuple: *tuple,
        program: from_job_dir(Path::new(&config.binary)),
        args,
        dir,
    }
}

/// Express a root-relative path as seen from a job directory.
fn from_job_dir(path: &Path) -> String {
    if path.is_absolute() {
        path.to_string_lossy().into_owned()
    } else {
        Path::new("../..").join(path).to_string_lossy().into_owned()
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    if path.exists() {
        if path.is_dir() {
            return Ok(());
        }
        return Err(SweepError::NotADirectory(path.to_path_buf()).into());
    }

    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory {}", path.display()))
}
