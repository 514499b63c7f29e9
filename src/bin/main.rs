use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use learn_sweep::{PRESETS, RunMode, SweepConfig, enumerate, load_sweep_config, run_sweep};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "learn-sweep")]
#[command(about = "Build a parameter sweep and run the localization learner over it")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SweepArgs {
    /// Built-in sweep to use when no config file is given
    #[arg(long, default_value = learn_sweep::DEFAULT_PRESET, value_parser = clap::builder::PossibleValuesParser::new(PRESETS.iter().copied()))]
    preset: String,
    /// JSON sweep description (overrides the preset)
    #[arg(long, env = "SWEEP_CONFIG")]
    config: Option<PathBuf>,
    /// Directory the group directories are created in (default: current directory)
    #[arg(long)]
    root: Option<PathBuf>,
    /// Number of concurrent learner processes
    #[arg(short, long)]
    workers: Option<usize>,
}

impl SweepArgs {
    fn load(&self) -> Result<(SweepConfig, PathBuf)> {
        let mut config = load_sweep_config(self.config.clone(), &self.preset)?;
        if let Some(workers) = self.workers {
            config.workers = workers;
            config.validate()?;
        }

        let cwd = std::env::current_dir().context("Could not determine current directory")?;
        let root = match &self.root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => cwd.join(root),
            None => cwd,
        };

        Ok((config, root))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the sweep directories and run the learner once per job
    Run {
        /// Legacy mode argument; anything starting with "sim" only logs the commands
        mode: Option<String>,
        /// Log the commands without running them
        #[arg(long)]
        simulate: bool,
        #[command(flatten)]
        sweep: SweepArgs,
    },
    /// Create the sweep directories and print the jobs without running them
    Plan {
        /// Print the job list as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        sweep: SweepArgs,
    },
    /// List the built-in presets
    Presets,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("learn_sweep=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            mode,
            simulate,
            sweep,
        } => {
            let run_mode = if simulate {
                RunMode::Simulate
            } else {
                RunMode::from_arg(mode.as_deref())
            };
            let (config, root) = sweep.load()?;

            info!(
                "Starting sweep `{}` under {} ({:?}, {} workers)",
                config.suffix,
                root.display(),
                run_mode,
                config.workers
            );

            let summary = run_sweep(&config, &root, run_mode).await?;

            println!(
                "Ran {} jobs: {} succeeded, {} failed, {} simulated",
                summary.total, summary.succeeded, summary.failed, summary.simulated
            );
        }
        Commands::Plan { json, sweep } => {
            let (config, root) = sweep.load()?;
            let jobs = enumerate(&config, &root)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&jobs)?);
            } else {
                for job in &jobs {
                    println!("{}", job.dir.display());
                    println!("    {}", job.command_line());
                }
                println!("{} jobs", jobs.len());
            }
        }
        Commands::Presets => {
            println!("{:<10} {:<10} {:<8} {:<6}", "PRESET", "SUFFIX", "GROUPS", "JOBS");
            for name in PRESETS {
                let config = SweepConfig::preset(name)?;
                println!(
                    "{:<10} {:<10} {:<8} {:<6}",
                    name,
                    config.suffix,
                    config.groups.len(),
                    config.job_count()
                );
            }
        }
    }

    Ok(())
}
