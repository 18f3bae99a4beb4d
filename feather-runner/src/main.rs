mod app;

use app::{build_simulation, run, RunOptions};
use clap::{Parser, ValueEnum};
use feather_config::{load_config, Config, StepModeSetting};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const DEFAULT_CONFIG: &str = "config.json";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StepModeArg {
    Sequential,
    Parallel,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Rock-paper-scissors flocking simulation", long_about = None)]
struct Args {
    /// Path to the simulation configuration file (JSON, or TOML by extension)
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Stop after this many frames
    #[arg(short, long)]
    frames: Option<u64>,

    /// Seed for the initial population
    #[arg(short, long)]
    seed: Option<u64>,

    /// Step as fast as possible instead of holding the framerate
    #[arg(long)]
    unpaced: bool,

    /// Agent update strategy
    #[arg(long, value_enum)]
    step_mode: Option<StepModeArg>,
}

/// Loads the configuration file. A missing default file falls back to the
/// built-in configuration; an explicitly named file must exist.
fn load(path: &Path) -> Result<Config, feather_config::ConfigError> {
    if path == Path::new(DEFAULT_CONFIG) && !path.exists() {
        warn!("{} not found, using the built-in configuration", DEFAULT_CONFIG);
        return Ok(Config::default());
    }
    let config = load_config(path)?;
    info!("Using configuration from {}", path.display());
    Ok(config)
}

fn apply_overrides(config: &mut Config, args: &Args) -> Result<(), feather_config::ConfigError> {
    if let Some(frames) = args.frames {
        config.max_frames = Some(frames);
    }
    if let Some(seed) = args.seed {
        config.population.seed = Some(seed);
    }
    if let Some(mode) = args.step_mode {
        config.step_mode = match mode {
            StepModeArg::Sequential => StepModeSetting::Sequential,
            StepModeArg::Parallel => StepModeSetting::Parallel,
        };
    }
    config.validate()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = try_main() {
        error!("{}", e);
        process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load(&args.config)?;
    apply_overrides(&mut config, &args)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst))?;
    }

    let (simulation, _seed) = build_simulation(&config)?;
    let options = RunOptions { paced: !args.unpaced };

    let summary = run(&config, simulation, options, &shutdown)?;
    summary.log();
    Ok(())
}
