//! Builds a simulation from configuration and drives the frame loop.
//!
//! The loop runs on the calling thread. Snapshots go through a bounded
//! channel to an output thread that owns the transport, so a slow consumer
//! applies back-pressure instead of growing a queue.

use crossbeam_channel::{bounded, Sender as ChannelSender};
use feather_config::{Config, ConfigError, StepModeSetting, TuningSettings};
use feather_core::{FrameClock, Vector2};
use feather_simulation::{
    Arena, Census, ConversionRule, FrameSnapshot, Obstacle, PerSpecies, Simulation, SimulationError,
    SimulationParams, SpawnRegion, SpeciesTuning, StepMode,
};
use feather_transport::{TransportController, TransportError};
use hdrhistogram::Histogram;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use thiserror::Error;

/// Snapshots buffered between the simulation and the output thread.
const OUTPUT_QUEUE_DEPTH: usize = 8;
/// Largest step time the histogram tracks, in microseconds.
const MAX_TRACKED_STEP_MICROS: u64 = 60_000_000;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Statistics error: {0}")]
    Statistics(String),

    #[error("Output thread failed: {0}")]
    OutputThread(String),
}

/// Loop options that do not belong in the configuration file.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Sleep between frames to hold the configured framerate.
    pub paced: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { paced: true }
    }
}

/// What a finished run reports.
pub struct RunSummary {
    pub frames: u64,
    pub step_micros: Histogram<u64>,
    pub census: Census,
    pub frames_sent: u64,
    pub bytes_sent: u64,
}

impl RunSummary {
    pub fn log(&self) {
        info!(
            "Ran {} frames: step p50 {}us, p99 {}us, max {}us",
            self.frames,
            self.step_micros.value_at_quantile(0.5),
            self.step_micros.value_at_quantile(0.99),
            self.step_micros.max()
        );
        info!(
            "Final census: red {}, green {}, blue {}",
            self.census.red, self.census.green, self.census.blue
        );
        if self.frames_sent > 0 {
            info!("Published {} frames ({} bytes)", self.frames_sent, self.bytes_sent);
        }
    }
}

fn tuning_from(settings: &TuningSettings) -> SpeciesTuning {
    SpeciesTuning {
        max_force: settings.max_force,
        speed_cap: settings.speed_cap,
        sensing_range: settings.sensing_range,
        min_distance: settings.min_distance,
    }
}

pub fn simulation_params(config: &Config) -> SimulationParams {
    SimulationParams {
        arena: Arena {
            width: config.arena.width,
            height: config.arena.height,
        },
        cell_size: config.grid.cell_size,
        tuning: PerSpecies::new(
            tuning_from(&config.species.red),
            tuning_from(&config.species.green),
            tuning_from(&config.species.blue),
        ),
        conversion: ConversionRule {
            enabled: config.conversion.enabled,
            distance: config.conversion.distance,
            heading_dot: config.conversion.heading_dot,
        },
        step_mode: match config.step_mode {
            StepModeSetting::Sequential => StepMode::Sequential,
            StepModeSetting::Parallel => StepMode::Parallel,
        },
    }
}

/// Creates the simulation, registers obstacles and spawns the population.
/// Returns the seed used so a run can be reproduced.
pub fn build_simulation(config: &Config) -> Result<(Simulation, u64), RunnerError> {
    let mut simulation = Simulation::new(simulation_params(config))?;

    for obstacle in config.obstacles() {
        let position = Vector2::new(obstacle.x, obstacle.y);
        simulation.add_obstacle(Obstacle::new(position, obstacle.radius)?);
    }

    let region = SpawnRegion::around_obstacles(
        simulation.arena(),
        simulation.obstacles(),
        config.population.spawn_padding,
    )?;
    let seed = config.population.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    simulation.populate(config.population.count, &region, &mut rng)?;

    info!(
        "Spawned {} agents around {} obstacle(s) with seed {}",
        simulation.len(),
        simulation.obstacles().len(),
        seed
    );
    Ok((simulation, seed))
}

struct OutputThread {
    sender: ChannelSender<FrameSnapshot>,
    handle: JoinHandle<Result<TransportController, TransportError>>,
    output_frequency: u64,
    open: bool,
}

impl OutputThread {
    fn spawn(mut controller: TransportController) -> Result<Self, RunnerError> {
        let output_frequency = controller.output_frequency() as u64;
        let (sender, receiver) = bounded::<FrameSnapshot>(OUTPUT_QUEUE_DEPTH);

        let handle = thread::Builder::new()
            .name("feather-output".to_string())
            .spawn(move || -> Result<TransportController, TransportError> {
                for snapshot in receiver {
                    controller.publish(&snapshot)?;
                }
                controller.flush()?;
                Ok(controller)
            })
            .map_err(|e| RunnerError::OutputThread(e.to_string()))?;

        Ok(Self {
            sender,
            handle,
            output_frequency,
            open: true,
        })
    }

    /// False for every frame once the output thread has stopped.
    fn wants(&self, frame: u64) -> bool {
        self.open && frame % self.output_frequency == 0
    }

    fn send(&mut self, snapshot: FrameSnapshot) {
        if self.sender.send(snapshot).is_err() {
            warn!("Output thread stopped; continuing without output");
            self.open = false;
        }
    }

    fn finish(self) -> Result<TransportController, RunnerError> {
        drop(self.sender);
        match self.handle.join() {
            Ok(result) => Ok(result?),
            Err(_) => Err(RunnerError::OutputThread("output thread panicked".to_string())),
        }
    }
}

/// Steps until `max_frames` is reached or `shutdown` is raised.
pub fn run(
    config: &Config,
    mut simulation: Simulation,
    options: RunOptions,
    shutdown: &AtomicBool,
) -> Result<RunSummary, RunnerError> {
    let mut clock = if options.paced {
        FrameClock::new(config.framerate)
    } else {
        FrameClock::unpaced(config.framerate)
    };
    let dt = clock.dt();

    let mut step_micros = Histogram::<u64>::new_with_bounds(1, MAX_TRACKED_STEP_MICROS, 3)
        .map_err(|e| RunnerError::Statistics(e.to_string()))?;

    let mut output = match TransportController::from_config(&config.transport)? {
        Some(controller) => Some(OutputThread::spawn(controller)?),
        None => None,
    };

    if let Some(output) = &mut output {
        if output.wants(simulation.frame()) {
            output.send(simulation.snapshot());
        }
    }

    info!(
        "Running at {} FPS ({:?} mode{})",
        config.framerate,
        simulation.step_mode(),
        if clock.is_paced() { "" } else { ", unpaced" }
    );

    let census_interval = config.framerate.max(1) as u64;

    while !shutdown.load(Ordering::SeqCst) {
        if config.max_frames.map_or(false, |max| simulation.frame() >= max) {
            break;
        }

        clock.begin_frame();

        let step_start = Instant::now();
        simulation.step(dt);
        step_micros.saturating_record(step_start.elapsed().as_micros() as u64);

        let frame = simulation.frame();
        if let Some(output) = &mut output {
            if output.wants(frame) {
                output.send(simulation.snapshot());
            }
        }

        if frame % census_interval == 0 {
            let census = Census::from(simulation.population_by_species());
            debug!(
                "Frame {}: red {}, green {}, blue {}",
                frame, census.red, census.green, census.blue
            );
        }

        if let Some(lag) = clock.finish_frame() {
            if config.framerate > 10 {
                debug!("Frame {} exceeded its budget by {:?}", frame, lag);
            }
        }
    }

    if shutdown.load(Ordering::SeqCst) {
        info!("Shutdown requested, stopping after frame {}", simulation.frame());
    }

    let (frames_sent, bytes_sent) = match output {
        Some(output) => {
            let controller = output.finish()?;
            (controller.frames_sent(), controller.bytes_sent())
        }
        None => (0, 0),
    };

    Ok(RunSummary {
        frames: simulation.frame(),
        step_micros,
        census: simulation.population_by_species().into(),
        frames_sent,
        bytes_sent,
    })
}
