//! Running a simulation from a configuration.

use crate::{
    config::SimulationConfig,
    control::ScriptedControls,
    game_loop::{GameLoop, LoggingObserver, ReportRecorder, RunReport, TerminationCriterion},
    simulation::Simulation,
};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Options for a single run, overriding parts of the configuration.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// RON file to read the configuration from. The default configuration is
    /// used if this is not specified.
    pub config_path: Option<PathBuf>,
    /// Number of frames to run, replacing the configured termination
    /// criterion.
    pub frames: Option<u64>,
    pub seed: Option<u64>,
    /// RON file to write the run report to.
    pub report_path: Option<PathBuf>,
}

pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Loads the configuration, applies the overrides in the given options, runs
/// the simulation and writes the report if requested.
///
/// # Errors
/// Returns an error if the configuration can not be loaded or is invalid,
/// if the simulation fails or if the report can not be written.
pub fn run(options: RunOptions) -> Result<RunReport> {
    let mut config = match &options.config_path {
        Some(config_path) => SimulationConfig::from_ron_file(config_path)?,
        None => SimulationConfig::default(),
    };
    if let Some(frames) = options.frames {
        config.game_loop.termination_criterion =
            TerminationCriterion::IterationCountReached { count: frames };
    }
    if let Some(seed) = options.seed {
        config.seed = seed;
    }

    let report = run_with_config(config)?;

    if let Some(report_path) = &options.report_path {
        rigsim_io::write_ron_file(&report, report_path)?;
        rigsim_log::info!("Wrote run report to {}", report_path.display());
    }

    Ok(report)
}

/// Runs the simulation described by the given configuration until the game
/// loop stops and returns the report of the run.
///
/// # Errors
/// Returns an error if the configuration is invalid or the simulation fails.
pub fn run_with_config(config: SimulationConfig) -> Result<RunReport> {
    let mut controls = ScriptedControls::from_config(config.controls.clone())?;
    let simulation = Simulation::new(&config)?;

    let mut logger = LoggingObserver::new(config.game_loop.log_interval);
    let mut recorder = ReportRecorder::new(config.production.history_capacity);

    let mut game_loop = GameLoop::new(simulation, config.game_loop);

    let stop_reason = rigsim_log::with_timing_info_logging!("Running simulation"; {
        game_loop.run(&mut controls, &mut [&mut logger, &mut recorder])
    })?;

    rigsim_log::info!(
        "Simulation stopped ({:?}) after {} frames and {:.2} s of simulated time (~{} FPS)",
        stop_reason,
        recorder.n_frames(),
        game_loop.simulation().simulation_time(),
        game_loop.smooth_fps()
    );

    Ok(recorder.into_report())
}

/// Writes the default configuration to the given path, as a starting point
/// for custom configurations.
///
/// # Errors
/// Returns an error if the file can not be written.
pub fn write_default_config(output_path: &Path) -> Result<()> {
    SimulationConfig::default().write_ron_file(output_path)?;
    rigsim_log::info!("Wrote default configuration to {}", output_path.display());
    Ok(())
}
