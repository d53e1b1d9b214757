//! Main loop driving the simulation.

use crate::{
    control::{ControlInput, ControlSource},
    simulation::Simulation,
    snapshot::SimulationSnapshot,
};
use anyhow::{Result, bail};
use rigsim_containers::HistoryBuffer;
use rigsim_physics::fph;
use serde::{Deserialize, Serialize};
use std::{
    num::NonZeroU32,
    ops::ControlFlow,
    thread,
    time::{Duration, Instant},
};

/// A loop advancing a [`Simulation`] one frame per iteration, optionally
/// limited to a maximum frame rate.
#[derive(Debug)]
pub struct GameLoop {
    simulation: Simulation,
    frame_rate_tracker: FrameDurationTracker,
    start_time: Instant,
    previous_iter_end_time: Instant,
    config: GameLoopConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameLoopConfig {
    /// Upper limit on the number of frames per second. Without a limit, the
    /// loop runs as fast as it can.
    pub max_fps: Option<NonZeroU32>,
    /// When the loop should terminate.
    pub termination_criterion: TerminationCriterion,
    /// Number of frames between each progress message. Zero disables
    /// progress messages.
    pub log_interval: u64,
}

/// When the game loop should terminate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TerminationCriterion {
    IterationCountReached { count: u64 },
    ElapsedRealTimeExceeds { seconds: f64 },
    ElapsedSimulationTimeExceeds { time: f64 },
}

/// Why the game loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    TerminationCriterionMet,
    /// The control source asked for the loop to stop.
    StopRequested,
    /// An observer asked for the loop to stop.
    ObserverRequested,
}

/// Something receiving the snapshot of every frame, such as a presentation
/// layer or a recorder.
pub trait SnapshotObserver {
    /// Handles the snapshot of a completed frame. Returning
    /// [`ControlFlow::Break`] stops the loop after this frame.
    fn observe(&mut self, snapshot: &SimulationSnapshot) -> ControlFlow<()>;
}

/// Observer logging a summary of the simulation state at a regular frame
/// interval.
#[derive(Clone, Debug)]
pub struct LoggingObserver {
    interval: u64,
}

/// Observer keeping the last snapshot and the recent energy and oil output.
#[derive(Clone, Debug)]
pub struct ReportRecorder {
    n_frames: u64,
    storm_count: u64,
    peak_wind_speed: fph,
    peak_platform_speed: fph,
    energy_history: HistoryBuffer<fph>,
    oil_history: HistoryBuffer<fph>,
    last_snapshot: Option<SimulationSnapshot>,
}

/// Summary of a completed run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub n_frames: u64,
    pub storm_count: u64,
    pub peak_wind_speed: fph,
    pub peak_platform_speed: fph,
    /// Energy output of the most recent frames, oldest first.
    pub energy_history: Vec<fph>,
    /// Oil output of the most recent frames, oldest first.
    pub oil_history: Vec<fph>,
    pub final_snapshot: Option<SimulationSnapshot>,
}

#[derive(Clone, Debug)]
struct GenericFrameDurationTracker<const N_FRAMES: usize> {
    last_frame_durations: [Duration; N_FRAMES],
    idx_of_oldest: usize,
}

type FrameDurationTracker = GenericFrameDurationTracker<10>;

impl GameLoop {
    pub fn new(simulation: Simulation, config: GameLoopConfig) -> Self {
        let frame_rate_tracker = FrameDurationTracker::default();
        let start_time = Instant::now();
        let previous_iter_end_time = start_time;
        Self {
            simulation,
            frame_rate_tracker,
            start_time,
            previous_iter_end_time,
            config,
        }
    }

    /// Performs iterations until the termination criterion is met, the
    /// control source asks for a stop or an observer does. The control source
    /// is sampled once at the start of each iteration, and a requested stop
    /// takes effect before the frame is advanced.
    ///
    /// # Errors
    /// Returns an error if advancing the simulation fails.
    pub fn run(
        &mut self,
        controls: &mut dyn ControlSource,
        observers: &mut [&mut dyn SnapshotObserver],
    ) -> Result<StopReason> {
        loop {
            if self.config.termination_criterion.should_terminate(self) {
                return Ok(StopReason::TerminationCriterionMet);
            }

            let input = controls.sample(self.simulation.frame());
            if input.stop_requested {
                rigsim_log::info!("Stop requested at frame {}", self.simulation.frame());
                return Ok(StopReason::StopRequested);
            }

            let snapshot = self.perform_iteration(&input)?;

            let mut stop = false;
            for observer in observers.iter_mut() {
                stop |= observer.observe(&snapshot).is_break();
            }
            if stop {
                return Ok(StopReason::ObserverRequested);
            }
        }
    }

    /// Advances the simulation by one frame and waits for the remainder of
    /// the target frame duration.
    ///
    /// # Errors
    /// Returns an error if advancing the simulation fails.
    pub fn perform_iteration(&mut self, input: &ControlInput) -> Result<SimulationSnapshot> {
        let snapshot = self.simulation.advance_frame(input)?;

        let iter_end_time = self.wait_for_target_frame_duration();

        let iter_duration = iter_end_time - self.previous_iter_end_time;
        self.frame_rate_tracker.add_frame_duration(iter_duration);
        self.previous_iter_end_time = iter_end_time;

        rigsim_log::trace!(
            "Completed frame {} after {:.3} ms (~{} FPS)",
            snapshot.frame,
            iter_duration.as_secs_f64() * 1e3,
            self.smooth_fps()
        );

        Ok(snapshot)
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn into_simulation(self) -> Simulation {
        self.simulation
    }

    pub fn config(&self) -> &GameLoopConfig {
        &self.config
    }

    pub fn smooth_frame_duration(&self) -> Duration {
        self.frame_rate_tracker.compute_smooth_frame_duration()
    }

    pub fn smooth_fps(&self) -> u32 {
        frame_duration_to_fps(self.smooth_frame_duration())
    }

    pub fn elapsed_time(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn wait_for_target_frame_duration(&self) -> Instant {
        let mut iter_end_time = Instant::now();
        if let Some(min_frame_duration) = self.config.min_frame_duration() {
            let target_end_time = self.previous_iter_end_time + min_frame_duration;

            while iter_end_time < target_end_time {
                let remaining_duration = target_end_time - iter_end_time;

                if remaining_duration > Duration::from_millis(1) {
                    thread::sleep(remaining_duration - Duration::from_micros(500));
                } else {
                    std::hint::spin_loop();
                }

                iter_end_time = Instant::now();
            }
        }
        iter_end_time
    }
}

impl GameLoopConfig {
    /// # Errors
    /// Returns an error if the termination criterion has a negative or
    /// non-finite limit.
    pub fn validate(&self) -> Result<()> {
        match self.termination_criterion {
            TerminationCriterion::IterationCountReached { .. } => {}
            TerminationCriterion::ElapsedRealTimeExceeds { seconds: limit }
            | TerminationCriterion::ElapsedSimulationTimeExceeds { time: limit } => {
                if !(limit.is_finite() && limit >= 0.0) {
                    bail!("Invalid time limit for termination: {limit}");
                }
            }
        }
        Ok(())
    }

    fn min_frame_duration(&self) -> Option<Duration> {
        self.max_fps.map(|fps| fps_to_frame_duration(fps.get()))
    }
}

impl Default for GameLoopConfig {
    fn default() -> Self {
        Self {
            max_fps: None,
            termination_criterion: TerminationCriterion::IterationCountReached { count: 3600 },
            log_interval: 600,
        }
    }
}

impl TerminationCriterion {
    fn should_terminate(&self, game_loop: &GameLoop) -> bool {
        match self {
            Self::IterationCountReached { count } => game_loop.simulation.frame() >= *count,
            Self::ElapsedRealTimeExceeds { seconds } => {
                game_loop.elapsed_time().as_secs_f64() > *seconds
            }
            Self::ElapsedSimulationTimeExceeds { time } => {
                game_loop.simulation.simulation_time() > *time
            }
        }
    }
}

impl LoggingObserver {
    pub fn new(interval: u64) -> Self {
        Self { interval }
    }
}

impl SnapshotObserver for LoggingObserver {
    fn observe(&mut self, snapshot: &SimulationSnapshot) -> ControlFlow<()> {
        if self.interval > 0 && (snapshot.frame + 1) % self.interval == 0 {
            rigsim_log::info!(
                "Frame {} (t = {:.2} s): platform at ({:.1}, {:.1}) tilted {:.2} rad, \
                 wind {:.1}, waves {:.1}, depth {:.1} in {}, energy {:.2}, oil {:.2}, \
                 min column health {:.1}",
                snapshot.frame,
                snapshot.simulation_time,
                snapshot.platform.position[0],
                snapshot.platform.position[1],
                snapshot.platform.angle,
                snapshot.environment.wind_speed,
                snapshot.environment.wave_amplitude,
                snapshot.production.drill_depth,
                snapshot.production.layer_name,
                snapshot.production.energy_output,
                snapshot.production.oil_output,
                snapshot.degradation.min_column_health()
            );
        }
        ControlFlow::Continue(())
    }
}

impl ReportRecorder {
    /// Creates a recorder retaining the output of at most `history_capacity`
    /// recent frames.
    pub fn new(history_capacity: usize) -> Self {
        Self {
            n_frames: 0,
            storm_count: 0,
            peak_wind_speed: 0.0,
            peak_platform_speed: 0.0,
            energy_history: HistoryBuffer::new(history_capacity),
            oil_history: HistoryBuffer::new(history_capacity),
            last_snapshot: None,
        }
    }

    pub fn n_frames(&self) -> u64 {
        self.n_frames
    }

    pub fn last_snapshot(&self) -> Option<&SimulationSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn into_report(self) -> RunReport {
        RunReport {
            n_frames: self.n_frames,
            storm_count: self.storm_count,
            peak_wind_speed: self.peak_wind_speed,
            peak_platform_speed: self.peak_platform_speed,
            energy_history: self.energy_history.to_vec(),
            oil_history: self.oil_history.to_vec(),
            final_snapshot: self.last_snapshot,
        }
    }
}

impl SnapshotObserver for ReportRecorder {
    fn observe(&mut self, snapshot: &SimulationSnapshot) -> ControlFlow<()> {
        self.n_frames += 1;
        self.storm_count = snapshot.environment.storm_count;
        self.peak_wind_speed = self.peak_wind_speed.max(snapshot.environment.wind_speed);
        self.peak_platform_speed = self.peak_platform_speed.max(snapshot.platform.speed());
        self.energy_history.push(snapshot.production.energy_output);
        self.oil_history.push(snapshot.production.oil_output);
        self.last_snapshot = Some(snapshot.clone());
        ControlFlow::Continue(())
    }
}

impl<const N_FRAMES: usize> GenericFrameDurationTracker<N_FRAMES> {
    fn new(initial_frame_duration: Duration) -> Self {
        let last_frame_durations = [initial_frame_duration; N_FRAMES];
        Self {
            last_frame_durations,
            idx_of_oldest: 0,
        }
    }

    fn compute_smooth_frame_duration(&self) -> Duration {
        let total_duration: Duration = self.last_frame_durations.iter().sum();
        total_duration.div_f64(N_FRAMES as f64)
    }

    fn add_frame_duration(&mut self, frame_duration: Duration) {
        self.last_frame_durations[self.idx_of_oldest] = frame_duration;
        self.idx_of_oldest = (self.idx_of_oldest + 1) % N_FRAMES;
    }
}

impl<const N_FRAMES: usize> Default for GenericFrameDurationTracker<N_FRAMES> {
    fn default() -> Self {
        Self::new(fps_to_frame_duration(60))
    }
}

fn frame_duration_to_fps(duration: Duration) -> u32 {
    let secs = duration.as_secs_f64();
    if secs > 0.0 {
        (1.0 / secs).round() as u32
    } else {
        u32::MAX
    }
}

fn fps_to_frame_duration(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(fps))
}
