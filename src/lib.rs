//! Simulation of an offshore platform resting on springs above a row of
//! columns, driven by waves, current and wind while it drills for oil and
//! generates energy.

pub mod config;
pub mod control;
pub mod degradation;
pub mod environment;
pub mod game_loop;
pub mod production;
pub mod run;
pub mod simulation;
pub mod snapshot;
pub mod structure;

pub use config::SimulationConfig;
pub use simulation::Simulation;
