//! Wear and health of the columns and the energy equipment.

use crate::environment::{EnvironmentForcing, EnvironmentState};
use anyhow::{Result, bail};
use rand::Rng;
use rigsim_physics::fph;
use serde::{Deserialize, Serialize};

/// The health of anything new.
pub const FULL_HEALTH: fph = 100.0;

/// Configuration parameters for the degradation model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DegradationConfig {
    /// Health lost per frame and unit of wave factor.
    pub wave_stress_coefficient: fph,
    /// Health lost per frame and unit of platform speed.
    pub motion_stress_coefficient: fph,
    /// Health lost by every column each frame regardless of load.
    pub aging_rate: fph,
    /// Columns below this health are eligible for repair.
    pub repair_threshold: fph,
    /// Probability of an eligible column being repaired in any given frame.
    pub repair_probability: fph,
    pub repair_amount: fph,
    pub wind_turbines: WindTurbineConfig,
    pub wave_generators: WaveGeneratorConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindTurbineConfig {
    pub count: usize,
    pub initial_efficiency: fph,
    /// Rotor rotation per frame and unit of wind speed [degrees].
    pub rotor_speed_factor: fph,
    /// Wind speed above which turbines take damage.
    pub damaging_wind_speed: fph,
    /// Health lost per frame in damaging wind.
    pub storm_damage_rate: fph,
    pub min_efficiency: fph,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveGeneratorConfig {
    pub count: usize,
    pub initial_efficiency: fph,
    /// Health lost per frame.
    pub aging_rate: fph,
    pub min_efficiency: fph,
}

/// The health of every column and piece of energy equipment. All health
/// values lie in [0, 100].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DegradationState {
    pub column_health: Vec<fph>,
    pub wind_turbines: Vec<WindTurbine>,
    pub wave_generators: Vec<WaveGenerator>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindTurbine {
    /// Angle of the rotor in [0, 360) degrees.
    pub rotor_angle: fph,
    pub efficiency: fph,
    pub health: fph,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveGenerator {
    pub efficiency: fph,
    pub health: fph,
}

/// Model updating the [`DegradationState`] once per frame.
#[derive(Clone, Debug)]
pub struct DegradationModel {
    config: DegradationConfig,
}

impl DegradationModel {
    /// Creates a new degradation model.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: DegradationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DegradationConfig {
        &self.config
    }

    /// Returns the state of the given number of new columns and the
    /// configured equipment.
    pub fn initial_state(&self, n_columns: usize) -> DegradationState {
        let turbines = &self.config.wind_turbines;
        let generators = &self.config.wave_generators;
        DegradationState {
            column_health: vec![FULL_HEALTH; n_columns],
            wind_turbines: (0..turbines.count)
                .map(|_| WindTurbine {
                    rotor_angle: 0.0,
                    efficiency: turbines.initial_efficiency,
                    health: FULL_HEALTH,
                })
                .collect(),
            wave_generators: (0..generators.count)
                .map(|_| WaveGenerator {
                    efficiency: generators.initial_efficiency,
                    health: FULL_HEALTH,
                })
                .collect(),
        }
    }

    /// Wears down the columns and equipment based on this frame's environment
    /// and the speed of the platform after the physics step.
    pub fn update<R: Rng + ?Sized>(
        &self,
        state: &mut DegradationState,
        environment: &EnvironmentState,
        forcing: &EnvironmentForcing,
        platform_speed: fph,
        rng: &mut R,
    ) {
        self.update_columns(state, forcing, platform_speed, rng);
        self.update_wind_turbines(state, environment);
        self.update_wave_generators(state);
    }

    fn update_columns<R: Rng + ?Sized>(
        &self,
        state: &mut DegradationState,
        forcing: &EnvironmentForcing,
        platform_speed: fph,
        rng: &mut R,
    ) {
        let config = &self.config;

        let wave_stress = (forcing.wave_factor_x.abs() + forcing.wave_factor_y.abs())
            * config.wave_stress_coefficient;
        let motion_stress = platform_speed.abs() * config.motion_stress_coefficient;
        let wear = wave_stress + motion_stress + config.aging_rate;

        for (idx, health) in state.column_health.iter_mut().enumerate() {
            *health -= wear;
            if *health < config.repair_threshold && rng.random_bool(config.repair_probability) {
                *health += config.repair_amount;
                rigsim_log::debug!("Repaired column {idx} to {:.1}% health", *health);
            }
            *health = clamp_health(*health);
        }
    }

    fn update_wind_turbines(&self, state: &mut DegradationState, environment: &EnvironmentState) {
        let config = &self.config.wind_turbines;

        let wind_factor =
            environment.wind_speed * environment.wind_direction.to_radians().cos().abs();
        let is_damaging = environment.wind_speed > config.damaging_wind_speed;

        for turbine in &mut state.wind_turbines {
            turbine.rotor_angle =
                (turbine.rotor_angle + wind_factor * config.rotor_speed_factor).rem_euclid(360.0);
            if is_damaging {
                turbine.health = clamp_health(turbine.health - config.storm_damage_rate);
                turbine.efficiency = compute_efficiency(turbine.health, config.min_efficiency);
            }
        }
    }

    fn update_wave_generators(&self, state: &mut DegradationState) {
        let config = &self.config.wave_generators;
        for generator in &mut state.wave_generators {
            generator.health = clamp_health(generator.health - config.aging_rate);
            generator.efficiency = compute_efficiency(generator.health, config.min_efficiency);
        }
    }
}

impl DegradationState {
    /// Returns the health of the weakest column, or full health if there are
    /// no columns.
    pub fn min_column_health(&self) -> fph {
        self.column_health
            .iter()
            .copied()
            .fold(FULL_HEALTH, fph::min)
    }

    /// Returns every health value in the state.
    pub fn health_values(&self) -> impl Iterator<Item = fph> + '_ {
        self.column_health
            .iter()
            .copied()
            .chain(self.wind_turbines.iter().map(|turbine| turbine.health))
            .chain(self.wave_generators.iter().map(|generator| generator.health))
    }
}

impl DegradationConfig {
    /// Checks that all rates, probabilities and efficiencies are valid.
    ///
    /// # Errors
    /// Returns an error describing the first invalid parameter.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.repair_probability) {
            bail!("Invalid column repair probability: {}", self.repair_probability);
        }
        for (name, value) in [
            ("wave stress coefficient", self.wave_stress_coefficient),
            ("motion stress coefficient", self.motion_stress_coefficient),
            ("column aging rate", self.aging_rate),
            ("column repair amount", self.repair_amount),
            ("turbine storm damage rate", self.wind_turbines.storm_damage_rate),
            ("wave generator aging rate", self.wave_generators.aging_rate),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                bail!("Invalid {name}: {value}");
            }
        }
        for (name, value) in [
            ("turbine efficiency", self.wind_turbines.initial_efficiency),
            ("minimum turbine efficiency", self.wind_turbines.min_efficiency),
            ("wave generator efficiency", self.wave_generators.initial_efficiency),
            (
                "minimum wave generator efficiency",
                self.wave_generators.min_efficiency,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("Invalid {name}: {value}");
            }
        }
        Ok(())
    }
}

impl Default for DegradationConfig {
    fn default() -> Self {
        Self {
            wave_stress_coefficient: 0.01,
            motion_stress_coefficient: 0.001,
            aging_rate: 0.001,
            repair_threshold: 50.0,
            repair_probability: 0.05,
            repair_amount: 10.0,
            wind_turbines: WindTurbineConfig::default(),
            wave_generators: WaveGeneratorConfig::default(),
        }
    }
}

impl Default for WindTurbineConfig {
    fn default() -> Self {
        Self {
            count: 2,
            initial_efficiency: 0.9,
            rotor_speed_factor: 5.0,
            damaging_wind_speed: 25.0,
            storm_damage_rate: 0.1,
            min_efficiency: 0.5,
        }
    }
}

impl Default for WaveGeneratorConfig {
    fn default() -> Self {
        Self {
            count: 2,
            initial_efficiency: 0.85,
            aging_rate: 0.005,
            min_efficiency: 0.6,
        }
    }
}

fn clamp_health(health: fph) -> fph {
    health.clamp(0.0, FULL_HEALTH)
}

fn compute_efficiency(health: fph, min_efficiency: fph) -> fph {
    fph::max(min_efficiency, health / FULL_HEALTH)
}
