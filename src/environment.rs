//! Time-varying ocean and weather forcing.

use crate::control::ControlInput;
use anyhow::{Result, bail};
use rand::Rng;
use rigsim_physics::{fph, quantities::Force};
use serde::{Deserialize, Serialize};

/// Configuration parameters for the environment model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// The environment at the first frame.
    pub initial_state: EnvironmentState,
    /// How the horizontal wave factor is derived from the wave phase.
    pub wave_phase_mode: WavePhaseMode,
    /// Ratio between the frequency of the vertical (heave) and horizontal
    /// wave factors.
    pub heave_frequency_ratio: fph,
    /// Allowed range of the ocean current speed.
    pub current_speed_range: (fph, fph),
    /// Allowed range of the wind speed after decay.
    pub wind_speed_range: (fph, fph),
    /// Factor the wind speed is multiplied with every frame.
    pub wind_decay: fph,
    /// Factor the wave amplitude is multiplied with every frame.
    pub wave_decay: fph,
    /// Lower bound on the wave amplitude after decay.
    pub min_wave_amplitude: fph,
    /// Probability of a storm starting in any given frame.
    pub storm_probability: fph,
    /// Range of the intensity of random storms.
    pub storm_intensity_range: (fph, fph),
    /// How much wave amplitude a random storm adds per unit of intensity.
    pub storm_wave_gain: fph,
    /// Maximum rotation of the wind direction by a random storm [degrees].
    pub storm_direction_jitter: fph,
    /// Range of the intensity of storms triggered by control input.
    pub manual_storm_intensity_range: (fph, fph),
    /// How much wave amplitude a triggered storm adds per unit of intensity.
    pub manual_storm_wave_gain: fph,
    /// Maximum change in wind direction per frame [degrees].
    pub wind_direction_drift: fph,
    /// Maximum change in temperature per frame.
    pub temperature_drift: fph,
    /// Fatigue accumulated per frame and unit of current speed.
    pub fatigue_rate: fph,
    pub tide_amplitude: fph,
    /// Tide phase advance per frame [rad].
    pub tide_frequency: fph,
    /// Advance of the time of day per frame [hours].
    pub hours_per_step: fph,
    /// Probability of the weather conditions changing in any given frame.
    pub weather_change_probability: fph,
    /// Maximum change of each weather condition when the weather changes.
    pub weather_drift: WeatherConditions,
    /// Horizontal wave force per unit of wave amplitude.
    pub wave_force_scale: fph,
    /// Vertical wave force per unit of wave amplitude.
    pub heave_force_scale: fph,
    /// Horizontal force per unit of current speed.
    pub current_force_scale: fph,
    /// Horizontal force at the platform center per unit of wind speed.
    pub wind_force_scale: fph,
    /// Horizontal force at the platform edge per unit of wind speed.
    pub wind_tilt_force_scale: fph,
}

/// The scalar state of the ocean and weather.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentState {
    pub wave_amplitude: fph,
    /// Wave phase advance per frame [rad].
    pub wave_frequency: fph,
    pub current_speed: fph,
    pub wind_speed: fph,
    /// Direction the wind blows towards, counterclockwise from the positive
    /// x-axis, in [0, 360) degrees.
    pub wind_direction: fph,
    pub temperature: fph,
    /// Intensity of the most recent storm.
    pub storm_intensity: fph,
    /// Accumulated structural wear. Never decreases.
    pub material_fatigue: fph,
    pub tide_phase: fph,
    pub tide_level: fph,
    /// Hours since midnight, in [0, 24).
    pub time_of_day: fph,
    pub weather: WeatherConditions,
    /// Number of storms so far, random and triggered.
    pub storm_count: u64,
}

/// Weather conditions, each on a scale from 0 to 10.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConditions {
    pub clouds: fph,
    pub rain: fph,
    pub fog: fph,
}

/// How the horizontal wave factor is derived from the wave phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WavePhaseMode {
    /// `sin(phase)`, pushing the platform back and forth.
    Signed,
    /// `|sin(phase)|`, pushing the platform in one direction only.
    Rectified,
}

/// The forcing on the platform computed by the environment model for a
/// single frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvironmentForcing {
    pub wave_factor_x: fph,
    pub wave_factor_y: fph,
    /// Force applied at the platform center.
    pub center_force: Force,
    /// Force applied at the downwind edge of the platform.
    pub tilt_force: Force,
}

/// Model updating the [`EnvironmentState`] once per frame and deriving the
/// forcing on the platform.
#[derive(Clone, Debug)]
pub struct EnvironmentModel {
    config: EnvironmentConfig,
}

const MAX_WEATHER_CONDITION: fph = 10.0;

impl EnvironmentModel {
    /// Creates a new environment model.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: EnvironmentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Returns the state the environment starts in.
    pub fn initial_state(&self) -> EnvironmentState {
        self.config.initial_state.clone()
    }

    /// Advances the environment state to the given step and computes the
    /// forcing on the platform from the updated state.
    pub fn update<R: Rng + ?Sized>(
        &self,
        state: &mut EnvironmentState,
        step: u64,
        input: &ControlInput,
        rng: &mut R,
    ) -> EnvironmentForcing {
        self.apply_control_input(state, input, rng);
        self.trigger_random_storm(state, rng);
        self.decay_wind_and_waves(state);
        self.drift_wind_and_temperature(state, rng);
        self.accumulate_fatigue(state);
        self.advance_slow_cycles(state, step, rng);
        self.compute_forcing(state, step)
    }

    fn apply_control_input<R: Rng + ?Sized>(
        &self,
        state: &mut EnvironmentState,
        input: &ControlInput,
        rng: &mut R,
    ) {
        let config = &self.config;

        let (min_current, max_current) = config.current_speed_range;
        state.current_speed =
            (state.current_speed + input.current_speed_delta).clamp(min_current, max_current);

        state.wind_speed += input.wind_speed_delta;

        if input.trigger_storm {
            let intensity = draw_from_range(rng, config.manual_storm_intensity_range);
            state.wind_speed += intensity;
            state.wave_amplitude += config.manual_storm_wave_gain * intensity;
            state.storm_intensity = intensity;
            state.storm_count += 1;
            rigsim_log::info!("Storm triggered with intensity {intensity:.1}");
        }
    }

    fn trigger_random_storm<R: Rng + ?Sized>(&self, state: &mut EnvironmentState, rng: &mut R) {
        let config = &self.config;
        if !rng.random_bool(config.storm_probability) {
            return;
        }
        let intensity = draw_from_range(rng, config.storm_intensity_range);
        let jitter = config.storm_direction_jitter;
        state.wind_speed += intensity;
        state.wind_direction =
            wrap_degrees(state.wind_direction + draw_from_range(rng, (-jitter, jitter)));
        state.wave_amplitude += config.storm_wave_gain * intensity;
        state.storm_intensity = intensity;
        state.storm_count += 1;
        rigsim_log::debug!(
            "Storm with intensity {intensity:.1}, wind now {:.1} towards {:.0} degrees",
            state.wind_speed,
            state.wind_direction
        );
    }

    fn decay_wind_and_waves(&self, state: &mut EnvironmentState) {
        let config = &self.config;
        let (min_wind, max_wind) = config.wind_speed_range;
        state.wind_speed = (state.wind_speed * config.wind_decay).clamp(min_wind, max_wind);
        state.wave_amplitude =
            fph::max(config.min_wave_amplitude, state.wave_amplitude * config.wave_decay);
    }

    fn drift_wind_and_temperature<R: Rng + ?Sized>(
        &self,
        state: &mut EnvironmentState,
        rng: &mut R,
    ) {
        let config = &self.config;
        let drift = config.wind_direction_drift;
        state.wind_direction =
            wrap_degrees(state.wind_direction + draw_from_range(rng, (-drift, drift)));
        let drift = config.temperature_drift;
        state.temperature += draw_from_range(rng, (-drift, drift));
    }

    fn accumulate_fatigue(&self, state: &mut EnvironmentState) {
        state.material_fatigue += fph::max(state.current_speed, 0.0) * self.config.fatigue_rate;
    }

    fn advance_slow_cycles<R: Rng + ?Sized>(
        &self,
        state: &mut EnvironmentState,
        step: u64,
        rng: &mut R,
    ) {
        let config = &self.config;

        state.tide_phase = step as fph * config.tide_frequency;
        state.tide_level = config.tide_amplitude * state.tide_phase.sin();

        state.time_of_day = (state.time_of_day + config.hours_per_step).rem_euclid(24.0);

        if rng.random_bool(config.weather_change_probability) {
            let drift = &config.weather_drift;
            let weather = &mut state.weather;
            weather.clouds = drift_weather_condition(rng, weather.clouds, drift.clouds);
            weather.rain = drift_weather_condition(rng, weather.rain, drift.rain);
            weather.fog = drift_weather_condition(rng, weather.fog, drift.fog);
        }
    }

    fn compute_forcing(&self, state: &EnvironmentState, step: u64) -> EnvironmentForcing {
        let config = &self.config;

        let phase = state.wave_frequency * step as fph;
        let wave_factor_x = match config.wave_phase_mode {
            WavePhaseMode::Signed => phase.sin(),
            WavePhaseMode::Rectified => phase.sin().abs(),
        };
        let wave_factor_y = (phase * config.heave_frequency_ratio).sin().abs();

        let wind_x = state.wind_speed * state.wind_direction.to_radians().cos();

        let center_force = Force::new(
            wave_factor_x * state.wave_amplitude * config.wave_force_scale
                + state.current_speed * config.current_force_scale
                + wind_x * config.wind_force_scale,
            -wave_factor_y * state.wave_amplitude * config.heave_force_scale,
        );
        let tilt_force = Force::new(state.wind_speed * config.wind_tilt_force_scale, 0.0);

        EnvironmentForcing {
            wave_factor_x,
            wave_factor_y,
            center_force,
            tilt_force,
        }
    }
}

impl EnvironmentConfig {
    /// Checks that all probabilities, ranges and factors are valid.
    ///
    /// # Errors
    /// Returns an error describing the first invalid parameter.
    pub fn validate(&self) -> Result<()> {
        for (name, probability) in [
            ("storm probability", self.storm_probability),
            ("weather change probability", self.weather_change_probability),
        ] {
            if !(0.0..=1.0).contains(&probability) {
                bail!("Invalid {name}: {probability}");
            }
        }
        for (name, (min, max)) in [
            ("current speed range", self.current_speed_range),
            ("wind speed range", self.wind_speed_range),
            ("storm intensity range", self.storm_intensity_range),
            ("manual storm intensity range", self.manual_storm_intensity_range),
        ] {
            if !(min.is_finite() && max.is_finite() && min <= max) {
                bail!("Invalid {name}: ({min}, {max})");
            }
        }
        for (name, factor) in [
            ("wind decay", self.wind_decay),
            ("wave decay", self.wave_decay),
        ] {
            if !(0.0..=1.0).contains(&factor) {
                bail!("Invalid {name}: {factor}");
            }
        }
        for (name, value) in [
            ("storm direction jitter", self.storm_direction_jitter),
            ("wind direction drift", self.wind_direction_drift),
            ("temperature drift", self.temperature_drift),
            ("fatigue rate", self.fatigue_rate),
            ("hours per step", self.hours_per_step),
            ("cloud drift", self.weather_drift.clouds),
            ("rain drift", self.weather_drift.rain),
            ("fog drift", self.weather_drift.fog),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                bail!("Invalid {name}: {value}");
            }
        }
        if !self.min_wave_amplitude.is_finite() {
            bail!("Invalid minimum wave amplitude: {}", self.min_wave_amplitude);
        }
        Ok(())
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            initial_state: EnvironmentState::default(),
            wave_phase_mode: WavePhaseMode::Rectified,
            heave_frequency_ratio: 0.7,
            current_speed_range: (0.5, 5.0),
            wind_speed_range: (2.0, 60.0),
            wind_decay: 0.98,
            wave_decay: 0.998,
            min_wave_amplitude: 10.0,
            storm_probability: 0.002,
            storm_intensity_range: (2.0, 15.0),
            storm_wave_gain: 0.3,
            storm_direction_jitter: 30.0,
            manual_storm_intensity_range: (10.0, 20.0),
            manual_storm_wave_gain: 0.5,
            wind_direction_drift: 1.0,
            temperature_drift: 0.1,
            fatigue_rate: 0.001,
            tide_amplitude: 30.0,
            tide_frequency: 0.0001,
            hours_per_step: 0.01,
            weather_change_probability: 0.005,
            weather_drift: WeatherConditions {
                clouds: 2.0,
                rain: 1.0,
                fog: 0.5,
            },
            wave_force_scale: 2000.0,
            heave_force_scale: 1000.0,
            current_force_scale: 3000.0,
            wind_force_scale: 100.0,
            wind_tilt_force_scale: 50.0,
        }
    }
}

impl Default for EnvironmentState {
    fn default() -> Self {
        Self {
            wave_amplitude: 15.0,
            wave_frequency: 0.01,
            current_speed: 2.0,
            wind_speed: 5.0,
            wind_direction: 0.0,
            temperature: 15.0,
            storm_intensity: 0.0,
            material_fatigue: 0.0,
            tide_phase: 0.0,
            tide_level: 0.0,
            time_of_day: 0.0,
            weather: WeatherConditions::default(),
            storm_count: 0,
        }
    }
}

impl Default for WeatherConditions {
    fn default() -> Self {
        Self {
            clouds: 3.0,
            rain: 0.0,
            fog: 0.0,
        }
    }
}

/// Draws a value uniformly from the given inclusive range, or returns the
/// lower bound if the range is empty or a single point.
fn draw_from_range<R: Rng + ?Sized>(rng: &mut R, (min, max): (fph, fph)) -> fph {
    if max > min {
        rng.random_range(min..=max)
    } else {
        min
    }
}

/// Wraps the given angle to [0, 360) degrees.
fn wrap_degrees(angle: fph) -> fph {
    let wrapped = angle.rem_euclid(360.0);
    // Tiny negative angles round up to exactly 360
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

fn drift_weather_condition<R: Rng + ?Sized>(rng: &mut R, value: fph, drift: fph) -> fph {
    (value + draw_from_range(rng, (-drift, drift))).clamp(0.0, MAX_WEATHER_CONDITION)
}
