//! Drilling, oil production and energy production.

use crate::{
    control::ControlInput,
    degradation::DegradationState,
    environment::{EnvironmentForcing, EnvironmentState},
};
use anyhow::{Result, bail};
use rand::Rng;
use rigsim_containers::HistoryBuffer;
use rigsim_physics::fph;
use serde::{Deserialize, Serialize};

/// Drill wear at which the drill stops working.
pub const MAX_DRILL_WEAR: fph = 100.0;

/// Configuration parameters for the production model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionConfig {
    /// The layers of the seabed, ordered by increasing depth of their tops.
    /// The first layer starts at depth zero.
    pub layers: Vec<GeologicalLayer>,
    pub initial_drill_speed: fph,
    pub min_drill_speed: fph,
    pub max_depth: fph,
    /// Drill wear per frame and unit of layer resistance.
    pub wear_rate: fph,
    /// Drill wear above which automatic maintenance may happen.
    pub auto_repair_threshold: fph,
    /// Probability of automatic maintenance in any given frame.
    pub auto_repair_probability: fph,
    /// Drill wear removed by automatic maintenance.
    pub auto_repair_amount: fph,
    /// Depth below which oil is produced.
    pub oil_depth_threshold: fph,
    pub oil_rate_coefficient: fph,
    /// Reservoir pressure in percent of the original pressure.
    pub initial_reservoir_pressure: fph,
    /// Pressure lost per frame of oil production.
    pub pressure_decline_rate: fph,
    pub min_reservoir_pressure: fph,
    pub energy: EnergyConfig,
    /// Number of energy and oil samples kept in the history.
    pub history_capacity: usize,
}

/// A layer of the seabed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeologicalLayer {
    pub name: String,
    /// Depth of the top of the layer.
    pub top_depth: fph,
    /// How much the layer slows down drilling and wears the drill.
    pub resistance: fph,
    /// Fraction of the maximum oil rate the layer yields.
    pub oil_content: fph,
}

/// Coefficients of the energy production formulas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    /// Energy per squared unit of current speed.
    pub current_coefficient: fph,
    /// Temperature at which current energy is produced without loss.
    pub optimal_temperature: fph,
    /// Fraction of current energy lost per degree away from the optimal
    /// temperature.
    pub temperature_loss: fph,
    /// Whether current energy is scaled by the wave factor.
    pub current_follows_waves: bool,
    /// Energy per turbine and squared unit of wind speed.
    pub wind_coefficient: fph,
    /// Energy per generator and squared unit of wave factor.
    pub wave_coefficient: fph,
}

/// The state of drilling and production.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductionState {
    pub drill_depth: fph,
    pub drill_speed: fph,
    /// Drill wear in [0, 100].
    pub drill_wear: fph,
    pub reservoir_pressure: fph,
    pub oil_output: fph,
    pub energy_output: fph,
    /// Index of the layer the drill is in.
    pub layer_idx: usize,
    pub energy_history: HistoryBuffer<fph>,
    pub oil_history: HistoryBuffer<fph>,
}

/// Model updating the [`ProductionState`] once per frame.
#[derive(Clone, Debug)]
pub struct ProductionModel {
    config: ProductionConfig,
}

impl ProductionModel {
    /// Creates a new production model.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: ProductionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ProductionConfig {
        &self.config
    }

    /// Returns the state before any drilling has taken place.
    pub fn initial_state(&self) -> ProductionState {
        let config = &self.config;
        ProductionState {
            drill_depth: 0.0,
            drill_speed: config.initial_drill_speed,
            drill_wear: 0.0,
            reservoir_pressure: config.initial_reservoir_pressure,
            oil_output: 0.0,
            energy_output: 0.0,
            layer_idx: 0,
            energy_history: HistoryBuffer::new(config.history_capacity),
            oil_history: HistoryBuffer::new(config.history_capacity),
        }
    }

    /// Returns the index of the deepest layer whose top is at or above the
    /// given depth.
    pub fn find_layer_idx(&self, depth: fph) -> usize {
        self.config
            .layers
            .iter()
            .rposition(|layer| layer.top_depth <= depth)
            .unwrap_or(0)
    }

    /// Returns the layer with the given index.
    ///
    /// # Panics
    /// If the index is out of bounds.
    pub fn layer(&self, idx: usize) -> &GeologicalLayer {
        &self.config.layers[idx]
    }

    /// Advances drilling and computes this frame's oil and energy output.
    pub fn update<R: Rng + ?Sized>(
        &self,
        state: &mut ProductionState,
        environment: &EnvironmentState,
        forcing: &EnvironmentForcing,
        degradation: &DegradationState,
        input: &ControlInput,
        rng: &mut R,
    ) {
        self.apply_control_input(state, input);

        state.layer_idx = self.find_layer_idx(state.drill_depth);
        let layer = self.layer(state.layer_idx);

        self.advance_drill(state, layer.resistance);
        self.perform_automatic_maintenance(state, rng);
        self.produce_oil(state, layer.oil_content);

        state.energy_output = self.compute_energy_output(environment, forcing, degradation);

        state.energy_history.push(state.energy_output);
        state.oil_history.push(state.oil_output);
    }

    fn apply_control_input(&self, state: &mut ProductionState, input: &ControlInput) {
        state.drill_speed =
            fph::max(self.config.min_drill_speed, state.drill_speed + input.drill_speed_delta);
        if input.repair_drill {
            state.drill_wear = 0.0;
            rigsim_log::info!("Drill repaired at depth {:.1}", state.drill_depth);
        }
    }

    fn advance_drill(&self, state: &mut ProductionState, resistance: fph) {
        let config = &self.config;
        if state.drill_depth < config.max_depth && state.drill_wear < MAX_DRILL_WEAR {
            state.drill_depth =
                fph::min(config.max_depth, state.drill_depth + state.drill_speed / resistance);
            state.drill_wear =
                (state.drill_wear + config.wear_rate * resistance).clamp(0.0, MAX_DRILL_WEAR);
        }
    }

    fn perform_automatic_maintenance<R: Rng + ?Sized>(
        &self,
        state: &mut ProductionState,
        rng: &mut R,
    ) {
        let config = &self.config;
        if state.drill_wear > config.auto_repair_threshold
            && rng.random_bool(config.auto_repair_probability)
        {
            state.drill_wear = fph::max(0.0, state.drill_wear - config.auto_repair_amount);
            rigsim_log::debug!("Drill serviced, wear now {:.1}", state.drill_wear);
        }
    }

    fn produce_oil(&self, state: &mut ProductionState, oil_content: fph) {
        let config = &self.config;
        if state.drill_depth > config.oil_depth_threshold {
            state.oil_output =
                oil_content * config.oil_rate_coefficient * state.reservoir_pressure / 100.0;
            state.reservoir_pressure = fph::max(
                config.min_reservoir_pressure,
                state.reservoir_pressure - config.pressure_decline_rate,
            );
        } else {
            state.oil_output = 0.0;
        }
    }

    /// Computes the energy produced by the current, the wind turbines and the
    /// wave generators, rounded to two decimals and never negative.
    pub fn compute_energy_output(
        &self,
        environment: &EnvironmentState,
        forcing: &EnvironmentForcing,
        degradation: &DegradationState,
    ) -> fph {
        let config = &self.config.energy;

        let temperature_factor = fph::max(
            0.0,
            1.0 - config.temperature_loss
                * (environment.temperature - config.optimal_temperature).abs(),
        );
        let mut current_energy =
            config.current_coefficient * environment.current_speed.powi(2) * temperature_factor;
        if config.current_follows_waves {
            current_energy *= forcing.wave_factor_x.abs();
        }

        let wind_energy: fph = degradation
            .wind_turbines
            .iter()
            .map(|turbine| {
                turbine.efficiency * environment.wind_speed.powi(2) * config.wind_coefficient
            })
            .sum();

        let wave_energy: fph = degradation
            .wave_generators
            .iter()
            .map(|generator| {
                generator.efficiency * forcing.wave_factor_x.powi(2) * config.wave_coefficient
            })
            .sum();

        round_to_hundredths(fph::max(0.0, current_energy + wind_energy + wave_energy))
    }
}

impl ProductionState {
    /// Remaining drill health in percent.
    pub fn drill_health(&self) -> fph {
        MAX_DRILL_WEAR - self.drill_wear
    }
}

impl ProductionConfig {
    /// Checks that the layers and coefficients are valid.
    ///
    /// # Errors
    /// Returns an error describing the first invalid parameter.
    pub fn validate(&self) -> Result<()> {
        let Some(first_layer) = self.layers.first() else {
            bail!("At least one geological layer is required");
        };
        if first_layer.top_depth != 0.0 {
            bail!(
                "The first geological layer must start at depth zero, not {}",
                first_layer.top_depth
            );
        }
        for pair in self.layers.windows(2) {
            if pair[1].top_depth <= pair[0].top_depth {
                bail!(
                    "Geological layer {} must lie below layer {}",
                    pair[1].name,
                    pair[0].name
                );
            }
        }
        for layer in &self.layers {
            if !(layer.resistance.is_finite() && layer.resistance > 0.0) {
                bail!(
                    "Invalid resistance for geological layer {}: {}",
                    layer.name,
                    layer.resistance
                );
            }
            if !(layer.oil_content.is_finite() && layer.oil_content >= 0.0) {
                bail!(
                    "Invalid oil content for geological layer {}: {}",
                    layer.name,
                    layer.oil_content
                );
            }
        }
        if !(self.min_drill_speed.is_finite() && self.min_drill_speed >= 0.0) {
            bail!("Invalid minimum drill speed: {}", self.min_drill_speed);
        }
        if !(self.initial_drill_speed.is_finite()
            && self.initial_drill_speed >= self.min_drill_speed)
        {
            bail!("Invalid initial drill speed: {}", self.initial_drill_speed);
        }
        if !(0.0..=1.0).contains(&self.auto_repair_probability) {
            bail!(
                "Invalid automatic drill repair probability: {}",
                self.auto_repair_probability
            );
        }
        for (name, value) in [
            ("maximum depth", self.max_depth),
            ("drill wear rate", self.wear_rate),
            ("automatic drill repair amount", self.auto_repair_amount),
            ("oil rate coefficient", self.oil_rate_coefficient),
            ("pressure decline rate", self.pressure_decline_rate),
            ("minimum reservoir pressure", self.min_reservoir_pressure),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                bail!("Invalid {name}: {value}");
            }
        }
        Ok(())
    }
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            layers: default_layers(),
            initial_drill_speed: 0.5,
            min_drill_speed: 0.1,
            max_depth: 5000.0,
            wear_rate: 0.01,
            auto_repair_threshold: 90.0,
            auto_repair_probability: 0.1,
            auto_repair_amount: 30.0,
            oil_depth_threshold: 1000.0,
            oil_rate_coefficient: 0.5,
            initial_reservoir_pressure: 100.0,
            pressure_decline_rate: 0.01,
            min_reservoir_pressure: 10.0,
            energy: EnergyConfig::default(),
            history_capacity: 200,
        }
    }
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            current_coefficient: 5.0,
            optimal_temperature: 20.0,
            temperature_loss: 0.002,
            current_follows_waves: false,
            wind_coefficient: 0.2,
            wave_coefficient: 15.0,
        }
    }
}

impl GeologicalLayer {
    pub fn new(name: &str, top_depth: fph, resistance: fph, oil_content: fph) -> Self {
        Self {
            name: name.to_string(),
            top_depth,
            resistance,
            oil_content,
        }
    }
}

fn default_layers() -> Vec<GeologicalLayer> {
    vec![
        GeologicalLayer::new("Water", 0.0, 1.0, 0.0),
        GeologicalLayer::new("Sediment", 300.0, 3.0, 0.1),
        GeologicalLayer::new("Sandstone", 1000.0, 8.0, 0.3),
        GeologicalLayer::new("Oil reservoir", 2000.0, 5.0, 1.0),
        GeologicalLayer::new("Bedrock", 3500.0, 15.0, 0.2),
    ]
}

fn round_to_hundredths(value: fph) -> fph {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{SeedableRng, rngs::StdRng};
    use rigsim_physics::quantities::Force;

    fn forcing(wave_factor_x: fph) -> EnvironmentForcing {
        EnvironmentForcing {
            wave_factor_x,
            wave_factor_y: 0.0,
            center_force: Force::zeros(),
            tilt_force: Force::zeros(),
        }
    }

    fn no_equipment() -> DegradationState {
        DegradationState {
            column_health: Vec::new(),
            wind_turbines: Vec::new(),
            wave_generators: Vec::new(),
        }
    }

    fn run_frames(
        model: &ProductionModel,
        state: &mut ProductionState,
        n_frames: usize,
        input: &ControlInput,
    ) {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..n_frames {
            model.update(
                state,
                &EnvironmentState::default(),
                &forcing(0.0),
                &no_equipment(),
                input,
                &mut rng,
            );
        }
    }

    #[test]
    fn drilling_through_water_is_linear() {
        let model = ProductionModel::new(ProductionConfig::default()).unwrap();
        let mut state = model.initial_state();

        run_frames(&model, &mut state, 100, &ControlInput::default());

        assert_abs_diff_eq!(state.drill_depth, 50.0, epsilon = 1e-9);
        assert_abs_diff_eq!(state.drill_wear, 1.0, epsilon = 1e-9);
        assert_eq!(state.layer_idx, 0);
        assert_eq!(state.energy_history.len(), 100);
    }

    #[test]
    fn layer_lookup_picks_deepest_layer_above_depth() {
        let model = ProductionModel::new(ProductionConfig::default()).unwrap();
        assert_eq!(model.find_layer_idx(0.0), 0);
        assert_eq!(model.find_layer_idx(299.9), 0);
        assert_eq!(model.find_layer_idx(300.0), 1);
        assert_eq!(model.find_layer_idx(2500.0), 3);
        assert_eq!(model.find_layer_idx(1e6), 4);
        assert_eq!(model.layer(3).name, "Oil reservoir");
    }

    #[test]
    fn resistance_slows_drilling_and_speeds_wear() {
        let model = ProductionModel::new(ProductionConfig::default()).unwrap();
        let mut state = model.initial_state();
        state.drill_depth = 1000.0;

        run_frames(&model, &mut state, 1, &ControlInput::default());

        assert_abs_diff_eq!(state.drill_depth, 1000.0 + 0.5 / 8.0, epsilon = 1e-12);
        assert_abs_diff_eq!(state.drill_wear, 0.08, epsilon = 1e-12);
    }

    #[test]
    fn worn_out_drill_stops() {
        let config = ProductionConfig {
            auto_repair_probability: 0.0,
            ..Default::default()
        };
        let model = ProductionModel::new(config).unwrap();
        let mut state = model.initial_state();
        state.drill_wear = MAX_DRILL_WEAR;

        run_frames(&model, &mut state, 10, &ControlInput::default());

        assert_eq!(state.drill_depth, 0.0);
    }

    #[test]
    fn drilling_stops_at_max_depth() {
        let config = ProductionConfig {
            max_depth: 10.2,
            ..Default::default()
        };
        let model = ProductionModel::new(config).unwrap();
        let mut state = model.initial_state();

        run_frames(&model, &mut state, 100, &ControlInput::default());

        assert_abs_diff_eq!(state.drill_depth, 10.2);
    }

    #[test]
    fn repair_resets_wear_and_speed_has_floor() {
        let model = ProductionModel::new(ProductionConfig::default()).unwrap();
        let mut state = model.initial_state();
        state.drill_wear = 75.0;
        let input = ControlInput {
            repair_drill: true,
            drill_speed_delta: -10.0,
            ..Default::default()
        };

        run_frames(&model, &mut state, 1, &input);

        assert_abs_diff_eq!(state.drill_speed, 0.1);
        assert_abs_diff_eq!(state.drill_wear, 0.01, epsilon = 1e-12);
        assert_abs_diff_eq!(state.drill_health(), 99.99, epsilon = 1e-12);
    }

    #[test]
    fn automatic_maintenance_reduces_high_wear() {
        let config = ProductionConfig {
            auto_repair_probability: 1.0,
            ..Default::default()
        };
        let model = ProductionModel::new(config).unwrap();
        let mut state = model.initial_state();
        state.drill_wear = 95.0;

        run_frames(&model, &mut state, 1, &ControlInput::default());

        assert_abs_diff_eq!(state.drill_wear, 95.01 - 30.0, epsilon = 1e-9);
    }

    #[test]
    fn oil_flows_below_threshold_and_pressure_declines() {
        let model = ProductionModel::new(ProductionConfig::default()).unwrap();
        let mut state = model.initial_state();
        state.drill_depth = 2500.0;

        run_frames(&model, &mut state, 1, &ControlInput::default());

        assert_abs_diff_eq!(state.oil_output, 1.0 * 0.5 * 100.0 / 100.0, epsilon = 1e-12);
        assert_abs_diff_eq!(state.reservoir_pressure, 99.99, epsilon = 1e-12);
        assert_eq!(state.oil_history.latest(), Some(&state.oil_output));
    }

    #[test]
    fn reservoir_pressure_has_floor() {
        let model = ProductionModel::new(ProductionConfig::default()).unwrap();
        let mut state = model.initial_state();
        state.drill_depth = 2500.0;
        state.reservoir_pressure = 10.005;

        run_frames(&model, &mut state, 3, &ControlInput::default());

        assert_abs_diff_eq!(state.reservoir_pressure, 10.0);
    }

    #[test]
    fn no_oil_above_threshold() {
        let model = ProductionModel::new(ProductionConfig::default()).unwrap();
        let mut state = model.initial_state();
        run_frames(&model, &mut state, 5, &ControlInput::default());
        assert_eq!(state.oil_output, 0.0);
    }

    #[test]
    fn energy_sums_current_wind_and_wave_contributions() {
        let model = ProductionModel::new(ProductionConfig::default()).unwrap();
        let environment = EnvironmentState {
            current_speed: 2.0,
            wind_speed: 10.0,
            temperature: 15.0,
            ..Default::default()
        };
        let degradation = DegradationState {
            column_health: Vec::new(),
            wind_turbines: vec![crate::degradation::WindTurbine {
                rotor_angle: 0.0,
                efficiency: 0.9,
                health: 100.0,
            }],
            wave_generators: vec![crate::degradation::WaveGenerator {
                efficiency: 0.8,
                health: 100.0,
            }],
        };

        let energy = model.compute_energy_output(&environment, &forcing(0.5), &degradation);

        let current = 5.0 * 4.0 * (1.0 - 0.002 * 5.0);
        let wind = 0.9 * 100.0 * 0.2;
        let wave = 0.8 * 0.25 * 15.0;
        assert_abs_diff_eq!(energy, current + wind + wave, epsilon = 1e-9);
    }

    #[test]
    fn energy_is_rounded_and_never_negative() {
        let config = ProductionConfig {
            energy: EnergyConfig {
                temperature_loss: 1.0,
                current_coefficient: 1.0 / 3.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let model = ProductionModel::new(config).unwrap();
        let freezing = EnvironmentState {
            temperature: -40.0,
            ..Default::default()
        };
        let energy = model.compute_energy_output(&freezing, &forcing(0.0), &no_equipment());
        assert_eq!(energy, 0.0);

        let optimal = EnvironmentState {
            temperature: 20.0,
            current_speed: 1.0,
            ..Default::default()
        };
        let energy = model.compute_energy_output(&optimal, &forcing(0.0), &no_equipment());
        assert_abs_diff_eq!(energy, 0.33);
    }

    #[test]
    fn unordered_layers_are_rejected() {
        let config = ProductionConfig {
            layers: vec![
                GeologicalLayer::new("Water", 0.0, 1.0, 0.0),
                GeologicalLayer::new("Rock", 500.0, 2.0, 0.0),
                GeologicalLayer::new("Sand", 200.0, 2.0, 0.0),
            ],
            ..Default::default()
        };
        assert!(ProductionModel::new(config).is_err());
    }

    #[test]
    fn zero_resistance_is_rejected() {
        let config = ProductionConfig {
            layers: vec![GeologicalLayer::new("Void", 0.0, 0.0, 0.0)],
            ..Default::default()
        };
        assert!(ProductionModel::new(config).is_err());
    }
}
