//! The per-frame pipeline tying the models to the physics world.

use crate::{
    config::SimulationConfig,
    control::ControlInput,
    degradation::{DegradationModel, DegradationState},
    environment::{EnvironmentModel, EnvironmentState},
    production::{ProductionModel, ProductionState},
    snapshot::{
        ForcingSnapshot, PlatformSnapshot, ProductionSnapshot, SimulationSnapshot, point_to_array,
    },
    structure::PlatformStructure,
};
use anyhow::Result;
use rand::{SeedableRng, rngs::StdRng};
use rigsim_physics::{PhysicsWorld, fph};

/// The complete simulation: the physics world holding the platform and its
/// columns, the models driving it and the state they evolve.
#[derive(Debug)]
pub struct Simulation {
    world: PhysicsWorld,
    structure: PlatformStructure,
    environment_model: EnvironmentModel,
    production_model: ProductionModel,
    degradation_model: DegradationModel,
    environment: EnvironmentState,
    production: ProductionState,
    degradation: DegradationState,
    rng: StdRng,
    frame: u64,
}

impl Simulation {
    /// Creates a simulation from the given configuration, with the random
    /// number generator seeded from the configured seed.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &SimulationConfig) -> Result<Self> {
        config.validate()?;

        let (world, structure) = rigsim_log::with_timing_info_logging!(
            "Building platform with {} columns",
            config.structure.n_columns; {
            let mut world = PhysicsWorld::new(config.physics.clone())?;
            let structure = PlatformStructure::build(&mut world, &config.structure)?;
            Ok::<_, anyhow::Error>((world, structure))
        })?;

        let environment_model = EnvironmentModel::new(config.environment.clone())?;
        let production_model = ProductionModel::new(config.production.clone())?;
        let degradation_model = DegradationModel::new(config.degradation.clone())?;

        let environment = environment_model.initial_state();
        let production = production_model.initial_state();
        let degradation = degradation_model.initial_state(structure.column_ids().len());

        Ok(Self {
            world,
            structure,
            environment_model,
            production_model,
            degradation_model,
            environment,
            production,
            degradation,
            rng: StdRng::seed_from_u64(config.seed),
            frame: 0,
        })
    }

    /// Advances the simulation by one frame using the given control input and
    /// returns a snapshot of the resulting state.
    ///
    /// The phases run in a fixed order: the environment is updated, its
    /// forcing is applied to the platform, the physics is stepped, the
    /// degradation and production models are updated and finally the
    /// snapshot is taken.
    ///
    /// # Errors
    /// Returns an error if the platform or its force generators have gone
    /// missing from the physics world.
    pub fn advance_frame(&mut self, input: &ControlInput) -> Result<SimulationSnapshot> {
        let forcing =
            self.environment_model
                .update(&mut self.environment, self.frame, input, &mut self.rng);

        self.structure.apply_forcing(&mut self.world, &forcing)?;

        self.world.advance_simulation();

        let platform = PlatformSnapshot::from_body(self.structure.platform(&self.world)?);

        self.degradation_model.update(
            &mut self.degradation,
            &self.environment,
            &forcing,
            platform.speed(),
            &mut self.rng,
        );

        self.production_model.update(
            &mut self.production,
            &self.environment,
            &forcing,
            &self.degradation,
            input,
            &mut self.rng,
        );

        let layer = self.production_model.layer(self.production.layer_idx);

        let snapshot = SimulationSnapshot {
            frame: self.frame,
            simulation_time: self.world.simulation_time(),
            platform,
            column_positions: self
                .structure
                .column_positions(&self.world)?
                .iter()
                .map(point_to_array)
                .collect(),
            joint_separations: self.structure.joint_separations(&self.world),
            environment: self.environment.clone(),
            forcing: ForcingSnapshot::from(&forcing),
            production: ProductionSnapshot::new(&self.production, &layer.name),
            degradation: self.degradation.clone(),
        };

        self.frame += 1;

        Ok(snapshot)
    }

    /// The number of frames advanced so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn simulation_time(&self) -> fph {
        self.world.simulation_time()
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn structure(&self) -> &PlatformStructure {
        &self.structure
    }

    pub fn environment(&self) -> &EnvironmentState {
        &self.environment
    }

    pub fn production(&self) -> &ProductionState {
        &self.production
    }

    pub fn degradation(&self) -> &DegradationState {
        &self.degradation
    }
}
