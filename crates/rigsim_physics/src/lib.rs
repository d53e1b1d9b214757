//! Planar rigid body physics for the rig simulation.

pub mod force;
pub mod inertia;
pub mod joint;
pub mod quantities;
pub mod rigid_body;
pub mod shape;

use anyhow::{Result, bail};
use force::{
    ForceGenerationConfig, ForceGeneratorManager,
    local_force::{LocalForce, LocalForceGenerator, LocalForceGeneratorID},
};
use joint::{
    Joint, JointID, JointManager,
    solver::{ConstraintSolver, ConstraintSolverConfig},
};
use quantities::Acceleration;
use rigid_body::{
    DynamicRigidBody, DynamicRigidBodyID, RigidBodyManager, StaticRigidBody, StaticRigidBodyID,
};
use shape::{Shape, ShapeID, ShapeManager};

/// Floating point type used for physics simulation.
#[allow(non_camel_case_types)]
pub type fph = f64;

/// A planar world of rigid bodies connected by joints.
#[derive(Debug)]
pub struct PhysicsWorld {
    config: SimulatorConfig,
    rigid_body_manager: RigidBodyManager,
    shape_manager: ShapeManager,
    force_generator_manager: ForceGeneratorManager,
    joint_manager: JointManager,
    constraint_solver: ConstraintSolver,
    simulation_time: fph,
}

/// Configuration parameters for physics.
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
#[derive(Clone, Debug, Default)]
pub struct PhysicsConfig {
    /// Configuration parameters for the physics simulation.
    pub simulator: SimulatorConfig,
    /// Configuration parameters for rigid body force generation.
    pub force_generation: ForceGenerationConfig,
    /// Configuration parameters for the constraint solver.
    pub constraint_solver: ConstraintSolverConfig,
}

/// Configuration parameters for the physics simulation.
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
#[derive(Clone, Debug)]
pub struct SimulatorConfig {
    /// Whether physics simulation is enabled. A disabled world keeps all
    /// bodies where they are.
    pub enabled: bool,
    /// The number of substeps to perform each simulation step. Stiff damped
    /// springs need many substeps to stay stable.
    pub n_substeps: u32,
    /// The simulated duration of each step.
    pub time_step_duration: fph,
}

impl PhysicsWorld {
    /// Creates a new empty physics world with the given configuration
    /// parameters.
    ///
    /// # Errors
    /// Returns an error if any of the configuration parameters are invalid.
    pub fn new(
        PhysicsConfig {
            simulator: config,
            force_generation: force_generation_config,
            constraint_solver: constraint_solver_config,
        }: PhysicsConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            rigid_body_manager: RigidBodyManager::new(),
            shape_manager: ShapeManager::new(),
            force_generator_manager: ForceGeneratorManager::new(force_generation_config)?,
            joint_manager: JointManager::new(),
            constraint_solver: ConstraintSolver::new(constraint_solver_config)?,
            simulation_time: 0.0,
        })
    }

    /// Whether physics simulation is enabled.
    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// The simulated duration of each call to [`Self::advance_simulation`].
    pub fn time_step_duration(&self) -> fph {
        self.config.time_step_duration
    }

    /// The number of substeps each step is divided into.
    pub fn n_substeps(&self) -> u32 {
        self.config.n_substeps
    }

    /// The total simulated time.
    pub fn simulation_time(&self) -> fph {
        self.simulation_time
    }

    /// The gravitational acceleration experienced by every dynamic body.
    pub fn gravity(&self) -> &Acceleration {
        self.force_generator_manager.gravity().acceleration()
    }

    pub fn rigid_body_manager(&self) -> &RigidBodyManager {
        &self.rigid_body_manager
    }

    pub fn shape_manager(&self) -> &ShapeManager {
        &self.shape_manager
    }

    pub fn force_generator_manager(&self) -> &ForceGeneratorManager {
        &self.force_generator_manager
    }

    pub fn joint_manager(&self) -> &JointManager {
        &self.joint_manager
    }

    pub fn constraint_solver(&self) -> &ConstraintSolver {
        &self.constraint_solver
    }

    /// Adds the given dynamic rigid body to the world.
    ///
    /// # Errors
    /// Returns an error if the body's state is not finite.
    pub fn add_dynamic_rigid_body(&mut self, body: DynamicRigidBody) -> Result<DynamicRigidBodyID> {
        self.rigid_body_manager.add_dynamic_rigid_body(body)
    }

    /// Adds the given static rigid body to the world.
    ///
    /// # Errors
    /// Returns an error if the body's position is not finite.
    pub fn add_static_rigid_body(&mut self, body: StaticRigidBody) -> Result<StaticRigidBodyID> {
        self.rigid_body_manager.add_static_rigid_body(body)
    }

    /// Attaches the given shape to a body in the world.
    ///
    /// # Errors
    /// See [`ShapeManager::add_shape`].
    pub fn add_shape(&mut self, shape: Shape) -> Result<ShapeID> {
        self.shape_manager.add_shape(&self.rigid_body_manager, shape)
    }

    /// Connects two bodies in the world with the given joint.
    ///
    /// # Errors
    /// See [`JointManager::add_joint`].
    pub fn add_joint(&mut self, joint: Joint) -> Result<JointID> {
        self.joint_manager
            .add_joint(&self.rigid_body_manager, joint)
    }

    /// Registers a force that will be applied to the given dynamic body in
    /// every substep until it is changed with [`Self::set_local_force`].
    ///
    /// # Errors
    /// Returns an error if the body does not exist.
    pub fn add_local_force(
        &mut self,
        rigid_body_id: DynamicRigidBodyID,
        force: LocalForce,
    ) -> Result<LocalForceGeneratorID> {
        if self
            .rigid_body_manager
            .get_dynamic_rigid_body(rigid_body_id)
            .is_none()
        {
            bail!("Tried to add local force to unregistered {rigid_body_id}");
        }
        self.force_generator_manager
            .add_local_force(LocalForceGenerator::new(rigid_body_id, force))
    }

    /// Replaces the force of the given local force generator. The new force
    /// takes effect from the next call to [`Self::advance_simulation`].
    ///
    /// # Errors
    /// Returns an error if the generator does not exist.
    pub fn set_local_force(&mut self, id: LocalForceGeneratorID, force: LocalForce) -> Result<()> {
        self.force_generator_manager.set_local_force(id, force)
    }

    /// Computes the current distance between the anchors of the given joint,
    /// or returns [`None`] if the joint does not exist.
    pub fn joint_separation(&self, id: JointID) -> Option<fph> {
        self.joint_manager
            .get_joint(id)?
            .compute_anchor_separation(&self.rigid_body_manager)
    }

    /// Advances the physics simulation by one time step.
    pub fn advance_simulation(&mut self) {
        if !self.config.enabled {
            return;
        }
        rigsim_log::with_trace_logging!(
            "Simulation step with duration {:.4} and {} substeps",
            self.time_step_duration(),
            self.n_substeps(); {
            self.do_advance_simulation();
        });
    }

    fn do_advance_simulation(&mut self) {
        let substep_duration = self.compute_substep_duration();
        for _ in 0..self.n_substeps() {
            Self::perform_step(
                &mut self.rigid_body_manager,
                &self.force_generator_manager,
                &self.joint_manager,
                &mut self.constraint_solver,
                substep_duration,
            );
            self.simulation_time += substep_duration;
        }
    }

    fn compute_substep_duration(&self) -> fph {
        self.time_step_duration() / fph::from(self.n_substeps())
    }

    fn perform_step(
        rigid_body_manager: &mut RigidBodyManager,
        force_generator_manager: &ForceGeneratorManager,
        joint_manager: &JointManager,
        constraint_solver: &mut ConstraintSolver,
        step_duration: fph,
    ) {
        force_generator_manager.apply_forces_and_torques(rigid_body_manager);

        joint_manager.resolve_joints(rigid_body_manager, constraint_solver);

        rigid_body_manager.advance_dynamic_rigid_body_momenta(step_duration);

        if constraint_solver.config().enabled && constraint_solver.has_prepared_constraints() {
            constraint_solver.compute_and_apply_constrained_state(rigid_body_manager);
        }

        rigid_body_manager.advance_dynamic_rigid_body_configurations(step_duration);
    }
}

impl SimulatorConfig {
    fn validate(&self) -> Result<()> {
        if self.n_substeps == 0 {
            bail!(
                "Invalid number of substeps for physics simulation: {}",
                self.n_substeps
            );
        }
        if !(self.time_step_duration.is_finite() && self.time_step_duration > 0.0) {
            bail!(
                "Invalid time step duration for physics simulation: {}",
                self.time_step_duration
            );
        }
        Ok(())
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            n_substeps: 40,
            time_step_duration: 1.0 / 60.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_substeps_is_rejected() {
        let config = PhysicsConfig {
            simulator: SimulatorConfig {
                n_substeps: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(PhysicsWorld::new(config).is_err());
    }

    #[test]
    fn non_positive_time_step_is_rejected() {
        let config = PhysicsConfig {
            simulator: SimulatorConfig {
                time_step_duration: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(PhysicsWorld::new(config).is_err());
    }

    #[test]
    fn advancing_empty_world_advances_time() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default()).unwrap();
        world.advance_simulation();
        world.advance_simulation();
        approx::assert_abs_diff_eq!(world.simulation_time(), 2.0 / 60.0, epsilon = 1e-12);
    }

    #[test]
    fn disabled_world_does_not_advance() {
        let config = PhysicsConfig {
            simulator: SimulatorConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut world = PhysicsWorld::new(config).unwrap();
        world.advance_simulation();
        assert_eq!(world.simulation_time(), 0.0);
    }
}
