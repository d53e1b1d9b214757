//! Calculation of forces and torques.

pub mod local_force;
pub mod spring_force;
pub mod uniform_gravity;

use crate::{fph, rigid_body::RigidBodyManager};
use anyhow::{Result, anyhow, bail};
use local_force::{LocalForce, LocalForceGenerator, LocalForceGeneratorID, LocalForceRegistry};
use rigsim_containers::HashMap;
use std::{fmt, hash::Hash};
use uniform_gravity::UniformGravity;

/// Manager of all generators of forces and torques on rigid bodies.
///
/// Spring forces are not generated here, since springs are joints and are
/// resolved by the [`JointManager`](crate::joint::JointManager).
#[derive(Debug)]
pub struct ForceGeneratorManager {
    gravity: UniformGravity,
    local_forces: LocalForceRegistry,
    local_force_id_counter: u64,
}

/// Configuration parameters for rigid body force generation.
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
#[derive(Clone, Debug)]
pub struct ForceGenerationConfig {
    /// The magnitude of the gravitational acceleration, which points along
    /// the negative y-axis.
    pub gravitational_acceleration: fph,
}

/// Manages all instances of a specific type of force generator.
#[derive(Clone, Debug)]
pub struct ForceGeneratorRegistry<Id, G> {
    generators: HashMap<Id, G>,
}

impl ForceGeneratorManager {
    /// Creates a new force manager with the given configuration parameters.
    ///
    /// # Errors
    /// Returns an error if any of the configuration parameters are invalid.
    pub fn new(config: ForceGenerationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            gravity: UniformGravity::downward(config.gravitational_acceleration),
            local_forces: LocalForceRegistry::new(),
            local_force_id_counter: 0,
        })
    }

    pub fn gravity(&self) -> &UniformGravity {
        &self.gravity
    }

    pub fn local_forces(&self) -> &LocalForceRegistry {
        &self.local_forces
    }

    pub fn local_forces_mut(&mut self) -> &mut LocalForceRegistry {
        &mut self.local_forces
    }

    /// Registers a generator applying the given [`LocalForce`] to the given
    /// dynamic rigid body every step.
    ///
    /// # Errors
    /// Returns an error if the ID space is exhausted.
    pub fn add_local_force(
        &mut self,
        generator: LocalForceGenerator,
    ) -> Result<LocalForceGeneratorID> {
        let id = LocalForceGeneratorID::from(self.local_force_id_counter);
        self.local_force_id_counter = self
            .local_force_id_counter
            .checked_add(1)
            .ok_or_else(|| anyhow!("Ran out of local force generator IDs"))?;
        self.local_forces.insert_generator(id, generator)?;
        Ok(id)
    }

    /// Replaces the force of the local force generator with the given ID.
    ///
    /// # Errors
    /// Returns an error if no generator with the given ID exists.
    pub fn set_local_force(&mut self, id: LocalForceGeneratorID, force: LocalForce) -> Result<()> {
        let generator = self
            .local_forces
            .get_generator_mut(&id)
            .ok_or_else(|| anyhow!("No local force generator with ID {id}"))?;
        generator.force = force;
        Ok(())
    }

    /// Resets the force and torque on every dynamic rigid body and applies
    /// gravity and all local forces to them.
    pub fn apply_forces_and_torques(&self, rigid_body_manager: &mut RigidBodyManager) {
        rigid_body_manager.reset_all_forces_and_torques();

        self.gravity.apply_to_all(rigid_body_manager);

        for generator in self.local_forces.generators() {
            generator.apply(rigid_body_manager);
        }
    }
}

impl<Id: Copy + Eq + Hash + fmt::Display, G> ForceGeneratorRegistry<Id, G> {
    fn new() -> Self {
        Self {
            generators: HashMap::default(),
        }
    }

    /// Returns a reference to the generator with the given ID, or [`None`] if
    /// it does not exist.
    pub fn get_generator(&self, id: &Id) -> Option<&G> {
        self.generators.get(id)
    }

    /// Returns a mutable reference to the generator with the given ID, or
    /// [`None`] if it does not exist.
    pub fn get_generator_mut(&mut self, id: &Id) -> Option<&mut G> {
        self.generators.get_mut(id)
    }

    /// Returns an iterator over all generators.
    pub fn generators(&self) -> impl Iterator<Item = &G> {
        self.generators.values()
    }

    /// Returns the number of registered generators.
    pub fn len(&self) -> usize {
        self.generators.len()
    }

    /// Whether no generators are registered.
    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Adds the given force generator to the map under the given ID.
    ///
    /// # Errors
    /// Returns an error if the given generator ID already exists.
    pub fn insert_generator(&mut self, id: Id, generator: G) -> Result<()> {
        if self.generators.contains_key(&id) {
            bail!("A force generator with ID {id} already exists");
        }
        self.generators.insert(id, generator);
        Ok(())
    }
}

impl ForceGenerationConfig {
    /// The default magnitude of the gravitational acceleration, in the length
    /// and time units of the platform model (pixels and seconds).
    pub const DEFAULT_GRAVITATIONAL_ACCELERATION: fph = 1000.0;

    fn validate(&self) -> Result<()> {
        if !(self.gravitational_acceleration.is_finite() && self.gravitational_acceleration >= 0.0)
        {
            bail!(
                "Invalid gravitational acceleration: {}",
                self.gravitational_acceleration
            );
        }
        Ok(())
    }
}

impl Default for ForceGenerationConfig {
    fn default() -> Self {
        Self {
            gravitational_acceleration: Self::DEFAULT_GRAVITATIONAL_ACCELERATION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        inertia::InertialProperties,
        quantities::{Orientation, Position},
        rigid_body::DynamicRigidBody,
    };
    use approx::assert_abs_diff_eq;
    use nalgebra::{point, vector};

    fn manager_with_one_body() -> (RigidBodyManager, crate::rigid_body::DynamicRigidBodyID) {
        let mut manager = RigidBodyManager::new();
        let id = manager
            .add_dynamic_rigid_body(DynamicRigidBody::at_rest(
                InertialProperties::new(2.0, 1.0).unwrap(),
                Position::origin(),
                Orientation::identity(),
            ))
            .unwrap();
        (manager, id)
    }

    #[test]
    fn negative_gravity_is_rejected() {
        let config = ForceGenerationConfig {
            gravitational_acceleration: -1.0,
        };
        assert!(ForceGeneratorManager::new(config).is_err());
    }

    #[test]
    fn gravity_force_is_proportional_to_mass() {
        let (mut bodies, id) = manager_with_one_body();
        let forces = ForceGeneratorManager::new(ForceGenerationConfig {
            gravitational_acceleration: 10.0,
        })
        .unwrap();
        forces.apply_forces_and_torques(&mut bodies);
        let body = bodies.get_dynamic_rigid_body(id).unwrap();
        assert_abs_diff_eq!(body.total_force(), &vector![0.0, -20.0]);
    }

    #[test]
    fn applying_forces_resets_previous_forces() {
        let (mut bodies, id) = manager_with_one_body();
        let forces = ForceGeneratorManager::new(ForceGenerationConfig {
            gravitational_acceleration: 0.0,
        })
        .unwrap();
        bodies
            .get_dynamic_rigid_body_mut(id)
            .unwrap()
            .apply_force_at_center_of_mass(&vector![5.0, 5.0]);
        forces.apply_forces_and_torques(&mut bodies);
        let body = bodies.get_dynamic_rigid_body(id).unwrap();
        assert_abs_diff_eq!(body.total_force(), &vector![0.0, 0.0]);
    }

    #[test]
    fn updated_local_force_is_applied() {
        let (mut bodies, id) = manager_with_one_body();
        let mut forces = ForceGeneratorManager::new(ForceGenerationConfig {
            gravitational_acceleration: 0.0,
        })
        .unwrap();
        let generator_id = forces
            .add_local_force(LocalForceGenerator::new(id, LocalForce::zero_at(Position::origin())))
            .unwrap();
        forces
            .set_local_force(
                generator_id,
                LocalForce::new(vector![0.0, 3.0], point![1.0, 0.0]),
            )
            .unwrap();
        forces.apply_forces_and_torques(&mut bodies);

        let body = bodies.get_dynamic_rigid_body(id).unwrap();
        assert_abs_diff_eq!(body.total_force(), &vector![0.0, 3.0]);
        assert_abs_diff_eq!(body.total_torque(), 3.0);
    }

    #[test]
    fn setting_unknown_local_force_fails() {
        let mut forces = ForceGeneratorManager::new(ForceGenerationConfig::default()).unwrap();
        assert!(
            forces
                .set_local_force(
                    LocalForceGeneratorID::from(7),
                    LocalForce::zero_at(Position::origin())
                )
                .is_err()
        );
    }

    #[test]
    fn registry_rejects_duplicate_ids() {
        let mut registry = ForceGeneratorRegistry::<LocalForceGeneratorID, u8>::new();
        registry
            .insert_generator(LocalForceGeneratorID::from(0), 1)
            .unwrap();
        assert!(
            registry
                .insert_generator(LocalForceGeneratorID::from(0), 2)
                .is_err()
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_generator(&LocalForceGeneratorID::from(0)), Some(&1));
    }
}
