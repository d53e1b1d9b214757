//! Body-space force on a point of a rigid body.

use crate::{
    force::ForceGeneratorRegistry,
    quantities::{Force, Position},
    rigid_body::{DynamicRigidBodyID, RigidBodyManager},
};
use bytemuck::{Pod, Zeroable};
use std::fmt;

/// Manages all [`LocalForceGenerator`]s.
pub type LocalForceRegistry = ForceGeneratorRegistry<LocalForceGeneratorID, LocalForceGenerator>;

/// Identifier for a [`LocalForceGenerator`].
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Zeroable, Pod)]
pub struct LocalForceGeneratorID(u64);

/// Generator for a body-space force applied to a specific point on a dynamic
/// rigid body. The force follows the body as it rotates.
#[derive(Clone, Debug)]
pub struct LocalForceGenerator {
    /// The dynamic rigid body experiencing the force.
    pub rigid_body_id: DynamicRigidBodyID,
    /// The force and its point of application.
    pub force: LocalForce,
}

/// A force vector and the point where it is applied, both in the body's local
/// reference frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LocalForce {
    /// The force vector in the body's local reference frame.
    pub force: Force,
    /// The point where the force is applied, in the body's local reference
    /// frame.
    pub point: Position,
}

impl From<u64> for LocalForceGeneratorID {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for LocalForceGeneratorID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl LocalForceGenerator {
    pub fn new(rigid_body_id: DynamicRigidBodyID, force: LocalForce) -> Self {
        Self {
            rigid_body_id,
            force,
        }
    }

    /// Applies the force to the appropriate dynamic rigid body.
    pub fn apply(&self, rigid_body_manager: &mut RigidBodyManager) {
        let Some(rigid_body) = rigid_body_manager.get_dynamic_rigid_body_mut(self.rigid_body_id)
        else {
            return;
        };

        let force = rigid_body.transform_vector_from_body_to_world_space(&self.force.force);
        let point = rigid_body.transform_point_from_body_to_world_space(&self.force.point);
        rigid_body.apply_force(&force, &point);
    }
}

impl LocalForce {
    pub fn new(force: Force, point: Position) -> Self {
        Self { force, point }
    }

    /// A zero force at the given point.
    pub fn zero_at(point: Position) -> Self {
        Self::new(Force::zeros(), point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        inertia::InertialProperties, quantities::Orientation, rigid_body::DynamicRigidBody,
    };
    use approx::assert_abs_diff_eq;
    use nalgebra::{point, vector};
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn local_force_rotates_with_body() {
        let mut manager = RigidBodyManager::new();
        let id = manager
            .add_dynamic_rigid_body(DynamicRigidBody::at_rest(
                InertialProperties::new(1.0, 1.0).unwrap(),
                point![3.0, 0.0],
                Orientation::new(FRAC_PI_2),
            ))
            .unwrap();

        let generator =
            LocalForceGenerator::new(id, LocalForce::new(vector![2.0, 0.0], point![0.0, 0.0]));
        generator.apply(&mut manager);

        let body = manager.get_dynamic_rigid_body(id).unwrap();
        assert_abs_diff_eq!(body.total_force(), &vector![0.0, 2.0], epsilon = 1e-12);
        assert_abs_diff_eq!(body.total_torque(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn off_center_local_force_gives_torque() {
        let mut manager = RigidBodyManager::new();
        let id = manager
            .add_dynamic_rigid_body(DynamicRigidBody::at_rest(
                InertialProperties::new(1.0, 1.0).unwrap(),
                Position::origin(),
                Orientation::identity(),
            ))
            .unwrap();

        LocalForceGenerator::new(id, LocalForce::new(vector![4.0, 0.0], point![0.0, 0.5]))
            .apply(&mut manager);

        let body = manager.get_dynamic_rigid_body(id).unwrap();
        assert_abs_diff_eq!(body.total_torque(), -2.0);
    }
}
