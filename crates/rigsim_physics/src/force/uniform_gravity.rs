//! Uniform gravitational acceleration.

use crate::{fph, quantities::Acceleration, rigid_body::RigidBodyManager};

/// A constant world-space acceleration of the center of mass of every dynamic
/// rigid body.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UniformGravity {
    acceleration: Acceleration,
}

impl UniformGravity {
    pub fn new(acceleration: Acceleration) -> Self {
        Self { acceleration }
    }

    /// Constant acceleration of the given magnitude in the negative
    /// y-direction.
    pub fn downward(acceleration: fph) -> Self {
        Self::new(Acceleration::new(0.0, -acceleration))
    }

    pub fn acceleration(&self) -> &Acceleration {
        &self.acceleration
    }

    /// Applies the acceleration to all dynamic rigid bodies. Static bodies are
    /// unaffected.
    pub fn apply_to_all(&self, rigid_body_manager: &mut RigidBodyManager) {
        for rigid_body in rigid_body_manager.dynamic_rigid_bodies_mut() {
            let force = self.acceleration * rigid_body.mass();
            rigid_body.apply_force_at_center_of_mass(&force);
        }
    }
}
