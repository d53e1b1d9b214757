//! Forces from damped springs attached to two rigid bodies.

use crate::{
    fph,
    joint::MIN_SEPARATION,
    quantities::Position,
    rigid_body::{RigidBodyManager, TypedRigidBodyID},
};
use approx::abs_diff_eq;
use nalgebra::UnitVector2;

/// A linear spring with a damper in parallel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Spring {
    /// The spring constant representing the stiffness of the spring.
    pub stiffness: fph,
    /// The spring damping coefficient.
    pub damping: fph,
    /// The length for which the spring is in equilibrium.
    pub rest_length: fph,
}

/// The two ends of a spring, each given by a rigid body and a point in that
/// body's local reference frame.
#[derive(Copy, Clone, Debug)]
pub struct SpringAttachment {
    pub rigid_body_a: TypedRigidBodyID,
    pub point_a: Position,
    pub rigid_body_b: TypedRigidBodyID,
    pub point_b: Position,
}

impl Spring {
    /// Creates a new spring.
    pub fn new(stiffness: fph, damping: fph, rest_length: fph) -> Self {
        Self {
            stiffness,
            damping,
            rest_length,
        }
    }

    /// Computes the force along the spring axis for the given length and rate
    /// of change in length. A positive force is directed outward.
    pub fn scalar_force(&self, length: fph, rate_of_length_change: fph) -> fph {
        self.compute_spring_force(length) + self.compute_damping_force(rate_of_length_change)
    }

    /// Applies equal and opposite spring forces at the two attachment points.
    /// Only dynamic bodies are affected. Nothing is applied if the attachment
    /// points are closer than [`MIN_SEPARATION`], since the spring axis is
    /// undefined.
    pub fn apply(&self, rigid_body_manager: &mut RigidBodyManager, attachment: &SpringAttachment) {
        let Some(state_a) = rigid_body_manager
            .compute_attached_point_state(attachment.rigid_body_a, &attachment.point_a)
        else {
            return;
        };
        let Some(state_b) = rigid_body_manager
            .compute_attached_point_state(attachment.rigid_body_b, &attachment.point_b)
        else {
            return;
        };

        let Some((spring_direction, length)) =
            UnitVector2::try_new_and_get(state_b.position - state_a.position, MIN_SEPARATION)
        else {
            return;
        };

        let rate_of_length_change = if abs_diff_eq!(self.damping, 0.0) {
            // The velocities are irrelevant if there is zero damping
            0.0
        } else {
            state_b.velocity.dot(&spring_direction) - state_a.velocity.dot(&spring_direction)
        };

        let force_on_b =
            self.scalar_force(length, rate_of_length_change) * spring_direction.as_ref();

        if let TypedRigidBodyID::Dynamic(id) = attachment.rigid_body_a {
            if let Some(rigid_body) = rigid_body_manager.get_dynamic_rigid_body_mut(id) {
                rigid_body.apply_force(&(-force_on_b), &state_a.position);
            }
        }
        if let TypedRigidBodyID::Dynamic(id) = attachment.rigid_body_b {
            if let Some(rigid_body) = rigid_body_manager.get_dynamic_rigid_body_mut(id) {
                rigid_body.apply_force(&force_on_b, &state_b.position);
            }
        }
    }

    fn compute_spring_force(&self, length: fph) -> fph {
        -self.stiffness * (length - self.rest_length)
    }

    fn compute_damping_force(&self, rate_of_length_change: fph) -> fph {
        -self.damping * rate_of_length_change
    }
}
