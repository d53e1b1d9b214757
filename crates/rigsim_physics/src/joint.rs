//! Joints connecting pairs of rigid bodies.

pub mod pin;
pub mod solver;

use crate::{
    force::spring_force::{Spring, SpringAttachment},
    fph,
    quantities::{self, AngularVelocity, Displacement, Impulse, Orientation, Position, Velocity},
    rigid_body::{DynamicRigidBody, RigidBodyManager, StaticRigidBody, TypedRigidBodyID},
};
use anyhow::{Result, anyhow, bail};
use bytemuck::{Pod, Zeroable};
use nalgebra::UnitComplex;
use num_traits::Zero;
use pin::PinJoint;
use rigsim_containers::KeyIndexMapper;
use rigsim_log::debug;
use solver::ConstraintSolver;
use std::{
    fmt,
    ops::{Add, Mul, Sub},
};

/// Anchor separations at or below this distance are treated as zero. The
/// direction between two anchors is undefined at such separations.
pub const MIN_SEPARATION: fph = 1e-6;

/// Identifier for a [`Joint`] in a [`JointManager`].
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Zeroable, Pod)]
pub struct JointID(u64);

/// A connection between anchor points on two distinct rigid bodies.
#[derive(Clone, Debug)]
pub struct Joint {
    /// The first body.
    pub body_a: TypedRigidBodyID,
    /// The anchor point on the first body, in that body's local frame.
    pub anchor_a: Position,
    /// The second body.
    pub body_b: TypedRigidBodyID,
    /// The anchor point on the second body, in that body's local frame.
    pub anchor_b: Position,
    /// How the two anchors are held together.
    pub kind: JointKind,
}

/// The ways a [`Joint`] can hold its anchors together.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum JointKind {
    /// The anchors are kept at a fixed distance by the constraint solver.
    Pin(PinJoint),
    /// The anchors are pulled toward the spring's rest length by a damped
    /// spring force.
    DampedSpring(Spring),
}

/// Manages all joints in the simulation.
///
/// Joints are resolved every substep: damped springs apply their forces
/// directly to the bodies, while pins are handed to the [`ConstraintSolver`].
#[derive(Clone, Debug)]
pub struct JointManager {
    joints: Vec<Joint>,
    joint_indices_by_id: KeyIndexMapper<JointID>,
    joint_id_counter: u64,
}

/// Represents a two-body constraint that has been prepared for constraint
/// solving in the current substep.
trait PreparedTwoBodyConstraint {
    type Impulses: fmt::Debug
        + Copy
        + Zero
        + Add<Output = Self::Impulses>
        + Sub<Output = Self::Impulses>
        + Mul<fph, Output = Self::Impulses>;

    /// Whether the accumulated [`Self::Impulses`] from the other constraint can
    /// be used to kick start the solution of this constraint. It should be
    /// assumed that the given constraint involves the same bodies as this
    /// constraint.
    fn can_use_warm_impulses_from(&self, other: &Self) -> bool;

    /// Computes the corrective impulses that should be applied to the bodies
    /// in order to satisfy the velocity constraint.
    fn compute_impulses(&self, body_a: &ConstrainedBody, body_b: &ConstrainedBody)
    -> Self::Impulses;

    /// Applies the given impulses to the velocities of the two bodies.
    fn apply_impulses_to_body_pair(
        &self,
        body_a: &mut ConstrainedBody,
        body_b: &mut ConstrainedBody,
        impulses: Self::Impulses,
    );

    /// Computes and applies pseudo impulses to the position and orientation
    /// of the bodies to satisfy the position constraint.
    fn apply_positional_correction_to_body_pair(
        &self,
        body_a: &mut ConstrainedBody,
        body_b: &mut ConstrainedBody,
        correction_factor: fph,
    );
}

/// The relevant properties and state of a rigid body required for constraint
/// solving. The state is updated iteratively as constraints are being solved.
#[derive(Clone, Debug)]
struct ConstrainedBody {
    /// Inverse of the body's mass.
    inverse_mass: fph,
    /// Inverse of the body's moment of inertia.
    inverse_moment_of_inertia: fph,
    /// Position of the body's center of mass.
    position: Position,
    /// Orientation of the body's reference frame.
    orientation: Orientation,
    /// Linear velocity of the body's center of mass.
    velocity: Velocity,
    /// Angular velocity of the body about its center of mass.
    angular_velocity: AngularVelocity,
}

impl fmt::Display for JointID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "joint {}", self.0)
    }
}

impl Joint {
    /// Creates a joint of the given kind between the given anchors.
    pub fn new(
        body_a: impl Into<TypedRigidBodyID>,
        anchor_a: Position,
        body_b: impl Into<TypedRigidBodyID>,
        anchor_b: Position,
        kind: JointKind,
    ) -> Self {
        Self {
            body_a: body_a.into(),
            anchor_a,
            body_b: body_b.into(),
            anchor_b,
            kind,
        }
    }

    /// Computes the current world space distance between the two anchors, or
    /// returns [`None`] if either body does not exist.
    pub fn compute_anchor_separation(&self, rigid_body_manager: &RigidBodyManager) -> Option<fph> {
        let state_a = rigid_body_manager.compute_attached_point_state(self.body_a, &self.anchor_a)?;
        let state_b = rigid_body_manager.compute_attached_point_state(self.body_b, &self.anchor_b)?;
        Some((state_b.position - state_a.position).norm())
    }

    /// Resolves the joint for the current substep. A damped spring applies its
    /// force to the bodies right away, while a pin is prepared in the given
    /// constraint solver.
    pub fn resolve(
        &self,
        id: JointID,
        rigid_body_manager: &mut RigidBodyManager,
        constraint_solver: &mut ConstraintSolver,
    ) {
        match &self.kind {
            JointKind::DampedSpring(spring) => {
                spring.apply(rigid_body_manager, &self.spring_attachment());
            }
            JointKind::Pin(pin) => {
                if constraint_solver.config().enabled {
                    constraint_solver.prepare_pin_joint(rigid_body_manager, id, self, pin);
                }
            }
        }
    }

    fn spring_attachment(&self) -> SpringAttachment {
        SpringAttachment {
            rigid_body_a: self.body_a,
            point_a: self.anchor_a,
            rigid_body_b: self.body_b,
            point_b: self.anchor_b,
        }
    }

    fn validate(&self, rigid_body_manager: &RigidBodyManager) -> Result<()> {
        if self.body_a == self.body_b {
            bail!("Joint connects {} to itself", self.body_a);
        }
        for body in [self.body_a, self.body_b] {
            if !rigid_body_manager.contains(body) {
                bail!("Joint refers to unregistered {body}");
            }
        }
        if !(self.body_a.is_dynamic() || self.body_b.is_dynamic()) {
            bail!(
                "Joint between {} and {} connects two static bodies",
                self.body_a,
                self.body_b
            );
        }
        if !self
            .anchor_a
            .coords
            .iter()
            .chain(self.anchor_b.coords.iter())
            .all(|coord| coord.is_finite())
        {
            bail!(
                "Joint has non-finite anchors {} and {}",
                self.anchor_a,
                self.anchor_b
            );
        }
        match &self.kind {
            JointKind::DampedSpring(spring) => {
                for (name, value) in [
                    ("stiffness", spring.stiffness),
                    ("damping", spring.damping),
                    ("rest length", spring.rest_length),
                ] {
                    if !(value.is_finite() && value >= 0.0) {
                        bail!("Invalid spring {name} for joint: {value}");
                    }
                }
            }
            JointKind::Pin(pin) => {
                if let Some(rest_length) = pin.rest_length {
                    if !(rest_length.is_finite() && rest_length >= 0.0) {
                        bail!("Invalid pin rest length for joint: {rest_length}");
                    }
                }
            }
        }
        Ok(())
    }
}

impl JointManager {
    pub fn new() -> Self {
        Self {
            joints: Vec::new(),
            joint_indices_by_id: KeyIndexMapper::new(),
            joint_id_counter: 0,
        }
    }

    /// Returns a reference to the [`Joint`] with the given ID, or [`None`] if
    /// it does not exist.
    pub fn get_joint(&self, id: JointID) -> Option<&Joint> {
        let idx = self.joint_indices_by_id.get(id)?;
        Some(&self.joints[idx])
    }

    /// Returns an iterator over all joints and their IDs.
    pub fn joints(&self) -> impl Iterator<Item = (JointID, &Joint)> {
        self.joint_indices_by_id.key_at_each_idx().zip(&self.joints)
    }

    /// Returns the number of joints.
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Registers the given joint between two bodies in the given
    /// [`RigidBodyManager`]. A pin without an explicit rest length gets the
    /// current separation of its anchors as rest length.
    ///
    /// # Returns
    /// A new [`JointID`] referring to the added joint.
    ///
    /// # Errors
    /// Returns an error if
    /// - the joint connects a body to itself,
    /// - either body is not registered,
    /// - both bodies are static,
    /// - an anchor or a joint parameter is invalid.
    pub fn add_joint(
        &mut self,
        rigid_body_manager: &RigidBodyManager,
        mut joint: Joint,
    ) -> Result<JointID> {
        joint.validate(rigid_body_manager)?;

        if matches!(joint.kind, JointKind::Pin(PinJoint { rest_length: None })) {
            let separation = joint_anchor_separation(&joint, rigid_body_manager)?;
            debug!("Pin joint rest length set to initial separation {separation}");
            joint.kind = JointKind::Pin(PinJoint::new(separation));
        }

        let id = JointID(self.joint_id_counter);
        self.joint_id_counter = self
            .joint_id_counter
            .checked_add(1)
            .ok_or_else(|| anyhow!("Ran out of joint IDs"))?;

        self.joint_indices_by_id.push_key(id)?;
        self.joints.push(joint);

        Ok(id)
    }

    /// Resolves every joint for the current substep. Must be called after
    /// forces have been applied and before the momenta are advanced.
    pub fn resolve_joints(
        &self,
        rigid_body_manager: &mut RigidBodyManager,
        constraint_solver: &mut ConstraintSolver,
    ) {
        // Body states cached for the previous substep are stale
        constraint_solver.clear_prepared_bodies();

        for (id, joint) in self.joints() {
            joint.resolve(id, rigid_body_manager, constraint_solver);
        }

        constraint_solver.remove_unprepared_constraints();
    }
}

impl Default for JointManager {
    fn default() -> Self {
        Self::new()
    }
}

fn joint_anchor_separation(joint: &Joint, rigid_body_manager: &RigidBodyManager) -> Result<fph> {
    joint
        .compute_anchor_separation(rigid_body_manager)
        .ok_or_else(|| {
            anyhow!(
                "Could not measure anchor separation between {} and {}",
                joint.body_a,
                joint.body_b
            )
        })
}

impl ConstrainedBody {
    fn from_dynamic_rigid_body(body: &DynamicRigidBody) -> Self {
        Self {
            inverse_mass: body.mass().recip(),
            inverse_moment_of_inertia: body.moment_of_inertia().recip(),
            position: *body.position(),
            orientation: *body.orientation(),
            velocity: body.compute_velocity(),
            angular_velocity: body.compute_angular_velocity(),
        }
    }

    /// We can treat static bodies as having infinite mass.
    fn from_static_rigid_body(body: &StaticRigidBody) -> Self {
        Self {
            inverse_mass: 0.0,
            inverse_moment_of_inertia: 0.0,
            position: *body.position(),
            orientation: *body.orientation(),
            velocity: Velocity::zeros(),
            angular_velocity: 0.0,
        }
    }

    /// Computes the world space displacement from the center of mass to the
    /// given point in the body's local frame.
    fn compute_lever_arm(&self, local_point: &Position) -> Displacement {
        self.orientation.transform_vector(&local_point.coords)
    }

    /// Computes the velocity of the point at the given lever arm.
    fn compute_point_velocity(&self, lever_arm: &Displacement) -> Velocity {
        self.velocity + quantities::angular_cross(self.angular_velocity, lever_arm)
    }

    /// Applies the given impulse at the given lever arm to the body's
    /// velocities.
    fn apply_impulse(&mut self, impulse: &Impulse, lever_arm: &Displacement) {
        self.velocity += impulse * self.inverse_mass;
        self.angular_velocity +=
            self.inverse_moment_of_inertia * quantities::cross(lever_arm, impulse);
    }

    /// Applies the given pseudo impulse at the given lever arm to the body's
    /// position and orientation.
    fn apply_pseudo_impulse(&mut self, pseudo_impulse: &Impulse, lever_arm: &Displacement) {
        self.position += pseudo_impulse * self.inverse_mass;
        let rotation =
            self.inverse_moment_of_inertia * quantities::cross(lever_arm, pseudo_impulse);
        self.orientation = UnitComplex::new(rotation) * self.orientation;
    }
}
