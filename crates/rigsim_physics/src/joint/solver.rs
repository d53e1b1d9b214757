//! Constraint solving based on the sequential impulse method.

use super::{
    ConstrainedBody, Joint, JointID, PreparedTwoBodyConstraint,
    pin::{PinJoint, PreparedDistanceJoint, PreparedPointJoint},
};
use crate::{
    fph,
    rigid_body::{RigidBodyManager, TypedRigidBodyID},
};
use anyhow::{Result, bail};
use num_traits::Zero;
use rigsim_containers::KeyIndexMapper;
use std::{
    fmt,
    hash::Hash,
    ops::{Deref, DerefMut},
};

/// A Sequential Impulse constraint solver.
#[derive(Clone, Debug)]
pub struct ConstraintSolver {
    bodies: Vec<ConstrainedBody>,
    body_index_map: KeyIndexMapper<TypedRigidBodyID>,
    point_joints: ConstraintCache<JointID, PreparedPointJoint>,
    distance_joints: ConstraintCache<JointID, PreparedDistanceJoint>,
    config: ConstraintSolverConfig,
}

/// Configuration parameters for the [`ConstraintSolver`].
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
#[derive(Clone, Debug)]
pub struct ConstraintSolverConfig {
    /// Whether constraints will be solved.
    pub enabled: bool,
    /// The number of sequential impulse iterations to perform for solving the
    /// velocity constraints.
    pub n_iterations: u32,
    /// How to scale the still-valid accumulated impulses from the previous
    /// substep before using them as the initial impulses for the current
    /// substep. Set to zero to disable warm starting.
    pub old_impulse_weight: fph,
    /// The number of iterations to use for positional correction after the
    /// velocity constraints have been solved.
    pub n_positional_correction_iterations: u32,
    /// The fraction of the current positional error the solver should try to
    /// correct.
    pub positional_correction_factor: fph,
}

/// Container for constraints of a specific type that manages their lifetime
/// over multiple substeps.
#[derive(Clone, Debug)]
struct ConstraintCache<K, C: PreparedTwoBodyConstraint> {
    constraints: Vec<BodyPairConstraint<C>>,
    constraint_index_map: KeyIndexMapper<K>,
}

/// Wrapper for a prepared two-body constraint holding the indices of the
/// involved [`ConstrainedBody`]s in the [`ConstraintSolver`] and the current
/// accumulated impulses.
#[derive(Clone, Debug)]
struct BodyPairConstraint<C: PreparedTwoBodyConstraint> {
    body_a_idx: usize,
    body_b_idx: usize,
    constraint: C,
    accumulated_impulses: C::Impulses,
    was_prepared: bool,
}

impl ConstraintSolver {
    /// Creates a new constraint solver with the given configuration
    /// parameters.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: ConstraintSolverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            bodies: Vec::new(),
            body_index_map: KeyIndexMapper::new(),
            point_joints: ConstraintCache::new(),
            distance_joints: ConstraintCache::new(),
            config,
        })
    }

    pub fn config(&self) -> &ConstraintSolverConfig {
        &self.config
    }

    pub fn prepared_joint_count(&self) -> usize {
        self.point_joints.constraints().len() + self.distance_joints.constraints().len()
    }

    pub fn prepared_body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Whether any constraints were prepared for the current substep.
    pub fn has_prepared_constraints(&self) -> bool {
        self.prepared_joint_count() > 0
    }

    /// Prepares the given pin joint for solution. The states of the involved
    /// rigid bodies will be fetched and cached.
    pub fn prepare_pin_joint(
        &mut self,
        rigid_body_manager: &RigidBodyManager,
        id: JointID,
        joint: &Joint,
        pin: &PinJoint,
    ) {
        let Some((body_a_idx, body_b_idx)) =
            self.prepare_body_pair(rigid_body_manager, joint.body_a, joint.body_b)
        else {
            return;
        };
        let body_a = &self.bodies[body_a_idx];
        let body_b = &self.bodies[body_b_idx];

        match pin.rest_length {
            Some(rest_length) if !pin.is_point_constraint() => {
                if let Some(prepared_joint) = PreparedDistanceJoint::prepare(
                    body_a,
                    body_b,
                    &joint.anchor_a,
                    &joint.anchor_b,
                    rest_length,
                ) {
                    self.distance_joints.register_prepared_constraint(
                        id,
                        BodyPairConstraint::new(body_a_idx, body_b_idx, prepared_joint),
                        self.config.old_impulse_weight,
                    );
                }
            }
            _ => {
                let prepared_joint =
                    PreparedPointJoint::prepare(body_a, body_b, &joint.anchor_a, &joint.anchor_b);
                self.point_joints.register_prepared_constraint(
                    id,
                    BodyPairConstraint::new(body_a_idx, body_b_idx, prepared_joint),
                    self.config.old_impulse_weight,
                );
            }
        }
    }

    /// Removes any constraints cached from the previous solve that have not
    /// been re-prepared for the next solve. This should always be called
    /// before [`Self::compute_constrained_velocities`] after preparing all
    /// active constraints.
    pub fn remove_unprepared_constraints(&mut self) {
        self.point_joints
            .remove_unprepared_constraints_and_reset_flags();
        self.distance_joints
            .remove_unprepared_constraints_and_reset_flags();
    }

    /// Updates the velocities of all prepared constrained bodies to match those
    /// of their associated rigid body in the [`RigidBodyManager`]. This should
    /// be called after advancing the rigid body velocities (but not
    /// configurations) based on the non-constraint forces.
    pub fn synchronize_prepared_constrained_body_velocities(
        &mut self,
        rigid_body_manager: &RigidBodyManager,
    ) {
        for (rigid_body_id, constrained_body) in
            self.body_index_map.key_at_each_idx().zip(&mut self.bodies)
        {
            if let TypedRigidBodyID::Dynamic(id) = rigid_body_id {
                let Some(rigid_body) = rigid_body_manager.get_dynamic_rigid_body(id) else {
                    continue;
                };
                constrained_body.velocity = rigid_body.compute_velocity();
                constrained_body.angular_velocity = rigid_body.compute_angular_velocity();
            }
        }
    }

    /// Tries to solve all prepared velocity constraints as follows:
    /// - Go though each constraint.
    /// - Compute the impulses that must be applied to the involved bodies for
    ///   their velocities to satisfy that constraint in isolation.
    /// - Update the velocities of the involved bodies with these impulses.
    /// - After doing this for each constraint, go back and repeat for a fixed
    ///   number of iterations.
    ///
    /// To speed up convergence, the weighted final impulses from the previous
    /// substep are applied to the involved bodies before starting.
    pub fn compute_constrained_velocities(&mut self) {
        apply_warm_impulses_for_body_pair_constraints(
            &mut self.bodies,
            self.point_joints.constraints(),
        );
        apply_warm_impulses_for_body_pair_constraints(
            &mut self.bodies,
            self.distance_joints.constraints(),
        );

        for _ in 0..self.config.n_iterations {
            apply_impulses_sequentially_for_body_pair_constraints(
                &mut self.bodies,
                self.point_joints.constraints_mut(),
            );
            apply_impulses_sequentially_for_body_pair_constraints(
                &mut self.bodies,
                self.distance_joints.constraints_mut(),
            );
        }
    }

    /// Tries to correct the configurations of the bodies for all prepared
    /// constraints by repeatedly applying pseudo impulses (changes in position
    /// and orientation) for each constraint in isolation.
    pub fn compute_corrected_configurations(&mut self) {
        for _ in 0..self.config.n_positional_correction_iterations {
            apply_positional_corrections_sequentially_for_body_pair_constraints(
                &mut self.bodies,
                self.point_joints.constraints(),
                self.config.positional_correction_factor,
            );
            apply_positional_corrections_sequentially_for_body_pair_constraints(
                &mut self.bodies,
                self.distance_joints.constraints(),
                self.config.positional_correction_factor,
            );
        }
    }

    /// Updates the velocities and configurations of the dynamic rigid bodies
    /// to match the solved velocities and configurations. Static bodies are
    /// never modified.
    pub fn apply_constrained_velocities_and_corrected_configurations(
        &self,
        rigid_body_manager: &mut RigidBodyManager,
    ) {
        for (rigid_body_id, constrained_body) in
            self.body_index_map.key_at_each_idx().zip(&self.bodies)
        {
            let TypedRigidBodyID::Dynamic(id) = rigid_body_id else {
                continue;
            };
            let Some(rigid_body) = rigid_body_manager.get_dynamic_rigid_body_mut(id) else {
                continue;
            };
            rigid_body.set_position(constrained_body.position);
            rigid_body.set_orientation(constrained_body.orientation);
            rigid_body.synchronize_momentum(&constrained_body.velocity);
            rigid_body.synchronize_angular_momentum(constrained_body.angular_velocity);
        }
    }

    /// Synchronizes body velocities, solves all prepared constraints and
    /// writes the result back to the dynamic rigid bodies. Should be called
    /// after advancing the momenta and before advancing the configurations.
    pub fn compute_and_apply_constrained_state(
        &mut self,
        rigid_body_manager: &mut RigidBodyManager,
    ) {
        self.synchronize_prepared_constrained_body_velocities(rigid_body_manager);
        self.compute_constrained_velocities();
        self.compute_corrected_configurations();
        self.apply_constrained_velocities_and_corrected_configurations(rigid_body_manager);
    }

    /// Clears all constrained bodies cached from the previous solve. This
    /// should always be done before starting to prepare constraints for the
    /// next solve.
    pub fn clear_prepared_bodies(&mut self) {
        self.bodies.clear();
        self.body_index_map.clear();
    }

    fn prepare_body_pair(
        &mut self,
        rigid_body_manager: &RigidBodyManager,
        rigid_body_a_id: TypedRigidBodyID,
        rigid_body_b_id: TypedRigidBodyID,
    ) -> Option<(usize, usize)> {
        let body_a_idx = self.prepare_body(rigid_body_manager, rigid_body_a_id)?;
        let body_b_idx = self.prepare_body(rigid_body_manager, rigid_body_b_id)?;
        (body_a_idx != body_b_idx).then_some((body_a_idx, body_b_idx))
    }

    fn prepare_body(
        &mut self,
        rigid_body_manager: &RigidBodyManager,
        rigid_body_id: TypedRigidBodyID,
    ) -> Option<usize> {
        if let Some(body_idx) = self.body_index_map.get(rigid_body_id) {
            return Some(body_idx);
        }

        let constrained_body = match rigid_body_id {
            TypedRigidBodyID::Dynamic(id) => {
                let rigid_body = rigid_body_manager.get_dynamic_rigid_body(id)?;
                ConstrainedBody::from_dynamic_rigid_body(rigid_body)
            }
            TypedRigidBodyID::Static(id) => {
                let rigid_body = rigid_body_manager.get_static_rigid_body(id)?;
                ConstrainedBody::from_static_rigid_body(rigid_body)
            }
        };

        let body_idx = self.body_index_map.push_key(rigid_body_id).ok()?;
        self.bodies.push(constrained_body);

        Some(body_idx)
    }
}

impl ConstraintSolverConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.old_impulse_weight) {
            bail!(
                "Invalid old impulse weight for constraint solver: {}",
                self.old_impulse_weight
            );
        }
        if !(0.0..=1.0).contains(&self.positional_correction_factor) {
            bail!(
                "Invalid positional correction factor for constraint solver: {}",
                self.positional_correction_factor
            );
        }
        Ok(())
    }
}

impl Default for ConstraintSolverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            n_iterations: 8,
            old_impulse_weight: 0.4,
            n_positional_correction_iterations: 3,
            positional_correction_factor: 0.2,
        }
    }
}

impl<K, C> ConstraintCache<K, C>
where
    K: fmt::Debug + Copy + Eq + Hash,
    C: PreparedTwoBodyConstraint,
{
    fn new() -> Self {
        Self {
            constraints: Vec::new(),
            constraint_index_map: KeyIndexMapper::new(),
        }
    }

    fn constraints(&self) -> &[BodyPairConstraint<C>] {
        &self.constraints
    }

    fn constraints_mut(&mut self) -> &mut [BodyPairConstraint<C>] {
        &mut self.constraints
    }

    fn register_prepared_constraint(
        &mut self,
        key: K,
        prepared_constraint: BodyPairConstraint<C>,
        old_impulse_weight: fph,
    ) {
        if let Some(idx) = self.constraint_index_map.get(key) {
            // We know this constraint from the previous substep
            let old_constraint = &self.constraints[idx];

            // If the geometry has not changed significantly, the weighted
            // impulses from the previous solve are a good initial guess
            let warm_impulses = prepared_constraint
                .can_use_warm_impulses_from(old_constraint)
                .then(|| old_constraint.accumulated_impulses * old_impulse_weight);

            self.constraints[idx] = match warm_impulses {
                Some(impulses) => prepared_constraint.with_accumulated_impulses(impulses),
                None => prepared_constraint,
            };
        } else if self.constraint_index_map.push_key(key).is_ok() {
            self.constraints.push(prepared_constraint);
        }
    }

    fn remove_unprepared_constraints_and_reset_flags(&mut self) {
        let mut idx = 0;
        while idx < self.constraints.len() {
            let constraint = &mut self.constraints[idx];
            if constraint.was_prepared {
                constraint.was_prepared = false;
                idx += 1;
            } else {
                self.constraints.swap_remove(idx);
                // The index is in bounds, since the lengths always agree
                let _ = self.constraint_index_map.swap_remove_key_at_idx(idx);
            }
        }
    }
}

impl<C: PreparedTwoBodyConstraint> BodyPairConstraint<C> {
    fn new(body_a_idx: usize, body_b_idx: usize, constraint: C) -> Self {
        Self {
            body_a_idx,
            body_b_idx,
            constraint,
            accumulated_impulses: Zero::zero(),
            was_prepared: true,
        }
    }

    fn with_accumulated_impulses(mut self, accumulated_impulses: C::Impulses) -> Self {
        self.accumulated_impulses = accumulated_impulses;
        self
    }
}

impl<C: PreparedTwoBodyConstraint> Deref for BodyPairConstraint<C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        &self.constraint
    }
}

impl<C: PreparedTwoBodyConstraint> DerefMut for BodyPairConstraint<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.constraint
    }
}

fn apply_warm_impulses_for_body_pair_constraints<P: PreparedTwoBodyConstraint>(
    bodies: &mut [ConstrainedBody],
    constraints: &[BodyPairConstraint<P>],
) {
    for constraint in constraints {
        let (body_a, body_b) =
            two_mutable_elements(bodies, constraint.body_a_idx, constraint.body_b_idx);

        constraint.apply_impulses_to_body_pair(body_a, body_b, constraint.accumulated_impulses);
    }
}

fn apply_impulses_sequentially_for_body_pair_constraints<P: PreparedTwoBodyConstraint>(
    bodies: &mut [ConstrainedBody],
    constraints: &mut [BodyPairConstraint<P>],
) {
    for constraint in constraints {
        let (body_a, body_b) =
            two_mutable_elements(bodies, constraint.body_a_idx, constraint.body_b_idx);

        // Pins are equality constraints, so the corrective impulses are
        // accumulated without clamping
        let corrective_impulses = constraint.compute_impulses(body_a, body_b);
        constraint.accumulated_impulses = constraint.accumulated_impulses + corrective_impulses;

        constraint.apply_impulses_to_body_pair(body_a, body_b, corrective_impulses);
    }
}

fn apply_positional_corrections_sequentially_for_body_pair_constraints<
    P: PreparedTwoBodyConstraint,
>(
    bodies: &mut [ConstrainedBody],
    constraints: &[BodyPairConstraint<P>],
    correction_factor: fph,
) {
    for constraint in constraints {
        let (body_a, body_b) =
            two_mutable_elements(bodies, constraint.body_a_idx, constraint.body_b_idx);

        constraint.apply_positional_correction_to_body_pair(body_a, body_b, correction_factor);
    }
}

fn two_mutable_elements<T>(values: &mut [T], idx_a: usize, idx_b: usize) -> (&mut T, &mut T) {
    assert_ne!(idx_a, idx_b);

    if idx_b > idx_a {
        let (left, right) = values.split_at_mut(idx_b);
        (&mut left[idx_a], &mut right[0])
    } else {
        let (left, right) = values.split_at_mut(idx_a);
        (&mut right[0], &mut left[idx_b])
    }
}
