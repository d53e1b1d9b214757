//! Rigid pin joints.
//!
//! A pin keeps its two anchors at a fixed distance. A pin whose rest length
//! is at most [`MIN_SEPARATION`] holds the anchors together. It is solved as
//! a point constraint along both world axes, since the direction between
//! coincident anchors is undefined.

use super::{ConstrainedBody, MIN_SEPARATION, PreparedTwoBodyConstraint};
use crate::{
    fph,
    quantities::{self, Displacement, Impulse, Position},
};
use nalgebra::{Matrix2, UnitVector2, Vector2};

/// Anchor directions of two consecutive substeps must be at least this
/// aligned for the accumulated impulse of one to warm start the other.
const MIN_WARM_START_ALIGNMENT: fph = 0.9;

/// A rigid pin between two anchors.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PinJoint {
    /// The distance at which the anchors are held. If [`None`], the distance
    /// between the anchors when the joint is added is used.
    pub rest_length: Option<fph>,
}

/// A pin holding its anchors together, prepared for the current substep.
#[derive(Clone, Debug)]
pub(super) struct PreparedPointJoint {
    local_anchor_a: Position,
    local_anchor_b: Position,
    lever_arm_a: Displacement,
    lever_arm_b: Displacement,
    effective_mass: Matrix2<fph>,
}

/// A pin holding its anchors at a nonzero distance, prepared for the current
/// substep.
#[derive(Clone, Debug)]
pub(super) struct PreparedDistanceJoint {
    local_anchor_a: Position,
    local_anchor_b: Position,
    rest_length: fph,
    lever_arm_a: Displacement,
    lever_arm_b: Displacement,
    direction: UnitVector2<fph>,
    effective_mass: fph,
}

impl PinJoint {
    /// Creates a pin with the given rest length.
    pub fn new(rest_length: fph) -> Self {
        Self {
            rest_length: Some(rest_length),
        }
    }

    /// Creates a pin that holds the anchors at the distance they have when
    /// the joint is added.
    pub fn at_initial_separation() -> Self {
        Self { rest_length: None }
    }

    /// Whether the pin holds its anchors together rather than at a distance.
    pub fn is_point_constraint(&self) -> bool {
        self.rest_length
            .is_none_or(|rest_length| rest_length <= MIN_SEPARATION)
    }
}

impl PreparedPointJoint {
    pub(super) fn prepare(
        body_a: &ConstrainedBody,
        body_b: &ConstrainedBody,
        local_anchor_a: &Position,
        local_anchor_b: &Position,
    ) -> Self {
        let lever_arm_a = body_a.compute_lever_arm(local_anchor_a);
        let lever_arm_b = body_b.compute_lever_arm(local_anchor_b);
        Self {
            local_anchor_a: *local_anchor_a,
            local_anchor_b: *local_anchor_b,
            lever_arm_a,
            lever_arm_b,
            effective_mass: compute_point_effective_mass(
                body_a,
                body_b,
                &lever_arm_a,
                &lever_arm_b,
            ),
        }
    }
}

impl PreparedTwoBodyConstraint for PreparedPointJoint {
    type Impulses = Impulse;

    fn can_use_warm_impulses_from(&self, _other: &Self) -> bool {
        true
    }

    fn compute_impulses(&self, body_a: &ConstrainedBody, body_b: &ConstrainedBody) -> Impulse {
        let relative_velocity = body_b.compute_point_velocity(&self.lever_arm_b)
            - body_a.compute_point_velocity(&self.lever_arm_a);
        -(self.effective_mass * relative_velocity)
    }

    fn apply_impulses_to_body_pair(
        &self,
        body_a: &mut ConstrainedBody,
        body_b: &mut ConstrainedBody,
        impulse: Impulse,
    ) {
        body_a.apply_impulse(&(-impulse), &self.lever_arm_a);
        body_b.apply_impulse(&impulse, &self.lever_arm_b);
    }

    fn apply_positional_correction_to_body_pair(
        &self,
        body_a: &mut ConstrainedBody,
        body_b: &mut ConstrainedBody,
        correction_factor: fph,
    ) {
        let lever_arm_a = body_a.compute_lever_arm(&self.local_anchor_a);
        let lever_arm_b = body_b.compute_lever_arm(&self.local_anchor_b);

        let anchor_offset =
            (body_b.position + lever_arm_b) - (body_a.position + lever_arm_a);

        let effective_mass =
            compute_point_effective_mass(body_a, body_b, &lever_arm_a, &lever_arm_b);

        let pseudo_impulse = -(effective_mass * anchor_offset) * correction_factor;

        body_a.apply_pseudo_impulse(&(-pseudo_impulse), &lever_arm_a);
        body_b.apply_pseudo_impulse(&pseudo_impulse, &lever_arm_b);
    }
}

impl PreparedDistanceJoint {
    /// Returns [`None`] if the anchors are too close for the direction
    /// between them to be defined.
    pub(super) fn prepare(
        body_a: &ConstrainedBody,
        body_b: &ConstrainedBody,
        local_anchor_a: &Position,
        local_anchor_b: &Position,
        rest_length: fph,
    ) -> Option<Self> {
        let lever_arm_a = body_a.compute_lever_arm(local_anchor_a);
        let lever_arm_b = body_b.compute_lever_arm(local_anchor_b);

        let (direction, _) = UnitVector2::try_new_and_get(
            (body_b.position + lever_arm_b) - (body_a.position + lever_arm_a),
            MIN_SEPARATION,
        )?;

        Some(Self {
            local_anchor_a: *local_anchor_a,
            local_anchor_b: *local_anchor_b,
            rest_length,
            lever_arm_a,
            lever_arm_b,
            direction,
            effective_mass: compute_axial_effective_mass(
                body_a,
                body_b,
                &lever_arm_a,
                &lever_arm_b,
                &direction,
            ),
        })
    }
}

impl PreparedTwoBodyConstraint for PreparedDistanceJoint {
    type Impulses = fph;

    fn can_use_warm_impulses_from(&self, other: &Self) -> bool {
        self.direction.dot(&other.direction) >= MIN_WARM_START_ALIGNMENT
    }

    fn compute_impulses(&self, body_a: &ConstrainedBody, body_b: &ConstrainedBody) -> fph {
        let relative_velocity = body_b.compute_point_velocity(&self.lever_arm_b)
            - body_a.compute_point_velocity(&self.lever_arm_a);
        -self.effective_mass * relative_velocity.dot(&self.direction)
    }

    fn apply_impulses_to_body_pair(
        &self,
        body_a: &mut ConstrainedBody,
        body_b: &mut ConstrainedBody,
        impulse: fph,
    ) {
        let impulse = impulse * self.direction.as_ref();
        body_a.apply_impulse(&(-impulse), &self.lever_arm_a);
        body_b.apply_impulse(&impulse, &self.lever_arm_b);
    }

    fn apply_positional_correction_to_body_pair(
        &self,
        body_a: &mut ConstrainedBody,
        body_b: &mut ConstrainedBody,
        correction_factor: fph,
    ) {
        let lever_arm_a = body_a.compute_lever_arm(&self.local_anchor_a);
        let lever_arm_b = body_b.compute_lever_arm(&self.local_anchor_b);

        let Some((direction, separation)) = UnitVector2::try_new_and_get(
            (body_b.position + lever_arm_b) - (body_a.position + lever_arm_a),
            MIN_SEPARATION,
        ) else {
            return;
        };

        let effective_mass =
            compute_axial_effective_mass(body_a, body_b, &lever_arm_a, &lever_arm_b, &direction);

        let length_error = separation - self.rest_length;
        let pseudo_impulse =
            (-effective_mass * length_error * correction_factor) * direction.as_ref();

        body_a.apply_pseudo_impulse(&(-pseudo_impulse), &lever_arm_a);
        body_b.apply_pseudo_impulse(&pseudo_impulse, &lever_arm_b);
    }
}

/// Computes the inverse of the 2x2 matrix mapping an impulse applied
/// oppositely at the two lever arms to the change in relative anchor
/// velocity. Gives zero if the matrix is singular.
fn compute_point_effective_mass(
    body_a: &ConstrainedBody,
    body_b: &ConstrainedBody,
    lever_arm_a: &Displacement,
    lever_arm_b: &Displacement,
) -> Matrix2<fph> {
    let perp_a = Vector2::new(-lever_arm_a.y, lever_arm_a.x);
    let perp_b = Vector2::new(-lever_arm_b.y, lever_arm_b.x);

    let inverse_effective_mass = Matrix2::identity() * (body_a.inverse_mass + body_b.inverse_mass)
        + perp_a * perp_a.transpose() * body_a.inverse_moment_of_inertia
        + perp_b * perp_b.transpose() * body_b.inverse_moment_of_inertia;

    inverse_effective_mass
        .try_inverse()
        .unwrap_or_else(Matrix2::zeros)
}

/// Computes the effective mass of the two bodies for an impulse along the
/// given direction applied oppositely at the two lever arms. Gives zero if
/// both bodies are immovable.
fn compute_axial_effective_mass(
    body_a: &ConstrainedBody,
    body_b: &ConstrainedBody,
    lever_arm_a: &Displacement,
    lever_arm_b: &Displacement,
    direction: &UnitVector2<fph>,
) -> fph {
    let arm_a_cross_direction = quantities::cross(lever_arm_a, direction);
    let arm_b_cross_direction = quantities::cross(lever_arm_b, direction);

    let inverse_effective_mass = body_a.inverse_mass
        + body_b.inverse_mass
        + body_a.inverse_moment_of_inertia * arm_a_cross_direction.powi(2)
        + body_b.inverse_moment_of_inertia * arm_b_cross_direction.powi(2);

    if inverse_effective_mass > 0.0 {
        inverse_effective_mass.recip()
    } else {
        0.0
    }
}
