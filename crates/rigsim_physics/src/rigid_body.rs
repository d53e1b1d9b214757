//! Rigid body simulation.

use crate::{
    fph,
    inertia::InertialProperties,
    quantities::{
        self, AngularMomentum, AngularVelocity, Force, Momentum, Orientation, Position, Torque,
        Velocity,
    },
};
use anyhow::{Result, anyhow, bail};
use approx::AbsDiffEq;
use bytemuck::{Pod, Zeroable};
use nalgebra::{UnitComplex, Vector2};
use rigsim_containers::KeyIndexMapper;
use std::fmt;

/// Identifier for a [`DynamicRigidBody`].
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Zeroable, Pod)]
pub struct DynamicRigidBodyID(u64);

/// Identifier for a [`StaticRigidBody`].
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Zeroable, Pod)]
pub struct StaticRigidBodyID(u64);

/// Identifier for a [`DynamicRigidBody`] or [`StaticRigidBody`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypedRigidBodyID {
    Dynamic(DynamicRigidBodyID),
    Static(StaticRigidBodyID),
}

/// Manages and operates on dynamic and static rigid bodies.
///
/// Bodies are never removed, so an ID stays valid for the lifetime of the
/// manager.
#[derive(Clone, Debug)]
pub struct RigidBodyManager {
    dynamic_bodies: Vec<DynamicRigidBody>,
    static_bodies: Vec<StaticRigidBody>,
    dynamic_body_indices_by_id: KeyIndexMapper<DynamicRigidBodyID>,
    static_body_indices_by_id: KeyIndexMapper<StaticRigidBodyID>,
    dynamic_body_id_counter: u64,
    static_body_id_counter: u64,
}

/// A rigid body whose motion is affected by the force and torque it experiences
/// as well as its inertial properties.
///
/// The body stores its linear and angular momentum rather than its linear and
/// angular velocity, since these are the quantities changed directly by
/// forces and torques. The velocities are derived from them.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DynamicRigidBody {
    inertial_properties: InertialProperties,
    position: Position,
    orientation: Orientation,
    momentum: Momentum,
    angular_momentum: AngularMomentum,
    total_force: Force,
    total_torque: Torque,
}

/// A rigid body that never moves. It behaves as if it had infinite mass and
/// moment of inertia, and is not affected by forces or constraints.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StaticRigidBody {
    position: Position,
    orientation: Orientation,
}

/// The world space position and velocity of a point attached to a rigid body.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AttachedPointState {
    pub position: Position,
    pub velocity: Velocity,
}

impl fmt::Display for DynamicRigidBodyID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dynamic body {}", self.0)
    }
}

impl fmt::Display for StaticRigidBodyID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "static body {}", self.0)
    }
}

impl fmt::Display for TypedRigidBodyID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dynamic(id) => id.fmt(f),
            Self::Static(id) => id.fmt(f),
        }
    }
}

impl From<DynamicRigidBodyID> for TypedRigidBodyID {
    fn from(id: DynamicRigidBodyID) -> Self {
        Self::Dynamic(id)
    }
}

impl From<StaticRigidBodyID> for TypedRigidBodyID {
    fn from(id: StaticRigidBodyID) -> Self {
        Self::Static(id)
    }
}

impl TypedRigidBodyID {
    /// Whether this identifies a dynamic body.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic(_))
    }
}

impl RigidBodyManager {
    pub fn new() -> Self {
        Self {
            dynamic_bodies: Vec::new(),
            static_bodies: Vec::new(),
            dynamic_body_indices_by_id: KeyIndexMapper::default(),
            static_body_indices_by_id: KeyIndexMapper::default(),
            dynamic_body_id_counter: 0,
            static_body_id_counter: 0,
        }
    }

    /// Returns a reference to the [`DynamicRigidBody`] with the given
    /// ID, or [`None`] if it does not exist.
    pub fn get_dynamic_rigid_body(&self, id: DynamicRigidBodyID) -> Option<&DynamicRigidBody> {
        let idx = self.dynamic_body_indices_by_id.get(id)?;
        Some(&self.dynamic_bodies[idx])
    }

    /// Returns a mutable reference to the [`DynamicRigidBody`] with the given
    /// ID, or [`None`] if it does not exist.
    pub fn get_dynamic_rigid_body_mut(
        &mut self,
        id: DynamicRigidBodyID,
    ) -> Option<&mut DynamicRigidBody> {
        let idx = self.dynamic_body_indices_by_id.get(id)?;
        Some(&mut self.dynamic_bodies[idx])
    }

    /// Returns a reference to the [`StaticRigidBody`] with the given
    /// ID, or [`None`] if it does not exist.
    pub fn get_static_rigid_body(&self, id: StaticRigidBodyID) -> Option<&StaticRigidBody> {
        let idx = self.static_body_indices_by_id.get(id)?;
        Some(&self.static_bodies[idx])
    }

    /// Whether a body with the given ID exists.
    pub fn contains(&self, id: TypedRigidBodyID) -> bool {
        match id {
            TypedRigidBodyID::Dynamic(id) => self.dynamic_body_indices_by_id.contains_key(id),
            TypedRigidBodyID::Static(id) => self.static_body_indices_by_id.contains_key(id),
        }
    }

    /// Returns the position and orientation of the body with the given ID, or
    /// [`None`] if it does not exist.
    pub fn get_configuration(&self, id: TypedRigidBodyID) -> Option<(Position, Orientation)> {
        match id {
            TypedRigidBodyID::Dynamic(id) => self
                .get_dynamic_rigid_body(id)
                .map(|body| (body.position, body.orientation)),
            TypedRigidBodyID::Static(id) => self
                .get_static_rigid_body(id)
                .map(|body| (body.position, body.orientation)),
        }
    }

    /// Computes the world space position and velocity of the given point
    /// (in the body's local frame) attached to the body with the given ID, or
    /// returns [`None`] if the body does not exist.
    pub fn compute_attached_point_state(
        &self,
        id: TypedRigidBodyID,
        local_point: &Position,
    ) -> Option<AttachedPointState> {
        match id {
            TypedRigidBodyID::Dynamic(id) => {
                let body = self.get_dynamic_rigid_body(id)?;
                let position = body.transform_point_from_body_to_world_space(local_point);
                let velocity = body.compute_velocity_of_attached_world_space_point(&position);
                Some(AttachedPointState { position, velocity })
            }
            TypedRigidBodyID::Static(id) => {
                let body = self.get_static_rigid_body(id)?;
                Some(AttachedPointState {
                    position: body.transform_point_from_body_to_world_space(local_point),
                    velocity: Velocity::zeros(),
                })
            }
        }
    }

    /// Returns the slice of all dynamic rigid bodies.
    pub fn dynamic_rigid_bodies(&self) -> &[DynamicRigidBody] {
        &self.dynamic_bodies
    }

    /// Returns the slice of all static rigid bodies.
    pub fn static_rigid_bodies(&self) -> &[StaticRigidBody] {
        &self.static_bodies
    }

    /// Returns the mutable slice of all dynamic rigid bodies.
    pub fn dynamic_rigid_bodies_mut(&mut self) -> &mut [DynamicRigidBody] {
        &mut self.dynamic_bodies
    }

    /// Adds the given [`DynamicRigidBody`] to the manager.
    ///
    /// # Returns
    /// A new [`DynamicRigidBodyID`] referring to the added body.
    ///
    /// # Errors
    /// Returns an error if the body's state is not finite or if the ID space
    /// is exhausted.
    pub fn add_dynamic_rigid_body(&mut self, body: DynamicRigidBody) -> Result<DynamicRigidBodyID> {
        if !body.has_finite_state() {
            bail!("Tried to add dynamic rigid body with non-finite state: {body:?}");
        }
        let id = DynamicRigidBodyID(self.dynamic_body_id_counter);
        self.dynamic_body_id_counter = self
            .dynamic_body_id_counter
            .checked_add(1)
            .ok_or_else(|| anyhow!("Ran out of dynamic rigid body IDs"))?;

        self.dynamic_body_indices_by_id.push_key(id)?;
        self.dynamic_bodies.push(body);

        Ok(id)
    }

    /// Adds the given [`StaticRigidBody`] to the manager.
    ///
    /// # Returns
    /// A new [`StaticRigidBodyID`] referring to the added body.
    ///
    /// # Errors
    /// Returns an error if the body's position is not finite or if the ID space
    /// is exhausted.
    pub fn add_static_rigid_body(&mut self, body: StaticRigidBody) -> Result<StaticRigidBodyID> {
        if !body.position.coords.iter().all(|coord| coord.is_finite()) {
            bail!("Tried to add static rigid body with non-finite position: {body:?}");
        }
        let id = StaticRigidBodyID(self.static_body_id_counter);
        self.static_body_id_counter = self
            .static_body_id_counter
            .checked_add(1)
            .ok_or_else(|| anyhow!("Ran out of static rigid body IDs"))?;

        self.static_body_indices_by_id.push_key(id)?;
        self.static_bodies.push(body);

        Ok(id)
    }

    /// Resets the total applied force and torque on all dynamic rigid bodies to
    /// zero.
    pub fn reset_all_forces_and_torques(&mut self) {
        for body in &mut self.dynamic_bodies {
            body.reset_force_and_torque();
        }
    }

    /// Advances the linear and angular momentum of all dynamic rigid bodies.
    pub fn advance_dynamic_rigid_body_momenta(&mut self, step_duration: fph) {
        for body in &mut self.dynamic_bodies {
            body.advance_momentum(step_duration);
            body.advance_angular_momentum(step_duration);
        }
    }

    /// Advances the position and orientation of all dynamic rigid bodies.
    pub fn advance_dynamic_rigid_body_configurations(&mut self, step_duration: fph) {
        for body in &mut self.dynamic_bodies {
            body.advance_position(step_duration);
            body.advance_orientation(step_duration);
        }
    }
}

impl Default for RigidBodyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicRigidBody {
    /// Creates a new dynamic rigid body with the given properties.
    pub fn new(
        inertial_properties: InertialProperties,
        position: Position,
        orientation: Orientation,
        velocity: Velocity,
        angular_velocity: AngularVelocity,
    ) -> Self {
        let momentum = velocity * inertial_properties.mass();
        let angular_momentum = angular_velocity * inertial_properties.moment_of_inertia();
        Self {
            inertial_properties,
            position,
            orientation,
            momentum,
            angular_momentum,
            total_force: Force::zeros(),
            total_torque: 0.0,
        }
    }

    /// Creates a new dynamic rigid body at rest in the given configuration.
    pub fn at_rest(
        inertial_properties: InertialProperties,
        position: Position,
        orientation: Orientation,
    ) -> Self {
        Self::new(
            inertial_properties,
            position,
            orientation,
            Velocity::zeros(),
            0.0,
        )
    }

    /// Returns the mass of the body.
    pub fn mass(&self) -> fph {
        self.inertial_properties.mass()
    }

    /// Returns the moment of inertia of the body about its center of mass.
    pub fn moment_of_inertia(&self) -> fph {
        self.inertial_properties.moment_of_inertia()
    }

    /// Returns the position of the body's center of mass.
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Returns the orientation of the body.
    pub fn orientation(&self) -> &Orientation {
        &self.orientation
    }

    /// Returns the linear momentum of the body.
    pub fn momentum(&self) -> &Momentum {
        &self.momentum
    }

    /// Returns the angular momentum of the body.
    pub fn angular_momentum(&self) -> AngularMomentum {
        self.angular_momentum
    }

    /// Computes the velocity of the body.
    pub fn compute_velocity(&self) -> Velocity {
        self.momentum / self.mass()
    }

    /// Computes the angular velocity of the body.
    pub fn compute_angular_velocity(&self) -> AngularVelocity {
        self.angular_momentum / self.moment_of_inertia()
    }

    /// Returns the current total force on the body.
    pub fn total_force(&self) -> &Force {
        &self.total_force
    }

    /// Returns the current total torque on the body around the center of mass.
    pub fn total_torque(&self) -> Torque {
        self.total_torque
    }

    /// Transforms a vector from the body-fixed frame to world space.
    pub fn transform_vector_from_body_to_world_space(&self, vector: &Vector2<fph>) -> Vector2<fph> {
        transform_vector_from_body_to_world_space(&self.orientation, vector)
    }

    /// Transforms a point from the body-fixed frame to world space.
    pub fn transform_point_from_body_to_world_space(&self, point: &Position) -> Position {
        transform_point_from_body_to_world_space(&self.position, &self.orientation, point)
    }

    /// Computes the velocity of the given world space point on the body due to
    /// the body's linear and rotational motion.
    pub fn compute_velocity_of_attached_world_space_point(&self, point: &Position) -> Velocity {
        compute_velocity_of_world_space_point_on_body(
            &self.position,
            &self.compute_velocity(),
            self.compute_angular_velocity(),
            point,
        )
    }

    /// Applies the given force at the body's center of mass.
    pub fn apply_force_at_center_of_mass(&mut self, force: &Force) {
        self.total_force += force;
    }

    /// Applies the given torque around the body's center of mass.
    pub fn apply_torque(&mut self, torque: Torque) {
        self.total_torque += torque;
    }

    /// Applies the given force at the given world space position. This may
    /// result in a torque around the center of mass.
    pub fn apply_force(&mut self, force: &Force, force_position: &Position) {
        self.apply_force_at_center_of_mass(force);
        self.apply_torque(quantities::cross(&(force_position - self.position), force));
    }

    /// Sets the given position for the body.
    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Sets the given orientation for the body.
    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    /// Recomputes the body's linear momentum according to the given
    /// velocity.
    pub fn synchronize_momentum(&mut self, velocity: &Velocity) {
        self.momentum = velocity * self.mass();
    }

    /// Recomputes the body's angular momentum according to the given angular
    /// velocity.
    pub fn synchronize_angular_momentum(&mut self, angular_velocity: AngularVelocity) {
        self.angular_momentum = angular_velocity * self.moment_of_inertia();
    }

    /// Advances the linear momentum of the body based on the total force
    /// applied to the body since the last reset.
    pub fn advance_momentum(&mut self, step_duration: fph) {
        self.momentum += self.total_force * step_duration;
    }

    /// Advances the angular momentum of the body based on the total torque
    /// applied to the body since the last reset.
    pub fn advance_angular_momentum(&mut self, step_duration: fph) {
        self.angular_momentum += self.total_torque * step_duration;
    }

    /// Advances the position of the body based on the current linear velocity.
    pub fn advance_position(&mut self, step_duration: fph) {
        let velocity = self.compute_velocity();
        self.position = advance_position(&self.position, &velocity, step_duration);
    }

    /// Advances the orientation of the body based on the current angular
    /// velocity.
    pub fn advance_orientation(&mut self, step_duration: fph) {
        let angular_velocity = self.compute_angular_velocity();
        self.orientation = advance_orientation(&self.orientation, angular_velocity, step_duration);
    }

    /// Resets the total applied force and torque to zero.
    pub fn reset_force_and_torque(&mut self) {
        self.total_force = Force::zeros();
        self.total_torque = 0.0;
    }

    fn has_finite_state(&self) -> bool {
        self.position.coords.iter().all(|coord| coord.is_finite())
            && self.orientation.angle().is_finite()
            && self.momentum.iter().all(|component| component.is_finite())
            && self.angular_momentum.is_finite()
    }
}

impl AbsDiffEq for DynamicRigidBody {
    type Epsilon = <fph as AbsDiffEq>::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        fph::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        fph::abs_diff_eq(&self.mass(), &other.mass(), epsilon)
            && fph::abs_diff_eq(
                &self.moment_of_inertia(),
                &other.moment_of_inertia(),
                epsilon,
            )
            && Position::abs_diff_eq(&self.position, &other.position, epsilon)
            && fph::abs_diff_eq(
                &self.orientation.angle(),
                &other.orientation.angle(),
                epsilon,
            )
            && Momentum::abs_diff_eq(&self.momentum, &other.momentum, epsilon)
            && fph::abs_diff_eq(&self.angular_momentum, &other.angular_momentum, epsilon)
    }
}

impl StaticRigidBody {
    /// Creates a new static rigid body with the given configuration.
    pub fn new(position: Position, orientation: Orientation) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Returns the position of the body.
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Returns the orientation of the body.
    pub fn orientation(&self) -> &Orientation {
        &self.orientation
    }

    /// Transforms a point from the body-fixed frame to world space.
    pub fn transform_point_from_body_to_world_space(&self, point: &Position) -> Position {
        transform_point_from_body_to_world_space(&self.position, &self.orientation, point)
    }
}

/// Transforms a vector from the body-fixed frame to world space.
pub fn transform_vector_from_body_to_world_space(
    body_orientation: &Orientation,
    vector: &Vector2<fph>,
) -> Vector2<fph> {
    body_orientation.transform_vector(vector)
}

/// Transforms a point from the body-fixed frame to world space.
pub fn transform_point_from_body_to_world_space(
    body_position: &Position,
    body_orientation: &Orientation,
    point: &Position,
) -> Position {
    body_position + body_orientation.transform_vector(&point.coords)
}

/// Computes the velocity of the given world space point on the body due to the
/// body's linear and rotational motion.
pub fn compute_velocity_of_world_space_point_on_body(
    body_position: &Position,
    body_velocity: &Velocity,
    body_angular_velocity: AngularVelocity,
    point: &Position,
) -> Velocity {
    body_velocity + quantities::angular_cross(body_angular_velocity, &(point - body_position))
}

/// Evolves the given [`Position`] linearly with the given [`Velocity`] for the
/// given duration.
pub fn advance_position(position: &Position, velocity: &Velocity, duration: fph) -> Position {
    position + velocity * duration
}

/// Evolves the given [`Orientation`] with the given [`AngularVelocity`] for the
/// given duration.
pub fn advance_orientation(
    orientation: &Orientation,
    angular_velocity: AngularVelocity,
    duration: fph,
) -> Orientation {
    UnitComplex::new(angular_velocity * duration) * orientation
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{point, vector};
    use proptest::prelude::*;
    use std::f64::consts::PI;

    prop_compose! {
        fn position_strategy(max_position_coord: fph)(
            position_coord_x in -max_position_coord..max_position_coord,
            position_coord_y in -max_position_coord..max_position_coord,
        ) -> Position {
            point![position_coord_x, position_coord_y]
        }
    }

    prop_compose! {
        fn orientation_strategy()(angle in -PI..PI) -> Orientation {
            Orientation::new(angle)
        }
    }

    fn dummy_inertial_properties() -> InertialProperties {
        InertialProperties::new(2.0, 3.0).unwrap()
    }

    fn dummy_body() -> DynamicRigidBody {
        DynamicRigidBody::at_rest(
            dummy_inertial_properties(),
            Position::origin(),
            Orientation::identity(),
        )
    }

    #[test]
    fn velocities_are_derived_from_momenta() {
        let body = DynamicRigidBody::new(
            dummy_inertial_properties(),
            Position::origin(),
            Orientation::identity(),
            vector![1.0, -2.0],
            0.5,
        );
        assert_abs_diff_eq!(body.momentum(), &vector![2.0, -4.0]);
        assert_abs_diff_eq!(body.angular_momentum(), 1.5);
        assert_abs_diff_eq!(body.compute_velocity(), vector![1.0, -2.0]);
        assert_abs_diff_eq!(body.compute_angular_velocity(), 0.5);
    }

    #[test]
    fn applying_force_at_center_of_mass_gives_no_torque() {
        let mut body = dummy_body();
        body.apply_force(&vector![1.0, 2.0], &Position::origin());
        assert_abs_diff_eq!(body.total_force(), &vector![1.0, 2.0]);
        assert_abs_diff_eq!(body.total_torque(), 0.0);
    }

    #[test]
    fn applying_upward_force_to_the_right_of_center_gives_counterclockwise_torque() {
        let mut body = dummy_body();
        body.apply_force(&vector![0.0, 3.0], &point![2.0, 0.0]);
        assert_abs_diff_eq!(body.total_torque(), 6.0);
    }

    #[test]
    fn resetting_force_and_torque_zeroes_them() {
        let mut body = dummy_body();
        body.apply_force(&vector![0.0, 3.0], &point![2.0, 0.0]);
        body.reset_force_and_torque();
        assert_abs_diff_eq!(body.total_force(), &Force::zeros());
        assert_abs_diff_eq!(body.total_torque(), 0.0);
    }

    #[test]
    fn advancing_momentum_then_position_is_semi_implicit_euler() {
        let mut body = dummy_body();
        body.apply_force_at_center_of_mass(&vector![0.0, -4.0]);
        body.advance_momentum(0.5);
        body.advance_position(0.5);
        assert_abs_diff_eq!(body.compute_velocity(), vector![0.0, -1.0]);
        assert_abs_diff_eq!(body.position(), &point![0.0, -0.5]);
    }

    #[test]
    fn advancing_orientation_rotates_by_angular_velocity_times_duration() {
        let mut body = DynamicRigidBody::new(
            dummy_inertial_properties(),
            Position::origin(),
            Orientation::new(0.1),
            Velocity::zeros(),
            2.0,
        );
        body.advance_orientation(0.25);
        assert_abs_diff_eq!(body.orientation().angle(), 0.6, epsilon = 1e-12);
    }

    #[test]
    fn manager_gives_distinct_ids_and_finds_bodies() {
        let mut manager = RigidBodyManager::new();
        let id_1 = manager.add_dynamic_rigid_body(dummy_body()).unwrap();
        let id_2 = manager.add_dynamic_rigid_body(dummy_body()).unwrap();
        let static_id = manager
            .add_static_rigid_body(StaticRigidBody::new(
                point![1.0, 1.0],
                Orientation::identity(),
            ))
            .unwrap();

        assert_ne!(id_1, id_2);
        assert!(manager.contains(id_1.into()));
        assert!(manager.contains(static_id.into()));
        assert!(manager.get_dynamic_rigid_body(id_2).is_some());
        assert_eq!(
            manager.get_static_rigid_body(static_id).unwrap().position(),
            &point![1.0, 1.0]
        );
    }

    #[test]
    fn manager_rejects_body_with_non_finite_position() {
        let mut manager = RigidBodyManager::new();
        let body = DynamicRigidBody::at_rest(
            dummy_inertial_properties(),
            point![fph::NAN, 0.0],
            Orientation::identity(),
        );
        assert!(manager.add_dynamic_rigid_body(body).is_err());
        assert!(
            manager
                .add_static_rigid_body(StaticRigidBody::new(
                    point![0.0, fph::INFINITY],
                    Orientation::identity()
                ))
                .is_err()
        );
    }

    #[test]
    fn static_point_state_has_zero_velocity() {
        let mut manager = RigidBodyManager::new();
        let id = manager
            .add_static_rigid_body(StaticRigidBody::new(
                point![1.0, 2.0],
                Orientation::new(PI / 2.0),
            ))
            .unwrap();
        let state = manager
            .compute_attached_point_state(id.into(), &point![1.0, 0.0])
            .unwrap();
        assert_abs_diff_eq!(state.position, point![1.0, 3.0], epsilon = 1e-12);
        assert_abs_diff_eq!(state.velocity, Velocity::zeros());
    }

    proptest! {
        #[test]
        fn transforming_body_origin_gives_body_position(
            position in position_strategy(1e3),
            orientation in orientation_strategy(),
        ) {
            let transformed = transform_point_from_body_to_world_space(
                &position,
                &orientation,
                &Position::origin(),
            );
            prop_assert!(abs_diff_eq_points(&transformed, &position));
        }

        #[test]
        fn transforming_point_preserves_distance_to_body_position(
            position in position_strategy(1e3),
            orientation in orientation_strategy(),
            point in position_strategy(1e2),
        ) {
            let transformed =
                transform_point_from_body_to_world_space(&position, &orientation, &point);
            prop_assert!(
                ((transformed - position).norm() - point.coords.norm()).abs() < 1e-9
            );
        }

        #[test]
        fn velocity_of_point_on_spinning_body_is_perpendicular_to_displacement(
            point in position_strategy(1e2),
            angular_velocity in -10.0..10.0,
        ) {
            let velocity = compute_velocity_of_world_space_point_on_body(
                &Position::origin(),
                &Velocity::zeros(),
                angular_velocity,
                &point,
            );
            prop_assert!(velocity.dot(&point.coords).abs() < 1e-9);
        }
    }

    fn abs_diff_eq_points(a: &Position, b: &Position) -> bool {
        (a - b).norm() < 1e-9
    }
}
