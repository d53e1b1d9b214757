//! Physical quantities in the plane.
//!
//! The world is two-dimensional with the y-axis pointing up. Rotations are
//! counterclockwise, so angular quantities are plain scalars (the z-component
//! of the corresponding 3D vector).

use crate::fph;
use nalgebra::{Point2, UnitComplex, Vector2};

/// A position in the plane.
pub type Position = Point2<fph>;

/// A displacement in the plane.
pub type Displacement = Vector2<fph>;

/// A velocity in the plane.
pub type Velocity = Vector2<fph>;

/// An orientation in the plane.
pub type Orientation = UnitComplex<fph>;

/// A momentum in the plane.
pub type Momentum = Vector2<fph>;

/// An acceleration in the plane.
pub type Acceleration = Vector2<fph>;

/// A force in the plane.
pub type Force = Vector2<fph>;

/// An impulse (momentum change) in the plane.
pub type Impulse = Vector2<fph>;

/// An angular velocity about the axis normal to the plane [rad/s].
pub type AngularVelocity = fph;

/// An angular momentum about the axis normal to the plane.
pub type AngularMomentum = fph;

/// A torque about the axis normal to the plane.
pub type Torque = fph;

/// Computes the scalar (z-component) cross product of two planar vectors.
#[inline]
pub fn cross(a: &Vector2<fph>, b: &Vector2<fph>) -> fph {
    a.x * b.y - a.y * b.x
}

/// Computes the cross product of an angular velocity (along the plane normal)
/// with a planar vector, which is the velocity of a point at displacement
/// `disp` from the rotation center.
#[inline]
pub fn angular_cross(angular_velocity: AngularVelocity, disp: &Vector2<fph>) -> Vector2<fph> {
    Vector2::new(-angular_velocity * disp.y, angular_velocity * disp.x)
}
