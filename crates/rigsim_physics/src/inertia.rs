//! Computation and representation of inertia-related properties.

use crate::fph;
use anyhow::{Result, bail};

/// The inertia-related properties of a planar rigid body: its mass and its
/// moment of inertia about the axis through the center of mass normal to the
/// plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InertialProperties {
    mass: fph,
    moment_of_inertia: fph,
}

impl InertialProperties {
    /// Creates a new set of inertial properties.
    ///
    /// # Errors
    /// Returns an error if the mass or moment of inertia is not a positive
    /// finite number.
    pub fn new(mass: fph, moment_of_inertia: fph) -> Result<Self> {
        if !(mass.is_finite() && mass > 0.0) {
            bail!("Invalid mass for rigid body: {mass}");
        }
        if !(moment_of_inertia.is_finite() && moment_of_inertia > 0.0) {
            bail!("Invalid moment of inertia for rigid body: {moment_of_inertia}");
        }
        Ok(Self {
            mass,
            moment_of_inertia,
        })
    }

    /// Computes the inertial properties of a uniformly dense rectangular box
    /// with the given mass and full extents.
    ///
    /// # Errors
    /// Returns an error if the mass is not a positive finite number or if
    /// either extent is not a positive finite number.
    pub fn of_uniform_box(mass: fph, width: fph, height: fph) -> Result<Self> {
        if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
            bail!("Invalid extents for box body: {width} x {height}");
        }
        Self::new(mass, compute_box_moment_of_inertia(mass, width, height))
    }

    /// Returns the mass.
    pub fn mass(&self) -> fph {
        self.mass
    }

    /// Returns the moment of inertia about the center of mass.
    pub fn moment_of_inertia(&self) -> fph {
        self.moment_of_inertia
    }
}

/// Computes the moment of inertia of a uniformly dense rectangle with the
/// given mass and full extents about its center.
pub fn compute_box_moment_of_inertia(mass: fph, width: fph, height: fph) -> fph {
    mass * (width.powi(2) + height.powi(2)) / 12.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn box_moment_of_inertia_matches_formula() {
        let properties = InertialProperties::of_uniform_box(100.0, 500.0, 40.0).unwrap();
        assert_abs_diff_eq!(properties.mass(), 100.0);
        assert_abs_diff_eq!(
            properties.moment_of_inertia(),
            100.0 * (500.0 * 500.0 + 40.0 * 40.0) / 12.0
        );
    }

    #[test]
    fn square_moment_of_inertia_is_sixth_of_mass_times_side_squared() {
        assert_abs_diff_eq!(compute_box_moment_of_inertia(6.0, 2.0, 2.0), 4.0);
    }

    #[test]
    fn zero_or_negative_mass_is_rejected() {
        assert!(InertialProperties::new(0.0, 1.0).is_err());
        assert!(InertialProperties::new(-1.0, 1.0).is_err());
        assert!(InertialProperties::new(fph::NAN, 1.0).is_err());
    }

    #[test]
    fn zero_moment_of_inertia_is_rejected() {
        assert!(InertialProperties::new(1.0, 0.0).is_err());
    }

    #[test]
    fn degenerate_box_is_rejected() {
        assert!(InertialProperties::of_uniform_box(1.0, 0.0, 1.0).is_err());
        assert!(InertialProperties::of_uniform_box(1.0, 1.0, fph::INFINITY).is_err());
    }
}
