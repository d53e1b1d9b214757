//! Geometric shapes attached to rigid bodies.
//!
//! Shapes carry no collision response. They describe the extent of a body
//! for anchoring and presentation.

use crate::{
    fph,
    quantities::{Displacement, Position},
    rigid_body::{RigidBodyManager, TypedRigidBodyID},
};
use anyhow::{Result, anyhow, bail};
use bytemuck::{Pod, Zeroable};
use rigsim_containers::KeyIndexMapper;

/// Identifier for a [`Shape`] in a [`ShapeManager`].
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Zeroable, Pod)]
pub struct ShapeID(u64);

/// A rectangle centered on the origin of its body's local frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoxShape {
    /// The full extent along the local x-axis.
    pub width: fph,
    /// The full extent along the local y-axis.
    pub height: fph,
}

/// Surface properties of a shape.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SurfaceMaterial {
    /// The strength of friction against other surfaces.
    pub friction: fph,
    /// The elasticity of impacts, between 0 (fully inelastic) and 1 (fully
    /// elastic).
    pub elasticity: fph,
}

/// A [`BoxShape`] with a [`SurfaceMaterial`] attached to a rigid body.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Shape {
    pub rigid_body_id: TypedRigidBodyID,
    pub geometry: BoxShape,
    pub material: SurfaceMaterial,
}

/// Owner of all shapes in the simulation.
#[derive(Clone, Debug)]
pub struct ShapeManager {
    shapes: Vec<Shape>,
    shape_indices_by_id: KeyIndexMapper<ShapeID>,
    shape_id_counter: u64,
}

impl BoxShape {
    pub fn new(width: fph, height: fph) -> Self {
        Self { width, height }
    }

    /// Returns the half extents along the local x- and y-axis.
    pub fn half_extents(&self) -> Displacement {
        Displacement::new(0.5 * self.width, 0.5 * self.height)
    }

    /// Returns the center of the top edge in the body's local frame.
    pub fn top_center(&self) -> Position {
        Position::new(0.0, 0.5 * self.height)
    }

    /// Returns the center of the bottom edge in the body's local frame.
    pub fn bottom_center(&self) -> Position {
        Position::new(0.0, -0.5 * self.height)
    }

    /// Returns the corners in the body's local frame, counterclockwise from
    /// the bottom left.
    pub fn local_corners(&self) -> [Position; 4] {
        let half = self.half_extents();
        [
            Position::new(-half.x, -half.y),
            Position::new(half.x, -half.y),
            Position::new(half.x, half.y),
            Position::new(-half.x, half.y),
        ]
    }
}

impl SurfaceMaterial {
    pub fn new(friction: fph, elasticity: fph) -> Self {
        Self {
            friction,
            elasticity,
        }
    }
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        Self {
            friction: 0.5,
            elasticity: 0.0,
        }
    }
}

impl Shape {
    pub fn new(
        rigid_body_id: impl Into<TypedRigidBodyID>,
        geometry: BoxShape,
        material: SurfaceMaterial,
    ) -> Self {
        Self {
            rigid_body_id: rigid_body_id.into(),
            geometry,
            material,
        }
    }

    /// Computes the world space corners of the shape, or returns [`None`] if
    /// the body does not exist.
    pub fn compute_world_corners(
        &self,
        rigid_body_manager: &RigidBodyManager,
    ) -> Option<[Position; 4]> {
        let (position, orientation) = rigid_body_manager.get_configuration(self.rigid_body_id)?;
        Some(
            self.geometry
                .local_corners()
                .map(|corner| position + orientation.transform_vector(&corner.coords)),
        )
    }

    fn validate(&self, rigid_body_manager: &RigidBodyManager) -> Result<()> {
        if !rigid_body_manager.contains(self.rigid_body_id) {
            bail!("Shape refers to unregistered {}", self.rigid_body_id);
        }
        let BoxShape { width, height } = self.geometry;
        if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
            bail!("Degenerate box shape: {width} x {height}");
        }
        let SurfaceMaterial {
            friction,
            elasticity,
        } = self.material;
        if !(friction.is_finite() && friction >= 0.0) {
            bail!("Invalid shape friction: {friction}");
        }
        if !(0.0..=1.0).contains(&elasticity) {
            bail!("Invalid shape elasticity: {elasticity}");
        }
        Ok(())
    }
}

impl ShapeManager {
    pub fn new() -> Self {
        Self {
            shapes: Vec::new(),
            shape_indices_by_id: KeyIndexMapper::new(),
            shape_id_counter: 0,
        }
    }

    /// Returns a reference to the [`Shape`] with the given ID, or [`None`] if
    /// it does not exist.
    pub fn get_shape(&self, id: ShapeID) -> Option<&Shape> {
        let idx = self.shape_indices_by_id.get(id)?;
        Some(&self.shapes[idx])
    }

    /// Returns the slice of all shapes.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Adds the given shape attached to a body in the given
    /// [`RigidBodyManager`].
    ///
    /// # Errors
    /// Returns an error if the body is not registered, the geometry is
    /// degenerate or the material is invalid.
    pub fn add_shape(
        &mut self,
        rigid_body_manager: &RigidBodyManager,
        shape: Shape,
    ) -> Result<ShapeID> {
        shape.validate(rigid_body_manager)?;

        let id = ShapeID(self.shape_id_counter);
        self.shape_id_counter = self
            .shape_id_counter
            .checked_add(1)
            .ok_or_else(|| anyhow!("Ran out of shape IDs"))?;

        self.shape_indices_by_id.push_key(id)?;
        self.shapes.push(shape);

        Ok(id)
    }
}

impl Default for ShapeManager {
    fn default() -> Self {
        Self::new()
    }
}
