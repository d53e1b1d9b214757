//! The platform, its anchoring columns and the joints between them.

use crate::environment::EnvironmentForcing;
use anyhow::{Context, Result, anyhow, bail};
use nalgebra::point;
use rigsim_physics::{
    PhysicsWorld,
    force::{
        local_force::{LocalForce, LocalForceGeneratorID},
        spring_force::Spring,
    },
    fph,
    inertia::InertialProperties,
    joint::{Joint, JointID, JointKind, pin::PinJoint},
    quantities::{Orientation, Position},
    rigid_body::{DynamicRigidBody, DynamicRigidBodyID, StaticRigidBody, StaticRigidBodyID},
    shape::{BoxShape, Shape, ShapeID, SurfaceMaterial},
};
use serde::{Deserialize, Serialize};

/// Configuration parameters for the platform and its columns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    pub platform_mass: fph,
    pub platform_width: fph,
    pub platform_height: fph,
    /// Initial gap between the column tops and the bottom of the platform.
    pub platform_elevation: fph,
    pub platform_friction: fph,
    pub platform_elasticity: fph,
    pub n_columns: usize,
    pub column_width: fph,
    pub column_height: fph,
    pub column_friction: fph,
    pub column_elasticity: fph,
    /// How each column is connected to the platform.
    pub joint: JointConfig,
    /// Where the joints attach to the platform.
    pub anchor_layout: AnchorLayout,
}

/// How a column is connected to the platform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum JointConfig {
    /// A rigid pin. If no rest length is given, the pin keeps the distance
    /// the anchors have when the structure is built.
    Pin { rest_length: Option<fph> },
    DampedSpring {
        stiffness: fph,
        damping: fph,
        rest_length: fph,
    },
}

/// Where the joints attach to the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorLayout {
    /// Every joint attaches to the platform center.
    Centered,
    /// Each joint attaches to the bottom of the platform directly above its
    /// column.
    AboveColumns,
}

/// Handles to everything making up the platform structure in a
/// [`PhysicsWorld`].
#[derive(Clone, Debug)]
pub struct PlatformStructure {
    platform: DynamicRigidBodyID,
    columns: Vec<StaticRigidBodyID>,
    joints: Vec<JointID>,
    platform_shape: ShapeID,
    column_shapes: Vec<ShapeID>,
    center_force: LocalForceGeneratorID,
    tilt_force: LocalForceGeneratorID,
    tilt_point: Position,
}

impl PlatformStructure {
    /// Adds the platform, its columns and their joints to the given world.
    ///
    /// The columns stand on the seabed at `y = 0`, evenly spaced under the
    /// platform, which is centered on `x = 0`.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the world rejects
    /// any of the bodies, shapes or joints.
    pub fn build(world: &mut PhysicsWorld, config: &StructureConfig) -> Result<Self> {
        config.validate()?;

        let platform_y =
            config.column_height + config.platform_elevation + 0.5 * config.platform_height;

        let platform = world
            .add_dynamic_rigid_body(DynamicRigidBody::at_rest(
                InertialProperties::of_uniform_box(
                    config.platform_mass,
                    config.platform_width,
                    config.platform_height,
                )
                .context("Invalid platform")?,
                point![0.0, platform_y],
                Orientation::identity(),
            ))
            .context("Failed to add platform")?;

        let platform_shape = world.add_shape(Shape::new(
            platform,
            BoxShape::new(config.platform_width, config.platform_height),
            SurfaceMaterial::new(config.platform_friction, config.platform_elasticity),
        ))?;

        let joint_kind = config.joint.to_joint_kind();
        let column_geometry = BoxShape::new(config.column_width, config.column_height);
        let column_material =
            SurfaceMaterial::new(config.column_friction, config.column_elasticity);

        let mut columns = Vec::with_capacity(config.n_columns);
        let mut column_shapes = Vec::with_capacity(config.n_columns);
        let mut joints = Vec::with_capacity(config.n_columns);

        for idx in 0..config.n_columns {
            let x = config.column_x_offset(idx);

            let column = world.add_static_rigid_body(StaticRigidBody::new(
                point![x, 0.5 * config.column_height],
                Orientation::identity(),
            ))?;
            column_shapes.push(world.add_shape(Shape::new(
                column,
                column_geometry,
                column_material,
            ))?);

            let platform_anchor = match config.anchor_layout {
                AnchorLayout::Centered => Position::origin(),
                AnchorLayout::AboveColumns => point![x, -0.5 * config.platform_height],
            };
            let joint = world
                .add_joint(Joint::new(
                    platform,
                    platform_anchor,
                    column,
                    column_geometry.top_center(),
                    joint_kind,
                ))
                .with_context(|| format!("Failed to connect column {idx} to platform"))?;

            columns.push(column);
            joints.push(joint);
        }

        let center_force =
            world.add_local_force(platform, LocalForce::zero_at(Position::origin()))?;
        let tilt_point = point![0.5 * config.platform_width, 0.0];
        let tilt_force = world.add_local_force(platform, LocalForce::zero_at(tilt_point))?;

        rigsim_log::info!(
            "Built platform {platform} on {} columns with {:?} joints",
            config.n_columns,
            config.joint
        );

        Ok(Self {
            platform,
            columns,
            joints,
            platform_shape,
            column_shapes,
            center_force,
            tilt_force,
            tilt_point,
        })
    }

    pub fn platform_id(&self) -> DynamicRigidBodyID {
        self.platform
    }

    pub fn column_ids(&self) -> &[StaticRigidBodyID] {
        &self.columns
    }

    pub fn joint_ids(&self) -> &[JointID] {
        &self.joints
    }

    pub fn platform_shape_id(&self) -> ShapeID {
        self.platform_shape
    }

    pub fn column_shape_ids(&self) -> &[ShapeID] {
        &self.column_shapes
    }

    /// The point in the platform's frame where the wind tilt force acts.
    pub fn tilt_point(&self) -> &Position {
        &self.tilt_point
    }

    /// Returns the platform body.
    ///
    /// # Errors
    /// Returns an error if the platform is not in the given world.
    pub fn platform<'a>(&self, world: &'a PhysicsWorld) -> Result<&'a DynamicRigidBody> {
        world
            .rigid_body_manager()
            .get_dynamic_rigid_body(self.platform)
            .ok_or_else(|| anyhow!("Platform {} missing from physics world", self.platform))
    }

    /// Returns the position of every column, in column order.
    ///
    /// # Errors
    /// Returns an error if a column is not in the given world.
    pub fn column_positions(&self, world: &PhysicsWorld) -> Result<Vec<Position>> {
        self.columns
            .iter()
            .map(|&id| {
                world
                    .rigid_body_manager()
                    .get_static_rigid_body(id)
                    .map(|column| *column.position())
                    .ok_or_else(|| anyhow!("Column {id} missing from physics world"))
            })
            .collect()
    }

    /// Returns the current anchor separation of every joint, in column order.
    pub fn joint_separations(&self, world: &PhysicsWorld) -> Vec<fph> {
        self.joints
            .iter()
            .filter_map(|&id| world.joint_separation(id))
            .collect()
    }

    /// Sets the environment forcing to act on the platform during the next
    /// physics step. The forces are given in world space and converted to the
    /// platform's current frame.
    ///
    /// # Errors
    /// Returns an error if the platform or its force generators are not in
    /// the given world.
    pub fn apply_forcing(
        &self,
        world: &mut PhysicsWorld,
        forcing: &EnvironmentForcing,
    ) -> Result<()> {
        let orientation = *self.platform(world)?.orientation();

        world.set_local_force(
            self.center_force,
            LocalForce::new(
                orientation.inverse_transform_vector(&forcing.center_force),
                Position::origin(),
            ),
        )?;
        world.set_local_force(
            self.tilt_force,
            LocalForce::new(
                orientation.inverse_transform_vector(&forcing.tilt_force),
                self.tilt_point,
            ),
        )?;
        Ok(())
    }
}

impl StructureConfig {
    /// The horizontal offset of the given column from the platform center.
    pub fn column_x_offset(&self, idx: usize) -> fph {
        (idx as fph + 0.5) * self.platform_width / self.n_columns as fph
            - 0.5 * self.platform_width
    }

    /// Checks that the structure can be built.
    ///
    /// # Errors
    /// Returns an error describing the first invalid parameter.
    pub fn validate(&self) -> Result<()> {
        if self.n_columns == 0 {
            bail!("The platform needs at least one column");
        }
        if !(self.platform_elevation.is_finite() && self.platform_elevation >= 0.0) {
            bail!("Invalid platform elevation: {}", self.platform_elevation);
        }
        if !(self.column_height.is_finite() && self.column_height > 0.0) {
            bail!("Invalid column height: {}", self.column_height);
        }
        Ok(())
    }
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            platform_mass: 10.0,
            platform_width: 500.0,
            platform_height: 40.0,
            platform_elevation: 0.0,
            platform_friction: 0.5,
            platform_elasticity: 0.4,
            n_columns: 6,
            column_width: 30.0,
            column_height: 250.0,
            column_friction: 0.7,
            column_elasticity: 0.5,
            joint: JointConfig::default(),
            anchor_layout: AnchorLayout::AboveColumns,
        }
    }
}

impl JointConfig {
    fn to_joint_kind(self) -> JointKind {
        match self {
            Self::Pin {
                rest_length: Some(rest_length),
            } => JointKind::Pin(PinJoint::new(rest_length)),
            Self::Pin { rest_length: None } => JointKind::Pin(PinJoint::at_initial_separation()),
            Self::DampedSpring {
                stiffness,
                damping,
                rest_length,
            } => JointKind::DampedSpring(Spring::new(stiffness, damping, rest_length)),
        }
    }
}

impl Default for JointConfig {
    fn default() -> Self {
        Self::DampedSpring {
            stiffness: 8000.0,
            damping: 500.0,
            rest_length: 0.0,
        }
    }
}
