//! Whole-world tests of platforms held by springs and pins.

use approx::assert_abs_diff_eq;
use nalgebra::{point, vector};
use rigsim_physics::{
    PhysicsConfig, PhysicsWorld, SimulatorConfig,
    force::{ForceGenerationConfig, local_force::LocalForce, spring_force::Spring},
    fph,
    inertia::InertialProperties,
    joint::{Joint, JointKind, pin::PinJoint},
    quantities::{Orientation, Position},
    rigid_body::{DynamicRigidBody, DynamicRigidBodyID, StaticRigidBody, StaticRigidBodyID},
};

const GRAVITY: fph = 1000.0;
const PLATFORM_MASS: fph = 10.0;
const PLATFORM_WIDTH: fph = 500.0;
const PLATFORM_HEIGHT: fph = 20.0;
const N_COLUMNS: usize = 6;
const COLUMN_HEIGHT: fph = 200.0;

fn config_with_gravity(gravity: fph) -> PhysicsConfig {
    PhysicsConfig {
        force_generation: ForceGenerationConfig {
            gravitational_acceleration: gravity,
        },
        ..Default::default()
    }
}

fn column_x(idx: usize) -> fph {
    (idx as fph + 0.5) * PLATFORM_WIDTH / N_COLUMNS as fph - 0.5 * PLATFORM_WIDTH
}

/// Builds a platform resting with its bottom edge on the tops of evenly
/// spaced static columns, each connected to the platform directly above it.
fn platform_on_columns(
    kind: JointKind,
) -> (PhysicsWorld, DynamicRigidBodyID, Vec<StaticRigidBodyID>) {
    let mut world = PhysicsWorld::new(config_with_gravity(GRAVITY)).unwrap();

    let platform_y = COLUMN_HEIGHT + 0.5 * PLATFORM_HEIGHT;
    let platform = world
        .add_dynamic_rigid_body(DynamicRigidBody::at_rest(
            InertialProperties::of_uniform_box(PLATFORM_MASS, PLATFORM_WIDTH, PLATFORM_HEIGHT)
                .unwrap(),
            point![0.0, platform_y],
            Orientation::identity(),
        ))
        .unwrap();

    let mut columns = Vec::with_capacity(N_COLUMNS);
    for idx in 0..N_COLUMNS {
        let column = world
            .add_static_rigid_body(StaticRigidBody::new(
                point![column_x(idx), 0.5 * COLUMN_HEIGHT],
                Orientation::identity(),
            ))
            .unwrap();
        world
            .add_joint(Joint::new(
                platform,
                point![column_x(idx), -0.5 * PLATFORM_HEIGHT],
                column,
                point![0.0, 0.5 * COLUMN_HEIGHT],
                kind,
            ))
            .unwrap();
        columns.push(column);
    }

    (world, platform, columns)
}

fn platform_body(world: &PhysicsWorld, id: DynamicRigidBodyID) -> &DynamicRigidBody {
    world.rigid_body_manager().get_dynamic_rigid_body(id).unwrap()
}

#[test]
fn platform_on_damped_springs_settles_where_springs_balance_gravity() {
    let stiffness = 8000.0;
    let (mut world, platform, _) =
        platform_on_columns(JointKind::DampedSpring(Spring::new(stiffness, 500.0, 0.0)));
    let initial_y = platform_body(&world, platform).position().y;

    // 5 seconds at 60 steps per second
    for _ in 0..300 {
        world.advance_simulation();
    }

    // The springs act in parallel, so their stiffnesses add up
    let expected_displacement = PLATFORM_MASS * GRAVITY / (N_COLUMNS as fph * stiffness);

    let body = platform_body(&world, platform);
    assert_abs_diff_eq!(
        initial_y - body.position().y,
        expected_displacement,
        epsilon = 1e-6
    );
    assert_abs_diff_eq!(body.position().x, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(body.orientation().angle(), 0.0, epsilon = 1e-9);
}

#[test]
fn platform_oscillation_on_damped_springs_decays() {
    let (mut world, platform, _) =
        platform_on_columns(JointKind::DampedSpring(Spring::new(8000.0, 500.0, 0.0)));

    let mut max_early_speed: fph = 0.0;
    for _ in 0..30 {
        world.advance_simulation();
        let speed = platform_body(&world, platform).compute_velocity().norm();
        max_early_speed = max_early_speed.max(speed);
    }
    for _ in 30..300 {
        world.advance_simulation();
    }
    let final_speed = platform_body(&world, platform).compute_velocity().norm();

    assert!(max_early_speed > 0.1);
    assert!(final_speed < 1e-6 * max_early_speed);
}

#[test]
fn static_columns_never_move() {
    let (mut world, platform, columns) =
        platform_on_columns(JointKind::DampedSpring(Spring::new(8000.0, 500.0, 0.0)));
    let initial_positions: Vec<Position> = columns
        .iter()
        .map(|&id| {
            *world
                .rigid_body_manager()
                .get_static_rigid_body(id)
                .unwrap()
                .position()
        })
        .collect();

    let tilt = world
        .add_local_force(
            platform,
            LocalForce::new(vector![5000.0, -3000.0], point![0.5 * PLATFORM_WIDTH, 0.0]),
        )
        .unwrap();

    for frame in 0..120 {
        if frame == 60 {
            world
                .set_local_force(tilt, LocalForce::zero_at(Position::origin()))
                .unwrap();
        }
        world.advance_simulation();
    }

    for (&id, initial_position) in columns.iter().zip(&initial_positions) {
        let column = world.rigid_body_manager().get_static_rigid_body(id).unwrap();
        assert_eq!(column.position(), initial_position);
        assert_eq!(column.orientation().angle(), 0.0);
    }
}

#[test]
fn off_center_local_force_tilts_platform() {
    let (mut world, platform, _) =
        platform_on_columns(JointKind::DampedSpring(Spring::new(8000.0, 500.0, 0.0)));
    world
        .add_local_force(
            platform,
            LocalForce::new(vector![0.0, 2000.0], point![0.5 * PLATFORM_WIDTH, 0.0]),
        )
        .unwrap();

    for _ in 0..10 {
        world.advance_simulation();
    }

    assert!(platform_body(&world, platform).orientation().angle() > 0.0);
}

#[test]
fn pinned_platform_keeps_anchor_separation() {
    let (mut world, platform, _) =
        platform_on_columns(JointKind::Pin(PinJoint::at_initial_separation()));
    world
        .add_local_force(
            platform,
            LocalForce::new(vector![3000.0, 0.0], point![0.0, 0.0]),
        )
        .unwrap();

    for _ in 0..120 {
        world.advance_simulation();
    }

    for (id, _) in world.joint_manager().joints() {
        assert_abs_diff_eq!(world.joint_separation(id).unwrap(), 0.0, epsilon = 1e-3);
    }
    assert_abs_diff_eq!(
        platform_body(&world, platform).position().y,
        COLUMN_HEIGHT + 0.5 * PLATFORM_HEIGHT,
        epsilon = 1e-3
    );
}

#[test]
fn pin_holds_pendulum_at_rest_length() {
    let mut world = PhysicsWorld::new(config_with_gravity(10.0)).unwrap();
    let pivot = world
        .add_static_rigid_body(StaticRigidBody::new(Position::origin(), Orientation::identity()))
        .unwrap();
    let bob = world
        .add_dynamic_rigid_body(DynamicRigidBody::at_rest(
            InertialProperties::of_uniform_box(1.0, 0.2, 0.2).unwrap(),
            point![3.0, 0.0],
            Orientation::identity(),
        ))
        .unwrap();
    let joint = world
        .add_joint(Joint::new(
            bob,
            Position::origin(),
            pivot,
            Position::origin(),
            JointKind::Pin(PinJoint::new(3.0)),
        ))
        .unwrap();

    let mut lowest_y: fph = 0.0;
    for _ in 0..120 {
        world.advance_simulation();
        assert_abs_diff_eq!(world.joint_separation(joint).unwrap(), 3.0, epsilon = 1e-3);
        lowest_y = lowest_y.min(platform_body(&world, bob).position().y);
    }

    // The bob swings down rather than hanging still
    assert!(lowest_y < -2.5);
}

#[test]
fn unconstrained_body_accelerates_downward_monotonically() {
    let mut world = PhysicsWorld::new(PhysicsConfig {
        simulator: SimulatorConfig {
            n_substeps: 4,
            ..Default::default()
        },
        ..config_with_gravity(GRAVITY)
    })
    .unwrap();
    let body = world
        .add_dynamic_rigid_body(DynamicRigidBody::at_rest(
            InertialProperties::of_uniform_box(PLATFORM_MASS, 1.0, 1.0).unwrap(),
            Position::origin(),
            Orientation::identity(),
        ))
        .unwrap();

    let mut previous_position_y = 0.0;
    let mut previous_velocity_y = 0.0;
    for _ in 0..100 {
        world.advance_simulation();
        let state = platform_body(&world, body);
        let velocity_y = state.compute_velocity().y;
        assert!(velocity_y < previous_velocity_y);
        assert!(state.position().y < previous_position_y);
        assert_abs_diff_eq!(state.compute_velocity().x, 0.0);
        previous_velocity_y = velocity_y;
        previous_position_y = state.position().y;
    }

    assert_abs_diff_eq!(
        previous_velocity_y,
        -GRAVITY * world.simulation_time(),
        epsilon = 1e-6
    );
}
