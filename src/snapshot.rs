//! Read-only per-frame readouts for presentation.

use crate::{
    degradation::DegradationState,
    environment::{EnvironmentForcing, EnvironmentState},
    production::ProductionState,
};
use nalgebra::Vector2;
use rigsim_physics::{fph, quantities::Position, rigid_body::DynamicRigidBody};
use serde::{Deserialize, Serialize};

/// An immutable copy of everything presentation needs from a single frame,
/// taken after the physics step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    /// Index of the frame the snapshot was taken at, starting from zero.
    pub frame: u64,
    pub simulation_time: fph,
    pub platform: PlatformSnapshot,
    pub column_positions: Vec<[fph; 2]>,
    /// Distance between the anchors of each column joint.
    pub joint_separations: Vec<fph>,
    pub environment: EnvironmentState,
    pub forcing: ForcingSnapshot,
    pub production: ProductionSnapshot,
    pub degradation: DegradationState,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlatformSnapshot {
    pub position: [fph; 2],
    pub velocity: [fph; 2],
    /// Counterclockwise rotation from the initial orientation [rad].
    pub angle: fph,
    pub angular_velocity: fph,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForcingSnapshot {
    pub wave_factor_x: fph,
    pub wave_factor_y: fph,
    pub center_force: [fph; 2],
    pub tilt_force: [fph; 2],
}

/// The scalar production readouts. The histories are left out, since
/// observers can collect them from consecutive snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductionSnapshot {
    pub drill_depth: fph,
    pub drill_speed: fph,
    pub drill_health: fph,
    pub reservoir_pressure: fph,
    pub oil_output: fph,
    pub energy_output: fph,
    /// Name of the geological layer the drill is in.
    pub layer_name: String,
}

impl PlatformSnapshot {
    pub fn from_body(body: &DynamicRigidBody) -> Self {
        Self {
            position: point_to_array(body.position()),
            velocity: vector_to_array(&body.compute_velocity()),
            angle: body.orientation().angle(),
            angular_velocity: body.compute_angular_velocity(),
        }
    }

    /// The magnitude of the platform's velocity.
    pub fn speed(&self) -> fph {
        self.velocity[0].hypot(self.velocity[1])
    }
}

impl From<&EnvironmentForcing> for ForcingSnapshot {
    fn from(forcing: &EnvironmentForcing) -> Self {
        Self {
            wave_factor_x: forcing.wave_factor_x,
            wave_factor_y: forcing.wave_factor_y,
            center_force: vector_to_array(&forcing.center_force),
            tilt_force: vector_to_array(&forcing.tilt_force),
        }
    }
}

impl ProductionSnapshot {
    pub fn new(state: &ProductionState, layer_name: &str) -> Self {
        Self {
            drill_depth: state.drill_depth,
            drill_speed: state.drill_speed,
            drill_health: state.drill_health(),
            reservoir_pressure: state.reservoir_pressure,
            oil_output: state.oil_output,
            energy_output: state.energy_output,
            layer_name: layer_name.to_string(),
        }
    }
}

pub fn point_to_array(point: &Position) -> [fph; 2] {
    [point.x, point.y]
}

fn vector_to_array(vector: &Vector2<fph>) -> [fph; 2] {
    [vector.x, vector.y]
}
