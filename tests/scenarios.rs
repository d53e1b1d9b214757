use approx::assert_abs_diff_eq;
use proptest::prelude::*;
use rigsim::{
    Simulation, SimulationConfig,
    control::{ControlConfig, ControlInput, Key, ScriptedControls, ScriptedKeyPress},
    game_loop::{GameLoop, GameLoopConfig, ReportRecorder, StopReason, TerminationCriterion},
};

fn calm_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.environment.storm_probability = 0.0;
    config.environment.weather_change_probability = 0.0;
    config
}

#[test]
fn certain_storm_adds_intensity_before_decay() {
    let mut config = calm_config();
    config.environment.initial_state.wind_speed = 5.0;
    config.environment.storm_probability = 1.0;
    config.environment.storm_intensity_range = (10.0, 10.0);

    let mut simulation = Simulation::new(&config).unwrap();
    let snapshot = simulation.advance_frame(&ControlInput::default()).unwrap();

    assert_abs_diff_eq!(snapshot.environment.wind_speed, 14.7, epsilon = 1e-9);
    assert_eq!(snapshot.environment.storm_count, 1);
    assert_abs_diff_eq!(snapshot.environment.storm_intensity, 10.0);
}

#[test]
fn drill_advances_linearly_through_first_layer() {
    let config = calm_config();
    assert_eq!(config.production.initial_drill_speed, 0.5);
    assert_eq!(config.production.layers[0].resistance, 1.0);

    let mut simulation = Simulation::new(&config).unwrap();
    let mut snapshot = None;
    for _ in 0..100 {
        snapshot = Some(simulation.advance_frame(&ControlInput::default()).unwrap());
    }
    let snapshot = snapshot.unwrap();

    assert_abs_diff_eq!(snapshot.production.drill_depth, 50.0, epsilon = 1e-9);
    assert_eq!(snapshot.production.layer_name, config.production.layers[0].name);
    assert_eq!(snapshot.production.oil_output, 0.0);
}

#[test]
fn spring_supported_platform_stays_upright_in_calm_seas() {
    let mut simulation = Simulation::new(&calm_config()).unwrap();
    for _ in 0..300 {
        let snapshot = simulation.advance_frame(&ControlInput::default()).unwrap();
        assert!(snapshot.platform.position[1].is_finite());
        assert!(snapshot.platform.angle.abs() < std::f64::consts::FRAC_PI_2);
    }
}

#[test]
fn column_positions_never_change() {
    let mut config = SimulationConfig::default();
    config.environment.storm_probability = 0.05;
    let mut simulation = Simulation::new(&config).unwrap();
    let initial = simulation.advance_frame(&ControlInput::default()).unwrap();
    for _ in 0..120 {
        let snapshot = simulation.advance_frame(&ControlInput::default()).unwrap();
        assert_eq!(snapshot.column_positions, initial.column_positions);
    }
}

#[test]
fn scripted_run_stops_on_escape() {
    let mut config = calm_config();
    config.controls = ControlConfig {
        script: vec![
            ScriptedKeyPress {
                frame: 2,
                key: Key::KeyS,
            },
            ScriptedKeyPress {
                frame: 5,
                key: Key::Escape,
            },
        ],
        ..ControlConfig::default()
    };
    let mut controls = ScriptedControls::from_config(config.controls.clone()).unwrap();
    let simulation = Simulation::new(&config).unwrap();
    let mut game_loop = GameLoop::new(
        simulation,
        GameLoopConfig {
            termination_criterion: TerminationCriterion::IterationCountReached { count: 50 },
            ..GameLoopConfig::default()
        },
    );
    let mut recorder = ReportRecorder::new(10);

    let reason = game_loop.run(&mut controls, &mut [&mut recorder]).unwrap();

    assert_eq!(reason, StopReason::StopRequested);
    let report = recorder.into_report();
    assert_eq!(report.n_frames, 5);
    assert_eq!(report.storm_count, 1);
    assert!(report.peak_wind_speed > config.environment.initial_state.wind_speed);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn health_and_fatigue_stay_valid_under_storm_sequences(
        seed in any::<u64>(),
        storms in prop::collection::vec(any::<bool>(), 40),
        current_deltas in prop::collection::vec(-2.0..2.0_f64, 40),
    ) {
        let mut config = SimulationConfig::default();
        config.seed = seed;
        config.environment.storm_probability = 0.5;
        config.environment.storm_intensity_range = (10.0, 40.0);
        let mut simulation = Simulation::new(&config).unwrap();

        let mut fatigue = simulation.environment().material_fatigue;
        for (trigger_storm, current_speed_delta) in storms.into_iter().zip(current_deltas) {
            let input = ControlInput {
                trigger_storm,
                current_speed_delta,
                ..ControlInput::default()
            };
            let snapshot = simulation.advance_frame(&input).unwrap();

            prop_assert!(snapshot.environment.material_fatigue >= fatigue);
            fatigue = snapshot.environment.material_fatigue;

            for health in snapshot.degradation.health_values() {
                prop_assert!((0.0..=100.0).contains(&health));
            }
            prop_assert!((0.0..=100.0).contains(&snapshot.production.drill_health));
        }
    }
}
