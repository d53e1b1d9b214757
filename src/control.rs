//! Mapping of key presses to per-frame control input.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

/// Configuration parameters for control input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// How much a single press changes the ocean current speed.
    pub current_speed_step: f64,
    /// How much a single press changes the wind speed.
    pub wind_speed_step: f64,
    /// How much a single press changes the drill speed.
    pub drill_speed_step: f64,
    /// Path to the RON file containing the mappings from keys to actions. If
    /// [`None`], the default mappings will be used.
    pub key_map_path: Option<PathBuf>,
    /// Key presses to replay, each at the start of the given frame.
    pub script: Vec<ScriptedKeyPress>,
}

/// A key press replayed by [`ScriptedControls`] at a given frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedKeyPress {
    pub frame: u64,
    pub key: Key,
}

/// A key that can be bound to a [`ControlAction`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    PageUp,
    PageDown,
    KeyR,
    KeyS,
    Escape,
}

/// Actions that can be performed with a keyboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlAction {
    IncreaseCurrentSpeed,
    DecreaseCurrentSpeed,
    IncreaseWindSpeed,
    DecreaseWindSpeed,
    IncreaseDrillSpeed,
    DecreaseDrillSpeed,
    TriggerStorm,
    RepairDrill,
    Stop,
}

/// A map associating keys with the actions they should perform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyActionMap(HashMap<Key, ControlAction>);

/// The control input gathered for a single frame. All deltas are summed over
/// every action performed during the frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    pub current_speed_delta: f64,
    pub wind_speed_delta: f64,
    pub drill_speed_delta: f64,
    pub trigger_storm: bool,
    pub repair_drill: bool,
    pub stop_requested: bool,
}

/// Source of control input, sampled once at the start of every frame without
/// blocking.
pub trait ControlSource {
    /// Returns the control input for the given frame.
    fn sample(&mut self, frame: u64) -> ControlInput;
}

/// Control source replaying a fixed script of key presses.
#[derive(Clone, Debug)]
pub struct ScriptedControls {
    key_map: KeyActionMap,
    config: ControlConfig,
    presses: Vec<ScriptedKeyPress>,
    next_press_idx: usize,
}

/// Macro for easing creation of key action maps.
macro_rules! def_key_action_map {
    ($($action:ident => $key:ident),*) => {
        [$((Key::$key, ControlAction::$action),)*].into_iter().collect::<HashMap<_, _>>()
    };
}

impl ControlConfig {
    /// Checks that the step sizes are finite and non-negative.
    ///
    /// # Errors
    /// Returns an error describing the first invalid parameter.
    pub fn validate(&self) -> Result<()> {
        for (name, step) in [
            ("current speed", self.current_speed_step),
            ("wind speed", self.wind_speed_step),
            ("drill speed", self.drill_speed_step),
        ] {
            if !(step.is_finite() && step >= 0.0) {
                bail!("Invalid {name} control step: {step}");
            }
        }
        Ok(())
    }

    /// Loads the key map from [`Self::key_map_path`], or returns the default
    /// key map if no path is given.
    ///
    /// # Errors
    /// Returns an error if the key map file can not be read or parsed.
    pub fn load_key_map(&self) -> Result<KeyActionMap> {
        match &self.key_map_path {
            Some(file_path) => KeyActionMap::from_ron_file(file_path),
            None => Ok(KeyActionMap::default()),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            current_speed_step: 0.1,
            wind_speed_step: 0.1,
            drill_speed_step: 0.2,
            key_map_path: None,
            script: Vec::new(),
        }
    }
}

impl KeyActionMap {
    pub fn new(map: HashMap<Key, ControlAction>) -> Self {
        Self(map)
    }

    pub fn from_ron_file(file_path: impl AsRef<Path>) -> Result<Self> {
        rigsim_io::parse_ron_file(file_path)
    }

    /// Returns the action bound to the given key, if any.
    pub fn action_for(&self, key: Key) -> Option<ControlAction> {
        self.0.get(&key).copied()
    }
}

impl Default for KeyActionMap {
    fn default() -> Self {
        Self::new(def_key_action_map!(
            DecreaseCurrentSpeed => ArrowLeft,
            IncreaseCurrentSpeed => ArrowRight,
            IncreaseDrillSpeed => ArrowUp,
            DecreaseDrillSpeed => ArrowDown,
            IncreaseWindSpeed => PageUp,
            DecreaseWindSpeed => PageDown,
            TriggerStorm => KeyS,
            RepairDrill => KeyR,
            Stop => Escape
        ))
    }
}

impl ControlAction {
    /// Folds the effect of this action into the given control input.
    pub fn apply(self, config: &ControlConfig, input: &mut ControlInput) {
        match self {
            Self::IncreaseCurrentSpeed => input.current_speed_delta += config.current_speed_step,
            Self::DecreaseCurrentSpeed => input.current_speed_delta -= config.current_speed_step,
            Self::IncreaseWindSpeed => input.wind_speed_delta += config.wind_speed_step,
            Self::DecreaseWindSpeed => input.wind_speed_delta -= config.wind_speed_step,
            Self::IncreaseDrillSpeed => input.drill_speed_delta += config.drill_speed_step,
            Self::DecreaseDrillSpeed => input.drill_speed_delta -= config.drill_speed_step,
            Self::TriggerStorm => input.trigger_storm = true,
            Self::RepairDrill => input.repair_drill = true,
            Self::Stop => input.stop_requested = true,
        }
    }
}

impl ControlInput {
    /// Applies the actions bound to the given keys, ignoring unbound keys.
    pub fn from_keys(
        key_map: &KeyActionMap,
        config: &ControlConfig,
        keys: impl IntoIterator<Item = Key>,
    ) -> Self {
        let mut input = Self::default();
        for action in keys.into_iter().filter_map(|key| key_map.action_for(key)) {
            action.apply(config, &mut input);
        }
        input
    }
}

impl ScriptedControls {
    /// Creates a control source replaying the script in the given
    /// configuration using the given key map.
    pub fn new(key_map: KeyActionMap, config: ControlConfig) -> Self {
        let mut presses = config.script.clone();
        presses.sort_by_key(|press| press.frame);
        Self {
            key_map,
            config,
            presses,
            next_press_idx: 0,
        }
    }

    /// Creates a control source from the given configuration, loading the key
    /// map it refers to.
    ///
    /// # Errors
    /// See [`ControlConfig::load_key_map`].
    pub fn from_config(config: ControlConfig) -> Result<Self> {
        let key_map = config.load_key_map()?;
        Ok(Self::new(key_map, config))
    }

    /// The number of scripted presses that have not been replayed yet.
    pub fn n_pending_presses(&self) -> usize {
        self.presses.len() - self.next_press_idx
    }
}

impl ControlSource for ScriptedControls {
    fn sample(&mut self, frame: u64) -> ControlInput {
        let start = self.next_press_idx;
        let n_due = self.presses[start..]
            .iter()
            .take_while(|press| press.frame <= frame)
            .count();
        self.next_press_idx += n_due;

        ControlInput::from_keys(
            &self.key_map,
            &self.config,
            self.presses[start..start + n_due].iter().map(|press| press.key),
        )
    }
}
