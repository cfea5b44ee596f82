use super::RunAcceptMode;
use crate::{constants::*, error::TrainingError, fitness::FitnessWeights};
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Everything the trainer is tuned by. Missing fields in a loaded file fall back to the
/// `DRIVENET_` defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub sensor_count: usize,
    pub hidden_layers: usize,
    pub neurons_in_layer: usize,
    pub population_size: usize,
    pub pass_count: usize,
    pub mutation_power: f64,
    pub max_mutation: f64,
    pub accept_mode: RunAcceptMode,
    pub weights: FitnessWeights,
    pub termination_delay: f64,
    pub termination_speed: f64,
    pub floor_height: f64,
    pub collision_terminates: bool,
    pub max_motor_torque: f64,
    pub max_steering_angle: f64,
    /// Where breakthrough checkpoints are written. Nothing is written when unset.
    pub checkpoint_dir: Option<PathBuf>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            sensor_count: DRIVENET_SENSOR_COUNT,
            hidden_layers: DRIVENET_HIDDEN_LAYERS,
            neurons_in_layer: DRIVENET_NEURONS_IN_LAYER,
            population_size: DRIVENET_POPULATION_SIZE,
            pass_count: DRIVENET_PASS_COUNT,
            mutation_power: DRIVENET_MUTATION_POWER,
            max_mutation: DRIVENET_MAX_MUTATION,
            accept_mode: RunAcceptMode::default(),
            weights: FitnessWeights::default(),
            termination_delay: DRIVENET_TERMINATION_DELAY,
            termination_speed: DRIVENET_TERMINATION_SPEED,
            floor_height: DRIVENET_FLOOR_HEIGHT,
            collision_terminates: DRIVENET_COLLISION_TERMINATES,
            max_motor_torque: DRIVENET_MAX_MOTOR_TORQUE,
            max_steering_angle: DRIVENET_MAX_STEERING_ANGLE,
            checkpoint_dir: None,
        }
    }
}

impl TrainingConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TrainingError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| TrainingError::ConfigIo {
            path: path.to_owned(),
            source,
        })?;
        text.parse()
    }

    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.population_size == 0 {
            return Err(TrainingError::Config("population_size must be at least 1"));
        }
        if self.pass_count == 0 {
            return Err(TrainingError::Config("pass_count must be at least 1"));
        }
        if self.hidden_layers > 0 && self.neurons_in_layer == 0 {
            return Err(TrainingError::Config(
                "neurons_in_layer must be at least 1 when there are hidden layers",
            ));
        }
        // index 0 of every generation must stay unmutated, which 0^0 would break
        if !(self.mutation_power > 0.) {
            return Err(TrainingError::Config("mutation_power must be positive"));
        }
        if !(self.max_mutation >= 0.) {
            return Err(TrainingError::Config("max_mutation must not be negative"));
        }
        if !(self.termination_delay > 0.) {
            return Err(TrainingError::Config("termination_delay must be positive"));
        }
        if !(self.weights.checkpoint_reach_distance >= 0.) {
            return Err(TrainingError::Config(
                "checkpoint_reach_distance must not be negative",
            ));
        }
        Ok(())
    }
}

impl FromStr for TrainingConfig {
    type Err = TrainingError;

    /// Parse and validate a JSON configuration
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::assert_f64_approx;

    #[test]
    fn test_default_is_valid() {
        TrainingConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrainingConfig =
            r#"{"population_size": 4, "accept_mode": "Median", "weights": {"checkpoint": 2.5}}"#
                .parse()
                .unwrap();
        assert_eq!(config.population_size, 4);
        assert_eq!(config.accept_mode, RunAcceptMode::Median);
        assert_f64_approx!(config.weights.checkpoint, 2.5);
        assert_f64_approx!(config.weights.speed_bonus, DRIVENET_SPEED_BONUS_WEIGHT);
        assert_eq!(config.pass_count, DRIVENET_PASS_COUNT);
        assert_eq!(config.checkpoint_dir, None);
    }

    #[test]
    fn test_invalid_values_refused() {
        for json in [
            r#"{"population_size": 0}"#,
            r#"{"pass_count": 0}"#,
            r#"{"mutation_power": 0.0}"#,
            r#"{"max_mutation": -1.0}"#,
            r#"{"hidden_layers": 2, "neurons_in_layer": 0}"#,
        ] {
            assert!(
                matches!(json.parse::<TrainingConfig>(), Err(TrainingError::Config(_))),
                "{json}"
            );
        }
        assert!(matches!(
            "not json".parse::<TrainingConfig>(),
            Err(TrainingError::ConfigFile(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training.json");
        let config = TrainingConfig {
            sensor_count: 3,
            checkpoint_dir: Some(dir.path().to_owned()),
            ..TrainingConfig::default()
        };
        fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();
        assert_eq!(TrainingConfig::from_file(&path).unwrap(), config);

        assert!(matches!(
            TrainingConfig::from_file(dir.path().join("missing.json")),
            Err(TrainingError::ConfigIo { .. })
        ));
    }
}
