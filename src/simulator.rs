//! The boundary to the physics host. The trainer never touches physics or rendering; it reads
//! [Telemetry] and writes [Controls] through a [Simulator] once per fixed tick.

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Value reported by a ray sensor that hit nothing
pub const NO_HIT: f64 = -1.;

pub const SPEED_INPUT: &str = "speed";
pub const STEERING_INPUT: &str = "steering";
pub const MOTOR_OUTPUT: &str = "motor";
pub const STEER_OUTPUT: &str = "steer";

pub fn ray_input(idx: usize) -> String {
    format!("ray{idx}")
}

/// Input neuron names for a vehicle with `sensor_count` rays, in network order
pub fn input_names(sensor_count: usize) -> Vec<String> {
    (0..sensor_count)
        .map(ray_input)
        .chain([SPEED_INPUT.to_owned(), STEERING_INPUT.to_owned()])
        .collect()
}

pub fn output_names() -> Vec<String> {
    vec![MOTOR_OUTPUT.to_owned(), STEER_OUTPUT.to_owned()]
}

/// A named loop of checkpoints. The last checkpoint is the finish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub checkpoints: Vec<[f64; 3]>,
}

impl Track {
    pub fn new(name: impl Into<String>, checkpoints: Vec<[f64; 3]>) -> Self {
        Self {
            name: name.into(),
            checkpoints,
        }
    }
}

/// What the host reports about the vehicle after a tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Telemetry {
    /// One distance per ray sensor, or [NO_HIT]
    pub rays: Vec<f64>,
    /// Velocity magnitude
    pub speed: f64,
    pub steering_angle: f64,
    pub position: [f64; 3],
    pub collided: bool,
}

impl Telemetry {
    /// Network inputs named as by [input_names]
    pub fn network_inputs(&self) -> FxHashMap<String, f64> {
        let mut inputs: FxHashMap<String, f64> = self
            .rays
            .iter()
            .enumerate()
            .map(|(idx, d)| (ray_input(idx), *d))
            .collect();
        inputs.insert(SPEED_INPUT.to_owned(), self.speed);
        inputs.insert(STEERING_INPUT.to_owned(), self.steering_angle);
        inputs
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.position[1]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Controls {
    pub motor_torque: f64,
    pub steering_angle: f64,
}

impl Controls {
    /// Scale network outputs, each in (-1, 1), by the vehicle's limits. Missing outputs are 0.
    pub fn from_outputs(
        outputs: &FxHashMap<String, f64>,
        max_motor_torque: f64,
        max_steering_angle: f64,
    ) -> Self {
        let get = |name: &str| outputs.get(name).copied().unwrap_or(0.);
        Self {
            motor_torque: get(MOTOR_OUTPUT) * max_motor_torque,
            steering_angle: get(STEER_OUTPUT) * max_steering_angle,
        }
    }
}

/// A vehicle on a track, stepped in lock step with the trainer.
pub trait Simulator {
    fn track(&self) -> &Track;

    /// Put the vehicle back at the start of the track, at rest
    fn reset(&mut self);

    fn telemetry(&self) -> Telemetry;

    /// Apply controls for the following steps
    fn actuate(&mut self, controls: Controls);

    /// Advance physics by `dt` seconds
    fn step(&mut self, dt: f64);
}

pub fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt()
}
