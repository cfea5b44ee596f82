//! Fitness of a single pass. The scoring functions are pure; [PassTracker] holds the per-pass
//! accumulators they are fed from.

use crate::{
    constants::*,
    simulator::{distance, Telemetry, Track},
};
use serde::{Deserialize, Serialize};

/// Tunable scoring weights. Fixed for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessWeights {
    /// Reward per reached checkpoint
    pub checkpoint: f64,
    /// Numerator of the bonus for closing in on the next checkpoint
    pub distance_bonus: f64,
    /// Scale of average speed on unfinished passes
    pub speed_bonus: f64,
    /// Numerator of the bonus for smooth steering
    pub steering_penalty: f64,
    /// How close the vehicle must get for a checkpoint to count
    pub checkpoint_reach_distance: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            checkpoint: DRIVENET_CHECKPOINT_WEIGHT,
            distance_bonus: DRIVENET_DISTANCE_BONUS_WEIGHT,
            speed_bonus: DRIVENET_SPEED_BONUS_WEIGHT,
            steering_penalty: DRIVENET_STEERING_PENALTY_WEIGHT,
            checkpoint_reach_distance: DRIVENET_CHECKPOINT_REACH_DISTANCE,
        }
    }
}

/// Fitness while a pass is running: checkpoints reached, plus a bonus for being near the next
/// one. The bonus is dropped once every checkpoint is reached.
pub fn running_fitness(
    weights: &FitnessWeights,
    reached: usize,
    checkpoint_count: usize,
    distance_to_next: f64,
) -> f64 {
    let fitness = reached as f64 * weights.checkpoint;
    if reached >= checkpoint_count {
        fitness
    } else {
        fitness + weights.distance_bonus / (distance_to_next + 1.)
    }
}

/// Bonuses added once, when a pass ends.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PassBonus {
    pub speed: f64,
    pub time: f64,
    pub steering: f64,
}

impl PassBonus {
    pub fn total(&self) -> f64 {
        self.speed + self.time + self.steering
    }
}

/// Unfinished passes are rewarded for average speed, finished ones for a short time. Smooth
/// steering is always rewarded.
pub fn pass_end_bonus(
    weights: &FitnessWeights,
    completed: bool,
    average_speed: f64,
    elapsed: f64,
    steering_delta: f64,
) -> PassBonus {
    let (speed, time) = if completed {
        (0., 1. / (elapsed + 1.))
    } else {
        ((average_speed * weights.speed_bonus).tanh(), 0.)
    };
    PassBonus {
        speed,
        time,
        steering: weights.steering_penalty / (steering_delta + 1.),
    }
}

/// The outcome of one finished pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassRecord {
    pub fitness: f64,
    pub elapsed_time: f64,
    pub reached_checkpoint: usize,
}

impl PassRecord {
    pub fn completed(&self, checkpoint_count: usize) -> bool {
        self.reached_checkpoint >= checkpoint_count
    }
}

/// Accumulators for the pass in progress.
#[derive(Debug, Clone)]
pub struct PassTracker {
    checkpoint: usize,
    elapsed: f64,
    travelled: f64,
    steering_delta: f64,
    last_steering: Option<f64>,
    fitness: f64,
    best_fitness: f64,
    stagnation: f64,
    low_speed: f64,
}

impl Default for PassTracker {
    fn default() -> Self {
        Self {
            checkpoint: 0,
            elapsed: 0.,
            travelled: 0.,
            steering_delta: 0.,
            last_steering: None,
            fitness: 0.,
            best_fitness: f64::MIN,
            stagnation: 0.,
            low_speed: 0.,
        }
    }
}

impl PassTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tick of telemetry into the pass
    pub fn observe(
        &mut self,
        track: &Track,
        telemetry: &Telemetry,
        dt: f64,
        weights: &FitnessWeights,
        termination_speed: f64,
    ) {
        self.elapsed += dt;
        self.travelled += telemetry.speed.abs() * dt;
        if let Some(last) = self.last_steering {
            self.steering_delta += (telemetry.steering_angle - last).abs();
        }
        self.last_steering = Some(telemetry.steering_angle);

        // advance before measuring, so the distance term targets the new checkpoint
        if let Some(next) = track.checkpoints.get(self.checkpoint) {
            if distance(telemetry.position, *next) <= weights.checkpoint_reach_distance {
                self.checkpoint += 1;
            }
        }
        let to_next = track
            .checkpoints
            .get(self.checkpoint)
            .map(|next| distance(telemetry.position, *next))
            .unwrap_or(0.);
        self.fitness = running_fitness(weights, self.checkpoint, track.checkpoints.len(), to_next);

        if self.fitness > self.best_fitness {
            self.best_fitness = self.fitness;
            self.stagnation = 0.;
        } else {
            self.stagnation += dt;
        }
        if telemetry.speed >= termination_speed {
            self.low_speed = 0.;
        } else {
            self.low_speed += dt;
        }
    }

    #[inline]
    pub fn checkpoint(&self) -> usize {
        self.checkpoint
    }

    #[inline]
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Seconds since the pass fitness last improved
    #[inline]
    pub fn stagnation(&self) -> f64 {
        self.stagnation
    }

    /// Seconds spent under the termination speed
    #[inline]
    pub fn low_speed(&self) -> f64 {
        self.low_speed
    }

    pub fn steering_delta(&self) -> f64 {
        self.steering_delta
    }

    pub fn average_speed(&self) -> f64 {
        if self.elapsed > 0. {
            self.travelled / self.elapsed
        } else {
            0.
        }
    }

    pub fn completed(&self, track: &Track) -> bool {
        self.checkpoint >= track.checkpoints.len()
    }

    /// Close the pass: running fitness plus the pass-end bonuses
    pub fn finish(&self, track: &Track, weights: &FitnessWeights) -> PassRecord {
        let bonus = pass_end_bonus(
            weights,
            self.completed(track),
            self.average_speed(),
            self.elapsed,
            self.steering_delta,
        );
        PassRecord {
            fitness: self.fitness + bonus.total(),
            elapsed_time: self.elapsed,
            reached_checkpoint: self.checkpoint,
        }
    }
}
