//! Centralized defaults for training parameters.
//!
//! Every default used by [TrainingConfig](crate::training::TrainingConfig) is defined here with
//! the `DRIVENET_` prefix.

// ============================================================================
// Topology
// ============================================================================

/// Number of raycast distance sensors fed into the network
pub const DRIVENET_SENSOR_COUNT: usize = 5;

/// Number of fully connected hidden layers
pub const DRIVENET_HIDDEN_LAYERS: usize = 1;

/// Neurons per hidden layer
pub const DRIVENET_NEURONS_IN_LAYER: usize = 6;

// ============================================================================
// Population
// ============================================================================

/// Candidates evaluated per generation, including the unmutated control
pub const DRIVENET_POPULATION_SIZE: usize = 20;

/// Passes (robustness trials) per run
pub const DRIVENET_PASS_COUNT: usize = 3;

/// Exponent shaping both the per-candidate mutation scale and each neuron's draw
pub const DRIVENET_MUTATION_POWER: f64 = 2.0;

/// Upper bound on any single weight or bias delta
pub const DRIVENET_MAX_MUTATION: f64 = 0.5;

// ============================================================================
// Fitness
// ============================================================================

/// Reward per reached checkpoint
pub const DRIVENET_CHECKPOINT_WEIGHT: f64 = 1.0;

/// Numerator of the distance-to-next-checkpoint bonus
pub const DRIVENET_DISTANCE_BONUS_WEIGHT: f64 = 0.5;

/// Scale applied to average speed before tanh on unfinished passes
pub const DRIVENET_SPEED_BONUS_WEIGHT: f64 = 0.1;

/// Numerator of the steering smoothness bonus
pub const DRIVENET_STEERING_PENALTY_WEIGHT: f64 = 0.1;

/// Distance at which a checkpoint counts as reached
pub const DRIVENET_CHECKPOINT_REACH_DISTANCE: f64 = 2.0;

// ============================================================================
// Termination
// ============================================================================

/// Seconds a stall timer may run before the pass ends
pub const DRIVENET_TERMINATION_DELAY: f64 = 3.0;

/// Speed under which the low-speed timer accumulates
pub const DRIVENET_TERMINATION_SPEED: f64 = 0.5;

/// Vertical position under which the vehicle counts as fallen off the track
pub const DRIVENET_FLOOR_HEIGHT: f64 = -10.0;

/// Whether a collision ends the pass
pub const DRIVENET_COLLISION_TERMINATES: bool = true;

// ============================================================================
// Actuation
// ============================================================================

/// Torque applied for a motor output of 1
pub const DRIVENET_MAX_MOTOR_TORQUE: f64 = 400.0;

/// Steering angle, in degrees, applied for a steering output of 1
pub const DRIVENET_MAX_STEERING_ANGLE: f64 = 30.0;
