//! Mutation-only neuroevolution of feedforward networks that learn to drive a vehicle around a
//! track of checkpoints.

#[macro_use]
mod macros;

pub mod constants;
pub mod error;
pub mod fitness;
pub mod network;
pub mod random;
pub mod simulator;
pub mod training;

pub use error::{CheckpointError, FormatError, NetworkError, TrainingError};
pub use fitness::{FitnessWeights, PassRecord, PassTracker};
pub use network::{IdAllocator, InputLink, NeuralNetwork, Neuron, NeuronId, NeuronKind};
pub use simulator::{Controls, Simulator, Telemetry, Track};
pub use training::{DeathCause, Phase, RunAcceptMode, Trainer, TrainingConfig};
