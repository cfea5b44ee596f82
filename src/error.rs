//! Error types, one per layer. Lower layers convert into higher ones with `?`.

use crate::network::{NeuronId, NeuronKind};
use std::{io, path::PathBuf};
use thiserror::Error;

/// A violation of the neuron graph's structural contract.
#[derive(Debug, Error, PartialEq)]
pub enum NetworkError {
    #[error("no neuron named {0:?}")]
    NotFound(String),
    #[error("no neuron with id {0}")]
    UnknownNeuron(NeuronId),
    #[error("{count} neurons match {name:?}, expected exactly one")]
    Ambiguous { name: String, count: usize },
    #[error("cannot link {from_kind:?} neuron {from} into {to_kind:?} neuron {to}")]
    InvalidDirection {
        from: NeuronId,
        from_kind: NeuronKind,
        to: NeuronId,
        to_kind: NeuronKind,
    },
    #[error("link {from} -> {to} would introduce a cycle")]
    Cycle { from: NeuronId, to: NeuronId },
    #[error("expected {expected} values, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("input neurons can not {0}")]
    InvalidOperation(&'static str),
    #[error("auto-connecting needs at least 2 layers, network has {0}")]
    TooFewLayers(usize),
    #[error("invalid name {0:?}: names must be a single non-empty line")]
    InvalidName(String),
    #[error("id {0} is out of range")]
    IdOutOfRange(u64),
}

/// A checkpoint that could not be parsed into a network.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("duplicate neuron id {0}")]
    DuplicateNeuron(NeuronId),
    #[error("snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rebuilding links: {0}")]
    Network(#[from] NetworkError),
}

impl FormatError {
    pub(crate) fn at(line: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

/// Failure to read or write a checkpoint file.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Anything that stops the training controller from advancing.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("invalid configuration: {0}")]
    Config(&'static str),
    #[error("reading configuration: {0}")]
    ConfigFile(#[from] serde_json::Error),
    #[error("reading configuration {path}: {source}")]
    ConfigIo { path: PathBuf, source: io::Error },
    #[error("trainer state broken: {0}")]
    State(&'static str),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}
