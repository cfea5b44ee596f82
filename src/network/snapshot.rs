//! JSON snapshots of a network. Carries the same data as the text checkpoint, structured so other
//! tools can read it. Links name their source by id, so every link to the same source resolves to
//! the same neuron after loading.

use super::{
    checkpoint::{read_file, write_file},
    IdAllocator, InputLink, NetworkId, NeuralNetwork, NeuronId, NeuronKind,
};
use crate::error::{CheckpointError, FormatError};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct NetworkSnapshot {
    id: NetworkId,
    fitness: f64,
    breakthrough_count: u32,
    track_name: String,
    neurons: Vec<NeuronSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NeuronSnapshot {
    id: NeuronId,
    name: String,
    kind: NeuronKind,
    bias: f64,
    inputs: Vec<InputLink>,
}

impl NeuralNetwork {
    pub fn to_json(&self) -> Result<String, FormatError> {
        let snapshot = NetworkSnapshot {
            id: self.id,
            fitness: self.fitness,
            breakthrough_count: self.breakthrough_count,
            track_name: self.track_name.clone(),
            neurons: self
                .neurons
                .iter()
                .map(|n| NeuronSnapshot {
                    id: n.id(),
                    name: n.name().to_owned(),
                    kind: n.kind(),
                    bias: n.bias(),
                    inputs: n.inputs().to_vec(),
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Rebuild a network from [to_json](Self::to_json) output. Links go through the usual
    /// connection rules, so a snapshot describing an invalid graph is refused.
    pub fn from_json(s: &str, ids: &mut IdAllocator) -> Result<Self, FormatError> {
        let snapshot: NetworkSnapshot = serde_json::from_str(s)?;

        let mut network = NeuralNetwork::with_id(snapshot.id);
        network.fitness = snapshot.fitness;
        network.breakthrough_count = snapshot.breakthrough_count;
        network.set_track_name(snapshot.track_name)?;

        for neuron in snapshot.neurons.iter() {
            if !network.push_shell(neuron.id, &neuron.name, neuron.kind)? {
                return Err(FormatError::DuplicateNeuron(neuron.id));
            }
        }
        for neuron in snapshot.neurons.iter() {
            for link in neuron.inputs.iter() {
                network.link(link.source, neuron.id)?.weight = link.weight;
            }
            if let Some(shell) = network.neuron_mut(neuron.id) {
                shell.set_bias(neuron.bias);
            }
        }

        network.sort_neurons();
        ids.observe(snapshot.id)?;
        Ok(network)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        write_file(path.as_ref(), &self.to_json()?)
    }

    pub fn load_json<P: AsRef<Path>>(
        path: P,
        ids: &mut IdAllocator,
    ) -> Result<Self, CheckpointError> {
        let text = read_file(path.as_ref())?;
        Ok(Self::from_json(&text, ids)?)
    }
}
