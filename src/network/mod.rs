//! Feedforward neuron graphs whose topology can be edited in place. Neurons live in an arena and
//! address each other by [NeuronId]; the layer structure and the output-link view are derived
//! from the input links by [NeuralNetwork::sort_neurons] after every topology change.

pub mod checkpoint;
pub mod neuron;
pub mod snapshot;

pub use neuron::{InputLink, Neuron, NeuronId, NeuronKind};

use crate::error::NetworkError;
use core::hash::BuildHasher;
use fxhash::FxHashMap;
use rand::RngCore;
use std::collections::HashMap;

/// Identifier of a network instance.
pub type NetworkId = u64;

/// Largest network id a loaded network may carry, leaving room above it for allocation
pub const MAX_NETWORK_ID: NetworkId = NetworkId::MAX / 2;
/// Largest neuron id a loaded network may carry
pub const MAX_NEURON_ID: NeuronId = NeuronId::MAX / 2;

/// Neuron and track names are stored one per line, so they can't span lines. Neuron names
/// also can't be empty.
fn check_name(name: &str, allow_empty: bool) -> Result<(), NetworkError> {
    if (name.is_empty() && !allow_empty) || name.contains(['\n', '\r']) {
        return Err(NetworkError::InvalidName(name.to_owned()));
    }
    Ok(())
}

/// Hands out strictly increasing [NetworkId]s. Every constructed, copied or loaded network goes
/// through one of these.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    next: NetworkId,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(next: NetworkId) -> Self {
        Self { next }
    }

    pub fn allocate(&mut self) -> NetworkId {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Record an id that was created elsewhere, so later allocations stay above it
    pub fn observe(&mut self, id: NetworkId) -> Result<(), NetworkError> {
        if id > MAX_NETWORK_ID {
            return Err(NetworkError::IdOutOfRange(id));
        }
        self.next = self.next.max(id + 1);
        Ok(())
    }

    pub fn peek(&self) -> NetworkId {
        self.next
    }
}

#[derive(Debug, Clone)]
pub struct NeuralNetwork {
    id: NetworkId,
    neurons: Vec<Neuron>,
    // derived by sort_neurons
    layers: Vec<Vec<NeuronId>>,
    successors: Vec<Vec<usize>>,
    // id -> position in `neurons`
    index: FxHashMap<NeuronId, usize>,
    next_neuron: NeuronId,
    fitness: f64,
    breakthrough_count: u32,
    track_name: String,
}

impl NeuralNetwork {
    /// A network with no neurons
    pub fn empty(ids: &mut IdAllocator) -> Self {
        Self::with_id(ids.allocate())
    }

    pub(crate) fn with_id(id: NetworkId) -> Self {
        Self {
            id,
            neurons: Vec::new(),
            layers: Vec::new(),
            successors: Vec::new(),
            index: FxHashMap::default(),
            next_neuron: 0,
            fitness: 0.,
            breakthrough_count: 0,
            track_name: String::new(),
        }
    }

    /// Build a fully connected network: one input neuron per name in `inputs`, `hidden_layers`
    /// layers of `neurons_in_layer` hidden neurons, and one output neuron per name in `outputs`.
    /// Every layer is fully connected to the one before it. All weights and biases start at 0.
    ///
    /// Names must be non-empty and free of line breaks.
    pub fn new<I: AsRef<str>, O: AsRef<str>>(
        ids: &mut IdAllocator,
        inputs: &[I],
        outputs: &[O],
        hidden_layers: usize,
        neurons_in_layer: usize,
    ) -> Result<Self, NetworkError> {
        for name in inputs.iter().map(AsRef::as_ref).chain(outputs.iter().map(AsRef::as_ref)) {
            check_name(name, false)?;
        }
        let mut network = Self::empty(ids);

        let mut previous: Vec<NeuronId> = inputs
            .iter()
            .map(|name| network.push_neuron(name.as_ref(), NeuronKind::Input))
            .collect();

        for layer in 0..hidden_layers {
            let current: Vec<NeuronId> = (0..neurons_in_layer)
                .map(|idx| network.push_neuron(format!("hidden{layer}_{idx}"), NeuronKind::Hidden))
                .collect();
            network.link_all(&previous, &current);
            previous = current;
        }

        let output_ids: Vec<NeuronId> = outputs
            .iter()
            .map(|name| network.push_neuron(name.as_ref(), NeuronKind::Output))
            .collect();
        network.link_all(&previous, &output_ids);

        network.sort_neurons();
        Ok(network)
    }

    // only for layers freshly built by `new`, whose kinds are known to be linkable
    fn link_all(&mut self, sources: &[NeuronId], targets: &[NeuronId]) {
        for target in targets {
            let pos = self.index[target];
            self.neurons[pos]
                .inputs
                .extend(sources.iter().map(|source| InputLink::new(*source)));
        }
    }

    fn push_neuron(&mut self, name: impl Into<String>, kind: NeuronKind) -> NeuronId {
        let id = self.next_neuron;
        self.next_neuron += 1;
        self.index.insert(id, self.neurons.len());
        self.neurons.push(Neuron::new(id, name, kind));
        id
    }

    /// Insert a bare neuron with a known id. Returns false if the id is already taken.
    pub(crate) fn push_shell(
        &mut self,
        id: NeuronId,
        name: &str,
        kind: NeuronKind,
    ) -> Result<bool, NetworkError> {
        if id > MAX_NEURON_ID {
            return Err(NetworkError::IdOutOfRange(id as u64));
        }
        check_name(name, false)?;
        if self.index.contains_key(&id) {
            return Ok(false);
        }
        self.next_neuron = self.next_neuron.max(id + 1);
        self.index.insert(id, self.neurons.len());
        self.neurons.push(Neuron::new(id, name, kind));
        Ok(true)
    }

    fn position(&self, id: NeuronId) -> Result<usize, NetworkError> {
        self.index
            .get(&id)
            .copied()
            .ok_or(NetworkError::UnknownNeuron(id))
    }

    #[inline]
    pub fn id(&self) -> NetworkId {
        self.id
    }

    #[inline]
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }

    #[inline]
    pub fn breakthrough_count(&self) -> u32 {
        self.breakthrough_count
    }

    pub fn set_breakthrough_count(&mut self, count: u32) {
        self.breakthrough_count = count;
    }

    #[inline]
    pub fn track_name(&self) -> &str {
        &self.track_name
    }

    /// Name the track this network was trained on. The name can't contain line breaks.
    pub fn set_track_name(&mut self, name: impl Into<String>) -> Result<(), NetworkError> {
        let name = name.into();
        check_name(&name, true)?;
        self.track_name = name;
        Ok(())
    }

    /// All neurons, in insertion order
    #[inline]
    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn neuron(&self, id: NeuronId) -> Option<&Neuron> {
        self.index.get(&id).map(|pos| &self.neurons[*pos])
    }

    pub fn neuron_mut(&mut self, id: NeuronId) -> Option<&mut Neuron> {
        self.index.get(&id).map(|pos| &mut self.neurons[*pos])
    }

    pub fn neurons_of(&self, kind: NeuronKind) -> impl Iterator<Item = &Neuron> {
        self.neurons.iter().filter(move |n| n.kind() == kind)
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Neuron> {
        self.neurons_of(NeuronKind::Input)
    }

    pub fn hidden(&self) -> impl Iterator<Item = &Neuron> {
        self.neurons_of(NeuronKind::Hidden)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Neuron> {
        self.neurons_of(NeuronKind::Output)
    }

    /// Neuron ids grouped by layer, ascending. Layer 0 is exactly the neurons without inputs.
    #[inline]
    pub fn layers(&self) -> &[Vec<NeuronId>] {
        &self.layers
    }

    /// Ids of the neurons that `id` feeds into, one entry per link
    pub fn output_links(&self, id: NeuronId) -> Result<Vec<NeuronId>, NetworkError> {
        let pos = self.position(id)?;
        Ok(self.successors[pos]
            .iter()
            .map(|s| self.neurons[*s].id())
            .collect())
    }

    /// The id of the one neuron called `name`
    pub fn find(&self, name: &str) -> Result<NeuronId, NetworkError> {
        Self::unique(name, self.neurons.iter().filter(|n| n.name() == name))
    }

    /// The id of the one neuron of `kind` called `name`
    pub fn find_kind(&self, name: &str, kind: NeuronKind) -> Result<NeuronId, NetworkError> {
        Self::unique(name, self.neurons_of(kind).filter(|n| n.name() == name))
    }

    fn unique<'a>(
        name: &str,
        mut matches: impl Iterator<Item = &'a Neuron>,
    ) -> Result<NeuronId, NetworkError> {
        let first = matches
            .next()
            .ok_or_else(|| NetworkError::NotFound(name.to_owned()))?;
        let rest = matches.count();
        if rest > 0 {
            return Err(NetworkError::Ambiguous {
                name: name.to_owned(),
                count: rest + 1,
            });
        }
        Ok(first.id())
    }

    /// Check that `source -> target` may be added, without adding it
    fn check_link(&self, source: NeuronId, target: NeuronId) -> Result<(), NetworkError> {
        let from = &self.neurons[self.position(source)?];
        let to = &self.neurons[self.position(target)?];
        if from.kind() == NeuronKind::Output || to.kind() == NeuronKind::Input {
            return Err(NetworkError::InvalidDirection {
                from: source,
                from_kind: from.kind(),
                to: target,
                to_kind: to.kind(),
            });
        }
        if self.depends_on(source, target) {
            return Err(NetworkError::Cycle {
                from: source,
                to: target,
            });
        }
        Ok(())
    }

    /// Whether `ancestor` is `id` or feeds into it through any path of input links
    fn depends_on(&self, id: NeuronId, ancestor: NeuronId) -> bool {
        let mut seen = vec![false; self.neurons.len()];
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if current == ancestor {
                return true;
            }
            let Some(&pos) = self.index.get(&current) else {
                continue;
            };
            if seen[pos] {
                continue;
            }
            seen[pos] = true;
            stack.extend(self.neurons[pos].inputs.iter().map(|l| l.source));
        }
        false
    }

    /// Append a zero weight link without re-deriving layers
    pub(crate) fn link(
        &mut self,
        source: NeuronId,
        target: NeuronId,
    ) -> Result<&mut InputLink, NetworkError> {
        self.check_link(source, target)?;
        let pos = self.position(target)?;
        let inputs = &mut self.neurons[pos].inputs;
        inputs.push(InputLink::new(source));
        let last = inputs.len() - 1;
        Ok(&mut inputs[last])
    }

    /// Link `source` into `target` with a weight of 0, returning the new link so its weight can
    /// be set.
    ///
    /// Output neurons can't be sources, input neurons can't be targets, and links closing a
    /// cycle are refused.
    pub fn connect(
        &mut self,
        source: NeuronId,
        target: NeuronId,
    ) -> Result<&mut InputLink, NetworkError> {
        self.link(source, target)?;
        self.sort_neurons();
        let pos = self.position(target)?;
        let inputs = &mut self.neurons[pos].inputs;
        let last = inputs.len() - 1;
        Ok(&mut inputs[last])
    }

    pub fn connect_names(
        &mut self,
        source: &str,
        target: &str,
    ) -> Result<&mut InputLink, NetworkError> {
        let (source, target) = (self.find(source)?, self.find(target)?);
        self.connect(source, target)
    }

    pub fn add_input_neuron(&mut self, name: &str, connect: bool) -> Result<NeuronId, NetworkError> {
        self.add_neuron(name, NeuronKind::Input, connect)
    }

    pub fn add_output_neuron(
        &mut self,
        name: &str,
        connect: bool,
    ) -> Result<NeuronId, NetworkError> {
        self.add_neuron(name, NeuronKind::Output, connect)
    }

    /// Append a neuron, optionally wiring it to every neuron of the adjacent layer: layer 1 for
    /// inputs, the second to last layer for outputs.
    fn add_neuron(
        &mut self,
        name: &str,
        kind: NeuronKind,
        connect: bool,
    ) -> Result<NeuronId, NetworkError> {
        check_name(name, false)?;
        let neighbours = if connect {
            if self.layers.len() < 2 {
                return Err(NetworkError::TooFewLayers(self.layers.len()));
            }
            let layer = match kind {
                NeuronKind::Output => &self.layers[self.layers.len() - 2],
                _ => &self.layers[1],
            };
            // a failed add must leave the network unchanged
            let blocked = match kind {
                NeuronKind::Output => NeuronKind::Output,
                _ => NeuronKind::Input,
            };
            if let Some(bad) = layer
                .iter()
                .map(|id| &self.neurons[self.index[id]])
                .find(|n| n.kind() == blocked)
            {
                let (from, from_kind, to, to_kind) = match kind {
                    NeuronKind::Output => (bad.id(), bad.kind(), self.next_neuron, kind),
                    _ => (self.next_neuron, kind, bad.id(), bad.kind()),
                };
                return Err(NetworkError::InvalidDirection {
                    from,
                    from_kind,
                    to,
                    to_kind,
                });
            }
            layer.clone()
        } else {
            Vec::new()
        };

        let id = self.push_neuron(name, kind);
        for neighbour in neighbours {
            match kind {
                NeuronKind::Output => self.link(neighbour, id)?,
                _ => self.link(id, neighbour)?,
            };
        }
        self.sort_neurons();
        Ok(id)
    }

    pub fn remove_input_neuron(&mut self, name: &str) -> Result<Neuron, NetworkError> {
        let id = self.find_kind(name, NeuronKind::Input)?;
        self.remove_neuron(id)
    }

    pub fn remove_output_neuron(&mut self, name: &str) -> Result<Neuron, NetworkError> {
        let id = self.find_kind(name, NeuronKind::Output)?;
        self.remove_neuron(id)
    }

    /// Remove a neuron along with every link that references it
    pub fn remove_neuron(&mut self, id: NeuronId) -> Result<Neuron, NetworkError> {
        let pos = self.position(id)?;
        for neuron in self.neurons.iter_mut() {
            neuron.inputs.retain(|l| l.source != id);
        }
        let removed = self.neurons.remove(pos);
        self.index = self
            .neurons
            .iter()
            .enumerate()
            .map(|(pos, n)| (n.id(), pos))
            .collect();
        self.sort_neurons();
        Ok(removed)
    }

    /// Set the weight of the one link into `target` whose source is called `source_name`.
    /// Neurons of the same name that don't feed `target` play no part.
    pub fn set_weight(
        &mut self,
        target: NeuronId,
        source_name: &str,
        weight: f64,
    ) -> Result<(), NetworkError> {
        let pos = self.position(target)?;
        let matching: Vec<usize> = self.neurons[pos]
            .inputs
            .iter()
            .enumerate()
            .filter(|(_, l)| {
                self.index
                    .get(&l.source)
                    .is_some_and(|src| self.neurons[*src].name() == source_name)
            })
            .map(|(idx, _)| idx)
            .collect();
        match matching[..] {
            [] => Err(NetworkError::NotFound(source_name.to_owned())),
            [idx] => {
                self.neurons[pos].inputs[idx].weight = weight;
                Ok(())
            }
            _ => Err(NetworkError::Ambiguous {
                name: source_name.to_owned(),
                count: matching.len(),
            }),
        }
    }

    pub fn set_weights(&mut self, target: NeuronId, weights: &[f64]) -> Result<(), NetworkError> {
        let pos = self.position(target)?;
        self.neurons[pos].set_weights(weights)
    }

    /// Re-derive layers by longest path from the neurons without inputs.
    ///
    /// Every neuron starts at layer 0. Starting from the neurons without inputs, each frontier
    /// pushes `layer + 1` onto its successors wherever that raises them, and the raised
    /// successors form the next frontier. A neuron with no outgoing links lands wherever its
    /// longest incoming path puts it, which need not be the last layer.
    pub fn sort_neurons(&mut self) {
        let count = self.neurons.len();
        let mut successors = vec![Vec::new(); count];
        for (pos, neuron) in self.neurons.iter().enumerate() {
            for link in neuron.inputs.iter() {
                if let Some(&src) = self.index.get(&link.source) {
                    successors[src].push(pos);
                }
            }
        }

        for neuron in self.neurons.iter_mut() {
            neuron.layer = 0;
        }

        let mut frontier: Vec<usize> = (0..count)
            .filter(|pos| self.neurons[*pos].inputs.is_empty())
            .collect();
        let mut queued = vec![false; count];
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for pos in frontier {
                let layer = self.neurons[pos].layer + 1;
                for &succ in successors[pos].iter() {
                    if self.neurons[succ].layer < layer {
                        self.neurons[succ].layer = layer;
                        if !queued[succ] {
                            queued[succ] = true;
                            next.push(succ);
                        }
                    }
                }
            }
            for pos in next.iter() {
                queued[*pos] = false;
            }
            frontier = next;
        }

        let depth = self.neurons.iter().map(|n| n.layer + 1).max().unwrap_or(0);
        let mut layers = vec![Vec::new(); depth];
        for neuron in self.neurons.iter() {
            layers[neuron.layer].push(neuron.id());
        }
        self.layers = layers;
        self.successors = successors;
    }

    /// Evaluate the network. `inputs` must name every input neuron exactly once; the result maps
    /// every output neuron's name to its value.
    pub fn feedforward<S: BuildHasher>(
        &mut self,
        inputs: &HashMap<String, f64, S>,
    ) -> Result<FxHashMap<String, f64>, NetworkError> {
        let expected = self.inputs().count();
        if inputs.len() != expected {
            return Err(NetworkError::SizeMismatch {
                expected,
                actual: inputs.len(),
            });
        }
        for (name, value) in inputs {
            let id = self.find_kind(name, NeuronKind::Input)?;
            let pos = self.index[&id];
            self.neurons[pos].value = *value;
        }

        for layer in self.layers.iter().skip(1) {
            for id in layer {
                let pos = self.index[id];
                let sum = self.neurons[pos]
                    .inputs
                    .iter()
                    .map(|l| l.weight * self.neurons[self.index[&l.source]].value)
                    .sum::<f64>();
                self.neurons[pos].feedforward(sum);
            }
        }

        Ok(self
            .outputs()
            .map(|n| (n.name().to_owned(), n.value()))
            .collect())
    }

    /// Perturb the weights and biases of every hidden and output neuron
    pub fn mutate(
        &mut self,
        power: f64,
        max_mutation: f64,
        rng: &mut impl RngCore,
    ) -> Result<(), NetworkError> {
        for neuron in self
            .neurons
            .iter_mut()
            .filter(|n| n.kind() != NeuronKind::Input)
        {
            neuron.mutate(power, max_mutation, rng)?;
        }
        Ok(())
    }

    /// A deep, independent copy of this network under a fresh id
    pub fn copy(&self, ids: &mut IdAllocator) -> Self {
        Self {
            id: ids.allocate(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{assert_f64_approx, random::WyRng};
    use rand::Rng;

    pub(crate) fn input_map(values: &[(&str, f64)]) -> FxHashMap<String, f64> {
        values.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn two_by_two(ids: &mut IdAllocator) -> NeuralNetwork {
        NeuralNetwork::new(ids, &["input1", "input2"], &["output1", "output2"], 2, 2).unwrap()
    }

    fn assert_layering_strict(network: &NeuralNetwork) {
        for neuron in network.neurons() {
            for link in neuron.inputs() {
                let source = network.neuron(link.source).unwrap();
                assert!(
                    neuron.layer() > source.layer(),
                    "{neuron} is not above {source}"
                );
            }
        }
        let mut roots: Vec<_> = network
            .neurons()
            .iter()
            .filter(|n| n.inputs().is_empty())
            .map(|n| n.id())
            .collect();
        let mut first = network.layers()[0].clone();
        roots.sort();
        first.sort();
        assert_eq!(roots, first);
    }

    #[test]
    fn test_new_topology() {
        let mut ids = IdAllocator::new();
        let network = two_by_two(&mut ids);
        assert_eq!(network.neurons().len(), 8);
        assert_eq!(network.layers().len(), 4);
        assert_eq!(network.layers()[0], vec![0, 1]);
        assert_eq!(network.layers()[3], vec![6, 7]);
        for neuron in network.hidden().chain(network.outputs()) {
            assert_eq!(neuron.inputs().len(), 2);
            assert!(neuron.weights().all(|w| w == 0.));
            assert_f64_approx!(neuron.bias(), 0.);
        }
        assert_eq!(network.output_links(0).unwrap(), vec![2, 3]);
        assert_layering_strict(&network);
    }

    #[test]
    fn test_new_without_hidden_layers() {
        let mut ids = IdAllocator::new();
        let network = NeuralNetwork::new(&mut ids, &["a", "b", "c"], &["x"], 0, 4).unwrap();
        assert_eq!(network.layers().len(), 2);
        assert_eq!(network.outputs().next().unwrap().inputs().len(), 3);
    }

    #[test]
    fn test_ids_increase() {
        let mut ids = IdAllocator::new();
        let a = two_by_two(&mut ids);
        let b = a.copy(&mut ids);
        let c = two_by_two(&mut ids);
        assert!(a.id() < b.id() && b.id() < c.id());
        ids.observe(100).unwrap();
        assert_eq!(ids.allocate(), 101);
        ids.observe(5).unwrap();
        assert_eq!(ids.peek(), 102);
    }

    #[test]
    fn test_observe_out_of_range() {
        let mut ids = IdAllocator::new();
        assert_eq!(
            ids.observe(NetworkId::MAX),
            Err(NetworkError::IdOutOfRange(NetworkId::MAX))
        );
        assert_eq!(ids.peek(), 0);
        ids.observe(MAX_NETWORK_ID).unwrap();
        assert_eq!(ids.allocate(), MAX_NETWORK_ID + 1);
    }

    #[test]
    fn test_names_must_fit_on_a_line() {
        let mut ids = IdAllocator::new();
        for bad in ["", "in\nput", "input\r"] {
            assert_eq!(
                NeuralNetwork::new(&mut ids, &[bad], &["x"], 0, 0).unwrap_err(),
                NetworkError::InvalidName(bad.into())
            );
        }
        assert!(NeuralNetwork::new(&mut ids, &["a"], &["x\ny"], 1, 1).is_err());

        let mut network = two_by_two(&mut ids);
        assert_eq!(
            network.add_input_neuron("", false),
            Err(NetworkError::InvalidName(String::new()))
        );
        assert!(network.add_output_neuron("out\n3", true).is_err());
        assert_eq!(network.neurons().len(), 8);

        assert!(network.set_track_name("Oval\nfitness 9").is_err());
        assert_eq!(network.track_name(), "");
        network.set_track_name("").unwrap();
        network.set_track_name("Long Oval").unwrap();
        assert_eq!(network.track_name(), "Long Oval");
    }

    #[test]
    fn test_feedforward_chain() {
        let mut ids = IdAllocator::new();
        let mut network = two_by_two(&mut ids);
        let hidden: Vec<NeuronId> = network.hidden().map(|n| n.id()).collect();
        let outputs: Vec<NeuronId> = network.outputs().map(|n| n.id()).collect();
        network.set_weights(hidden[0], &[1., 0.]).unwrap();
        network.set_weights(hidden[2], &[1., 0.]).unwrap();
        network.set_weights(outputs[0], &[1., 0.]).unwrap();

        let out = network
            .feedforward(&input_map(&[("input1", 2.), ("input2", 3.)]))
            .unwrap();
        assert_f64_approx!(out["output1"], 2f64.tanh().tanh().tanh());
        assert_f64_approx!(out["output2"], 0.);
    }

    #[test]
    fn test_feedforward_single_hidden_layer() {
        let mut ids = IdAllocator::new();
        let mut network =
            NeuralNetwork::new(&mut ids, &["input1", "input2"], &["output1", "output2"], 1, 2)
                .unwrap();
        network.set_weight(2, "input1", 1.).unwrap();
        network.set_weight(4, "hidden0_0", 1.).unwrap();
        let out = network
            .feedforward(&input_map(&[("input1", 2.), ("input2", 3.)]))
            .unwrap();
        assert_f64_approx!(out["output1"], 2f64.tanh().tanh());
        assert_f64_approx!(out["output2"], 0.);
    }

    #[test]
    fn test_feedforward_deterministic() {
        let mut ids = IdAllocator::new();
        let mut network = two_by_two(&mut ids);
        network.mutate(1., 2., &mut WyRng::seeded(9)).unwrap();
        let inputs = input_map(&[("input1", 0.3), ("input2", -1.7)]);
        let first = network.feedforward(&inputs).unwrap();
        let second = network.feedforward(&inputs).unwrap();
        for (name, value) in first.iter() {
            assert_eq!(value.to_bits(), second[name].to_bits());
        }
    }

    #[test]
    fn test_feedforward_rejects_bad_inputs() {
        let mut ids = IdAllocator::new();
        let mut network = two_by_two(&mut ids);
        assert_eq!(
            network.feedforward(&input_map(&[("input1", 1.)])),
            Err(NetworkError::SizeMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(
            network.feedforward(&input_map(&[("input1", 1.), ("output1", 1.)])),
            Err(NetworkError::NotFound("output1".into()))
        );
    }

    #[test]
    fn test_connect_direction() {
        let mut ids = IdAllocator::new();
        let mut network = two_by_two(&mut ids);
        assert!(matches!(
            network.connect(6, 2),
            Err(NetworkError::InvalidDirection { .. })
        ));
        assert!(matches!(
            network.connect(2, 0),
            Err(NetworkError::InvalidDirection { .. })
        ));
        assert!(matches!(
            network.connect(4, 2),
            Err(NetworkError::Cycle { from: 4, to: 2 })
        ));
        assert_eq!(network.connect(0, 99).unwrap_err(), NetworkError::UnknownNeuron(99));
    }

    #[test]
    fn test_connect_skip_layer() {
        let mut ids = IdAllocator::new();
        let mut network = two_by_two(&mut ids);
        network.connect(0, 6).unwrap().weight = 0.5;
        assert_eq!(network.neuron(6).unwrap().inputs().last().unwrap().weight, 0.5);
        assert!(network.output_links(0).unwrap().contains(&6));
        assert_layering_strict(&network);
    }

    #[test]
    fn test_connect_deepens_layers() {
        let mut ids = IdAllocator::new();
        let mut network = two_by_two(&mut ids);
        // hidden1_0 now also depends on hidden1_1, pushing it and the outputs one layer down
        network.connect(5, 4).unwrap();
        assert_eq!(network.layers().len(), 5);
        assert_eq!(network.neuron(4).unwrap().layer(), 3);
        assert_eq!(network.neuron(6).unwrap().layer(), 4);
        assert_layering_strict(&network);
    }

    #[test]
    fn test_sort_idempotent() {
        let mut ids = IdAllocator::new();
        let mut network = two_by_two(&mut ids);
        network.connect(1, 7).unwrap();
        network.sort_neurons();
        let once = network.layers().to_vec();
        network.sort_neurons();
        assert_eq!(once, network.layers());
    }

    #[test]
    fn test_orphaned_hidden_joins_layer_zero() {
        let mut ids = IdAllocator::new();
        let mut network = NeuralNetwork::new(&mut ids, &["a"], &["x"], 2, 1).unwrap();
        let removed = network.remove_neuron(1).unwrap();
        assert_eq!(removed.name(), "hidden0_0");
        // hidden1_0 lost its only input and now sits beside the input, which feeds nothing
        assert_eq!(network.layers()[0], vec![0, 2]);
        assert!(network.output_links(0).unwrap().is_empty());
        assert_eq!(network.neuron(3).unwrap().layer(), 1);
        assert_layering_strict(&network);
    }

    #[test]
    fn test_add_input_neuron() {
        let mut ids = IdAllocator::new();
        let mut network = two_by_two(&mut ids);
        let id = network.add_input_neuron("input3", true).unwrap();
        assert_eq!(id, 8);
        assert_eq!(network.output_links(id).unwrap(), vec![2, 3]);
        assert_eq!(network.neuron(2).unwrap().inputs().len(), 3);
        assert!(network.layers()[0].contains(&id));

        let loose = network.add_input_neuron("input4", false).unwrap();
        assert!(network.output_links(loose).unwrap().is_empty());
        assert_eq!(
            network.add_input_neuron("input4", false),
            Ok(10)
        );
        assert!(matches!(
            network.find("input4"),
            Err(NetworkError::Ambiguous { count: 2, .. })
        ));
    }

    #[test]
    fn test_add_output_neuron() {
        let mut ids = IdAllocator::new();
        let mut network = two_by_two(&mut ids);
        let id = network.add_output_neuron("output3", true).unwrap();
        let sources: Vec<_> = network
            .neuron(id)
            .unwrap()
            .inputs()
            .iter()
            .map(|l| l.source)
            .collect();
        assert_eq!(sources, vec![4, 5]);
        assert!(network.layers().last().unwrap().contains(&id));
    }

    #[test]
    fn test_add_neuron_too_few_layers() {
        let mut ids = IdAllocator::new();
        let mut network = NeuralNetwork::empty(&mut ids);
        assert_eq!(
            network.add_input_neuron("a", true),
            Err(NetworkError::TooFewLayers(0))
        );
        assert!(network.neurons().is_empty());
        network.add_input_neuron("a", false).unwrap();
        assert_eq!(network.layers().len(), 1);
    }

    #[test]
    fn test_remove_neurons() {
        let mut ids = IdAllocator::new();
        let mut network = two_by_two(&mut ids);
        network.remove_input_neuron("input1").unwrap();
        assert!(network
            .neurons()
            .iter()
            .all(|n| n.inputs().iter().all(|l| l.source != 0)));
        assert_eq!(network.neuron(2).unwrap().inputs().len(), 1);

        let out = network.remove_output_neuron("output2").unwrap();
        assert_eq!(out.id(), 7);
        assert!(network.output_links(4).unwrap() == vec![6]);
        assert_eq!(
            network.remove_output_neuron("output2").unwrap_err(),
            NetworkError::NotFound("output2".into())
        );
        assert_eq!(
            network.remove_input_neuron("output1").unwrap_err(),
            NetworkError::NotFound("output1".into())
        );

        // ids are never reused
        assert_eq!(network.add_input_neuron("again", false), Ok(8));
        assert_layering_strict(&network);
    }

    #[test]
    fn test_set_weight_by_name() {
        let mut ids = IdAllocator::new();
        let mut network = two_by_two(&mut ids);
        network.set_weight(2, "input2", 0.75).unwrap();
        assert_eq!(network.neuron(2).unwrap().weights().collect::<Vec<_>>(), vec![0., 0.75]);
        assert_eq!(
            network.set_weight(2, "hidden1_0", 1.),
            Err(NetworkError::NotFound("hidden1_0".into()))
        );
        network.connect(0, 2).unwrap();
        assert_eq!(
            network.set_weight(2, "input1", 1.),
            Err(NetworkError::Ambiguous {
                name: "input1".into(),
                count: 2
            })
        );
    }

    #[test]
    fn test_set_weight_ignores_unlinked_namesakes() {
        let mut ids = IdAllocator::new();
        let mut network = two_by_two(&mut ids);
        let loose = network.add_input_neuron("input1", false).unwrap();
        network.set_weight(2, "input1", 1.).unwrap();
        assert_eq!(network.neuron(2).unwrap().weights().collect::<Vec<_>>(), vec![1., 0.]);

        // once the namesake feeds the target too, the name no longer picks one link
        network.connect(loose, 2).unwrap();
        assert_eq!(
            network.set_weight(2, "input1", 0.5),
            Err(NetworkError::Ambiguous {
                name: "input1".into(),
                count: 2
            })
        );
        assert_eq!(
            network.set_weight(99, "input1", 1.),
            Err(NetworkError::UnknownNeuron(99))
        );
    }

    #[test]
    fn test_connect_names() {
        let mut ids = IdAllocator::new();
        let mut network = two_by_two(&mut ids);
        network.connect_names("input2", "output1").unwrap().weight = -1.;
        let link = *network.neuron(6).unwrap().inputs().last().unwrap();
        assert_eq!(link.source, 1);
        assert_f64_approx!(link.weight, -1.);
        assert_layering_strict(&network);

        assert_eq!(
            network.connect_names("input9", "output1").unwrap_err(),
            NetworkError::NotFound("input9".into())
        );
        network.add_output_neuron("output1", false).unwrap();
        assert!(matches!(
            network.connect_names("input1", "output1"),
            Err(NetworkError::Ambiguous { count: 2, .. })
        ));
    }

    #[test]
    fn test_random_edits_keep_layering_strict() {
        let mut rng = WyRng::seeded(31);
        let mut ids = IdAllocator::new();
        let mut network =
            NeuralNetwork::new(&mut ids, &["a", "b", "c"], &["x", "y"], 3, 3).unwrap();
        let (mut linked, mut refused) = (0, 0);
        for step in 0..400 {
            let candidates: Vec<NeuronId> = network.neurons().iter().map(|n| n.id()).collect();
            let source = candidates[rng.random_range(0..candidates.len())];
            let target = candidates[rng.random_range(0..candidates.len())];
            match network.connect(source, target) {
                Ok(_) => linked += 1,
                Err(NetworkError::InvalidDirection { .. } | NetworkError::Cycle { .. }) => {
                    refused += 1
                }
                Err(err) => panic!("connect {source} -> {target}: {err}"),
            }
            if step % 50 == 49 {
                let hidden: Vec<NeuronId> = network.hidden().map(|n| n.id()).collect();
                if let Some(id) = hidden.get(rng.random_range(0..hidden.len().max(1))) {
                    network.remove_neuron(*id).unwrap();
                }
                network.add_input_neuron("extra", false).unwrap();
            }
            assert_layering_strict(&network);
        }
        assert!(linked > 0 && refused > 0);
    }

    #[test]
    fn test_mutate_skips_inputs_and_bounds() {
        let mut ids = IdAllocator::new();
        let mut rng = WyRng::seeded(5);
        for _ in 0..50 {
            let mut network = two_by_two(&mut ids);
            network.mutate(1., 0.3, &mut rng).unwrap();
            for neuron in network.hidden().chain(network.outputs()) {
                for w in neuron.weights().chain([neuron.bias()]) {
                    assert!((-0.3..=0.3).contains(&w));
                }
            }
            assert!(network.inputs().all(|n| n.bias() == 0.));
        }
    }

    #[test]
    fn test_copy_is_independent() {
        let mut ids = IdAllocator::new();
        let mut original = two_by_two(&mut ids);
        original.set_fitness(3.);
        let mut copy = original.copy(&mut ids);
        assert_ne!(original.id(), copy.id());
        assert_f64_approx!(copy.fitness(), 3.);

        copy.mutate(1., 1., &mut WyRng::seeded(2)).unwrap();
        copy.connect(0, 6).unwrap();
        assert!(original
            .hidden()
            .chain(original.outputs())
            .all(|n| n.weights().all(|w| w == 0.)));
        assert_eq!(original.neuron(6).unwrap().inputs().len(), 2);
        assert_eq!(copy.neuron(6).unwrap().inputs().len(), 3);
    }
}
