use crate::{error::NetworkError, random::annealed_delta};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Identifier of a neuron, unique within its network and never reused.
pub type NeuronId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeuronKind {
    Input,
    Hidden,
    Output,
}

impl fmt::Display for NeuronKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input => "Input",
            Self::Hidden => "Hidden",
            Self::Output => "Output",
        })
    }
}

impl FromStr for NeuronKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Input" => Ok(Self::Input),
            "Hidden" => Ok(Self::Hidden),
            "Output" => Ok(Self::Output),
            other => Err(format!("unknown neuron type {other:?}")),
        }
    }
}

/// A weighted edge, owned by the neuron it feeds into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputLink {
    pub source: NeuronId,
    pub weight: f64,
}

impl InputLink {
    pub fn new(source: NeuronId) -> Self {
        Self { source, weight: 0. }
    }
}

#[derive(Debug, Clone)]
pub struct Neuron {
    id: NeuronId,
    name: String,
    kind: NeuronKind,
    pub(crate) bias: f64,
    pub(crate) value: f64,
    pub(crate) layer: usize,
    pub(crate) inputs: Vec<InputLink>,
}

impl Neuron {
    pub fn new(id: NeuronId, name: impl Into<String>, kind: NeuronKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            bias: 0.,
            value: 0.,
            layer: 0,
            inputs: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> NeuronId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> NeuronKind {
        self.kind
    }

    #[inline]
    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn set_bias(&mut self, bias: f64) {
        self.bias = bias;
    }

    /// The most recent activation. Overwritten by every feedforward pass.
    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    /// Layer assigned by the last structural sort
    #[inline]
    pub fn layer(&self) -> usize {
        self.layer
    }

    /// Incoming links, in the order they were connected
    #[inline]
    pub fn inputs(&self) -> &[InputLink] {
        &self.inputs
    }

    /// Activate from an already weighted sum of source values. Input neurons keep the value they
    /// were given.
    pub fn feedforward(&mut self, weighted_sum: f64) {
        if self.kind != NeuronKind::Input {
            self.value = (weighted_sum + self.bias).tanh();
        }
    }

    /// Perturb every input weight and the bias by an independent [annealed_delta].
    pub fn mutate(
        &mut self,
        power: f64,
        max_mutation: f64,
        rng: &mut impl RngCore,
    ) -> Result<(), NetworkError> {
        if self.kind == NeuronKind::Input {
            return Err(NetworkError::InvalidOperation("be mutated"));
        }
        for link in self.inputs.iter_mut() {
            link.weight += annealed_delta(rng, power, max_mutation);
        }
        self.bias += annealed_delta(rng, power, max_mutation);
        Ok(())
    }

    /// Replace every input weight, positionally.
    pub fn set_weights(&mut self, weights: &[f64]) -> Result<(), NetworkError> {
        if weights.len() != self.inputs.len() {
            return Err(NetworkError::SizeMismatch {
                expected: self.inputs.len(),
                actual: weights.len(),
            });
        }
        for (link, w) in self.inputs.iter_mut().zip(weights) {
            link.weight = *w;
        }
        Ok(())
    }

    pub fn weights(&self) -> impl Iterator<Item = f64> + '_ {
        self.inputs.iter().map(|l| l.weight)
    }
}

impl PartialEq for Neuron {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Neuron {}

impl fmt::Display for Neuron {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{} {:?}, bias {}, {} inputs]",
            self.id,
            self.kind,
            self.name,
            self.bias,
            self.inputs.len()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{assert_f64_approx, random::WyRng};

    fn hidden_with_links(n: usize) -> Neuron {
        let mut neuron = Neuron::new(10, "h", NeuronKind::Hidden);
        neuron.inputs = (0..n).map(InputLink::new).collect();
        neuron
    }

    #[test]
    fn test_feedforward_applies_bias_and_tanh() {
        let mut neuron = hidden_with_links(0);
        neuron.set_bias(0.5);
        neuron.feedforward(1.);
        assert_f64_approx!(neuron.value(), 1.5f64.tanh());
    }

    #[test]
    fn test_feedforward_input_untouched() {
        let mut neuron = Neuron::new(0, "in", NeuronKind::Input);
        neuron.set_value(3.);
        neuron.feedforward(100.);
        assert_f64_approx!(neuron.value(), 3.);
    }

    #[test]
    fn test_mutate_input_fails() {
        let mut neuron = Neuron::new(0, "in", NeuronKind::Input);
        assert_eq!(
            neuron.mutate(1., 1., &mut WyRng::seeded(0)),
            Err(NetworkError::InvalidOperation("be mutated"))
        );
    }

    #[test]
    fn test_mutate_bounds() {
        let mut rng = WyRng::seeded(1);
        for _ in 0..200 {
            let mut neuron = hidden_with_links(4);
            neuron.mutate(1.5, 0.25, &mut rng).unwrap();
            for w in neuron.weights().chain([neuron.bias()]) {
                assert!((-0.25..=0.25).contains(&w), "{w}");
            }
        }
    }

    #[test]
    fn test_set_weights_size_mismatch() {
        let mut neuron = hidden_with_links(3);
        assert_eq!(
            neuron.set_weights(&[1., 2.]),
            Err(NetworkError::SizeMismatch {
                expected: 3,
                actual: 2
            })
        );
        neuron.set_weights(&[1., 2., 3.]).unwrap();
        assert_eq!(neuron.weights().collect::<Vec<_>>(), vec![1., 2., 3.]);
    }

    #[test]
    fn test_equality_by_id() {
        let mut l = Neuron::new(4, "a", NeuronKind::Hidden);
        let r = Neuron::new(4, "b", NeuronKind::Output);
        l.set_bias(9.);
        assert_eq!(l, r);
        assert_ne!(l, Neuron::new(5, "a", NeuronKind::Hidden));
    }

    #[test]
    fn test_kind_parse() {
        for kind in [NeuronKind::Input, NeuronKind::Hidden, NeuronKind::Output] {
            assert_eq!(kind.to_string().parse::<NeuronKind>(), Ok(kind));
        }
        assert!("Bias".parse::<NeuronKind>().is_err());
    }
}
