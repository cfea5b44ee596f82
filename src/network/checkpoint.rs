//! The plain text checkpoint format.
//!
//! ```text
//! id 12
//! fitness 4.25
//! breakthroughCount 3
//! trackName Oval
//!
//! Input 0 ray0
//!     b 0
//! Hidden 5 hidden0_0
//!     w 0.125 0
//!     b -0.5
//! ```
//!
//! Reals are written with their shortest round-tripping representation, so a save followed by a
//! load reproduces every weight and bias bit for bit. Every neuron block ends with its `b` line.

use super::{IdAllocator, NetworkId, NeuralNetwork, NeuronId, NeuronKind, MAX_NETWORK_ID};
use crate::error::{CheckpointError, FormatError};
use core::{fmt::Write, str::FromStr};
use std::{fs, path::Path};

const INDENT: &str = "    ";

impl NeuralNetwork {
    pub fn to_checkpoint(&self) -> String {
        let mut out = String::new();
        // writing into a String can't fail
        let _ = self.write_checkpoint(&mut out);
        out
    }

    fn write_checkpoint(&self, out: &mut String) -> core::fmt::Result {
        writeln!(out, "id {}", self.id)?;
        writeln!(out, "fitness {}", self.fitness)?;
        writeln!(out, "breakthroughCount {}", self.breakthrough_count)?;
        writeln!(out, "trackName {}", self.track_name)?;
        writeln!(out)?;
        for neuron in self.neurons.iter() {
            writeln!(out, "{} {} {}", neuron.kind(), neuron.id(), neuron.name())?;
            for link in neuron.inputs() {
                writeln!(out, "{INDENT}w {} {}", link.weight, link.source)?;
            }
            writeln!(out, "{INDENT}b {}", neuron.bias())?;
        }
        Ok(())
    }

    /// Parse a checkpoint. The network keeps the id stored in the text, and `ids` is advanced
    /// past it.
    ///
    /// Neurons are created in a first pass over the body so that links may name sources declared
    /// further down; a second pass wires the links through the usual connection rules.
    pub fn from_checkpoint(text: &str, ids: &mut IdAllocator) -> Result<Self, FormatError> {
        let lines: Vec<(usize, &str)> = text
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
            .collect();

        let mut header = lines.iter().copied();
        let id: NetworkId = header_field(header.next(), "id")?;
        if id > MAX_NETWORK_ID {
            return Err(FormatError::at(1, format!("network id {id} is out of range")));
        }
        let fitness: f64 = header_field(header.next(), "fitness")?;
        let breakthrough_count: u32 = header_field(header.next(), "breakthroughCount")?;
        let track_name = header_value(header.next(), "trackName")?.to_owned();
        match header.next() {
            Some((_, "")) => {}
            Some((line, _)) => return Err(FormatError::at(line, "expected a blank line")),
            None => return Err(FormatError::at(lines.len() + 1, "missing blank line")),
        }
        let body = &lines[5..];

        let mut network = NeuralNetwork::with_id(id);
        network.fitness = fitness;
        network.breakthrough_count = breakthrough_count;
        network.track_name = track_name;

        for (line, text) in body.iter().copied() {
            if text.is_empty() || text.starts_with(char::is_whitespace) {
                continue;
            }
            let (kind, neuron, name) = parse_neuron_line(line, text)?;
            let added = network
                .push_shell(neuron, name, kind)
                .map_err(|e| FormatError::at(line, e.to_string()))?;
            if !added {
                return Err(FormatError::at(line, format!("duplicate neuron id {neuron}")));
            }
        }

        // (neuron, line it was declared on, whether its `b` line was seen)
        let mut current: Option<(NeuronId, usize, bool)> = None;
        for (line, text) in body.iter().copied() {
            if text.trim().is_empty() {
                continue;
            }
            if !text.starts_with(char::is_whitespace) {
                if let Some((neuron, declared, false)) = current {
                    return Err(unterminated(neuron, declared));
                }
                let (_, neuron, _) = parse_neuron_line(line, text)?;
                current = Some((neuron, line, false));
                continue;
            }

            let (target, terminated) = match current.as_mut() {
                Some((target, _, terminated)) => (*target, terminated),
                None => return Err(FormatError::at(line, "indented line outside a neuron")),
            };
            if *terminated {
                return Err(FormatError::at(line, "line after the bias terminator"));
            }
            let mut tokens = text.split_whitespace();
            match tokens.next() {
                Some("w") => {
                    let weight: f64 = token(&mut tokens, line, "weight")?;
                    let source: NeuronId = token(&mut tokens, line, "source id")?;
                    expect_end(&mut tokens, line)?;
                    if network.neuron(source).is_none() {
                        return Err(FormatError::at(line, format!("unknown source neuron {source}")));
                    }
                    network
                        .link(source, target)
                        .map_err(|e| FormatError::at(line, e.to_string()))?
                        .weight = weight;
                }
                Some("b") => {
                    let bias: f64 = token(&mut tokens, line, "bias")?;
                    expect_end(&mut tokens, line)?;
                    if let Some(neuron) = network.neuron_mut(target) {
                        neuron.set_bias(bias);
                    }
                    *terminated = true;
                }
                Some(other) => {
                    return Err(FormatError::at(line, format!("unexpected token {other:?}")))
                }
                None => unreachable!("blank lines are skipped"),
            }
        }
        if let Some((neuron, declared, false)) = current {
            return Err(unterminated(neuron, declared));
        }

        network.sort_neurons();
        ids.observe(id)?;
        Ok(network)
    }

    pub fn save_checkpoint<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        write_file(path.as_ref(), &self.to_checkpoint())
    }

    pub fn load_checkpoint<P: AsRef<Path>>(
        path: P,
        ids: &mut IdAllocator,
    ) -> Result<Self, CheckpointError> {
        let text = read_file(path.as_ref())?;
        Ok(Self::from_checkpoint(&text, ids)?)
    }
}

pub(crate) fn write_file(path: &Path, contents: &str) -> Result<(), CheckpointError> {
    fs::write(path, contents).map_err(|source| CheckpointError::Io {
        path: path.to_owned(),
        source,
    })
}

pub(crate) fn read_file(path: &Path) -> Result<String, CheckpointError> {
    fs::read_to_string(path).map_err(|source| CheckpointError::Io {
        path: path.to_owned(),
        source,
    })
}

fn unterminated(neuron: NeuronId, declared: usize) -> FormatError {
    FormatError::at(declared, format!("neuron {neuron} has no bias terminator"))
}

fn header_value<'a>(line: Option<(usize, &'a str)>, key: &str) -> Result<&'a str, FormatError> {
    let (line, text) = line.ok_or_else(|| FormatError::at(0, format!("missing {key} header")))?;
    let value = text
        .strip_prefix(key)
        .ok_or_else(|| FormatError::at(line, format!("expected {key} header")))?;
    match value.strip_prefix(' ') {
        Some(value) => Ok(value),
        None if value.is_empty() => Ok(value),
        None => Err(FormatError::at(line, format!("expected {key} header"))),
    }
}

fn header_field<T: FromStr>(line: Option<(usize, &str)>, key: &str) -> Result<T, FormatError> {
    let at = line.map(|(l, _)| l).unwrap_or(0);
    header_value(line, key)?
        .trim()
        .parse()
        .map_err(|_| FormatError::at(at, format!("invalid {key} value")))
}

fn parse_neuron_line(line: usize, text: &str) -> Result<(NeuronKind, NeuronId, &str), FormatError> {
    let mut parts = text.splitn(3, ' ');
    let kind = parts
        .next()
        .unwrap_or_default()
        .parse::<NeuronKind>()
        .map_err(|e| FormatError::at(line, e))?;
    let id = parts
        .next()
        .and_then(|id| id.parse::<NeuronId>().ok())
        .ok_or_else(|| FormatError::at(line, "missing or invalid neuron id"))?;
    let name = parts
        .next()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| FormatError::at(line, "missing neuron name"))?;
    Ok((kind, id, name))
}

fn token<'a, T: FromStr>(
    tokens: &mut impl Iterator<Item = &'a str>,
    line: usize,
    what: &str,
) -> Result<T, FormatError> {
    tokens
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| FormatError::at(line, format!("missing or invalid {what}")))
}

fn expect_end<'a>(tokens: &mut impl Iterator<Item = &'a str>, line: usize) -> Result<(), FormatError> {
    match tokens.next() {
        None => Ok(()),
        Some(extra) => Err(FormatError::at(line, format!("unexpected token {extra:?}"))),
    }
}
