//! The evolutionary training loop, driven one simulated tick at a time.
//!
//! A generation is a population of mutated copies of the champion. Each member is evaluated in a
//! run of one or more passes over the track, the run's passes are folded into one fitness, and at
//! the end of the generation the best member may replace the champion.
//!
//! ```text
//! PreGeneration -> (PreRun -> (PrePass -> Active* -> PostPass)+ -> PostRun)+ -> PostGeneration
//! ```

pub mod config;
pub mod run;

pub use config::TrainingConfig;
pub use run::{aggregate, checkpoint_file_name, BestRecord, RunAcceptMode, RunResult};

use crate::{
    error::TrainingError,
    fitness::{PassRecord, PassTracker},
    network::{IdAllocator, NeuralNetwork, NeuronKind},
    simulator::{input_names, output_names, Controls, Simulator, Telemetry},
};
use rand::RngCore;
use std::{
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    PreGeneration,
    PreRun,
    PrePass,
    Active,
    PostPass,
    PostRun,
    PostGeneration,
}

/// Why a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeathCause {
    /// Fitness did not improve for the termination delay
    Stagnation,
    /// Speed stayed under the termination speed for the termination delay
    Crawling,
    /// Fell under the floor height
    Fell,
    Collision,
    Finished,
}

pub struct Trainer<S: Simulator, R: RngCore> {
    config: TrainingConfig,
    simulator: S,
    rng: R,
    ids: IdAllocator,
    champion: NeuralNetwork,
    population: Vec<NeuralNetwork>,
    phase: Phase,
    generation: usize,
    run: usize,
    pass: usize,
    tracker: PassTracker,
    pass_records: Vec<PassRecord>,
    death: Option<DeathCause>,
    best: BestRecord,
    last_checkpoint: Option<PathBuf>,
}

impl<S: Simulator, R: RngCore> Trainer<S, R> {
    /// Start training from a fresh champion with the configured topology. Inputs are one
    /// `ray{i}` per sensor followed by `speed` and `steering`; outputs are `motor` and `steer`.
    pub fn new(config: TrainingConfig, simulator: S, rng: R) -> Result<Self, TrainingError> {
        config.validate()?;
        let mut ids = IdAllocator::new();
        let mut champion = NeuralNetwork::new(
            &mut ids,
            &input_names(config.sensor_count),
            &output_names(),
            config.hidden_layers,
            config.neurons_in_layer,
        )?;
        champion.set_track_name(simulator.track().name.clone())?;
        Ok(Self::assemble(config, simulator, rng, ids, champion))
    }

    /// Resume training from an existing network, usually one loaded from a checkpoint with
    /// `ids`. The network must carry every input and output the trainer drives.
    pub fn with_champion(
        config: TrainingConfig,
        simulator: S,
        rng: R,
        mut ids: IdAllocator,
        mut champion: NeuralNetwork,
    ) -> Result<Self, TrainingError> {
        config.validate()?;
        for name in input_names(config.sensor_count) {
            champion.find_kind(&name, NeuronKind::Input)?;
        }
        for name in output_names() {
            champion.find_kind(&name, NeuronKind::Output)?;
        }
        ids.observe(champion.id())?;
        champion.set_track_name(simulator.track().name.clone())?;
        Ok(Self::assemble(config, simulator, rng, ids, champion))
    }

    fn assemble(
        config: TrainingConfig,
        simulator: S,
        rng: R,
        ids: IdAllocator,
        champion: NeuralNetwork,
    ) -> Self {
        Self {
            config,
            simulator,
            rng,
            ids,
            champion,
            population: Vec::new(),
            phase: Phase::PreGeneration,
            generation: 0,
            run: 0,
            pass: 0,
            tracker: PassTracker::new(),
            pass_records: Vec::new(),
            death: None,
            best: BestRecord::new(),
            last_checkpoint: None,
        }
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn generation(&self) -> usize {
        self.generation
    }

    #[inline]
    pub fn run(&self) -> usize {
        self.run
    }

    #[inline]
    pub fn pass(&self) -> usize {
        self.pass
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn champion(&self) -> &NeuralNetwork {
        &self.champion
    }

    pub fn population(&self) -> &[NeuralNetwork] {
        &self.population
    }

    pub fn best(&self) -> &BestRecord {
        &self.best
    }

    /// Records of the passes driven so far in the current run
    pub fn pass_records(&self) -> &[PassRecord] {
        &self.pass_records
    }

    pub fn tracker(&self) -> &PassTracker {
        &self.tracker
    }

    /// Why the latest pass ended
    pub fn death(&self) -> Option<DeathCause> {
        self.death
    }

    /// Path of the most recent breakthrough checkpoint
    pub fn last_checkpoint(&self) -> Option<&Path> {
        self.last_checkpoint.as_deref()
    }

    pub fn simulator(&self) -> &S {
        &self.simulator
    }

    /// Take exactly one transition. While [Phase::Active], that transition drives one tick of
    /// `dt` seconds.
    pub fn advance(&mut self, dt: f64) -> Result<Phase, TrainingError> {
        self.phase = match self.phase {
            Phase::PreGeneration => {
                self.populate()?;
                Phase::PreRun
            }
            Phase::PreRun => {
                self.pass_records.clear();
                self.pass = 0;
                Phase::PrePass
            }
            Phase::PrePass => {
                self.tracker = PassTracker::new();
                self.death = None;
                self.simulator.reset();
                Phase::Active
            }
            Phase::Active => match self.drive(dt)? {
                Some(cause) => {
                    self.death = Some(cause);
                    Phase::PostPass
                }
                None => Phase::Active,
            },
            Phase::PostPass => self.finish_pass(),
            Phase::PostRun => self.finish_run()?,
            Phase::PostGeneration => {
                self.finish_generation();
                Phase::PreGeneration
            }
        };
        Ok(self.phase)
    }

    /// Advance until one simulated tick of `dt` seconds has been driven. This is the call a host
    /// makes once per fixed timestep.
    pub fn tick(&mut self, dt: f64) -> Result<Phase, TrainingError> {
        loop {
            let driving = self.phase == Phase::Active;
            let phase = self.advance(dt)?;
            if driving {
                return Ok(phase);
            }
        }
    }

    fn populate(&mut self) -> Result<(), TrainingError> {
        let size = self.config.population_size;
        let mut population = Vec::with_capacity(size);
        for idx in 0..size {
            let mut member = self.champion.copy(&mut self.ids);
            let scale = self.config.max_mutation
                * (idx as f64 / size as f64).powf(self.config.mutation_power);
            member.mutate(self.config.mutation_power, scale, &mut self.rng)?;
            population.push(member);
        }
        self.population = population;
        self.run = 0;
        debug!(generation = self.generation, size, "population built");
        Ok(())
    }

    fn drive(&mut self, dt: f64) -> Result<Option<DeathCause>, TrainingError> {
        let network = self
            .population
            .get_mut(self.run)
            .ok_or(TrainingError::State("run index outside the population"))?;

        let sensed = self.simulator.telemetry();
        let outputs = network.feedforward(&sensed.network_inputs())?;
        self.simulator.actuate(Controls::from_outputs(
            &outputs,
            self.config.max_motor_torque,
            self.config.max_steering_angle,
        ));
        self.simulator.step(dt);

        let telemetry = self.simulator.telemetry();
        self.tracker.observe(
            self.simulator.track(),
            &telemetry,
            dt,
            &self.config.weights,
            self.config.termination_speed,
        );
        Ok(self.death_cause(&telemetry))
    }

    fn death_cause(&self, telemetry: &Telemetry) -> Option<DeathCause> {
        let delay = self.config.termination_delay;
        if self.tracker.completed(self.simulator.track()) {
            Some(DeathCause::Finished)
        } else if telemetry.height() < self.config.floor_height {
            Some(DeathCause::Fell)
        } else if self.config.collision_terminates && telemetry.collided {
            Some(DeathCause::Collision)
        } else if self.tracker.stagnation() > delay {
            Some(DeathCause::Stagnation)
        } else if self.tracker.low_speed() > delay {
            Some(DeathCause::Crawling)
        } else {
            None
        }
    }

    fn finish_pass(&mut self) -> Phase {
        let record = self
            .tracker
            .finish(self.simulator.track(), &self.config.weights);
        debug!(
            generation = self.generation,
            run = self.run,
            pass = self.pass,
            fitness = record.fitness,
            checkpoint = record.reached_checkpoint,
            cause = ?self.death,
            "pass finished"
        );
        self.pass_records.push(record);
        self.pass += 1;

        if self.config.accept_mode == RunAcceptMode::All && record.fitness <= self.best.fitness {
            if self.pass < self.config.pass_count {
                warn!(
                    generation = self.generation,
                    run = self.run,
                    pass = self.pass,
                    "run can no longer beat the best, skipping remaining passes"
                );
            }
            Phase::PostRun
        } else if self.pass < self.config.pass_count {
            Phase::PrePass
        } else {
            Phase::PostRun
        }
    }

    fn finish_run(&mut self) -> Result<Phase, TrainingError> {
        let track = self.simulator.track();
        let result = aggregate(
            self.config.accept_mode,
            &self.pass_records,
            track.checkpoints.len(),
        )
        .ok_or(TrainingError::State("a run needs at least one pass"))?;
        let member = self
            .population
            .get_mut(self.run)
            .ok_or(TrainingError::State("run index outside the population"))?;
        member.set_fitness(result.fitness);
        info!(
            generation = self.generation,
            run = self.run,
            fitness = result.fitness,
            completion_time = ?result.completion_time,
            "run finished"
        );

        // the record only changes once its checkpoint is on disk, so a failed save can be retried
        let mut best = self.best.clone();
        if best.consider(&result, self.generation, self.run) {
            let previous = member.breakthrough_count();
            member.set_breakthrough_count(best.breakthroughs);
            if let Some(dir) = &self.config.checkpoint_dir {
                let unix_secs = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                let path = dir.join(checkpoint_file_name(
                    &track.name,
                    unix_secs,
                    best.completion_time,
                    best.breakthroughs,
                    self.generation,
                    self.run,
                ));
                if let Err(err) = member.save_checkpoint(&path) {
                    member.set_breakthrough_count(previous);
                    return Err(err.into());
                }
                info!(path = %path.display(), "checkpoint written");
                self.last_checkpoint = Some(path);
            }
            info!(
                breakthroughs = best.breakthroughs,
                fitness = result.fitness,
                "breakthrough"
            );
        }
        self.best = best;

        self.run += 1;
        Ok(if self.run < self.population.len() {
            Phase::PreRun
        } else {
            Phase::PostGeneration
        })
    }

    fn finish_generation(&mut self) {
        self.population
            .sort_by(|l, r| r.fitness().total_cmp(&l.fitness()));
        if let Some(top) = self.population.first() {
            if top.fitness() > self.champion.fitness() {
                info!(
                    generation = self.generation,
                    fitness = top.fitness(),
                    previous = self.champion.fitness(),
                    "champion replaced"
                );
                self.champion = top.clone();
            }
        }
        self.generation += 1;
    }
}
