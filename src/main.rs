use drivenet::{
    random::default_rng,
    simulator::NO_HIT,
    Controls, Simulator, Telemetry, Track, Trainer, TrainingConfig, TrainingError,
};
use std::f64::consts::TAU;
use tracing::info;

const GENERATIONS: usize = 50;
const DT: f64 = 1. / 50.;

const INNER_RADIUS: f64 = 20.;
const OUTER_RADIUS: f64 = 30.;
const CHECKPOINTS: usize = 8;
const RAY_RANGE: f64 = 25.;
const RAY_SPREAD: f64 = 1.2;

const MASS: f64 = 100.;
const DRAG: f64 = 0.4;
const WHEELBASE: f64 = 2.5;

/// A bicycle-model car on a flat ring road
struct Ring {
    track: Track,
    sensors: usize,
    position: [f64; 2],
    heading: f64,
    speed: f64,
    controls: Controls,
}

impl Ring {
    fn new(sensors: usize) -> Self {
        let mid = (INNER_RADIUS + OUTER_RADIUS) / 2.;
        let checkpoints = (1..=CHECKPOINTS)
            .map(|idx| {
                let angle = TAU * idx as f64 / CHECKPOINTS as f64;
                [mid * angle.cos(), 0., mid * angle.sin()]
            })
            .collect();
        let mut ring = Self {
            track: Track::new("Ring", checkpoints),
            sensors,
            position: [0.; 2],
            heading: 0.,
            speed: 0.,
            controls: Controls::default(),
        };
        ring.reset();
        ring
    }

    fn radius(&self) -> f64 {
        self.position[0].hypot(self.position[1])
    }

    /// Distance along `angle` to the nearest wall
    fn cast(&self, angle: f64) -> f64 {
        let [px, pz] = self.position;
        let (dx, dz) = (angle.cos(), angle.sin());
        let along = px * dx + pz * dz;
        let squared = px * px + pz * pz;
        [INNER_RADIUS, OUTER_RADIUS]
            .iter()
            .filter_map(|radius| {
                let disc = along * along - squared + radius * radius;
                if disc < 0. {
                    return None;
                }
                let root = disc.sqrt();
                [-along - root, -along + root]
                    .into_iter()
                    .find(|t| *t > 0.)
            })
            .fold(None, |nearest: Option<f64>, t| {
                Some(nearest.map_or(t, |n| n.min(t)))
            })
            .filter(|t| *t <= RAY_RANGE)
            .unwrap_or(NO_HIT)
    }
}

impl Simulator for Ring {
    fn track(&self) -> &Track {
        &self.track
    }

    fn reset(&mut self) {
        self.position = [(INNER_RADIUS + OUTER_RADIUS) / 2., 0.];
        self.heading = TAU / 4.;
        self.speed = 0.;
        self.controls = Controls::default();
    }

    fn telemetry(&self) -> Telemetry {
        let rays = (0..self.sensors)
            .map(|idx| {
                let offset = if self.sensors > 1 {
                    RAY_SPREAD * (idx as f64 / (self.sensors - 1) as f64 - 0.5) * 2.
                } else {
                    0.
                };
                self.cast(self.heading + offset)
            })
            .collect();
        let radius = self.radius();
        Telemetry {
            rays,
            speed: self.speed.abs(),
            steering_angle: self.controls.steering_angle,
            position: [self.position[0], 0., self.position[1]],
            collided: !(INNER_RADIUS..=OUTER_RADIUS).contains(&radius),
        }
    }

    fn actuate(&mut self, controls: Controls) {
        self.controls = controls;
    }

    fn step(&mut self, dt: f64) {
        self.speed += (self.controls.motor_torque / MASS - DRAG * self.speed) * dt;
        self.heading +=
            self.speed * self.controls.steering_angle.to_radians().tan() / WHEELBASE * dt;
        self.position[0] += self.heading.cos() * self.speed * dt;
        self.position[1] += self.heading.sin() * self.speed * dt;
    }
}

fn main() -> Result<(), TrainingError> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let config = match std::env::args().nth(1) {
        Some(path) => TrainingConfig::from_file(path)?,
        None => TrainingConfig::default(),
    };
    let ring = Ring::new(config.sensor_count);
    let mut trainer = Trainer::new(config, ring, default_rng())?;

    while trainer.generation() < GENERATIONS {
        trainer.tick(DT)?;
    }

    let best = trainer.best();
    info!(
        fitness = best.fitness,
        completion_time = ?best.completion_time,
        breakthroughs = best.breakthroughs,
        champion = trainer.champion().fitness(),
        "training finished"
    );
    println!("{}", trainer.champion().to_checkpoint());
    Ok(())
}
