use core::cmp::min;
use rand::{Rng, RngCore};
use rand_distr::{Distribution, Uniform};
use std::{
    fs::File,
    io::{self, Read},
    time::{SystemTime, UNIX_EPOCH},
};

/// Small, fast generator used for mutation draws. Not cryptographic.
#[derive(Debug, Clone)]
pub struct WyRng {
    state: u64,
}

impl WyRng {
    pub fn seeded(state: u64) -> Self {
        Self { state }
    }
}

impl RngCore for WyRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    fn next_u64(&mut self) -> u64 {
        const WY_CONST_0: u64 = 0x2d35_8dcc_aa6c_78a5;
        const WY_CONST_1: u64 = 0x8bb8_4b93_962e_acc9;
        self.state = self.state.wrapping_add(WY_CONST_0);
        let t = u128::from(self.state) * u128::from(self.state ^ WY_CONST_1);
        (t as u64) ^ (t >> 64) as u64
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        let mut idx = 0;
        while idx < dst.len() {
            let lim = min(8, dst.len() - idx);
            dst[idx..idx + lim].copy_from_slice(&self.next_u64().to_ne_bytes()[..lim]);
            idx += lim;
        }
    }
}

pub fn seed_urandom() -> io::Result<u64> {
    let mut file = File::open("/dev/urandom")?;
    let mut buffer = [0u8; 8];
    file.read_exact(&mut buffer)?;
    Ok(u64::from_le_bytes(buffer))
}

/// A [WyRng] seeded from `/dev/urandom`, or from the wall clock where that isn't available
pub fn default_rng() -> WyRng {
    let seed = seed_urandom().unwrap_or_else(|_| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x853c_49e6_748f_ea9b)
    });
    WyRng::seeded(seed)
}

/// Draw a perturbation whose magnitude is annealed by `power`.
///
/// A rate `r^power * max` is drawn with `r ~ U[0, 1)`, then the delta is drawn uniformly from
/// `[-rate, rate]`. Larger powers push most rates toward zero while still allowing the occasional
/// jump close to `max`.
pub fn annealed_delta(rng: &mut impl RngCore, power: f64, max: f64) -> f64 {
    let r: f64 = rng.random();
    let rate = r.powf(power) * max;
    Uniform::new_inclusive(-rate, rate).map_or(0., |delta| delta.sample(rng))
}
