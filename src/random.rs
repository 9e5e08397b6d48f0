//! Injectable randomness for variant draws and visitor ids

use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};

/// Source of uniform draws in [0, 1).
pub trait RandomSource {
    /// Next uniform value in [0, 1).
    fn next_unit(&mut self) -> f64;
}

/// Thread-local RNG (production default).
#[derive(Debug, Default, Clone)]
pub struct ThreadRandom {
    rng: ThreadRng,
}

impl ThreadRandom {
    /// Create a new thread RNG handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RandomSource for ThreadRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Seeded RNG for reproducible simulations.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    /// Create a seeded RNG.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed sequence of draws, cycling when exhausted.
///
/// An empty sequence always yields 0.0.
#[derive(Debug, Clone, Default)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceRandom {
    /// Create from a list of draws.
    #[must_use]
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
        }
    }
}

impl RandomSource for SequenceRandom {
    fn next_unit(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `len` lowercase base-36 characters drawn from `source`.
pub(crate) fn base36_token<R: RandomSource + ?Sized>(source: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let idx = ((source.next_unit() * 36.0) as usize).min(35);
            char::from(BASE36[idx])
        })
        .collect()
}
