//! The black-box search backend boundary.
//!
//! Calibration only ever talks to a [`Sampler`]; the bundled
//! [`RandomSampler`] draws uniformly, which is an adequate baseline and
//! keeps the backend swappable for smarter search strategies.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Suggests values for free parameters, one trial at a time.
///
/// Implementations may be stateful across suggestions within a trial but
/// must be cheap to construct, as each trial gets a fresh instance.
pub trait Sampler: Send {
    fn suggest_float(&mut self, name: &str, low: f64, high: f64, log: bool, step: Option<f64>)
        -> f64;

    fn suggest_int(&mut self, name: &str, low: i64, high: i64) -> i64;

    /// Pick one of `n_choices` options, returned as an index.
    fn suggest_categorical(&mut self, name: &str, n_choices: usize) -> usize;
}

/// Uniform random search, seeded per trial.
pub struct RandomSampler {
    rng: SmallRng,
}

impl RandomSampler {
    pub fn new(trial_seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(trial_seed),
        }
    }

    fn snap(value: f64, low: f64, step: Option<f64>) -> f64 {
        match step {
            Some(s) if s > 0.0 => low + ((value - low) / s).round() * s,
            _ => value,
        }
    }
}

impl Sampler for RandomSampler {
    fn suggest_float(
        &mut self,
        _name: &str,
        low: f64,
        high: f64,
        log: bool,
        step: Option<f64>,
    ) -> f64 {
        if low >= high {
            return low;
        }
        let raw = if log {
            (self.rng.gen_range(low.ln()..high.ln())).exp()
        } else {
            self.rng.gen_range(low..high)
        };
        Self::snap(raw, low, step).clamp(low, high)
    }

    fn suggest_int(&mut self, _name: &str, low: i64, high: i64) -> i64 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..=high)
    }

    fn suggest_categorical(&mut self, _name: &str, n_choices: usize) -> usize {
        self.rng.gen_range(0..n_choices)
    }
}
