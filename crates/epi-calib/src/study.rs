//! The shared trial ledger.
//!
//! Workers pull unique trial indices and append completed trials through a
//! mutex; appends are all-or-nothing, so a failed trial can never leave a
//! partially recorded entry.

use std::collections::BTreeMap;
use std::sync::Mutex;

use epi_core::ParValue;
use serde::Serialize;

/// One completed (or failed) evaluation.
#[derive(Clone, Debug, Serialize)]
pub struct Trial {
    pub index: usize,
    /// `None` marks a failed trial; excluded from best-fit selection.
    pub mismatch: Option<f64>,
    pub pars: BTreeMap<String, ParValue>,
}

#[derive(Default)]
struct Ledger {
    next_index: usize,
    trials: Vec<Trial>,
}

/// Append-only trial store, shared by all workers of a calibration run.
#[derive(Default)]
pub struct Study {
    ledger: Mutex<Ledger>,
}

impl Study {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next unique trial index.
    pub fn next_index(&self) -> usize {
        let mut ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
        let idx = ledger.next_index;
        ledger.next_index += 1;
        idx
    }

    /// Record a finished trial.
    pub fn record(&self, trial: Trial) {
        let mut ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
        ledger.trials.push(trial);
    }

    /// Consistent snapshot of all recorded trials, ordered by index.
    pub fn trials(&self) -> Vec<Trial> {
        let ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
        let mut out = ledger.trials.clone();
        out.sort_by_key(|t| t.index);
        out
    }

    pub fn n_recorded(&self) -> usize {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner()).trials.len()
    }

    pub fn n_failed(&self) -> usize {
        self.ledger
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .trials
            .iter()
            .filter(|t| t.mismatch.is_none())
            .count()
    }

    /// The completed trial with the lowest mismatch, if any completed.
    pub fn best(&self) -> Option<Trial> {
        self.trials()
            .into_iter()
            .filter(|t| t.mismatch.is_some_and(f64::is_finite))
            .min_by(|a, b| {
                a.mismatch
                    .partial_cmp(&b.mismatch)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}
