//! The calibration loop: sample, simulate, score, repeat in parallel.
//!
//! # Design
//!
//! A calibration moves through an explicit state machine so that misuse
//! (reading results before workers ran, confirming before parsing) is a
//! configuration error rather than silently wrong output:
//!
//!   Created -> StudyInitialized -> WorkersRunning -> ResultsParsed
//!           -> (Confirmed) -> Done
//!
//! Workers share nothing but the [`Study`] ledger.  Each trial gets its own
//! sampler seeded from the calibration seed and the trial index, its own
//! configuration built by pure path overrides, and its own simulation, so
//! trials are independent and the whole sweep is reproducible regardless of
//! worker count or scheduling.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use epi_core::{EpiError, EpiResult, ParValue, Results};
use epi_sim::{ParamPath, Sim, SimConfig};
use rayon::prelude::*;

use crate::component::CalibComponent;
use crate::sampler::RandomSampler;
use crate::space::SearchSpace;
use crate::study::{Study, Trial};

const SEED_MIX: u64 = 0x9e37_79b9_7f4a_7c15;

/// Per-trial sampler seed, decorrelated from neighbouring indices.
fn trial_seed(seed: u64, index: usize) -> u64 {
    let mut z = seed ^ (index as u64).wrapping_mul(SEED_MIX);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z ^ (z >> 31)
}

/// Extra objective evaluated alongside the components, receiving the run
/// results and the sampled parameter vector.
pub type CustomObjective =
    Box<dyn Fn(&Results, &BTreeMap<String, ParValue>) -> EpiResult<f64> + Send + Sync>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CalibState {
    Created,
    StudyInitialized,
    WorkersRunning,
    ResultsParsed,
    Confirmed,
    Done,
}

/// Before/after comparison from [`Calibration::confirm`].
#[derive(Clone, Debug)]
pub struct ConfirmFit {
    pub guess_mismatch: f64,
    pub best_mismatch: f64,
}

impl ConfirmFit {
    /// Did the search beat the initial guess?
    pub fn improved(&self) -> bool {
        self.best_mismatch <= self.guess_mismatch
    }
}

pub struct Calibration {
    base: SimConfig,
    space: SearchSpace,
    components: Vec<CalibComponent>,
    custom: Option<CustomObjective>,
    total_trials: usize,
    n_workers: usize,
    seed: u64,
    die_on_error: bool,
    study: Study,
    state: CalibState,
}

impl Calibration {
    pub fn new(base: SimConfig, space: SearchSpace, total_trials: usize) -> Self {
        Self {
            base,
            space,
            components: Vec::new(),
            custom: None,
            total_trials,
            n_workers: 1,
            seed: 0,
            die_on_error: false,
            study: Study::new(),
            state: CalibState::Created,
        }
    }

    pub fn add_component(mut self, component: CalibComponent) -> Self {
        self.components.push(component);
        self
    }

    /// Score trials with a caller-supplied objective in addition to (or
    /// instead of) the declared components.
    pub fn with_objective(
        mut self,
        f: impl Fn(&Results, &BTreeMap<String, ParValue>) -> EpiResult<f64> + Send + Sync + 'static,
    ) -> Self {
        self.custom = Some(Box::new(f));
        self
    }

    pub fn with_workers(mut self, n_workers: usize) -> Self {
        self.n_workers = n_workers.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Abort the whole sweep on the first trial error instead of recording
    /// the trial as failed and moving on.
    pub fn die_on_error(mut self) -> Self {
        self.die_on_error = true;
        self
    }

    pub fn state(&self) -> CalibState {
        self.state
    }

    pub fn study(&self) -> &Study {
        &self.study
    }

    // ── State machine ─────────────────────────────────────────────────────────

    fn expect_state(&self, want: CalibState, doing: &str) -> EpiResult<()> {
        if self.state == want {
            Ok(())
        } else {
            Err(EpiError::Config(format!(
                "cannot {doing} in state {:?}",
                self.state
            )))
        }
    }

    /// Validate the setup and open the trial ledger.
    pub fn init_study(&mut self) -> EpiResult<()> {
        self.expect_state(CalibState::Created, "initialize the study")?;
        if self.total_trials == 0 {
            return Err(EpiError::Config("calibration needs at least one trial".into()));
        }
        if self.components.is_empty() && self.custom.is_none() {
            return Err(EpiError::Config(
                "calibration needs at least one component or a custom objective".into(),
            ));
        }
        if self.custom.is_none() {
            if let Some(p) = self.space.params.iter().find(|p| p.path.is_none()) {
                return Err(EpiError::Config(format!(
                    "parameter {:?} has no configuration path and no custom \
                     objective is set to interpret it",
                    p.name
                )));
            }
        }
        self.state = CalibState::StudyInitialized;
        Ok(())
    }

    /// Run all trials across `n_workers` threads.
    pub fn run_workers(&mut self) -> EpiResult<()> {
        self.expect_state(CalibState::StudyInitialized, "run workers")?;
        self.state = CalibState::WorkersRunning;
        log::info!(
            "calibrating: {} trials across {} workers",
            self.total_trials,
            self.n_workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.n_workers)
            .build()
            .map_err(|e| EpiError::Sim(format!("cannot build worker pool: {e}")))?;

        let this = &*self;
        pool.install(|| {
            (0..this.total_trials)
                .into_par_iter()
                .try_for_each(|_| this.run_one_trial())
        })
    }

    fn run_one_trial(&self) -> EpiResult<()> {
        let index = self.study.next_index();
        let mut sampler = RandomSampler::new(trial_seed(self.seed, index));
        let pars = self.space.sample(&mut sampler);
        match self.evaluate(&pars) {
            Ok(mismatch) => {
                log::debug!("trial {index}: mismatch {mismatch:.4}");
                self.study.record(Trial {
                    index,
                    mismatch: Some(mismatch),
                    pars,
                });
                Ok(())
            }
            Err(e) if self.die_on_error => Err(e),
            Err(e) => {
                log::warn!("trial {index} failed: {e}");
                self.study.record(Trial {
                    index,
                    mismatch: None,
                    pars,
                });
                Ok(())
            }
        }
    }

    /// Check the finished sweep over.  Idempotent.
    pub fn parse_results(&mut self) -> EpiResult<()> {
        match self.state {
            CalibState::WorkersRunning => {}
            CalibState::ResultsParsed | CalibState::Confirmed | CalibState::Done => return Ok(()),
            _ => return self.expect_state(CalibState::WorkersRunning, "parse results"),
        }
        let n = self.study.n_recorded();
        if n != self.total_trials {
            return Err(EpiError::Sim(format!(
                "expected {} recorded trials, found {n}",
                self.total_trials
            )));
        }
        if self.study.best().is_none() {
            return Err(EpiError::Sim("every trial failed".into()));
        }
        self.state = CalibState::ResultsParsed;
        Ok(())
    }

    /// The whole pipeline: initialize, run workers, parse.
    pub fn run(mut self) -> EpiResult<Self> {
        self.init_study()?;
        self.run_workers()?;
        self.parse_results()?;
        log::info!("{}", self.summary());
        self.state = CalibState::Done;
        Ok(self)
    }

    /// Re-evaluate the initial guess and the best trial's parameters,
    /// reporting whether the search improved on the guess.
    pub fn confirm(&mut self) -> EpiResult<ConfirmFit> {
        if self.state != CalibState::ResultsParsed && self.state != CalibState::Done {
            return Err(EpiError::Config(format!(
                "cannot confirm the fit in state {:?}",
                self.state
            )));
        }
        let best = self
            .study
            .best()
            .ok_or_else(|| EpiError::Sim("no completed trial to confirm".into()))?;
        let guess_mismatch = self.evaluate(&self.space.guesses())?;
        let best_mismatch = self.evaluate(&best.pars)?;
        let fit = ConfirmFit {
            guess_mismatch,
            best_mismatch,
        };
        if fit.improved() {
            log::info!(
                "confirmed: best {:.4} improves on guess {:.4}",
                fit.best_mismatch,
                fit.guess_mismatch
            );
        } else {
            log::warn!(
                "best {:.4} does not improve on guess {:.4}",
                fit.best_mismatch,
                fit.guess_mismatch
            );
        }
        self.state = CalibState::Confirmed;
        Ok(fit)
    }

    // ── Evaluation ────────────────────────────────────────────────────────────

    /// Apply one sampled parameter vector to the base configuration.
    fn config_for(&self, pars: &BTreeMap<String, ParValue>) -> EpiResult<SimConfig> {
        let mut overrides: Vec<(ParamPath, ParValue)> = Vec::new();
        for p in &self.space.params {
            if let Some(path) = &p.path {
                let value = pars.get(&p.name).ok_or_else(|| {
                    EpiError::Config(format!("sampled vector is missing parameter {:?}", p.name))
                })?;
                overrides.push((path.clone(), value.clone()));
            }
        }
        let mut config = self.base.with_overrides(&overrides)?;
        if let Some(ParValue::Int(seed)) = pars.get("rand_seed") {
            config = config.with_seed(*seed as u64);
        }
        Ok(config)
    }

    /// One full trial: configure, simulate, score.
    fn evaluate(&self, pars: &BTreeMap<String, ParValue>) -> EpiResult<f64> {
        let config = self.config_for(pars)?;
        let results = Sim::new(&config)?.run()?;
        let mut mismatch = 0.0;
        for component in &self.components {
            mismatch += component.eval(&results)?;
        }
        if let Some(f) = &self.custom {
            mismatch += f(&results, pars)?;
        }
        if mismatch.is_nan() {
            return Err(EpiError::Sim("mismatch evaluated to NaN".into()));
        }
        Ok(mismatch)
    }

    // ── Reporting ─────────────────────────────────────────────────────────────

    /// Parameters of the best completed trial.
    pub fn best_params(&self) -> Option<BTreeMap<String, ParValue>> {
        self.study.best().map(|t| t.pars)
    }

    /// All trials, best fit first, failed trials last.
    pub fn to_records(&self) -> Vec<Trial> {
        let mut out = self.study.trials();
        out.sort_by(|a, b| match (a.mismatch, b.mismatch) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.index.cmp(&b.index),
        });
        out
    }

    /// Write the full trial table as JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> EpiResult<()> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.to_records())
            .map_err(|e| EpiError::Sim(format!("cannot serialize trials: {e}")))
    }

    pub fn summary(&self) -> String {
        let n_failed = self.study.n_failed();
        match self.study.best() {
            Some(best) => format!(
                "calibration complete: {} trials ({n_failed} failed), best mismatch {:.4} at trial {}",
                self.study.n_recorded(),
                best.mismatch.unwrap_or(f64::NAN),
                best.index
            ),
            None => format!(
                "calibration complete: {} trials, all failed",
                self.study.n_recorded()
            ),
        }
    }
}
