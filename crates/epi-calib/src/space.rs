//! The declarative parameter search space.

use std::collections::BTreeMap;

use epi_core::{EpiError, EpiResult, ParValue};
use epi_sim::ParamPath;
use serde::{Deserialize, Serialize};

use crate::sampler::Sampler;

/// How the backend should sample one parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParamKind {
    Float,
    Int,
    Categorical(Vec<ParValue>),
}

/// One free parameter: bounds, an initial guess, and an optional path into
/// the nested simulation configuration.  Parameters without a path are
/// interpreted by a custom objective by name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibParam {
    pub name: String,
    pub low: f64,
    pub high: f64,
    pub guess: f64,
    /// Snap sampled values to multiples of `step` above `low`.
    pub step: Option<f64>,
    /// Sample on a log scale.
    pub log: bool,
    pub kind: ParamKind,
    pub path: Option<ParamPath>,
}

impl CalibParam {
    pub fn float(name: impl Into<String>, low: f64, high: f64, guess: f64) -> Self {
        Self {
            name: name.into(),
            low,
            high,
            guess,
            step: None,
            log: false,
            kind: ParamKind::Float,
            path: None,
        }
    }

    pub fn int(name: impl Into<String>, low: i64, high: i64, guess: i64) -> Self {
        Self {
            name: name.into(),
            low: low as f64,
            high: high as f64,
            guess: guess as f64,
            step: None,
            log: false,
            kind: ParamKind::Int,
            path: None,
        }
    }

    pub fn log_scale(mut self) -> Self {
        self.log = true;
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    /// Bind this parameter to a configuration path.
    pub fn at(mut self, path: &str) -> EpiResult<Self> {
        self.path = Some(ParamPath::parse(path)?);
        Ok(self)
    }

    fn validate(&self) -> EpiResult<()> {
        if self.low > self.high {
            return Err(EpiError::Config(format!(
                "parameter {:?}: low {} exceeds high {}",
                self.name, self.low, self.high
            )));
        }
        if self.guess < self.low || self.guess > self.high {
            return Err(EpiError::Config(format!(
                "parameter {:?}: guess {} outside [{}, {}]",
                self.name, self.guess, self.low, self.high
            )));
        }
        if self.log && self.low <= 0.0 {
            return Err(EpiError::Config(format!(
                "parameter {:?}: log scale requires a positive lower bound",
                self.name
            )));
        }
        Ok(())
    }

    /// The guess as a typed value.
    pub fn guess_value(&self) -> ParValue {
        match &self.kind {
            ParamKind::Float => ParValue::Float(self.guess),
            ParamKind::Int => ParValue::Int(self.guess as i64),
            ParamKind::Categorical(choices) => choices[self.guess as usize].clone(),
        }
    }
}

/// The full search space, plus whether each trial re-seeds the simulation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchSpace {
    pub params: Vec<CalibParam>,
    /// When set, every trial samples a fresh `rand_seed` as a uniform
    /// integer, making the seed itself part of the search.
    pub reseed: bool,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, param: CalibParam) -> EpiResult<Self> {
        param.validate()?;
        if self.params.iter().any(|p| p.name == param.name) {
            return Err(EpiError::Config(format!(
                "duplicate search parameter {:?}",
                param.name
            )));
        }
        self.params.push(param);
        Ok(self)
    }

    pub fn with_reseed(mut self) -> Self {
        self.reseed = true;
        self
    }

    /// Ask the backend for one concrete value per free parameter.
    pub fn sample(&self, sampler: &mut dyn Sampler) -> BTreeMap<String, ParValue> {
        let mut out = BTreeMap::new();
        for p in &self.params {
            let value = match &p.kind {
                ParamKind::Float => {
                    ParValue::Float(sampler.suggest_float(&p.name, p.low, p.high, p.log, p.step))
                }
                ParamKind::Int => {
                    ParValue::Int(sampler.suggest_int(&p.name, p.low as i64, p.high as i64))
                }
                ParamKind::Categorical(choices) => {
                    choices[sampler.suggest_categorical(&p.name, choices.len())].clone()
                }
            };
            out.insert(p.name.clone(), value);
        }
        if self.reseed {
            out.insert(
                "rand_seed".to_owned(),
                ParValue::Int(sampler.suggest_int("rand_seed", 0, u32::MAX as i64)),
            );
        }
        out
    }

    /// The parameter vector at the initial guess.
    pub fn guesses(&self) -> BTreeMap<String, ParValue> {
        self.params
            .iter()
            .map(|p| (p.name.clone(), p.guess_value()))
            .collect()
    }
}
