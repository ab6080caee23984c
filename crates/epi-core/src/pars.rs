//! Module parameter tables.
//!
//! Every module is configured from a flat `name -> value` table.  Values are
//! a small closed set of shapes; typed getters fail fast with a configuration
//! error naming the offending key, so a typo'd override never runs silently.
//! `BTreeMap` keeps iteration (and serialization) order deterministic.

use std::collections::BTreeMap;

use crate::{EpiError, EpiResult};

/// One parameter value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ParValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A `(year, value)` lookup table (e.g. crude birth rates).
    Table(Vec<(f64, f64)>),
}

impl From<bool> for ParValue {
    fn from(v: bool) -> Self {
        ParValue::Bool(v)
    }
}

impl From<i64> for ParValue {
    fn from(v: i64) -> Self {
        ParValue::Int(v)
    }
}

impl From<f64> for ParValue {
    fn from(v: f64) -> Self {
        ParValue::Float(v)
    }
}

impl From<&str> for ParValue {
    fn from(v: &str) -> Self {
        ParValue::Str(v.to_owned())
    }
}

impl From<Vec<(f64, f64)>> for ParValue {
    fn from(v: Vec<(f64, f64)>) -> Self {
        ParValue::Table(v)
    }
}

/// A module's parameter table.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pars(BTreeMap<String, ParValue>);

impl Pars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParValue>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Builder-style insert for literal tables.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&ParValue> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// A float parameter; `Int` values coerce.
    pub fn f64(&self, key: &str) -> EpiResult<f64> {
        match self.0.get(key) {
            Some(ParValue::Float(v)) => Ok(*v),
            Some(ParValue::Int(v)) => Ok(*v as f64),
            Some(other) => Err(EpiError::Config(format!(
                "parameter {key:?} is {other:?}, expected a number"
            ))),
            None => Err(EpiError::Config(format!("missing parameter {key:?}"))),
        }
    }

    /// A float parameter with a fallback when absent.
    pub fn f64_or(&self, key: &str, default: f64) -> EpiResult<f64> {
        if self.contains(key) {
            self.f64(key)
        } else {
            Ok(default)
        }
    }

    pub fn i64(&self, key: &str) -> EpiResult<i64> {
        match self.0.get(key) {
            Some(ParValue::Int(v)) => Ok(*v),
            Some(other) => Err(EpiError::Config(format!(
                "parameter {key:?} is {other:?}, expected an integer"
            ))),
            None => Err(EpiError::Config(format!("missing parameter {key:?}"))),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> EpiResult<bool> {
        match self.0.get(key) {
            Some(ParValue::Bool(v)) => Ok(*v),
            Some(other) => Err(EpiError::Config(format!(
                "parameter {key:?} is {other:?}, expected a bool"
            ))),
            None => Ok(default),
        }
    }

    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> EpiResult<&'a str> {
        match self.0.get(key) {
            Some(ParValue::Str(v)) => Ok(v),
            Some(other) => Err(EpiError::Config(format!(
                "parameter {key:?} is {other:?}, expected a string"
            ))),
            None => Ok(default),
        }
    }

    /// A `(year, value)` table parameter.
    pub fn table(&self, key: &str) -> EpiResult<&[(f64, f64)]> {
        match self.0.get(key) {
            Some(ParValue::Table(v)) => Ok(v),
            Some(other) => Err(EpiError::Config(format!(
                "parameter {key:?} is {other:?}, expected a (year, value) table"
            ))),
            None => Err(EpiError::Config(format!("missing parameter {key:?}"))),
        }
    }

    /// Overwrite one entry, failing on unknown keys.  Calibration overrides
    /// go through this so a mistyped path can never be silently ignored.
    pub fn override_value(&mut self, key: &str, value: ParValue) -> EpiResult<()> {
        match self.0.get_mut(key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(EpiError::Config(format!(
                "override targets unknown parameter {key:?}"
            ))),
        }
    }
}

/// Piecewise-linear interpolation over a `(x, y)` table sorted by `x`.
/// Clamps outside the covered range.
pub fn interp_table(table: &[(f64, f64)], x: f64) -> f64 {
    match table {
        [] => 0.0,
        [only] => only.1,
        _ => {
            if x <= table[0].0 {
                return table[0].1;
            }
            let last = table[table.len() - 1];
            if x >= last.0 {
                return last.1;
            }
            for w in table.windows(2) {
                let (x0, y0) = w[0];
                let (x1, y1) = w[1];
                if x <= x1 {
                    return y0 + (y1 - y0) * (x - x0) / (x1 - x0);
                }
            }
            last.1
        }
    }
}
