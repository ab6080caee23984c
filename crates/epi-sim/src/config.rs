//! Immutable simulation configuration.
//!
//! A `SimConfig` is a plain value: building a simulation never mutates it,
//! and calibration produces variants through the pure
//! [`SimConfig::with_overrides`], so concurrent trials can never leak state
//! into each other through a shared configuration.
//!
//! Parameters are addressed by a 3-level path `section.key.par`, e.g.
//! `modules.gon.beta` or `networks.sexual.mean_dur`.  Every level is
//! validated; an unknown section, key, or parameter name is a fatal
//! configuration error, never a silent no-op.

use epi_core::{EpiError, EpiResult, ParValue, Pars, Timeline};
use serde::{Deserialize, Serialize};

/// Declaration of one network layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// One of `random`, `static`, `sexual`, `maternal`.
    pub net_type: String,
    #[serde(default)]
    pub pars: Pars,
}

impl NetworkSpec {
    pub fn new(net_type: impl Into<String>, pars: Pars) -> Self {
        Self {
            net_type: net_type.into(),
            pars,
        }
    }
}

/// Declaration of one module (disease, demographic process, intervention).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// A type name known to the module registry.
    pub module_type: String,
    #[serde(default)]
    pub pars: Pars,
}

impl ModuleSpec {
    pub fn new(module_type: impl Into<String>, pars: Pars) -> Self {
        Self {
            module_type: module_type.into(),
            pars,
        }
    }
}

/// A fully parsed `section.key.par` parameter address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamPath {
    pub section: String,
    pub key: String,
    pub par: String,
}

impl ParamPath {
    pub fn new(
        section: impl Into<String>,
        key: impl Into<String>,
        par: impl Into<String>,
    ) -> Self {
        Self {
            section: section.into(),
            key: key.into(),
            par: par.into(),
        }
    }

    /// Parse a dotted path; exactly three components are required.
    pub fn parse(path: &str) -> EpiResult<Self> {
        let parts: Vec<&str> = path.split('.').collect();
        match parts.as_slice() {
            [section, key, par] if !section.is_empty() && !key.is_empty() && !par.is_empty() => {
                Ok(Self::new(*section, *key, *par))
            }
            _ => Err(EpiError::Config(format!(
                "parameter path {path:?} must have exactly three non-empty components"
            ))),
        }
    }
}

impl std::fmt::Display for ParamPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.section, self.key, self.par)
    }
}

/// The complete, immutable description of one simulation run.
///
/// Module order is preserved: modules run (and initialize) in declaration
/// order, so diseases must be declared before interventions that target
/// them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub n_agents: usize,
    pub timeline: Timeline,
    pub rand_seed: u64,
    /// `key -> layer` in declaration order.
    pub networks: Vec<(String, NetworkSpec)>,
    /// `key -> module` in declaration order.
    pub modules: Vec<(String, ModuleSpec)>,
}

impl SimConfig {
    pub fn new(n_agents: usize, timeline: Timeline, rand_seed: u64) -> Self {
        Self {
            n_agents,
            timeline,
            rand_seed,
            networks: Vec::new(),
            modules: Vec::new(),
        }
    }

    pub fn add_network(mut self, key: impl Into<String>, spec: NetworkSpec) -> Self {
        self.networks.push((key.into(), spec));
        self
    }

    pub fn add_module(mut self, key: impl Into<String>, spec: ModuleSpec) -> Self {
        self.modules.push((key.into(), spec));
        self
    }

    /// A copy with a different trial seed (per-trial reseeding).
    pub fn with_seed(mut self, rand_seed: u64) -> Self {
        self.rand_seed = rand_seed;
        self
    }

    /// Pure path-based mutation: returns a new configuration with each
    /// `(path, value)` applied.  Any unknown path component fails the whole
    /// call, leaving no partially applied configuration behind.
    pub fn with_overrides(&self, overrides: &[(ParamPath, ParValue)]) -> EpiResult<SimConfig> {
        let mut out = self.clone();
        for (path, value) in overrides {
            let pars = match path.section.as_str() {
                "modules" => out
                    .modules
                    .iter_mut()
                    .find(|(k, _)| k == &path.key)
                    .map(|(_, spec)| &mut spec.pars),
                "networks" => out
                    .networks
                    .iter_mut()
                    .find(|(k, _)| k == &path.key)
                    .map(|(_, spec)| &mut spec.pars),
                other => {
                    return Err(EpiError::Config(format!(
                        "unknown configuration section {other:?} in path {path}"
                    )))
                }
            };
            let pars = pars.ok_or_else(|| {
                EpiError::Config(format!("path {path} names an unknown {} key", path.section))
            })?;
            pars.override_value(&path.par, value.clone())
                .map_err(|_| EpiError::Config(format!("path {path} names an unknown parameter")))?;
        }
        Ok(out)
    }
}
