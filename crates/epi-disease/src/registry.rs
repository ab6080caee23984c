//! Explicit static module registry.
//!
//! Modules are built from configuration by looking up a `module_type` name
//! in this table, never by scanning for implementations.  Unknown types are
//! a fatal configuration error.

use std::collections::BTreeMap;

use epi_core::{EpiError, EpiResult, Pars};

use crate::demographics::{BackgroundDeaths, Births, Pregnancy};
use crate::gonorrhea::Gonorrhea;
use crate::interventions::ProductIntervention;
use crate::measles::Measles;
use crate::module::Module;
use crate::ncd::Ncd;

/// Builds one module from its key and parameter table.
pub type ModuleCtor = fn(&str, &Pars) -> EpiResult<Box<dyn Module>>;

/// `module_type -> constructor` table.
pub struct ModuleRegistry {
    ctors: BTreeMap<String, ModuleCtor>,
}

impl ModuleRegistry {
    pub fn empty() -> Self {
        Self {
            ctors: BTreeMap::new(),
        }
    }

    /// The built-in module types.
    pub fn standard() -> Self {
        let mut reg = Self::empty();
        reg.register("gonorrhea", |k, p| Ok(Box::new(Gonorrhea::new(k, p)?)));
        reg.register("measles", |k, p| Ok(Box::new(Measles::new(k, p)?)));
        reg.register("ncd", |k, p| Ok(Box::new(Ncd::new(k, p)?)));
        reg.register("pregnancy", |k, p| Ok(Box::new(Pregnancy::new(k, p)?)));
        reg.register("births", |k, p| Ok(Box::new(Births::new(k, p)?)));
        reg.register("background_deaths", |k, p| {
            Ok(Box::new(BackgroundDeaths::new(k, p)?))
        });
        reg.register("intervention", |k, p| {
            Ok(Box::new(ProductIntervention::from_pars(k, p)?))
        });
        reg
    }

    /// Add or replace a constructor (replacement supports test doubles).
    pub fn register(&mut self, module_type: impl Into<String>, ctor: ModuleCtor) {
        self.ctors.insert(module_type.into(), ctor);
    }

    pub fn contains(&self, module_type: &str) -> bool {
        self.ctors.contains_key(module_type)
    }

    /// Build a module instance, failing fast on unknown types.
    pub fn build(
        &self,
        module_type: &str,
        key: &str,
        pars: &Pars,
    ) -> EpiResult<Box<dyn Module>> {
        match self.ctors.get(module_type) {
            Some(ctor) => {
                log::debug!("building module {key:?} of type {module_type:?}");
                ctor(key, pars)
            }
            None => Err(EpiError::Config(format!(
                "unknown module type {module_type:?} (registered: {:?})",
                self.ctors.keys().collect::<Vec<_>>()
            ))),
        }
    }
}
