//! The simulation driver: owns the store, networks, modules, and results,
//! and runs the fixed per-step phase order.
//!
//! # Phase order (per step)
//!
//! 1. demographics — age the living, apply due scheduled deaths
//! 2. network updates — age/prune/re-form every layer
//! 3. module steps — in declaration order (diseases before interventions)
//! 4. death application — pending deaths become `alive = false`, with
//!    `on_deaths` fanned out to every module the same step
//! 5. result recording — module channels plus driver-owned `n_alive`
//!
//! Step 0 records initial state without advancing dynamics.

use epi_core::{EpiError, EpiResult, Results, Timeline};
use epi_disease::{Module, ModuleRegistry, StepCtx};
use epi_net::{MaternalNet, Network, RandomNet, SexualNetwork, StaticNet};
use epi_people::People;
use log::{debug, info};

use crate::config::{NetworkSpec, SimConfig};

fn build_network(key: &str, spec: &NetworkSpec) -> EpiResult<Box<dyn Network>> {
    Ok(match spec.net_type.as_str() {
        "random" => Box::new(RandomNet::new(key)),
        "static" => Box::new(StaticNet::new(key)),
        "sexual" => Box::new(SexualNetwork::new(key, spec.pars.f64_or("mean_dur", 2.0)?)),
        "maternal" => Box::new(MaternalNet::new(key)),
        other => {
            return Err(EpiError::Config(format!(
                "unknown network type {other:?} for layer {key:?}"
            )))
        }
    })
}

/// One simulation instance.  Exclusively owns its store and networks; never
/// shared across trials or threads.
pub struct Sim {
    timeline: Timeline,
    seed: u64,
    people: People,
    networks: Vec<Box<dyn Network>>,
    modules: Vec<Box<dyn Module>>,
    results: Results,
    ti: usize,
}

impl Sim {
    /// Build a simulation from configuration using the standard module
    /// registry.
    pub fn new(config: &SimConfig) -> EpiResult<Self> {
        Self::with_registry(config, &ModuleRegistry::standard())
    }

    /// Build with a caller-supplied registry (custom module types).
    pub fn with_registry(config: &SimConfig, registry: &ModuleRegistry) -> EpiResult<Self> {
        let timeline = Timeline::new(
            config.timeline.start,
            config.timeline.stop,
            config.timeline.dt,
        )?;

        let mut networks = Vec::with_capacity(config.networks.len());
        for (key, spec) in &config.networks {
            networks.push(build_network(key, spec)?);
        }
        let mut modules = Vec::with_capacity(config.modules.len());
        for (key, spec) in &config.modules {
            modules.push(registry.build(&spec.module_type, key, &spec.pars)?);
        }

        let mut sim = Self {
            timeline,
            seed: config.rand_seed,
            people: People::new(config.n_agents),
            networks,
            modules,
            results: Results::new(timeline.npts()),
            ti: 0,
        };
        sim.init()?;
        Ok(sim)
    }

    fn init(&mut self) -> EpiResult<()> {
        info!(
            "initializing sim: {} agents, {} steps, seed {}",
            self.people.len(),
            self.timeline.npts(),
            self.seed
        );
        for net in &mut self.networks {
            net.init(self.seed, &self.people)?;
        }
        for module in &mut self.modules {
            module.init(self.seed, &mut self.people, &self.timeline)?;
        }
        self.record();
        Ok(())
    }

    /// Advance one step.
    fn step(&mut self) -> EpiResult<()> {
        self.ti += 1;
        let ti = self.ti;
        let dt = self.timeline.dt;
        debug!("step {ti}");

        // Demographics, then scheduled store-level deaths.
        self.people.step_demographics(dt, ti);
        self.apply_deaths();

        for net in &mut self.networks {
            net.step(ti, dt, &self.people);
        }

        let mut ctx = StepCtx {
            ti,
            dt,
            year: self.timeline.year(ti),
            people: &mut self.people,
            networks: self.networks.as_mut_slice(),
            results: &mut self.results,
        };
        for module in &mut self.modules {
            module.start_step(&mut ctx);
        }
        for module in &mut self.modules {
            module.step(&mut ctx)?;
        }

        self.apply_deaths();
        self.record();
        Ok(())
    }

    /// Apply pending deaths and fan the casualty list out to every module.
    fn apply_deaths(&mut self) {
        let died = self.people.apply_deaths();
        if died.is_empty() {
            return;
        }
        for module in &mut self.modules {
            module.on_deaths(&mut self.people, &died);
        }
    }

    fn record(&mut self) {
        let ti = self.ti;
        self.results
            .record("n_alive", ti, self.people.n_alive() as f64);
        self.results.record("year", ti, self.timeline.year(ti));
        let mut ctx = StepCtx {
            ti,
            dt: self.timeline.dt,
            year: self.timeline.year(ti),
            people: &mut self.people,
            networks: self.networks.as_mut_slice(),
            results: &mut self.results,
        };
        for module in &mut self.modules {
            module.record(&mut ctx);
        }
    }

    /// Run to the end of the timeline and return the aggregated results.
    pub fn run(mut self) -> EpiResult<Results> {
        let n_steps = self.timeline.npts() - 1;
        while self.ti < n_steps {
            self.step()?;
        }
        for module in &mut self.modules {
            module.finalize(&mut self.results);
        }
        info!("run complete: {} steps, {} alive", self.ti, self.people.n_alive());
        Ok(self.results)
    }

    // Accessors used by tests and analyzers.

    pub fn people(&self) -> &People {
        &self.people
    }

    pub fn results(&self) -> &Results {
        &self.results
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn ti(&self) -> usize {
        self.ti
    }
}
