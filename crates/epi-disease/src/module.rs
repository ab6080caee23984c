//! The module lifecycle contract and the per-step context handed to modules.
//!
//! A module owns its state columns and random streams; the simulation driver
//! owns everything else (store, networks, results) and lends it out through
//! [`StepCtx`] for the duration of one hook call.  Modules never hold
//! references to the store between steps, so growth stays atomic relative to
//! module reads.

use epi_core::{AgentId, EpiResult, Results, Timeline};
use epi_net::Network;
use epi_people::People;

/// Everything a module may touch during one step.
pub struct StepCtx<'a> {
    /// Current step index.
    pub ti: usize,
    /// Step size in years.
    pub dt: f64,
    /// Calendar year of this step.
    pub year: f64,
    pub people: &'a mut People,
    pub networks: &'a mut [Box<dyn Network>],
    pub results: &'a mut Results,
}

impl StepCtx<'_> {
    /// Current step index as a float, for comparison against `ti_` fields.
    #[inline]
    pub fn t(&self) -> f64 {
        self.ti as f64
    }
}

/// Lifecycle contract shared by diseases, demographic processes, and
/// interventions.
///
/// Hook order per step is fixed by the driver: `start_step` for every
/// module, then `step` for every module in registration order, then death
/// application with `on_deaths` fan-out, then `record`.
pub trait Module {
    /// Unique module key; prefixes this module's columns and channels.
    fn name(&self) -> &str;

    /// Register columns, derive random streams, seed initial state.
    fn init(&mut self, trial_seed: u64, people: &mut People, timeline: &Timeline)
        -> EpiResult<()>;

    /// Pre-step hook; most modules need none.
    fn start_step(&mut self, _ctx: &mut StepCtx) {}

    /// The module's dynamics for one step.
    fn step(&mut self, ctx: &mut StepCtx) -> EpiResult<()>;

    /// Called when agents die this step, after all `step` hooks.  Modules
    /// must force their own "active" flags false for the dead.
    fn on_deaths(&mut self, _people: &mut People, _uids: &[AgentId]) {}

    /// Write this step's output channels.
    fn record(&mut self, _ctx: &mut StepCtx) {}

    /// Post-run hook (cumulative channels, final summaries).
    fn finalize(&mut self, _results: &mut Results) {}
}
