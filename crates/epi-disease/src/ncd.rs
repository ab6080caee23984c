//! A non-communicable condition: no network dependency, purely risk- and
//! time-driven.  At-risk agents progress to the affected state after an
//! exponentially distributed delay, then to death after a Weibull-distributed
//! prognosis.

use epi_core::{EpiResult, Pars, RngStream, Timeline};
use epi_people::{ColumnId, ColumnSpec, People};

use crate::infection::{consume_events, due_events};
use crate::module::{Module, StepCtx};

#[derive(Copy, Clone)]
struct Cols {
    at_risk: ColumnId,
    affected: ColumnId,
    ti_affected: ColumnId,
    ti_dead: ColumnId,
}

pub struct Ncd {
    name: String,
    /// Probability an agent starts at risk.
    initial_risk: f64,
    /// Mean years from at-risk to affected (Exponential).
    dur_risk: f64,
    /// Weibull prognosis (years) from affected to death.
    prognosis_shape: f64,
    prognosis_scale: f64,

    cols: Option<Cols>,
    seeding: RngStream,
    onset: RngStream,
    prognosis: RngStream,

    dt: f64,
    new_deaths: usize,
}

impl Ncd {
    pub fn new(key: &str, pars: &Pars) -> EpiResult<Self> {
        Ok(Self {
            name: key.to_owned(),
            initial_risk: pars.f64_or("initial_risk", 0.3)?,
            dur_risk: pars.f64_or("dur_risk", 10.0)?,
            prognosis_shape: pars.f64_or("prognosis_shape", 2.0)?,
            prognosis_scale: pars.f64_or("prognosis_scale", 8.0)?,
            cols: None,
            seeding: RngStream::new(0, key, "seeding"),
            onset: RngStream::new(0, key, "onset"),
            prognosis: RngStream::new(0, key, "prognosis"),
            dt: 1.0,
            new_deaths: 0,
        })
    }

    fn cols(&self) -> Cols {
        match self.cols {
            Some(c) => c,
            None => panic!("{} stepped before init", self.name),
        }
    }
}

impl Module for Ncd {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(
        &mut self,
        trial_seed: u64,
        people: &mut People,
        timeline: &Timeline,
    ) -> EpiResult<()> {
        self.dt = timeline.dt;
        self.seeding = RngStream::new(trial_seed, &self.name, "seeding");
        self.onset = RngStream::new(trial_seed, &self.name, "onset");
        self.prognosis = RngStream::new(trial_seed, &self.name, "prognosis");

        let name = &self.name;
        let cols = Cols {
            at_risk: people
                .register_column(ColumnSpec::boolean(format!("{name}.at_risk"), false))?,
            affected: people
                .register_column(ColumnSpec::boolean(format!("{name}.affected"), false))?,
            ti_affected: people
                .register_column(ColumnSpec::float(format!("{name}.ti_affected"), f64::NAN))?,
            ti_dead: people
                .register_column(ColumnSpec::float(format!("{name}.ti_dead"), f64::NAN))?,
        };
        self.cols = Some(cols);

        let all = people.alive_uids();
        let risky = self.seeding.filter(0, &all, self.initial_risk);
        for u in &risky {
            people.bools_mut(cols.at_risk)[u.index()] = true;
        }
        let delay = self.onset.expon(0, &risky, self.dur_risk / self.dt);
        for (u, d) in risky.iter().zip(&delay) {
            people.floats_mut(cols.ti_affected)[u.index()] = *d;
        }
        Ok(())
    }

    fn start_step(&mut self, _ctx: &mut StepCtx) {
        self.new_deaths = 0;
    }

    fn step(&mut self, ctx: &mut StepCtx) -> EpiResult<()> {
        let cols = self.cols();
        let t = ctx.t();

        let onset = due_events(
            ctx.people.bools(cols.at_risk),
            ctx.people.floats(cols.ti_affected),
            t,
        );
        for u in &onset {
            ctx.people.bools_mut(cols.at_risk)[u.index()] = false;
        }
        for u in &onset {
            ctx.people.bools_mut(cols.affected)[u.index()] = true;
        }
        consume_events(ctx.people.floats_mut(cols.ti_affected), &onset);
        // Prognosis is drawn once, at onset.
        let dur = self.prognosis.weibull(
            ctx.ti,
            &onset,
            self.prognosis_shape,
            self.prognosis_scale / self.dt,
        );
        for (u, d) in onset.iter().zip(&dur) {
            ctx.people.floats_mut(cols.ti_dead)[u.index()] = t + d;
        }

        let dying = due_events(
            ctx.people.bools(cols.affected),
            ctx.people.floats(cols.ti_dead),
            t,
        );
        consume_events(ctx.people.floats_mut(cols.ti_dead), &dying);
        self.new_deaths += dying.len();
        ctx.people.request_death(&dying);
        Ok(())
    }

    fn on_deaths(&mut self, people: &mut People, uids: &[epi_core::AgentId]) {
        let cols = self.cols();
        for u in uids {
            people.bools_mut(cols.affected)[u.index()] = false;
        }
        for u in uids {
            people.bools_mut(cols.at_risk)[u.index()] = false;
        }
    }

    fn record(&mut self, ctx: &mut StepCtx) {
        let cols = self.cols();
        let name = &self.name;
        let n_risk = ctx.people.count_true(cols.at_risk) as f64;
        let n_aff = ctx.people.count_true(cols.affected) as f64;
        ctx.results.record(&format!("{name}.n_at_risk"), ctx.ti, n_risk);
        ctx.results.record(&format!("{name}.n_affected"), ctx.ti, n_aff);
        ctx.results
            .record(&format!("{name}.new_deaths"), ctx.ti, self.new_deaths as f64);
    }
}
