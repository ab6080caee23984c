//! Measles: an SEIR infection with normally distributed stage durations.
//!
//! Transmission treats both exposed and infected agents as infectious (the
//! prodromal period is contagious).  The infected stage's recovery/death
//! branch is resolved when the exposed stage ends, so every agent carries
//! exactly one pending downstream event at a time.

use epi_core::{AgentId, EpiResult, Pars, RngStream, Timeline};
use epi_net::MixingPool;
use epi_people::{ColumnId, ColumnSpec, People};

use crate::infection::{consume_events, due_events, network_exposures, InfectionCols};
use crate::module::{Module, StepCtx};

#[derive(Copy, Clone)]
struct Cols {
    core: InfectionCols,
    exposed: ColumnId,
    recovered: ColumnId,
    ti_exposed: ColumnId,
    ti_recovered: ColumnId,
    ti_dead: ColumnId,
}

pub struct Measles {
    name: String,
    beta: f64,
    init_prev: f64,
    /// Incubation duration, years (Normal).
    dur_exp_mean: f64,
    dur_exp_std: f64,
    /// Infectious duration, years (Normal).
    dur_inf_mean: f64,
    dur_inf_std: f64,
    p_death: f64,
    layers: Vec<String>,
    /// Optional aggregate contact model, applied alongside the edge layers.
    pool: Option<MixingPool>,

    cols: Option<Cols>,

    seeding: RngStream,
    acquisition: RngStream,
    incubation: RngStream,
    prognosis: RngStream,
    outcome: RngStream,

    dt: f64,
    new_infections: usize,
    new_deaths: usize,
}

impl Measles {
    pub fn new(key: &str, pars: &Pars) -> EpiResult<Self> {
        Ok(Self {
            name: key.to_owned(),
            beta: pars.f64_or("beta", 0.5)?,
            init_prev: pars.f64_or("init_prev", 0.005)?,
            dur_exp_mean: pars.f64_or("dur_exp", 0.03)?,
            dur_exp_std: pars.f64_or("dur_exp_std", 0.005)?,
            dur_inf_mean: pars.f64_or("dur_inf", 0.022)?,
            dur_inf_std: pars.f64_or("dur_inf_std", 0.005)?,
            p_death: pars.f64_or("p_death", 0.005)?,
            layers: match pars.str_or("layer", "")? {
                "" => Vec::new(),
                l => vec![l.to_owned()],
            },
            pool: None,
            cols: None,
            seeding: RngStream::new(0, key, "seeding"),
            acquisition: RngStream::new(0, key, "acquisition"),
            incubation: RngStream::new(0, key, "incubation"),
            prognosis: RngStream::new(0, key, "prognosis"),
            outcome: RngStream::new(0, key, "outcome"),
            dt: 1.0,
            new_infections: 0,
            new_deaths: 0,
        })
    }

    /// Attach an age-band mixing pool as an additional transmission route.
    pub fn with_pool(mut self, pool: MixingPool) -> Self {
        self.pool = Some(pool);
        self
    }

    fn cols(&self) -> Cols {
        match self.cols {
            Some(c) => c,
            None => panic!("{} stepped before init", self.name),
        }
    }

    /// Exposed and infected agents both transmit.
    fn infectious_mask(&self, people: &People) -> Vec<bool> {
        let cols = self.cols();
        people
            .bools(cols.exposed)
            .iter()
            .zip(people.bools(cols.core.infected))
            .map(|(&e, &i)| e || i)
            .collect()
    }

    /// Move newly exposed agents into the incubation stage.
    fn set_prognoses(&mut self, people: &mut People, uids: &[AgentId], ti: usize) {
        if uids.is_empty() {
            return;
        }
        let cols = self.cols();
        let t = ti as f64;

        for u in uids {
            people.bools_mut(cols.core.susceptible)[u.index()] = false;
        }
        for u in uids {
            people.bools_mut(cols.exposed)[u.index()] = true;
        }
        for u in uids {
            people.floats_mut(cols.ti_exposed)[u.index()] = t;
        }
        // Symptom onset after incubation; never due before next step.
        let dur = self
            .incubation
            .normal(ti, uids, self.dur_exp_mean / self.dt, self.dur_exp_std / self.dt);
        for (u, d) in uids.iter().zip(&dur) {
            people.floats_mut(cols.core.ti_infected)[u.index()] = t + d.max(1.0);
        }
        self.new_infections += uids.len();
    }

    fn make_new_cases(&mut self, ctx: &mut StepCtx) {
        let cols = self.cols();
        let infectious = self.infectious_mask(ctx.people);
        let mut exposed = network_exposures(
            ctx.ti,
            ctx.dt,
            self.beta,
            ctx.networks,
            &self.layers,
            ctx.people,
            &infectious,
            ctx.people.floats(cols.core.rel_trans),
            ctx.people.bools(cols.core.susceptible),
            ctx.people.floats(cols.core.rel_sus),
            &self.acquisition,
        );
        if let Some(pool) = &self.pool {
            exposed.extend(pool.new_exposures(
                ctx.ti,
                ctx.people,
                self.beta * ctx.dt,
                &infectious,
                ctx.people.floats(cols.core.rel_trans),
                ctx.people.bools(cols.core.susceptible),
                ctx.people.floats(cols.core.rel_sus),
            ));
            exposed.sort_unstable();
            exposed.dedup();
        }
        self.set_prognoses(ctx.people, &exposed, ctx.ti);
    }

    fn update_states(&mut self, ctx: &mut StepCtx) {
        let cols = self.cols();
        let t = ctx.t();
        let ti = ctx.ti;

        // Symptom onset; the recovery/death branch is resolved here, as the
        // predecessor event fires.
        let onset = due_events(
            ctx.people.bools(cols.exposed),
            ctx.people.floats(cols.core.ti_infected),
            t,
        );
        for u in &onset {
            ctx.people.bools_mut(cols.exposed)[u.index()] = false;
        }
        for u in &onset {
            ctx.people.bools_mut(cols.core.infected)[u.index()] = true;
        }
        let dur = self.prognosis.normal(
            ti,
            &onset,
            self.dur_inf_mean / self.dt,
            self.dur_inf_std / self.dt,
        );
        let dies = self.outcome.bernoulli(ti, &onset, self.p_death);
        for ((u, d), dies) in onset.iter().zip(&dur).zip(&dies) {
            let due = t + d.max(1.0);
            if *dies {
                ctx.people.floats_mut(cols.ti_dead)[u.index()] = due;
            } else {
                ctx.people.floats_mut(cols.ti_recovered)[u.index()] = due;
            }
        }

        // Recovery confers immunity (recovered agents never re-enter the
        // susceptible pool).
        let recovered = due_events(
            ctx.people.bools(cols.core.infected),
            ctx.people.floats(cols.ti_recovered),
            t,
        );
        for u in &recovered {
            ctx.people.bools_mut(cols.core.infected)[u.index()] = false;
        }
        for u in &recovered {
            ctx.people.bools_mut(cols.recovered)[u.index()] = true;
        }
        consume_events(ctx.people.floats_mut(cols.ti_recovered), &recovered);

        let dying = due_events(
            ctx.people.bools(cols.core.infected),
            ctx.people.floats(cols.ti_dead),
            t,
        );
        consume_events(ctx.people.floats_mut(cols.ti_dead), &dying);
        self.new_deaths += dying.len();
        ctx.people.request_death(&dying);
    }
}

impl Module for Measles {
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
        self.acquisition = RngStream::new(trial_seed, &self.name, "acquisition");
        self.incubation = RngStream::new(trial_seed, &self.name, "incubation");
        self.prognosis = RngStream::new(trial_seed, &self.name, "prognosis");
        self.outcome = RngStream::new(trial_seed, &self.name, "outcome");

        let name = &self.name;
        let core = InfectionCols::register(people, name)?;
        let cols = Cols {
            core,
            exposed: people
                .register_column(ColumnSpec::boolean(format!("{name}.exposed"), false))?,
            recovered: people
                .register_column(ColumnSpec::boolean(format!("{name}.recovered"), false))?,
            ti_exposed: people
                .register_column(ColumnSpec::float(format!("{name}.ti_exposed"), f64::NAN))?,
            ti_recovered: people
                .register_column(ColumnSpec::float(format!("{name}.ti_recovered"), f64::NAN))?,
            ti_dead: people
                .register_column(ColumnSpec::float(format!("{name}.ti_dead"), f64::NAN))?,
        };
        self.cols = Some(cols);
        if let Some(pool) = &mut self.pool {
            pool.init(trial_seed);
        }

        let all = people.alive_uids();
        let seeds = self.seeding.filter(0, &all, self.init_prev);
        self.set_prognoses(people, &seeds, 0);
        Ok(())
    }

    fn start_step(&mut self, _ctx: &mut StepCtx) {
        self.new_infections = 0;
        self.new_deaths = 0;
    }

    fn step(&mut self, ctx: &mut StepCtx) -> EpiResult<()> {
        self.make_new_cases(ctx);
        self.update_states(ctx);
        Ok(())
    }

    fn on_deaths(&mut self, people: &mut People, uids: &[AgentId]) {
        let cols = self.cols();
        for u in uids {
            let i = u.index();
            people.bools_mut(cols.core.infected)[i] = false;
        }
        for u in uids {
            people.bools_mut(cols.exposed)[u.index()] = false;
        }
        for u in uids {
            people.bools_mut(cols.core.susceptible)[u.index()] = false;
        }
    }

    fn record(&mut self, ctx: &mut StepCtx) {
        let cols = self.cols();
        let n_sus = ctx.people.count_true(cols.core.susceptible) as f64;
        let n_exp = ctx.people.count_true(cols.exposed) as f64;
        let n_inf = ctx.people.count_true(cols.core.infected) as f64;
        let n_rec = ctx.people.count_true(cols.recovered) as f64;
        let n_alive = ctx.people.n_alive() as f64;
        let name = &self.name;
        ctx.results
            .record(&format!("{name}.n_susceptible"), ctx.ti, n_sus);
        ctx.results.record(&format!("{name}.n_exposed"), ctx.ti, n_exp);
        ctx.results.record(&format!("{name}.n_infected"), ctx.ti, n_inf);
        ctx.results.record(&format!("{name}.n_recovered"), ctx.ti, n_rec);
        ctx.results.record(
            &format!("{name}.prevalence"),
            ctx.ti,
            if n_alive > 0.0 { (n_exp + n_inf) / n_alive } else { 0.0 },
        );
        ctx.results.record(
            &format!("{name}.new_infections"),
            ctx.ti,
            self.new_infections as f64,
        );
        ctx.results
            .record(&format!("{name}.new_deaths"), ctx.ti, self.new_deaths as f64);
    }
}
