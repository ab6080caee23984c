//! Gonorrhea: a susceptible-infected-susceptible infection with a per-case
//! death branch resolved at prognosis time.

use epi_core::{AgentId, EpiResult, Pars, RngStream, Timeline};
use epi_net::MixingPool;
use epi_people::{ColumnId, ColumnSpec, People};

use crate::infection::{consume_events, due_events, network_exposures, InfectionCols};
use crate::module::{Module, StepCtx};

#[derive(Copy, Clone)]
struct Cols {
    core: InfectionCols,
    ti_recovered: ColumnId,
    ti_dead: ColumnId,
}

pub struct Gonorrhea {
    name: String,
    beta: f64,
    init_prev: f64,
    /// Mean infection duration in years.
    dur_inf: f64,
    /// Probability an infection ends in death rather than recovery.
    p_death: f64,
    /// Network layers this disease transmits over; empty = all layers.
    layers: Vec<String>,
    /// Optional aggregate contact model, applied alongside the edge layers.
    pool: Option<MixingPool>,

    cols: Option<Cols>,

    seeding: RngStream,
    acquisition: RngStream,
    prognosis: RngStream,
    outcome: RngStream,

    dt: f64,
    new_infections: usize,
    new_deaths: usize,
}

impl Gonorrhea {
    pub fn new(key: &str, pars: &Pars) -> EpiResult<Self> {
        Ok(Self {
            name: key.to_owned(),
            beta: pars.f64_or("beta", 0.08)?,
            init_prev: pars.f64_or("init_prev", 0.02)?,
            dur_inf: pars.f64_or("dur_inf", 0.5)?,
            p_death: pars.f64_or("p_death", 0.01)?,
            layers: match pars.str_or("layer", "")? {
                "" => Vec::new(),
                l => vec![l.to_owned()],
            },
            pool: None,
            cols: None,
            seeding: RngStream::new(0, key, "seeding"),
            acquisition: RngStream::new(0, key, "acquisition"),
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

    /// Batch-assign infection state and downstream event times to newly
    /// exposed agents.  The recovery/death branch is resolved here, never at
    /// state-machine evaluation time.
    fn set_prognoses(&mut self, people: &mut People, uids: &[AgentId], ti: usize) {
        if uids.is_empty() {
            return;
        }
        let cols = self.cols();
        let t = ti as f64;

        let sus = people.bools_mut(cols.core.susceptible);
        for u in uids {
            sus[u.index()] = false;
        }
        let inf = people.bools_mut(cols.core.infected);
        for u in uids {
            inf[u.index()] = true;
        }
        let ti_inf = people.floats_mut(cols.core.ti_infected);
        for u in uids {
            ti_inf[u.index()] = t;
        }

        // Duration in steps (at least one, so a fresh infection never
        // resolves in its acquisition step), then a pre-resolved outcome.
        let dur = self.prognosis.poisson(ti, uids, self.dur_inf / self.dt);
        let dies = self.outcome.bernoulli(ti, uids, self.p_death);
        for ((u, d), dies) in uids.iter().zip(&dur).zip(&dies) {
            let due = t + d.max(1.0);
            if *dies {
                people.floats_mut(cols.ti_dead)[u.index()] = due;
            } else {
                people.floats_mut(cols.ti_recovered)[u.index()] = due;
            }
        }
        self.new_infections += uids.len();
    }

    fn make_new_cases(&mut self, ctx: &mut StepCtx) {
        let cols = self.cols();
        let mut exposed = network_exposures(
            ctx.ti,
            ctx.dt,
            self.beta,
            ctx.networks,
            &self.layers,
            ctx.people,
            ctx.people.bools(cols.core.infected),
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
                ctx.people.bools(cols.core.infected),
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

        // Recoveries return agents to the susceptible pool.
        let recovered = due_events(
            ctx.people.bools(cols.core.infected),
            ctx.people.floats(cols.ti_recovered),
            t,
        );
        for u in &recovered {
            ctx.people.bools_mut(cols.core.infected)[u.index()] = false;
        }
        for u in &recovered {
            ctx.people.bools_mut(cols.core.susceptible)[u.index()] = true;
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

impl Module for Gonorrhea {
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
        self.prognosis = RngStream::new(trial_seed, &self.name, "prognosis");
        self.outcome = RngStream::new(trial_seed, &self.name, "outcome");

        let core = InfectionCols::register(people, &self.name)?;
        let ti_recovered = people.register_column(ColumnSpec::float(
            format!("{}.ti_recovered", self.name),
            f64::NAN,
        ))?;
        let ti_dead = people.register_column(ColumnSpec::float(
            format!("{}.ti_dead", self.name),
            f64::NAN,
        ))?;
        self.cols = Some(Cols {
            core,
            ti_recovered,
            ti_dead,
        });
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
            people.bools_mut(cols.core.infected)[u.index()] = false;
        }
        for u in uids {
            people.bools_mut(cols.core.susceptible)[u.index()] = false;
        }
    }

    fn record(&mut self, ctx: &mut StepCtx) {
        let cols = self.cols();
        let n_sus = ctx.people.count_true(cols.core.susceptible) as f64;
        let n_inf = ctx.people.count_true(cols.core.infected) as f64;
        let n_alive = ctx.people.n_alive() as f64;
        let name = &self.name;
        ctx.results
            .record(&format!("{name}.n_susceptible"), ctx.ti, n_sus);
        ctx.results.record(&format!("{name}.n_infected"), ctx.ti, n_inf);
        ctx.results.record(
            &format!("{name}.prevalence"),
            ctx.ti,
            if n_alive > 0.0 { n_inf / n_alive } else { 0.0 },
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
