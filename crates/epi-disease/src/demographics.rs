//! Demographic processes: births from crude birth rates, background
//! mortality, and an explicit pregnancy module with maternal linkage.

use epi_core::{interp_table, AgentId, EpiResult, Pars, RngStream, Timeline};
use epi_people::{ColumnId, ColumnSpec, People};

use crate::infection::{consume_events, due_events};
use crate::module::{Module, StepCtx};

/// Assign sex and sexual debut age to a batch of new agents.  Draws are
/// keyed by the new agents' uids, so existing agents are unaffected.
fn init_newborns(
    people: &mut People,
    uids: &[AgentId],
    age: f64,
    sex: &RngStream,
    debut: &RngStream,
    ti: usize,
) {
    let female = sex.bernoulli(ti, uids, 0.5);
    let debut_age = debut.uniform(ti, uids, 12.0, 20.0);
    for ((u, f), d) in uids.iter().zip(&female).zip(&debut_age) {
        let i = u.index();
        people.age[i] = age;
        people.female[i] = *f;
        people.debut[i] = *d;
    }
}

// ── Births ────────────────────────────────────────────────────────────────────

/// Births from a crude birth rate (per 1,000 population per year),
/// interpolated over a `(year, rate)` table.
pub struct Births {
    name: String,
    cbr: Vec<(f64, f64)>,
    sex: RngStream,
    debut: RngStream,
    new: usize,
    cumulative: f64,
}

impl Births {
    pub fn new(key: &str, pars: &Pars) -> EpiResult<Self> {
        let cbr = if pars.contains("cbr") {
            pars.table("cbr")?.to_vec()
        } else {
            vec![(2000.0, pars.f64_or("rate", 20.0)?)]
        };
        Ok(Self {
            name: key.to_owned(),
            cbr,
            sex: RngStream::new(0, key, "sex"),
            debut: RngStream::new(0, key, "debut"),
            new: 0,
            cumulative: 0.0,
        })
    }
}

impl Module for Births {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(
        &mut self,
        trial_seed: u64,
        _people: &mut People,
        _timeline: &Timeline,
    ) -> EpiResult<()> {
        self.sex = RngStream::new(trial_seed, &self.name, "sex");
        self.debut = RngStream::new(trial_seed, &self.name, "debut");
        Ok(())
    }

    fn start_step(&mut self, _ctx: &mut StepCtx) {
        self.new = 0;
    }

    fn step(&mut self, ctx: &mut StepCtx) -> EpiResult<()> {
        let rate = interp_table(&self.cbr, ctx.year) / 1000.0;
        let n_new = (ctx.people.n_alive() as f64 * rate * ctx.dt).floor() as usize;
        if n_new > 0 {
            let range = ctx.people.grow(n_new);
            let uids: Vec<AgentId> = range.map(AgentId).collect();
            init_newborns(ctx.people, &uids, 0.0, &self.sex, &self.debut, ctx.ti);
        }
        self.new = n_new;
        self.cumulative += n_new as f64;
        Ok(())
    }

    fn record(&mut self, ctx: &mut StepCtx) {
        let name = &self.name;
        ctx.results
            .record(&format!("{name}.new"), ctx.ti, self.new as f64);
        ctx.results
            .record(&format!("{name}.cumulative"), ctx.ti, self.cumulative);
    }
}

// ── BackgroundDeaths ──────────────────────────────────────────────────────────

/// All-cause background mortality: a per-step Bernoulli over the living.
pub struct BackgroundDeaths {
    name: String,
    /// Annual death probability.
    death_rate: f64,
    mortality: RngStream,
    new: usize,
    cumulative: f64,
}

impl BackgroundDeaths {
    pub fn new(key: &str, pars: &Pars) -> EpiResult<Self> {
        Ok(Self {
            name: key.to_owned(),
            death_rate: pars.f64_or("death_rate", 0.02)?,
            mortality: RngStream::new(0, key, "mortality"),
            new: 0,
            cumulative: 0.0,
        })
    }
}

impl Module for BackgroundDeaths {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(
        &mut self,
        trial_seed: u64,
        _people: &mut People,
        _timeline: &Timeline,
    ) -> EpiResult<()> {
        self.mortality = RngStream::new(trial_seed, &self.name, "mortality");
        Ok(())
    }

    fn start_step(&mut self, _ctx: &mut StepCtx) {
        self.new = 0;
    }

    fn step(&mut self, ctx: &mut StepCtx) -> EpiResult<()> {
        let p = (self.death_rate * ctx.dt).clamp(0.0, 1.0);
        let living = ctx.people.alive_uids();
        let dying = self.mortality.filter(ctx.ti, &living, p);
        self.new = dying.len();
        self.cumulative += dying.len() as f64;
        ctx.people.request_death(&dying);
        Ok(())
    }

    fn record(&mut self, ctx: &mut StepCtx) {
        let name = &self.name;
        ctx.results
            .record(&format!("{name}.new"), ctx.ti, self.new as f64);
        ctx.results
            .record(&format!("{name}.cumulative"), ctx.ti, self.cumulative);
    }
}

// ── Pregnancy ─────────────────────────────────────────────────────────────────

#[derive(Copy, Clone)]
struct PregCols {
    pregnant: ColumnId,
    postpartum: ColumnId,
    ti_delivery: ColumnId,
    ti_postpartum: ColumnId,
}

/// Explicit pregnancy: conception among eligible women, gestation of unborn
/// agents (grown into the store with negative age), delivery, postpartum,
/// and a maternal-death branch resolved at conception.
///
/// Unborn children are linked to their mothers on every vertical network
/// layer, enabling mother-to-child transmission during gestation.
pub struct Pregnancy {
    name: String,
    /// Annual conception probability per eligible woman.
    fertility_rate: f64,
    /// Gestation length in years.
    dur_pregnancy: f64,
    dur_postpartum: f64,
    p_maternal_death: f64,
    fertile_age_lo: f64,
    fertile_age_hi: f64,

    cols: Option<PregCols>,
    conception: RngStream,
    maternal: RngStream,
    sex: RngStream,
    debut: RngStream,

    dt: f64,
    conceptions: usize,
    deliveries: usize,
}

impl Pregnancy {
    pub fn new(key: &str, pars: &Pars) -> EpiResult<Self> {
        Ok(Self {
            name: key.to_owned(),
            fertility_rate: pars.f64_or("fertility_rate", 0.1)?,
            dur_pregnancy: pars.f64_or("dur_pregnancy", 0.75)?,
            dur_postpartum: pars.f64_or("dur_postpartum", 0.5)?,
            p_maternal_death: pars.f64_or("p_maternal_death", 0.0)?,
            fertile_age_lo: pars.f64_or("fertile_age_lo", 15.0)?,
            fertile_age_hi: pars.f64_or("fertile_age_hi", 50.0)?,
            cols: None,
            conception: RngStream::new(0, key, "conception"),
            maternal: RngStream::new(0, key, "maternal"),
            sex: RngStream::new(0, key, "sex"),
            debut: RngStream::new(0, key, "debut"),
            dt: 1.0,
            conceptions: 0,
            deliveries: 0,
        })
    }

    fn cols(&self) -> PregCols {
        match self.cols {
            Some(c) => c,
            None => panic!("{} stepped before init", self.name),
        }
    }

    /// Women who can conceive this step.
    fn eligible(&self, people: &People) -> Vec<AgentId> {
        let cols = self.cols();
        let pregnant = people.bools(cols.pregnant);
        let postpartum = people.bools(cols.postpartum);
        (0..people.len())
            .filter(|&i| {
                people.alive[i]
                    && people.female[i]
                    && !pregnant[i]
                    && !postpartum[i]
                    && people.age[i] >= self.fertile_age_lo
                    && people.age[i] < self.fertile_age_hi
            })
            .map(|i| AgentId(i as u32))
            .collect()
    }

    fn conceive(&mut self, ctx: &mut StepCtx) {
        let cols = self.cols();
        let eligible = self.eligible(ctx.people);
        let p = (self.fertility_rate * ctx.dt).clamp(0.0, 1.0);
        let mothers = self.conception.filter(ctx.ti, &eligible, p);
        if mothers.is_empty() {
            return;
        }

        let range = ctx.people.grow(mothers.len());
        let children: Vec<AgentId> = range.map(AgentId).collect();
        init_newborns(
            ctx.people,
            &children,
            -self.dur_pregnancy,
            &self.sex,
            &self.debut,
            ctx.ti,
        );

        let due = ctx.t() + self.dur_pregnancy / self.dt;
        for m in &mothers {
            ctx.people.bools_mut(cols.pregnant)[m.index()] = true;
        }
        for m in &mothers {
            ctx.people.floats_mut(cols.ti_delivery)[m.index()] = due;
        }
        // Maternal deaths, resolved now, are scheduled for the delivery step
        // through the store's own death timer.
        let dies = self.maternal.filter(ctx.ti, &mothers, self.p_maternal_death);
        for m in &dies {
            ctx.people.ti_dead[m.index()] = due;
        }

        // Gestation edges on every vertical layer.
        let durs = vec![self.dur_pregnancy; mothers.len()];
        let betas = vec![1.0; mothers.len()];
        for net in ctx.networks.iter_mut() {
            if net.directional() {
                net.edges_mut().add_pairs(&mothers, &children, &betas, &durs);
            }
        }
        self.conceptions += mothers.len();
    }

    fn update_states(&mut self, ctx: &mut StepCtx) {
        let cols = self.cols();
        let t = ctx.t();

        let delivering = due_events(
            ctx.people.bools(cols.pregnant),
            ctx.people.floats(cols.ti_delivery),
            t,
        );
        for m in &delivering {
            ctx.people.bools_mut(cols.pregnant)[m.index()] = false;
        }
        for m in &delivering {
            ctx.people.bools_mut(cols.postpartum)[m.index()] = true;
        }
        consume_events(ctx.people.floats_mut(cols.ti_delivery), &delivering);
        let pp_end = t + self.dur_postpartum / self.dt;
        for m in &delivering {
            ctx.people.floats_mut(cols.ti_postpartum)[m.index()] = pp_end;
        }
        self.deliveries += delivering.len();

        let resuming = due_events(
            ctx.people.bools(cols.postpartum),
            ctx.people.floats(cols.ti_postpartum),
            t,
        );
        for m in &resuming {
            ctx.people.bools_mut(cols.postpartum)[m.index()] = false;
        }
        consume_events(ctx.people.floats_mut(cols.ti_postpartum), &resuming);
    }
}

impl Module for Pregnancy {
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
        self.conception = RngStream::new(trial_seed, &self.name, "conception");
        self.maternal = RngStream::new(trial_seed, &self.name, "maternal");
        self.sex = RngStream::new(trial_seed, &self.name, "sex");
        self.debut = RngStream::new(trial_seed, &self.name, "debut");

        let name = &self.name;
        self.cols = Some(PregCols {
            pregnant: people
                .register_column(ColumnSpec::boolean(format!("{name}.pregnant"), false))?,
            postpartum: people
                .register_column(ColumnSpec::boolean(format!("{name}.postpartum"), false))?,
            ti_delivery: people
                .register_column(ColumnSpec::float(format!("{name}.ti_delivery"), f64::NAN))?,
            ti_postpartum: people
                .register_column(ColumnSpec::float(format!("{name}.ti_postpartum"), f64::NAN))?,
        });
        Ok(())
    }

    fn start_step(&mut self, _ctx: &mut StepCtx) {
        self.conceptions = 0;
        self.deliveries = 0;
    }

    fn step(&mut self, ctx: &mut StepCtx) -> EpiResult<()> {
        self.update_states(ctx);
        self.conceive(ctx);
        Ok(())
    }

    fn on_deaths(&mut self, people: &mut People, uids: &[AgentId]) {
        let cols = self.cols();
        for u in uids {
            people.bools_mut(cols.pregnant)[u.index()] = false;
        }
        for u in uids {
            people.bools_mut(cols.postpartum)[u.index()] = false;
        }
    }

    fn record(&mut self, ctx: &mut StepCtx) {
        let cols = self.cols();
        let name = &self.name;
        ctx.results.record(
            &format!("{name}.pregnancies"),
            ctx.ti,
            self.conceptions as f64,
        );
        ctx.results
            .record(&format!("{name}.births"), ctx.ti, self.deliveries as f64);
        ctx.results.record(
            &format!("{name}.n_pregnant"),
            ctx.ti,
            ctx.people.count_true(cols.pregnant) as f64,
        );
    }
}
