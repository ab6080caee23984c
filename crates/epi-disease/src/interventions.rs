//! Interventions as composition: a delivery schedule (when, and with what
//! acceptance probability) injected into a product policy (what happens to
//! accepted agents), combined by one generic [`ProductIntervention`] driver.
//!
//! Adding a new schedule x product combination is a constructor call, not a
//! new type.

use epi_core::{AgentId, EpiError, EpiResult, Pars, RngStream, Timeline};
use epi_people::{ColumnId, ColumnSpec, People};

use crate::module::{Module, StepCtx};

// ── Delivery schedules ────────────────────────────────────────────────────────

/// When an intervention is offered, and with what per-step probability.
#[derive(Clone, Debug)]
pub enum DeliverySchedule {
    /// Continuous delivery over `[start_year, end_year)` at an annual
    /// coverage probability, compounded to per-step probability.
    Routine {
        start_year: f64,
        end_year: f64,
        annual_prob: f64,
    },
    /// One-off delivery events at specific years, each with a per-event
    /// probability.
    Campaign { years: Vec<f64>, prob: f64 },
}

impl DeliverySchedule {
    /// Acceptance probability this step, or `None` when inactive.
    pub fn acceptance(&self, year: f64, dt: f64) -> Option<f64> {
        match self {
            DeliverySchedule::Routine {
                start_year,
                end_year,
                annual_prob,
            } => (year >= *start_year && year < *end_year)
                .then(|| 1.0 - (1.0 - annual_prob.clamp(0.0, 1.0)).powf(dt)),
            DeliverySchedule::Campaign { years, prob } => years
                .iter()
                .any(|y| (year - y).abs() < dt / 2.0)
                .then_some(*prob),
        }
    }

    fn from_pars(pars: &Pars) -> EpiResult<Self> {
        match pars.str_or("schedule", "routine")? {
            "routine" => Ok(DeliverySchedule::Routine {
                start_year: pars.f64_or("start_year", f64::NEG_INFINITY)?,
                end_year: pars.f64_or("end_year", f64::INFINITY)?,
                annual_prob: pars.f64_or("annual_prob", 0.5)?,
            }),
            "campaign" => {
                let years = pars
                    .table("campaign_years")?
                    .iter()
                    .map(|&(y, _)| y)
                    .collect();
                Ok(DeliverySchedule::Campaign {
                    years,
                    prob: pars.f64_or("prob", 0.9)?,
                })
            }
            other => Err(EpiError::Config(format!(
                "unknown delivery schedule {other:?}"
            ))),
        }
    }
}

// ── Products ──────────────────────────────────────────────────────────────────

/// What happens to agents who accept the offer.
#[derive(Clone, Debug)]
pub enum Product {
    /// Reduces susceptibility to the target disease by `efficacy`.
    Vaccination { efficacy: f64 },
    /// Tests infection status with imperfect sensitivity.
    Screening { sensitivity: f64 },
}

/// Age-band eligibility filter; either bound may be unbounded.
#[derive(Copy, Clone, Debug)]
pub struct Eligibility {
    pub min_age: f64,
    pub max_age: f64,
}

impl Default for Eligibility {
    fn default() -> Self {
        Self {
            min_age: f64::NEG_INFINITY,
            max_age: f64::INFINITY,
        }
    }
}

// ── The generic driver ────────────────────────────────────────────────────────

#[derive(Copy, Clone)]
struct VaccCols {
    vaccinated: ColumnId,
    n_doses: ColumnId,
    ti_vaccinated: ColumnId,
    /// The target disease's susceptibility multiplier.
    rel_sus: ColumnId,
}

#[derive(Copy, Clone)]
struct ScreenCols {
    tested: ColumnId,
    ti_tested: ColumnId,
    /// The target disease's infected flag.
    infected: ColumnId,
}

#[derive(Copy, Clone)]
enum ProductState {
    Vaccination { efficacy: f64, cols: VaccCols },
    Screening { sensitivity: f64, cols: ScreenCols },
}

/// One deployed intervention: schedule x product x eligibility.
pub struct ProductIntervention {
    name: String,
    /// Module key of the disease this intervention targets.
    disease: String,
    schedule: DeliverySchedule,
    product: Product,
    eligibility: Eligibility,

    state: Option<ProductState>,
    acceptance: RngStream,
    outcome: RngStream,

    n_delivered: usize,
    n_positive: usize,
    n_negative: usize,
}

impl ProductIntervention {
    pub fn new(
        key: &str,
        disease: impl Into<String>,
        schedule: DeliverySchedule,
        product: Product,
        eligibility: Eligibility,
    ) -> Self {
        Self {
            name: key.to_owned(),
            disease: disease.into(),
            schedule,
            product,
            eligibility,
            state: None,
            acceptance: RngStream::new(0, key, "acceptance"),
            outcome: RngStream::new(0, key, "outcome"),
            n_delivered: 0,
            n_positive: 0,
            n_negative: 0,
        }
    }

    pub fn from_pars(key: &str, pars: &Pars) -> EpiResult<Self> {
        let product = match pars.str_or("product", "vaccination")? {
            "vaccination" => Product::Vaccination {
                efficacy: pars.f64_or("efficacy", 0.9)?,
            },
            "screening" => Product::Screening {
                sensitivity: pars.f64_or("sensitivity", 0.95)?,
            },
            other => Err(EpiError::Config(format!("unknown product {other:?}")))?,
        };
        Ok(Self::new(
            key,
            pars.str_or("disease", "")?,
            DeliverySchedule::from_pars(pars)?,
            product,
            Eligibility {
                min_age: pars.f64_or("min_age", f64::NEG_INFINITY)?,
                max_age: pars.f64_or("max_age", f64::INFINITY)?,
            },
        ))
    }

    /// Resolve a column on the target disease; the disease module must be
    /// registered before its interventions.
    fn disease_column(&self, people: &People, field: &str) -> EpiResult<ColumnId> {
        let name = format!("{}.{field}", self.disease);
        people.column_id(&name).ok_or_else(|| {
            EpiError::Config(format!(
                "intervention {:?} targets missing column {name:?}; is disease {:?} registered first?",
                self.name, self.disease
            ))
        })
    }

    fn eligible(&self, people: &People) -> Vec<AgentId> {
        (0..people.len())
            .filter(|&i| {
                people.alive[i]
                    && people.age[i] >= self.eligibility.min_age
                    && people.age[i] < self.eligibility.max_age
            })
            .map(|i| AgentId(i as u32))
            .collect()
    }

    fn deliver(&mut self, ctx: &mut StepCtx, accepted: &[AgentId]) {
        let t = ctx.t();
        let state = match self.state {
            Some(s) => s,
            None => panic!("{} stepped before init", self.name),
        };
        match state {
            ProductState::Vaccination { efficacy, cols } => {
                // First doses only.
                let unvaccinated: Vec<AgentId> = {
                    let vacc = ctx.people.bools(cols.vaccinated);
                    accepted
                        .iter()
                        .copied()
                        .filter(|u| !vacc[u.index()])
                        .collect()
                };
                for u in &unvaccinated {
                    ctx.people.bools_mut(cols.vaccinated)[u.index()] = true;
                }
                for u in &unvaccinated {
                    ctx.people.ints_mut(cols.n_doses)[u.index()] += 1;
                }
                for u in &unvaccinated {
                    ctx.people.floats_mut(cols.ti_vaccinated)[u.index()] = t;
                }
                for u in &unvaccinated {
                    ctx.people.floats_mut(cols.rel_sus)[u.index()] *= 1.0 - efficacy;
                }
                self.n_delivered += unvaccinated.len();
            }
            ProductState::Screening { sensitivity, cols } => {
                let detected = self.outcome.bernoulli(ctx.ti, accepted, sensitivity);
                let mut positive = 0;
                {
                    let infected = ctx.people.bools(cols.infected);
                    for (u, hit) in accepted.iter().zip(&detected) {
                        if infected[u.index()] && *hit {
                            positive += 1;
                        }
                    }
                }
                for u in accepted {
                    ctx.people.bools_mut(cols.tested)[u.index()] = true;
                }
                for u in accepted {
                    ctx.people.floats_mut(cols.ti_tested)[u.index()] = t;
                }
                self.n_delivered += accepted.len();
                self.n_positive += positive;
                self.n_negative += accepted.len() - positive;
            }
        }
    }
}

impl Module for ProductIntervention {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(
        &mut self,
        trial_seed: u64,
        people: &mut People,
        _timeline: &Timeline,
    ) -> EpiResult<()> {
        self.acceptance = RngStream::new(trial_seed, &self.name, "acceptance");
        self.outcome = RngStream::new(trial_seed, &self.name, "outcome");

        let name = &self.name;
        self.state = Some(match self.product {
            Product::Vaccination { efficacy } => ProductState::Vaccination {
                efficacy,
                cols: VaccCols {
                    vaccinated: people.register_column(ColumnSpec::boolean(
                        format!("{name}.vaccinated"),
                        false,
                    ))?,
                    n_doses: people
                        .register_column(ColumnSpec::int(format!("{name}.n_doses"), 0))?,
                    ti_vaccinated: people.register_column(ColumnSpec::float(
                        format!("{name}.ti_vaccinated"),
                        f64::NAN,
                    ))?,
                    rel_sus: self.disease_column(people, "rel_sus")?,
                },
            },
            Product::Screening { sensitivity } => ProductState::Screening {
                sensitivity,
                cols: ScreenCols {
                    tested: people
                        .register_column(ColumnSpec::boolean(format!("{name}.tested"), false))?,
                    ti_tested: people.register_column(ColumnSpec::float(
                        format!("{name}.ti_tested"),
                        f64::NAN,
                    ))?,
                    infected: self.disease_column(people, "infected")?,
                },
            },
        });
        Ok(())
    }

    fn start_step(&mut self, _ctx: &mut StepCtx) {
        self.n_delivered = 0;
        self.n_positive = 0;
        self.n_negative = 0;
    }

    fn step(&mut self, ctx: &mut StepCtx) -> EpiResult<()> {
        let Some(p) = self.schedule.acceptance(ctx.year, ctx.dt) else {
            return Ok(());
        };
        let eligible = self.eligible(ctx.people);
        let accepted = self.acceptance.filter(ctx.ti, &eligible, p);
        self.deliver(ctx, &accepted);
        Ok(())
    }

    fn record(&mut self, ctx: &mut StepCtx) {
        let name = &self.name;
        ctx.results
            .record(&format!("{name}.n_delivered"), ctx.ti, self.n_delivered as f64);
        if matches!(self.product, Product::Screening { .. }) {
            ctx.results
                .record(&format!("{name}.n_positive"), ctx.ti, self.n_positive as f64);
            ctx.results
                .record(&format!("{name}.n_negative"), ctx.ti, self.n_negative as f64);
        }
    }
}
