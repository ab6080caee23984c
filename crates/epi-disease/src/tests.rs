//! Unit tests for epi-disease.

#[cfg(test)]
mod harness {
    use crate::module::{Module, StepCtx};
    use epi_core::{Results, Timeline};
    use epi_net::Network;
    use epi_people::People;

    /// Minimal stand-in for the simulation driver: fixed hook order per
    /// step, death fan-out between step and record.
    pub fn drive(
        people: &mut People,
        networks: &mut Vec<Box<dyn Network>>,
        modules: &mut Vec<Box<dyn Module>>,
        timeline: &Timeline,
        n_steps: usize,
        results: &mut Results,
    ) {
        for m in modules.iter_mut() {
            m.init(42, people, timeline).unwrap();
        }
        for ti in 0..=n_steps {
            if ti > 0 {
                people.step_demographics(timeline.dt, ti);
                let died = people.apply_deaths();
                for m in modules.iter_mut() {
                    m.on_deaths(people, &died);
                }
                for net in networks.iter_mut() {
                    net.step(ti, timeline.dt, people);
                }
                let mut ctx = StepCtx {
                    ti,
                    dt: timeline.dt,
                    year: timeline.year(ti),
                    people: &mut *people,
                    networks: networks.as_mut_slice(),
                    results: &mut *results,
                };
                for m in modules.iter_mut() {
                    m.start_step(&mut ctx);
                }
                for m in modules.iter_mut() {
                    m.step(&mut ctx).unwrap();
                }
                let died = ctx.people.apply_deaths();
                for m in modules.iter_mut() {
                    m.on_deaths(people, &died);
                }
            }
            let mut ctx = StepCtx {
                ti,
                dt: timeline.dt,
                year: timeline.year(ti),
                people: &mut *people,
                networks: networks.as_mut_slice(),
                results: &mut *results,
            };
            for m in modules.iter_mut() {
                m.record(&mut ctx);
            }
        }
    }

    pub fn timeline(n_steps: usize) -> Timeline {
        Timeline::new(2000.0, 2000.0 + n_steps as f64, 1.0).unwrap()
    }
}

#[cfg(test)]
mod events {
    use crate::infection::{consume_events, due_events};
    use epi_core::AgentId;

    #[test]
    fn nan_fields_are_never_due() {
        let flags = vec![true; 3];
        let tis = vec![f64::NAN, 2.0, f64::NAN];
        assert_eq!(due_events(&flags, &tis, 5.0), vec![AgentId(1)]);
    }

    #[test]
    fn consumed_events_cannot_refire() {
        let flags = vec![true; 2];
        let mut tis = vec![1.0, 3.0];
        let due = due_events(&flags, &tis, 1.0);
        assert_eq!(due, vec![AgentId(0)]);
        consume_events(&mut tis, &due);
        assert!(due_events(&flags, &tis, 2.0).is_empty());
    }

    #[test]
    fn flag_clear_blocks_due() {
        let flags = vec![false];
        let tis = vec![0.0];
        assert!(due_events(&flags, &tis, 10.0).is_empty());
    }
}

#[cfg(test)]
mod gonorrhea {
    use super::harness::{drive, timeline};
    use crate::module::Module;
    use crate::Gonorrhea;
    use epi_core::{Pars, Results};
    use epi_net::{Network, StaticNet};
    use epi_people::People;

    #[test]
    fn seeding_matches_init_prev() {
        let mut ppl = People::new(1000);
        let pars = Pars::new().with("init_prev", 0.1).with("beta", 0.0);
        let mut gon = Gonorrhea::new("gon", &pars).unwrap();
        gon.init(42, &mut ppl, &timeline(1)).unwrap();
        let inf = ppl.column_id("gon.infected").unwrap();
        let n = ppl.count_true(inf);
        assert!((60..=140).contains(&n), "seeded {n} infections");
        // Seeded agents leave the susceptible pool.
        let sus = ppl.column_id("gon.susceptible").unwrap();
        assert_eq!(ppl.count_true(sus), 1000 - n);
    }

    #[test]
    fn epidemic_counts_stay_bounded() {
        let mut ppl = People::new(1000);
        let mut nets: Vec<Box<dyn Network>> = vec![Box::new(StaticNet::new("static"))];
        nets[0].init(42, &ppl).unwrap();
        let pars = Pars::new()
            .with("init_prev", 0.1)
            .with("beta", 0.3)
            .with("dur_inf", 2.0);
        let mut modules: Vec<Box<dyn Module>> =
            vec![Box::new(Gonorrhea::new("gon", &pars).unwrap())];
        let tl = timeline(50);
        let mut res = Results::new(tl.npts());
        drive(&mut ppl, &mut nets, &mut modules, &tl, 50, &mut res);

        let n_inf = res.get("gon.n_infected").unwrap();
        assert!((60.0..=140.0).contains(&n_inf[0]));
        for ti in 0..=50 {
            assert!(n_inf[ti] >= 0.0);
            assert!(n_inf[ti] <= 1000.0);
        }
        // Store rows never shrink.
        assert_eq!(ppl.len(), 1000);
    }

    #[test]
    fn infections_survive_their_acquisition_step() {
        let mut ppl = People::new(400);
        let mut nets: Vec<Box<dyn Network>> = vec![Box::new(StaticNet::new("static"))];
        nets[0].init(7, &ppl).unwrap();
        // Mean duration far below one step: most raw draws are zero, but the
        // one-step floor keeps every new case visible at record time.
        let pars = Pars::new()
            .with("init_prev", 0.1)
            .with("beta", 5.0)
            .with("dur_inf", 0.01)
            .with("p_death", 0.0);
        let mut modules: Vec<Box<dyn Module>> =
            vec![Box::new(Gonorrhea::new("gon", &pars).unwrap())];
        let tl = timeline(10);
        let mut res = Results::new(tl.npts());
        drive(&mut ppl, &mut nets, &mut modules, &tl, 10, &mut res);

        let n_inf = res.get("gon.n_infected").unwrap();
        let new_inf = res.get("gon.new_infections").unwrap();
        assert!(new_inf[1..].iter().sum::<f64>() > 0.0);
        for ti in 1..=10 {
            assert!(
                n_inf[ti] >= new_inf[ti],
                "step {ti}: {} new cases but only {} infected at record",
                new_inf[ti],
                n_inf[ti]
            );
        }
    }

    #[test]
    fn recovery_returns_to_susceptible_once() {
        let mut ppl = People::new(50);
        // Everyone infected, no transmission, short duration.
        let pars = Pars::new()
            .with("init_prev", 1.0)
            .with("beta", 0.0)
            .with("dur_inf", 1.0)
            .with("p_death", 0.0);
        let mut nets: Vec<Box<dyn Network>> = Vec::new();
        let mut modules: Vec<Box<dyn Module>> =
            vec![Box::new(Gonorrhea::new("gon", &pars).unwrap())];
        let tl = timeline(20);
        let mut res = Results::new(tl.npts());
        drive(&mut ppl, &mut nets, &mut modules, &tl, 20, &mut res);

        // With beta 0 every infection eventually resolves, exactly once.
        let sus = ppl.column_id("gon.susceptible").unwrap();
        let inf = ppl.column_id("gon.infected").unwrap();
        assert_eq!(ppl.count_true(inf), 0);
        assert_eq!(ppl.count_true(sus), 50);
        let ti_rec = ppl.column_id("gon.ti_recovered").unwrap();
        assert!(ppl.floats(ti_rec).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn death_dominance() {
        let mut ppl = People::new(100);
        let pars = Pars::new()
            .with("init_prev", 1.0)
            .with("beta", 0.0)
            .with("dur_inf", 3.0)
            .with("p_death", 1.0);
        let mut nets: Vec<Box<dyn Network>> = Vec::new();
        let mut modules: Vec<Box<dyn Module>> =
            vec![Box::new(Gonorrhea::new("gon", &pars).unwrap())];
        let tl = timeline(40);
        let mut res = Results::new(tl.npts());
        drive(&mut ppl, &mut nets, &mut modules, &tl, 40, &mut res);

        // Every case was fatal; the dead read false on every disease flag.
        assert_eq!(ppl.n_alive(), 0);
        let inf = ppl.column_id("gon.infected").unwrap();
        let sus = ppl.column_id("gon.susceptible").unwrap();
        assert_eq!(ppl.count_true(inf), 0);
        assert_eq!(ppl.count_true(sus), 0);
    }
}

#[cfg(test)]
mod measles {
    use super::harness::{drive, timeline};
    use crate::module::Module;
    use crate::Measles;
    use epi_core::{Pars, Results};
    use epi_net::Network;
    use epi_people::People;

    #[test]
    fn seir_progression_resolves() {
        let mut ppl = People::new(200);
        let pars = Pars::new()
            .with("init_prev", 1.0)
            .with("beta", 0.0)
            .with("p_death", 0.1);
        let mut nets: Vec<Box<dyn Network>> = Vec::new();
        let mut modules: Vec<Box<dyn Module>> =
            vec![Box::new(Measles::new("measles", &pars).unwrap())];
        let tl = timeline(10);
        let mut res = Results::new(tl.npts());
        drive(&mut ppl, &mut nets, &mut modules, &tl, 10, &mut res);

        // All exposures have run their course: E and I empty, everyone
        // either recovered (immune, not susceptible) or dead.
        let exp = ppl.column_id("measles.exposed").unwrap();
        let inf = ppl.column_id("measles.infected").unwrap();
        let rec = ppl.column_id("measles.recovered").unwrap();
        assert_eq!(ppl.count_true(exp), 0);
        assert_eq!(ppl.count_true(inf), 0);
        let n_dead = 200 - ppl.n_alive();
        assert_eq!(ppl.count_true(rec) + n_dead, 200);
        assert!(n_dead > 0, "p_death 0.1 over 200 cases should kill some");

        let sus = ppl.column_id("measles.susceptible").unwrap();
        assert_eq!(ppl.count_true(sus), 0);
    }

    #[test]
    fn exposed_stage_precedes_infection() {
        let mut ppl = People::new(100);
        let pars = Pars::new().with("init_prev", 1.0).with("beta", 0.0);
        let mut m = Measles::new("measles", &pars).unwrap();
        m.init(42, &mut ppl, &timeline(5)).unwrap();
        let exp = ppl.column_id("measles.exposed").unwrap();
        let inf = ppl.column_id("measles.infected").unwrap();
        assert_eq!(ppl.count_true(exp), 100);
        assert_eq!(ppl.count_true(inf), 0);
    }
}

#[cfg(test)]
mod ncd {
    use super::harness::{drive, timeline};
    use crate::module::Module;
    use crate::Ncd;
    use epi_core::{Pars, Results};
    use epi_net::Network;
    use epi_people::People;

    #[test]
    fn risk_progression_and_mortality() {
        let mut ppl = People::new(500);
        let pars = Pars::new()
            .with("initial_risk", 0.5)
            .with("dur_risk", 2.0)
            .with("prognosis_scale", 3.0);
        let mut nets: Vec<Box<dyn Network>> = Vec::new();
        let mut modules: Vec<Box<dyn Module>> = vec![Box::new(Ncd::new("ncd", &pars).unwrap())];
        let tl = timeline(60);
        let mut res = Results::new(tl.npts());
        drive(&mut ppl, &mut nets, &mut modules, &tl, 60, &mut res);

        let at_risk0 = res.get("ncd.n_at_risk").unwrap()[0];
        assert!((180.0..=320.0).contains(&at_risk0));
        // Long after every delay has elapsed, the at-risk pool has drained
        // through affected into death.
        let affected = res.get("ncd.n_affected").unwrap();
        assert!(affected.iter().any(|&v| v > 0.0));
        assert!(ppl.n_alive() < 500);
        // Never-at-risk agents are untouched.
        assert_eq!(ppl.n_alive() as f64, 500.0 - at_risk0);
    }
}

#[cfg(test)]
mod demographics {
    use super::harness::{drive, timeline};
    use crate::module::Module;
    use crate::{BackgroundDeaths, Births, Pregnancy};
    use epi_core::{Pars, Results};
    use epi_net::{MaternalNet, Network};
    use epi_people::People;

    #[test]
    fn births_grow_the_store() {
        let mut ppl = People::new(100);
        let pars = Pars::new().with("cbr", vec![(2000.0, 50.0), (2010.0, 50.0)]);
        let mut nets: Vec<Box<dyn Network>> = Vec::new();
        let mut modules: Vec<Box<dyn Module>> =
            vec![Box::new(Births::new("births", &pars).unwrap())];
        let tl = timeline(1);
        let mut res = Results::new(tl.npts());
        drive(&mut ppl, &mut nets, &mut modules, &tl, 1, &mut res);

        // floor(100 * 0.05 * 1) = 5 newborns in the single step.
        assert_eq!(ppl.len(), 105);
        assert_eq!(res.get("births.new").unwrap()[1], 5.0);
        assert!(ppl.age[100..].iter().all(|&a| a >= 0.0));
    }

    #[test]
    fn background_mortality_empties_population() {
        let mut ppl = People::new(50);
        let pars = Pars::new().with("death_rate", 1.0);
        let mut nets: Vec<Box<dyn Network>> = Vec::new();
        let mut modules: Vec<Box<dyn Module>> =
            vec![Box::new(BackgroundDeaths::new("deaths", &pars).unwrap())];
        let tl = timeline(2);
        let mut res = Results::new(tl.npts());
        drive(&mut ppl, &mut nets, &mut modules, &tl, 2, &mut res);

        assert_eq!(ppl.n_alive(), 0);
        assert_eq!(res.get("deaths.cumulative").unwrap()[2], 50.0);
        // Rows persist after logical death.
        assert_eq!(ppl.len(), 50);
    }

    #[test]
    fn pregnancy_cycle_links_mothers_and_children() {
        let mut ppl = People::new(20);
        for i in 0..20 {
            ppl.female[i] = i < 10;
            ppl.age[i] = 25.0;
        }
        let pars = Pars::new()
            .with("fertility_rate", 1.0)
            .with("dur_pregnancy", 0.75)
            .with("dur_postpartum", 0.5);
        let mut nets: Vec<Box<dyn Network>> = vec![Box::new(MaternalNet::new("maternal"))];
        let mut modules: Vec<Box<dyn Module>> =
            vec![Box::new(Pregnancy::new("preg", &pars).unwrap())];
        let tl = timeline(4);
        let mut res = Results::new(tl.npts());
        drive(&mut ppl, &mut nets, &mut modules, &tl, 4, &mut res);

        // All ten eligible women conceive on the first step.
        assert_eq!(res.get("preg.pregnancies").unwrap()[1], 10.0);
        assert!(ppl.len() >= 30);
        // Unborn agents enter with negative age and age forward.
        assert!(ppl.age[20..30].iter().all(|&a| a > -0.75));
        // Gestation completes within a step (0.75 < 1), so deliveries land
        // on the following step.
        assert_eq!(res.get("preg.births").unwrap()[2], 10.0);
        let pregnant = ppl.column_id("preg.pregnant").unwrap();
        assert_eq!(ppl.count_true(pregnant), 0);
    }

    #[test]
    fn maternal_edges_created_at_conception() {
        let mut ppl = People::new(4);
        ppl.female.copy_from_slice(&[true, true, false, false]);
        for i in 0..4 {
            ppl.age[i] = 30.0;
        }
        let pars = Pars::new().with("fertility_rate", 1.0);
        let mut nets: Vec<Box<dyn Network>> = vec![Box::new(MaternalNet::new("maternal"))];
        let mut modules: Vec<Box<dyn Module>> =
            vec![Box::new(Pregnancy::new("preg", &pars).unwrap())];
        let tl = timeline(1);
        let mut res = Results::new(tl.npts());
        drive(&mut ppl, &mut nets, &mut modules, &tl, 1, &mut res);

        let edges = nets[0].edges();
        assert_eq!(edges.len(), 2);
        // Mothers in p1, children in p2.
        assert!(edges.p1.iter().all(|u| u.0 < 2));
        assert!(edges.p2.iter().all(|u| u.0 >= 4));
    }
}

#[cfg(test)]
mod interventions {
    use super::harness::{drive, timeline};
    use crate::module::Module;
    use crate::{
        DeliverySchedule, Eligibility, Gonorrhea, Product, ProductIntervention,
    };
    use epi_core::{Pars, Results};
    use epi_net::Network;
    use epi_people::People;

    #[test]
    fn routine_schedule_compounds_annual_probability() {
        let s = DeliverySchedule::Routine {
            start_year: 2005.0,
            end_year: 2010.0,
            annual_prob: 0.75,
        };
        assert_eq!(s.acceptance(2004.0, 1.0), None);
        assert_eq!(s.acceptance(2010.0, 1.0), None);
        let p = s.acceptance(2005.0, 0.5).unwrap();
        assert!((p - (1.0 - 0.25f64.powf(0.5))).abs() < 1e-12);
    }

    #[test]
    fn campaign_schedule_fires_on_event_years_only() {
        let s = DeliverySchedule::Campaign {
            years: vec![2003.0, 2007.0],
            prob: 0.9,
        };
        assert_eq!(s.acceptance(2003.0, 1.0), Some(0.9));
        assert_eq!(s.acceptance(2007.0, 1.0), Some(0.9));
        assert_eq!(s.acceptance(2005.0, 1.0), None);
    }

    #[test]
    fn vaccination_reduces_susceptibility_once() {
        let mut ppl = People::new(100);
        let gon_pars = Pars::new().with("init_prev", 0.0).with("beta", 0.0);
        let mut nets: Vec<Box<dyn Network>> = Vec::new();
        let mut modules: Vec<Box<dyn Module>> = vec![
            Box::new(Gonorrhea::new("gon", &gon_pars).unwrap()),
            Box::new(ProductIntervention::new(
                "vx",
                "gon",
                DeliverySchedule::Routine {
                    start_year: 2000.0,
                    end_year: 2100.0,
                    annual_prob: 1.0,
                },
                Product::Vaccination { efficacy: 0.6 },
                Eligibility::default(),
            )),
        ];
        let tl = timeline(3);
        let mut res = Results::new(tl.npts());
        drive(&mut ppl, &mut nets, &mut modules, &tl, 3, &mut res);

        let vacc = ppl.column_id("vx.vaccinated").unwrap();
        assert_eq!(ppl.count_true(vacc), 100);
        let rel_sus = ppl.column_id("gon.rel_sus").unwrap();
        // One dose only, so the multiplier applied exactly once.
        assert!(ppl
            .floats(rel_sus)
            .iter()
            .all(|&v| (v - 0.4).abs() < 1e-12));
        let doses = ppl.column_id("vx.n_doses").unwrap();
        assert!(ppl.ints(doses).iter().all(|&d| d == 1));
        assert_eq!(res.get("vx.n_delivered").unwrap()[1], 100.0);
        assert_eq!(res.get("vx.n_delivered").unwrap()[2], 0.0);
    }

    #[test]
    fn screening_counts_true_positives() {
        let mut ppl = People::new(400);
        let gon_pars = Pars::new()
            .with("init_prev", 0.5)
            .with("beta", 0.0)
            .with("p_death", 0.0);
        let mut nets: Vec<Box<dyn Network>> = Vec::new();
        let mut modules: Vec<Box<dyn Module>> = vec![
            Box::new(Gonorrhea::new("gon", &gon_pars).unwrap()),
            Box::new(ProductIntervention::new(
                "screen",
                "gon",
                DeliverySchedule::Campaign {
                    years: vec![2001.0],
                    prob: 1.0,
                },
                Product::Screening { sensitivity: 1.0 },
                Eligibility::default(),
            )),
        ];
        let tl = timeline(1);
        let mut res = Results::new(tl.npts());
        drive(&mut ppl, &mut nets, &mut modules, &tl, 1, &mut res);

        let n_inf = res.get("gon.n_infected").unwrap()[1];
        assert_eq!(res.get("screen.n_positive").unwrap()[1], n_inf);
        assert_eq!(
            res.get("screen.n_positive").unwrap()[1] + res.get("screen.n_negative").unwrap()[1],
            400.0
        );
    }

    #[test]
    fn intervention_requires_registered_disease() {
        let mut ppl = People::new(10);
        let mut iv = ProductIntervention::new(
            "vx",
            "absent",
            DeliverySchedule::Campaign {
                years: vec![2000.0],
                prob: 1.0,
            },
            Product::Vaccination { efficacy: 0.5 },
            Eligibility::default(),
        );
        let tl = timeline(1);
        assert!(iv.init(42, &mut ppl, &tl).is_err());
    }
}

#[cfg(test)]
mod registry {
    use crate::ModuleRegistry;
    use epi_core::Pars;

    #[test]
    fn standard_registry_builds_known_types() {
        let reg = ModuleRegistry::standard();
        for ty in ["gonorrhea", "measles", "ncd", "pregnancy", "births", "background_deaths"] {
            assert!(reg.contains(ty));
            let m = reg.build(ty, "key", &Pars::new()).unwrap();
            assert_eq!(m.name(), "key");
        }
    }

    #[test]
    fn unknown_type_is_fatal() {
        let reg = ModuleRegistry::standard();
        assert!(reg.build("smallpox", "sp", &Pars::new()).is_err());
    }
}
