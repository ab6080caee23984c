//! Unit tests for epi-core.

#[cfg(test)]
mod timeline {
    use crate::time::date_to_year;
    use crate::Timeline;

    #[test]
    fn npts_and_years() {
        let tl = Timeline::new(2000.0, 2010.0, 1.0).unwrap();
        assert_eq!(tl.npts(), 11);
        assert_eq!(tl.year(0), 2000.0);
        assert_eq!(tl.year(10), 2010.0);
    }

    #[test]
    fn fractional_dt() {
        let tl = Timeline::new(2000.0, 2001.0, 0.25).unwrap();
        assert_eq!(tl.npts(), 5);
        assert!((tl.year(2) - 2000.5).abs() < 1e-12);
        assert!((tl.to_steps(3.0) - 12.0).abs() < 1e-12);
    }

    #[test]
    fn invalid_timelines_rejected() {
        assert!(Timeline::new(2000.0, 2010.0, 0.0).is_err());
        assert!(Timeline::new(2000.0, 2010.0, -1.0).is_err());
        assert!(Timeline::new(2010.0, 2000.0, 1.0).is_err());
    }

    #[test]
    fn dates_to_fractional_years() {
        assert_eq!(date_to_year("2004-01-01").unwrap(), 2004.0);
        let mid = date_to_year("2004-07-02").unwrap();
        assert!((mid - 2004.5).abs() < 0.01);
        assert!(date_to_year("not-a-date").is_err());
        assert!(date_to_year("2004-13-01").is_err());
    }
}

#[cfg(test)]
mod streams {
    use crate::{AgentId, RngStream};

    fn uids(n: u32) -> Vec<AgentId> {
        (0..n).map(AgentId).collect()
    }

    #[test]
    fn reproducible_across_instances() {
        let a = RngStream::new(42, "gonorrhea", "dur_inf");
        let b = RngStream::new(42, "gonorrhea", "dur_inf");
        let ids = uids(50);
        assert_eq!(a.poisson(3, &ids, 4.0), b.poisson(3, &ids, 4.0));
    }

    #[test]
    fn distinct_purposes_are_decorrelated() {
        let a = RngStream::new(42, "gonorrhea", "dur_inf");
        let b = RngStream::new(42, "gonorrhea", "dead");
        let ids = uids(100);
        assert_ne!(a.uniform(0, &ids, 0.0, 1.0), b.uniform(0, &ids, 0.0, 1.0));
    }

    #[test]
    fn distinct_steps_give_fresh_draws() {
        let s = RngStream::new(7, "measles", "trans");
        let ids = uids(20);
        assert_ne!(s.uniform(0, &ids, 0.0, 1.0), s.uniform(1, &ids, 0.0, 1.0));
    }

    // Adding unrelated agents must not perturb existing agents' draws.
    #[test]
    fn coherence_under_population_growth() {
        let s = RngStream::new(1, "ncd", "prognosis");
        let small = uids(10);
        let large = uids(1000);
        let draws_small = s.weibull(5, &small, 2.0, 5.0);
        let draws_large = s.weibull(5, &large, 2.0, 5.0);
        assert_eq!(draws_small[..], draws_large[..10]);
    }

    #[test]
    fn bernoulli_filter_subset() {
        let s = RngStream::new(3, "deaths", "bg");
        let ids = uids(200);
        let kept = s.filter(0, &ids, 0.5);
        assert!(kept.iter().all(|u| u.0 < 200));
        assert!(!kept.is_empty() && kept.len() < 200);
        // Filter agrees with the boolean form.
        let mask = s.bernoulli(0, &ids, 0.5);
        let from_mask: Vec<_> = ids
            .iter()
            .zip(&mask)
            .filter(|(_, &m)| m)
            .map(|(&u, _)| u)
            .collect();
        assert_eq!(kept, from_mask);
    }

    #[test]
    fn degenerate_distribution_parameters() {
        let s = RngStream::new(0, "m", "p");
        let ids = uids(4);
        assert_eq!(s.poisson(0, &ids, 0.0), vec![0.0; 4]);
        assert_eq!(s.normal(0, &ids, 5.0, 0.0), vec![5.0; 4]);
    }
}

#[cfg(test)]
mod pars {
    use crate::{interp_table, ParValue, Pars};

    #[test]
    fn typed_getters_and_coercion() {
        let p = Pars::new()
            .with("beta", 0.3)
            .with("n_agents", 1000i64)
            .with("die", true);
        assert_eq!(p.f64("beta").unwrap(), 0.3);
        // Int coerces to float on request.
        assert_eq!(p.f64("n_agents").unwrap(), 1000.0);
        assert!(p.bool_or("die", false).unwrap());
        assert_eq!(p.f64_or("missing", 7.0).unwrap(), 7.0);
        assert!(p.f64("missing").is_err());
        assert!(p.i64("beta").is_err());
    }

    #[test]
    fn override_rejects_unknown_keys() {
        let mut p = Pars::new().with("beta", 0.3);
        p.override_value("beta", ParValue::Float(0.5)).unwrap();
        assert_eq!(p.f64("beta").unwrap(), 0.5);
        assert!(p.override_value("betta", ParValue::Float(0.5)).is_err());
    }

    #[test]
    fn table_interpolation_clamps() {
        let t = vec![(2000.0, 30.0), (2010.0, 20.0)];
        assert_eq!(interp_table(&t, 1990.0), 30.0);
        assert_eq!(interp_table(&t, 2020.0), 20.0);
        assert!((interp_table(&t, 2005.0) - 25.0).abs() < 1e-12);
        assert_eq!(interp_table(&[], 2000.0), 0.0);
    }
}

#[cfg(test)]
mod results {
    use crate::Results;

    #[test]
    fn channels_are_zero_filled() {
        let mut res = Results::new(5);
        res.record("sir.n_infected", 2, 10.0);
        let ch = res.get("sir.n_infected").unwrap();
        assert_eq!(ch, &[0.0, 0.0, 10.0, 0.0, 0.0]);
    }

    #[test]
    fn add_accumulates() {
        let mut res = Results::new(3);
        res.add("births.new", 1, 2.0);
        res.add("births.new", 1, 3.0);
        assert_eq!(res.get("births.new").unwrap()[1], 5.0);
    }

    #[test]
    fn names_preserve_insertion_order() {
        let mut res = Results::new(1);
        res.record("b", 0, 1.0);
        res.record("a", 0, 1.0);
        let names: Vec<_> = res.channel_names().collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    #[should_panic]
    fn wrong_length_channel_rejected() {
        let mut res = Results::new(4);
        res.set_channel("x", vec![1.0; 3]);
    }
}
