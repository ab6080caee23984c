//! Unit tests for epi-people.

#[cfg(test)]
mod growth {
    use crate::People;

    #[test]
    fn initial_population() {
        let ppl = People::new(100);
        assert_eq!(ppl.len(), 100);
        assert_eq!(ppl.n_alive(), 100);
        assert_eq!(ppl.uid, (0..100).collect::<Vec<u32>>());
        assert!(ppl.ti_dead.iter().all(|v| v.is_nan()));
        ppl.validate();
    }

    #[test]
    fn grow_returns_contiguous_new_uids() {
        let mut ppl = People::new(10);
        let new = ppl.grow(5);
        assert_eq!(new, 10..15);
        assert_eq!(ppl.len(), 15);
        assert_eq!(ppl.uid, (0..15).collect::<Vec<u32>>());
        ppl.validate();
    }

    #[test]
    fn growth_preserves_existing_values() {
        let mut ppl = People::new(3);
        ppl.age.copy_from_slice(&[10.0, 20.0, 30.0]);
        ppl.female[1] = true;
        ppl.grow(1000);
        assert_eq!(&ppl.age[..3], &[10.0, 20.0, 30.0]);
        assert!(ppl.female[1] && !ppl.female[0]);
        assert!(ppl.age[3..].iter().all(|&a| a == 0.0));
    }

    #[test]
    fn repeated_small_growths_keep_invariant() {
        let mut ppl = People::new(4);
        let flag = ppl
            .register_column(crate::ColumnSpec::boolean("flag", false))
            .unwrap();
        for _ in 0..50 {
            ppl.grow(1);
        }
        assert_eq!(ppl.len(), 54);
        assert_eq!(ppl.bools(flag).len(), 54);
        ppl.validate();
    }
}

#[cfg(test)]
mod columns {
    use crate::{ColumnSpec, People};

    #[test]
    fn register_and_access_by_kind() {
        let mut ppl = People::new(8);
        let inf = ppl
            .register_column(ColumnSpec::boolean("infected", false))
            .unwrap();
        let ti = ppl
            .register_column(ColumnSpec::float("ti_recovered", f64::NAN))
            .unwrap();
        let doses = ppl.register_column(ColumnSpec::int("doses", 0)).unwrap();

        assert_eq!(ppl.bools(inf).len(), 8);
        assert!(ppl.floats(ti).iter().all(|v| v.is_nan()));
        assert_eq!(ppl.ints(doses), &[0i64; 8]);
        assert_eq!(ppl.column_id("infected"), Some(inf));
        assert_eq!(ppl.column_id("missing"), None);
    }

    #[test]
    fn duplicate_name_is_fatal() {
        let mut ppl = People::new(2);
        ppl.register_column(ColumnSpec::boolean("x", false)).unwrap();
        assert!(ppl.register_column(ColumnSpec::float("x", 0.0)).is_err());
    }

    #[test]
    fn mid_run_registration_backfills_defaults() {
        let mut ppl = People::new(5);
        ppl.grow(5);
        let c = ppl.register_column(ColumnSpec::float("late", 7.5)).unwrap();
        assert_eq!(ppl.floats(c), &[7.5; 10]);
        // New agents after registration also get the default.
        ppl.grow(2);
        assert_eq!(ppl.floats(c).len(), 12);
        assert_eq!(ppl.floats(c)[10], 7.5);
    }

    #[test]
    fn multi_row_columns_are_agent_major() {
        let mut ppl = People::new(3);
        let c = ppl
            .register_column(ColumnSpec::boolean("by_genotype", false).with_rows(4))
            .unwrap();
        assert_eq!(ppl.bools(c).len(), 12);
        assert_eq!(ppl.column_rows(c), 4);
        // Agent 1, row 2.
        ppl.bools_mut(c)[1 * 4 + 2] = true;
        ppl.grow(1);
        assert_eq!(ppl.bools(c).len(), 16);
        assert!(ppl.bools(c)[6]);
    }

    #[test]
    #[should_panic]
    fn kind_mismatch_panics() {
        let mut ppl = People::new(1);
        let c = ppl.register_column(ColumnSpec::boolean("b", false)).unwrap();
        let _ = ppl.floats(c);
    }

    #[test]
    #[should_panic(expected = "not integer")]
    fn kind_mismatch_panics_on_mutable_access() {
        let mut ppl = People::new(1);
        let c = ppl.register_column(ColumnSpec::float("f", 0.0)).unwrap();
        let _ = ppl.ints_mut(c);
    }
}

#[cfg(test)]
mod selection {
    use crate::{ColumnSpec, People};
    use epi_core::AgentId;

    #[test]
    fn true_false_where_partition() {
        let mut ppl = People::new(6);
        let c = ppl.register_column(ColumnSpec::boolean("s", false)).unwrap();
        let m = ppl.bools_mut(c);
        m[1] = true;
        m[4] = true;
        assert_eq!(ppl.true_where(c), vec![AgentId(1), AgentId(4)]);
        assert_eq!(
            ppl.false_where(c),
            vec![AgentId(0), AgentId(2), AgentId(3), AgentId(5)]
        );
        assert_eq!(ppl.count_true(c), 2);
    }

    #[test]
    fn defined_skips_nan() {
        let mut ppl = People::new(4);
        let c = ppl
            .register_column(ColumnSpec::float("ti_x", f64::NAN))
            .unwrap();
        ppl.floats_mut(c)[2] = 12.0;
        assert_eq!(ppl.defined(c), vec![AgentId(2)]);
    }

    #[test]
    fn scaled_count_weights_agents() {
        let mut ppl = People::new(3);
        ppl.scale.copy_from_slice(&[2.0, 2.0, 5.0]);
        let all: Vec<AgentId> = ppl.all_uids().collect();
        assert_eq!(ppl.scaled_count(&all), 9.0);
    }

    #[test]
    fn active_requires_alive_and_past_debut() {
        let mut ppl = People::new(4);
        ppl.age.copy_from_slice(&[10.0, 20.0, 20.0, 20.0]);
        ppl.debut.copy_from_slice(&[15.0, 15.0, 15.0, f64::NAN]);
        ppl.alive[2] = false;
        // NaN debut never compares true, so agent 3 is inactive.
        assert_eq!(ppl.active_uids(), vec![AgentId(1)]);
    }
}

#[cfg(test)]
mod deaths {
    use crate::People;
    use epi_core::AgentId;

    #[test]
    fn requested_deaths_apply_once() {
        let mut ppl = People::new(5);
        ppl.request_death(&[AgentId(1), AgentId(3)]);
        // Duplicate request for an agent already pending.
        ppl.request_death(&[AgentId(3)]);
        let died = ppl.apply_deaths();
        assert_eq!(died, vec![AgentId(1), AgentId(3)]);
        assert_eq!(ppl.n_alive(), 3);
        // Nothing left pending.
        assert!(ppl.apply_deaths().is_empty());
    }

    #[test]
    fn scheduled_deaths_fire_when_due() {
        let mut ppl = People::new(3);
        ppl.ti_dead[0] = 2.0;
        ppl.ti_dead[2] = 5.0;
        ppl.step_demographics(1.0, 1);
        assert!(ppl.apply_deaths().is_empty());
        ppl.step_demographics(1.0, 2);
        assert_eq!(ppl.apply_deaths(), vec![AgentId(0)]);
        // The dead stop aging; the living keep.
        let age_dead = ppl.age[0];
        ppl.step_demographics(1.0, 3);
        assert_eq!(ppl.age[0], age_dead);
        assert_eq!(ppl.age[1], 3.0);
    }
}
