//! Unit tests for epi-net.

#[cfg(test)]
mod edge_list {
    use crate::EdgeList;
    use epi_core::AgentId;

    fn ids(raw: &[u32]) -> Vec<AgentId> {
        raw.iter().copied().map(AgentId).collect()
    }

    #[test]
    fn find_contacts_unions_both_endpoints() {
        let mut el = EdgeList::new();
        el.add_pairs(&ids(&[0, 1]), &ids(&[1, 2]), &[1.0, 1.0], &[1.0, 1.0]);
        // Agent 1 appears as p2 in the first edge and p1 in the second.
        assert_eq!(el.find_contacts(&ids(&[1])), ids(&[0, 2]));
    }

    #[test]
    fn find_contacts_deduplicates() {
        let mut el = EdgeList::new();
        el.add_pairs(
            &ids(&[0, 0, 2]),
            &ids(&[1, 2, 1]),
            &[1.0; 3],
            &[1.0; 3],
        );
        assert_eq!(el.find_contacts(&ids(&[0, 2])), ids(&[1, 2]));
    }

    #[test]
    fn find_contacts_empty_query() {
        let mut el = EdgeList::new();
        el.add_pairs(&ids(&[0]), &ids(&[1]), &[1.0], &[1.0]);
        assert!(el.find_contacts(&[]).is_empty());
    }

    #[test]
    #[should_panic]
    fn mismatched_attribute_lengths_rejected() {
        let mut el = EdgeList::new();
        el.add_pairs(&ids(&[0, 1]), &ids(&[1, 2]), &[1.0], &[1.0, 1.0]);
    }

    #[test]
    fn aging_and_pruning() {
        let mut el = EdgeList::new();
        el.add_pairs(&ids(&[0, 1]), &ids(&[1, 2]), &[1.0, 1.0], &[0.5, 2.0]);
        el.age(1.0);
        let alive = vec![true; 3];
        el.prune(&alive);
        assert_eq!(el.len(), 1);
        assert_eq!(el.p1, ids(&[1]));
    }

    #[test]
    fn dead_endpoints_pruned() {
        let mut el = EdgeList::new();
        el.add_pairs(&ids(&[0, 1]), &ids(&[1, 2]), &[1.0, 1.0], &[9.0, 9.0]);
        let alive = vec![true, true, false];
        el.prune(&alive);
        assert_eq!(el.len(), 1);
        assert_eq!((el.p1[0], el.p2[0]), (AgentId(0), AgentId(1)));
    }
}

#[cfg(test)]
mod layers {
    use crate::{Network, RandomNet, SexualNetwork, StaticNet};
    use epi_people::People;
    use rustc_hash::FxHashSet;

    #[test]
    fn random_net_pairs_the_living() {
        let mut ppl = People::new(100);
        let mut net = RandomNet::new("random");
        net.init(7, &ppl).unwrap();
        assert_eq!(net.edges().len(), 50);

        ppl.alive[0] = false;
        net.step(1, 1.0, &ppl);
        // 99 living agents: 49 pairs, one leftover.
        assert_eq!(net.edges().len(), 49);
        assert!(net.edges().p1.iter().all(|u| u.0 != 0));
        assert!(net.edges().p2.iter().all(|u| u.0 != 0));
    }

    #[test]
    fn random_net_reforms_each_step() {
        let ppl = People::new(60);
        let mut net = RandomNet::new("random");
        net.init(1, &ppl).unwrap();
        let before = net.edges().p1.clone();
        net.step(1, 1.0, &ppl);
        assert_ne!(net.edges().p1, before);
    }

    #[test]
    fn static_net_never_reforms() {
        let mut ppl = People::new(40);
        let mut net = StaticNet::new("static");
        net.init(3, &ppl).unwrap();
        let (p1, p2) = (net.edges().p1.clone(), net.edges().p2.clone());
        net.step(5, 1.0, &ppl);
        assert_eq!(net.edges().p1, p1);
        assert_eq!(net.edges().p2, p2);

        ppl.alive[p1[0].index()] = false;
        net.step(6, 1.0, &ppl);
        assert_eq!(net.edges().len(), p1.len() - 1);
    }

    #[test]
    fn sexual_net_pairs_active_opposite_sex() {
        let mut ppl = People::new(50);
        for i in 0..50 {
            ppl.female[i] = i % 2 == 0;
            ppl.age[i] = 30.0;
            ppl.debut[i] = 16.0;
        }
        // Under-age agents never enter partnerships.
        ppl.age[4] = 10.0;

        let mut net = SexualNetwork::new("sexual", 2.0);
        net.init(11, &ppl).unwrap();
        let edges = net.edges();
        assert!(!edges.is_empty());
        for (a, b) in edges.p1.iter().zip(&edges.p2) {
            assert!(!ppl.female[a.index()]);
            assert!(ppl.female[b.index()]);
            assert!(a.0 != 4 && b.0 != 4);
        }
        assert!(edges.dur.iter().all(|&d| d > 0.0));
    }

    #[test]
    fn sexual_net_members_stay_monogamous() {
        let mut ppl = People::new(30);
        for i in 0..30 {
            ppl.female[i] = i < 15;
            ppl.age[i] = 25.0;
            ppl.debut[i] = 16.0;
        }
        let mut net = SexualNetwork::new("sexual", 100.0);
        net.init(2, &ppl).unwrap();
        net.step(1, 1.0, &ppl);
        let mut seen = FxHashSet::default();
        for u in net.edges().p1.iter().chain(&net.edges().p2) {
            assert!(seen.insert(*u), "agent {u} partnered twice");
        }
    }
}

#[cfg(test)]
mod maternal {
    use crate::{MaternalNet, Network};
    use epi_core::AgentId;
    use epi_people::People;

    #[test]
    fn gestation_edges_expire_at_term() {
        let ppl = People::new(4);
        let mut net = MaternalNet::new("maternal");
        net.init(0, &ppl).unwrap();
        net.add_gestations(&[AgentId(0)], &[AgentId(2)], &[0.75]);
        assert!(net.directional());

        net.step(1, 0.5, &ppl);
        assert_eq!(net.edges().len(), 1);
        net.step(2, 0.5, &ppl);
        assert!(net.edges().is_empty());
    }

    #[test]
    fn maternal_edge_dropped_on_mother_death() {
        let mut ppl = People::new(4);
        let mut net = MaternalNet::new("maternal");
        net.add_gestations(&[AgentId(1)], &[AgentId(3)], &[1.0]);
        ppl.alive[1] = false;
        net.step(1, 0.1, &ppl);
        assert!(net.edges().is_empty());
    }
}

#[cfg(test)]
mod mixing {
    use crate::{AgeBand, MixingPool};
    use epi_people::People;

    fn bands() -> Vec<AgeBand> {
        vec![AgeBand::new("young", 0.0, 20.0), AgeBand::new("adult", 20.0, 100.0)]
    }

    #[test]
    fn bad_matrix_shape_is_fatal() {
        assert!(MixingPool::new("pool", bands(), vec![1.0; 3]).is_err());
        assert!(MixingPool::new("pool", bands(), vec![1.0; 4]).is_ok());
    }

    #[test]
    fn no_infectious_no_exposures() {
        let mut ppl = People::new(50);
        for i in 0..50 {
            ppl.age[i] = 30.0;
        }
        let mut pool = MixingPool::new("pool", bands(), vec![5.0; 4]).unwrap();
        pool.init(9);
        let n = ppl.len();
        let exposed = pool.new_exposures(
            0,
            &ppl,
            1.0,
            &vec![false; n],
            &vec![1.0; n],
            &vec![true; n],
            &vec![1.0; n],
        );
        assert!(exposed.is_empty());
    }

    #[test]
    fn saturated_pressure_exposes_all_susceptibles() {
        let mut ppl = People::new(20);
        for i in 0..20 {
            ppl.age[i] = 30.0;
        }
        let n = ppl.len();
        let mut infectious = vec![true; n];
        let mut susceptible = vec![false; n];
        // Half infectious, half susceptible.
        for i in 10..20 {
            infectious[i] = false;
            susceptible[i] = true;
        }
        let mut pool = MixingPool::new("pool", bands(), vec![1e6; 4]).unwrap();
        pool.init(4);
        let exposed = pool.new_exposures(
            0,
            &ppl,
            1.0,
            &infectious,
            &vec![1.0; n],
            &susceptible,
            &vec![1.0; n],
        );
        assert_eq!(exposed.len(), 10);
        assert!(exposed.iter().all(|u| u.0 >= 10));
    }

    #[test]
    fn zero_susceptibility_blocks_exposure() {
        let mut ppl = People::new(10);
        for i in 0..10 {
            ppl.age[i] = 30.0;
        }
        let n = ppl.len();
        let mut infectious = vec![false; n];
        infectious[0] = true;
        let mut susceptible = vec![true; n];
        susceptible[0] = false;
        let mut pool = MixingPool::new("pool", bands(), vec![1e6; 4]).unwrap();
        pool.init(4);
        let exposed = pool.new_exposures(
            0,
            &ppl,
            1.0,
            &infectious,
            &vec![1.0; n],
            &susceptible,
            &vec![0.0; n],
        );
        assert!(exposed.is_empty());
    }
}
