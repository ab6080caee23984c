//! Concrete network layers and the [`Network`] trait binding them.
//!
//! All layers share the same per-step shape: age existing edges, prune what
//! lapsed or died, then add replacement edges according to the layer's own
//! formation policy.  Pairing shuffles use the step-keyed generator from
//! [`RngStream::step_rng`]; edge durations use per-agent draws so they stay
//! coherent under population growth.

use epi_core::{AgentId, EpiResult, RngStream};
use epi_people::People;
use rand::seq::SliceRandom;
use rustc_hash::FxHashSet;

use crate::edges::EdgeList;

/// A contact layer over the agent population.
///
/// Layers are owned by the simulation and stepped after demographics, before
/// disease updates, so transmission always sees this step's edge set.
pub trait Network {
    fn name(&self) -> &str;

    /// Whether edges transmit only from `p1` to `p2` (vertical layers).
    fn directional(&self) -> bool {
        false
    }

    /// Called once before the first step; derives streams and seeds initial
    /// edges where the layer has an initial formation policy.
    fn init(&mut self, trial_seed: u64, people: &People) -> EpiResult<()>;

    /// Age, prune, and re-form edges for step `ti`.
    fn step(&mut self, ti: usize, dt: f64, people: &People);

    fn edges(&self) -> &EdgeList;

    fn edges_mut(&mut self) -> &mut EdgeList;
}

/// Shuffle `uids` and pair them off consecutively; an odd leftover stays
/// unpartnered this step.
fn random_pairs(
    mut uids: Vec<AgentId>,
    stream: &RngStream,
    ti: usize,
) -> (Vec<AgentId>, Vec<AgentId>) {
    let mut rng = stream.step_rng(ti);
    uids.shuffle(&mut rng);
    let half = uids.len() / 2;
    let p2 = uids.split_off(uids.len() - half);
    uids.truncate(half);
    (uids, p2)
}

// ── RandomNet ─────────────────────────────────────────────────────────────────

/// Uniform random re-pairing among all living agents, rebuilt every step.
///
/// Every edge lasts exactly one step with unit weight; this is the default
/// formation policy for diseases with no partnership structure.
pub struct RandomNet {
    name: String,
    edges: EdgeList,
    pairing: RngStream,
}

impl RandomNet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            edges: EdgeList::new(),
            pairing: RngStream::new(0, "net", "pairing"),
        }
    }

    fn reform(&mut self, ti: usize, dt: f64, people: &People) {
        self.edges.clear();
        let (p1, p2) = random_pairs(people.alive_uids(), &self.pairing, ti);
        let n = p1.len();
        self.edges.add_pairs(&p1, &p2, &vec![1.0; n], &vec![dt; n]);
        log::trace!("{}: re-paired {n} edges", self.name);
    }
}

impl Network for RandomNet {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, trial_seed: u64, people: &People) -> EpiResult<()> {
        self.pairing = RngStream::new(trial_seed, &self.name, "pairing");
        self.reform(0, 1.0, people);
        Ok(())
    }

    fn step(&mut self, ti: usize, dt: f64, people: &People) {
        self.reform(ti, dt, people);
    }

    fn edges(&self) -> &EdgeList {
        &self.edges
    }

    fn edges_mut(&mut self) -> &mut EdgeList {
        &mut self.edges
    }
}

// ── StaticNet ─────────────────────────────────────────────────────────────────

/// A fixed random pairing built once at init and never re-formed.
/// Dead endpoints are still pruned each step.
pub struct StaticNet {
    name: String,
    edges: EdgeList,
    pairing: RngStream,
}

impl StaticNet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            edges: EdgeList::new(),
            pairing: RngStream::new(0, "net", "pairing"),
        }
    }
}

impl Network for StaticNet {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, trial_seed: u64, people: &People) -> EpiResult<()> {
        self.pairing = RngStream::new(trial_seed, &self.name, "pairing");
        let (p1, p2) = random_pairs(people.alive_uids(), &self.pairing, 0);
        let n = p1.len();
        self.edges
            .add_pairs(&p1, &p2, &vec![1.0; n], &vec![f64::INFINITY; n]);
        Ok(())
    }

    fn step(&mut self, _ti: usize, _dt: f64, people: &People) {
        self.edges.prune_dead(&people.alive);
    }

    fn edges(&self) -> &EdgeList {
        &self.edges
    }

    fn edges_mut(&mut self) -> &mut EdgeList {
        &mut self.edges
    }
}

// ── SexualNetwork ─────────────────────────────────────────────────────────────

/// Dynamic heterosexual partnership layer.
///
/// Each step, unpartnered sexually-active males are paired uniformly at
/// random with unpartnered active females; partnership durations are drawn
/// per-pair from Exponential(mean_dur).
pub struct SexualNetwork {
    name: String,
    /// Mean partnership duration in years.
    pub mean_dur: f64,
    edges: EdgeList,
    pairing: RngStream,
    duration: RngStream,
}

impl SexualNetwork {
    pub fn new(name: impl Into<String>, mean_dur: f64) -> Self {
        Self {
            name: name.into(),
            mean_dur,
            edges: EdgeList::new(),
            pairing: RngStream::new(0, "net", "pairing"),
            duration: RngStream::new(0, "net", "duration"),
        }
    }

    fn form_partnerships(&mut self, ti: usize, people: &People) {
        let partnered = self.edges.members();
        let mut males = Vec::new();
        let mut females = Vec::new();
        for u in people.active_uids() {
            if partnered.contains(&u) {
                continue;
            }
            if people.female[u.index()] {
                females.push(u);
            } else {
                males.push(u);
            }
        }
        let mut rng = self.pairing.step_rng(ti);
        males.shuffle(&mut rng);
        females.shuffle(&mut rng);
        let n = males.len().min(females.len());
        males.truncate(n);
        females.truncate(n);
        // Duration keyed by the male partner's uid keeps draws coherent.
        let dur = self.duration.expon(ti, &males, self.mean_dur);
        self.edges.add_pairs(&males, &females, &vec![1.0; n], &dur);
        if n > 0 {
            log::debug!("{}: formed {n} new partnerships", self.name);
        }
    }
}

impl Network for SexualNetwork {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, trial_seed: u64, people: &People) -> EpiResult<()> {
        self.pairing = RngStream::new(trial_seed, &self.name, "pairing");
        self.duration = RngStream::new(trial_seed, &self.name, "duration");
        self.form_partnerships(0, people);
        Ok(())
    }

    fn step(&mut self, ti: usize, dt: f64, people: &People) {
        self.edges.age(dt);
        self.edges.prune(&people.alive);
        self.form_partnerships(ti, people);
    }

    fn edges(&self) -> &EdgeList {
        &self.edges
    }

    fn edges_mut(&mut self) -> &mut EdgeList {
        &mut self.edges
    }
}

// ── MaternalNet ───────────────────────────────────────────────────────────────

/// Vertical mother-to-child layer.
///
/// Has no formation policy of its own: the pregnancy module appends edges at
/// conception (`p1` = mother, `p2` = unborn child, `dur` = remaining
/// gestation).  Edges expire at birth or when either endpoint dies.
pub struct MaternalNet {
    name: String,
    edges: EdgeList,
}

impl MaternalNet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            edges: EdgeList::new(),
        }
    }

    /// Append mother/child pairs with the given remaining gestation.
    pub fn add_gestations(&mut self, mothers: &[AgentId], children: &[AgentId], dur: &[f64]) {
        self.edges
            .add_pairs(mothers, children, &vec![1.0; mothers.len()], dur);
    }
}

impl Network for MaternalNet {
    fn name(&self) -> &str {
        &self.name
    }

    fn directional(&self) -> bool {
        true
    }

    fn init(&mut self, _trial_seed: u64, _people: &People) -> EpiResult<()> {
        Ok(())
    }

    fn step(&mut self, _ti: usize, dt: f64, people: &People) {
        self.edges.age(dt);
        self.edges.prune(&people.alive);
    }

    fn edges(&self) -> &EdgeList {
        &self.edges
    }

    fn edges_mut(&mut self) -> &mut EdgeList {
        &mut self.edges
    }
}

/// Contacts of `uids` in a layer, restricted to the living.
pub fn living_contacts(net: &dyn Network, uids: &[AgentId], people: &People) -> Vec<AgentId> {
    net.edges()
        .find_contacts(uids)
        .into_iter()
        .filter(|u| people.alive[u.index()])
        .collect()
}

/// Agents of `uids` that appear in none of the given layers.
pub fn unpartnered(nets: &[&dyn Network], uids: &[AgentId]) -> Vec<AgentId> {
    let mut taken = FxHashSet::default();
    for net in nets {
        taken.extend(net.edges().members());
    }
    uids.iter().copied().filter(|u| !taken.contains(u)).collect()
}
