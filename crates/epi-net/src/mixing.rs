//! Aggregate (non-edge) contact model between age-band sub-populations.
//!
//! Instead of explicit partnerships, a [`MixingPool`] carries a contact-rate
//! matrix between named age bands.  Per step and per (source, destination)
//! band pair, the acquisition pressure on each destination agent is
//!
//!   `beta * mean(infectious * rel_trans over source) * eff_contacts
//!        * rel_sus(destination)`
//!
//! Contributions from all source bands are combined per destination agent as
//! independent exposures (`1 - prod(1 - p)`), clamped to `[0, 1]`, and
//! resolved with one Bernoulli draw keyed by the agent's uid.

use epi_core::{AgentId, EpiError, EpiResult, RngStream};
use epi_people::People;

/// One named age band `[lo, hi)`.
#[derive(Clone, Debug)]
pub struct AgeBand {
    pub name: String,
    pub lo: f64,
    pub hi: f64,
}

impl AgeBand {
    pub fn new(name: impl Into<String>, lo: f64, hi: f64) -> Self {
        Self {
            name: name.into(),
            lo,
            hi,
        }
    }

    #[inline]
    fn contains(&self, age: f64) -> bool {
        age >= self.lo && age < self.hi
    }
}

/// Age-structured mixing pool.
pub struct MixingPool {
    name: String,
    bands: Vec<AgeBand>,
    /// Effective contacts per step, row-major `[src][dst]`.
    contacts: Vec<f64>,
    acquisition: RngStream,
}

impl MixingPool {
    /// Build a pool; `contacts` must be a full `bands x bands` matrix.
    pub fn new(
        name: impl Into<String>,
        bands: Vec<AgeBand>,
        contacts: Vec<f64>,
    ) -> EpiResult<Self> {
        let name = name.into();
        let n = bands.len();
        if contacts.len() != n * n {
            return Err(EpiError::Config(format!(
                "mixing pool {name:?}: contact matrix has {} entries, expected {}",
                contacts.len(),
                n * n
            )));
        }
        Ok(Self {
            name,
            bands,
            contacts,
            acquisition: RngStream::new(0, "pool", "acquisition"),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn init(&mut self, trial_seed: u64) {
        self.acquisition = RngStream::new(trial_seed, &self.name, "acquisition");
    }

    /// Living agents grouped by band; an agent outside every band mixes in
    /// no pool cell.
    fn band_members(&self, people: &People) -> Vec<Vec<AgentId>> {
        let mut groups = vec![Vec::new(); self.bands.len()];
        for u in people.alive_uids() {
            let age = people.age[u.index()];
            for (g, band) in self.bands.iter().enumerate() {
                if band.contains(age) {
                    groups[g].push(u);
                }
            }
        }
        groups
    }

    /// Draw this step's new exposures for one disease.
    ///
    /// `infectious`/`rel_trans`/`susceptible`/`rel_sus` are full per-agent
    /// arrays supplied by the disease module.
    #[allow(clippy::too_many_arguments)]
    pub fn new_exposures(
        &self,
        ti: usize,
        people: &People,
        beta: f64,
        infectious: &[bool],
        rel_trans: &[f64],
        susceptible: &[bool],
        rel_sus: &[f64],
    ) -> Vec<AgentId> {
        let groups = self.band_members(people);
        let n = self.bands.len();

        // Mean infectious pressure per source band.
        let mut src_pressure = vec![0.0; n];
        for (g, members) in groups.iter().enumerate() {
            if members.is_empty() {
                continue;
            }
            let total: f64 = members
                .iter()
                .filter(|u| infectious[u.index()])
                .map(|u| rel_trans[u.index()])
                .sum();
            src_pressure[g] = total / members.len() as f64;
        }

        // Combine exposures from all source bands per destination agent.
        let mut exposed = Vec::new();
        for (dst, members) in groups.iter().enumerate() {
            let candidates: Vec<AgentId> = members
                .iter()
                .copied()
                .filter(|u| susceptible[u.index()])
                .collect();
            if candidates.is_empty() {
                continue;
            }
            let ps: Vec<f64> = candidates
                .iter()
                .map(|u| {
                    let mut escape = 1.0;
                    for src in 0..n {
                        let eff = self.contacts[src * n + dst];
                        let p = beta * src_pressure[src] * eff * rel_sus[u.index()];
                        escape *= 1.0 - p.clamp(0.0, 1.0);
                    }
                    1.0 - escape
                })
                .collect();
            let hits = self.acquisition.bernoulli_each(ti, &candidates, &ps);
            exposed.extend(
                candidates
                    .iter()
                    .zip(&hits)
                    .filter(|(_, &h)| h)
                    .map(|(&u, _)| u),
            );
        }
        exposed.sort_unstable();
        exposed.dedup();
        exposed
    }
}
