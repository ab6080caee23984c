//! Machinery shared by every transmissible disease module.
//!
//! # Scheduled events
//!
//! Disease state is boolean flags paired with `ti_` float fields holding the
//! step index at which the next transition fires (`NAN` = nothing pending;
//! NaN never compares due).  A transition consumes its `ti_` field by
//! resetting it to `NAN`, so re-evaluating the due-condition on the next
//! step is always false.
//!
//! # Transmission
//!
//! [`network_exposures`] folds per-edge transmission probabilities into one
//! escape probability per susceptible endpoint, then resolves each endpoint
//! with a single uid-keyed Bernoulli draw.  Keying by uid (not by edge)
//! keeps draws coherent when unrelated edges appear or disappear.

use epi_core::{AgentId, EpiResult, RngStream};
use epi_net::Network;
use epi_people::{ColumnId, ColumnSpec, People};
use rustc_hash::FxHashMap;

/// The column set every transmissible infection carries.
///
/// Diseases with more states (e.g. an exposed stage) register the extras
/// themselves alongside this core set.
#[derive(Copy, Clone)]
pub struct InfectionCols {
    pub susceptible: ColumnId,
    pub infected: ColumnId,
    pub ti_infected: ColumnId,
    /// Per-agent susceptibility multiplier (vaccination writes this).
    pub rel_sus: ColumnId,
    /// Per-agent transmissibility multiplier.
    pub rel_trans: ColumnId,
}

impl InfectionCols {
    /// Register the core columns under `prefix` (the module name).
    pub fn register(people: &mut People, prefix: &str) -> EpiResult<Self> {
        Ok(Self {
            susceptible: people
                .register_column(ColumnSpec::boolean(format!("{prefix}.susceptible"), true))?,
            infected: people
                .register_column(ColumnSpec::boolean(format!("{prefix}.infected"), false))?,
            ti_infected: people
                .register_column(ColumnSpec::float(format!("{prefix}.ti_infected"), f64::NAN))?,
            rel_sus: people
                .register_column(ColumnSpec::float(format!("{prefix}.rel_sus"), 1.0))?,
            rel_trans: people
                .register_column(ColumnSpec::float(format!("{prefix}.rel_trans"), 1.0))?,
        })
    }
}

/// Agents whose scheduled event is due: `flag & (ti_field <= t)`.
/// NaN entries never match.
pub fn due_events(flags: &[bool], ti_field: &[f64], t: f64) -> Vec<AgentId> {
    flags
        .iter()
        .zip(ti_field)
        .enumerate()
        .filter(|(_, (&f, &ti))| f && ti <= t)
        .map(|(i, _)| AgentId(i as u32))
        .collect()
}

/// Consume fired events so they cannot fire twice.
pub fn consume_events(ti_field: &mut [f64], uids: &[AgentId]) {
    for u in uids {
        ti_field[u.index()] = f64::NAN;
    }
}

/// Draw this step's new exposures across the disease's network layers.
///
/// `layers` selects networks by name; an empty list means every layer.
/// Directional layers transmit `p1 -> p2` only.
#[allow(clippy::too_many_arguments)]
pub fn network_exposures(
    ti: usize,
    dt: f64,
    beta: f64,
    networks: &[Box<dyn Network>],
    layers: &[String],
    people: &People,
    infectious: &[bool],
    rel_trans: &[f64],
    susceptible: &[bool],
    rel_sus: &[f64],
    acquisition: &RngStream,
) -> Vec<AgentId> {
    // escape[u] = product of (1 - p) over all of u's exposing edges
    let mut escape: FxHashMap<AgentId, f64> = FxHashMap::default();
    let mut expose = |src: AgentId, dst: AgentId, edge_beta: f64| {
        let s = src.index();
        let d = dst.index();
        if !(people.alive[s] && people.alive[d]) {
            return;
        }
        if !(infectious[s] && susceptible[d]) {
            return;
        }
        let p = (beta * edge_beta * rel_trans[s] * rel_sus[d] * dt).clamp(0.0, 1.0);
        *escape.entry(dst).or_insert(1.0) *= 1.0 - p;
    };

    for net in networks {
        if !layers.is_empty() && !layers.iter().any(|l| l == net.name()) {
            continue;
        }
        let edges = net.edges();
        for i in 0..edges.len() {
            expose(edges.p1[i], edges.p2[i], edges.beta[i]);
            if !net.directional() {
                expose(edges.p2[i], edges.p1[i], edges.beta[i]);
            }
        }
    }

    let mut candidates: Vec<AgentId> = escape.keys().copied().collect();
    candidates.sort_unstable();
    let ps: Vec<f64> = candidates.iter().map(|u| 1.0 - escape[u]).collect();
    let hits = acquisition.bernoulli_each(ti, &candidates, &ps);
    candidates
        .into_iter()
        .zip(hits)
        .filter(|(_, h)| *h)
        .map(|(u, _)| u)
        .collect()
}
