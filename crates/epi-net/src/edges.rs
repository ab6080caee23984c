//! The edge list shared by all explicit-contact network layers.
//!
//! Edges are stored as parallel arrays (`p1`, `p2`, `beta`, `dur`), one entry
//! per edge.  The length invariant mirrors the agent store: all four arrays
//! are equal length at all times, checked on every append.

use epi_core::AgentId;
use rustc_hash::FxHashSet;

/// Parallel-array edge storage.
///
/// `p1`/`p2` are the two endpoints.  For bidirectional layers the order is
/// arbitrary; vertical layers (mother to child) put the source in `p1`.
#[derive(Clone, Debug, Default)]
pub struct EdgeList {
    pub p1: Vec<AgentId>,
    pub p2: Vec<AgentId>,
    /// Per-edge transmission weight, multiplied into the disease beta.
    pub beta: Vec<f64>,
    /// Remaining duration in years; edges lapse when this reaches zero.
    pub dur: Vec<f64>,
}

impl EdgeList {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.p1.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.p1.is_empty()
    }

    /// Append a batch of edges.
    ///
    /// # Panics
    /// Panics if the attribute arrays are not the same length as `p1`.
    pub fn add_pairs(&mut self, p1: &[AgentId], p2: &[AgentId], beta: &[f64], dur: &[f64]) {
        assert_eq!(p1.len(), p2.len(), "p1/p2 length mismatch");
        assert_eq!(p1.len(), beta.len(), "p1/beta length mismatch");
        assert_eq!(p1.len(), dur.len(), "p1/dur length mismatch");
        self.p1.extend_from_slice(p1);
        self.p2.extend_from_slice(p2);
        self.beta.extend_from_slice(beta);
        self.dur.extend_from_slice(dur);
    }

    /// Union of all partners of `uids` across both endpoint columns,
    /// deduplicated and sorted.  An agent appears in the result only if it
    /// partners one of the queried agents; the queried agents themselves are
    /// excluded unless they carry a self-loop.
    pub fn find_contacts(&self, uids: &[AgentId]) -> Vec<AgentId> {
        let query: FxHashSet<AgentId> = uids.iter().copied().collect();
        let mut found = FxHashSet::default();
        for (&a, &b) in self.p1.iter().zip(&self.p2) {
            if query.contains(&a) {
                found.insert(b);
            }
            if query.contains(&b) {
                found.insert(a);
            }
        }
        let mut out: Vec<AgentId> = found.into_iter().collect();
        out.sort_unstable();
        out
    }

    /// Decrement every edge's remaining duration by `dt`.
    pub fn age(&mut self, dt: f64) {
        for d in &mut self.dur {
            *d -= dt;
        }
    }

    /// Drop lapsed edges and edges with a dead endpoint.
    pub fn prune(&mut self, alive: &[bool]) {
        let keep: Vec<bool> = self
            .p1
            .iter()
            .zip(&self.p2)
            .zip(&self.dur)
            .map(|((&a, &b), &d)| d > 0.0 && alive[a.index()] && alive[b.index()])
            .collect();
        self.retain_mask(&keep);
    }

    /// Drop only edges with a dead endpoint (permanent layers).
    pub fn prune_dead(&mut self, alive: &[bool]) {
        let keep: Vec<bool> = self
            .p1
            .iter()
            .zip(&self.p2)
            .map(|(&a, &b)| alive[a.index()] && alive[b.index()])
            .collect();
        self.retain_mask(&keep);
    }

    /// All agents currently appearing as an endpoint.
    pub fn members(&self) -> FxHashSet<AgentId> {
        self.p1.iter().chain(&self.p2).copied().collect()
    }

    pub fn clear(&mut self) {
        self.p1.clear();
        self.p2.clear();
        self.beta.clear();
        self.dur.clear();
    }

    fn retain_mask(&mut self, keep: &[bool]) {
        let mut i = 0;
        self.p1.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
        let mut i = 0;
        self.p2.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
        let mut i = 0;
        self.beta.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
        let mut i = 0;
        self.dur.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
    }
}
