//! The `People` store: SoA demographic fields plus module-registered columns.
//!
//! # Growth
//!
//! [`People::grow`] is the only structural mutation.  It amortizes
//! reallocation geometrically: when requested growth exceeds spare capacity,
//! every array reserves at least `max(n, capacity / 2)` extra slots before
//! appending.  New uids are contiguous, strictly increasing, and never
//! reused.  After every growth the length invariant is re-checked; a
//! violation panics, since it indicates a store bug rather than user error.
//!
//! # Death
//!
//! Death is logical: modules call [`People::request_death`], and the driver
//! applies pending deaths between phases (clearing `alive` and notifying all
//! modules so disease flags are forced false the same step).  Rows are never
//! removed, preserving index stability for in-flight edges and scheduled
//! events.

use epi_core::{AgentId, EpiError, EpiResult};
use rustc_hash::FxHashMap;

use crate::column::{Column, ColumnData, ColumnId, ColumnSpec};

/// Columnar storage for all agents.
///
/// The demographic fields every simulation needs are plain `pub` SoA vectors;
/// module-specific state lives in named registered columns accessed through
/// [`ColumnId`] handles.
pub struct People {
    /// Number of agents.  Equals the per-row length of every column.
    count: usize,
    /// Allocated capacity (in agents) tracked for geometric growth.
    cap: usize,

    // ── Demographic SoA fields ────────────────────────────────────────────
    /// Unique agent id; always equals the row index.
    pub uid: Vec<u32>,
    /// Age in years.  Negative for agents conceived but not yet born.
    pub age: Vec<f64>,
    pub female: Vec<bool>,
    pub alive: Vec<bool>,
    /// Step index of scheduled (background or module-requested) death;
    /// `NAN` = none scheduled.
    pub ti_dead: Vec<f64>,
    /// Age of sexual debut; `NAN` = not applicable.
    pub debut: Vec<f64>,
    /// Population scale factor per agent (weighted counts).
    pub scale: Vec<f64>,

    // ── Module-registered columns ─────────────────────────────────────────
    columns: Vec<Column>,
    names: FxHashMap<String, ColumnId>,

    /// Deaths requested this step, applied by the driver between phases.
    pending_deaths: Vec<AgentId>,
}

impl People {
    /// Allocate a store with `n` agents, demographic fields at defaults
    /// (age 0, not female, alive, no scheduled death, scale 1).
    pub fn new(n: usize) -> Self {
        Self {
            count: n,
            cap: n,
            uid: (0..n as u32).collect(),
            age: vec![0.0; n],
            female: vec![false; n],
            alive: vec![true; n],
            ti_dead: vec![f64::NAN; n],
            debut: vec![f64::NAN; n],
            scale: vec![1.0; n],
            columns: Vec::new(),
            names: FxHashMap::default(),
            pending_deaths: Vec::new(),
        }
    }

    /// Number of agents (rows), alive or dead.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Iterator over all agent ids in ascending order.
    pub fn all_uids(&self) -> impl Iterator<Item = AgentId> + '_ {
        (0..self.count as u32).map(AgentId)
    }

    /// Ids of all living agents.
    pub fn alive_uids(&self) -> Vec<AgentId> {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, &a)| a)
            .map(|(i, _)| AgentId(i as u32))
            .collect()
    }

    /// Number of living agents.
    pub fn n_alive(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }

    // ── Growth ────────────────────────────────────────────────────────────

    /// Append `n` agents and return their (contiguous, strictly increasing)
    /// uids.  Reallocation is geometric; existing values are untouched.
    pub fn grow(&mut self, n: usize) -> std::ops::Range<u32> {
        let orig = self.count;
        let new_total = orig + n;

        if new_total > self.cap {
            // Minimum 50% over-allocation to amortize repeated small growths.
            let extra = n.max(self.cap / 2);
            self.cap = self.cap.max(orig) + extra;
            let spare = self.cap - orig;
            self.uid.reserve_exact(spare);
            self.age.reserve_exact(spare);
            self.female.reserve_exact(spare);
            self.alive.reserve_exact(spare);
            self.ti_dead.reserve_exact(spare);
            self.debut.reserve_exact(spare);
            self.scale.reserve_exact(spare);
            for col in &mut self.columns {
                col.reserve(spare);
            }
        }

        self.uid.extend(orig as u32..new_total as u32);
        self.age.extend(std::iter::repeat(0.0).take(n));
        self.female.extend(std::iter::repeat(false).take(n));
        self.alive.extend(std::iter::repeat(true).take(n));
        self.ti_dead.extend(std::iter::repeat(f64::NAN).take(n));
        self.debut.extend(std::iter::repeat(f64::NAN).take(n));
        self.scale.extend(std::iter::repeat(1.0).take(n));
        for col in &mut self.columns {
            col.push_defaults(n);
        }

        self.count = new_total;
        self.validate();
        log::debug!("store grew by {n} to {new_total} agents");
        orig as u32..new_total as u32
    }

    /// Check the length invariant on every array.
    ///
    /// # Panics
    /// Panics on any mismatch — this is a store bug, not user error.
    pub fn validate(&self) {
        assert_eq!(self.uid.len(), self.count, "uid length mismatch");
        assert_eq!(self.age.len(), self.count, "age length mismatch");
        assert_eq!(self.female.len(), self.count, "female length mismatch");
        assert_eq!(self.alive.len(), self.count, "alive length mismatch");
        assert_eq!(self.ti_dead.len(), self.count, "ti_dead length mismatch");
        assert_eq!(self.debut.len(), self.count, "debut length mismatch");
        assert_eq!(self.scale.len(), self.count, "scale length mismatch");
        for col in &self.columns {
            assert_eq!(
                col.len(),
                self.count * col.spec.rows,
                "column {:?} length mismatch",
                col.spec.name
            );
        }
    }

    // ── Column registration and access ────────────────────────────────────

    /// Register a new column, back-filling all existing rows with its
    /// declared default.  May be called mid-run when a module is attached.
    /// Registering a duplicate name is a fatal error.
    pub fn register_column(&mut self, spec: ColumnSpec) -> EpiResult<ColumnId> {
        if self.names.contains_key(&spec.name) {
            return Err(EpiError::Config(format!(
                "duplicate column name {:?}",
                spec.name
            )));
        }
        let id = ColumnId(self.columns.len());
        self.names.insert(spec.name.clone(), id);
        self.columns.push(Column::new(spec, self.count));
        Ok(id)
    }

    /// Resolve a column handle by name.
    pub fn column_id(&self, name: &str) -> Option<ColumnId> {
        self.names.get(name).copied()
    }

    /// Rows per agent for a column (1 for flat columns).
    pub fn column_rows(&self, id: ColumnId) -> usize {
        self.columns[id.0].spec.rows
    }

    /// Read a boolean column.
    ///
    /// # Panics
    /// Panics if the column is not boolean (caller bug).
    pub fn bools(&self, id: ColumnId) -> &[bool] {
        match &self.columns[id.0].data {
            ColumnData::Bool(v) => v,
            _ => panic!("column {:?} is not boolean", self.columns[id.0].spec.name),
        }
    }

    pub fn bools_mut(&mut self, id: ColumnId) -> &mut [bool] {
        let col = &mut self.columns[id.0];
        match &mut col.data {
            ColumnData::Bool(v) => v,
            _ => panic!("column {:?} is not boolean", col.spec.name),
        }
    }

    /// Read a float column.
    pub fn floats(&self, id: ColumnId) -> &[f64] {
        match &self.columns[id.0].data {
            ColumnData::F64(v) => v,
            _ => panic!("column {:?} is not float", self.columns[id.0].spec.name),
        }
    }

    pub fn floats_mut(&mut self, id: ColumnId) -> &mut [f64] {
        let col = &mut self.columns[id.0];
        match &mut col.data {
            ColumnData::F64(v) => v,
            _ => panic!("column {:?} is not float", col.spec.name),
        }
    }

    /// Read an integer column.
    pub fn ints(&self, id: ColumnId) -> &[i64] {
        match &self.columns[id.0].data {
            ColumnData::I64(v) => v,
            _ => panic!("column {:?} is not integer", self.columns[id.0].spec.name),
        }
    }

    pub fn ints_mut(&mut self, id: ColumnId) -> &mut [i64] {
        let col = &mut self.columns[id.0];
        match &mut col.data {
            ColumnData::I64(v) => v,
            _ => panic!("column {:?} is not integer", col.spec.name),
        }
    }

    // ── Bulk selection ────────────────────────────────────────────────────

    /// Ids where a boolean column is `true`.
    pub fn true_where(&self, id: ColumnId) -> Vec<AgentId> {
        self.bools(id)
            .iter()
            .enumerate()
            .filter(|(_, &b)| b)
            .map(|(i, _)| AgentId(i as u32))
            .collect()
    }

    /// Ids where a boolean column is `false`.
    pub fn false_where(&self, id: ColumnId) -> Vec<AgentId> {
        self.bools(id)
            .iter()
            .enumerate()
            .filter(|(_, &b)| !b)
            .map(|(i, _)| AgentId(i as u32))
            .collect()
    }

    /// Ids where a float column is set (non-NaN).
    pub fn defined(&self, id: ColumnId) -> Vec<AgentId> {
        self.floats(id)
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .map(|(i, _)| AgentId(i as u32))
            .collect()
    }

    /// Number of `true` entries in a boolean column.
    pub fn count_true(&self, id: ColumnId) -> usize {
        self.bools(id).iter().filter(|&&b| b).count()
    }

    /// Scale-weighted count over a set of agents (replacement for
    /// `uids.len()` when the population is down-sampled).
    pub fn scaled_count(&self, uids: &[AgentId]) -> f64 {
        uids.iter().map(|u| self.scale[u.index()]).sum()
    }

    /// Living agents past sexual debut.
    pub fn active_uids(&self) -> Vec<AgentId> {
        (0..self.count)
            .filter(|&i| self.alive[i] && self.age[i] > self.debut[i])
            .map(|i| AgentId(i as u32))
            .collect()
    }

    // ── Death handling ────────────────────────────────────────────────────

    /// Request logical death for a batch of agents.  Applied by the driver
    /// between phases via [`People::apply_deaths`].
    pub fn request_death(&mut self, uids: &[AgentId]) {
        self.pending_deaths.extend_from_slice(uids);
    }

    /// Apply all pending death requests: clears `alive` and returns the ids
    /// that actually died this call (already-dead agents are skipped).
    pub fn apply_deaths(&mut self) -> Vec<AgentId> {
        let mut died = Vec::new();
        let pending = std::mem::take(&mut self.pending_deaths);
        for u in pending {
            let i = u.index();
            assert!(i < self.count, "death requested for out-of-range {u}");
            if self.alive[i] {
                self.alive[i] = false;
                died.push(u);
            }
        }
        if !died.is_empty() {
            log::debug!("applied {} deaths", died.len());
        }
        died
    }

    /// Per-step vital dynamics: age the living by `dt` and request death for
    /// anyone whose scheduled `ti_dead` has arrived.
    pub fn step_demographics(&mut self, dt: f64, ti: usize) {
        let t = ti as f64;
        let mut due = Vec::new();
        for i in 0..self.count {
            if self.alive[i] {
                self.age[i] += dt;
                if self.ti_dead[i] <= t {
                    due.push(AgentId(i as u32));
                }
            }
        }
        self.request_death(&due);
    }
}
