//! Named, typed per-agent state columns.
//!
//! A column is declared by the module that owns it (via [`ColumnSpec`]) and
//! allocated, back-filled, and resized by the store.  The declaring module is
//! the only writer of semantic meaning; the store guarantees only the length
//! invariant: `data.len() == agent_count * rows` at all times.
//!
//! Multi-row columns (`rows > 1`, e.g. per-genotype state) are stored
//! agent-major: the value for agent `i`, row `r` lives at `i * rows + r`.
//! Appending an agent is then a contiguous push of `rows` defaults.

/// Element type and fill (default) value of a column.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ColumnKind {
    Bool { default: bool },
    F64 { default: f64 },
    I64 { default: i64 },
}

/// Declaration of one state column.
#[derive(Clone, Debug)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    /// Values per agent; 1 for ordinary flat columns.
    pub rows: usize,
}

impl ColumnSpec {
    /// A flat boolean column (state flag).
    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Bool { default },
            rows: 1,
        }
    }

    /// A flat float column.  Scheduled-event fields use `f64::NAN` as the
    /// "unset" default so they are never due.
    pub fn float(name: impl Into<String>, default: f64) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::F64 { default },
            rows: 1,
        }
    }

    /// A flat integer column (counters, doses).
    pub fn int(name: impl Into<String>, default: i64) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::I64 { default },
            rows: 1,
        }
    }

    /// Give the column `rows` values per agent (e.g. one per genotype).
    pub fn with_rows(mut self, rows: usize) -> Self {
        assert!(rows >= 1, "a column must have at least one row per agent");
        self.rows = rows;
        self
    }
}

/// Opaque handle to a registered column; cheap to copy and store.
///
/// Returned by `People::register_column` and resolvable by name via
/// `People::column_id`.  Using a stale handle from a different `People`
/// instance is a logic error and may panic on kind mismatch.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ColumnId(pub(crate) usize);

/// Backing storage for one column.
#[derive(Clone, Debug)]
pub(crate) enum ColumnData {
    Bool(Vec<bool>),
    F64(Vec<f64>),
    I64(Vec<i64>),
}

#[derive(Clone, Debug)]
pub(crate) struct Column {
    pub(crate) spec: ColumnSpec,
    pub(crate) data: ColumnData,
}

impl Column {
    /// Allocate for `n` agents, filled with the declared default.
    pub(crate) fn new(spec: ColumnSpec, n: usize) -> Self {
        let len = n * spec.rows;
        let data = match spec.kind {
            ColumnKind::Bool { default } => ColumnData::Bool(vec![default; len]),
            ColumnKind::F64 { default } => ColumnData::F64(vec![default; len]),
            ColumnKind::I64 { default } => ColumnData::I64(vec![default; len]),
        };
        Self { spec, data }
    }

    /// Append defaults for `n` new agents.
    pub(crate) fn push_defaults(&mut self, n: usize) {
        let extra = n * self.spec.rows;
        match (&mut self.data, self.spec.kind) {
            (ColumnData::Bool(v), ColumnKind::Bool { default }) => {
                v.extend(std::iter::repeat(default).take(extra));
            }
            (ColumnData::F64(v), ColumnKind::F64 { default }) => {
                v.extend(std::iter::repeat(default).take(extra));
            }
            (ColumnData::I64(v), ColumnKind::I64 { default }) => {
                v.extend(std::iter::repeat(default).take(extra));
            }
            _ => unreachable!("column data/kind mismatch"),
        }
    }

    /// Reserve capacity for `extra` additional agents.
    pub(crate) fn reserve(&mut self, extra: usize) {
        let slots = extra * self.spec.rows;
        match &mut self.data {
            ColumnData::Bool(v) => v.reserve_exact(slots),
            ColumnData::F64(v) => v.reserve_exact(slots),
            ColumnData::I64(v) => v.reserve_exact(slots),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match &self.data {
            ColumnData::Bool(v) => v.len(),
            ColumnData::F64(v) => v.len(),
            ColumnData::I64(v) => v.len(),
        }
    }
}
