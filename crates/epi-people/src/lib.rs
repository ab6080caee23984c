//! `epi-people` — dynamic columnar agent storage.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`column`]  | `ColumnSpec`, `ColumnKind`, `ColumnId` — named typed state arrays |
//! | [`store`]   | `People` — SoA demographic fields + module-registered columns, geometric growth, bulk selection |
//!
//! # Design
//!
//! Every agent is a row across all columns; the `AgentId` value is the index
//! into all of them.  Agents are only appended (births, immigration) — death
//! is a logical flag, never physical removal, so ids stay stable for
//! in-flight network edges and scheduled events.

pub mod column;
pub mod store;

#[cfg(test)]
mod tests;

pub use column::{ColumnId, ColumnKind, ColumnSpec};
pub use store::People;
