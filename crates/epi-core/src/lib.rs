//! `epi-core` — foundational types for the epi agent-based simulation framework.
//!
//! This crate is a dependency of every other `epi-*` crate.  It intentionally
//! has no `epi-*` dependencies and minimal external ones (`rand`, `rand_distr`,
//! `thiserror`, `rustc-hash`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module       | Contents                                               |
//! |--------------|--------------------------------------------------------|
//! | [`ids`]      | `AgentId` — row index into the columnar agent store    |
//! | [`time`]     | `Timeline` — step index ↔ calendar-year mapping        |
//! | [`rng`]      | `RngStream` — per-(module, purpose) keyed random draws |
//! | [`results`]  | `Results` — named per-step output channels             |
//! | [`pars`]     | `Pars`, `ParValue` — module parameter tables           |
//! | [`error`]    | `EpiError`, `EpiResult`                                |

pub mod error;
pub mod ids;
pub mod pars;
pub mod results;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{EpiError, EpiResult};
pub use ids::AgentId;
pub use pars::{interp_table, ParValue, Pars};
pub use results::Results;
pub use rng::RngStream;
pub use time::Timeline;
