//! `epi-net` — contact structure between agents.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                    |
//! |------------|-------------------------------------------------------------|
//! | [`edges`]  | `EdgeList` — parallel-array edge storage, `find_contacts`   |
//! | [`layers`] | `Network` trait; `RandomNet`, `StaticNet`, `SexualNetwork`, `MaternalNet` |
//! | [`mixing`] | `MixingPool` — age-band aggregate contact model             |
//!
//! Layers own their edges and their formation policy; diseases only read the
//! edge list.  The simulation steps layers after demographics so transmission
//! always sees the current step's contact structure.

pub mod edges;
pub mod layers;
pub mod mixing;

#[cfg(test)]
mod tests;

pub use edges::EdgeList;
pub use layers::{living_contacts, unpartnered, MaternalNet, Network, RandomNet, SexualNetwork, StaticNet};
pub use mixing::{AgeBand, MixingPool};
