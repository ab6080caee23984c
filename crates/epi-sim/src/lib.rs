//! `epi-sim` — the simulation driver and its configuration.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                  |
//! |------------|-----------------------------------------------------------|
//! | [`config`] | `SimConfig`, `ModuleSpec`, `NetworkSpec`, `ParamPath` — immutable configuration with pure path overrides |
//! | [`sim`]    | `Sim` — owns store/networks/modules, fixed phase order    |
//!
//! A run is: build a `SimConfig`, `Sim::new(&config)?`, `sim.run()?`.
//! Calibration re-runs the same config with overrides applied through
//! `SimConfig::with_overrides`, which never mutates the base.

pub mod config;
pub mod sim;


pub use config::{ModuleSpec, NetworkSpec, ParamPath, SimConfig};
pub use sim::Sim;
