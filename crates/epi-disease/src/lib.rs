//! `epi-disease` — disease, demographic, and intervention modules.
//!
//! # Crate layout
//!
//! | Module            | Contents                                             |
//! |-------------------|------------------------------------------------------|
//! | [`module`]        | `Module` lifecycle trait, `StepCtx`                  |
//! | [`infection`]     | shared transmissible-disease machinery (scheduled events, transmission) |
//! | [`gonorrhea`]     | SIS infection with a death branch                    |
//! | [`measles`]       | SEIR infection                                       |
//! | [`ncd`]           | non-communicable condition (no network)              |
//! | [`demographics`]  | `Births`, `BackgroundDeaths`, `Pregnancy`            |
//! | [`interventions`] | delivery schedule x product composition              |
//! | [`registry`]      | explicit `module_type -> constructor` table          |
//!
//! # The scheduled-event pattern
//!
//! Every module follows the same shape: boolean state flags paired with
//! `ti_` float fields (NaN = unset), a per-step due-compute that clears
//! source flags before setting destination flags, and batch prognosis
//! assignment whose multi-destination branches are resolved at scheduling
//! time.  See [`infection`] for the helpers that enforce this.

pub mod demographics;
pub mod gonorrhea;
pub mod infection;
pub mod interventions;
pub mod measles;
pub mod module;
pub mod ncd;
pub mod registry;

#[cfg(test)]
mod tests;

pub use demographics::{BackgroundDeaths, Births, Pregnancy};
pub use gonorrhea::Gonorrhea;
pub use interventions::{DeliverySchedule, Eligibility, Product, ProductIntervention};
pub use measles::Measles;
pub use module::{Module, StepCtx};
pub use ncd::Ncd;
pub use registry::{ModuleCtor, ModuleRegistry};
