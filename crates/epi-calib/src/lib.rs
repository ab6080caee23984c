//! `epi-calib` — parallel calibration of simulation parameters against
//! observed data.
//!
//! # Crate layout
//!
//! | Module          | Contents                                               |
//! |-----------------|--------------------------------------------------------|
//! | [`space`]       | `CalibParam`, `SearchSpace`                            |
//! | [`sampler`]     | `Sampler` backend trait, uniform `RandomSampler`       |
//! | [`component`]   | observed series, conform policies, likelihoods         |
//! | [`study`]       | shared append-only trial ledger                        |
//! | [`calibration`] | the state-machine driver running trials over a worker pool |
//! | [`special`]     | log-gamma / log-beta for the closed-form likelihoods   |
//!
//! A sweep declares a [`SearchSpace`] of free parameters bound to
//! configuration paths, one or more [`CalibComponent`]s pairing observed
//! series with results channels, and a trial budget.  [`Calibration::run`]
//! samples, simulates, and scores trials in parallel; the trial with the
//! lowest summed negative log-likelihood wins.

pub mod calibration;
pub mod component;
pub mod sampler;
pub mod space;
pub mod special;
pub mod study;


pub use calibration::{CalibState, Calibration, ConfirmFit, CustomObjective};
pub use component::{CalibComponent, ConformPolicy, Likelihood, ObservedSeries};
pub use sampler::{RandomSampler, Sampler};
pub use space::{CalibParam, ParamKind, SearchSpace};
pub use study::{Study, Trial};
