//! # wfa-algo: Availability Calculation Engine
//!
//! Turns one reporting period of turbine alarms and 10-minute SCADA
//! telemetry into an energy-loss ledger: for every (turbine, bin) the
//! produced energy, the estimated potential energy and the loss split by
//! cause.
//!
//! ## Pipeline
//!
//! | Stage | Module |
//! |-------|--------|
//! | Sanity filter | [`sanity`] |
//! | Alarm normaliser | [`normalize`] |
//! | Cascade resolver | [`cascade`] |
//! | Blackout splitter | [`blackout`] |
//! | Interval binner | [`binner`] |
//! | Grid expander | [`grid`] |
//! | Potential energy estimator | [`potential`] |
//! | Loss categoriser | [`categorize`] |
//!
//! [`compute_ledger`] runs them in order; [`availability::summarize`] rolls
//! a ledger up into per-turbine availability ratios.
//!
//! ## Example
//!
//! ```ignore
//! use wfa_algo::{compute_ledger, LedgerInputs};
//! use wfa_core::EngineConfig;
//!
//! let config = EngineConfig::for_turbines(&[2307405, 2307406]);
//! let ledger = compute_ledger(&inputs, &config)?;
//! ledger.ensure_resolved()?;
//! for summary in wfa_algo::availability::summarize(&ledger) {
//!     println!("{}: {:?}", summary.turbine_id, summary.maa_gross);
//! }
//! ```

pub mod availability;
pub mod binner;
pub mod blackout;
pub mod cascade;
pub mod categorize;
pub mod engine;
pub mod grid;
pub mod normalize;
pub mod potential;
pub mod sanity;

pub use availability::{farm_total, summarize, AvailabilitySummary};
pub use engine::{compute_ledger, Ledger, LedgerInputs, UnresolvedRow};
pub use potential::{PotentialEstimator, PotentialTier};
