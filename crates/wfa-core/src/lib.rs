//! # wfa-core: Wind Farm Availability Core
//!
//! Shared data model for the availability engine: alarm and telemetry
//! records, binned aggregates, the energy-loss ledger row, engine
//! configuration, the unified error type and the diagnostics collector.
//!
//! ## Design Philosophy
//!
//! The engine turns alarm logs and 10-minute SCADA telemetry into a ledger
//! with one row per (turbine, bin):
//!
//! - **Absent vs. zero**: alarm seconds default to 0, measurements stay
//!   `None` when no reading exists. A missing potential energy is never
//!   silently zero-filled.
//! - **Named thresholds**: every tuned constant sits in [`EngineConfig`].
//! - **Newtype IDs**: turbines, alarms and met masts cannot be mixed up.
//!
//! ## Quick Start
//!
//! ```rust
//! use wfa_core::*;
//!
//! let config = EngineConfig::for_turbines(&[2307405, 2307406, 2307407]);
//! config.validate().unwrap();
//!
//! let turbines = config.farm.turbines();
//! assert_eq!(turbines[0], TurbineId::new(2307405));
//! assert_eq!(AlarmCategory::from_error_type(1), Some(AlarmCategory::Type1));
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod units;

pub use config::{
    AlarmCodesConfig, EngineConfig, FarmConfig, SanityConfig, StatisticalConfig, TablesConfig,
    ThresholdConfig, ValueRange, WakeConfig,
};
pub use diagnostics::{DiagnosticIssue, Diagnostics, IssueCategory, SanityStats, Severity};
pub use error::{WfaError, WfaResult};
pub use model::*;
pub use units::{KilowattHours, Kilowatts};
