//! Unified error types for the availability engine
//!
//! [`WfaError`] covers the fatal conditions of a ledger computation as well as
//! the boundary failures (I/O, parsing, configuration) raised by the loaders
//! around it. Non-fatal findings such as sanity-filtered readings are not
//! errors; they are collected in [`crate::diagnostics::Diagnostics`].
//!
//! # Example
//!
//! ```ignore
//! use wfa_core::{WfaError, WfaResult};
//!
//! fn run(inputs: &LedgerInputs, config: &EngineConfig) -> WfaResult<()> {
//!     let ledger = compute_ledger(inputs, config)?;
//!     ledger.ensure_resolved()?;
//!     Ok(())
//! }
//! ```

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::model::{AlarmId, TurbineId};

/// Unified error type for all engine operations.
#[derive(Error, Debug)]
pub enum WfaError {
    /// A required telemetry or configuration table is absent or empty.
    /// Fatal for the whole period.
    #[error("Missing input: table '{table}' is absent or empty")]
    MissingInput { table: String },

    /// Sanity-filtered readings. Only ever surfaced through diagnostics,
    /// never returned by a ledger computation.
    #[error("Data range: {dropped} row(s) of '{table}' outside physical limits")]
    DataRange { table: String, dropped: usize },

    /// Two resolved alarm intervals on one turbine still overlap after the
    /// blackout split. Internal invariant failure.
    #[error(
        "Overlap invariant violated on turbine {turbine}: alarms {first} and {second} overlap"
    )]
    OverlapInvariantViolation {
        turbine: TurbineId,
        first: AlarmId,
        second: AlarmId,
    },

    /// No estimation tier applies to a row.
    #[error("Unresolved potential energy for turbine {turbine} at {timestamp}")]
    UnresolvedPotentialEnergy {
        turbine: TurbineId,
        timestamp: NaiveDateTime,
    },

    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

impl WfaError {
    pub fn missing_input(table: impl Into<String>) -> Self {
        WfaError::MissingInput {
            table: table.into(),
        }
    }

    /// True for conditions that abort the whole period.
    pub fn is_fatal_for_period(&self) -> bool {
        !matches!(
            self,
            WfaError::DataRange { .. } | WfaError::UnresolvedPotentialEnergy { .. }
        )
    }
}

/// Convenience type alias for Results using WfaError.
pub type WfaResult<T> = Result<T, WfaError>;

impl From<anyhow::Error> for WfaError {
    fn from(err: anyhow::Error) -> Self {
        WfaError::Other(err.to_string())
    }
}

impl From<String> for WfaError {
    fn from(s: String) -> Self {
        WfaError::Other(s)
    }
}

impl From<&str> for WfaError {
    fn from(s: &str) -> Self {
        WfaError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for WfaError {
    fn from(err: serde_json::Error) -> Self {
        WfaError::Parse(err.to_string())
    }
}
