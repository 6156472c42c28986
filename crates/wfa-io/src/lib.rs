//! Boundary adapters for the availability engine.
//!
//! The engine in `wfa-algo` never touches the filesystem. This crate loads
//! its inputs from CSV tables and a TOML configuration, and writes ledgers,
//! per-turbine summaries and diagnostics back out.

pub mod config;
pub mod output;
pub mod period;
pub mod tables;

use anyhow::Result;
use tracing::info;
use wfa_algo::LedgerInputs;
use wfa_core::{EngineConfig, ReportingPeriod};

pub use config::{load_engine_config, render_engine_config};
pub use output::{read_ledger_csv, write_diagnostics, write_ledger, write_summary};
pub use tables::{DataDir, Table};

/// Every table in a data directory, loaded once and sliced per period.
#[derive(Debug, Clone)]
pub struct LoadedTables {
    pub alarms: Vec<wfa_core::RawAlarmEvent>,
    pub classification: Vec<wfa_core::AlarmClass>,
    pub telemetry: wfa_core::TelemetryTables,
    pub curves: wfa_core::CurveTables,
}

impl LoadedTables {
    pub fn load(data: &DataDir, config: &EngineConfig) -> Result<Self> {
        let tables = Self {
            alarms: data.alarms()?,
            classification: data.classification()?,
            telemetry: data.telemetry()?,
            curves: data.curves(&config.tables)?,
        };
        info!(
            dir = %data.root().display(),
            alarms = tables.alarms.len(),
            counters = tables.telemetry.counters.len(),
            grid = tables.telemetry.grid.len(),
            turbine = tables.telemetry.turbine.len(),
            met = tables.telemetry.met.len(),
            curtailment = tables.telemetry.curtailment.len(),
            "input tables loaded"
        );
        Ok(tables)
    }

    /// Engine inputs restricted to one period.
    pub fn inputs_for(&self, period: ReportingPeriod) -> LedgerInputs {
        LedgerInputs {
            period,
            alarms: period::slice_alarms(&self.alarms, &period),
            classification: self.classification.clone(),
            telemetry: period::slice_telemetry(&self.telemetry, &period),
            curves: self.curves.clone(),
        }
    }
}
