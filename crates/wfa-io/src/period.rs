//! Reporting-period selection for loaded tables.

use anyhow::Result;
use chrono::NaiveDateTime;
use wfa_core::{RawAlarmEvent, ReportingPeriod, TelemetryTables};
use wfa_ts::{ceil_to_bin, floor_to_bin, month_period, month_period_until, BIN_SECS};

/// Month period, optionally pulled back to the latest counter reading so a
/// month in progress only covers bins that have data.
pub fn month_from_counters(
    year: i32,
    month: u32,
    telemetry: &TelemetryTables,
    until_latest: bool,
) -> Result<ReportingPeriod> {
    if until_latest {
        month_period_until(year, month, telemetry.counters.iter().map(|c| c.timestamp))
    } else {
        month_period(year, month)
    }
}

fn owns(period: &ReportingPeriod, ts: NaiveDateTime) -> bool {
    ts > floor_to_bin(period.start, BIN_SECS) && ts <= ceil_to_bin(period.end, BIN_SECS)
}

/// Telemetry rows whose timestamp falls in one of the period's bins.
pub fn slice_telemetry(telemetry: &TelemetryTables, period: &ReportingPeriod) -> TelemetryTables {
    TelemetryTables {
        counters: telemetry
            .counters
            .iter()
            .filter(|r| owns(period, r.timestamp))
            .cloned()
            .collect(),
        grid: telemetry
            .grid
            .iter()
            .filter(|r| owns(period, r.timestamp))
            .cloned()
            .collect(),
        turbine: telemetry
            .turbine
            .iter()
            .filter(|r| owns(period, r.timestamp))
            .cloned()
            .collect(),
        met: telemetry
            .met
            .iter()
            .filter(|r| owns(period, r.timestamp))
            .cloned()
            .collect(),
        curtailment: telemetry
            .curtailment
            .iter()
            .filter(|r| owns(period, r.timestamp))
            .cloned()
            .collect(),
    }
}

/// Alarms that can touch the period. Open alarms are kept when they
/// started before the period ends.
pub fn slice_alarms(alarms: &[RawAlarmEvent], period: &ReportingPeriod) -> Vec<RawAlarmEvent> {
    alarms
        .iter()
        .filter(|a| a.time_on <= period.end && a.time_off.map_or(true, |off| off >= period.start))
        .cloned()
        .collect()
}
