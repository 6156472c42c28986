//! Ledger, summary and diagnostics writers.
//!
//! Tables go through a polars `DataFrame` and are written to a staged copy
//! (`<parent>/<stage>/<file>`) before being copied to the requested path.
//! The extension picks the format: `.csv`, or `.parquet` with the `parquet`
//! feature.

use anyhow::{anyhow, Context, Result};
use polars::prelude::*;
use serde::Deserialize;
use std::{
    ffi::OsStr,
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::info;
use wfa_algo::{AvailabilitySummary, Ledger};
use wfa_core::{
    Diagnostics, EnergyLedgerRow, LossBreakdown, LossCategory, PotentialMethod, TurbineId,
};

use crate::tables::{parse_timestamp, read_records};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStage {
    Ledger,
    Summary,
}

impl OutputStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStage::Ledger => "ledger",
            OutputStage::Summary => "summary",
        }
    }
}

pub fn staged_output_path(output: &Path, stage: &str) -> PathBuf {
    let parent = output.parent().unwrap_or_else(|| Path::new("."));
    let file_name = output.file_name().unwrap_or_else(|| OsStr::new("output"));
    parent.join(stage).join(file_name)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

/// Write a frame to its staged path, then copy it to `output`.
pub fn write_frame_staged(df: &mut DataFrame, output: &Path, stage: &str) -> Result<()> {
    let staged = staged_output_path(output, stage);
    if let Some(parent) = staged.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory '{}'", parent.display()))?;
    }
    let mut file =
        File::create(&staged).with_context(|| format!("creating {}", staged.display()))?;
    match extension(&staged).as_deref() {
        #[cfg(feature = "parquet")]
        Some("parquet") => ParquetWriter::new(&mut file)
            .finish(df)
            .map(|_| ())
            .context("writing Parquet file")?,
        #[cfg(not(feature = "parquet"))]
        Some("parquet") => {
            return Err(anyhow!(
                "parquet support is disabled; rebuild with the 'parquet' feature"
            ))
        }
        Some("csv") => CsvWriter::new(&mut file)
            .finish(df)
            .context("writing CSV file")?,
        _ => {
            return Err(anyhow!(
                "unsupported output extension for {}; use .csv or .parquet",
                output.display()
            ))
        }
    }
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory '{}'", parent.display()))?;
    }
    fs::copy(&staged, output)
        .with_context(|| format!("copying {} to {}", staged.display(), output.display()))?;
    Ok(())
}

fn loss_column(
    rows: &[EnergyLedgerRow],
    name: &str,
    pick: impl Fn(&LossBreakdown) -> f64,
) -> Series {
    let values: Vec<Option<f64>> = rows.iter().map(|r| r.losses.as_ref().map(&pick)).collect();
    Series::new(name, values)
}

/// One row per (turbine, bin), losses flattened into `loss_*` columns.
pub fn ledger_frame(rows: &[EnergyLedgerRow]) -> Result<DataFrame> {
    let turbine: Vec<i64> = rows.iter().map(|r| r.turbine_id.value()).collect();
    let timestamp: Vec<String> = rows
        .iter()
        .map(|r| r.timestamp.format(TIMESTAMP_FORMAT).to_string())
        .collect();
    let operational: Vec<bool> = rows.iter().map(|r| r.operational).collect();
    let produced: Vec<Option<f64>> = rows.iter().map(|r| r.produced_energy).collect();
    let potential: Vec<Option<f64>> = rows.iter().map(|r| r.potential_energy).collect();
    let method: Vec<Option<&str>> = rows
        .iter()
        .map(|r| r.potential_method.as_ref().map(PotentialMethod::as_str))
        .collect();
    let category: Vec<Option<&str>> = rows
        .iter()
        .map(|r| r.loss_category.as_ref().map(LossCategory::as_str))
        .collect();
    let alarm_text: Vec<&str> = rows.iter().map(|r| r.alarm_text.as_str()).collect();
    let plain = |f: fn(&EnergyLedgerRow) -> f64| rows.iter().map(f).collect::<Vec<f64>>();
    let optional =
        |f: fn(&EnergyLedgerRow) -> Option<f64>| rows.iter().map(f).collect::<Vec<Option<f64>>>();

    DataFrame::new(vec![
        Series::new("turbine_id", turbine),
        Series::new("timestamp", timestamp),
        Series::new("operational", operational),
        Series::new("produced_energy", produced),
        Series::new("potential_energy", potential),
        Series::new("potential_method", method),
        loss_column(rows, "loss_total", |l| l.total),
        loss_column(rows, "loss_type0", |l| l.type0),
        loss_column(rows, "loss_type1", |l| l.type1),
        loss_column(rows, "loss_curtailment", |l| l.curtailment),
        loss_column(rows, "loss_local_power_limit", |l| l.local_power_limit),
        loss_column(rows, "loss_low_wind", |l| l.low_wind),
        loss_column(rows, "loss_low_wind_recovery", |l| l.low_wind_recovery),
        loss_column(rows, "loss_post_alarm_recovery", |l| l.post_alarm_recovery),
        loss_column(rows, "loss_misassigned", |l| l.misassigned),
        loss_column(rows, "loss_unattributed", |l| l.unattributed),
        Series::new("loss_category", category),
        Series::new("alarm_secs", plain(|r| r.alarm_secs)),
        Series::new("type0_secs", plain(|r| r.type0_secs)),
        Series::new("type1_secs", plain(|r| r.type1_secs)),
        Series::new("local_power_limit_secs", plain(|r| r.local_power_limit_secs)),
        Series::new("alarm_text", alarm_text),
        Series::new("wind_speed", optional(|r| r.wind_speed)),
        Series::new("power_min", optional(|r| r.power_min)),
        Series::new("power_max", optional(|r| r.power_max)),
        Series::new("curtailment_secs", optional(|r| r.curtailment_secs)),
        Series::new("met_wind_speed", optional(|r| r.met_wind_speed)),
    ])
    .context("building ledger frame")
}

pub fn summary_frame(summaries: &[AvailabilitySummary]) -> Result<DataFrame> {
    let col = |f: fn(&AvailabilitySummary) -> f64| summaries.iter().map(f).collect::<Vec<f64>>();
    let count =
        |f: fn(&AvailabilitySummary) -> usize| summaries.iter().map(|s| f(s) as u64).collect::<Vec<u64>>();
    let ratio = |f: fn(&AvailabilitySummary) -> Option<f64>| {
        summaries.iter().map(f).collect::<Vec<Option<f64>>>()
    };
    let turbine: Vec<i64> = summaries.iter().map(|s| s.turbine_id.value()).collect();

    DataFrame::new(vec![
        Series::new("turbine_id", turbine),
        Series::new("bins", count(|s| s.bins)),
        Series::new("operational_bins", count(|s| s.operational_bins)),
        Series::new("unresolved_bins", count(|s| s.unresolved_bins)),
        Series::new("produced", col(|s| s.produced)),
        Series::new("potential", col(|s| s.potential)),
        Series::new("loss_total", col(|s| s.loss_total)),
        Series::new("loss_type0", col(|s| s.loss_type0)),
        Series::new("loss_type1", col(|s| s.loss_type1)),
        Series::new("loss_curtailment", col(|s| s.loss_curtailment)),
        Series::new("loss_local_power_limit", col(|s| s.loss_local_power_limit)),
        Series::new("loss_low_wind", col(|s| s.loss_low_wind)),
        Series::new("loss_low_wind_recovery", col(|s| s.loss_low_wind_recovery)),
        Series::new("loss_post_alarm_recovery", col(|s| s.loss_post_alarm_recovery)),
        Series::new("loss_misassigned", col(|s| s.loss_misassigned)),
        Series::new("loss_unattributed", col(|s| s.loss_unattributed)),
        Series::new("maa_gross", ratio(|s| s.maa_gross)),
        Series::new("maa_gross_misassigned", ratio(|s| s.maa_gross_misassigned)),
        Series::new("maa_unattributed_adjusted", ratio(|s| s.maa_unattributed_adjusted)),
    ])
    .context("building summary frame")
}

pub fn write_ledger(ledger: &Ledger, output: &Path) -> Result<()> {
    let mut df = ledger_frame(&ledger.rows)?;
    write_frame_staged(&mut df, output, OutputStage::Ledger.as_str())?;
    info!(rows = df.height(), path = %output.display(), "ledger written");
    Ok(())
}

pub fn write_summary(summaries: &[AvailabilitySummary], output: &Path) -> Result<()> {
    let mut df = summary_frame(summaries)?;
    write_frame_staged(&mut df, output, OutputStage::Summary.as_str())?;
    info!(turbines = df.height(), path = %output.display(), "summary written");
    Ok(())
}

pub fn write_diagnostics(diagnostics: &Diagnostics, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory '{}'", parent.display()))?;
    }
    let json =
        serde_json::to_string_pretty(diagnostics).context("serializing diagnostics to JSON")?;
    fs::write(output, json).with_context(|| format!("writing {}", output.display()))?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct LedgerRecord {
    turbine_id: i64,
    timestamp: String,
    operational: bool,
    produced_energy: Option<f64>,
    potential_energy: Option<f64>,
    potential_method: Option<PotentialMethod>,
    loss_total: Option<f64>,
    loss_type0: Option<f64>,
    loss_type1: Option<f64>,
    loss_curtailment: Option<f64>,
    loss_local_power_limit: Option<f64>,
    loss_low_wind: Option<f64>,
    loss_low_wind_recovery: Option<f64>,
    loss_post_alarm_recovery: Option<f64>,
    loss_misassigned: Option<f64>,
    loss_unattributed: Option<f64>,
    loss_category: Option<LossCategory>,
    alarm_secs: f64,
    type0_secs: f64,
    type1_secs: f64,
    local_power_limit_secs: f64,
    #[serde(default)]
    alarm_text: Option<String>,
    wind_speed: Option<f64>,
    power_min: Option<f64>,
    power_max: Option<f64>,
    curtailment_secs: Option<f64>,
    met_wind_speed: Option<f64>,
}

impl LedgerRecord {
    fn losses(&self) -> Option<LossBreakdown> {
        Some(LossBreakdown {
            total: self.loss_total?,
            type0: self.loss_type0?,
            type1: self.loss_type1?,
            curtailment: self.loss_curtailment?,
            local_power_limit: self.loss_local_power_limit?,
            low_wind: self.loss_low_wind?,
            low_wind_recovery: self.loss_low_wind_recovery?,
            post_alarm_recovery: self.loss_post_alarm_recovery?,
            misassigned: self.loss_misassigned?,
            unattributed: self.loss_unattributed?,
        })
    }

    fn into_row(self) -> Result<EnergyLedgerRow> {
        let timestamp = parse_timestamp(&self.timestamp)
            .with_context(|| format!("ledger row for turbine {}", self.turbine_id))?;
        let losses = self.losses();
        Ok(EnergyLedgerRow {
            turbine_id: TurbineId::new(self.turbine_id),
            timestamp,
            operational: self.operational,
            produced_energy: self.produced_energy,
            potential_energy: self.potential_energy,
            potential_method: self.potential_method,
            losses,
            loss_category: self.loss_category,
            alarm_secs: self.alarm_secs,
            type0_secs: self.type0_secs,
            type1_secs: self.type1_secs,
            local_power_limit_secs: self.local_power_limit_secs,
            alarm_text: self.alarm_text.unwrap_or_default(),
            wind_speed: self.wind_speed,
            power_min: self.power_min,
            power_max: self.power_max,
            curtailment_secs: self.curtailment_secs,
            met_wind_speed: self.met_wind_speed,
        })
    }
}

/// Read back a ledger written as CSV by [`write_ledger`].
pub fn read_ledger_csv(path: &Path) -> Result<Vec<EnergyLedgerRow>> {
    if extension(path).as_deref() != Some("csv") {
        return Err(anyhow!(
            "ledger '{}' must be a .csv file to be read back",
            path.display()
        ));
    }
    read_records::<LedgerRecord>(path, "ledger")?
        .into_iter()
        .map(LedgerRecord::into_row)
        .collect()
}
