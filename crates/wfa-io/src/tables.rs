//! CSV loaders for the engine's input tables.
//!
//! Every table is a headered CSV. Timestamps are `YYYY-MM-DD HH:MM:SS`
//! (a `T` separator is accepted too). Empty cells in optional columns load
//! as missing values.
//!
//! | File | Columns |
//! |------|---------|
//! | `alarms.csv` | id, turbine_id, alarm_code, time_on, time_off, parameter |
//! | `alarm_classification.csv` | alarm_code, error_type, description |
//! | `counters.csv` | turbine_id, timestamp, energy_kwh, net_energy_kwh |
//! | `grid.csv` | turbine_id, timestamp, power_min_kw, power_max_kw, power_mean_kw |
//! | `turbine.csv` | turbine_id, timestamp, wind_speed, wind_direction |
//! | `met.csv` | mast_id, timestamp, wind_speed, wind_direction |
//! | `curtailment.csv` | turbine_id, timestamp, power_reduction_secs |
//! | `power_curve.csv` | wind_speed, power_kw |
//! | `seasonal_factors.csv` | month, factor |
//! | `wind_distribution.csv` | wind_speed, weight |

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use wfa_core::{
    AlarmClass, AlarmId, CounterReading, CurtailmentReading, CurveTables, GridReading, MastId,
    MetReading, PowerCurvePoint, RawAlarmEvent, SeasonalFactor, TablesConfig, TelemetryTables,
    TurbineId, TurbineReading, WindDistributionBin,
};

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Input table and its default file name inside a data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Alarms,
    Classification,
    Counters,
    Grid,
    Turbine,
    Met,
    Curtailment,
    PowerCurve,
    SeasonalFactors,
    WindDistribution,
}

impl Table {
    pub fn file_name(&self) -> &'static str {
        match self {
            Table::Alarms => "alarms.csv",
            Table::Classification => "alarm_classification.csv",
            Table::Counters => "counters.csv",
            Table::Grid => "grid.csv",
            Table::Turbine => "turbine.csv",
            Table::Met => "met.csv",
            Table::Curtailment => "curtailment.csv",
            Table::PowerCurve => "power_curve.csv",
            Table::SeasonalFactors => "seasonal_factors.csv",
            Table::WindDistribution => "wind_distribution.csv",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Alarms => "alarms",
            Table::Classification => "classification",
            Table::Counters => "counters",
            Table::Grid => "grid",
            Table::Turbine => "turbine",
            Table::Met => "met",
            Table::Curtailment => "curtailment",
            Table::PowerCurve => "power_curve",
            Table::SeasonalFactors => "seasonal_factors",
            Table::WindDistribution => "wind_distribution",
        }
    }
}

pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let trimmed = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| anyhow!("unrecognised timestamp '{}'", raw))
}

fn parse_optional_timestamp(raw: Option<&str>) -> Result<Option<NaiveDateTime>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_timestamp(value).map(Some),
    }
}

/// Deserialize every record of a headered CSV.
pub fn read_records<R: DeserializeOwned>(path: &Path, table: &str) -> Result<Vec<R>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {} CSV '{}'", table, path.display()))?;
    let mut out = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let record: R = result.with_context(|| {
            format!("parsing {} record {} in '{}'", table, line + 1, path.display())
        })?;
        out.push(record);
    }
    debug!(table, rows = out.len(), path = %path.display(), "table loaded");
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct AlarmRecord {
    id: i64,
    turbine_id: i64,
    alarm_code: i64,
    time_on: String,
    #[serde(default)]
    time_off: Option<String>,
    #[serde(default)]
    parameter: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CounterRecord {
    turbine_id: i64,
    timestamp: String,
    energy_kwh: f64,
    #[serde(default)]
    net_energy_kwh: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GridRecord {
    turbine_id: i64,
    timestamp: String,
    power_min_kw: f64,
    power_max_kw: f64,
    power_mean_kw: f64,
}

#[derive(Debug, Deserialize)]
struct TurbineRecord {
    turbine_id: i64,
    timestamp: String,
    wind_speed: f64,
    wind_direction: f64,
}

#[derive(Debug, Deserialize)]
struct CurtailmentRecord {
    turbine_id: i64,
    timestamp: String,
    power_reduction_secs: f64,
}

#[derive(Debug, Deserialize)]
struct MetRecord {
    mast_id: i64,
    timestamp: String,
    #[serde(default)]
    wind_speed: Option<f64>,
    #[serde(default)]
    wind_direction: Option<f64>,
}

pub fn load_alarms(path: &Path) -> Result<Vec<RawAlarmEvent>> {
    read_records::<AlarmRecord>(path, Table::Alarms.as_str())?
        .into_iter()
        .map(|r| {
            Ok(RawAlarmEvent {
                id: AlarmId::new(r.id),
                turbine_id: TurbineId::new(r.turbine_id),
                alarm_code: r.alarm_code,
                time_on: parse_timestamp(&r.time_on)
                    .with_context(|| format!("alarm {} time_on", r.id))?,
                time_off: parse_optional_timestamp(r.time_off.as_deref())
                    .with_context(|| format!("alarm {} time_off", r.id))?,
                parameter: r.parameter.unwrap_or_default(),
            })
        })
        .collect()
}

pub fn load_classification(path: &Path) -> Result<Vec<AlarmClass>> {
    read_records(path, Table::Classification.as_str())
}

fn turbine_timestamp(raw: &str, table: Table, turbine_id: i64) -> Result<NaiveDateTime> {
    parse_timestamp(raw).with_context(|| format!("{} row for turbine {}", table.as_str(), turbine_id))
}

pub fn load_counters(path: &Path) -> Result<Vec<CounterReading>> {
    read_records::<CounterRecord>(path, Table::Counters.as_str())?
        .into_iter()
        .map(|r| {
            Ok(CounterReading {
                turbine_id: TurbineId::new(r.turbine_id),
                timestamp: turbine_timestamp(&r.timestamp, Table::Counters, r.turbine_id)?,
                energy_kwh: r.energy_kwh,
                net_energy_kwh: r.net_energy_kwh,
            })
        })
        .collect()
}

pub fn load_grid(path: &Path) -> Result<Vec<GridReading>> {
    read_records::<GridRecord>(path, Table::Grid.as_str())?
        .into_iter()
        .map(|r| {
            Ok(GridReading {
                turbine_id: TurbineId::new(r.turbine_id),
                timestamp: turbine_timestamp(&r.timestamp, Table::Grid, r.turbine_id)?,
                power_min_kw: r.power_min_kw,
                power_max_kw: r.power_max_kw,
                power_mean_kw: r.power_mean_kw,
            })
        })
        .collect()
}

pub fn load_turbine(path: &Path) -> Result<Vec<TurbineReading>> {
    read_records::<TurbineRecord>(path, Table::Turbine.as_str())?
        .into_iter()
        .map(|r| {
            Ok(TurbineReading {
                turbine_id: TurbineId::new(r.turbine_id),
                timestamp: turbine_timestamp(&r.timestamp, Table::Turbine, r.turbine_id)?,
                wind_speed: r.wind_speed,
                wind_direction: r.wind_direction,
            })
        })
        .collect()
}

pub fn load_curtailment(path: &Path) -> Result<Vec<CurtailmentReading>> {
    read_records::<CurtailmentRecord>(path, Table::Curtailment.as_str())?
        .into_iter()
        .map(|r| {
            Ok(CurtailmentReading {
                turbine_id: TurbineId::new(r.turbine_id),
                timestamp: turbine_timestamp(&r.timestamp, Table::Curtailment, r.turbine_id)?,
                power_reduction_secs: r.power_reduction_secs,
            })
        })
        .collect()
}

pub fn load_met(path: &Path) -> Result<Vec<MetReading>> {
    read_records::<MetRecord>(path, Table::Met.as_str())?
        .into_iter()
        .map(|r| {
            Ok(MetReading {
                mast_id: MastId::new(r.mast_id),
                timestamp: parse_timestamp(&r.timestamp)
                    .with_context(|| format!("met row for mast {}", r.mast_id))?,
                wind_speed: r.wind_speed,
                wind_direction: r.wind_direction,
            })
        })
        .collect()
}

pub fn load_power_curve(path: &Path) -> Result<Vec<PowerCurvePoint>> {
    read_records(path, Table::PowerCurve.as_str())
}

pub fn load_seasonal_factors(path: &Path) -> Result<Vec<SeasonalFactor>> {
    let factors: Vec<SeasonalFactor> = read_records(path, Table::SeasonalFactors.as_str())?;
    if let Some(bad) = factors.iter().find(|f| !(1..=12).contains(&f.month)) {
        return Err(anyhow!(
            "seasonal factor for month {} in '{}' is not a calendar month",
            bad.month,
            path.display()
        ));
    }
    Ok(factors)
}

pub fn load_wind_distribution(path: &Path) -> Result<Vec<WindDistributionBin>> {
    read_records(path, Table::WindDistribution.as_str())
}

/// Input tables laid out as the default file names in one directory.
///
/// Absent files load as empty tables; the engine decides which tables are
/// required and reports `MissingInput` for those.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, table: Table) -> PathBuf {
        self.root.join(table.file_name())
    }

    fn load_or_empty<R>(
        &self,
        path: PathBuf,
        table: Table,
        load: fn(&Path) -> Result<Vec<R>>,
    ) -> Result<Vec<R>> {
        if path.exists() {
            load(&path)
        } else {
            debug!(table = table.as_str(), path = %path.display(), "table file absent");
            Ok(Vec::new())
        }
    }

    pub fn alarms(&self) -> Result<Vec<RawAlarmEvent>> {
        self.load_or_empty(self.path(Table::Alarms), Table::Alarms, load_alarms)
    }

    pub fn classification(&self) -> Result<Vec<AlarmClass>> {
        self.load_or_empty(
            self.path(Table::Classification),
            Table::Classification,
            load_classification,
        )
    }

    pub fn telemetry(&self) -> Result<TelemetryTables> {
        Ok(TelemetryTables {
            counters: self.load_or_empty(self.path(Table::Counters), Table::Counters, load_counters)?,
            grid: self.load_or_empty(self.path(Table::Grid), Table::Grid, load_grid)?,
            turbine: self.load_or_empty(self.path(Table::Turbine), Table::Turbine, load_turbine)?,
            met: self.load_or_empty(self.path(Table::Met), Table::Met, load_met)?,
            curtailment: self.load_or_empty(
                self.path(Table::Curtailment),
                Table::Curtailment,
                load_curtailment,
            )?,
        })
    }

    /// Curve tables from the configured paths, falling back to the default
    /// file names in this directory.
    pub fn curves(&self, tables: &TablesConfig) -> Result<CurveTables> {
        let pick = |configured: &Option<PathBuf>, table: Table| {
            configured.clone().unwrap_or_else(|| self.path(table))
        };
        Ok(CurveTables {
            power_curve: self.load_or_empty(
                pick(&tables.power_curve, Table::PowerCurve),
                Table::PowerCurve,
                load_power_curve,
            )?,
            seasonal_factors: self.load_or_empty(
                pick(&tables.seasonal_factors, Table::SeasonalFactors),
                Table::SeasonalFactors,
                load_seasonal_factors,
            )?,
            wind_distribution: self.load_or_empty(
                pick(&tables.wind_distribution, Table::WindDistribution),
                Table::WindDistribution,
                load_wind_distribution,
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn timestamps_accept_both_separators() {
        let a = parse_timestamp("2025-04-01 00:10:00").unwrap();
        let b = parse_timestamp("2025-04-01T00:10:00").unwrap();
        assert_eq!(a, b);
        assert!(parse_timestamp("01/04/2025").is_err());
    }

    #[test]
    fn alarms_with_open_end_load_as_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alarms.csv");
        fs::write(
            &path,
            "id,turbine_id,alarm_code,time_on,time_off,parameter\n\
             1,2307405,100,2025-04-01 00:00:00,2025-04-01 00:30:00,pitch\n\
             2,2307405,200,2025-04-01 01:00:00,,\n",
        )
        .unwrap();
        let alarms = load_alarms(&path).unwrap();
        assert_eq!(alarms.len(), 2);
        assert_eq!(alarms[0].parameter, "pitch");
        assert!(alarms[0].time_off.is_some());
        assert_eq!(alarms[1].time_off, None);
        assert_eq!(alarms[1].parameter, "");
    }

    #[test]
    fn bad_timestamp_names_the_alarm() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alarms.csv");
        fs::write(
            &path,
            "id,turbine_id,alarm_code,time_on,time_off,parameter\n7,1,100,yesterday,,\n",
        )
        .unwrap();
        let err = load_alarms(&path).unwrap_err();
        assert!(format!("{err:#}").contains("alarm 7"));
    }

    #[test]
    fn optional_columns_may_be_empty_or_absent() {
        let dir = tempdir().unwrap();
        let counters = dir.path().join("counters.csv");
        fs::write(
            &counters,
            "turbine_id,timestamp,energy_kwh\n1,2025-04-01 00:10:00,120.5\n",
        )
        .unwrap();
        let rows = load_counters(&counters).unwrap();
        assert_eq!(rows[0].energy_kwh, 120.5);
        assert_eq!(rows[0].net_energy_kwh, None);

        let met = dir.path().join("met.csv");
        fs::write(
            &met,
            "mast_id,timestamp,wind_speed,wind_direction\n3,2025-04-01 00:10:00,,181\n",
        )
        .unwrap();
        let rows = load_met(&met).unwrap();
        assert_eq!(rows[0].wind_speed, None);
        assert_eq!(rows[0].wind_direction, Some(181.0));
    }

    #[test]
    fn seasonal_month_must_exist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seasonal_factors.csv");
        fs::write(&path, "month,factor\n1,1.2\n13,0.8\n").unwrap();
        assert!(load_seasonal_factors(&path).is_err());
    }

    #[test]
    fn data_dir_treats_absent_files_as_empty() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("grid.csv"),
            "turbine_id,timestamp,power_min_kw,power_max_kw,power_mean_kw\n\
             1,2025-04-01 00:10:00,100,900,500\n",
        )
        .unwrap();
        let data = DataDir::new(dir.path());
        let telemetry = data.telemetry().unwrap();
        assert_eq!(telemetry.grid.len(), 1);
        assert!(telemetry.counters.is_empty());
        assert!(data.alarms().unwrap().is_empty());
        assert!(data.curves(&TablesConfig::default()).unwrap().power_curve.is_empty());
    }
}
