//! Grid expansion: the full turbine × bin cartesian product with alarms and
//! telemetry left-joined onto it.

use chrono::NaiveDateTime;
use hashbrown::HashMap;
use wfa_core::{
    BinnedAggregate, CounterReading, CurtailmentReading, GridReading, TelemetryTables,
    TurbineId, TurbineReading,
};

use crate::binner::BinnedAlarms;

type Key = (TurbineId, NaiveDateTime);

fn index_by_key<T>(rows: &[T], key: impl Fn(&T) -> Key) -> HashMap<Key, &T> {
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        index.entry(key(row)).or_insert(row);
    }
    index
}

/// Mean wind speed and direction across masts per timestamp. Null values are
/// skipped; a timestamp with no valid value on any mast yields `None`.
pub fn met_means(tables: &TelemetryTables) -> HashMap<NaiveDateTime, (Option<f64>, Option<f64>)> {
    #[derive(Default)]
    struct Acc {
        speed_sum: f64,
        speed_n: usize,
        dir_sum: f64,
        dir_n: usize,
    }

    let mut acc: HashMap<NaiveDateTime, Acc> = HashMap::new();
    for m in &tables.met {
        let entry = acc.entry(m.timestamp).or_default();
        if let Some(v) = m.wind_speed {
            entry.speed_sum += v;
            entry.speed_n += 1;
        }
        if let Some(v) = m.wind_direction {
            entry.dir_sum += v;
            entry.dir_n += 1;
        }
    }

    acc.into_iter()
        .map(|(ts, a)| {
            let speed = (a.speed_n > 0).then(|| a.speed_sum / a.speed_n as f64);
            let dir = (a.dir_n > 0).then(|| a.dir_sum / a.dir_n as f64);
            (ts, (speed, dir))
        })
        .collect()
}

/// Build exactly `turbines.len() * bins.len()` rows, turbine-major, then
/// chronological. Duplicate telemetry keys keep their first row.
pub fn expand_grid(
    turbines: &[TurbineId],
    bins: &[NaiveDateTime],
    alarms: &BinnedAlarms,
    telemetry: &TelemetryTables,
) -> Vec<BinnedAggregate> {
    let counters = index_by_key(&telemetry.counters, |r: &CounterReading| {
        (r.turbine_id, r.timestamp)
    });
    let grid = index_by_key(&telemetry.grid, |r: &GridReading| (r.turbine_id, r.timestamp));
    let turbine = index_by_key(&telemetry.turbine, |r: &TurbineReading| {
        (r.turbine_id, r.timestamp)
    });
    let curtailment = index_by_key(&telemetry.curtailment, |r: &CurtailmentReading| {
        (r.turbine_id, r.timestamp)
    });
    let met = met_means(telemetry);

    let mut rows = Vec::with_capacity(turbines.len() * bins.len());
    for &turbine_id in turbines {
        for &timestamp in bins {
            let key = (turbine_id, timestamp);
            let mut row = BinnedAggregate {
                turbine_id,
                timestamp,
                ..BinnedAggregate::default()
            };

            if let Some(bin) = alarms.get(turbine_id, timestamp) {
                row.alarm_secs = bin.alarm_secs;
                row.type0_secs = bin.type0_secs;
                row.type1_secs = bin.type1_secs;
                row.local_power_limit_secs = bin.local_power_limit_secs;
                row.alarm_text = bin.alarm_text();
            }
            if let Some(c) = counters.get(&key) {
                row.produced_energy = Some(c.energy_kwh);
                row.net_energy = c.net_energy_kwh;
            }
            if let Some(g) = grid.get(&key) {
                row.power_min = Some(g.power_min_kw);
                row.power_max = Some(g.power_max_kw);
                row.power_mean = Some(g.power_mean_kw);
            }
            if let Some(t) = turbine.get(&key) {
                row.wind_speed = Some(t.wind_speed);
                row.wind_direction = Some(t.wind_direction);
            }
            if let Some(c) = curtailment.get(&key) {
                row.curtailment_secs = Some(c.power_reduction_secs);
            }
            if let Some(&(speed, dir)) = met.get(&timestamp) {
                row.met_wind_speed = speed;
                row.met_wind_direction = dir;
            }

            rows.push(row);
        }
    }
    rows
}
