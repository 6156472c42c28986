//! Sanity filter for raw telemetry.
//!
//! Turbine-keyed tables lose whole rows that fall outside the configured
//! physical ranges. Met-mast readings are kept and only the offending value
//! is nulled, both for out-of-range values and for frozen sensors (a run of
//! identical values on one mast).

use tracing::{debug, warn};
use wfa_core::{
    CounterReading, CurtailmentReading, DiagnosticIssue, Diagnostics, GridReading, IssueCategory,
    MetReading, SanityConfig, SanityStats, TelemetryTables, TurbineReading, WfaError,
};

/// Telemetry after filtering, with per-table counts.
#[derive(Debug, Clone)]
pub struct SanityOutcome {
    pub telemetry: TelemetryTables,
    pub stats: SanityStats,
}

pub fn grid_in_range(row: &GridReading, config: &SanityConfig) -> bool {
    config.power_kw.contains(row.power_min_kw)
        && config.power_kw.contains(row.power_max_kw)
        && config.power_kw.contains(row.power_mean_kw)
}

pub fn counter_in_range(row: &CounterReading, config: &SanityConfig) -> bool {
    config.energy_kwh.contains(row.energy_kwh)
        && row
            .net_energy_kwh
            .map_or(true, |net| config.net_energy_kwh.contains(net))
}

pub fn turbine_in_range(row: &TurbineReading, config: &SanityConfig) -> bool {
    config.wind_speed.contains(row.wind_speed) && config.wind_direction.contains(row.wind_direction)
}

pub fn curtailment_in_range(row: &CurtailmentReading, config: &SanityConfig) -> bool {
    config.curtailment_secs.contains(row.power_reduction_secs)
}

fn keep_in_range<T: Clone>(
    rows: &[T],
    table: &str,
    pred: impl Fn(&T) -> bool,
    diagnostics: &mut Diagnostics,
) -> (Vec<T>, usize) {
    let kept: Vec<T> = rows.iter().filter(|r| pred(r)).cloned().collect();
    let dropped = rows.len() - kept.len();
    if dropped > 0 {
        let finding = WfaError::DataRange {
            table: table.to_string(),
            dropped,
        };
        warn!(table, dropped, "sanity filter dropped rows");
        diagnostics.push(
            DiagnosticIssue::warning(IssueCategory::Sanity, finding.to_string())
                .about(format!("table {table}")),
        );
    }
    (kept, dropped)
}

/// Marks members of runs of at least `min_run` consecutive equal values.
/// `None` breaks a run and is never marked.
pub fn stuck_mask(values: &[Option<f64>], min_run: usize) -> Vec<bool> {
    let mut mask = vec![false; values.len()];
    let mut run_start = 0;
    for i in 1..=values.len() {
        let continues = i < values.len()
            && matches!((values[i - 1], values[i]), (Some(a), Some(b)) if a == b);
        if !continues {
            let run_len = i - run_start;
            if run_len >= min_run && values[run_start].is_some() {
                mask[run_start..i].iter_mut().for_each(|m| *m = true);
            }
            run_start = i;
        }
    }
    mask
}

/// Null stuck and out-of-range met values in place. Returns
/// `(nulled_out_of_range, nulled_stuck)`.
fn clean_met(
    met: &mut [MetReading],
    config: &SanityConfig,
    diagnostics: &mut Diagnostics,
) -> (usize, usize) {
    met.sort_by(|a, b| {
        a.mast_id
            .cmp(&b.mast_id)
            .then(a.timestamp.cmp(&b.timestamp))
    });

    let mut stuck = 0;
    let mut start = 0;
    while start < met.len() {
        let mast = met[start].mast_id;
        let end = start + met[start..].iter().take_while(|m| m.mast_id == mast).count();
        let block = &mut met[start..end];

        let speeds: Vec<Option<f64>> = block.iter().map(|m| m.wind_speed).collect();
        let dirs: Vec<Option<f64>> = block.iter().map(|m| m.wind_direction).collect();
        let speed_mask = stuck_mask(&speeds, config.met_stuck_intervals);
        let dir_mask = stuck_mask(&dirs, config.met_stuck_intervals);

        let mut mast_stuck = 0;
        for (i, reading) in block.iter_mut().enumerate() {
            if speed_mask[i] {
                reading.wind_speed = None;
                mast_stuck += 1;
            }
            if dir_mask[i] {
                reading.wind_direction = None;
                mast_stuck += 1;
            }
        }
        if mast_stuck > 0 {
            warn!(mast = %mast, values = mast_stuck, "stuck met-mast values nulled");
            diagnostics.push(
                DiagnosticIssue::warning(
                    IssueCategory::Stuck,
                    format!("{mast_stuck} stuck value(s) replaced with null"),
                )
                .about(format!("mast {mast}")),
            );
        }
        stuck += mast_stuck;
        start = end;
    }

    let mut nulled = 0;
    for reading in met.iter_mut() {
        if reading
            .wind_speed
            .is_some_and(|v| !config.wind_speed.contains(v))
        {
            reading.wind_speed = None;
            nulled += 1;
        }
        if reading
            .wind_direction
            .is_some_and(|v| !config.wind_direction.contains(v))
        {
            reading.wind_direction = None;
            nulled += 1;
        }
    }
    if nulled > 0 {
        warn!(values = nulled, "out-of-range met-mast values nulled");
        diagnostics.push(
            DiagnosticIssue::warning(
                IssueCategory::Sanity,
                format!("{nulled} met value(s) outside physical limits replaced with null"),
            )
            .about("table met"),
        );
    }

    (nulled, stuck)
}

/// Apply every plausibility check to one period's telemetry.
pub fn apply_sanity(
    tables: &TelemetryTables,
    config: &SanityConfig,
    diagnostics: &mut Diagnostics,
) -> SanityOutcome {
    let (grid, grid_dropped) =
        keep_in_range(&tables.grid, "grid", |r| grid_in_range(r, config), diagnostics);
    let (counters, counter_dropped) = keep_in_range(
        &tables.counters,
        "counters",
        |r| counter_in_range(r, config),
        diagnostics,
    );
    let (turbine, turbine_dropped) = keep_in_range(
        &tables.turbine,
        "turbine",
        |r| turbine_in_range(r, config),
        diagnostics,
    );
    let (curtailment, curtailment_dropped) = keep_in_range(
        &tables.curtailment,
        "curtailment",
        |r| curtailment_in_range(r, config),
        diagnostics,
    );

    let mut met = tables.met.clone();
    let (met_values_nulled, met_values_stuck) = clean_met(&mut met, config, diagnostics);

    let stats = SanityStats {
        grid_dropped,
        counter_dropped,
        turbine_dropped,
        curtailment_dropped,
        met_values_nulled,
        met_values_stuck,
    };
    debug!(?stats, "sanity filter finished");

    SanityOutcome {
        telemetry: TelemetryTables {
            counters,
            grid,
            turbine,
            met,
            curtailment,
        },
        stats,
    }
}
