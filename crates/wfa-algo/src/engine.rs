//! End-to-end ledger computation for one reporting period.
//!
//! ```text
//! telemetry ──► sanity ─────────────────────────────┐
//! alarms ─► normalize ─► cascade ─► blackout split ─► bin ─► grid ─► estimate ─► categorize
//! ```
//!
//! The computation is pure: identical inputs give identical ledgers, and no
//! state survives the call.

use chrono::NaiveDateTime;
use hashbrown::HashMap;
use serde::Serialize;
use tracing::{debug, info, warn};
use wfa_core::{
    AlarmClass, CurveTables, DiagnosticIssue, Diagnostics, EnergyLedgerRow, EngineConfig,
    IssueCategory, LossCategory, RawAlarmEvent, ReportingPeriod, SanityStats, TelemetryTables,
    TurbineId, WfaError, WfaResult,
};
use wfa_ts::{period_bins, BIN_SECS};

use crate::binner::bin_intervals;
use crate::blackout::split_blackouts;
use crate::cascade::cascade;
use crate::categorize::{categorize, RuleInput};
use crate::grid::expand_grid;
use crate::normalize::normalize_alarms;
use crate::potential::{is_operational, peer_snapshots, EstimationContext, PotentialEstimator};
use crate::sanity::apply_sanity;

/// Everything one period's computation reads.
#[derive(Debug, Clone)]
pub struct LedgerInputs {
    pub period: ReportingPeriod,
    pub alarms: Vec<RawAlarmEvent>,
    pub classification: Vec<AlarmClass>,
    pub telemetry: TelemetryTables,
    pub curves: CurveTables,
}

/// A row whose potential energy no estimation tier could provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnresolvedRow {
    pub turbine_id: TurbineId,
    pub timestamp: NaiveDateTime,
}

impl UnresolvedRow {
    pub fn to_error(&self) -> WfaError {
        WfaError::UnresolvedPotentialEnergy {
            turbine: self.turbine_id,
            timestamp: self.timestamp,
        }
    }
}

/// Result of [`compute_ledger`].
#[derive(Debug, Clone)]
pub struct Ledger {
    pub period: ReportingPeriod,
    /// Turbine-major, then chronological
    pub rows: Vec<EnergyLedgerRow>,
    pub diagnostics: Diagnostics,
    pub sanity: SanityStats,
    pub unresolved: Vec<UnresolvedRow>,
}

impl Ledger {
    /// Fails on the first row without a potential energy.
    pub fn ensure_resolved(&self) -> WfaResult<()> {
        match self.unresolved.first() {
            Some(row) => Err(row.to_error()),
            None => Ok(()),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

fn require_non_empty<T>(rows: &[T], table: &str) -> WfaResult<()> {
    if rows.is_empty() {
        Err(WfaError::missing_input(table))
    } else {
        Ok(())
    }
}

/// Compute the energy-loss ledger for one period.
///
/// Fatal conditions (invalid configuration, a missing required table, an
/// overlap surviving the blackout split) return `Err` with no partial
/// ledger. Rows no estimation tier could resolve are returned with
/// `potential_energy = None` and listed in [`Ledger::unresolved`].
pub fn compute_ledger(inputs: &LedgerInputs, config: &EngineConfig) -> WfaResult<Ledger> {
    config.validate()?;
    require_non_empty(&inputs.classification, "classification")?;
    require_non_empty(&inputs.telemetry.counters, "counters")?;
    require_non_empty(&inputs.telemetry.grid, "grid")?;
    require_non_empty(&inputs.telemetry.turbine, "turbine")?;

    let period = inputs.period;
    if period.end <= period.start {
        return Err(WfaError::Config(format!(
            "period end {} is not after start {}",
            period.end, period.start
        )));
    }
    let turbines = config.farm.turbines();
    let bins = period_bins(&period, BIN_SECS);
    info!(
        period = %period.label(),
        turbines = turbines.len(),
        bins = bins.len(),
        "computing ledger"
    );

    let mut diagnostics = Diagnostics::new();

    // Telemetry
    let sanity = apply_sanity(&inputs.telemetry, &config.sanity, &mut diagnostics);
    info!(
        dropped = sanity.stats.total_dropped(),
        met_nulled = sanity.stats.met_values_nulled,
        met_stuck = sanity.stats.met_values_stuck,
        "sanity filter applied"
    );

    // Alarms
    let normalized = normalize_alarms(
        &inputs.alarms,
        &inputs.classification,
        &period,
        &turbines,
        &config.alarms,
        &mut diagnostics,
    );
    let effective = split_blackouts(cascade(normalized.classified), config.alarms.blackout_code)?;
    let local_power_limit: Vec<_> = cascade(normalized.local_power_limit)
        .into_iter()
        .filter(|iv| !iv.is_zero_length())
        .collect();
    info!(
        effective = effective.len(),
        local_power_limit = local_power_limit.len(),
        "alarm intervals resolved"
    );

    let binned = bin_intervals(effective.iter().chain(local_power_limit.iter()), BIN_SECS);
    debug!(bins = binned.len(), "alarm seconds binned");

    let rows = expand_grid(&turbines, &bins, &binned, &sanity.telemetry);

    // Estimation
    let operational: Vec<bool> = rows
        .iter()
        .map(|r| is_operational(r, &config.thresholds))
        .collect();
    let peers = peer_snapshots(&rows, &operational);
    let estimator = PotentialEstimator::from_config(config, &inputs.curves, period.month());
    debug!(tiers = ?estimator.methods(), "estimation chain");

    let estimates: Vec<_> = rows
        .iter()
        .zip(&operational)
        .map(|(row, &op)| {
            let ctx = EstimationContext {
                operational: op,
                peers: peers.get(&row.timestamp),
            };
            estimator.estimate(row, &ctx)
        })
        .collect();

    // Categorisation
    let bin_count = bins.len();
    let mut ledger_rows = Vec::with_capacity(rows.len());
    let mut unresolved = Vec::new();
    let mut unresolved_per_turbine: HashMap<TurbineId, usize> = HashMap::new();

    for (t_idx, turbine_id) in turbines.iter().enumerate() {
        let mut previous_category: Option<LossCategory> = None;
        for b_idx in 0..bin_count {
            let i = t_idx * bin_count + b_idx;
            let row = &rows[i];
            let input = RuleInput {
                row,
                prev_turbine: t_idx.checked_sub(1).map(|p| &rows[p * bin_count + b_idx]),
                next_turbine: (t_idx + 1 < turbines.len())
                    .then(|| &rows[(t_idx + 1) * bin_count + b_idx]),
                previous_bin: b_idx.checked_sub(1).map(|p| &rows[t_idx * bin_count + p]),
                previous_category,
                thresholds: &config.thresholds,
            };

            let (potential, method, losses, category) = match estimates[i] {
                Some(est) => {
                    let (losses, category) = categorize(&input, est.value, &config.alarms);
                    (Some(est.value), Some(est.method), Some(losses), category)
                }
                None => {
                    unresolved.push(UnresolvedRow {
                        turbine_id: *turbine_id,
                        timestamp: row.timestamp,
                    });
                    *unresolved_per_turbine.entry(*turbine_id).or_insert(0) += 1;
                    (None, None, None, None)
                }
            };
            previous_category = category;

            ledger_rows.push(EnergyLedgerRow {
                turbine_id: row.turbine_id,
                timestamp: row.timestamp,
                operational: operational[i],
                produced_energy: row.produced_energy,
                potential_energy: potential,
                potential_method: method,
                losses,
                loss_category: category,
                alarm_secs: row.alarm_secs,
                type0_secs: row.type0_secs,
                type1_secs: row.type1_secs,
                local_power_limit_secs: row.local_power_limit_secs,
                alarm_text: row.alarm_text.clone(),
                wind_speed: row.wind_speed,
                power_min: row.power_min,
                power_max: row.power_max,
                curtailment_secs: row.curtailment_secs,
                met_wind_speed: row.met_wind_speed,
            });
        }
    }

    for turbine_id in &turbines {
        if let Some(count) = unresolved_per_turbine.get(turbine_id) {
            let first = unresolved
                .iter()
                .find(|u| u.turbine_id == *turbine_id)
                .map(|u| u.timestamp);
            warn!(turbine = %turbine_id, bins = count, "potential energy unresolved");
            let mut issue = DiagnosticIssue::error(
                IssueCategory::Estimation,
                format!("{count} bin(s) with no applicable estimation tier"),
            )
            .about(format!("turbine {turbine_id}"));
            if let Some(ts) = first {
                issue = issue.at(ts);
            }
            diagnostics.push(issue);
        }
    }

    info!(
        rows = ledger_rows.len(),
        unresolved = unresolved.len(),
        diagnostics = %diagnostics.summary(),
        "ledger computed"
    );

    Ok(Ledger {
        period,
        rows: ledger_rows,
        diagnostics,
        sanity: sanity.stats,
        unresolved,
    })
}
