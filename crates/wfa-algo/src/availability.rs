//! Per-turbine availability summary.
//!
//! Sums the ledger per turbine and derives the contractual availability
//! ratios. With `Ep` produced energy, `L0` the type0 loss before the
//! misassignment correction and `Lmis` the misassigned share:
//!
//! - `maa_gross = 100·(Ep + L0) / (Ep + L0 + L1 + Llpl + Lcurt)`
//! - `maa_gross_misassigned = 100·(Ep + L0 − Lmis) / (Ep + (L0 − Lmis) + (L1 + Llpl + Lcurt + Lmis))`
//! - `maa_unattributed_adjusted = 100·(Ep + L0) / (Ep + Ltotal − (Llw + Llwr + Lpar))`
//!
//! A ratio with a zero denominator is `None`.

use serde::Serialize;
use wfa_core::{EnergyLedgerRow, TurbineId};

use crate::engine::Ledger;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AvailabilitySummary {
    pub turbine_id: TurbineId,
    pub bins: usize,
    pub operational_bins: usize,
    pub unresolved_bins: usize,
    pub produced: f64,
    pub potential: f64,
    pub loss_total: f64,
    /// Type0 loss after the misassignment correction
    pub loss_type0: f64,
    pub loss_type1: f64,
    pub loss_curtailment: f64,
    pub loss_local_power_limit: f64,
    pub loss_low_wind: f64,
    pub loss_low_wind_recovery: f64,
    pub loss_post_alarm_recovery: f64,
    pub loss_misassigned: f64,
    pub loss_unattributed: f64,
    pub maa_gross: Option<f64>,
    pub maa_gross_misassigned: Option<f64>,
    pub maa_unattributed_adjusted: Option<f64>,
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator != 0.0).then(|| 100.0 * numerator / denominator)
}

impl AvailabilitySummary {
    fn accumulate(&mut self, row: &EnergyLedgerRow) {
        self.bins += 1;
        if row.operational {
            self.operational_bins += 1;
        }
        self.produced += row.produced_energy.unwrap_or(0.0);
        match (row.potential_energy, row.losses) {
            (Some(potential), Some(losses)) => {
                self.potential += potential;
                self.loss_total += losses.total;
                self.loss_type0 += losses.type0;
                self.loss_type1 += losses.type1;
                self.loss_curtailment += losses.curtailment;
                self.loss_local_power_limit += losses.local_power_limit;
                self.loss_low_wind += losses.low_wind;
                self.loss_low_wind_recovery += losses.low_wind_recovery;
                self.loss_post_alarm_recovery += losses.post_alarm_recovery;
                self.loss_misassigned += losses.misassigned;
                self.loss_unattributed += losses.unattributed;
            }
            _ => self.unresolved_bins += 1,
        }
    }

    fn finish(&mut self) {
        let ep = self.produced;
        let l0 = self.loss_type0 + self.loss_misassigned;
        let l1 = self.loss_type1;
        let lmis = self.loss_misassigned;
        let external = self.loss_local_power_limit + self.loss_curtailment;

        self.maa_gross = ratio(ep + l0, ep + l0 + l1 + external);
        self.maa_gross_misassigned =
            ratio(ep + l0 - lmis, ep + (l0 - lmis) + (l1 + external + lmis));
        let explained_by_wind =
            self.loss_low_wind + self.loss_low_wind_recovery + self.loss_post_alarm_recovery;
        self.maa_unattributed_adjusted = ratio(ep + l0, ep + self.loss_total - explained_by_wind);
    }
}

/// One summary per turbine in ledger order.
pub fn summarize(ledger: &Ledger) -> Vec<AvailabilitySummary> {
    summarize_rows(&ledger.rows)
}

/// Same as [`summarize`] for a bare row slice.
pub fn summarize_rows(rows: &[EnergyLedgerRow]) -> Vec<AvailabilitySummary> {
    let mut out: Vec<AvailabilitySummary> = Vec::new();
    for row in rows {
        match out.last_mut() {
            Some(current) if current.turbine_id == row.turbine_id => current.accumulate(row),
            _ => {
                let mut summary = AvailabilitySummary {
                    turbine_id: row.turbine_id,
                    ..AvailabilitySummary::default()
                };
                summary.accumulate(row);
                out.push(summary);
            }
        }
    }
    out.iter_mut().for_each(AvailabilitySummary::finish);
    out
}

/// Farm-wide totals with the same ratios.
pub fn farm_total(summaries: &[AvailabilitySummary]) -> AvailabilitySummary {
    let mut total = AvailabilitySummary::default();
    for s in summaries {
        total.bins += s.bins;
        total.operational_bins += s.operational_bins;
        total.unresolved_bins += s.unresolved_bins;
        total.produced += s.produced;
        total.potential += s.potential;
        total.loss_total += s.loss_total;
        total.loss_type0 += s.loss_type0;
        total.loss_type1 += s.loss_type1;
        total.loss_curtailment += s.loss_curtailment;
        total.loss_local_power_limit += s.loss_local_power_limit;
        total.loss_low_wind += s.loss_low_wind;
        total.loss_low_wind_recovery += s.loss_low_wind_recovery;
        total.loss_post_alarm_recovery += s.loss_post_alarm_recovery;
        total.loss_misassigned += s.loss_misassigned;
        total.loss_unattributed += s.loss_unattributed;
    }
    total.finish();
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wfa_core::{LossBreakdown, PotentialMethod};

    fn ledger_row(turbine: i64, produced: f64, losses: Option<LossBreakdown>) -> EnergyLedgerRow {
        EnergyLedgerRow {
            turbine_id: TurbineId::new(turbine),
            timestamp: NaiveDate::from_ymd_opt(2025, 4, 1)
                .unwrap()
                .and_hms_opt(0, 10, 0)
                .unwrap(),
            operational: losses.is_some_and(|l| l.total == 0.0),
            produced_energy: Some(produced),
            potential_energy: losses.map(|l| produced + l.total),
            potential_method: losses.map(|_| PotentialMethod::Direct),
            losses,
            loss_category: None,
            alarm_secs: 0.0,
            type0_secs: 0.0,
            type1_secs: 0.0,
            local_power_limit_secs: 0.0,
            alarm_text: String::new(),
            wind_speed: None,
            power_min: None,
            power_max: None,
            curtailment_secs: None,
            met_wind_speed: None,
        }
    }

    #[test]
    fn gross_availability_counts_type0_as_available() {
        let rows = vec![
            ledger_row(1, 300.0, Some(LossBreakdown::default())),
            ledger_row(
                1,
                0.0,
                Some(LossBreakdown {
                    total: 100.0,
                    type0: 50.0,
                    type1: 50.0,
                    ..LossBreakdown::default()
                }),
            ),
            ledger_row(2, 0.0, None),
        ];
        let summaries = summarize_rows(&rows);
        assert_eq!(summaries.len(), 2);

        let first = &summaries[0];
        assert_eq!(first.bins, 2);
        assert_eq!(first.operational_bins, 1);
        // (300 + 50) / (300 + 50 + 50)
        assert!((first.maa_gross.unwrap() - 87.5).abs() < 1e-9);
        assert!((first.maa_gross_misassigned.unwrap() - 87.5).abs() < 1e-9);

        let second = &summaries[1];
        assert_eq!(second.unresolved_bins, 1);
        assert_eq!(second.maa_gross, None);
    }

    #[test]
    fn misassigned_moves_to_unavailable_side() {
        let rows = vec![ledger_row(
            1,
            100.0,
            Some(LossBreakdown {
                total: 100.0,
                type0: 0.0,
                misassigned: 100.0,
                ..LossBreakdown::default()
            }),
        )];
        let s = &summarize_rows(&rows)[0];
        assert!((s.maa_gross.unwrap() - 100.0).abs() < 1e-9);
        assert!((s.maa_gross_misassigned.unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn wind_losses_are_excluded_from_adjusted_ratio() {
        let rows = vec![ledger_row(
            1,
            100.0,
            Some(LossBreakdown {
                total: 100.0,
                low_wind: 60.0,
                unattributed: 40.0,
                ..LossBreakdown::default()
            }),
        )];
        let s = &summarize_rows(&rows)[0];
        // (100 + 0) / (100 + 100 - 60)
        assert!((s.maa_unattributed_adjusted.unwrap() - 100.0 * 100.0 / 140.0).abs() < 1e-9);
        let farm = farm_total(&summarize_rows(&rows));
        assert_eq!(farm.maa_unattributed_adjusted, s.maa_unattributed_adjusted);
    }
}
