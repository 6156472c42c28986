//! Loss categorisation.
//!
//! A row's loss is first split between type0 and type1 in proportion to
//! their alarm seconds. Whatever is left goes to the first rule in
//! [`LOSS_RULES`] that matches, or stays unattributed. The misassignment
//! correction runs independently on the type0 share.

use wfa_core::{AlarmCodesConfig, BinnedAggregate, LossBreakdown, LossCategory, ThresholdConfig};

/// Everything a rule may look at for one row.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub row: &'a BinnedAggregate,
    /// Previous turbine in roster order, same bin
    pub prev_turbine: Option<&'a BinnedAggregate>,
    /// Next turbine in roster order, same bin
    pub next_turbine: Option<&'a BinnedAggregate>,
    /// Same turbine, previous bin
    pub previous_bin: Option<&'a BinnedAggregate>,
    /// Category the previous bin's remainder went to
    pub previous_category: Option<LossCategory>,
    pub thresholds: &'a ThresholdConfig,
}

impl RuleInput<'_> {
    fn prev_power_min(&self) -> Option<f64> {
        self.prev_turbine.and_then(|r| r.power_min)
    }

    fn next_power_min(&self) -> Option<f64> {
        self.next_turbine.and_then(|r| r.power_min)
    }

    fn prev_alarm(&self) -> f64 {
        self.prev_turbine.map_or(0.0, |r| r.alarm_secs)
    }

    fn next_alarm(&self) -> f64 {
        self.next_turbine.map_or(0.0, |r| r.alarm_secs)
    }

    /// Neighbours show production, or one produces while the other is in
    /// alarm, so the cause is local to this turbine.
    pub fn neighbours_show_local_cause(&self) -> bool {
        let prev_running = self.prev_power_min().is_some_and(|p| p > 0.0);
        let next_running = self.next_power_min().is_some_and(|p| p > 0.0);
        (prev_running && next_running)
            || (prev_running && self.next_alarm() > 0.0)
            || (next_running && self.prev_alarm() > 0.0)
    }

    /// Both neighbours saw more wind than this turbine by the margin, and
    /// one of the three speeds is high enough to matter.
    pub fn wind_drop(&self) -> bool {
        let (Some(ws), Some(prev), Some(next)) = (
            self.row.wind_speed,
            self.prev_turbine.and_then(|r| r.wind_speed),
            self.next_turbine.and_then(|r| r.wind_speed),
        ) else {
            return false;
        };
        let margin = self.thresholds.low_wind_margin;
        let min_speed = self.thresholds.low_wind_min_speed;
        prev - ws > margin
            && next - ws > margin
            && (prev >= min_speed || next >= min_speed || ws >= min_speed)
    }
}

/// A prioritised categorisation rule.
pub struct LossRule {
    pub category: LossCategory,
    pub applies: fn(&RuleInput<'_>) -> bool,
}

fn curtailed(input: &RuleInput<'_>) -> bool {
    input.row.curtailment_secs.is_some_and(|s| s > 0.0)
        && input
            .row
            .power_max
            .is_some_and(|p| p > input.thresholds.curtailment_rated_power_kw)
}

fn local_power_limited(input: &RuleInput<'_>) -> bool {
    input.row.local_power_limit_secs > 0.0
}

fn low_wind(input: &RuleInput<'_>) -> bool {
    input.wind_drop() && input.neighbours_show_local_cause()
}

fn low_wind_recovery(input: &RuleInput<'_>) -> bool {
    input.previous_category == Some(LossCategory::LowWind)
}

fn post_alarm_recovery(input: &RuleInput<'_>) -> bool {
    input.row.alarm_secs == 0.0 && input.previous_bin.is_some_and(|p| p.alarm_secs > 0.0)
}

/// Evaluated top to bottom; the first match takes the whole remainder.
pub const LOSS_RULES: &[LossRule] = &[
    LossRule {
        category: LossCategory::Curtailment,
        applies: curtailed,
    },
    LossRule {
        category: LossCategory::LocalPowerLimit,
        applies: local_power_limited,
    },
    LossRule {
        category: LossCategory::LowWind,
        applies: low_wind,
    },
    LossRule {
        category: LossCategory::LowWindRecovery,
        applies: low_wind_recovery,
    },
    LossRule {
        category: LossCategory::PostAlarmRecovery,
        applies: post_alarm_recovery,
    },
];

/// Category for a positive remainder.
pub fn classify_remainder(input: &RuleInput<'_>, rules: &[LossRule]) -> LossCategory {
    rules
        .iter()
        .find(|rule| (rule.applies)(input))
        .map_or(LossCategory::Unattributed, |rule| rule.category)
}

/// Alarm text names a low-wind stop while neighbours point at a local cause.
pub fn is_misassigned(input: &RuleInput<'_>, codes: &AlarmCodesConfig) -> bool {
    input.row.alarm_text.contains(codes.low_wind_text.as_str())
        && input.neighbours_show_local_cause()
}

/// Split one row's loss. Returns the breakdown and, when a remainder was
/// left after the alarm split, the category that received it.
pub fn categorize(
    input: &RuleInput<'_>,
    potential: f64,
    codes: &AlarmCodesConfig,
) -> (LossBreakdown, Option<LossCategory>) {
    let produced = input.row.produced_energy.unwrap_or(0.0);
    let total = (potential - produced).max(0.0);
    let mut losses = LossBreakdown {
        total,
        ..LossBreakdown::default()
    };

    let alarm_secs = input.row.type0_secs + input.row.type1_secs;
    let remainder = if alarm_secs > 0.0 {
        losses.type0 = total * input.row.type0_secs / alarm_secs;
        losses.type1 = total - losses.type0;
        0.0
    } else {
        total
    };

    let category = (remainder > 0.0).then(|| classify_remainder(input, LOSS_RULES));
    match category {
        Some(LossCategory::Curtailment) => losses.curtailment = remainder,
        Some(LossCategory::LocalPowerLimit) => losses.local_power_limit = remainder,
        Some(LossCategory::LowWind) => losses.low_wind = remainder,
        Some(LossCategory::LowWindRecovery) => losses.low_wind_recovery = remainder,
        Some(LossCategory::PostAlarmRecovery) => losses.post_alarm_recovery = remainder,
        Some(LossCategory::Unattributed) | None => {}
    }

    if losses.type0 > 0.0 && is_misassigned(input, codes) {
        losses.misassigned = losses.type0;
        losses.type0 = 0.0;
    }

    losses.unattributed = losses.total - losses.categorized();
    (losses, category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfa_core::TurbineId;

    fn row(ws: f64, pmin: f64, alarm: f64) -> BinnedAggregate {
        BinnedAggregate {
            turbine_id: TurbineId::new(1),
            wind_speed: Some(ws),
            power_min: Some(pmin),
            power_max: Some(pmin),
            alarm_secs: alarm,
            type0_secs: alarm,
            produced_energy: Some(0.0),
            ..BinnedAggregate::default()
        }
    }

    fn input<'a>(
        row: &'a BinnedAggregate,
        prev: &'a BinnedAggregate,
        next: &'a BinnedAggregate,
        thresholds: &'a ThresholdConfig,
    ) -> RuleInput<'a> {
        RuleInput {
            row,
            prev_turbine: Some(prev),
            next_turbine: Some(next),
            previous_bin: None,
            previous_category: None,
            thresholds,
        }
    }

    #[test]
    fn proportional_alarm_split() {
        let t = ThresholdConfig::default();
        let mut r = row(8.0, 0.0, 0.0);
        r.type0_secs = 200.0;
        r.type1_secs = 400.0;
        r.alarm_secs = 600.0;
        r.produced_energy = Some(10.0);
        let n = row(8.0, 500.0, 0.0);
        let (losses, category) = categorize(&input(&r, &n, &n, &t), 100.0, &AlarmCodesConfig::default());
        assert!((losses.type0 - 30.0).abs() < 1e-9);
        assert!((losses.type1 - 60.0).abs() < 1e-9);
        assert_eq!(category, None);
        assert!(losses.reconciles());
    }

    #[test]
    fn curtailment_wins_over_local_power_limit() {
        let t = ThresholdConfig::default();
        let mut r = row(12.0, 1800.0, 0.0);
        r.power_max = Some(2400.0);
        r.curtailment_secs = Some(300.0);
        r.local_power_limit_secs = 300.0;
        let n = row(12.0, 2000.0, 0.0);
        let (losses, category) = categorize(&input(&r, &n, &n, &t), 50.0, &AlarmCodesConfig::default());
        assert_eq!(category, Some(LossCategory::Curtailment));
        assert_eq!(losses.curtailment, 50.0);
        assert_eq!(losses.unattributed, 0.0);
    }

    #[test]
    fn low_wind_needs_neighbour_evidence() {
        let t = ThresholdConfig::default();
        let r = row(4.0, 0.0, 0.0);
        let producing = row(9.0, 300.0, 0.0);
        let (_, category) = categorize(&input(&r, &producing, &producing, &t), 40.0, &AlarmCodesConfig::default());
        assert_eq!(category, Some(LossCategory::LowWind));

        let idle = row(9.0, 0.0, 600.0);
        let (losses, category) = categorize(&input(&r, &idle, &idle, &t), 40.0, &AlarmCodesConfig::default());
        assert_eq!(category, Some(LossCategory::Unattributed));
        assert_eq!(losses.unattributed, 40.0);
    }

    #[test]
    fn recovery_rules_follow_previous_bin() {
        let t = ThresholdConfig::default();
        let r = row(8.0, 0.0, 0.0);
        let n = row(8.0, 0.0, 0.0);
        let mut inp = input(&r, &n, &n, &t);
        inp.previous_category = Some(LossCategory::LowWind);
        assert_eq!(classify_remainder(&inp, LOSS_RULES), LossCategory::LowWindRecovery);

        let alarmed = row(8.0, 0.0, 600.0);
        inp.previous_category = None;
        inp.previous_bin = Some(&alarmed);
        assert_eq!(classify_remainder(&inp, LOSS_RULES), LossCategory::PostAlarmRecovery);
    }

    #[test]
    fn misassigned_moves_type0_share() {
        let t = ThresholdConfig::default();
        let mut r = row(4.0, 0.0, 600.0);
        r.alarm_text = "Stop due to low wind|Yaw".into();
        let n = row(9.0, 400.0, 0.0);
        let (losses, _) = categorize(&input(&r, &n, &n, &t), 70.0, &AlarmCodesConfig::default());
        assert_eq!(losses.type0, 0.0);
        assert_eq!(losses.misassigned, 70.0);
        assert!(losses.reconciles());
    }

    #[test]
    fn no_loss_when_produced_exceeds_potential() {
        let t = ThresholdConfig::default();
        let mut r = row(8.0, 100.0, 0.0);
        r.produced_energy = Some(120.0);
        let (losses, category) = categorize(&input(&r, &r, &r, &t), 100.0, &AlarmCodesConfig::default());
        assert_eq!(losses.total, 0.0);
        assert_eq!(category, None);
    }
}
