//! Interval binning onto the 10-minute grid.

use chrono::NaiveDateTime;
use hashbrown::HashMap;
use wfa_core::{AlarmCategory, EffectiveAlarmInterval, TurbineId};
use wfa_ts::{ceil_to_bin, grid_range, overlap_secs};

/// Alarm seconds accumulated for one (turbine, bin).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlarmBin {
    /// Type0 plus type1 seconds
    pub alarm_secs: f64,
    pub type0_secs: f64,
    pub type1_secs: f64,
    pub local_power_limit_secs: f64,
    pub descriptions: Vec<String>,
}

impl AlarmBin {
    pub fn alarm_text(&self) -> String {
        self.descriptions.join("|")
    }
}

/// Binned alarm seconds keyed by turbine and bin label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BinnedAlarms {
    bins: HashMap<(TurbineId, NaiveDateTime), AlarmBin>,
}

impl BinnedAlarms {
    pub fn get(&self, turbine: TurbineId, timestamp: NaiveDateTime) -> Option<&AlarmBin> {
        self.bins.get(&(turbine, timestamp))
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    fn add(&mut self, iv: &EffectiveAlarmInterval, bin: NaiveDateTime, secs: f64) {
        let entry = self.bins.entry((iv.turbine_id, bin)).or_default();
        match iv.category {
            AlarmCategory::Type0 => {
                entry.type0_secs += secs;
                entry.alarm_secs += secs;
                entry.descriptions.push(iv.description.clone());
            }
            AlarmCategory::Type1 => {
                entry.type1_secs += secs;
                entry.alarm_secs += secs;
                entry.descriptions.push(iv.description.clone());
            }
            AlarmCategory::LocalPowerLimit => {
                entry.local_power_limit_secs += secs;
            }
        }
    }
}

/// Spread each interval's effective span over the bins it crosses.
///
/// Candidate bins run from `ceil(effective_time_on)` to `ceil(time_off)`;
/// bins receiving zero seconds are skipped.
pub fn bin_intervals<'a>(
    intervals: impl IntoIterator<Item = &'a EffectiveAlarmInterval>,
    bin_secs: i64,
) -> BinnedAlarms {
    let mut out = BinnedAlarms::default();
    for iv in intervals {
        if iv.is_zero_length() {
            continue;
        }
        let first = ceil_to_bin(iv.effective_time_on, bin_secs);
        let last = ceil_to_bin(iv.time_off, bin_secs);
        for bin in grid_range(first, last, bin_secs) {
            let secs = overlap_secs(bin, bin_secs, iv.effective_time_on, iv.time_off);
            if secs > 0.0 {
                out.add(iv, bin, secs);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wfa_core::{AlarmId, CascadePlacement};
    use wfa_ts::BIN_SECS;

    fn at(m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, 1)
            .unwrap()
            .and_hms_opt(0, 0, s)
            .unwrap()
            + chrono::Duration::minutes(i64::from(m))
    }

    fn eff(category: AlarmCategory, on: NaiveDateTime, off: NaiveDateTime, text: &str) -> EffectiveAlarmInterval {
        EffectiveAlarmInterval {
            turbine_id: TurbineId::new(1),
            source_alarm_id: AlarmId::new(1),
            alarm_code: 100,
            category,
            time_on: on,
            effective_time_on: on,
            time_off: off,
            placement: CascadePlacement::Root,
            parameter: String::new(),
            description: text.to_string(),
        }
    }

    #[test]
    fn partial_bins_at_both_ends() {
        let iv = eff(AlarmCategory::Type0, at(5, 0), at(25, 0), "Pitch");
        let binned = bin_intervals([&iv], BIN_SECS);
        let t = TurbineId::new(1);
        assert_eq!(binned.len(), 3);
        assert_eq!(binned.get(t, at(10, 0)).unwrap().type0_secs, 300.0);
        assert_eq!(binned.get(t, at(20, 0)).unwrap().type0_secs, 600.0);
        assert_eq!(binned.get(t, at(30, 0)).unwrap().type0_secs, 300.0);
        assert!(binned.get(t, at(0, 0)).is_none());
    }

    #[test]
    fn aligned_interval_skips_empty_edge_bins() {
        let iv = eff(AlarmCategory::Type1, at(10, 0), at(20, 0), "Grid");
        let binned = bin_intervals([&iv], BIN_SECS);
        assert_eq!(binned.len(), 1);
        let bin = binned.get(TurbineId::new(1), at(20, 0)).unwrap();
        assert_eq!(bin.type1_secs, 600.0);
        assert_eq!(bin.alarm_secs, 600.0);
    }

    #[test]
    fn categories_and_text_accumulate() {
        let a = eff(AlarmCategory::Type0, at(0, 0), at(4, 0), "Low wind");
        let b = eff(AlarmCategory::Type1, at(4, 0), at(6, 30), "Grid");
        let c = eff(AlarmCategory::LocalPowerLimit, at(0, 0), at(10, 0), "");
        let binned = bin_intervals([&a, &b, &c], BIN_SECS);
        let bin = binned.get(TurbineId::new(1), at(10, 0)).unwrap();
        assert_eq!(bin.type0_secs, 240.0);
        assert_eq!(bin.type1_secs, 150.0);
        assert_eq!(bin.alarm_secs, 390.0);
        assert_eq!(bin.local_power_limit_secs, 600.0);
        assert_eq!(bin.alarm_text(), "Low wind|Grid");
    }

    #[test]
    fn binning_twice_gives_same_sums() {
        let intervals = vec![
            eff(AlarmCategory::Type0, at(3, 17), at(47, 5), "Pitch"),
            eff(AlarmCategory::Type1, at(47, 5), at(61, 0), "Grid"),
        ];
        let first = bin_intervals(&intervals, BIN_SECS);
        let second = bin_intervals(&intervals, BIN_SECS);
        assert_eq!(first, second);
        assert_eq!(first.len(), 7);
    }
}
