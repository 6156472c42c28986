//! Cascade resolution of overlapping alarms on one turbine.
//!
//! Intervals are swept in `(time_on, alarm_id)` order per turbine while a
//! single running maximum of `time_off` is tracked:
//!
//! | Placement | Condition                 | Effective start |
//! |-----------|---------------------------|-----------------|
//! | Root      | `time_on >= max_off`      | `time_on`       |
//! | Child     | `time_off > max_off`      | `max_off`       |
//! | Embedded  | otherwise                 | `time_off`      |
//!
//! Embedded intervals end up zero-length; they are kept so callers can still
//! see which alarm was hidden.

use wfa_core::{AlarmInterval, CascadePlacement, EffectiveAlarmInterval};

/// Resolve every turbine's intervals. Output is ordered by turbine, then by
/// `(time_on, alarm_id)`.
pub fn cascade(mut intervals: Vec<AlarmInterval>) -> Vec<EffectiveAlarmInterval> {
    intervals.sort_by(|a, b| {
        a.turbine_id
            .cmp(&b.turbine_id)
            .then(a.time_on.cmp(&b.time_on))
            .then(a.alarm_id.cmp(&b.alarm_id))
    });

    let mut out = Vec::with_capacity(intervals.len());
    let mut current = None;
    let mut max_off = None;

    for iv in intervals {
        if current != Some(iv.turbine_id) {
            current = Some(iv.turbine_id);
            max_off = Some(iv.time_on);
        }
        let running = max_off.unwrap_or(iv.time_on);

        let (placement, effective_time_on) = if iv.time_on >= running {
            (CascadePlacement::Root, iv.time_on)
        } else if iv.time_off > running {
            (CascadePlacement::Child, running)
        } else {
            (CascadePlacement::Embedded, iv.time_off)
        };
        max_off = Some(running.max(iv.time_off));

        out.push(EffectiveAlarmInterval {
            turbine_id: iv.turbine_id,
            source_alarm_id: iv.alarm_id,
            alarm_code: iv.alarm_code,
            category: iv.category,
            time_on: iv.time_on,
            effective_time_on,
            time_off: iv.time_off,
            placement,
            parameter: iv.parameter,
            description: iv.description,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use wfa_core::{AlarmCategory, AlarmId, TurbineId};

    fn at(m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::minutes(i64::from(m))
    }

    fn iv(turbine: i64, id: i64, on: u32, off: u32) -> AlarmInterval {
        AlarmInterval {
            turbine_id: TurbineId::new(turbine),
            alarm_id: AlarmId::new(id),
            alarm_code: 100,
            category: AlarmCategory::Type0,
            time_on: at(on),
            time_off: at(off),
            parameter: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn child_starts_where_parent_ends() {
        let out = cascade(vec![iv(1, 2, 10, 40), iv(1, 1, 0, 30)]);
        assert_eq!(out[0].source_alarm_id, AlarmId::new(1));
        assert_eq!(out[0].placement, CascadePlacement::Root);
        assert_eq!(out[0].effective_time_on, at(0));
        assert_eq!(out[1].placement, CascadePlacement::Child);
        assert_eq!(out[1].effective_time_on, at(30));
        assert_eq!(out[1].effective_secs(), 600);
    }

    #[test]
    fn embedded_collapses_to_zero() {
        let out = cascade(vec![iv(1, 1, 0, 60), iv(1, 2, 10, 20), iv(1, 3, 30, 70)]);
        assert_eq!(out[1].placement, CascadePlacement::Embedded);
        assert!(out[1].is_zero_length());
        assert_eq!(out[2].effective_time_on, at(60));
    }

    #[test]
    fn running_max_resets_per_turbine() {
        let out = cascade(vec![iv(1, 1, 0, 60), iv(2, 2, 10, 20)]);
        assert_eq!(out[1].turbine_id, TurbineId::new(2));
        assert_eq!(out[1].placement, CascadePlacement::Root);
        assert_eq!(out[1].effective_time_on, at(10));
    }

    #[test]
    fn equal_start_breaks_tie_on_id() {
        let out = cascade(vec![iv(1, 9, 0, 20), iv(1, 4, 0, 10)]);
        assert_eq!(out[0].source_alarm_id, AlarmId::new(4));
        assert_eq!(out[1].placement, CascadePlacement::Child);
        assert_eq!(out[1].effective_time_on, at(10));
    }
}
