//! Blackout splitting.
//!
//! A blackout alarm voids every lower-priority alarm overlapping it on the
//! same turbine. Each non-blackout effective interval is swept against the
//! turbine's blackouts and cut into the segments that fall outside them; a
//! single alarm can therefore yield zero, one or many segments, all keyed
//! back to the source alarm id. The result is re-cascaded and checked for
//! pairwise overlap.

use hashbrown::HashMap;
use tracing::debug;
use wfa_core::{
    AlarmInterval, EffectiveAlarmInterval, TurbineId, WfaError, WfaResult,
};

use crate::cascade::cascade;

/// Parts of `[on, off)` not covered by `blackouts`, which must be sorted
/// by start.
fn uncovered_segments(
    interval: &AlarmInterval,
    blackouts: &[(chrono::NaiveDateTime, chrono::NaiveDateTime)],
) -> Vec<AlarmInterval> {
    let mut segments = Vec::new();
    let mut cursor = interval.time_on;
    for &(b_on, b_off) in blackouts {
        if !(b_on < interval.time_off && b_off > interval.time_on) {
            continue;
        }
        if b_on > cursor {
            segments.push((cursor, b_on));
        }
        cursor = cursor.max(b_off);
    }
    if cursor < interval.time_off {
        segments.push((cursor, interval.time_off));
    }

    segments
        .into_iter()
        .filter(|(s, e)| s < e)
        .map(|(s, e)| AlarmInterval {
            time_on: s,
            time_off: e,
            ..interval.clone()
        })
        .collect()
}

/// First overlapping pair per turbine, if any. Expects the cascade's order.
pub fn find_overlap(
    intervals: &[EffectiveAlarmInterval],
) -> Option<(&EffectiveAlarmInterval, &EffectiveAlarmInterval)> {
    let mut by_turbine: HashMap<TurbineId, Vec<&EffectiveAlarmInterval>> = HashMap::new();
    for iv in intervals.iter().filter(|iv| !iv.is_zero_length()) {
        by_turbine.entry(iv.turbine_id).or_default().push(iv);
    }
    let mut turbines: Vec<_> = by_turbine.keys().copied().collect();
    turbines.sort();

    for turbine in turbines {
        let Some(list) = by_turbine.get_mut(&turbine) else {
            continue;
        };
        list.sort_by(|a, b| {
            a.effective_time_on
                .cmp(&b.effective_time_on)
                .then(a.source_alarm_id.cmp(&b.source_alarm_id))
        });
        let mut latest: Option<&EffectiveAlarmInterval> = None;
        for iv in list.iter() {
            if let Some(prev) = latest {
                if iv.effective_time_on < prev.time_off {
                    return Some((prev, iv));
                }
            }
            if latest.map_or(true, |prev| iv.time_off > prev.time_off) {
                latest = Some(iv);
            }
        }
    }
    None
}

/// Split cascaded intervals around blackouts and re-resolve them.
///
/// Returns only intervals with a positive effective duration.
pub fn split_blackouts(
    effective: Vec<EffectiveAlarmInterval>,
    blackout_code: i64,
) -> WfaResult<Vec<EffectiveAlarmInterval>> {
    let mut blackouts: HashMap<TurbineId, Vec<(chrono::NaiveDateTime, chrono::NaiveDateTime)>> =
        HashMap::new();
    let mut restored_blackouts = Vec::new();
    let mut others = Vec::new();

    for iv in effective {
        if iv.alarm_code == blackout_code {
            blackouts
                .entry(iv.turbine_id)
                .or_default()
                .push((iv.time_on, iv.time_off));
            // blackouts go back to their normalised start
            restored_blackouts.push(AlarmInterval {
                turbine_id: iv.turbine_id,
                alarm_id: iv.source_alarm_id,
                alarm_code: iv.alarm_code,
                category: iv.category,
                time_on: iv.time_on,
                time_off: iv.time_off,
                parameter: iv.parameter,
                description: iv.description,
            });
        } else if !iv.is_zero_length() {
            others.push(iv.to_interval());
        }
    }
    for list in blackouts.values_mut() {
        list.sort();
    }

    let mut segments = restored_blackouts;
    let mut split_count = 0usize;
    for iv in &others {
        match blackouts.get(&iv.turbine_id) {
            Some(list) => {
                let parts = uncovered_segments(iv, list);
                if parts.len() != 1 || parts[0].time_on != iv.time_on || parts[0].time_off != iv.time_off {
                    split_count += 1;
                }
                segments.extend(parts);
            }
            None => segments.push(iv.clone()),
        }
    }
    debug!(
        blackouts = blackouts.values().map(Vec::len).sum::<usize>(),
        affected = split_count,
        "blackout split"
    );

    let resolved: Vec<EffectiveAlarmInterval> = cascade(segments)
        .into_iter()
        .filter(|iv| !iv.is_zero_length())
        .collect();

    if let Some((first, second)) = find_overlap(&resolved) {
        return Err(WfaError::OverlapInvariantViolation {
            turbine: first.turbine_id,
            first: first.source_alarm_id,
            second: second.source_alarm_id,
        });
    }

    Ok(resolved)
}
