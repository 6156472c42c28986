//! Alarm normalisation.
//!
//! Clips alarm times to the reporting period, fills open-ended alarms with
//! the period end and joins each alarm to its classification. Only alarms
//! classified as error type 0 or 1 survive into the availability split; the
//! local power limit code is routed to its own list.

use hashbrown::{HashMap, HashSet};
use tracing::{debug, warn};
use wfa_core::{
    AlarmCategory, AlarmClass, AlarmCodesConfig, AlarmInterval, Diagnostics, IssueCategory,
    RawAlarmEvent, ReportingPeriod, TurbineId,
};

/// Output of [`normalize_alarms`].
#[derive(Debug, Clone, Default)]
pub struct NormalizedAlarms {
    /// Type0/type1 alarms, blackouts included
    pub classified: Vec<AlarmInterval>,
    /// Local power limit warnings, clipped to the period
    pub local_power_limit: Vec<AlarmInterval>,
}

/// Why an alarm was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DropReason {
    UnknownTurbine,
    Unclassified,
    BeforePeriod,
    AfterPeriod,
    Inverted,
}

impl DropReason {
    fn describe(&self) -> &'static str {
        match self {
            DropReason::UnknownTurbine => "turbine not in farm roster",
            DropReason::Unclassified => "alarm code not classified as type 0 or 1",
            DropReason::BeforePeriod => "ended before period start",
            DropReason::AfterPeriod => "started after period end",
            DropReason::Inverted => "time_off earlier than time_on",
        }
    }
}

/// Classification lookup. Duplicate codes keep their first entry.
pub fn classification_index(classes: &[AlarmClass]) -> HashMap<i64, &AlarmClass> {
    let mut index = HashMap::with_capacity(classes.len());
    for class in classes {
        index.entry(class.alarm_code).or_insert(class);
    }
    index
}

fn clip_local_power_limit(
    alarm: &RawAlarmEvent,
    period: &ReportingPeriod,
) -> Result<AlarmInterval, DropReason> {
    let off = alarm.time_off.unwrap_or(period.end).min(period.end);
    if alarm.time_on >= period.end {
        return Err(DropReason::AfterPeriod);
    }
    if off <= period.start {
        return Err(DropReason::BeforePeriod);
    }
    let on = alarm.time_on.max(period.start);
    if off < on {
        return Err(DropReason::Inverted);
    }
    Ok(AlarmInterval {
        turbine_id: alarm.turbine_id,
        alarm_id: alarm.id,
        alarm_code: alarm.alarm_code,
        category: AlarmCategory::LocalPowerLimit,
        time_on: on,
        time_off: off,
        parameter: alarm.parameter.clone(),
        description: String::new(),
    })
}

fn clip_classified(
    alarm: &RawAlarmEvent,
    class: &AlarmClass,
    category: AlarmCategory,
    period: &ReportingPeriod,
) -> Result<AlarmInterval, DropReason> {
    let off = alarm.time_off.unwrap_or(period.end).min(period.end);
    if alarm.time_on < period.start && off < period.start {
        return Err(DropReason::BeforePeriod);
    }
    if alarm.time_on > period.end {
        return Err(DropReason::AfterPeriod);
    }
    let on = alarm.time_on.max(period.start);
    if off < on {
        return Err(DropReason::Inverted);
    }
    Ok(AlarmInterval {
        turbine_id: alarm.turbine_id,
        alarm_id: alarm.id,
        alarm_code: alarm.alarm_code,
        category,
        time_on: on,
        time_off: off,
        parameter: alarm.parameter.clone(),
        description: class.description.clone(),
    })
}

/// Normalise one period's raw alarms against the classification table.
pub fn normalize_alarms(
    raw: &[RawAlarmEvent],
    classes: &[AlarmClass],
    period: &ReportingPeriod,
    turbines: &[TurbineId],
    codes: &AlarmCodesConfig,
    diagnostics: &mut Diagnostics,
) -> NormalizedAlarms {
    let roster: HashSet<TurbineId> = turbines.iter().copied().collect();
    let index = classification_index(classes);
    let mut out = NormalizedAlarms::default();
    let mut dropped: HashMap<DropReason, usize> = HashMap::new();

    for alarm in raw {
        let result = if !roster.contains(&alarm.turbine_id) {
            Err(DropReason::UnknownTurbine)
        } else if alarm.alarm_code == codes.local_power_limit_code {
            clip_local_power_limit(alarm, period).map(|iv| {
                out.local_power_limit.push(iv);
            })
        } else {
            match index
                .get(&alarm.alarm_code)
                .and_then(|class| AlarmCategory::from_error_type(class.error_type).map(|c| (class, c)))
            {
                Some((class, category)) => clip_classified(alarm, class, category, period).map(|iv| {
                    out.classified.push(iv);
                }),
                None => Err(DropReason::Unclassified),
            }
        };
        if let Err(reason) = result {
            *dropped.entry(reason).or_insert(0) += 1;
        }
    }

    let mut reasons: Vec<(DropReason, usize)> = dropped.into_iter().collect();
    reasons.sort_by_key(|(reason, _)| reason.describe());
    for (reason, count) in reasons {
        if reason == DropReason::Inverted {
            warn!(count, "alarms with inverted times dropped");
        }
        diagnostics.warn(
            IssueCategory::Alarms,
            format!("{count} alarm(s) dropped: {}", reason.describe()),
        );
    }

    debug!(
        classified = out.classified.len(),
        local_power_limit = out.local_power_limit.len(),
        "alarms normalised"
    );
    out
}
