//! 10-minute time-grid utilities.
//!
//! SCADA bins are labelled by their END instant: the bin stamped `00:10`
//! covers `[00:00, 00:10)`. A reporting period `[start, end]` therefore owns
//! the bins whose label `t` satisfies `start < t <= end` once both bounds
//! are snapped to the grid.

use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use wfa_core::ReportingPeriod;

/// Width of one reporting bin in seconds.
pub const BIN_SECS: i64 = 600;

/// Largest grid instant `<= ts`.
pub fn floor_to_bin(ts: NaiveDateTime, bin_secs: i64) -> NaiveDateTime {
    let secs = ts.and_utc().timestamp();
    let nanos = i64::from(ts.and_utc().timestamp_subsec_nanos());
    let rem = secs.rem_euclid(bin_secs);
    ts - Duration::seconds(rem) - Duration::nanoseconds(nanos)
}

/// Smallest grid instant `>= ts`; the label of the bin containing `ts`
/// unless `ts` already sits on the grid.
pub fn ceil_to_bin(ts: NaiveDateTime, bin_secs: i64) -> NaiveDateTime {
    let floor = floor_to_bin(ts, bin_secs);
    if floor == ts {
        ts
    } else {
        floor + Duration::seconds(bin_secs)
    }
}

/// Inclusive sequence of grid labels from `first` to `last`.
pub fn grid_range(first: NaiveDateTime, last: NaiveDateTime, bin_secs: i64) -> Vec<NaiveDateTime> {
    let step = Duration::seconds(bin_secs);
    let mut out = Vec::new();
    let mut t = first;
    while t <= last {
        out.push(t);
        t += step;
    }
    out
}

/// Bin labels owned by a reporting period.
pub fn period_bins(period: &ReportingPeriod, bin_secs: i64) -> Vec<NaiveDateTime> {
    let first = floor_to_bin(period.start, bin_secs) + Duration::seconds(bin_secs);
    let last = ceil_to_bin(period.end, bin_secs);
    grid_range(first, last, bin_secs)
}

/// Seconds of `[start, end)` falling into the bin labelled `bin_end`.
pub fn overlap_secs(
    bin_end: NaiveDateTime,
    bin_secs: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> f64 {
    let bin_start = bin_end - Duration::seconds(bin_secs);
    let lo = start.max(bin_start);
    let hi = end.min(bin_end);
    let secs = (hi - lo).num_milliseconds() as f64 / 1000.0;
    secs.max(0.0)
}

/// Calendar-month period: from the 1st at 00:00 to the 1st of the next
/// month at 00:00, so the month owns bins `00:10` on day 1 through `00:00`
/// on the following 1st.
pub fn month_period(year: i32, month: u32) -> Result<ReportingPeriod> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| anyhow!("invalid month {year}-{month:02}"))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| anyhow!("no month after {year}-{month:02}"))?;
    Ok(ReportingPeriod::new(
        first.and_time(chrono::NaiveTime::MIN),
        next.and_time(chrono::NaiveTime::MIN),
    ))
}

/// Parse a `YYYY-MM` label into its month period.
pub fn parse_month(label: &str) -> Result<ReportingPeriod> {
    let (year, month) = label
        .trim()
        .split_once('-')
        .ok_or_else(|| anyhow!("expected YYYY-MM, got '{}'", label))?;
    let year: i32 = year
        .parse()
        .with_context(|| format!("parsing year in '{}'", label))?;
    let month: u32 = month
        .parse()
        .with_context(|| format!("parsing month in '{}'", label))?;
    month_period(year, month)
}

/// Month period whose end is pulled back to the latest available reading,
/// for months still in progress. Falls back to the full month when no
/// reading falls inside it.
pub fn month_period_until(
    year: i32,
    month: u32,
    timestamps: impl IntoIterator<Item = NaiveDateTime>,
) -> Result<ReportingPeriod> {
    let full = month_period(year, month)?;
    let latest = timestamps
        .into_iter()
        .filter(|t| *t > full.start && *t <= full.end)
        .max();
    Ok(match latest {
        Some(end) => ReportingPeriod::new(full.start, ceil_to_bin(end, BIN_SECS)),
        None => full,
    })
}

/// Months (as `(year, month)`) touched by the inclusive label range.
pub fn months_between(first: &str, last: &str) -> Result<Vec<(i32, u32)>> {
    let a = parse_month(first)?.start;
    let b = parse_month(last)?.start;
    if b < a {
        return Err(anyhow!("month range {} .. {} is reversed", first, last));
    }
    let mut out = Vec::new();
    let (mut y, mut m) = (a.year(), a.month());
    loop {
        out.push((y, m));
        if y == b.year() && m == b.month() {
            break;
        }
        if m == 12 {
            y += 1;
            m = 1;
        } else {
            m += 1;
        }
    }
    Ok(out)
}
