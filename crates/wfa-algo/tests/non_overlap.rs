//! Resolved alarm intervals never overlap and never lose covered time.
//!
//! Random overlapping alarm sets (seeded, so failures reproduce) go through
//! the cascade and the blackout split.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::{rngs::StdRng, Rng, SeedableRng};
use wfa_algo::blackout::{find_overlap, split_blackouts};
use wfa_algo::cascade::cascade;
use wfa_core::{AlarmCategory, AlarmId, AlarmInterval, TurbineId};

const BLACKOUT: i64 = 1005;

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 2, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn random_intervals(rng: &mut StdRng, turbines: i64, per_turbine: usize) -> Vec<AlarmInterval> {
    let mut out = Vec::new();
    let mut next_id = 1;
    for turbine in 1..=turbines {
        for _ in 0..per_turbine {
            let on = base() + Duration::seconds(rng.gen_range(0..6 * 3600));
            let off = on + Duration::seconds(rng.gen_range(0..5400));
            let (code, category) = match rng.gen_range(0..10) {
                0 | 1 => (BLACKOUT, AlarmCategory::Type1),
                2..=5 => (200, AlarmCategory::Type1),
                _ => (100, AlarmCategory::Type0),
            };
            out.push(AlarmInterval {
                turbine_id: TurbineId::new(turbine),
                alarm_id: AlarmId::new(next_id),
                alarm_code: code,
                category,
                time_on: on,
                time_off: off,
                parameter: String::new(),
                description: format!("code {code}"),
            });
            next_id += 1;
        }
    }
    out
}

/// Measure of the union of `[on, off)` spans, in seconds.
fn union_secs(mut spans: Vec<(NaiveDateTime, NaiveDateTime)>) -> i64 {
    spans.sort();
    let mut total = 0;
    let mut current: Option<(NaiveDateTime, NaiveDateTime)> = None;
    for (on, off) in spans {
        current = match current {
            Some((start, end)) if on <= end => Some((start, end.max(off))),
            Some((start, end)) => {
                total += (end - start).num_seconds();
                Some((on, off))
            }
            None => Some((on, off)),
        };
    }
    if let Some((start, end)) = current {
        total += (end - start).num_seconds();
    }
    total
}

#[test]
fn resolved_intervals_are_disjoint_and_cover_the_union() {
    for seed in 0..50u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let raw = random_intervals(&mut rng, 3, 25);
        let resolved = split_blackouts(cascade(raw.clone()), BLACKOUT)
            .unwrap_or_else(|e| panic!("seed {seed}: {e}"));

        assert!(
            find_overlap(&resolved).is_none(),
            "seed {seed}: overlapping intervals survived"
        );
        assert!(resolved.iter().all(|iv| !iv.is_zero_length()));

        for turbine in 1..=3 {
            let id = TurbineId::new(turbine);
            let expected = union_secs(
                raw.iter()
                    .filter(|iv| iv.turbine_id == id)
                    .map(|iv| (iv.time_on, iv.time_off))
                    .collect(),
            );
            let covered: i64 = resolved
                .iter()
                .filter(|iv| iv.turbine_id == id)
                .map(|iv| iv.effective_secs())
                .sum();
            assert_eq!(covered, expected, "seed {seed}, turbine {turbine}");
        }
    }
}

#[test]
fn blackout_time_is_never_shared() {
    let mut rng = StdRng::seed_from_u64(7);
    let raw = random_intervals(&mut rng, 2, 40);
    let resolved = split_blackouts(cascade(raw), BLACKOUT).unwrap();

    for blackout in resolved.iter().filter(|iv| iv.alarm_code == BLACKOUT) {
        for other in resolved
            .iter()
            .filter(|iv| iv.turbine_id == blackout.turbine_id && iv.alarm_code != BLACKOUT)
        {
            assert!(
                other.time_off <= blackout.effective_time_on
                    || other.effective_time_on >= blackout.time_off,
                "{other:?} overlaps blackout {blackout:?}"
            );
        }
    }
}
