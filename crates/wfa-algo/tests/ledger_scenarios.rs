//! End-to-end ledger scenarios on small hand-built farms.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use wfa_algo::{compute_ledger, LedgerInputs};
use wfa_core::{
    AlarmClass, AlarmId, CounterReading, CurveTables, EngineConfig, GridReading, LossCategory,
    PotentialMethod, PowerCurvePoint, RawAlarmEvent, ReportingPeriod, SeasonalFactor,
    TelemetryTables, TurbineId, TurbineReading, WakeConfig, WfaError, WindDistributionBin,
};

const BLACKOUT: i64 = 1005;
const PITCH: i64 = 100;
const GRID_LOSS: i64 = 200;
const LOW_WIND_STOP: i64 = 300;

fn at(minutes: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 4, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::minutes(minutes)
}

fn classification() -> Vec<AlarmClass> {
    vec![
        AlarmClass {
            alarm_code: PITCH,
            error_type: 0,
            description: "Pitch system fault".into(),
        },
        AlarmClass {
            alarm_code: GRID_LOSS,
            error_type: 1,
            description: "Grid loss".into(),
        },
        AlarmClass {
            alarm_code: BLACKOUT,
            error_type: 1,
            description: "Substation blackout".into(),
        },
        AlarmClass {
            alarm_code: LOW_WIND_STOP,
            error_type: 0,
            description: "Stop due to low wind".into(),
        },
    ]
}

fn alarm(id: i64, turbine: i64, code: i64, on: i64, off: i64) -> RawAlarmEvent {
    RawAlarmEvent {
        id: AlarmId::new(id),
        turbine_id: TurbineId::new(turbine),
        alarm_code: code,
        time_on: at(on),
        time_off: Some(at(off)),
        parameter: String::new(),
    }
}

/// One reading per table for a turbine at a bin.
fn telemetry_for(
    tables: &mut TelemetryTables,
    turbine: i64,
    bin: i64,
    energy: f64,
    power_min: f64,
    wind_speed: f64,
) {
    let turbine_id = TurbineId::new(turbine);
    let timestamp = at(bin);
    tables.counters.push(CounterReading {
        turbine_id,
        timestamp,
        energy_kwh: energy,
        net_energy_kwh: None,
    });
    tables.grid.push(GridReading {
        turbine_id,
        timestamp,
        power_min_kw: power_min,
        power_max_kw: power_min + 100.0,
        power_mean_kw: power_min + 50.0,
    });
    tables.turbine.push(TurbineReading {
        turbine_id,
        timestamp,
        wind_speed,
        wind_direction: 270.0,
    });
}

fn inputs(
    period: ReportingPeriod,
    alarms: Vec<RawAlarmEvent>,
    telemetry: TelemetryTables,
) -> LedgerInputs {
    LedgerInputs {
        period,
        alarms,
        classification: classification(),
        telemetry,
        curves: CurveTables::default(),
    }
}

fn steady_telemetry(turbines: &[i64], bins: i64) -> TelemetryTables {
    let mut tables = TelemetryTables::default();
    for &t in turbines {
        for b in 1..=bins {
            telemetry_for(&mut tables, t, b * 10, 200.0, 900.0, 9.0);
        }
    }
    tables
}

#[test]
fn overlapping_alarms_are_not_double_counted() {
    let period = ReportingPeriod::new(at(0), at(60));
    let alarms = vec![alarm(1, 1, PITCH, 0, 30), alarm(2, 1, PITCH, 10, 40)];
    let config = EngineConfig::for_turbines(&[1]);
    let ledger = compute_ledger(&inputs(period, alarms, steady_telemetry(&[1], 6)), &config).unwrap();

    let total: f64 = ledger.rows.iter().map(|r| r.type0_secs).sum();
    assert_eq!(total, 40.0 * 60.0);
    assert!(ledger.rows.iter().all(|r| r.alarm_secs <= 600.0));
}

#[test]
fn blackout_removes_time_from_lower_priority_alarm() {
    let period = ReportingPeriod::new(at(0), at(60));
    let alarms = vec![alarm(1, 1, PITCH, 0, 60), alarm(2, 1, BLACKOUT, 20, 40)];
    let config = EngineConfig::for_turbines(&[1]);
    let ledger = compute_ledger(&inputs(period, alarms, steady_telemetry(&[1], 6)), &config).unwrap();

    let type0: Vec<f64> = ledger.rows.iter().map(|r| r.type0_secs).collect();
    let type1: Vec<f64> = ledger.rows.iter().map(|r| r.type1_secs).collect();
    assert_eq!(type0, vec![600.0, 600.0, 0.0, 0.0, 600.0, 600.0]);
    assert_eq!(type1, vec![0.0, 0.0, 600.0, 600.0, 0.0, 0.0]);
}

#[test]
fn grid_has_one_row_per_turbine_and_bin() {
    let period = ReportingPeriod::new(at(0), at(24 * 60));
    let mut telemetry = TelemetryTables::default();
    telemetry_for(&mut telemetry, 2, 70, 150.0, 500.0, 8.0);
    let config = EngineConfig::for_turbines(&[1, 2, 3]);
    let ledger = compute_ledger(&inputs(period, vec![], telemetry), &config).unwrap();

    assert_eq!(ledger.rows.len(), 3 * 144);
    assert_eq!(ledger.rows[0].turbine_id, TurbineId::new(1));
    assert_eq!(ledger.rows[0].timestamp, at(10));
    assert_eq!(ledger.rows[144].turbine_id, TurbineId::new(2));
    assert!(ledger.rows.iter().all(|r| r.alarm_secs == 0.0));
    assert_eq!(
        ledger.rows.iter().filter(|r| r.produced_energy.is_some()).count(),
        1
    );
}

#[test]
fn missing_tiers_leave_rows_unresolved() {
    let period = ReportingPeriod::new(at(0), at(10));
    let mut telemetry = TelemetryTables::default();
    telemetry_for(&mut telemetry, 1, 10, 500.0, 2000.0, 11.0);
    let config = EngineConfig::for_turbines(&[1, 2]);
    let ledger = compute_ledger(&inputs(period, vec![], telemetry), &config).unwrap();

    let down = &ledger.rows[1];
    assert_eq!(down.turbine_id, TurbineId::new(2));
    assert_eq!(down.potential_energy, None);
    assert!(down.losses.is_none());
    assert_eq!(ledger.rows[0].potential_method, Some(PotentialMethod::Direct));
    assert_eq!(ledger.rows[0].potential_energy, Some(500.0));

    assert_eq!(ledger.unresolved.len(), 1);
    assert!(ledger.diagnostics.has_errors());
    match ledger.ensure_resolved() {
        Err(WfaError::UnresolvedPotentialEnergy { turbine, timestamp }) => {
            assert_eq!(turbine, TurbineId::new(2));
            assert_eq!(timestamp, at(10));
        }
        other => panic!("expected unresolved potential, got {other:?}"),
    }
}

#[test]
fn peer_average_is_wake_corrected() {
    let period = ReportingPeriod::new(at(0), at(10));
    let mut telemetry = TelemetryTables::default();
    telemetry_for(&mut telemetry, 1, 10, 200.0, 900.0, 9.0);
    telemetry_for(&mut telemetry, 2, 10, 0.0, 0.0, 9.0);
    telemetry_for(&mut telemetry, 3, 10, 200.0, 900.0, 9.0);
    let mut config = EngineConfig::for_turbines(&[1, 2, 3]);
    config.farm.wake = Some(WakeConfig {
        total_turbines: 3,
        wake_loss: 0.08,
    });
    let ledger = compute_ledger(&inputs(period, vec![], telemetry), &config).unwrap();

    let down = &ledger.rows[1];
    // 200 * 0.92 / (1 - 0.08 * 1 / 2), rounded to cents
    assert_eq!(down.potential_energy, Some(191.67));
    assert_eq!(
        down.potential_method,
        Some(PotentialMethod::PeerAverageWakeCorrected)
    );
    ledger.ensure_resolved().unwrap();
}

#[test]
fn low_wind_needs_producing_neighbours() {
    let period = ReportingPeriod::new(at(0), at(10));
    let mut config = EngineConfig::for_turbines(&[1, 2, 3]);
    config.farm.wake = Some(WakeConfig {
        total_turbines: 3,
        wake_loss: 0.08,
    });

    let mut telemetry = TelemetryTables::default();
    telemetry_for(&mut telemetry, 1, 10, 200.0, 900.0, 9.0);
    telemetry_for(&mut telemetry, 2, 10, 0.0, 0.0, 4.0);
    telemetry_for(&mut telemetry, 3, 10, 200.0, 900.0, 9.0);
    let ledger = compute_ledger(&inputs(period, vec![], telemetry), &config).unwrap();
    let middle = &ledger.rows[1];
    assert_eq!(middle.loss_category, Some(LossCategory::LowWind));
    let losses = middle.losses.unwrap();
    assert_eq!(losses.low_wind, losses.total);
    assert!(losses.reconciles());

    // Neighbours idle and in alarm: the wind gap is not evidence of a local cause.
    let mut telemetry = TelemetryTables::default();
    telemetry_for(&mut telemetry, 1, 10, 0.0, 0.0, 9.0);
    telemetry_for(&mut telemetry, 2, 10, 0.0, 0.0, 4.0);
    telemetry_for(&mut telemetry, 3, 10, 0.0, 0.0, 9.0);
    let alarms = vec![alarm(1, 1, GRID_LOSS, 0, 10), alarm(2, 3, GRID_LOSS, 0, 10)];
    let mut with_curve = inputs(period, alarms, telemetry);
    with_curve.curves.power_curve = vec![
        PowerCurvePoint {
            wind_speed: 3.0,
            power_kw: 0.0,
        },
        PowerCurvePoint {
            wind_speed: 12.0,
            power_kw: 2400.0,
        },
    ];
    let ledger = compute_ledger(&with_curve, &config).unwrap();
    let middle = &ledger.rows[1];
    assert_eq!(middle.potential_method, Some(PotentialMethod::AnemometerCurve));
    assert_eq!(middle.loss_category, Some(LossCategory::Unattributed));
    let losses = middle.losses.unwrap();
    assert!(losses.total > 0.0);
    assert_eq!(losses.unattributed, losses.total);
}

#[test]
fn low_wind_alarm_with_local_evidence_is_misassigned() {
    let period = ReportingPeriod::new(at(0), at(10));
    let mut config = EngineConfig::for_turbines(&[1, 2, 3]);
    config.farm.wake = Some(WakeConfig {
        total_turbines: 3,
        wake_loss: 0.0,
    });
    let mut telemetry = TelemetryTables::default();
    telemetry_for(&mut telemetry, 1, 10, 150.0, 700.0, 8.0);
    telemetry_for(&mut telemetry, 2, 10, 0.0, 0.0, 8.0);
    telemetry_for(&mut telemetry, 3, 10, 150.0, 700.0, 8.0);
    let alarms = vec![alarm(1, 2, LOW_WIND_STOP, 0, 10)];
    let ledger = compute_ledger(&inputs(period, alarms, telemetry), &config).unwrap();

    let losses = ledger.rows[1].losses.unwrap();
    assert_eq!(losses.total, 150.0);
    assert_eq!(losses.type0, 0.0);
    assert_eq!(losses.misassigned, 150.0);
    assert!(ledger.rows[1].alarm_text.contains("low wind"));
}

#[test]
fn every_resolved_row_reconciles() {
    let period = ReportingPeriod::new(at(0), at(120));
    let turbines = [1, 2, 3, 4];
    let mut telemetry = steady_telemetry(&turbines, 12);
    telemetry.curtailment.push(wfa_core::CurtailmentReading {
        turbine_id: TurbineId::new(4),
        timestamp: at(100),
        power_reduction_secs: 300.0,
    });
    let alarms = vec![
        alarm(1, 1, PITCH, 5, 47),
        alarm(2, 1, GRID_LOSS, 30, 80),
        alarm(3, 2, BLACKOUT, 0, 35),
        alarm(4, 2, PITCH, 20, 70),
        alarm(5, 3, 2006, 40, 65),
    ];
    let mut config = EngineConfig::for_turbines(&turbines);
    config.farm.wake = Some(WakeConfig::default());
    let ledger = compute_ledger(&inputs(period, alarms, telemetry), &config).unwrap();

    assert_eq!(ledger.rows.len(), 4 * 12);
    for row in &ledger.rows {
        let losses = row.losses.expect("resolved");
        assert!(losses.reconciles(), "row {:?} does not reconcile", row);
        assert!(losses.total >= 0.0);
        assert!(row.alarm_secs <= 600.0);
        assert!(row.local_power_limit_secs <= 600.0);
    }
    let lpl: f64 = ledger.rows.iter().map(|r| r.local_power_limit_secs).sum();
    assert_eq!(lpl, 25.0 * 60.0);
}

#[test]
fn missing_grid_table_is_fatal() {
    let period = ReportingPeriod::new(at(0), at(60));
    let mut telemetry = steady_telemetry(&[1], 6);
    telemetry.grid.clear();
    let config = EngineConfig::for_turbines(&[1]);
    let err = compute_ledger(&inputs(period, vec![], telemetry), &config).unwrap_err();
    assert!(matches!(err, WfaError::MissingInput { ref table } if table == "grid"));
    assert!(err.is_fatal_for_period());
}

#[test]
fn wake_model_smaller_than_roster_is_rejected() {
    let period = ReportingPeriod::new(at(0), at(60));
    let turbines = [1, 2, 3, 4];
    let telemetry = steady_telemetry(&turbines, 6);
    let mut config = EngineConfig::for_turbines(&turbines);
    config.farm.wake = Some(WakeConfig {
        total_turbines: 2,
        wake_loss: 0.5,
    });
    let err = compute_ledger(&inputs(period, vec![], telemetry), &config).unwrap_err();
    assert!(matches!(err, WfaError::Config(_)));
}

#[test]
fn recovery_bins_follow_low_wind_and_alarms() {
    let period = ReportingPeriod::new(at(0), at(60));
    let mut telemetry = TelemetryTables::default();
    for t in [1, 3] {
        for b in 1..=6 {
            telemetry_for(&mut telemetry, t, b * 10, 200.0, 900.0, 9.0);
        }
    }
    // turbine 2: low wind, then three bins with no anemometer reading, then back to normal
    telemetry_for(&mut telemetry, 2, 10, 20.0, 0.0, 4.0);
    for bin in [20, 30, 40] {
        telemetry_for(&mut telemetry, 2, bin, 0.0, 0.0, 0.0);
        telemetry.turbine.pop();
    }
    telemetry_for(&mut telemetry, 2, 50, 200.0, 900.0, 9.0);
    telemetry_for(&mut telemetry, 2, 60, 200.0, 900.0, 9.0);

    let mut with_curves = inputs(period, vec![alarm(1, 2, PITCH, 25, 30)], telemetry);
    with_curves.curves = CurveTables {
        power_curve: vec![
            PowerCurvePoint {
                wind_speed: 3.0,
                power_kw: 0.0,
            },
            PowerCurvePoint {
                wind_speed: 13.0,
                power_kw: 2300.0,
            },
        ],
        seasonal_factors: vec![SeasonalFactor {
            month: 4,
            factor: 1.0,
        }],
        wind_distribution: vec![
            WindDistributionBin {
                wind_speed: 8,
                weight: 4380.0,
            },
            WindDistributionBin {
                wind_speed: 10,
                weight: 4380.0,
            },
        ],
    };
    let config = EngineConfig::for_turbines(&[1, 2, 3]);
    let ledger = compute_ledger(&with_curves, &config).unwrap();
    assert!(ledger.is_complete());

    let t2: Vec<_> = ledger
        .rows
        .iter()
        .filter(|r| r.turbine_id == TurbineId::new(2))
        .collect();
    assert_eq!(t2.len(), 6);

    assert_eq!(t2[0].potential_method, Some(PotentialMethod::AnemometerCurve));
    assert_eq!(t2[0].loss_category, Some(LossCategory::LowWind));

    // half the year at 8 m/s, half at 10 m/s
    let per_bin = (1150.0 + 1610.0) / 2.0 * 0.92 / 6.0;
    for row in &t2[1..4] {
        assert_eq!(row.potential_method, Some(PotentialMethod::StatisticalWindEstimate));
        assert!((row.potential_energy.unwrap() - per_bin).abs() < 1e-9);
    }
    assert_eq!(t2[1].loss_category, Some(LossCategory::LowWindRecovery));
    assert!(t2[1].losses.unwrap().low_wind_recovery > 0.0);

    // the alarm bin puts everything on type0 and leaves no remainder
    assert_eq!(t2[2].loss_category, None);
    assert_eq!(t2[2].losses.unwrap().type0, t2[2].losses.unwrap().total);

    assert_eq!(t2[3].loss_category, Some(LossCategory::PostAlarmRecovery));
    assert!(t2[3].losses.unwrap().post_alarm_recovery > 0.0);

    assert_eq!(t2[4].potential_method, Some(PotentialMethod::Direct));
    assert!(ledger.rows.iter().all(|r| r.losses.unwrap().reconciles()));
}
