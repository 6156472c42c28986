//! Potential energy estimation.
//!
//! Each row's potential is resolved by the first tier in a fixed chain that
//! can produce a value:
//!
//! 1. [`DirectTier`]: operational rows, potential = produced
//! 2. [`PeerAverageTier`]: mean of operational peers at the same bin,
//!    wake corrected for the number of peers online
//! 3. [`AnemometerTier`]: power curve at the turbine's own wind speed
//! 4. [`StatisticalTier`]: one constant per period from the curve, the
//!    annual wind distribution and the month's seasonal factor
//!
//! Tiers whose configuration is missing are simply not part of the chain.
//! A row no tier accepts stays unresolved; it is never given a zero.

use chrono::NaiveDateTime;
use hashbrown::HashMap;
use wfa_core::units::{Kilowatts, BINS_PER_HOUR, HOURS_PER_YEAR};
use wfa_core::{
    BinnedAggregate, CurveTables, EngineConfig, PotentialMethod, PowerCurvePoint,
    ThresholdConfig, WakeConfig,
};

/// Operational turbines produce, carry no alarm or local power limit, and
/// are either not curtailed or still running near rated power.
pub fn is_operational(row: &BinnedAggregate, thresholds: &ThresholdConfig) -> bool {
    let produced = row.produced_energy.is_some_and(|e| e > 0.0);
    let running = row.power_min.is_some_and(|p| p > 0.0);
    let curtailment_ok = match row.curtailment_secs {
        None => true,
        Some(secs) if secs == 0.0 => true,
        Some(_) => row
            .power_max
            .is_some_and(|p| p > thresholds.operational_rated_power_kw),
    };
    produced
        && row.alarm_secs == 0.0
        && row.local_power_limit_secs == 0.0
        && running
        && curtailment_ok
}

/// Operational fleet state at one bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerSnapshot {
    pub operational_count: usize,
    pub mean_energy: f64,
}

/// Per-bin peer snapshots; bins without operational turbines are absent.
pub fn peer_snapshots(
    rows: &[BinnedAggregate],
    operational: &[bool],
) -> HashMap<NaiveDateTime, PeerSnapshot> {
    let mut sums: HashMap<NaiveDateTime, (f64, usize)> = HashMap::new();
    for (row, &op) in rows.iter().zip(operational) {
        if let (true, Some(energy)) = (op, row.produced_energy) {
            let entry = sums.entry(row.timestamp).or_insert((0.0, 0));
            entry.0 += energy;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(ts, (sum, n))| {
            (
                ts,
                PeerSnapshot {
                    operational_count: n,
                    mean_energy: sum / n as f64,
                },
            )
        })
        .collect()
}

/// CF(M) = (1 − L) / (1 − L·(M−1)/(N−1)).
pub fn wake_correction_factor(operational: usize, wake: &WakeConfig) -> f64 {
    let n = f64::from(wake.total_turbines);
    let m = operational as f64;
    let loss_at_m = wake.wake_loss * (m - 1.0) / (n - 1.0);
    (1.0 - wake.wake_loss) / (1.0 - loss_at_m)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Piecewise-linear power curve with linear extrapolation beyond its ends.
#[derive(Debug, Clone)]
pub struct PowerCurve {
    points: Vec<PowerCurvePoint>,
}

impl PowerCurve {
    /// Sorts the points and drops repeated wind speeds. Needs two distinct
    /// speeds to interpolate.
    pub fn new(points: &[PowerCurvePoint]) -> Option<Self> {
        let mut points: Vec<PowerCurvePoint> = points
            .iter()
            .copied()
            .filter(|p| p.wind_speed.is_finite() && p.power_kw.is_finite())
            .collect();
        points.sort_by(|a, b| a.wind_speed.total_cmp(&b.wind_speed));
        points.dedup_by(|b, a| a.wind_speed == b.wind_speed);
        (points.len() >= 2).then_some(Self { points })
    }

    pub fn power_at(&self, wind_speed: f64) -> Kilowatts {
        let pts = &self.points;
        let last = pts.len() - 1;
        let seg = match pts.iter().position(|p| p.wind_speed >= wind_speed) {
            Some(0) => 0,
            Some(i) => i - 1,
            None => last - 1,
        };
        let (a, b) = (pts[seg], pts[seg + 1]);
        let slope = (b.power_kw - a.power_kw) / (b.wind_speed - a.wind_speed);
        Kilowatts(a.power_kw + slope * (wind_speed - a.wind_speed))
    }
}

/// One tier's answer. The method can differ from the tier's own when the
/// tier defers to produced energy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub value: f64,
    pub method: PotentialMethod,
}

/// Per-row inputs that are not part of the row itself.
#[derive(Debug, Clone, Copy)]
pub struct EstimationContext<'a> {
    pub operational: bool,
    pub peers: Option<&'a PeerSnapshot>,
}

/// One step of the estimation chain.
pub trait PotentialTier: Send + Sync {
    fn method(&self) -> PotentialMethod;

    /// `None` when the tier does not apply to this row.
    fn estimate(&self, row: &BinnedAggregate, ctx: &EstimationContext<'_>) -> Option<Estimate>;
}

pub struct DirectTier;

impl PotentialTier for DirectTier {
    fn method(&self) -> PotentialMethod {
        PotentialMethod::Direct
    }

    fn estimate(&self, row: &BinnedAggregate, ctx: &EstimationContext<'_>) -> Option<Estimate> {
        if !ctx.operational {
            return None;
        }
        row.produced_energy.map(|value| Estimate {
            value,
            method: PotentialMethod::Direct,
        })
    }
}

pub struct PeerAverageTier {
    pub wake: WakeConfig,
}

impl PotentialTier for PeerAverageTier {
    fn method(&self) -> PotentialMethod {
        PotentialMethod::PeerAverageWakeCorrected
    }

    fn estimate(&self, row: &BinnedAggregate, ctx: &EstimationContext<'_>) -> Option<Estimate> {
        let peers = ctx.peers.filter(|p| p.operational_count > 0)?;
        let value = round2(
            peers.mean_energy * wake_correction_factor(peers.operational_count, &self.wake),
        );
        match row.produced_energy {
            Some(produced) if produced > value => Some(Estimate {
                value: produced,
                method: PotentialMethod::Direct,
            }),
            _ => Some(Estimate {
                value,
                method: self.method(),
            }),
        }
    }
}

pub struct AnemometerTier {
    pub curve: PowerCurve,
}

impl PotentialTier for AnemometerTier {
    fn method(&self) -> PotentialMethod {
        PotentialMethod::AnemometerCurve
    }

    fn estimate(&self, row: &BinnedAggregate, _ctx: &EstimationContext<'_>) -> Option<Estimate> {
        let wind_speed = row.wind_speed.or(row.met_wind_speed)?;
        let energy = self.curve.power_at(wind_speed).over_bin().value();
        Some(Estimate {
            value: energy.max(row.produced_energy.unwrap_or(0.0)),
            method: self.method(),
        })
    }
}

pub struct StatisticalTier {
    pub per_bin_energy: f64,
}

impl StatisticalTier {
    /// Integrates the curve against the distribution over 1..=25 m/s.
    /// `None` without a curve, a distribution or the month's factor.
    pub fn from_tables(tables: &CurveTables, park_efficiency: f64, month: u32) -> Option<Self> {
        let curve = PowerCurve::new(&tables.power_curve)?;
        if tables.wind_distribution.is_empty() {
            return None;
        }
        let seasonal = tables
            .seasonal_factors
            .iter()
            .find(|f| f.month == month)?
            .factor;

        let annual: f64 = (1..=25u32)
            .map(|v| {
                let weight = tables
                    .wind_distribution
                    .iter()
                    .find(|bin| bin.wind_speed == v)
                    .map_or(0.0, |bin| bin.weight);
                curve.power_at(f64::from(v)).value() * weight
            })
            .sum();

        let per_bin_energy = annual * park_efficiency / HOURS_PER_YEAR / BINS_PER_HOUR * seasonal;
        Some(Self { per_bin_energy })
    }
}

impl PotentialTier for StatisticalTier {
    fn method(&self) -> PotentialMethod {
        PotentialMethod::StatisticalWindEstimate
    }

    fn estimate(&self, row: &BinnedAggregate, _ctx: &EstimationContext<'_>) -> Option<Estimate> {
        Some(Estimate {
            value: self
                .per_bin_energy
                .max(row.produced_energy.unwrap_or(0.0)),
            method: self.method(),
        })
    }
}

/// Ordered fallback chain of tiers.
pub struct PotentialEstimator {
    tiers: Vec<Box<dyn PotentialTier>>,
}

impl PotentialEstimator {
    pub fn new(tiers: Vec<Box<dyn PotentialTier>>) -> Self {
        Self { tiers }
    }

    /// Chain for one period, built from whatever is configured.
    pub fn from_config(config: &EngineConfig, tables: &CurveTables, month: u32) -> Self {
        let mut tiers: Vec<Box<dyn PotentialTier>> = vec![Box::new(DirectTier)];
        if let Some(wake) = config.farm.wake {
            tiers.push(Box::new(PeerAverageTier { wake }));
        }
        if let Some(curve) = PowerCurve::new(&tables.power_curve) {
            tiers.push(Box::new(AnemometerTier { curve }));
        }
        if let Some(tier) =
            StatisticalTier::from_tables(tables, config.statistical.park_efficiency, month)
        {
            tiers.push(Box::new(tier));
        }
        Self::new(tiers)
    }

    pub fn methods(&self) -> Vec<PotentialMethod> {
        self.tiers.iter().map(|t| t.method()).collect()
    }

    pub fn estimate(&self, row: &BinnedAggregate, ctx: &EstimationContext<'_>) -> Option<Estimate> {
        self.tiers.iter().find_map(|tier| tier.estimate(row, ctx))
    }
}
