//! Data model shared by the engine, the loaders and the writers.
//!
//! Input tables (alarms, classification, telemetry, curve tables) are plain
//! records; everything derived from them (effective intervals, binned
//! aggregates, ledger rows) lives only for the duration of one period's
//! computation.

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurbineId(i64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(i64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MastId(i64);

macro_rules! impl_id {
    ($type:ident) => {
        impl $type {
            #[inline]
            pub fn new(value: i64) -> Self {
                $type(value)
            }
            #[inline]
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

impl_id!(TurbineId);
impl_id!(AlarmId);
impl_id!(MastId);

/// Reporting period. Both bounds are inclusive bin timestamps on the
/// 10-minute grid; bins are labelled by their end instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPeriod {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ReportingPeriod {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Calendar month (1-12) the period belongs to, taken from its start.
    pub fn month(&self) -> u32 {
        self.start.month()
    }

    /// `YYYY-MM` label used for output naming.
    pub fn label(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }
}

// =============================================================================
// Alarms
// =============================================================================

/// One alarm as logged by the turbine controller, possibly already adjusted
/// by the manual override store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAlarmEvent {
    pub id: AlarmId,
    pub turbine_id: TurbineId,
    pub alarm_code: i64,
    pub time_on: NaiveDateTime,
    pub time_off: Option<NaiveDateTime>,
    pub parameter: String,
}

/// Classification of an alarm code: responsibility type and free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmClass {
    pub alarm_code: i64,
    pub error_type: i64,
    pub description: String,
}

/// Bucket an alarm's seconds are accounted under once binned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmCategory {
    /// Error type 0
    Type0,
    /// Error type 1
    Type1,
    /// Local power limit warning; tracked apart from the type0/type1 split
    LocalPowerLimit,
}

impl AlarmCategory {
    /// Maps a classification `error_type` onto the counted categories.
    /// Any other type is not part of the availability calculation.
    pub fn from_error_type(error_type: i64) -> Option<Self> {
        match error_type {
            0 => Some(AlarmCategory::Type0),
            1 => Some(AlarmCategory::Type1),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmCategory::Type0 => "type0",
            AlarmCategory::Type1 => "type1",
            AlarmCategory::LocalPowerLimit => "local_power_limit",
        }
    }
}

/// A normalised alarm: clipped to the period, joined to its classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmInterval {
    pub turbine_id: TurbineId,
    pub alarm_id: AlarmId,
    pub alarm_code: i64,
    pub category: AlarmCategory,
    pub time_on: NaiveDateTime,
    pub time_off: NaiveDateTime,
    pub parameter: String,
    pub description: String,
}

/// How the cascade placed an interval relative to the running maximum end
/// time of the intervals before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadePlacement {
    Root,
    Child,
    Embedded,
}

/// An alarm span after removing time already covered by an earlier
/// overlapping alarm on the same turbine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveAlarmInterval {
    pub turbine_id: TurbineId,
    pub source_alarm_id: AlarmId,
    pub alarm_code: i64,
    pub category: AlarmCategory,
    /// Start before cascading
    pub time_on: NaiveDateTime,
    pub effective_time_on: NaiveDateTime,
    pub time_off: NaiveDateTime,
    pub placement: CascadePlacement,
    pub parameter: String,
    pub description: String,
}

impl EffectiveAlarmInterval {
    pub fn effective_secs(&self) -> i64 {
        (self.time_off - self.effective_time_on).num_seconds().max(0)
    }

    pub fn is_zero_length(&self) -> bool {
        self.time_off <= self.effective_time_on
    }

    /// Strict overlap of the effective spans; touching endpoints do not count.
    pub fn overlaps(&self, other: &EffectiveAlarmInterval) -> bool {
        self.effective_time_on < other.time_off && other.effective_time_on < self.time_off
    }

    /// Back to a plain interval starting at the effective start.
    pub fn to_interval(&self) -> AlarmInterval {
        AlarmInterval {
            turbine_id: self.turbine_id,
            alarm_id: self.source_alarm_id,
            alarm_code: self.alarm_code,
            category: self.category,
            time_on: self.effective_time_on,
            time_off: self.time_off,
            parameter: self.parameter.clone(),
            description: self.description.clone(),
        }
    }
}

// =============================================================================
// Telemetry
// =============================================================================

/// Energy counter over one bin (kWh). `net_energy_kwh` is the signed counter
/// that includes self-consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterReading {
    pub turbine_id: TurbineId,
    pub timestamp: NaiveDateTime,
    pub energy_kwh: f64,
    pub net_energy_kwh: Option<f64>,
}

/// Grid-side active power statistics over one bin (kW).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridReading {
    pub turbine_id: TurbineId,
    pub timestamp: NaiveDateTime,
    pub power_min_kw: f64,
    pub power_max_kw: f64,
    pub power_mean_kw: f64,
}

/// Nacelle anemometer and wind vane over one bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurbineReading {
    pub turbine_id: TurbineId,
    pub timestamp: NaiveDateTime,
    pub wind_speed: f64,
    pub wind_direction: f64,
}

/// Met-mast reading; keyed by mast, not by turbine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetReading {
    pub mast_id: MastId,
    pub timestamp: NaiveDateTime,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
}

/// Seconds within the bin during which the power reduction signal was on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurtailmentReading {
    pub turbine_id: TurbineId,
    pub timestamp: NaiveDateTime,
    pub power_reduction_secs: f64,
}

/// All telemetry tables for one period.
#[derive(Debug, Clone, Default)]
pub struct TelemetryTables {
    pub counters: Vec<CounterReading>,
    pub grid: Vec<GridReading>,
    pub turbine: Vec<TurbineReading>,
    pub met: Vec<MetReading>,
    pub curtailment: Vec<CurtailmentReading>,
}

// =============================================================================
// Curve tables
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerCurvePoint {
    pub wind_speed: f64,
    pub power_kw: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonalFactor {
    pub month: u32,
    pub factor: f64,
}

/// Normalised share of the year spent in one integer wind-speed bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindDistributionBin {
    pub wind_speed: u32,
    pub weight: f64,
}

/// Configuration tables used by the curve-based estimators. Empty tables
/// mean "not configured".
#[derive(Debug, Clone, Default)]
pub struct CurveTables {
    pub power_curve: Vec<PowerCurvePoint>,
    pub seasonal_factors: Vec<SeasonalFactor>,
    pub wind_distribution: Vec<WindDistributionBin>,
}

// =============================================================================
// Binned and ledger rows
// =============================================================================

/// Alarm seconds and joined telemetry for one (turbine, bin).
///
/// Alarm seconds default to 0 ("confirmed no downtime"); measurements stay
/// `None` when absent ("data absent").
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BinnedAggregate {
    pub turbine_id: TurbineId,
    pub timestamp: NaiveDateTime,
    pub alarm_secs: f64,
    pub type0_secs: f64,
    pub type1_secs: f64,
    pub local_power_limit_secs: f64,
    /// Descriptions of contributing alarms joined with `|`
    pub alarm_text: String,
    pub produced_energy: Option<f64>,
    pub net_energy: Option<f64>,
    pub power_min: Option<f64>,
    pub power_max: Option<f64>,
    pub power_mean: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub met_wind_speed: Option<f64>,
    pub met_wind_direction: Option<f64>,
    pub curtailment_secs: Option<f64>,
}

impl Default for TurbineId {
    fn default() -> Self {
        TurbineId(0)
    }
}

/// Tier that produced a row's potential energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PotentialMethod {
    Direct,
    PeerAverageWakeCorrected,
    AnemometerCurve,
    StatisticalWindEstimate,
}

impl PotentialMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PotentialMethod::Direct => "direct",
            PotentialMethod::PeerAverageWakeCorrected => "peer_average_wake_corrected",
            PotentialMethod::AnemometerCurve => "anemometer_curve",
            PotentialMethod::StatisticalWindEstimate => "statistical_wind_estimate",
        }
    }
}

/// Cause the non-alarm part of a row's loss was attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossCategory {
    Curtailment,
    LocalPowerLimit,
    LowWind,
    LowWindRecovery,
    PostAlarmRecovery,
    Unattributed,
}

impl LossCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LossCategory::Curtailment => "curtailment",
            LossCategory::LocalPowerLimit => "local_power_limit",
            LossCategory::LowWind => "low_wind",
            LossCategory::LowWindRecovery => "low_wind_recovery",
            LossCategory::PostAlarmRecovery => "post_alarm_recovery",
            LossCategory::Unattributed => "unattributed",
        }
    }
}

/// Energy loss of one row split by cause (kWh).
///
/// `unattributed` is the explicit residual: it is always derived last as
/// `total - categorized()`, so `categorized() + unattributed == total`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LossBreakdown {
    pub total: f64,
    pub type0: f64,
    pub type1: f64,
    pub curtailment: f64,
    pub local_power_limit: f64,
    pub low_wind: f64,
    pub low_wind_recovery: f64,
    pub post_alarm_recovery: f64,
    pub misassigned: f64,
    pub unattributed: f64,
}

impl LossBreakdown {
    /// Sum of every category except the residual.
    pub fn categorized(&self) -> f64 {
        self.type0
            + self.type1
            + self.curtailment
            + self.local_power_limit
            + self.low_wind
            + self.low_wind_recovery
            + self.post_alarm_recovery
            + self.misassigned
    }

    pub fn reconciles(&self) -> bool {
        self.categorized() + self.unattributed == self.total
    }
}

/// One (turbine, bin) row of the energy-loss ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyLedgerRow {
    pub turbine_id: TurbineId,
    pub timestamp: NaiveDateTime,
    pub operational: bool,
    pub produced_energy: Option<f64>,
    /// `None` only when no estimation tier applied
    pub potential_energy: Option<f64>,
    pub potential_method: Option<PotentialMethod>,
    pub losses: Option<LossBreakdown>,
    /// Rule that received the non-alarm share of the loss, if any
    pub loss_category: Option<LossCategory>,
    pub alarm_secs: f64,
    pub type0_secs: f64,
    pub type1_secs: f64,
    pub local_power_limit_secs: f64,
    pub alarm_text: String,
    pub wind_speed: Option<f64>,
    pub power_min: Option<f64>,
    pub power_max: Option<f64>,
    pub curtailment_secs: Option<f64>,
    pub met_wind_speed: Option<f64>,
}
