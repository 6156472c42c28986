//! Engine configuration.
//!
//! Every threshold the engine compares against is a named value here with the
//! installation's tuned default. Loading from disk lives in `wfa-io`; this
//! module only defines the shape, the defaults and [`EngineConfig::validate`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{WfaError, WfaResult};
use crate::model::TurbineId;

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub farm: FarmConfig,
    #[serde(default)]
    pub alarms: AlarmCodesConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub sanity: SanityConfig,
    #[serde(default)]
    pub statistical: StatisticalConfig,
    #[serde(default)]
    pub tables: TablesConfig,
}

/// Turbine roster and wake model
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FarmConfig {
    /// Ordered turbine list; the order defines neighbour adjacency
    #[serde(default)]
    pub turbine_ids: Vec<i64>,
    /// Contiguous id range, used when `turbine_ids` is empty
    #[serde(default)]
    pub first_turbine: Option<i64>,
    #[serde(default)]
    pub last_turbine: Option<i64>,
    /// Enables the wake-corrected peer average when present
    #[serde(default)]
    pub wake: Option<WakeConfig>,
}

impl FarmConfig {
    /// The configured turbines in adjacency order.
    pub fn turbines(&self) -> Vec<TurbineId> {
        if !self.turbine_ids.is_empty() {
            return self.turbine_ids.iter().copied().map(TurbineId::new).collect();
        }
        match (self.first_turbine, self.last_turbine) {
            (Some(first), Some(last)) if first <= last => {
                (first..=last).map(TurbineId::new).collect()
            }
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WakeConfig {
    #[serde(default = "default_total_turbines")]
    pub total_turbines: u32,
    #[serde(default = "default_wake_loss")]
    pub wake_loss: f64,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            total_turbines: default_total_turbines(),
            wake_loss: default_wake_loss(),
        }
    }
}

fn default_total_turbines() -> u32 {
    131
}

fn default_wake_loss() -> f64 {
    0.08
}

/// Special alarm codes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmCodesConfig {
    /// Grid blackout; voids overlapping lower-priority alarms
    #[serde(default = "default_blackout_code")]
    pub blackout_code: i64,
    /// Local power limit warning, tracked apart from type0/type1
    #[serde(default = "default_local_power_limit_code")]
    pub local_power_limit_code: i64,
    /// Substring of an alarm description that marks a low-wind stop
    #[serde(default = "default_low_wind_text")]
    pub low_wind_text: String,
}

impl Default for AlarmCodesConfig {
    fn default() -> Self {
        Self {
            blackout_code: default_blackout_code(),
            local_power_limit_code: default_local_power_limit_code(),
            low_wind_text: default_low_wind_text(),
        }
    }
}

fn default_blackout_code() -> i64 {
    1005
}

fn default_local_power_limit_code() -> i64 {
    2006
}

fn default_low_wind_text() -> String {
    "low wind".to_string()
}

/// Classification and loss-rule thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_operational_rated_power")]
    pub operational_rated_power_kw: f64,
    #[serde(default = "default_curtailment_rated_power")]
    pub curtailment_rated_power_kw: f64,
    /// Neighbours must exceed the turbine's wind speed by more than this (m/s)
    #[serde(default = "default_low_wind_margin")]
    pub low_wind_margin: f64,
    /// At least one of the three speeds must reach this (m/s)
    #[serde(default = "default_low_wind_min_speed")]
    pub low_wind_min_speed: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            operational_rated_power_kw: default_operational_rated_power(),
            curtailment_rated_power_kw: default_curtailment_rated_power(),
            low_wind_margin: default_low_wind_margin(),
            low_wind_min_speed: default_low_wind_min_speed(),
        }
    }
}

fn default_operational_rated_power() -> f64 {
    2200.0
}

fn default_curtailment_rated_power() -> f64 {
    2300.0
}

fn default_low_wind_margin() -> f64 {
    1.0
}

fn default_low_wind_min_speed() -> f64 {
    5.0
}

/// Inclusive `[min, max]` range, written as a two-element array in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange(pub f64, pub f64);

impl ValueRange {
    pub fn min(&self) -> f64 {
        self.0
    }

    pub fn max(&self) -> f64 {
        self.1
    }

    /// NaN is never contained.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.0 && value <= self.1
    }

    fn is_ordered(&self) -> bool {
        self.0.is_finite() && self.1.is_finite() && self.0 <= self.1
    }
}

impl std::fmt::Display for ValueRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.0, self.1)
    }
}

/// Physical plausibility limits applied by the sanity filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanityConfig {
    #[serde(default = "default_power_range")]
    pub power_kw: ValueRange,
    #[serde(default = "default_energy_range")]
    pub energy_kwh: ValueRange,
    #[serde(default = "default_net_energy_range")]
    pub net_energy_kwh: ValueRange,
    #[serde(default = "default_wind_speed_range")]
    pub wind_speed: ValueRange,
    #[serde(default = "default_wind_direction_range")]
    pub wind_direction: ValueRange,
    #[serde(default = "default_curtailment_range")]
    pub curtailment_secs: ValueRange,
    /// Consecutive identical met wind speeds that mark a frozen sensor
    #[serde(default = "default_met_stuck_intervals")]
    pub met_stuck_intervals: usize,
}

impl Default for SanityConfig {
    fn default() -> Self {
        Self {
            power_kw: default_power_range(),
            energy_kwh: default_energy_range(),
            net_energy_kwh: default_net_energy_range(),
            wind_speed: default_wind_speed_range(),
            wind_direction: default_wind_direction_range(),
            curtailment_secs: default_curtailment_range(),
            met_stuck_intervals: default_met_stuck_intervals(),
        }
    }
}

fn default_power_range() -> ValueRange {
    ValueRange(-1000.0, 2600.0)
}

fn default_energy_range() -> ValueRange {
    ValueRange(0.0, 500.0)
}

fn default_net_energy_range() -> ValueRange {
    ValueRange(-500.0, 500.0)
}

fn default_wind_speed_range() -> ValueRange {
    ValueRange(0.0, 50.0)
}

fn default_wind_direction_range() -> ValueRange {
    ValueRange(0.0, 360.0)
}

fn default_curtailment_range() -> ValueRange {
    ValueRange(0.0, 600.0)
}

fn default_met_stuck_intervals() -> usize {
    6
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticalConfig {
    #[serde(default = "default_park_efficiency")]
    pub park_efficiency: f64,
}

impl Default for StatisticalConfig {
    fn default() -> Self {
        Self {
            park_efficiency: default_park_efficiency(),
        }
    }
}

fn default_park_efficiency() -> f64 {
    0.92
}

/// Optional curve-table CSV paths, relative to the config file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TablesConfig {
    #[serde(default)]
    pub power_curve: Option<PathBuf>,
    #[serde(default)]
    pub seasonal_factors: Option<PathBuf>,
    #[serde(default)]
    pub wind_distribution: Option<PathBuf>,
}

impl EngineConfig {
    /// Config for an explicit turbine list with every other value defaulted.
    pub fn for_turbines(turbines: &[i64]) -> Self {
        Self {
            farm: FarmConfig {
                turbine_ids: turbines.to_vec(),
                ..FarmConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> WfaResult<()> {
        let roster = self.farm.turbines().len();
        if roster == 0 {
            return Err(WfaError::Config(
                "farm must list turbine_ids or a first_turbine..last_turbine range".into(),
            ));
        }

        if let Some(wake) = &self.farm.wake {
            if wake.total_turbines < 2 {
                return Err(WfaError::Config(format!(
                    "farm.wake.total_turbines must be at least 2, got {}",
                    wake.total_turbines
                )));
            }
            if roster > wake.total_turbines as usize {
                return Err(WfaError::Config(format!(
                    "farm lists {} turbines but farm.wake.total_turbines is {}",
                    roster, wake.total_turbines
                )));
            }
            if !(0.0..1.0).contains(&wake.wake_loss) {
                return Err(WfaError::Config(format!(
                    "farm.wake.wake_loss must be in [0, 1), got {}",
                    wake.wake_loss
                )));
            }
        }

        let ranges = [
            ("power_kw", self.sanity.power_kw),
            ("energy_kwh", self.sanity.energy_kwh),
            ("net_energy_kwh", self.sanity.net_energy_kwh),
            ("wind_speed", self.sanity.wind_speed),
            ("wind_direction", self.sanity.wind_direction),
            ("curtailment_secs", self.sanity.curtailment_secs),
        ];
        for (name, range) in ranges {
            if !range.is_ordered() {
                return Err(WfaError::Config(format!(
                    "sanity.{} range {} is inverted or not finite",
                    name, range
                )));
            }
        }

        if self.sanity.met_stuck_intervals < 2 {
            return Err(WfaError::Config(format!(
                "sanity.met_stuck_intervals must be at least 2, got {}",
                self.sanity.met_stuck_intervals
            )));
        }

        if !(self.statistical.park_efficiency > 0.0 && self.statistical.park_efficiency <= 1.0) {
            return Err(WfaError::Config(format!(
                "statistical.park_efficiency must be in (0, 1], got {}",
                self.statistical.park_efficiency
            )));
        }

        Ok(())
    }
}
