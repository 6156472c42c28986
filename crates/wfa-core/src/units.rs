//! Unit newtypes for turbine quantities.
//!
//! SCADA tables mix instantaneous power (kW) and per-bin energy (kWh).
//! Keeping them as distinct types stops a power-curve lookup from being
//! added to a produced-energy counter without the 10-minute conversion.
//!
//! ```
//! use wfa_core::units::{Kilowatts, KilowattHours};
//!
//! let p = Kilowatts(2400.0);
//! let e: KilowattHours = p.over_bin();
//! assert_eq!(e, KilowattHours(400.0));
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Number of 10-minute bins in one hour.
pub const BINS_PER_HOUR: f64 = 6.0;

/// Hours in a (non-leap) year, used to scale annual energy figures.
pub const HOURS_PER_YEAR: f64 = 8760.0;

macro_rules! energy_unit {
    ($type:ident, $symbol:literal) => {
        impl $type {
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            #[inline]
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }
        }

        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, factor: f64) -> Self {
                Self(self.0 * factor)
            }
        }

        impl std::iter::Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.2} {}", self.0, $symbol)
            }
        }
    };
}

/// Instantaneous active power in kilowatts (kW)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Kilowatts(pub f64);

energy_unit!(Kilowatts, "kW");

/// Energy in kilowatt-hours (kWh), normally per 10-minute bin
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct KilowattHours(pub f64);

energy_unit!(KilowattHours, "kWh");

impl Kilowatts {
    /// Energy delivered by holding this power for one 10-minute bin.
    #[inline]
    pub fn over_bin(self) -> KilowattHours {
        KilowattHours(self.0 / BINS_PER_HOUR)
    }
}
