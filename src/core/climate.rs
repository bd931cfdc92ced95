use crate::errors::ScopError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString};

/// This module holds the reference heating seasons of EN 14825:2018: the outdoor temperature bins
/// and their annual hours (Annex B), the design temperatures, and the hours spent in each
/// off mode (Annex A). All of it is constant for the lifetime of the process.

#[derive(
    Clone, Copy, Debug, Deserialize, Display, EnumIter, EnumString, Eq, Hash, PartialEq, Serialize,
)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
pub enum ClimateZone {
    Average,
    Warmer,
    Colder,
}

impl ClimateZone {
    pub fn from_name(name: &str) -> Result<Self, ScopError> {
        ClimateZone::from_str(name.trim()).map_err(|_| ScopError::UnsupportedClimate(name.into()))
    }

    /// Climate zone for the second digit of a certificate dimension token (e.g. the 3 in 4_3_0_0)
    pub fn from_dimension_digit(digit: &str) -> Option<Self> {
        match digit {
            "1" => Some(ClimateZone::Warmer),
            "2" => Some(ClimateZone::Colder),
            "3" => Some(ClimateZone::Average),
            _ => None,
        }
    }

    pub fn profile(&self) -> &'static ClimateProfile {
        match self {
            ClimateZone::Average => &AVERAGE,
            ClimateZone::Warmer => &WARMER,
            ClimateZone::Colder => &COLDER,
        }
    }
}

/// One outdoor temperature bin of the reference heating season.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TemperatureBin {
    /// bin number j as numbered in the standard
    pub index: u8,
    /// outdoor dry bulb temperature Tj, in deg C
    pub temperature: f64,
    /// annual hours hj
    pub hours: f64,
}

const fn bin(index: u8, temperature: f64, hours: f64) -> TemperatureBin {
    TemperatureBin {
        index,
        temperature,
        hours,
    }
}

/// Annual hours spent in each mode in which the unit is not actively heating.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct OffModeHours {
    /// HOFF
    pub off: f64,
    /// HTO
    pub thermostat_off: f64,
    /// HSB
    pub standby: f64,
    /// HCK
    pub crankcase_heater: f64,
}

#[derive(Debug)]
pub struct ClimateProfile {
    zone: ClimateZone,
    design_temperature: f64,
    equivalent_active_mode_hours: f64,
    published_annual_hours: f64,
    off_mode_hours: OffModeHours,
    bins: &'static [TemperatureBin],
}

impl ClimateProfile {
    pub fn for_name(name: &str) -> Result<&'static Self, ScopError> {
        Ok(ClimateZone::from_name(name)?.profile())
    }

    pub fn zone(&self) -> ClimateZone {
        self.zone
    }

    /// Reference design temperature Tdesignh, in deg C
    pub fn design_temperature(&self) -> f64 {
        self.design_temperature
    }

    /// Equivalent active mode hours HHE
    pub fn equivalent_active_mode_hours(&self) -> f64 {
        self.equivalent_active_mode_hours
    }

    /// Total hours of the heating season as published alongside the bin table
    pub fn published_annual_hours(&self) -> f64 {
        self.published_annual_hours
    }

    pub fn off_mode_hours(&self) -> OffModeHours {
        self.off_mode_hours
    }

    /// Temperature bins in ascending order of temperature
    pub fn bins(&self) -> &'static [TemperatureBin] {
        self.bins
    }

    pub fn total_bin_hours(&self) -> f64 {
        self.bins.iter().map(|bin| bin.hours).sum()
    }
}

pub fn bins(zone: ClimateZone) -> &'static [TemperatureBin] {
    zone.profile().bins()
}

pub fn design_temperature(zone: ClimateZone) -> f64 {
    zone.profile().design_temperature()
}

pub fn off_mode_hours(zone: ClimateZone) -> OffModeHours {
    zone.profile().off_mode_hours()
}

static AVERAGE: ClimateProfile = ClimateProfile {
    zone: ClimateZone::Average,
    design_temperature: -10.,
    equivalent_active_mode_hours: 2066.,
    published_annual_hours: 4910.,
    off_mode_hours: OffModeHours {
        off: 3672.,
        thermostat_off: 179.,
        standby: 0.,
        crankcase_heater: 3851.,
    },
    bins: &AVERAGE_BINS,
};

static WARMER: ClimateProfile = ClimateProfile {
    zone: ClimateZone::Warmer,
    design_temperature: 2.,
    equivalent_active_mode_hours: 1336.,
    published_annual_hours: 3590.,
    off_mode_hours: OffModeHours {
        off: 4345.,
        thermostat_off: 755.,
        standby: 0.,
        crankcase_heater: 4476.,
    },
    bins: &WARMER_BINS,
};

static COLDER: ClimateProfile = ClimateProfile {
    zone: ClimateZone::Colder,
    design_temperature: -22.,
    equivalent_active_mode_hours: 2465.,
    published_annual_hours: 6446.,
    off_mode_hours: OffModeHours {
        off: 2189.,
        thermostat_off: 131.,
        standby: 0.,
        crankcase_heater: 2944.,
    },
    bins: &COLDER_BINS,
};

static AVERAGE_BINS: [TemperatureBin; 26] = [
    bin(21, -10., 1.),
    bin(22, -9., 25.),
    bin(23, -8., 23.),
    bin(24, -7., 24.),
    bin(25, -6., 27.),
    bin(26, -5., 68.),
    bin(27, -4., 91.),
    bin(28, -3., 89.),
    bin(29, -2., 165.),
    bin(30, -1., 173.),
    bin(31, 0., 240.),
    bin(32, 1., 280.),
    bin(33, 2., 320.),
    bin(34, 3., 357.),
    bin(35, 4., 356.),
    bin(36, 5., 303.),
    bin(37, 6., 330.),
    bin(38, 7., 326.),
    bin(39, 8., 348.),
    bin(40, 9., 335.),
    bin(41, 10., 315.),
    bin(42, 11., 215.),
    bin(43, 12., 169.),
    bin(44, 13., 151.),
    bin(45, 14., 105.),
    bin(46, 15., 74.),
];

static WARMER_BINS: [TemperatureBin; 14] = [
    bin(33, 2., 3.),
    bin(34, 3., 22.),
    bin(35, 4., 63.),
    bin(36, 5., 63.),
    bin(37, 6., 175.),
    bin(38, 7., 162.),
    bin(39, 8., 259.),
    bin(40, 9., 360.),
    bin(41, 10., 428.),
    bin(42, 11., 430.),
    bin(43, 12., 503.),
    bin(44, 13., 444.),
    bin(45, 14., 384.),
    bin(46, 15., 294.),
];

static COLDER_BINS: [TemperatureBin; 38] = [
    bin(9, -22., 1.),
    bin(10, -21., 6.),
    bin(11, -20., 13.),
    bin(12, -19., 17.),
    bin(13, -18., 19.),
    bin(14, -17., 26.),
    bin(15, -16., 39.),
    bin(16, -15., 41.),
    bin(17, -14., 35.),
    bin(18, -13., 52.),
    bin(19, -12., 37.),
    bin(20, -11., 41.),
    bin(21, -10., 43.),
    bin(22, -9., 54.),
    bin(23, -8., 90.),
    bin(24, -7., 125.),
    bin(25, -6., 169.),
    bin(26, -5., 195.),
    bin(27, -4., 278.),
    bin(28, -3., 306.),
    bin(29, -2., 454.),
    bin(30, -1., 385.),
    bin(31, 0., 490.),
    bin(32, 1., 533.),
    bin(33, 2., 380.),
    bin(34, 3., 228.),
    bin(35, 4., 261.),
    bin(36, 5., 279.),
    bin(37, 6., 229.),
    bin(38, 7., 269.),
    bin(39, 8., 233.),
    bin(40, 9., 230.),
    bin(41, 10., 243.),
    bin(42, 11., 191.),
    bin(43, 12., 146.),
    bin(44, 13., 150.),
    bin(45, 14., 97.),
    bin(46, 15., 61.),
];
