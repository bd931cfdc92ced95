use crate::core::climate::OffModeHours;
use crate::core::units::watts_to_kilowatts;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;

/// Electrical power drawn in each non-active mode, in W as declared on certificates.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize, Validate)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct OffModePowers {
    /// Poff
    #[serde(alias = "Poff", default)]
    #[validate(minimum = 0.)]
    pub off: f64,
    /// Pto
    #[serde(alias = "Pto", default)]
    #[validate(minimum = 0.)]
    pub thermostat_off: f64,
    /// Psb
    #[serde(alias = "Psb", default)]
    #[validate(minimum = 0.)]
    pub standby: f64,
    /// Pck
    #[serde(alias = "Pck", default)]
    #[validate(minimum = 0.)]
    pub crankcase_heater: f64,
}

/// Annual electricity use in kWh for each non-active mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct OffModeEnergy {
    pub off: f64,
    pub thermostat_off: f64,
    pub standby: f64,
    pub crankcase_heater: f64,
}

impl OffModeEnergy {
    /// Q_offmode
    pub fn total(&self) -> f64 {
        self.off + self.thermostat_off + self.standby + self.crankcase_heater
    }
}

pub fn off_mode_energy(hours: OffModeHours, powers: &OffModePowers) -> OffModeEnergy {
    OffModeEnergy {
        off: hours.off * watts_to_kilowatts(powers.off),
        thermostat_off: hours.thermostat_off * watts_to_kilowatts(powers.thermostat_off),
        standby: hours.standby * watts_to_kilowatts(powers.standby),
        crankcase_heater: hours.crankcase_heater * watts_to_kilowatts(powers.crankcase_heater),
    }
}
