pub const WATTS_PER_KILOWATT: u32 = 1_000;

/// Outdoor temperature, in deg C, at and above which there is no space heating demand
pub const HEATING_LIMIT_TEMPERATURE: f64 = 16.;

/// Two temperatures closer than this, in K, are treated as the same test or bin temperature
pub const TEMPERATURE_TOLERANCE: f64 = 1e-6;

pub fn watts_to_kilowatts(power_w: f64) -> f64 {
    power_w / WATTS_PER_KILOWATT as f64
}

pub fn fraction_to_percent(fraction: f64) -> f64 {
    fraction * 100.
}
