pub mod climate;
pub mod degradation;
pub mod energy;
pub mod interpolation;
pub mod load_curve;
pub mod metrics;
pub mod off_mode;
pub mod units;
