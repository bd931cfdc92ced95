use crate::core::degradation::CorrectedTestPoint;
use crate::core::units::TEMPERATURE_TOLERANCE;
use crate::errors::ScopError;
use itertools::Itertools;

/// Piecewise linear function through a set of breakpoints, extended beyond the outermost
/// breakpoints along the slope of the end segments.
#[derive(Clone, Debug, PartialEq)]
pub struct PiecewiseLinear {
    // sorted by x, at least two entries, no two x values within TEMPERATURE_TOLERANCE
    breakpoints: Vec<(f64, f64)>,
}

impl PiecewiseLinear {
    pub fn new(breakpoints: impl IntoIterator<Item = (f64, f64)>) -> Result<Self, ScopError> {
        let mut breakpoints = breakpoints.into_iter().collect_vec();
        if breakpoints.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(ScopError::AmbiguousTestData(
                "breakpoints must be finite".into(),
            ));
        }
        breakpoints.sort_by(|a, b| a.0.total_cmp(&b.0));

        if let Some(((x, _), _)) = breakpoints
            .iter()
            .tuple_windows()
            .find(|((x1, _), (x2, _))| (x2 - x1) <= TEMPERATURE_TOLERANCE)
        {
            return Err(ScopError::AmbiguousTestData(format!(
                "more than one breakpoint at {x}"
            )));
        }
        if breakpoints.len() < 2 {
            return Err(ScopError::AmbiguousTestData(format!(
                "at least two distinct breakpoints are needed, got {}",
                breakpoints.len()
            )));
        }

        Ok(Self { breakpoints })
    }

    pub fn value_at(&self, x: f64) -> f64 {
        // index of first breakpoint not below x
        let idx = self.breakpoints.partition_point(|(bx, _)| *bx < x);

        for candidate in [idx.checked_sub(1), Some(idx)].into_iter().flatten() {
            if let Some((bx, by)) = self.breakpoints.get(candidate) {
                if is_close!(*bx, x, abs_tol = TEMPERATURE_TOLERANCE) {
                    return *by;
                }
            }
        }

        let last = self.breakpoints.len() - 1;
        let upper = idx.clamp(1, last);
        let (x0, y0) = self.breakpoints[upper - 1];
        let (x1, y1) = self.breakpoints[upper];

        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}

/// Corrected COP and declared capacity as continuous functions of outdoor temperature.
#[derive(Clone, Debug, PartialEq)]
pub struct PerformanceCurves {
    cop: PiecewiseLinear,
    capacity: PiecewiseLinear,
}

impl PerformanceCurves {
    pub fn new(test_points: &[CorrectedTestPoint]) -> Result<Self, ScopError> {
        let sorted = test_points
            .iter()
            .sorted_by(|a, b| a.temperature.total_cmp(&b.temperature))
            .collect_vec();
        if let Some((first, second)) = sorted.iter().tuple_windows().find(|(a, b)| {
            is_close!(a.temperature, b.temperature, abs_tol = TEMPERATURE_TOLERANCE)
        }) {
            return Err(ScopError::AmbiguousTestData(format!(
                "test points {} and {} are both at {}ºC",
                first.label, second.label, first.temperature
            )));
        }

        Ok(Self {
            cop: PiecewiseLinear::new(sorted.iter().map(|point| (point.temperature, point.cop)))?,
            capacity: PiecewiseLinear::new(
                sorted
                    .iter()
                    .map(|point| (point.temperature, point.declared_capacity)),
            )?,
        })
    }

    /// COPbin at the given outdoor temperature
    pub fn cop(&self, temperature: f64) -> f64 {
        self.cop.value_at(temperature)
    }

    /// Declared capacity in kW at the given outdoor temperature
    pub fn capacity(&self, temperature: f64) -> f64 {
        self.capacity.value_at(temperature)
    }
}
