use crate::compare_floats::max_of_2;
use crate::core::units::HEATING_LIMIT_TEMPERATURE;
use crate::errors::ScopError;

/// Reference space heating load line of the building, falling linearly from the design load at
/// the design temperature to zero at the heating limit temperature.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadCurve {
    design_load: f64,
    design_temperature: f64,
}

impl LoadCurve {
    /// Arguments:
    /// * `design_load` - full load Pdesignh at the design temperature, in kW
    /// * `design_temperature` - reference design temperature Tdesignh of the climate, in deg C
    pub fn new(design_load: f64, design_temperature: f64) -> Result<Self, ScopError> {
        if !design_load.is_finite() || design_load <= 0. {
            return Err(ScopError::InvalidConfiguration(format!(
                "design heating load must be a positive number of kW, got {design_load}"
            )));
        }
        Self::check_design_temperature(design_temperature)?;

        Ok(Self {
            design_load,
            design_temperature,
        })
    }

    fn check_design_temperature(design_temperature: f64) -> Result<(), ScopError> {
        if !design_temperature.is_finite() {
            return Err(ScopError::InvalidConfiguration(format!(
                "design temperature must be finite, got {design_temperature}"
            )));
        }
        if is_close!(
            design_temperature,
            HEATING_LIMIT_TEMPERATURE,
            abs_tol = f64::EPSILON
        ) {
            return Err(ScopError::InvalidConfiguration(format!(
                "design temperature cannot equal the heating limit temperature of {HEATING_LIMIT_TEMPERATURE}ºC"
            )));
        }
        Ok(())
    }

    pub fn design_load(&self) -> f64 {
        self.design_load
    }

    pub fn design_temperature(&self) -> f64 {
        self.design_temperature
    }

    /// Part load ratio pl(Tj), zero at and above the heating limit temperature.
    pub fn part_load_ratio(&self, temperature: f64) -> f64 {
        part_load_ratio(temperature, self.design_temperature)
    }

    /// Heating load Ph(Tj) in kW
    pub fn load(&self, temperature: f64) -> f64 {
        self.design_load * self.part_load_ratio(temperature)
    }

    /// Design load for which the load line passes through the given capacity at the given
    /// temperature. Used when only the declared capacity at the bivalent point is known.
    pub fn infer_design_load(
        capacity_at_temperature: f64,
        temperature: f64,
        design_temperature: f64,
    ) -> Result<f64, ScopError> {
        Self::check_design_temperature(design_temperature)?;
        let ratio = part_load_ratio(temperature, design_temperature);
        if ratio <= 0. {
            return Err(ScopError::InvalidConfiguration(format!(
                "cannot infer design load from a point at {temperature}ºC where there is no heating load"
            )));
        }

        Ok(capacity_at_temperature / ratio)
    }
}

fn part_load_ratio(temperature: f64, design_temperature: f64) -> f64 {
    max_of_2(
        (temperature - HEATING_LIMIT_TEMPERATURE)
            / (design_temperature - HEATING_LIMIT_TEMPERATURE),
        0.,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn average_load_curve() -> LoadCurve {
        LoadCurve::new(11.46, -10.).unwrap()
    }

    #[rstest]
    #[case(-10., 11.46)]
    #[case(16., 0.)]
    #[case(20., 0.)]
    #[case(3., 11.46 * 13. / 26.)]
    pub fn should_follow_load_line(
        average_load_curve: LoadCurve,
        #[case] temperature: f64,
        #[case] expected_load: f64,
    ) {
        assert_relative_eq!(
            average_load_curve.load(temperature),
            expected_load,
            max_relative = 1e-12
        );
    }

    #[rstest]
    pub fn should_give_part_load_ratios(average_load_curve: LoadCurve) {
        assert_eq!(average_load_curve.part_load_ratio(-10.), 1.);
        assert_relative_eq!(
            average_load_curve.part_load_ratio(-7.),
            23. / 26.,
            max_relative = 1e-12
        );
        assert_eq!(average_load_curve.part_load_ratio(16.), 0.);
        assert_relative_eq!(
            average_load_curve.part_load_ratio(-22.),
            38. / 26.,
            max_relative = 1e-12
        );
    }

    #[rstest]
    #[case(0.)]
    #[case(-3.)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    pub fn should_reject_non_positive_design_load(#[case] design_load: f64) {
        assert!(matches!(
            LoadCurve::new(design_load, -10.),
            Err(ScopError::InvalidConfiguration(_))
        ));
    }

    #[rstest]
    pub fn should_reject_degenerate_design_temperature() {
        assert!(matches!(
            LoadCurve::new(8., 16.),
            Err(ScopError::InvalidConfiguration(_))
        ));
    }

    #[rstest]
    pub fn should_infer_design_load_from_bivalent_point() {
        let inferred = LoadCurve::infer_design_load(9.7, -6., -10.).unwrap();
        assert_relative_eq!(inferred, 9.7 * 26. / 22., max_relative = 1e-12);
        assert_relative_eq!(inferred, 11.46, max_relative = 1e-3);
    }

    #[rstest]
    pub fn should_not_infer_design_load_without_heating_load() {
        assert!(matches!(
            LoadCurve::infer_design_load(9.7, 16., -10.),
            Err(ScopError::InvalidConfiguration(_))
        ));
    }
}
