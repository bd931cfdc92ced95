use crate::core::load_curve::LoadCurve;
use crate::errors::{NumericAnomaly, ScopError};
use crate::input::{TestLabel, TestPoint, TestPointSet};
use serde::Serialize;

/// A test point with its COP corrected for on/off cycling at part load.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CorrectedTestPoint {
    pub label: TestLabel,
    /// Tj, in deg C
    pub temperature: f64,
    /// Pdh, in kW
    pub declared_capacity: f64,
    /// COPd
    pub declared_cop: f64,
    /// Cd actually applied
    pub degradation_coefficient: f64,
    /// Building heating load Ph at Tj, in kW
    pub load: f64,
    /// CR
    pub capacity_ratio: f64,
    /// CC
    pub correction_factor: f64,
    /// COPbin at Tj
    pub cop: f64,
}

impl CorrectedTestPoint {
    pub fn anomaly(&self) -> Option<NumericAnomaly> {
        (self.cop <= 0.).then_some(NumericAnomaly::NonPositiveCorrectedCop {
            label: self.label,
            temperature: self.temperature,
            cop: self.cop,
        })
    }
}

/// Correction factor CC for a capacity ratio CR. The unit only cycles when the load is a
/// positive fraction of its capacity; otherwise there is nothing to correct.
pub fn correction_factor(capacity_ratio: f64, degradation_coefficient: f64) -> f64 {
    if capacity_ratio > 0. && capacity_ratio < 1. {
        (capacity_ratio * degradation_coefficient + (1. - degradation_coefficient)) / capacity_ratio
    } else {
        1.
    }
}

pub fn correct_test_point(
    label: TestLabel,
    point: &TestPoint,
    load_curve: &LoadCurve,
    default_degradation_coefficient: f64,
) -> Result<CorrectedTestPoint, ScopError> {
    let invalid = |reason: String| ScopError::InvalidTestPoint { label, reason };

    if !point.capacity.is_finite() || point.capacity <= 0. {
        return Err(invalid(format!(
            "declared capacity must be positive, got {} kW",
            point.capacity
        )));
    }
    if !point.cop.is_finite() || !point.temperature.is_finite() {
        return Err(invalid("temperature and COP must be finite".into()));
    }
    let degradation_coefficient = point
        .degradation_coefficient
        .unwrap_or(default_degradation_coefficient);
    if !(0. ..=1.).contains(&degradation_coefficient) {
        return Err(invalid(format!(
            "degradation coefficient must lie between 0 and 1, got {degradation_coefficient}"
        )));
    }

    let load = load_curve.load(point.temperature);
    let capacity_ratio = load / point.capacity;
    let correction_factor = correction_factor(capacity_ratio, degradation_coefficient);

    Ok(CorrectedTestPoint {
        label,
        temperature: point.temperature,
        declared_capacity: point.capacity,
        declared_cop: point.cop,
        degradation_coefficient,
        load,
        capacity_ratio,
        correction_factor,
        cop: point.cop / correction_factor,
    })
}

/// Corrected points in label order.
pub fn correct_test_points(
    test_points: &TestPointSet,
    load_curve: &LoadCurve,
    default_degradation_coefficient: f64,
) -> Result<Vec<CorrectedTestPoint>, ScopError> {
    test_points
        .iter()
        .map(|(label, point)| {
            correct_test_point(label, point, load_curve, default_degradation_coefficient)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn load_curve() -> LoadCurve {
        LoadCurve::new(11.46, -10.).unwrap()
    }

    fn point(temperature: f64, capacity: f64, cop: f64) -> TestPoint {
        TestPoint {
            temperature,
            capacity,
            cop,
            degradation_coefficient: None,
        }
    }

    #[rstest]
    pub fn should_not_correct_when_load_exceeds_capacity(load_curve: LoadCurve) {
        let corrected =
            correct_test_point(TestLabel::A, &point(-7., 9.55, 3.26), &load_curve, 0.9).unwrap();

        assert!(corrected.capacity_ratio > 1.);
        assert_eq!(corrected.correction_factor, 1.);
        assert_eq!(corrected.cop, 3.26);
    }

    #[rstest]
    pub fn should_correct_cycling_at_part_load(load_curve: LoadCurve) {
        let corrected =
            correct_test_point(TestLabel::C, &point(7., 12.66, 4.91), &load_curve, 0.9).unwrap();

        let load = 11.46 * 9. / 26.;
        let capacity_ratio = load / 12.66;
        assert_relative_eq!(corrected.load, load, max_relative = 1e-12);
        assert_relative_eq!(corrected.capacity_ratio, capacity_ratio, max_relative = 1e-12);
        assert_relative_eq!(
            corrected.cop,
            4.91 * capacity_ratio / (capacity_ratio * 0.9 + 0.1),
            max_relative = 1e-12
        );
        assert!(corrected.cop < 4.91);
    }

    #[rstest]
    pub fn should_prefer_point_degradation_coefficient(load_curve: LoadCurve) {
        let mut test_point = point(12., 14.3, 5.5);
        test_point.degradation_coefficient = Some(1.);
        let corrected = correct_test_point(TestLabel::D, &test_point, &load_curve, 0.9).unwrap();

        // with Cd of 1 the correction factor reduces to 1 at any part load
        assert_eq!(corrected.degradation_coefficient, 1.);
        assert_relative_eq!(corrected.cop, 5.5, max_relative = 1e-12);
    }

    #[rstest]
    #[case(0.5, 0.9, (0.5 * 0.9 + 0.1) / 0.5)]
    #[case(1., 0.9, 1.)]
    #[case(1.4, 0.9, 1.)]
    #[case(0., 0.9, 1.)]
    #[case(0.25, 0., 4.)]
    pub fn should_give_correction_factor(
        #[case] capacity_ratio: f64,
        #[case] degradation_coefficient: f64,
        #[case] expected: f64,
    ) {
        assert_relative_eq!(
            correction_factor(capacity_ratio, degradation_coefficient),
            expected,
            max_relative = 1e-12
        );
    }

    #[rstest]
    #[case(0.)]
    #[case(-1.)]
    pub fn should_reject_non_positive_capacity(load_curve: LoadCurve, #[case] capacity: f64) {
        assert!(matches!(
            correct_test_point(TestLabel::B, &point(2., capacity, 4.), &load_curve, 0.9),
            Err(ScopError::InvalidTestPoint {
                label: TestLabel::B,
                ..
            })
        ));
    }

    #[rstest]
    pub fn should_reject_degradation_coefficient_above_one(load_curve: LoadCurve) {
        let mut test_point = point(2., 11.17, 4.);
        test_point.degradation_coefficient = Some(1.5);
        assert!(matches!(
            correct_test_point(TestLabel::B, &test_point, &load_curve, 0.9),
            Err(ScopError::InvalidTestPoint { .. })
        ));
    }

    #[rstest]
    pub fn should_flag_non_positive_corrected_cop(load_curve: LoadCurve) {
        let corrected =
            correct_test_point(TestLabel::D, &point(12., 14.3, -0.5), &load_curve, 0.9).unwrap();

        assert_eq!(
            corrected.anomaly(),
            Some(NumericAnomaly::NonPositiveCorrectedCop {
                label: TestLabel::D,
                temperature: 12.,
                cop: corrected.cop,
            })
        );
    }

    #[rstest]
    pub fn should_correct_all_points_in_label_order(load_curve: LoadCurve) {
        let test_points = TestPointSet::new(
            [
                (TestLabel::F, point(-6., 9.7, 3.3)),
                (TestLabel::B, point(2., 11.17, 4.)),
            ]
            .into_iter()
            .collect(),
        );
        let corrected = correct_test_points(&test_points, &load_curve, 0.9).unwrap();

        assert_eq!(
            corrected.iter().map(|point| point.label).collect::<Vec<_>>(),
            vec![TestLabel::B, TestLabel::F]
        );
        assert!(corrected.iter().all(|point| point.anomaly().is_none()));
    }
}
