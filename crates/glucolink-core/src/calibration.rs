//! Calibration engine.
//!
//! Derives a correction mapping from the current set of user-supplied
//! calibration points. With no points the mapping is the identity; with one
//! or more points a least-squares line is fitted over all of them. The
//! mapping is recomputed whenever the point set changes; readings already in
//! the history keep the calibrated value computed at ingestion time.
//!
//! # Example
//!
//! ```
//! use glucolink_core::calibration::Calibrator;
//! use glucolink_types::CalibrationPoint;
//!
//! let points = [
//!     CalibrationPoint::new(100.0, 110.0),
//!     CalibrationPoint::new(200.0, 195.0),
//! ];
//! let calibrator = Calibrator::from_points(&points);
//! assert_eq!(calibrator.apply(150.0), 152.5);
//! ```

use glucolink_types::CalibrationPoint;

/// A fitted raw-to-calibrated mapping.
///
/// Cheap to construct and copy; rebuild it from the point set after every
/// change rather than caching it across actions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibrator {
    slope: f64,
    intercept: f64,
}

impl Default for Calibrator {
    /// Identity mapping (no calibration points).
    fn default() -> Self {
        Self {
            slope: 1.0,
            intercept: 0.0,
        }
    }
}

impl Calibrator {
    /// Fit a least-squares line over the given calibration points.
    ///
    /// With zero points this is the identity mapping. When all x-values
    /// coincide (a single point, or duplicated raw values) the slope is
    /// degenerate; the fit falls back to slope 1.0 with a pure offset of
    /// `mean(y) - mean(x)`.
    #[must_use]
    pub fn from_points(points: &[CalibrationPoint]) -> Self {
        if points.is_empty() {
            return Self::default();
        }

        let n = points.len() as f64;
        let mean_x: f64 = points.iter().map(|p| p.x).sum::<f64>() / n;
        let mean_y: f64 = points.iter().map(|p| p.y).sum::<f64>() / n;

        let var_x: f64 = points.iter().map(|p| (p.x - mean_x).powi(2)).sum();
        if var_x == 0.0 {
            return Self {
                slope: 1.0,
                intercept: mean_y - mean_x,
            };
        }

        let cov_xy: f64 = points
            .iter()
            .map(|p| (p.x - mean_x) * (p.y - mean_y))
            .sum();

        let slope = cov_xy / var_x;
        Self {
            slope,
            intercept: mean_y - slope * mean_x,
        }
    }

    /// Map a raw sensor value to a calibrated glucose value.
    #[must_use]
    pub fn apply(&self, raw: f64) -> f64 {
        self.slope * raw + self.intercept
    }

    /// The fitted slope.
    #[must_use]
    pub fn slope(&self) -> f64 {
        self.slope
    }

    /// The fitted intercept.
    #[must_use]
    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_with_no_points() {
        let calibrator = Calibrator::from_points(&[]);
        assert_eq!(calibrator.apply(123.0), 123.0);
        assert_eq!(calibrator.slope(), 1.0);
        assert_eq!(calibrator.intercept(), 0.0);
    }

    #[test]
    fn test_single_point_is_pure_offset() {
        let calibrator = Calibrator::from_points(&[CalibrationPoint::new(100.0, 112.0)]);
        assert_eq!(calibrator.slope(), 1.0);
        assert_eq!(calibrator.apply(100.0), 112.0);
        assert_eq!(calibrator.apply(150.0), 162.0);
    }

    #[test]
    fn test_duplicated_x_is_pure_offset() {
        let points = [
            CalibrationPoint::new(100.0, 108.0),
            CalibrationPoint::new(100.0, 112.0),
        ];
        let calibrator = Calibrator::from_points(&points);
        assert_eq!(calibrator.slope(), 1.0);
        assert_eq!(calibrator.apply(100.0), 110.0);
    }

    #[test]
    fn test_two_points_fit_exact_line() {
        let points = [
            CalibrationPoint::new(100.0, 110.0),
            CalibrationPoint::new(200.0, 195.0),
        ];
        let calibrator = Calibrator::from_points(&points);
        assert!((calibrator.slope() - 0.85).abs() < 1e-12);
        assert!((calibrator.intercept() - 25.0).abs() < 1e-12);
        assert_eq!(calibrator.apply(150.0), 152.5);
    }

    #[test]
    fn test_least_squares_over_three_points() {
        // y = 2x + 1 exactly
        let points = [
            CalibrationPoint::new(1.0, 3.0),
            CalibrationPoint::new(2.0, 5.0),
            CalibrationPoint::new(3.0, 7.0),
        ];
        let calibrator = Calibrator::from_points(&points);
        assert!((calibrator.slope() - 2.0).abs() < 1e-12);
        assert!((calibrator.intercept() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let points = [
            CalibrationPoint::new(90.0, 95.0),
            CalibrationPoint::new(180.0, 170.0),
            CalibrationPoint::new(250.0, 240.0),
        ];
        let a = Calibrator::from_points(&points);
        let b = Calibrator::from_points(&points);
        assert_eq!(a, b);
    }
}
