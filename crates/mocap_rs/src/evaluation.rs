use mocap_core::common::markers::{MarkerMap, MarkerSet};
use mocap_utils::vector::{is_missing_v3f, Vector3f};

/// Running error of reconstructed markers against ground truth, accumulated
/// per coordinate.
#[derive(Clone, Debug, Default)]
pub struct ReconstructionError {
    sum_squared: f64,
    sum_abs: f64,
    count: usize,
}
impl ReconstructionError {
    /// Creates an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }
    /// Adds the three coordinate errors of one marker
    pub fn add(&mut self, predicted: &Vector3f, truth: &Vector3f) {
        for (p, t) in predicted.iter().zip(truth.iter()) {
            let e = f64::from(p - t);
            self.sum_squared += e * e;
            self.sum_abs += e.abs();
        }
        self.count += 3;
    }
    /// Adds the markers of `occluded` that were resolved in `predicted`.
    /// Returns how many markers were counted.
    pub fn add_frame(&mut self, predicted: &MarkerMap, truth: &MarkerMap, occluded: &MarkerSet) -> usize {
        let mut added = 0;
        for marker in occluded {
            if let (Some(p), Some(t)) = (predicted.get(marker), truth.get(marker)) {
                if !is_missing_v3f(p) {
                    self.add(p, t);
                    added += 1;
                }
            }
        }
        added
    }
    /// Number of coordinates accumulated so far
    pub fn count(&self) -> usize {
        self.count
    }
    /// Root mean squared error, `None` before anything was added
    #[allow(clippy::cast_precision_loss)]
    pub fn rmse(&self) -> Option<f64> {
        (self.count > 0).then(|| (self.sum_squared / self.count as f64).sqrt())
    }
    /// Mean absolute error, `None` before anything was added
    #[allow(clippy::cast_precision_loss)]
    pub fn mae(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum_abs / self.count as f64)
    }
    /// Starts over
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mocap_utils::vector::missing_v3f;

    #[test]
    fn test_rmse_and_mae() {
        let mut err = ReconstructionError::new();
        assert!(err.rmse().is_none());
        err.add(&Vector3f::new(1.0, 0.0, 0.0), &Vector3f::zeros());
        err.add(&Vector3f::new(0.0, -3.0, 0.0), &Vector3f::zeros());
        assert_eq!(err.count(), 6);
        assert!((err.rmse().unwrap() - (10.0f64 / 6.0).sqrt()).abs() < 1e-9);
        assert!((err.mae().unwrap() - 4.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_frame_skips_unresolved_markers() {
        let mut err = ReconstructionError::new();
        let truth: MarkerMap = [("a".to_string(), Vector3f::zeros()), ("b".to_string(), Vector3f::zeros())].into_iter().collect();
        let predicted: MarkerMap = [("a".to_string(), Vector3f::new(0.0, 0.0, 2.0)), ("b".to_string(), missing_v3f())]
            .into_iter()
            .collect();
        let occluded: MarkerSet = ["a".to_string(), "b".to_string()].into_iter().collect();
        assert_eq!(err.add_frame(&predicted, &truth, &occluded), 1);
        assert!((err.mae().unwrap() - 2.0 / 3.0).abs() < 1e-9);
    }
}
