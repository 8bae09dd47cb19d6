use super::predictor::OcclusionPredictor;
use crate::common::{
    errors::Result,
    markers::{MarkerMap, MarkerSet},
    types::PredictorKind,
};
use mocap_utils::vector::Vector3f;
use std::collections::{HashMap, VecDeque};

/// Extrapolates an occluded marker with the mean of its last frame-to-frame
/// displacements, recorded while it was visible.
#[derive(Clone, Debug)]
pub struct MovingAveragePredictor {
    window_size: usize,
    deltas: HashMap<String, VecDeque<Vector3f>>,
}
impl MovingAveragePredictor {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
            deltas: HashMap::new(),
        }
    }
    pub fn window_size(&self) -> usize {
        self.window_size
    }
    /// Mean displacement per frame, zero if nothing was recorded
    pub fn mean_delta(&self, marker: &str) -> Vector3f {
        match self.deltas.get(marker) {
            Some(queue) if !queue.is_empty() => {
                #[allow(clippy::cast_precision_loss)]
                let n = queue.len() as f32;
                queue.iter().fold(Vector3f::zeros(), |acc, d| acc + d) / n
            }
            _ => Vector3f::zeros(),
        }
    }
    fn record(&mut self, marker: &str, delta: Vector3f) {
        let queue = self.deltas.entry(marker.to_string()).or_default();
        queue.push_back(delta);
        while queue.len() > self.window_size {
            queue.pop_front();
        }
    }
}
impl OcclusionPredictor for MovingAveragePredictor {
    fn kind(&self) -> PredictorKind {
        PredictorKind::MovingAverage
    }
    fn predict(
        &mut self,
        available: &MarkerMap,
        occluded: &MarkerSet,
        old_markers: &MarkerMap,
        old_available: &MarkerSet,
        _dt: f32,
    ) -> Result<MarkerMap> {
        // only markers seen in both frames give a real displacement
        for (marker, pos) in available {
            if occluded.contains(marker) || !old_available.contains(marker) {
                continue;
            }
            if let Some(old) = old_markers.get(marker) {
                self.record(marker, pos - old);
            }
        }
        Ok(occluded
            .iter()
            .filter_map(|m| old_markers.get(m).map(|p| (m.clone(), p + self.mean_delta(m))))
            .collect())
    }
    fn reset(&mut self) {
        self.deltas.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(entries: &[(&str, Vector3f)]) -> MarkerMap {
        entries.iter().map(|(m, p)| ((*m).to_string(), *p)).collect()
    }

    fn set(ids: &[&str]) -> MarkerSet {
        ids.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_extrapolates_with_mean_delta() {
        let mut pred = MovingAveragePredictor::new(2);
        let all = set(&["a"]);
        let none = MarkerSet::new();
        let mut old = frame(&[("a", Vector3f::new(0.0, 0.0, 0.0))]);
        for x in [1.0f32, 3.0, 6.0] {
            let now = frame(&[("a", Vector3f::new(x, 0.0, 0.0))]);
            let out = pred.predict(&now, &none, &old, &all, 0.01).unwrap();
            assert!(out.is_empty());
            old = now;
        }
        // window of 2 keeps the deltas 2 and 3
        assert!((pred.mean_delta("a").x - 2.5).abs() < 1e-6);
        let out = pred.predict(&MarkerMap::new(), &all, &old, &all, 0.01).unwrap();
        assert!((out["a"].x - 8.5).abs() < 1e-5);
    }

    #[test]
    fn test_empty_queue_holds_position() {
        let mut pred = MovingAveragePredictor::new(4);
        let old = frame(&[("a", Vector3f::new(1.0, 1.0, 1.0))]);
        let out = pred.predict(&MarkerMap::new(), &set(&["a", "b"]), &old, &set(&["a"]), 0.01).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out["a"], Vector3f::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_ignores_markers_not_seen_last_frame() {
        let mut pred = MovingAveragePredictor::new(4);
        let old = frame(&[("a", Vector3f::new(0.0, 0.0, 0.0))]);
        let now = frame(&[("a", Vector3f::new(5.0, 0.0, 0.0))]);
        // "a" was predicted, not seen, in the previous frame
        pred.predict(&now, &MarkerSet::new(), &old, &MarkerSet::new(), 0.01).unwrap();
        assert_eq!(pred.mean_delta("a"), Vector3f::zeros());
    }
}
