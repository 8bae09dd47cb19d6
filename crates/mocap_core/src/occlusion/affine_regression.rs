use super::predictor::OcclusionPredictor;
use crate::{
    alignment::affine::AffineImputation,
    common::{
        errors::Result,
        markers::{MarkerMap, MarkerSet},
        types::PredictorKind,
    },
};
use log::{debug, warn};

/// Affine weights together with the marker orders they were fitted for
#[derive(Clone, Debug)]
struct FittedWeights {
    sources: Vec<String>,
    targets: Vec<String>,
    imputation: AffineImputation,
}

/// Expresses each occluded marker as an affine combination of the visible
/// ones. The weights are fitted on the last complete frame whenever the set of
/// visible markers changes and reused while it stays the same.
#[derive(Clone, Debug, Default)]
pub struct AffineRegressionPredictor {
    fitted: Option<FittedWeights>,
}
impl AffineRegressionPredictor {
    pub fn new() -> Self {
        Self::default()
    }
    /// Whether weights are currently held
    pub fn has_weights(&self) -> bool {
        self.fitted.is_some()
    }
    /// Visible markers the current weights expect, in application order
    pub fn sources(&self) -> Option<&[String]> {
        self.fitted.as_ref().map(|f| f.sources.as_slice())
    }

    fn refit(&mut self, sources: Vec<String>, targets: Vec<String>, old_markers: &MarkerMap) {
        let lookup = |ids: &[String]| ids.iter().map(|m| old_markers.get(m).copied()).collect::<Option<Vec<_>>>();
        self.fitted = match (lookup(&sources), lookup(&targets)) {
            (Some(known), Some(unknown)) if !known.is_empty() => {
                debug!("fitting affine weights for {} targets on {} markers", targets.len(), sources.len());
                Some(FittedWeights {
                    imputation: AffineImputation::compute(&known, &unknown),
                    sources,
                    targets,
                })
            }
            _ => {
                warn!("previous frame is incomplete, dropping affine weights");
                None
            }
        };
    }
}
impl OcclusionPredictor for AffineRegressionPredictor {
    fn kind(&self) -> PredictorKind {
        PredictorKind::AffineRegression
    }
    fn predict(
        &mut self,
        available: &MarkerMap,
        occluded: &MarkerSet,
        old_markers: &MarkerMap,
        old_available: &MarkerSet,
        _dt: f32,
    ) -> Result<MarkerMap> {
        let visible: MarkerSet = available.keys().filter(|m| !occluded.contains(*m)).cloned().collect();
        if visible != *old_available {
            let mut sources: Vec<String> = visible.iter().cloned().collect();
            let mut targets: Vec<String> = occluded.iter().cloned().collect();
            sources.sort();
            targets.sort();
            self.refit(sources, targets, old_markers);
        }
        let Some(fitted) = &self.fitted else {
            return Ok(MarkerMap::new());
        };
        if visible.is_empty() || fitted.sources.len() != visible.len() || !fitted.sources.iter().all(|m| visible.contains(m)) {
            return Ok(MarkerMap::new());
        }
        let known: Vec<_> = fitted.sources.iter().map(|m| available[m]).collect();
        Ok(fitted
            .targets
            .iter()
            .zip(fitted.imputation.apply(&known))
            .filter(|(m, _)| occluded.contains(*m))
            .map(|(m, p)| (m.clone(), p))
            .collect())
    }
    fn reset(&mut self) {
        self.fitted = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mocap_utils::vector::Vector3f;
    use nalgebra as na;

    fn hand() -> MarkerMap {
        [
            ("a", Vector3f::new(0.0, 0.0, 0.0)),
            ("b", Vector3f::new(1.0, 0.0, 0.0)),
            ("c", Vector3f::new(0.0, 1.0, 0.0)),
            ("d", Vector3f::new(0.0, 0.0, 1.0)),
            ("e", Vector3f::new(0.5, 0.5, 0.5)),
        ]
        .iter()
        .map(|(m, p)| ((*m).to_string(), *p))
        .collect()
    }

    #[test]
    fn test_follows_rigid_motion() {
        let old = hand();
        let old_available: MarkerSet = old.keys().cloned().collect();
        let rot = na::Rotation3::from_euler_angles(0.2, -0.4, 0.9);
        let shift = Vector3f::new(0.3, -1.0, 2.0);
        let mut now: MarkerMap = old.iter().map(|(m, p)| (m.clone(), rot * p + shift)).collect();
        let expected = now.remove("e").unwrap();
        let occluded: MarkerSet = ["e".to_string()].into_iter().collect();

        let mut pred = AffineRegressionPredictor::new();
        let out = pred.predict(&now, &occluded, &old, &old_available, 0.01).unwrap();
        assert!(pred.has_weights());
        assert!((out["e"] - expected).norm() < 1e-3);
    }

    #[test]
    fn test_keeps_weights_while_visibility_is_stable() {
        let old = hand();
        let mut now = old.clone();
        now.remove("e");
        let occluded: MarkerSet = ["e".to_string()].into_iter().collect();
        let visible: MarkerSet = now.keys().cloned().collect();

        let mut pred = AffineRegressionPredictor::new();
        pred.predict(&now, &occluded, &old, &old.keys().cloned().collect(), 0.01).unwrap();
        let sources = pred.sources().unwrap().to_vec();
        // same visibility, an incomplete old frame must not trigger a refit
        let mut partial_old = old.clone();
        partial_old.remove("a");
        let out = pred.predict(&now, &occluded, &partial_old, &visible, 0.01).unwrap();
        assert_eq!(pred.sources().unwrap(), sources.as_slice());
        assert!((out["e"] - Vector3f::new(0.5, 0.5, 0.5)).norm() < 1e-3);
    }

    #[test]
    fn test_incomplete_previous_frame_yields_nothing() {
        let mut old = hand();
        old.remove("e");
        let mut now = hand();
        now.remove("e");
        let occluded: MarkerSet = ["e".to_string()].into_iter().collect();
        let mut pred = AffineRegressionPredictor::new();
        let out = pred.predict(&now, &occluded, &old, &MarkerSet::new(), 0.01).unwrap();
        assert!(out.is_empty());
        assert!(!pred.has_weights());
    }

    #[test]
    fn test_no_visible_markers() {
        let old = hand();
        let occluded: MarkerSet = old.keys().cloned().collect();
        let mut pred = AffineRegressionPredictor::new();
        let out = pred.predict(&MarkerMap::new(), &occluded, &old, &occluded, 0.01).unwrap();
        assert!(out.is_empty());
    }
}
