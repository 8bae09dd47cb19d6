use super::predictor::OcclusionPredictor;
use crate::common::{
    errors::Result,
    markers::{MarkerMap, MarkerSet},
    types::PredictorKind,
};

/// Keeps an occluded marker where it was last frame. Markers never seen stay
/// unresolved.
#[derive(Clone, Debug, Default)]
pub struct NaivePredictor;
impl NaivePredictor {
    pub fn new() -> Self {
        Self
    }
}
impl OcclusionPredictor for NaivePredictor {
    fn kind(&self) -> PredictorKind {
        PredictorKind::Naive
    }
    fn predict(
        &mut self,
        _available: &MarkerMap,
        occluded: &MarkerSet,
        old_markers: &MarkerMap,
        _old_available: &MarkerSet,
        _dt: f32,
    ) -> Result<MarkerMap> {
        Ok(occluded
            .iter()
            .filter_map(|m| old_markers.get(m).map(|p| (m.clone(), *p)))
            .collect())
    }
}
