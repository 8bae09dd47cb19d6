use crate::common::{
    errors::Result,
    markers::{MarkerMap, MarkerSet},
    types::PredictorKind,
};

/// One stage of the occlusion pipeline.
///
/// `available` holds the markers seen this frame plus whatever earlier stages
/// filled in, `occluded` is the gap as it stood when the frame arrived.
/// `old_markers` is the complete output of the previous frame and
/// `old_available` the markers that were actually seen in it.
///
/// Implementations keep state between frames, so `predict` is not
/// referentially transparent and an instance must be driven by a single
/// sequence of frames.
pub trait OcclusionPredictor: Send + 'static {
    fn kind(&self) -> PredictorKind;
    /// Returns positions for (a subset of) the occluded markers. Stages that
    /// correct visible markers too may return those as well.
    ///
    /// # Errors
    /// Only for failures of an underlying model, never for missing data
    fn predict(
        &mut self,
        available: &MarkerMap,
        occluded: &MarkerSet,
        old_markers: &MarkerMap,
        old_available: &MarkerSet,
        dt: f32,
    ) -> Result<MarkerMap>;
    /// Forgets everything learned from previous frames
    fn reset(&mut self) {}
}
