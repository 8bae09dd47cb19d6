use super::predictor::OcclusionPredictor;
use crate::common::{
    errors::Result,
    hand_template::HandTemplate,
    markers::{available_markers, key_set, occluded_markers, MarkerMap, MarkerSet},
};
use log::{debug, trace, warn};

/// Runs the predictors in order over every frame and remembers the previous
/// result for them.
///
/// The first frame only initializes that memory and is returned untouched.
/// Afterwards each stage sees the markers seen this frame plus the fills of
/// the stages before it, while the occluded set stays the one the frame
/// arrived with.
pub struct OcclusionManager {
    universe: Vec<String>,
    predictors: Vec<Box<dyn OcclusionPredictor>>,
    old_markers: MarkerMap,
    old_available: MarkerSet,
    initialized: bool,
}
impl OcclusionManager {
    pub fn new(universe: Vec<String>) -> Self {
        Self {
            universe,
            predictors: Vec::new(),
            old_markers: MarkerMap::new(),
            old_available: MarkerSet::new(),
            initialized: false,
        }
    }
    /// Tracks every marker of the template
    pub fn from_template(template: &HandTemplate) -> Self {
        Self::new(template.markers().to_vec())
    }
    #[must_use]
    pub fn with_predictor(mut self, predictor: Box<dyn OcclusionPredictor>) -> Self {
        self.add_predictor(predictor);
        self
    }
    pub fn add_predictor(&mut self, predictor: Box<dyn OcclusionPredictor>) {
        debug!("adding {} predictor as stage {}", predictor.kind(), self.predictors.len());
        self.predictors.push(predictor);
    }
    pub fn set_predictors(&mut self, predictors: Vec<Box<dyn OcclusionPredictor>>) {
        let kinds: Vec<String> = predictors.iter().map(|p| p.kind().to_string()).collect();
        debug!("occlusion pipeline: [{}]", kinds.join(", "));
        self.predictors = predictors;
    }
    pub fn clear_predictors(&mut self) {
        debug!("removing {} predictors", self.predictors.len());
        self.predictors.clear();
    }
    pub fn predictors_len(&self) -> usize {
        self.predictors.len()
    }
    pub fn predictors(&self) -> &[Box<dyn OcclusionPredictor>] {
        &self.predictors
    }
    pub fn universe(&self) -> &[String] {
        &self.universe
    }
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
    /// Result of the previous frame
    pub fn old_markers(&self) -> &MarkerMap {
        &self.old_markers
    }
    /// Markers actually seen in the previous frame
    pub fn old_available(&self) -> &MarkerSet {
        &self.old_available
    }
    /// Forgets the previous frames, the next update initializes again
    pub fn reset(&mut self) {
        self.old_markers.clear();
        self.old_available.clear();
        self.initialized = false;
        for predictor in &mut self.predictors {
            predictor.reset();
        }
    }

    /// Resolves the occluded markers of `markers` in place. Markers no stage
    /// could resolve keep their missing value.
    ///
    /// # Errors
    /// Propagates the failure of a stage; the manager state is left as it was
    /// before the frame
    pub fn update(&mut self, markers: &mut MarkerMap, dt: f32) -> Result<()> {
        let available = available_markers(markers, &self.universe);
        if !self.initialized {
            debug!("occlusion manager initialized with {} of {} markers", available.len(), self.universe.len());
            self.old_available = key_set(&available);
            self.old_markers = available;
            self.initialized = true;
            return Ok(());
        }

        let occluded = occluded_markers(&available, &self.universe);
        let mut merged = available.clone();
        if !occluded.is_empty() {
            trace!("{} occluded markers", occluded.len());
        }
        for predictor in &mut self.predictors {
            let predicted = predictor.predict(&merged, &occluded, &self.old_markers, &self.old_available, dt)?;
            trace!("{} resolved {} markers", predictor.kind(), predicted.len());
            for (marker, pos) in predicted {
                if self.universe.contains(&marker) {
                    merged.insert(marker, pos);
                } else {
                    warn!("{} predicted `{marker}` which is not tracked, dropping it", predictor.kind());
                }
            }
        }

        for (marker, pos) in &merged {
            markers.insert(marker.clone(), *pos);
        }
        self.old_markers = merged;
        self.old_available = key_set(&available);
        Ok(())
    }
}
