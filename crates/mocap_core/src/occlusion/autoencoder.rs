use super::predictor::OcclusionPredictor;
use crate::{
    alignment::rigid_motion::RigidMotion,
    common::{
        config::AutoencoderOptions,
        errors::{MocapError, Result},
        hand_template::HandTemplate,
        markers::{key_set, MarkerMap, MarkerSet},
        types::PredictorKind,
    },
    nn::model::NeuralModel,
};
use log::{debug, warn};
use mocap_utils::{
    numerical::{clamp_norm, shrink_towards_zero},
    vector::{vec_from_slice, Vector3f},
};
use std::{collections::HashMap, sync::Arc};

/// Reconstructs the whole hand with a denoising autoencoder.
///
/// Visible markers are rigidly aligned onto the bind pose, occluded ones are
/// zeroed and the network fills them in. Whenever a marker appears or
/// disappears the jump between the previous output and the new reconstruction
/// is stored as an offset, added on top of the reconstruction and decayed
/// towards zero over the following frames.
pub struct NeuralAutoencoderPredictor {
    template: Arc<HandTemplate>,
    model: NeuralModel,
    options: AutoencoderOptions,
    /// per marker, in the aligned frame; markers without an entry have a zero offset
    offsets: HashMap<String, Vector3f>,
}
impl NeuralAutoencoderPredictor {
    /// # Errors
    /// Fails if the model does not map ``3·K`` values onto ``3·K`` values, K
    /// being the number of template markers
    pub fn new(template: Arc<HandTemplate>, model: NeuralModel, options: AutoencoderOptions) -> Result<Self> {
        let features = 3 * template.num_markers();
        if model.input_size() != features || model.output_size() != features {
            return Err(MocapError::InvalidConfiguration(format!(
                "autoencoder maps {} -> {} values but the hand has {} marker coordinates",
                model.input_size(),
                model.output_size(),
                features
            )));
        }
        Ok(Self {
            template,
            model,
            options,
            offsets: HashMap::new(),
        })
    }
    pub fn options(&self) -> &AutoencoderOptions {
        &self.options
    }
    /// Offsets currently applied, in the aligned frame
    pub fn offsets(&self) -> &HashMap<String, Vector3f> {
        &self.offsets
    }

    /// Fits on the alignment markers among `candidates` if there are at least
    /// three of them, on all candidates otherwise
    fn fit_alignment(&self, positions: &MarkerMap, candidates: &MarkerSet) -> RigidMotion {
        let template = &self.template;
        let usable = |m: &&str| candidates.contains(*m) && positions.contains_key(*m);
        if template.alignment_markers().filter(usable).count() >= 3 {
            template.rigid_motion_from(positions, template.alignment_markers().filter(usable))
        } else {
            template.rigid_motion_from(positions, template.markers().iter().map(String::as_str).filter(usable))
        }
    }

    /// Runs the network on aligned positions, absent markers zeroed. Markers
    /// given as input keep their input position.
    fn reconstruct(&mut self, aligned: &MarkerMap) -> Result<Vec<Vector3f>> {
        let markers = self.template.markers();
        let mut input = vec![0.0f32; 3 * markers.len()];
        for (idx, marker) in markers.iter().enumerate() {
            if let Some(p) = aligned.get(marker) {
                input[3 * idx..3 * idx + 3].copy_from_slice(p.as_slice());
            }
        }
        let output: Vec<f32> = self.model.forward(&input)?.iter().copied().collect();
        let mut recon: Vec<Vector3f> = output.chunks_exact(3).map(vec_from_slice).collect();
        for (idx, marker) in markers.iter().enumerate() {
            if let Some(p) = aligned.get(marker) {
                recon[idx] = *p;
            }
        }
        Ok(recon)
    }

    /// New offsets for markers that just reappeared or just disappeared
    fn update_offsets(
        &mut self,
        recon: &[Vector3f],
        visible: &MarkerSet,
        old_markers: &MarkerMap,
        old_visible: &MarkerSet,
    ) -> Result<()> {
        let template = Arc::clone(&self.template);
        let common: MarkerSet = visible.intersection(old_visible).cloned().collect();
        let old_motion = self.fit_alignment(old_markers, &common);
        let old_aligned: MarkerMap = template
            .markers()
            .iter()
            .filter_map(|m| old_markers.get(m).map(|p| (m.clone(), old_motion.apply(p))))
            .collect();

        for marker in visible.difference(old_visible) {
            if let (Some(idx), Some(old)) = (template.index_of(marker), old_aligned.get(marker)) {
                debug!("{marker} reappeared, smoothing the jump");
                self.offsets.insert(marker.clone(), old - recon[idx]);
            }
        }

        let just_occluded: Vec<&String> = old_visible.difference(visible).collect();
        if !just_occluded.is_empty() {
            // the previous frame as the network sees it with the current gaps
            let masked: MarkerMap = old_aligned
                .iter()
                .filter(|(m, _)| visible.contains(*m))
                .map(|(m, p)| (m.clone(), *p))
                .collect();
            let old_recon = self.reconstruct(&masked)?;
            for marker in just_occluded {
                if let (Some(idx), Some(old)) = (template.index_of(marker), old_aligned.get(marker)) {
                    debug!("{marker} got occluded, smoothing the jump");
                    self.offsets.insert(marker.clone(), old - old_recon[idx]);
                }
            }
        }
        Ok(())
    }

    fn decay_offsets(&mut self, visible: &MarkerSet, dt: f32) {
        let step = self.options.smoothing_constant * dt.max(0.0);
        for (marker, offset) in &mut self.offsets {
            if self.options.smoothing {
                *offset = shrink_towards_zero(offset, step);
            } else if visible.contains(marker) {
                *offset = Vector3f::zeros();
            }
            *offset = clamp_norm(offset, self.options.offset_limit);
        }
        self.offsets.retain(|_, o| *o != Vector3f::zeros());
    }
}
impl OcclusionPredictor for NeuralAutoencoderPredictor {
    fn kind(&self) -> PredictorKind {
        PredictorKind::NeuralAutoencoder
    }
    fn predict(
        &mut self,
        available: &MarkerMap,
        occluded: &MarkerSet,
        old_markers: &MarkerMap,
        old_available: &MarkerSet,
        dt: f32,
    ) -> Result<MarkerMap> {
        let template = Arc::clone(&self.template);
        let visible: MarkerMap = template
            .markers()
            .iter()
            .filter(|m| !occluded.contains(*m))
            .filter_map(|m| available.get(m).map(|p| (m.clone(), *p)))
            .collect();
        if visible.is_empty() {
            // identity alignment, the network still sees the all-zero frame
            warn!("no visible marker to align on, reconstructing the whole hand");
        }
        let visible_set = key_set(&visible);
        let motion = self.fit_alignment(&visible, &visible_set);
        let aligned: MarkerMap = visible.iter().map(|(m, p)| (m.clone(), motion.apply(p))).collect();

        let has_gap = visible.len() < template.num_markers();
        let mut recon = if has_gap || self.model.is_recurrent() {
            self.reconstruct(&aligned)?
        } else {
            template.markers().iter().map(|m| aligned[m]).collect()
        };

        let old_visible: MarkerSet = template.markers().iter().filter(|m| old_available.contains(*m)).cloned().collect();
        let old_complete = template.markers().iter().all(|m| old_markers.contains_key(m));
        if !self.model.is_recurrent() && old_complete && visible_set != old_visible {
            self.update_offsets(&recon, &visible_set, old_markers, &old_visible)?;
        }
        self.decay_offsets(&visible_set, dt);

        let mut out = MarkerMap::new();
        for (idx, marker) in template.markers().iter().enumerate() {
            let offset = self.offsets.get(marker);
            if let (Some(raw), None) = (visible.get(marker), offset) {
                out.insert(marker.clone(), *raw);
                continue;
            }
            if self.options.offset_correction {
                if let Some(o) = offset {
                    recon[idx] += o;
                }
            }
            out.insert(marker.clone(), motion.apply_inverse(&recon[idx]));
        }
        Ok(out)
    }
    fn reset(&mut self) {
        self.offsets.clear();
        self.model.reset();
    }
}
