use log::{debug, info};
use mocap_core::{
    common::{
        config::MocapConfig,
        errors::Result,
        hand_template::HandTemplate,
        markers::MarkerMap,
    },
    joints::joint_predictor::{JointPredictor, JointRotation},
    nn::model::NeuralModel,
    occlusion::{build_pipeline, manager::OcclusionManager},
};
use mocap_utils::vector::is_missing_v3f;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Joint rotations keyed by joint name
pub type JointRotations = HashMap<String, JointRotation>;

/// The whole per-frame chain: occlusion resolution followed, when a joint
/// model is configured, by joint angle prediction.
pub struct HandTracker {
    template: Arc<HandTemplate>,
    manager: OcclusionManager,
    joint_predictor: Option<JointPredictor>,
}
impl HandTracker {
    /// Assembles a tracker from already built parts
    pub fn new(template: Arc<HandTemplate>, manager: OcclusionManager, joint_predictor: Option<JointPredictor>) -> Self {
        Self {
            template,
            manager,
            joint_predictor,
        }
    }
    /// Builds the template, the predictors and the joint predictor of
    /// `config`. Model paths are used as given.
    ///
    /// # Errors
    /// Fails if the calibration is invalid, a model cannot be loaded or does
    /// not fit the hand
    pub fn from_config(config: &MocapConfig) -> Result<Self> {
        Self::from_config_in(config, Path::new(""))
    }
    /// Loads a configuration file. Relative model paths are resolved against
    /// the directory of the file.
    ///
    /// # Errors
    /// See [`HandTracker::from_config`]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("loading tracker configuration {}", path.display());
        let config = MocapConfig::from_file(path)?;
        Self::from_config_in(&config, path.parent().unwrap_or_else(|| Path::new("")))
    }

    fn from_config_in(config: &MocapConfig, base_dir: &Path) -> Result<Self> {
        let resolve = |p: &str| -> PathBuf { base_dir.join(p) };
        let template = Arc::new(config.calibration.hand_template()?);
        let marker_model = config
            .pipeline
            .marker_model
            .as_deref()
            .map(|p| NeuralModel::from_file(resolve(p)))
            .transpose()?;
        let mut manager = OcclusionManager::from_template(&template);
        manager.set_predictors(build_pipeline(&config.pipeline, &template, marker_model.as_ref())?);
        let joint_predictor = match config.pipeline.joint_model.as_deref() {
            Some(p) => Some(JointPredictor::with_joints(
                Arc::clone(&template),
                NeuralModel::from_file(resolve(p))?,
                &config.calibration.joints,
            )?),
            None => None,
        };
        info!(
            "hand tracker: {} markers, predictors {:?}, joint model: {}",
            template.num_markers(),
            config.pipeline.predictors,
            joint_predictor.is_some()
        );
        Ok(Self::new(template, manager, joint_predictor))
    }

    /// The calibration the tracker was built with
    pub fn template(&self) -> &HandTemplate {
        &self.template
    }
    /// The occlusion stage
    pub fn manager(&self) -> &OcclusionManager {
        &self.manager
    }
    /// Mutable access to the occlusion stage, to swap predictors at runtime
    pub fn manager_mut(&mut self) -> &mut OcclusionManager {
        &mut self.manager
    }
    /// Whether joint rotations are produced
    pub fn has_joint_predictor(&self) -> bool {
        self.joint_predictor.is_some()
    }

    /// Completes `frame` in place and returns the joint rotations when every
    /// marker got resolved and a joint model is configured
    ///
    /// # Errors
    /// Propagates failures of the predictors and of the joint model
    pub fn update(&mut self, frame: &mut MarkerMap, dt: f32) -> Result<Option<JointRotations>> {
        self.manager.update(frame, dt)?;
        let Some(joint_predictor) = self.joint_predictor.as_mut() else {
            return Ok(None);
        };
        let unresolved = self
            .template
            .markers()
            .iter()
            .filter(|m| frame.get(*m).map_or(true, is_missing_v3f))
            .count();
        if unresolved > 0 {
            debug!("{unresolved} markers unresolved, skipping joint prediction");
            return Ok(None);
        }
        joint_predictor.predict(frame).map(Some)
    }
    /// Forgets all temporal state
    pub fn reset(&mut self) {
        self.manager.reset();
        if let Some(joint_predictor) = self.joint_predictor.as_mut() {
            joint_predictor.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mocap_core::common::types::PredictorKind;
    use mocap_utils::vector::{missing_v3f, Vector3f};

    const CONFIG: &str = r#"
[pipeline]
predictors = ["moving_average", "naive"]

[calibration]
pivot = "wrist"
markers = [
    { id = "a", joint = "wrist", alignment = true },
    { id = "b", joint = "wrist", offset = [0.1, 0.0, 0.0], alignment = true },
    { id = "c", joint = "wrist", offset = [0.0, 0.1, 0.0], alignment = true },
]
"#;

    fn frame() -> MarkerMap {
        [
            ("a", Vector3f::new(0.0, 0.0, 0.0)),
            ("b", Vector3f::new(0.1, 0.0, 0.0)),
            ("c", Vector3f::new(0.0, 0.1, 0.0)),
        ]
        .iter()
        .map(|(m, p)| ((*m).to_string(), *p))
        .collect()
    }

    #[test]
    fn test_tracker_from_config() {
        let config = MocapConfig::from_toml_str(CONFIG).unwrap();
        let mut tracker = HandTracker::from_config(&config).unwrap();
        assert_eq!(tracker.manager().predictors_len(), 2);
        assert_eq!(tracker.manager().predictors()[0].kind(), PredictorKind::MovingAverage);
        assert!(!tracker.has_joint_predictor());

        let mut f = frame();
        assert!(tracker.update(&mut f, 0.01).unwrap().is_none());
        let mut f = frame();
        f.insert("c".to_string(), missing_v3f());
        tracker.update(&mut f, 0.01).unwrap();
        assert!((f["c"] - Vector3f::new(0.0, 0.1, 0.0)).norm() < 1e-6);

        tracker.reset();
        assert!(!tracker.manager().is_initialized());
    }

    #[test]
    fn test_missing_model_file_is_an_error() {
        let text = CONFIG.replace("[pipeline]", "[pipeline]\njoint_model = \"does/not/exist.bin\"");
        let config = MocapConfig::from_toml_str(&text).unwrap();
        assert!(HandTracker::from_config(&config).is_err());
    }
}
