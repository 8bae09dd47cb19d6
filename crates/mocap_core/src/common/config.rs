use super::{
    errors::Result,
    hand_template::{HandTemplate, JointPose},
    types::PredictorKind,
};
use mocap_utils::{numerical::euler_zxy_degrees_to_quaternion, vector::vec_from_fixed};
use serde::Deserialize;
use std::path::Path;

/// Options of the moving-average predictor
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MovingAverageOptions {
    pub window_size: usize,
}
impl Default for MovingAverageOptions {
    fn default() -> Self {
        Self { window_size: 5 }
    }
}

/// Options of the neural autoencoder predictor
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AutoencoderOptions {
    /// Decay the discontinuity offsets over time. When off, the offsets of
    /// visible markers are dropped immediately.
    pub smoothing: bool,
    /// Add the discontinuity offsets to the output
    pub offset_correction: bool,
    /// Decay speed of the offsets in meters per second
    pub smoothing_constant: f32,
    /// Maximum length of an offset in meters
    pub offset_limit: f32,
}
impl Default for AutoencoderOptions {
    fn default() -> Self {
        Self {
            smoothing: true,
            offset_correction: true,
            smoothing_constant: 0.25,
            offset_limit: 0.1,
        }
    }
}
impl AutoencoderOptions {
    #[must_use]
    pub fn smoothing(mut self, enabled: bool) -> Self {
        self.smoothing = enabled;
        self
    }
    #[must_use]
    pub fn offset_correction(mut self, enabled: bool) -> Self {
        self.offset_correction = enabled;
        self
    }
}

/// Which predictors run, in which order, and with which models
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub predictors: Vec<PredictorKind>,
    pub moving_average: MovingAverageOptions,
    pub autoencoder: AutoencoderOptions,
    /// Serialized occlusion model used by the autoencoder predictor
    pub marker_model: Option<String>,
    /// Serialized joint angle model
    pub joint_model: Option<String>,
}
impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            predictors: vec![PredictorKind::Naive],
            moving_average: MovingAverageOptions::default(),
            autoencoder: AutoencoderOptions::default(),
            marker_model: None,
            joint_model: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct MarkerCalibration {
    pub id: String,
    pub joint: String,
    #[serde(default)]
    pub offset: [f32; 3],
    #[serde(default)]
    pub alignment: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct JointBindPose {
    pub joint: String,
    #[serde(default)]
    pub position: [f32; 3],
    /// Euler angles in degrees
    #[serde(default)]
    pub rotation: [f32; 3],
}

/// Degrees of freedom of a joint predicted by the joint model, 0 or 1 per axis
#[derive(Clone, Debug, Deserialize)]
pub struct JointDof {
    pub joint: String,
    pub dof: [i32; 3],
}

/// Calibration of the hand as supplied by the host application
#[derive(Clone, Debug, Deserialize)]
pub struct CalibrationConfig {
    pub markers: Vec<MarkerCalibration>,
    pub pivot: String,
    #[serde(default)]
    pub bind_poses: Vec<JointBindPose>,
    #[serde(default)]
    pub joints: Vec<JointDof>,
}
impl CalibrationConfig {
    /// # Errors
    /// See [`super::hand_template::HandTemplateBuilder::build`]
    pub fn hand_template(&self) -> Result<HandTemplate> {
        let mut builder = HandTemplate::builder();
        for m in &self.markers {
            builder = builder.marker(&m.id, &m.joint, vec_from_fixed(&m.offset), m.alignment);
        }
        for b in &self.bind_poses {
            let rotation = euler_zxy_degrees_to_quaternion(&vec_from_fixed(&b.rotation));
            builder = builder.joint_pose(&b.joint, JointPose::new(vec_from_fixed(&b.position), rotation));
        }
        builder.pivot(&self.pivot).build()
    }
}

/// Top level configuration file
#[derive(Clone, Debug, Deserialize)]
pub struct MocapConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    pub calibration: CalibrationConfig,
}
impl MocapConfig {
    /// # Errors
    /// Fails if the text is not a valid configuration
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
    /// # Errors
    /// Fails if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[pipeline]
predictors = ["moving_average", "affine_regression", "naive"]
moving_average = { window_size = 3 }
autoencoder = { smoothing = false }

[calibration]
pivot = "wrist"
markers = [
    { id = "A", joint = "wrist", alignment = true },
    { id = "B", joint = "index1", offset = [0.0, 0.02, 0.0], alignment = true },
    { id = "C", joint = "thumb1" },
]
bind_poses = [{ joint = "index1", position = [0.0, 0.08, 0.0] }]
joints = [{ joint = "index1", dof = [1, 1, 0] }]
"#;

    #[test]
    fn test_parse_config() {
        let config = MocapConfig::from_toml_str(CONFIG).unwrap();
        assert_eq!(
            config.pipeline.predictors,
            vec![PredictorKind::MovingAverage, PredictorKind::AffineRegression, PredictorKind::Naive]
        );
        assert_eq!(config.pipeline.moving_average.window_size, 3);
        assert!(!config.pipeline.autoencoder.smoothing);
        assert!(config.pipeline.autoencoder.offset_correction);
        assert!((config.pipeline.autoencoder.offset_limit - 0.1).abs() < 1e-6);
        assert_eq!(config.calibration.joints[0].dof, [1, 1, 0]);

        let template = config.calibration.hand_template().unwrap();
        assert_eq!(template.num_markers(), 3);
        let b = template.initial_position("B").unwrap();
        assert!((b.y - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_bad_config_is_a_parse_error() {
        let err = MocapConfig::from_toml_str("[pipeline]\npredictors = [\"kalman\"]").unwrap_err();
        assert!(matches!(err, crate::common::errors::MocapError::ConfigParse(_)));
    }
}
