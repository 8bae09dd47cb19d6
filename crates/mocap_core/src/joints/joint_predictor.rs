use crate::{
    common::{
        config::JointDof,
        errors::{MocapError, Result},
        hand_template::HandTemplate,
        markers::MarkerMap,
        types::Axis,
    },
    nn::model::NeuralModel,
};
use enum_map::EnumMap;
use log::info;
use mocap_utils::{
    numerical::euler_zxy_degrees_to_quaternion,
    vector::{is_missing_v3f, Vector3f},
};
use nalgebra as na;
use std::{collections::HashMap, sync::Arc};
use strum::IntoEnumIterator;

/// Network outputs are Euler angles divided by this
pub const ANGLE_SCALE_DEG: f32 = 180.0;

/// Rotation of one joint in the aligned hand frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointRotation {
    /// ZXY Euler angles in degrees, zero on the axes the joint cannot rotate around
    pub euler: Vector3f,
    pub rotation: na::UnitQuaternion<f32>,
}

/// Maps a complete, aligned marker set onto joint rotations
pub struct JointPredictor {
    template: Arc<HandTemplate>,
    model: NeuralModel,
    joints: Vec<(String, EnumMap<Axis, bool>)>,
}
impl JointPredictor {
    /// # Errors
    /// Fails if the model does not take the ``3·K`` marker coordinates
    pub fn new(template: Arc<HandTemplate>, model: NeuralModel) -> Result<Self> {
        let features = 3 * template.num_markers();
        if model.input_size() != features {
            return Err(MocapError::InvalidConfiguration(format!(
                "joint model expects {} inputs but the hand has {} marker coordinates",
                model.input_size(),
                features
            )));
        }
        Ok(Self {
            template,
            model,
            joints: Vec::new(),
        })
    }
    /// Predictor decoding the joints listed in a calibration file
    ///
    /// # Errors
    /// See [`JointPredictor::new`] and [`JointPredictor::add_joint`]
    pub fn with_joints(template: Arc<HandTemplate>, model: NeuralModel, joints: &[JointDof]) -> Result<Self> {
        let mut predictor = Self::new(template, model)?;
        for joint in joints {
            predictor.add_joint(&joint.joint, joint.dof)?;
        }
        info!(
            "joint predictor: {} joints, {} of {} outputs used",
            predictor.joints.len(),
            predictor.num_dofs(),
            predictor.model.output_size()
        );
        Ok(predictor)
    }
    /// Declares the next joint of the output vector and the axes it rotates
    /// around. Joints are decoded in the order they are added.
    ///
    /// # Errors
    /// Fails if a mask value is neither 0 nor 1
    pub fn add_joint(&mut self, joint: &str, dof: [i32; 3]) -> Result<()> {
        let mut mask = EnumMap::default();
        for (axis, value) in Axis::iter().zip(dof) {
            mask[axis] = match value {
                0 => false,
                1 => true,
                other => {
                    return Err(MocapError::InvalidConfiguration(format!(
                        "degree of freedom of `{joint}` around {axis} must be 0 or 1, got {other}"
                    )))
                }
            };
        }
        self.joints.push((joint.to_string(), mask));
        Ok(())
    }
    pub fn joints(&self) -> impl Iterator<Item = &str> {
        self.joints.iter().map(|(j, _)| j.as_str())
    }
    /// Number of model outputs the declared joints consume
    pub fn num_dofs(&self) -> usize {
        self.joints.iter().map(|(_, mask)| mask.values().filter(|v| **v).count()).sum()
    }

    /// # Errors
    /// Fails with ``IncompleteInput`` if a template marker is absent or not
    /// finite, with ``InvalidConfiguration`` if the declared joints do not
    /// consume exactly the model output
    pub fn predict(&mut self, markers: &MarkerMap) -> Result<HashMap<String, JointRotation>> {
        let template = &self.template;
        let mut input = Vec::with_capacity(3 * template.num_markers());
        for marker in template.markers() {
            match markers.get(marker) {
                Some(p) if !is_missing_v3f(p) => {}
                _ => return Err(MocapError::IncompleteInput(marker.clone())),
            }
        }
        let motion = template.alignment_motion(markers);
        for marker in template.markers() {
            let p = motion.apply(&markers[marker]);
            input.extend_from_slice(p.as_slice());
        }
        let output = self.model.forward(&input)?;
        if self.num_dofs() != output.len() {
            return Err(MocapError::InvalidConfiguration(format!(
                "joints consume {} outputs but the model produces {}",
                self.num_dofs(),
                output.len()
            )));
        }

        let mut values = output.iter();
        let mut rotations = HashMap::with_capacity(self.joints.len());
        for (joint, mask) in &self.joints {
            let mut euler = Vector3f::zeros();
            for (axis, enabled) in mask {
                if *enabled {
                    // counted above
                    euler[axis as usize] = values.next().copied().unwrap_or_default() * ANGLE_SCALE_DEG;
                }
            }
            let rotation = euler_zxy_degrees_to_quaternion(&euler);
            rotations.insert(joint.clone(), JointRotation { euler, rotation });
        }
        Ok(rotations)
    }
    pub fn reset(&mut self) {
        self.model.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{common::types::ActivationType, nn::layers::DenseLayer, nn::layers::Layer};
    use mocap_utils::vector::missing_v3f;
    use ndarray as nd;

    fn template() -> Arc<HandTemplate> {
        Arc::new(
            HandTemplate::builder()
                .marker("a", "wrist", Vector3f::new(0.0, 0.0, 0.0), true)
                .marker("b", "wrist", Vector3f::new(0.1, 0.0, 0.0), true)
                .marker("c", "wrist", Vector3f::new(0.0, 0.1, 0.0), true)
                .pivot("wrist")
                .build()
                .unwrap(),
        )
    }

    /// 9 inputs, `outputs` constant outputs given by the bias
    fn constant_model(bias: &[f32]) -> NeuralModel {
        let dense = DenseLayer::new(
            nd::Array2::zeros((9, bias.len())),
            nd::Array1::from_vec(bias.to_vec()),
            ActivationType::Linear,
        )
        .unwrap();
        NeuralModel::new(vec![Layer::Dense(dense)]).unwrap()
    }

    fn frame() -> MarkerMap {
        let t = template();
        t.markers().iter().map(|m| (m.clone(), t.initial_position(m).unwrap())).collect()
    }

    #[test]
    fn test_decodes_masked_axes() {
        let mut pred = JointPredictor::new(template(), constant_model(&[0.5, -0.25, 0.1])).unwrap();
        pred.add_joint("index1", [1, 0, 1]).unwrap();
        pred.add_joint("thumb1", [0, 1, 0]).unwrap();
        let out = pred.predict(&frame()).unwrap();
        let index = out["index1"];
        assert!((index.euler - Vector3f::new(90.0, 0.0, -45.0)).norm() < 1e-4);
        let thumb = out["thumb1"];
        assert!((thumb.euler - Vector3f::new(0.0, 18.0, 0.0)).norm() < 1e-4);
        let expected = euler_zxy_degrees_to_quaternion(&Vector3f::new(0.0, 18.0, 0.0));
        assert!(thumb.rotation.angle_to(&expected) < 1e-5);
    }

    #[test]
    fn test_rejects_bad_mask() {
        let mut pred = JointPredictor::new(template(), constant_model(&[0.0])).unwrap();
        assert!(matches!(pred.add_joint("index1", [1, 2, 0]), Err(MocapError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rejects_missing_marker() {
        let mut pred = JointPredictor::new(template(), constant_model(&[0.0])).unwrap();
        pred.add_joint("index1", [1, 0, 0]).unwrap();
        let mut f = frame();
        f.insert("b".to_string(), missing_v3f());
        assert!(matches!(pred.predict(&f), Err(MocapError::IncompleteInput(_))));
        f.remove("b");
        assert!(matches!(pred.predict(&f), Err(MocapError::IncompleteInput(_))));
    }

    #[test]
    fn test_rejects_output_count_mismatch() {
        let mut pred = JointPredictor::new(template(), constant_model(&[0.0, 0.0])).unwrap();
        pred.add_joint("index1", [1, 1, 1]).unwrap();
        assert!(matches!(pred.predict(&frame()), Err(MocapError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rejects_model_of_wrong_width() {
        let dense = DenseLayer::new(nd::Array2::zeros((6, 1)), nd::Array1::zeros(1), ActivationType::Linear).unwrap();
        let model = NeuralModel::new(vec![Layer::Dense(dense)]).unwrap();
        assert!(JointPredictor::new(template(), model).is_err());
    }
}
