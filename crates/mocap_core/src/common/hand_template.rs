use super::{
    errors::{MocapError, Result},
    markers::MarkerMap,
};
use crate::alignment::rigid_motion::RigidMotion;
use log::warn;
use mocap_utils::{array::GatherRows, vector::Vector3f};
use nalgebra as na;
use ndarray as nd;
use std::collections::HashMap;

/// Bind-pose transform of a joint in world space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointPose {
    pub position: Vector3f,
    pub rotation: na::UnitQuaternion<f32>,
}
impl Default for JointPose {
    fn default() -> Self {
        Self {
            position: Vector3f::zeros(),
            rotation: na::UnitQuaternion::identity(),
        }
    }
}
impl JointPose {
    pub fn new(position: Vector3f, rotation: na::UnitQuaternion<f32>) -> Self {
        Self { position, rotation }
    }
    fn to_world(&self, local: &Vector3f) -> Vector3f {
        self.rotation * local + self.position
    }
    fn to_local(&self, world: &Vector3f) -> Vector3f {
        self.rotation.inverse() * (world - self.position)
    }
}

#[derive(Clone, Debug)]
struct MarkerEntry {
    id: String,
    joint: String,
    offset: Vector3f,
    alignment: bool,
}

/// Static calibration of the hand: which joint every marker sits on, where
/// it sits relative to that joint and which markers are used for alignment.
/// The order of the markers is the order of the neural network features.
#[derive(Clone, Debug)]
pub struct HandTemplate {
    markers: Vec<String>,
    joints: Vec<String>,
    marker2idx: HashMap<String, usize>,
    alignment_idx: Vec<usize>,
    pivot_joint: String,
    // bind pose marker positions in the pivot joint frame, K x 3
    initial_positions: nd::Array2<f32>,
    alignment_positions: Vec<Vector3f>,
}
impl HandTemplate {
    pub fn builder() -> HandTemplateBuilder {
        HandTemplateBuilder::default()
    }
    pub fn markers(&self) -> &[String] {
        &self.markers
    }
    pub fn num_markers(&self) -> usize {
        self.markers.len()
    }
    pub fn index_of(&self, marker: &str) -> Option<usize> {
        self.marker2idx.get(marker).copied()
    }
    pub fn contains(&self, marker: &str) -> bool {
        self.marker2idx.contains_key(marker)
    }
    pub fn joint_of(&self, marker: &str) -> Option<&str> {
        self.index_of(marker).map(|i| self.joints[i].as_str())
    }
    pub fn pivot_joint(&self) -> &str {
        &self.pivot_joint
    }
    pub fn is_alignment_marker(&self, marker: &str) -> bool {
        self.index_of(marker).is_some_and(|i| self.alignment_idx.contains(&i))
    }
    pub fn alignment_markers(&self) -> impl Iterator<Item = &str> {
        self.alignment_idx.iter().map(|&i| self.markers[i].as_str())
    }
    pub fn initial_position(&self, marker: &str) -> Option<Vector3f> {
        self.index_of(marker).map(|i| self.initial_position_at(i))
    }
    pub fn initial_position_at(&self, idx: usize) -> Vector3f {
        let row = self.initial_positions.row(idx);
        Vector3f::new(row[0], row[1], row[2])
    }
    /// Bind pose positions of the alignment markers, in template order
    pub fn alignment_positions(&self) -> &[Vector3f] {
        &self.alignment_positions
    }
    /// Rigid motion mapping world positions onto the bind pose, fitted on the
    /// given `markers`. Markers absent from `positions` or from the template
    /// are skipped.
    pub fn rigid_motion_from<'a, I>(&self, positions: &MarkerMap, markers: I) -> RigidMotion
    where
        I: IntoIterator<Item = &'a str>,
    {
        let (src, dst): (Vec<_>, Vec<_>) = markers
            .into_iter()
            .filter_map(|m| Some((*positions.get(m)?, self.initial_position_at(self.index_of(m)?))))
            .unzip();
        fit_rigid_motion(&src, &dst)
    }
    /// Rigid motion fitted on the alignment markers present in `positions`,
    /// against their cached bind pose positions
    pub fn alignment_motion(&self, positions: &MarkerMap) -> RigidMotion {
        let (src, dst): (Vec<_>, Vec<_>) = self
            .alignment_idx
            .iter()
            .zip(&self.alignment_positions)
            .filter_map(|(&idx, bind)| positions.get(&self.markers[idx]).map(|p| (*p, *bind)))
            .unzip();
        fit_rigid_motion(&src, &dst)
    }
}

fn fit_rigid_motion(src: &[Vector3f], dst: &[Vector3f]) -> RigidMotion {
    if src.len() < 3 {
        warn!("aligning on {} markers, the rotation is not fully determined", src.len());
    }
    RigidMotion::compute(src, dst)
}

/// Collects the calibration data and validates it into a [`HandTemplate`]
#[derive(Default)]
pub struct HandTemplateBuilder {
    entries: Vec<MarkerEntry>,
    joint_poses: HashMap<String, JointPose>,
    pivot: Option<String>,
    pivot_set_twice: bool,
}
impl HandTemplateBuilder {
    #[must_use]
    pub fn marker(mut self, id: &str, joint: &str, offset: Vector3f, alignment: bool) -> Self {
        self.entries.push(MarkerEntry {
            id: id.to_string(),
            joint: joint.to_string(),
            offset,
            alignment,
        });
        self
    }
    /// Bind pose of a joint. Joints without one are at the origin, unrotated.
    #[must_use]
    pub fn joint_pose(mut self, joint: &str, pose: JointPose) -> Self {
        self.joint_poses.insert(joint.to_string(), pose);
        self
    }
    #[must_use]
    pub fn pivot(mut self, joint: &str) -> Self {
        if self.pivot.is_some() {
            self.pivot_set_twice = true;
        }
        self.pivot = Some(joint.to_string());
        self
    }
    /// # Errors
    /// Fails if a marker id repeats, the pivot is missing, set twice or not a
    /// known joint
    pub fn build(self) -> Result<HandTemplate> {
        if self.pivot_set_twice {
            return Err(MocapError::InvalidConfiguration("pivot joint set more than once".to_string()));
        }
        let pivot_joint = self
            .pivot
            .ok_or_else(|| MocapError::InvalidConfiguration("no pivot joint set".to_string()))?;
        let pivot_known = self.joint_poses.contains_key(&pivot_joint) || self.entries.iter().any(|e| e.joint == pivot_joint);
        if !pivot_known {
            return Err(MocapError::InvalidConfiguration(format!("pivot joint `{pivot_joint}` is not a joint of the hand")));
        }
        let mut marker2idx = HashMap::new();
        for (idx, entry) in self.entries.iter().enumerate() {
            if marker2idx.insert(entry.id.clone(), idx).is_some() {
                return Err(MocapError::InvalidConfiguration(format!("marker `{}` listed twice", entry.id)));
            }
        }

        let pivot_pose = self.joint_poses.get(&pivot_joint).copied().unwrap_or_default();
        let num_markers = self.entries.len();
        let mut initial_positions = nd::Array2::<f32>::zeros((num_markers, 3));
        for (idx, entry) in self.entries.iter().enumerate() {
            let joint_pose = self.joint_poses.get(&entry.joint).copied().unwrap_or_default();
            let p = pivot_pose.to_local(&joint_pose.to_world(&entry.offset));
            initial_positions.row_mut(idx).assign(&nd::array![p.x, p.y, p.z]);
        }
        let alignment_idx: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.alignment)
            .map(|(i, _)| i)
            .collect();
        let alignment_positions = initial_positions
            .gather_rows(&alignment_idx)
            .rows()
            .into_iter()
            .map(|r| Vector3f::new(r[0], r[1], r[2]))
            .collect();

        Ok(HandTemplate {
            markers: self.entries.iter().map(|e| e.id.clone()).collect(),
            joints: self.entries.iter().map(|e| e.joint.clone()).collect(),
            marker2idx,
            alignment_idx,
            pivot_joint,
            initial_positions,
            alignment_positions,
        })
    }
}
