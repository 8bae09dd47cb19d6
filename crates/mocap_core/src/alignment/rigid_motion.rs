use mocap_utils::vector::{mean_v3f, Matrix3f, Vector3f};

/// A proper rotation plus an offset, acting on points written as row vectors:
/// ``apply(v) = v·R + t``.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigidMotion {
    pub rotation: Matrix3f,
    pub offset: Vector3f,
}
impl Default for RigidMotion {
    fn default() -> Self {
        Self::identity()
    }
}
impl RigidMotion {
    pub fn new(rotation: Matrix3f, offset: Vector3f) -> Self {
        Self { rotation, offset }
    }
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3f::identity(),
            offset: Vector3f::zeros(),
        }
    }
    /// Least-squares rigid motion taking each `src[i]` onto `dst[i]` (Kabsch).
    /// With no points there is nothing to align and the identity is returned.
    ///
    /// # Panics
    /// Will panic if `src` and `dst` have different lengths
    pub fn compute(src: &[Vector3f], dst: &[Vector3f]) -> Self {
        assert_eq!(src.len(), dst.len(), "rigid motion needs paired point lists");
        if src.is_empty() {
            return Self::identity();
        }
        let src_mean = mean_v3f(src);
        let dst_mean = mean_v3f(dst);
        // H = (Y - mean_y)^T (X - mean_x) with points as rows
        let mut h = Matrix3f::zeros();
        for (x, y) in src.iter().zip(dst.iter()) {
            h += (y - dst_mean) * (x - src_mean).transpose();
        }
        let svd = h.svd(true, true);
        let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
            return Self::identity();
        };
        let mut v = v_t.transpose();
        let mut rotation = v * u.transpose();
        if rotation.determinant() < 0.0 {
            // reflection, flip the direction of least variance
            v.column_mut(2).neg_mut();
            rotation = v * u.transpose();
        }
        let offset = dst_mean - rotation.tr_mul(&src_mean);
        Self { rotation, offset }
    }
    /// ``v·R + t``
    pub fn apply(&self, v: &Vector3f) -> Vector3f {
        self.rotation.tr_mul(v) + self.offset
    }
    /// ``(v - t)·Rᵀ``, exact inverse of [`RigidMotion::apply`] since R is orthonormal
    pub fn apply_inverse(&self, v: &Vector3f) -> Vector3f {
        self.rotation * (v - self.offset)
    }
    #[must_use]
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.transpose();
        Self {
            rotation,
            offset: -rotation.tr_mul(&self.offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra as na;

    fn cloud() -> Vec<Vector3f> {
        vec![
            Vector3f::new(0.0, 0.0, 0.0),
            Vector3f::new(0.1, 0.0, 0.02),
            Vector3f::new(0.03, 0.08, -0.01),
            Vector3f::new(-0.02, 0.05, 0.07),
            Vector3f::new(0.06, -0.04, 0.03),
        ]
    }

    fn known_motion() -> RigidMotion {
        let q = na::UnitQuaternion::from_euler_angles(0.4, -0.7, 1.1);
        RigidMotion::new(*q.to_rotation_matrix().matrix(), Vector3f::new(0.5, -1.0, 2.0))
    }

    #[test]
    fn test_recovers_known_motion() {
        let truth = known_motion();
        let src = cloud();
        let dst: Vec<Vector3f> = src.iter().map(|p| truth.apply(p)).collect();
        let m = RigidMotion::compute(&src, &dst);
        assert!((m.rotation - truth.rotation).norm() < 1e-3);
        assert!((m.offset - truth.offset).norm() < 1e-3);
        assert!((m.rotation.determinant() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_reflection_is_corrected() {
        let src = cloud();
        // mirror through the yz plane, the best orthogonal map is a reflection
        let dst: Vec<Vector3f> = src.iter().map(|p| Vector3f::new(-p.x, p.y, p.z)).collect();
        let m = RigidMotion::compute(&src, &dst);
        assert!((m.rotation.determinant() - 1.0).abs() < 1e-4);
        assert!((m.rotation * m.rotation.transpose() - Matrix3f::identity()).norm() < 1e-4);
    }

    #[test]
    fn test_empty_is_identity() {
        let m = RigidMotion::compute(&[], &[]);
        assert_eq!(m, RigidMotion::identity());
    }

    #[test]
    fn test_round_trip() {
        let m = known_motion();
        let v = Vector3f::new(0.3, -0.2, 1.7);
        assert!((m.apply(&m.apply_inverse(&v)) - v).norm() < 1e-5);
        assert!((m.apply_inverse(&m.apply(&v)) - v).norm() < 1e-5);
        assert!((m.inverse().apply(&m.apply(&v)) - v).norm() < 1e-5);
    }
}
