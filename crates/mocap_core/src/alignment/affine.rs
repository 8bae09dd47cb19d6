use mocap_utils::vector::{v3d_from_v3f, v3f_from_v3d, Vector3d, Vector3f};
use nalgebra as na;

/// Ridge term added to the normal equations
pub const RIDGE_LAMBDA: f64 = 1e-8;

/// Weights expressing each of M target points as an affine combination of N
/// known points, fitted on a reference frame. Solved in double precision since
/// the normal matrix is rank deficient (rank <= 4) and only the ridge term
/// keeps it invertible.
#[derive(Clone, Debug)]
pub struct AffineImputation {
    /// M x N
    weights: na::DMatrix<f64>,
}
impl AffineImputation {
    /// ``W = (Ỹᵀ·X̃)·(X̃ᵀ·X̃ + λI)⁻¹`` where X̃, Ỹ hold the homogeneous points as
    /// columns
    pub fn compute(known: &[Vector3f], targets: &[Vector3f]) -> Self {
        let n = known.len();
        let m = targets.len();
        let x = homogeneous_columns(known);
        let y = homogeneous_columns(targets);
        let mut normal = x.transpose() * &x;
        for i in 0..n {
            normal[(i, i)] += RIDGE_LAMBDA;
        }
        let rhs = x.transpose() * &y; // N x M
        let weights_t = match na::linalg::Cholesky::new(normal.clone()) {
            Some(chol) => chol.solve(&rhs),
            None => normal.try_inverse().map_or_else(|| na::DMatrix::zeros(n, m), |inv| inv * rhs),
        };
        Self {
            weights: weights_t.transpose(),
        }
    }
    /// Number of known points the weights expect
    pub fn num_known(&self) -> usize {
        self.weights.ncols()
    }
    pub fn num_targets(&self) -> usize {
        self.weights.nrows()
    }
    pub fn weights(&self) -> &na::DMatrix<f64> {
        &self.weights
    }
    /// Predicts the targets from new positions of the known points, given in
    /// the same order the weights were computed with
    ///
    /// # Panics
    /// Will panic if the number of known points differs from the fit
    pub fn apply(&self, known: &[Vector3f]) -> Vec<Vector3f> {
        assert_eq!(known.len(), self.num_known(), "affine weights applied to a different marker count");
        self.weights
            .row_iter()
            .map(|row| {
                let p = row
                    .iter()
                    .zip(known.iter())
                    .fold(Vector3d::zeros(), |acc, (w, k)| acc + v3d_from_v3f(k) * *w);
                v3f_from_v3d(&p)
            })
            .collect()
    }
}

fn homogeneous_columns(points: &[Vector3f]) -> na::DMatrix<f64> {
    let mut m = na::DMatrix::<f64>::zeros(4, points.len());
    for (j, p) in points.iter().enumerate() {
        m[(0, j)] = f64::from(p.x);
        m[(1, j)] = f64::from(p.y);
        m[(2, j)] = f64::from(p.z);
        m[(3, j)] = 1.0;
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::rigid_motion::RigidMotion;

    fn known() -> Vec<Vector3f> {
        vec![
            Vector3f::new(0.0, 0.0, 0.0),
            Vector3f::new(0.1, 0.0, 0.0),
            Vector3f::new(0.0, 0.1, 0.0),
            Vector3f::new(0.0, 0.0, 0.1),
            Vector3f::new(0.05, 0.07, 0.02),
            Vector3f::new(-0.03, 0.04, 0.09),
        ]
    }

    #[test]
    fn test_identity_targets_are_reproduced() {
        let pts = known()[..4].to_vec();
        let imp = AffineImputation::compute(&pts, &pts);
        let out = imp.apply(&pts);
        for (a, b) in out.iter().zip(pts.iter()) {
            assert!((a - b).norm() < 1e-4);
        }
    }

    #[test]
    fn test_weight_rows_sum_to_one() {
        let targets = vec![Vector3f::new(0.02, 0.03, 0.01), Vector3f::new(0.08, 0.01, 0.05)];
        let imp = AffineImputation::compute(&known(), &targets);
        for row in imp.weights().row_iter() {
            assert!((row.sum() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_follows_rigid_motion_of_known_points() {
        let pts = known();
        let targets = vec![(pts[1] + pts[2]) * 0.5, pts[3] * 2.0 - pts[0]];
        let imp = AffineImputation::compute(&pts, &targets);
        let q = nalgebra::UnitQuaternion::from_euler_angles(0.3, 0.2, -0.5);
        let motion = RigidMotion::new(*q.to_rotation_matrix().matrix(), Vector3f::new(1.0, 2.0, 3.0));
        let moved: Vec<Vector3f> = pts.iter().map(|p| motion.apply(p)).collect();
        let out = imp.apply(&moved);
        for (o, t) in out.iter().zip(targets.iter()) {
            assert!((o - motion.apply(t)).norm() < 1e-3);
        }
    }

    #[test]
    fn test_no_targets() {
        let imp = AffineImputation::compute(&known(), &[]);
        assert_eq!(imp.num_targets(), 0);
        assert!(imp.apply(&known()).is_empty());
    }
}
