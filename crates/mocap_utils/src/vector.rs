use na::{Matrix3, Vector3};
extern crate nalgebra as na;
pub type Vector3f = Vector3<f32>;
pub type Vector3d = Vector3<f64>;
pub type Matrix3f = Matrix3<f32>;
/// The sentinel used for a marker that was not seen this frame
pub fn missing_v3f() -> Vector3f {
    Vector3f::new(f32::NAN, f32::NAN, f32::NAN)
}
/// A position is missing as soon as any component is not finite
pub fn is_missing_v3f(v: &Vector3f) -> bool {
    !(v.x.is_finite() && v.y.is_finite() && v.z.is_finite())
}
pub fn vec_from_fixed(v: &[f32; 3]) -> Vector3f {
    Vector3f::new(v[0], v[1], v[2])
}
pub fn vec_from_slice(v: &[f32]) -> Vector3f {
    Vector3f::new(v[0], v[1], v[2])
}
pub fn v3d_from_v3f(v: &Vector3f) -> Vector3d {
    Vector3d::new(f64::from(v.x), f64::from(v.y), f64::from(v.z))
}
#[allow(clippy::cast_possible_truncation)]
pub fn v3f_from_v3d(v: &Vector3d) -> Vector3f {
    Vector3f::new(v.x as f32, v.y as f32, v.z as f32)
}
pub fn mean_v3f(points: &[Vector3f]) -> Vector3f {
    if points.is_empty() {
        return Vector3f::zeros();
    }
    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f32;
    points.iter().fold(Vector3f::zeros(), |acc, p| acc + p) / n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sentinel() {
        assert!(is_missing_v3f(&missing_v3f()));
        assert!(is_missing_v3f(&Vector3f::new(0.0, f32::INFINITY, 0.0)));
        assert!(!is_missing_v3f(&Vector3f::new(0.0, 1.0, -2.0)));
    }

    #[test]
    fn test_mean() {
        let m = mean_v3f(&[Vector3f::new(0.0, 0.0, 0.0), Vector3f::new(2.0, 4.0, -2.0)]);
        assert!((m - Vector3f::new(1.0, 2.0, -1.0)).norm() < 1e-6);
        assert_eq!(mean_v3f(&[]), Vector3f::zeros());
    }
}
