use crate::vector::Vector3f;
use nalgebra as na;

/// Converts Euler angles given in degrees into a rotation. The rotation is
/// applied around z first, then x, then y, which is the convention the capture
/// rig's joint angles were recorded in.
pub fn euler_zxy_degrees_to_quaternion(euler_deg: &Vector3f) -> na::UnitQuaternion<f32> {
    let rx = na::UnitQuaternion::from_axis_angle(&na::Vector3::x_axis(), euler_deg.x.to_radians());
    let ry = na::UnitQuaternion::from_axis_angle(&na::Vector3::y_axis(), euler_deg.y.to_radians());
    let rz = na::UnitQuaternion::from_axis_angle(&na::Vector3::z_axis(), euler_deg.z.to_radians());
    ry * rx * rz
}

/// Moves `v` towards zero by `step` along its own direction. Never crosses
/// zero: once the step would overshoot, the result is exactly zero.
pub fn shrink_towards_zero(v: &Vector3f, step: f32) -> Vector3f {
    let len = v.norm();
    if len <= step || len == 0.0 {
        return Vector3f::zeros();
    }
    v - v * (step / len)
}

/// Scales `v` down so that its length does not exceed `limit`
pub fn clamp_norm(v: &Vector3f, limit: f32) -> Vector3f {
    let len = v.norm();
    if len > limit && len > 0.0 {
        v * (limit / len)
    } else {
        *v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euler_single_axis() {
        let q = euler_zxy_degrees_to_quaternion(&Vector3f::new(0.0, 90.0, 0.0));
        let v = q * Vector3f::new(1.0, 0.0, 0.0);
        assert!((v - Vector3f::new(0.0, 0.0, -1.0)).norm() < 1e-5);
    }

    #[test]
    fn test_euler_order_is_z_then_x_then_y() {
        let e = Vector3f::new(30.0, 45.0, 60.0);
        let q = euler_zxy_degrees_to_quaternion(&e);
        let manual = na::UnitQuaternion::from_axis_angle(&na::Vector3::y_axis(), 45f32.to_radians())
            * na::UnitQuaternion::from_axis_angle(&na::Vector3::x_axis(), 30f32.to_radians())
            * na::UnitQuaternion::from_axis_angle(&na::Vector3::z_axis(), 60f32.to_radians());
        assert!(q.angle_to(&manual) < 1e-5);
    }

    #[test]
    fn test_shrink_never_overshoots() {
        let v = Vector3f::new(0.3, 0.0, 0.4);
        let s = shrink_towards_zero(&v, 0.1);
        assert!((s.norm() - 0.4).abs() < 1e-6);
        assert!(s.dot(&v) > 0.0);
        assert_eq!(shrink_towards_zero(&v, 0.6), Vector3f::zeros());
        assert_eq!(shrink_towards_zero(&v, 0.5), Vector3f::zeros());
    }

    #[test]
    fn test_clamp_norm() {
        let v = Vector3f::new(0.0, 3.0, 4.0);
        assert!((clamp_norm(&v, 1.0).norm() - 1.0).abs() < 1e-6);
        assert_eq!(clamp_norm(&v, 10.0), v);
    }
}
