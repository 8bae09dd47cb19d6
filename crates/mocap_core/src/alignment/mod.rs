pub mod affine;
pub mod rigid_motion;
