// #![warn(
//     clippy::all,
//     clippy::pedantic,
// )]
// #![allow(clippy::must_use_candidate)]
// #![allow(clippy::module_name_repetitions)]

pub mod alignment;
pub mod common;
pub mod joints;
pub mod nn;
pub mod occlusion;
