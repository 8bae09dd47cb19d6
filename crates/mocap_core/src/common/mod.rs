pub mod config;
pub mod errors;
pub mod hand_template;
pub mod markers;
pub mod types;
