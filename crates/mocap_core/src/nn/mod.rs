pub mod activation;
pub mod codec;
pub mod layers;
pub mod model;
