use enum_map::Enum;
use num_derive::FromPrimitive;
use serde::Deserialize;
use strum_macros::{Display, EnumIter};

/// Layer tags of the binary model format. Tag 3 is an alias of ``Dense``
/// written by older exporters for time-distributed dense layers.
#[derive(Clone, Copy, Debug, FromPrimitive, PartialEq, Eq, Display)]
pub enum LayerType {
    Dense = 0,
    SimpleRnn = 1,
    Lstm = 2,
    TimeDistributedDense = 3,
}

/// Activation tags of the binary model format
#[derive(Clone, Copy, Debug, FromPrimitive, PartialEq, Eq, Display)]
pub enum ActivationType {
    Relu = 0,
    Linear = 1,
    Sigmoid = 2,
    Tanh = 3,
    HardSigmoid = 4,
}

/// Rotation axis of a joint degree of freedom
#[derive(Clone, Copy, Debug, Enum, EnumIter, PartialEq, Eq, Display)]
pub enum Axis {
    X = 0,
    Y,
    Z,
}

/// The available occlusion predictor strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictorKind {
    Naive,
    MovingAverage,
    AffineRegression,
    NeuralAutoencoder,
}
