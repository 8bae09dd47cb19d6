use thiserror::Error;

/// Errors surfaced by the capture pipeline. Partial predictions and the
/// bootstrap frame are normal control flow and never show up here.
#[derive(Error, Debug)]
pub enum MocapError {
    /// The serialized model is malformed or uses an unsupported layer/activation
    #[error("malformed model: {0}")]
    ModelFormat(String),
    /// Calibration or joint layout does not match what the model expects
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A marker needed by the joint predictor has no position
    #[error("incomplete input: marker `{0}` has no position")]
    IncompleteInput(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("cannot parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, MocapError>;
