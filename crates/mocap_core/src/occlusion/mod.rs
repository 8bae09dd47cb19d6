pub mod affine_regression;
pub mod autoencoder;
pub mod manager;
pub mod moving_average;
pub mod naive;
pub mod predictor;

use self::{
    affine_regression::AffineRegressionPredictor, autoencoder::NeuralAutoencoderPredictor, moving_average::MovingAveragePredictor,
    naive::NaivePredictor, predictor::OcclusionPredictor,
};
use crate::{
    common::{
        config::PipelineConfig,
        errors::{MocapError, Result},
        hand_template::HandTemplate,
        types::PredictorKind,
    },
    nn::model::NeuralModel,
};
use std::sync::Arc;

/// Creates one pipeline stage. The autoencoder gets its own copy of
/// `marker_model` since the model carries recurrent state.
///
/// # Errors
/// Fails for the autoencoder if no model is given or it does not fit the
/// template
pub fn build_predictor(
    kind: PredictorKind,
    config: &PipelineConfig,
    template: &Arc<HandTemplate>,
    marker_model: Option<&NeuralModel>,
) -> Result<Box<dyn OcclusionPredictor>> {
    Ok(match kind {
        PredictorKind::Naive => Box::new(NaivePredictor::new()),
        PredictorKind::MovingAverage => Box::new(MovingAveragePredictor::new(config.moving_average.window_size)),
        PredictorKind::AffineRegression => Box::new(AffineRegressionPredictor::new()),
        PredictorKind::NeuralAutoencoder => {
            let model = marker_model.ok_or_else(|| {
                MocapError::InvalidConfiguration("the neural autoencoder predictor needs a marker model".to_string())
            })?;
            Box::new(NeuralAutoencoderPredictor::new(
                Arc::clone(template),
                model.clone(),
                config.autoencoder.clone(),
            )?)
        }
    })
}

/// All stages of `config`, in order
///
/// # Errors
/// See [`build_predictor`]
pub fn build_pipeline(
    config: &PipelineConfig,
    template: &Arc<HandTemplate>,
    marker_model: Option<&NeuralModel>,
) -> Result<Vec<Box<dyn OcclusionPredictor>>> {
    config
        .predictors
        .iter()
        .map(|kind| build_predictor(*kind, config, template, marker_model))
        .collect()
}
