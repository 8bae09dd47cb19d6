use super::{
    codec::{LayerCodec, ModelCodec},
    layers::{DenseLayer, Layer, LstmLayer, SimpleRnnLayer},
};
use crate::common::{
    errors::{MocapError, Result},
    types::LayerType,
};
use log::{debug, info};
use ndarray as nd;
use std::{io::Read, path::Path};

/// A feed-forward chain of layers evaluated in float32.
///
/// Recurrent layers keep their state between calls to [`NeuralModel::forward`],
/// so forward passes are not referentially transparent: every call advances
/// the sequence, and one instance must not be shared between two sequences.
#[derive(Clone, Debug)]
pub struct NeuralModel {
    layers: Vec<Layer>,
}
impl NeuralModel {
    /// # Errors
    /// Fails if there are no layers or the output of a layer does not fit the
    /// input of the next
    pub fn new(layers: Vec<Layer>) -> Result<Self> {
        if layers.is_empty() {
            return Err(MocapError::ModelFormat("model has no layers".to_string()));
        }
        for (idx, pair) in layers.windows(2).enumerate() {
            if pair[0].output_size() != pair[1].input_size() {
                return Err(MocapError::ModelFormat(format!(
                    "layer {idx} outputs {} values but layer {} expects {}",
                    pair[0].output_size(),
                    idx + 1,
                    pair[1].input_size()
                )));
            }
        }
        Ok(Self { layers })
    }
    /// # Errors
    /// Fails if a layer's tensors do not form a valid layer
    pub fn from_codec(codec: &ModelCodec) -> Result<Self> {
        let layers = codec.layers.iter().map(layer_from_codec).collect::<Result<Vec<_>>>()?;
        let model = Self::new(layers)?;
        info!(
            "neural model: {} layers, {} -> {}, recurrent: {}",
            model.layers.len(),
            model.input_size(),
            model.output_size(),
            model.is_recurrent()
        );
        for (idx, layer) in model.layers.iter().enumerate() {
            debug!(
                "  layer {idx}: {} ({}) {} -> {}",
                layer.layer_type(),
                layer.activation(),
                layer.input_size(),
                layer.output_size()
            );
        }
        Ok(model)
    }
    /// # Errors
    /// See [`ModelCodec::from_reader`] and [`NeuralModel::from_codec`]
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        Self::from_codec(&ModelCodec::from_reader(reader)?)
    }
    /// # Errors
    /// See [`NeuralModel::from_reader`]
    pub fn from_buf(buf: &[u8]) -> Result<Self> {
        Self::from_codec(&ModelCodec::from_buf(buf)?)
    }
    /// # Errors
    /// See [`NeuralModel::from_reader`]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_codec(&ModelCodec::from_file(path)?)
    }
    /// The weights of the model in serializable form
    pub fn to_codec(&self) -> ModelCodec {
        let layers = self
            .layers
            .iter()
            .map(|layer| {
                let tensors = match layer {
                    Layer::Dense(l) => vec![l.kernel.clone().into_dyn(), l.bias.clone().into_dyn()],
                    Layer::SimpleRnn(l) => vec![
                        l.kernel.clone().into_dyn(),
                        l.recurrent_kernel.clone().into_dyn(),
                        l.bias.clone().into_dyn(),
                    ],
                    Layer::Lstm(l) => vec![
                        l.kernel.clone().into_dyn(),
                        l.recurrent_kernel.clone().into_dyn(),
                        l.bias.clone().into_dyn(),
                    ],
                };
                LayerCodec {
                    layer_type: layer.layer_type(),
                    activation: layer.activation(),
                    tensors,
                }
            })
            .collect();
        ModelCodec { layers }
    }
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, Layer::input_size)
    }
    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, Layer::output_size)
    }
    /// Whether any layer carries state from one call to the next
    pub fn is_recurrent(&self) -> bool {
        self.layers.iter().any(Layer::is_recurrent)
    }
    /// Puts every recurrent layer back to its initial, zero state
    pub fn reset(&mut self) {
        for layer in &mut self.layers {
            layer.reset();
        }
    }
    /// Runs the layers in series
    ///
    /// # Errors
    /// Fails with ``InvalidConfiguration`` if the input length is not the
    /// model's input size
    pub fn forward(&mut self, input: &[f32]) -> Result<nd::Array1<f32>> {
        if input.len() != self.input_size() {
            return Err(MocapError::InvalidConfiguration(format!(
                "model expects {} inputs, got {}",
                self.input_size(),
                input.len()
            )));
        }
        let mut x = nd::Array1::from_vec(input.to_vec());
        for layer in &mut self.layers {
            x = layer.forward(&x);
        }
        Ok(x)
    }
}

fn layer_from_codec(codec: &LayerCodec) -> Result<Layer> {
    let bad = |e: nd::ShapeError| MocapError::ModelFormat(format!("{} layer: {e}", codec.layer_type));
    let matrix = |idx: usize| -> Result<nd::Array2<f32>> {
        codec
            .tensors
            .get(idx)
            .ok_or_else(|| MocapError::ModelFormat(format!("{} layer is missing tensor {idx}", codec.layer_type)))?
            .clone()
            .into_dimensionality::<nd::Ix2>()
            .map_err(bad)
    };
    let vector = |idx: usize| -> Result<nd::Array1<f32>> {
        codec
            .tensors
            .get(idx)
            .ok_or_else(|| MocapError::ModelFormat(format!("{} layer is missing tensor {idx}", codec.layer_type)))?
            .clone()
            .into_dimensionality::<nd::Ix1>()
            .map_err(bad)
    };
    let layer = match codec.layer_type {
        LayerType::Dense | LayerType::TimeDistributedDense => Layer::Dense(DenseLayer::new(matrix(0)?, vector(1)?, codec.activation)?),
        LayerType::SimpleRnn => Layer::SimpleRnn(SimpleRnnLayer::new(matrix(0)?, matrix(1)?, vector(2)?, codec.activation)?),
        LayerType::Lstm => Layer::Lstm(LstmLayer::new(matrix(0)?, matrix(1)?, vector(2)?, codec.activation)?),
    };
    Ok(layer)
}
