use super::activation::sigmoid;
use crate::common::{
    errors::{MocapError, Result},
    types::{ActivationType, LayerType},
};
use ndarray as nd;

fn shape_error(layer: LayerType, what: &str) -> MocapError {
    MocapError::ModelFormat(format!("{layer} layer: {what}"))
}

/// Fully connected layer, ``y = act(x·W + b)`` with W stored as
/// ``[input, units]``
#[derive(Clone, Debug)]
pub struct DenseLayer {
    pub kernel: nd::Array2<f32>,
    pub bias: nd::Array1<f32>,
    pub activation: ActivationType,
}
impl DenseLayer {
    /// # Errors
    /// Fails if the bias length differs from the number of units
    pub fn new(kernel: nd::Array2<f32>, bias: nd::Array1<f32>, activation: ActivationType) -> Result<Self> {
        if bias.len() != kernel.ncols() {
            return Err(shape_error(LayerType::Dense, "bias length does not match kernel columns"));
        }
        Ok(Self { kernel, bias, activation })
    }
    pub fn forward(&self, x: &nd::Array1<f32>) -> nd::Array1<f32> {
        let mut y = x.dot(&self.kernel) + &self.bias;
        self.activation.apply_inplace(&mut y);
        y
    }
}

/// Elman recurrent layer, ``h_t = act(x_t·W + h_{t-1}·U + b)``. The hidden
/// state is kept between calls until [`SimpleRnnLayer::reset`].
#[derive(Clone, Debug)]
pub struct SimpleRnnLayer {
    pub kernel: nd::Array2<f32>,
    pub recurrent_kernel: nd::Array2<f32>,
    pub bias: nd::Array1<f32>,
    pub activation: ActivationType,
    state: nd::Array1<f32>,
}
impl SimpleRnnLayer {
    /// # Errors
    /// Fails if the recurrent kernel is not ``[units, units]`` or the bias
    /// length is not ``units``
    pub fn new(
        kernel: nd::Array2<f32>,
        recurrent_kernel: nd::Array2<f32>,
        bias: nd::Array1<f32>,
        activation: ActivationType,
    ) -> Result<Self> {
        let units = kernel.ncols();
        if recurrent_kernel.dim() != (units, units) {
            return Err(shape_error(LayerType::SimpleRnn, "recurrent kernel must be units x units"));
        }
        if bias.len() != units {
            return Err(shape_error(LayerType::SimpleRnn, "bias length does not match units"));
        }
        Ok(Self {
            kernel,
            recurrent_kernel,
            bias,
            activation,
            state: nd::Array1::zeros(units),
        })
    }
    pub fn units(&self) -> usize {
        self.kernel.ncols()
    }
    pub fn state(&self) -> &nd::Array1<f32> {
        &self.state
    }
    pub fn reset(&mut self) {
        self.state.fill(0.0);
    }
    pub fn forward(&mut self, x: &nd::Array1<f32>) -> nd::Array1<f32> {
        let mut h = x.dot(&self.kernel) + self.state.dot(&self.recurrent_kernel) + &self.bias;
        self.activation.apply_inplace(&mut h);
        self.state.assign(&h);
        h
    }
}

/// LSTM layer. Kernels are ``[input, 4·units]`` / ``[units, 4·units]`` with the
/// gates concatenated as input, forget, cell, output. Gates always use the
/// sigmoid, the candidate cell and the output use the layer activation.
#[derive(Clone, Debug)]
pub struct LstmLayer {
    pub kernel: nd::Array2<f32>,
    pub recurrent_kernel: nd::Array2<f32>,
    pub bias: nd::Array1<f32>,
    pub activation: ActivationType,
    hidden: nd::Array1<f32>,
    cell: nd::Array1<f32>,
}
impl LstmLayer {
    /// # Errors
    /// Fails if the kernel width is not a multiple of 4 or the recurrent
    /// kernel and bias do not match it
    pub fn new(
        kernel: nd::Array2<f32>,
        recurrent_kernel: nd::Array2<f32>,
        bias: nd::Array1<f32>,
        activation: ActivationType,
    ) -> Result<Self> {
        let width = kernel.ncols();
        if width == 0 || width % 4 != 0 {
            return Err(shape_error(LayerType::Lstm, "kernel width must be a non-zero multiple of 4"));
        }
        let units = width / 4;
        if recurrent_kernel.dim() != (units, width) {
            return Err(shape_error(LayerType::Lstm, "recurrent kernel must be units x 4*units"));
        }
        if bias.len() != width {
            return Err(shape_error(LayerType::Lstm, "bias length must be 4*units"));
        }
        Ok(Self {
            kernel,
            recurrent_kernel,
            bias,
            activation,
            hidden: nd::Array1::zeros(units),
            cell: nd::Array1::zeros(units),
        })
    }
    pub fn units(&self) -> usize {
        self.kernel.ncols() / 4
    }
    pub fn hidden(&self) -> &nd::Array1<f32> {
        &self.hidden
    }
    pub fn cell(&self) -> &nd::Array1<f32> {
        &self.cell
    }
    pub fn reset(&mut self) {
        self.hidden.fill(0.0);
        self.cell.fill(0.0);
    }
    pub fn forward(&mut self, x: &nd::Array1<f32>) -> nd::Array1<f32> {
        let u = self.units();
        let z = x.dot(&self.kernel) + self.hidden.dot(&self.recurrent_kernel) + &self.bias;
        let gate = |k: usize| z.slice(nd::s![k * u..(k + 1) * u]).to_owned();
        let input_gate = gate(0).mapv(sigmoid);
        let forget_gate = gate(1).mapv(sigmoid);
        let mut candidate = gate(2);
        self.activation.apply_inplace(&mut candidate);
        let output_gate = gate(3).mapv(sigmoid);

        self.cell = &forget_gate * &self.cell + &input_gate * &candidate;
        let mut cell_out = self.cell.clone();
        self.activation.apply_inplace(&mut cell_out);
        self.hidden = &output_gate * &cell_out;
        self.hidden.clone()
    }
}

/// A layer of the model, its kind decided once when the model is loaded
#[derive(Clone, Debug)]
pub enum Layer {
    Dense(DenseLayer),
    SimpleRnn(SimpleRnnLayer),
    Lstm(LstmLayer),
}
impl Layer {
    pub fn layer_type(&self) -> LayerType {
        match self {
            Self::Dense(_) => LayerType::Dense,
            Self::SimpleRnn(_) => LayerType::SimpleRnn,
            Self::Lstm(_) => LayerType::Lstm,
        }
    }
    pub fn activation(&self) -> ActivationType {
        match self {
            Self::Dense(l) => l.activation,
            Self::SimpleRnn(l) => l.activation,
            Self::Lstm(l) => l.activation,
        }
    }
    pub fn input_size(&self) -> usize {
        match self {
            Self::Dense(l) => l.kernel.nrows(),
            Self::SimpleRnn(l) => l.kernel.nrows(),
            Self::Lstm(l) => l.kernel.nrows(),
        }
    }
    pub fn output_size(&self) -> usize {
        match self {
            Self::Dense(l) => l.kernel.ncols(),
            Self::SimpleRnn(l) => l.units(),
            Self::Lstm(l) => l.units(),
        }
    }
    pub fn is_recurrent(&self) -> bool {
        !matches!(self, Self::Dense(_))
    }
    pub fn reset(&mut self) {
        match self {
            Self::Dense(_) => {}
            Self::SimpleRnn(l) => l.reset(),
            Self::Lstm(l) => l.reset(),
        }
    }
    pub fn forward(&mut self, x: &nd::Array1<f32>) -> nd::Array1<f32> {
        match self {
            Self::Dense(l) => l.forward(x),
            Self::SimpleRnn(l) => l.forward(x),
            Self::Lstm(l) => l.forward(x),
        }
    }
}
