use crate::common::{
    errors::{MocapError, Result},
    types::{ActivationType, LayerType},
};
use log::{info, warn};
use mocap_utils::io::FileLoader;
use ndarray as nd;
use num_traits::FromPrimitive;
use std::{
    fs::File,
    io::{BufWriter, ErrorKind, Read, Write},
    path::Path,
};

// Layout of a model file, all little endian:
// i32 layer count
// per layer: i32 layer tag, i32 activation tag, tensors
// per tensor: one i32 per dimension, then the f32 values in row-major order
// Dense layers hold [kernel(2d), bias(1d)], SimpleRNN and LSTM layers hold
// [kernel(2d), recurrent kernel(2d), bias(1d)].

/// Largest tensor accepted, guards against allocating on garbage input
pub const MAX_TENSOR_ELEMENTS: usize = 1 << 26;

/// One layer as stored in the file
#[derive(Clone, Debug, PartialEq)]
pub struct LayerCodec {
    pub layer_type: LayerType,
    pub activation: ActivationType,
    pub tensors: Vec<nd::ArrayD<f32>>,
}

/// The contents of a serialized model, before any shape validation
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelCodec {
    pub layers: Vec<LayerCodec>,
}

/// Dimensionality of every tensor a layer of this type carries
pub fn tensor_ranks(layer_type: LayerType) -> &'static [usize] {
    match layer_type {
        LayerType::Dense | LayerType::TimeDistributedDense => &[2, 1],
        LayerType::SimpleRnn | LayerType::Lstm => &[2, 2, 1],
    }
}

fn truncated(e: std::io::Error) -> MocapError {
    if e.kind() == ErrorKind::UnexpectedEof {
        MocapError::ModelFormat("unexpected end of model data".to_string())
    } else {
        MocapError::Io(e)
    }
}

fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).map_err(truncated)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_tensor<R: Read>(reader: &mut R, rank: usize) -> Result<nd::ArrayD<f32>> {
    let mut shape = Vec::with_capacity(rank);
    for _ in 0..rank {
        let dim = read_i32(reader)?;
        let dim = usize::try_from(dim)
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| MocapError::ModelFormat(format!("invalid tensor dimension {dim}")))?;
        shape.push(dim);
    }
    let len = shape
        .iter()
        .try_fold(1usize, |acc, d| acc.checked_mul(*d))
        .filter(|n| *n <= MAX_TENSOR_ELEMENTS)
        .ok_or_else(|| MocapError::ModelFormat(format!("tensor of shape {shape:?} is too large")))?;
    let mut bytes = vec![0u8; len * 4];
    reader.read_exact(&mut bytes).map_err(truncated)?;
    let values: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    nd::ArrayD::from_shape_vec(nd::IxDyn(&shape), values).map_err(|e| MocapError::ModelFormat(e.to_string()))
}

fn write_i32<W: Write>(writer: &mut W, value: i32) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_tensor<W: Write>(writer: &mut W, tensor: &nd::ArrayD<f32>) -> Result<()> {
    for &dim in tensor.shape() {
        let dim = i32::try_from(dim).map_err(|_| MocapError::ModelFormat(format!("dimension {dim} does not fit the format")))?;
        write_i32(writer, dim)?;
    }
    // iter() walks in logical row-major order whatever the memory layout
    for v in tensor.iter() {
        writer.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}

impl ModelCodec {
    /// # Errors
    /// Fails with ``ModelFormat`` on unknown tags, bad dimensions or
    /// truncated input
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let nr_layers = read_i32(reader)?;
        let nr_layers =
            usize::try_from(nr_layers).map_err(|_| MocapError::ModelFormat(format!("negative layer count {nr_layers}")))?;
        let mut layers = Vec::new();
        for idx in 0..nr_layers {
            let tag = read_i32(reader)?;
            let layer_type =
                LayerType::from_i32(tag).ok_or_else(|| MocapError::ModelFormat(format!("layer {idx}: unknown layer type {tag}")))?;
            let tag = read_i32(reader)?;
            let activation = ActivationType::from_i32(tag)
                .ok_or_else(|| MocapError::ModelFormat(format!("layer {idx}: unknown activation {tag}")))?;
            let tensors = tensor_ranks(layer_type)
                .iter()
                .map(|&rank| read_tensor(reader, rank))
                .collect::<Result<Vec<_>>>()?;
            layers.push(LayerCodec {
                layer_type,
                activation,
                tensors,
            });
        }
        let mut rest = [0u8; 1];
        if matches!(reader.read(&mut rest), Ok(n) if n > 0) {
            warn!("model data has trailing bytes after {nr_layers} layers, ignoring them");
        }
        Ok(Self { layers })
    }
    /// # Errors
    /// See [`ModelCodec::from_reader`]
    pub fn from_buf(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        Self::from_reader(&mut cursor)
    }
    /// # Errors
    /// Fails if the file cannot be opened, or as [`ModelCodec::from_reader`]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = FileLoader::open(path)?;
        let codec = Self::from_reader(&mut reader)?;
        info!("loaded model with {} layers from {}", codec.layers.len(), path.display());
        Ok(codec)
    }
    /// # Errors
    /// Fails if the writer fails or a tensor does not match its layer type
    pub fn to_writer<W: Write>(&self, writer: &mut W) -> Result<()> {
        let nr_layers =
            i32::try_from(self.layers.len()).map_err(|_| MocapError::ModelFormat("too many layers".to_string()))?;
        write_i32(writer, nr_layers)?;
        for layer in &self.layers {
            let ranks = tensor_ranks(layer.layer_type);
            let ranks_ok = ranks.len() == layer.tensors.len() && ranks.iter().zip(&layer.tensors).all(|(r, t)| *r == t.ndim());
            if !ranks_ok {
                return Err(MocapError::ModelFormat(format!("{} layer has tensors of the wrong rank", layer.layer_type)));
            }
            write_i32(writer, layer.layer_type as i32)?;
            write_i32(writer, layer.activation as i32)?;
            for tensor in &layer.tensors {
                write_tensor(writer, tensor)?;
            }
        }
        Ok(())
    }
    /// # Errors
    /// See [`ModelCodec::to_writer`]
    pub fn to_buf(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.to_writer(&mut buf)?;
        Ok(buf)
    }
    /// # Errors
    /// Fails if the file cannot be created, or as [`ModelCodec::to_writer`]
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        info!("saved model with {} layers to {}", self.layers.len(), path.as_ref().display());
        Ok(())
    }
}
