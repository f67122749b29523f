//! Tensor descriptors and borrowed views into the shared arena.

use crate::error::{EdgeError, Result};
use strum::{Display, EnumString};

/// Element type of a tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DataType {
    Int8,
    UInt8,
    Int16,
    Float32,
}

impl DataType {
    /// Size of one element in bytes
    pub fn size(self) -> usize {
        match self {
            DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 => 2,
            DataType::Float32 => 4,
        }
    }

    pub fn is_signed(self) -> bool {
        !matches!(self, DataType::UInt8)
    }
}

/// Affine quantization: `real = scale * (q - zero_point)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantization {
    pub scale: f32,
    pub zero_point: i32,
}

/// Shape, element type and quantization of a single tensor
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSpec {
    pub shape: Vec<usize>,
    pub data_type: DataType,
    pub quantization: Option<Quantization>,
}

impl TensorSpec {
    pub fn new(shape: Vec<usize>, data_type: DataType) -> Self {
        Self {
            shape,
            data_type,
            quantization: None,
        }
    }

    pub fn quantized(mut self, scale: f32, zero_point: i32) -> Self {
        self.quantization = Some(Quantization { scale, zero_point });
        self
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn byte_len(&self) -> usize {
        self.element_count() * self.data_type.size()
    }

    /// Dimension `index` of the shape, or an error naming the missing axis
    pub fn dim(&self, index: usize) -> Result<usize> {
        self.shape.get(index).copied().ok_or_else(|| {
            EdgeError::InvalidInput(format!(
                "Tensor shape {:?} has no dimension {}",
                self.shape, index
            ))
        })
    }
}

/// Read-only view of a tensor resident in the arena
#[derive(Debug)]
pub struct TensorView<'a> {
    spec: &'a TensorSpec,
    data: &'a [u8],
}

impl<'a> TensorView<'a> {
    pub(crate) fn new(spec: &'a TensorSpec, data: &'a [u8]) -> Self {
        Self { spec, data }
    }

    pub fn spec(&self) -> &TensorSpec {
        self.spec
    }

    pub fn bytes(&self) -> &[u8] {
        self.data
    }

    /// Element values converted to real numbers (dequantized when the tensor
    /// carries quantization parameters)
    pub fn to_f32_vec(&self) -> Vec<f32> {
        let raw: Vec<f32> = match self.spec.data_type {
            DataType::Int8 => self.data.iter().map(|&b| b as i8 as f32).collect(),
            DataType::UInt8 => self.data.iter().map(|&b| b as f32).collect(),
            DataType::Int16 => self
                .data
                .chunks_exact(2)
                .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32)
                .collect(),
            DataType::Float32 => {
                return self
                    .data
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect();
            }
        };

        match self.spec.quantization {
            Some(q) => raw
                .into_iter()
                .map(|v| q.scale * (v - q.zero_point as f32))
                .collect(),
            None => raw,
        }
    }
}

/// Writable view of a tensor resident in the arena
#[derive(Debug)]
pub struct TensorViewMut<'a> {
    spec: &'a TensorSpec,
    data: &'a mut [u8],
}

impl<'a> TensorViewMut<'a> {
    pub(crate) fn new(spec: &'a TensorSpec, data: &'a mut [u8]) -> Self {
        Self { spec, data }
    }

    pub fn spec(&self) -> &TensorSpec {
        self.spec
    }

    pub fn bytes(&self) -> &[u8] {
        self.data
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.data
    }

    /// Write real values starting at element `offset`, quantizing them to the
    /// tensor's element type
    pub fn write_f32(&mut self, offset: usize, values: &[f32]) -> Result<()> {
        let count = self.spec.element_count();
        if offset + values.len() > count {
            return Err(EdgeError::InvalidInput(format!(
                "Writing {} values at element {} overflows tensor of {} elements",
                values.len(),
                offset,
                count
            )));
        }

        let quant = self.spec.quantization;
        let quantize = |v: f32, min: f32, max: f32| -> f32 {
            let q = match quant {
                Some(q) => (v / q.scale).round() + q.zero_point as f32,
                None => v.round(),
            };
            q.clamp(min, max)
        };

        match self.spec.data_type {
            DataType::Int8 => {
                for (i, &v) in values.iter().enumerate() {
                    self.data[offset + i] = quantize(v, i8::MIN as f32, i8::MAX as f32) as i8 as u8;
                }
            }
            DataType::UInt8 => {
                for (i, &v) in values.iter().enumerate() {
                    self.data[offset + i] = quantize(v, 0.0, u8::MAX as f32) as u8;
                }
            }
            DataType::Int16 => {
                for (i, &v) in values.iter().enumerate() {
                    let q = quantize(v, i16::MIN as f32, i16::MAX as f32) as i16;
                    let at = (offset + i) * 2;
                    self.data[at..at + 2].copy_from_slice(&q.to_le_bytes());
                }
            }
            DataType::Float32 => {
                for (i, &v) in values.iter().enumerate() {
                    let at = (offset + i) * 4;
                    self.data[at..at + 4].copy_from_slice(&v.to_le_bytes());
                }
            }
        }
        Ok(())
    }
}
