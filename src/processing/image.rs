use crate::error::{EdgeError, Result};
use crate::models::{DataType, TensorViewMut};
use crate::processing::ImagePreProcess;

/// Copies RGB888 frames into the image model input, shifting pixels into
/// the int8 range when the model takes signed input.
#[derive(Debug, Default)]
pub struct ImagePreProcessor;

impl ImagePreProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl ImagePreProcess for ImagePreProcessor {
    fn process(&mut self, frame: &[u8], input: &mut TensorViewMut<'_>) -> Result<()> {
        let data_type = input.spec().data_type;
        if !matches!(data_type, DataType::Int8 | DataType::UInt8) {
            return Err(EdgeError::InvalidInput(format!(
                "Image input must be 8-bit, model takes {}",
                data_type
            )));
        }

        let bytes = input.bytes_mut();
        let len = bytes.len().min(frame.len());
        if len < bytes.len() {
            log::debug!("Frame of {} bytes fills {} of {} input bytes", frame.len(), len, bytes.len());
        }

        let dst = &mut bytes[..len];
        dst.copy_from_slice(&frame[..len]);
        if data_type.is_signed() {
            for b in dst.iter_mut() {
                *b = (*b as i16 - 128) as i8 as u8;
            }
        }
        Ok(())
    }
}
