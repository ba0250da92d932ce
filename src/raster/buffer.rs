// src/raster/buffer.rs

/// Storage type of a band's pixel values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    UInt16,
    Float32,
    Float64,
}

/// Pixel storage for a single band, row-major
#[derive(Debug, Clone, PartialEq)]
pub enum TypedBuffer {
    U16(Vec<u16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl TypedBuffer {
    pub fn len(&self) -> usize {
        match self {
            TypedBuffer::U16(data) => data.len(),
            TypedBuffer::F32(data) => data.len(),
            TypedBuffer::F64(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pixel_type(&self) -> PixelType {
        match self {
            TypedBuffer::U16(_) => PixelType::UInt16,
            TypedBuffer::F32(_) => PixelType::Float32,
            TypedBuffer::F64(_) => PixelType::Float64,
        }
    }

    /// Value at `index` widened to f64
    pub fn get(&self, index: usize) -> f64 {
        match self {
            TypedBuffer::U16(data) => f64::from(data[index]),
            TypedBuffer::F32(data) => f64::from(data[index]),
            TypedBuffer::F64(data) => data[index],
        }
    }

    /// Upcast the whole buffer to f64 before any arithmetic
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            TypedBuffer::U16(data) => data.iter().map(|&v| f64::from(v)).collect(),
            TypedBuffer::F32(data) => data.iter().map(|&v| f64::from(v)).collect(),
            TypedBuffer::F64(data) => data.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upcast_keeps_values() {
        let buffer = TypedBuffer::U16(vec![0, 10000, u16::MAX]);
        assert_eq!(buffer.to_f64(), vec![0.0, 10000.0, 65535.0]);
        assert_eq!(buffer.pixel_type(), PixelType::UInt16);
        assert_eq!(buffer.get(1), 10000.0);
        assert_eq!(TypedBuffer::F64(vec![0.5]).pixel_type(), PixelType::Float64);
    }
}
