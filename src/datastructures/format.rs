//! Element format descriptors.
//!
//! A [`DataFormat`] is the pair (element type, channel count). One descriptor
//! carried at runtime covers every buffer/layer/volume format, instead of a
//! dedicated container type per format.

use crate::datastructures::error::{DataError, DataResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar element type of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    UInt8,
    UInt16,
    UInt32,
    Int32,
    Float32,
    Float64,
}

impl ElementType {
    /// Size of a single scalar in bytes.
    pub const fn size_in_bytes(self) -> usize {
        match self {
            ElementType::UInt8 => 1,
            ElementType::UInt16 => 2,
            ElementType::UInt32 | ElementType::Int32 | ElementType::Float32 => 4,
            ElementType::Float64 => 8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ElementType::UInt8 => "UINT8",
            ElementType::UInt16 => "UINT16",
            ElementType::UInt32 => "UINT32",
            ElementType::Int32 => "INT32",
            ElementType::Float32 => "FLOAT32",
            ElementType::Float64 => "FLOAT64",
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, ElementType::Float32 | ElementType::Float64)
    }
}

/// Element type plus channel count (1..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDataFormat")]
pub struct DataFormat {
    pub element: ElementType,
    pub channels: u8,
}

impl DataFormat {
    pub const FLOAT32: DataFormat = DataFormat::new(ElementType::Float32, 1);
    pub const VEC2_FLOAT32: DataFormat = DataFormat::new(ElementType::Float32, 2);
    pub const VEC3_FLOAT32: DataFormat = DataFormat::new(ElementType::Float32, 3);
    pub const VEC4_FLOAT32: DataFormat = DataFormat::new(ElementType::Float32, 4);
    pub const UINT32: DataFormat = DataFormat::new(ElementType::UInt32, 1);
    pub const VEC4_UINT8: DataFormat = DataFormat::new(ElementType::UInt8, 4);

    pub const MAX_CHANNELS: u8 = 4;

    pub const fn new(element: ElementType, channels: u8) -> Self {
        debug_assert!(channels >= 1 && channels <= Self::MAX_CHANNELS);
        Self { element, channels }
    }

    /// Checked constructor for channel counts coming from user input.
    pub fn try_new(element: ElementType, channels: u8) -> DataResult<Self> {
        let format = Self { element, channels };
        format.validate()?;
        Ok(format)
    }

    /// The fields are public, so containers re-check the channel count.
    pub fn validate(&self) -> DataResult<()> {
        if (1..=Self::MAX_CHANNELS).contains(&self.channels) {
            Ok(())
        } else {
            Err(DataError::InvalidChannels(self.channels))
        }
    }

    /// Size of one element (all channels) in bytes.
    pub const fn size_in_bytes(&self) -> usize {
        self.element.size_in_bytes() * self.channels as usize
    }

    /// Format name, e.g. `FLOAT32` or `Vec3FLOAT32`.
    pub fn name(&self) -> String {
        if self.channels == 1 {
            self.element.name().to_string()
        } else {
            format!("Vec{}{}", self.channels, self.element.name())
        }
    }
}

#[derive(Deserialize)]
struct RawDataFormat {
    element: ElementType,
    channels: u8,
}

impl TryFrom<RawDataFormat> for DataFormat {
    type Error = DataError;

    fn try_from(raw: RawDataFormat) -> DataResult<Self> {
        DataFormat::try_new(raw.element, raw.channels)
    }
}

impl Default for DataFormat {
    fn default() -> Self {
        Self::FLOAT32
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
