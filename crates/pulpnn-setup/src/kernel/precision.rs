use core::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Bit width of activations or weights.
///
/// Serialized as the plain number of bits (`8`, `4` or `2`).
#[derive(
    Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub enum Precision {
    /// 2-bit values, four per byte.
    Int2,
    /// 4-bit values, two per byte.
    Int4,
    /// 8-bit values.
    #[default]
    Int8,
}

impl Precision {
    /// Supported precisions, widest first.
    pub const ALL: [Precision; 3] = [Precision::Int8, Precision::Int4, Precision::Int2];

    /// Returns the size of a value in bits.
    pub fn bits(&self) -> u32 {
        match self {
            Precision::Int8 => 8,
            Precision::Int4 => 4,
            Precision::Int2 => 2,
        }
    }

    /// Returns the number of values packed in a single byte.
    pub fn values_per_byte(&self) -> u32 {
        8 / self.bits()
    }

    /// Channel counts packed at this precision must be a multiple of this value.
    pub fn channel_multiple(&self) -> u32 {
        self.values_per_byte()
    }

    /// Number of bytes needed to store `count` packed values, rounded up.
    pub fn packed_bytes(&self, count: u64) -> u64 {
        count.div_ceil(self.values_per_byte() as u64)
    }
}

impl TryFrom<u32> for Precision {
    type Error = ConfigError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            8 => Ok(Precision::Int8),
            4 => Ok(Precision::Int4),
            2 => Ok(Precision::Int2),
            other => Err(ConfigError::UnknownPrecision(other)),
        }
    }
}

impl From<Precision> for u32 {
    fn from(precision: Precision) -> Self {
        precision.bits()
    }
}

impl Display for Precision {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "INT{}", self.bits())
    }
}

impl FromStr for Precision {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits = s
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidPrecision(s.to_string()))?;
        Precision::try_from(bits)
    }
}

/// Method used to requantize accumulators into output activations.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantizationMethod {
    /// Arithmetic shift followed by a clip to the output range.
    #[default]
    ShiftClip,
}

impl QuantizationMethod {
    /// Name used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            QuantizationMethod::ShiftClip => "shift_clip",
        }
    }
}

impl Display for QuantizationMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QuantizationMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shift_clip" => Ok(QuantizationMethod::ShiftClip),
            other => Err(ConfigError::UnknownQuantizationMethod(other.to_string())),
        }
    }
}
