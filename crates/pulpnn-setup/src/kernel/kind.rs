use core::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Kernel family to generate test cases for.
#[derive(
    Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum KernelType {
    /// Matrix multiplication on an im2col buffer.
    Matmul,
    /// Standard 2D convolution.
    Convolution,
    /// 1x1 convolution without padding.
    Pointwise,
    /// Convolution where each input channel maps to exactly one output channel.
    Depthwise,
    /// Fully-connected layer with a 32-bit accumulator output.
    #[default]
    LinearNoQuant,
    /// Fully-connected layer with a quantized output.
    LinearQuant,
    /// Max pooling.
    Maxpool,
    /// Average pooling.
    Avgpool,
}

impl KernelType {
    /// All kernel families, in declaration order.
    pub const ALL: [KernelType; 8] = [
        KernelType::Matmul,
        KernelType::Convolution,
        KernelType::Pointwise,
        KernelType::Depthwise,
        KernelType::LinearNoQuant,
        KernelType::LinearQuant,
        KernelType::Maxpool,
        KernelType::Avgpool,
    ];

    /// Name used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            KernelType::Matmul => "matmul",
            KernelType::Convolution => "convolution",
            KernelType::Pointwise => "pointwise",
            KernelType::Depthwise => "depthwise",
            KernelType::LinearNoQuant => "linear_no_quant",
            KernelType::LinearQuant => "linear_quant",
            KernelType::Maxpool => "maxpool",
            KernelType::Avgpool => "avgpool",
        }
    }

    /// Prefix of the C entry point of this family.
    pub fn entry_point_prefix(&self) -> &'static str {
        match self {
            KernelType::Matmul => "pulp_nn_matmul",
            KernelType::Convolution => "pulp_nn_conv",
            KernelType::Pointwise => "pulp_nn_pointwise",
            KernelType::Depthwise => "pulp_nn_depthwise",
            KernelType::LinearNoQuant | KernelType::LinearQuant => "pulp_nn_linear",
            KernelType::Maxpool => "pulp_nn_maxpool",
            KernelType::Avgpool => "pulp_nn_avgpool",
        }
    }

    /// Whether the family reads a weight tensor.
    pub fn uses_weights(&self) -> bool {
        !self.is_pooling()
    }

    /// Whether the family has its own output precision.
    ///
    /// `linear_no_quant` writes raw accumulators and pooling keeps the input precision.
    pub fn quantizes_output(&self) -> bool {
        !matches!(
            self,
            KernelType::LinearNoQuant | KernelType::Maxpool | KernelType::Avgpool
        )
    }

    /// Whether the family is a pooling layer.
    pub fn is_pooling(&self) -> bool {
        matches!(self, KernelType::Maxpool | KernelType::Avgpool)
    }

    /// Whether the family slides a window over the input with its own kernel size and padding.
    pub fn is_convolution(&self) -> bool {
        matches!(
            self,
            KernelType::Convolution | KernelType::Pointwise | KernelType::Depthwise
        )
    }

    /// Whether the family flattens its input into a feature vector.
    pub fn is_linear(&self) -> bool {
        matches!(self, KernelType::LinearNoQuant | KernelType::LinearQuant)
    }

    /// Whether the family needs an im2col scratch buffer.
    pub fn uses_im2col(&self) -> bool {
        self.is_convolution()
    }
}

impl Display for KernelType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KernelType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KernelType::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ConfigError::UnknownKernelType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for kind in KernelType::ALL {
            assert_eq!(kind.name().parse::<KernelType>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert_eq!(
            "conv2d".parse::<KernelType>(),
            Err(ConfigError::UnknownKernelType("conv2d".into()))
        );
    }

    #[test]
    fn linear_families_share_entry_point_prefix() {
        assert_eq!(
            KernelType::LinearQuant.entry_point_prefix(),
            KernelType::LinearNoQuant.entry_point_prefix()
        );
        assert!(!KernelType::LinearNoQuant.quantizes_output());
        assert!(KernelType::LinearQuant.quantizes_output());
    }
}
