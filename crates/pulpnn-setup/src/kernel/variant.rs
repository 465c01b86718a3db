use core::fmt::Display;

use serde::{Deserialize, Serialize};

use super::{KernelType, Precision};
use crate::{ConfigError, config::SetupConfig};

/// One concrete kernel to generate: a family and the precision of each tensor it touches.
///
/// Roles a family doesn't use are normalized: pooling has no weights and writes at the input
/// precision, `linear_no_quant` writes 32-bit accumulators and has no output precision.
#[derive(new, Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelVariant {
    /// Kernel family.
    pub kernel: KernelType,
    /// Input activations precision.
    pub input: Precision,
    /// Weights precision, `None` for pooling.
    pub weight: Option<Precision>,
    /// Output activations precision, `None` when the output is not quantized.
    pub output: Option<Precision>,
}

impl KernelVariant {
    /// Builds the variant of `kernel` for the given precisions, dropping the roles the family
    /// doesn't use.
    pub fn normalized(
        kernel: KernelType,
        input: Precision,
        weight: Precision,
        output: Precision,
    ) -> Self {
        let weight = kernel.uses_weights().then_some(weight);
        let output = if kernel.is_pooling() {
            Some(input)
        } else {
            kernel.quantizes_output().then_some(output)
        };

        Self::new(kernel, input, weight, output)
    }

    /// Every variant of `kernel`, widest precisions first.
    ///
    /// Input is the outermost axis, then output, then weights.
    pub fn all(kernel: KernelType) -> Vec<Self> {
        let outputs: &[Option<Precision>] = if kernel.quantizes_output() {
            &[
                Some(Precision::Int8),
                Some(Precision::Int4),
                Some(Precision::Int2),
            ]
        } else {
            &[None]
        };
        let weights: &[Option<Precision>] = if kernel.uses_weights() {
            &[
                Some(Precision::Int8),
                Some(Precision::Int4),
                Some(Precision::Int2),
            ]
        } else {
            &[None]
        };

        let mut variants = Vec::with_capacity(Precision::ALL.len() * outputs.len() * weights.len());
        for input in Precision::ALL {
            for output in outputs {
                for weight in weights {
                    let output = if kernel.is_pooling() {
                        Some(input)
                    } else {
                        *output
                    };
                    variants.push(Self::new(kernel, input, *weight, output));
                }
            }
        }
        variants
    }

    /// Lowest precision between input activations and weights.
    ///
    /// Input channels are packed at this precision.
    pub fn lowest_input_precision(&self) -> Precision {
        match self.weight {
            Some(weight) => self.input.min(weight),
            None => self.input,
        }
    }

    /// Name of the C entry point implementing this variant.
    pub fn entry_point(&self) -> String {
        let prefix = self.kernel.entry_point_prefix();
        let input = self.input.bits();

        match (self.kernel, self.weight, self.output) {
            (kernel, _, _) if kernel.is_pooling() => format!("{prefix}_u{input}"),
            (KernelType::LinearNoQuant, Some(weight), _) => {
                format!("{prefix}_u{input}_i32_i{}", weight.bits())
            }
            (_, Some(weight), Some(output)) => {
                format!("{prefix}_u{input}_u{}_i{}", output.bits(), weight.bits())
            }
            // Only reachable through hand-built variants missing a role.
            (_, weight, output) => {
                let mut name = format!("{prefix}_u{input}");
                if let Some(output) = output {
                    name += &format!("_u{}", output.bits());
                }
                if let Some(weight) = weight {
                    name += &format!("_i{}", weight.bits());
                }
                name
            }
        }
    }

    /// Checks that the channel counts of `setup` can be packed at this variant's precisions.
    pub fn check_channels(&self, setup: &SetupConfig) -> Result<(), ConfigError> {
        let precision = self.lowest_input_precision();
        let multiple = precision.channel_multiple();
        if !setup.input_channels.is_multiple_of(multiple) {
            return Err(ConfigError::InputChannelsNotAligned {
                input_channels: setup.input_channels,
                precision,
                multiple,
            });
        }

        if self.kernel.quantizes_output()
            && let Some(precision) = self.output
        {
            let multiple = precision.channel_multiple();
            if !setup.output_channels.is_multiple_of(multiple) {
                return Err(ConfigError::OutputChannelsNotAligned {
                    output_channels: setup.output_channels,
                    precision,
                    multiple,
                });
            }
        }

        Ok(())
    }
}

impl Display for KernelVariant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.entry_point())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_point_names() {
        let conv = KernelVariant::normalized(
            KernelType::Convolution,
            Precision::Int8,
            Precision::Int8,
            Precision::Int2,
        );
        assert_eq!(conv.entry_point(), "pulp_nn_conv_u8_u2_i8");

        let linear = KernelVariant::normalized(
            KernelType::LinearNoQuant,
            Precision::Int4,
            Precision::Int2,
            Precision::Int8,
        );
        assert_eq!(linear.entry_point(), "pulp_nn_linear_u4_i32_i2");

        let pool = KernelVariant::normalized(
            KernelType::Avgpool,
            Precision::Int4,
            Precision::Int8,
            Precision::Int2,
        );
        assert_eq!(pool.entry_point(), "pulp_nn_avgpool_u4");
        assert_eq!(pool.output, Some(Precision::Int4));
        assert_eq!(pool.weight, None);
    }

    #[test]
    fn variant_counts_per_family() {
        assert_eq!(KernelVariant::all(KernelType::Convolution).len(), 27);
        assert_eq!(KernelVariant::all(KernelType::LinearQuant).len(), 27);
        assert_eq!(KernelVariant::all(KernelType::LinearNoQuant).len(), 9);
        assert_eq!(KernelVariant::all(KernelType::Maxpool).len(), 3);
    }

    #[test]
    fn enumeration_starts_with_widest_precisions() {
        let variants = KernelVariant::all(KernelType::Depthwise);
        assert_eq!(variants[0].entry_point(), "pulp_nn_depthwise_u8_u8_i8");
        assert_eq!(variants[1].entry_point(), "pulp_nn_depthwise_u8_u8_i4");
        assert_eq!(variants[26].entry_point(), "pulp_nn_depthwise_u2_u2_i2");
    }

    #[test]
    fn channel_alignment_uses_lowest_input_precision() {
        let setup = SetupConfig {
            input_channels: 6,
            output_channels: 6,
            ..Default::default()
        };
        let int4 = KernelVariant::normalized(
            KernelType::Matmul,
            Precision::Int8,
            Precision::Int4,
            Precision::Int8,
        );
        assert_eq!(int4.check_channels(&setup), Ok(()));

        let int2 = KernelVariant::normalized(
            KernelType::Matmul,
            Precision::Int2,
            Precision::Int8,
            Precision::Int8,
        );
        assert_eq!(
            int2.check_channels(&setup),
            Err(ConfigError::InputChannelsNotAligned {
                input_channels: 6,
                precision: Precision::Int2,
                multiple: 4,
            })
        );
    }

    #[test]
    fn output_alignment_ignored_without_quantized_output() {
        let setup = SetupConfig {
            input_channels: 16,
            output_channels: 3,
            ..Default::default()
        };
        let linear = KernelVariant::normalized(
            KernelType::LinearNoQuant,
            Precision::Int8,
            Precision::Int8,
            Precision::Int2,
        );
        assert_eq!(linear.check_channels(&setup), Ok(()));

        let quant = KernelVariant::normalized(
            KernelType::LinearQuant,
            Precision::Int8,
            Precision::Int8,
            Precision::Int2,
        );
        assert!(matches!(
            quant.check_channels(&setup),
            Err(ConfigError::OutputChannelsNotAligned { multiple: 4, .. })
        ));
    }
}
