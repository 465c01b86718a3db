use core::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    ConfigError,
    config::{GlobalConfig, Logger, SetupConfig, TargetConfig},
    kernel::{KernelType, KernelVariant},
};

/// Shape of the layer exercised by a test case.
///
/// For pooling the window is the pooling window; for the other families it is the kernel.
#[derive(new, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerShape {
    /// Input width, height and channels.
    pub input: [u32; 3],
    /// Output width, height and channels.
    pub output: [u32; 3],
    /// Window width and height.
    pub window: [u32; 2],
    /// Horizontal and vertical stride.
    pub stride: [u32; 2],
}

impl LayerShape {
    /// Shape of the layer described by `setup`.
    pub fn from_setup(setup: &SetupConfig) -> Self {
        let (window, stride) = if setup.kernel_type.is_pooling() {
            (
                [setup.pool_kernel_size, setup.pool_kernel_size],
                [setup.pool_stride, setup.pool_stride],
            )
        } else {
            (
                [setup.kernel_dim_x, setup.kernel_dim_y],
                [setup.stride_x, setup.stride_y],
            )
        };

        Self::new(
            [setup.input_dim_x, setup.input_dim_y, setup.input_channels],
            [setup.output_dim_x, setup.output_dim_y, setup.output_channels],
            window,
            stride,
        )
    }
}

/// Size in bytes of every buffer a test case allocates.
///
/// Sub-byte values are packed and rounded up to the next byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryFootprint {
    /// Input activations.
    pub input: u64,
    /// Weights.
    pub weights: u64,
    /// Output activations, or 32-bit accumulators for `linear_no_quant`.
    pub output: u64,
    /// 8-bit bias, one per output channel.
    pub bias: u64,
    /// 64-bit `k` and `lambda` batch-norm parameters, one pair per output channel.
    pub batchnorm: u64,
    /// Per-core im2col scratch buffers.
    pub im2col: u64,
}

impl MemoryFootprint {
    /// Buffers needed to run `variant` on the layer described by `setup`.
    ///
    /// Fails with [ConfigError::FootprintTooLarge] when a buffer size doesn't fit in a `u64`.
    pub fn compute(
        variant: &KernelVariant,
        setup: &SetupConfig,
        target: &TargetConfig,
    ) -> Result<Self, ConfigError> {
        let overflow = || ConfigError::FootprintTooLarge(variant.entry_point());
        let kernel = variant.kernel;
        let ch_in = setup.input_channels as u64;
        let ch_out = setup.output_channels as u64;
        let window = setup.kernel_dim_x as u64 * setup.kernel_dim_y as u64;
        let output_pixels = setup.output_dim_x as u64 * setup.output_dim_y as u64;
        let features = setup.input_features().ok_or_else(overflow)?;

        let input = variant.input.packed_bytes(features);

        let weight_count = match kernel {
            KernelType::Matmul | KernelType::Convolution | KernelType::Pointwise => {
                ch_out.checked_mul(ch_in).and_then(|n| n.checked_mul(window))
            }
            KernelType::Depthwise => ch_out.checked_mul(window),
            KernelType::LinearNoQuant | KernelType::LinearQuant => ch_out.checked_mul(features),
            KernelType::Maxpool | KernelType::Avgpool => Some(0),
        }
        .ok_or_else(overflow)?;
        let weights = variant
            .weight
            .map(|precision| precision.packed_bytes(weight_count))
            .unwrap_or(0);

        let output = match (kernel, variant.output) {
            (KernelType::LinearNoQuant, _) => ch_out * 4,
            (KernelType::LinearQuant, Some(precision)) => precision.packed_bytes(ch_out),
            (_, Some(precision)) => {
                let count = output_pixels.checked_mul(ch_out).ok_or_else(overflow)?;
                precision.packed_bytes(count)
            }
            (_, None) => ch_out * 4,
        };

        let bias = if setup.use_bias && kernel.uses_weights() {
            ch_out
        } else {
            0
        };
        let batchnorm = if setup.use_batchnorm && kernel.quantizes_output() {
            2 * ch_out * 8
        } else {
            0
        };
        let im2col = if kernel.uses_im2col() {
            (2 * target.num_cores as u64)
                .checked_mul(ch_in)
                .and_then(|n| n.checked_mul(window))
                .ok_or_else(overflow)?
        } else {
            0
        };

        let footprint = Self {
            input,
            weights,
            output,
            bias,
            batchnorm,
            im2col,
        };
        footprint.checked_total().ok_or_else(overflow)?;
        Ok(footprint)
    }

    /// Sum of every buffer, `None` on overflow.
    pub fn checked_total(&self) -> Option<u64> {
        [self.weights, self.output, self.bias, self.batchnorm, self.im2col]
            .into_iter()
            .try_fold(self.input, u64::checked_add)
    }

    /// Sum of every buffer, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.checked_total().unwrap_or(u64::MAX)
    }
}

/// A single kernel variant to generate, with its layer and buffers.
#[derive(new, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Kernel to generate.
    pub variant: KernelVariant,
    /// Layer exercised by the test.
    pub shape: LayerShape,
    /// Buffers the test allocates.
    pub footprint: MemoryFootprint,
}

impl Display for TestCase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let [in_x, in_y, in_c] = self.shape.input;
        let [out_x, out_y, out_c] = self.shape.output;
        write!(
            f,
            "{} {in_x}x{in_y}x{in_c} -> {out_x}x{out_y}x{out_c} ({} bytes)",
            self.variant,
            self.footprint.total()
        )
    }
}

/// Test cases generated by a run, in generation order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationPlan {
    /// Kernel family of every case.
    pub kernel: KernelType,
    /// Test cases.
    pub cases: Vec<TestCase>,
}

impl GenerationPlan {
    /// Plans the run described by `config`, reporting through the loggers it configures.
    pub fn new(config: &GlobalConfig) -> Result<Self, ConfigError> {
        let mut logger = Logger::from_config(config);
        Self::with_logger(config, &mut logger)
    }

    /// Plans the run described by `config`, reporting through `logger`.
    ///
    /// In all-kernels mode, variants whose packing doesn't fit the configured channel counts are
    /// skipped.
    pub fn with_logger(config: &GlobalConfig, logger: &mut Logger) -> Result<Self, ConfigError> {
        config.validate()?;

        let setup = &config.setup;
        let shape = LayerShape::from_setup(setup);
        let mut cases = Vec::new();

        for variant in setup.variants() {
            if let Err(err) = variant.check_channels(setup) {
                log::debug!("Skipping {variant}: {err}");
                logger.log_full(&format!("skipped {variant}: {err}"));
                continue;
            }

            let footprint = MemoryFootprint::compute(&variant, setup, &config.target)?;
            let case = TestCase::new(variant, shape, footprint);
            logger.log_basic(&case);
            logger.log_full(&format!("  {footprint:?}"));
            cases.push(case);
        }

        Ok(Self {
            kernel: setup.kernel_type,
            cases,
        })
    }

    /// Entry points of every planned case.
    pub fn entry_points(&self) -> Vec<String> {
        self.cases
            .iter()
            .map(|case| case.variant.entry_point())
            .collect()
    }

    /// Largest footprint among the planned cases, in bytes.
    pub fn peak_footprint(&self) -> u64 {
        self.cases
            .iter()
            .map(|case| case.footprint.total())
            .max()
            .unwrap_or(0)
    }
}
