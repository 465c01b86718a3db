use serde::{Deserialize, Serialize};

use crate::{
    Axis, ConfigError,
    kernel::{KernelType, KernelVariant, Precision, QuantizationMethod},
};

/// Largest value accepted for a dimension, channel count, padding or stride.
///
/// The kernels take their layer parameters as `uint16_t`.
pub const MAX_DIMENSION: u32 = u16::MAX as u32;

/// Parameters of a test-case generation run.
///
/// The record is built once at the start of a run and only read afterwards. Every field has a
/// default, so configuration files only need to list what they change.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    /// Generate only the selected variant instead of every variant of the family.
    pub single_kernel_mode: bool,
    /// Kernel family.
    pub kernel_type: KernelType,
    /// Input activations precision, single-kernel mode only.
    pub input_precision: Precision,
    /// Weights precision, single-kernel mode only.
    pub weight_precision: Precision,
    /// Output activations precision, single-kernel mode only.
    pub output_precision: Precision,
    /// Requantization method, `linear_quant` only.
    pub quantization_method: QuantizationMethod,

    /// Input width.
    pub input_dim_x: u32,
    /// Input height.
    pub input_dim_y: u32,
    /// Input channels.
    pub input_channels: u32,
    /// Output width.
    pub output_dim_x: u32,
    /// Output height.
    pub output_dim_y: u32,
    /// Output channels.
    pub output_channels: u32,

    /// Kernel width, 1 for pointwise.
    pub kernel_dim_x: u32,
    /// Kernel height, 1 for pointwise.
    pub kernel_dim_y: u32,
    /// Padding above the input, 0 for pointwise.
    pub padding_top: u32,
    /// Padding below the input, 0 for pointwise.
    pub padding_bottom: u32,
    /// Padding left of the input, 0 for pointwise.
    pub padding_left: u32,
    /// Padding right of the input, 0 for pointwise.
    pub padding_right: u32,
    /// Horizontal stride.
    pub stride_x: u32,
    /// Vertical stride.
    pub stride_y: u32,

    /// Add a bias to the accumulators.
    pub use_bias: bool,
    /// Apply batch-norm before requantization.
    pub use_batchnorm: bool,
    /// Apply a ReLU before requantization.
    pub use_relu: bool,

    /// Pooling window, pooling only.
    pub pool_kernel_size: u32,
    /// Pooling stride, pooling only.
    pub pool_stride: u32,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            single_kernel_mode: false,
            kernel_type: KernelType::LinearNoQuant,
            input_precision: Precision::Int8,
            weight_precision: Precision::Int8,
            output_precision: Precision::Int8,
            quantization_method: QuantizationMethod::ShiftClip,
            input_dim_x: 8,
            input_dim_y: 8,
            input_channels: 16,
            output_dim_x: 8,
            output_dim_y: 8,
            output_channels: 16,
            kernel_dim_x: 1,
            kernel_dim_y: 1,
            padding_top: 0,
            padding_bottom: 0,
            padding_left: 0,
            padding_right: 0,
            stride_x: 1,
            stride_y: 1,
            use_bias: false,
            use_batchnorm: false,
            use_relu: false,
            pool_kernel_size: 2,
            pool_stride: 2,
        }
    }
}

impl SetupConfig {
    /// Set the generation mode.
    pub fn with_single_kernel(mut self, single_kernel_mode: bool) -> Self {
        self.single_kernel_mode = single_kernel_mode;
        self
    }

    /// Set the kernel family.
    pub fn with_kernel_type(mut self, kernel_type: KernelType) -> Self {
        self.kernel_type = kernel_type;
        self
    }

    /// Set the input, weight and output precisions.
    pub fn with_precisions(
        mut self,
        input: Precision,
        weight: Precision,
        output: Precision,
    ) -> Self {
        self.input_precision = input;
        self.weight_precision = weight;
        self.output_precision = output;
        self
    }

    /// Set the requantization method.
    pub fn with_quantization_method(mut self, method: QuantizationMethod) -> Self {
        self.quantization_method = method;
        self
    }

    /// Set the input shape.
    pub fn with_input_shape(mut self, dim_x: u32, dim_y: u32, channels: u32) -> Self {
        self.input_dim_x = dim_x;
        self.input_dim_y = dim_y;
        self.input_channels = channels;
        self
    }

    /// Set the output shape.
    pub fn with_output_shape(mut self, dim_x: u32, dim_y: u32, channels: u32) -> Self {
        self.output_dim_x = dim_x;
        self.output_dim_y = dim_y;
        self.output_channels = channels;
        self
    }

    /// Set the kernel window.
    pub fn with_kernel_size(mut self, dim_x: u32, dim_y: u32) -> Self {
        self.kernel_dim_x = dim_x;
        self.kernel_dim_y = dim_y;
        self
    }

    /// Set the padding around the input.
    pub fn with_padding(mut self, top: u32, bottom: u32, left: u32, right: u32) -> Self {
        self.padding_top = top;
        self.padding_bottom = bottom;
        self.padding_left = left;
        self.padding_right = right;
        self
    }

    /// Set the strides.
    pub fn with_stride(mut self, stride_x: u32, stride_y: u32) -> Self {
        self.stride_x = stride_x;
        self.stride_y = stride_y;
        self
    }

    /// Enable or disable the bias.
    pub fn with_bias(mut self, use_bias: bool) -> Self {
        self.use_bias = use_bias;
        self
    }

    /// Enable or disable batch-norm.
    pub fn with_batchnorm(mut self, use_batchnorm: bool) -> Self {
        self.use_batchnorm = use_batchnorm;
        self
    }

    /// Enable or disable the ReLU.
    pub fn with_relu(mut self, use_relu: bool) -> Self {
        self.use_relu = use_relu;
        self
    }

    /// Set the pooling window and stride.
    pub fn with_pooling(mut self, kernel_size: u32, stride: u32) -> Self {
        self.pool_kernel_size = kernel_size;
        self.pool_stride = stride;
        self
    }

    /// Validates the setup and returns it, logging non-fatal findings.
    pub fn build(self) -> Result<Self, ConfigError> {
        self.validate()?;
        self.log_warnings();
        Ok(self)
    }

    /// The variant selected by the precision fields.
    ///
    /// Only meaningful in single-kernel mode.
    pub fn selected_variant(&self) -> KernelVariant {
        KernelVariant::normalized(
            self.kernel_type,
            self.input_precision,
            self.weight_precision,
            self.output_precision,
        )
    }

    /// Variants generated by this setup.
    pub fn variants(&self) -> Vec<KernelVariant> {
        if self.single_kernel_mode {
            vec![self.selected_variant()]
        } else {
            KernelVariant::all(self.kernel_type)
        }
    }

    /// Number of input features of a fully-connected layer, `None` on overflow.
    pub fn input_features(&self) -> Option<u64> {
        (self.input_dim_x as u64)
            .checked_mul(self.input_dim_y as u64)?
            .checked_mul(self.input_channels as u64)
    }

    /// Checks every constraint of the kernel library, returning the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check_ranges()?;

        match self.kernel_type {
            KernelType::Depthwise if self.input_channels != self.output_channels => {
                return Err(ConfigError::DepthwiseChannelMismatch {
                    input_channels: self.input_channels,
                    output_channels: self.output_channels,
                });
            }
            KernelType::Pointwise => {
                if self.kernel_dim_x != 1 || self.kernel_dim_y != 1 {
                    return Err(ConfigError::PointwiseKernelSize {
                        kernel_dim_x: self.kernel_dim_x,
                        kernel_dim_y: self.kernel_dim_y,
                    });
                }
                if self.padding_top != 0
                    || self.padding_bottom != 0
                    || self.padding_left != 0
                    || self.padding_right != 0
                {
                    return Err(ConfigError::PointwisePadding {
                        top: self.padding_top,
                        bottom: self.padding_bottom,
                        left: self.padding_left,
                        right: self.padding_right,
                    });
                }
            }
            _ => {}
        }

        if self.single_kernel_mode {
            self.selected_variant().check_channels(self)?;
        }

        if self.kernel_type.is_convolution() {
            self.check_window(
                self.kernel_dim_x,
                self.kernel_dim_y,
                self.stride_x,
                self.stride_y,
            )?;
        }

        if self.kernel_type.is_pooling() {
            if self.input_channels != self.output_channels {
                return Err(ConfigError::PoolingChannelMismatch {
                    input_channels: self.input_channels,
                    output_channels: self.output_channels,
                });
            }
            self.check_window(
                self.pool_kernel_size,
                self.pool_kernel_size,
                self.pool_stride,
                self.pool_stride,
            )?;
        }

        Ok(())
    }

    /// Findings that don't make the setup illegal but point at a likely mistake.
    pub fn warnings(&self) -> Vec<String> {
        let kernel = self.kernel_type;
        let mut warnings = Vec::new();

        if !kernel.quantizes_output() {
            if self.use_batchnorm {
                warnings.push(format!("batch-norm is ignored by {kernel} kernels"));
            }
            if self.use_relu {
                warnings.push(format!("relu is ignored by {kernel} kernels"));
            }
        }
        if kernel.is_pooling() && self.use_bias {
            warnings.push(format!("bias is ignored by {kernel} kernels"));
        }

        warnings
    }

    pub(crate) fn log_warnings(&self) {
        for warning in self.warnings() {
            log::warn!("{warning}");
        }
    }

    fn check_ranges(&self) -> Result<(), ConfigError> {
        let positive = [
            ("input_dim_x", self.input_dim_x),
            ("input_dim_y", self.input_dim_y),
            ("input_channels", self.input_channels),
            ("output_dim_x", self.output_dim_x),
            ("output_dim_y", self.output_dim_y),
            ("output_channels", self.output_channels),
            ("kernel_dim_x", self.kernel_dim_x),
            ("kernel_dim_y", self.kernel_dim_y),
            ("stride_x", self.stride_x),
            ("stride_y", self.stride_y),
            ("pool_kernel_size", self.pool_kernel_size),
            ("pool_stride", self.pool_stride),
        ];

        if let Some(&(field, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ZeroDimension { field });
        }

        let padding = [
            ("padding_top", self.padding_top),
            ("padding_bottom", self.padding_bottom),
            ("padding_left", self.padding_left),
            ("padding_right", self.padding_right),
        ];
        match positive
            .into_iter()
            .chain(padding)
            .find(|(_, value)| *value > MAX_DIMENSION)
        {
            Some((field, value)) => Err(ConfigError::DimensionTooLarge {
                field,
                value,
                max: MAX_DIMENSION,
            }),
            None => Ok(()),
        }
    }

    fn check_window(
        &self,
        window_x: u32,
        window_y: u32,
        stride_x: u32,
        stride_y: u32,
    ) -> Result<(), ConfigError> {
        check_axis(
            Axis::X,
            self.input_dim_x,
            (self.padding_left, self.padding_right),
            window_x,
            stride_x,
            self.output_dim_x,
        )?;
        check_axis(
            Axis::Y,
            self.input_dim_y,
            (self.padding_top, self.padding_bottom),
            window_y,
            stride_y,
            self.output_dim_y,
        )
    }
}

/// Output size of a sliding window on one axis.
///
/// Returns `None` when the window doesn't fit in the padded input.
pub fn output_dim(input: u32, padding: (u32, u32), window: u32, stride: u32) -> Option<u32> {
    let padded = input.checked_add(padding.0)?.checked_add(padding.1)?;
    if window > padded || stride == 0 {
        return None;
    }
    Some((padded - window) / stride + 1)
}

fn check_axis(
    axis: Axis,
    input: u32,
    padding: (u32, u32),
    window: u32,
    stride: u32,
    output: u32,
) -> Result<(), ConfigError> {
    let expected =
        output_dim(input, padding, window, stride).ok_or(ConfigError::KernelLargerThanInput {
            axis,
            window,
            padded_input: input.saturating_add(padding.0).saturating_add(padding.1),
        })?;

    if expected != output {
        return Err(ConfigError::OutputShapeMismatch {
            axis,
            expected,
            actual: output,
        });
    }

    Ok(())
}
