use std::path::PathBuf;

use thiserror::Error;

use crate::kernel::Precision;

/// Spatial axis of a layer, used to point at the offending dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Width.
    X,
    /// Height.
    Y,
}

impl core::fmt::Display for Axis {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Axis::X => f.write_str("x"),
            Axis::Y => f.write_str("y"),
        }
    }
}

/// A setup that violates one of the constraints of the kernel library.
///
/// Every variant names the constraint that was broken, so the message can be shown to the user
/// as is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A dimension that must be strictly positive is zero.
    #[error("`{field}` must be greater than zero")]
    ZeroDimension {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The kernels take every dimension as a 16-bit unsigned integer.
    #[error("`{field}` must be at most {max}, got {value}")]
    DimensionTooLarge {
        /// Name of the offending field.
        field: &'static str,
        /// Configured value.
        value: u32,
        /// Largest supported value.
        max: u32,
    },

    /// Depthwise kernels map each input channel to exactly one output channel.
    #[error(
        "depthwise kernels require input_channels == output_channels, got {input_channels} and {output_channels}"
    )]
    DepthwiseChannelMismatch {
        /// Configured input channels.
        input_channels: u32,
        /// Configured output channels.
        output_channels: u32,
    },

    /// Pointwise kernels only support a 1x1 window.
    #[error("pointwise kernels require a 1x1 kernel, got {kernel_dim_x}x{kernel_dim_y}")]
    PointwiseKernelSize {
        /// Configured kernel width.
        kernel_dim_x: u32,
        /// Configured kernel height.
        kernel_dim_y: u32,
    },

    /// Pointwise kernels don't support padding.
    #[error(
        "pointwise kernels require zero padding, got top={top} bottom={bottom} left={left} right={right}"
    )]
    PointwisePadding {
        /// Top padding.
        top: u32,
        /// Bottom padding.
        bottom: u32,
        /// Left padding.
        left: u32,
        /// Right padding.
        right: u32,
    },

    /// Sub-byte activations or weights are packed along the input channels.
    #[error(
        "input_channels must be a multiple of {multiple} when the lowest input/weight precision is {precision}, got {input_channels}"
    )]
    InputChannelsNotAligned {
        /// Configured input channels.
        input_channels: u32,
        /// Lowest precision between input activations and weights.
        precision: Precision,
        /// Required multiple.
        multiple: u32,
    },

    /// Sub-byte output activations are packed along the output channels.
    #[error(
        "output_channels must be a multiple of {multiple} when the output precision is {precision}, got {output_channels}"
    )]
    OutputChannelsNotAligned {
        /// Configured output channels.
        output_channels: u32,
        /// Output activation precision.
        precision: Precision,
        /// Required multiple.
        multiple: u32,
    },

    /// The padded input is smaller than the window.
    #[error("window {window} on axis {axis} is larger than the padded input {padded_input}")]
    KernelLargerThanInput {
        /// Axis of the offending window.
        axis: Axis,
        /// Window size on that axis.
        window: u32,
        /// Input size plus padding on that axis.
        padded_input: u32,
    },

    /// The declared output size doesn't follow from the input size, window, padding and stride.
    #[error("output dimension on axis {axis} should be {expected}, got {actual}")]
    OutputShapeMismatch {
        /// Axis of the offending dimension.
        axis: Axis,
        /// Size derived from the layer parameters.
        expected: u32,
        /// Configured size.
        actual: u32,
    },

    /// Pooling keeps the channel count.
    #[error(
        "pooling kernels require input_channels == output_channels, got {input_channels} and {output_channels}"
    )]
    PoolingChannelMismatch {
        /// Configured input channels.
        input_channels: u32,
        /// Configured output channels.
        output_channels: u32,
    },

    /// The buffers of a test case don't fit in a 64-bit byte count.
    #[error("buffers of {0} exceed the addressable memory")]
    FootprintTooLarge(String),

    /// Work is split across cores with shifts and masks.
    #[error("num_cores must be a non-zero power of two, got {0}")]
    InvalidCoreCount(u32),

    /// Unknown kernel family name.
    #[error(
        "unknown kernel type `{0}`, expected one of matmul, convolution, pointwise, depthwise, linear_no_quant, linear_quant, maxpool, avgpool"
    )]
    UnknownKernelType(String),

    /// Unsupported bit width.
    #[error("unsupported precision {0}, expected 8, 4 or 2")]
    UnknownPrecision(u32),

    /// A precision that isn't a number.
    #[error("invalid precision `{0}`, expected 8, 4 or 2")]
    InvalidPrecision(String),

    /// Unknown quantization method name.
    #[error("unknown quantization method `{0}`, expected shift_clip")]
    UnknownQuantizationMethod(String),
}

/// Error raised while loading or saving a configuration.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file couldn't be read or written.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file isn't valid TOML for this configuration.
    #[error("the file provided doesn't have the right format: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration couldn't be serialized.
    #[error("unable to serialize the configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The legacy setup script couldn't be read.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// The configuration was read but is not legal.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] ConfigError),

    /// The global configuration was already set or read.
    #[error("cannot set the global configuration multiple times")]
    AlreadySet,
}

/// Error raised while parsing a legacy `pulp_nn_test_setup.py` script.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// The line isn't an assignment.
    #[error("line {line}: expected `NAME = value`, got `{content}`")]
    Syntax {
        /// 1-based line number.
        line: usize,
        /// Offending line, comments stripped.
        content: String,
    },

    /// The value doesn't have the type the constant expects.
    #[error("line {line}: invalid value `{value}` for {name}")]
    InvalidValue {
        /// 1-based line number.
        line: usize,
        /// Constant name.
        name: String,
        /// Offending value.
        value: String,
    },

    /// The value has the right type but is not legal.
    #[error("line {line}: {source}")]
    Config {
        /// 1-based line number.
        line: usize,
        /// Underlying error.
        #[source]
        source: ConfigError,
    },

    /// The script parsed, but the resulting setup is not legal.
    #[error("invalid setup script: {0}")]
    Invalid(#[from] ConfigError),
}
