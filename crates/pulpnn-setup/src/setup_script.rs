//! Reader and writer for legacy `pulp_nn_test_setup.py` scripts.
//!
//! Those scripts are flat lists of `NAME = value` assignments read by the kernel generator. Only
//! the subset of Python they use is understood: integers, quoted strings, `True`/`False` and
//! `#` comments.

use core::fmt::Write;

use crate::{
    ScriptError,
    config::SetupConfig,
    kernel::{KernelType, Precision, QuantizationMethod},
};

/// Writes `setup` as a setup script, with the legal values of every constant in comments.
pub fn render(setup: &SetupConfig) -> String {
    let mut out = String::new();
    // Writing to a String can't fail.
    let _ = write_script(&mut out, setup);
    out
}

fn write_script(out: &mut String, setup: &SetupConfig) -> core::fmt::Result {
    let py_bool = |value: bool| if value { "True" } else { "False" };

    writeln!(
        out,
        "# If is 1 only the selected-below kernel is created (SINGLE KERNEL SOLUTION). Otherwise, all kernels are created (ALL KERNELS SOLUTION)"
    )?;
    writeln!(out)?;
    writeln!(out, "SINGLE_KERNEL = {}", setup.single_kernel_mode as u8)?;
    writeln!(out)?;
    writeln!(out, "# -> input channels:")?;
    writeln!(
        out,
        "#       - all values if less precision between ifmaps and weights is INT8"
    )?;
    writeln!(
        out,
        "#       - multiples of 2 if less precision between ifmaps and weights is INT4"
    )?;
    writeln!(
        out,
        "#       - multiples of 4 if less precision between ifmaps and weights in INT2"
    )?;
    writeln!(out, "# -> output channels:")?;
    writeln!(out, "#       - all values if less precision is INT8")?;
    writeln!(out, "#       - multiples of 2 for uint4 output activations precision")?;
    writeln!(out, "#       - multiples of 4 for uint2 output activations precision")?;
    writeln!(out)?;
    writeln!(out, "TYPE_OF_KERNEL = '{}'", setup.kernel_type)?;
    writeln!(out)?;
    writeln!(
        out,
        "# -> matmul, convolution, pointwise, depthwise, linear_no_quant, linear_quant, maxpool, avgpool"
    )?;
    writeln!(out)?;
    writeln!(out, "# If SINGLE_KERNEL = 0 these will be ignored.")?;
    writeln!(out, "# -> precisions: 8, 4, 2")?;
    writeln!(out, "# -> quantization method: shift_clip")?;
    writeln!(out)?;
    writeln!(out, "in_precision = {}", setup.input_precision.bits())?;
    writeln!(out, "wt_precision = {}", setup.weight_precision.bits())?;
    writeln!(out, "out_precision = {}", setup.output_precision.bits())?;
    writeln!(out, "quantization_type = '{}'", setup.quantization_method)?;
    writeln!(out)?;
    writeln!(out, "# if depthwise CH_IM_IN must be equal to CH_IM_OUT")?;
    writeln!(out, "DIM_IM_IN_X = {}", setup.input_dim_x)?;
    writeln!(out, "DIM_IM_IN_Y = {}", setup.input_dim_y)?;
    writeln!(out, "CH_IM_IN = {}", setup.input_channels)?;
    writeln!(out, "DIM_IM_OUT_X = {}", setup.output_dim_x)?;
    writeln!(out, "DIM_IM_OUT_Y = {}", setup.output_dim_y)?;
    writeln!(out, "CH_IM_OUT = {}", setup.output_channels)?;
    writeln!(out, "# if is not linear")?;
    writeln!(out, "DIM_KERNEL_X = {} # 1 if is pointwise", setup.kernel_dim_x)?;
    writeln!(out, "DIM_KERNEL_Y = {} # 1 if is pointwise", setup.kernel_dim_y)?;
    writeln!(out, "PADDING_Y_TOP = {} # 0 if is pointwise", setup.padding_top)?;
    writeln!(out, "PADDING_Y_BOTTOM = {} # 0 if is pointwise", setup.padding_bottom)?;
    writeln!(out, "PADDING_X_LEFT = {} # 0 if is pointwise", setup.padding_left)?;
    writeln!(out, "PADDING_X_RIGHT = {} # 0 if is pointwise", setup.padding_right)?;
    writeln!(out, "STRIDE_X = {}", setup.stride_x)?;
    writeln!(out, "STRIDE_Y = {}", setup.stride_y)?;
    writeln!(out, "# Other parameters")?;
    writeln!(out, "BIAS = {}", py_bool(setup.use_bias))?;
    writeln!(out, "BN = {}", py_bool(setup.use_batchnorm))?;
    writeln!(out, "RELU = {}", py_bool(setup.use_relu))?;
    writeln!(out, "# If is pooling")?;
    writeln!(out, "POOL_KERNEL = {}", setup.pool_kernel_size)?;
    writeln!(out, "POOL_STRIDE = {}", setup.pool_stride)
}

/// Reads a setup script.
///
/// Constants missing from the script keep their default value, unknown constants are skipped.
/// The resulting setup is validated.
pub fn parse(content: &str) -> Result<SetupConfig, ScriptError> {
    let mut setup = SetupConfig::default();

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        let statement = strip_comment(raw).trim();
        if statement.is_empty() {
            continue;
        }

        let (name, value) = statement
            .split_once('=')
            .map(|(name, value)| (name.trim(), value.trim()))
            .filter(|(name, value)| is_identifier(name) && !value.is_empty())
            .ok_or_else(|| ScriptError::Syntax {
                line,
                content: statement.to_string(),
            })?;

        let field = Field { line, name, value };
        match name {
            "SINGLE_KERNEL" => setup.single_kernel_mode = field.boolean()?,
            "TYPE_OF_KERNEL" => setup.kernel_type = field.parsed::<KernelType>()?,
            "in_precision" => setup.input_precision = field.precision()?,
            "wt_precision" => setup.weight_precision = field.precision()?,
            "out_precision" => setup.output_precision = field.precision()?,
            "quantization_type" => {
                setup.quantization_method = field.parsed::<QuantizationMethod>()?
            }
            "DIM_IM_IN_X" => setup.input_dim_x = field.integer()?,
            "DIM_IM_IN_Y" => setup.input_dim_y = field.integer()?,
            "CH_IM_IN" => setup.input_channels = field.integer()?,
            "DIM_IM_OUT_X" => setup.output_dim_x = field.integer()?,
            "DIM_IM_OUT_Y" => setup.output_dim_y = field.integer()?,
            "CH_IM_OUT" => setup.output_channels = field.integer()?,
            "DIM_KERNEL_X" => setup.kernel_dim_x = field.integer()?,
            "DIM_KERNEL_Y" => setup.kernel_dim_y = field.integer()?,
            "PADDING_Y_TOP" => setup.padding_top = field.integer()?,
            "PADDING_Y_BOTTOM" => setup.padding_bottom = field.integer()?,
            "PADDING_X_LEFT" => setup.padding_left = field.integer()?,
            "PADDING_X_RIGHT" => setup.padding_right = field.integer()?,
            "STRIDE_X" => setup.stride_x = field.integer()?,
            "STRIDE_Y" => setup.stride_y = field.integer()?,
            "BIAS" => setup.use_bias = field.boolean()?,
            "BN" => setup.use_batchnorm = field.boolean()?,
            "RELU" => setup.use_relu = field.boolean()?,
            "POOL_KERNEL" => setup.pool_kernel_size = field.integer()?,
            "POOL_STRIDE" => setup.pool_stride = field.integer()?,
            other => log::warn!("line {line}: skipping unknown constant {other}"),
        }
    }

    setup.validate()?;
    setup.log_warnings();
    Ok(setup)
}

struct Field<'a> {
    line: usize,
    name: &'a str,
    value: &'a str,
}

impl Field<'_> {
    fn invalid(&self) -> ScriptError {
        ScriptError::InvalidValue {
            line: self.line,
            name: self.name.to_string(),
            value: self.value.to_string(),
        }
    }

    fn integer(&self) -> Result<u32, ScriptError> {
        self.value.parse::<u32>().map_err(|_| self.invalid())
    }

    fn boolean(&self) -> Result<bool, ScriptError> {
        match self.value {
            "True" | "1" => Ok(true),
            "False" | "0" => Ok(false),
            _ => Err(self.invalid()),
        }
    }

    fn precision(&self) -> Result<Precision, ScriptError> {
        Precision::try_from(self.integer()?).map_err(|source| ScriptError::Config {
            line: self.line,
            source,
        })
    }

    fn parsed<T>(&self) -> Result<T, ScriptError>
    where
        T: core::str::FromStr<Err = crate::ConfigError>,
    {
        let text = unquote(self.value).ok_or_else(|| self.invalid())?;
        text.parse::<T>().map_err(|source| ScriptError::Config {
            line: self.line,
            source,
        })
    }
}

fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    for (index, c) in line.char_indices() {
        match (c, quote) {
            ('\'' | '"', None) => quote = Some(c),
            (c, Some(open)) if c == open => quote = None,
            ('#', None) => return &line[..index],
            _ => {}
        }
    }
    line
}

fn unquote(value: &str) -> Option<&str> {
    ['\'', '"'].into_iter().find_map(|quote| {
        value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;
    use pretty_assertions::assert_eq;

    const ORIGINAL: &str = r#"
# If is 1 only the selected-below kernel is created (SINGLE KERNEL SOLUTION). Otherwise, all kernels are created (ALL KERNELS SOLUTION)

SINGLE_KERNEL = 0

TYPE_OF_KERNEL = 'linear_no_quant'

in_precision = 8
wt_precision = 8
out_precision = 8
quantization_type = 'shift_clip'

# if depthwise CH_IM_IN must be equal to CH_IM_OUT
DIM_IM_IN_X = 8
DIM_IM_IN_Y = 8
CH_IM_IN = 16
DIM_IM_OUT_X = 8
DIM_IM_OUT_Y = 8
CH_IM_OUT = 16
# if is not linear
DIM_KERNEL_X = 1 # 1 if is pointwise, free otherwise
DIM_KERNEL_Y = 1 # 1 if is pointwise, free otherwise
PADDING_Y_TOP = 0 # 0 if is pointwise, free otherwise
PADDING_Y_BOTTOM = 0 # 0 if is pointwise, free otherwise
PADDING_X_LEFT = 0 # 0 if is pointwise, free otherwise
PADDING_X_RIGHT = 0 # 0 if is pointwise, free otherwise
STRIDE_X = 1
STRIDE_Y = 1
# Other parameters
BIAS = False
BN = False
RELU = False
# If is pooling
POOL_KERNEL = 2
POOL_STRIDE = 2
"#;

    #[test]
    fn original_script_is_the_default_setup() {
        assert_eq!(parse(ORIGINAL).unwrap(), SetupConfig::default());
    }

    #[test]
    fn render_then_parse() {
        let setup = SetupConfig::default()
            .with_single_kernel(true)
            .with_kernel_type(KernelType::Convolution)
            .with_precisions(Precision::Int4, Precision::Int2, Precision::Int4)
            .with_kernel_size(3, 3)
            .with_padding(1, 1, 1, 1)
            .with_bias(true)
            .with_relu(true);

        assert_eq!(parse(&render(&setup)).unwrap(), setup);
    }

    #[test]
    fn missing_constants_keep_defaults() {
        let setup = parse("TYPE_OF_KERNEL = \"matmul\"\nCH_IM_IN = 32\n").unwrap();

        assert_eq!(setup.kernel_type, KernelType::Matmul);
        assert_eq!(setup.input_channels, 32);
        assert_eq!(setup.output_channels, 16);
    }

    #[test]
    fn unknown_constants_are_skipped() {
        assert_eq!(parse("NUM_CORES = 8\n").unwrap(), SetupConfig::default());
    }

    #[test]
    fn hash_inside_quotes_is_not_a_comment() {
        assert_eq!(strip_comment("A = '#x' # c"), "A = '#x' ");
    }

    #[test]
    fn syntax_errors_report_the_line() {
        assert_eq!(
            parse("SINGLE_KERNEL = 1\nimport os\n"),
            Err(ScriptError::Syntax {
                line: 2,
                content: "import os".into(),
            })
        );
    }

    #[test]
    fn bad_values_are_rejected() {
        assert_eq!(
            parse("BIAS = maybe\n"),
            Err(ScriptError::InvalidValue {
                line: 1,
                name: "BIAS".into(),
                value: "maybe".into(),
            })
        );
        assert_eq!(
            parse("\nin_precision = 16\n"),
            Err(ScriptError::Config {
                line: 2,
                source: ConfigError::UnknownPrecision(16),
            })
        );
        assert!(matches!(
            parse("TYPE_OF_KERNEL = conv\n"),
            Err(ScriptError::InvalidValue { .. })
        ));
    }

    #[test]
    fn parsed_setup_is_validated() {
        assert_eq!(
            parse("TYPE_OF_KERNEL = 'depthwise'\nCH_IM_OUT = 32\n"),
            Err(ScriptError::Invalid(ConfigError::DepthwiseChannelMismatch {
                input_channels: 16,
                output_channels: 32,
            }))
        );
    }
}
