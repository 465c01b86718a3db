//! Test-case setup for the PULP-NN quantized kernel library.
//!
//! A run is described by a [GlobalConfig](config::GlobalConfig): the [setup](config::SetupConfig)
//! selects the kernel family, the precisions and the layer shape, the target describes the
//! cluster, and the logger configures where the [plan](plan::GenerationPlan) is reported.
//!
//! ```
//! use pulpnn_setup::{config::SetupConfig, kernel::{KernelType, Precision}};
//!
//! let setup = SetupConfig::default()
//!     .with_single_kernel(true)
//!     .with_kernel_type(KernelType::Convolution)
//!     .with_precisions(Precision::Int8, Precision::Int8, Precision::Int2)
//!     .with_kernel_size(3, 3)
//!     .with_padding(1, 1, 1, 1)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(setup.selected_variant().entry_point(), "pulp_nn_conv_u8_u2_i8");
//! ```

#[macro_use]
extern crate derive_new;

/// Configuration loading and validation.
pub mod config;
/// Kernel families, precisions and variants.
pub mod kernel;
/// Test cases generated by a run.
pub mod plan;
pub mod setup_script;

mod error;

pub use error::*;
