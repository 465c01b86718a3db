//! Loads the global configuration from the working directory, so this binary holds a single test.

use pretty_assertions::assert_eq;
use pulpnn_setup::{
    config::{GlobalConfig, SetupConfig},
    kernel::{KernelType, Precision},
};

#[test_log::test]
fn global_config_is_read_from_a_parent_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("build").join("tests");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(
        dir.path().join("pulpnn_setup.toml"),
        "[setup]\nsingle_kernel_mode = true\nkernel_type = \"matmul\"\nweight_precision = 4\n\n\
         [target]\nnum_cores = 4\n",
    )
    .unwrap();

    // SAFETY: this binary runs a single test, nothing else reads the environment.
    unsafe {
        for name in [
            "PULPNN_SINGLE_KERNEL",
            "PULPNN_KERNEL_TYPE",
            "PULPNN_NUM_CORES",
            "PULPNN_DEBUG_LOG",
        ] {
            std::env::remove_var(name);
        }
    }
    std::env::set_current_dir(&nested).unwrap();

    let config = GlobalConfig::get().unwrap();

    assert_eq!(
        config.setup,
        SetupConfig::default()
            .with_single_kernel(true)
            .with_kernel_type(KernelType::Matmul)
            .with_precisions(Precision::Int8, Precision::Int4, Precision::Int8)
    );
    assert_eq!(config.target.num_cores, 4);
}
