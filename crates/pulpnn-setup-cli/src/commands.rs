use std::{io::Write, path::Path};

use anyhow::{Context, Result, bail};
use pulpnn_setup::{
    config::GlobalConfig,
    plan::GenerationPlan,
    setup_script,
};

use crate::Format;

/// Loads the configuration from `path`, or the global configuration when no path is given.
///
/// `.py` files are read as legacy setup scripts, `.json` files as JSON and anything else as TOML.
/// Every path validates the configuration and logs its warnings.
pub fn load_config(path: Option<&Path>) -> Result<GlobalConfig> {
    let Some(path) = path else {
        return Ok(GlobalConfig::get()?.as_ref().clone());
    };

    let read = || {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    };

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("py") => {
            let setup = setup_script::parse(&read()?)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            Ok(GlobalConfig {
                setup,
                ..Default::default()
            })
        }
        Some("json") => {
            let config: GlobalConfig = serde_json::from_str(&read()?)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            config
                .validate()
                .with_context(|| format!("invalid configuration in {}", path.display()))?;
            for warning in config.setup.warnings() {
                log::warn!("{warning}");
            }
            Ok(config)
        }
        _ => GlobalConfig::from_file_path(path)
            .with_context(|| format!("failed to load {}", path.display())),
    }
}

pub fn show(config: &GlobalConfig, format: Format, out: &mut impl Write) -> Result<()> {
    let content = match format {
        Format::Toml => config.to_toml_string()?,
        Format::Json => serde_json::to_string_pretty(config)? + "\n",
        Format::Script => setup_script::render(&config.setup),
    };
    out.write_all(content.as_bytes())?;
    Ok(())
}

/// Validates `config`.
///
/// Warnings were already logged when the configuration was loaded.
pub fn check(config: &GlobalConfig, out: &mut impl Write) -> Result<()> {
    config.validate()?;
    writeln!(out, "ok")?;
    Ok(())
}

pub fn variants(config: &GlobalConfig, out: &mut impl Write) -> Result<()> {
    let plan = GenerationPlan::new(config)?;
    for case in &plan.cases {
        writeln!(
            out,
            "{}\t{}",
            case.variant.entry_point(),
            case.footprint.total()
        )?;
    }
    log::info!(
        "{} test cases, peak footprint {} bytes",
        plan.cases.len(),
        plan.peak_footprint()
    );
    Ok(())
}

pub fn init(path: &Path, format: Format, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists, use --force to overwrite", path.display());
    }

    let config = GlobalConfig::default();
    let content = match format {
        Format::Toml => config.to_toml_string()?,
        Format::Json => serde_json::to_string_pretty(&config)? + "\n",
        Format::Script => setup_script::render(&config.setup),
    };
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("Wrote default configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output_of(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn init_then_load_script() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulp_nn_test_setup.py");
        init(&path, Format::Script, false).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config, GlobalConfig::default());
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulpnn_setup.toml");
        init(&path, Format::Toml, false).unwrap();

        assert!(init(&path, Format::Toml, false).is_err());
        assert!(init(&path, Format::Toml, true).is_ok());
        assert_eq!(load_config(Some(&path)).unwrap(), GlobalConfig::default());
    }

    #[test]
    fn invalid_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depthwise.toml");
        std::fs::write(
            &path,
            "[setup]\nkernel_type = \"depthwise\"\noutput_channels = 4\n",
        )
        .unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("input_channels == output_channels"));
    }

    #[test]
    fn variants_lists_entry_points() {
        let output = output_of(|out| variants(&GlobalConfig::default(), out));
        let lines: Vec<_> = output.lines().collect();

        assert_eq!(lines.len(), 9);
        assert!(lines[0].starts_with("pulp_nn_linear_u8_i32_i8\t"));
    }

    #[test]
    fn check_prints_warnings_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relu.toml");
        std::fs::write(&path, "[setup]\nuse_relu = true\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.setup.warnings().len(), 1);

        let output = output_of(|out| check(&config, out));
        assert_eq!(output, "ok\n");
    }

    #[test]
    fn init_then_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setup.json");
        init(&path, Format::Json, false).unwrap();

        assert_eq!(load_config(Some(&path)).unwrap(), GlobalConfig::default());
    }

    #[test]
    fn invalid_json_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setup.json");
        std::fs::write(&path, r#"{"target": {"num_cores": 6}}"#).unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("power of two"));
    }

    #[test]
    fn show_json_is_parseable() {
        let output = output_of(|out| show(&GlobalConfig::default(), Format::Json, out));
        let config: GlobalConfig = serde_json::from_str(&output).unwrap();

        assert_eq!(config, GlobalConfig::default());
    }
}
